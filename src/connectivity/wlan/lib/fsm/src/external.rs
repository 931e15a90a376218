// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::event::{Event, InstanceId, Message},
    parking_lot::Mutex,
    std::{collections::VecDeque, sync::Arc},
};

type WakeFn = Arc<dyn Fn() + Send + Sync>;

/// Events submitted from outside the dispatch thread. This is the only state of a context that
/// is shared across threads.
pub(crate) struct ExternalQueue<M> {
    events: Mutex<VecDeque<Event<M>>>,
    wake: Mutex<Option<WakeFn>>,
}

impl<M> ExternalQueue<M> {
    pub fn new() -> Self {
        Self { events: Mutex::new(VecDeque::new()), wake: Mutex::new(None) }
    }

    pub fn push(&self, event: Event<M>) {
        self.events.lock().push_back(event);
        // Call out without holding the queue lock; the callback may submit again.
        let wake = self.wake.lock().clone();
        if let Some(wake) = wake {
            wake();
        }
    }

    pub fn pop(&self) -> Option<Event<M>> {
        self.events.lock().pop_front()
    }

    pub fn remove_for(&self, dest: InstanceId) -> Vec<Event<M>> {
        let mut events = self.events.lock();
        let (removed, kept): (VecDeque<_>, VecDeque<_>) =
            std::mem::take(&mut *events).into_iter().partition(|event| event.dest == dest);
        *events = kept;
        removed.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn set_wake(&self, wake: WakeFn) {
        *self.wake.lock() = Some(wake);
    }
}

/// Thread-safe handle for submitting events into a context. Cheap to clone.
pub struct ExternalSender<M> {
    queue: Arc<ExternalQueue<M>>,
}

impl<M> Clone for ExternalSender<M> {
    fn clone(&self) -> Self {
        Self { queue: Arc::clone(&self.queue) }
    }
}

impl<M: Message> ExternalSender<M> {
    pub(crate) fn new(queue: Arc<ExternalQueue<M>>) -> Self {
        Self { queue }
    }

    pub fn submit(&self, dest: InstanceId, body: M) {
        self.submit_event(Event::new(dest, InstanceId::EXTERNAL, body));
    }

    pub fn submit_event(&self, event: Event<M>) {
        self.queue.push(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
