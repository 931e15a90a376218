// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        context::Core,
        descriptor::Descriptor,
        error::Error,
        event::{Event, InstanceId, Message, StateId, TimerId},
        external::ExternalSender,
        time::Time,
    },
    std::time::Duration,
};

/// The view of the context handed to a running handler. `current` is the instance whose
/// transition is executing; exactly one exists for the duration of the call.
pub struct Dispatch<'a, M: Message> {
    core: &'a mut Core<M>,
    current: InstanceId,
    owner: Option<InstanceId>,
    state: StateId,
}

impl<'a, M: Message> Dispatch<'a, M> {
    pub(crate) fn new(
        core: &'a mut Core<M>,
        current: InstanceId,
        owner: Option<InstanceId>,
        state: StateId,
    ) -> Self {
        Self { core, current, owner, state }
    }

    pub fn current(&self) -> InstanceId {
        self.current
    }

    /// The instance owning `current`, if it runs as a sub-instance.
    pub fn owner(&self) -> Option<InstanceId> {
        self.owner
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn set_state(&mut self, state: impl Into<StateId>) {
        self.state = state.into();
    }

    /// Marks the current instance terminated. Teardown happens once the handler returns.
    pub fn terminate(&mut self) {
        self.state = StateId::TERMINATED;
    }

    pub fn now(&self) -> Time {
        self.core.clock.now()
    }

    pub fn send(&mut self, dest: InstanceId, body: M) {
        self.core.internal.push_back(Event::new(dest, self.current, body));
    }

    /// Passes an event on to another instance, keeping its original sender.
    pub fn forward(&mut self, mut event: Event<M>, dest: InstanceId) {
        event.dest = dest;
        self.core.internal.push_back(event);
    }

    /// Defers an event until the current instance changes state.
    pub fn save(&mut self, event: Event<M>) {
        let current = self.current;
        self.core.save(current, event);
    }

    /// Defers an event until the owner changes state. Without an owner this is `save`.
    pub fn save_to_owner(&mut self, mut event: Event<M>) {
        match self.owner {
            Some(owner) => {
                event.dest = owner;
                self.core.save(owner, event);
            }
            None => self.save(event),
        }
    }

    /// Arms a timer addressed to the current instance.
    pub fn arm_timer(&mut self, body: M, delay: Duration, tolerance: Duration) -> TimerId {
        let deadline = self.now() + delay;
        let current = self.current;
        self.core.timers.insert(deadline, tolerance, Event::new(current, current, body))
    }

    /// Returns whether the timer was still pending, either armed or saved after firing.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.core.cancel_timer(id)
    }

    /// Creates a top-level instance. Its entry hook runs before this returns.
    pub fn spawn<D: Send + 'static>(
        &mut self,
        descriptor: &'static Descriptor<M, D>,
        data: D,
    ) -> Result<InstanceId, Error> {
        self.core.create(descriptor, data, None, false)
    }

    /// Creates a sub-instance owned by the current instance. Until it terminates, events
    /// addressed to the current instance are offered to the sub-instance first.
    pub fn spawn_sub<D: Send + 'static>(
        &mut self,
        descriptor: &'static Descriptor<M, D>,
        data: D,
    ) -> Result<InstanceId, Error> {
        let current = self.current;
        self.core.create(descriptor, data, Some(current), false)
    }

    pub fn is_active(&self, id: InstanceId) -> bool {
        self.core.is_active(id)
    }

    pub fn external_sender(&self) -> ExternalSender<M> {
        ExternalSender::new(self.core.external.clone())
    }
}
