// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        event::{Event, InstanceId, TimerId},
        time::Time,
    },
    std::{collections::VecDeque, time::Duration},
};

#[derive(Debug)]
pub(crate) struct TimerEntry<M> {
    pub id: TimerId,
    pub deadline: Time,
    pub tolerance: Duration,
    pub event: Event<M>,
}

/// Pending timers, kept sorted by deadline. Timers sharing a deadline fire in the order they
/// were armed.
#[derive(Debug)]
pub(crate) struct TimerQueue<M> {
    entries: VecDeque<TimerEntry<M>>,
    next_id: u64,
}

impl<M> TimerQueue<M> {
    pub fn new() -> Self {
        Self { entries: VecDeque::new(), next_id: 0 }
    }

    pub fn insert(&mut self, deadline: Time, tolerance: Duration, mut event: Event<M>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        event.timer = Some(id);
        let pos = self.entries.partition_point(|entry| entry.deadline <= deadline);
        self.entries.insert(pos, TimerEntry { id, deadline, tolerance, event });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> Option<Event<M>> {
        let pos = self.entries.iter().position(|entry| entry.id == id)?;
        self.entries.remove(pos).map(|entry| entry.event)
    }

    pub fn pop_expired(&mut self, now: Time) -> Option<TimerEntry<M>> {
        match self.entries.front() {
            Some(entry) if entry.deadline <= now => self.entries.pop_front(),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Time> {
        self.entries.front().map(|entry| entry.deadline)
    }

    /// Returns the earliest deadline and the latest instant the wake-up may be deferred to
    /// without letting any timer exceed its tolerance.
    pub fn next_wake(&self) -> Option<(Time, Time)> {
        let earliest = self.next_deadline()?;
        let mut latest = Time::from_origin(Duration::MAX);
        for entry in &self.entries {
            // Later timers cannot tighten the bound any further.
            if entry.deadline >= latest {
                break;
            }
            latest = latest.min(entry.deadline + entry.tolerance);
        }
        Some((earliest, latest))
    }

    pub fn remove_for(&mut self, dest: InstanceId) -> Vec<Event<M>> {
        let (removed, kept): (VecDeque<_>, VecDeque<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(|entry| entry.event.dest == dest);
        self.entries = kept;
        removed.into_iter().map(|entry| entry.event).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn deadlines(&self) -> Vec<Time> {
        self.entries.iter().map(|entry| entry.deadline).collect()
    }
}
