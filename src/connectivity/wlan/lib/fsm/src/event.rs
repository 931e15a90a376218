// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;

/// Identifies one slot of the process table. The generation distinguishes successive occupants
/// of a re-used slot, so an id kept past its instance's termination never reaches the new one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    index: u16,
    generation: u16,
}

impl InstanceId {
    /// Sender of every event that originates outside the context.
    pub const EXTERNAL: InstanceId = InstanceId { index: u16::MAX, generation: u16::MAX };

    pub(crate) fn new(index: usize, generation: u16) -> Self {
        Self { index: index as u16, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::EXTERNAL {
            write!(f, "external")
        } else {
            write!(f, "#{}.{}", self.index, self.generation)
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into a descriptor's state tables.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub u16);

impl StateId {
    pub const TERMINATED: StateId = StateId(u16::MAX);

    pub fn is_terminated(&self) -> bool {
        *self == Self::TERMINATED
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminated() {
            write!(f, "StateId(terminated)")
        } else {
            write!(f, "StateId({})", self.0)
        }
    }
}

/// Unique id of an armed timer. Ids are never re-used within a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

/// The body of an event. State tables are keyed by `Message::Id`.
pub trait Message: fmt::Debug + Send + 'static {
    type Id: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

/// An addressed message. Timer events additionally carry the id they were armed with.
#[derive(Debug)]
pub struct Event<M> {
    pub dest: InstanceId,
    pub sender: InstanceId,
    pub timer: Option<TimerId>,
    pub body: M,
}

impl<M: Message> Event<M> {
    pub fn new(dest: InstanceId, sender: InstanceId, body: M) -> Self {
        Self { dest, sender, timer: None, body }
    }

    pub fn id(&self) -> M::Id {
        self.body.id()
    }

    pub fn into_body(self) -> M {
        self.body
    }
}
