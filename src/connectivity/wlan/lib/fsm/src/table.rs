// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        descriptor::Machine,
        error::Error,
        event::{Event, InstanceId, Message, StateId},
    },
    std::collections::VecDeque,
};

pub(crate) struct Record<M: Message> {
    pub state: StateId,
    /// Taken out for the duration of a handler call.
    pub machine: Option<Box<dyn Machine<M>>>,
    pub saved: VecDeque<Event<M>>,
    pub owner: Option<InstanceId>,
    pub child: Option<InstanceId>,
    /// Registered at context init; never freed.
    pub persistent: bool,
}

impl<M: Message> Record<M> {
    pub fn is_active(&self) -> bool {
        !self.state.is_terminated() && self.machine.is_some()
    }
}

struct Slot<M: Message> {
    generation: u16,
    record: Option<Record<M>>,
}

/// Fixed-capacity arena of process instances. A freed slot is reused by the next allocation.
pub(crate) struct ProcessTable<M: Message> {
    slots: Vec<Slot<M>>,
    capacity: usize,
}

impl<M: Message> ProcessTable<M> {
    pub fn with_capacity(capacity: usize) -> Self {
        // The top index is reserved for `InstanceId::EXTERNAL`.
        let capacity = capacity.min(u16::MAX as usize);
        Self { slots: Vec::with_capacity(capacity), capacity }
    }

    pub fn allocate(
        &mut self,
        machine: Box<dyn Machine<M>>,
        owner: Option<InstanceId>,
        persistent: bool,
    ) -> Result<InstanceId, Error> {
        let index = match self.slots.iter().position(|slot| slot.record.is_none()) {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot { generation: 0, record: None });
                self.slots.len() - 1
            }
            None => return Err(Error::TableFull { capacity: self.capacity }),
        };
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        let state = machine.initial();
        slot.record = Some(Record {
            state,
            machine: Some(machine),
            saved: VecDeque::new(),
            owner,
            child: None,
            persistent,
        });
        Ok(InstanceId::new(index, slot.generation))
    }

    pub fn get(&self, id: InstanceId) -> Option<&Record<M>> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.record.as_ref())
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Record<M>> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.record.as_mut())
    }

    pub fn free(&mut self, id: InstanceId) -> Option<Record<M>> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.record.take())
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut Record<M>> {
        self.slots.iter_mut().filter_map(|slot| slot.record.as_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.record.is_some()).count()
    }
}
