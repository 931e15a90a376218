// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        dispatch::Dispatch,
        event::{Event, Message, StateId},
    },
    std::any::Any,
};

/// Runs one transition. A handler owns the event it is given: it may `save` or `forward` it,
/// and anything else frees it when the handler returns.
pub type Handler<M, D> = fn(&mut D, &mut Dispatch<'_, M>, Event<M>);

/// Runs on instance creation (`entry`) or after the instance reached the terminated state
/// (`reset`).
pub type Hook<M, D> = fn(&mut D, &mut Dispatch<'_, M>);

pub struct Transition<M: Message, D> {
    pub event: M::Id,
    pub handler: Handler<M, D>,
}

pub struct StateTable<M: Message, D: 'static> {
    pub name: &'static str,
    /// Events without a transition in this state are kept for replay instead of being routed
    /// to the invalid-event path.
    pub save_all: bool,
    pub transitions: &'static [Transition<M, D>],
}

/// Immutable description of one kind of state machine, shared by all of its instances.
pub struct Descriptor<M: Message, D: 'static> {
    pub name: &'static str,
    pub initial: StateId,
    pub states: &'static [StateTable<M, D>],
    /// Consulted when the active state has no transition for an event.
    pub default: &'static [Transition<M, D>],
    /// Events that may be discarded silently when an instance terminates with them pending.
    pub ignore: &'static [M::Id],
    pub entry: Option<Hook<M, D>>,
    pub reset: Option<Hook<M, D>>,
}

impl<M: Message, D: 'static> Descriptor<M, D> {
    pub fn state_name(&self, state: StateId) -> &'static str {
        if state.is_terminated() {
            return "Terminated";
        }
        self.states.get(state.0 as usize).map(|table| table.name).unwrap_or("<invalid>")
    }

    fn lookup(&self, state: StateId, id: M::Id) -> Result<Handler<M, D>, bool> {
        let table = self.states.get(state.0 as usize);
        table
            .and_then(|table| table.transitions.iter().find(|t| t.event == id))
            .or_else(|| self.default.iter().find(|t| t.event == id))
            .map(|t| t.handler)
            .ok_or_else(|| table.map_or(false, |table| table.save_all))
    }
}

/// Builds a transition table: `transitions![Id::A => Data::on_a, Id::B => Data::on_b]`.
#[macro_export]
macro_rules! transitions {
    ($($event:expr => $handler:expr),* $(,)?) => {
        &[$($crate::Transition { event: $event, handler: $handler }),*]
    };
}

/// An event no table accepted.
pub(crate) struct Unhandled<M> {
    pub event: Event<M>,
    pub save_all: bool,
}

/// Type-erased instance payload: a descriptor together with the instance's private data.
pub(crate) trait Machine<M: Message>: Send {
    fn name(&self) -> &'static str;
    fn initial(&self) -> StateId;
    fn state_name(&self, state: StateId) -> &'static str;
    fn handle(&mut self, dispatch: &mut Dispatch<'_, M>, event: Event<M>)
        -> Result<(), Unhandled<M>>;
    fn entry(&mut self, dispatch: &mut Dispatch<'_, M>);
    fn reset(&mut self, dispatch: &mut Dispatch<'_, M>);
    fn ignores(&self, id: M::Id) -> bool;
    fn data(&self) -> &dyn Any;
}

pub(crate) struct Process<M: Message, D: 'static> {
    descriptor: &'static Descriptor<M, D>,
    data: D,
}

impl<M: Message, D: 'static> Process<M, D> {
    pub fn new(descriptor: &'static Descriptor<M, D>, data: D) -> Self {
        Self { descriptor, data }
    }
}

impl<M: Message, D: Send + 'static> Machine<M> for Process<M, D> {
    fn name(&self) -> &'static str {
        self.descriptor.name
    }

    fn initial(&self) -> StateId {
        self.descriptor.initial
    }

    fn state_name(&self, state: StateId) -> &'static str {
        self.descriptor.state_name(state)
    }

    fn handle(
        &mut self,
        dispatch: &mut Dispatch<'_, M>,
        event: Event<M>,
    ) -> Result<(), Unhandled<M>> {
        match self.descriptor.lookup(dispatch.state(), event.id()) {
            Ok(handler) => {
                handler(&mut self.data, dispatch, event);
                Ok(())
            }
            Err(save_all) => Err(Unhandled { event, save_all }),
        }
    }

    fn entry(&mut self, dispatch: &mut Dispatch<'_, M>) {
        if let Some(entry) = self.descriptor.entry {
            entry(&mut self.data, dispatch);
        }
    }

    fn reset(&mut self, dispatch: &mut Dispatch<'_, M>) {
        if let Some(reset) = self.descriptor.reset {
            reset(&mut self.data, dispatch);
        }
    }

    fn ignores(&self, id: M::Id) -> bool {
        self.descriptor.ignore.contains(&id)
    }

    fn data(&self) -> &dyn Any {
        &self.data
    }
}
