// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A table-driven engine for cooperating finite state machines.
//!
//! Every instance of a machine lives in a fixed-capacity table owned by a [`Context`]. Events
//! are delivered one at a time, and each handler runs to completion before the next event is
//! taken. Events a state cannot handle yet may be saved and are replayed, in arrival order,
//! once the instance changes state.

mod context;
mod descriptor;
mod dispatch;
mod error;
mod event;
mod external;
mod table;
pub mod time;
mod timer;
mod trace;

pub use {
    context::{Config, Context, DEFAULT_MAX_INSTANCES},
    descriptor::{Descriptor, Handler, Hook, StateTable, Transition},
    dispatch::Dispatch,
    error::Error,
    event::{Event, InstanceId, Message, StateId, TimerId},
    external::ExternalSender,
    trace::Trace,
};

#[macro_export]
macro_rules! assert_variant {
    ($test:expr, $variant:pat => $e:expr $(,)?) => {
        match $test {
            $variant => $e,
            other => panic!("unexpected variant: {:?}", other),
        }
    };
    ($test:expr, $variant:pat $(,)?) => {
        $crate::assert_variant!($test, $variant => {})
    };
}
