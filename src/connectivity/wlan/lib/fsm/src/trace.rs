// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {crate::event::InstanceId, std::fmt::Debug};

/// Debug hooks observing the dispatch loop. All methods default to no-ops.
pub trait Trace: Send {
    fn dispatched(
        &mut self,
        _instance: InstanceId,
        _machine: &'static str,
        _state: &'static str,
        _event: &dyn Debug,
    ) {
    }

    fn transition(
        &mut self,
        _instance: InstanceId,
        _machine: &'static str,
        _from: &'static str,
        _to: &'static str,
    ) {
    }

    fn saved(&mut self, _instance: InstanceId, _event: &dyn Debug) {}

    fn invalid(&mut self, _dest: InstanceId, _event: &dyn Debug) {}
}
