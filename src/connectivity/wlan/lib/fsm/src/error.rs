// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {crate::event::InstanceId, thiserror::Error};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("process table is full ({capacity} instances)")]
    TableFull { capacity: usize },
    #[error("instance {0} already owns a sub-instance")]
    SubInstanceBusy(InstanceId),
    #[error("no active instance {0}")]
    NoSuchInstance(InstanceId),
}
