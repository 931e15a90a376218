// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {crate::ie::IeError, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("state machine error: {0}")]
    Fsm(#[from] wlan_fsm::Error),
    #[error("malformed configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("information element error: {0}")]
    Ie(#[from] IeError),
}
