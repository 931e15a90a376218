// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {bytes::Bytes, std::fmt};

/// Reference-counted handle to an immutable buffer held outside the state machines.
/// Each `add_ref` yields an independent owner; the buffer is freed when the last owner is
/// released or dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Bytes);

impl Payload {
    pub const EMPTY: Payload = Payload(Bytes::new());

    pub fn store(buf: impl Into<Bytes>) -> Self {
        Payload(buf.into())
    }

    pub fn access(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add_ref(&self) -> Payload {
        self.clone()
    }

    pub fn release(self) {}
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Payload(empty)")
        } else {
            write!(f, "Payload({} bytes)", self.len())
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(buf: Vec<u8>) -> Self {
        Payload::store(buf)
    }
}
