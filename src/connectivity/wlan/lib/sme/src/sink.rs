// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{mgmt::MgmtEvent, mlme::MlmeRequest},
    futures::channel::mpsc,
    log::{debug, warn},
    std::{
        fmt::Debug,
        sync::atomic::{AtomicUsize, Ordering},
    },
};

/// Outgoing half of one SAP. A receiver that hung up is reported once; everything sent after
/// that is counted and dropped.
#[derive(Debug)]
pub struct UnboundedSink<T> {
    sap: &'static str,
    sink: mpsc::UnboundedSender<T>,
    dropped: AtomicUsize,
}

impl<T: Debug> UnboundedSink<T> {
    fn new(sap: &'static str, sink: mpsc::UnboundedSender<T>) -> Self {
        UnboundedSink { sap, sink, dropped: AtomicUsize::new(0) }
    }

    /// Returns false if the message was dropped.
    pub fn send(&self, msg: T) -> bool {
        match self.sink.unbounded_send(msg) {
            Ok(()) => true,
            Err(e) => {
                let msg = e.into_inner();
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!("{} SAP closed, dropping {:?} and everything after it", self.sap, msg);
                } else {
                    debug!("{} SAP closed, dropped {:?}", self.sap, msg);
                }
                false
            }
        }
    }

    #[cfg(test)]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub type MlmeSink = UnboundedSink<MlmeRequest>;
pub type MgmtSink = UnboundedSink<MgmtEvent>;

impl UnboundedSink<MlmeRequest> {
    pub fn mlme(sink: mpsc::UnboundedSender<MlmeRequest>) -> Self {
        Self::new("MLME", sink)
    }
}

impl UnboundedSink<MgmtEvent> {
    pub fn mgmt(sink: mpsc::UnboundedSender<MgmtEvent>) -> Self {
        Self::new("management", sink)
    }
}
