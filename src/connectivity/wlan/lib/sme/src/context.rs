// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        blacklist::Blacklist,
        bss::MacAddr,
        config::SmeConfig,
        event::SmeEvent,
        hip_proxy::Routing,
        mgmt::MgmtEvent,
        mlme::MlmeRequest,
        sink::{MgmtSink, MlmeSink},
    },
    log::{debug, error, info},
    parking_lot::Mutex,
    std::sync::Arc,
    wlan_fsm::{time::Time, Dispatch},
};

/// State shared by every SME state machine instance.
pub(crate) struct SmeContext {
    pub config: SmeConfig,
    mlme_sink: MlmeSink,
    mgmt_sink: MgmtSink,
    pub routing: Arc<Mutex<Routing>>,
    blacklist: Mutex<Blacklist>,
}

impl SmeContext {
    pub fn new(config: SmeConfig, mlme_sink: MlmeSink, mgmt_sink: MgmtSink) -> Self {
        Self {
            config,
            mlme_sink,
            mgmt_sink,
            routing: Arc::new(Mutex::new(Routing::default())),
            blacklist: Mutex::new(Blacklist::default()),
        }
    }

    /// Sends a request to firmware. Its confirm is routed back to the calling instance.
    pub fn send_mlme(&self, dispatch: &Dispatch<'_, SmeEvent>, req: MlmeRequest) {
        debug!("{} -> MLME {:?}", dispatch.current(), req);
        let kind = req.kind();
        self.routing.lock().expect_confirm(dispatch.current(), &req);
        if !self.mlme_sink.send(req) {
            error!("{:?} request from {} will never be confirmed", kind, dispatch.current());
        }
    }

    pub fn send_mgmt(&self, event: MgmtEvent) {
        info!("MGMT <- {:?}", event);
        self.mgmt_sink.send(event);
    }

    pub fn blacklist(&self, bssid: MacAddr, until: Time) {
        self.blacklist.lock().add(bssid, until);
    }

    pub fn is_blacklisted(&self, bssid: &MacAddr, now: Time) -> bool {
        self.blacklist.lock().contains(bssid, now)
    }
}
