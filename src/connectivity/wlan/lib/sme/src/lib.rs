// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Station management entity of an 802.11 client: turns connect, disconnect, roam and WPS
//! requests from the application into MLME requests, and firmware confirms and indications
//! back into application events.

pub mod blacklist;
pub mod bss;
pub mod config;
mod connection_manager;
mod context;
pub mod error;
pub mod event;
pub mod hip_proxy;
pub mod ie;
pub mod mgmt;
pub mod mlme;
mod network_selector;
pub mod payload;
mod security_manager;
mod sink;
mod wps;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::{
    bss::{BssDescription, MacAddr, Ssid},
    config::SmeConfig,
    error::Error,
    hip_proxy::HipProxy,
    mgmt::{AppHandle, ConnectRequest, ConnectResult, Credential, MgmtEvent, MgmtRequest, MgmtSap},
    mlme::{MlmeConfirm, MlmeIndication, MlmeRequest},
};

use {
    crate::{
        context::SmeContext,
        event::SmeEvent,
        network_selector::{NetworkSelector, NETWORK_SELECTOR},
        sink::{MgmtSink, MlmeSink},
    },
    futures::channel::mpsc,
    log::{info, warn},
    std::{sync::Arc, time::Duration},
    wlan_fsm::{time::Clock, Config, Context, InstanceId},
};

pub use wlan_fsm::time::{FakeClock, MonotonicClock, Time};

pub type MlmeStream = mpsc::UnboundedReceiver<MlmeRequest>;
pub type MgmtStream = mpsc::UnboundedReceiver<MgmtEvent>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmeStatus {
    pub state: &'static str,
    /// The network being connected to or used, if any.
    pub network: Option<Ssid>,
    pub bssid: Option<MacAddr>,
    pub media_connected: bool,
}

/// Owns the state machines. All of them run on the thread that calls `run_once`; `MgmtSap` and
/// `HipProxy` handles may be used from any thread.
pub struct Sme {
    context: Context<SmeEvent>,
    shared: Arc<SmeContext>,
    selector: InstanceId,
}

impl Sme {
    pub fn new(
        config: SmeConfig,
        clock: impl Clock + 'static,
    ) -> Result<(Self, MlmeStream, MgmtStream), Error> {
        config.validate()?;
        let (mlme_sink, mlme_stream) = mpsc::unbounded();
        let (mgmt_sink, mgmt_stream) = mpsc::unbounded();
        let fsm_config = Config { max_instances: config.max_instances, ..Config::default() };
        let shared = Arc::new(SmeContext::new(
            config,
            MlmeSink::mlme(mlme_sink),
            MgmtSink::mgmt(mgmt_sink),
        ));
        let mut context = Context::new(fsm_config, clock);
        context.set_leak_hook(|event| warn!("undelivered at teardown: {:?}", event.body));
        let selector = context.register(&NETWORK_SELECTOR, NetworkSelector::new(shared.clone()))?;
        shared.routing.lock().set_selector(selector);
        info!("SME created, network selector is {}", selector);
        Ok((Sme { context, shared, selector }, mlme_stream, mgmt_stream))
    }

    pub fn mgmt_sap(&self) -> MgmtSap {
        MgmtSap::new(self.context.external_sender(), self.selector)
    }

    pub fn hip_proxy(&self) -> HipProxy {
        HipProxy::new(self.shared.routing.clone(), self.context.external_sender())
    }

    /// Processes all pending work. Returns the next timer deadline, if any.
    pub fn run_once(&mut self) -> Option<Time> {
        self.context.run_once()
    }

    pub fn next_timeout(&self) -> Option<Duration> {
        self.context.next_timeout()
    }

    /// Installs a callback invoked whenever work is submitted from another thread.
    pub fn set_wake(&self, wake: impl Fn() + Send + Sync + 'static) {
        self.context.set_wake(wake)
    }

    pub fn config(&self) -> &SmeConfig {
        &self.shared.config
    }

    pub fn status(&self) -> SmeStatus {
        let state = self.context.state_name(self.selector).unwrap_or("<gone>");
        match self.context.data::<NetworkSelector>(self.selector) {
            Some(selector) => SmeStatus {
                state,
                network: selector.network().cloned(),
                bssid: selector.bssid(),
                media_connected: selector.media_connected(),
            },
            None => SmeStatus { state, network: None, bssid: None, media_connected: false },
        }
    }

    #[cfg(test)]
    pub(crate) fn selector(&self) -> InstanceId {
        self.selector
    }

    #[cfg(test)]
    pub(crate) fn routing(&self) -> &parking_lot::Mutex<hip_proxy::Routing> {
        &self.shared.routing
    }

    #[cfg(test)]
    pub(crate) fn fsm(&self) -> &Context<SmeEvent> {
        &self.context
    }
}
