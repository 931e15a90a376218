// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! One connection attempt, from the probe scan to a working link and back down. Every failure
//! and every cancellation leaves through the same teardown: stop security, deauthenticate if we
//! ever authenticated, reset the radio, then report to the network selector.

use {
    crate::{
        bss::{BssDescription, MacAddr, MacFmt},
        context::SmeContext,
        event::{SmeEvent, SmeEventId as Id},
        ie,
        mgmt::{ConnectFailure, ConnectRequest, ConnectResult},
        mlme::{
            AuthType, DisconnectReason, KeyKind, MlmeConfirm, MlmeIndication, MlmeRequest,
            MlmeResult, Protection, ReasonCode,
        },
        payload::Payload,
        security_manager::{SecurityManager, SECURITY_MANAGER},
    },
    log::{debug, error, info, warn},
    std::sync::Arc,
    wlan_fsm::{transitions, Descriptor, Dispatch, Event, InstanceId, StateId, StateTable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
enum State {
    WaitingForJoin,
    ActiveScanProbe,
    SecurityJoinStart,
    MlmeJoin,
    AdhocStart,
    ProtectionNoneGroup,
    ProtectionNonePairwise,
    PrecautionaryDeauth,
    Authenticate,
    QosControl,
    Associate,
    Reassociate,
    SecurityConnectStart,
    Connected,
    SecurityConnectStop,
    Deauthenticate,
    RadioReset,
}

impl From<State> for StateId {
    fn from(state: State) -> StateId {
        StateId(state as u16)
    }
}

fn link_loss_reason(ind: &MlmeIndication) -> Option<(MacAddr, DisconnectReason)> {
    match ind {
        MlmeIndication::Deauthenticate { bssid, reason } => {
            Some((*bssid, DisconnectReason::Deauthenticated(*reason)))
        }
        MlmeIndication::Disassociate { bssid, reason } => {
            Some((*bssid, DisconnectReason::Disassociated(*reason)))
        }
        MlmeIndication::BeaconLoss { bssid } => Some((*bssid, DisconnectReason::BeaconLoss)),
        _ => None,
    }
}

pub(crate) struct ConnectionManager {
    ctx: Arc<SmeContext>,
    selector: InstanceId,
    request: Option<ConnectRequest>,
    roam_from: Option<MacAddr>,
    bss: Option<Arc<BssDescription>>,
    security: Option<InstanceId>,
    security_ie: Payload,
    auth_type: AuthType,
    join_attempts: u8,
    auth_attempts: u8,
    assoc_attempts: u8,
    authenticated: bool,
    /// The selector has been told how the attempt ended.
    confirmed: bool,
    /// Set when a cancellation or link loss arrives while a confirm is outstanding; acted on
    /// when that confirm arrives.
    terminate_requested: bool,
    outcome: Option<ConnectResult>,
    disconnect_reason: Option<DisconnectReason>,
}

impl ConnectionManager {
    pub fn new(ctx: Arc<SmeContext>, selector: InstanceId) -> Self {
        Self {
            ctx,
            selector,
            request: None,
            roam_from: None,
            bss: None,
            security: None,
            security_ie: Payload::EMPTY,
            auth_type: AuthType::OpenSystem,
            join_attempts: 0,
            auth_attempts: 0,
            assoc_attempts: 0,
            authenticated: false,
            confirmed: false,
            terminate_requested: false,
            outcome: None,
            disconnect_reason: None,
        }
    }

    fn bssid(&self) -> Option<MacAddr> {
        self.bss.as_ref().map(|bss| bss.bssid)
    }

    fn entry(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        self.ctx.routing.lock().set_link_owner(d.current());
    }

    fn reset(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        let dropped = self.ctx.routing.lock().forget(d.current());
        if dropped > 0 {
            warn!("connection manager {} gone with {} request(s) unanswered", d.current(), dropped);
        }
        d.send(self.selector, SmeEvent::CmDisconnectedInd { reason: self.disconnect_reason });
    }

    /// Keeps the first reason the attempt ended for.
    fn record(&mut self, outcome: ConnectResult) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    fn fail(&mut self, d: &mut Dispatch<'_, SmeEvent>, failure: ConnectFailure) {
        error!("connection attempt failed: {:?}", failure);
        self.record(ConnectResult::Failed(failure));
        self.tear_down(d);
    }

    /// Common prologue of every confirm handler on the way up.
    fn should_stop(&mut self, d: &mut Dispatch<'_, SmeEvent>) -> bool {
        if !self.terminate_requested {
            return false;
        }
        info!("abandoning connection attempt in {:?}", d.state());
        self.tear_down(d);
        true
    }

    fn tear_down(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        self.terminate_requested = false;
        if !self.confirmed {
            self.confirmed = true;
            let result = self.outcome.take().unwrap_or(ConnectResult::Cancelled);
            d.send(self.selector, SmeEvent::CmConnectCfm { result, bssid: self.bssid() });
        }
        match self.security {
            Some(security) if d.is_active(security) => {
                d.send(security, SmeEvent::SmTerminateReq);
                d.set_state(State::SecurityConnectStop);
            }
            _ => self.security_stopped(d),
        }
    }

    fn security_stopped(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        self.security = None;
        if self.ctx.config.skip_reset {
            return d.terminate();
        }
        let ap_gone = self.disconnect_reason.map_or(false, |reason| reason.ap_initiated());
        match self.bssid() {
            Some(bssid) if self.authenticated && !ap_gone => {
                let reason = self
                    .disconnect_reason
                    .map_or(ReasonCode::LEAVING_NETWORK_DEAUTH, |reason| reason.reason_code());
                self.ctx.send_mlme(d, MlmeRequest::Deauthenticate { bssid, reason });
                d.set_state(State::Deauthenticate);
            }
            _ => self.reset_radio(d),
        }
    }

    fn reset_radio(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        self.ctx.send_mlme(d, MlmeRequest::Reset);
        d.set_state(State::RadioReset);
    }

    fn on_join_req(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (request, roam_from) = match e.body {
            SmeEvent::CmJoinReq { request, roam_from } => (request, roam_from),
            _ => return,
        };
        info!(
            "connecting to {:?}{}",
            String::from_utf8_lossy(&request.ssid),
            roam_from.map(|from| format!(", roaming from {}", from.to_mac_str())).unwrap_or_default()
        );
        let scan = MlmeRequest::Scan {
            ssid: request.ssid.clone(),
            bssid: request.bssid,
            probe_timeout: self.ctx.config.probe_timeout_tu,
        };
        self.request = Some(request);
        self.roam_from = roam_from;
        self.ctx.send_mlme(d, scan);
        d.set_state(State::ActiveScanProbe);
    }

    fn on_scan_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        let bss = match e.body {
            SmeEvent::Confirm(MlmeConfirm::Scan { result: MlmeResult::Success, bss: Some(bss) }) => {
                bss
            }
            SmeEvent::Confirm(MlmeConfirm::Scan { result: MlmeResult::Success, bss: None }) => {
                return self.fail(d, ConnectFailure::NoMatchingBss);
            }
            SmeEvent::Confirm(MlmeConfirm::Scan { result, .. }) => {
                return self.fail(d, ConnectFailure::ScanFailure(result));
            }
            _ => return,
        };
        if self.ctx.is_blacklisted(&bss.bssid, d.now()) {
            return self.fail(d, ConnectFailure::Blacklisted);
        }
        info!("found {} on channel {}", bss.bssid.to_mac_str(), bss.channel);
        let bss = Arc::new(bss);
        self.bss = Some(bss.clone());
        let security = match d.spawn(&SECURITY_MANAGER, SecurityManager::new(self.ctx.clone(), d.current())) {
            Ok(security) => security,
            Err(e) => {
                error!("cannot start security manager: {}", e);
                return self.fail(d, ConnectFailure::ResourceExhausted);
            }
        };
        self.security = Some(security);
        let credential = self
            .request
            .as_ref()
            .map(|request| request.credential.clone())
            .unwrap_or(crate::mgmt::Credential::None);
        d.send(security, SmeEvent::SmJoinStartReq { bss, credential });
        d.set_state(State::SecurityJoinStart);
    }

    fn on_security_join_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        match e.body {
            SmeEvent::SmJoinStartCfm { result: Ok(ie) } => {
                self.security_ie = ie;
                self.join(d);
            }
            SmeEvent::SmJoinStartCfm { result: Err(e) } => {
                self.fail(d, ConnectFailure::SecurityFailure(e))
            }
            _ => {}
        }
    }

    fn join(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if let Some(bss) = self.bss.clone() {
            let security_ie = self.security_ie.add_ref();
            let join_failure_timeout = self.ctx.config.join_failure_timeout_tu;
            self.ctx.send_mlme(d, MlmeRequest::Join { bss, security_ie, join_failure_timeout });
            d.set_state(State::MlmeJoin);
        }
    }

    fn on_join_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        let result = match e.body {
            SmeEvent::Confirm(cfm) => cfm.result(),
            _ => return,
        };
        let bss = match self.bss.clone() {
            Some(bss) => bss,
            None => return,
        };
        match result {
            MlmeResult::Success if bss.is_ibss() => {
                let req = MlmeRequest::StartAdhoc {
                    ssid: bss.ssid().to_vec(),
                    channel: bss.channel,
                    security_ie: self.security_ie.add_ref(),
                };
                self.ctx.send_mlme(d, req);
                d.set_state(State::AdhocStart);
            }
            MlmeResult::Success => {
                self.clear_protection(d, KeyKind::Group);
                d.set_state(State::ProtectionNoneGroup);
            }
            MlmeResult::UnsupportedAkm
                if self.join_attempts + 1 < self.ctx.config.join_attempts =>
            {
                self.join_attempts += 1;
                warn!("join rejected the offered AKM, retrying ({})", self.join_attempts);
                self.join(d);
            }
            result => self.fail(d, ConnectFailure::JoinFailure(result)),
        }
    }

    fn on_adhoc_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        match e.body {
            SmeEvent::Confirm(cfm) if cfm.result().is_success() => {
                self.start_security(d, Payload::EMPTY)
            }
            SmeEvent::Confirm(cfm) => self.fail(d, ConnectFailure::AdhocFailure(cfm.result())),
            _ => {}
        }
    }

    fn clear_protection(&mut self, d: &mut Dispatch<'_, SmeEvent>, kind: KeyKind) {
        if let Some(address) = self.bssid() {
            let req = MlmeRequest::SetProtection { kind, address, protection: Protection::None };
            self.ctx.send_mlme(d, req);
        }
    }

    fn on_group_protection_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        match e.body {
            SmeEvent::Confirm(cfm) if cfm.result().is_success() => {
                self.clear_protection(d, KeyKind::Pairwise);
                d.set_state(State::ProtectionNonePairwise);
            }
            SmeEvent::Confirm(cfm) => self.fail(d, ConnectFailure::ProtectionFailure(cfm.result())),
            _ => {}
        }
    }

    fn on_pairwise_protection_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        match (e.body, self.bssid()) {
            (SmeEvent::Confirm(cfm), Some(bssid)) if cfm.result().is_success() => {
                // Firmware may still hold state from an earlier association with this AP.
                let reason = ReasonCode::LEAVING_NETWORK_DEAUTH;
                self.ctx.send_mlme(d, MlmeRequest::Deauthenticate { bssid, reason });
                d.set_state(State::PrecautionaryDeauth);
            }
            (SmeEvent::Confirm(cfm), _) => {
                self.fail(d, ConnectFailure::ProtectionFailure(cfm.result()))
            }
            _ => {}
        }
    }

    fn on_precautionary_deauth_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        self.authenticate(d);
    }

    fn authenticate(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if let Some(bssid) = self.bssid() {
            let req = MlmeRequest::Authenticate {
                bssid,
                auth_type: self.auth_type,
                auth_failure_timeout: self.ctx.config.auth_failure_timeout_tu,
            };
            self.ctx.send_mlme(d, req);
            d.set_state(State::Authenticate);
        }
    }

    fn on_auth_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let result = match e.body {
            SmeEvent::Confirm(cfm) => cfm.result(),
            _ => return,
        };
        // Teardown has to deauthenticate even if the attempt is being abandoned.
        self.authenticated |= result.is_success();
        if self.should_stop(d) {
            return;
        }
        if result.is_success() {
            return match self.bss.clone() {
                Some(bss) if bss.supports_qos() => {
                    self.ctx.send_mlme(d, MlmeRequest::QosControl { bssid: bss.bssid, enable: true });
                    d.set_state(State::QosControl);
                }
                _ => self.associate(d),
            };
        }
        self.auth_attempts += 1;
        let attempts = self.ctx.config.auth_attempts;
        if self.auth_attempts < attempts {
            warn!("authentication failed ({:?}), attempt {}/{}", result, self.auth_attempts, attempts);
            return self.authenticate(d);
        }
        if self.auth_type == AuthType::OpenSystem && self.ctx.config.allow_shared_key_fallback {
            warn!("open system authentication failed {} times, trying shared key", attempts);
            self.auth_type = AuthType::SharedKey;
            self.auth_attempts = 0;
            return self.authenticate(d);
        }
        self.fail(d, ConnectFailure::AuthenticationFailure(result));
    }

    fn on_qos_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        if let SmeEvent::Confirm(cfm) = e.body {
            if !cfm.result().is_success() {
                warn!("QoS not enabled: {:?}", cfm.result());
            }
        }
        self.associate(d);
    }

    fn ssid_element(&self) -> Payload {
        let ssid = self.bss.as_ref().map(|bss| bss.ssid()).unwrap_or_default();
        let mut buf = vec![];
        match ie::write_ssid(&mut buf, ssid) {
            Ok(()) => Payload::store(buf),
            Err(e) => {
                warn!("not sending SSID element: {}", e);
                Payload::EMPTY
            }
        }
    }

    fn associate(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        let bssid = match self.bssid() {
            Some(bssid) => bssid,
            None => return,
        };
        let security_ie = self.security_ie.add_ref();
        let extra_ies = self.ssid_element();
        let assoc_failure_timeout = self.ctx.config.assoc_failure_timeout_tu;
        match self.roam_from {
            Some(current_bssid) => {
                let req = MlmeRequest::Reassociate {
                    bssid,
                    current_bssid,
                    security_ie,
                    extra_ies,
                    assoc_failure_timeout,
                };
                self.ctx.send_mlme(d, req);
                d.set_state(State::Reassociate);
            }
            None => {
                let req =
                    MlmeRequest::Associate { bssid, security_ie, extra_ies, assoc_failure_timeout };
                self.ctx.send_mlme(d, req);
                d.set_state(State::Associate);
            }
        }
    }

    fn on_assoc_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        let (result, ies) = match e.body {
            SmeEvent::Confirm(MlmeConfirm::Associate { result, ies })
            | SmeEvent::Confirm(MlmeConfirm::Reassociate { result, ies }) => (result, ies),
            _ => return,
        };
        if result.is_success() {
            return self.start_security(d, ies);
        }
        ies.release();
        if result == MlmeResult::InvalidParameters && d.state() == StateId::from(State::Reassociate)
        {
            warn!("reassociation rejected, associating instead");
            self.roam_from = None;
            return self.associate(d);
        }
        self.assoc_attempts += 1;
        let attempts = self.ctx.config.assoc_attempts;
        if self.assoc_attempts < attempts {
            warn!("association failed ({:?}), attempt {}/{}", result, self.assoc_attempts, attempts);
            return self.associate(d);
        }
        self.fail(d, ConnectFailure::AssociationFailure(result));
    }

    fn start_security(&mut self, d: &mut Dispatch<'_, SmeEvent>, assoc_ies: Payload) {
        match self.security {
            Some(security) => {
                d.send(security, SmeEvent::SmConnectStartReq { assoc_ies });
                d.set_state(State::SecurityConnectStart);
            }
            None => self.fail(d, ConnectFailure::ResourceExhausted),
        }
    }

    fn on_security_connect_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.should_stop(d) {
            return;
        }
        match e.body {
            SmeEvent::SmConnectStartCfm { result: Ok(()) } => {
                self.confirmed = true;
                let bssid = self.bssid();
                info!("associated with {}", bssid.unwrap_or_default().to_mac_str());
                d.send(self.selector, SmeEvent::CmConnectCfm { result: ConnectResult::Success, bssid });
                d.set_state(State::Connected);
            }
            SmeEvent::SmConnectStartCfm { result: Err(e) } => {
                self.fail(d, ConnectFailure::SecurityFailure(e))
            }
            _ => {}
        }
    }

    fn link_lost(&mut self, d: &mut Dispatch<'_, SmeEvent>, reason: DisconnectReason) {
        warn!("link lost: {:?}", reason);
        self.disconnect_reason = Some(reason);
        d.send(self.selector, SmeEvent::CmLinkLostInd { reason });
        self.tear_down(d);
    }

    fn on_connected_link_ind(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Indication(ind) = e.body {
            match link_loss_reason(&ind) {
                Some((bssid, reason)) if Some(bssid) == self.bssid() => self.link_lost(d, reason),
                Some((bssid, _)) => debug!("ignoring {:?} for {}", ind, bssid.to_mac_str()),
                None => {}
            }
        }
    }

    fn on_connected_security_ind(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::SmDisconnectInd { reason } = e.body {
            self.link_lost(d, reason);
        }
    }

    fn on_port_open(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        d.send(self.selector, SmeEvent::CmMediaStatusInd { connected: true });
    }

    fn on_connected_terminate(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.disconnect_reason = Some(DisconnectReason::Requested);
        self.tear_down(d);
    }

    fn on_waiting_terminate(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.record(ConnectResult::Cancelled);
        self.tear_down(d);
    }

    fn on_security_terminated(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.security_stopped(d);
    }

    fn on_deauth_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.reset_radio(d);
    }

    fn on_reset_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Confirm(cfm) = e.body {
            if !cfm.result().is_success() {
                warn!("radio reset failed: {:?}", cfm.result());
            }
        }
        d.terminate();
    }

    fn on_terminate_req(&mut self, _d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.record(ConnectResult::Cancelled);
        self.terminate_requested = true;
    }

    fn on_link_ind(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Indication(ind) = e.body {
            if let Some((_, reason)) = link_loss_reason(&ind) {
                self.disconnect_reason.get_or_insert(reason);
                self.record(ConnectResult::Failed(ConnectFailure::Disconnected(reason)));
                self.terminate_requested = true;
            }
        }
    }

    fn on_security_ind(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::SmDisconnectInd { reason } = e.body {
            self.disconnect_reason.get_or_insert(reason);
            self.record(ConnectResult::Failed(ConnectFailure::Disconnected(reason)));
            self.terminate_requested = true;
        }
    }

    fn on_security_gone(&mut self, _d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.security = None;
    }

    fn ignore(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        debug!("{} ignoring {:?} in state {:?}", d.current(), e.id(), d.state());
    }
}

pub(crate) static CONNECTION_MANAGER: Descriptor<SmeEvent, ConnectionManager> = Descriptor {
    name: "ConnectionManager",
    initial: StateId(State::WaitingForJoin as u16),
    states: &[
        StateTable {
            name: "WaitingForJoin",
            save_all: false,
            transitions: transitions![
                Id::CmJoinReq => ConnectionManager::on_join_req,
                Id::CmTerminateReq => ConnectionManager::on_waiting_terminate,
            ],
        },
        StateTable {
            name: "ActiveScanProbe",
            save_all: false,
            transitions: transitions![Id::ScanCfm => ConnectionManager::on_scan_cfm],
        },
        StateTable {
            name: "SecurityJoinStart",
            save_all: false,
            transitions: transitions![
                Id::SmJoinStartCfm => ConnectionManager::on_security_join_cfm,
            ],
        },
        StateTable {
            name: "MlmeJoin",
            save_all: false,
            transitions: transitions![Id::JoinCfm => ConnectionManager::on_join_cfm],
        },
        StateTable {
            name: "AdhocStart",
            save_all: false,
            transitions: transitions![Id::StartAdhocCfm => ConnectionManager::on_adhoc_cfm],
        },
        StateTable {
            name: "ProtectionNoneGroup",
            save_all: false,
            transitions: transitions![
                Id::SetProtectionCfm => ConnectionManager::on_group_protection_cfm,
            ],
        },
        StateTable {
            name: "ProtectionNonePairwise",
            save_all: false,
            transitions: transitions![
                Id::SetProtectionCfm => ConnectionManager::on_pairwise_protection_cfm,
            ],
        },
        StateTable {
            name: "PrecautionaryDeauth",
            save_all: false,
            transitions: transitions![
                Id::DeauthenticateCfm => ConnectionManager::on_precautionary_deauth_cfm,
            ],
        },
        StateTable {
            name: "Authenticate",
            save_all: false,
            transitions: transitions![Id::AuthenticateCfm => ConnectionManager::on_auth_cfm],
        },
        StateTable {
            name: "QosControl",
            save_all: false,
            transitions: transitions![Id::QosControlCfm => ConnectionManager::on_qos_cfm],
        },
        StateTable {
            name: "Associate",
            save_all: false,
            transitions: transitions![Id::AssociateCfm => ConnectionManager::on_assoc_cfm],
        },
        StateTable {
            name: "Reassociate",
            save_all: false,
            transitions: transitions![Id::ReassociateCfm => ConnectionManager::on_assoc_cfm],
        },
        StateTable {
            name: "SecurityConnectStart",
            save_all: false,
            transitions: transitions![
                Id::SmConnectStartCfm => ConnectionManager::on_security_connect_cfm,
            ],
        },
        StateTable {
            name: "Connected",
            save_all: false,
            transitions: transitions![
                Id::CmTerminateReq => ConnectionManager::on_connected_terminate,
                Id::DeauthenticateInd => ConnectionManager::on_connected_link_ind,
                Id::DisassociateInd => ConnectionManager::on_connected_link_ind,
                Id::BeaconLossInd => ConnectionManager::on_connected_link_ind,
                Id::SmDisconnectInd => ConnectionManager::on_connected_security_ind,
                Id::SmPortOpenInd => ConnectionManager::on_port_open,
            ],
        },
        StateTable {
            name: "SecurityConnectStop",
            save_all: false,
            transitions: transitions![
                Id::SmTerminatedInd => ConnectionManager::on_security_terminated,
            ],
        },
        StateTable {
            name: "Deauthenticate",
            save_all: false,
            transitions: transitions![Id::DeauthenticateCfm => ConnectionManager::on_deauth_cfm],
        },
        StateTable {
            name: "RadioReset",
            save_all: false,
            transitions: transitions![Id::ResetCfm => ConnectionManager::on_reset_cfm],
        },
    ],
    default: transitions![
        Id::CmTerminateReq => ConnectionManager::on_terminate_req,
        Id::DeauthenticateInd => ConnectionManager::on_link_ind,
        Id::DisassociateInd => ConnectionManager::on_link_ind,
        Id::BeaconLossInd => ConnectionManager::on_link_ind,
        Id::ConnectedInd => ConnectionManager::ignore,
        Id::SmDisconnectInd => ConnectionManager::on_security_ind,
        Id::SmPortOpenInd => ConnectionManager::ignore,
        Id::SmTerminatedInd => ConnectionManager::on_security_gone,
    ],
    ignore: &[
        Id::CmTerminateReq,
        Id::DeauthenticateInd,
        Id::DisassociateInd,
        Id::BeaconLossInd,
        Id::ConnectedInd,
        Id::SmDisconnectInd,
        Id::SmPortOpenInd,
    ],
    entry: Some(ConnectionManager::entry),
    reset: Some(ConnectionManager::reset),
};
