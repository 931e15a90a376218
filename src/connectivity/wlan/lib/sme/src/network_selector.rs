// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Arbitrates between management requests. The newest request always wins: whatever is active
//! is told to terminate and the request waits in the saved queue until it has.

use {
    crate::{
        bss::{MacAddr, MacFmt, Ssid},
        connection_manager::{ConnectionManager, CONNECTION_MANAGER},
        context::SmeContext,
        event::{SmeEvent, SmeEventId as Id},
        mgmt::{
            AppHandle, ConnectFailure, ConnectRequest, ConnectResult, MgmtEvent, MgmtRequest,
            MgmtStatus, WpsResult,
        },
        mlme::DisconnectReason,
        wps::{Wps, WPS},
    },
    log::{debug, error, info, warn},
    std::sync::Arc,
    wlan_fsm::{transitions, Descriptor, Dispatch, Event, InstanceId, StateId, StateTable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
enum State {
    Stopped,
    Disconnected,
    Connecting,
    Connected,
    TerminatingActiveProcess,
    Disconnecting,
    WaitingForMgmtDisconnected,
    CancellingConnectionSetup,
    WpsActive,
}

impl From<State> for StateId {
    fn from(state: State) -> StateId {
        StateId(state as u16)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Connect,
    ProfileConnect,
    Roam,
}

/// Who asked for the connection in progress, and therefore who gets its confirm.
#[derive(Clone, Copy, Debug)]
struct Source {
    handle: AppHandle,
    origin: Origin,
}

impl Source {
    fn confirm(&self, result: ConnectResult) -> MgmtEvent {
        let handle = self.handle;
        match self.origin {
            Origin::Connect => MgmtEvent::ConnectCfm { handle, result },
            Origin::ProfileConnect => MgmtEvent::ProfileConnectCfm { handle, result },
            Origin::Roam => MgmtEvent::RoamCfm { handle, result },
        }
    }
}

fn rejection(handle: AppHandle, req: &MgmtRequest, failure: ConnectFailure) -> MgmtEvent {
    let status = match failure {
        ConnectFailure::NotStarted => MgmtStatus::NotStarted,
        _ => MgmtStatus::NotConnected,
    };
    let result = ConnectResult::Failed(failure);
    match req {
        MgmtRequest::Start => MgmtEvent::StartCfm { handle, status },
        MgmtRequest::Stop => MgmtEvent::StopCfm { handle, status },
        MgmtRequest::Connect(_) => MgmtEvent::ConnectCfm { handle, result },
        MgmtRequest::ProfileConnect(_) => MgmtEvent::ProfileConnectCfm { handle, result },
        MgmtRequest::Disconnect => MgmtEvent::DisconnectCfm { handle, status },
        MgmtRequest::Wps(_) => MgmtEvent::WpsCfm { handle, result: WpsResult::Failed },
        MgmtRequest::Roam { .. } => MgmtEvent::RoamCfm { handle, result },
    }
}

pub(crate) struct NetworkSelector {
    ctx: Arc<SmeContext>,
    connection: Option<InstanceId>,
    source: Option<Source>,
    disconnect_source: Option<AppHandle>,
    wps_source: Option<AppHandle>,
    /// The network last asked for; roams stay within it.
    network: Option<ConnectRequest>,
    bssid: Option<MacAddr>,
    media_connected: bool,
}

impl NetworkSelector {
    pub fn new(ctx: Arc<SmeContext>) -> Self {
        Self {
            ctx,
            connection: None,
            source: None,
            disconnect_source: None,
            wps_source: None,
            network: None,
            bssid: None,
            media_connected: false,
        }
    }

    pub fn network(&self) -> Option<&Ssid> {
        self.network.as_ref().map(|network| &network.ssid)
    }

    pub fn bssid(&self) -> Option<MacAddr> {
        self.bssid
    }

    pub fn media_connected(&self) -> bool {
        self.media_connected
    }

    fn set_media(&mut self, connected: bool) {
        if self.media_connected != connected {
            self.media_connected = connected;
            self.ctx.send_mgmt(MgmtEvent::MediaStatusInd { connected });
        }
    }

    fn start_connection(
        &mut self,
        d: &mut Dispatch<'_, SmeEvent>,
        source: Source,
        request: ConnectRequest,
        roam_from: Option<MacAddr>,
    ) {
        let cm = ConnectionManager::new(self.ctx.clone(), d.current());
        match d.spawn(&CONNECTION_MANAGER, cm) {
            Ok(connection) => {
                d.send(connection, SmeEvent::CmJoinReq { request: request.clone(), roam_from });
                self.connection = Some(connection);
                self.source = Some(source);
                self.network = Some(request);
                d.set_state(State::Connecting);
            }
            Err(e) => {
                error!("cannot start connection manager: {}", e);
                let failure = ConnectResult::Failed(ConnectFailure::ResourceExhausted);
                self.ctx.send_mgmt(source.confirm(failure));
            }
        }
    }

    fn terminate_connection(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if let Some(connection) = self.connection {
            d.send(connection, SmeEvent::CmTerminateReq);
        }
    }

    fn on_stopped_start(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, .. } = e.body {
            info!("SME started");
            self.ctx.send_mgmt(MgmtEvent::StartCfm { handle, status: MgmtStatus::Success });
            d.set_state(State::Disconnected);
        }
    }

    fn on_stopped_stop(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, .. } = e.body {
            self.ctx.send_mgmt(MgmtEvent::StopCfm { handle, status: MgmtStatus::Success });
        }
    }

    fn reject_not_started(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, req } = e.body {
            warn!("{:?} rejected: not started", req);
            self.ctx.send_mgmt(rejection(handle, &req, ConnectFailure::NotStarted));
        }
    }

    fn on_connect(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (handle, req) = match e.body {
            SmeEvent::Mgmt { handle, req } => (handle, req),
            _ => return,
        };
        let (origin, request) = match req {
            MgmtRequest::Connect(request) => (Origin::Connect, request),
            MgmtRequest::ProfileConnect(request) => (Origin::ProfileConnect, request),
            _ => return,
        };
        self.bssid = None;
        self.start_connection(d, Source { handle, origin }, request, None);
    }

    fn on_roam(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (handle, req) = match e.body {
            SmeEvent::Mgmt { handle, req } => (handle, req),
            _ => return,
        };
        let target = match req {
            MgmtRequest::Roam { bssid } => bssid,
            _ => return,
        };
        match self.network.clone() {
            Some(mut request) => {
                info!("roaming to {}", target.to_mac_str());
                request.bssid = Some(target);
                let roam_from = self.bssid.take();
                self.start_connection(d, Source { handle, origin: Origin::Roam }, request, roam_from);
            }
            None => {
                warn!("roam to {} without a network", target.to_mac_str());
                self.ctx.send_mgmt(rejection(handle, &req, ConnectFailure::NotConnected));
            }
        }
    }

    fn on_idle_disconnect(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, .. } = e.body {
            self.network = None;
            self.bssid = None;
            self.ctx.send_mgmt(MgmtEvent::DisconnectCfm { handle, status: MgmtStatus::Success });
        }
    }

    fn on_wps(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (handle, method) = match e.body {
            SmeEvent::Mgmt { handle, req: MgmtRequest::Wps(method) } => (handle, method),
            _ => return,
        };
        match d.spawn_sub(&WPS, Wps::new(self.ctx.clone(), method)) {
            Ok(_) => {
                self.wps_source = Some(handle);
                d.set_state(State::WpsActive);
            }
            Err(e) => {
                error!("cannot start WPS: {}", e);
                self.ctx.send_mgmt(MgmtEvent::WpsCfm { handle, result: WpsResult::Failed });
            }
        }
    }

    fn on_stop(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, .. } = e.body {
            info!("SME stopped");
            self.network = None;
            self.bssid = None;
            self.ctx.send_mgmt(MgmtEvent::StopCfm { handle, status: MgmtStatus::Success });
            d.set_state(State::Stopped);
        }
    }

    fn on_start(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, .. } = e.body {
            self.ctx.send_mgmt(MgmtEvent::StartCfm { handle, status: MgmtStatus::Success });
        }
    }

    fn on_connect_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (result, bssid) = match e.body {
            SmeEvent::CmConnectCfm { result, bssid } => (result, bssid),
            _ => return,
        };
        let success = result.is_success();
        if let Some(source) = self.source.take() {
            self.ctx.send_mgmt(source.confirm(result));
        }
        if d.state() != StateId::from(State::Connecting) {
            return;
        }
        if success {
            self.bssid = bssid;
            d.set_state(State::Connected);
        } else {
            d.set_state(State::WaitingForMgmtDisconnected);
        }
    }

    fn on_disconnect_active(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, .. } = e.body {
            self.disconnect_source = Some(handle);
            self.network = None;
            self.terminate_connection(d);
            if d.state() == StateId::from(State::Connecting) {
                d.set_state(State::CancellingConnectionSetup);
            } else {
                d.set_state(State::Disconnecting);
            }
        }
    }

    fn preempt(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        debug!("{:?} pre-empts the active connection", e.id());
        self.terminate_connection(d);
        d.save(e);
        d.set_state(State::TerminatingActiveProcess);
    }

    fn on_link_lost(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::CmLinkLostInd { reason } = e.body {
            self.ctx.send_mgmt(MgmtEvent::RoamInd { reason });
            self.set_media(false);
            d.set_state(State::WaitingForMgmtDisconnected);
        }
    }

    fn on_stale_link_lost(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        debug!("link loss while already leaving: {:?}", e.body);
        self.set_media(false);
    }

    fn on_unsolicited_wps_complete(
        &mut self,
        d: &mut Dispatch<'_, SmeEvent>,
        _e: Event<SmeEvent>,
    ) {
        debug!("dropping WPS completion with no registration running, state {:?}", d.state());
    }

    fn on_media_status(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::CmMediaStatusInd { connected } = e.body {
            self.set_media(connected);
        }
    }

    fn connection_gone(&mut self, d: &mut Dispatch<'_, SmeEvent>, reason: Option<DisconnectReason>) {
        debug!("connection manager gone ({:?})", reason);
        self.connection = None;
        self.set_media(false);
        d.set_state(State::Disconnected);
    }

    fn on_disconnected_ind(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::CmDisconnectedInd { reason } = e.body {
            if let Some(handle) = self.disconnect_source.take() {
                self.ctx.send_mgmt(MgmtEvent::DisconnectCfm { handle, status: MgmtStatus::Success });
            }
            self.connection_gone(d, reason);
        }
    }

    fn on_wps_done(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::WpsDoneInd { result } = e.body {
            info!("WPS finished: {:?}", result);
            if let Some(handle) = self.wps_source.take() {
                self.ctx.send_mgmt(MgmtEvent::WpsCfm { handle, result });
            }
            d.set_state(State::Disconnected);
        }
    }
}

pub(crate) static NETWORK_SELECTOR: Descriptor<SmeEvent, NetworkSelector> = Descriptor {
    name: "NetworkSelector",
    initial: StateId(State::Stopped as u16),
    states: &[
        StateTable {
            name: "Stopped",
            save_all: false,
            transitions: transitions![
                Id::StartReq => NetworkSelector::on_stopped_start,
                Id::StopReq => NetworkSelector::on_stopped_stop,
                Id::ConnectReq => NetworkSelector::reject_not_started,
                Id::ProfileConnectReq => NetworkSelector::reject_not_started,
                Id::DisconnectReq => NetworkSelector::reject_not_started,
                Id::WpsReq => NetworkSelector::reject_not_started,
                Id::RoamReq => NetworkSelector::reject_not_started,
            ],
        },
        StateTable {
            name: "Disconnected",
            save_all: false,
            transitions: transitions![
                Id::StopReq => NetworkSelector::on_stop,
                Id::ConnectReq => NetworkSelector::on_connect,
                Id::ProfileConnectReq => NetworkSelector::on_connect,
                Id::DisconnectReq => NetworkSelector::on_idle_disconnect,
                Id::WpsReq => NetworkSelector::on_wps,
                Id::RoamReq => NetworkSelector::on_roam,
            ],
        },
        StateTable {
            name: "Connecting",
            save_all: false,
            transitions: transitions![
                Id::CmConnectCfm => NetworkSelector::on_connect_cfm,
                Id::DisconnectReq => NetworkSelector::on_disconnect_active,
                Id::StopReq => NetworkSelector::preempt,
                Id::ConnectReq => NetworkSelector::preempt,
                Id::ProfileConnectReq => NetworkSelector::preempt,
                Id::WpsReq => NetworkSelector::preempt,
                Id::RoamReq => NetworkSelector::preempt,
            ],
        },
        StateTable {
            name: "Connected",
            save_all: false,
            transitions: transitions![
                Id::CmLinkLostInd => NetworkSelector::on_link_lost,
                Id::DisconnectReq => NetworkSelector::on_disconnect_active,
                Id::StopReq => NetworkSelector::preempt,
                Id::ConnectReq => NetworkSelector::preempt,
                Id::ProfileConnectReq => NetworkSelector::preempt,
                Id::WpsReq => NetworkSelector::preempt,
                Id::RoamReq => NetworkSelector::preempt,
            ],
        },
        StateTable {
            name: "TerminatingActiveProcess",
            save_all: true,
            transitions: transitions![
                Id::CmConnectCfm => NetworkSelector::on_connect_cfm,
                Id::CmDisconnectedInd => NetworkSelector::on_disconnected_ind,
            ],
        },
        StateTable {
            name: "Disconnecting",
            save_all: true,
            transitions: transitions![
                Id::CmDisconnectedInd => NetworkSelector::on_disconnected_ind,
            ],
        },
        StateTable {
            name: "WaitingForMgmtDisconnected",
            save_all: true,
            transitions: transitions![
                Id::CmDisconnectedInd => NetworkSelector::on_disconnected_ind,
            ],
        },
        StateTable {
            name: "CancellingConnectionSetup",
            save_all: true,
            transitions: transitions![
                Id::CmConnectCfm => NetworkSelector::on_connect_cfm,
                Id::CmDisconnectedInd => NetworkSelector::on_disconnected_ind,
            ],
        },
        StateTable {
            name: "WpsActive",
            save_all: true,
            transitions: transitions![Id::WpsDoneInd => NetworkSelector::on_wps_done],
        },
    ],
    default: transitions![
        Id::StartReq => NetworkSelector::on_start,
        Id::CmMediaStatusInd => NetworkSelector::on_media_status,
        Id::CmLinkLostInd => NetworkSelector::on_stale_link_lost,
        Id::WpsCompleteInd => NetworkSelector::on_unsolicited_wps_complete,
    ],
    ignore: &[Id::WpsCompleteInd],
    entry: None,
    reset: None,
};

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            mgmt::{Credential, WpsMethod},
            mlme::{MlmeIndication, MlmeRequest, MlmeResult, ReasonCode},
            test_utils::{fake_bss, SmeHarness},
        },
        test_case::test_case,
        wlan_fsm::assert_variant,
    };

    #[test]
    fn start_and_stop() {
        let mut h = SmeHarness::stopped();
        assert_eq!(h.sme.status().state, "Stopped");
        h.sap.start(AppHandle(1));
        h.run();
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::StartCfm { handle: AppHandle(1), status: MgmtStatus::Success }]
        );
        assert_eq!(h.sme.status().state, "Disconnected");
        h.sap.stop(AppHandle(2));
        h.run();
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::StopCfm { handle: AppHandle(2), status: MgmtStatus::Success }]
        );
        assert_eq!(h.sme.status().state, "Stopped");
    }

    #[test_case(MgmtRequest::Connect(fake_bss::request(b"foo")); "connect")]
    #[test_case(MgmtRequest::ProfileConnect(fake_bss::request(b"foo")); "profile connect")]
    #[test_case(MgmtRequest::Disconnect; "disconnect")]
    #[test_case(MgmtRequest::Wps(WpsMethod::PushButton); "wps")]
    #[test_case(MgmtRequest::Roam { bssid: fake_bss::BSSID }; "roam")]
    fn requests_rejected_when_stopped(req: MgmtRequest) {
        let mut h = SmeHarness::stopped();
        let expected = rejection(AppHandle(3), &req, ConnectFailure::NotStarted);
        h.sap.submit(AppHandle(3), req);
        h.run();
        assert_eq!(h.drain_mgmt(), vec![expected]);
        assert!(h.drain_mlme().is_empty());
        assert_eq!(h.sme.status().state, "Stopped");
    }

    #[test]
    fn connect_confirms_exactly_once() {
        let mut h = SmeHarness::new();
        h.connect_to(fake_bss::open(b"open"), fake_bss::request(b"open"));
        assert_eq!(
            h.drain_mgmt(),
            vec![
                MgmtEvent::ConnectCfm { handle: AppHandle(1), result: ConnectResult::Success },
                MgmtEvent::MediaStatusInd { connected: true },
            ]
        );
        let status = h.sme.status();
        assert_eq!(status.state, "Connected");
        assert_eq!(status.network, Some(b"open".to_vec()));
        assert_eq!(status.bssid, Some(fake_bss::BSSID));
        assert!(status.media_connected);
    }

    #[test]
    fn profile_connect_is_confirmed_as_such() {
        let mut h = SmeHarness::new();
        h.sap.profile_connect(AppHandle(4), fake_bss::request(b"open"));
        h.run();
        h.reply_scan(Some(fake_bss::open(b"open")));
        h.reply_all(MlmeResult::Success);
        assert!(h.drain_mgmt().contains(&MgmtEvent::ProfileConnectCfm {
            handle: AppHandle(4),
            result: ConnectResult::Success
        }));
    }

    #[test]
    fn disconnect_while_connecting_cancels() {
        let mut h = SmeHarness::new();
        h.sap.connect(AppHandle(1), fake_bss::request(b"open"));
        h.run();
        h.reply_scan(Some(fake_bss::open(b"open")));
        h.reply_until(MlmeResult::Success, |req| matches!(req, MlmeRequest::Authenticate { .. }));
        h.sap.disconnect(AppHandle(2));
        h.run();
        assert_eq!(h.sme.status().state, "CancellingConnectionSetup");
        h.reply_all(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![
                MgmtEvent::ConnectCfm { handle: AppHandle(1), result: ConnectResult::Cancelled },
                MgmtEvent::DisconnectCfm { handle: AppHandle(2), status: MgmtStatus::Success },
            ]
        );
        // The authentication completed before the cancellation was acted on.
        assert_variant!(
            h.sent_mlme().as_slice(),
            [.., MlmeRequest::Authenticate { .. }, MlmeRequest::Deauthenticate { .. }, MlmeRequest::Reset]
        );
        assert_eq!(h.sme.status().state, "Disconnected");
        assert_eq!(h.sme.status().network, None);
    }

    #[test]
    fn newer_connect_preempts_active_one() {
        let mut h = SmeHarness::new();
        h.sap.connect(AppHandle(1), fake_bss::request(b"first"));
        h.run();
        h.sap.connect(AppHandle(2), fake_bss::request(b"second"));
        h.run();
        assert_eq!(h.sme.status().state, "TerminatingActiveProcess");
        h.reply_scan(Some(fake_bss::open(b"first")));
        h.reply_all_but_scan(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::ConnectCfm { handle: AppHandle(1), result: ConnectResult::Cancelled }]
        );
        assert_variant!(h.drain_mlme().last(), Some(MlmeRequest::Scan { ssid, .. }) => {
            assert_eq!(ssid, b"second");
        });
        h.reply_scan(Some(fake_bss::open(b"second")));
        h.reply_all(MlmeResult::Success);
        assert!(h.drain_mgmt().contains(&MgmtEvent::ConnectCfm {
            handle: AppHandle(2),
            result: ConnectResult::Success
        }));
        assert_eq!(h.sme.status().network, Some(b"second".to_vec()));
    }

    #[test]
    fn stop_while_connected_tears_down_first() {
        let mut h = SmeHarness::new();
        h.connect_to(fake_bss::open(b"open"), fake_bss::request(b"open"));
        h.drain_mgmt();
        h.sap.stop(AppHandle(8));
        h.run();
        h.reply_all(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![
                MgmtEvent::MediaStatusInd { connected: false },
                MgmtEvent::StopCfm { handle: AppHandle(8), status: MgmtStatus::Success },
            ]
        );
        assert_eq!(h.sme.status().state, "Stopped");
    }

    #[test]
    fn link_loss_indicates_roam_upstream() {
        let mut h = SmeHarness::new();
        h.connect_to(fake_bss::open(b"open"), fake_bss::request(b"open"));
        h.drain_mgmt();
        h.proxy.indication(MlmeIndication::BeaconLoss { bssid: fake_bss::BSSID });
        h.run();
        assert_eq!(h.sme.status().state, "WaitingForMgmtDisconnected");
        h.reply_all(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![
                MgmtEvent::RoamInd { reason: DisconnectReason::BeaconLoss },
                MgmtEvent::MediaStatusInd { connected: false },
            ]
        );
        assert_eq!(h.sme.status().state, "Disconnected");
        // No local retry.
        assert_variant!(h.sent_mlme().last(), Some(MlmeRequest::Reset));
    }

    #[test]
    fn roam_after_link_loss_reassociates() {
        let mut h = SmeHarness::new();
        h.connect_to(fake_bss::open(b"open"), fake_bss::request(b"open"));
        let reason = ReasonCode::INACTIVITY;
        h.proxy.indication(MlmeIndication::Disassociate { bssid: fake_bss::BSSID, reason });
        h.sap.roam(AppHandle(6), fake_bss::OTHER_BSSID);
        h.run();
        h.reply_all_but_scan(MlmeResult::Success);
        assert_variant!(h.drain_mlme().last(), Some(MlmeRequest::Scan { bssid, .. }) => {
            assert_eq!(*bssid, Some(fake_bss::OTHER_BSSID));
        });
        h.reply_scan(Some(fake_bss::with_bssid(fake_bss::open(b"open"), fake_bss::OTHER_BSSID)));
        h.reply_all(MlmeResult::Success);
        assert!(h.sent_mlme().iter().any(|req| matches!(
            req,
            MlmeRequest::Reassociate { current_bssid: fake_bss::BSSID, .. }
        )));
        assert!(h.drain_mgmt().contains(&MgmtEvent::RoamCfm {
            handle: AppHandle(6),
            result: ConnectResult::Success
        }));
        assert_eq!(h.sme.status().bssid, Some(fake_bss::OTHER_BSSID));
    }

    #[test]
    fn roam_without_network_is_rejected() {
        let mut h = SmeHarness::new();
        h.sap.roam(AppHandle(6), fake_bss::OTHER_BSSID);
        h.run();
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::RoamCfm {
                handle: AppHandle(6),
                result: ConnectResult::Failed(ConnectFailure::NotConnected)
            }]
        );
    }

    #[test]
    fn wps_delivers_credential() {
        let mut h = SmeHarness::new();
        h.sap.wps(AppHandle(1), WpsMethod::PushButton);
        h.run();
        assert_eq!(h.sme.status().state, "WpsActive");
        assert_eq!(h.drain_mlme(), vec![MlmeRequest::WpsStart { method: WpsMethod::PushButton }]);
        h.reply(MlmeResult::Success);
        let credential = ConnectRequest::new(b"home".to_vec(), Credential::Psk([7; 32]));
        h.proxy.indication(MlmeIndication::WpsComplete { credential: Some(credential.clone()) });
        h.run();
        assert_eq!(h.drain_mlme(), vec![MlmeRequest::WpsStop]);
        h.reply(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::WpsCfm { handle: AppHandle(1), result: WpsResult::Success(credential) }]
        );
        assert_eq!(h.sme.status().state, "Disconnected");
    }

    #[test]
    fn wps_walk_time_expires() {
        let mut h = SmeHarness::new();
        h.sap.wps(AppHandle(1), WpsMethod::Pin(*b"12345670"));
        h.run();
        h.reply(MlmeResult::Success);
        let walk_time = h.config().wps_walk_time();
        h.advance(walk_time);
        h.reply_all(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::WpsCfm { handle: AppHandle(1), result: WpsResult::WalkTimeExpired }]
        );
        assert_eq!(h.sme.status().state, "Disconnected");
    }

    #[test]
    fn wps_completion_after_walk_time_is_dropped() {
        let mut h = SmeHarness::new();
        h.sap.wps(AppHandle(1), WpsMethod::PushButton);
        h.run();
        h.reply(MlmeResult::Success);
        let walk_time = h.config().wps_walk_time();
        h.advance(walk_time);
        h.reply_all(MlmeResult::Success);
        h.drain_mgmt();
        h.drain_mlme();
        assert_eq!(h.sme.status().state, "Disconnected");

        let credential = ConnectRequest::new(b"home".to_vec(), Credential::Psk([7; 32]));
        h.proxy.indication(MlmeIndication::WpsComplete { credential: Some(credential) });
        h.proxy.indication(MlmeIndication::WpsComplete { credential: None });
        h.run();
        assert_eq!(h.sme.status().state, "Disconnected");
        assert!(h.drain_mgmt().is_empty());
        assert!(h.drain_mlme().is_empty());
    }

    #[test]
    fn connect_preempts_wps() {
        let mut h = SmeHarness::new();
        h.sap.wps(AppHandle(1), WpsMethod::PushButton);
        h.run();
        h.sap.connect(AppHandle(2), fake_bss::request(b"open"));
        h.run();
        // The start confirm is still outstanding; the stop goes out once it arrives.
        assert_eq!(h.drain_mlme(), vec![MlmeRequest::WpsStart { method: WpsMethod::PushButton }]);
        h.reply(MlmeResult::Success);
        assert_eq!(h.drain_mlme(), vec![MlmeRequest::WpsStop]);
        h.reply(MlmeResult::Success);
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::WpsCfm { handle: AppHandle(1), result: WpsResult::Cancelled }]
        );
        assert_eq!(h.sme.status().state, "Connecting");
        assert_variant!(h.drain_mlme().as_slice(), [MlmeRequest::Scan { .. }]);
    }

    #[test]
    fn start_is_idempotent() {
        let mut h = SmeHarness::new();
        h.sap.start(AppHandle(9));
        h.run();
        assert_eq!(
            h.drain_mgmt(),
            vec![MgmtEvent::StartCfm { handle: AppHandle(9), status: MgmtStatus::Success }]
        );
        assert_eq!(h.sme.status().state, "Disconnected");
    }
}
