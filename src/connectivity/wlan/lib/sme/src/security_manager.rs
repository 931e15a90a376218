// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-connection security: picks the security IE for the join, installs the keys the
//! supplicant derives, opens the controlled port and watches for MIC failures.

use {
    crate::{
        bss::{MacAddr, MacFmt},
        context::SmeContext,
        event::{SmeEvent, SmeEventId as Id, SmeTimeout},
        ie::policy::{self, SecuritySelection},
        mlme::{DisconnectReason, KeyKind, MlmeConfirm, MlmeIndication, MlmeRequest, Protection},
        payload::Payload,
    },
    bitflags::bitflags,
    log::{debug, error, info, warn},
    std::{sync::Arc, time::Duration},
    wlan_fsm::{transitions, Descriptor, Dispatch, Event, InstanceId, StateId, StateTable, TimerId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
enum State {
    Ready,
    ReadyToAuth,
    WaitingForKeys,
    OpeningControlPort,
    ControlPortOpen,
    WaitingForConfirmations,
    WaitingForTerminate,
}

impl From<State> for StateId {
    fn from(state: State) -> StateId {
        StateId(state as u16)
    }
}

bitflags! {
    /// Progress of key installation, one group of bits per key kind.
    pub(crate) struct KeyFlags: u16 {
        const PAIRWISE_SET = 1 << 0;
        const PAIRWISE_RX_PENDING = 1 << 1;
        const PAIRWISE_RXTX_PENDING = 1 << 2;
        const PAIRWISE_COMPLETE = 1 << 3;
        const GROUP_SET = 1 << 4;
        const GROUP_RX_PENDING = 1 << 5;
        const GROUP_RXTX_PENDING = 1 << 6;
        const GROUP_COMPLETE = 1 << 7;
        const STOP_REQUESTED = 1 << 8;
        const MIC_FAILURE_SEEN_ONCE = 1 << 9;
    }
}

impl KeyFlags {
    fn key_set(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Pairwise => Self::PAIRWISE_SET,
            KeyKind::Group => Self::GROUP_SET,
        }
    }

    fn rx_pending(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Pairwise => Self::PAIRWISE_RX_PENDING,
            KeyKind::Group => Self::GROUP_RX_PENDING,
        }
    }

    fn rxtx_pending(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Pairwise => Self::PAIRWISE_RXTX_PENDING,
            KeyKind::Group => Self::GROUP_RXTX_PENDING,
        }
    }

    fn complete(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Pairwise => Self::PAIRWISE_COMPLETE,
            KeyKind::Group => Self::GROUP_COMPLETE,
        }
    }

    fn key(kind: KeyKind) -> Self {
        Self::key_set(kind) | Self::rx_pending(kind) | Self::rxtx_pending(kind) | Self::complete(kind)
    }

    fn in_progress() -> Self {
        Self::PAIRWISE_RX_PENDING
            | Self::PAIRWISE_RXTX_PENDING
            | Self::GROUP_RX_PENDING
            | Self::GROUP_RXTX_PENDING
    }
}

const KINDS: [KeyKind; 2] = [KeyKind::Pairwise, KeyKind::Group];

fn slot(kind: KeyKind) -> usize {
    match kind {
        KeyKind::Pairwise => 0,
        KeyKind::Group => 1,
    }
}

pub(crate) struct SecurityManager {
    ctx: Arc<SmeContext>,
    connection: InstanceId,
    bssid: MacAddr,
    selection: Option<SecuritySelection>,
    flags: KeyFlags,
    /// Per key kind: the supplicant still has to transmit the handshake confirm, so the key
    /// may only protect received frames for now.
    awaiting_confirm_tx: [bool; 2],
    outstanding: usize,
    scan_paused: bool,
    handshake_timer: Option<TimerId>,
    mic_window: Option<TimerId>,
}

impl SecurityManager {
    pub fn new(ctx: Arc<SmeContext>, connection: InstanceId) -> Self {
        Self {
            ctx,
            connection,
            bssid: [0; 6],
            selection: None,
            flags: KeyFlags::empty(),
            awaiting_confirm_tx: [false; 2],
            outstanding: 0,
            scan_paused: false,
            handshake_timer: None,
            mic_window: None,
        }
    }

    fn entry(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        self.ctx.routing.lock().set_security_owner(d.current());
    }

    fn reset(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        let dropped = self.ctx.routing.lock().forget(d.current());
        if dropped > 0 {
            warn!("security manager {} gone with {} request(s) unanswered", d.current(), dropped);
        }
        d.send(self.connection, SmeEvent::SmTerminatedInd);
    }

    fn request(&mut self, d: &mut Dispatch<'_, SmeEvent>, req: MlmeRequest) {
        self.outstanding += 1;
        self.ctx.send_mlme(d, req);
    }

    fn confirmed(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    fn pause_scan(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if !self.scan_paused {
            self.scan_paused = true;
            self.request(d, MlmeRequest::ScanPause { pause: true });
        }
    }

    fn resume_scan(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if self.scan_paused {
            self.scan_paused = false;
            self.request(d, MlmeRequest::ScanPause { pause: false });
        }
    }

    fn fail(&mut self, d: &mut Dispatch<'_, SmeEvent>, reason: DisconnectReason) {
        error!("security failure on {}: {:?}", self.bssid.to_mac_str(), reason);
        d.send(self.connection, SmeEvent::SmDisconnectInd { reason });
    }

    fn join_start(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (bss, credential) = match e.body {
            SmeEvent::SmJoinStartReq { bss, credential } => (bss, credential),
            _ => return,
        };
        self.bssid = bss.bssid;
        let result = match policy::select(&bss, &credential, &self.ctx.config.security) {
            Ok(selection) => {
                info!("{:?} selected for {}", selection.protocol, bss.bssid.to_mac_str());
                let ie = Payload::store(selection.ie.clone());
                self.selection = Some(selection);
                d.set_state(State::ReadyToAuth);
                Ok(ie)
            }
            Err(e) => {
                warn!("no usable security configuration for {}: {}", bss.bssid.to_mac_str(), e);
                Err(e)
            }
        };
        d.send(self.connection, SmeEvent::SmJoinStartCfm { result });
    }

    fn connect_start(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::SmConnectStartReq { assoc_ies } = e.body {
            debug!("association response carried {} IE bytes", assoc_ies.len());
            assoc_ies.release();
        }
        d.send(self.connection, SmeEvent::SmConnectStartCfm { result: Ok(()) });
        if self.selection.as_ref().map_or(false, SecuritySelection::negotiates_keys) {
            let timeout = self.ctx.config.key_handshake_timeout();
            self.handshake_timer = Some(d.arm_timer(
                SmeEvent::Timeout(SmeTimeout::KeyHandshake),
                timeout,
                Duration::ZERO,
            ));
            d.set_state(State::WaitingForKeys);
        } else {
            d.send(self.connection, SmeEvent::SmPortOpenInd);
            d.set_state(State::ControlPortOpen);
        }
    }

    fn on_key(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        let (kind, key, confirm_pending) = match e.body {
            SmeEvent::Indication(MlmeIndication::Key { kind, key, confirm_pending }) => {
                (kind, key, confirm_pending)
            }
            _ => return,
        };
        if self.flags.intersects(KeyFlags::key(kind)) {
            debug!("replacing {:?} key", kind);
            self.flags.remove(KeyFlags::key(kind));
        }
        self.awaiting_confirm_tx[slot(kind)] = confirm_pending;
        self.pause_scan(d);
        self.request(d, MlmeRequest::SetKeys { kind, address: self.bssid, key });
    }

    fn protect(&mut self, d: &mut Dispatch<'_, SmeEvent>, kind: KeyKind) {
        let protection = if self.awaiting_confirm_tx[slot(kind)] {
            self.flags.insert(KeyFlags::rx_pending(kind));
            Protection::Rx
        } else {
            self.flags.insert(KeyFlags::rxtx_pending(kind));
            Protection::RxTx
        };
        self.request(d, MlmeRequest::SetProtection { kind, address: self.bssid, protection });
    }

    fn on_set_keys_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        self.confirmed();
        if let SmeEvent::Confirm(MlmeConfirm::SetKeys { kind, result }) = e.body {
            if !result.is_success() {
                return self.fail(d, DisconnectReason::KeyInstallFailure);
            }
            self.flags.insert(KeyFlags::key_set(kind));
            self.protect(d, kind);
        }
    }

    fn on_protection_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        self.confirmed();
        let (kind, protection, result) = match e.body {
            SmeEvent::Confirm(MlmeConfirm::SetProtection { kind, protection, result }) => {
                (kind, protection, result)
            }
            _ => return,
        };
        if !result.is_success() {
            return self.fail(d, DisconnectReason::KeyInstallFailure);
        }
        match protection {
            Protection::Rx => {
                self.flags.remove(KeyFlags::rx_pending(kind));
                if !self.awaiting_confirm_tx[slot(kind)] {
                    self.flags.insert(KeyFlags::rxtx_pending(kind));
                    self.request(
                        d,
                        MlmeRequest::SetProtection {
                            kind,
                            address: self.bssid,
                            protection: Protection::RxTx,
                        },
                    );
                }
            }
            Protection::RxTx => {
                self.flags.remove(KeyFlags::rxtx_pending(kind));
                self.flags.insert(KeyFlags::complete(kind));
                self.keys_installed(d);
            }
            Protection::None => {}
        }
    }

    fn on_confirm_transmitted(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.awaiting_confirm_tx = [false; 2];
        for kind in KINDS {
            let waiting = KeyFlags::rx_pending(kind) | KeyFlags::rxtx_pending(kind);
            if self.flags.contains(KeyFlags::key_set(kind))
                && !self.flags.intersects(waiting | KeyFlags::complete(kind))
            {
                self.flags.insert(KeyFlags::rxtx_pending(kind));
                self.request(
                    d,
                    MlmeRequest::SetProtection {
                        kind,
                        address: self.bssid,
                        protection: Protection::RxTx,
                    },
                );
            }
        }
    }

    fn keys_installed(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if !self.flags.contains(KeyFlags::PAIRWISE_COMPLETE | KeyFlags::GROUP_COMPLETE) {
            return;
        }
        if d.state() == StateId::from(State::WaitingForKeys) {
            self.request(d, MlmeRequest::SetControlledPort { address: self.bssid, open: true });
            d.set_state(State::OpeningControlPort);
        } else if !self.flags.intersects(KeyFlags::in_progress()) {
            info!("rekey complete");
            self.resume_scan(d);
        }
    }

    fn on_port_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        self.confirmed();
        if let SmeEvent::Confirm(MlmeConfirm::SetControlledPort { result, .. }) = e.body {
            if !result.is_success() {
                return self.fail(d, DisconnectReason::KeyInstallFailure);
            }
        }
        if let Some(timer) = self.handshake_timer.take() {
            d.cancel_timer(timer);
        }
        self.resume_scan(d);
        info!("controlled port open on {}", self.bssid.to_mac_str());
        d.send(self.connection, SmeEvent::SmPortOpenInd);
        d.set_state(State::ControlPortOpen);
    }

    fn on_scan_pause_cfm(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        self.confirmed();
        if let SmeEvent::Confirm(MlmeConfirm::ScanPause { pause, result }) = e.body {
            if !result.is_success() {
                warn!("scan pause({}) not applied: {:?}", pause, result);
            }
        }
    }

    fn on_handshake_timeout(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.handshake_timer = None;
        self.fail(d, DisconnectReason::KeyHandshakeTimeout);
    }

    fn on_mic_failure(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if self.flags.contains(KeyFlags::STOP_REQUESTED) {
            return;
        }
        if let SmeEvent::Indication(MlmeIndication::MicFailure { kind }) = e.body {
            warn!("{:?} MIC failure on {}", kind, self.bssid.to_mac_str());
        }
        if !self.flags.contains(KeyFlags::MIC_FAILURE_SEEN_ONCE) {
            self.flags.insert(KeyFlags::MIC_FAILURE_SEEN_ONCE);
            let window = self.ctx.config.mic_failure_window();
            self.mic_window = Some(d.arm_timer(
                SmeEvent::Timeout(SmeTimeout::MicFailureWindow),
                window,
                Duration::ZERO,
            ));
            return;
        }
        if let Some(timer) = self.mic_window.take() {
            d.cancel_timer(timer);
        }
        self.flags.remove(KeyFlags::MIC_FAILURE_SEEN_ONCE);
        let until = d.now() + self.ctx.config.countermeasures_blacklist();
        self.ctx.blacklist(self.bssid, until);
        self.fail(d, DisconnectReason::MicFailureCountermeasures);
    }

    fn on_mic_window_expired(&mut self, _d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.mic_window = None;
        self.flags.remove(KeyFlags::MIC_FAILURE_SEEN_ONCE);
    }

    fn on_terminate_req(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.flags.insert(KeyFlags::STOP_REQUESTED);
        for timer in [self.handshake_timer.take(), self.mic_window.take()].into_iter().flatten() {
            d.cancel_timer(timer);
        }
        if self.outstanding > 0 {
            d.set_state(State::WaitingForConfirmations);
        } else {
            self.clean_up(d);
        }
    }

    fn clean_up(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if self.flags.intersects(KeyFlags::PAIRWISE_SET | KeyFlags::GROUP_SET) {
            self.request(d, MlmeRequest::DeleteKeys { address: self.bssid });
        }
        self.resume_scan(d);
        if self.outstanding > 0 {
            d.set_state(State::WaitingForTerminate);
        } else {
            d.terminate();
        }
    }

    fn on_confirm_while_stopping(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        self.confirmed();
        if let SmeEvent::Confirm(MlmeConfirm::SetKeys { kind, result }) = e.body {
            if result.is_success() {
                self.flags.insert(KeyFlags::key_set(kind));
            }
        }
        if self.outstanding == 0 {
            self.clean_up(d);
        }
    }

    fn on_cleanup_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.confirmed();
        if self.outstanding == 0 {
            d.terminate();
        }
    }

    fn ignore(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        debug!("{} ignoring {:?} in state {:?}", d.current(), e.id(), d.state());
    }
}

pub(crate) static SECURITY_MANAGER: Descriptor<SmeEvent, SecurityManager> = Descriptor {
    name: "SecurityManager",
    initial: StateId(State::Ready as u16),
    states: &[
        StateTable {
            name: "Ready",
            save_all: false,
            transitions: transitions![Id::SmJoinStartReq => SecurityManager::join_start],
        },
        StateTable {
            name: "ReadyToAuth",
            save_all: false,
            transitions: transitions![Id::SmConnectStartReq => SecurityManager::connect_start],
        },
        StateTable {
            name: "WaitingForKeys",
            save_all: false,
            transitions: transitions![
                Id::KeyInd => SecurityManager::on_key,
                Id::SetKeysCfm => SecurityManager::on_set_keys_cfm,
                Id::SetProtectionCfm => SecurityManager::on_protection_cfm,
                Id::HandshakeConfirmTransmittedInd => SecurityManager::on_confirm_transmitted,
                Id::ScanPauseCfm => SecurityManager::on_scan_pause_cfm,
                Id::KeyHandshakeTimeout => SecurityManager::on_handshake_timeout,
            ],
        },
        StateTable {
            name: "OpeningControlPort",
            save_all: false,
            transitions: transitions![
                Id::SetControlledPortCfm => SecurityManager::on_port_cfm,
                Id::ScanPauseCfm => SecurityManager::on_scan_pause_cfm,
                Id::KeyHandshakeTimeout => SecurityManager::on_handshake_timeout,
            ],
        },
        StateTable {
            name: "ControlPortOpen",
            save_all: false,
            transitions: transitions![
                Id::KeyInd => SecurityManager::on_key,
                Id::SetKeysCfm => SecurityManager::on_set_keys_cfm,
                Id::SetProtectionCfm => SecurityManager::on_protection_cfm,
                Id::HandshakeConfirmTransmittedInd => SecurityManager::on_confirm_transmitted,
                Id::ScanPauseCfm => SecurityManager::on_scan_pause_cfm,
            ],
        },
        StateTable {
            name: "WaitingForConfirmations",
            save_all: false,
            transitions: transitions![
                Id::SetKeysCfm => SecurityManager::on_confirm_while_stopping,
                Id::SetProtectionCfm => SecurityManager::on_confirm_while_stopping,
                Id::SetControlledPortCfm => SecurityManager::on_confirm_while_stopping,
                Id::ScanPauseCfm => SecurityManager::on_confirm_while_stopping,
            ],
        },
        StateTable {
            name: "WaitingForTerminate",
            save_all: false,
            transitions: transitions![
                Id::DeleteKeysCfm => SecurityManager::on_cleanup_cfm,
                Id::ScanPauseCfm => SecurityManager::on_cleanup_cfm,
            ],
        },
    ],
    default: transitions![
        Id::SmTerminateReq => SecurityManager::on_terminate_req,
        Id::MicFailureInd => SecurityManager::on_mic_failure,
        Id::MicFailureWindowTimeout => SecurityManager::on_mic_window_expired,
        Id::KeyInd => SecurityManager::ignore,
        Id::HandshakeConfirmTransmittedInd => SecurityManager::ignore,
        Id::KeyHandshakeTimeout => SecurityManager::ignore,
    ],
    ignore: &[
        Id::KeyInd,
        Id::HandshakeConfirmTransmittedInd,
        Id::MicFailureInd,
        Id::MicFailureWindowTimeout,
        Id::KeyHandshakeTimeout,
    ],
    entry: Some(SecurityManager::entry),
    reset: Some(SecurityManager::reset),
};
