// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Primitives exchanged with the radio firmware. Every request is answered by exactly one
//! confirm of the matching kind.

use {
    crate::{
        bss::{BssDescription, MacAddr, Ssid},
        mgmt::WpsMethod,
        payload::Payload,
    },
    std::sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReasonCode(pub u16);

impl ReasonCode {
    pub const UNSPECIFIED: ReasonCode = ReasonCode(1);
    pub const LEAVING_NETWORK_DEAUTH: ReasonCode = ReasonCode(3);
    pub const INACTIVITY: ReasonCode = ReasonCode(4);
    pub const LEAVING_NETWORK_DISASSOC: ReasonCode = ReasonCode(8);
    pub const MIC_FAILURE: ReasonCode = ReasonCode(14);
    pub const FOURWAY_HANDSHAKE_TIMEOUT: ReasonCode = ReasonCode(15);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MlmeResult {
    Success,
    Refused,
    InvalidParameters,
    UnsupportedAkm,
    Timeout,
    CommsLost,
}

impl MlmeResult {
    pub fn is_success(&self) -> bool {
        *self == MlmeResult::Success
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    OpenSystem,
    SharedKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Pairwise,
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protection {
    None,
    Rx,
    RxTx,
}

/// Why a link went away or never came up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    Requested,
    BeaconLoss,
    Deauthenticated(ReasonCode),
    Disassociated(ReasonCode),
    MicFailureCountermeasures,
    KeyHandshakeTimeout,
    KeyInstallFailure,
    CommsLost,
}

impl DisconnectReason {
    /// The AP has already dropped us; deauthenticating again is pointless.
    pub fn ap_initiated(&self) -> bool {
        matches!(self, DisconnectReason::Deauthenticated(_) | DisconnectReason::Disassociated(_))
    }

    pub fn reason_code(&self) -> ReasonCode {
        match self {
            DisconnectReason::Deauthenticated(code) | DisconnectReason::Disassociated(code) => {
                *code
            }
            DisconnectReason::MicFailureCountermeasures => ReasonCode::MIC_FAILURE,
            DisconnectReason::KeyHandshakeTimeout => ReasonCode::FOURWAY_HANDSHAKE_TIMEOUT,
            DisconnectReason::BeaconLoss => ReasonCode::INACTIVITY,
            _ => ReasonCode::LEAVING_NETWORK_DEAUTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MlmeRequest {
    /// Timeouts are in time units (1024 us).
    Scan { ssid: Ssid, bssid: Option<MacAddr>, probe_timeout: u32 },
    Join { bss: Arc<BssDescription>, security_ie: Payload, join_failure_timeout: u32 },
    StartAdhoc { ssid: Ssid, channel: u8, security_ie: Payload },
    Authenticate { bssid: MacAddr, auth_type: AuthType, auth_failure_timeout: u32 },
    Deauthenticate { bssid: MacAddr, reason: ReasonCode },
    Associate {
        bssid: MacAddr,
        security_ie: Payload,
        extra_ies: Payload,
        assoc_failure_timeout: u32,
    },
    Reassociate {
        bssid: MacAddr,
        current_bssid: MacAddr,
        security_ie: Payload,
        extra_ies: Payload,
        assoc_failure_timeout: u32,
    },
    QosControl { bssid: MacAddr, enable: bool },
    SetKeys { kind: KeyKind, address: MacAddr, key: Payload },
    DeleteKeys { address: MacAddr },
    SetProtection { kind: KeyKind, address: MacAddr, protection: Protection },
    SetControlledPort { address: MacAddr, open: bool },
    ScanPause { pause: bool },
    Reset,
    WpsStart { method: WpsMethod },
    WpsStop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MlmeKind {
    Scan,
    Join,
    StartAdhoc,
    Authenticate,
    Deauthenticate,
    Associate,
    Reassociate,
    QosControl,
    SetKeys,
    DeleteKeys,
    SetProtection,
    SetControlledPort,
    ScanPause,
    Reset,
    WpsStart,
    WpsStop,
}

impl MlmeRequest {
    pub fn kind(&self) -> MlmeKind {
        match self {
            MlmeRequest::Scan { .. } => MlmeKind::Scan,
            MlmeRequest::Join { .. } => MlmeKind::Join,
            MlmeRequest::StartAdhoc { .. } => MlmeKind::StartAdhoc,
            MlmeRequest::Authenticate { .. } => MlmeKind::Authenticate,
            MlmeRequest::Deauthenticate { .. } => MlmeKind::Deauthenticate,
            MlmeRequest::Associate { .. } => MlmeKind::Associate,
            MlmeRequest::Reassociate { .. } => MlmeKind::Reassociate,
            MlmeRequest::QosControl { .. } => MlmeKind::QosControl,
            MlmeRequest::SetKeys { .. } => MlmeKind::SetKeys,
            MlmeRequest::DeleteKeys { .. } => MlmeKind::DeleteKeys,
            MlmeRequest::SetProtection { .. } => MlmeKind::SetProtection,
            MlmeRequest::SetControlledPort { .. } => MlmeKind::SetControlledPort,
            MlmeRequest::ScanPause { .. } => MlmeKind::ScanPause,
            MlmeRequest::Reset => MlmeKind::Reset,
            MlmeRequest::WpsStart { .. } => MlmeKind::WpsStart,
            MlmeRequest::WpsStop => MlmeKind::WpsStop,
        }
    }

    /// The confirm firmware would send for this request had it completed with `result`.
    pub fn confirm(&self, result: MlmeResult) -> MlmeConfirm {
        match self {
            MlmeRequest::Scan { .. } => MlmeConfirm::Scan { result, bss: None },
            MlmeRequest::Join { .. } => MlmeConfirm::Join { result },
            MlmeRequest::StartAdhoc { .. } => MlmeConfirm::StartAdhoc { result },
            MlmeRequest::Authenticate { auth_type, .. } => {
                MlmeConfirm::Authenticate { auth_type: *auth_type, result }
            }
            MlmeRequest::Deauthenticate { .. } => MlmeConfirm::Deauthenticate { result },
            MlmeRequest::Associate { .. } => {
                MlmeConfirm::Associate { result, ies: Payload::EMPTY }
            }
            MlmeRequest::Reassociate { .. } => {
                MlmeConfirm::Reassociate { result, ies: Payload::EMPTY }
            }
            MlmeRequest::QosControl { .. } => MlmeConfirm::QosControl { result },
            MlmeRequest::SetKeys { kind, .. } => MlmeConfirm::SetKeys { kind: *kind, result },
            MlmeRequest::DeleteKeys { .. } => MlmeConfirm::DeleteKeys { result },
            MlmeRequest::SetProtection { kind, protection, .. } => {
                MlmeConfirm::SetProtection { kind: *kind, protection: *protection, result }
            }
            MlmeRequest::SetControlledPort { open, .. } => {
                MlmeConfirm::SetControlledPort { open: *open, result }
            }
            MlmeRequest::ScanPause { pause } => MlmeConfirm::ScanPause { pause: *pause, result },
            MlmeRequest::Reset => MlmeConfirm::Reset { result },
            MlmeRequest::WpsStart { .. } => MlmeConfirm::WpsStart { result },
            MlmeRequest::WpsStop => MlmeConfirm::WpsStop { result },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MlmeConfirm {
    Scan { result: MlmeResult, bss: Option<BssDescription> },
    Join { result: MlmeResult },
    StartAdhoc { result: MlmeResult },
    Authenticate { auth_type: AuthType, result: MlmeResult },
    Deauthenticate { result: MlmeResult },
    Associate { result: MlmeResult, ies: Payload },
    Reassociate { result: MlmeResult, ies: Payload },
    QosControl { result: MlmeResult },
    SetKeys { kind: KeyKind, result: MlmeResult },
    DeleteKeys { result: MlmeResult },
    SetProtection { kind: KeyKind, protection: Protection, result: MlmeResult },
    SetControlledPort { open: bool, result: MlmeResult },
    ScanPause { pause: bool, result: MlmeResult },
    Reset { result: MlmeResult },
    WpsStart { result: MlmeResult },
    WpsStop { result: MlmeResult },
}

impl MlmeConfirm {
    pub fn kind(&self) -> MlmeKind {
        match self {
            MlmeConfirm::Scan { .. } => MlmeKind::Scan,
            MlmeConfirm::Join { .. } => MlmeKind::Join,
            MlmeConfirm::StartAdhoc { .. } => MlmeKind::StartAdhoc,
            MlmeConfirm::Authenticate { .. } => MlmeKind::Authenticate,
            MlmeConfirm::Deauthenticate { .. } => MlmeKind::Deauthenticate,
            MlmeConfirm::Associate { .. } => MlmeKind::Associate,
            MlmeConfirm::Reassociate { .. } => MlmeKind::Reassociate,
            MlmeConfirm::QosControl { .. } => MlmeKind::QosControl,
            MlmeConfirm::SetKeys { .. } => MlmeKind::SetKeys,
            MlmeConfirm::DeleteKeys { .. } => MlmeKind::DeleteKeys,
            MlmeConfirm::SetProtection { .. } => MlmeKind::SetProtection,
            MlmeConfirm::SetControlledPort { .. } => MlmeKind::SetControlledPort,
            MlmeConfirm::ScanPause { .. } => MlmeKind::ScanPause,
            MlmeConfirm::Reset { .. } => MlmeKind::Reset,
            MlmeConfirm::WpsStart { .. } => MlmeKind::WpsStart,
            MlmeConfirm::WpsStop { .. } => MlmeKind::WpsStop,
        }
    }

    pub fn result(&self) -> MlmeResult {
        match self {
            MlmeConfirm::Scan { result, .. }
            | MlmeConfirm::Join { result }
            | MlmeConfirm::StartAdhoc { result }
            | MlmeConfirm::Authenticate { result, .. }
            | MlmeConfirm::Deauthenticate { result }
            | MlmeConfirm::Associate { result, .. }
            | MlmeConfirm::Reassociate { result, .. }
            | MlmeConfirm::QosControl { result }
            | MlmeConfirm::SetKeys { result, .. }
            | MlmeConfirm::DeleteKeys { result }
            | MlmeConfirm::SetProtection { result, .. }
            | MlmeConfirm::SetControlledPort { result, .. }
            | MlmeConfirm::ScanPause { result, .. }
            | MlmeConfirm::Reset { result }
            | MlmeConfirm::WpsStart { result }
            | MlmeConfirm::WpsStop { result } => *result,
        }
    }
}

/// Unsolicited primitives from firmware or from the host-side supplicant.
#[derive(Clone, Debug, PartialEq)]
pub enum MlmeIndication {
    Deauthenticate { bssid: MacAddr, reason: ReasonCode },
    Disassociate { bssid: MacAddr, reason: ReasonCode },
    BeaconLoss { bssid: MacAddr },
    Connected { bssid: MacAddr },
    /// A key derived by the supplicant. `confirm_pending` is set while the handshake frame
    /// acknowledging the key has not been transmitted yet.
    Key { kind: KeyKind, key: Payload, confirm_pending: bool },
    /// The final handshake frame left the radio.
    HandshakeConfirmTransmitted,
    MicFailure { kind: KeyKind },
    WpsComplete { credential: Option<crate::mgmt::ConnectRequest> },
}
