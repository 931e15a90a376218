// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        bss::{BssDescription, MacAddr},
        ie::policy::SecurityError,
        mgmt::{AppHandle, ConnectRequest, ConnectResult, Credential, MgmtRequest, WpsResult},
        mlme::{DisconnectReason, MlmeConfirm, MlmeIndication},
        payload::Payload,
    },
    std::sync::Arc,
    wlan_fsm::Message,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmeTimeout {
    MicFailureWindow,
    KeyHandshake,
    WpsWalkTime,
}

/// Every message exchanged between the SME state machines and their boundaries.
#[derive(Debug)]
pub enum SmeEvent {
    Mgmt { handle: AppHandle, req: MgmtRequest },
    Confirm(MlmeConfirm),
    Indication(MlmeIndication),
    Timeout(SmeTimeout),

    // Network selector <-> connection manager.
    CmJoinReq { request: ConnectRequest, roam_from: Option<MacAddr> },
    CmTerminateReq,
    CmConnectCfm { result: ConnectResult, bssid: Option<MacAddr> },
    CmMediaStatusInd { connected: bool },
    CmLinkLostInd { reason: DisconnectReason },
    CmDisconnectedInd { reason: Option<DisconnectReason> },

    // Connection manager <-> security manager.
    SmJoinStartReq { bss: Arc<BssDescription>, credential: Credential },
    SmJoinStartCfm { result: Result<Payload, SecurityError> },
    SmConnectStartReq { assoc_ies: Payload },
    SmConnectStartCfm { result: Result<(), SecurityError> },
    SmPortOpenInd,
    SmDisconnectInd { reason: DisconnectReason },
    SmTerminateReq,
    SmTerminatedInd,

    // WPS sub-process -> network selector.
    WpsDoneInd { result: WpsResult },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SmeEventId {
    StartReq,
    StopReq,
    ConnectReq,
    ProfileConnectReq,
    DisconnectReq,
    WpsReq,
    RoamReq,

    ScanCfm,
    JoinCfm,
    StartAdhocCfm,
    AuthenticateCfm,
    DeauthenticateCfm,
    AssociateCfm,
    ReassociateCfm,
    QosControlCfm,
    SetKeysCfm,
    DeleteKeysCfm,
    SetProtectionCfm,
    SetControlledPortCfm,
    ScanPauseCfm,
    ResetCfm,
    WpsStartCfm,
    WpsStopCfm,

    DeauthenticateInd,
    DisassociateInd,
    BeaconLossInd,
    ConnectedInd,
    KeyInd,
    HandshakeConfirmTransmittedInd,
    MicFailureInd,
    WpsCompleteInd,

    MicFailureWindowTimeout,
    KeyHandshakeTimeout,
    WpsWalkTimeTimeout,

    CmJoinReq,
    CmTerminateReq,
    CmConnectCfm,
    CmMediaStatusInd,
    CmLinkLostInd,
    CmDisconnectedInd,

    SmJoinStartReq,
    SmJoinStartCfm,
    SmConnectStartReq,
    SmConnectStartCfm,
    SmPortOpenInd,
    SmDisconnectInd,
    SmTerminateReq,
    SmTerminatedInd,

    WpsDoneInd,
}

impl Message for SmeEvent {
    type Id = SmeEventId;

    fn id(&self) -> SmeEventId {
        use SmeEventId as Id;
        match self {
            SmeEvent::Mgmt { req, .. } => match req {
                MgmtRequest::Start => Id::StartReq,
                MgmtRequest::Stop => Id::StopReq,
                MgmtRequest::Connect(_) => Id::ConnectReq,
                MgmtRequest::ProfileConnect(_) => Id::ProfileConnectReq,
                MgmtRequest::Disconnect => Id::DisconnectReq,
                MgmtRequest::Wps(_) => Id::WpsReq,
                MgmtRequest::Roam { .. } => Id::RoamReq,
            },
            SmeEvent::Confirm(cfm) => match cfm {
                MlmeConfirm::Scan { .. } => Id::ScanCfm,
                MlmeConfirm::Join { .. } => Id::JoinCfm,
                MlmeConfirm::StartAdhoc { .. } => Id::StartAdhocCfm,
                MlmeConfirm::Authenticate { .. } => Id::AuthenticateCfm,
                MlmeConfirm::Deauthenticate { .. } => Id::DeauthenticateCfm,
                MlmeConfirm::Associate { .. } => Id::AssociateCfm,
                MlmeConfirm::Reassociate { .. } => Id::ReassociateCfm,
                MlmeConfirm::QosControl { .. } => Id::QosControlCfm,
                MlmeConfirm::SetKeys { .. } => Id::SetKeysCfm,
                MlmeConfirm::DeleteKeys { .. } => Id::DeleteKeysCfm,
                MlmeConfirm::SetProtection { .. } => Id::SetProtectionCfm,
                MlmeConfirm::SetControlledPort { .. } => Id::SetControlledPortCfm,
                MlmeConfirm::ScanPause { .. } => Id::ScanPauseCfm,
                MlmeConfirm::Reset { .. } => Id::ResetCfm,
                MlmeConfirm::WpsStart { .. } => Id::WpsStartCfm,
                MlmeConfirm::WpsStop { .. } => Id::WpsStopCfm,
            },
            SmeEvent::Indication(ind) => match ind {
                MlmeIndication::Deauthenticate { .. } => Id::DeauthenticateInd,
                MlmeIndication::Disassociate { .. } => Id::DisassociateInd,
                MlmeIndication::BeaconLoss { .. } => Id::BeaconLossInd,
                MlmeIndication::Connected { .. } => Id::ConnectedInd,
                MlmeIndication::Key { .. } => Id::KeyInd,
                MlmeIndication::HandshakeConfirmTransmitted => Id::HandshakeConfirmTransmittedInd,
                MlmeIndication::MicFailure { .. } => Id::MicFailureInd,
                MlmeIndication::WpsComplete { .. } => Id::WpsCompleteInd,
            },
            SmeEvent::Timeout(timeout) => match timeout {
                SmeTimeout::MicFailureWindow => Id::MicFailureWindowTimeout,
                SmeTimeout::KeyHandshake => Id::KeyHandshakeTimeout,
                SmeTimeout::WpsWalkTime => Id::WpsWalkTimeTimeout,
            },
            SmeEvent::CmJoinReq { .. } => Id::CmJoinReq,
            SmeEvent::CmTerminateReq => Id::CmTerminateReq,
            SmeEvent::CmConnectCfm { .. } => Id::CmConnectCfm,
            SmeEvent::CmMediaStatusInd { .. } => Id::CmMediaStatusInd,
            SmeEvent::CmLinkLostInd { .. } => Id::CmLinkLostInd,
            SmeEvent::CmDisconnectedInd { .. } => Id::CmDisconnectedInd,
            SmeEvent::SmJoinStartReq { .. } => Id::SmJoinStartReq,
            SmeEvent::SmJoinStartCfm { .. } => Id::SmJoinStartCfm,
            SmeEvent::SmConnectStartReq { .. } => Id::SmConnectStartReq,
            SmeEvent::SmConnectStartCfm { .. } => Id::SmConnectStartCfm,
            SmeEvent::SmPortOpenInd => Id::SmPortOpenInd,
            SmeEvent::SmDisconnectInd { .. } => Id::SmDisconnectInd,
            SmeEvent::SmTerminateReq => Id::SmTerminateReq,
            SmeEvent::SmTerminatedInd => Id::SmTerminatedInd,
            SmeEvent::WpsDoneInd { .. } => Id::WpsDoneInd,
        }
    }
}
