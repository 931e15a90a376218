// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The management service access point: requests from the application and the confirms and
//! indications sent back to it.

use {
    crate::{
        bss::{MacAddr, Ssid},
        event::SmeEvent,
        ie::policy::SecurityError,
        mlme::{DisconnectReason, MlmeResult},
    },
    std::fmt,
    wlan_fsm::{ExternalSender, InstanceId},
};

/// Opaque token chosen by the application. Every confirm carries the handle of the request it
/// answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AppHandle(pub u32);

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    Password(Vec<u8>),
    Psk([u8; 32]),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => write!(f, "None"),
            Credential::Password(_) => write!(f, "Password(<redacted>)"),
            Credential::Psk(_) => write!(f, "Psk(<redacted>)"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    pub ssid: Ssid,
    /// Restricts the attempt to one BSS of the ESS.
    pub bssid: Option<MacAddr>,
    pub credential: Credential,
}

impl ConnectRequest {
    pub fn new(ssid: impl Into<Ssid>, credential: Credential) -> Self {
        Self { ssid: ssid.into(), bssid: None, credential }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WpsMethod {
    PushButton,
    Pin([u8; 8]),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MgmtRequest {
    Start,
    Stop,
    Connect(ConnectRequest),
    /// A connect issued on behalf of a stored profile rather than an explicit user action.
    ProfileConnect(ConnectRequest),
    Disconnect,
    Wps(WpsMethod),
    /// Move to another BSS of the currently connected ESS.
    Roam { bssid: MacAddr },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MgmtStatus {
    Success,
    NotStarted,
    NotConnected,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectFailure {
    NotStarted,
    NotConnected,
    NoMatchingBss,
    Blacklisted,
    ScanFailure(MlmeResult),
    JoinFailure(MlmeResult),
    AdhocFailure(MlmeResult),
    ProtectionFailure(MlmeResult),
    AuthenticationFailure(MlmeResult),
    AssociationFailure(MlmeResult),
    SecurityFailure(SecurityError),
    Disconnected(DisconnectReason),
    /// No room to create the state machines an attempt needs.
    ResourceExhausted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectResult {
    Success,
    Cancelled,
    Failed(ConnectFailure),
}

impl ConnectResult {
    pub fn is_success(&self) -> bool {
        *self == ConnectResult::Success
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WpsResult {
    /// Registration succeeded; the request carries the credential received from the registrar.
    Success(ConnectRequest),
    Failed,
    Cancelled,
    WalkTimeExpired,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MgmtEvent {
    StartCfm { handle: AppHandle, status: MgmtStatus },
    StopCfm { handle: AppHandle, status: MgmtStatus },
    ConnectCfm { handle: AppHandle, result: ConnectResult },
    ProfileConnectCfm { handle: AppHandle, result: ConnectResult },
    DisconnectCfm { handle: AppHandle, status: MgmtStatus },
    WpsCfm { handle: AppHandle, result: WpsResult },
    RoamCfm { handle: AppHandle, result: ConnectResult },
    /// The link was lost; the application decides whether and where to roam.
    RoamInd { reason: DisconnectReason },
    MediaStatusInd { connected: bool },
}

/// Thread-safe entry point for management requests.
#[derive(Clone)]
pub struct MgmtSap {
    sender: ExternalSender<SmeEvent>,
    selector: InstanceId,
}

impl MgmtSap {
    pub(crate) fn new(sender: ExternalSender<SmeEvent>, selector: InstanceId) -> Self {
        Self { sender, selector }
    }

    pub fn submit(&self, handle: AppHandle, req: MgmtRequest) {
        self.sender.submit(self.selector, SmeEvent::Mgmt { handle, req });
    }

    pub fn start(&self, handle: AppHandle) {
        self.submit(handle, MgmtRequest::Start)
    }

    pub fn stop(&self, handle: AppHandle) {
        self.submit(handle, MgmtRequest::Stop)
    }

    pub fn connect(&self, handle: AppHandle, req: ConnectRequest) {
        self.submit(handle, MgmtRequest::Connect(req))
    }

    pub fn profile_connect(&self, handle: AppHandle, req: ConnectRequest) {
        self.submit(handle, MgmtRequest::ProfileConnect(req))
    }

    pub fn disconnect(&self, handle: AppHandle) {
        self.submit(handle, MgmtRequest::Disconnect)
    }

    pub fn wps(&self, handle: AppHandle, method: WpsMethod) {
        self.submit(handle, MgmtRequest::Wps(method))
    }

    pub fn roam(&self, handle: AppHandle, bssid: MacAddr) {
        self.submit(handle, MgmtRequest::Roam { bssid })
    }
}
