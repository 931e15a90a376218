// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        bss::BssDescription,
        mgmt::{AppHandle, ConnectRequest},
        mlme::{MlmeConfirm, MlmeResult},
        FakeClock, HipProxy, MgmtEvent, MgmtSap, MgmtStream, MlmeRequest, MlmeStream, Sme,
        SmeConfig,
    },
    std::time::Duration,
};

pub mod fake_bss {
    use {
        crate::{
            bss::{BssDescription, CapabilityInfo, MacAddr},
            ie::{self, akm, cipher, Akm, Cipher, Oui, Rsne, WapiIe, WpaIe},
            mgmt::{ConnectRequest, Credential},
        },
        bytes::Bytes,
    };

    pub const BSSID: MacAddr = [0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f];
    pub const OTHER_BSSID: MacAddr = [0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f];

    fn bss(ssid: &[u8], capability: CapabilityInfo, channel: u8, extra: &[u8]) -> BssDescription {
        let mut ies = vec![];
        ie::write_ssid(&mut ies, ssid).expect("valid SSID");
        ies.extend_from_slice(extra);
        BssDescription { bssid: BSSID, channel, rssi_dbm: -40, capability, ies: Bytes::from(ies) }
    }

    pub fn open(ssid: &[u8]) -> BssDescription {
        bss(ssid, CapabilityInfo::ESS, 1, &[])
    }

    pub fn wep(ssid: &[u8]) -> BssDescription {
        bss(ssid, CapabilityInfo::ESS | CapabilityInfo::PRIVACY, 1, &[])
    }

    pub fn ibss(ssid: &[u8]) -> BssDescription {
        bss(ssid, CapabilityInfo::IBSS, 6, &[])
    }

    pub fn wpa2(ssid: &[u8]) -> BssDescription {
        let rsne = Rsne {
            version: 1,
            group_data_cipher_suite: Some(Cipher::new_dot11(cipher::CCMP_128)),
            pairwise_cipher_suites: vec![Cipher::new_dot11(cipher::CCMP_128)],
            akm_suites: vec![Akm::new_dot11(akm::PSK)],
            rsn_capabilities: Some(0),
        };
        let mut ie = vec![];
        rsne.write_into(&mut ie).expect("valid RSNE");
        let capability = CapabilityInfo::ESS | CapabilityInfo::PRIVACY | CapabilityInfo::QOS;
        bss(ssid, capability, 36, &ie)
    }

    pub fn wpa1(ssid: &[u8]) -> BssDescription {
        let wpa = WpaIe {
            multicast_cipher: Cipher::new(Oui::MSFT, cipher::TKIP),
            unicast_cipher_list: vec![Cipher::new(Oui::MSFT, cipher::TKIP)],
            akm_list: vec![Akm::new(Oui::MSFT, akm::PSK)],
        };
        let mut ie = vec![];
        wpa.write_into(&mut ie).expect("valid WPA element");
        bss(ssid, CapabilityInfo::ESS | CapabilityInfo::PRIVACY, 11, &ie)
    }

    pub fn wapi(ssid: &[u8]) -> BssDescription {
        let wapi = WapiIe {
            version: 1,
            akm_suites: vec![Akm::new(Oui::WAPI, akm::WAPI_PSK)],
            unicast_cipher_suites: vec![Cipher::new(Oui::WAPI, cipher::SMS4)],
            multicast_cipher: Cipher::new(Oui::WAPI, cipher::SMS4),
            capabilities: 0,
        };
        let mut ie = vec![];
        wapi.write_into(&mut ie).expect("valid WAPI element");
        bss(ssid, CapabilityInfo::ESS | CapabilityInfo::PRIVACY, 1, &ie)
    }

    pub fn with_bssid(bss: BssDescription, bssid: MacAddr) -> BssDescription {
        BssDescription { bssid, ..bss }
    }

    pub fn request(ssid: &[u8]) -> ConnectRequest {
        ConnectRequest::new(ssid, Credential::None)
    }

    pub fn psk_request(ssid: &[u8]) -> ConnectRequest {
        ConnectRequest::new(ssid, Credential::Password(b"password".to_vec()))
    }
}

/// Drives an `Sme` on a fake clock and plays the part of the firmware: every MLME request it
/// sees stays unanswered until a test replies to it.
pub struct SmeHarness {
    pub sme: Sme,
    pub sap: MgmtSap,
    pub proxy: HipProxy,
    pub clock: FakeClock,
    mlme_stream: MlmeStream,
    mgmt_stream: MgmtStream,
    sent: Vec<MlmeRequest>,
    unanswered: Vec<MlmeRequest>,
    drained: usize,
}

impl SmeHarness {
    /// A started SME with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SmeConfig::default())
    }

    pub fn with_config(config: SmeConfig) -> Self {
        let mut h = Self::build(config);
        h.sap.start(AppHandle(0));
        h.run();
        h.drain_mgmt();
        h
    }

    pub fn stopped() -> Self {
        Self::build(SmeConfig::default())
    }

    fn build(config: SmeConfig) -> Self {
        let clock = FakeClock::new();
        let (sme, mlme_stream, mgmt_stream) =
            Sme::new(config, clock.clone()).expect("creating SME");
        let sap = sme.mgmt_sap();
        let proxy = sme.hip_proxy();
        Self {
            sme,
            sap,
            proxy,
            clock,
            mlme_stream,
            mgmt_stream,
            sent: vec![],
            unanswered: vec![],
            drained: 0,
        }
    }

    pub fn config(&self) -> SmeConfig {
        self.sme.config().clone()
    }

    pub fn run(&mut self) {
        self.sme.run_once();
        self.pull();
    }

    fn pull(&mut self) {
        while let Ok(Some(req)) = self.mlme_stream.try_next() {
            self.sent.push(req.clone());
            self.unanswered.push(req);
        }
    }

    /// Every MLME request sent so far.
    pub fn sent_mlme(&mut self) -> Vec<MlmeRequest> {
        self.pull();
        self.sent.clone()
    }

    /// MLME requests sent since the previous call. Does not answer them.
    pub fn drain_mlme(&mut self) -> Vec<MlmeRequest> {
        self.pull();
        let fresh = self.sent[self.drained..].to_vec();
        self.drained = self.sent.len();
        fresh
    }

    pub fn drain_mgmt(&mut self) -> Vec<MgmtEvent> {
        let mut events = vec![];
        while let Ok(Some(event)) = self.mgmt_stream.try_next() {
            events.push(event);
        }
        events
    }

    /// Answers everything outstanding with `result`. Scans find nothing.
    pub fn reply(&mut self, result: MlmeResult) {
        self.pull();
        for req in std::mem::take(&mut self.unanswered) {
            self.proxy.confirm(req.confirm(result));
        }
        self.run();
    }

    /// Number of requests still waiting for a confirm.
    pub fn outstanding(&mut self) -> usize {
        self.pull();
        self.unanswered.len()
    }

    /// Answers only the `n`th outstanding request, oldest first.
    pub fn reply_nth(&mut self, n: usize, result: MlmeResult) {
        self.pull();
        let req = self.unanswered.remove(n);
        self.proxy.confirm(req.confirm(result));
        self.run();
    }

    /// Replies until the SME stops issuing requests.
    pub fn reply_all(&mut self, result: MlmeResult) {
        for _ in 0..100 {
            self.pull();
            if self.unanswered.is_empty() {
                return;
            }
            self.reply(result);
        }
        panic!("SME never went quiet, last requests: {:?}", self.unanswered);
    }

    /// Like `reply_all` but leaves scans outstanding.
    pub fn reply_all_but_scan(&mut self, result: MlmeResult) {
        for _ in 0..100 {
            self.pull();
            let (scans, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.unanswered)
                .into_iter()
                .partition(|req| matches!(req, MlmeRequest::Scan { .. }));
            self.unanswered = scans;
            if rest.is_empty() {
                return;
            }
            for req in rest {
                self.proxy.confirm(req.confirm(result));
            }
            self.run();
        }
        panic!("SME never went quiet");
    }

    /// Replies until a request matching `pred` is outstanding. That request stays unanswered.
    pub fn reply_until(&mut self, result: MlmeResult, pred: impl Fn(&MlmeRequest) -> bool) {
        for _ in 0..100 {
            self.pull();
            if self.unanswered.iter().any(&pred) {
                return;
            }
            assert!(!self.unanswered.is_empty(), "SME went quiet before the expected request");
            self.reply(result);
        }
        panic!("expected request never sent");
    }

    pub fn reply_scan(&mut self, bss: Option<BssDescription>) {
        self.confirm(MlmeConfirm::Scan { result: MlmeResult::Success, bss });
    }

    /// Answers the oldest outstanding request of the confirm's kind.
    pub fn confirm(&mut self, cfm: MlmeConfirm) {
        self.pull();
        let pos = self
            .unanswered
            .iter()
            .position(|req| req.kind() == cfm.kind())
            .unwrap_or_else(|| panic!("no outstanding {:?} request", cfm.kind()));
        self.unanswered.remove(pos);
        self.proxy.confirm(cfm);
        self.run();
    }

    pub fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.run();
    }

    /// State of the live security manager, if there is one.
    pub fn security_state(&self) -> Option<&'static str> {
        let owner = self.sme.routing().lock().security_owner()?;
        self.sme.fsm().state_name(owner)
    }

    /// Connects to `bss` with every MLME request succeeding. Requests sent up to here are
    /// considered drained.
    pub fn connect_to(&mut self, bss: BssDescription, request: ConnectRequest) {
        self.sap.connect(AppHandle(1), request);
        self.run();
        self.reply_scan(Some(bss));
        self.reply_all(MlmeResult::Success);
        self.drain_mlme();
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::ie::{policy, Rsne, WapiIe, WpaIe},
        wlan_fsm::assert_variant,
    };

    #[test]
    fn fake_bss_carries_ssid() {
        assert_eq!(fake_bss::wpa2(b"home").ssid(), b"home");
        assert_eq!(fake_bss::open(b"").ssid(), b"");
    }

    #[test]
    fn fake_bss_protection() {
        assert!(!fake_bss::open(b"a").is_protected());
        assert!(!fake_bss::ibss(b"a").is_protected());
        assert!(fake_bss::ibss(b"a").is_ibss());
        assert!(fake_bss::wep(b"a").is_protected());
        assert!(fake_bss::wpa2(b"a").supports_qos());
    }

    #[test]
    fn fake_bss_elements_parse() {
        let rsne = Rsne::parse(fake_bss::wpa2(b"a").rsne().expect("RSNE present")).expect("parse");
        assert_eq!(rsne.akm_suites.len(), 1);
        assert!(WpaIe::parse(fake_bss::wpa1(b"a").wpa_ie().expect("WPA present")).is_ok());
        assert!(WapiIe::parse(fake_bss::wapi(b"a").wapi_ie().expect("WAPI present")).is_ok());
    }

    #[test]
    fn psk_request_selects_rsn() {
        let bss = fake_bss::wpa2(b"a");
        let selection = policy::select(
            &bss,
            &fake_bss::psk_request(b"a").credential,
            &policy::SecurityPolicy::default(),
        )
        .expect("WPA2 PSK is allowed");
        assert!(selection.negotiates_keys());
    }

    #[test]
    fn harness_answers_requests_in_order() {
        let mut h = SmeHarness::new();
        h.sap.connect(AppHandle(1), fake_bss::request(b"open"));
        h.run();
        assert_variant!(h.drain_mlme().as_slice(), [MlmeRequest::Scan { .. }]);
        h.reply_scan(Some(fake_bss::open(b"open")));
        h.reply_all(MlmeResult::Success);
        assert_eq!(h.sme.status().bssid, Some(fake_bss::BSSID));
        assert!(h.drain_mgmt().iter().any(|e| matches!(e, MgmtEvent::ConnectCfm { .. })));
    }
}
