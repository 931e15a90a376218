// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Chooses the cipher and key management suites used towards a BSS and builds the element
//! offered in the association request.

use {
    super::{akm, cipher, Akm, Cipher, Oui, Rsne, WapiIe, WpaIe},
    crate::{bss::BssDescription, mgmt::Credential},
    serde::Deserialize,
    thiserror::Error,
};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CipherSuite {
    Ccmp128,
    Gcmp128,
    Tkip,
    Sms4,
}

impl CipherSuite {
    fn matches(&self, cipher: &Cipher) -> bool {
        match self {
            CipherSuite::Ccmp128 => cipher.oui != Oui::WAPI && cipher.suite_type == cipher::CCMP_128,
            CipherSuite::Gcmp128 => cipher.oui != Oui::WAPI && cipher.suite_type == cipher::GCMP_128,
            CipherSuite::Tkip => cipher.oui != Oui::WAPI && cipher.suite_type == cipher::TKIP,
            CipherSuite::Sms4 => cipher.oui == Oui::WAPI && cipher.suite_type == cipher::SMS4,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AkmSuite {
    Psk,
    FtPsk,
    Ieee8021x,
    WapiPsk,
    WapiCert,
}

impl AkmSuite {
    fn matches(&self, akm: &Akm) -> bool {
        match self {
            AkmSuite::Psk => akm.oui != Oui::WAPI && akm.suite_type == akm::PSK,
            AkmSuite::FtPsk => akm.oui != Oui::WAPI && akm.suite_type == akm::FT_PSK,
            AkmSuite::Ieee8021x => akm.oui != Oui::WAPI && akm.suite_type == akm::EAP,
            AkmSuite::WapiPsk => akm.oui == Oui::WAPI && akm.suite_type == akm::WAPI_PSK,
            AkmSuite::WapiCert => akm.oui == Oui::WAPI && akm.suite_type == akm::WAPI_CERT,
        }
    }

    fn uses_passphrase(&self) -> bool {
        matches!(self, AkmSuite::Psk | AkmSuite::FtPsk | AkmSuite::WapiPsk)
    }
}

/// Suites the station is willing to use, in order of preference.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityPolicy {
    pub pairwise_ciphers: Vec<CipherSuite>,
    pub group_ciphers: Vec<CipherSuite>,
    pub akms: Vec<AkmSuite>,
    pub allow_wpa1: bool,
    pub allow_wapi: bool,
    pub allow_wep: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            pairwise_ciphers: vec![CipherSuite::Ccmp128, CipherSuite::Gcmp128, CipherSuite::Tkip],
            group_ciphers: vec![CipherSuite::Ccmp128, CipherSuite::Gcmp128, CipherSuite::Tkip],
            akms: vec![AkmSuite::Psk, AkmSuite::FtPsk, AkmSuite::Ieee8021x],
            allow_wpa1: true,
            allow_wapi: false,
            allow_wep: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Open,
    Wep,
    Wpa1,
    Rsn,
    Wapi,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecuritySelection {
    pub protocol: Protocol,
    pub group: Option<Cipher>,
    pub pairwise: Option<Cipher>,
    pub akm: Option<Akm>,
    /// Complete element to offer in the association request; empty without one.
    pub ie: Vec<u8>,
}

impl SecuritySelection {
    fn without_ie(protocol: Protocol) -> Self {
        Self { protocol, group: None, pairwise: None, akm: None, ie: vec![] }
    }

    /// Whether keys are negotiated after association before the port opens.
    pub fn negotiates_keys(&self) -> bool {
        matches!(self.protocol, Protocol::Wpa1 | Protocol::Rsn | Protocol::Wapi)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("no mutually supported pairwise cipher")]
    NoPairwiseCipher,
    #[error("group cipher {0:?} rejected by policy")]
    GroupCipherRejected(Option<Cipher>),
    #[error("no mutually supported key management suite")]
    NoAkm,
    #[error("credential does not fit the network's protection")]
    CredentialMismatch,
    #[error("{0:?} disabled by policy")]
    ProtocolDisabled(Protocol),
    #[error("malformed security element")]
    Malformed,
}

struct Suites {
    group: Cipher,
    pairwise: Cipher,
    akm: Akm,
}

fn choose(
    policy: &SecurityPolicy,
    credential: &Credential,
    group: Option<Cipher>,
    pairwise: &[Cipher],
    akms: &[Akm],
) -> Result<Suites, SecurityError> {
    let group = group
        .filter(|g| policy.group_ciphers.iter().any(|suite| suite.matches(g)))
        .ok_or(SecurityError::GroupCipherRejected(group))?;
    let pairwise = policy
        .pairwise_ciphers
        .iter()
        .find_map(|suite| pairwise.iter().find(|c| suite.matches(c)))
        .copied()
        .ok_or(SecurityError::NoPairwiseCipher)?;
    let passphrase = !matches!(credential, Credential::None);
    let akm = policy
        .akms
        .iter()
        .filter(|suite| suite.uses_passphrase() == passphrase)
        .find_map(|suite| akms.iter().find(|a| suite.matches(a)))
        .copied()
        .ok_or(SecurityError::NoAkm)?;
    Ok(Suites { group, pairwise, akm })
}

/// Picks the protocol and suites to use with `bss`. Elements are preferred in the order RSN,
/// WAPI, WPA1.
pub fn select(
    bss: &BssDescription,
    credential: &Credential,
    policy: &SecurityPolicy,
) -> Result<SecuritySelection, SecurityError> {
    if let Some(body) = bss.rsne() {
        let rsne = Rsne::parse(body).map_err(|_| SecurityError::Malformed)?;
        let suites = choose(
            policy,
            credential,
            rsne.group_data_cipher_suite,
            &rsne.pairwise_cipher_suites,
            &rsne.akm_suites,
        )?;
        let offered = Rsne {
            version: 1,
            group_data_cipher_suite: Some(suites.group),
            pairwise_cipher_suites: vec![suites.pairwise],
            akm_suites: vec![suites.akm],
            rsn_capabilities: Some(0),
        };
        let mut ie = vec![];
        offered.write_into(&mut ie).map_err(|_| SecurityError::Malformed)?;
        return Ok(selection(Protocol::Rsn, suites, ie));
    }

    if let Some(body) = bss.wapi_ie() {
        if !policy.allow_wapi {
            return Err(SecurityError::ProtocolDisabled(Protocol::Wapi));
        }
        let wapi = WapiIe::parse(body).map_err(|_| SecurityError::Malformed)?;
        let suites = choose(
            policy,
            credential,
            Some(wapi.multicast_cipher),
            &wapi.unicast_cipher_suites,
            &wapi.akm_suites,
        )?;
        let offered = WapiIe {
            version: 1,
            akm_suites: vec![suites.akm],
            unicast_cipher_suites: vec![suites.pairwise],
            multicast_cipher: suites.group,
            capabilities: 0,
        };
        let mut ie = vec![];
        offered.write_into(&mut ie).map_err(|_| SecurityError::Malformed)?;
        return Ok(selection(Protocol::Wapi, suites, ie));
    }

    if let Some(body) = bss.wpa_ie() {
        if !policy.allow_wpa1 {
            return Err(SecurityError::ProtocolDisabled(Protocol::Wpa1));
        }
        let wpa = WpaIe::parse(body).map_err(|_| SecurityError::Malformed)?;
        let suites = choose(
            policy,
            credential,
            Some(wpa.multicast_cipher),
            &wpa.unicast_cipher_list,
            &wpa.akm_list,
        )?;
        let offered = WpaIe {
            multicast_cipher: suites.group,
            unicast_cipher_list: vec![suites.pairwise],
            akm_list: vec![suites.akm],
        };
        let mut ie = vec![];
        offered.write_into(&mut ie).map_err(|_| SecurityError::Malformed)?;
        return Ok(selection(Protocol::Wpa1, suites, ie));
    }

    if bss.is_protected() {
        if !policy.allow_wep {
            return Err(SecurityError::ProtocolDisabled(Protocol::Wep));
        }
        return match credential {
            Credential::None => Err(SecurityError::CredentialMismatch),
            _ => Ok(SecuritySelection::without_ie(Protocol::Wep)),
        };
    }

    match credential {
        Credential::None => Ok(SecuritySelection::without_ie(Protocol::Open)),
        _ => Err(SecurityError::CredentialMismatch),
    }
}

fn selection(protocol: Protocol, suites: Suites, ie: Vec<u8>) -> SecuritySelection {
    SecuritySelection {
        protocol,
        group: Some(suites.group),
        pairwise: Some(suites.pairwise),
        akm: Some(suites.akm),
        ie,
    }
}
