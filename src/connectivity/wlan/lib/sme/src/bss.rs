// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::ie::{self, Id, Oui},
    bitflags::bitflags,
    bytes::Bytes,
};

pub type MacAddr = [u8; 6];
pub type Ssid = Vec<u8>;

pub trait MacFmt {
    fn to_mac_str(&self) -> String;
}

impl MacFmt for MacAddr {
    fn to_mac_str(&self) -> String {
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5]
        )
    }
}

bitflags! {
    /// Capability information field (IEEE Std 802.11-2016, 9.4.1.4).
    pub struct CapabilityInfo: u16 {
        const ESS = 1 << 0;
        const IBSS = 1 << 1;
        const PRIVACY = 1 << 4;
        const SHORT_PREAMBLE = 1 << 5;
        const QOS = 1 << 9;
    }
}

/// A BSS as reported by a probe scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BssDescription {
    pub bssid: MacAddr,
    pub channel: u8,
    pub rssi_dbm: i8,
    pub capability: CapabilityInfo,
    pub ies: Bytes,
}

impl BssDescription {
    pub fn ssid(&self) -> &[u8] {
        ie::ssid(&self.ies[..]).unwrap_or(&[])
    }

    pub fn is_ibss(&self) -> bool {
        self.capability.contains(CapabilityInfo::IBSS)
    }

    pub fn supports_qos(&self) -> bool {
        self.capability.contains(CapabilityInfo::QOS)
    }

    pub fn is_protected(&self) -> bool {
        self.capability.contains(CapabilityInfo::PRIVACY)
            || self.rsne().is_some()
            || self.wpa_ie().is_some()
            || self.wapi_ie().is_some()
    }

    pub fn rsne(&self) -> Option<&[u8]> {
        ie::find(Id::RSNE, &self.ies[..])
    }

    pub fn wpa_ie(&self) -> Option<&[u8]> {
        ie::find_vendor(Oui::MSFT, ie::WPA_VENDOR_TYPE, &self.ies[..])
    }

    pub fn wapi_ie(&self) -> Option<&[u8]> {
        ie::find(Id::WAPI, &self.ies[..])
    }
}
