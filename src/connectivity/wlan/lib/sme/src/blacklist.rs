// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::bss::MacAddr,
    std::collections::HashMap,
    wlan_fsm::time::Time,
};

/// BSSs that must not be joined until their entry expires.
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: HashMap<MacAddr, Time>,
}

impl Blacklist {
    /// Blacklists `bssid` until `until`. An existing longer entry is kept.
    pub fn add(&mut self, bssid: MacAddr, until: Time) {
        let entry = self.entries.entry(bssid).or_insert(until);
        if *entry < until {
            *entry = until;
        }
    }

    pub fn contains(&mut self, bssid: &MacAddr, now: Time) -> bool {
        self.entries.retain(|_, until| *until > now);
        self.entries.contains_key(bssid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
