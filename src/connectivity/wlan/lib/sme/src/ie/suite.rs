// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use nom::{bytes::complete::take, combinator::map, IResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Oui(pub [u8; 3]);

impl Oui {
    pub const DOT11: Oui = Oui([0x00, 0x0f, 0xac]);
    pub const MSFT: Oui = Oui([0x00, 0x50, 0xf2]);
    pub const WAPI: Oui = Oui([0x00, 0x14, 0x72]);
}

pub mod cipher {
    pub const GROUP_CIPHER_SUITE: u8 = 0;
    pub const WEP_40: u8 = 1;
    pub const TKIP: u8 = 2;
    pub const CCMP_128: u8 = 4;
    pub const WEP_104: u8 = 5;
    pub const BIP_CMAC_128: u8 = 6;
    pub const GCMP_128: u8 = 8;
    // WAPI OUI
    pub const SMS4: u8 = 1;
}

pub mod akm {
    pub const EAP: u8 = 1;
    pub const PSK: u8 = 2;
    pub const FT_PSK: u8 = 4;
    pub const SAE: u8 = 8;
    // WAPI OUI
    pub const WAPI_CERT: u8 = 1;
    pub const WAPI_PSK: u8 = 2;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cipher {
    pub oui: Oui,
    pub suite_type: u8,
}

impl Cipher {
    pub fn new(oui: Oui, suite_type: u8) -> Self {
        Self { oui, suite_type }
    }

    pub fn new_dot11(suite_type: u8) -> Self {
        Self::new(Oui::DOT11, suite_type)
    }

    pub fn is_wep(&self) -> bool {
        self.oui != Oui::WAPI && matches!(self.suite_type, cipher::WEP_40 | cipher::WEP_104)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Akm {
    pub oui: Oui,
    pub suite_type: u8,
}

impl Akm {
    pub fn new(oui: Oui, suite_type: u8) -> Self {
        Self { oui, suite_type }
    }

    pub fn new_dot11(suite_type: u8) -> Self {
        Self::new(Oui::DOT11, suite_type)
    }
}

fn selector(input: &[u8]) -> IResult<&[u8], (Oui, u8)> {
    map(take(4usize), |b: &[u8]| (Oui([b[0], b[1], b[2]]), b[3]))(input)
}

pub(super) fn parse_cipher(input: &[u8]) -> IResult<&[u8], Cipher> {
    map(selector, |(oui, suite_type)| Cipher { oui, suite_type })(input)
}

pub(super) fn parse_akm(input: &[u8]) -> IResult<&[u8], Akm> {
    map(selector, |(oui, suite_type)| Akm { oui, suite_type })(input)
}

pub(super) fn write_cipher(buf: &mut Vec<u8>, cipher: &Cipher) {
    buf.extend_from_slice(&cipher.oui.0[..]);
    buf.push(cipher.suite_type);
}

pub(super) fn write_akm(buf: &mut Vec<u8>, akm: &Akm) {
    buf.extend_from_slice(&akm.oui.0[..]);
    buf.push(akm.suite_type);
}

pub(super) fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes()[..]);
}
