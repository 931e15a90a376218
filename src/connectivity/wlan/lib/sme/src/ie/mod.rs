// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub mod policy;
mod rsne;
mod suite;
mod wapi;
mod wpa;

pub use {
    rsne::Rsne,
    suite::{akm, cipher, Akm, Cipher, Oui},
    wapi::WapiIe,
    wpa::{WpaIe, VENDOR_SPECIFIC_TYPE as WPA_VENDOR_TYPE},
};

use thiserror::Error;

pub const SSID_MAX_LEN: usize = 32;
const BODY_MAX_LEN: usize = u8::MAX as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Id(pub u8);

impl Id {
    pub const SSID: Id = Id(0);
    pub const RSNE: Id = Id(48);
    pub const WAPI: Id = Id(68);
    pub const VENDOR_SPECIFIC: Id = Id(221);
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IeError {
    #[error("ssid is {0} bytes, at most {} allowed", SSID_MAX_LEN)]
    SsidTooLong(usize),
    #[error("element body is {0} bytes, at most {} allowed", BODY_MAX_LEN)]
    BodyTooLong(usize),
    #[error("malformed {0}")]
    Malformed(&'static str),
}

/// Iterates over `(id, body)` pairs of a chain of elements. A truncated trailing element ends
/// the iteration.
pub struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl<'a> Iterator for Reader<'a> {
    type Item = (Id, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, len) = match self.bytes {
            [id, len, ..] => (Id(*id), *len as usize),
            _ => return None,
        };
        if self.bytes.len() < 2 + len {
            self.bytes = &[];
            return None;
        }
        let body = &self.bytes[2..2 + len];
        self.bytes = &self.bytes[2 + len..];
        Some((id, body))
    }
}

/// Body of the first element with the given id.
pub fn find(id: Id, ies: &[u8]) -> Option<&[u8]> {
    Reader::new(ies).find(|(i, _)| *i == id).map(|(_, body)| body)
}

/// Body of the first vendor specific element of the given type, without the OUI and type bytes.
pub fn find_vendor(oui: Oui, vendor_type: u8, ies: &[u8]) -> Option<&[u8]> {
    Reader::new(ies)
        .filter(|(id, _)| *id == Id::VENDOR_SPECIFIC)
        .find_map(|(_, body)| match body {
            [a, b, c, t, rest @ ..] if [*a, *b, *c] == oui.0 && *t == vendor_type => Some(rest),
            _ => None,
        })
}

pub fn ssid(ies: &[u8]) -> Option<&[u8]> {
    find(Id::SSID, ies)
}

pub fn write_ssid(buf: &mut Vec<u8>, ssid: &[u8]) -> Result<(), IeError> {
    if ssid.len() > SSID_MAX_LEN {
        return Err(IeError::SsidTooLong(ssid.len()));
    }
    write_header(buf, Id::SSID, ssid.len())?;
    buf.extend_from_slice(ssid);
    Ok(())
}

pub(crate) fn write_header(buf: &mut Vec<u8>, id: Id, body_len: usize) -> Result<(), IeError> {
    if body_len > BODY_MAX_LEN {
        return Err(IeError::BodyTooLong(body_len));
    }
    buf.push(id.0);
    buf.push(body_len as u8);
    Ok(())
}
