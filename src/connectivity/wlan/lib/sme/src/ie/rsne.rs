// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{
        suite::{parse_akm, parse_cipher, write_akm, write_cipher, write_u16},
        write_header, Akm, Cipher, Id, IeError,
    },
    nom::{
        combinator::cond,
        multi::length_count,
        number::complete::le_u16,
        IResult,
    },
};

/// The RSN element (IEEE Std 802.11-2016, 9.4.2.25). Every field after the version is
/// optional, but a field may only be present if all preceding ones are.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rsne {
    pub version: u16,
    pub group_data_cipher_suite: Option<Cipher>,
    pub pairwise_cipher_suites: Vec<Cipher>,
    pub akm_suites: Vec<Akm>,
    pub rsn_capabilities: Option<u16>,
}

fn body(i: &[u8]) -> IResult<&[u8], Rsne> {
    let (i, version) = le_u16(i)?;
    let (i, group_data_cipher_suite) = cond(!i.is_empty(), parse_cipher)(i)?;
    let (i, pairwise) = cond(!i.is_empty(), length_count(le_u16, parse_cipher))(i)?;
    let (i, akms) = cond(!i.is_empty(), length_count(le_u16, parse_akm))(i)?;
    // PMKID list and group management cipher are not used by the station.
    let (i, rsn_capabilities) = cond(!i.is_empty(), le_u16)(i)?;
    Ok((
        i,
        Rsne {
            version,
            group_data_cipher_suite,
            pairwise_cipher_suites: pairwise.unwrap_or_default(),
            akm_suites: akms.unwrap_or_default(),
            rsn_capabilities,
        },
    ))
}

impl Rsne {
    /// Parses the body of an RSN element.
    pub fn parse(bytes: &[u8]) -> Result<Rsne, IeError> {
        body(bytes).map(|(_, rsne)| rsne).map_err(|_| IeError::Malformed("RSNE"))
    }

    pub fn body_len(&self) -> usize {
        let mut len = 2;
        if self.group_data_cipher_suite.is_some() {
            len += 4;
        }
        if self.has_pairwise() {
            len += 2 + 4 * self.pairwise_cipher_suites.len();
        }
        if self.has_akms() {
            len += 2 + 4 * self.akm_suites.len();
        }
        if self.rsn_capabilities.is_some() {
            len += 2;
        }
        len
    }

    fn has_pairwise(&self) -> bool {
        !self.pairwise_cipher_suites.is_empty() || self.has_akms()
    }

    fn has_akms(&self) -> bool {
        !self.akm_suites.is_empty() || self.rsn_capabilities.is_some()
    }

    /// Writes the complete element, header included.
    pub fn write_into(&self, buf: &mut Vec<u8>) -> Result<(), IeError> {
        if self.group_data_cipher_suite.is_none() && self.has_pairwise() {
            return Err(IeError::Malformed("RSNE without group cipher"));
        }
        write_header(buf, Id::RSNE, self.body_len())?;
        write_u16(buf, self.version);
        if let Some(cipher) = &self.group_data_cipher_suite {
            write_cipher(buf, cipher);
        }
        if self.has_pairwise() {
            write_u16(buf, self.pairwise_cipher_suites.len() as u16);
            self.pairwise_cipher_suites.iter().for_each(|c| write_cipher(buf, c));
        }
        if self.has_akms() {
            write_u16(buf, self.akm_suites.len() as u16);
            self.akm_suites.iter().for_each(|a| write_akm(buf, a));
        }
        if let Some(caps) = self.rsn_capabilities {
            write_u16(buf, caps);
        }
        Ok(())
    }
}
