// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{
        suite::{parse_akm, parse_cipher, write_akm, write_cipher, write_u16},
        write_header, Akm, Cipher, Id, IeError,
    },
    nom::{combinator::cond, multi::length_count, number::complete::le_u16, IResult},
};

/// The WAPI parameter set element (GB 15629.11). Any BKID list is ignored on parse and never
/// written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WapiIe {
    pub version: u16,
    pub akm_suites: Vec<Akm>,
    pub unicast_cipher_suites: Vec<Cipher>,
    pub multicast_cipher: Cipher,
    pub capabilities: u16,
}

fn body(i: &[u8]) -> IResult<&[u8], WapiIe> {
    let (i, version) = le_u16(i)?;
    let (i, akm_suites) = length_count(le_u16, parse_akm)(i)?;
    let (i, unicast_cipher_suites) = length_count(le_u16, parse_cipher)(i)?;
    let (i, multicast_cipher) = parse_cipher(i)?;
    let (i, capabilities) = cond(!i.is_empty(), le_u16)(i)?;
    Ok((
        i,
        WapiIe {
            version,
            akm_suites,
            unicast_cipher_suites,
            multicast_cipher,
            capabilities: capabilities.unwrap_or(0),
        },
    ))
}

impl WapiIe {
    pub fn parse(bytes: &[u8]) -> Result<WapiIe, IeError> {
        body(bytes).map(|(_, wapi)| wapi).map_err(|_| IeError::Malformed("WAPI element"))
    }

    pub fn body_len(&self) -> usize {
        2 + 2 + 4 * self.akm_suites.len() + 2 + 4 * self.unicast_cipher_suites.len() + 4 + 2
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) -> Result<(), IeError> {
        write_header(buf, Id::WAPI, self.body_len())?;
        write_u16(buf, self.version);
        write_u16(buf, self.akm_suites.len() as u16);
        self.akm_suites.iter().for_each(|a| write_akm(buf, a));
        write_u16(buf, self.unicast_cipher_suites.len() as u16);
        self.unicast_cipher_suites.iter().for_each(|c| write_cipher(buf, c));
        write_cipher(buf, &self.multicast_cipher);
        write_u16(buf, self.capabilities);
        Ok(())
    }
}
