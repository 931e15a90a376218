// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{
        suite::{parse_akm, parse_cipher, write_akm, write_cipher, write_u16},
        write_header, Akm, Cipher, Id, IeError, Oui,
    },
    nom::{
        bytes::complete::take_while, combinator::eof, multi::length_count,
        number::complete::le_u16, IResult,
    },
};

pub const VENDOR_SPECIFIC_TYPE: u8 = 1;
pub const WPA_TYPE: u16 = 1;

/// The WPA1 vendor element. Only the fields after the OUI and vendor type are modelled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WpaIe {
    pub multicast_cipher: Cipher,
    pub unicast_cipher_list: Vec<Cipher>,
    pub akm_list: Vec<Akm>,
}

fn body(i: &[u8]) -> IResult<&[u8], WpaIe> {
    let (i, _wpa_type) = le_u16(i)?;
    let (i, multicast_cipher) = parse_cipher(i)?;
    let (i, unicast_cipher_list) = length_count(le_u16, parse_cipher)(i)?;
    let (i, akm_list) = length_count(le_u16, parse_akm)(i)?;
    // Some APs zero-pad this element.
    let (i, _) = take_while(|b: u8| b == 0)(i)?;
    let (i, _) = eof(i)?;
    Ok((i, WpaIe { multicast_cipher, unicast_cipher_list, akm_list }))
}

impl WpaIe {
    const FIXED_FIELDS_LENGTH: usize = 10;

    pub fn parse(bytes: &[u8]) -> Result<WpaIe, IeError> {
        body(bytes).map(|(_, wpa)| wpa).map_err(|_| IeError::Malformed("WPA element"))
    }

    pub fn len(&self) -> usize {
        Self::FIXED_FIELDS_LENGTH + self.unicast_cipher_list.len() * 4 + self.akm_list.len() * 4
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) -> Result<(), IeError> {
        write_header(buf, Id::VENDOR_SPECIFIC, 4 + self.len())?;
        buf.extend_from_slice(&Oui::MSFT.0[..]);
        buf.push(VENDOR_SPECIFIC_TYPE);
        write_u16(buf, WPA_TYPE);
        write_cipher(buf, &self.multicast_cipher);
        write_u16(buf, self.unicast_cipher_list.len() as u16);
        self.unicast_cipher_list.iter().for_each(|c| write_cipher(buf, c));
        write_u16(buf, self.akm_list.len() as u16);
        self.akm_list.iter().for_each(|a| write_akm(buf, a));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::ie::{akm, cipher, find_vendor},
    };

    #[rustfmt::skip]
    const DEFAULT_FRAME: [u8; 18] = [
        // WPA version
        0x01, 0x00,
        // Multicast cipher
        0x00, 0x50, 0xf2, 0x02,
        // Unicast cipher list
        0x01, 0x00, 0x00, 0x50, 0xf2, 0x02,
        // AKM list
        0x01, 0x00, 0x00, 0x50, 0xf2, 0x02,
    ];

    fn tkip_psk() -> WpaIe {
        WpaIe {
            multicast_cipher: Cipher::new(Oui::MSFT, cipher::TKIP),
            unicast_cipher_list: vec![Cipher::new(Oui::MSFT, cipher::TKIP)],
            akm_list: vec![Akm::new(Oui::MSFT, akm::PSK)],
        }
    }

    #[test]
    fn parse_correct() {
        assert_eq!(WpaIe::parse(&DEFAULT_FRAME[..]), Ok(tkip_psk()));
    }

    #[test]
    fn parse_with_padding() {
        let mut frame = DEFAULT_FRAME.to_vec();
        frame.resize(DEFAULT_FRAME.len() + 5, 0);
        assert_eq!(WpaIe::parse(&frame[..]), Ok(tkip_psk()));
    }

    #[test]
    fn parse_rejects_trailing_garbage() {
        let mut frame = DEFAULT_FRAME.to_vec();
        frame.push(0x07);
        assert!(WpaIe::parse(&frame[..]).is_err());
    }

    #[test]
    fn parse_rejects_bad_count() {
        let mut frame = DEFAULT_FRAME.to_vec();
        frame[6] = 0x16;
        assert!(WpaIe::parse(&frame[..]).is_err());
    }

    #[test]
    fn written_element_is_found_again() {
        let mut buf = vec![];
        tkip_psk().write_into(&mut buf).expect("write wpa element");
        assert_eq!(find_vendor(Oui::MSFT, VENDOR_SPECIFIC_TYPE, &buf[..]), Some(&DEFAULT_FRAME[..]));
    }
}
