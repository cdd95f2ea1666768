//! Time and Date Table (0x70) / Time Offset Table (0x73), PID 0x0014.
//!
//! Both are short-form sections (`section_syntax_indicator == 0`) and never
//! span more than one section, so they bypass [`crate::psi::section::TableHeader`]
//! entirely and are parsed directly from the buffer the TS reassembler hands
//! over — mirroring the source's `parse_tdt`/`parse_tot`, which read straight
//! off `pbuf` rather than going through the generic section machinery. Unlike
//! every other short-form table in this stream, TOT still carries a trailing
//! CRC-32; TDT does not.

use chrono::NaiveDateTime;
use crc::{Crc, CRC_32_MPEG_2};

use crate::constants::{TDT_TID, TOT_TID};
use crate::error::{Error, Result};
use crate::psi::descriptor::{decode_one, Descriptor};
use crate::psi::time::decode_utc_time;
use crate::bitreader::BitReader;

const CRC32_MPEG2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

#[derive(Debug, Clone, PartialEq)]
pub struct TdtSection {
    pub utc_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotSection {
    pub utc_time: NaiveDateTime,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TdtTot {
    Tdt(TdtSection),
    Tot(TotSection),
}

/// `buf` is the section starting at `table_id`, as handed over by the TS
/// reassembler (pointer_field already stripped).
pub fn decode(buf: &[u8]) -> Result<TdtTot> {
    if buf.len() < 3 {
        return Err(Error::TruncatedInput);
    }
    let table_id = buf[0];
    let section_length = (u16::from_be_bytes([buf[1], buf[2]]) & 0x0FFF) as usize;
    let end = 3 + section_length;
    if buf.len() < end {
        return Err(Error::TruncatedInput);
    }

    match table_id {
        TDT_TID => {
            let body = &buf[3..end];
            if body.len() < 5 {
                return Err(Error::TruncatedInput);
            }
            let field: [u8; 5] = body[..5].try_into().unwrap();
            let utc_time = decode_utc_time(&field)?;
            Ok(TdtTot::Tdt(TdtSection { utc_time }))
        }
        TOT_TID => {
            if end < 4 {
                return Err(Error::TruncatedInput);
            }
            let (signed_part, crc_bytes) = buf[..end].split_at(end - 4);
            let expected = u32::from_be_bytes(crc_bytes.try_into().unwrap());
            if CRC32_MPEG2.checksum(signed_part) != expected {
                return Err(Error::CrcMismatch);
            }
            let body = &signed_part[3..];
            if body.len() < 7 {
                return Err(Error::TruncatedInput);
            }
            let field: [u8; 5] = body[..5].try_into().unwrap();
            let utc_time = decode_utc_time(&field)?;
            let mut r = BitReader::new(&body[5..]);
            let descriptors_loop_length = (r.read_u16()? & 0x0FFF) as usize;
            let mut descriptors = Vec::new();
            let loop_end = r.position() + descriptors_loop_length;
            while r.position() < loop_end && r.remaining() > 0 {
                descriptors.push(decode_one(&mut r)?);
            }
            Ok(TdtTot::Tot(TotSection { utc_time, descriptors }))
        }
        _ => Err(Error::InvalidTableId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tdt_without_crc() {
        let mut buf = vec![TDT_TID, 0xB0, 0x05];
        buf.extend_from_slice(&[0xC0, 0x79, 0x12, 0x45, 0x00]);
        match decode(&buf).unwrap() {
            TdtTot::Tdt(tdt) => assert_eq!(tdt.utc_time.to_string(), "1993-10-13 12:45:00"),
            _ => panic!("expected TDT"),
        }
    }

    #[test]
    fn decodes_tot_with_crc_and_descriptors() {
        let mut section = vec![TOT_TID, 0xF0, 0x00];
        section.extend_from_slice(&[0xC0, 0x79, 0x12, 0x45, 0x00]);
        section.extend_from_slice(&[0x00, 0x00]); // descriptors_loop_length = 0
        let section_length = (section.len() - 3 + 4) as u16;
        section[1] = 0xF0 | ((section_length >> 8) as u8 & 0x0F);
        section[2] = (section_length & 0xFF) as u8;
        let crc = CRC32_MPEG2.checksum(&section);
        section.extend_from_slice(&crc.to_be_bytes());

        match decode(&section).unwrap() {
            TdtTot::Tot(tot) => {
                assert_eq!(tot.utc_time.to_string(), "1993-10-13 12:45:00");
                assert!(tot.descriptors.is_empty());
            }
            _ => panic!("expected TOT"),
        }
    }

    #[test]
    fn tot_crc_mismatch_is_rejected() {
        let mut section = vec![TOT_TID, 0xF0, 0x00];
        section.extend_from_slice(&[0xC0, 0x79, 0x12, 0x45, 0x00]);
        section.extend_from_slice(&[0x00, 0x00]);
        let section_length = (section.len() - 3 + 4) as u16;
        section[1] = 0xF0 | ((section_length >> 8) as u8 & 0x0F);
        section[2] = (section_length & 0xFF) as u8;
        section.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(decode(&section), Err(Error::CrcMismatch));
    }
}
