//! Per-(PID, table_id) section reassembly: `TableHeader` + absorb algorithm.
//!
//! A `TableHeader` is embedded in every per-table state (`PatState`,
//! `PmtState`, ...) and owns the section_number bitmap, the per-slot payload
//! slices, and the concatenated buffer exposed once a table version is fully
//! received. Multiple sections belonging to the same `version_number` are
//! absorbed one at a time; `section_bitmap` tracks which `section_number`s
//! have arrived so completeness can be tested without rescanning the slots.

use crate::bitreader::BitReader;
use crate::constants::{MAX_LONG_SECTION_LENGTH, MAX_SHORT_SECTION_LENGTH};
use crate::error::{Error, Result};
use crc::{Crc, CRC_32_MPEG_2};

const CRC32_MPEG2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Result of feeding one candidate section buffer to a [`TableHeader`].
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// All sections for the current version are present; the table parser
    /// should now decode `TableHeader::private_data_byte`.
    Complete,
    /// Accepted, but more sections are still expected for this version.
    Buffering,
    /// This `section_number` was already seen for the current version.
    Duplicate,
}

/// 256-bit presence bitmap over `section_number`.
#[derive(Default, Clone)]
struct SectionBitmap([u64; 4]);

impl SectionBitmap {
    fn is_set(&self, n: u8) -> bool {
        self.0[n as usize / 64] & (1u64 << (n % 64)) != 0
    }

    fn set(&mut self, n: u8) {
        self.0[n as usize / 64] |= 1u64 << (n % 64);
    }

    fn clear(&mut self) {
        self.0 = [0; 4];
    }

    fn full_through(&self, last: u8) -> bool {
        (0..=last).all(|n| self.is_set(n))
    }
}

/// Reassembly state for one logical table (PAT, a single PMT, NIT_actual, ...).
pub struct TableHeader {
    pub table_id: u8,
    pub syntax_indicator: bool,
    pub private_bit: bool,
    pub section_length: u16,
    pub table_id_ext: u16,
    /// `None` until the first section for this table ever arrives.
    pub version_number: Option<u8>,
    pub current_next_indicator: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    bitmap: SectionBitmap,
    slots: Vec<Option<Vec<u8>>>,
    /// CRC-verified, CRC-stripped concatenation of all slots, set on `Complete`.
    pub private_data_byte: Option<Vec<u8>>,
}

impl Default for TableHeader {
    fn default() -> Self {
        Self {
            table_id: 0,
            syntax_indicator: true,
            private_bit: false,
            section_length: 0,
            table_id_ext: 0,
            version_number: None,
            current_next_indicator: false,
            section_number: 0,
            last_section_number: 0,
            bitmap: SectionBitmap::default(),
            slots: vec![None; 256],
            private_data_byte: None,
        }
    }
}

impl TableHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one candidate section buffer (header through CRC, or to the
    /// end of a short-form section). The TS packet reassembler has already
    /// stripped the `pointer_field`.
    pub fn absorb(&mut self, buf: &[u8]) -> Result<Outcome> {
        if buf.is_empty() {
            return Err(Error::NullPointer);
        }
        let mut r = BitReader::new(buf);
        let table_id = r.read_u8()?;
        let syntax_indicator = r.peek_bit(0)?;
        let private_bit = r.peek_bit(1)?;
        let section_length = r.read_u16()? & 0x0FFF;

        let cap = if syntax_indicator {
            MAX_LONG_SECTION_LENGTH
        } else {
            MAX_SHORT_SECTION_LENGTH
        };
        if section_length > cap {
            return Err(Error::InvalidSectionLength);
        }

        self.table_id = table_id;
        self.syntax_indicator = syntax_indicator;
        self.private_bit = private_bit;
        self.section_length = section_length;

        if !syntax_indicator {
            let payload_len = buf.len().saturating_sub(3);
            self.slots[0] = Some(buf[3..3 + payload_len].to_vec());
            self.private_data_byte = self.slots[0].clone();
            return Ok(Outcome::Complete);
        }

        let table_id_ext = r.read_u16()?;
        let version_byte = r.read_u8()?;
        let version_number = (version_byte >> 1) & 0x1F;
        let current_next_indicator = version_byte & 0x01 != 0;
        let section_number = r.read_u8()?;
        let last_section_number = r.read_u8()?;

        // Each section carries its own CRC-32 over table_id..data (everything
        // but that section's trailing 4 bytes). Verify and strip it here so
        // slots hold data only; the concatenation below needs no further
        // CRC bookkeeping regardless of how many sections make up the table.
        let section_end = 3 + section_length as usize;
        if buf.len() < section_end || section_length < 9 {
            return Err(Error::TruncatedInput);
        }
        let (with_crc, _trailing) = buf.split_at(section_end);
        let (signed_part, crc_bytes) = with_crc.split_at(with_crc.len() - 4);
        let expected = u32::from_be_bytes(crc_bytes.try_into().unwrap());
        let actual = CRC32_MPEG2.checksum(signed_part);
        if actual != expected {
            return Err(Error::CrcMismatch);
        }

        let is_version_bump = match self.version_number {
            None => true,
            Some(cur) => version_number > cur,
        };
        if is_version_bump {
            self.private_data_byte = None;
            self.slots = vec![None; 256];
            self.bitmap.clear();
            self.version_number = Some(version_number);
        }

        self.table_id_ext = table_id_ext;
        self.last_section_number = last_section_number;
        self.current_next_indicator = current_next_indicator;
        self.section_number = section_number;

        if self.bitmap.is_set(section_number) {
            return Ok(Outcome::Duplicate);
        }

        // Data between the fixed 8-byte section header and the CRC.
        let data = &signed_part[8..];
        self.slots[section_number as usize] = Some(data.to_vec());
        self.bitmap.set(section_number);

        if !self.bitmap.full_through(last_section_number) {
            return Ok(Outcome::Buffering);
        }

        let mut concatenated = Vec::new();
        for n in 0..=last_section_number {
            let slot = self.slots[n as usize]
                .take()
                .expect("bitmap says slot is present");
            concatenated.extend_from_slice(&slot);
        }

        self.private_data_byte = Some(concatenated);
        Ok(Outcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc::{Crc, CRC_32_MPEG_2};

    fn crc_append(mut section_without_crc: Vec<u8>) -> Vec<u8> {
        let crc = Crc::<u32>::new(&CRC_32_MPEG_2).checksum(&section_without_crc);
        section_without_crc.extend_from_slice(&crc.to_be_bytes());
        section_without_crc
    }

    #[test]
    fn single_section_completes_immediately() {
        let mut buf = vec![0x00u8, 0xB0, 0x0A, 0x00, 0x01, 0xC1, 0x00, 0x00, 0xAB];
        buf = crc_append(buf);

        let mut hdr = TableHeader::new();
        let outcome = hdr.absorb(&buf).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(hdr.private_data_byte.as_deref(), Some(&[0xABu8][..]));
    }

    #[test]
    fn duplicate_section_number_is_rejected() {
        let mut buf = vec![0x00u8, 0xB0, 0x0A, 0x00, 0x01, 0xC1, 0x00, 0x00, 0xAB];
        buf = crc_append(buf);
        let mut hdr = TableHeader::new();
        assert_eq!(hdr.absorb(&buf).unwrap(), Outcome::Complete);
        assert_eq!(hdr.absorb(&buf).unwrap(), Outcome::Duplicate);
    }

    #[test]
    fn version_bump_resets_bitmap() {
        let mut buf_v5 = vec![0x42u8, 0xB0, 0x0A, 0x10, 0x00, (5 << 1) | 1, 0x00, 0x00, 0x01];
        buf_v5 = crc_append(buf_v5);
        let mut hdr = TableHeader::new();
        assert_eq!(hdr.absorb(&buf_v5).unwrap(), Outcome::Complete);
        assert_eq!(hdr.version_number, Some(5));

        let mut buf_v6 = vec![0x42u8, 0xB0, 0x0A, 0x10, 0x00, (6 << 1) | 1, 0x00, 0x00, 0x02];
        buf_v6 = crc_append(buf_v6);
        assert_eq!(hdr.absorb(&buf_v6).unwrap(), Outcome::Complete);
        assert_eq!(hdr.private_data_byte.as_deref(), Some(&[0x02u8][..]));
    }

    #[test]
    fn oversized_section_length_rejected() {
        // 0x3FE exceeds the long-form cap of 0x3FD.
        let buf = [0x00u8, 0xB3, 0xFE, 0, 0, 0, 0, 0];
        let mut hdr = TableHeader::new();
        assert_eq!(hdr.absorb(&buf), Err(Error::InvalidSectionLength));
    }

    #[test]
    fn max_long_section_length_accepted_if_well_formed() {
        let body_len = (MAX_LONG_SECTION_LENGTH as usize) - 5 - 4;
        let mut buf = vec![0x00u8, 0xB3, 0xFD, 0x00, 0x01, 0xC1, 0x00, 0x00];
        buf.extend(std::iter::repeat(0u8).take(body_len));
        let buf = crc_append(buf);
        let mut hdr = TableHeader::new();
        assert_eq!(hdr.absorb(&buf).unwrap(), Outcome::Complete);
    }

    #[test]
    fn multi_section_table_concatenates_in_order() {
        let mut sec0 = vec![0x40u8, 0xB0, 0x0A, 0x00, 0x01, (2 << 1) | 1, 0x00, 0x01, 0xAA];
        sec0 = crc_append(sec0);
        let mut sec1 = vec![0x40u8, 0xB0, 0x0A, 0x00, 0x01, (2 << 1) | 1, 0x01, 0x01, 0xBB];
        sec1 = crc_append(sec1);

        let mut hdr = TableHeader::new();
        assert_eq!(hdr.absorb(&sec0).unwrap(), Outcome::Buffering);
        assert_eq!(hdr.absorb(&sec1).unwrap(), Outcome::Complete);
        assert_eq!(hdr.private_data_byte.as_deref(), Some(&[0xAAu8, 0xBB][..]));
    }
}
