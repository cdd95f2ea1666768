//! Event Information Table, table_ids 0x4E..0x6F, PID 0x0012.
//! Detailed event decoding is out of scope; only presence and length are
//! retained, mirroring the source's `eit_proc` which only bumps a counter.

use crate::constants::{EIT_TID_HIGH, EIT_TID_LOW};
use crate::error::{Error, Result};
use crate::psi::section::TableHeader;

#[derive(Debug, Clone, Copy, Default)]
pub struct EitSection {
    pub version: u8,
    pub service_id: u16,
    pub section_length: u16,
}

pub fn decode(header: &TableHeader, _data: &[u8]) -> Result<EitSection> {
    if !(EIT_TID_LOW..=EIT_TID_HIGH).contains(&header.table_id) {
        return Err(Error::InvalidTableId);
    }
    Ok(EitSection {
        version: header.version_number.unwrap_or(0),
        service_id: header.table_id_ext,
        section_length: header.section_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_any_tid_in_the_eit_range() {
        let mut header = TableHeader::new();
        header.table_id = 0x50;
        header.version_number = Some(2);
        header.section_length = 42;
        let eit = decode(&header, &[]).unwrap();
        assert_eq!(eit.section_length, 42);
        assert_eq!(eit.version, 2);
    }

    #[test]
    fn rejects_tid_outside_range() {
        let mut header = TableHeader::new();
        header.table_id = 0x30;
        assert_eq!(decode(&header, &[]), Err(Error::InvalidTableId));
    }
}
