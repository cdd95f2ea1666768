//! Program Association Table, table_id 0x00, PID 0x0000.

use crate::constants::PAT_TID;
use crate::error::{Error, Result};
use crate::psi::section::TableHeader;

#[derive(Debug, Clone, Default)]
pub struct PatSection {
    pub version: u8,
    pub current_next: bool,
    pub transport_stream_id: u16,
    pub programs: Vec<PatEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatEntry {
    pub program_number: u16,
    pub program_map_pid: u16,
}

/// Decode a fully reassembled PAT body. `header` carries `table_id_ext`
/// (here the `transport_stream_id`), `version_number`, and
/// `current_next_indicator` from the section header; `data` is the
/// CRC-stripped, concatenated body the section assembler produced.
pub fn decode(header: &TableHeader, data: &[u8]) -> Result<PatSection> {
    if header.table_id != PAT_TID {
        return Err(Error::InvalidTableId);
    }

    let mut programs = Vec::new();
    for chunk in data.chunks_exact(4) {
        let program_number = u16::from_be_bytes([chunk[0], chunk[1]]);
        if program_number == 0xFFFF {
            break;
        }
        let pid = u16::from_be_bytes([chunk[2], chunk[3]]) & 0x1FFF;
        programs.push(PatEntry { program_number, program_map_pid: pid });
    }

    Ok(PatSection {
        version: header.version_number.unwrap_or(0),
        current_next: header.current_next_indicator,
        transport_stream_id: header.table_id_ext,
        programs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(version: u8, ts_id: u16) -> TableHeader {
        let mut h = TableHeader::new();
        h.table_id = PAT_TID;
        h.version_number = Some(version);
        h.current_next_indicator = true;
        h.table_id_ext = ts_id;
        h
    }

    #[test]
    fn decodes_program_entries_including_network_pid() {
        let header = header_with(3, 1);
        let mut data = Vec::new();
        data.extend_from_slice(&[0x00, 0x00, 0xE0, 0x10]); // program 0 -> network PID
        data.extend_from_slice(&[0x00, 0x01, 0xE1, 0x00]); // program 1 -> PMT PID 0x100
        let pat = decode(&header, &data).unwrap();
        assert_eq!(pat.version, 3);
        assert_eq!(pat.transport_stream_id, 1);
        assert_eq!(
            pat.programs,
            vec![
                PatEntry { program_number: 0, program_map_pid: 0x10 },
                PatEntry { program_number: 1, program_map_pid: 0x100 },
            ]
        );
    }

    #[test]
    fn stops_at_the_0xffff_terminator() {
        let header = header_with(0, 1);
        let mut data = Vec::new();
        data.extend_from_slice(&[0x00, 0x01, 0xE1, 0x00]); // program 1 -> PMT PID 0x100
        data.extend_from_slice(&[0xFF, 0xFF, 0xE2, 0x00]); // terminator
        data.extend_from_slice(&[0x00, 0x02, 0xE3, 0x00]); // must not be parsed as an entry
        let pat = decode(&header, &data).unwrap();
        assert_eq!(
            pat.programs,
            vec![PatEntry { program_number: 1, program_map_pid: 0x100 }]
        );
    }

    #[test]
    fn wrong_table_id_is_rejected() {
        let mut header = header_with(0, 0);
        header.table_id = 0xFF;
        assert_eq!(decode(&header, &[]), Err(Error::InvalidTableId));
    }
}
