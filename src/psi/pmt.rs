//! Program Map Table, table_id 0x02. One PMT per program_map_PID, each
//! enrolled dynamically by `PsiStore::register_pmt_ops` once PAT reveals it.

use crate::constants::{stream_type_label, PMT_TID};
use crate::error::{Error, Result};
use crate::psi::descriptor::{decode_one, Descriptor};
use crate::psi::section::TableHeader;
use crate::bitreader::BitReader;

#[derive(Debug, Clone, Default)]
pub struct PmtSection {
    pub version: u8,
    pub program_number: u16,
    pub pcr_pid: u16,
    pub descriptors: Vec<Descriptor>,
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

impl StreamInfo {
    pub fn stream_type_label(&self) -> &'static str {
        stream_type_label(self.stream_type)
    }
}

pub fn decode(header: &TableHeader, data: &[u8]) -> Result<PmtSection> {
    if header.table_id != PMT_TID {
        return Err(Error::InvalidTableId);
    }
    if data.len() < 4 {
        return Err(Error::TruncatedInput);
    }

    let mut r = BitReader::new(data);
    let pcr_pid = r.read_u16()? & 0x1FFF;
    let program_info_length = (r.read_u16()? & 0x0FFF) as usize;

    let mut descriptors = Vec::new();
    let descriptors_end = r.position() + program_info_length;
    while r.position() < descriptors_end {
        descriptors.push(decode_one(&mut r)?);
    }

    let mut streams = Vec::new();
    while r.remaining() >= 5 {
        let stream_type = r.read_u8()?;
        let elementary_pid = r.read_u16()? & 0x1FFF;
        let es_info_length = (r.read_u16()? & 0x0FFF) as usize;
        let es_end = r.position() + es_info_length;
        if es_end > data.len() {
            return Err(Error::TruncatedInput);
        }
        let mut es_descriptors = Vec::new();
        while r.position() < es_end {
            es_descriptors.push(decode_one(&mut r)?);
        }
        streams.push(StreamInfo { stream_type, elementary_pid, descriptors: es_descriptors });
    }

    Ok(PmtSection {
        version: header.version_number.unwrap_or(0),
        program_number: header.table_id_ext,
        pcr_pid,
        descriptors,
        streams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::descriptor::STREAM_IDENTIFIER_TAG;

    fn header() -> TableHeader {
        let mut h = TableHeader::new();
        h.table_id = PMT_TID;
        h.version_number = Some(0);
        h.table_id_ext = 1;
        h
    }

    #[test]
    fn decodes_pcr_pid_and_stream_loop() {
        let mut data = vec![0xE1, 0x00, 0x00, 0x00]; // PCR PID 0x100, no program descriptors
        data.extend_from_slice(&[0x02, 0xE1, 0x01, 0x00, 0x00]); // video ES, no descriptors
        let pmt = decode(&header(), &data).unwrap();
        assert_eq!(pmt.pcr_pid, 0x100);
        assert_eq!(pmt.program_number, 1);
        assert_eq!(
            pmt.streams,
            vec![StreamInfo { stream_type: 0x02, elementary_pid: 0x101, descriptors: vec![] }]
        );
        assert_eq!(pmt.streams[0].stream_type_label(), "ISO/IEC 13818-2 Video");
    }

    #[test]
    fn decodes_es_descriptor() {
        let mut data = vec![0xE1, 0x00, 0x00, 0x00];
        data.extend_from_slice(&[0x03, 0xE1, 0x02, 0x00, 0x03, STREAM_IDENTIFIER_TAG, 0x01, 0x09]);
        let pmt = decode(&header(), &data).unwrap();
        assert_eq!(
            pmt.streams[0].descriptors,
            vec![Descriptor::StreamIdentifier { component_tag: 9 }]
        );
    }
}
