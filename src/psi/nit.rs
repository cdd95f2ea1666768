//! Network Information Table, table_id 0x40 (actual) / 0x41 (other), PID 0x0010.
//! Shares its transport-stream-loop shape with [`crate::psi::bat`].

use crate::error::{Error, Result};
use crate::psi::descriptor::{decode_one, Descriptor};
use crate::psi::section::TableHeader;
use crate::bitreader::BitReader;
use crate::constants::{NIT_ACTUAL_TID, NIT_OTHER_TID};

#[derive(Debug, Clone, PartialEq)]
pub struct TransportEntry {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct NitSection {
    pub version: u8,
    pub network_id: u16,
    pub network_descriptors: Vec<Descriptor>,
    pub transports: Vec<TransportEntry>,
}

/// Shared shape: `header_ext:16, descriptors_length:12, descriptors...,
/// loop_length:12, (transport_stream_id:16, original_network_id:16,
/// descriptors_length:12, descriptors...)*`. Used by NIT (`header_ext` =
/// network_id) and BAT (`header_ext` = bouquet_id).
pub(super) fn decode_transport_loop_body(
    data: &[u8],
) -> Result<(u16, Vec<Descriptor>, Vec<TransportEntry>)> {
    if data.len() < 4 {
        return Err(Error::TruncatedInput);
    }
    let mut r = BitReader::new(data);
    let header_ext = r.read_u16()?;
    let descriptors_length = (r.read_u16()? & 0x0FFF) as usize;

    let mut descriptors = Vec::new();
    let descriptors_end = r.position() + descriptors_length;
    if descriptors_end > data.len() {
        return Err(Error::TruncatedInput);
    }
    while r.position() < descriptors_end {
        descriptors.push(decode_one(&mut r)?);
    }

    let loop_length = (r.read_u16()? & 0x0FFF) as usize;
    let loop_end = (r.position() + loop_length).min(data.len());

    let mut transports = Vec::new();
    while r.position() + 6 <= loop_end {
        let transport_stream_id = r.read_u16()?;
        let original_network_id = r.read_u16()?;
        let desc_len = (r.read_u16()? & 0x0FFF) as usize;
        let entry_end = r.position() + desc_len;
        if entry_end > loop_end {
            return Err(Error::TruncatedInput);
        }
        let mut entry_descriptors = Vec::new();
        while r.position() < entry_end {
            entry_descriptors.push(decode_one(&mut r)?);
        }
        transports.push(TransportEntry {
            transport_stream_id,
            original_network_id,
            descriptors: entry_descriptors,
        });
    }

    Ok((header_ext, descriptors, transports))
}

pub fn decode(header: &TableHeader, data: &[u8]) -> Result<NitSection> {
    if header.table_id != NIT_ACTUAL_TID && header.table_id != NIT_OTHER_TID {
        return Err(Error::InvalidTableId);
    }
    let (network_id, network_descriptors, transports) = decode_transport_loop_body(data)?;
    Ok(NitSection {
        version: header.version_number.unwrap_or(0),
        network_id,
        network_descriptors,
        transports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_network_id_and_transport_loop() {
        let mut header = TableHeader::new();
        header.table_id = NIT_ACTUAL_TID;
        header.version_number = Some(2);

        let mut data = vec![0x00, 0x01, 0x00, 0x00]; // network_id=1, no network descriptors
        data.extend_from_slice(&[0x00, 0x06]); // loop_length = 6 (one entry, no descriptors)
        data.extend_from_slice(&[0x00, 0x02, 0x00, 0x03, 0x00, 0x00]);

        let nit = decode(&header, &data).unwrap();
        assert_eq!(nit.network_id, 1);
        assert_eq!(
            nit.transports,
            vec![TransportEntry {
                transport_stream_id: 2,
                original_network_id: 3,
                descriptors: vec![],
            }]
        );
    }
}
