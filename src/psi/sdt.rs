//! Service Description Table, table_id 0x42 (actual) / 0x46 (other), PID 0x0011.

use crate::constants::{SDT_ACTUAL_TID, SDT_OTHER_TID};
use crate::error::{Error, Result};
use crate::psi::descriptor::{decode_one, Descriptor};
use crate::psi::section::TableHeader;
use crate::bitreader::BitReader;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntry {
    pub service_id: u16,
    pub eit_schedule_flag: bool,
    pub eit_present_following_flag: bool,
    pub running_status: u8,
    pub free_ca_mode: bool,
    pub descriptors: Vec<Descriptor>,
}

impl ServiceEntry {
    /// Convenience accessor mirroring the teacher's `service_name` field,
    /// pulled from the service descriptor (tag 0x48) if present.
    pub fn service_name(&self) -> Option<&str> {
        self.descriptors.iter().find_map(|d| match d {
            Descriptor::Service { service_name, .. } => Some(service_name.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SdtSection {
    pub version: u8,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub services: Vec<ServiceEntry>,
}

pub fn decode(header: &TableHeader, data: &[u8]) -> Result<SdtSection> {
    if header.table_id != SDT_ACTUAL_TID && header.table_id != SDT_OTHER_TID {
        return Err(Error::InvalidTableId);
    }
    if data.len() < 3 {
        return Err(Error::TruncatedInput);
    }

    let mut r = BitReader::new(data);
    let original_network_id = r.read_u16()?;
    r.skip(1)?; // reserved_future_use

    // loop_len is the lesser of what the section declared and what's
    // actually left in the buffer; preserved from the source as-is.
    let loop_len = data.len() - 3;

    let mut services = Vec::new();
    let loop_end = (r.position() + loop_len).min(data.len());
    while r.position() + 5 <= loop_end {
        let service_id = r.read_u16()?;
        let flags = r.read_u8()?;
        let eit_schedule_flag = flags & 0x02 != 0;
        let eit_present_following_flag = flags & 0x01 != 0;
        let running_status_and_len = r.read_u16()?;
        let running_status = (running_status_and_len >> 13) as u8;
        let free_ca_mode = running_status_and_len & 0x1000 != 0;
        let desc_len = (running_status_and_len & 0x0FFF) as usize;
        let entry_end = r.position() + desc_len;
        if entry_end > loop_end {
            return Err(Error::TruncatedInput);
        }
        let mut descriptors = Vec::new();
        while r.position() < entry_end {
            descriptors.push(decode_one(&mut r)?);
        }
        services.push(ServiceEntry {
            service_id,
            eit_schedule_flag,
            eit_present_following_flag,
            running_status,
            free_ca_mode,
            descriptors,
        });
    }

    Ok(SdtSection {
        version: header.version_number.unwrap_or(0),
        transport_stream_id: header.table_id_ext,
        original_network_id,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::descriptor::SERVICE_TAG;

    #[test]
    fn decodes_service_entry_with_name() {
        let mut header = TableHeader::new();
        header.table_id = SDT_ACTUAL_TID;
        header.version_number = Some(1);
        header.table_id_ext = 7;

        let mut descriptor = vec![SERVICE_TAG, 0x06, 0x01, 0x00];
        descriptor.push(3);
        descriptor.extend_from_slice(b"ACM");
        let desc_len = descriptor.len() as u16;
        let running_status_and_len = (4u16 << 13) | desc_len;

        let mut data = vec![0x00, 0x09, 0x00]; // original_network_id=9, reserved
        data.extend_from_slice(&[0x00, 0x2A]); // service_id=42
        data.push(0x03); // eit_schedule_flag + eit_present_following_flag
        data.extend_from_slice(&running_status_and_len.to_be_bytes());
        data.extend_from_slice(&descriptor);

        let sdt = decode(&header, &data).unwrap();
        assert_eq!(sdt.transport_stream_id, 7);
        assert_eq!(sdt.original_network_id, 9);
        assert_eq!(sdt.services.len(), 1);
        let svc = &sdt.services[0];
        assert_eq!(svc.service_id, 42);
        assert!(svc.eit_schedule_flag);
        assert!(svc.eit_present_following_flag);
        assert_eq!(svc.running_status, 4);
        assert_eq!(svc.service_name(), Some("ACM"));
    }
}
