//! Conditional Access Table, table_id 0x01, PID 0x0001.

use crate::constants::CAT_TID;
use crate::error::{Error, Result};
use crate::psi::descriptor::{decode_one, Descriptor};
use crate::psi::section::TableHeader;
use crate::bitreader::BitReader;

#[derive(Debug, Clone, Default)]
pub struct CatSection {
    pub version: u8,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode(header: &TableHeader, data: &[u8]) -> Result<CatSection> {
    if header.table_id != CAT_TID {
        return Err(Error::InvalidTableId);
    }

    let mut r = BitReader::new(data);
    let mut descriptors = Vec::new();
    while r.remaining() >= 2 {
        descriptors.push(decode_one(&mut r)?);
    }

    Ok(CatSection { version: header.version_number.unwrap_or(0), descriptors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::descriptor::CA_TAG;

    #[test]
    fn decodes_ca_descriptor_list() {
        let mut header = TableHeader::new();
        header.table_id = CAT_TID;
        header.version_number = Some(1);
        let data = [CA_TAG, 0x04, 0x00, 0x01, 0x1F, 0xFF];
        let cat = decode(&header, &data).unwrap();
        assert_eq!(
            cat.descriptors,
            vec![Descriptor::Ca { ca_system_id: 1, ca_pid: 0x1FFF }]
        );
    }
}
