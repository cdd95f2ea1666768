//! Bouquet Association Table, table_id 0x4A, PID 0x0011. The original source
//! carries no BAT support at all; this parser reuses NIT's transport-loop
//! shape (EN 300 468 §5.2.3), since the two tables are byte-for-byte
//! identical apart from the header field's name.

use crate::constants::BAT_TID;
use crate::error::{Error, Result};
use crate::psi::descriptor::Descriptor;
use crate::psi::nit::{decode_transport_loop_body, TransportEntry};
use crate::psi::section::TableHeader;

#[derive(Debug, Clone, Default)]
pub struct BatSection {
    pub version: u8,
    pub bouquet_id: u16,
    pub bouquet_descriptors: Vec<Descriptor>,
    pub transports: Vec<TransportEntry>,
}

pub fn decode(header: &TableHeader, data: &[u8]) -> Result<BatSection> {
    if header.table_id != BAT_TID {
        return Err(Error::InvalidTableId);
    }
    let (bouquet_id, bouquet_descriptors, transports) = decode_transport_loop_body(data)?;
    Ok(BatSection {
        version: header.version_number.unwrap_or(0),
        bouquet_id,
        bouquet_descriptors,
        transports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bouquet_id() {
        let mut header = TableHeader::new();
        header.table_id = BAT_TID;
        header.version_number = Some(0);
        let data = vec![0x00, 0x09, 0x00, 0x00, 0x00, 0x00];
        let bat = decode(&header, &data).unwrap();
        assert_eq!(bat.bouquet_id, 9);
        assert!(bat.transports.is_empty());
    }
}
