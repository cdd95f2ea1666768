//! UTC time field decoding for TDT/TOT: 16-bit Modified Julian Date plus
//! three BCD bytes for hour/minute/second, per EN 300 468 annex C. The
//! source stores this 5-byte field raw (`memcpy(&pTDT->utc_time, pdata, 5)`);
//! this crate decodes it into a `chrono::NaiveDateTime` instead.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

fn bcd_to_u32(byte: u8) -> u32 {
    ((byte >> 4) * 10 + (byte & 0x0F)) as u32
}

/// Decode the 5-byte `MJD_date + UTC_time` field found at the start of a
/// TDT/TOT body.
pub fn decode_utc_time(field: &[u8; 5]) -> Result<NaiveDateTime> {
    let mjd = u16::from_be_bytes([field[0], field[1]]) as i64;

    // Annex C conversion from Modified Julian Date to y/m/d.
    let yp = ((mjd as f64 - 15078.2) / 365.25) as i64;
    let mp = ((mjd as f64 - 14956.1 - (yp as f64 * 365.25).trunc()) / 30.6001) as i64;
    let day = mjd - 14956 - (yp as f64 * 365.25) as i64 - (mp as f64 * 30.6001) as i64;
    let k = if mp == 14 || mp == 15 { 1 } else { 0 };
    let year = 1900 + yp + k;
    let month = mp - 1 - k * 12;

    let hour = bcd_to_u32(field[2]);
    let minute = bcd_to_u32(field[3]);
    let second = bcd_to_u32(field[4]);

    let date =
        NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or(Error::TruncatedInput)?;
    date.and_hms_opt(hour, minute, second)
        .ok_or(Error::TruncatedInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_en_300_468_worked_example() {
        // 1993-10-13 12:45:00, the worked example from EN 300 468 annex C.
        let field = [0xC0, 0x79, 0x12, 0x45, 0x00];
        let dt = decode_utc_time(&field).unwrap();
        assert_eq!(dt.to_string(), "1993-10-13 12:45:00");
    }

    #[test]
    fn decodes_another_date() {
        let field = [0xE2, 0x09, 0x12, 0x34, 0x56];
        let dt = decode_utc_time(&field).unwrap();
        assert_eq!(dt.to_string(), "2017-04-22 12:34:56");
    }
}
