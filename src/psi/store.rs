//! The aggregated PSI/SI model, grounded on `table.c`'s global `psi_t psi`
//! and its `*_proc` dispatch functions, `init_table_ops`/`uninit_table_ops`,
//! and `register_pmt_ops`/`unregister_pmt_ops`.

use log::{debug, warn};

use crate::constants::{
    BAT_TID, CAT_PID, CAT_TID, EIT_PID, NIT_ACTUAL_TID, NIT_OTHER_TID, NIT_PID, PAT_PID, PAT_TID,
    PID_SPACE, PMT_TID, SDT_ACTUAL_TID, SDT_BAT_PID, SDT_OTHER_TID, TDT_TID, TDT_TOT_PID, TOT_TID,
};
use crate::error::Error;
use crate::psi::bat::{self, BatSection};
use crate::psi::cat::{self, CatSection};
use crate::psi::eit::{self, EitSection};
use crate::psi::filter::{FilterTable, TableKind};
use crate::psi::nit::{self, NitSection};
use crate::psi::pat::{self, PatSection};
use crate::psi::pmt::{self, PmtSection};
use crate::psi::sdt::{self, SdtSection};
use crate::psi::section::{Outcome, TableHeader};
use crate::psi::tdt::{self, TdtSection, TdtTot, TotSection};

/// Per-table section counters and per-error-kind rejection counters,
/// mirroring `struct table_stats` in the source.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub pat_sections: u64,
    pub cat_sections: u64,
    pub pmt_sections: u64,
    pub nit_actual_sections: u64,
    pub nit_other_sections: u64,
    pub bat_sections: u64,
    pub sdt_actual_sections: u64,
    pub sdt_other_sections: u64,
    pub eit_sections: u64,
    pub tdt_sections: u64,
    pub tot_sections: u64,

    pub null_pointer_rejections: u64,
    pub invalid_table_id_rejections: u64,
    pub invalid_section_length_rejections: u64,
    pub duplicate_rejections: u64,
    pub truncated_rejections: u64,
    pub crc_mismatch_rejections: u64,
}

impl Stats {
    fn record_error(&mut self, err: &Error) {
        match err {
            Error::NullPointer => self.null_pointer_rejections += 1,
            Error::InvalidTableId => self.invalid_table_id_rejections += 1,
            Error::InvalidSectionLength => self.invalid_section_length_rejections += 1,
            Error::DuplicateData => self.duplicate_rejections += 1,
            Error::TruncatedInput => self.truncated_rejections += 1,
            Error::CrcMismatch => self.crc_mismatch_rejections += 1,
        }
    }
}

struct PmtSlot {
    header: TableHeader,
    section: Option<PmtSection>,
}

/// Owns every PSI/SI table this crate tracks, plus the filter table that
/// routes incoming sections to the right parser.
pub struct PsiStore {
    pub filters: FilterTable,
    pub stats: Stats,

    pat_header: TableHeader,
    pub pat: Option<PatSection>,

    cat_header: TableHeader,
    pub cat: Option<CatSection>,

    pmt_slots: Vec<Option<PmtSlot>>,
    pmt_bitmap: Vec<u64>,

    nit_actual_header: TableHeader,
    pub nit_actual: Option<NitSection>,
    nit_other_header: TableHeader,
    pub nit_other: Option<NitSection>,

    bat_header: TableHeader,
    pub bat: Option<BatSection>,

    sdt_actual_header: TableHeader,
    pub sdt_actual: Option<SdtSection>,
    sdt_other_header: TableHeader,
    pub sdt_other: Option<SdtSection>,

    eit_header: TableHeader,
    pub eit: Option<EitSection>,

    pub tdt: Option<TdtSection>,
    pub tot: Option<TotSection>,
}

impl Default for PsiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PsiStore {
    pub fn new() -> Self {
        Self {
            filters: FilterTable::new(),
            stats: Stats::default(),
            pat_header: TableHeader::new(),
            pat: None,
            cat_header: TableHeader::new(),
            cat: None,
            pmt_slots: (0..PID_SPACE).map(|_| None).collect(),
            pmt_bitmap: vec![0u64; PID_SPACE / 64],
            nit_actual_header: TableHeader::new(),
            nit_actual: None,
            nit_other_header: TableHeader::new(),
            nit_other: None,
            bat_header: TableHeader::new(),
            bat: None,
            sdt_actual_header: TableHeader::new(),
            sdt_actual: None,
            sdt_other_header: TableHeader::new(),
            sdt_other: None,
            eit_header: TableHeader::new(),
            eit: None,
            tdt: None,
            tot: None,
        }
    }

    /// Wire the initial filter set: PAT, CAT, NIT (one filter matches both
    /// actual and other via mask 0xFE), SDT/BAT, EIT, TDT/TOT.
    pub fn init_table_ops(&mut self) {
        self.filters.add(PAT_PID, PAT_TID, 0xFF, TableKind::Pat);
        self.filters.add(CAT_PID, CAT_TID, 0xFF, TableKind::Cat);
        self.filters.add(NIT_PID, NIT_ACTUAL_TID, 0xFE, TableKind::NitActual);
        // The source filters only EIT_ACTUAL_TID (0x4E) with an exact mask;
        // mask 0x00 here matches every table_id on this PID instead, since
        // nothing else is ever multiplexed onto it and `eit::decode` still
        // rejects anything outside 0x4E..0x6F.
        self.filters.add(EIT_PID, 0x4E, 0x00, TableKind::Eit);
        self.filters.add(SDT_BAT_PID, SDT_ACTUAL_TID, 0xFF, TableKind::SdtActual);
        self.filters.add(SDT_BAT_PID, SDT_OTHER_TID, 0xFF, TableKind::SdtOther);
        self.filters.add(SDT_BAT_PID, BAT_TID, 0xFF, TableKind::Bat);
        self.filters.add(TDT_TOT_PID, TDT_TID, 0xFF, TableKind::Tdt);
        self.filters.add(TDT_TOT_PID, TOT_TID, 0xFF, TableKind::Tot);
    }

    /// Remove every runtime-registered PMT filter and the static filter set.
    pub fn uninit_table_ops(&mut self) {
        for pid in 0..PID_SPACE as u16 {
            if self.pmt_bit(pid) {
                self.unregister_pmt_ops(pid);
            }
        }
        self.filters.remove(PAT_PID, PAT_TID, 0xFF);
        self.filters.remove(CAT_PID, CAT_TID, 0xFF);
        self.filters.remove(NIT_PID, NIT_ACTUAL_TID, 0xFE);
        self.filters.remove(EIT_PID, 0x4E, 0x00);
        self.filters.remove(SDT_BAT_PID, SDT_ACTUAL_TID, 0xFF);
        self.filters.remove(SDT_BAT_PID, SDT_OTHER_TID, 0xFF);
        self.filters.remove(SDT_BAT_PID, BAT_TID, 0xFF);
        self.filters.remove(TDT_TOT_PID, TDT_TID, 0xFF);
        self.filters.remove(TDT_TOT_PID, TOT_TID, 0xFF);
    }

    fn pmt_bit(&self, pid: u16) -> bool {
        self.pmt_bitmap[pid as usize / 64] & (1u64 << (pid % 64)) != 0
    }

    fn set_pmt_bit(&mut self, pid: u16) {
        self.pmt_bitmap[pid as usize / 64] |= 1u64 << (pid % 64);
    }

    fn clear_pmt_bit(&mut self, pid: u16) {
        self.pmt_bitmap[pid as usize / 64] &= !(1u64 << (pid % 64));
    }

    /// Enroll a PMT filter for a program_map_PID discovered in the PAT.
    /// A no-op for `pid == NIT_PID`, a collision preserved from the source.
    pub fn register_pmt_ops(&mut self, pid: u16) {
        if pid == NIT_PID {
            return;
        }
        if !self.pmt_bit(pid) {
            self.set_pmt_bit(pid);
            self.pmt_slots[pid as usize] =
                Some(PmtSlot { header: TableHeader::new(), section: None });
            self.filters.add(pid, PMT_TID, 0xFF, TableKind::Pmt);
        }
    }

    pub fn unregister_pmt_ops(&mut self, pid: u16) {
        self.clear_pmt_bit(pid);
        self.pmt_slots[pid as usize] = None;
        self.filters.remove(pid, PMT_TID, 0xFF);
    }

    /// Feed one reassembled section buffer (pointer_field already stripped)
    /// for `pid` through the filter table.
    pub fn dispatch(&mut self, pid: u16, buf: &[u8]) {
        if buf.is_empty() {
            return;
        }
        let table_id = buf[0];
        let kinds = self.filters.lookup(pid, table_id);
        if kinds.is_empty() {
            return;
        }
        self.filters.begin_dispatch();
        for kind in kinds {
            self.route(kind, pid, buf);
        }
        self.filters.end_dispatch();
    }

    fn route(&mut self, kind: TableKind, pid: u16, buf: &[u8]) {
        match kind {
            TableKind::Pat => self.feed_pat(buf),
            TableKind::Cat => self.feed_cat(buf),
            TableKind::Pmt => self.feed_pmt(pid, buf),
            TableKind::NitActual | TableKind::NitOther => self.feed_nit(buf),
            TableKind::Bat => self.feed_bat(buf),
            TableKind::SdtActual | TableKind::SdtOther => self.feed_sdt(buf),
            TableKind::Eit => self.feed_eit(buf),
            TableKind::Tdt | TableKind::Tot => self.feed_tdt_tot(buf),
        }
    }

    fn feed_pat(&mut self, buf: &[u8]) {
        match self.pat_header.absorb(buf) {
            Ok(Outcome::Complete) => {
                let data = self.pat_header.private_data_byte.clone().unwrap_or_default();
                match pat::decode(&self.pat_header, &data) {
                    Ok(parsed) => {
                        self.stats.pat_sections += 1;
                        for program in &parsed.programs {
                            self.register_pmt_ops(program.program_map_pid);
                        }
                        self.pat = Some(parsed);
                    }
                    Err(e) => {
                        warn!("PAT parse failed: {e}");
                        self.stats.record_error(&e);
                    }
                }
            }
            Ok(Outcome::Buffering) => debug!("PAT: buffering more sections"),
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => {
                warn!("PAT section rejected: {e}");
                self.stats.record_error(&e);
            }
        }
    }

    fn feed_cat(&mut self, buf: &[u8]) {
        match self.cat_header.absorb(buf) {
            Ok(Outcome::Complete) => {
                let data = self.cat_header.private_data_byte.clone().unwrap_or_default();
                match cat::decode(&self.cat_header, &data) {
                    Ok(parsed) => {
                        self.stats.cat_sections += 1;
                        self.cat = Some(parsed);
                    }
                    Err(e) => self.stats.record_error(&e),
                }
            }
            Ok(Outcome::Buffering) => {}
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => self.stats.record_error(&e),
        }
    }

    fn feed_pmt(&mut self, pid: u16, buf: &[u8]) {
        let Some(slot) = self.pmt_slots[pid as usize].as_mut() else {
            return;
        };
        match slot.header.absorb(buf) {
            Ok(Outcome::Complete) => {
                if !slot.header.current_next_indicator {
                    return;
                }
                let same_version_already_parsed = slot
                    .section
                    .as_ref()
                    .is_some_and(|s| Some(s.version) == slot.header.version_number && !s.streams.is_empty());
                if same_version_already_parsed {
                    return;
                }
                let data = slot.header.private_data_byte.clone().unwrap_or_default();
                match pmt::decode(&slot.header, &data) {
                    Ok(parsed) => {
                        self.stats.pmt_sections += 1;
                        slot.section = Some(parsed);
                    }
                    Err(e) => self.stats.record_error(&e),
                }
            }
            Ok(Outcome::Buffering) => {}
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => self.stats.record_error(&e),
        }
    }

    fn feed_nit(&mut self, buf: &[u8]) {
        let actual = buf[0] == NIT_ACTUAL_TID;
        let header = if actual { &mut self.nit_actual_header } else { &mut self.nit_other_header };
        match header.absorb(buf) {
            Ok(Outcome::Complete) => {
                let data = header.private_data_byte.clone().unwrap_or_default();
                match nit::decode(header, &data) {
                    Ok(parsed) => {
                        if actual {
                            self.stats.nit_actual_sections += 1;
                            self.nit_actual = Some(parsed);
                        } else {
                            self.stats.nit_other_sections += 1;
                            self.nit_other = Some(parsed);
                        }
                    }
                    Err(e) => self.stats.record_error(&e),
                }
            }
            Ok(Outcome::Buffering) => {}
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => self.stats.record_error(&e),
        }
    }

    fn feed_bat(&mut self, buf: &[u8]) {
        match self.bat_header.absorb(buf) {
            Ok(Outcome::Complete) => {
                let data = self.bat_header.private_data_byte.clone().unwrap_or_default();
                match bat::decode(&self.bat_header, &data) {
                    Ok(parsed) => {
                        self.stats.bat_sections += 1;
                        self.bat = Some(parsed);
                    }
                    Err(e) => self.stats.record_error(&e),
                }
            }
            Ok(Outcome::Buffering) => {}
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => self.stats.record_error(&e),
        }
    }

    fn feed_sdt(&mut self, buf: &[u8]) {
        let actual = buf[0] == SDT_ACTUAL_TID;
        let header = if actual { &mut self.sdt_actual_header } else { &mut self.sdt_other_header };
        match header.absorb(buf) {
            Ok(Outcome::Complete) => {
                let data = header.private_data_byte.clone().unwrap_or_default();
                match sdt::decode(header, &data) {
                    Ok(parsed) => {
                        if actual {
                            self.stats.sdt_actual_sections += 1;
                            self.sdt_actual = Some(parsed);
                        } else {
                            self.stats.sdt_other_sections += 1;
                            self.sdt_other = Some(parsed);
                        }
                    }
                    Err(e) => self.stats.record_error(&e),
                }
            }
            Ok(Outcome::Buffering) => {}
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => self.stats.record_error(&e),
        }
    }

    fn feed_eit(&mut self, buf: &[u8]) {
        match self.eit_header.absorb(buf) {
            Ok(Outcome::Complete) => {
                let data = self.eit_header.private_data_byte.clone().unwrap_or_default();
                match eit::decode(&self.eit_header, &data) {
                    Ok(parsed) => {
                        self.stats.eit_sections += 1;
                        self.eit = Some(parsed);
                    }
                    Err(e) => self.stats.record_error(&e),
                }
            }
            Ok(Outcome::Buffering) => {}
            Ok(Outcome::Duplicate) => self.stats.duplicate_rejections += 1,
            Err(e) => self.stats.record_error(&e),
        }
    }

    fn feed_tdt_tot(&mut self, buf: &[u8]) {
        match tdt::decode(buf) {
            Ok(TdtTot::Tdt(section)) => {
                self.stats.tdt_sections += 1;
                self.tdt = Some(section);
            }
            Ok(TdtTot::Tot(section)) => {
                self.stats.tot_sections += 1;
                self.tot = Some(section);
            }
            Err(e) => {
                warn!("TDT/TOT section rejected: {e}");
                self.stats.record_error(&e);
            }
        }
    }

    /// All currently-known program_map_PIDs with a decoded PMT, in PID order.
    pub fn pmts(&self) -> impl Iterator<Item = (u16, &PmtSection)> {
        self.pmt_slots.iter().enumerate().filter_map(|(pid, slot)| {
            slot.as_ref().and_then(|s| s.section.as_ref().map(|sec| (pid as u16, sec)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc::{Crc, CRC_32_MPEG_2};

    fn crc_append(mut section: Vec<u8>) -> Vec<u8> {
        let crc = Crc::<u32>::new(&CRC_32_MPEG_2).checksum(&section);
        section.extend_from_slice(&crc.to_be_bytes());
        section
    }

    #[test]
    fn pat_dispatch_registers_pmt_filter() {
        let mut store = PsiStore::new();
        store.init_table_ops();

        let mut buf = vec![0x00u8, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00];
        buf.extend_from_slice(&[0x00, 0x01, 0xE1, 0x00]); // program 1 -> PMT PID 0x100
        let buf = crc_append(buf);

        store.dispatch(PAT_PID, &buf);
        assert_eq!(store.stats.pat_sections, 1);
        assert!(store.filters.has_pid(0x100));
        assert_eq!(store.pat.as_ref().unwrap().programs.len(), 1);
    }

    #[test]
    fn unknown_pid_is_silently_ignored() {
        let mut store = PsiStore::new();
        store.init_table_ops();
        store.dispatch(0x1FFF, &[0x00, 0xB0, 0x01, 0x00]);
        assert_eq!(store.stats.pat_sections, 0);
    }
}
