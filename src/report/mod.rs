//! Snapshot rendering over a [`PsiStore`], grounded on the teacher's
//! `Reporter`/`generate_json_report` (serde-serialized JSON alongside a
//! plain-text listing) and the original source's `result.c` output-type
//! selection — collapsed here into in-process string formatting since this
//! crate never forks separate output files.

use std::fmt::Write as _;

use serde::Serialize;

use crate::psi::bat::BatSection;
use crate::psi::sdt::SdtSection;
use crate::psi::store::{PsiStore, Stats};

/// Bitmask selecting which table classes a report includes. `-s`/`--table`
/// on the CLI accepts any OR'd combination of these.
pub mod mask {
    pub const PAT: u16 = 1 << 0;
    pub const CAT: u16 = 1 << 1;
    pub const PMT: u16 = 1 << 2;
    pub const NIT: u16 = 1 << 3;
    pub const BAT: u16 = 1 << 4;
    pub const SDT: u16 = 1 << 5;
    pub const EIT: u16 = 1 << 6;
    pub const TDT_TOT: u16 = 1 << 7;
    pub const ALL: u16 = PAT | CAT | PMT | NIT | BAT | SDT | EIT | TDT_TOT;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    Brief,
    Detail,
}

#[derive(Serialize)]
struct EsJson<'a> {
    pid: u16,
    stream_type: u8,
    stream_type_label: &'a str,
}

#[derive(Serialize)]
struct ProgramJson<'a> {
    program_number: u16,
    pmt_pid: u16,
    pmt_version: u8,
    pcr_pid: u16,
    streams: Vec<EsJson<'a>>,
}

#[derive(Serialize)]
struct ServiceJson<'a> {
    service_id: u16,
    name: Option<&'a str>,
    running_status: u8,
    free_ca_mode: bool,
}

#[derive(Serialize)]
struct TransportJson {
    transport_stream_id: u16,
    original_network_id: u16,
}

#[derive(Serialize)]
struct NetworkJson<'a> {
    label: &'a str,
    network_id: u16,
    transports: Vec<TransportJson>,
}

#[derive(Serialize)]
struct BouquetJson {
    bouquet_id: u16,
    transports: Vec<TransportJson>,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    programs: Vec<ProgramJson<'a>>,
    services: Vec<ServiceJson<'a>>,
    networks: Vec<NetworkJson<'a>>,
    bouquets: Option<Vec<BouquetJson>>,
    tdt: Option<String>,
    tot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a Stats>,
}

fn programs_json(store: &PsiStore) -> Vec<ProgramJson<'_>> {
    let Some(pat) = store.pat.as_ref() else { return Vec::new() };
    pat.programs
        .iter()
        .filter_map(|entry| {
            store.pmts().find(|(pid, _)| *pid == entry.program_map_pid).map(|(pid, pmt)| ProgramJson {
                program_number: entry.program_number,
                pmt_pid: pid,
                pmt_version: pmt.version,
                pcr_pid: pmt.pcr_pid,
                streams: pmt
                    .streams
                    .iter()
                    .map(|s| EsJson { pid: s.elementary_pid, stream_type: s.stream_type, stream_type_label: s.stream_type_label() })
                    .collect(),
            })
        })
        .collect()
}

fn services_json(sdt: &SdtSection) -> Vec<ServiceJson<'_>> {
    sdt.services
        .iter()
        .map(|s| ServiceJson {
            service_id: s.service_id,
            name: s.service_name(),
            running_status: s.running_status,
            free_ca_mode: s.free_ca_mode,
        })
        .collect()
}

fn transports_json(transports: &[crate::psi::nit::TransportEntry]) -> Vec<TransportJson> {
    transports
        .iter()
        .map(|t| TransportJson { transport_stream_id: t.transport_stream_id, original_network_id: t.original_network_id })
        .collect()
}

/// Render a snapshot of `store` as either plain text or JSON, at the given
/// verbosity and restricted to the table classes set in `table_mask`.
pub fn render(store: &PsiStore, format: Format, detail: Detail, table_mask: u16) -> String {
    match format {
        Format::Text => render_text(store, detail, table_mask),
        Format::Json => render_json(store, detail, table_mask),
    }
}

fn render_json(store: &PsiStore, detail: Detail, table_mask: u16) -> String {
    let programs = if table_mask & (mask::PAT | mask::PMT) != 0 { programs_json(store) } else { Vec::new() };

    let mut services = Vec::new();
    if table_mask & mask::SDT != 0 {
        if let Some(sdt) = store.sdt_actual.as_ref() {
            services.extend(services_json(sdt));
        }
        if let Some(sdt) = store.sdt_other.as_ref() {
            services.extend(services_json(sdt));
        }
    }

    let mut networks = Vec::new();
    if table_mask & mask::NIT != 0 {
        if let Some(nit) = store.nit_actual.as_ref() {
            networks.push(NetworkJson { label: "actual", network_id: nit.network_id, transports: transports_json(&nit.transports) });
        }
        if let Some(nit) = store.nit_other.as_ref() {
            networks.push(NetworkJson { label: "other", network_id: nit.network_id, transports: transports_json(&nit.transports) });
        }
    }

    let bouquets = if table_mask & mask::BAT != 0 {
        store.bat.as_ref().map(|b: &BatSection| vec![BouquetJson { bouquet_id: b.bouquet_id, transports: transports_json(&b.transports) }])
    } else {
        None
    };

    let (tdt, tot) = if table_mask & mask::TDT_TOT != 0 {
        (store.tdt.as_ref().map(|t| t.utc_time.to_string()), store.tot.as_ref().map(|t| t.utc_time.to_string()))
    } else {
        (None, None)
    };

    let report = ReportJson {
        programs,
        services,
        networks,
        bouquets,
        tdt,
        tot,
        stats: matches!(detail, Detail::Detail).then_some(&store.stats),
    };

    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{\"error\":\"report serialization failed\"}".to_string())
}

fn render_text(store: &PsiStore, detail: Detail, table_mask: u16) -> String {
    let mut out = String::new();

    if table_mask & (mask::PAT | mask::PMT) != 0 {
        let _ = writeln!(out, "Programs:");
        for (pid, pmt) in store.pmts() {
            let _ = writeln!(
                out,
                "  PMT PID 0x{pid:04X}  program {}  version {}  PCR PID 0x{:04X}",
                pmt.program_number, pmt.version, pmt.pcr_pid
            );
            for s in &pmt.streams {
                let _ = writeln!(out, "    ES PID 0x{:04X}  type 0x{:02X}  {}", s.elementary_pid, s.stream_type, s.stream_type_label());
                if matches!(detail, Detail::Detail) {
                    for d in &s.descriptors {
                        let _ = writeln!(out, "      {d:?}");
                    }
                }
            }
        }
    }

    if table_mask & mask::SDT != 0 {
        let _ = writeln!(out, "Services:");
        for (label, sdt) in [("actual", store.sdt_actual.as_ref()), ("other", store.sdt_other.as_ref())] {
            let Some(sdt) = sdt else { continue };
            for s in &sdt.services {
                let _ = writeln!(
                    out,
                    "  [{label}] service {}  {}  running_status={}",
                    s.service_id,
                    s.service_name().unwrap_or("<unnamed>"),
                    s.running_status
                );
            }
        }
    }

    if table_mask & mask::NIT != 0 {
        let _ = writeln!(out, "Networks:");
        for (label, nit) in [("actual", store.nit_actual.as_ref()), ("other", store.nit_other.as_ref())] {
            let Some(nit) = nit else { continue };
            let _ = writeln!(out, "  [{label}] network_id={}", nit.network_id);
            for t in &nit.transports {
                let _ = writeln!(out, "    transport_stream_id={}  original_network_id={}", t.transport_stream_id, t.original_network_id);
            }
        }
    }

    if table_mask & mask::BAT != 0 {
        if let Some(bat) = store.bat.as_ref() {
            let _ = writeln!(out, "Bouquets:");
            let _ = writeln!(out, "  bouquet_id={}", bat.bouquet_id);
            for t in &bat.transports {
                let _ = writeln!(out, "    transport_stream_id={}  original_network_id={}", t.transport_stream_id, t.original_network_id);
            }
        }
    }

    if table_mask & mask::CAT != 0 {
        if let Some(cat) = store.cat.as_ref() {
            let _ = writeln!(out, "CA entries:");
            for d in &cat.descriptors {
                let _ = writeln!(out, "  {d:?}");
            }
        }
    }

    if table_mask & mask::TDT_TOT != 0 {
        if let Some(tdt) = store.tdt.as_ref() {
            let _ = writeln!(out, "TDT: {}", tdt.utc_time);
        }
        if let Some(tot) = store.tot.as_ref() {
            let _ = writeln!(out, "TOT: {}", tot.utc_time);
        }
    }

    if matches!(detail, Detail::Detail) {
        let _ = writeln!(out, "Stats: {:?}", store.stats);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_renders_without_panicking() {
        let store = PsiStore::new();
        let text = render(&store, Format::Text, Detail::Brief, mask::ALL);
        assert!(text.contains("Programs:"));
        let json = render(&store, Format::Json, Detail::Detail, mask::ALL);
        assert!(json.contains("\"programs\""));
        assert!(json.contains("\"stats\""));
    }

    #[test]
    fn brief_json_omits_stats() {
        let store = PsiStore::new();
        let json = render(&store, Format::Json, Detail::Brief, mask::ALL);
        assert!(!json.contains("\"stats\""));
    }

    #[test]
    fn table_mask_excludes_unrequested_sections() {
        let store = PsiStore::new();
        let text = render(&store, Format::Text, Detail::Brief, mask::SDT);
        assert!(!text.contains("Programs:"));
        assert!(text.contains("Services:"));
    }
}
