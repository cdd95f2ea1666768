use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tspsi_inspector::core::{run, Input, Options};
use tspsi_inspector::report::{mask, Detail, Format};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

/// MPEG-2 Transport Stream PSI/SI section reassembler and table decoder.
#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// TS file to read. Omit and pass --udp instead to read from a socket.
    file: Option<PathBuf>,

    /// UDP address to bind and listen on (IPv4 unicast or multicast) instead of a file.
    #[arg(long, value_name = "ADDR")]
    udp: Option<String>,

    /// Brief listing (default).
    #[arg(short = 'b', long, conflicts_with = "detail")]
    brief: bool,

    /// Detailed listing: includes descriptors and rejection counters.
    #[arg(short = 'd', long)]
    detail: bool,

    /// Output format.
    #[arg(short = 'f', long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Comma-separated table classes to include: pat,cat,pmt,nit,bat,sdt,eit,tdt. Default: all.
    #[arg(short = 's', long, value_name = "TABLES")]
    table: Option<String>,

    /// Memory size hint in megabytes. Accepted for compatibility; this crate
    /// does not pre-size arenas.
    #[arg(short = 'm', long, value_name = "MB")]
    mem: Option<usize>,

    /// Refresh interval in seconds for the periodic snapshot when reading from --udp.
    #[arg(long, default_value_t = 2)]
    refresh: u64,
}

fn parse_table_mask(spec: &str) -> anyhow::Result<u16> {
    let mut m = 0u16;
    for name in spec.split(',') {
        m |= match name.trim().to_ascii_lowercase().as_str() {
            "pat" => mask::PAT,
            "cat" => mask::CAT,
            "pmt" => mask::PMT,
            "nit" => mask::NIT,
            "bat" => mask::BAT,
            "sdt" => mask::SDT,
            "eit" => mask::EIT,
            "tdt" | "tot" => mask::TDT_TOT,
            "all" => mask::ALL,
            other => anyhow::bail!("unknown table class '{other}'"),
        };
    }
    Ok(m)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::try_init().ok();
    let opt = Opt::parse();

    let _ = opt.mem; // accepted for compatibility; this crate does not pre-size arenas

    let table_mask = match opt.table.as_deref() {
        Some(spec) => parse_table_mask(spec)?,
        None => mask::ALL,
    };

    let input = match (opt.file, opt.udp) {
        (Some(path), None) => Input::File(path),
        (None, Some(addr)) => Input::Udp(addr.parse::<SocketAddr>()?),
        (Some(_), Some(_)) => {
            eprintln!("pass either a file path or --udp, not both");
            std::process::exit(2);
        }
        (None, None) => {
            eprintln!("no input: pass a file path or --udp ADDR");
            std::process::exit(2);
        }
    };

    let opts = Options {
        input,
        refresh_secs: opt.refresh,
        format: match opt.format {
            FormatArg::Text => Format::Text,
            FormatArg::Json => Format::Json,
        },
        detail: if opt.detail {
            Detail::Detail
        } else {
            let _ = opt.brief;
            Detail::Brief
        },
        table_mask,
    };

    if let Err(e) = run(opts).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}
