use clap::{Parser, ValueEnum};
use color_eyre::{Report, Result};
use gpuscan::{
    enumerate_adapters, platform_source, AdapterDescriptor, Options, SensorData, SoftwarePolicy,
};
use std::fmt::Write;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Prometheus,
}

/// List the display adapters of this machine
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Maximum number of adapters to list [env: GPUSCAN_MAX_COUNT]
    #[arg(long)]
    max_count: Option<usize>,
    /// What to do with software adapters: stop, skip or include
    #[arg(long, default_value = "skip")]
    software: SoftwarePolicy,
    /// Output format [env: GPUSCAN_FORMAT]
    #[arg(long, value_enum)]
    format: Option<Format>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let max_count = match args.max_count {
        Some(max_count) => Some(max_count),
        None => dotenvy::var("GPUSCAN_MAX_COUNT")
            .ok()
            .map(|count| count.parse())
            .transpose()?,
    };
    let format = match args.format {
        Some(format) => format,
        None => dotenvy::var("GPUSCAN_FORMAT")
            .ok()
            .map(|format| Format::from_str(&format, true).map_err(Report::msg))
            .transpose()?
            .unwrap_or(Format::Table),
    };

    let options = Options {
        max_count,
        software: args.software,
    };
    let adapters = enumerate_adapters(platform_source()?, &options)?;

    let output = match format {
        Format::Table => table(&adapters),
        Format::Prometheus => {
            let hostname = hostname::get()?
                .into_string()
                .map_err(|_| Report::msg("non utf8 hostname"))?;
            let mut result = String::with_capacity(256);
            for adapter in &adapters {
                adapter.write(&mut result, &hostname);
            }
            result
        }
    };
    print!("{output}");
    Ok(())
}

fn table(adapters: &[AdapterDescriptor]) -> String {
    let mut result = String::with_capacity(256);
    writeln!(
        &mut result,
        "{:<5} {:<40} {:<9} {:>12} {:>12} {:>12}",
        "index", "name", "vendor", "dedicated", "dedic. sys", "shared sys"
    )
    .ok();
    for adapter in adapters {
        writeln!(
            &mut result,
            "{:<5} {:<40} {:<9} {:>12} {:>12} {:>12}",
            adapter.index,
            adapter.name.to_string_lossy(),
            adapter.vendor(),
            format_bytes(adapter.dedicated_gpu_memory),
            format_bytes(adapter.dedicated_system_memory),
            format_bytes(adapter.shared_system_memory),
        )
        .ok();
    }
    result
}

fn format_bytes(bytes: u64) -> String {
    const GIB: u64 = 1024 * 1024 * 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else {
        format!("{:.0} MiB", bytes as f64 / MIB as f64)
    }
}
