//! DPM Log Reader CLI Application
//!
//! This is the command-line interface for the DPM blackbox decoder.
//! It uses the dpm-log-decoder library and adds:
//! - Platform configuration (TOML) with command-line overrides
//! - Reboot-cause history snapshots
//! - Text and JSON reports

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dpm_log_decoder::{
    dpm_names, reboot_cause_from, Adm1266, Adm1266PlatformSpec, ConfigStore, DpmLogHistory,
    PddfPluginFile,
};
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod report;

use config::{load_config, AppConfig};

/// DPM Log Reader - Decode ADM1266 fault blackboxes
#[derive(Parser, Debug)]
#[command(name = "dpm-log-cli")]
#[command(
    about = "Decode ADM1266 DPM blackboxes and report the hardware reboot cause",
    long_about = None
)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// PDDF plugin JSON describing the DPMs (overrides config)
    #[arg(long, value_name = "FILE", global = true)]
    pddf: Option<PathBuf>,

    /// Reboot-cause history directory (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    history_dir: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the saved reboot-cause snapshot
    Show {
        /// Show every saved snapshot instead of the latest
        #[arg(long)]
        history: bool,
    },
    /// Decode every DPM and save a reboot-cause snapshot
    Save {
        /// Clear the blackboxes after saving
        #[arg(long)]
        clear: bool,
    },
    /// Print live decoded blackbox records
    Decode {
        /// Only this DPM
        #[arg(long, value_name = "NAME")]
        dpm: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the hardware reboot cause recorded by the DPMs
    RebootCause,
    /// Clear DPM blackboxes
    Clear {
        /// Only this DPM
        #[arg(long, value_name = "NAME")]
        dpm: Option<String>,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("DPM Log Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", dpm_log_decoder::VERSION);

    let config = resolve_config(&args)?;
    let history = DpmLogHistory::new(&config.history.dir)
        .with_max_entries(config.history.max_entries);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::Show { history: false } => report::write_current(&mut out, &history)?,
        Command::Show { history: true } => report::write_history(&mut out, &history)?,
        Command::Save { clear } => {
            let plugin = open_plugin(&config)?;
            let mut dpms = select_dpms(&plugin, None)?;
            save_mode(&mut out, &history, &mut dpms, *clear)?;
        }
        Command::Decode { dpm, json } => {
            let plugin = open_plugin(&config)?;
            let dpms = select_dpms(&plugin, dpm.as_deref())?;
            decode_mode(&mut out, &dpms, *json)?;
        }
        Command::RebootCause => {
            let plugin = open_plugin(&config)?;
            let dpms = select_dpms(&plugin, None)?;
            let reason = reboot_cause_from(&dpms)?;
            report::write_reason(&mut out, reason.as_ref())?;
        }
        Command::Clear { dpm } => {
            let plugin = open_plugin(&config)?;
            for dpm in select_dpms(&plugin, dpm.as_deref())?.iter_mut() {
                dpm.clear_blackbox()
                    .with_context(|| format!("Failed to clear DPM '{}'", dpm.name()))?;
                writeln!(out, "Cleared blackbox of DPM '{}'", dpm.name())?;
            }
        }
    }

    Ok(())
}

/// Config file (or defaults) with command-line overrides applied
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    if let Some(pddf) = &args.pddf {
        config.pddf_path = pddf.clone();
    }
    if let Some(dir) = &args.history_dir {
        config.history.dir = dir.clone();
    }

    log::debug!("Configuration: {:?}", config);
    Ok(config)
}

fn open_plugin(config: &AppConfig) -> Result<PddfPluginFile> {
    PddfPluginFile::open(&config.pddf_path)
        .with_context(|| format!("Failed to load PDDF plugin data: {:?}", config.pddf_path))
}

/// Decoders for every configured DPM, or only `only` when given
fn select_dpms(store: &dyn ConfigStore, only: Option<&str>) -> Result<Vec<Adm1266>> {
    let names = dpm_names(store)?;
    if names.is_empty() {
        anyhow::bail!("No DPMs defined in the PDDF plugin data");
    }

    let selected: Vec<&String> = match only {
        Some(name) => {
            let found: Vec<_> = names.iter().filter(|n| n.as_str() == name).collect();
            if found.is_empty() {
                anyhow::bail!("Unknown DPM '{}' (known: {})", name, names.join(", "));
            }
            found
        }
        None => names.iter().collect(),
    };

    selected
        .into_iter()
        .map(|name| -> Result<Adm1266> {
            let spec = Adm1266PlatformSpec::from_store(name, store)
                .with_context(|| format!("Invalid configuration for DPM '{}'", name))?;
            Ok(Adm1266::from_spec(spec)?)
        })
        .collect()
}

/// Snapshot every readable DPM, then optionally clear the ones that were saved
fn save_mode(
    out: &mut impl Write,
    history: &DpmLogHistory,
    dpms: &mut [Adm1266],
    clear: bool,
) -> Result<()> {
    let mut faults = Vec::new();
    let mut saved = vec![false; dpms.len()];

    for (dpm, ok) in dpms.iter().zip(saved.iter_mut()) {
        match dpm.get_all_faults() {
            Ok(dpm_faults) => {
                log::info!("DPM '{}': {} faults", dpm.name(), dpm_faults.len());
                faults.extend(dpm_faults);
                *ok = true;
            }
            Err(e) => log::warn!("Skipping DPM '{}': {}", dpm.name(), e),
        }
    }

    if !saved.iter().any(|s| *s) {
        anyhow::bail!("No DPM blackbox could be read");
    }

    let count = faults.len();
    let path = history.save(faults, chrono::Local::now().naive_local())?;
    writeln!(out, "Saved {} DPM faults to {}", count, path.display())?;

    if clear {
        for (dpm, _) in dpms.iter_mut().zip(&saved).filter(|(_, ok)| **ok) {
            dpm.clear_blackbox()
                .with_context(|| format!("Failed to clear DPM '{}'", dpm.name()))?;
            writeln!(out, "Cleared blackbox of DPM '{}'", dpm.name())?;
        }
    }
    Ok(())
}

fn decode_mode(out: &mut impl Write, dpms: &[Adm1266], json: bool) -> Result<()> {
    let mut records = Vec::new();
    for dpm in dpms {
        records.extend(
            dpm.get_blackbox_records()
                .with_context(|| format!("Failed to decode DPM '{}'", dpm.name()))?,
        );
    }

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
    } else {
        report::write_records(out, &records)?;
    }
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
