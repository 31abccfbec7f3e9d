//! Report generation
//!
//! Text tables for saved reboot-cause snapshots and live blackbox records.
//! Every writer takes a `Write` so output can be captured in tests.

use anyhow::Result;
use dpm_log_decoder::{DpmFault, DpmLogHistory, FaultRecord, HistoryEnvelope, ReasonRecord};
use std::io::Write;

const FAULT_HEADERS: [&str; 5] = ["DPM", "Fault UID", "Power Loss", "Timestamp", "DPM Fault"];

/// Print the snapshot behind the `previous-reboot-cause.json` link
pub fn write_current(out: &mut impl Write, history: &DpmLogHistory) -> Result<()> {
    match history.current()? {
        Some(envelope) => write_envelope(out, &envelope),
        None => {
            writeln!(out, "No DPM reboot-cause records found in {:?}", history.dir())?;
            Ok(())
        }
    }
}

/// Print every saved snapshot, oldest first
pub fn write_history(out: &mut impl Write, history: &DpmLogHistory) -> Result<()> {
    let envelopes = history.history()?;
    if envelopes.is_empty() {
        writeln!(out, "No DPM reboot-cause history found in {:?}", history.dir())?;
        return Ok(());
    }

    for envelope in &envelopes {
        writeln!(out, "Logs recorded at {}", envelope.gen_time)?;
        write_envelope(out, envelope)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_envelope(out: &mut impl Write, envelope: &HistoryEnvelope) -> Result<()> {
    if !envelope.is_supported() {
        writeln!(out, "Unsupported DPM type: {}", envelope.dpm_type)?;
        return Ok(());
    }
    if envelope.records_json.is_empty() {
        writeln!(out, "No DPM faults recorded")?;
        return Ok(());
    }

    let rows: Vec<[&str; 5]> = envelope.records_json.iter().map(fault_row).collect();
    write_table(out, &FAULT_HEADERS, &rows)
}

fn fault_row(fault: &DpmFault) -> [&str; 5] {
    [
        &fault.dpm_name,
        &fault.fault_uid,
        &fault.power_loss,
        &fault.timestamp,
        &fault.dpm_fault,
    ]
}

/// Print live records with their resolved causes and channel detail
pub fn write_records(out: &mut impl Write, records: &[FaultRecord]) -> Result<()> {
    if records.is_empty() {
        writeln!(out, "Blackbox is empty")?;
        return Ok(());
    }

    for record in records {
        writeln!(
            out,
            "[{}] uid {} power-up #{} ({})",
            record.dpm_name, record.uid, record.powerup_counter, record.timestamp
        )?;
        writeln!(out, "  power loss:   {}", if record.power_loss { "Yes" } else { "No" })?;
        if record.cause.is_empty() {
            writeln!(out, "  cause:        (no matching rule)")?;
        } else {
            writeln!(out, "  hw cause:     {}", record.cause.hw_cause)?;
            writeln!(out, "  description:  {}", record.cause.hw_desc)?;
            writeln!(out, "  summary:      {}", record.cause.summary)?;
            writeln!(out, "  reboot cause: {}", record.cause.reboot_cause)?;
        }
        for (tag, names) in &record.channels {
            if names != "none" {
                writeln!(out, "  {:<13} {}", format!("{}:", tag), names)?;
            }
        }
    }
    Ok(())
}

/// Print a categorised reboot cause
pub fn write_reason(out: &mut impl Write, reason: Option<&ReasonRecord>) -> Result<()> {
    match reason {
        Some(reason) => {
            writeln!(out, "Reboot cause: {}", reason.cause)?;
            writeln!(out, "Details:      {}", reason.description)?;
        }
        None => writeln!(out, "No hardware reboot cause recorded by any DPM")?,
    }
    Ok(())
}

fn write_table<const N: usize>(
    out: &mut impl Write,
    headers: &[&str; N],
    rows: &[[&str; N]],
) -> Result<()> {
    let mut widths = headers.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[&str; N]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(headers))?;
    writeln!(
        out,
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    )?;
    for row in rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}
