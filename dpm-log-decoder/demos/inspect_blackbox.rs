//! Inspect a raw blackbox dump without any plugin data
//!
//! Usage:
//!   cargo run --example inspect_blackbox -- <nvmem-or-dump-file>

use anyhow::{Context, Result};
use dpm_log_decoder::{channel_names, parse_blackbox, time_since, ChannelClass, RECORD_SIZE};
use std::collections::HashMap;
use std::env;
use std::fs;

fn main() -> Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .context("usage: inspect_blackbox <dump-file>")?;
    let data = fs::read(&path).with_context(|| format!("Failed to read {}", path))?;

    println!("\n═══════════════════════════════════════");
    println!("Inspecting: {} ({} bytes)", path, data.len());
    println!("═══════════════════════════════════════");

    if data == b"1" {
        println!("Blackbox is cleared");
        return Ok(());
    }

    let records = parse_blackbox(&data, RECORD_SIZE);
    let trailing = records.trailing_bytes();
    let mut rule_counts: HashMap<u8, usize> = HashMap::new();
    let mut total = 0;

    for rec in records {
        total += 1;
        *rule_counts.entry(rec.rule_index).or_insert(0) += 1;

        println!("\nRecord uid=0x{:04x} (power-up #{})", rec.uid, rec.powerup_counter);
        println!("  {}", time_since("timestamp", &rec.timestamp));
        for class in ChannelClass::ALL {
            let bits = rec.channel_bits(class.tag()).unwrap_or_default();
            if bits != 0 {
                println!("  {:9} {}", class.tag(), channel_names(class.tag(), bits));
            }
        }
    }

    println!("\nRule Index Statistics:");
    println!("─────────────────────────");
    let mut rules: Vec<_> = rule_counts.iter().collect();
    rules.sort_by_key(|(r, _)| **r);
    for (rule, count) in rules {
        println!("  Rule {:3}: {:4} records", rule, count);
    }

    println!("\nTotal records: {}", total);
    if trailing > 0 {
        println!("Trailing bytes ignored: {}", trailing);
    }
    Ok(())
}
