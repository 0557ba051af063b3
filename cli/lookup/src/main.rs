//! fm-lookup CLI
//!
//! Field-substitution lookup stage over NDJSON events.

use clap::Parser;
use fm_cli_common::{format_number, format_percent, init_logging};
use fm_lookup::StatsSnapshot;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    init_logging(args.log_level)?;

    let report = run::execute(args).await?;
    let summary = &report.summary;

    // Report results to stderr
    eprintln!();
    eprintln!("Lookup completed:");
    eprintln!("  Lines read:      {}", format_number(summary.lines_read));
    eprintln!("  Events:          {}", format_number(summary.events));
    eprintln!(
        "  Events matched:  {} ({})",
        format_number(summary.events_matched),
        format_percent(summary.events_matched, summary.events)
    );
    if summary.passed_through > 0 {
        eprintln!(
            "  Passed through:  {} (not JSON objects)",
            format_number(summary.passed_through)
        );
    }

    let mut total = StatsSnapshot::default();
    for (name, stats) in &report.filters {
        eprintln!("  {name}:");
        eprintln!(
            "    Matched:       {} of {} ({})",
            format_number(stats.events_matched),
            format_number(stats.events_processed),
            format_percent(stats.events_matched, stats.events_processed)
        );
        eprintln!(
            "    Fields:        {} hits, {} misses, {} fallbacks",
            format_number(stats.fields_matched),
            format_number(stats.fields_missed),
            format_number(stats.fallbacks_applied)
        );
        eprintln!("    Map entries:   {}", format_number(stats.map_entries));
        if stats.refreshes_succeeded > 0 || stats.refreshes_failed > 0 {
            eprintln!(
                "    Refreshes:     {} ok, {} failed",
                stats.refreshes_succeeded, stats.refreshes_failed
            );
        }
        total.accumulate(stats);
    }

    if total.lookup_errors > 0 {
        eprintln!(
            "  Lookup errors:   {} (events left unmodified)",
            format_number(total.lookup_errors)
        );
    }

    Ok(())
}
