// Terminal output for the driver commands

use colored::Colorize;
use tabled::{Table, Tabled};

use ufsda_core::application::{FetchSummary, PlannedTransfer, SocaOutcome};

#[derive(Tabled)]
struct PlanRow {
    platform: String,
    fetch_type: String,
    fileid: String,
    timestamp: String,
    source: String,
    local_path: String,
}

impl From<&PlannedTransfer> for PlanRow {
    fn from(transfer: &PlannedTransfer) -> Self {
        Self {
            platform: transfer.platform.to_string(),
            fetch_type: transfer.fetch_type.clone(),
            fileid: transfer.fileid.clone(),
            timestamp: transfer.timestamp.clone(),
            source: transfer.source.clone(),
            local_path: transfer.local_path.display().to_string(),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    fetched: usize,
    skipped: usize,
    concatenated: usize,
    bytes: u64,
    elapsed_ms: i64,
}

pub fn print_plan(plan: &[PlannedTransfer]) {
    if plan.is_empty() {
        println!("{}", "Nothing to fetch".yellow());
        return;
    }

    println!("{}", format!("{} transfers planned", plan.len()).cyan().bold());
    println!();
    let rows: Vec<PlanRow> = plan.iter().map(PlanRow::from).collect();
    println!("{}", Table::new(rows));
}

pub fn print_fetch_summary(summary: &FetchSummary) {
    println!("{}", "✓ Fetch completed".green().bold());
    println!();
    let row = SummaryRow {
        fetched: summary.fetched,
        skipped: summary.skipped,
        concatenated: summary.concatenated,
        bytes: summary.bytes,
        elapsed_ms: summary.elapsed_ms,
    };
    println!("{}", Table::new(vec![row]));
}

pub fn print_soca_outcome(outcome: &SocaOutcome) {
    println!("{}", "✓ SOCA application prepared".green().bold());
    println!();
    println!("  {} {}", "Directory:".bold(), outcome.dirpath.display());
    println!("  {} {}", "Configuration:".bold(), outcome.config_yaml.display());
    println!("  {} {}", "Fixed files:".bold(), outcome.fixed_files);
    println!("  {} {}", "Backgrounds:".bold(), outcome.backgrounds);
    println!("  {} {}", "Observations:".bold(), outcome.observations);
}

/// Print any serializable result as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
