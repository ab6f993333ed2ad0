use std::fmt::Write as _;
use std::io::Write as _;

use pharmawatch_core::{format_percent, EmptyResult, PerformanceReport, SkipReason, SkippedInstrument};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl Output {
    pub fn json<T: Serialize>(&self, value: &T) -> Result<(), CliError> {
        let payload = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        write_stdout(&format!("{payload}\n"))
    }

    pub fn report(&self, report: &PerformanceReport) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Json => self.json(report),
            OutputFormat::Table => write_stdout(&report_table(report)),
        }
    }

    pub fn empty(&self, empty: &EmptyResult) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Json => self.json(empty),
            OutputFormat::Table => write_stdout(&empty_table(empty)),
        }
    }
}

/// Fails with `CliError::Io` when stdout is closed, e.g. piped into `head`.
pub fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

pub fn report_table(report: &PerformanceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "period      : {}", report.period.label());
    let _ = writeln!(out, "source      : {}", report.provider);
    let _ = writeln!(out, "request_id  : {}", report.request_id);
    let _ = writeln!(out, "generated_at: {}", report.generated_at);
    let _ = writeln!(out);

    let name_width = report
        .records
        .iter()
        .map(|record| record.display_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Instrument".len());
    let symbol_width = report
        .records
        .iter()
        .map(|record| record.symbol.as_str().len())
        .max()
        .unwrap_or(0)
        .max("Symbol".len());

    let _ = writeln!(
        out,
        "{:>3}  {:<name_width$}  {:<symbol_width$}  {:>12}  {:>9}",
        "#", "Instrument", "Symbol", "Price", "Change"
    );
    for (rank, record) in report.ranked().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<name_width$}  {:<symbol_width$}  {:>12.2}  {:>9}",
            rank + 1,
            record.display_name,
            record.symbol.as_str(),
            record.current_price,
            format_percent(record.percent_change)
        );
    }

    let summary = &report.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "best        : {} ({})",
        summary.best.display_name,
        format_percent(summary.best.percent_change)
    );
    let _ = writeln!(
        out,
        "worst       : {} ({})",
        summary.worst.display_name,
        format_percent(summary.worst.percent_change)
    );
    let _ = writeln!(out, "average     : {}", format_percent(summary.average));

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "skipped:");
        write_skipped(&mut out, &report.skipped);
    }

    out
}

pub fn empty_table(empty: &EmptyResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "No data available for {} from {}.",
        empty.period.label(),
        empty.provider
    );
    write_skipped(&mut out, &empty.skipped);
    let _ = writeln!(out, "Retry in a few minutes, or run with --source demo for offline data.");
    out
}

fn write_skipped(out: &mut String, skipped: &[SkippedInstrument]) {
    for instrument in skipped {
        let reason = match &instrument.reason {
            SkipReason::FetchFailed {
                attempts, message, ..
            } => format!("fetch failed after {attempts} attempt(s): {message}"),
            SkipReason::NoDataInWindow => String::from("no data in window"),
            SkipReason::InvalidSeries { detail } => format!("unusable series ({detail:?})"),
        };
        let _ = writeln!(
            out,
            "  - {} ({}): {reason}",
            instrument.display_name, instrument.symbol
        );
    }
}
