use std::fmt::Write as _;
use std::process::ExitCode;

use pharmawatch_core::{Backoff, ProviderId, ProviderPolicy, Settings};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{write_stdout, Output};

#[derive(Debug, Serialize)]
struct SourcePolicy {
    id: ProviderId,
    selected: bool,
    max_concurrency: usize,
    pacing_ms: Option<u64>,
    max_attempts: u32,
    retry_delay_ms: Option<u64>,
    attempt_timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourcePolicy>,
}

pub fn run(settings: &Settings, output: Output) -> Result<ExitCode, CliError> {
    let sources = ProviderId::ALL
        .into_iter()
        .map(|id| describe(id, settings))
        .collect::<Vec<_>>();

    match output.format {
        OutputFormat::Json => output.json(&SourcesResponseData { sources })?,
        OutputFormat::Table => write_stdout(&sources_table(&sources))?,
    }

    Ok(ExitCode::SUCCESS)
}

fn sources_table(sources: &[SourcePolicy]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<2}{:<14}{:>12}{:>10}{:>10}{:>12}",
        "", "source", "concurrency", "pacing", "attempts", "timeout"
    );
    for source in sources {
        let _ = writeln!(
            out,
            "{:<2}{:<14}{:>12}{:>10}{:>10}{:>12}",
            if source.selected { "*" } else { "" },
            source.id.as_str(),
            source.max_concurrency,
            source
                .pacing_ms
                .map(|ms| format!("{}s", ms / 1_000))
                .unwrap_or_else(|| String::from("-")),
            source.max_attempts,
            format!("{}ms", source.attempt_timeout_ms)
        );
    }
    out
}

/// Provider defaults, with configured overrides applied to the selected source.
fn describe(id: ProviderId, settings: &Settings) -> SourcePolicy {
    let policy = ProviderPolicy::default_for(id);
    let selected = id == settings.provider;
    let retry = if selected {
        settings.retry_config()
    } else {
        policy.retry.clone()
    };
    let max_concurrency = settings
        .max_concurrency
        .filter(|_| selected)
        .unwrap_or(policy.max_concurrency);

    SourcePolicy {
        id,
        selected,
        max_concurrency,
        pacing_ms: policy.pacing.map(|pacing| pacing.as_millis() as u64),
        max_attempts: retry.effective_attempts(),
        retry_delay_ms: match retry.backoff {
            Backoff::Fixed { delay } => Some(delay.as_millis() as u64),
            Backoff::Exponential { .. } => None,
        },
        attempt_timeout_ms: retry.attempt_timeout.as_millis() as u64,
    }
}
