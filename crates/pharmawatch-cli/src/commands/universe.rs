use std::fmt::Write as _;
use std::process::ExitCode;

use pharmawatch_core::{Instrument, ProviderId, Settings, Universe};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{write_stdout, Output};

#[derive(Debug, Serialize)]
struct UniverseResponseData {
    provider: ProviderId,
    instruments: Vec<Instrument>,
}

pub fn run(settings: &Settings, output: Output) -> Result<ExitCode, CliError> {
    let universe = settings.universe()?;

    match output.format {
        OutputFormat::Json => output.json(&UniverseResponseData {
            provider: settings.provider,
            instruments: universe.instruments().to_vec(),
        })?,
        OutputFormat::Table => write_stdout(&universe_table(settings.provider, &universe))?,
    }

    Ok(ExitCode::SUCCESS)
}

fn universe_table(provider: ProviderId, universe: &Universe) -> String {
    let width = universe
        .iter()
        .map(|instrument| instrument.display_name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "source: {provider}");
    for instrument in universe.iter() {
        let _ = writeln!(
            out,
            "  {:<width$}  {}",
            instrument.display_name,
            instrument.symbol.as_str()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_provider_symbols_in_universe_order() {
        let settings = Settings::default();
        let universe = settings.universe().expect("built-in universe");

        let table = universe_table(settings.provider, &universe);
        let lines = table.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "source: yahoo");
        assert_eq!(lines.len(), 7);
        assert!(lines[1].trim_start().starts_with("Sun Pharma"));
        assert!(lines[1].ends_with("SUNPHARMA.NS"));
        assert!(lines[6].ends_with("DIVISLAB.NS"));
    }
}
