use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context as _};
use clap::CommandFactory as _;
use leadkpi::{
    period::PeriodSpec,
    tools::kpi::{self, ReportOutcome},
};
use tracing::info;

use crate::{CliArgs, InputArgs};

#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    input: InputArgs,

    /// A reporting period of the form "NAME=%Y-%m", or "NAME=%Y-%m:DAY" for a
    /// month-to-date period that ends on the given day. Repeat the option for
    /// more periods; columns appear in the order given. Replaces the periods
    /// from the config file.
    #[arg(long = "period")]
    periods: Vec<String>,

    /// The format in which to print the report.
    #[arg(long, value_enum, default_value = "csv")]
    format: CliOutputFormat,

    /// The file to write the report to. "-" or unspecified will write to
    /// stdout.
    #[arg(short, long, default_value = None)]
    output: Option<String>,

    /// Also write the rows dropped during normalization, with the reasons, to
    /// this CSV file.
    #[arg(long)]
    exclusions: Option<PathBuf>,
}

#[derive(Debug, clap::ValueEnum, Clone, Copy, Eq, PartialEq)]
enum CliOutputFormat {
    /// A column-aligned text table.
    Human,
    /// One CSV table, segments separated by two blank rows.
    Csv,
    /// A JSON object with the column names and the rows.
    Json,
}

pub enum OutputSpec<'s> {
    /// Prints into stdout.
    Stdout,
    /// Prints into a file, replacing it if it exists.
    File(&'s Path),
}

pub fn main(args: Args) -> anyhow::Result<()> {
    let Args { input, periods, format, output, exclusions } = args;

    // parse the periods before doing any work
    let periods = periods
        .iter()
        .map(|p| p.parse::<PeriodSpec>())
        .collect::<Result<Vec<_>, _>>();
    let periods = match periods {
        Ok(periods) => periods,
        Err(e) => {
            let err = CliArgs::command()
                .error(clap::error::ErrorKind::ValueValidation, format!("--period: {}", e));
            bail!(err);
        }
    };

    let output_spec = match output.as_deref() {
        Some("-") | None => OutputSpec::Stdout,
        Some(path) => OutputSpec::File(Path::new(path)),
    };

    let (table, mut config) = input.load()?;
    if !periods.is_empty() {
        config = config.with_periods(periods)?;
    }

    // do the processing
    let (outcome, excluded) = kpi::generate_report(&table, &config)?;

    if let Some(path) = exclusions {
        let mut out_file = BufWriter::new(
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?,
        );
        kpi::output::csv::print_exclusions(&excluded, &mut out_file)?;
        out_file.flush()?;
        info!("Wrote {} excluded rows to {}", excluded.len(), path.display());
    }

    let report = match outcome {
        ReportOutcome::Populated(report) => report,
        ReportOutcome::NoData => {
            info!("No report was generated");
            return Ok(());
        }
    };

    // output the results
    let mut out: Box<dyn Write> = match output_spec {
        OutputSpec::Stdout => Box::new(std::io::stdout().lock()),
        OutputSpec::File(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
    };
    match format {
        CliOutputFormat::Human => kpi::output::human::print_report(&report, &mut out)?,
        CliOutputFormat::Csv => kpi::output::csv::print_report(&report, &mut out)?,
        CliOutputFormat::Json => kpi::output::json::print_report(&report, &mut out)?,
    }
    out.flush()?;

    if let OutputSpec::File(path) = output_spec {
        info!("Wrote KPI report to {}", path.display());
    }
    Ok(())
}
