use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod inspect;
mod report;

#[derive(Parser, Debug)]
struct CliArgs {
    /// The command to perform.
    #[command(subcommand)]
    command: Subcommand,
}

fn main() {
    // set up tracing; stdout is reserved for report output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let CliArgs { command } = CliArgs::parse();

    let result = match command {
        Subcommand::Report(report_args) => report::main(report_args),
        Subcommand::Inspect(inspect_args) => inspect::main(inspect_args),
    };
    if let Err(err) = result {
        if let Some(cli_err) = err.downcast_ref::<clap::Error>() {
            cli_err.exit();
        } else {
            error!("error during execution: {:#}", err);
            std::process::exit(1);
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Generate the consolidated KPI report for every lead source and period.
    Report(report::Args),
    /// Show how the input normalizes: excluded rows, sources, and lead counts
    /// per period.
    Inspect(inspect::Args),
}

/// Options shared by every subcommand that reads a lead table.
#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// The CSV file holding one lead per row.
    input: std::path::PathBuf,

    /// A JSON file with the column renames, periods and KPI groups to use.
    /// Fields left out of the file keep their built-in defaults.
    #[arg(long, env = "LEADKPI_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// The field delimiter of the input file.
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

impl InputArgs {
    pub fn load(
        &self,
    ) -> anyhow::Result<(leadkpi::table::RawTable, leadkpi::config::ReportConfig)> {
        use anyhow::Context as _;
        use clap::CommandFactory as _;

        let Ok(delimiter) = u8::try_from(self.delimiter) else {
            let err = CliArgs::command().error(
                clap::error::ErrorKind::ValueValidation,
                "The delimiter must be a single ASCII character",
            );
            anyhow::bail!(err);
        };

        let config = match &self.config {
            Some(path) => leadkpi::config::ReportConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => leadkpi::config::ReportConfig::default(),
        };
        let table = leadkpi::table::RawTable::from_csv_path(&self.input, delimiter)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        Ok((table, config))
    }
}
