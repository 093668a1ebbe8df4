//! Command-line parsing for `qw`.
//!
//! Argument parsing stays here; dispatch lives in `app`, and neither touches
//! the fitting or load code directly.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app::pipeline::YearlyMethod;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "qw",
    version,
    about = "Surrogate regression models and constituent loads for water-quality monitoring sites"
)]
pub struct Cli {
    /// Project file (TOML). Falls back to $QW_CONFIG, then the built-in project.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Site data directory (`<store>/<site>/{iv,qwdata}.csv`). Falls back to $QW_STORE.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the candidate model summary for one constituent at one site.
    Summary(SiteArgs),
    /// Export the merged prediction and model summary for one constituent at one site.
    Predict(PredictArgs),
    /// Compute the load table for every site in the project.
    Loads(LoadsArgs),
    /// Run the whole pipeline on a synthetic site held in memory.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SiteArgs {
    /// Site id.
    #[arg(short, long)]
    pub site: String,

    /// Constituent name from the project (e.g. TP, SSC).
    #[arg(short, long)]
    pub constituent: String,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub target: SiteArgs,

    /// Output directory; `model_data/` and `report/` are created inside it.
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Also write the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct LoadsArgs {
    /// Water years to tabulate (repeatable); adds a `mean` column over their span.
    #[arg(short = 'w', long = "water-year")]
    pub water_years: Vec<i32>,

    /// Estimator for the per-water-year columns.
    #[arg(long, value_enum, default_value_t = MethodArg::Mean)]
    pub method: MethodArg,

    /// Write the table as CSV.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic site.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Days of 15-minute record to generate.
    #[arg(long, default_value_t = 120)]
    pub days: i64,

    /// Number of lab samples.
    #[arg(long, default_value_t = 40)]
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Mean,
    Sum,
}

impl From<MethodArg> for YearlyMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Mean => YearlyMethod::Mean,
            MethodArg::Sum => YearlyMethod::Sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loads_with_global_flags() {
        let cli = Cli::parse_from([
            "qw", "loads", "-w", "2015", "-w", "2016", "--method", "sum", "--store", "/data",
        ]);
        assert_eq!(cli.store, Some(PathBuf::from("/data")));
        match cli.command {
            Command::Loads(args) => {
                assert_eq!(args.water_years, vec![2015, 2016]);
                assert_eq!(args.method, MethodArg::Sum);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn predict_requires_site_and_constituent() {
        assert!(Cli::try_parse_from(["qw", "predict", "--site", "05586300"]).is_err());
        let cli = Cli::try_parse_from(["qw", "predict", "-s", "05586300", "-c", "TP"]).unwrap();
        assert!(matches!(cli.command, Command::Predict(ref a) if a.target.constituent == "TP"));
    }
}
