//! Energy-saving window finder
//!
//! Usage:
//!   energy_windows <load.csv> <users.csv> [options]
//!
//! Reads two raw per-cell metric exports, forecasts each cell's metrics and
//! writes the future periods in which the selected energy-saving mode could
//! be active.

use clap::Parser;
use energy_forecast::config::RunConfig;
use energy_forecast::grid::GridCadence;
use energy_forecast::models::ModelKind;
use energy_forecast::modes::EnergySavingMode;
use energy_forecast::pipeline::Pipeline;
use energy_forecast::report::render_timeline;
use energy_forecast::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Forecast cell load and extract energy-saving windows
#[derive(Parser, Debug)]
#[command(name = "energy_windows", version, about)]
struct Cli {
    /// First raw metric source (CSV)
    left: PathBuf,

    /// Second raw metric source (CSV)
    right: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Energy-saving mode, e.g. carrier_shutdown
    #[arg(short, long)]
    mode: Option<String>,

    /// Minimum window duration in minutes
    #[arg(long = "min-window")]
    min_window: Option<i64>,

    /// Forecast horizon in months
    #[arg(long)]
    horizon_months: Option<u32>,

    /// Grid cadence in minutes
    #[arg(long)]
    cadence: Option<i64>,

    /// Per-fit time budget in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Comma-separated model names, e.g. linear,holt
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// Model whose forecast is filtered into windows
    #[arg(long)]
    window_model: Option<String>,

    /// Directory for result files
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Print a text timeline of the windows
    #[arg(long)]
    visualize: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(mode) = &self.mode {
            config.mode = mode.parse::<EnergySavingMode>()?;
        }
        if let Some(minutes) = self.min_window {
            config.min_window_minutes = minutes;
        }
        if let Some(months) = self.horizon_months {
            config.horizon_months = months;
        }
        if let Some(minutes) = self.cadence {
            config.cadence = GridCadence::from_minutes(minutes)?;
        }
        if let Some(ms) = self.timeout_ms {
            config.fit_timeout_ms = Some(ms);
        }
        if let Some(names) = &self.models {
            config.models = names
                .iter()
                .map(|name| name.parse::<ModelKind>())
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(model) = &self.window_model {
            config.window_model = Some(model.clone());
        }
        config.visualize |= self.visualize;

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.run_config()?;
    let visualize = config.visualize;
    let cadence = config.cadence;

    let result = Pipeline::new(config)?.run_files(&cli.left, &cli.right, &cli.output_dir)?;

    println!("{}", result.summary);
    if visualize {
        print!("{}", render_timeline(&result.windows, cadence, 72));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
