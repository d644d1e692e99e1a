// Runs the full pipeline on generated data and prints the windows it finds
use chrono::Duration;
use energy_forecast::report::render_timeline;
use energy_forecast::utils::{date_parser, generate_synthetic_sources};
use energy_forecast::{
    EnergySavingMode, ForecastError, GridCadence, ModelKind, Pipeline, RunConfig, Window,
};

fn main() -> energy_forecast::Result<()> {
    println!("Synthetic energy-saving run\n");

    let cadence = GridCadence::default();
    let start = date_parser::parse_timestamp("2024-04-01 00:00:00")
        .ok_or_else(|| ForecastError::InvalidParameter("start timestamp".to_string()))?;
    let (load, users) = generate_synthetic_sources(start, 4, 7, cadence, 7)?;
    println!("Generated {} load rows and {} user rows", load.len(), users.len());

    for mode in EnergySavingMode::ALL {
        let config = RunConfig {
            mode,
            horizon_months: 1,
            models: vec![ModelKind::SeasonalProfile { period: 96 }],
            ..RunConfig::default()
        };
        let result = Pipeline::new(config)?.run(&load, &users)?;

        println!("\n=== {} ===", mode);
        println!("{}", result.summary);
        // First two days of the horizon keep the timeline readable
        let first_days: Vec<Window> = match result.windows.first() {
            Some(first) => {
                let cutoff = first.start + Duration::days(2);
                result.windows.iter().filter(|w| w.start < cutoff).cloned().collect()
            }
            None => Vec::new(),
        };
        print!("{}", render_timeline(&first_days, cadence, 96));
    }

    Ok(())
}
