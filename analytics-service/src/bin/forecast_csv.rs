use anyhow::{bail, Context, Result};
use analytics_service::{config::AppConfig, engine::Engine, ingest, observability};
use serde_json::json;
use std::env;

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        bail!("usage: forecast_csv <csv_path> [horizon]");
    }
    let csv_path = &args[1];
    let horizon = match args.get(2) {
        Some(h) => Some(
            h.parse::<usize>()
                .with_context(|| format!("invalid horizon '{h}'"))?,
        ),
        None => None,
    };

    // Analytics tuning comes from WATTLAB_CONFIG when it is set.
    let analytics = if env::var_os("WATTLAB_CONFIG").is_some() {
        AppConfig::load()?.analytics
    } else {
        Default::default()
    };
    let engine = Engine::new(analytics);
    let series_by_appliance = ingest::read_series_file(csv_path)?;
    if series_by_appliance.is_empty() {
        bail!("{csv_path} contains no readings");
    }

    let mut results = Vec::with_capacity(series_by_appliance.len());
    for (appliance_id, series) in &series_by_appliance {
        tracing::info!(appliance = %appliance_id, samples = series.len(), "forecasting");
        let forecast = engine.predict(appliance_id, series, horizon)?;
        let anomalies = engine.detect(appliance_id, series)?;
        results.push(json!({
            "applianceId": appliance_id,
            "prediction": forecast,
            "anomalies": anomalies,
        }));
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
