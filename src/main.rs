//! airsensed: air-quality forecast serving daemon.
//!
//! Single-binary Tokio application that:
//! 1. Loads configuration (defaults + config.toml + env)
//! 2. Wires the simulated data providers into the ensemble forecaster
//! 3. Serves forecasts through the TTL cache behind admission control
//! 4. Runs background eviction/prune sweeps, joined on shutdown

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use common::{Clock, ServiceConfig, SystemClock};
use forecaster::EnsembleForecaster;
use providers::{SimulatedHistoryProvider, SimulatedWeatherProvider};
use serving::{Admission, ForecastService, RateLimiter, TtlCache};

/// Air-quality forecast server
#[derive(Parser)]
#[command(name = "airsensed", about = "AQI forecast serving daemon")]
struct Cli {
    /// Path to config.toml (defaults to ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// City to forecast.
    #[arg(long, default_value = "Delhi")]
    city: String,

    /// Forecast horizon in hours (default from config).
    #[arg(long)]
    hours: Option<u32>,

    /// Print threshold alerts instead of the full forecast.
    #[arg(long)]
    alerts: bool,

    /// AQI threshold for --alerts.
    #[arg(long, default_value_t = 200.0)]
    threshold: f64,

    /// Forecast every configured city concurrently.
    #[arg(long)]
    batch: bool,

    /// Client identity used for admission control.
    #[arg(long, default_value = "local")]
    client_id: String,
}

fn build_service(
    cfg: &ServiceConfig,
    clock: Arc<dyn Clock>,
) -> (ForecastService, RateLimiter, TtlCache<common::ForecastResult>) {
    let history = Arc::new(SimulatedHistoryProvider::new(
        cfg.cities.clone(),
        clock.clone(),
    ));
    let weather = Arc::new(SimulatedWeatherProvider::new(clock.clone()));
    let forecaster = Arc::new(EnsembleForecaster::new(clock.clone()));

    let cache = TtlCache::new(
        Duration::from_secs(cfg.cache.default_ttl_secs),
        clock.clone(),
    );
    let limiter = RateLimiter::new(cfg.limits.rpm_limit, cfg.limits.rph_limit, clock.clone());

    let service = ForecastService::new(
        history,
        weather,
        forecaster,
        cache.clone(),
        clock,
        &cfg.model,
    );
    (service, limiter, cache)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "airsensed=info,serving=info,forecaster=info,providers=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Limits: {} req/min, {} req/hour; cache TTL {}s; horizon {}h",
        cfg.limits.rpm_limit,
        cfg.limits.rph_limit,
        cfg.cache.default_ttl_secs,
        cfg.model.forecast_horizon_hours,
    );
    info!(
        "Cities: {:?}",
        cfg.cities.iter().map(|c| &c.name).collect::<Vec<_>>()
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (service, limiter, cache) = build_service(&cfg, clock);

    let sweep_every = Duration::from_secs(cfg.cache.sweep_interval_secs);
    let cache_sweeper = cache.spawn_sweeper(sweep_every);
    let limiter_sweeper = limiter.spawn_sweeper(sweep_every);

    // Every request path goes through admission control first.
    match limiter.check_and_record(&cli.client_id) {
        Admission::Allowed => {}
        denied => {
            if let Err(e) = denied.into_result() {
                error!("{}", e);
                std::process::exit(2);
            }
        }
    }

    let hours = cli.hours.unwrap_or(cfg.model.forecast_horizon_hours);
    let exit_code = if cli.batch {
        run_batch(&service, &cfg, hours).await
    } else if cli.alerts {
        run_alerts(&service, &cli.city, cli.threshold).await
    } else {
        run_forecast(&service, &cli.city, hours).await
    };

    cache_sweeper.shutdown().await;
    limiter_sweeper.shutdown().await;

    std::process::exit(exit_code);
}

async fn run_forecast(service: &ForecastService, city: &str, hours: u32) -> i32 {
    match service.get_forecast(city, hours).await {
        Ok(forecast) => {
            info!(
                "{}: {} points, accuracy {:.1}%, first hour AQI {:.1} ({})",
                forecast.city,
                forecast.points.len(),
                forecast.model_accuracy,
                forecast.points[0].predicted_aqi,
                forecast.points[0].risk_level,
            );
            print_json(&forecast)
        }
        Err(e) => {
            error!("Forecast failed for {}: {}", city, e);
            1
        }
    }
}

async fn run_alerts(service: &ForecastService, city: &str, threshold: f64) -> i32 {
    match service.get_alerts(city, threshold).await {
        Ok(alerts) => {
            if alerts.is_empty() {
                info!("{}: no hours above AQI {}", city, threshold);
            } else {
                warn!("{}: {} hours above AQI {}", city, alerts.len(), threshold);
            }
            print_json(&alerts)
        }
        Err(e) => {
            error!("Alert query failed for {}: {}", city, e);
            1
        }
    }
}

async fn run_batch(service: &ForecastService, cfg: &ServiceConfig, hours: u32) -> i32 {
    let cities: Vec<String> = cfg.cities.iter().map(|c| c.name.clone()).collect();
    let results = service.batch_forecast(&cities, hours).await;

    let mut code = 0;
    let mut summary = serde_json::Map::new();
    for (city, result) in results {
        match result {
            Ok(forecast) => {
                summary.insert(city, serde_json::json!(forecast));
            }
            Err(e) => {
                error!("Forecast failed for {}: {}", city, e);
                summary.insert(city, serde_json::json!({ "error": e.to_string() }));
                code = 1;
            }
        }
    }
    print_json(&summary).max(code)
}

fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => {
            println!("{rendered}");
            0
        }
        Err(e) => {
            error!("Failed to render output: {}", e);
            1
        }
    }
}
