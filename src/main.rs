use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use tripcast::catalog::Preset;
use tripcast::config::TripcastConfig;
use tripcast::email::{is_plausible_address, transport_from_config};
use tripcast::location_resolver::LocationResolver;
use tripcast::prompt::Prompter;
use tripcast::report::render_forecast_digest;
use tripcast::telemetry::init_telemetry;
use tripcast::weather::{CachedForecastProvider, ForecastProvider, build_http_client, provider_from_config};
use tripcast::{Catalog, PersistentCache, Preference, RainfallChoice, RankingService, RankingSettings};

#[derive(Parser)]
#[command(name = "tripcast", version, about = "Rank holiday destinations by their weather forecast")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "TRIPCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Score and rank destinations against your preference (default)
    Rank(RankArgs),
    /// Show the raw forecast window of every destination
    Forecast(CatalogArgs),
    /// List the destinations of a catalog
    Catalog(CatalogArgs),
}

#[derive(Args, Default)]
struct RankArgs {
    /// Preferred average temperature in °C
    #[arg(short, long, allow_negative_numbers = true)]
    temperature: Option<f64>,

    /// Rainfall preference: 1 = under 1 mm, 2 = under 2 mm, 3 = doesn't matter
    #[arg(short, long)]
    rain: Option<RainfallChoice>,

    /// Send the report to this address
    #[arg(short, long, conflicts_with = "no_email")]
    email: Option<String>,

    /// Don't send or ask for an email address
    #[arg(long)]
    no_email: bool,

    #[command(flatten)]
    catalog: CatalogArgs,
}

#[derive(Args, Default)]
struct CatalogArgs {
    /// Catalog preset (mediterranean, alpine); overrides configured locations
    #[arg(long = "catalog")]
    preset: Option<Preset>,
}

impl CatalogArgs {
    fn apply(&self, config: &mut TripcastConfig) {
        if let Some(preset) = self.preset {
            config.catalog.preset = preset;
            config.catalog.locations.clear();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = TripcastConfig::load_from_path(cli.config.clone())?;
    let _telemetry = init_telemetry(&config.logging, cli.verbose)?;

    match cli.command.unwrap_or_else(|| Command::Rank(RankArgs::default())) {
        Command::Rank(args) => {
            args.catalog.apply(&mut config);
            rank(&config, args).await
        }
        Command::Forecast(args) => {
            args.apply(&mut config);
            forecast(&config).await
        }
        Command::Catalog(args) => {
            args.apply(&mut config);
            list_catalog(&config);
            Ok(())
        }
    }
}

struct Runtime {
    cache: Arc<PersistentCache>,
    provider: Box<dyn ForecastProvider>,
    catalog: Catalog,
}

async fn prepare(config: &TripcastConfig) -> Result<Runtime> {
    let cache_dir = config.cache.resolved_location();
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
    let cache = Arc::new(PersistentCache::open(&cache_dir)?);

    let http = build_http_client(&config.weather)?;
    let mut provider = provider_from_config(&config.weather, http.clone())?;
    if config.cache.forecast_ttl_minutes > 0 {
        let ttl = Duration::from_secs(u64::from(config.cache.forecast_ttl_minutes) * 60);
        provider = Box::new(CachedForecastProvider::new(provider, cache.clone(), ttl));
    }

    let catalog = LocationResolver::new(http, &config.weather.geocoding_url)
        .resolve_catalog(&config.catalog)
        .await?;

    Ok(Runtime {
        cache,
        provider,
        catalog,
    })
}

async fn rank(config: &TripcastConfig, args: RankArgs) -> Result<()> {
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());

    let temperature = match args.temperature {
        Some(t) => t,
        None => prompter.temperature()?,
    };
    let rainfall = match args.rain {
        Some(r) => r,
        None => prompter.rainfall()?,
    };
    let preference = Preference::new(temperature, rainfall)?;

    let recipient = if args.no_email {
        None
    } else if let Some(address) = args.email {
        if !is_plausible_address(&address) {
            bail!("'{address}' is not a valid email address");
        }
        Some(address)
    } else {
        prompter.email()?
    };
    drop(prompter);

    let runtime = prepare(config).await?;
    info!(
        "Ranking {} destinations for {}°C, rain {}",
        runtime.catalog.len(),
        temperature,
        rainfall
    );

    let outcome = RankingService::new(runtime.provider.as_ref(), RankingSettings::from(&config.ranking))
        .rank(&runtime.catalog, &preference)
        .await;

    if outcome.report.is_empty() {
        bail!("No destination could be ranked; check the logs for skipped locations");
    }

    let body = outcome.report.render();
    print!("{body}");

    if let Some(recipient) = recipient {
        let sent = match transport_from_config(&config.email, runtime.cache.clone()) {
            Ok(transport) => transport.send_report(&recipient, &body).await,
            Err(e) => Err(e),
        };
        match sent {
            Ok(()) => println!("Email sent successfully to {recipient}"),
            Err(e) => error!("Failed to send report to {}: {e:#}", recipient),
        }
    }

    Ok(())
}

async fn forecast(config: &TripcastConfig) -> Result<()> {
    let runtime = prepare(config).await?;
    let settings = RankingSettings::from(&config.ranking);

    let (forecasts, skipped) = RankingService::new(runtime.provider.as_ref(), settings)
        .collect_forecasts(&runtime.catalog)
        .await;

    print!("{}", render_forecast_digest(&forecasts, settings.window));
    for skipped in &skipped {
        eprintln!("Skipped {}: {}", skipped.location.name, skipped.reason);
    }

    Ok(())
}

fn list_catalog(config: &TripcastConfig) {
    if config.catalog.locations.is_empty() {
        println!("Preset: {}", config.catalog.preset);
        for location in Catalog::from_preset(config.catalog.preset).locations() {
            println!("  {} ({})", location.name, location.format_coordinates());
        }
        return;
    }

    println!("Configured locations:");
    for entry in &config.catalog.locations {
        match entry.to_location() {
            Some(location) => println!("  {} ({})", location.name, location.format_coordinates()),
            None => println!("  {} (geocoded on use)", entry.name),
        }
    }
}
