use skyview_core::{AppError, Config};
use skyview_services::{Dashboard, SqliteStorage};
use skyview_weather::{Condition, LocationQuery, WeatherProvider};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = skyview_core::init() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            match &e {
                // Provider and validation text is already meant for users.
                AppError::Weather(weather) => eprintln!("{}", weather.user_message()),
                other => eprintln!("{}", other.user_message()),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, AppError> {
    let (config, _) = Config::load_validated()?;

    let input = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let query = LocationQuery::parse(&input)?;

    let storage = SqliteStorage::open(config.database_path())?;
    let provider = WeatherProvider::new(config.weather.clone())?;
    let units = provider.units();

    let mut dashboard = Dashboard::new(
        provider,
        Box::new(storage),
        &config.search,
        &config.favorites,
    );

    tracing::info!("Skyview started");
    dashboard.resolve(query).await;

    let view = dashboard.view();
    if let Some(error) = &view.error {
        eprintln!("{}", error);
        return Ok(ExitCode::FAILURE);
    }

    let Some(snapshot) = &view.snapshot else {
        return Ok(ExitCode::FAILURE);
    };

    let location = &snapshot.location;
    println!("{}", location.display_name());
    println!(
        "  {:.1}{} (feels like {:.1}{}), {}",
        snapshot.current.main.temp,
        units.temperature_symbol(),
        snapshot.current.main.feels_like,
        units.temperature_symbol(),
        snapshot.current.condition().description()
    );
    println!(
        "  Wind {:.1} {}, humidity {}%",
        snapshot.current.wind.speed,
        units.speed_symbol(),
        snapshot.current.main.humidity
    );
    if let Some(icon) = snapshot.current.weather.first().map(Condition::icon_url) {
        println!("  Icon: {}", icon);
    }

    if let Some(sample) = snapshot.air_pollution.as_ref().and_then(|a| a.latest()) {
        println!("  Air quality: {}", sample.index().label());
    }

    if let Some(forecast) = &snapshot.forecast {
        for alert in &forecast.alerts {
            println!("  Alert: {} ({})", alert.event, alert.sender_name);
        }
    }

    if dashboard.is_saved(location.latitude, location.longitude) {
        println!("  Saved location");
    }

    if let Some(notice) = &view.notice {
        println!("{}", notice);
    }

    Ok(ExitCode::SUCCESS)
}
