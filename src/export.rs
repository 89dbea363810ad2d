use chrono::TimeZone;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::console::{prompt_timestamp, Console, END_OF_DAY, START_OF_DAY};
use crate::devices::{choose_device, collect_devices};
use crate::error::ExportError;
use crate::subintervals::partition;
use crate::tb_rust_client::{EntityId, ThingsBoardClient};
use crate::telemetry_table::TelemetryTable;

/// Runs one interactive export: credentials, login, device and date selection,
/// telemetry download and CSV output.
///
/// The session is logged out on every path once login has been attempted.
pub async fn run<C, Tz>(config: &ExportConfig, console: &mut C, tz: &Tz) -> Result<(), ExportError>
where
    C: Console + ?Sized,
    Tz: TimeZone,
{
    let username = read_username(config, console)?;
    let password = console.read_password("Password")?;

    let mut client = ThingsBoardClient::new(&config.base_url);
    let result = export_with_session(&mut client, config, console, tz, &username, &password).await;

    if let Err(e) = client.logout().await {
        warn!("Failed to close the session: {}", e);
    }

    result
}

fn read_username<C>(config: &ExportConfig, console: &mut C) -> Result<String, ExportError>
where
    C: Console + ?Sized,
{
    if config.default_username.is_empty() {
        Ok(console.read_line("Username (email): ")?)
    } else {
        console.print(&format!("Username (email): {}", config.default_username))?;
        Ok(config.default_username.clone())
    }
}

async fn export_with_session<C, Tz>(
    client: &mut ThingsBoardClient,
    config: &ExportConfig,
    console: &mut C,
    tz: &Tz,
    username: &str,
    password: &str,
) -> Result<(), ExportError>
where
    C: Console + ?Sized,
    Tz: TimeZone,
{
    client.login(username, password).await?;
    info!("Logged in to {}", client.base_url());

    let devices = collect_devices(client, config.page_size).await?;
    let entity_id = choose_device(console, &devices)?;

    let start_ts = prompt_timestamp(console, tz, "Beginning time", START_OF_DAY)?;
    let end_ts = prompt_timestamp(console, tz, "End time", END_OF_DAY)?;

    let table = fetch_telemetry(client, console, config, &entity_id, start_ts, end_ts).await?;

    table.save_csv(&config.output_path)?;
    info!("Saved {} with timeseries data", config.output_path.display());
    Ok(())
}

/// Downloads every timeseries key of `entity_id` in `[start_ts, end_ts]`, one
/// sub-interval per request, and assembles the wide table.
pub async fn fetch_telemetry<C>(
    client: &ThingsBoardClient,
    console: &mut C,
    config: &ExportConfig,
    entity_id: &EntityId,
    start_ts: i64,
    end_ts: i64,
) -> Result<TelemetryTable, ExportError>
where
    C: Console + ?Sized,
{
    let keys = client.get_timeseries_keys(entity_id).await?.join(",");
    console.print(&format!("\nGetting timeseries keys: {}\n", keys))?;

    let subintervals = partition(start_ts, end_ts, config.max_sub_interval_ms);
    debug!(
        "Window {}..={} split into {} sub-intervals of at most {} ms",
        start_ts,
        end_ts,
        subintervals.len(),
        config.max_sub_interval_ms
    );
    if subintervals.is_empty() {
        return Err(ExportError::EmptyWindow { start_ts, end_ts });
    }

    let mut tables = Vec::with_capacity(subintervals.len());
    for (index, interval) in subintervals.iter().enumerate() {
        console.print(&progress_line(index, subintervals.len()))?;

        let data = client
            .get_timeseries(entity_id, &keys, interval.start, interval.end, config.timeseries_limit)
            .await?;
        debug!(
            "Sub-interval {}..={} returned {} points",
            interval.start,
            interval.end,
            data.point_count()
        );

        tables.push(TelemetryTable::from_response(&data));
    }
    console.print("100.00 %\n")?;

    let mut table = TelemetryTable::concat(tables);
    table.dedup_by_ts();
    table.sort_by_ts();
    Ok(table)
}

pub fn progress_line(current: usize, total: usize) -> String {
    let progress = if total == 0 {
        0.0
    } else {
        100.0 * current as f64 / total as f64
    };
    format!("{:.2} %", progress)
}
