use chrono::{Duration, NaiveTime, Utc};

use super::ConsoleContext;
use crate::api::{QueryHistoryParams, fetch_query_history, fetch_usage_history};
use crate::console::ViewKey;
use crate::render::{MISSING, format_currency, format_decimal, format_integer, format_scan_volume};
use crate::types::{QueryHistory, UsageHistory};

const DEFAULT_HISTORY_DAYS: i64 = 7;

pub async fn run_usage(
    data_dir: Option<String>,
    workspace: Option<String>,
    days: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(data_dir)?;
    let client_id = ctx.active_workspace(workspace.as_deref()).await?;
    let days = days.unwrap_or(ctx.config.usage_history_days);

    let history = ctx
        .cache
        .get_or_fetch(ViewKey::UsageHistory(client_id.clone()), || {
            fetch_usage_history(&ctx.api, &client_id, days)
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*history)?);
        return Ok(());
    }

    print_usage(&client_id, &history);
    Ok(())
}

fn print_usage(client_id: &str, history: &UsageHistory) {
    println!();
    println!("Usage for {client_id}");
    println!("{}", "─".repeat(20));

    if history.points.is_empty() {
        println!("No usage recorded yet.");
        println!();
        return;
    }

    let summary = history.summary();
    println!("Queries:       {}", format_integer(summary.total_queries));
    println!("Data scanned:  {}", format_scan_volume(summary.total_scan_mb));
    println!(
        "Daily average: {} queries, {}",
        format_decimal(summary.average_queries, 1),
        format_scan_volume(summary.average_scan_mb)
    );
    if let Some(period) = &history.period {
        println!("Period:        {} to {}", period.start, period.end);
    }
    println!();

    let date_width = history
        .points
        .iter()
        .map(|p| p.date.len())
        .max()
        .unwrap_or(4)
        .max(4);
    println!("  {:<date_width$}  {:>10}  {:>12}", "Date", "Queries", "Scanned");
    for point in &history.points {
        println!(
            "  {:<date_width$}  {:>10}  {:>12}",
            point.date,
            format_integer(point.queries),
            format_scan_volume(point.scan_mb)
        );
    }
    println!();
}

pub async fn run_history(
    data_dir: Option<String>,
    workspace: Option<String>,
    params: QueryHistoryParams,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(data_dir)?;
    let client_id = ctx.active_workspace(workspace.as_deref()).await?;

    let params = with_default_window(params);
    let history = ctx
        .cache
        .get_or_fetch(ViewKey::QueryHistory(client_id.clone()), || {
            fetch_query_history(&ctx.api, &client_id, &params)
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*history)?);
        return Ok(());
    }

    print_history(&history);
    Ok(())
}

/// Missing bounds default to the last seven days, whole days in UTC.
fn with_default_window(mut params: QueryHistoryParams) -> QueryHistoryParams {
    let today = Utc::now().date_naive();
    if params.start.is_none() {
        let start = (today - Duration::days(DEFAULT_HISTORY_DAYS - 1)).and_time(NaiveTime::MIN);
        params.start = Some(start.and_utc().to_rfc3339());
    }
    if params.end.is_none() {
        let end = today.and_hms_milli_opt(23, 59, 59, 999).map(|dt| dt.and_utc());
        params.end = end.map(|dt| dt.to_rfc3339());
    }
    params
}

fn print_history(history: &QueryHistory) {
    let summary = &history.summary;
    println!();
    println!("Query history");
    println!("{}", "─".repeat(20));
    println!("Queries:  {}", format_integer(summary.total_queries as f64));
    println!("Failed:   {}", format_integer(summary.failed_queries as f64));
    println!("Cost:     {}", format_currency(summary.total_cost_usd));
    println!();

    if history.entries.is_empty() {
        println!("No queries in this window.");
        println!();
        return;
    }

    for entry in &history.entries {
        let rows = entry
            .row_count
            .map_or_else(|| MISSING.to_string(), |n| format_integer(n as f64));
        let scanned = entry
            .data_scanned_mb
            .map_or_else(|| MISSING.to_string(), format_scan_volume);
        let cost = entry
            .cost_usd
            .map_or_else(|| MISSING.to_string(), format_currency);
        println!(
            "  {}  {:<9}  rows {rows}  scanned {scanned}  cost {cost}",
            entry.submitted_at, entry.status
        );
        println!("    {}", entry.statement.lines().next().unwrap_or_default());
        if let Some(error) = &entry.error_message {
            println!("    error: {error}");
        }
    }
    println!();
}
