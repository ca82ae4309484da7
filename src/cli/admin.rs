use std::fs;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::pickers::{confirm_action, value_or_prompt};
use super::{init_store, load_config};
use crate::store::SqliteStore;

pub fn run_init(data_dir: Option<String>) -> anyhow::Result<()> {
    let config = load_config(data_dir)?;
    fs::create_dir_all(&config.data_dir)?;

    let db_path = config.db_path();
    if db_path.exists() {
        anyhow::bail!("Already initialized. Database exists at: {}", db_path.display());
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!();
    println!("Initialized database at {}", db_path.display());
    println!();
    Ok(())
}

pub fn run_member_add(
    data_dir: Option<String>,
    user_id: Option<String>,
    client_id: Option<String>,
    role: Option<String>,
    joined_at: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&load_config(data_dir)?)?;

    let user_id = value_or_prompt(user_id, "user-id", "User ID:", non_interactive)?;
    let client_id = value_or_prompt(client_id, "client-id", "Workspace ID:", non_interactive)?;
    let role = role.filter(|r| !r.trim().is_empty());
    let joined_at = match joined_at {
        Some(text) => parse_time(&text, "joined-at")?,
        None => Utc::now(),
    };

    store.upsert_membership(&user_id, &client_id, role.as_deref(), Some(joined_at))?;

    println!();
    println!(
        "Added {user_id} to {client_id} as {}",
        role.as_deref().unwrap_or(crate::types::DEFAULT_ROLE)
    );
    println!();
    Ok(())
}

pub fn run_member_remove(
    data_dir: Option<String>,
    user_id: String,
    client_id: String,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&load_config(data_dir)?)?;

    let message = format!("Remove {user_id} from {client_id}?");
    if !confirm_action(&message, yes, non_interactive)? {
        println!("Cancelled.");
        return Ok(());
    }

    if !store.remove_membership(&user_id, &client_id)? {
        anyhow::bail!("{user_id} is not a member of {client_id}");
    }

    println!();
    println!("Removed {user_id} from {client_id}");
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_client_set(
    data_dir: Option<String>,
    client_id: String,
    name: Option<String>,
    plan: Option<String>,
    plan_name: Option<String>,
    status: Option<String>,
    customer_id: Option<String>,
    period_end: Option<String>,
    entitlements: Vec<String>,
) -> anyhow::Result<()> {
    let store = init_store(&load_config(data_dir)?)?;
    let mut document = store.get_client_document(&client_id)?.unwrap_or_default();
    // Written fresh by the store on every save.
    document.remove("updated_at");

    let mut set_text = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            document.insert(key.to_string(), Value::String(value));
        }
    };
    set_text("display_name", name);
    set_text("plan_id", plan);
    set_text("plan_name", plan_name);
    set_text("subscription_status", status);
    set_text("stripe_customer_id", customer_id);

    if let Some(text) = period_end {
        let at = parse_time(&text, "period-end")?;
        document.insert("current_period_end".into(), Value::String(at.to_rfc3339()));
    }

    if !entitlements.is_empty() {
        let existing = document
            .remove("entitlements")
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        document.insert(
            "entitlements".into(),
            Value::Object(merge_entitlements(existing, &entitlements)?),
        );
    }

    store.put_client_document(&client_id, &document)?;

    println!();
    println!("Updated workspace {client_id}");
    println!();
    Ok(())
}

fn merge_entitlements(mut map: Map<String, Value>, pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("Invalid entitlement '{pair}'. Expected KEY=VALUE");
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid entitlement '{pair}'. Key cannot be empty");
        }
        let value = if value.eq_ignore_ascii_case("unlimited") {
            Value::Null
        } else {
            let number: f64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Entitlement '{key}' must be a number or 'unlimited'"))?;
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| anyhow::anyhow!("Entitlement '{key}' must be finite"))?
        };
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn parse_time(text: &str, flag: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow::anyhow!("--{flag} must be an RFC 3339 timestamp, got '{text}'"))
}
