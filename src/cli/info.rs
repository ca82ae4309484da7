use std::collections::BTreeSet;

use serde::Serialize;

use super::{init_store, load_config};
use crate::types::{DEFAULT_ROLE, timestamp};

#[derive(Serialize)]
struct MembershipOutput {
    user_id: String,
    client_id: String,
    role: String,
    joined_at: Option<String>,
}

#[derive(Serialize)]
struct DetailedInfo {
    users: usize,
    clients: Vec<String>,
    memberships: Vec<MembershipOutput>,
}

pub fn run_info(data_dir: Option<String>, json: bool) -> anyhow::Result<()> {
    let store = init_store(&load_config(data_dir)?)?;

    let rows = store.list_all_memberships()?;
    let clients = store.list_clients()?;
    let users: BTreeSet<&str> = rows.iter().map(|row| row.user_id.as_str()).collect();
    let user_count = users.len();

    if json {
        let memberships = rows
            .iter()
            .map(|row| MembershipOutput {
                user_id: row.user_id.clone(),
                client_id: row.client_id.clone(),
                role: row.role.clone().unwrap_or_else(|| DEFAULT_ROLE.to_string()),
                joined_at: row
                    .joined_at
                    .as_ref()
                    .and_then(timestamp::from_store_value)
                    .map(|dt| dt.to_rfc3339()),
            })
            .collect();

        let info = DetailedInfo {
            users: user_count,
            clients,
            memberships,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let workspaces: BTreeSet<&str> = rows.iter().map(|row| row.client_id.as_str()).collect();

        println!();
        println!("Shoreline Console Database");
        println!("{}", "─".repeat(26));
        println!("Users:        {user_count}");
        println!("Memberships:  {} across {} workspaces", rows.len(), workspaces.len());
        println!("Profiles:     {}", clients.len());
        println!();
    }

    Ok(())
}
