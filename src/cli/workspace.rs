use serde::Serialize;

use super::ConsoleContext;
use super::pickers::{pick_workspace, print_memberships};

#[derive(Serialize)]
struct WorkspaceOutput {
    client_id: String,
    role: String,
    joined_at: Option<String>,
    active: bool,
}

pub async fn run_workspace_list(data_dir: Option<String>, json: bool) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(data_dir)?;
    ctx.memberships().await?;
    if let Some(saved) = ctx.credentials.workspace.as_deref() {
        ctx.resolver.select_client(saved);
    }
    let set = ctx.resolver.snapshot();

    if json {
        let output: Vec<WorkspaceOutput> = set
            .memberships
            .iter()
            .map(|m| WorkspaceOutput {
                client_id: m.client_id.clone(),
                role: m.role.clone(),
                joined_at: m.joined_at.map(|dt| dt.to_rfc3339()),
                active: set.active_id.as_deref() == Some(m.client_id.as_str()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_memberships(&set);
    }

    Ok(())
}

pub async fn run_workspace_select(
    data_dir: Option<String>,
    client_id: Option<String>,
) -> anyhow::Result<()> {
    let mut ctx = ConsoleContext::open(data_dir)?;
    let set = ctx.memberships().await?;

    let client_id = match client_id {
        Some(id) => id,
        None => match pick_workspace(&set)? {
            Some(id) => id,
            None => return Ok(()),
        },
    };

    if !ctx.resolver.select_client(&client_id) {
        anyhow::bail!("You are not a member of workspace '{client_id}'");
    }
    ctx.remember_workspace(&client_id)?;

    println!();
    println!("Active workspace: {client_id}");
    println!();
    Ok(())
}
