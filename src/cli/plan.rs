use chrono::Utc;

use super::ConsoleContext;
use super::pickers::pick_plan;
use crate::api::{PlanCatalog, create_checkout_session, create_portal_session, fetch_plan_catalog};
use crate::console::{PlanSummary, StatusTone, ViewKey};
use crate::error::Error;
use crate::store::ProfileStore;
use crate::types::WorkspaceProfile;

async fn load_summary(ctx: &ConsoleContext, client_id: &str) -> anyhow::Result<PlanSummary> {
    let profile = ctx
        .cache
        .get_or_fetch::<WorkspaceProfile, _, _>(ViewKey::ClientProfile(client_id.to_string()), || {
            ctx.store.fetch_profile(client_id)
        })
        .await
        .map_err(|e| match e {
            Error::NotFound => anyhow::anyhow!("Workspace '{client_id}' has no billing profile yet"),
            other => other.into(),
        })?;

    let catalog = match ctx
        .cache
        .get_or_fetch(ViewKey::PlanCatalog, || fetch_plan_catalog(&ctx.api))
        .await
    {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(error = %e, "plan catalog unavailable");
            PlanCatalog::new().into()
        }
    };

    Ok(PlanSummary::new(&profile, &catalog))
}

fn tone_marker(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Good => "✓",
        StatusTone::Warning => "!",
        StatusTone::Danger => "✗",
        StatusTone::Muted => "·",
    }
}

pub async fn run_plan(
    data_dir: Option<String>,
    workspace: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(data_dir)?;
    let client_id = ctx.active_workspace(workspace.as_deref()).await?;
    let summary = load_summary(&ctx, &client_id).await?;

    if json {
        let entitlements: serde_json::Map<String, serde_json::Value> = summary
            .entitlements
            .iter()
            .map(|row| (row.key.clone(), row.value.clone().into()))
            .collect();
        let options: Vec<_> = summary
            .options
            .iter()
            .map(|o| serde_json::json!({"id": o.id, "name": o.name}))
            .collect();
        let output = serde_json::json!({
            "client_id": summary.client_id,
            "plan_id": summary.plan_id,
            "plan_name": summary.plan_name,
            "status": summary.status_label,
            "renews_at": summary.renews_at.map(|at| at.to_rfc3339()),
            "customer_id": summary.customer_id,
            "entitlements": entitlements,
            "options": options,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("Plan for {}", summary.client_id);
    println!("{}", "─".repeat(20));
    println!("Plan:    {}", summary.plan_name);
    println!(
        "Status:  {} {}",
        tone_marker(summary.status_tone),
        summary.status_label
    );
    if let Some(line) = summary.renewal_line(Utc::now()) {
        println!("         {line}");
    }
    println!();

    if summary.entitlements.is_empty() {
        println!("No entitlements configured.");
    } else {
        let width = summary
            .entitlements
            .iter()
            .map(|row| row.label.chars().count())
            .max()
            .unwrap_or(0);
        for row in &summary.entitlements {
            println!("  {:<width$}  {}", row.label, row.value);
        }
    }
    println!();

    if !summary.options.is_empty() {
        println!("Available plans:");
        for option in &summary.options {
            let marker = if summary.plan_id.as_deref() == Some(option.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!("  {marker} {} ({})", option.name, option.id);
        }
        println!();
    }
    Ok(())
}

pub async fn run_billing_checkout(
    data_dir: Option<String>,
    workspace: Option<String>,
    plan: Option<String>,
    success_url: Option<String>,
    cancel_url: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(data_dir)?;
    let client_id = ctx.active_workspace(workspace.as_deref()).await?;
    let mut summary = load_summary(&ctx, &client_id).await?;

    let plan_id = match plan {
        Some(id) => id,
        None if non_interactive => {
            anyhow::bail!("--plan is required in non-interactive mode")
        }
        None => match pick_plan(&summary.options, summary.selected_plan())? {
            Some(id) => id,
            None => return Ok(()),
        },
    };
    if !summary.select_plan(&plan_id) {
        anyhow::bail!("Plan '{plan_id}' is not offered");
    }

    let base = ctx.config.api_base_url.trim_end_matches('/');
    let success_url = success_url.unwrap_or_else(|| format!("{base}/billing/success"));
    let cancel_url = cancel_url.unwrap_or_else(|| format!("{base}/billing/cancel"));
    let Some(request) = summary.checkout_request(&success_url, &cancel_url) else {
        anyhow::bail!(
            "{} is already the current plan for {client_id}",
            summary.option_name(&plan_id)
        );
    };

    let redirect = create_checkout_session(&ctx.api, &request).await?;
    println!(
        "Started {} for {} on {}",
        redirect,
        summary.option_name(&plan_id),
        client_id
    );
    Ok(())
}

pub async fn run_billing_portal(
    data_dir: Option<String>,
    workspace: Option<String>,
    return_url: Option<String>,
) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(data_dir)?;
    let client_id = ctx.active_workspace(workspace.as_deref()).await?;
    let summary = load_summary(&ctx, &client_id).await?;

    let return_url = return_url
        .unwrap_or_else(|| format!("{}/billing", ctx.config.api_base_url.trim_end_matches('/')));
    let Some(request) = summary.portal_request(&return_url) else {
        anyhow::bail!("Workspace '{client_id}' has no billing account yet");
    };

    let redirect = create_portal_session(&ctx.api, &request).await?;
    println!("Billing portal: {redirect}");
    Ok(())
}
