use chrono::{DateTime, Utc};

use crate::api::{CheckoutSessionRequest, PlanCatalog, PortalSessionRequest};
use crate::render::{format_date_label, format_integer, format_relative_time, format_scan_volume};
use crate::types::WorkspaceProfile;

const SCAN_VOLUME_KEY: &str = "max_scan_mb_per_day";

fn entitlement_label(key: &str) -> String {
    match key {
        "max_queries_per_day" => "Queries per day".to_string(),
        SCAN_VOLUME_KEY => "Data scanned per day".to_string(),
        "max_concurrent_queries" => "Concurrent queries".to_string(),
        "max_result_rows" => "Result row limit".to_string(),
        other => other.replace('_', " "),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Good,
    Warning,
    Danger,
    Muted,
}

impl StatusTone {
    #[must_use]
    pub fn for_status(status: Option<&str>) -> Self {
        match status.map(str::to_ascii_lowercase).as_deref() {
            Some("active" | "trialing") => Self::Good,
            Some("past_due" | "incomplete") => Self::Warning,
            Some("canceled" | "unpaid") => Self::Danger,
            _ => Self::Muted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementRow {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOption {
    pub id: String,
    pub name: String,
}

/// What the plan card shows for a workspace: current plan, subscription
/// status, entitlements and the plans it can switch to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    pub client_id: String,
    pub plan_id: Option<String>,
    pub plan_name: String,
    pub status_label: String,
    pub status_tone: StatusTone,
    pub renews_at: Option<DateTime<Utc>>,
    pub entitlements: Vec<EntitlementRow>,
    pub options: Vec<PlanOption>,
    pub customer_id: Option<String>,
    selected: Option<String>,
}

impl PlanSummary {
    #[must_use]
    pub fn new(profile: &WorkspaceProfile, catalog: &PlanCatalog) -> Self {
        let plan_id = profile.plan_id.clone().filter(|id| !id.is_empty());

        let plan_name = plan_id
            .as_ref()
            .and_then(|id| catalog.get(id).cloned())
            .or_else(|| profile.plan_name.clone())
            .or_else(|| plan_id.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let status_label = profile
            .subscription_status
            .as_deref()
            .map_or_else(|| "Unknown".to_string(), |s| s.replace('_', " "));

        let entitlements = profile
            .entitlements
            .iter()
            .map(|(key, limit)| EntitlementRow {
                key: key.clone(),
                label: entitlement_label(key),
                value: match limit {
                    None => "Unlimited".to_string(),
                    Some(v) if key == SCAN_VOLUME_KEY => format_scan_volume(*v),
                    Some(v) => format_integer(*v),
                },
            })
            .collect();

        let mut options: Vec<PlanOption> = catalog
            .iter()
            .map(|(id, name)| PlanOption {
                id: id.clone(),
                name: name.clone(),
            })
            .collect();
        options.sort_by(|a, b| a.name.cmp(&b.name));

        let mut summary = Self {
            client_id: profile.id.clone(),
            plan_id,
            plan_name,
            status_label,
            status_tone: StatusTone::for_status(profile.subscription_status.as_deref()),
            renews_at: profile.current_period_end,
            entitlements,
            options,
            customer_id: profile.customer_id.clone(),
            selected: None,
        };
        summary.selected = summary.default_selection();
        summary
    }

    fn offers(&self, plan_id: &str) -> bool {
        self.options.iter().any(|option| option.id == plan_id)
    }

    fn default_selection(&self) -> Option<String> {
        match &self.plan_id {
            Some(current) if self.offers(current) => Some(current.clone()),
            _ => self.options.first().map(|option| option.id.clone()),
        }
    }

    /// Plan picked for checkout: the user's choice, else the current plan if
    /// offered, else the first option.
    #[must_use]
    pub fn selected_plan(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Ignored for plans the catalog doesn't offer.
    pub fn select_plan(&mut self, plan_id: &str) -> bool {
        if self.offers(plan_id) {
            self.selected = Some(plan_id.to_string());
            true
        } else {
            false
        }
    }

    /// Checkout only makes sense for a plan other than the current one.
    #[must_use]
    pub fn can_checkout(&self) -> bool {
        self.selected.as_deref().or(self.plan_id.as_deref()).is_some_and(|selected| {
            Some(selected) != self.plan_id.as_deref()
        })
    }

    #[must_use]
    pub fn option_name(&self, plan_id: &str) -> String {
        self.options
            .iter()
            .find(|option| option.id == plan_id)
            .map_or_else(|| plan_id.to_string(), |option| option.name.clone())
    }

    #[must_use]
    pub fn checkout_request(&self, success_url: &str, cancel_url: &str) -> Option<CheckoutSessionRequest> {
        if !self.can_checkout() {
            return None;
        }
        Some(CheckoutSessionRequest {
            client_id: self.client_id.clone(),
            plan_id: self.selected.clone()?,
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
            customer_id: self.customer_id.clone(),
        })
    }

    /// Only workspaces with a billing customer get a portal.
    #[must_use]
    pub fn portal_request(&self, return_url: &str) -> Option<PortalSessionRequest> {
        Some(PortalSessionRequest {
            customer_id: self.customer_id.clone()?,
            return_url: return_url.to_string(),
        })
    }

    /// `Renews on May 1, 2024 (in 3 days)`
    #[must_use]
    pub fn renewal_line(&self, now: DateTime<Utc>) -> Option<String> {
        let at = self.renews_at?;
        Some(format!(
            "Renews on {} ({})",
            format_date_label(&at),
            format_relative_time(&at, now)
        ))
    }
}
