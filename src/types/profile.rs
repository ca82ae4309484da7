use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamp;

/// Named usage ceilings. `None` means unlimited.
pub type Entitlements = BTreeMap<String, Option<f64>>;

/// Billing and plan state for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub price_id: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub entitlements: Entitlements,
}

impl WorkspaceProfile {
    /// Normalizes a raw workspace document, tolerating the field aliases and
    /// loose value types different writers have used.
    #[must_use]
    pub fn from_document(id: &str, doc: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            doc.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let time = |key: &str| doc.get(key).and_then(timestamp::from_document_value);

        Self {
            id: id.to_string(),
            display_name: text("display_name").or_else(|| text("name")),
            plan_id: text("plan_id").or_else(|| text("plan")),
            plan_name: text("plan_name"),
            price_id: text("price_id"),
            subscription_status: text("subscription_status"),
            subscription_id: text("subscription_id"),
            customer_id: text("stripe_customer_id").or_else(|| text("customer_id")),
            current_period_end: time("current_period_end"),
            updated_at: time("updated_at"),
            entitlements: doc
                .get("entitlements")
                .and_then(Value::as_object)
                .map(normalize_entitlements)
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Numbers are kept, null means unlimited, numeric strings are parsed and
/// anything else is dropped.
fn normalize_entitlements(raw: &Map<String, Value>) -> Entitlements {
    raw.iter()
        .filter_map(|(key, value)| {
            let limit = match value {
                Value::Null => None,
                Value::Number(n) => Some(n.as_f64()?),
                Value::String(s) => Some(s.trim().parse::<f64>().ok().filter(|v| v.is_finite())?),
                _ => return None,
            };
            Some((key.clone(), limit))
        })
        .collect()
}
