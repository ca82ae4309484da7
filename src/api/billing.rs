use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ApiClient, RequestOptions};
use crate::error::{Error, Result};

/// Plan id to display name, as offered by the backend.
pub type PlanCatalog = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub client_id: String,
    pub plan_id: String,
    pub success_url: String,
    pub cancel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSessionRequest {
    pub customer_id: String,
    pub return_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PortalSessionResponse {
    url: String,
}

/// Where the user should be sent to finish a billing flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingRedirect {
    /// Hosted checkout, identified by its session id.
    Checkout { session_id: String },
    /// Billing portal page.
    Portal { url: String },
}

impl fmt::Display for BillingRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkout { session_id } => write!(f, "checkout session {session_id}"),
            Self::Portal { url } => write!(f, "{url}"),
        }
    }
}

pub async fn create_checkout_session(
    api: &ApiClient,
    request: &CheckoutSessionRequest,
) -> Result<BillingRedirect> {
    let options = RequestOptions::post().without_auth().json(request)?;
    let response: CheckoutSessionResponse = api
        .fetch("/api/billing/checkout-session", options)
        .await
        .map_err(|e| prefixed("Failed to create checkout session: ", e))?;
    tracing::debug!(session_id = %response.id, client_id = %request.client_id, "checkout session created");
    Ok(BillingRedirect::Checkout {
        session_id: response.id,
    })
}

pub async fn create_portal_session(
    api: &ApiClient,
    request: &PortalSessionRequest,
) -> Result<BillingRedirect> {
    let options = RequestOptions::post().without_auth().json(request)?;
    let response: PortalSessionResponse = api
        .fetch("/api/billing/portal-session", options)
        .await
        .map_err(|e| prefixed("Failed to create billing portal session: ", e))?;
    Ok(BillingRedirect::Portal { url: response.url })
}

pub async fn fetch_plan_catalog(api: &ApiClient) -> Result<PlanCatalog> {
    api.fetch("/api/billing/plans", RequestOptions::get().without_auth())
        .await
}

fn prefixed(prefix: &str, error: Error) -> Error {
    match error {
        Error::Transport { status, message } => Error::Transport {
            status,
            message: format!("{prefix}{message}"),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_checkout_request_wire_shape() {
        let request = CheckoutSessionRequest {
            client_id: "acme".into(),
            plan_id: "pro".into(),
            success_url: "https://app.test/billing/success".into(),
            cancel_url: "https://app.test/billing/cancel".into(),
            customer_id: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "clientId": "acme",
                "planId": "pro",
                "successUrl": "https://app.test/billing/success",
                "cancelUrl": "https://app.test/billing/cancel",
            })
        );
    }

    #[test]
    fn test_prefix_only_touches_transport_errors() {
        let err = prefixed(
            "Failed to create checkout session: ",
            Error::Transport {
                status: 400,
                message: "invalid_plan".into(),
            },
        );
        assert_eq!(err.to_string(), "Failed to create checkout session: invalid_plan");
        assert_eq!(err.status(), Some(400));

        let err = prefixed("x: ", Error::EmptyResponse);
        assert!(matches!(err, Error::EmptyResponse));
    }
}
