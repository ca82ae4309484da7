//! HTTP access to the console's backend.
//!
//! Everything goes through [`ApiClient`], which resolves URLs against the
//! configured base, attaches a fresh bearer token per call and maps failures
//! onto [`crate::error::Error`]. The endpoint modules only shape requests and
//! normalize responses.

pub mod billing;
mod gateway;
pub mod history;
pub mod query;
pub mod usage;

pub use billing::{
    BillingRedirect, CheckoutSessionRequest, PlanCatalog, PortalSessionRequest,
    create_checkout_session, create_portal_session, fetch_plan_catalog,
};
pub use gateway::{ApiClient, RequestBody, RequestOptions};
pub use history::{QueryHistoryParams, fetch_query_history};
pub use query::execute_sql_query;
pub use usage::fetch_usage_history;
