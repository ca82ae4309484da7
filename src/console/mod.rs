//! Console-level state built on the API and store layers: cached views, the
//! query editor and the plan summary.

pub mod cache;
pub mod editor;
pub mod plan;

pub use cache::{ViewCache, ViewKey};
pub use editor::{DEFAULT_QUERY, QueryEditor};
pub use plan::{EntitlementRow, PlanOption, PlanSummary, StatusTone};
