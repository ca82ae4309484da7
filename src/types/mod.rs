mod models;
mod profile;
mod query;
pub mod timestamp;
mod usage;

pub use models::*;
pub use profile::*;
pub use query::*;
pub use usage::*;
