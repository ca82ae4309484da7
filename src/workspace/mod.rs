mod resolver;

pub use resolver::{MembershipResolver, memberships_from_record};
