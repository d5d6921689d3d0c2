//! Authorization policy
//!
//! Pure decision functions over (subject, action, resource). No request
//! object, no storage access, no shared state: the router resolves the
//! subject and the target first, then asks this module for an allow/deny.

mod policy;
mod subject;

pub use policy::{can_access_collection, can_access_object, can_manage_users, Action, ResourceKind};
pub use subject::Subject;
