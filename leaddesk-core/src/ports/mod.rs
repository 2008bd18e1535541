//! Port definitions (hexagonal architecture)
//!
//! Services depend only on these traits, not on the concrete stores.

mod repository;

pub use repository::{validate_identifier, OrderBy, Repository, Row, SelectQuery};
