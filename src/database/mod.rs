pub mod context;
pub mod executor;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod namespace;

pub use context::{Scope, TenantContext};
pub use executor::{ScopedConnection, TenantExecutor};
pub use manager::{DatabaseError, DatabaseManager};
pub use migrations::{Migration, TENANT_CATALOG};
pub use namespace::Namespace;
