// Operations that run without a bound tenant
pub mod bootstrap;
pub mod health;
pub mod register;

pub use bootstrap::admin_bootstrap;
pub use health::health;
pub use register::tenant_register;
