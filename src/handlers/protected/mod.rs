// Operations that require a bound tenant (TenantContext extension)
pub mod branches;
pub mod fiscal;
pub mod tenant;

pub use branches::*;
pub use fiscal::*;
pub use tenant::*;
