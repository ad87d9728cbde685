pub mod response;
pub mod tenant;

pub use response::{ApiResponse, ApiResult};
pub use tenant::{bind_tenant, TenantBinder, TenantClaim};
