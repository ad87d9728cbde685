pub mod bootstrap;
pub mod branch_service;
pub mod error;
pub mod fiscal_service;
pub mod provisioner;
pub mod registry;
pub mod resolver;
pub mod tenant_service;

pub use bootstrap::AdminBootstrap;
pub use branch_service::BranchService;
pub use error::TenancyError;
pub use fiscal_service::FiscalSequenceAllocator;
pub use provisioner::{ProvisionError, ProvisionReport, SchemaProvisioner};
pub use registry::{TenantDirectory, TenantRegistry};
pub use resolver::{is_public_operation, TenantResolver};
pub use tenant_service::TenantService;
