use serde::Serialize;
use uuid::Uuid;

use crate::database::namespace::Namespace;

/// Tenant binding for one request: who the caller acts for and which
/// namespace their statements run against.
///
/// Built only by the resolver (or by services that just created or looked
/// up the tenant in the registry); passed by value down the call chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    tenant_id: Uuid,
    namespace: Namespace,
}

impl TenantContext {
    pub(crate) fn new(tenant_id: Uuid, namespace: Namespace) -> Self {
        Self { tenant_id, namespace }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

/// Where a statement runs: inside a tenant namespace or in the shared area.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Shared,
    Tenant(&'a TenantContext),
}

impl<'a> Scope<'a> {
    pub fn namespace(&self) -> Namespace {
        match self {
            Scope::Shared => Namespace::shared(),
            Scope::Tenant(ctx) => ctx.namespace().clone(),
        }
    }
}

impl<'a> From<&'a TenantContext> for Scope<'a> {
    fn from(ctx: &'a TenantContext) -> Self {
        Scope::Tenant(ctx)
    }
}

impl<'a> From<Option<&'a TenantContext>> for Scope<'a> {
    fn from(ctx: Option<&'a TenantContext>) -> Self {
        ctx.map_or(Scope::Shared, Scope::Tenant)
    }
}
