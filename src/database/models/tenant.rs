use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::decode_text;
use crate::database::context::TenantContext;
use crate::database::namespace::Namespace;
use crate::types::{PlanType, TenantStatus};

/// Row of `public.tenants`.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub document: String,
    pub status: TenantStatus,
    pub namespace: Namespace,
    pub plan: PlanType,
    pub max_branches: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// Binding for statements that run inside this tenant's namespace.
    pub fn context(&self) -> TenantContext {
        TenantContext::new(self.id, self.namespace.clone())
    }
}

impl<'r> FromRow<'r, PgRow> for Tenant {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let namespace: String = row.try_get("namespace")?;
        let namespace = Namespace::parse(&namespace).map_err(|e| sqlx::Error::ColumnDecode {
            index: "namespace".to_string(),
            source: Box::new(e),
        })?;

        Ok(Tenant {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            document: row.try_get("document")?,
            status: decode_text(row, "status")?,
            namespace,
            plan: decode_text(row, "plan")?,
            max_branches: row.try_get("max_branches")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenant {
    pub name: String,
    /// Legal document number (CNPJ), unique across all tenants.
    pub document: String,
    #[serde(default = "default_plan")]
    pub plan: PlanType,
    pub max_branches: Option<i32>,
}

fn default_plan() -> PlanType {
    PlanType::Basic
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub plan: Option<PlanType>,
    pub max_branches: Option<i32>,
}

impl TenantUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.plan.is_none() && self.max_branches.is_none()
    }
}
