//! Structural migrations replayed into every tenant namespace.
//!
//! The catalog is append-only: released entries are never edited or
//! reordered, new structure goes into a new version at the end. Scripts are
//! written unqualified; the provisioner pins `search_path` to the target
//! namespace before running them.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Migration catalog is empty")]
    Empty,

    #[error("Migration at position {0} has an empty version")]
    EmptyVersion(usize),

    #[error("Migration {current} is not strictly after {previous}")]
    OutOfOrder { previous: String, current: String },
}

/// Table tracking applied versions inside each namespace.
pub const MIGRATIONS_TABLE: &str = "schema_migrations";

pub const TENANT_CATALOG: &[Migration] = &[
    Migration {
        version: "0001",
        description: "create branches",
        sql: r#"
CREATE TABLE branches (
    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name        TEXT NOT NULL,
    document    TEXT,
    is_main     BOOLEAN NOT NULL DEFAULT false,
    is_active   BOOLEAN NOT NULL DEFAULT true,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE UNIQUE INDEX branches_single_main ON branches (is_main) WHERE is_main;
"#,
    },
    Migration {
        version: "0002",
        description: "create fiscal configurations",
        sql: r#"
CREATE TABLE fiscal_configs (
    id                UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    branch_id         UUID NOT NULL UNIQUE REFERENCES branches (id),
    environment       TEXT NOT NULL DEFAULT 'homologation'
                      CHECK (environment IN ('production', 'homologation')),
    nfe_series        INTEGER NOT NULL DEFAULT 1 CHECK (nfe_series >= 0),
    nfe_next_number   BIGINT NOT NULL DEFAULT 1 CHECK (nfe_next_number >= 1),
    nfce_series       INTEGER NOT NULL DEFAULT 1 CHECK (nfce_series >= 0),
    nfce_next_number  BIGINT NOT NULL DEFAULT 1 CHECK (nfce_next_number >= 1),
    contingency       BOOLEAN NOT NULL DEFAULT false,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at        TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#,
    },
    Migration {
        version: "0003",
        description: "create users",
        sql: r#"
CREATE TABLE users (
    id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    role           TEXT NOT NULL DEFAULT 'operator'
                   CHECK (role IN ('admin', 'manager', 'operator')),
    branch_id      UUID REFERENCES branches (id),
    is_active      BOOLEAN NOT NULL DEFAULT true,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#,
    },
    Migration {
        version: "0004",
        description: "create customers",
        sql: r#"
CREATE TABLE customers (
    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name        TEXT NOT NULL,
    document    TEXT UNIQUE,
    email       TEXT,
    phone       TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#,
    },
    Migration {
        version: "0005",
        description: "create products and stock levels",
        sql: r#"
CREATE TABLE products (
    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sku         TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    ncm         TEXT,
    unit_price  NUMERIC(14, 2) NOT NULL DEFAULT 0,
    is_active   BOOLEAN NOT NULL DEFAULT true,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE stock_levels (
    branch_id   UUID NOT NULL REFERENCES branches (id),
    product_id  UUID NOT NULL REFERENCES products (id),
    quantity    NUMERIC(14, 3) NOT NULL DEFAULT 0,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (branch_id, product_id)
);
"#,
    },
    Migration {
        version: "0006",
        description: "create fiscal documents",
        sql: r#"
CREATE TABLE fiscal_documents (
    id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    branch_id      UUID NOT NULL REFERENCES branches (id),
    document_type  TEXT NOT NULL CHECK (document_type IN ('nfe', 'nfce')),
    series         INTEGER NOT NULL,
    number         BIGINT NOT NULL,
    customer_id    UUID REFERENCES customers (id),
    total          NUMERIC(14, 2) NOT NULL DEFAULT 0,
    issued_in_contingency BOOLEAN NOT NULL DEFAULT false,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (branch_id, document_type, series, number)
);
"#,
    },
];

/// Check the catalog is non-empty with strictly ascending, unique versions.
pub fn validate_catalog(catalog: &[Migration]) -> Result<(), CatalogError> {
    if catalog.is_empty() {
        return Err(CatalogError::Empty);
    }
    for (i, migration) in catalog.iter().enumerate() {
        if migration.version.trim().is_empty() {
            return Err(CatalogError::EmptyVersion(i));
        }
    }
    for pair in catalog.windows(2) {
        if pair[0].version >= pair[1].version {
            return Err(CatalogError::OutOfOrder {
                previous: pair[0].version.to_string(),
                current: pair[1].version.to_string(),
            });
        }
    }
    Ok(())
}
