use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// A Postgres schema name that is safe to interpolate into SQL text.
///
/// Values only come from three places: derived from a freshly generated
/// tenant id, read back from the tenant registry (and re-validated), or the
/// fixed shared schema. There is deliberately no `From<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Literal prefix of every tenant namespace.
    pub const TENANT_PREFIX: &'static str = "tenant_";

    /// Number of hex characters taken from the tenant id.
    pub const ID_PREFIX_LEN: usize = 12;

    /// Shared area holding the tenant registry.
    pub const SHARED: &'static str = "public";

    /// Postgres truncates identifiers above this many bytes.
    const MAX_IDENTIFIER_LEN: usize = 63;

    /// Derive the namespace for a newly generated tenant id.
    pub fn for_tenant(tenant_id: &Uuid) -> Self {
        let simple = tenant_id.simple().to_string();
        Namespace(format!("{}{}", Self::TENANT_PREFIX, &simple[..Self::ID_PREFIX_LEN]))
    }

    /// Re-validate a namespace name loaded from the registry.
    pub fn parse(name: &str) -> Result<Self, DatabaseError> {
        if Self::is_valid_tenant_namespace(name) {
            Ok(Namespace(name.to_string()))
        } else {
            Err(DatabaseError::InvalidNamespace(name.to_string()))
        }
    }

    pub fn shared() -> Self {
        Namespace(Self::SHARED.to_string())
    }

    pub fn is_shared(&self) -> bool {
        self.0 == Self::SHARED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier for SQL text.
    pub fn quoted(&self) -> String {
        crate::database::manager::quote_identifier(&self.0)
    }

    fn is_reserved(name: &str) -> bool {
        name == Self::SHARED || name == "information_schema" || name.starts_with("pg_")
    }

    fn is_valid_tenant_namespace(name: &str) -> bool {
        let Some(suffix) = name.strip_prefix(Self::TENANT_PREFIX) else {
            return false;
        };
        !suffix.is_empty()
            && name.len() <= Self::MAX_IDENTIFIER_LEN
            && !Self::is_reserved(name)
            && suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a bare SQL identifier (role names from configuration).
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_fixed_length_name_from_id() {
        let id = Uuid::parse_str("3F2504E0-4F89-41D3-9A0C-0305E82C3301").unwrap();
        let ns = Namespace::for_tenant(&id);
        assert_eq!(ns.as_str(), "tenant_3f2504e04f89");
        assert_eq!(ns.as_str().len(), Namespace::TENANT_PREFIX.len() + Namespace::ID_PREFIX_LEN);
        assert_eq!(ns, Namespace::for_tenant(&id));
    }

    #[test]
    fn derived_names_always_parse() {
        for _ in 0..64 {
            let ns = Namespace::for_tenant(&Uuid::new_v4());
            assert_eq!(Namespace::parse(ns.as_str()).unwrap(), ns);
        }
    }

    #[test]
    fn rejects_injection_and_reserved_names() {
        for bad in [
            "public",
            "pg_catalog",
            "information_schema",
            "tenant_",
            "tenant_ABC",
            "tenant-abc",
            "tenant_abc\"; DROP SCHEMA public CASCADE; --",
            "tenant_abc def",
            "other_abc",
        ] {
            assert!(
                matches!(Namespace::parse(bad), Err(DatabaseError::InvalidNamespace(_))),
                "accepted {bad:?}"
            );
        }
        let long = format!("tenant_{}", "a".repeat(60));
        assert!(Namespace::parse(&long).is_err());
    }

    #[test]
    fn quoted_and_shared() {
        let shared = Namespace::shared();
        assert!(shared.is_shared());
        assert_eq!(shared.quoted(), "\"public\"");
        assert!(!Namespace::parse("tenant_abc123").unwrap().is_shared());
    }

    #[test]
    fn validates_role_identifiers() {
        assert!(is_sql_identifier("erp_service"));
        assert!(is_sql_identifier("_svc1"));
        assert!(!is_sql_identifier("1svc"));
        assert!(!is_sql_identifier("svc; DROP"));
        assert!(!is_sql_identifier(""));
    }
}
