/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Registry-level tenant status. Only `Active` tenants resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Blocked,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
            TenantStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for TenantStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "inactive" => Ok(TenantStatus::Inactive),
            "blocked" => Ok(TenantStatus::Blocked),
            other => Err(ParseEnumError::new("tenant status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Professional,
    Enterprise,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Basic => "basic",
            PlanType::Professional => "professional",
            PlanType::Enterprise => "enterprise",
        }
    }
}

impl FromStr for PlanType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(PlanType::Basic),
            "professional" => Ok(PlanType::Professional),
            "enterprise" => Ok(PlanType::Enterprise),
            other => Err(ParseEnumError::new("plan", other)),
        }
    }
}

/// Fiscal document types with an independent number sequence per branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// NF-e, model 55
    Nfe,
    /// NFC-e, model 65
    Nfce,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Nfe => "nfe",
            DocumentType::Nfce => "nfce",
        }
    }
}

impl FromStr for DocumentType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nfe" | "nf-e" | "55" => Ok(DocumentType::Nfe),
            "nfce" | "nfc-e" | "65" => Ok(DocumentType::Nfce),
            _ => Err(ParseEnumError::new("document type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalEnvironment {
    Production,
    Homologation,
}

impl FiscalEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            FiscalEnvironment::Production => "production",
            FiscalEnvironment::Homologation => "homologation",
        }
    }
}

impl FromStr for FiscalEnvironment {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(FiscalEnvironment::Production),
            "homologation" => Ok(FiscalEnvironment::Homologation),
            other => Err(ParseEnumError::new("fiscal environment", other)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        })*
    };
}

display_as_str!(TenantStatus, PlanType, DocumentType, FiscalEnvironment);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_accepts_model_numbers() {
        assert_eq!("55".parse::<DocumentType>().unwrap(), DocumentType::Nfe);
        assert_eq!("NFC-e".parse::<DocumentType>().unwrap(), DocumentType::Nfce);
        assert!("57".parse::<DocumentType>().is_err());
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [TenantStatus::Active, TenantStatus::Inactive, TenantStatus::Blocked] {
            assert_eq!(status.as_str().parse::<TenantStatus>().unwrap(), status);
        }
        let err = "deleted".parse::<TenantStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid tenant status value: 'deleted'");
    }
}
