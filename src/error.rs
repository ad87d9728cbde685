// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseError;
use crate::services::error::TenancyError;
use crate::services::provisioner::ProvisionError;

/// HTTP API error with status code and client-safe message
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    TenantNotSpecified,

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity
    QuotaExceeded(String),

    // 500 Internal Server Error
    InternalServerError(String),
    ProvisioningFailed { message: String, version: Option<String> },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) | ApiError::TenantNotSpecified => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::QuotaExceeded(_) => 422,
            ApiError::InternalServerError(_) | ApiError::ProvisioningFailed { .. } => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::TenantNotSpecified => "Tenant not specified",
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::QuotaExceeded(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::ProvisioningFailed { message, .. } => message,
        }
    }

    /// Error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::TenantNotSpecified => "TENANT_NOT_SPECIFIED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ProvisioningFailed { .. } => "PROVISIONING_FAILED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });
        if let ApiError::ProvisioningFailed { version: Some(version), .. } = self {
            body["version"] = json!(version);
        }
        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidNamespace(_) => {
                tracing::error!("Identifier policy violation: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Timeout(_) => ApiError::service_unavailable("Database temporarily unavailable"),
            err if err.is_transient() => {
                tracing::warn!("Transient database error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            err => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error: {}", err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<TenancyError> for ApiError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::TenantNotSpecified => ApiError::TenantNotSpecified,
            TenancyError::TenantNotFound(_)
            | TenancyError::BranchNotFound(_)
            | TenancyError::FiscalConfigNotFound { .. } => ApiError::not_found(err.to_string()),
            TenancyError::TenantNotActive { .. } => ApiError::forbidden(err.to_string()),
            TenancyError::DuplicateTenant(_)
            | TenancyError::FiscalConfigExists(_)
            | TenancyError::AdminAlreadyBootstrapped(_) => ApiError::conflict(err.to_string()),
            TenancyError::QuotaExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
            TenancyError::InvalidInput(msg) => ApiError::bad_request(msg),
            TenancyError::Timeout { .. } => {
                tracing::warn!("{}", err);
                ApiError::service_unavailable(err.to_string())
            }
            TenancyError::Provisioning(e) => e.into(),
            TenancyError::NamespaceExhausted { .. } => {
                tracing::error!("{}", err);
                ApiError::ProvisioningFailed {
                    message: "Tenant provisioning failed".to_string(),
                    version: None,
                }
            }
            TenancyError::Database(e) => e.into(),
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        tracing::error!("Provisioning error: {}", err);
        let version = err.version().map(str::to_string);
        let message = match &version {
            Some(v) => format!("Tenant provisioning failed at migration {v}"),
            None => "Tenant provisioning failed".to_string(),
        };
        ApiError::ProvisioningFailed { message, version }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
