//! # Error Handling
//!
//! Engine-level error taxonomy with sanitized HTTP responses.
//!
//! All validation failures (disallowed fields, unknown operators, flatten
//! spec mismatches, unresolvable related ids) are detected before any storage
//! call is issued, so they never leave partial side effects. Storage failures
//! are logged server-side via the `tracing` crate and never exposed to
//! clients.
//!
//! The HTTP body for every error is the response envelope:
//!
//! ```json
//! { "success": false, "error": "Filtering on field 'secret' is not allowed" }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Engine error type with automatic logging and sanitized responses.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - the record doesn't exist, or a scoping predicate
    /// excludes it.
    NotFound {
        /// Resource type (e.g., "Product", "Artist")
        resource: String,
        /// Optional externally-visible id that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - disallowed/unknown field, invalid operator, invalid
    /// array-filter shape, flatten spec mismatch, invalid alternate-id
    /// lookup column.
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 400 Bad Request - a relation-id substitution on write/filter input
    /// could not resolve. Distinct from plain validation failures so callers
    /// can tell "bad shape" from "no such related record".
    RelatedNotFound {
        /// The field whose value failed to resolve
        field: String,
    },

    /// 500 Internal Server Error - database failure (details logged, not
    /// exposed).
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - generic internal error.
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },

    /// Route-configuration failure detected at startup (alias collision,
    /// flatten spec without a matching include, relation mapping without a
    /// matching association). Never produced by request input.
    Config {
        /// Description of the misconfiguration
        message: String,
    },
}

impl ApiError {
    /// Create a 404 Not Found error.
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 400 error for an unresolvable relation-id substitution.
    pub fn related_not_found(field: impl Into<String>) -> Self {
        Self::RelatedNotFound {
            field: field.into(),
        }
    }

    /// Create a 500 Internal Server Error from a database error.
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a 500 Internal Server Error with optional details.
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Create a startup-time configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::RelatedNotFound { .. } => StatusCode::BAD_REQUEST,
            Self::Database { .. } | Self::Internal { .. } | Self::Config { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The user-facing error message (sanitized).
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => {
                if let Some(id) = id {
                    format!("{resource} with id '{id}' not found")
                } else {
                    format!("{resource} not found")
                }
            }
            Self::BadRequest { message } => message.clone(),
            Self::RelatedNotFound { field } => {
                format!("Related record not found for field '{field}'")
            }
            Self::Database { message, .. } | Self::Internal { message, .. } => message.clone(),
            Self::Config { .. } => "A configuration error occurred".to_string(),
        }
    }

    /// Log internal error details (not sent to user).
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::Config { message } => {
                tracing::error!(details = %message, "Route configuration error");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Request rejected"
                );
            }
        }
    }
}

/// Error envelope sent to users (sanitized).
#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ErrorEnvelope {
            success: false,
            error: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Convert SeaORM `DbErr` to `ApiError`.
///
/// `DbErr::RecordNotFound` becomes 404; everything else is a sanitized 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::Database {
                message: "A database error occurred".to_string(),
                internal: err,
            },
        }
    }
}
