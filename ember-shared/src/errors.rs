use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E2xxx: User errors
/// - E3xxx: Matching errors
/// - E4xxx: Messaging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    ServiceUnavailable,
    PayloadTooLarge,
    TokenExpired,
    TokenInvalid,

    // User (E2xxx)
    ProfileNotFound,
    InvalidDisplayName,
    PhotoUploadFailed,
    PhotoLimitReached,
    PhotoNotFound,
    InvalidLocation,
    PremiumRequired,
    Underage,

    // Matching (E3xxx)
    CannotSwipeSelf,
    DailyLikeLimitReached,
    DailySuperLikeLimitReached,
    MatchNotFound,
    InvalidSwipeAction,

    // Messaging (E4xxx)
    ConversationNotFound,
    NotConversationMember,
    MessageNotFound,
    EmptyMessage,
    MessageTooLong,
    EditWindowExpired,
    MessageDeleted,
    NotMessageSender,
    ConversationClosed,
    InvalidReaction,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::ServiceUnavailable => "E0007",
            Self::PayloadTooLarge => "E0009",
            Self::TokenExpired => "E0010",
            Self::TokenInvalid => "E0011",

            // User
            Self::ProfileNotFound => "E2001",
            Self::InvalidDisplayName => "E2003",
            Self::PhotoUploadFailed => "E2004",
            Self::PhotoLimitReached => "E2005",
            Self::PhotoNotFound => "E2006",
            Self::InvalidLocation => "E2008",
            Self::PremiumRequired => "E2009",
            Self::Underage => "E2010",

            // Matching
            Self::CannotSwipeSelf => "E3001",
            Self::DailyLikeLimitReached => "E3002",
            Self::DailySuperLikeLimitReached => "E3003",
            Self::MatchNotFound => "E3004",
            Self::InvalidSwipeAction => "E3005",

            // Messaging
            Self::ConversationNotFound => "E4001",
            Self::NotConversationMember => "E4002",
            Self::MessageNotFound => "E4003",
            Self::EmptyMessage => "E4004",
            Self::MessageTooLong => "E4005",
            Self::EditWindowExpired => "E4006",
            Self::MessageDeleted => "E4007",
            Self::NotMessageSender => "E4008",
            Self::ConversationClosed => "E4009",
            Self::InvalidReaction => "E4010",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ValidationError | Self::InvalidDisplayName
            | Self::InvalidLocation | Self::InvalidSwipeAction | Self::EmptyMessage
            | Self::MessageTooLong | Self::InvalidReaction | Self::PhotoUploadFailed
            | Self::Underage => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::PhotoNotFound
            | Self::MatchNotFound | Self::ConversationNotFound
            | Self::MessageNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::CannotSwipeSelf
            | Self::NotConversationMember | Self::NotMessageSender
            | Self::EditWindowExpired => StatusCode::FORBIDDEN,
            Self::PremiumRequired => StatusCode::PAYMENT_REQUIRED,
            Self::DailyLikeLimitReached | Self::DailySuperLikeLimitReached => StatusCode::TOO_MANY_REQUESTS,
            Self::PhotoLimitReached | Self::MessageDeleted
            | Self::ConversationClosed => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// The code this error renders with, if it is a known domain error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Known { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        tracing::error!(error = %err, "failed to get database connection");
        Self::new(ErrorCode::ServiceUnavailable, "database unavailable")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new(ErrorCode::NotFound.code(), "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new(ErrorCode::InternalError.code(), "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new(ErrorCode::ValidationError.code(), msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError, ErrorCode::ValidationError, ErrorCode::NotFound,
            ErrorCode::Unauthorized, ErrorCode::ServiceUnavailable, ErrorCode::PayloadTooLarge,
            ErrorCode::TokenExpired, ErrorCode::TokenInvalid, ErrorCode::ProfileNotFound,
            ErrorCode::InvalidDisplayName, ErrorCode::PhotoUploadFailed,
            ErrorCode::PhotoLimitReached, ErrorCode::PhotoNotFound,
            ErrorCode::InvalidLocation, ErrorCode::PremiumRequired, ErrorCode::Underage,
            ErrorCode::CannotSwipeSelf, ErrorCode::DailyLikeLimitReached,
            ErrorCode::DailySuperLikeLimitReached, ErrorCode::MatchNotFound,
            ErrorCode::InvalidSwipeAction, ErrorCode::ConversationNotFound,
            ErrorCode::NotConversationMember, ErrorCode::MessageNotFound, ErrorCode::EmptyMessage,
            ErrorCode::MessageTooLong, ErrorCode::EditWindowExpired, ErrorCode::MessageDeleted,
            ErrorCode::NotMessageSender, ErrorCode::ConversationClosed, ErrorCode::InvalidReaction,
        ];
        let mut codes: Vec<&str> = all.iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        let before = codes.len();
        codes.dedup();
        assert_eq!(before, codes.len());
    }

    #[test]
    fn like_limit_is_too_many_requests() {
        assert_eq!(ErrorCode::DailyLikeLimitReached.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorCode::DailyLikeLimitReached.code(), "E3002");
    }

    #[test]
    fn known_error_renders_its_status() {
        let resp = AppError::new(ErrorCode::EditWindowExpired, "too late").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn diesel_not_found_renders_404() {
        let resp = AppError::Database(diesel::result::Error::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
