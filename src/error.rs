use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;

use crate::repo::{RepoError, RepoResult};

/// Failure classes. Only `Internal` warrants operator attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
    Internal,
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("report not found")] ReportNotFound,
    #[error("content not found")] ContentNotFound,
    #[error("user not found")] UserNotFound,
    #[error("thread not found")] ThreadNotFound,
    #[error("reply not found")] ReplyNotFound,
    #[error("parent reply not found")] ParentReplyNotFound,
    #[error("category not found")] CategoryNotFound,
    #[error("note not found")] NoteNotFound,

    #[error("content already reported by this user")] AlreadyReported,
    #[error("report already resolved")] ReportAlreadyResolved,
    #[error("user is already banned")] AlreadyBanned,
    #[error("category slug already taken")] CategoryExists,

    #[error("cannot report your own content")] CannotReportSelf,
    #[error("cannot moderate your own content or account")] CannotModerateSelf,
    #[error("moderators and admins cannot be banned")] CannotBanModeratorOrAdmin,
    #[error("thread is locked")] ThreadLocked,
    #[error("category is locked")] CategoryLocked,
    #[error("category is private")] CategoryPrivate,
    #[error("thread is private")] ThreadPrivate,
    #[error("invalid password")] InvalidPassword,
    #[error("insufficient role")] InsufficientRole,

    #[error("invalid content type")] InvalidContentType,
    #[error("invalid moderation action")] InvalidModerationAction,
    #[error("ban duration must be between 1 and 365 days")] InvalidBanDuration,
    #[error("maximum reply nesting level exceeded")] MaxNestingLevelExceeded,
    #[error("parent reply belongs to a different thread")] ParentReplyThreadMismatch,
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("audit record not written after mutation: {0}")] AuditWriteFailed(String),
    #[error("storage: {0}")] Storage(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        use ServiceError::*;
        match self {
            ReportNotFound | ContentNotFound | UserNotFound | ThreadNotFound | ReplyNotFound
            | ParentReplyNotFound | CategoryNotFound | NoteNotFound => ErrorKind::NotFound,
            AlreadyReported | ReportAlreadyResolved | AlreadyBanned | CategoryExists => ErrorKind::Conflict,
            CannotReportSelf | CannotModerateSelf | CannotBanModeratorOrAdmin | ThreadLocked | CategoryLocked
            | CategoryPrivate | ThreadPrivate | InvalidPassword | InsufficientRole => ErrorKind::Forbidden,
            InvalidContentType | InvalidModerationAction | InvalidBanDuration
            | MaxNestingLevelExceeded | ParentReplyThreadMismatch | InvalidField { .. } => ErrorKind::Validation,
            AuditWriteFailed(_) | Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        use ServiceError::*;
        match self {
            ReportNotFound => "REPORT_NOT_FOUND",
            ContentNotFound => "CONTENT_NOT_FOUND",
            UserNotFound => "USER_NOT_FOUND",
            ThreadNotFound => "THREAD_NOT_FOUND",
            ReplyNotFound => "REPLY_NOT_FOUND",
            ParentReplyNotFound => "PARENT_REPLY_NOT_FOUND",
            CategoryNotFound => "CATEGORY_NOT_FOUND",
            NoteNotFound => "NOTE_NOT_FOUND",
            AlreadyReported => "ALREADY_REPORTED",
            ReportAlreadyResolved => "REPORT_ALREADY_RESOLVED",
            AlreadyBanned => "ALREADY_BANNED",
            CategoryExists => "CATEGORY_EXISTS",
            CannotReportSelf => "CANNOT_REPORT_SELF",
            CannotModerateSelf => "CANNOT_MODERATE_SELF",
            CannotBanModeratorOrAdmin => "CANNOT_BAN_MODERATOR_OR_ADMIN",
            ThreadLocked => "THREAD_LOCKED",
            CategoryLocked => "CATEGORY_LOCKED",
            CategoryPrivate => "CATEGORY_PRIVATE",
            ThreadPrivate => "THREAD_PRIVATE",
            InvalidPassword => "INVALID_PASSWORD",
            InsufficientRole => "INSUFFICIENT_ROLE",
            InvalidContentType => "INVALID_CONTENT_TYPE",
            InvalidModerationAction => "INVALID_MODERATION_ACTION",
            InvalidBanDuration => "INVALID_BAN_DURATION",
            MaxNestingLevelExceeded => "MAX_NESTING_LEVEL_EXCEEDED",
            ParentReplyThreadMismatch => "PARENT_REPLY_THREAD_MISMATCH",
            InvalidField { .. } => "VALIDATION_ERROR",
            AuditWriteFailed(_) => "AUDIT_WRITE_FAILED",
            Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ServiceError::InvalidField { field, reason: reason.into() }
    }
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

/// Maps `RepoError::NotFound` to a domain not-found error; everything else is internal.
pub trait NotFoundAs<T> {
    fn not_found_as(self, err: ServiceError) -> ServiceResult<T>;
}

impl<T> NotFoundAs<T> for RepoResult<T> {
    fn not_found_as(self, err: ServiceError) -> ServiceResult<T> {
        self.map_err(|e| match e {
            RepoError::NotFound => err,
            other => other.into(),
        })
    }
}

/// Rejects empty or overlong free text.
pub fn check_text(field: &'static str, value: &str, max: usize, required: bool) -> ServiceResult<()> {
    if required && value.trim().is_empty() {
        return Err(ServiceError::invalid(field, "must not be empty"));
    }
    if value.chars().count() > max {
        return Err(ServiceError::invalid(field, format!("must be at most {max} characters")));
    }
    Ok(())
}

// ---------------- HTTP mapping ------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub code: &'static str,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound(&'static str),
    #[error("conflict")] Conflict(&'static str),
    #[error("forbidden")] Forbidden(&'static str),
    #[error("bad request: {1}")] BadRequest(&'static str, String),
    #[error("unauthorized")] Unauthorized,
    #[error("internal error")] Internal,
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let code = e.code();
        match e.kind() {
            ErrorKind::NotFound => ApiError::NotFound(code),
            ErrorKind::Conflict => ApiError::Conflict(code),
            ErrorKind::Forbidden => ApiError::Forbidden(code),
            ErrorKind::Validation => ApiError::BadRequest(code, e.to_string()),
            ErrorKind::Internal => {
                error!(code, error = %e, "internal error");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let (status, code) = match self {
            ApiError::NotFound(c) => (StatusCode::NOT_FOUND, *c),
            ApiError::Conflict(c) => (StatusCode::CONFLICT, *c),
            ApiError::Forbidden(c) => (StatusCode::FORBIDDEN, *c),
            ApiError::BadRequest(c, _) => (StatusCode::BAD_REQUEST, *c),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string(), code })
    }
}
