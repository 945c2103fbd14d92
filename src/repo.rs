use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::*;

#[cfg(feature = "inmem-store")]
pub mod inmem;
#[cfg(feature = "postgres-store")]
pub mod pg;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Denormalized counters. Increments are atomic at the storage layer and never part of
/// any invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    CategoryThreads,
    ThreadReplies, // also stamps last_reply_at
    ThreadViews,
    UserThreads,
    UserReplies,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn update_user_status(
        &self,
        id: Id,
        status: UserStatus,
        ban_expires_at: Option<DateTime<Utc>>,
    ) -> RepoResult<User>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn create_category(&self, new: NewCategory) -> RepoResult<Category>;
    async fn get_category(&self, id: Id) -> RepoResult<Category>;
    async fn set_category_locked(&self, id: Id, locked: bool) -> RepoResult<Category>;
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    /// Idempotent.
    async fn subscribe(&self, user_id: Id, category_id: Id) -> RepoResult<()>;
    async fn unsubscribe(&self, user_id: Id, category_id: Id) -> RepoResult<()>;
    async fn is_subscribed(&self, user_id: Id, category_id: Id) -> RepoResult<bool>;
}

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn create_thread(&self, new: NewThread) -> RepoResult<Thread>;
    async fn get_thread(&self, id: Id) -> RepoResult<Thread>;
    /// Most recently active first.
    async fn list_threads(&self, category_id: Id) -> RepoResult<Vec<Thread>>;
    async fn set_thread_status(&self, id: Id, status: ModerationStatus) -> RepoResult<()>;
    async fn set_thread_locked(&self, id: Id, locked: bool) -> RepoResult<Thread>;
}

#[async_trait]
pub trait ReplyRepo: Send + Sync {
    async fn create_reply(&self, new: NewReply) -> RepoResult<Reply>;
    async fn get_reply(&self, id: Id) -> RepoResult<Reply>;
    /// Oldest first.
    async fn list_replies(&self, thread_id: Id) -> RepoResult<Vec<Reply>>;
    async fn set_reply_status(&self, id: Id, status: ModerationStatus) -> RepoResult<()>;
}

#[async_trait]
pub trait CounterRepo: Send + Sync {
    async fn increment(&self, counter: Counter, id: Id, delta: i32) -> RepoResult<()>;
}

#[async_trait]
pub trait ReportRepo: Send + Sync {
    /// Inserts a `pending` report. Fails with `Conflict` when the reporter already has a
    /// report on the same content; this check is atomic with the insert.
    async fn create_report(&self, new: NewReport) -> RepoResult<Report>;
    async fn get_report(&self, id: Id) -> RepoResult<Report>;
    async fn has_reported(&self, reporter_id: Id, content_type: ContentType, content_id: Id) -> RepoResult<bool>;
    /// Priority descending, then newest first.
    async fn list_reports(&self, filter: &ReportFilter, offset: i64, limit: i64) -> RepoResult<(Vec<Report>, i64)>;
    async fn count_reports_against(&self, user_id: Id) -> RepoResult<i64>;
    /// Resolved reports against the user.
    async fn count_violations(&self, user_id: Id) -> RepoResult<i64>;
    /// Moves a report to `status`. Fails with `Conflict` if it is already resolved.
    async fn set_report_status(&self, id: Id, status: ReportStatus) -> RepoResult<Report>;
    async fn count_by_status(&self) -> RepoResult<ReportCounts>;
}

/// Append-only audit trail: no update or delete operations exist.
#[async_trait]
pub trait ModerationActionRepo: Send + Sync {
    async fn record_action(&self, new: NewModerationAction) -> RepoResult<ModerationAction>;
    /// Newest first.
    async fn list_actions(&self, filter: &ActionFilter, offset: i64, limit: i64) -> RepoResult<(Vec<ModerationAction>, i64)>;
    async fn action_counts(&self, moderator_id: Option<Id>) -> RepoResult<Vec<(ActionKind, i64)>>;
    async fn count_actions_since(&self, moderator_id: Option<Id>, since: DateTime<Utc>) -> RepoResult<i64>;
    /// Report-linked actions that resolved a report (everything except `dismiss`) since `since`.
    async fn resolution_samples(&self, moderator_id: Option<Id>, since: DateTime<Utc>) -> RepoResult<Vec<ResolutionSample>>;
}

#[async_trait]
pub trait NoteRepo: Send + Sync {
    async fn create_note(&self, new: NewNote) -> RepoResult<ModeratorNote>;
    /// Newest first.
    async fn list_notes(&self, user_id: Id, offset: i64, limit: i64) -> RepoResult<(Vec<ModeratorNote>, i64)>;
    async fn delete_note(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo:
    UserRepo
    + CategoryRepo
    + SubscriptionRepo
    + ThreadRepo
    + ReplyRepo
    + CounterRepo
    + ReportRepo
    + ModerationActionRepo
    + NoteRepo
{
}

impl<T> Repo for T where
    T: UserRepo
        + CategoryRepo
        + SubscriptionRepo
        + ThreadRepo
        + ReplyRepo
        + CounterRepo
        + ReportRepo
        + ModerationActionRepo
        + NoteRepo
{
}
