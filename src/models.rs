use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

pub type Id = i64;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page number whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Returned when a wire string does not name a variant of one of the closed enums below.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

// as_str / Display / FromStr for the closed enums; the strings match the serde names.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $s),+ }
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
        impl std::str::FromStr for $name {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

// ---------------- Enums -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_type", rename_all = "snake_case")]
pub enum ContentType {
    Thread,
    Reply,
    User, // only on audit records of direct bans and unbans
}
string_enum!(ContentType { Thread => "thread", Reply => "reply", User => "user" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_reason", rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    HateSpeech,
    InappropriateContent,
    SelfHarm,
    Misinformation,
    Other,
}
string_enum!(ReportReason {
    Spam => "spam",
    Harassment => "harassment",
    HateSpeech => "hate_speech",
    InappropriateContent => "inappropriate_content",
    SelfHarm => "self_harm",
    Misinformation => "misinformation",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}
string_enum!(ReportStatus { Pending => "pending", Reviewed => "reviewed", Resolved => "resolved" });

/// Triage severity. Variant order is the sort order: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_priority", rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}
string_enum!(Priority { Low => "low", Medium => "medium", High => "high", Critical => "critical" });

impl Priority {
    /// Deterministic priority for a new report from its reason and the reported user's
    /// count of previously resolved reports.
    ///
    /// `Low` is never produced here: every reason has an explicit rank, and unknown reason
    /// strings are rejected before a report is built.
    pub fn assign(reason: ReportReason, prior_violations: i64) -> Priority {
        match reason {
            ReportReason::SelfHarm => Priority::Critical,
            ReportReason::Harassment | ReportReason::HateSpeech => {
                if prior_violations >= 2 { Priority::Critical } else { Priority::High }
            }
            ReportReason::Spam | ReportReason::Misinformation => {
                if prior_violations >= 3 { Priority::High } else { Priority::Medium }
            }
            ReportReason::InappropriateContent | ReportReason::Other => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "moderation_status", rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Hidden,
    Deleted,
}
string_enum!(ModerationStatus { Pending => "pending", Approved => "approved", Hidden => "hidden", Deleted => "deleted" });

impl ModerationStatus {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, ModerationStatus::Hidden | ModerationStatus::Deleted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "moderation_action_kind", rename_all = "snake_case")]
pub enum ActionKind {
    Dismiss,
    WarnUser,
    HideContent,
    DeleteContent,
    BanUserTemp,
    BanUserPermanent,
    Unban,
    /// Hidden or deleted content put back to `approved`.
    RestoreContent,
}
string_enum!(ActionKind {
    Dismiss => "dismiss",
    WarnUser => "warn_user",
    HideContent => "hide_content",
    DeleteContent => "delete_content",
    BanUserTemp => "ban_user_temp",
    BanUserPermanent => "ban_user_permanent",
    Unban => "unban",
    RestoreContent => "restore_content",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}
string_enum!(UserStatus { Active => "active", Inactive => "inactive", Suspended => "suspended" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BanType {
    Temporary,
    Permanent,
}

impl BanType {
    pub fn action_kind(&self) -> ActionKind {
        match self {
            BanType::Temporary => ActionKind::BanUserTemp,
            BanType::Permanent => ActionKind::BanUserPermanent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl ActivityLevel {
    pub fn from_post_count(posts: i64) -> Self {
        if posts > 50 {
            ActivityLevel::High
        } else if posts > 10 {
            ActivityLevel::Medium
        } else {
            ActivityLevel::Low
        }
    }
}

// ---------------- Users -----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub role: Role,
    pub status: UserStatus,
    pub ban_expires_at: Option<DateTime<Utc>>, // None while suspended = permanent
    pub thread_count: i32,
    pub reply_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
}

// ---------------- Categories / threads / replies ------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_private: bool,
    #[serde(skip_serializing, default)]
    #[schema(skip)]
    pub password_hash: Option<String>,
    pub is_locked: bool,
    pub thread_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_private: bool,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct LockRequest {
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Thread {
    pub id: Id,
    pub category_id: Id,
    pub author_id: Id,
    pub title: String,
    pub content: String,
    pub moderation_status: ModerationStatus,
    pub is_private: bool,
    #[serde(skip_serializing, default)]
    #[schema(skip)]
    pub password_hash: Option<String>,
    pub assigned_moderator_id: Option<Id>,
    pub is_locked: bool,
    pub reply_count: i32,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_reply_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    pub category_id: Id,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_private: bool,
    pub password: Option<String>,
    pub assigned_moderator_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct NewThread {
    pub category_id: Id,
    pub author_id: Id,
    pub title: String,
    pub content: String,
    pub is_private: bool,
    pub password_hash: Option<String>,
    pub assigned_moderator_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Reply {
    pub id: Id,
    pub thread_id: Id,
    pub author_id: Id,
    pub parent_reply_id: Option<Id>,
    pub content: String,
    pub moderation_status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateReplyRequest {
    pub content: String,
    pub parent_reply_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub thread_id: Id,
    pub author_id: Id,
    pub parent_reply_id: Option<Id>,
    pub content: String,
}

// ---------------- Reports -----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Report {
    pub id: Id,
    pub content_type: ContentType,
    pub content_id: Id,
    pub reporter_id: Id,
    pub reported_user_id: Id, // frozen at submission
    pub reason: ReportReason,
    pub description: String,
    pub status: ReportStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire shape of a report submission. Kept stringly so unknown values surface as typed
/// validation errors rather than body-parse failures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub content_type: String,
    pub content_id: Id,
    pub reason: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub content_type: ContentType,
    pub content_id: Id,
    pub reporter_id: Id,
    pub reported_user_id: Id,
    pub reason: ReportReason,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub priority: Option<Priority>,
    pub reporter_id: Option<Id>,
    pub reported_user_id: Option<Id>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportCounts {
    pub total: i64,
    pub pending: i64,
    pub reviewed: i64,
    pub resolved: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OffenderHistory {
    pub previous_reports_count: i64,
    pub previous_violations_count: i64,
    pub account_age_days: i64,
    pub activity_level: ActivityLevel,
}

impl OffenderHistory {
    pub fn unknown() -> Self {
        Self {
            previous_reports_count: 0,
            previous_violations_count: 0,
            account_age_days: 0,
            activity_level: ActivityLevel::Unknown,
        }
    }
}

/// One row of the moderator triage queue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueueEntry {
    pub report: Report,
    pub reported_username: Option<String>,
    pub content_preview: Option<String>,
    pub offender_history: OffenderHistory,
}

// ---------------- Moderation audit trail ----------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ModerationAction {
    pub id: Id,
    pub report_id: Option<Id>, // None for direct bans/unbans
    pub content_type: ContentType,
    pub content_id: Id,
    pub reported_user_id: Id,
    pub moderator_id: Id,
    pub action: ActionKind,
    pub reason: String,
    pub internal_notes: Option<String>,
    pub ban_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewModerationAction {
    pub report_id: Option<Id>,
    pub content_type: ContentType,
    pub content_id: Id,
    pub reported_user_id: Id,
    pub moderator_id: Id,
    pub action: ActionKind,
    pub reason: String,
    pub internal_notes: Option<String>,
    pub ban_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModerationActionRequest {
    pub action: String,
    pub reason: String,
    pub ban_duration_days: Option<i64>,
    pub internal_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BanRequest {
    pub ban_type: BanType,
    pub reason: String,
    pub ban_duration_days: Option<i64>,
    pub internal_notes: Option<String>,
}

/// Staff action on a thread or reply outside any report: `hide`, `unhide` or `delete`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentModerationRequest {
    pub action: String,
    pub reason: String,
    pub internal_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionFilter {
    pub moderator_id: Option<Id>,
    pub action: Option<ActionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// (report created, action created) pair used for time-to-resolution averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSample {
    pub reported_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModerationStats {
    pub total_reports: i64,
    pub pending_reports: i64,
    pub resolved_reports: i64,
    pub content_hidden: i64,
    pub content_deleted: i64,
    pub users_warned: i64,
    pub users_banned_temp: i64,
    pub users_banned_perm: i64,
    pub actions_this_week: i64,
    pub actions_this_month: i64,
    pub average_response_time_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BanStatus {
    pub user_id: Id,
    pub banned: bool,
}

// ---------------- Moderator notes -------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ModeratorNote {
    pub id: Id,
    pub user_id: Id,
    pub moderator_id: Id,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub user_id: Id,
    pub moderator_id: Id,
    pub note: String,
}

// ---------------- Pagination ----------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page: Some(page), page_size: Some(page_size) }
    }

    /// Clamp to `(page, page_size)`: page below 1 becomes 1, page above `MAX_PAGE` becomes
    /// `MAX_PAGE`, a size outside `1..=MAX_PAGE_SIZE` falls back to the default.
    pub fn clamped(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let size = match self.page_size {
            Some(s) if (1..=MAX_PAGE_SIZE).contains(&s) => s,
            _ => DEFAULT_PAGE_SIZE,
        };
        (page, size)
    }

    pub fn offset_limit(&self) -> (i64, i64) {
        let (page, size) = self.clamped();
        ((page - 1) * size, size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(
    ReportPage = Page<Report>,
    QueuePage = Page<QueueEntry>,
    ActionPage = Page<ModerationAction>,
    NotePage = Page<ModeratorNote>
)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        let (page, page_size) = query.clamped();
        let total_pages = total / page_size + i64::from(total % page_size != 0);
        Self { items, total, page, page_size, total_pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_table() {
        use ReportReason::*;
        assert_eq!(Priority::assign(SelfHarm, 0), Priority::Critical);
        assert_eq!(Priority::assign(Harassment, 2), Priority::Critical);
        assert_eq!(Priority::assign(Harassment, 1), Priority::High);
        assert_eq!(Priority::assign(HateSpeech, 5), Priority::Critical);
        assert_eq!(Priority::assign(Spam, 3), Priority::High);
        assert_eq!(Priority::assign(Spam, 2), Priority::Medium);
        assert_eq!(Priority::assign(Misinformation, 0), Priority::Medium);
        for n in [0, 1, 7, 100] {
            assert_eq!(Priority::assign(Other, n), Priority::Medium);
            assert_eq!(Priority::assign(InappropriateContent, n), Priority::Medium);
        }
    }

    #[test]
    fn priority_orders_by_severity() {
        let mut v = vec![Priority::Medium, Priority::Critical, Priority::Low, Priority::High];
        v.sort_by(|a, b| b.cmp(a));
        assert_eq!(v, vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn enum_strings_match_wire_names() {
        assert_eq!("hate_speech".parse::<ReportReason>().unwrap(), ReportReason::HateSpeech);
        assert_eq!(ActionKind::BanUserPermanent.to_string(), "ban_user_permanent");
        assert!("ban_user_forever".parse::<ActionKind>().is_err());
        assert_eq!(
            serde_json::to_string(&ReportReason::InappropriateContent).unwrap(),
            "\"inappropriate_content\""
        );
    }

    #[test]
    fn page_query_clamps() {
        assert_eq!(PageQuery::new(0, 0).clamped(), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(PageQuery::new(3, 101).clamped(), (3, DEFAULT_PAGE_SIZE));
        assert_eq!(PageQuery::new(2, 10).offset_limit(), (10, 10));
        assert_eq!(PageQuery::new(i64::MAX, 20).clamped(), (MAX_PAGE, 20));
        let p: Page<u8> = Page::new(vec![], 41, &PageQuery::new(1, 20));
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        for size in [1, 20, MAX_PAGE_SIZE] {
            let (offset, limit) = PageQuery::new(i64::MAX, size).offset_limit();
            assert!(offset >= 0);
            assert_eq!(limit, size);
        }
        let p: Page<u8> = Page::new(vec![], i64::MAX - 1, &PageQuery::new(i64::MAX, MAX_PAGE_SIZE));
        assert_eq!(p.page, MAX_PAGE);
        assert_eq!(p.total_pages, (i64::MAX - 1) / MAX_PAGE_SIZE + 1);
    }
}
