use crate::auth::Role;
use crate::models::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::submit_report,
        crate::routes::my_reports,
        crate::routes::moderation_queue,
        crate::routes::get_report,
        crate::routes::execute_action,
        crate::routes::list_actions,
        crate::routes::moderation_stats,
        crate::routes::ban_status,
        crate::routes::ban_user,
        crate::routes::unban_user,
        crate::routes::reports_against_user,
        crate::routes::list_notes,
        crate::routes::create_note,
        crate::routes::delete_note,
        crate::routes::moderate_thread,
        crate::routes::moderate_reply,
        crate::routes::create_category,
        crate::routes::list_threads,
        crate::routes::lock_category,
        crate::routes::subscribe,
        crate::routes::unsubscribe,
        crate::routes::create_thread,
        crate::routes::get_thread,
        crate::routes::lock_thread,
        crate::routes::list_replies,
        crate::routes::create_reply,
        crate::routes::get_reply,
        crate::routes::get_user,
        crate::routes::create_user,
    ),
    components(schemas(
        Role, User, NewUser, UserStatus, BanStatus,
        Category, CreateCategoryRequest, SubscribeRequest, LockRequest,
        Thread, CreateThreadRequest, Reply, CreateReplyRequest, ModerationStatus,
        Report, CreateReportRequest, ContentType, ReportReason, ReportStatus, Priority,
        QueueEntry, OffenderHistory, ActivityLevel,
        ModerationAction, ModerationActionRequest, BanRequest, BanType, ActionKind,
        ContentModerationRequest,
        ModerationStats, ModeratorNote, CreateNoteRequest,
        ReportPage, QueuePage, ActionPage, NotePage,
    )),
    tags(
        (name = "reports", description = "Report submission"),
        (name = "moderation", description = "Triage queue, actions, bans, statistics and notes"),
        (name = "content", description = "Categories, threads and replies"),
    )
)]
pub struct ApiDoc;
