use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{Actor, Auth};
use crate::content::ContentService;
use crate::error::ApiError;
use crate::models::*;
use crate::moderation::ModerationExecutor;
use crate::notes::NoteService;
use crate::password::PasswordHasher;
use crate::reports::ReportLedger;
use crate::repo::Repo;
use crate::stats::ModerationStatistics;

pub const THREAD_PASSWORD_HEADER: &str = "X-Thread-Password";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/reports").route(web::post().to(submit_report)))
            .service(web::resource("/reports/mine").route(web::get().to(my_reports)))
            // moderation (staff only; enforced by the services)
            .service(web::resource("/moderation/reports").route(web::get().to(moderation_queue)))
            .service(web::resource("/moderation/reports/{id}").route(web::get().to(get_report)))
            .service(
                web::resource("/moderation/reports/{id}/actions").route(web::post().to(execute_action)),
            )
            .service(web::resource("/moderation/actions").route(web::get().to(list_actions)))
            .service(web::resource("/moderation/stats").route(web::get().to(moderation_stats)))
            .service(
                web::resource("/moderation/users/{id}/ban")
                    .route(web::get().to(ban_status))
                    .route(web::post().to(ban_user)),
            )
            .service(web::resource("/moderation/users/{id}/unban").route(web::post().to(unban_user)))
            .service(
                web::resource("/moderation/users/{id}/reports").route(web::get().to(reports_against_user)),
            )
            .service(
                web::resource("/moderation/users/{id}/notes")
                    .route(web::get().to(list_notes))
                    .route(web::post().to(create_note)),
            )
            .service(web::resource("/moderation/notes/{id}").route(web::delete().to(delete_note)))
            .service(web::resource("/moderation/threads/{id}").route(web::post().to(moderate_thread)))
            .service(web::resource("/moderation/replies/{id}").route(web::post().to(moderate_reply)))
            // content
            .service(web::resource("/categories").route(web::post().to(create_category)))
            .service(web::resource("/categories/{id}/threads").route(web::get().to(list_threads)))
            .service(web::resource("/categories/{id}/lock").route(web::post().to(lock_category)))
            .service(
                web::resource("/categories/{id}/subscription")
                    .route(web::post().to(subscribe))
                    .route(web::delete().to(unsubscribe)),
            )
            .service(web::resource("/threads").route(web::post().to(create_thread)))
            .service(web::resource("/threads/{id}").route(web::get().to(get_thread)))
            .service(web::resource("/threads/{id}/lock").route(web::post().to(lock_thread)))
            .service(
                web::resource("/threads/{id}/replies")
                    .route(web::get().to(list_replies))
                    .route(web::post().to(create_reply)),
            )
            .service(web::resource("/replies/{id}").route(web::get().to(get_reply)))
            .service(web::resource("/users/{id}").route(web::get().to(get_user)))
            .service(web::resource("/admin/users").route(web::post().to(create_user))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub reports: ReportLedger,
    pub moderation: ModerationExecutor,
    pub stats: ModerationStatistics,
    pub content: ContentService,
    pub notes: NoteService,
}

impl AppState {
    pub fn new<R: Repo + 'static>(repo: Arc<R>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            reports: ReportLedger::new(repo.clone()),
            moderation: ModerationExecutor::new(repo.clone()),
            stats: ModerationStatistics::new(repo.clone()),
            content: ContentService::new(repo.clone(), hasher),
            notes: NoteService::new(repo),
        }
    }
}

fn thread_password(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(THREAD_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn optional_actor(auth: Option<Auth>) -> Option<Actor> {
    auth.and_then(|a| a.0.actor())
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub status: Option<ReportStatus>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub moderator_id: Option<Id>,
    pub action: Option<ActionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub moderator_id: Option<Id>,
}

// ---------------- reports -------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = Report),
        (status = 400, description = "Invalid content type, reason or description"),
        (status = 403, description = "Cannot report own content"),
        (status = 404, description = "Content not found"),
        (status = 409, description = "Already reported")
    )
)]
pub async fn submit_report(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<CreateReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let report = data.reports.submit(actor.id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/mine",
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "1..=100, default 20")
    ),
    responses((status = 200, description = "Reports filed by the caller", body = ReportPage))
)]
pub async fn my_reports(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let page = data.reports.list_by_reporter(actor.id, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/reports",
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "1..=100, default 20"),
        ("status" = Option<ReportStatus>, Query, description = "Filter by status"),
        ("priority" = Option<Priority>, Query, description = "Filter by priority")
    ),
    responses(
        (status = 200, description = "Triage queue, highest priority first", body = QueuePage),
        (status = 403, description = "Moderators only")
    )
)]
pub async fn moderation_queue(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<QueueQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let q = query.into_inner();
    let filter = ReportFilter { status: q.status, priority: q.priority, ..Default::default() };
    let page = PageQuery { page: q.page, page_size: q.page_size };
    let queue = data.reports.list_for_moderation(actor, filter, &page).await?;
    Ok(HttpResponse::Ok().json(queue))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/reports/{id}",
    params(("id" = Id, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = Report),
        (status = 404, description = "Report not found")
    )
)]
pub async fn get_report(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let report = data.reports.get_report(actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/reports/{id}/actions",
    params(("id" = Id, Path, description = "Report id")),
    request_body = ModerationActionRequest,
    responses(
        (status = 201, description = "Action executed and recorded", body = ModerationAction),
        (status = 400, description = "Invalid action or ban duration"),
        (status = 403, description = "Moderators only, or own content"),
        (status = 404, description = "Report or content not found"),
        (status = 409, description = "Report already resolved"),
        (status = 500, description = "Mutation applied but audit record not written")
    )
)]
pub async fn execute_action(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ModerationActionRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let action = data.moderation.execute(actor, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(action))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/actions",
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "1..=100, default 20"),
        ("moderator_id" = Option<Id>, Query, description = "Only actions by this moderator"),
        ("action" = Option<ActionKind>, Query, description = "Only this action kind"),
        ("from" = Option<DateTime<Utc>>, Query, description = "Created at or after"),
        ("to" = Option<DateTime<Utc>>, Query, description = "Created at or before")
    ),
    responses(
        (status = 200, description = "Audit trail, newest first", body = ActionPage),
        (status = 403, description = "Moderators only")
    )
)]
pub async fn list_actions(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<ActionsQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let q = query.into_inner();
    let filter = ActionFilter { moderator_id: q.moderator_id, action: q.action, from: q.from, to: q.to };
    let page = PageQuery { page: q.page, page_size: q.page_size };
    let actions = data.moderation.list_actions(actor, filter, &page).await?;
    Ok(HttpResponse::Ok().json(actions))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/stats",
    params(("moderator_id" = Option<Id>, Query, description = "Restrict action statistics to one moderator")),
    responses(
        (status = 200, description = "Moderation statistics", body = ModerationStats),
        (status = 403, description = "Moderators only")
    )
)]
pub async fn moderation_stats(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let stats = data.stats.get_stats(actor, query.moderator_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

// ---------------- bans ----------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/moderation/users/{id}/ban",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Whether a ban is currently in force", body = BanStatus),
        (status = 404, description = "User not found")
    )
)]
pub async fn ban_status(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    actor.require_staff()?;
    let user_id = path.into_inner();
    let banned = data.moderation.bans().is_banned(user_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(BanStatus { user_id, banned }))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/users/{id}/ban",
    params(("id" = Id, Path, description = "User id")),
    request_body = BanRequest,
    responses(
        (status = 201, description = "User suspended", body = ModerationAction),
        (status = 400, description = "Invalid ban duration"),
        (status = 403, description = "Target is a moderator/admin, or self"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already banned")
    )
)]
pub async fn ban_user(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<BanRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let action = data.moderation.ban_user(actor, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(action))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/users/{id}/unban",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 201, description = "User reinstated", body = ModerationAction),
        (status = 404, description = "User not found")
    )
)]
pub async fn unban_user(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let action = data.moderation.unban_user(actor, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(action))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/threads/{id}",
    params(("id" = Id, Path, description = "Thread id")),
    request_body = ContentModerationRequest,
    responses(
        (status = 201, description = "Thread hidden, restored or deleted", body = ModerationAction),
        (status = 400, description = "Unknown action or missing reason"),
        (status = 403, description = "Moderators only; not on own content"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn moderate_thread(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ContentModerationRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let action = data
        .moderation
        .moderate_content(actor, ContentType::Thread, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(action))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/replies/{id}",
    params(("id" = Id, Path, description = "Reply id")),
    request_body = ContentModerationRequest,
    responses(
        (status = 201, description = "Reply hidden, restored or deleted", body = ModerationAction),
        (status = 400, description = "Unknown action or missing reason"),
        (status = 403, description = "Moderators only; not on own content"),
        (status = 404, description = "Reply not found")
    )
)]
pub async fn moderate_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ContentModerationRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let action = data
        .moderation
        .moderate_content(actor, ContentType::Reply, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(action))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/users/{id}/reports",
    params(
        ("id" = Id, Path, description = "Reported user id"),
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "1..=100, default 20")
    ),
    responses(
        (status = 200, description = "Reports against the user", body = ReportPage),
        (status = 403, description = "Moderators only")
    )
)]
pub async fn reports_against_user(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let page = data.reports.list_by_reported_user(actor, path.into_inner(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

// ---------------- notes ---------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/moderation/users/{id}/notes",
    params(
        ("id" = Id, Path, description = "User id"),
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "1..=100, default 20")
    ),
    responses(
        (status = 200, description = "Notes on the user, newest first", body = NotePage),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_notes(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let notes = data.notes.list(actor, path.into_inner(), &query).await?;
    Ok(HttpResponse::Ok().json(notes))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/users/{id}/notes",
    params(("id" = Id, Path, description = "User id")),
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = ModeratorNote),
        (status = 404, description = "User not found")
    )
)]
pub async fn create_note(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CreateNoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let note = data.notes.create(actor, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(note))
}

#[utoipa::path(
    delete,
    path = "/api/v1/moderation/notes/{id}",
    params(("id" = Id, Path, description = "Note id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn delete_note(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    data.notes.delete(actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- categories ----------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Slug taken")
    )
)]
pub async fn create_category(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let category = data.content.create_category(actor, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/threads",
    params(("id" = Id, Path, description = "Category id")),
    responses(
        (status = 200, description = "Visible threads, most recently active first", body = [Thread]),
        (status = 403, description = "Category is private"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn list_threads(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let threads = data.content.list_threads(optional_actor(auth), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(threads))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/{id}/subscription",
    params(("id" = Id, Path, description = "Category id")),
    request_body = SubscribeRequest,
    responses(
        (status = 204, description = "Subscribed"),
        (status = 403, description = "Invalid category password"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn subscribe(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: Option<web::Json<SubscribeRequest>>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let body = payload.map(|p| p.into_inner()).unwrap_or_default();
    data.content.subscribe(actor, path.into_inner(), body.password.as_deref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}/subscription",
    params(("id" = Id, Path, description = "Category id")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn unsubscribe(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    data.content.unsubscribe(actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/{id}/lock",
    params(("id" = Id, Path, description = "Category id")),
    request_body = LockRequest,
    responses(
        (status = 200, description = "Lock flag updated", body = Category),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn lock_category(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<LockRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let category = data.content.lock_category(actor, path.into_inner(), payload.locked).await?;
    Ok(HttpResponse::Ok().json(category))
}

// ---------------- threads & replies ---------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = Thread),
        (status = 403, description = "Category private or locked"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn create_thread(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<CreateThreadRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let thread = data.content.create_thread(actor, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(thread))
}

#[utoipa::path(
    get,
    path = "/api/v1/threads/{id}",
    params(
        ("id" = Id, Path, description = "Thread id"),
        ("X-Thread-Password" = Option<String>, Header, description = "Password for a private thread")
    ),
    responses(
        (status = 200, description = "Thread", body = Thread),
        (status = 403, description = "Category or thread is private"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn get_thread(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let password = thread_password(&req);
    let thread = data
        .content
        .get_thread(optional_actor(auth), path.into_inner(), password.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{id}/lock",
    params(("id" = Id, Path, description = "Thread id")),
    request_body = LockRequest,
    responses(
        (status = 200, description = "Lock flag updated", body = Thread),
        (status = 403, description = "Moderators only"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn lock_thread(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<LockRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let thread = data.content.lock_thread(actor, path.into_inner(), payload.locked).await?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    get,
    path = "/api/v1/threads/{id}/replies",
    params(
        ("id" = Id, Path, description = "Thread id"),
        ("X-Thread-Password" = Option<String>, Header, description = "Password for a private thread")
    ),
    responses(
        (status = 200, description = "Visible replies, oldest first", body = [Reply]),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn list_replies(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let password = thread_password(&req);
    let replies = data
        .content
        .list_replies(optional_actor(auth), path.into_inner(), password.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(replies))
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{id}/replies",
    params(
        ("id" = Id, Path, description = "Thread id"),
        ("X-Thread-Password" = Option<String>, Header, description = "Password for a private thread")
    ),
    request_body = CreateReplyRequest,
    responses(
        (status = 201, description = "Reply created", body = Reply),
        (status = 400, description = "Nesting too deep or parent in another thread"),
        (status = 403, description = "Thread locked or private"),
        (status = 404, description = "Thread or parent reply not found")
    )
)]
pub async fn create_reply(
    req: HttpRequest,
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CreateReplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let password = thread_password(&req);
    let reply = data
        .content
        .create_reply(actor, path.into_inner(), payload.into_inner(), password.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(reply))
}

#[utoipa::path(
    get,
    path = "/api/v1/replies/{id}",
    params(
        ("id" = Id, Path, description = "Reply id"),
        ("X-Thread-Password" = Option<String>, Header, description = "Password for a private thread")
    ),
    responses(
        (status = 200, description = "Reply", body = Reply),
        (status = 404, description = "Reply not found")
    )
)]
pub async fn get_reply(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let password = thread_password(&req);
    let reply = data
        .content
        .get_reply(optional_actor(auth), path.into_inner(), password.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(reply))
}

// ---------------- users ---------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let user = data.content.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid or taken username"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn create_user(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewUser>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth.actor()?;
    let user = data.content.create_user(actor, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}
