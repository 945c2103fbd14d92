use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::Actor;
use crate::error::{check_text, NotFoundAs, ServiceError, ServiceResult};
use crate::models::*;
use crate::repo::{Repo, RepoError, ReplyRepo, ReportRepo, ThreadRepo, UserRepo};

pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const PREVIEW_LEN: usize = 200;

/// Only threads and replies can be reported; `user` exists for audit records alone.
pub fn parse_content_type(raw: &str) -> ServiceResult<ContentType> {
    match raw.parse::<ContentType>() {
        Ok(t @ (ContentType::Thread | ContentType::Reply)) => Ok(t),
        _ => Err(ServiceError::InvalidContentType),
    }
}

/// First `PREVIEW_LEN` characters, cut back to the last word boundary.
pub fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_LEN).collect();
    let head = match cut.rfind(char::is_whitespace) {
        Some(i) if i > 0 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}...", head.trim_end())
}

#[derive(Clone)]
pub struct ReportLedger {
    reports: Arc<dyn ReportRepo>,
    threads: Arc<dyn ThreadRepo>,
    replies: Arc<dyn ReplyRepo>,
    users: Arc<dyn UserRepo>,
}

impl ReportLedger {
    pub fn new<R: Repo + 'static>(repo: Arc<R>) -> Self {
        Self {
            reports: repo.clone(),
            threads: repo.clone(),
            replies: repo.clone(),
            users: repo,
        }
    }

    pub async fn submit(&self, reporter_id: Id, req: CreateReportRequest) -> ServiceResult<Report> {
        let content_type = parse_content_type(&req.content_type)?;
        let reason: ReportReason = req
            .reason
            .parse()
            .map_err(|e: UnknownVariant| ServiceError::invalid("reason", e.to_string()))?;
        check_text("description", &req.description, MAX_DESCRIPTION_LEN, false)?;

        let reported_user_id = self.author_of(content_type, req.content_id).await?;
        if reported_user_id == reporter_id {
            return Err(ServiceError::CannotReportSelf);
        }

        // fast path only; create_report enforces uniqueness atomically
        match self.reports.has_reported(reporter_id, content_type, req.content_id).await {
            Ok(true) => return Err(ServiceError::AlreadyReported),
            Ok(false) => {}
            Err(e) => warn!(reporter_id, "duplicate pre-check failed: {e}"),
        }

        let violations = self.reports.count_violations(reported_user_id).await.unwrap_or_else(|e| {
            warn!(reported_user_id, "violation count unavailable, assuming none: {e}");
            0
        });
        let priority = Priority::assign(reason, violations);

        let report = self
            .reports
            .create_report(NewReport {
                content_type,
                content_id: req.content_id,
                reporter_id,
                reported_user_id,
                reason,
                description: req.description,
                priority,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict => ServiceError::AlreadyReported,
                other => other.into(),
            })?;
        info!(report_id = report.id, reporter_id, %reason, %priority, "report submitted");
        Ok(report)
    }

    /// Staff can read any report; a reporter only their own. Anyone else gets not-found.
    pub async fn get_report(&self, actor: Actor, id: Id) -> ServiceResult<Report> {
        let report = self.reports.get_report(id).await.not_found_as(ServiceError::ReportNotFound)?;
        if actor.role.is_staff() || report.reporter_id == actor.id {
            Ok(report)
        } else {
            Err(ServiceError::ReportNotFound)
        }
    }

    /// The triage queue: priority descending, then newest first, each row annotated for
    /// the moderator.
    pub async fn list_for_moderation(
        &self,
        actor: Actor,
        filter: ReportFilter,
        query: &PageQuery,
    ) -> ServiceResult<Page<QueueEntry>> {
        actor.require_staff()?;
        let (offset, limit) = query.offset_limit();
        let (reports, total) = self.reports.list_reports(&filter, offset, limit).await?;
        let mut entries = Vec::with_capacity(reports.len());
        for report in reports {
            entries.push(self.annotate(report).await);
        }
        Ok(Page::new(entries, total, query))
    }

    pub async fn list_by_reporter(&self, reporter_id: Id, query: &PageQuery) -> ServiceResult<Page<Report>> {
        let filter = ReportFilter { reporter_id: Some(reporter_id), ..Default::default() };
        let (offset, limit) = query.offset_limit();
        let (items, total) = self.reports.list_reports(&filter, offset, limit).await?;
        Ok(Page::new(items, total, query))
    }

    pub async fn list_by_reported_user(
        &self,
        actor: Actor,
        user_id: Id,
        query: &PageQuery,
    ) -> ServiceResult<Page<Report>> {
        actor.require_staff()?;
        let filter = ReportFilter { reported_user_id: Some(user_id), ..Default::default() };
        let (offset, limit) = query.offset_limit();
        let (items, total) = self.reports.list_reports(&filter, offset, limit).await?;
        Ok(Page::new(items, total, query))
    }

    async fn author_of(&self, content_type: ContentType, content_id: Id) -> ServiceResult<Id> {
        match content_type {
            ContentType::Thread => Ok(self
                .threads
                .get_thread(content_id)
                .await
                .not_found_as(ServiceError::ContentNotFound)?
                .author_id),
            ContentType::Reply => Ok(self
                .replies
                .get_reply(content_id)
                .await
                .not_found_as(ServiceError::ContentNotFound)?
                .author_id),
            ContentType::User => Err(ServiceError::InvalidContentType),
        }
    }

    // Annotations are context, not data of record: lookup failures degrade to empty values.
    async fn annotate(&self, report: Report) -> QueueEntry {
        let content_preview = self.content_preview(report.content_type, report.content_id).await;
        let (reported_username, offender_history) = match self.users.get_user(report.reported_user_id).await {
            Ok(user) => {
                let history = self.offender_history(&user).await;
                (Some(user.username), history)
            }
            Err(e) => {
                if !matches!(e, RepoError::NotFound) {
                    warn!(user_id = report.reported_user_id, "offender lookup failed: {e}");
                }
                (None, OffenderHistory::unknown())
            }
        };
        QueueEntry { report, reported_username, content_preview, offender_history }
    }

    async fn offender_history(&self, user: &User) -> OffenderHistory {
        let previous_reports_count = self.reports.count_reports_against(user.id).await.unwrap_or_else(|e| {
            warn!(user_id = user.id, "report count unavailable: {e}");
            0
        });
        let previous_violations_count = self.reports.count_violations(user.id).await.unwrap_or_else(|e| {
            warn!(user_id = user.id, "violation count unavailable: {e}");
            0
        });
        OffenderHistory {
            previous_reports_count,
            previous_violations_count,
            account_age_days: (Utc::now() - user.created_at).num_days().max(0),
            activity_level: ActivityLevel::from_post_count(i64::from(user.thread_count) + i64::from(user.reply_count)),
        }
    }

    async fn content_preview(&self, content_type: ContentType, content_id: Id) -> Option<String> {
        let text = match content_type {
            ContentType::Thread => self.threads.get_thread(content_id).await.ok()?.content,
            ContentType::Reply => self.replies.get_reply(content_id).await.ok()?.content,
            ContentType::User => return None,
        };
        Some(preview(&text))
    }
}
