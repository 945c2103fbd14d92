//! Moderation Action Executor.
//!
//! Every successful call writes exactly one `ModerationAction`. The record is written after
//! the mutation it describes; if that write fails the mutation stays in place and the call
//! fails with `AuditWriteFailed` so the caller can alert.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::auth::Actor;
use crate::bans::{ban_expiry, BanManager};
use crate::error::{check_text, NotFoundAs, ServiceError, ServiceResult};
use crate::models::*;
use crate::repo::{ModerationActionRepo, Repo, RepoError, ReplyRepo, ReportRepo, ThreadRepo};

pub const MAX_REASON_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 1000;
const UNBAN_REASON: &str = "ban lifted by moderator";

/// Side effect of an action on the reported content or its author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    None,
    SetStatus(ModerationStatus),
    Ban(BanType),
}

/// Maps an executable action to its effect and the report status it leaves behind.
/// `unban` and `restore_content` are not report-driven and are rejected here.
fn plan(action: ActionKind) -> ServiceResult<(Effect, ReportStatus)> {
    use ActionKind::*;
    Ok(match action {
        Dismiss => (Effect::None, ReportStatus::Reviewed),
        WarnUser => (Effect::None, ReportStatus::Resolved),
        HideContent => (Effect::SetStatus(ModerationStatus::Hidden), ReportStatus::Resolved),
        DeleteContent => (Effect::SetStatus(ModerationStatus::Deleted), ReportStatus::Resolved),
        BanUserTemp => (Effect::Ban(BanType::Temporary), ReportStatus::Resolved),
        BanUserPermanent => (Effect::Ban(BanType::Permanent), ReportStatus::Resolved),
        Unban | RestoreContent => return Err(ServiceError::InvalidModerationAction),
    })
}

/// Direct content actions map to the audit kind and the status they set.
fn content_directive(action: &str) -> ServiceResult<(ActionKind, ModerationStatus)> {
    match action {
        "hide" => Ok((ActionKind::HideContent, ModerationStatus::Hidden)),
        "unhide" => Ok((ActionKind::RestoreContent, ModerationStatus::Approved)),
        "delete" => Ok((ActionKind::DeleteContent, ModerationStatus::Deleted)),
        _ => Err(ServiceError::InvalidModerationAction),
    }
}

fn check_reason_and_notes(reason: &str, notes: Option<&str>) -> ServiceResult<()> {
    check_text("reason", reason, MAX_REASON_LEN, true)?;
    if let Some(n) = notes {
        check_text("internal_notes", n, MAX_NOTES_LEN, false)?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct ModerationExecutor {
    reports: Arc<dyn ReportRepo>,
    actions: Arc<dyn ModerationActionRepo>,
    threads: Arc<dyn ThreadRepo>,
    replies: Arc<dyn ReplyRepo>,
    bans: BanManager,
}

impl ModerationExecutor {
    pub fn new<R: Repo + 'static>(repo: Arc<R>) -> Self {
        Self::with_stores(repo.clone(), repo.clone(), repo.clone(), repo.clone(), BanManager::new(repo))
    }

    pub fn with_stores(
        reports: Arc<dyn ReportRepo>,
        actions: Arc<dyn ModerationActionRepo>,
        threads: Arc<dyn ThreadRepo>,
        replies: Arc<dyn ReplyRepo>,
        bans: BanManager,
    ) -> Self {
        Self { reports, actions, threads, replies, bans }
    }

    pub fn bans(&self) -> &BanManager {
        &self.bans
    }

    /// Applies a moderator's decision to a report.
    pub async fn execute(&self, actor: Actor, report_id: Id, req: ModerationActionRequest) -> ServiceResult<ModerationAction> {
        actor.require_staff()?;
        let report = self.reports.get_report(report_id).await.not_found_as(ServiceError::ReportNotFound)?;
        if report.status == ReportStatus::Resolved {
            return Err(ServiceError::ReportAlreadyResolved);
        }
        if report.reported_user_id == actor.id {
            return Err(ServiceError::CannotModerateSelf);
        }
        let action: ActionKind = req.action.parse().map_err(|_| ServiceError::InvalidModerationAction)?;
        let (effect, next_status) = plan(action)?;
        if let Effect::Ban(ban_type) = effect {
            // validated up front so a bad duration never reaches a mutation
            ban_expiry(ban_type, req.ban_duration_days, chrono::Utc::now())?;
        }
        check_reason_and_notes(&req.reason, req.internal_notes.as_deref())?;

        let ban_expires_at = match effect {
            Effect::None => None,
            Effect::SetStatus(status) => {
                self.set_content_status(&report, status).await?;
                None
            }
            Effect::Ban(ban_type) => {
                self.bans
                    .ban(report.reported_user_id, actor.id, ban_type, req.ban_duration_days)
                    .await?
                    .ban_expires_at
            }
        };

        let record = self
            .audit(NewModerationAction {
                report_id: Some(report.id),
                content_type: report.content_type,
                content_id: report.content_id,
                reported_user_id: report.reported_user_id,
                moderator_id: actor.id,
                action,
                reason: req.reason,
                internal_notes: req.internal_notes,
                ban_expires_at,
            })
            .await?;

        self.reports.set_report_status(report.id, next_status).await.map_err(|e| match e {
            RepoError::Conflict => {
                warn!(report_id, moderator_id = actor.id, "report resolved concurrently; action kept on record");
                ServiceError::ReportAlreadyResolved
            }
            RepoError::NotFound => ServiceError::ReportNotFound,
            other => other.into(),
        })?;

        info!(report_id, %action, moderator_id = actor.id, status = %next_status, "moderation action executed");
        Ok(record)
    }

    /// Direct ban, not tied to a report.
    pub async fn ban_user(&self, actor: Actor, user_id: Id, req: BanRequest) -> ServiceResult<ModerationAction> {
        actor.require_staff()?;
        check_reason_and_notes(&req.reason, req.internal_notes.as_deref())?;
        let user = self.bans.ban(user_id, actor.id, req.ban_type, req.ban_duration_days).await?;
        let record = self
            .audit(NewModerationAction {
                report_id: None,
                content_type: ContentType::User,
                content_id: user_id,
                reported_user_id: user_id,
                moderator_id: actor.id,
                action: req.ban_type.action_kind(),
                reason: req.reason,
                internal_notes: req.internal_notes,
                ban_expires_at: user.ban_expires_at,
            })
            .await?;
        info!(user_id, action = %record.action, moderator_id = actor.id, "direct ban recorded");
        Ok(record)
    }

    pub async fn unban_user(&self, actor: Actor, user_id: Id) -> ServiceResult<ModerationAction> {
        actor.require_staff()?;
        self.bans.unban(user_id, actor.id).await?;
        self.audit(NewModerationAction {
            report_id: None,
            content_type: ContentType::User,
            content_id: user_id,
            reported_user_id: user_id,
            moderator_id: actor.id,
            action: ActionKind::Unban,
            reason: UNBAN_REASON.to_string(),
            internal_notes: None,
            ban_expires_at: None,
        })
        .await
    }

    /// Hides, restores or deletes a thread or reply without a report. Audited with no report id.
    pub async fn moderate_content(
        &self,
        actor: Actor,
        content_type: ContentType,
        content_id: Id,
        req: ContentModerationRequest,
    ) -> ServiceResult<ModerationAction> {
        actor.require_staff()?;
        let (action, status) = content_directive(&req.action)?;
        check_reason_and_notes(&req.reason, req.internal_notes.as_deref())?;
        let author_id = match content_type {
            ContentType::Thread => {
                self.threads.get_thread(content_id).await.not_found_as(ServiceError::ThreadNotFound)?.author_id
            }
            ContentType::Reply => {
                self.replies.get_reply(content_id).await.not_found_as(ServiceError::ReplyNotFound)?.author_id
            }
            ContentType::User => return Err(ServiceError::InvalidContentType),
        };
        if author_id == actor.id {
            return Err(ServiceError::CannotModerateSelf);
        }

        let res = match content_type {
            ContentType::Thread => self.threads.set_thread_status(content_id, status).await,
            _ => self.replies.set_reply_status(content_id, status).await,
        };
        res.not_found_as(ServiceError::ContentNotFound)?;

        let record = self
            .audit(NewModerationAction {
                report_id: None,
                content_type,
                content_id,
                reported_user_id: author_id,
                moderator_id: actor.id,
                action,
                reason: req.reason,
                internal_notes: req.internal_notes,
                ban_expires_at: None,
            })
            .await?;
        info!(%content_type, content_id, %action, moderator_id = actor.id, "content moderated directly");
        Ok(record)
    }

    pub async fn list_actions(
        &self,
        actor: Actor,
        filter: ActionFilter,
        query: &PageQuery,
    ) -> ServiceResult<Page<ModerationAction>> {
        actor.require_staff()?;
        let (offset, limit) = query.offset_limit();
        let (items, total) = self.actions.list_actions(&filter, offset, limit).await?;
        Ok(Page::new(items, total, query))
    }

    async fn set_content_status(&self, report: &Report, status: ModerationStatus) -> ServiceResult<()> {
        let res = match report.content_type {
            ContentType::Thread => self.threads.set_thread_status(report.content_id, status).await,
            ContentType::Reply => self.replies.set_reply_status(report.content_id, status).await,
            ContentType::User => return Err(ServiceError::InvalidContentType),
        };
        res.not_found_as(ServiceError::ContentNotFound)
    }

    async fn audit(&self, new: NewModerationAction) -> ServiceResult<ModerationAction> {
        let (report_id, action, moderator_id) = (new.report_id, new.action, new.moderator_id);
        self.actions.record_action(new).await.map_err(|e| {
            error!(?report_id, %action, moderator_id, "audit write failed after mutation: {e}");
            ServiceError::AuditWriteFailed(e.to_string())
        })
    }
}
