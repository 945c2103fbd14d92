use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::auth::Actor;
use crate::error::ServiceResult;
use crate::models::{ActionKind, Id, ModerationStats, ReportCounts, ResolutionSample};
use crate::repo::{ModerationActionRepo, Repo, ReportRepo};

const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;
/// Trailing window for the average time-to-resolution.
const RESPONSE_WINDOW_DAYS: i64 = 30;

/// Folds per-kind action counts into the stats fields. Kinds without a field are ignored.
pub fn apply_action_counts(stats: &mut ModerationStats, counts: &[(ActionKind, i64)]) {
    for &(kind, n) in counts {
        match kind {
            ActionKind::HideContent => stats.content_hidden += n,
            ActionKind::DeleteContent => stats.content_deleted += n,
            ActionKind::WarnUser => stats.users_warned += n,
            ActionKind::BanUserTemp => stats.users_banned_temp += n,
            ActionKind::BanUserPermanent => stats.users_banned_perm += n,
            ActionKind::Dismiss | ActionKind::Unban | ActionKind::RestoreContent => {}
        }
    }
}

/// Mean hours between report creation and the resolving action. `0.0` with no samples.
pub fn average_response_hours(samples: &[ResolutionSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let total_secs: i64 = samples
        .iter()
        .map(|s| (s.resolved_at - s.reported_at).num_seconds().max(0))
        .sum();
    total_secs as f64 / samples.len() as f64 / 3600.0
}

#[derive(Clone)]
pub struct ModerationStatistics {
    reports: Arc<dyn ReportRepo>,
    actions: Arc<dyn ModerationActionRepo>,
}

impl ModerationStatistics {
    pub fn new<R: Repo + 'static>(repo: Arc<R>) -> Self {
        Self { reports: repo.clone(), actions: repo }
    }

    pub async fn get_stats(&self, actor: Actor, moderator_id: Option<Id>) -> ServiceResult<ModerationStats> {
        actor.require_staff()?;
        self.stats_at(moderator_id, Utc::now()).await
    }

    /// Report counts are global; everything derived from the audit trail honours
    /// `moderator_id`.
    pub async fn stats_at(&self, moderator_id: Option<Id>, now: DateTime<Utc>) -> ServiceResult<ModerationStats> {
        let ReportCounts { total, pending, resolved, .. } = self.reports.count_by_status().await?;
        let mut stats = ModerationStats {
            total_reports: total,
            pending_reports: pending,
            resolved_reports: resolved,
            ..Default::default()
        };

        let counts = self.actions.action_counts(moderator_id).await?;
        apply_action_counts(&mut stats, &counts);

        stats.actions_this_week = self
            .actions
            .count_actions_since(moderator_id, now - Duration::days(WEEK_DAYS))
            .await?;
        stats.actions_this_month = self
            .actions
            .count_actions_since(moderator_id, now - Duration::days(MONTH_DAYS))
            .await?;

        let samples = self
            .actions
            .resolution_samples(moderator_id, now - Duration::days(RESPONSE_WINDOW_DAYS))
            .await?;
        stats.average_response_time_hours = average_response_hours(&samples);
        Ok(stats)
    }
}
