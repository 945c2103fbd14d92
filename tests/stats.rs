#![cfg(feature = "inmem-store")]

mod common;

use chrono::{Duration, Utc};
use common::*;
use veil::error::ServiceError;
use veil::models::*;
use veil::moderation::ModerationExecutor;
use veil::reports::ReportLedger;
use veil::stats::ModerationStatistics;

#[tokio::test]
async fn stats_reflect_reports_and_actions() {
    let f = Fixture::new().await;
    let ledger = ReportLedger::new(f.repo.clone());
    let executor = ModerationExecutor::new(f.repo.clone());
    let stats = ModerationStatistics::new(f.repo.clone());

    let spam = ledger.submit(f.reporter.id, report_request("thread", f.thread.id, "spam")).await.unwrap();
    let abuse = ledger.submit(f.bystander.id, report_request("thread", f.thread.id, "harassment")).await.unwrap();
    let reply = ledger.submit(f.author.id, report_request("reply", f.reply.id, "other")).await.unwrap();
    ledger.submit(f.admin.id, report_request("reply", f.reply.id, "spam")).await.unwrap();

    executor.execute(actor(&f.moderator), spam.id, action_request("dismiss", None)).await.unwrap();
    executor.execute(actor(&f.moderator), abuse.id, action_request("hide_content", None)).await.unwrap();
    executor.execute(actor(&f.admin), reply.id, action_request("ban_user_temp", Some(3))).await.unwrap();

    let all = stats.get_stats(actor(&f.admin), None).await.unwrap();
    assert_eq!(all.total_reports, 4);
    assert_eq!(all.pending_reports, 1);
    assert_eq!(all.resolved_reports, 2);
    assert_eq!(all.content_hidden, 1);
    assert_eq!(all.users_banned_temp, 1);
    assert_eq!(all.users_banned_perm, 0);
    assert_eq!(all.actions_this_week, 3);
    assert_eq!(all.actions_this_month, 3);
    assert!(all.average_response_time_hours >= 0.0);
    assert!(all.average_response_time_hours < 1.0);

    let mine = stats.get_stats(actor(&f.moderator), Some(f.moderator.id)).await.unwrap();
    assert_eq!(mine.total_reports, 4, "report counts are global");
    assert_eq!(mine.content_hidden, 1);
    assert_eq!(mine.users_banned_temp, 0);
    assert_eq!(mine.actions_this_week, 2);
}

#[tokio::test]
async fn windows_slide_with_the_clock() {
    let f = Fixture::new().await;
    let ledger = ReportLedger::new(f.repo.clone());
    let executor = ModerationExecutor::new(f.repo.clone());
    let stats = ModerationStatistics::new(f.repo.clone());

    let r = ledger.submit(f.reporter.id, report_request("thread", f.thread.id, "spam")).await.unwrap();
    executor.execute(actor(&f.moderator), r.id, action_request("warn_user", None)).await.unwrap();

    let later = stats.stats_at(None, Utc::now() + Duration::days(10)).await.unwrap();
    assert_eq!(later.users_warned, 1);
    assert_eq!(later.actions_this_week, 0);
    assert_eq!(later.actions_this_month, 1);

    let much_later = stats.stats_at(None, Utc::now() + Duration::days(40)).await.unwrap();
    assert_eq!(much_later.actions_this_month, 0);
    assert_eq!(much_later.average_response_time_hours, 0.0);
}

#[tokio::test]
async fn empty_system_and_access() {
    let f = Fixture::new().await;
    let stats = ModerationStatistics::new(f.repo.clone());

    let s = stats.get_stats(actor(&f.moderator), None).await.unwrap();
    assert_eq!(s, ModerationStats::default());

    let err = stats.get_stats(actor(&f.reporter), None).await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientRole));
}
