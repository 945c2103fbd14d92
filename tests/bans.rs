#![cfg(feature = "inmem-store")]

mod common;

use chrono::{Duration, Utc};
use common::*;
use veil::bans::BanManager;
use veil::error::ServiceError;
use veil::models::*;
use veil::moderation::ModerationExecutor;
use veil::repo::{ModerationActionRepo, UserRepo};

fn ban_request(ban_type: BanType, days: Option<i64>) -> BanRequest {
    BanRequest { ban_type, reason: "repeated spam".into(), ban_duration_days: days, internal_notes: None }
}

#[tokio::test]
async fn direct_temp_ban_is_audited_without_a_report() {
    let f = Fixture::new().await;
    let executor = ModerationExecutor::new(f.repo.clone());

    let record = executor
        .ban_user(actor(&f.moderator), f.author.id, ban_request(BanType::Temporary, Some(30)))
        .await
        .unwrap();
    assert_eq!(record.action, ActionKind::BanUserTemp);
    assert_eq!(record.report_id, None);
    assert_eq!(record.content_type, ContentType::User);
    assert_eq!(record.reported_user_id, f.author.id);

    let user = f.repo.get_user(f.author.id).await.unwrap();
    assert_eq!(user.status, UserStatus::Suspended);
    assert_eq!(user.ban_expires_at, record.ban_expires_at);
    assert!(user.ban_expires_at.unwrap() > Utc::now() + Duration::days(29));
}

#[tokio::test]
async fn active_ban_cannot_be_stacked() {
    let f = Fixture::new().await;
    let executor = ModerationExecutor::new(f.repo.clone());
    executor
        .ban_user(actor(&f.moderator), f.author.id, ban_request(BanType::Temporary, Some(1)))
        .await
        .unwrap();

    let err = executor
        .ban_user(actor(&f.admin), f.author.id, ban_request(BanType::Permanent, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyBanned));
    let (_, total) = f.repo.list_actions(&ActionFilter::default(), 0, 10).await.unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn unban_restores_and_records() {
    let f = Fixture::new().await;
    let executor = ModerationExecutor::new(f.repo.clone());
    executor
        .ban_user(actor(&f.moderator), f.author.id, ban_request(BanType::Permanent, None))
        .await
        .unwrap();
    assert_eq!(f.repo.get_user(f.author.id).await.unwrap().ban_expires_at, None);
    assert!(executor.bans().is_banned(f.author.id, Utc::now() + Duration::days(3650)).await.unwrap());

    let record = executor.unban_user(actor(&f.moderator), f.author.id).await.unwrap();
    assert_eq!(record.action, ActionKind::Unban);
    assert!(!record.reason.is_empty());

    let user = f.repo.get_user(f.author.id).await.unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(user.ban_expires_at, None);
    assert!(!executor.bans().is_banned(f.author.id, Utc::now()).await.unwrap());
}

#[tokio::test]
async fn staff_accounts_and_self_are_protected() {
    let f = Fixture::new().await;
    let executor = ModerationExecutor::new(f.repo.clone());

    let err = executor
        .ban_user(actor(&f.admin), f.moderator.id, ban_request(BanType::Permanent, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CannotBanModeratorOrAdmin));

    // the manager refuses a self-ban even for an id that would otherwise be bannable
    let bans = BanManager::new(f.repo.clone());
    let err = bans.ban(f.author.id, f.author.id, BanType::Permanent, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::CannotModerateSelf));

    let err = executor
        .ban_user(actor(&f.reporter), f.author.id, ban_request(BanType::Permanent, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientRole));
    assert_eq!(f.repo.get_user(f.author.id).await.unwrap().status, UserStatus::Active);
}

#[tokio::test]
async fn invalid_targets_and_durations() {
    let f = Fixture::new().await;
    let executor = ModerationExecutor::new(f.repo.clone());

    let err = executor
        .ban_user(actor(&f.moderator), 9_999, ban_request(BanType::Permanent, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UserNotFound));
    let err = executor.unban_user(actor(&f.moderator), 9_999).await.unwrap_err();
    assert!(matches!(err, ServiceError::UserNotFound));

    let err = executor
        .ban_user(actor(&f.moderator), f.author.id, ban_request(BanType::Temporary, Some(400)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidBanDuration));
}

#[tokio::test]
async fn expired_temp_ban_can_be_reapplied() {
    let f = Fixture::new().await;
    let lapsed = Utc::now() - Duration::hours(1);
    f.repo
        .update_user_status(f.author.id, UserStatus::Suspended, Some(lapsed))
        .await
        .unwrap();

    let bans = BanManager::new(f.repo.clone());
    assert!(!bans.is_banned(f.author.id, Utc::now()).await.unwrap());

    let user = bans.ban(f.author.id, f.moderator.id, BanType::Temporary, Some(3)).await.unwrap();
    assert!(user.ban_expires_at.unwrap() > Utc::now());
}
