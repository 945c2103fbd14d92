#![cfg(feature = "postgres-store")]

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use veil::auth::Role;
use veil::error::ServiceError;
use veil::models::*;
use veil::moderation::ModerationExecutor;
use veil::reports::ReportLedger;
use veil::repo::pg::PgRepo;
use veil::repo::{CategoryRepo, ReportRepo, RepoError, ThreadRepo, UserRepo};

async fn pg_repo() -> Option<PgRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(PgRepo::new(pool))
}

fn uniq(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let ns = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("{prefix}{ns}")
}

async fn seed(repo: &PgRepo) -> (User, User, User, Thread) {
    let user = |role| NewUser { username: uniq("u-"), role };
    let author = repo.create_user(user(Role::User)).await.unwrap();
    let reporter = repo.create_user(user(Role::User)).await.unwrap();
    let moderator = repo.create_user(user(Role::Moderator)).await.unwrap();
    let category = repo
        .create_category(NewCategory {
            name: "General".into(),
            slug: uniq("general-"),
            description: String::new(),
            is_private: false,
            password_hash: None,
        })
        .await
        .unwrap();
    let thread = repo
        .create_thread(NewThread {
            category_id: category.id,
            author_id: author.id,
            title: "First".into(),
            content: "OP body".into(),
            is_private: false,
            password_hash: None,
            assigned_moderator_id: None,
        })
        .await
        .unwrap();
    (author, reporter, moderator, thread)
}

#[tokio::test]
#[serial_test::serial]
async fn unique_index_rejects_duplicate_reports() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return };
    let (author, reporter, _, thread) = seed(&repo).await;
    let new = || NewReport {
        content_type: ContentType::Thread,
        content_id: thread.id,
        reporter_id: reporter.id,
        reported_user_id: author.id,
        reason: ReportReason::Spam,
        description: String::new(),
        priority: Priority::Medium,
    };
    repo.create_report(new()).await.unwrap();
    assert!(matches!(repo.create_report(new()).await.unwrap_err(), RepoError::Conflict));
}

#[tokio::test]
#[serial_test::serial]
async fn moderation_round_trip_against_postgres() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return };
    let (author, reporter, moderator, thread) = seed(&repo).await;
    let repo = Arc::new(repo);
    let ledger = ReportLedger::new(repo.clone());
    let executor = ModerationExecutor::new(repo.clone());

    let report = ledger
        .submit(
            reporter.id,
            CreateReportRequest {
                content_type: "thread".into(),
                content_id: thread.id,
                reason: "hate_speech".into(),
                description: "slurs".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.priority, Priority::High);

    let moderator_actor = veil::auth::Actor { id: moderator.id, role: moderator.role };
    let record = executor
        .execute(
            moderator_actor,
            report.id,
            ModerationActionRequest {
                action: "ban_user_temp".into(),
                reason: "hate speech".into(),
                ban_duration_days: Some(14),
                internal_notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(record.action, ActionKind::BanUserTemp);
    assert_eq!(repo.get_user(author.id).await.unwrap().status, UserStatus::Suspended);
    assert_eq!(repo.get_report(report.id).await.unwrap().status, ReportStatus::Resolved);

    // guarded update: a resolved report stays resolved
    assert!(matches!(
        repo.set_report_status(report.id, ReportStatus::Reviewed).await.unwrap_err(),
        RepoError::Conflict
    ));
    let err = executor
        .execute(
            moderator_actor,
            report.id,
            ModerationActionRequest {
                action: "dismiss".into(),
                reason: "oops".into(),
                ban_duration_days: None,
                internal_notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ReportAlreadyResolved));

    let locked = repo.set_thread_locked(thread.id, true).await.unwrap();
    assert!(locked.is_locked);
}
