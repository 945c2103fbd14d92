#![cfg(feature = "inmem-store")]

use veil::{
    auth::Role,
    models::*,
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use veil::repo::{CategoryRepo, Counter, CounterRepo, ReportRepo, SubscriptionRepo, ThreadRepo, UserRepo};

async fn seed_thread(r: &InMemRepo) -> (User, User, Thread) {
    let author = r.create_user(NewUser { username: "op".into(), role: Role::User }).await.unwrap();
    let other = r.create_user(NewUser { username: "anon".into(), role: Role::User }).await.unwrap();
    let category = r
        .create_category(NewCategory {
            name: "General".into(),
            slug: "general".into(),
            description: String::new(),
            is_private: false,
            password_hash: None,
        })
        .await
        .unwrap();
    let thread = r
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
    (author, other, thread)
}

fn new_report(thread: &Thread, reporter_id: Id, reason: ReportReason, priority: Priority) -> NewReport {
    NewReport {
        content_type: ContentType::Thread,
        content_id: thread.id,
        reporter_id,
        reported_user_id: thread.author_id,
        reason,
        description: String::new(),
        priority,
    }
}

#[tokio::test]
async fn duplicate_username_and_slug_conflict() {
    let r = InMemRepo::ephemeral();
    r.create_user(NewUser { username: "op".into(), role: Role::User }).await.unwrap();
    let err = r.create_user(NewUser { username: "op".into(), role: Role::Admin }).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));

    let cat = || NewCategory {
        name: "Tech".into(),
        slug: "tech".into(),
        description: String::new(),
        is_private: false,
        password_hash: None,
    };
    r.create_category(cat()).await.unwrap();
    assert!(matches!(r.create_category(cat()).await.unwrap_err(), RepoError::Conflict));
}

#[tokio::test]
async fn report_uniqueness_is_per_reporter_and_content() {
    let r = InMemRepo::ephemeral();
    let (_, other, thread) = seed_thread(&r).await;
    let third = r.create_user(NewUser { username: "third".into(), role: Role::User }).await.unwrap();

    r.create_report(new_report(&thread, other.id, ReportReason::Spam, Priority::Medium)).await.unwrap();
    let err = r
        .create_report(new_report(&thread, other.id, ReportReason::Other, Priority::Medium))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
    assert!(r.has_reported(other.id, ContentType::Thread, thread.id).await.unwrap());
    assert!(!r.has_reported(other.id, ContentType::Reply, thread.id).await.unwrap());

    r.create_report(new_report(&thread, third.id, ReportReason::Spam, Priority::Medium)).await.unwrap();
    assert_eq!(r.count_reports_against(thread.author_id).await.unwrap(), 2);
}

#[tokio::test]
async fn resolved_reports_are_terminal() {
    let r = InMemRepo::ephemeral();
    let (author, other, thread) = seed_thread(&r).await;
    let report = r.create_report(new_report(&thread, other.id, ReportReason::Spam, Priority::Medium)).await.unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    let reviewed = r.set_report_status(report.id, ReportStatus::Reviewed).await.unwrap();
    assert_eq!(reviewed.status, ReportStatus::Reviewed);
    r.set_report_status(report.id, ReportStatus::Resolved).await.unwrap();
    assert_eq!(r.count_violations(author.id).await.unwrap(), 1);

    let err = r.set_report_status(report.id, ReportStatus::Pending).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
    assert!(matches!(r.set_report_status(9_999, ReportStatus::Reviewed).await.unwrap_err(), RepoError::NotFound));

    let counts = r.count_by_status().await.unwrap();
    assert_eq!(counts, ReportCounts { total: 1, pending: 0, reviewed: 0, resolved: 1 });
}

#[tokio::test]
async fn report_listing_orders_by_priority_then_recency() {
    let r = InMemRepo::ephemeral();
    let (_, _, thread) = seed_thread(&r).await;
    let mut reporters = Vec::new();
    for name in ["a", "b", "c"] {
        reporters.push(r.create_user(NewUser { username: name.into(), role: Role::User }).await.unwrap());
    }
    let low = r.create_report(new_report(&thread, reporters[0].id, ReportReason::Spam, Priority::Low)).await.unwrap();
    let crit = r
        .create_report(new_report(&thread, reporters[1].id, ReportReason::SelfHarm, Priority::Critical))
        .await
        .unwrap();
    let low2 = r.create_report(new_report(&thread, reporters[2].id, ReportReason::Spam, Priority::Low)).await.unwrap();

    let (items, total) = r.list_reports(&ReportFilter::default(), 0, 10).await.unwrap();
    assert_eq!(total, 3);
    let ids: Vec<Id> = items.iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![crit.id, low2.id, low.id]);

    let (items, total) = r.list_reports(&ReportFilter::default(), 1, 1).await.unwrap();
    assert_eq!((items.len(), total), (1, 3));
    assert_eq!(items[0].id, low2.id);

    let filter = ReportFilter { reporter_id: Some(reporters[0].id), ..Default::default() };
    let (items, _) = r.list_reports(&filter, 0, 10).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn counters_increment_atomically() {
    let r = InMemRepo::ephemeral();
    let (author, _, thread) = seed_thread(&r).await;
    r.increment(Counter::ThreadReplies, thread.id, 1).await.unwrap();
    r.increment(Counter::ThreadViews, thread.id, 3).await.unwrap();
    r.increment(Counter::UserThreads, author.id, 1).await.unwrap();

    let t = r.get_thread(thread.id).await.unwrap();
    assert_eq!((t.reply_count, t.view_count), (1, 3));
    assert!(t.last_reply_at.is_some());
    assert_eq!(r.get_user(author.id).await.unwrap().thread_count, 1);
    assert!(matches!(r.increment(Counter::ThreadViews, 9_999, 1).await.unwrap_err(), RepoError::NotFound));
}

#[tokio::test]
async fn snapshot_survives_restart_including_password_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let (thread_id, author_id, category_id) = {
        let r = InMemRepo::new(dir.path());
        let author = r.create_user(NewUser { username: "op".into(), role: Role::User }).await.unwrap();
        let category = r
            .create_category(NewCategory {
                name: "Vault".into(),
                slug: "vault".into(),
                description: String::new(),
                is_private: true,
                password_hash: Some("$2b$04$category".into()),
            })
            .await
            .unwrap();
        let thread = r
            .create_thread(NewThread {
                category_id: category.id,
                author_id: author.id,
                title: "secret".into(),
                content: "body".into(),
                is_private: true,
                password_hash: Some("$2b$04$thread".into()),
                assigned_moderator_id: None,
            })
            .await
            .unwrap();
        r.subscribe(author.id, category.id).await.unwrap();
        (thread.id, author.id, category.id)
    };

    let r = InMemRepo::new(dir.path());
    let thread = r.get_thread(thread_id).await.unwrap();
    assert_eq!(thread.password_hash.as_deref(), Some("$2b$04$thread"));
    let category = r.get_category(category_id).await.unwrap();
    assert_eq!(category.password_hash.as_deref(), Some("$2b$04$category"));
    assert!(r.is_subscribed(author_id, category_id).await.unwrap());

    // ids keep counting from where the previous process stopped
    let fresh = r.create_user(NewUser { username: "late".into(), role: Role::User }).await.unwrap();
    assert!(fresh.id > thread_id);
}
