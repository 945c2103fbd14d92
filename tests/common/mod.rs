#![allow(dead_code)]

use std::sync::Arc;

use veil::auth::{Actor, Role};
use veil::models::*;
use veil::repo::inmem::InMemRepo;
use veil::repo::{CategoryRepo, ReplyRepo, ThreadRepo, UserRepo};

pub fn actor(u: &User) -> Actor {
    Actor { id: u.id, role: u.role }
}

pub async fn user(repo: &InMemRepo, name: &str, role: Role) -> User {
    repo.create_user(NewUser { username: name.into(), role }).await.unwrap()
}

pub async fn category(repo: &InMemRepo, slug: &str, is_private: bool) -> Category {
    repo.create_category(NewCategory {
        name: slug.to_uppercase(),
        slug: slug.into(),
        description: String::new(),
        is_private,
        password_hash: None,
    })
    .await
    .unwrap()
}

pub async fn thread(repo: &InMemRepo, category_id: Id, author_id: Id, content: &str) -> Thread {
    repo.create_thread(NewThread {
        category_id,
        author_id,
        title: "thread".into(),
        content: content.into(),
        is_private: false,
        password_hash: None,
        assigned_moderator_id: None,
    })
    .await
    .unwrap()
}

pub async fn reply(repo: &InMemRepo, thread_id: Id, author_id: Id, parent_reply_id: Option<Id>) -> Reply {
    repo.create_reply(NewReply { thread_id, author_id, parent_reply_id, content: "reply".into() })
        .await
        .unwrap()
}

pub fn report_request(content_type: &str, content_id: Id, reason: &str) -> CreateReportRequest {
    CreateReportRequest {
        content_type: content_type.into(),
        content_id,
        reason: reason.into(),
        description: String::new(),
    }
}

pub fn action_request(action: &str, days: Option<i64>) -> ModerationActionRequest {
    ModerationActionRequest {
        action: action.into(),
        reason: "violates rules".into(),
        ban_duration_days: days,
        internal_notes: None,
    }
}

pub fn content_request(action: &str) -> ContentModerationRequest {
    ContentModerationRequest { action: action.into(), reason: "off-topic".into(), internal_notes: None }
}

/// A populated forum: one public category with a thread by `author` and a reply by `reporter`.
pub struct Fixture {
    pub repo: Arc<InMemRepo>,
    pub author: User,
    pub reporter: User,
    pub bystander: User,
    pub moderator: User,
    pub admin: User,
    pub category: Category,
    pub thread: Thread,
    pub reply: Reply,
}

impl Fixture {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemRepo::ephemeral());
        let author = user(&repo, "author", Role::User).await;
        let reporter = user(&repo, "reporter", Role::User).await;
        let bystander = user(&repo, "bystander", Role::User).await;
        let moderator = user(&repo, "moderator", Role::Moderator).await;
        let admin = user(&repo, "admin", Role::Admin).await;
        let category = category(&repo, "general", false).await;
        let thread = thread(&repo, category.id, author.id, "an opening post").await;
        let reply = reply(&repo, thread.id, reporter.id, None).await;
        Self { repo, author, reporter, bystander, moderator, admin, category, thread, reply }
    }
}
