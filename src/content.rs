//! Categories, threads and replies. Every read here goes through `can_view`.

use std::sync::Arc;

use tracing::info;

use crate::auth::{is_staff, Actor};
use crate::counters::CounterDispatcher;
use crate::error::{check_text, NotFoundAs, ServiceError, ServiceResult};
use crate::models::*;
use crate::password::{hash_blocking, verify_blocking, PasswordHasher};
use crate::repo::{CategoryRepo, Counter, Repo, RepoError, ReplyRepo, SubscriptionRepo, ThreadRepo, UserRepo};
use crate::visibility::{can_view, check_reply_parent, Decision, Subject, Viewer};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 10_000;

#[derive(Clone)]
pub struct ContentService {
    users: Arc<dyn UserRepo>,
    categories: Arc<dyn CategoryRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    threads: Arc<dyn ThreadRepo>,
    replies: Arc<dyn ReplyRepo>,
    counters: CounterDispatcher,
    hasher: Arc<dyn PasswordHasher>,
}

/// Privacy gates of a category as seen by one viewer.
#[derive(Debug, Clone, Copy)]
struct Gate {
    private: bool,
    subscribed: bool,
}

impl ContentService {
    pub fn new<R: Repo + 'static>(repo: Arc<R>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users: repo.clone(),
            categories: repo.clone(),
            subscriptions: repo.clone(),
            threads: repo.clone(),
            replies: repo.clone(),
            counters: CounterDispatcher::new(repo),
            hasher,
        }
    }

    // ---------------- users ----------------------------------------------

    pub async fn create_user(&self, actor: Actor, new: NewUser) -> ServiceResult<User> {
        actor.require_admin()?;
        check_text("username", &new.username, MAX_USERNAME_LEN, true)?;
        let user = self.users.create_user(new).await.map_err(|e| match e {
            RepoError::Conflict => ServiceError::invalid("username", "already taken"),
            other => other.into(),
        })?;
        info!(user_id = user.id, role = user.role.as_str(), "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: Id) -> ServiceResult<User> {
        self.users.get_user(id).await.not_found_as(ServiceError::UserNotFound)
    }

    // ---------------- categories -----------------------------------------

    pub async fn create_category(&self, actor: Actor, req: CreateCategoryRequest) -> ServiceResult<Category> {
        actor.require_admin()?;
        check_text("name", &req.name, MAX_NAME_LEN, true)?;
        check_text("slug", &req.slug, MAX_NAME_LEN, true)?;
        check_text("description", &req.description, crate::reports::MAX_DESCRIPTION_LEN, false)?;
        let password_hash = self.hash_password(req.password.as_deref()).await?;
        let category = self
            .categories
            .create_category(NewCategory {
                name: req.name,
                slug: req.slug,
                description: req.description,
                is_private: req.is_private,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict => ServiceError::CategoryExists,
                other => other.into(),
            })?;
        info!(category_id = category.id, slug = %category.slug, private = category.is_private, "category created");
        Ok(category)
    }

    /// Joins a category. A category password, when set, must be supplied by non-staff.
    pub async fn subscribe(&self, actor: Actor, category_id: Id, password: Option<&str>) -> ServiceResult<()> {
        let category = self.categories.get_category(category_id).await.not_found_as(ServiceError::CategoryNotFound)?;
        if let Some(hash) = category.password_hash.as_deref() {
            let ok = if actor.role.is_staff() {
                true
            } else if let Some(p) = password {
                verify_blocking(self.hasher.clone(), p, hash).await
            } else {
                false
            };
            if !ok {
                return Err(ServiceError::InvalidPassword);
            }
        }
        self.subscriptions
            .subscribe(actor.id, category_id)
            .await
            .not_found_as(ServiceError::CategoryNotFound)
    }

    pub async fn unsubscribe(&self, actor: Actor, category_id: Id) -> ServiceResult<()> {
        self.categories.get_category(category_id).await.not_found_as(ServiceError::CategoryNotFound)?;
        self.subscriptions.unsubscribe(actor.id, category_id).await?;
        Ok(())
    }

    /// Admin-only. A locked category accepts no new threads.
    pub async fn lock_category(&self, actor: Actor, category_id: Id, locked: bool) -> ServiceResult<Category> {
        actor.require_admin()?;
        let category = self
            .categories
            .set_category_locked(category_id, locked)
            .await
            .not_found_as(ServiceError::CategoryNotFound)?;
        info!(category_id, locked, admin_id = actor.id, "category lock changed");
        Ok(category)
    }

    // ---------------- threads --------------------------------------------

    pub async fn create_thread(&self, actor: Actor, req: CreateThreadRequest) -> ServiceResult<Thread> {
        check_text("title", &req.title, MAX_TITLE_LEN, true)?;
        check_text("content", &req.content, MAX_CONTENT_LEN, true)?;
        let category = self
            .categories
            .get_category(req.category_id)
            .await
            .not_found_as(ServiceError::CategoryNotFound)?;
        if category.is_locked {
            return Err(ServiceError::CategoryLocked);
        }
        if category.is_private
            && !actor.role.is_staff()
            && !self.subscriptions.is_subscribed(actor.id, category.id).await?
        {
            return Err(ServiceError::CategoryPrivate);
        }

        let password_hash = if req.is_private { self.hash_password(req.password.as_deref()).await? } else { None };
        // only staff may route a thread to a specific moderator
        let assigned_moderator_id = match req.assigned_moderator_id {
            Some(id) if actor.role.is_staff() => {
                let m = self.users.get_user(id).await.not_found_as(ServiceError::UserNotFound)?;
                if !m.role.is_staff() {
                    return Err(ServiceError::invalid("assigned_moderator_id", "not a moderator"));
                }
                Some(id)
            }
            _ => None,
        };

        let thread = self
            .threads
            .create_thread(NewThread {
                category_id: category.id,
                author_id: actor.id,
                title: req.title,
                content: req.content,
                is_private: req.is_private,
                password_hash,
                assigned_moderator_id,
            })
            .await
            .not_found_as(ServiceError::CategoryNotFound)?;
        self.counters.bump(Counter::CategoryThreads, category.id);
        self.counters.bump(Counter::UserThreads, actor.id);
        info!(thread_id = thread.id, category_id = category.id, author_id = actor.id, "thread created");
        Ok(thread)
    }

    pub async fn get_thread(&self, viewer: Option<Actor>, id: Id, password: Option<&str>) -> ServiceResult<Thread> {
        let viewer = Viewer::from_actor(viewer).with_password(password);
        let thread = self.threads.get_thread(id).await.not_found_as(ServiceError::ThreadNotFound)?;
        let gate = self.gate(&viewer, thread.category_id).await?;
        let unlocked = self.unlock(&viewer, &thread).await;
        self.decide(&Subject::thread(&thread, gate.private, gate.subscribed).unlocked(unlocked), &viewer)
            .into_result(ServiceError::ThreadNotFound)?;
        self.counters.bump(Counter::ThreadViews, thread.id);
        Ok(thread)
    }

    /// Threads of a category the viewer may see, most recently active first.
    pub async fn list_threads(&self, viewer: Option<Actor>, category_id: Id) -> ServiceResult<Vec<Thread>> {
        let viewer = Viewer::from_actor(viewer);
        let gate = self.gate(&viewer, category_id).await?;
        if gate.private && !(is_staff(viewer.role) || gate.subscribed) {
            return Err(ServiceError::CategoryPrivate);
        }
        let threads = self.threads.list_threads(category_id).await?;
        Ok(threads
            .into_iter()
            .filter(|t| self.decide(&Subject::thread(t, gate.private, gate.subscribed), &viewer).is_allowed())
            .collect())
    }

    /// Staff-only. A locked thread stays readable but accepts no replies.
    pub async fn lock_thread(&self, actor: Actor, thread_id: Id, locked: bool) -> ServiceResult<Thread> {
        actor.require_staff()?;
        let thread = self
            .threads
            .set_thread_locked(thread_id, locked)
            .await
            .not_found_as(ServiceError::ThreadNotFound)?;
        info!(thread_id, locked, moderator_id = actor.id, "thread lock changed");
        Ok(thread)
    }

    // ---------------- replies --------------------------------------------

    pub async fn create_reply(
        &self,
        actor: Actor,
        thread_id: Id,
        req: CreateReplyRequest,
        password: Option<&str>,
    ) -> ServiceResult<Reply> {
        check_text("content", &req.content, MAX_CONTENT_LEN, true)?;
        let viewer = Viewer::from_actor(Some(actor)).with_password(password);
        let thread = self.threads.get_thread(thread_id).await.not_found_as(ServiceError::ThreadNotFound)?;
        let gate = self.gate(&viewer, thread.category_id).await?;
        let unlocked = self.unlock(&viewer, &thread).await;
        self.decide(&Subject::thread(&thread, gate.private, gate.subscribed).unlocked(unlocked), &viewer)
            .into_result(ServiceError::ThreadNotFound)?;
        if thread.is_locked {
            return Err(ServiceError::ThreadLocked);
        }
        if let Some(parent_id) = req.parent_reply_id {
            check_reply_parent(self.replies.as_ref(), thread.id, parent_id).await?;
        }

        let reply = self
            .replies
            .create_reply(NewReply {
                thread_id: thread.id,
                author_id: actor.id,
                parent_reply_id: req.parent_reply_id,
                content: req.content,
            })
            .await
            .not_found_as(ServiceError::ThreadNotFound)?;
        self.counters.bump(Counter::ThreadReplies, thread.id);
        self.counters.bump(Counter::UserReplies, actor.id);
        info!(reply_id = reply.id, thread_id = thread.id, author_id = actor.id, "reply created");
        Ok(reply)
    }

    pub async fn get_reply(&self, viewer: Option<Actor>, id: Id, password: Option<&str>) -> ServiceResult<Reply> {
        let viewer = Viewer::from_actor(viewer).with_password(password);
        let reply = self.replies.get_reply(id).await.not_found_as(ServiceError::ReplyNotFound)?;
        let thread = self.threads.get_thread(reply.thread_id).await.not_found_as(ServiceError::ReplyNotFound)?;
        let gate = self.gate(&viewer, thread.category_id).await?;
        let unlocked = self.unlock(&viewer, &thread).await;
        self.decide(&Subject::reply(&reply, &thread, gate.private, gate.subscribed).unlocked(unlocked), &viewer)
            .into_result(ServiceError::ReplyNotFound)?;
        Ok(reply)
    }

    /// Replies of a visible thread, oldest first, with replies the viewer may not see removed.
    pub async fn list_replies(&self, viewer: Option<Actor>, thread_id: Id, password: Option<&str>) -> ServiceResult<Vec<Reply>> {
        let viewer = Viewer::from_actor(viewer).with_password(password);
        let thread = self.threads.get_thread(thread_id).await.not_found_as(ServiceError::ThreadNotFound)?;
        let gate = self.gate(&viewer, thread.category_id).await?;
        // one password check covers the thread and every reply in it
        let unlocked = self.unlock(&viewer, &thread).await;
        self.decide(&Subject::thread(&thread, gate.private, gate.subscribed).unlocked(unlocked), &viewer)
            .into_result(ServiceError::ThreadNotFound)?;
        let replies = self.replies.list_replies(thread.id).await?;
        Ok(replies
            .into_iter()
            .filter(|r| {
                let subject = Subject::reply(r, &thread, gate.private, gate.subscribed).unlocked(unlocked);
                self.decide(&subject, &viewer).is_allowed()
            })
            .collect())
    }

    // ---------------- helpers --------------------------------------------

    /// Passwords are settled by `unlock` beforehand, so the policy never hashes here.
    fn decide(&self, subject: &Subject<'_>, viewer: &Viewer<'_>) -> Decision {
        can_view(subject, &viewer.without_password(), self.hasher.as_ref())
    }

    /// Whether a non-exempt viewer supplied the right password for a private thread.
    async fn unlock(&self, viewer: &Viewer<'_>, thread: &Thread) -> bool {
        let (Some(plain), Some(hash)) = (viewer.password, thread.password_hash.as_deref()) else {
            return false;
        };
        let exempt = is_staff(viewer.role)
            || viewer.id == Some(thread.author_id)
            || thread.assigned_moderator_id.is_some_and(|m| viewer.id == Some(m));
        if !thread.is_private || exempt {
            return false;
        }
        verify_blocking(self.hasher.clone(), plain, hash).await
    }

    async fn gate(&self, viewer: &Viewer<'_>, category_id: Id) -> ServiceResult<Gate> {
        let category = self
            .categories
            .get_category(category_id)
            .await
            .not_found_as(ServiceError::CategoryNotFound)?;
        // subscription only matters for private categories and non-staff viewers
        let subscribed = match viewer.id {
            Some(uid) if category.is_private && !is_staff(viewer.role) => {
                self.subscriptions.is_subscribed(uid, category_id).await?
            }
            _ => false,
        };
        Ok(Gate { private: category.is_private, subscribed })
    }

    async fn hash_password(&self, plain: Option<&str>) -> ServiceResult<Option<String>> {
        match plain.filter(|p| !p.is_empty()) {
            Some(p) => hash_blocking(self.hasher.clone(), p)
                .await
                .map(Some)
                .map_err(|e| ServiceError::Storage(e.to_string())),
            None => Ok(None),
        }
    }
}
