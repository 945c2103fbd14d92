//! Read-access policy for threads and replies, plus the reply nesting guard.
//!
//! `can_view` is pure: everything it needs (subscription, supplied password) is resolved by
//! the caller beforehand, so the same decision backs single-item reads and list filters.
//! Callers that verify a thread password themselves mark the subject `unlocked` and pass a
//! viewer without one, which keeps list filters free of per-item hashing.

use tracing::warn;

use crate::auth::{is_staff, Actor, Role};
use crate::error::{NotFoundAs, ServiceError, ServiceResult};
use crate::models::{Id, ModerationStatus, Reply, Thread};
use crate::password::PasswordHasher;
use crate::repo::ReplyRepo;

/// Deepest level a reply may sit at (a top-level reply is level 1).
pub const MAX_NESTING_LEVEL: u32 = 3;
// bounds the ancestor walk even if stored data contains a cycle
const NESTING_WALK_CAP: u32 = 10;

/// Who is asking. All fields are optional: anonymous readers have none of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer<'a> {
    pub id: Option<Id>,
    pub role: Option<Role>,
    pub password: Option<&'a str>,
}

impl<'a> Viewer<'a> {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_actor(actor: Option<Actor>) -> Self {
        Self { id: actor.map(|a| a.id), role: actor.map(|a| a.role), password: None }
    }

    pub fn with_password(mut self, password: Option<&'a str>) -> Self {
        self.password = password;
        self
    }

    pub fn without_password(self) -> Viewer<'static> {
        Viewer { id: self.id, role: self.role, password: None }
    }

    fn is(&self, id: Id) -> bool {
        self.id == Some(id)
    }
}

/// The item being read. A reply carries its own author and status but inherits the privacy
/// gates of its thread and category.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub author_id: Id,
    pub moderation_status: ModerationStatus,
    pub thread: &'a Thread,
    pub category_private: bool,
    /// Pre-resolved by the caller; `false` for anonymous viewers.
    pub viewer_subscribed: bool,
    /// The viewer's thread password was already verified, so no hash check runs here.
    pub thread_unlocked: bool,
}

impl<'a> Subject<'a> {
    pub fn thread(thread: &'a Thread, category_private: bool, viewer_subscribed: bool) -> Self {
        Self {
            author_id: thread.author_id,
            moderation_status: thread.moderation_status,
            thread,
            category_private,
            viewer_subscribed,
            thread_unlocked: false,
        }
    }

    pub fn reply(reply: &Reply, thread: &'a Thread, category_private: bool, viewer_subscribed: bool) -> Self {
        Self {
            author_id: reply.author_id,
            moderation_status: reply.moderation_status,
            thread,
            category_private,
            viewer_subscribed,
            thread_unlocked: false,
        }
    }

    pub fn unlocked(mut self, unlocked: bool) -> Self {
        self.thread_unlocked = unlocked;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Suppressed content looks exactly like missing content to unprivileged viewers.
    NotFound,
    CategoryPrivate,
    ThreadPrivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Turns a denial into the service error for this read; `not_found` is the error a
    /// missing item of this type would produce.
    pub fn into_result(self, not_found: ServiceError) -> ServiceResult<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(Denial::NotFound) => Err(not_found),
            Decision::Denied(Denial::CategoryPrivate) => Err(ServiceError::CategoryPrivate),
            Decision::Denied(Denial::ThreadPrivate) => Err(ServiceError::ThreadPrivate),
        }
    }
}

/// First matching rule wins: suppressed status, private category, private thread.
pub fn can_view(subject: &Subject<'_>, viewer: &Viewer<'_>, hasher: &dyn PasswordHasher) -> Decision {
    let staff = is_staff(viewer.role);

    if subject.moderation_status.is_suppressed() && !(staff || viewer.is(subject.author_id)) {
        return Decision::Denied(Denial::NotFound);
    }

    if subject.category_private && !(staff || subject.viewer_subscribed) {
        return Decision::Denied(Denial::CategoryPrivate);
    }

    let thread = subject.thread;
    if thread.is_private {
        let exempt = staff
            || viewer.is(thread.author_id)
            || viewer.is(subject.author_id)
            || thread.assigned_moderator_id.is_some_and(|m| viewer.is(m));
        if !(exempt || subject.thread_unlocked) {
            let unlocked = match (thread.password_hash.as_deref(), viewer.password) {
                (Some(hash), Some(plain)) => hasher.verify(plain, hash),
                _ => false,
            };
            if !unlocked {
                return Decision::Denied(Denial::ThreadPrivate);
            }
        }
    }

    Decision::Allowed
}

/// Validates a reply's parent and returns the parent's nesting level.
///
/// Fails with `ParentReplyNotFound`, `ParentReplyThreadMismatch` when the parent sits in
/// another thread, or `MaxNestingLevelExceeded` when the parent already sits at
/// `MAX_NESTING_LEVEL`.
pub async fn check_reply_parent(replies: &dyn ReplyRepo, thread_id: Id, parent_id: Id) -> ServiceResult<u32> {
    let parent = replies.get_reply(parent_id).await.not_found_as(ServiceError::ParentReplyNotFound)?;
    if parent.thread_id != thread_id {
        return Err(ServiceError::ParentReplyThreadMismatch);
    }

    let mut level = 1;
    let mut next = parent.parent_reply_id;
    while let Some(id) = next {
        if level >= NESTING_WALK_CAP {
            break;
        }
        match replies.get_reply(id).await {
            Ok(ancestor) => {
                level += 1;
                next = ancestor.parent_reply_id;
            }
            Err(e) => {
                warn!(reply_id = id, "broken reply chain: {e}");
                break;
            }
        }
    }

    if level >= MAX_NESTING_LEVEL {
        return Err(ServiceError::MaxNestingLevelExceeded);
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::HashError;
    use chrono::Utc;

    // plain comparison keeps these tests off bcrypt
    struct PlainHasher;
    impl PasswordHasher for PlainHasher {
        fn hash(&self, plain: &str) -> Result<String, HashError> {
            Ok(format!("plain:{plain}"))
        }
        fn verify(&self, plain: &str, hash: &str) -> bool {
            hash == format!("plain:{plain}")
        }
    }

    const AUTHOR: Id = 1;
    const STRANGER: Id = 2;
    const MODERATOR: Id = 3;
    const ASSIGNED: Id = 4;

    fn thread() -> Thread {
        let now = Utc::now();
        Thread {
            id: 10,
            category_id: 20,
            author_id: AUTHOR,
            title: "t".into(),
            content: "c".into(),
            moderation_status: ModerationStatus::Approved,
            is_private: false,
            password_hash: None,
            assigned_moderator_id: None,
            is_locked: false,
            reply_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
            last_reply_at: None,
        }
    }

    fn user(id: Id) -> Viewer<'static> {
        Viewer { id: Some(id), role: Some(Role::User), password: None }
    }

    fn moderator() -> Viewer<'static> {
        Viewer { id: Some(MODERATOR), role: Some(Role::Moderator), password: None }
    }

    fn check(t: &Thread, viewer: Viewer<'_>) -> Decision {
        can_view(&Subject::thread(t, false, false), &viewer, &PlainHasher)
    }

    #[test]
    fn hidden_content_is_author_and_staff_only() {
        for status in [ModerationStatus::Hidden, ModerationStatus::Deleted] {
            let mut t = thread();
            t.moderation_status = status;
            assert_eq!(check(&t, Viewer::anonymous()), Decision::Denied(Denial::NotFound));
            assert_eq!(check(&t, user(STRANGER)), Decision::Denied(Denial::NotFound));
            assert!(check(&t, user(AUTHOR)).is_allowed());
            assert!(check(&t, moderator()).is_allowed());
            let admin = Viewer { id: Some(99), role: Some(Role::Admin), password: None };
            assert!(check(&t, admin).is_allowed());
        }
    }

    #[test]
    fn pending_and_approved_are_public() {
        let mut t = thread();
        assert!(check(&t, Viewer::anonymous()).is_allowed());
        t.moderation_status = ModerationStatus::Pending;
        assert!(check(&t, Viewer::anonymous()).is_allowed());
    }

    #[test]
    fn private_category_needs_subscription_or_staff() {
        let t = thread();
        let denied = can_view(&Subject::thread(&t, true, false), &user(STRANGER), &PlainHasher);
        assert_eq!(denied, Decision::Denied(Denial::CategoryPrivate));
        let subscribed = can_view(&Subject::thread(&t, true, true), &user(STRANGER), &PlainHasher);
        assert!(subscribed.is_allowed());
        let staff = can_view(&Subject::thread(&t, true, false), &moderator(), &PlainHasher);
        assert!(staff.is_allowed());
    }

    #[test]
    fn suppression_takes_precedence_over_privacy() {
        let mut t = thread();
        t.moderation_status = ModerationStatus::Hidden;
        let d = can_view(&Subject::thread(&t, true, false), &user(STRANGER), &PlainHasher);
        assert_eq!(d, Decision::Denied(Denial::NotFound));
    }

    #[test]
    fn private_thread_with_password() {
        let mut t = thread();
        t.is_private = true;
        t.password_hash = Some(PlainHasher.hash("hunter2").unwrap());
        assert_eq!(check(&t, user(STRANGER)), Decision::Denied(Denial::ThreadPrivate));
        assert_eq!(
            check(&t, user(STRANGER).with_password(Some("wrong"))),
            Decision::Denied(Denial::ThreadPrivate)
        );
        assert!(check(&t, user(STRANGER).with_password(Some("hunter2"))).is_allowed());
        assert!(check(&t, user(AUTHOR)).is_allowed());
        assert!(check(&t, moderator()).is_allowed());
    }

    #[test]
    fn unlocked_subject_skips_the_password_check() {
        let mut t = thread();
        t.is_private = true;
        t.password_hash = Some("plain:hunter2".into());
        let subject = Subject::thread(&t, false, false).unlocked(true);
        assert!(can_view(&subject, &user(STRANGER), &PlainHasher).is_allowed());
        // suppression still applies to an unlocked thread
        t.moderation_status = ModerationStatus::Hidden;
        let subject = Subject::thread(&t, false, false).unlocked(true);
        assert_eq!(can_view(&subject, &user(STRANGER), &PlainHasher), Decision::Denied(Denial::NotFound));
    }

    #[test]
    fn private_thread_without_password_admits_only_exempt_viewers() {
        let mut t = thread();
        t.is_private = true;
        t.assigned_moderator_id = Some(ASSIGNED);
        assert_eq!(
            check(&t, user(STRANGER).with_password(Some("anything"))),
            Decision::Denied(Denial::ThreadPrivate)
        );
        assert!(check(&t, user(ASSIGNED)).is_allowed());
        assert!(check(&t, user(AUTHOR)).is_allowed());
    }

    #[test]
    fn reply_uses_own_author_and_status() {
        let t = thread();
        let now = Utc::now();
        let reply = Reply {
            id: 30,
            thread_id: t.id,
            author_id: STRANGER,
            parent_reply_id: None,
            content: "r".into(),
            moderation_status: ModerationStatus::Hidden,
            created_at: now,
            updated_at: now,
        };
        let subject = Subject::reply(&reply, &t, false, false);
        assert!(can_view(&subject, &user(STRANGER), &PlainHasher).is_allowed());
        // the thread author gets no special access to someone else's hidden reply
        assert_eq!(can_view(&subject, &user(AUTHOR), &PlainHasher), Decision::Denied(Denial::NotFound));
    }

    #[test]
    fn denial_maps_to_errors() {
        let nf = Decision::Denied(Denial::NotFound).into_result(ServiceError::ThreadNotFound);
        assert!(matches!(nf, Err(ServiceError::ThreadNotFound)));
        let cp = Decision::Denied(Denial::CategoryPrivate).into_result(ServiceError::ThreadNotFound);
        assert!(matches!(cp, Err(ServiceError::CategoryPrivate)));
        assert!(Decision::Allowed.into_result(ServiceError::ThreadNotFound).is_ok());
    }
}
