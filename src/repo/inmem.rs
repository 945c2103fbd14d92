use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::*;

const SNAPSHOT_FILE: &str = "state.json";

#[derive(Default, Serialize, Deserialize)]
struct State {
    users: HashMap<Id, User>,
    categories: HashMap<Id, Category>,
    subscriptions: HashSet<(Id, Id)>, // (user, category)
    threads: HashMap<Id, Thread>,
    replies: HashMap<Id, Reply>,
    reports: HashMap<Id, Report>,
    actions: HashMap<Id, ModerationAction>,
    notes: HashMap<Id, ModeratorNote>,
    // hashes are skipped by the models' Serialize impls, so the snapshot keeps them here
    category_passwords: HashMap<Id, String>,
    thread_passwords: HashMap<Id, String>,
    next_id: Id,
}

impl State {
    fn rehydrate(&mut self) {
        for (id, c) in self.categories.iter_mut() {
            c.password_hash = self.category_passwords.get(id).cloned();
        }
        for (id, t) in self.threads.iter_mut() {
            t.password_hash = self.thread_passwords.get(id).cloned();
        }
    }
}

/// Process-local repository. With a snapshot path, the whole state is rewritten as JSON
/// after every successful write.
#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemRepo {
    /// Loads `<data_dir>/state.json` if present and persists back to it.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(SNAPSHOT_FILE);
        let state = Self::load_state_from(&path);
        Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Some(Arc::new(path)),
        }
    }

    /// No snapshot; state lives and dies with the value.
    pub fn ephemeral() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(mut s) => {
                    s.rehydrate();
                    info!("loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    warn!("failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            },
            Err(e) => {
                info!("no snapshot at '{}' ({e}), starting empty", path.display());
                State::default()
            }
        }
    }

    fn persist(&self) {
        let Some(path) = self.snapshot_path.as_ref() else { return };
        let bytes = match self.state.read() {
            Ok(s) => serde_json::to_vec_pretty(&*s),
            Err(_) => return,
        };
        match bytes {
            Ok(bytes) => {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(path.as_path(), bytes) {
                    warn!("failed to write snapshot '{}': {e}", path.display());
                }
            }
            Err(e) => warn!("failed to serialize snapshot: {e}"),
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    fn next_id(state: &mut State) -> Id {
        state.next_id += 1;
        state.next_id
    }
}

impl Default for InMemRepo {
    fn default() -> Self {
        Self::ephemeral()
    }
}

fn paginate<T>(items: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (page, total)
}

#[async_trait]
impl UserRepo for InMemRepo {
    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let mut s = self.write()?;
        if s.users.values().any(|u| u.username == new.username) {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let user = User {
            id,
            username: new.username,
            role: new.role,
            status: UserStatus::Active,
            ban_expires_at: None,
            thread_count: 0,
            reply_count: 0,
            created_at: Utc::now(),
        };
        s.users.insert(id, user.clone());
        drop(s); // release lock before persisting
        self.persist();
        Ok(user)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        self.read()?.users.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn update_user_status(
        &self,
        id: Id,
        status: UserStatus,
        ban_expires_at: Option<DateTime<Utc>>,
    ) -> RepoResult<User> {
        let mut s = self.write()?;
        let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.status = status;
        user.ban_expires_at = ban_expires_at;
        let updated = user.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }
}

#[async_trait]
impl CategoryRepo for InMemRepo {
    async fn create_category(&self, new: NewCategory) -> RepoResult<Category> {
        let mut s = self.write()?;
        if s.categories.values().any(|c| c.slug == new.slug) {
            return Err(RepoError::Conflict);
        }
        let id = Self::next_id(&mut s);
        let category = Category {
            id,
            name: new.name,
            slug: new.slug,
            description: new.description,
            is_private: new.is_private,
            password_hash: new.password_hash,
            is_locked: false,
            thread_count: 0,
            created_at: Utc::now(),
        };
        if let Some(h) = &category.password_hash {
            s.category_passwords.insert(id, h.clone());
        }
        s.categories.insert(id, category.clone());
        drop(s);
        self.persist();
        Ok(category)
    }

    async fn get_category(&self, id: Id) -> RepoResult<Category> {
        self.read()?.categories.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn set_category_locked(&self, id: Id, locked: bool) -> RepoResult<Category> {
        let mut s = self.write()?;
        let category = s.categories.get_mut(&id).ok_or(RepoError::NotFound)?;
        category.is_locked = locked;
        let out = category.clone();
        drop(s);
        self.persist();
        Ok(out)
    }
}

#[async_trait]
impl SubscriptionRepo for InMemRepo {
    async fn subscribe(&self, user_id: Id, category_id: Id) -> RepoResult<()> {
        let mut s = self.write()?;
        if !s.categories.contains_key(&category_id) {
            return Err(RepoError::NotFound);
        }
        let inserted = s.subscriptions.insert((user_id, category_id));
        drop(s);
        if inserted {
            self.persist();
        }
        Ok(())
    }

    async fn unsubscribe(&self, user_id: Id, category_id: Id) -> RepoResult<()> {
        let removed = self.write()?.subscriptions.remove(&(user_id, category_id));
        if removed {
            self.persist();
        }
        Ok(())
    }

    async fn is_subscribed(&self, user_id: Id, category_id: Id) -> RepoResult<bool> {
        Ok(self.read()?.subscriptions.contains(&(user_id, category_id)))
    }
}

#[async_trait]
impl ThreadRepo for InMemRepo {
    async fn create_thread(&self, new: NewThread) -> RepoResult<Thread> {
        let mut s = self.write()?;
        if !s.categories.contains_key(&new.category_id) {
            return Err(RepoError::NotFound);
        }
        let now = Utc::now();
        let id = Self::next_id(&mut s);
        let thread = Thread {
            id,
            category_id: new.category_id,
            author_id: new.author_id,
            title: new.title,
            content: new.content,
            moderation_status: ModerationStatus::Approved,
            is_private: new.is_private,
            password_hash: new.password_hash,
            assigned_moderator_id: new.assigned_moderator_id,
            is_locked: false,
            reply_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
            last_reply_at: None,
        };
        if let Some(h) = &thread.password_hash {
            s.thread_passwords.insert(id, h.clone());
        }
        s.threads.insert(id, thread.clone());
        drop(s);
        self.persist();
        Ok(thread)
    }

    async fn get_thread(&self, id: Id) -> RepoResult<Thread> {
        self.read()?.threads.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_threads(&self, category_id: Id) -> RepoResult<Vec<Thread>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.threads.values()
            .filter(|t| t.category_id == category_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| {
            let ka = a.last_reply_at.unwrap_or(a.created_at);
            let kb = b.last_reply_at.unwrap_or(b.created_at);
            kb.cmp(&ka).then(b.id.cmp(&a.id))
        });
        Ok(v)
    }

    async fn set_thread_status(&self, id: Id, status: ModerationStatus) -> RepoResult<()> {
        let mut s = self.write()?;
        let thread = s.threads.get_mut(&id).ok_or(RepoError::NotFound)?;
        thread.moderation_status = status;
        thread.updated_at = Utc::now();
        drop(s);
        self.persist();
        Ok(())
    }

    async fn set_thread_locked(&self, id: Id, locked: bool) -> RepoResult<Thread> {
        let mut s = self.write()?;
        let thread = s.threads.get_mut(&id).ok_or(RepoError::NotFound)?;
        thread.is_locked = locked;
        thread.updated_at = Utc::now();
        let out = thread.clone();
        drop(s);
        self.persist();
        Ok(out)
    }
}

#[async_trait]
impl ReplyRepo for InMemRepo {
    async fn create_reply(&self, new: NewReply) -> RepoResult<Reply> {
        let mut s = self.write()?;
        if !s.threads.contains_key(&new.thread_id) {
            return Err(RepoError::NotFound);
        }
        let now = Utc::now();
        let id = Self::next_id(&mut s);
        let reply = Reply {
            id,
            thread_id: new.thread_id,
            author_id: new.author_id,
            parent_reply_id: new.parent_reply_id,
            content: new.content,
            moderation_status: ModerationStatus::Approved,
            created_at: now,
            updated_at: now,
        };
        s.replies.insert(id, reply.clone());
        drop(s);
        self.persist();
        Ok(reply)
    }

    async fn get_reply(&self, id: Id) -> RepoResult<Reply> {
        self.read()?.replies.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_replies(&self, thread_id: Id) -> RepoResult<Vec<Reply>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.replies
            .values()
            .filter(|r| r.thread_id == thread_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(v)
    }

    async fn set_reply_status(&self, id: Id, status: ModerationStatus) -> RepoResult<()> {
        let mut s = self.write()?;
        let reply = s.replies.get_mut(&id).ok_or(RepoError::NotFound)?;
        reply.moderation_status = status;
        reply.updated_at = Utc::now();
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl CounterRepo for InMemRepo {
    async fn increment(&self, counter: Counter, id: Id, delta: i32) -> RepoResult<()> {
        let mut s = self.write()?;
        match counter {
            Counter::CategoryThreads => {
                s.categories.get_mut(&id).ok_or(RepoError::NotFound)?.thread_count += delta;
            }
            Counter::ThreadReplies => {
                let t = s.threads.get_mut(&id).ok_or(RepoError::NotFound)?;
                t.reply_count += delta;
                if delta > 0 {
                    t.last_reply_at = Some(Utc::now());
                }
            }
            Counter::ThreadViews => {
                s.threads.get_mut(&id).ok_or(RepoError::NotFound)?.view_count += delta;
            }
            Counter::UserThreads => {
                s.users.get_mut(&id).ok_or(RepoError::NotFound)?.thread_count += delta;
            }
            Counter::UserReplies => {
                s.users.get_mut(&id).ok_or(RepoError::NotFound)?.reply_count += delta;
            }
        }
        drop(s);
        self.persist();
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for InMemRepo {
    async fn create_report(&self, new: NewReport) -> RepoResult<Report> {
        let mut s = self.write()?;
        // uniqueness is checked under the same write lock as the insert
        if s.reports.values().any(|r| {
            r.reporter_id == new.reporter_id
                && r.content_type == new.content_type
                && r.content_id == new.content_id
        }) {
            return Err(RepoError::Conflict);
        }
        let now = Utc::now();
        let id = Self::next_id(&mut s);
        let report = Report {
            id,
            content_type: new.content_type,
            content_id: new.content_id,
            reporter_id: new.reporter_id,
            reported_user_id: new.reported_user_id,
            reason: new.reason,
            description: new.description,
            status: ReportStatus::Pending,
            priority: new.priority,
            created_at: now,
            updated_at: now,
        };
        s.reports.insert(id, report.clone());
        drop(s);
        self.persist();
        Ok(report)
    }

    async fn get_report(&self, id: Id) -> RepoResult<Report> {
        self.read()?.reports.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn has_reported(&self, reporter_id: Id, content_type: ContentType, content_id: Id) -> RepoResult<bool> {
        Ok(self.read()?.reports.values().any(|r| {
            r.reporter_id == reporter_id && r.content_type == content_type && r.content_id == content_id
        }))
    }

    async fn list_reports(&self, filter: &ReportFilter, offset: i64, limit: i64) -> RepoResult<(Vec<Report>, i64)> {
        let s = self.read()?;
        let mut v: Vec<_> = s.reports.values()
            .filter(|r| filter.status.map_or(true, |st| r.status == st))
            .filter(|r| filter.priority.map_or(true, |p| r.priority == p))
            .filter(|r| filter.reporter_id.map_or(true, |id| r.reporter_id == id))
            .filter(|r| filter.reported_user_id.map_or(true, |id| r.reported_user_id == id))
            .cloned()
            .collect();
        v.sort_by(|a, b| {
            b.priority.cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(paginate(v, offset, limit))
    }

    async fn count_reports_against(&self, user_id: Id) -> RepoResult<i64> {
        Ok(self.read()?.reports.values().filter(|r| r.reported_user_id == user_id).count() as i64)
    }

    async fn count_violations(&self, user_id: Id) -> RepoResult<i64> {
        Ok(self.read()?.reports.values()
            .filter(|r| r.reported_user_id == user_id && r.status == ReportStatus::Resolved)
            .count() as i64)
    }

    async fn set_report_status(&self, id: Id, status: ReportStatus) -> RepoResult<Report> {
        let mut s = self.write()?;
        let report = s.reports.get_mut(&id).ok_or(RepoError::NotFound)?;
        if report.status == ReportStatus::Resolved {
            return Err(RepoError::Conflict);
        }
        report.status = status;
        report.updated_at = Utc::now();
        let updated = report.clone();
        drop(s);
        self.persist();
        Ok(updated)
    }

    async fn count_by_status(&self) -> RepoResult<ReportCounts> {
        let s = self.read()?;
        let mut counts = ReportCounts::default();
        for r in s.reports.values() {
            counts.total += 1;
            match r.status {
                ReportStatus::Pending => counts.pending += 1,
                ReportStatus::Reviewed => counts.reviewed += 1,
                ReportStatus::Resolved => counts.resolved += 1,
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ModerationActionRepo for InMemRepo {
    async fn record_action(&self, new: NewModerationAction) -> RepoResult<ModerationAction> {
        let mut s = self.write()?;
        let id = Self::next_id(&mut s);
        let action = ModerationAction {
            id,
            report_id: new.report_id,
            content_type: new.content_type,
            content_id: new.content_id,
            reported_user_id: new.reported_user_id,
            moderator_id: new.moderator_id,
            action: new.action,
            reason: new.reason,
            internal_notes: new.internal_notes,
            ban_expires_at: new.ban_expires_at,
            created_at: Utc::now(),
        };
        s.actions.insert(id, action.clone());
        drop(s);
        self.persist();
        Ok(action)
    }

    async fn list_actions(&self, filter: &ActionFilter, offset: i64, limit: i64) -> RepoResult<(Vec<ModerationAction>, i64)> {
        let s = self.read()?;
        let mut v: Vec<_> = s.actions.values()
            .filter(|a| filter.moderator_id.map_or(true, |m| a.moderator_id == m))
            .filter(|a| filter.action.map_or(true, |k| a.action == k))
            .filter(|a| filter.from.map_or(true, |from| a.created_at >= from))
            .filter(|a| filter.to.map_or(true, |to| a.created_at <= to))
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(v, offset, limit))
    }

    async fn action_counts(&self, moderator_id: Option<Id>) -> RepoResult<Vec<(ActionKind, i64)>> {
        let s = self.read()?;
        let mut counts: HashMap<ActionKind, i64> = HashMap::new();
        for a in s.actions.values().filter(|a| moderator_id.map_or(true, |m| a.moderator_id == m)) {
            *counts.entry(a.action).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_actions_since(&self, moderator_id: Option<Id>, since: DateTime<Utc>) -> RepoResult<i64> {
        Ok(self.read()?.actions.values()
            .filter(|a| moderator_id.map_or(true, |m| a.moderator_id == m))
            .filter(|a| a.created_at >= since)
            .count() as i64)
    }

    async fn resolution_samples(&self, moderator_id: Option<Id>, since: DateTime<Utc>) -> RepoResult<Vec<ResolutionSample>> {
        let s = self.read()?;
        Ok(s.actions.values()
            .filter(|a| moderator_id.map_or(true, |m| a.moderator_id == m))
            .filter(|a| a.action != ActionKind::Dismiss && a.created_at >= since)
            .filter_map(|a| {
                let report = s.reports.get(&a.report_id?)?;
                Some(ResolutionSample { reported_at: report.created_at, resolved_at: a.created_at })
            })
            .collect())
    }
}

#[async_trait]
impl NoteRepo for InMemRepo {
    async fn create_note(&self, new: NewNote) -> RepoResult<ModeratorNote> {
        let mut s = self.write()?;
        let id = Self::next_id(&mut s);
        let note = ModeratorNote {
            id,
            user_id: new.user_id,
            moderator_id: new.moderator_id,
            note: new.note,
            created_at: Utc::now(),
        };
        s.notes.insert(id, note.clone());
        drop(s);
        self.persist();
        Ok(note)
    }

    async fn list_notes(&self, user_id: Id, offset: i64, limit: i64) -> RepoResult<(Vec<ModeratorNote>, i64)> {
        let s = self.read()?;
        let mut v: Vec<_> = s.notes.values().filter(|n| n.user_id == user_id).cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(v, offset, limit))
    }

    async fn delete_note(&self, id: Id) -> RepoResult<()> {
        let removed = self.write()?.notes.remove(&id);
        match removed {
            Some(_) => {
                self.persist();
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }
}
