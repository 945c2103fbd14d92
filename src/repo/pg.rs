use sqlx::{Pool, Postgres};
use tracing::warn;

use super::*;

#[derive(Clone)]
pub struct PgRepo { pool: Pool<Postgres> }

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

    pub fn pool(&self) -> &Pool<Postgres> { &self.pool }
}

const UNIQUE_VIOLATION: &str = "23505";

fn map_err(e: sqlx::Error) -> RepoError {
    match e {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => RepoError::Conflict,
        other => {
            warn!("postgres: {other}");
            RepoError::Internal(other.to_string())
        }
    }
}

const USER_COLS: &str = "id, username, role, status, ban_expires_at, thread_count, reply_count, created_at";
const CATEGORY_COLS: &str =
    "id, name, slug, description, is_private, password_hash, is_locked, thread_count, created_at";
const THREAD_COLS: &str = "id, category_id, author_id, title, content, moderation_status, is_private, \
     password_hash, assigned_moderator_id, is_locked, reply_count, view_count, created_at, updated_at, last_reply_at";
const REPLY_COLS: &str =
    "id, thread_id, author_id, parent_reply_id, content, moderation_status, created_at, updated_at";
const REPORT_COLS: &str = "id, content_type, content_id, reporter_id, reported_user_id, reason, description, \
     status, priority, created_at, updated_at";
const ACTION_COLS: &str = "id, report_id, content_type, content_id, reported_user_id, moderator_id, action, \
     reason, internal_notes, ban_expires_at, created_at";

#[async_trait]
impl UserRepo for PgRepo {
    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, role) VALUES ($1, $2) RETURNING {USER_COLS}"
        ))
        .bind(&new.username)
        .bind(new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn update_user_status(
        &self,
        id: Id,
        status: UserStatus,
        ban_expires_at: Option<DateTime<Utc>>,
    ) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $2, ban_expires_at = $3 WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(status)
        .bind(ban_expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

#[async_trait]
impl CategoryRepo for PgRepo {
    async fn create_category(&self, new: NewCategory) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, slug, description, is_private, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CATEGORY_COLS}"
        ))
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.is_private)
        .bind(new.password_hash.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_category(&self, id: Id) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLS} FROM categories WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn set_category_locked(&self, id: Id, locked: bool) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET is_locked = $2 WHERE id = $1 RETURNING {CATEGORY_COLS}"
        ))
        .bind(id)
        .bind(locked)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

#[async_trait]
impl SubscriptionRepo for PgRepo {
    async fn subscribe(&self, user_id: Id, category_id: Id) -> RepoResult<()> {
        // FK violation on an unknown category surfaces as Internal; callers load the category first
        sqlx::query(
            "INSERT INTO category_subscriptions (user_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(category_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn unsubscribe(&self, user_id: Id, category_id: Id) -> RepoResult<()> {
        sqlx::query("DELETE FROM category_subscriptions WHERE user_id = $1 AND category_id = $2")
            .bind(user_id)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn is_subscribed(&self, user_id: Id, category_id: Id) -> RepoResult<bool> {
        let (found,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM category_subscriptions WHERE user_id = $1 AND category_id = $2)",
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(found)
    }
}

#[async_trait]
impl ThreadRepo for PgRepo {
    async fn create_thread(&self, new: NewThread) -> RepoResult<Thread> {
        sqlx::query_as::<_, Thread>(&format!(
            "INSERT INTO threads (category_id, author_id, title, content, is_private, password_hash, assigned_moderator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {THREAD_COLS}"
        ))
        .bind(new.category_id)
        .bind(new.author_id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.is_private)
        .bind(new.password_hash.as_ref())
        .bind(new.assigned_moderator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_thread(&self, id: Id) -> RepoResult<Thread> {
        sqlx::query_as::<_, Thread>(&format!("SELECT {THREAD_COLS} FROM threads WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn list_threads(&self, category_id: Id) -> RepoResult<Vec<Thread>> {
        sqlx::query_as::<_, Thread>(&format!(
            "SELECT {THREAD_COLS} FROM threads WHERE category_id = $1 \
             ORDER BY COALESCE(last_reply_at, created_at) DESC, id DESC"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn set_thread_status(&self, id: Id, status: ModerationStatus) -> RepoResult<()> {
        let res = sqlx::query("UPDATE threads SET moderation_status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }

    async fn set_thread_locked(&self, id: Id, locked: bool) -> RepoResult<Thread> {
        sqlx::query_as::<_, Thread>(&format!(
            "UPDATE threads SET is_locked = $2, updated_at = now() WHERE id = $1 RETURNING {THREAD_COLS}"
        ))
        .bind(id)
        .bind(locked)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }
}

#[async_trait]
impl ReplyRepo for PgRepo {
    async fn create_reply(&self, new: NewReply) -> RepoResult<Reply> {
        sqlx::query_as::<_, Reply>(&format!(
            "INSERT INTO replies (thread_id, author_id, parent_reply_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING {REPLY_COLS}"
        ))
        .bind(new.thread_id)
        .bind(new.author_id)
        .bind(new.parent_reply_id)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_reply(&self, id: Id) -> RepoResult<Reply> {
        sqlx::query_as::<_, Reply>(&format!("SELECT {REPLY_COLS} FROM replies WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn list_replies(&self, thread_id: Id) -> RepoResult<Vec<Reply>> {
        sqlx::query_as::<_, Reply>(&format!(
            "SELECT {REPLY_COLS} FROM replies WHERE thread_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn set_reply_status(&self, id: Id, status: ModerationStatus) -> RepoResult<()> {
        let res = sqlx::query("UPDATE replies SET moderation_status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }
}

#[async_trait]
impl CounterRepo for PgRepo {
    async fn increment(&self, counter: Counter, id: Id, delta: i32) -> RepoResult<()> {
        // single-statement updates; no read-modify-write
        let sql = match counter {
            Counter::CategoryThreads => "UPDATE categories SET thread_count = thread_count + $2 WHERE id = $1",
            Counter::ThreadReplies => {
                "UPDATE threads SET reply_count = reply_count + $2, \
                 last_reply_at = CASE WHEN $2 > 0 THEN now() ELSE last_reply_at END WHERE id = $1"
            }
            Counter::ThreadViews => "UPDATE threads SET view_count = view_count + $2 WHERE id = $1",
            Counter::UserThreads => "UPDATE users SET thread_count = thread_count + $2 WHERE id = $1",
            Counter::UserReplies => "UPDATE users SET reply_count = reply_count + $2 WHERE id = $1",
        };
        let res = sqlx::query(sql)
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for PgRepo {
    async fn create_report(&self, new: NewReport) -> RepoResult<Report> {
        // reports_reporter_content_key turns a duplicate into a unique violation -> Conflict
        sqlx::query_as::<_, Report>(&format!(
            "INSERT INTO reports (content_type, content_id, reporter_id, reported_user_id, reason, description, priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {REPORT_COLS}"
        ))
        .bind(new.content_type)
        .bind(new.content_id)
        .bind(new.reporter_id)
        .bind(new.reported_user_id)
        .bind(new.reason)
        .bind(&new.description)
        .bind(new.priority)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn get_report(&self, id: Id) -> RepoResult<Report> {
        sqlx::query_as::<_, Report>(&format!("SELECT {REPORT_COLS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn has_reported(&self, reporter_id: Id, content_type: ContentType, content_id: Id) -> RepoResult<bool> {
        let (found,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM reports WHERE reporter_id = $1 AND content_type = $2 AND content_id = $3)",
        )
        .bind(reporter_id)
        .bind(content_type)
        .bind(content_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(found)
    }

    async fn list_reports(&self, filter: &ReportFilter, offset: i64, limit: i64) -> RepoResult<(Vec<Report>, i64)> {
        const WHERE: &str = "WHERE ($1::report_status IS NULL OR status = $1) \
             AND ($2::report_priority IS NULL OR priority = $2) \
             AND ($3::bigint IS NULL OR reporter_id = $3) \
             AND ($4::bigint IS NULL OR reported_user_id = $4)";
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM reports {WHERE}"))
            .bind(filter.status)
            .bind(filter.priority)
            .bind(filter.reporter_id)
            .bind(filter.reported_user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let items = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLS} FROM reports {WHERE} \
             ORDER BY priority DESC, created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.reporter_id)
        .bind(filter.reported_user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok((items, total))
    }

    async fn count_reports_against(&self, user_id: Id) -> RepoResult<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reports WHERE reported_user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(n)
    }

    async fn count_violations(&self, user_id: Id) -> RepoResult<i64> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reports WHERE reported_user_id = $1 AND status = 'resolved'")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_err)?;
        Ok(n)
    }

    async fn set_report_status(&self, id: Id, status: ReportStatus) -> RepoResult<Report> {
        let updated = sqlx::query_as::<_, Report>(&format!(
            "UPDATE reports SET status = $2, updated_at = now() \
             WHERE id = $1 AND status <> 'resolved' RETURNING {REPORT_COLS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        match updated {
            Some(r) => Ok(r),
            // no row: either missing or already resolved
            None => match self.get_report(id).await {
                Ok(_) => Err(RepoError::Conflict),
                Err(e) => Err(e),
            },
        }
    }

    async fn count_by_status(&self) -> RepoResult<ReportCounts> {
        let rows: Vec<(ReportStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM reports GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(map_err)?;
        let mut counts = ReportCounts::default();
        for (status, n) in rows {
            counts.total += n;
            match status {
                ReportStatus::Pending => counts.pending = n,
                ReportStatus::Reviewed => counts.reviewed = n,
                ReportStatus::Resolved => counts.resolved = n,
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ModerationActionRepo for PgRepo {
    async fn record_action(&self, new: NewModerationAction) -> RepoResult<ModerationAction> {
        sqlx::query_as::<_, ModerationAction>(&format!(
            "INSERT INTO moderation_actions \
             (report_id, content_type, content_id, reported_user_id, moderator_id, action, reason, internal_notes, ban_expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ACTION_COLS}"
        ))
        .bind(new.report_id)
        .bind(new.content_type)
        .bind(new.content_id)
        .bind(new.reported_user_id)
        .bind(new.moderator_id)
        .bind(new.action)
        .bind(&new.reason)
        .bind(new.internal_notes.as_ref())
        .bind(new.ban_expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn list_actions(&self, filter: &ActionFilter, offset: i64, limit: i64) -> RepoResult<(Vec<ModerationAction>, i64)> {
        const WHERE: &str = "WHERE ($1::bigint IS NULL OR moderator_id = $1) \
             AND ($2::moderation_action_kind IS NULL OR action = $2) \
             AND ($3::timestamptz IS NULL OR created_at >= $3) \
             AND ($4::timestamptz IS NULL OR created_at <= $4)";
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM moderation_actions {WHERE}"))
            .bind(filter.moderator_id)
            .bind(filter.action)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let items = sqlx::query_as::<_, ModerationAction>(&format!(
            "SELECT {ACTION_COLS} FROM moderation_actions {WHERE} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.moderator_id)
        .bind(filter.action)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok((items, total))
    }

    async fn action_counts(&self, moderator_id: Option<Id>) -> RepoResult<Vec<(ActionKind, i64)>> {
        sqlx::query_as::<_, (ActionKind, i64)>(
            "SELECT action, COUNT(*) FROM moderation_actions \
             WHERE ($1::bigint IS NULL OR moderator_id = $1) GROUP BY action",
        )
        .bind(moderator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn count_actions_since(&self, moderator_id: Option<Id>, since: DateTime<Utc>) -> RepoResult<i64> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM moderation_actions \
             WHERE ($1::bigint IS NULL OR moderator_id = $1) AND created_at >= $2",
        )
        .bind(moderator_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(n)
    }

    async fn resolution_samples(&self, moderator_id: Option<Id>, since: DateTime<Utc>) -> RepoResult<Vec<ResolutionSample>> {
        let rows: Vec<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT r.created_at, a.created_at FROM moderation_actions a \
             JOIN reports r ON r.id = a.report_id \
             WHERE ($1::bigint IS NULL OR a.moderator_id = $1) \
               AND a.action <> 'dismiss' AND a.created_at >= $2",
        )
        .bind(moderator_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows
            .into_iter()
            .map(|(reported_at, resolved_at)| ResolutionSample { reported_at, resolved_at })
            .collect())
    }
}

#[async_trait]
impl NoteRepo for PgRepo {
    async fn create_note(&self, new: NewNote) -> RepoResult<ModeratorNote> {
        sqlx::query_as::<_, ModeratorNote>(
            "INSERT INTO moderator_notes (user_id, moderator_id, note) VALUES ($1, $2, $3) \
             RETURNING id, user_id, moderator_id, note, created_at",
        )
        .bind(new.user_id)
        .bind(new.moderator_id)
        .bind(&new.note)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn list_notes(&self, user_id: Id, offset: i64, limit: i64) -> RepoResult<(Vec<ModeratorNote>, i64)> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM moderator_notes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let items = sqlx::query_as::<_, ModeratorNote>(
            "SELECT id, user_id, moderator_id, note, created_at FROM moderator_notes \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok((items, total))
    }

    async fn delete_note(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM moderator_notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }
}
