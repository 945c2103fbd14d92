use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::{NotFoundAs, ServiceError, ServiceResult};
use crate::models::{BanType, Id, User, UserStatus};
use crate::repo::UserRepo;

pub const MAX_BAN_DAYS: i64 = 365;

/// Expiry for a ban starting at `now`. Temporary bans need `1..=MAX_BAN_DAYS` days;
/// permanent bans have no expiry and ignore `days`.
pub fn ban_expiry(ban_type: BanType, days: Option<i64>, now: DateTime<Utc>) -> ServiceResult<Option<DateTime<Utc>>> {
    match ban_type {
        BanType::Permanent => Ok(None),
        BanType::Temporary => match days {
            Some(d) if (1..=MAX_BAN_DAYS).contains(&d) => Ok(Some(now + Duration::days(d))),
            _ => Err(ServiceError::InvalidBanDuration),
        },
    }
}

/// Suspended, and either permanent or not yet expired.
pub fn is_active_ban(user: &User, now: DateTime<Utc>) -> bool {
    user.status == UserStatus::Suspended && user.ban_expires_at.map_or(true, |exp| exp > now)
}

/// Owns the active <-> suspended transition. Audit records are written by the caller.
#[derive(Clone)]
pub struct BanManager {
    users: Arc<dyn UserRepo>,
}

impl BanManager {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    /// Suspends `user_id` and returns the updated account.
    pub async fn ban(
        &self,
        user_id: Id,
        moderator_id: Id,
        ban_type: BanType,
        days: Option<i64>,
    ) -> ServiceResult<User> {
        let now = Utc::now();
        let expires_at = ban_expiry(ban_type, days, now)?;
        let user = self.users.get_user(user_id).await.not_found_as(ServiceError::UserNotFound)?;
        if !user.role.is_bannable() {
            return Err(ServiceError::CannotBanModeratorOrAdmin);
        }
        if user_id == moderator_id {
            return Err(ServiceError::CannotModerateSelf);
        }
        if is_active_ban(&user, now) {
            return Err(ServiceError::AlreadyBanned);
        }
        let banned = self
            .users
            .update_user_status(user_id, UserStatus::Suspended, expires_at)
            .await
            .not_found_as(ServiceError::UserNotFound)?;
        info!(user_id, moderator_id, ?ban_type, expires_at = ?banned.ban_expires_at, "user suspended");
        Ok(banned)
    }

    pub async fn unban(&self, user_id: Id, moderator_id: Id) -> ServiceResult<User> {
        // existence check first so a missing user never reaches the write
        self.users.get_user(user_id).await.not_found_as(ServiceError::UserNotFound)?;
        let user = self
            .users
            .update_user_status(user_id, UserStatus::Active, None)
            .await
            .not_found_as(ServiceError::UserNotFound)?;
        info!(user_id, moderator_id, "user reinstated");
        Ok(user)
    }

    pub async fn is_banned(&self, user_id: Id, now: DateTime<Utc>) -> ServiceResult<bool> {
        let user = self.users.get_user(user_id).await.not_found_as(ServiceError::UserNotFound)?;
        Ok(is_active_ban(&user, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn user(status: UserStatus, expires: Option<DateTime<Utc>>) -> User {
        User {
            id: 1,
            username: "u".into(),
            role: Role::User,
            status,
            ban_expires_at: expires,
            thread_count: 0,
            reply_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duration_bounds() {
        let now = Utc::now();
        assert!(matches!(ban_expiry(BanType::Temporary, None, now), Err(ServiceError::InvalidBanDuration)));
        assert!(matches!(ban_expiry(BanType::Temporary, Some(0), now), Err(ServiceError::InvalidBanDuration)));
        assert!(matches!(ban_expiry(BanType::Temporary, Some(400), now), Err(ServiceError::InvalidBanDuration)));
        assert_eq!(ban_expiry(BanType::Temporary, Some(365), now).unwrap(), Some(now + Duration::days(365)));
        assert_eq!(ban_expiry(BanType::Permanent, Some(400), now).unwrap(), None);
    }

    #[test]
    fn active_ban_respects_expiry() {
        let now = Utc::now();
        assert!(!is_active_ban(&user(UserStatus::Active, None), now));
        assert!(is_active_ban(&user(UserStatus::Suspended, None), now));
        assert!(is_active_ban(&user(UserStatus::Suspended, Some(now + Duration::hours(1))), now));
        assert!(!is_active_ban(&user(UserStatus::Suspended, Some(now - Duration::hours(1))), now));
    }
}
