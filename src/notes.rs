use std::sync::Arc;

use tracing::info;

use crate::auth::Actor;
use crate::error::{check_text, NotFoundAs, ServiceError, ServiceResult};
use crate::models::{CreateNoteRequest, Id, ModeratorNote, NewNote, Page, PageQuery};
use crate::moderation::MAX_NOTES_LEN;
use crate::repo::{NoteRepo, Repo, UserRepo};

/// Staff-only free-text notes attached to a user account.
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepo>,
    users: Arc<dyn UserRepo>,
}

impl NoteService {
    pub fn new<R: Repo + 'static>(repo: Arc<R>) -> Self {
        Self { notes: repo.clone(), users: repo }
    }

    pub async fn create(&self, actor: Actor, user_id: Id, req: CreateNoteRequest) -> ServiceResult<ModeratorNote> {
        actor.require_staff()?;
        check_text("note", &req.note, MAX_NOTES_LEN, true)?;
        self.users.get_user(user_id).await.not_found_as(ServiceError::UserNotFound)?;
        let note = self
            .notes
            .create_note(NewNote { user_id, moderator_id: actor.id, note: req.note })
            .await?;
        info!(note_id = note.id, user_id, moderator_id = actor.id, "moderator note added");
        Ok(note)
    }

    pub async fn list(&self, actor: Actor, user_id: Id, query: &PageQuery) -> ServiceResult<Page<ModeratorNote>> {
        actor.require_staff()?;
        self.users.get_user(user_id).await.not_found_as(ServiceError::UserNotFound)?;
        let (offset, limit) = query.offset_limit();
        let (items, total) = self.notes.list_notes(user_id, offset, limit).await?;
        Ok(Page::new(items, total, query))
    }

    pub async fn delete(&self, actor: Actor, note_id: Id) -> ServiceResult<()> {
        actor.require_staff()?;
        self.notes.delete_note(note_id).await.not_found_as(ServiceError::NoteNotFound)?;
        info!(note_id, moderator_id = actor.id, "moderator note deleted");
        Ok(())
    }
}
