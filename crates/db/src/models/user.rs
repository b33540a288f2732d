//! User model with an avatar and a photo gallery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sea_orm::Set;
use serde::Serialize;
use stowage_core::{
    Attachment, AttachmentColumn, AttachmentError, AttachmentModel, AttachmentTracker, ColumnValue,
};
use uuid::Uuid;

use crate::entities::users;

const AVATAR: &str = "avatar";
const PHOTOS: &str = "photos";

static COLUMNS: [AttachmentColumn; 2] = [
    AttachmentColumn::single(AVATAR)
        .in_folder("avatars")
        .pre_compute_url(),
    AttachmentColumn::multiple(PHOTOS).in_folder("photos"),
];

/// A user whose attachment columns are kept in sync with the file store.
///
/// Assigning an attachment only records intent; files are written and
/// cleaned up when the user is saved through a [`UserRepository`].
///
/// Clones share attachment state and the persisted flag.
///
/// [`UserRepository`]: crate::UserRepository
#[derive(Debug, Clone)]
pub struct User {
    id: Uuid,
    username: String,
    attachments: AttachmentTracker,
    persisted: Arc<AtomicBool>,
}

impl User {
    /// Creates a new, unsaved user without attachments.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            attachments: AttachmentTracker::new(),
            persisted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Rebuilds a user from a row, capturing the stored attachment values.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment column holds malformed JSON.
    pub fn from_model(model: users::Model) -> Result<Self, AttachmentError> {
        let attachments = AttachmentTracker::new();
        attachments.capture(AVATAR, ColumnValue::from_db_json(&COLUMNS[0], model.avatar)?);
        attachments.capture(PHOTOS, ColumnValue::from_db_json(&COLUMNS[1], model.photos)?);

        Ok(Self {
            id: model.id,
            username: model.username,
            attachments,
            persisted: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Primary key.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Unique user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Renames the user.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    /// Whether a row exists for this user.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted.load(Ordering::SeqCst)
    }

    /// Current avatar, including an unsaved assignment.
    #[must_use]
    pub fn avatar(&self) -> Option<Attachment> {
        self.attachments.current(AVATAR).first().cloned()
    }

    /// Assigns or clears the avatar.
    pub fn set_avatar(&mut self, avatar: impl Into<Option<Attachment>>) {
        self.attachments.set_new(AVATAR, ColumnValue::from(avatar.into()));
    }

    /// Current photo gallery, including an unsaved assignment.
    #[must_use]
    pub fn photos(&self) -> Vec<Attachment> {
        self.attachments.current(PHOTOS).attachments().to_vec()
    }

    /// Replaces the photo gallery. An empty list clears the column.
    pub fn set_photos(&mut self, photos: Vec<Attachment>) {
        self.attachments.set_new(PHOTOS, ColumnValue::from(photos));
    }

    /// Externally serialized form.
    #[must_use]
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            avatar: self.attachments.current(AVATAR),
            photos: self.attachments.current(PHOTOS),
        }
    }

    pub(crate) fn mark_persisted(&self) {
        self.persisted.store(true, Ordering::SeqCst);
    }

    /// Flag handle for hooks that must undo an insert after the fact.
    pub(crate) fn persisted_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.persisted)
    }

    pub(crate) fn to_active_model(&self) -> users::ActiveModel {
        users::ActiveModel {
            id: Set(self.id),
            username: Set(self.username.clone()),
            avatar: Set(self.attachments.current(AVATAR).to_db_json()),
            photos: Set(self.attachments.current(PHOTOS).to_db_json()),
        }
    }
}

impl AttachmentModel for User {
    fn attachment_columns() -> &'static [AttachmentColumn] {
        &COLUMNS
    }

    fn attachments(&self) -> &AttachmentTracker {
        &self.attachments
    }
}

/// User as exposed to API clients.
///
/// Attachment columns render as `null`, an object or an array, with `url`
/// present only when it was computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    /// Primary key.
    pub id: Uuid,
    /// Unique user name.
    pub username: String,
    /// Avatar metadata.
    pub avatar: ColumnValue,
    /// Photo gallery metadata.
    pub photos: ColumnValue,
}
