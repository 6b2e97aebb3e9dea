//! Data models for Bookshelf

pub mod book;
pub mod upload;
pub mod user;

use validator::ValidationError;

// Re-export commonly used types
pub use book::{Book, BookEntry, BookPatch, NewBook, OwnershipStatus, Rating, ReadingStatus, UserBook};
pub use upload::ImageUpload;
pub use user::{Friend, FriendStatus, Registration, User};

/// Rejects empty and whitespace-only form fields
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
