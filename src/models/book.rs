//! Book and user-book models
//!
//! Wire names follow the library service's camelCase JSON. Every record here is a
//! snapshot of server state; the client never treats a local copy as authoritative.

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ClientError, ClientResult};

use super::not_blank;

/// Catalog book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Genre tags. Duplicates in a payload collapse to the first occurrence.
    #[serde(default)]
    pub genres: IndexSet<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image URI
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub wished: bool,
    /// Whether the current user owns a copy
    #[serde(default)]
    pub assigned: bool,
}

impl Book {
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.contains(genre)
    }
}

/// Per-user rating, 0 to 5 inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> ClientResult<Self> {
        Self::try_from(value).map_err(ClientError::Validation)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(format!("rating {} is out of range 0-{}", value, Self::MAX));
        }
        Ok(Rating(value))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// How the user holds their copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipStatus {
    Owned,
    Rented,
    Lent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingStatus {
    Pending,
    Reading,
    Finished,
    Abandoned,
}

/// A book bound to the current (or a friend's) library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBook {
    #[serde(flatten)]
    pub book: Book,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub ownership_status: Option<OwnershipStatus>,
    #[serde(default)]
    pub reading_status: Option<ReadingStatus>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Entry in a book list, whichever source produced it
#[derive(Debug, Clone, PartialEq)]
pub enum BookEntry {
    Catalog(Book),
    Personal(UserBook),
}

impl BookEntry {
    pub fn book(&self) -> &Book {
        match self {
            BookEntry::Catalog(book) => book,
            BookEntry::Personal(user_book) => &user_book.book,
        }
    }

    pub fn book_mut(&mut self) -> &mut Book {
        match self {
            BookEntry::Catalog(book) => book,
            BookEntry::Personal(user_book) => &mut user_book.book,
        }
    }

    pub fn id(&self) -> &str {
        &self.book().id
    }
}

impl From<Book> for BookEntry {
    fn from(book: Book) -> Self {
        BookEntry::Catalog(book)
    }
}

impl From<UserBook> for BookEntry {
    fn from(user_book: UserBook) -> Self {
        BookEntry::Personal(user_book)
    }
}

/// Catalog submission form
#[derive(Debug, Clone, Validate)]
pub struct NewBook {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "At least one genre is required"))]
    pub genres: Vec<String>,
    #[validate(custom(function = "not_blank", message = "Description is required"))]
    pub description: String,
}

impl NewBook {
    /// Genres as the comma-separated field the create endpoint expects
    pub fn genres_field(&self) -> String {
        let unique: IndexSet<&str> = self
            .genres
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect();
        unique.into_iter().collect::<Vec<_>>().join(",")
    }
}

/// Partial update of a user book
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_status: Option<OwnershipStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_status: Option<ReadingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<IndexSet<String>>,
}

impl BookPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}
