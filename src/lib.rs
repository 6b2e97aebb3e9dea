//! Bookshelf client
//!
//! Typed client for the Bookshelf library and user services: catalog search,
//! personal library, wishlist and friends, with a paginated list controller
//! and a persisted session that re-authenticates on expiry.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

pub use client::ApiClient;
pub use config::AppConfig;
pub use error::{ClientError, ClientResult};
pub use services::{
    book_list::{BookListController, BookSource, ListMode, ListSnapshot, ListStatus, LoadOutcome},
    friends::FriendDirectory,
    Services,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
