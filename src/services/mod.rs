//! Client-side services built on the API client

pub mod book_list;
pub mod friends;

use std::sync::Arc;

use crate::{client::ApiClient, config::AppConfig, error::ClientResult, session::SessionStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub api: ApiClient,
    pub books: book_list::BookListController,
    pub friends: friends::FriendDirectory,
}

impl Services {
    /// Create all services sharing one session store
    pub fn new(config: &AppConfig, session: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let api = ApiClient::new(&config.api, session)?;
        Ok(Self {
            books: book_list::BookListController::new(Arc::new(api.clone()), config.api.page_size),
            friends: friends::FriendDirectory::new(api.clone()),
            api,
        })
    }
}
