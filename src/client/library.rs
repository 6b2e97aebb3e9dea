//! Library service endpoints: catalog, user books and wishlist

use reqwest::Method;
use serde_json::json;
use validator::Validate;

use super::{ApiClient, ApiRequest, FormField, Service};
use crate::{
    error::ClientResult,
    models::{Book, BookPatch, ImageUpload, NewBook, UserBook},
};

impl ApiClient {
    /// One page of the public catalog. An empty `search_text` is unfiltered.
    pub async fn fetch_catalog(&self, page: u32, search_text: &str) -> ClientResult<Vec<Book>> {
        let request = ApiRequest::get(Service::Library, "/books/v1")
            .query("page", page)
            .query("rows", self.page_size)
            .query("filter", search_text);
        self.fetch(request).await
    }

    /// One page of the current user's library, or of their wishlist
    pub async fn fetch_personal_books(&self, page: u32, wishlist_only: bool) -> ClientResult<Vec<UserBook>> {
        let request = ApiRequest::get(Service::Library, "/userbook/v1/")
            .query("page", page)
            .query("wishlist", wishlist_only);
        self.fetch(request).await
    }

    /// A friend's whole wishlist (not paginated)
    pub async fn fetch_friend_wishlist(&self, friend_id: &str) -> ClientResult<Vec<UserBook>> {
        let request = ApiRequest::get(Service::Library, "/userbook/v1/")
            .query("friendId", friend_id)
            .query("wishlist", true);
        self.fetch(request).await
    }

    pub async fn fetch_book(&self, book_id: &str) -> ClientResult<Book> {
        self.fetch(ApiRequest::get(Service::Library, format!("/book/v1/{}", book_id)))
            .await
    }

    pub async fn fetch_user_book(&self, book_id: &str) -> ClientResult<UserBook> {
        self.fetch(ApiRequest::get(Service::Library, format!("/userbook/v1/{}", book_id)))
            .await
    }

    /// Submit a new catalog entry with its cover image
    pub async fn create_book(&self, book: &NewBook, image: ImageUpload) -> ClientResult<Book> {
        book.validate()?;

        let request = ApiRequest::new(Method::POST, Service::Library, "/book/create/v1").multipart(vec![
            FormField::Text("title", book.title.trim().to_string()),
            FormField::Text("author", book.author.trim().to_string()),
            FormField::Text("genres", book.genres_field()),
            FormField::Text("description", book.description.trim().to_string()),
            FormField::File("image", image),
        ]);
        let created: Book = self.fetch(request).await?;
        tracing::info!("Created book {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Add a catalog book to the current user's library
    pub async fn assign_book(&self, book_id: &str) -> ClientResult<UserBook> {
        let request = ApiRequest::new(Method::POST, Service::Library, "/userbook/v1")
            .json(&json!({ "BookId": book_id }))?;
        self.fetch(request).await
    }

    pub async fn update_book(&self, patch: &BookPatch) -> ClientResult<()> {
        let request = ApiRequest::new(Method::PATCH, Service::Library, "/book/v1").json(patch)?;
        self.send(request).await
    }

    /// Flip the wishlist flag server-side
    pub async fn toggle_wishlist(&self, book_id: &str) -> ClientResult<()> {
        let request = ApiRequest::new(Method::POST, Service::Library, "/wishlist/v1")
            .json(&json!({ "bookId": book_id }))?;
        self.send(request).await
    }

    /// Remove a book from the current user's library
    pub async fn delete_user_book(&self, book_id: &str) -> ClientResult<()> {
        let request =
            ApiRequest::new(Method::DELETE, Service::Library, "/userbook/v1").query("bookId", book_id);
        self.send(request).await
    }

    /// Delete a catalog book
    pub async fn delete_book(&self, book_id: &str) -> ClientResult<()> {
        let request = ApiRequest::new(Method::DELETE, Service::Library, "/book/v1").query("bookId", book_id);
        self.send(request).await
    }
}
