//! User service endpoints: authentication, profile and friends

use reqwest::Method;
use serde_json::json;
use validator::Validate;

use super::{check_status, decode, ApiClient, ApiRequest, FormField, Service};
use crate::{
    error::ClientResult,
    models::{
        user::{LoginRequest, TokenResponse},
        ImageUpload, Registration, User,
    },
};

impl ApiClient {
    /// Exchange credentials for a token.
    ///
    /// Sent without a bearer token and never refreshed itself.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let request = ApiRequest::new(Method::POST, Service::User, "/login/v1")
            .anonymous()
            .json(&LoginRequest { username, password })?;
        let response = check_status(self.send_once(&request, None).await?).await?;
        let body: TokenResponse = decode(response, "/login/v1").await?;
        Ok(body.token)
    }

    /// Log in and persist the token with the credentials used for later refreshes
    pub async fn sign_in(&self, username: &str, password: &str) -> ClientResult<()> {
        let token = self.login(username, password).await?;
        self.session.set(&token, username, password).await?;
        tracing::info!("Signed in as {}", username);
        Ok(())
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.session.clear().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub async fn register(&self, form: &Registration, image: ImageUpload) -> ClientResult<User> {
        form.validate()?;

        let request = ApiRequest::new(Method::POST, Service::User, "/register/v1")
            .anonymous()
            .multipart(vec![
                FormField::Text("username", form.username.trim().to_string()),
                FormField::Text("password", form.password.clone()),
                FormField::Text("name", form.name.trim().to_string()),
                FormField::Text("surname", form.surname.trim().to_string()),
                FormField::File("image", image),
            ]);
        self.fetch(request).await
    }

    pub async fn current_user(&self) -> ClientResult<User> {
        self.fetch(ApiRequest::get(Service::User, "/v1/")).await
    }

    /// Send a friend request
    pub async fn add_friend(&self, friend_id: &str) -> ClientResult<()> {
        let request = ApiRequest::new(Method::PATCH, Service::User, "/v1/addfriend")
            .json(&json!({ "FriendId": friend_id }))?;
        self.send(request).await
    }

    pub async fn get_friend(&self, friend_id: &str) -> ClientResult<User> {
        self.fetch(ApiRequest::get(Service::User, "/v1/friend").query("friendId", friend_id))
            .await
    }

    pub async fn upload_profile_image(&self, image: ImageUpload) -> ClientResult<()> {
        let request = ApiRequest::new(Method::PATCH, Service::User, "/v1/updateprofile")
            .multipart(vec![FormField::File("image", image)]);
        self.send(request).await
    }
}
