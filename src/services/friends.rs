//! Friends list with status-gated access to profiles and wishlists

use crate::{
    client::ApiClient,
    error::{ClientError, ClientResult},
    models::{Friend, User, UserBook},
};

#[derive(Clone)]
pub struct FriendDirectory {
    api: ApiClient,
}

impl FriendDirectory {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All relations of the current user, pending ones included
    pub async fn friends(&self) -> ClientResult<Vec<Friend>> {
        Ok(self.api.current_user().await?.friends)
    }

    pub async fn accepted_friends(&self) -> ClientResult<Vec<Friend>> {
        let user = self.api.current_user().await?;
        Ok(user.accepted_friends().cloned().collect())
    }

    /// Send a friend request
    pub async fn add(&self, friend_id: &str) -> ClientResult<()> {
        let friend_id = friend_id.trim();
        if friend_id.is_empty() {
            return Err(ClientError::Validation("Friend id is required".to_string()));
        }
        self.api.add_friend(friend_id).await?;
        tracing::info!("Friend request sent to {}", friend_id);
        Ok(())
    }

    pub async fn profile(&self, friend_id: &str) -> ClientResult<User> {
        self.require_accepted(friend_id).await?;
        self.api.get_friend(friend_id).await
    }

    pub async fn wishlist(&self, friend_id: &str) -> ClientResult<Vec<UserBook>> {
        self.require_accepted(friend_id).await?;
        self.api.fetch_friend_wishlist(friend_id).await
    }

    /// Only accepted friends expose their profile and wishlist
    pub async fn require_accepted(&self, friend_id: &str) -> ClientResult<Friend> {
        let user = self.api.current_user().await?;
        match user.friend(friend_id) {
            Some(friend) if friend.is_visible() => Ok(friend.clone()),
            Some(_) => Err(ClientError::Forbidden(format!(
                "Friend request to {} has not been accepted",
                friend_id
            ))),
            None => Err(ClientError::Forbidden(format!("{} is not in your friends list", friend_id))),
        }
    }
}
