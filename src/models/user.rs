//! User model and related types

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

/// Friend relationship status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendStatus {
    Pending,
    Accepted,
}

/// Relation from the current user to another user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    /// Profile id of the other user
    pub friend_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub status: FriendStatus,
}

impl Friend {
    /// Only accepted friends expose their profile and wishlist
    pub fn is_visible(&self) -> bool {
        self.status == FriendStatus::Accepted
    }
}

/// User profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    /// Unique display handle
    pub user_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub friends: Vec<Friend>,
}

impl User {
    pub fn friend(&self, friend_id: &str) -> Option<&Friend> {
        self.friends.iter().find(|f| f.friend_id == friend_id)
    }

    pub fn accepted_friends(&self) -> impl Iterator<Item = &Friend> {
        self.friends.iter().filter(|f| f.is_visible())
    }

    /// "Name Surname", falling back to the handle
    pub fn display_name(&self) -> String {
        let full = [self.name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.user_name.clone()
        } else {
            full
        }
    }
}

/// Login request body
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Login response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Registration form
#[derive(Debug, Clone, Validate)]
pub struct Registration {
    #[validate(custom(function = "not_blank", message = "Username is required"))]
    pub username: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    pub password: String,
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Surname is required"))]
    pub surname: String,
}
