//! Request and response DTOs for the master and store REST APIs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub user: String,
    pub password: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserInfoRequest {
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub avatar: Vec<u8>,
}

/// Public profile of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub user: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub avatar: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddFriendRequest {
    pub from_id: i64,
    pub to_id: i64,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddFriendResponse {
    pub confirm: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub owner_id: i64,
    pub group_id: i64,
}

/// Error body returned by the collaborators on 4xx/5xx.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
