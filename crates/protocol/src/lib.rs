//! Gate wire protocol: operation names, request bodies, and the response
//! envelope shared by every operation.
//!
//! A reply either carries only its payload fields, or a `header` with a
//! non-zero status code and a human-readable message.  The second shape is
//! a *business* rejection: the gateway processed the call and a
//! collaborator refused it.  Transport-level failures never use it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Call metadata key carrying the caller's network address.
pub const REMOTE_METADATA_KEY: &str = "remote";

/// Status code of a business-failure envelope.
pub const STATUS_REJECTED: i32 = -1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Methods
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Every operation on the gate surface, implemented or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Register,
    UpdateUserInfo,
    UpdateUserPassword,
    GetUserInfo,
    Login,
    Logout,
    UserMessage,
    Heartbeat,
    UploadImage,
    DownloadImage,
    Notice,
    AddFriend,
    FindUser,
    CreateGroup,
}

impl Method {
    pub const ALL: [Method; 14] = [
        Method::Register,
        Method::UpdateUserInfo,
        Method::UpdateUserPassword,
        Method::GetUserInfo,
        Method::Login,
        Method::Logout,
        Method::UserMessage,
        Method::Heartbeat,
        Method::UploadImage,
        Method::DownloadImage,
        Method::Notice,
        Method::AddFriend,
        Method::FindUser,
        Method::CreateGroup,
    ];

    /// Canonical snake_case name, as used in `/v1/gate/:method`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::UpdateUserInfo => "update_user_info",
            Self::UpdateUserPassword => "update_user_password",
            Self::GetUserInfo => "get_user_info",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::UserMessage => "user_message",
            Self::Heartbeat => "heartbeat",
            Self::UploadImage => "upload_image",
            Self::DownloadImage => "download_image",
            Self::Notice => "notice",
            Self::AddFriend => "add_friend",
            Self::FindUser => "find_user",
            Self::CreateGroup => "create_group",
        }
    }

    /// RPC-style camelCase alias (`updateUserInfo`).
    pub fn camel_name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::UpdateUserInfo => "updateUserInfo",
            Self::UpdateUserPassword => "updateUserPassword",
            Self::GetUserInfo => "getUserInfo",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::UserMessage => "userMessage",
            Self::Heartbeat => "heartbeat",
            Self::UploadImage => "uploadImage",
            Self::DownloadImage => "downloadImage",
            Self::Notice => "notice",
            Self::AddFriend => "addFriend",
            Self::FindUser => "findUser",
            Self::CreateGroup => "createGroup",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method name matches nothing on the surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("undefined method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s || m.camel_name() == s)
            .ok_or_else(|| UnknownMethod(s.to_owned()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Status block of a rejected reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub code: i32,
    pub msg: String,
}

/// Reply envelope wrapping an operation's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<ResponseHeader>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self { header: None, body }
    }

    pub fn is_rejected(&self) -> bool {
        self.header.as_ref().is_some_and(|h| h.code != 0)
    }
}

impl<T: Default> Reply<T> {
    /// Business rejection with an empty payload.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self {
            header: Some(ResponseHeader {
                code: STATUS_REJECTED,
                msg: msg.into(),
            }),
            body: T::default(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserInfoRequest {
    pub user: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub avatar: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserInfoRequest {
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFriendRequest {
    pub user_id: i64,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindUserRequest {
    pub user: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateGroupRequest {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reply payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Payload carrying a single user or group identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdReply {
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoReply {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub avatar: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFriendReply {
    /// `true` once both sides have confirmed; the users can chat directly.
    #[serde(default)]
    pub confirm: bool,
}

pub type RegisterReply = Reply<IdReply>;
pub type UpdateUserInfoReply = Reply<IdReply>;
pub type GetUserInfoReply = Reply<UserInfoReply>;
pub type LoginReply = Reply<IdReply>;
pub type FindUserReply = Reply<IdReply>;
pub type CreateGroupReply = Reply<IdReply>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_parse_in_both_styles() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
            assert_eq!(m.camel_name().parse::<Method>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_method_is_reported() {
        let err = "sendSticker".parse::<Method>().unwrap_err();
        assert_eq!(err, UnknownMethod("sendSticker".into()));
        assert_eq!(err.to_string(), "undefined method: sendSticker");
    }

    #[test]
    fn success_reply_has_no_header() {
        let json = serde_json::to_value(Reply::ok(IdReply { id: 42 })).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 42 }));
    }

    #[test]
    fn rejected_reply_carries_status_and_message() {
        let reply: LoginReply = Reply::rejected("store: wrong password");
        assert!(reply.is_rejected());

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["header"]["code"], -1);
        assert_eq!(json["header"]["msg"], "store: wrong password");
    }

    #[test]
    fn rejected_reply_parses_back() {
        let raw = r#"{ "header": { "code": -1, "msg": "no such user" } }"#;
        let reply: FindUserReply = serde_json::from_str(raw).unwrap();
        assert!(reply.is_rejected());
        assert_eq!(reply.body, IdReply::default());
    }

    #[test]
    fn update_user_info_request_defaults_optional_fields() {
        let req: UpdateUserInfoRequest = serde_json::from_str(r#"{ "user": "alice" }"#).unwrap();
        assert!(req.nick_name.is_empty());
        assert!(req.avatar.is_empty());
    }
}
