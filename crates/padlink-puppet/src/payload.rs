// Backend payload shapes carried in the `data` field of pushed events.
//
// Field names follow the backend's PascalCase JSON convention. Every struct
// takes `serde(default)` so a partial or failed decode degrades to default
// values instead of failing the event (see the translator).
use serde::{Deserialize, Serialize};

/// Contact gender as encoded by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ContactGender {
    #[default]
    Unknown,
    Male,
    Female,
}

impl From<i32> for ContactGender {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Male,
            2 => Self::Female,
            _ => Self::Unknown,
        }
    }
}

impl From<ContactGender> for i32 {
    fn from(value: ContactGender) -> i32 {
        match value {
            ContactGender::Unknown => 0,
            ContactGender::Male => 1,
            ContactGender::Female => 2,
        }
    }
}

/// Contact kind. The adapter only ever writes `Myself` itself, when caching
/// the login-derived self contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ContactKind {
    #[default]
    Unknown,
    Personal,
    Official,
    Myself,
}

impl From<i32> for ContactKind {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Personal,
            2 => Self::Official,
            3 => Self::Myself,
            _ => Self::Unknown,
        }
    }
}

impl From<ContactKind> for i32 {
    fn from(value: ContactKind) -> i32 {
        match value {
            ContactKind::Unknown => 0,
            ContactKind::Personal => 1,
            ContactKind::Official => 2,
            ContactKind::Myself => 3,
        }
    }
}

/// Numeric WeChat message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MessageType {
    #[default]
    Unknown,
    Text,
    Image,
    Voice,
    ShareCard,
    Video,
    Emoticon,
    Location,
    App,
    System,
    Recalled,
}

impl From<i32> for MessageType {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Text,
            3 => Self::Image,
            34 => Self::Voice,
            42 => Self::ShareCard,
            43 => Self::Video,
            47 => Self::Emoticon,
            48 => Self::Location,
            49 => Self::App,
            10000 => Self::System,
            10002 => Self::Recalled,
            _ => Self::Unknown,
        }
    }
}

impl From<MessageType> for i32 {
    fn from(value: MessageType) -> i32 {
        match value {
            MessageType::Unknown => 0,
            MessageType::Text => 1,
            MessageType::Image => 3,
            MessageType::Voice => 34,
            MessageType::ShareCard => 42,
            MessageType::Video => 43,
            MessageType::Emoticon => 47,
            MessageType::Location => 48,
            MessageType::App => 49,
            MessageType::System => 10000,
            MessageType::Recalled => 10002,
        }
    }
}

/// Canonical contact record, cached by `UserName`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContactPayload {
    pub user_name: String,
    pub alias: String,
    pub nick_name: String,
    pub remark: String,
    pub big_head_url: String,
    pub small_head_url: String,
    pub sex: ContactGender,
    pub contact_type: ContactKind,
    pub signature: String,
}

/// Inbound message, cached by `MsgId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MessagePayload {
    pub msg_id: String,
    pub from_user_name: String,
    pub to_user_name: String,
    pub msg_type: MessageType,
    pub content: String,
    pub create_time: i64,
    pub msg_source_xml: String,
}

/// Login-success payload after a QR code confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QrcodeLoginPayload {
    pub user_name: String,
    pub alias: String,
    pub nick_name: String,
    pub head_img_url: String,
    pub uin: String,
}

impl QrcodeLoginPayload {
    /// Contact record for the account that just logged in.
    pub fn to_self_contact(&self) -> ContactPayload {
        ContactPayload {
            user_name: self.user_name.clone(),
            alias: self.alias.clone(),
            nick_name: self.nick_name.clone(),
            big_head_url: self.head_img_url.clone(),
            sex: ContactGender::Unknown,
            contact_type: ContactKind::Myself,
            ..ContactPayload::default()
        }
    }
}

/// Silent re-authentication payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AutoLoginPayload {
    pub wechat_user: WechatUser,
    pub online: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WechatUser {
    pub user_name: String,
    pub nick_name: String,
    pub head_img_url: String,
}

/// A fresh login QR code pushed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QrcodeEventPayload {
    pub qr_code: String,
    pub qr_code_id: String,
}

/// Progress update while a QR code is being scanned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScanEventPayload {
    pub status: i32,
    pub qr_code_id: String,
    pub user_name: String,
}

/// Backend-initiated logout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LogoutPayload {
    pub uin: String,
    pub message: String,
}

/// Contact modification pushed by the backend; a different shape from the
/// canonical contact record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContactModifyPayload {
    pub user_name: String,
    pub alias: String,
    pub nick_name: String,
    pub head_img_url: String,
    pub sex: ContactGender,
    pub contact_type: ContactKind,
}

impl ContactModifyPayload {
    pub fn to_contact(&self) -> ContactPayload {
        ContactPayload {
            user_name: self.user_name.clone(),
            alias: self.alias.clone(),
            nick_name: self.nick_name.clone(),
            big_head_url: self.head_img_url.clone(),
            sex: self.sex,
            contact_type: self.contact_type,
            ..ContactPayload::default()
        }
    }
}

/// Request body for resolving a rich-media attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RichMediaRequest {
    pub msg_id: String,
    pub from_user_name: String,
    pub to_user_name: String,
    pub msg_type: MessageType,
    pub app_msg_type: i32,
    pub content: String,
    pub src: String,
}

/// Resolved media location returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MediaData {
    pub src: String,
    pub thumb: String,
    pub title: String,
    pub description: String,
}

/// Room usernames carry a fixed suffix.
pub fn is_room_id(user_name: &str) -> bool {
    user_name.ends_with("@chatroom")
}
