use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

/// Content value the server stores in place of a deleted message body.
pub const DELETED_MESSAGE_SENTINEL: &str = "__deleted__";
pub const DELETED_MESSAGE_PLACEHOLDER: &str = "This message was deleted";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct GroupMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MessageMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Group {
    pub id: Id<GroupMarker>,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub members: Vec<GroupMember>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct GroupMember {
    pub user: User,
    pub is_admin: bool,
}

impl Group {
    #[must_use]
    pub fn is_admin(&self, user_id: Id<UserMarker>) -> bool {
        self.members
            .iter()
            .any(|member| member.user.id == user_id && member.is_admin)
    }

    #[must_use]
    pub fn is_member(&self, user_id: Id<UserMarker>) -> bool {
        self.members.iter().any(|member| member.user.id == user_id)
    }
}

/// A message body. Soft-deleted messages keep their id and position.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum MessageContent {
    Text(String),
    Deleted,
}

impl MessageContent {
    #[must_use]
    pub fn from_wire(content: String) -> Self {
        if content == DELETED_MESSAGE_SENTINEL {
            Self::Deleted
        } else {
            Self::Text(content)
        }
    }

    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Deleted => DELETED_MESSAGE_SENTINEL,
        }
    }

    /// What any participant sees for this message.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Deleted => DELETED_MESSAGE_PLACEHOLDER,
        }
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl Serialize for MessageContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from_wire)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct GroupMessage {
    pub id: Id<MessageMarker>,
    pub group_id: Id<GroupMarker>,
    pub sender: User,
    pub content: MessageContent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct DirectMessage {
    pub id: Id<MessageMarker>,
    pub sender: User,
    pub recipient: Id<UserMarker>,
    pub content: MessageContent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Shared shape of group and direct messages.
pub trait ChatMessage {
    fn id(&self) -> Id<MessageMarker>;
    fn sender_id(&self) -> Id<UserMarker>;
    fn content(&self) -> &MessageContent;
    fn content_mut(&mut self) -> &mut MessageContent;
}

impl ChatMessage for GroupMessage {
    fn id(&self) -> Id<MessageMarker> {
        self.id
    }

    fn sender_id(&self) -> Id<UserMarker> {
        self.sender.id
    }

    fn content(&self) -> &MessageContent {
        &self.content
    }

    fn content_mut(&mut self) -> &mut MessageContent {
        &mut self.content
    }
}

impl ChatMessage for DirectMessage {
    fn id(&self) -> Id<MessageMarker> {
        self.id
    }

    fn sender_id(&self) -> Id<UserMarker> {
        self.sender.id
    }

    fn content(&self) -> &MessageContent {
        &self.content
    }

    fn content_mut(&mut self) -> &mut MessageContent {
        &mut self.content
    }
}

/// Replaces the body of message `id` with the deletion marker, leaving the row in place.
///
/// Returns whether the message was found.
pub fn soft_delete<M: ChatMessage>(messages: &mut [M], id: Id<MessageMarker>) -> bool {
    match messages.iter_mut().find(|message| message.id() == id) {
        Some(message) => {
            *message.content_mut() = MessageContent::Deleted;
            true
        }
        None => false,
    }
}
