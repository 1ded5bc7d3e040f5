//! Response bodies as the server sends them, validated into models before
//! they reach the cache.

use pulse_common::{
    model::{
        Id, ModelValidationError,
        comment::Comment,
        goal::{Goal, GoalCategory, GoalMetric, validate_current, validate_target},
        group::{DirectMessage, Group, GroupMember, GroupMessage, MessageContent},
        post::{Post, ViewerState},
        story::Story,
        user::{User, UserHandle},
    },
    pagination::Page,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostRecord {
    pub id: u64,
    pub author: UserRecord,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub likes_count: u32,
    pub comments_count: u32,
    #[serde(default)]
    pub liked_by_me: bool,
    #[serde(default)]
    pub saved_by_me: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CommentRecord {
    pub id: u64,
    pub post_id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    pub author: UserRecord,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct StoryRecord {
    pub id: u64,
    pub author: UserRecord,
    pub media_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub viewed: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct GroupMemberRecord {
    pub user: UserRecord,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct GroupRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub members: Vec<GroupMemberRecord>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct GroupMessageRecord {
    pub id: u64,
    pub group_id: u64,
    pub sender: UserRecord,
    /// Plain text, or the deletion sentinel.
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct DirectMessageRecord {
    pub id: u64,
    pub sender: UserRecord,
    pub recipient_id: u64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct GoalRecord {
    pub id: u64,
    pub category: GoalCategory,
    pub metric: GoalMetric,
    pub current_value: f64,
    pub target_value: f64,
    #[serde(default)]
    pub end_date: Option<Date>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct UserPageRecord {
    pub users: Vec<UserRecord>,
    pub total: u32,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct UploadRecord {
    pub url: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            handle: UserHandle::new(value.username)?,
            avatar_url: value.avatar_url,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            author: value.author.try_into()?,
            body: value.content,
            image_urls: value.images,
            created_at: value.created_at,
            like_count: value.likes_count,
            comment_count: value.comments_count,
            viewer: ViewerState {
                liked: value.liked_by_me,
                saved: value.saved_by_me,
            },
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            post_id: Id::from_server(value.post_id)?,
            parent_id: value.parent_id.map(Id::from_server).transpose()?,
            author: value.author.try_into()?,
            body: value.content,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<StoryRecord> for Story {
    type Error = ModelValidationError;

    fn try_from(value: StoryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            author: value.author.try_into()?,
            media_url: value.media_url,
            created_at: value.created_at,
            viewed: value.viewed,
        })
    }
}

impl TryFrom<GroupRecord> for Group {
    type Error = ModelValidationError;

    fn try_from(value: GroupRecord) -> Result<Self, Self::Error> {
        let members = value
            .members
            .into_iter()
            .map(|member| {
                Ok(GroupMember {
                    user: member.user.try_into()?,
                    is_admin: member.is_admin,
                })
            })
            .collect::<Result<_, ModelValidationError>>()?;

        Ok(Self {
            id: Id::from_server(value.id)?,
            name: value.name,
            description: value.description,
            image_url: value.image_url,
            members,
        })
    }
}

impl TryFrom<GroupMessageRecord> for GroupMessage {
    type Error = ModelValidationError;

    fn try_from(value: GroupMessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            group_id: Id::from_server(value.group_id)?,
            sender: value.sender.try_into()?,
            content: MessageContent::from_wire(value.content),
            created_at: value.created_at,
        })
    }
}

impl TryFrom<DirectMessageRecord> for DirectMessage {
    type Error = ModelValidationError;

    fn try_from(value: DirectMessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            sender: value.sender.try_into()?,
            recipient: Id::from_server(value.recipient_id)?,
            content: MessageContent::from_wire(value.content),
            created_at: value.created_at,
        })
    }
}

impl TryFrom<GoalRecord> for Goal {
    type Error = ModelValidationError;

    fn try_from(value: GoalRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_server(value.id)?,
            category: value.category,
            metric: value.metric,
            current: validate_current(value.current_value)?,
            target: validate_target(value.target_value)?,
            end_date: value.end_date,
        })
    }
}

impl TryFrom<UserPageRecord> for Page<User> {
    type Error = ModelValidationError;

    fn try_from(value: UserPageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            items: convert_all(value.users)?,
            total: value.total,
        })
    }
}

pub(crate) fn convert_all<R, M>(records: Vec<R>) -> Result<Vec<M>, ModelValidationError>
where
    M: TryFrom<R, Error = ModelValidationError>,
{
    records.into_iter().map(M::try_from).collect()
}
