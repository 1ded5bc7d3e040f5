use pulse_common::{
    hashtag::TrendingTag,
    model::{
        Id,
        comment::Comment,
        goal::Goal,
        group::{DirectMessage, Group, GroupMarker, GroupMessage},
        post::{Post, PostMarker},
        story::Story,
        user::{User, UserMarker},
    },
    pagination::{ADMIN_PAGE_SIZE, Page, Pagination},
};
use std::fmt::Display;

/// A cacheable GET request. Two equal endpoints always hit the same URL.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Endpoint {
    Feed,
    Post(Id<PostMarker>),
    Comments(Id<PostMarker>),
    Stories,
    TrendingTags,
    Group(Id<GroupMarker>),
    GroupMessages(Id<GroupMarker>),
    /// The conversation with one other user.
    DirectMessages(Id<UserMarker>),
    Goals,
    /// 1-based page of the admin user listing.
    AdminUsers { page: u32 },
}

impl Endpoint {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Endpoint::Feed => "/api/community/posts".to_owned(),
            Endpoint::Post(id) => format!("/api/community/posts/{id}"),
            Endpoint::Comments(id) => format!("/api/community/posts/{id}/comments"),
            Endpoint::Stories => "/api/community/stories".to_owned(),
            Endpoint::TrendingTags => "/api/community/hashtags/trending".to_owned(),
            Endpoint::Group(id) => format!("/api/community/groups/{id}"),
            Endpoint::GroupMessages(id) => format!("/api/community/groups/{id}/messages"),
            Endpoint::DirectMessages(id) => format!("/api/community/messages/{id}"),
            Endpoint::Goals => "/api/goals".to_owned(),
            Endpoint::AdminUsers { .. } => "/api/admin/users".to_owned(),
        }
    }

    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, u32)> {
        match self {
            Endpoint::AdminUsers { page } => {
                let pagination = Pagination::new(*page, ADMIN_PAGE_SIZE, u32::MAX);
                vec![
                    ("limit", pagination.limit()),
                    ("offset", pagination.offset()),
                ]
            }
            _ => Vec::new(),
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())?;
        for (index, (name, value)) in self.query().into_iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(f, "{separator}{name}={value}")?;
        }
        Ok(())
    }
}

/// Validated response body of an [`Endpoint`].
#[derive(Clone, PartialEq, Debug)]
pub enum Resource {
    Feed(Vec<Post>),
    Post(Post),
    Comments(Vec<Comment>),
    Stories(Vec<Story>),
    TrendingTags(Vec<TrendingTag>),
    Group(Group),
    GroupMessages(Vec<GroupMessage>),
    DirectMessages(Vec<DirectMessage>),
    Goals(Vec<Goal>),
    AdminUsers(Page<User>),
}

impl Resource {
    /// Every cached post in this resource, for patches that must reach
    /// both the feed and a post's detail entry.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        match self {
            Resource::Feed(posts) => posts,
            Resource::Post(post) => std::slice::from_ref(post),
            _ => &[],
        }
    }

    pub fn posts_mut(&mut self) -> &mut [Post] {
        match self {
            Resource::Feed(posts) => posts,
            Resource::Post(post) => std::slice::from_mut(post),
            _ => &mut [],
        }
    }

    pub fn post_mut(&mut self, id: Id<PostMarker>) -> Option<&mut Post> {
        self.posts_mut().iter_mut().find(|post| post.id == id)
    }

    #[must_use]
    pub fn feed(&self) -> Option<&[Post]> {
        match self {
            Resource::Feed(posts) => Some(posts),
            _ => None,
        }
    }

    pub fn feed_mut(&mut self) -> Option<&mut Vec<Post>> {
        match self {
            Resource::Feed(posts) => Some(posts),
            _ => None,
        }
    }

    #[must_use]
    pub fn post(&self) -> Option<&Post> {
        match self {
            Resource::Post(post) => Some(post),
            _ => None,
        }
    }

    #[must_use]
    pub fn comments(&self) -> Option<&[Comment]> {
        match self {
            Resource::Comments(comments) => Some(comments),
            _ => None,
        }
    }

    pub fn comments_mut(&mut self) -> Option<&mut Vec<Comment>> {
        match self {
            Resource::Comments(comments) => Some(comments),
            _ => None,
        }
    }

    #[must_use]
    pub fn stories(&self) -> Option<&[Story]> {
        match self {
            Resource::Stories(stories) => Some(stories),
            _ => None,
        }
    }

    pub fn stories_mut(&mut self) -> Option<&mut Vec<Story>> {
        match self {
            Resource::Stories(stories) => Some(stories),
            _ => None,
        }
    }

    #[must_use]
    pub fn trending_tags(&self) -> Option<&[TrendingTag]> {
        match self {
            Resource::TrendingTags(tags) => Some(tags),
            _ => None,
        }
    }

    #[must_use]
    pub fn group(&self) -> Option<&Group> {
        match self {
            Resource::Group(group) => Some(group),
            _ => None,
        }
    }

    #[must_use]
    pub fn group_messages(&self) -> Option<&[GroupMessage]> {
        match self {
            Resource::GroupMessages(messages) => Some(messages),
            _ => None,
        }
    }

    pub fn group_messages_mut(&mut self) -> Option<&mut Vec<GroupMessage>> {
        match self {
            Resource::GroupMessages(messages) => Some(messages),
            _ => None,
        }
    }

    #[must_use]
    pub fn direct_messages(&self) -> Option<&[DirectMessage]> {
        match self {
            Resource::DirectMessages(messages) => Some(messages),
            _ => None,
        }
    }

    pub fn direct_messages_mut(&mut self) -> Option<&mut Vec<DirectMessage>> {
        match self {
            Resource::DirectMessages(messages) => Some(messages),
            _ => None,
        }
    }

    #[must_use]
    pub fn goals(&self) -> Option<&[Goal]> {
        match self {
            Resource::Goals(goals) => Some(goals),
            _ => None,
        }
    }

    pub fn goals_mut(&mut self) -> Option<&mut Vec<Goal>> {
        match self {
            Resource::Goals(goals) => Some(goals),
            _ => None,
        }
    }

    #[must_use]
    pub fn admin_users(&self) -> Option<&Page<User>> {
        match self {
            Resource::AdminUsers(page) => Some(page),
            _ => None,
        }
    }

    pub fn admin_users_mut(&mut self) -> Option<&mut Page<User>> {
        match self {
            Resource::AdminUsers(page) => Some(page),
            _ => None,
        }
    }
}
