use crate::model::{Id, user::User};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub body: String,
    pub image_urls: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: u32,
    pub comment_count: u32,
    pub viewer: ViewerState,
}

/// How the signed-in user relates to a post.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct ViewerState {
    pub liked: bool,
    pub saved: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreatePost {
    pub body: String,
    pub image_urls: Vec<String>,
}

impl Post {
    /// Flips the like flag, moving the count by exactly one in the matching direction.
    ///
    /// Returns the new like state.
    pub fn toggle_like(&mut self) -> bool {
        self.viewer.liked = !self.viewer.liked;
        if self.viewer.liked {
            self.like_count = self.like_count.saturating_add(1);
        } else {
            self.like_count = self.like_count.saturating_sub(1);
        }
        self.viewer.liked
    }

    pub fn toggle_save(&mut self) -> bool {
        self.viewer.saved = !self.viewer.saved;
        self.viewer.saved
    }

    pub fn record_comment_added(&mut self) {
        self.comment_count = self.comment_count.saturating_add(1);
    }

    pub fn record_comment_removed(&mut self) {
        self.comment_count = self.comment_count.saturating_sub(1);
    }
}
