use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct StoryMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Story {
    pub id: Id<StoryMarker>,
    pub author: User,
    pub media_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub viewed: bool,
}

/// All stories of one author, in listing order.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StoryGroup {
    pub author: User,
    pub stories: Vec<Story>,
}

impl StoryGroup {
    #[must_use]
    pub fn author_id(&self) -> Id<UserMarker> {
        self.author.id
    }

    #[must_use]
    pub fn has_unviewed(&self) -> bool {
        self.stories.iter().any(|story| !story.viewed)
    }
}

/// Groups stories by author, ordering groups by each author's first appearance.
#[must_use]
pub fn group_stories(stories: Vec<Story>) -> Vec<StoryGroup> {
    let mut groups: Vec<StoryGroup> = Vec::new();

    for story in stories {
        match groups
            .iter_mut()
            .find(|group| group.author.id == story.author.id)
        {
            Some(group) => group.stories.push(story),
            None => groups.push(StoryGroup {
                author: story.author.clone(),
                stories: vec![story],
            }),
        }
    }

    groups
}
