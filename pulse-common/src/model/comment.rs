use crate::model::{Id, post::PostMarker, user::User};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub parent_id: Option<Id<CommentMarker>>,
    pub author: User,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateComment {
    pub body: String,
    pub parent_id: Option<Id<CommentMarker>>,
}

/// A top-level comment and its replies.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CommentThread<'a> {
    pub root: &'a Comment,
    pub replies: Vec<&'a Comment>,
}

/// Groups comments into one level of threading, keeping the input order.
///
/// Replies to replies are attached to the root of their chain. A reply whose
/// parent is not in the list is shown as a top-level comment, and so is any
/// comment whose chain of parents loops back on itself.
#[must_use]
pub fn thread_comments(comments: &[Comment]) -> Vec<CommentThread<'_>> {
    let by_id: HashMap<_, _> = comments.iter().map(|c| (c.id, c)).collect();

    let root_of = |comment: &Comment| {
        let mut seen = HashSet::new();
        let mut current = comment;
        while let Some(parent) = current.parent_id.and_then(|id| by_id.get(&id).copied()) {
            if !seen.insert(current.id) {
                return comment.id;
            }
            current = parent;
        }
        current.id
    };

    let mut threads: Vec<CommentThread<'_>> = Vec::new();
    let mut thread_index = HashMap::new();

    for comment in comments {
        let root = root_of(comment);
        if root == comment.id {
            thread_index.insert(comment.id, threads.len());
            threads.push(CommentThread {
                root: comment,
                replies: Vec::new(),
            });
        }
    }

    for comment in comments {
        let root = root_of(comment);
        if root != comment.id {
            if let Some(&index) = thread_index.get(&root) {
                threads[index].replies.push(comment);
            }
        }
    }

    threads
}
