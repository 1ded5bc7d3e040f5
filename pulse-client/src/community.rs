use crate::{
    client::ApiClient,
    endpoint::{Endpoint, Resource},
    error::{ApiError, ErrorKind, Result},
};
use parking_lot::Mutex;
use pulse_common::{
    model::{
        Id,
        comment::{Comment, CreateComment},
        group::{
            DirectMessage, GroupMarker, GroupMessage, MessageContent, MessageMarker, soft_delete,
        },
        post::{CreatePost, Post, PostMarker, ViewerState},
        story::StoryMarker,
        user::{User, UserMarker},
    },
    provisional::ProvisionalIdGenerator,
};
use pulse_sync::{FailurePolicy, SyncStore};
use time::OffsetDateTime;
use tokio::sync::broadcast;

const NOTICE_CAPACITY: usize = 16;

/// A failed user action, for views to surface as a transient message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

/// Social actions that show their effect before the server confirms them.
///
/// Each action patches every cached view of the data it touches, sends the
/// request, and then revalidates those views. A failure is returned to the
/// caller and also broadcast as a [`Notice`].
#[derive(Debug)]
pub struct Community {
    store: SyncStore<ApiClient>,
    ids: Mutex<ProvisionalIdGenerator>,
    notices: broadcast::Sender<Notice>,
    policy: FailurePolicy,
}

impl Community {
    #[must_use]
    pub fn new(store: SyncStore<ApiClient>) -> Self {
        Self::with_failure_policy(store, FailurePolicy::default())
    }

    #[must_use]
    pub fn with_failure_policy(store: SyncStore<ApiClient>, policy: FailurePolicy) -> Self {
        Self {
            store,
            ids: Mutex::new(ProvisionalIdGenerator::new()),
            notices: broadcast::channel(NOTICE_CAPACITY).0,
            policy,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SyncStore<ApiClient> {
        &self.store
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn client(&self) -> &ApiClient {
        self.store.fetcher()
    }

    /// The signed-in user as they appear on records they create.
    fn author(&self) -> Result<User> {
        let identity = self.client().identity().get().ok_or(ApiError::NotSignedIn)?;
        Ok(User {
            id: identity.user_id,
            handle: identity.handle.unwrap_or_default(),
            avatar_url: None,
        })
    }

    fn report<T>(&self, action: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            // Nobody listening is fine.
            let _ = self.notices.send(Notice {
                kind: err.kind(),
                message: format!("Couldn't {action}: {err}"),
            });
        }
        result
    }

    fn cached_post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        [Endpoint::Post(post_id), Endpoint::Feed]
            .iter()
            .filter_map(|key| self.store.get(key).value)
            .find_map(|resource| resource.posts().iter().find(|p| p.id == post_id).cloned())
    }

    pub async fn create_post(&self, post: CreatePost) -> Result<Post> {
        let result = self.try_create_post(post).await;
        self.report("publish post", result)
    }

    async fn try_create_post(&self, post: CreatePost) -> Result<Post> {
        let body = post.body.trim();
        if body.is_empty() && post.image_urls.is_empty() {
            return Err(ApiError::Validation(
                "A post needs text or an image".to_owned(),
            ));
        }
        let post = CreatePost {
            body: body.to_owned(),
            image_urls: post.image_urls,
        };

        let provisional = Post {
            id: self.ids.lock().generate(),
            author: self.author()?,
            body: post.body.clone(),
            image_urls: post.image_urls.clone(),
            created_at: OffsetDateTime::now_utc(),
            like_count: 0,
            comment_count: 0,
            viewer: ViewerState::default(),
        };
        let provisional_id = provisional.id;

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(
                Endpoint::Feed,
                move |resource| {
                    if let Some(feed) = resource.feed_mut() {
                        feed.insert(0, provisional);
                    }
                },
                move |resource| {
                    if let Some(feed) = resource.feed_mut() {
                        feed.retain(|post| post.id != provisional_id);
                    }
                },
            )
            .run(self.client().create_post(&post))
            .await
    }

    /// Adds a comment and bumps the post's comment count by one wherever the
    /// post is cached.
    pub async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        comment: CreateComment,
    ) -> Result<Comment> {
        let result = self.try_add_comment(post_id, comment).await;
        self.report("add comment", result)
    }

    async fn try_add_comment(
        &self,
        post_id: Id<PostMarker>,
        comment: CreateComment,
    ) -> Result<Comment> {
        let body = comment.body.trim();
        if body.is_empty() {
            return Err(ApiError::Validation("Comment cannot be empty".to_owned()));
        }
        let comment = CreateComment {
            body: body.to_owned(),
            parent_id: comment.parent_id,
        };

        let provisional = Comment {
            id: self.ids.lock().generate(),
            post_id,
            parent_id: comment.parent_id,
            author: self.author()?,
            body: comment.body.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let provisional_id = provisional.id;

        let mut optimistic = self.store.optimistic().policy(self.policy).patch(
            Endpoint::Comments(post_id),
            move |resource| {
                if let Some(comments) = resource.comments_mut() {
                    comments.push(provisional);
                }
            },
            move |resource| {
                if let Some(comments) = resource.comments_mut() {
                    comments.retain(|comment| comment.id != provisional_id);
                }
            },
        );
        for key in [Endpoint::Feed, Endpoint::Post(post_id)] {
            optimistic = optimistic.patch(
                key,
                |resource| update_post(resource, post_id, Post::record_comment_added),
                move |resource| update_post(resource, post_id, Post::record_comment_removed),
            );
        }

        optimistic
            .run(self.client().create_comment(post_id, &comment))
            .await
    }

    /// Flips the viewer's like on a cached post. Returns the new like state.
    pub async fn toggle_like(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = self.try_toggle_like(post_id).await;
        self.report("update like", result)
    }

    async fn try_toggle_like(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let post = self
            .cached_post(post_id)
            .ok_or_else(|| ApiError::Validation("The post is not loaded".to_owned()))?;
        let liked = !post.viewer.liked;

        let set_to = move |target: bool| {
            move |resource: &mut Resource| {
                update_post(resource, post_id, |post| {
                    if post.viewer.liked != target {
                        post.toggle_like();
                    }
                });
            }
        };

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(Endpoint::Feed, set_to(liked), set_to(!liked))
            .patch(Endpoint::Post(post_id), set_to(liked), set_to(!liked))
            .run(self.client().set_liked(post_id, liked))
            .await?;
        Ok(liked)
    }

    /// Flips the viewer's bookmark on a cached post. Returns the new save state.
    pub async fn toggle_save(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = self.try_toggle_save(post_id).await;
        self.report("update bookmark", result)
    }

    async fn try_toggle_save(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let post = self
            .cached_post(post_id)
            .ok_or_else(|| ApiError::Validation("The post is not loaded".to_owned()))?;
        let saved = !post.viewer.saved;

        let set_to = move |target: bool| {
            move |resource: &mut Resource| {
                update_post(resource, post_id, |post| post.viewer.saved = target);
            }
        };

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(Endpoint::Feed, set_to(saved), set_to(!saved))
            .patch(Endpoint::Post(post_id), set_to(saved), set_to(!saved))
            .run(self.client().set_saved(post_id, saved))
            .await?;
        Ok(saved)
    }

    pub async fn send_group_message(
        &self,
        group_id: Id<GroupMarker>,
        text: &str,
    ) -> Result<GroupMessage> {
        let result = self.try_send_group_message(group_id, text).await;
        self.report("send message", result)
    }

    async fn try_send_group_message(
        &self,
        group_id: Id<GroupMarker>,
        text: &str,
    ) -> Result<GroupMessage> {
        let text = message_text(text)?;
        let provisional = GroupMessage {
            id: self.ids.lock().generate(),
            group_id,
            sender: self.author()?,
            content: MessageContent::Text(text.to_owned()),
            created_at: OffsetDateTime::now_utc(),
        };
        let provisional_id = provisional.id;

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(
                Endpoint::GroupMessages(group_id),
                move |resource| {
                    if let Some(messages) = resource.group_messages_mut() {
                        messages.push(provisional);
                    }
                },
                move |resource| {
                    if let Some(messages) = resource.group_messages_mut() {
                        messages.retain(|message| message.id != provisional_id);
                    }
                },
            )
            .run(self.client().send_group_message(group_id, text))
            .await
    }

    /// Soft-deletes a message: it stays in the conversation and renders as
    /// the deletion placeholder for everyone.
    pub async fn delete_group_message(
        &self,
        group_id: Id<GroupMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<()> {
        let result = self.try_delete_group_message(group_id, message_id).await;
        self.report("delete message", result)
    }

    async fn try_delete_group_message(
        &self,
        group_id: Id<GroupMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<()> {
        if message_id.is_provisional() {
            return Err(ApiError::Validation(
                "The message is still sending".to_owned(),
            ));
        }

        let key = Endpoint::GroupMessages(group_id);
        let original = self.store.get(&key).value.and_then(|resource| {
            resource
                .group_messages()?
                .iter()
                .find(|message| message.id == message_id)
                .map(|message| message.content.clone())
        });

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(
                key,
                move |resource| {
                    if let Some(messages) = resource.group_messages_mut() {
                        soft_delete(messages, message_id);
                    }
                },
                move |resource| {
                    let message = resource
                        .group_messages_mut()
                        .and_then(|messages| messages.iter_mut().find(|m| m.id == message_id));
                    if let (Some(message), Some(original)) = (message, original) {
                        message.content = original;
                    }
                },
            )
            .run(self.client().delete_group_message(group_id, message_id))
            .await
    }

    pub async fn send_direct_message(
        &self,
        recipient: Id<UserMarker>,
        text: &str,
    ) -> Result<DirectMessage> {
        let result = self.try_send_direct_message(recipient, text).await;
        self.report("send message", result)
    }

    async fn try_send_direct_message(
        &self,
        recipient: Id<UserMarker>,
        text: &str,
    ) -> Result<DirectMessage> {
        let text = message_text(text)?;
        let provisional = DirectMessage {
            id: self.ids.lock().generate(),
            sender: self.author()?,
            recipient,
            content: MessageContent::Text(text.to_owned()),
            created_at: OffsetDateTime::now_utc(),
        };
        let provisional_id = provisional.id;

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(
                Endpoint::DirectMessages(recipient),
                move |resource| {
                    if let Some(messages) = resource.direct_messages_mut() {
                        messages.push(provisional);
                    }
                },
                move |resource| {
                    if let Some(messages) = resource.direct_messages_mut() {
                        messages.retain(|message| message.id != provisional_id);
                    }
                },
            )
            .run(self.client().send_direct_message(recipient, text))
            .await
    }

    pub async fn mark_story_viewed(&self, story_id: Id<StoryMarker>) -> Result<()> {
        let set_to = move |viewed: bool| {
            move |resource: &mut Resource| {
                let story = resource
                    .stories_mut()
                    .and_then(|stories| stories.iter_mut().find(|story| story.id == story_id));
                if let Some(story) = story {
                    story.viewed = viewed;
                }
            }
        };

        let result = self
            .store
            .optimistic()
            .policy(self.policy)
            .patch(Endpoint::Stories, set_to(true), set_to(false))
            .run(self.client().mark_story_viewed(story_id))
            .await;
        self.report("mark story as seen", result)
    }

    /// Uploads an image for a post or avatar and returns its URL.
    pub async fn upload_image(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let result = self.client().upload(file_name, mime, bytes).await;
        self.report("upload image", result)
    }
}

fn update_post(
    resource: &mut Resource,
    post_id: Id<PostMarker>,
    update: impl FnOnce(&mut Post),
) {
    if let Some(post) = resource.post_mut(post_id) {
        update(post);
    }
}

fn message_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        Err(ApiError::Validation("Message cannot be empty".to_owned()))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::community::message_text;

    #[test]
    fn blank_messages_are_rejected() {
        assert!(message_text("   \n").is_err());
        assert_eq!(message_text("  on my way ").unwrap(), "on my way");
    }
}
