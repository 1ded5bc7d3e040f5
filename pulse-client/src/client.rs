use crate::{
    endpoint::{Endpoint, Resource},
    error::{ApiError, Result},
    record::{
        CommentRecord, DirectMessageRecord, GoalRecord, GroupMessageRecord, GroupRecord,
        PostRecord, StoryRecord, UploadRecord, UserPageRecord, convert_all,
    },
};
use pulse_common::{
    hashtag::TrendingTag,
    identity::CurrentIdentity,
    model::{
        Id, ModelValidationError,
        comment::{Comment, CreateComment},
        goal::{CreateGoal, Goal, GoalMarker},
        group::{DirectMessage, GroupMarker, GroupMessage, MessageMarker},
        post::{CreatePost, Post, PostMarker},
        story::StoryMarker,
        user::UserMarker,
    },
    nutrition::MacroTargets,
};
use pulse_sync::Fetcher;
use reqwest::{Method, RequestBuilder, Response, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// How requests prove who is signed in.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `Authorization: Bearer` with the token of the current identity.
    #[default]
    Bearer,
    /// Same-origin session cookies kept in the client's cookie jar.
    Cookie,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_mode: AuthMode,
    /// No timeout when unset.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_mode: AuthMode::default(),
            timeout: None,
        }
    }
}

/// The REST/JSON boundary. Every response is validated into a model before
/// it is returned.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_mode: AuthMode,
    identity: CurrentIdentity,
}

impl ApiClient {
    pub fn new(config: ClientConfig, identity: CurrentIdentity) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.auth_mode == AuthMode::Cookie {
            builder = builder.cookie_store(true);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            auth_mode: config.auth_mode,
            identity,
        })
    }

    #[must_use]
    pub fn identity(&self) -> &CurrentIdentity {
        &self.identity
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, format!("{}{path}", self.base_url));
        match (self.auth_mode, self.identity.token()) {
            (AuthMode::Bearer, Some(token)) => request.bearer_auth(token.as_str()),
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let response = request.send().await.map_err(ApiError::Offline)?;
        let status = response.status();
        debug!(%status, path, "response");
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(status, path))
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T> {
        let body = self
            .send(request, path)
            .await?
            .bytes()
            .await
            .map_err(ApiError::Offline)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, u32)]) -> Result<T> {
        let request = self.request(Method::GET, path).query(query);
        self.send_json(request, path).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        self.send_json(request, path).await
    }

    async fn post_empty<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.request(Method::POST, path).json(body);
        self.send(request, path).await.map(drop)
    }

    async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, path).json(body);
        self.send_json(request, path).await
    }

    async fn delete<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<()> {
        let mut request = self.request(Method::DELETE, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, path).await.map(drop)
    }

    async fn get_all<R, M>(&self, path: &str) -> Result<Vec<M>>
    where
        R: DeserializeOwned,
        M: TryFrom<R, Error = ModelValidationError>,
    {
        let records: Vec<R> = self.get(path, &[]).await?;
        Ok(convert_all(records)?)
    }

    /// Fetches and validates the body behind `endpoint`.
    pub async fn load(&self, endpoint: &Endpoint) -> Result<Resource> {
        let path = endpoint.path();
        let resource = match endpoint {
            Endpoint::Feed => Resource::Feed(self.get_all::<PostRecord, _>(&path).await?),
            Endpoint::Post(_) => {
                let record: PostRecord = self.get(&path, &[]).await?;
                Resource::Post(record.try_into()?)
            }
            Endpoint::Comments(_) => {
                Resource::Comments(self.get_all::<CommentRecord, _>(&path).await?)
            }
            Endpoint::Stories => Resource::Stories(self.get_all::<StoryRecord, _>(&path).await?),
            Endpoint::TrendingTags => {
                Resource::TrendingTags(self.get::<Vec<TrendingTag>>(&path, &[]).await?)
            }
            Endpoint::Group(_) => {
                let record: GroupRecord = self.get(&path, &[]).await?;
                Resource::Group(record.try_into()?)
            }
            Endpoint::GroupMessages(_) => {
                Resource::GroupMessages(self.get_all::<GroupMessageRecord, _>(&path).await?)
            }
            Endpoint::DirectMessages(_) => {
                Resource::DirectMessages(self.get_all::<DirectMessageRecord, _>(&path).await?)
            }
            Endpoint::Goals => Resource::Goals(self.get_all::<GoalRecord, _>(&path).await?),
            Endpoint::AdminUsers { .. } => {
                let record: UserPageRecord = self.get(&path, &endpoint.query()).await?;
                Resource::AdminUsers(record.try_into()?)
            }
        };
        Ok(resource)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let body = json!({ "content": post.body, "images": post.image_urls });
        let record: PostRecord = self.post(&Endpoint::Feed.path(), &body).await?;
        Ok(record.try_into()?)
    }

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        comment: &CreateComment,
    ) -> Result<Comment> {
        let body = json!({ "content": comment.body, "parent_id": comment.parent_id });
        let record: CommentRecord = self
            .post(&Endpoint::Comments(post_id).path(), &body)
            .await?;
        Ok(record.try_into()?)
    }

    pub async fn set_liked(&self, post_id: Id<PostMarker>, liked: bool) -> Result<()> {
        let path = format!("{}/like", Endpoint::Post(post_id).path());
        self.post_empty(&path, &json!({ "liked": liked })).await
    }

    pub async fn set_saved(&self, post_id: Id<PostMarker>, saved: bool) -> Result<()> {
        let path = format!("{}/save", Endpoint::Post(post_id).path());
        self.post_empty(&path, &json!({ "saved": saved })).await
    }

    pub async fn send_group_message(
        &self,
        group_id: Id<GroupMarker>,
        content: &str,
    ) -> Result<GroupMessage> {
        let record: GroupMessageRecord = self
            .post(
                &Endpoint::GroupMessages(group_id).path(),
                &json!({ "content": content }),
            )
            .await?;
        Ok(record.try_into()?)
    }

    /// The server keeps the row and replaces its content with the deletion sentinel.
    pub async fn delete_group_message(
        &self,
        group_id: Id<GroupMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<()> {
        let path = format!("{}/{message_id}", Endpoint::GroupMessages(group_id).path());
        self.delete::<()>(&path, None).await
    }

    pub async fn send_direct_message(
        &self,
        recipient: Id<UserMarker>,
        content: &str,
    ) -> Result<DirectMessage> {
        let record: DirectMessageRecord = self
            .post(
                &Endpoint::DirectMessages(recipient).path(),
                &json!({ "content": content }),
            )
            .await?;
        Ok(record.try_into()?)
    }

    pub async fn mark_story_viewed(&self, story_id: Id<StoryMarker>) -> Result<()> {
        let path = format!("{}/{story_id}/view", Endpoint::Stories.path());
        self.post_empty(&path, &json!({})).await
    }

    /// Uploads one file and returns the URL it is served from.
    pub async fn upload(&self, file_name: &str, mime: &str, bytes: Vec<u8>) -> Result<String> {
        let path = "/api/upload";
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(mime)
            .map_err(|err| ApiError::Validation(format!("Invalid file type {mime}: {err}")))?;
        let form = multipart::Form::new().part("file", part);

        let request = self.request(Method::POST, path).multipart(form);
        let record: UploadRecord = self.send_json(request, path).await?;
        Ok(record.url)
    }

    pub async fn create_goal(&self, goal: &CreateGoal) -> Result<Goal> {
        let body = json!({
            "category": goal.category,
            "metric": goal.metric,
            "target_value": goal.target,
            "end_date": goal.end_date,
        });
        let record: GoalRecord = self.post(&Endpoint::Goals.path(), &body).await?;
        Ok(record.try_into()?)
    }

    pub async fn update_goal_progress(
        &self,
        goal_id: Id<GoalMarker>,
        current: f64,
    ) -> Result<Goal> {
        let path = format!("{}/{goal_id}", Endpoint::Goals.path());
        let record: GoalRecord = self
            .patch(&path, &json!({ "current_value": current }))
            .await?;
        Ok(record.try_into()?)
    }

    pub async fn delete_goals(&self, ids: &[Id<GoalMarker>]) -> Result<()> {
        self.delete(&Endpoint::Goals.path(), Some(&json!({ "ids": ids })))
            .await
    }

    pub async fn delete_users(&self, ids: &[Id<UserMarker>]) -> Result<()> {
        self.delete(
            &Endpoint::AdminUsers { page: 1 }.path(),
            Some(&json!({ "ids": ids })),
        )
        .await
    }

    pub async fn save_nutrition_targets(&self, targets: &MacroTargets) -> Result<()> {
        self.post_empty("/api/nutrition/targets", targets).await
    }
}

impl Fetcher for ApiClient {
    type Key = Endpoint;
    type Value = Resource;
    type Error = ApiError;

    fn fetch(&self, key: &Endpoint) -> impl Future<Output = Result<Resource>> + Send {
        self.load(key)
    }
}
