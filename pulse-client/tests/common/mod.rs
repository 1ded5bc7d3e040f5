//! An in-process stand-in for the REST backend.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{delete, get, patch, post},
};
use parking_lot::Mutex;
use pulse_client::{
    ApiClient, ClientConfig, Endpoint, Resource,
    record::{
        CommentRecord, DirectMessageRecord, GoalRecord, GroupMessageRecord, PostRecord,
        StoryRecord, UploadRecord, UserPageRecord, UserRecord,
    },
};
use pulse_common::{
    identity::{AccessToken, CurrentIdentity, Identity},
    model::goal::{GoalCategory, GoalMetric},
    nutrition::MacroTargets,
};
use pulse_sync::SyncStore;
use serde::Deserialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use time::{Date, OffsetDateTime, macros::datetime};
use tokio::{net::TcpListener, sync::Notify};

/// Signed for user 7, handle `tester`.
pub const TOKEN: &str = concat!(
    "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.",
    "eyJzdWIiOiI3IiwidXNlcm5hbWUiOiJ0ZXN0ZXIifQ.",
    "c2lnbmF0dXJl"
);
pub const GROUP_ID: u64 = 3;
const CREATED_AT: OffsetDateTime = datetime!(2025-03-01 08:30 UTC);

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Default)]
pub struct Backend {
    pub posts: Mutex<Vec<PostRecord>>,
    pub comments: Mutex<Vec<CommentRecord>>,
    pub messages: Mutex<Vec<GroupMessageRecord>>,
    pub direct_messages: Mutex<Vec<DirectMessageRecord>>,
    pub stories: Mutex<Vec<StoryRecord>>,
    pub users: Mutex<Vec<UserRecord>>,
    pub goals: Mutex<Vec<GoalRecord>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub nutrition_targets: Mutex<Option<MacroTargets>>,
    pub viewed: Mutex<Vec<u64>>,
    /// While set, creating or editing records waits for `release_writes`.
    pub hold_writes: AtomicBool,
    pub release_writes: Notify,
    /// While set, every write answers 500.
    pub fail_writes: AtomicBool,
    next_id: AtomicU64,
}

pub fn goal(id: u64, metric: GoalMetric, current: f64, target: f64) -> GoalRecord {
    GoalRecord {
        id,
        category: GoalCategory::Weekly,
        metric,
        current_value: current,
        target_value: target,
        end_date: None,
    }
}

pub fn user(id: u64, username: &str) -> UserRecord {
    UserRecord {
        id,
        username: username.to_owned(),
        avatar_url: None,
    }
}

impl Backend {
    pub fn seeded() -> Arc<Self> {
        let backend = Self {
            next_id: AtomicU64::new(1000),
            ..Self::default()
        };

        *backend.posts.lock() = vec![
            PostRecord {
                id: 1,
                author: user(1, "coach"),
                content: "Deadlift PR today #strength".to_owned(),
                images: Vec::new(),
                created_at: CREATED_AT,
                likes_count: 4,
                comments_count: 1,
                liked_by_me: false,
                saved_by_me: false,
            },
            PostRecord {
                id: 2,
                author: user(2, "runner"),
                content: "Morning 10k".to_owned(),
                images: vec!["https://cdn.example/run.jpg".to_owned()],
                created_at: CREATED_AT,
                likes_count: 0,
                comments_count: 0,
                liked_by_me: false,
                saved_by_me: false,
            },
        ];
        *backend.comments.lock() = vec![CommentRecord {
            id: 10,
            post_id: 1,
            parent_id: None,
            author: user(2, "runner"),
            content: "Huge!".to_owned(),
            created_at: CREATED_AT,
        }];
        *backend.messages.lock() = [(20, "Anyone up for a ride?"), (21, "Count me in")]
            .into_iter()
            .map(|(id, content)| GroupMessageRecord {
                id,
                group_id: GROUP_ID,
                sender: user(7, "tester"),
                content: content.to_owned(),
                created_at: CREATED_AT,
            })
            .collect();
        *backend.stories.lock() = [(30, 2), (31, 2), (32, 7)]
            .into_iter()
            .map(|(id, author)| StoryRecord {
                id,
                author: user(author, if author == 7 { "tester" } else { "runner" }),
                media_url: format!("https://cdn.example/story/{id}.jpg"),
                created_at: CREATED_AT,
                viewed: false,
            })
            .collect();
        *backend.users.lock() = (1..=40).map(|id| user(id, &format!("user{id}"))).collect();

        Arc::new(backend)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn wait_if_held(&self) {
        if self.hold_writes.load(Ordering::SeqCst) {
            self.release_writes.notified().await;
        }
    }

    fn check_write(&self) -> Result<(), StatusCode> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            Ok(())
        }
    }
}

type Shared = State<Arc<Backend>>;

#[derive(Deserialize)]
struct NewContent {
    content: String,
    #[serde(default)]
    parent_id: Option<u64>,
}

#[derive(Deserialize)]
struct NewPost {
    content: String,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
struct LikeBody {
    liked: bool,
}

#[derive(Deserialize)]
struct SaveBody {
    saved: bool,
}

#[derive(Deserialize)]
struct NewGoal {
    category: GoalCategory,
    metric: GoalMetric,
    target_value: f64,
    #[serde(default)]
    end_date: Option<Date>,
}

#[derive(Deserialize)]
struct ProgressBody {
    current_value: f64,
}

#[derive(Deserialize)]
struct PageQuery {
    limit: usize,
    offset: usize,
}

#[derive(Deserialize)]
struct IdList {
    ids: Vec<u64>,
}

async fn list_posts(State(backend): Shared) -> Json<Vec<PostRecord>> {
    Json(backend.posts.lock().clone())
}

async fn create_post(
    State(backend): Shared,
    Json(body): Json<NewPost>,
) -> Result<Json<PostRecord>, StatusCode> {
    backend.wait_if_held().await;
    backend.check_write()?;

    let post = PostRecord {
        id: backend.next_id(),
        author: user(7, "tester"),
        content: body.content,
        images: body.images,
        created_at: CREATED_AT,
        likes_count: 0,
        comments_count: 0,
        liked_by_me: false,
        saved_by_me: false,
    };
    backend.posts.lock().insert(0, post.clone());
    Ok(Json(post))
}

async fn get_post(
    State(backend): Shared,
    Path(id): Path<u64>,
) -> Result<Json<PostRecord>, StatusCode> {
    let posts = backend.posts.lock();
    let post = posts
        .iter()
        .find(|post| post.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(post.clone()))
}

async fn list_comments(State(backend): Shared, Path(id): Path<u64>) -> Json<Vec<CommentRecord>> {
    let comments = backend.comments.lock();
    Json(comments.iter().filter(|c| c.post_id == id).cloned().collect())
}

async fn create_comment(
    State(backend): Shared,
    Path(id): Path<u64>,
    Json(body): Json<NewContent>,
) -> Result<Json<CommentRecord>, StatusCode> {
    backend.wait_if_held().await;
    backend.check_write()?;

    let comment = CommentRecord {
        id: backend.next_id(),
        post_id: id,
        parent_id: body.parent_id,
        author: user(7, "tester"),
        content: body.content,
        created_at: CREATED_AT,
    };
    backend.comments.lock().push(comment.clone());
    if let Some(post) = backend.posts.lock().iter_mut().find(|post| post.id == id) {
        post.comments_count += 1;
    }
    Ok(Json(comment))
}

async fn set_like(
    State(backend): Shared,
    Path(id): Path<u64>,
    Json(body): Json<LikeBody>,
) -> Result<StatusCode, StatusCode> {
    backend.check_write()?;
    let mut posts = backend.posts.lock();
    let post = posts.iter_mut().find(|post| post.id == id).ok_or(StatusCode::NOT_FOUND)?;
    if post.liked_by_me != body.liked {
        post.liked_by_me = body.liked;
        if body.liked {
            post.likes_count += 1;
        } else {
            post.likes_count -= 1;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn set_save(
    State(backend): Shared,
    Path(id): Path<u64>,
    Json(body): Json<SaveBody>,
) -> Result<StatusCode, StatusCode> {
    backend.check_write()?;
    let mut posts = backend.posts.lock();
    let post = posts
        .iter_mut()
        .find(|post| post.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    post.saved_by_me = body.saved;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(State(backend): Shared) -> Json<Vec<GroupMessageRecord>> {
    Json(backend.messages.lock().clone())
}

async fn send_message(
    State(backend): Shared,
    Path(group_id): Path<u64>,
    Json(body): Json<NewContent>,
) -> Result<Json<GroupMessageRecord>, StatusCode> {
    backend.check_write()?;
    let message = GroupMessageRecord {
        id: backend.next_id(),
        group_id,
        sender: user(7, "tester"),
        content: body.content,
        created_at: CREATED_AT,
    };
    backend.messages.lock().push(message.clone());
    Ok(Json(message))
}

async fn delete_message(
    State(backend): Shared,
    Path((_, message_id)): Path<(u64, u64)>,
) -> Result<StatusCode, StatusCode> {
    backend.check_write()?;
    let mut messages = backend.messages.lock();
    let message = messages
        .iter_mut()
        .find(|message| message.id == message_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    "__deleted__".clone_into(&mut message.content);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_direct_messages(
    State(backend): Shared,
    Path(other): Path<u64>,
) -> Json<Vec<DirectMessageRecord>> {
    let messages = backend.direct_messages.lock();
    Json(
        messages
            .iter()
            .filter(|message| message.recipient_id == other || message.sender.id == other)
            .cloned()
            .collect(),
    )
}

async fn send_direct_message(
    State(backend): Shared,
    Path(recipient_id): Path<u64>,
    Json(body): Json<NewContent>,
) -> Result<Json<DirectMessageRecord>, StatusCode> {
    backend.wait_if_held().await;
    backend.check_write()?;
    let message = DirectMessageRecord {
        id: backend.next_id(),
        sender: user(7, "tester"),
        recipient_id,
        content: body.content,
        created_at: CREATED_AT,
    };
    backend.direct_messages.lock().push(message.clone());
    Ok(Json(message))
}

async fn list_stories(State(backend): Shared) -> Json<Vec<StoryRecord>> {
    Json(backend.stories.lock().clone())
}

async fn view_story(State(backend): Shared, Path(id): Path<u64>) -> StatusCode {
    backend.viewed.lock().push(id);
    if let Some(story) = backend.stories.lock().iter_mut().find(|story| story.id == id) {
        story.viewed = true;
    }
    StatusCode::NO_CONTENT
}

async fn list_goals(
    State(backend): Shared,
    headers: HeaderMap,
) -> Result<Json<Vec<GoalRecord>>, StatusCode> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get(AUTHORIZATION) {
        Some(value) if value.as_bytes() == expected.as_bytes() => {
            Ok(Json(backend.goals.lock().clone()))
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn create_goal(
    State(backend): Shared,
    Json(body): Json<NewGoal>,
) -> Result<Json<GoalRecord>, StatusCode> {
    backend.wait_if_held().await;
    backend.check_write()?;
    let goal = GoalRecord {
        id: backend.next_id(),
        category: body.category,
        metric: body.metric,
        current_value: 0.0,
        target_value: body.target_value,
        end_date: body.end_date,
    };
    backend.goals.lock().push(goal.clone());
    Ok(Json(goal))
}

/// Progress past the target is stored as the target.
async fn update_goal(
    State(backend): Shared,
    Path(id): Path<u64>,
    Json(body): Json<ProgressBody>,
) -> Result<Json<GoalRecord>, StatusCode> {
    backend.wait_if_held().await;
    backend.check_write()?;
    let mut goals = backend.goals.lock();
    let goal = goals
        .iter_mut()
        .find(|goal| goal.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    goal.current_value = body.current_value.min(goal.target_value);
    Ok(Json(goal.clone()))
}

async fn delete_goals(
    State(backend): Shared,
    Json(body): Json<IdList>,
) -> Result<StatusCode, StatusCode> {
    backend.check_write()?;
    backend.goals.lock().retain(|goal| !body.ids.contains(&goal.id));
    Ok(StatusCode::NO_CONTENT)
}

async fn upload(
    State(backend): Shared,
    mut multipart: Multipart,
) -> Result<Json<UploadRecord>, StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().ok_or(StatusCode::BAD_REQUEST)?.to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        backend.check_write()?;
        backend.uploads.lock().push(Upload {
            file_name: file_name.clone(),
            content_type,
            size: bytes.len(),
        });
        return Ok(Json(UploadRecord {
            url: format!("https://cdn.example/uploads/{file_name}"),
        }));
    }
    Err(StatusCode::BAD_REQUEST)
}

async fn save_nutrition_targets(
    State(backend): Shared,
    Json(targets): Json<MacroTargets>,
) -> Result<StatusCode, StatusCode> {
    backend.check_write()?;
    *backend.nutrition_targets.lock() = Some(targets);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(State(backend): Shared, Query(page): Query<PageQuery>) -> Json<UserPageRecord> {
    let users = backend.users.lock();
    Json(UserPageRecord {
        users: users.iter().skip(page.offset).take(page.limit).cloned().collect(),
        total: u32::try_from(users.len()).unwrap(),
    })
}

async fn delete_users(
    State(backend): Shared,
    Json(body): Json<IdList>,
) -> Result<StatusCode, StatusCode> {
    backend.check_write()?;
    backend.users.lock().retain(|user| !body.ids.contains(&user.id));
    Ok(StatusCode::NO_CONTENT)
}

fn router(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/api/community/posts", get(list_posts).post(create_post))
        .route("/api/community/posts/{id}", get(get_post))
        .route(
            "/api/community/posts/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/api/community/posts/{id}/like", post(set_like))
        .route("/api/community/posts/{id}/save", post(set_save))
        .route(
            "/api/community/groups/{id}/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/api/community/groups/{id}/messages/{message_id}",
            delete(delete_message),
        )
        .route(
            "/api/community/messages/{id}",
            get(list_direct_messages).post(send_direct_message),
        )
        .route("/api/community/stories", get(list_stories))
        .route("/api/community/stories/{id}/view", post(view_story))
        .route(
            "/api/goals",
            get(list_goals).post(create_goal).delete(delete_goals),
        )
        .route("/api/goals/{id}", patch(update_goal))
        .route("/api/upload", post(upload))
        .route("/api/nutrition/targets", post(save_nutrition_targets))
        .route("/api/admin/users", get(list_users).delete(delete_users))
        .with_state(backend)
}

/// Serves `backend` on an ephemeral port and returns its base URL.
pub async fn serve(backend: Arc<Backend>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(backend)).await.unwrap();
    });
    format!("http://{address}")
}

pub fn signed_in() -> CurrentIdentity {
    let identity = Identity::from_bearer_token(AccessToken::new(TOKEN.to_owned())).unwrap();
    CurrentIdentity::new(Some(identity))
}

pub async fn store(backend: Arc<Backend>, identity: CurrentIdentity) -> SyncStore<ApiClient> {
    let base_url = serve(backend).await;
    let client = ApiClient::new(ClientConfig::new(base_url), identity).unwrap();
    SyncStore::new(client)
}

/// Reads `key` and waits until `ready` holds for its value.
pub async fn wait_for(
    store: &SyncStore<ApiClient>,
    key: Endpoint,
    ready: impl Fn(&Resource) -> bool,
) -> Arc<Resource> {
    let mut updates = store.subscribe(&key);
    store.read(&key);
    let snapshot = updates
        .wait_for(|snapshot| snapshot.value.as_deref().is_some_and(&ready))
        .await
        .unwrap();
    snapshot.value.clone().unwrap()
}

pub async fn loaded(store: &SyncStore<ApiClient>, key: Endpoint) -> Arc<Resource> {
    wait_for(store, key, |_| true).await
}
