use pulse_client::{
    ApiClient, ApiError, AuthMode, ClientConfig, Endpoint, Resource,
    community::{Community, Notice},
};
use pulse_common::{
    identity::{AccessToken, CurrentIdentity, Identity, IdentityError},
    model::{Id, group::GroupMarker},
};
use pulse_sync::{
    PollBackoff, PollInterval, PollScheduler, PollSubscription, SyncStore,
    scheduler::ZeroIntervalError,
};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("The configured access token could not be read: {0}")]
    AccessToken(#[from] IdentityError),
    #[error("Error setting up the API client: {0}")]
    Client(#[from] ApiError),
    #[error("Poll intervals must be longer than zero")]
    PollInterval(#[from] ZeroIntervalError),
    #[error("Error waiting for shutdown signal: {0}")]
    Signal(std::io::Error),
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_chat_poll_interval_ms() -> u64 {
    2000
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    api_base_url: String,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    auth_mode: AuthMode,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_chat_poll_interval_ms")]
    chat_poll_interval_ms: u64,
    #[serde(default)]
    watch_group: Option<u64>,
    #[serde(default)]
    request_timeout_ms: Option<u64>,
    #[serde(default)]
    poll_backoff: bool,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pulse_app=debug,\
                pulse_client=debug,\
                pulse_sync=debug,\
                pulse_common=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::prefixed("PULSE_").from_env().map_err(InitError::from)
}

fn identity(env: &Env) -> Result<CurrentIdentity, InitError> {
    let identity = env
        .access_token
        .clone()
        .map(|token| Identity::from_bearer_token(AccessToken::new(token)))
        .transpose()?;
    match &identity {
        Some(identity) => info!(user_id = %identity.user_id, "signed in"),
        None => info!("no access token configured, browsing signed out"),
    }
    Ok(CurrentIdentity::new(identity))
}

fn describe(resource: &Resource) -> String {
    match resource {
        Resource::Feed(posts) => format!("{} posts", posts.len()),
        Resource::Post(post) => format!("post {}", post.id),
        Resource::Comments(comments) => format!("{} comments", comments.len()),
        Resource::Stories(stories) => format!("{} stories", stories.len()),
        Resource::TrendingTags(tags) => format!("{} trending tags", tags.len()),
        Resource::Group(group) => {
            format!("group {:?} with {} members", group.name, group.members.len())
        }
        Resource::GroupMessages(messages) => match messages.last() {
            Some(last) => format!(
                "{} messages, latest from {}: {}",
                messages.len(),
                last.sender.handle.get(),
                last.content.display_text()
            ),
            None => "no messages".to_owned(),
        },
        Resource::DirectMessages(messages) => format!("{} direct messages", messages.len()),
        Resource::Goals(goals) => format!("{} goals", goals.len()),
        Resource::AdminUsers(page) => format!("{} of {} users", page.items.len(), page.total),
    }
}

/// Logs every new value published for `key` until `shutdown` fires.
fn watch(store: &SyncStore<ApiClient>, key: Endpoint, shutdown: CancellationToken) {
    let mut updates = store.subscribe(&key);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    match snapshot.value {
                        Some(resource) => info!(%key, "{}", describe(&resource)),
                        None => debug!(%key, state = ?snapshot.state(), "no data yet"),
                    }
                }
            }
        }
    });
}

/// Logs failed actions until `shutdown` fires or the sender goes away.
/// Returns how many notices were logged.
async fn log_notices(
    mut notices: broadcast::Receiver<Notice>,
    shutdown: CancellationToken,
) -> usize {
    let mut logged = 0;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    warn!(kind = ?notice.kind, "{}", notice.message);
                    logged += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notice log fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    logged
}

fn poll_interval(millis: u64) -> Result<PollInterval, InitError> {
    Ok(PollInterval::try_from(Duration::from_millis(millis))?)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let config = ClientConfig {
        base_url: env.api_base_url.clone(),
        auth_mode: env.auth_mode,
        timeout: env.request_timeout_ms.map(Duration::from_millis),
    };
    let client = ApiClient::new(config, identity(&env)?)?;
    let store = SyncStore::new(client);
    let scheduler = if env.poll_backoff {
        PollScheduler::with_backoff(store.clone(), PollBackoff::default())
    } else {
        PollScheduler::new(store.clone())
    };
    let community = Community::new(store.clone());
    let shutdown = CancellationToken::new();

    let mut subscriptions: Vec<PollSubscription> = Vec::new();
    let feed_interval = poll_interval(env.poll_interval_ms)?;
    for key in [Endpoint::Feed, Endpoint::Stories, Endpoint::TrendingTags] {
        watch(&store, key, shutdown.clone());
        subscriptions.push(scheduler.subscribe(key, feed_interval));
    }

    if let Some(group_id) = env.watch_group {
        let group_id: Id<GroupMarker> = Id::new(group_id);
        let chat_interval = poll_interval(env.chat_poll_interval_ms)?;
        for key in [Endpoint::Group(group_id), Endpoint::GroupMessages(group_id)] {
            watch(&store, key, shutdown.clone());
            subscriptions.push(scheduler.subscribe(key, chat_interval));
        }
    }
    info!(timers = scheduler.active_timers(), "polling started");

    tokio::spawn(log_notices(community.notices(), shutdown.clone()));

    tokio::signal::ctrl_c().await.map_err(InitError::Signal)?;
    info!("shutting down");
    shutdown.cancel();
    drop(subscriptions);

    Ok(())
}
