//! The signed-in user, decoded once and shared by every consumer.

use crate::model::{
    Id,
    user::{InvalidUserHandleError, UserHandle, UserMarker},
};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use parking_lot::RwLock;
use serde::Deserialize;
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum IdentityError {
    #[error("Token does not have three '.' separated parts")]
    NotEnoughParts,
    #[error("Decoding the token payload failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("Token payload is not valid JSON: {0}")]
    Payload(String),
    #[error("The sub claim is not a user id: {0}")]
    InvalidSubject(ParseIntError),
    #[error(transparent)]
    Handle(#[from] InvalidUserHandleError),
}

/// A bearer token as handed out by the auth endpoint.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Identity {
    pub user_id: Id<UserMarker>,
    pub handle: Option<UserHandle>,
    pub token: Option<AccessToken>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Subject {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
struct Claims {
    sub: Subject,
    #[serde(default)]
    username: Option<String>,
}

impl Identity {
    /// Identity for cookie sessions, where the client never sees a token.
    #[must_use]
    pub fn from_session(user_id: Id<UserMarker>, handle: Option<UserHandle>) -> Self {
        Self {
            user_id,
            handle,
            token: None,
        }
    }

    /// Reads the `sub` (and optional `username`) claim out of a JWT.
    ///
    /// The signature is not checked; the server does that on every request.
    pub fn from_bearer_token(token: AccessToken) -> Result<Self, IdentityError> {
        let mut parts = token.as_str().split('.');
        let _header = parts.next().ok_or(IdentityError::NotEnoughParts)?;
        let payload = parts.next().ok_or(IdentityError::NotEnoughParts)?;
        parts.next().ok_or(IdentityError::NotEnoughParts)?;

        let payload = BASE64_URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|err| IdentityError::Payload(err.to_string()))?;

        let user_id = match claims.sub {
            Subject::Number(id) => id,
            Subject::Text(text) => u64::from_str(&text).map_err(IdentityError::InvalidSubject)?,
        };
        let handle = claims.username.map(UserHandle::new).transpose()?;

        Ok(Self {
            user_id: Id::new(user_id),
            handle,
            token: Some(token),
        })
    }
}

/// The single accessor for "who is signed in", shared across clones.
#[derive(Clone, Debug, Default)]
pub struct CurrentIdentity(Arc<RwLock<Option<Identity>>>);

impl CurrentIdentity {
    #[must_use]
    pub fn new(identity: Option<Identity>) -> Self {
        Self(Arc::new(RwLock::new(identity)))
    }

    #[must_use]
    pub fn get(&self) -> Option<Identity> {
        self.0.read().clone()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Id<UserMarker>> {
        self.0.read().as_ref().map(|identity| identity.user_id)
    }

    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        self.0
            .read()
            .as_ref()
            .and_then(|identity| identity.token.clone())
    }

    pub fn sign_in(&self, identity: Identity) {
        *self.0.write() = Some(identity);
    }

    pub fn sign_out(&self) {
        *self.0.write() = None;
    }
}
