pub mod comment;
pub mod goal;
pub mod group;
pub mod post;
pub mod story;
pub mod user;

use crate::{
    model::{goal::InvalidGoalError, user::InvalidUserHandleError},
    provisional::PROVISIONAL_FLAG,
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    Goal(#[from] InvalidGoalError),
    #[error("The id {0} is reserved for provisional records")]
    ProvisionalIdFromServer(u64),
}

pub type Result<T, E = ModelValidationError> = std::result::Result<T, E>;

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(u64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this id was minted locally for an optimistic record.
    #[must_use]
    pub const fn is_provisional(self) -> bool {
        self.0 & PROVISIONAL_FLAG != 0
    }

    /// Accepts an id coming from the server, rejecting the provisional range.
    pub fn from_server(id: u64) -> Result<Self> {
        let id = Self::new(id);
        if id.is_provisional() {
            Err(ModelValidationError::ProvisionalIdFromServer(id.get()))
        } else {
            Ok(id)
        }
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{Id, ModelValidationError, post::PostMarker},
        provisional::PROVISIONAL_FLAG,
    };

    #[test]
    fn server_ids_reject_provisional_range() {
        assert_eq!(
            Id::<PostMarker>::from_server(42).map(Id::get),
            Ok(42)
        );
        assert_eq!(
            Id::<PostMarker>::from_server(PROVISIONAL_FLAG | 7),
            Err(ModelValidationError::ProvisionalIdFromServer(
                PROVISIONAL_FLAG | 7
            ))
        );
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = Id::<PostMarker>::new(1234);
        assert_eq!(serde_json::to_string(&id).unwrap(), "1234");
        let parsed: Id<PostMarker> = serde_json::from_str("1234").unwrap();
        assert_eq!(parsed, id);
    }
}
