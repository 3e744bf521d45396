use serde::Serialize;

use crate::{
    error::{Error, ErrorKind},
    schema::{Id, NamedEntity, Recipe, User},
};

/// The principal every read and write is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Owner(Id);

impl Owner {
    pub fn new(user_id: Id) -> Self {
        Self(user_id)
    }

    pub fn id(&self) -> Id {
        self.0
    }
}

impl From<&User> for Owner {
    fn from(user: &User) -> Self {
        Self(user.id)
    }
}

pub trait Owned {
    fn owner_id(&self) -> Id;
}

impl<T: Owned> Owned for &T {
    fn owner_id(&self) -> Id {
        T::owner_id(*self)
    }
}

impl Owned for Recipe {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Owned for NamedEntity {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

/// Narrows a looked-up record to the requesting owner.
///
/// Missing records and records of other owners produce the same not-found
/// error, so callers cannot probe for ids they don't own.
pub fn ensure_owned<T: Owned>(owner: Owner, record: Option<T>, what: &str) -> Result<T, Error> {
    match record {
        Some(record) if record.owner_id() == owner.id() => Ok(record),
        _ => Err(ErrorKind::NotFound.new(&format!("No {what} found with the specified id"))),
    }
}
