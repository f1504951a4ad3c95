//! Persistence of editions.
//!
//! The workflow only needs a small contract from storage: loading editions,
//! and saving them with optimistic concurrency control. Each stored edition
//! carries a lock version; a save succeeds only if the edition being saved
//! was loaded at the currently stored lock version, after which the lock
//! version is incremented.

use failure::Fail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{models::{Edition, EditionId}, workflow::State};

mod file;
mod memory;

pub use self::{file::FileStore, memory::MemoryStore};

/// Storage of editions.
pub trait Store: Send + Sync {
    /// Find an edition by its ID.
    fn find(&self, id: EditionId) -> Result<Edition, StoreError>;

    /// Find latest version of an edition with given slug.
    fn find_by_slug(&self, slug: &str) -> Result<Option<Edition>, StoreError>;

    /// Find the currently published edition of a content item.
    fn find_last_published(&self, panopticon_id: &str)
    -> Result<Option<Edition>, StoreError>;

    /// Save an edition.
    ///
    /// Editions without an ID are assigned one. On success the edition's lock
    /// version is updated to match the stored one.
    fn save(&self, edition: &mut Edition) -> Result<(), StoreError> {
        self.save_all(&mut [edition])
    }

    /// Save multiple editions atomically.
    ///
    /// Either all editions are saved or, if any of them is stale, none is.
    fn save_all(&self, editions: &mut [&mut Edition]) -> Result<(), StoreError>;

    /// Delete an edition.
    ///
    /// Published and archived editions are part of the public record and
    /// can't be deleted.
    fn delete(&self, id: EditionId) -> Result<(), StoreError>;

    /// Get all stored editions, oldest first.
    fn all(&self) -> Result<Vec<Edition>, StoreError>;
}

#[derive(Debug, Fail)]
pub enum StoreError {
    #[fail(display = "No such edition: {}", _0)]
    NotFound(EditionId),
    /// Edition was changed since it was loaded.
    #[fail(display = "Edition {} was modified concurrently", _0)]
    Conflict(EditionId),
    #[fail(display = "Edition {} is published and can't be deleted", _0)]
    Permanent(EditionId),
    #[fail(display = "Storage I/O error: {}", _0)]
    Io(#[cause] std::io::Error),
    #[fail(display = "Invalid stored data: {}", _0)]
    Json(#[cause] serde_json::Error),
}

impl_from! { for StoreError ;
    std::io::Error => |e| StoreError::Io(e),
    serde_json::Error => |e| StoreError::Json(e),
}

/// Set of editions shared by store implementations.
#[derive(Clone, Debug, Default)]
pub(crate) struct Editions {
    editions: BTreeMap<EditionId, Edition>,
}

impl Editions {
    pub fn find(&self, id: EditionId) -> Result<Edition, StoreError> {
        self.editions.get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<Edition> {
        self.editions.values()
            .filter(|edition| edition.slug() == slug)
            .max_by_key(|edition| (edition.version_number(), edition.created_at()))
            .cloned()
    }

    pub fn find_last_published(&self, panopticon_id: &str) -> Option<Edition> {
        self.editions.values()
            .filter(|edition| edition.panopticon_id() == panopticon_id
                && edition.state() == State::Published)
            .max_by_key(|edition| edition.version_number())
            .cloned()
    }

    pub fn save_all(&mut self, editions: &mut [&mut Edition])
    -> Result<(), StoreError> {
        for edition in editions.iter() {
            if let Some(id) = edition.id() {
                let stored = self.editions.get(&id)
                    .ok_or(StoreError::NotFound(id))?;

                if stored.lock_version() != edition.lock_version() {
                    return Err(StoreError::Conflict(id));
                }
            }
        }

        for edition in editions.iter_mut() {
            let id = edition.id().unwrap_or_else(EditionId::generate);
            let lock_version = edition.lock_version() + 1;
            edition.set_stored(id, lock_version);
            self.editions.insert(id, (**edition).clone());
        }

        Ok(())
    }

    pub fn delete(&mut self, id: EditionId) -> Result<(), StoreError> {
        match self.editions.get(&id).map(Edition::state) {
            None => Err(StoreError::NotFound(id)),
            Some(State::Published) | Some(State::Archived) =>
                Err(StoreError::Permanent(id)),
            Some(_) => {
                self.editions.remove(&id);
                Ok(())
            }
        }
    }

    pub fn all(&self) -> Vec<Edition> {
        let mut editions = self.editions.values().cloned().collect::<Vec<_>>();
        editions.sort_by_key(Edition::created_at);
        editions
    }
}

impl Serialize for Editions {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(self.editions.values())
    }
}

impl<'de> Deserialize<'de> for Editions {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let mut editions = BTreeMap::new();

        for edition in Vec::<Edition>::deserialize(de)? {
            let id = edition.id()
                .ok_or_else(|| D::Error::custom("stored edition has no ID"))?;
            editions.insert(id, edition);
        }

        Ok(Editions { editions })
    }
}
