use std::sync::{Mutex, MutexGuard};

use crate::models::{Edition, EditionId};
use super::{Editions, Store, StoreError};

/// Store keeping editions in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    editions: Mutex<Editions>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<Editions> {
        match self.editions.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }
}

impl Store for MemoryStore {
    fn find(&self, id: EditionId) -> Result<Edition, StoreError> {
        self.lock().find(id)
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Edition>, StoreError> {
        Ok(self.lock().find_by_slug(slug))
    }

    fn find_last_published(&self, panopticon_id: &str)
    -> Result<Option<Edition>, StoreError> {
        Ok(self.lock().find_last_published(panopticon_id))
    }

    fn save_all(&self, editions: &mut [&mut Edition]) -> Result<(), StoreError> {
        self.lock().save_all(editions)
    }

    fn delete(&self, id: EditionId) -> Result<(), StoreError> {
        self.lock().delete(id)
    }

    fn all(&self) -> Result<Vec<Edition>, StoreError> {
        Ok(self.lock().all())
    }
}
