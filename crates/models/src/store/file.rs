use log::debug;
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tempfile::NamedTempFile;

use crate::models::{Edition, EditionId};
use super::{Editions, Store, StoreError};

/// Store keeping editions in a JSON file.
///
/// The whole file is read for every operation and rewritten for every
/// modification. Writes go through a temporary file in the same directory
/// which then replaces the store file, so that readers never observe
/// a partially written store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open a store kept at `path`.
    ///
    /// The file doesn't have to exist; it will be created on first write.
    pub fn open<P: Into<PathBuf>>(path: P) -> FileStore {
        FileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with exclusive access to stored editions, writing them back
    /// if `f` succeeds and `write` is set.
    fn with<F, R>(&self, write: bool, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Editions) -> Result<R, StoreError>,
    {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        let mut editions = self.load()?;
        let result = f(&mut editions)?;

        if write {
            self.store(&editions)?;
        }

        Ok(result)
    }

    fn load(&self) -> Result<Editions, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(serde_json::from_reader(BufReader::new(file))?),
            Err(ref err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} doesn't exist, starting with an empty store",
                    self.path.display());
                Ok(Editions::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, editions: &Editions) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, editions)?;
            writer.flush()?;
        }
        file.persist(&self.path).map_err(|err| err.error)?;

        Ok(())
    }
}

impl Store for FileStore {
    fn find(&self, id: EditionId) -> Result<Edition, StoreError> {
        self.with(false, |editions| editions.find(id))
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Edition>, StoreError> {
        self.with(false, |editions| Ok(editions.find_by_slug(slug)))
    }

    fn find_last_published(&self, panopticon_id: &str)
    -> Result<Option<Edition>, StoreError> {
        self.with(false, |editions| Ok(editions.find_last_published(panopticon_id)))
    }

    fn save_all(&self, editions: &mut [&mut Edition]) -> Result<(), StoreError> {
        self.with(true, |stored| stored.save_all(editions))
    }

    fn delete(&self, id: EditionId) -> Result<(), StoreError> {
        self.with(true, |editions| editions.delete(id))
    }

    fn all(&self) -> Result<Vec<Edition>, StoreError> {
        self.with(false, |editions| Ok(editions.all()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Content, NewEdition};

    fn edition() -> Edition {
        Edition::new(
            Content::Answer(Answer { body: "Body".into() }),
            NewEdition {
                slug: "slug".into(),
                title: "Title".into(),
                panopticon_id: "1".into(),
            },
        )
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("editions.json"));
        assert!(store.all().unwrap().is_empty());
        assert!(store.find_by_slug("slug").unwrap().is_none());
    }

    #[test]
    fn editions_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editions.json");

        let mut edition = edition();
        FileStore::open(&path).save(&mut edition).unwrap();

        let store = FileStore::open(&path);
        let loaded = store.find(edition.id().unwrap()).unwrap();
        assert_eq!(loaded, edition);

        let mut stale = loaded.clone();
        store.save(&mut edition).unwrap();
        match store.save(&mut stale) {
            Err(StoreError::Conflict(_)) => (),
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editions.json");
        std::fs::write(&path, "{ not json").unwrap();

        match FileStore::open(&path).all() {
            Err(StoreError::Json(_)) => (),
            other => panic!("expected a JSON error, got {:?}", other),
        }
    }
}
