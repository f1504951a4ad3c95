//! Fixtures shared by test suites.

#![allow(dead_code)]

use imprimatur_models::{
    Answer,
    Content,
    Deployment,
    Edition,
    EditionId,
    FactCheckMail,
    FactCheckMailer,
    MemoryStore,
    NewEdition,
    Params,
    Store,
    StoreError,
    User,
    Workflow,
};
use lazy_static::lazy_static;
use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicBool, Ordering},
};

lazy_static! {
    pub static ref DEPLOYMENT: Deployment =
        Deployment::new("wibble", "alphagov.co.uk")
            .expect("test deployment should be valid");

    pub static ref AUTHOR: User = User::new(1);
    pub static ref REVIEWER: User = User::new(2);
    pub static ref EDITOR: User = User::new(3);
}

/// Initialize logging for a test.
pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Mailer remembering everything it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<FactCheckMail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<FactCheckMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl FactCheckMailer for RecordingMailer {
    fn send_fact_check_request(&self, mail: &FactCheckMail) {
        self.sent.lock().unwrap().push(mail.clone());
    }
}

/// Create a workflow over an in-memory store.
pub fn workflow() -> (Workflow<MemoryStore>, RecordingMailer) {
    setup();
    let mailer = RecordingMailer::default();
    let workflow = Workflow::new(MemoryStore::new(), &*DEPLOYMENT)
        .with_mailer(mailer.clone());
    (workflow, mailer)
}

pub fn new_edition(slug: &str) -> NewEdition {
    NewEdition {
        slug: slug.into(),
        title: format!("Title of {}", slug),
        panopticon_id: format!("{}-content", slug),
    }
}

pub fn answer(body: &str) -> Content {
    Content::Answer(Answer { body: body.into() })
}

/// Take an edition from lined up to ready.
pub fn make_ready<S: Store>(workflow: &Workflow<S>, edition: &mut Edition) {
    workflow.start_work(&*AUTHOR, edition, Params::default()).unwrap();
    workflow.request_review(&*AUTHOR, edition, Params::default()).unwrap();
    workflow.approve_review(&*REVIEWER, edition, Params::default()).unwrap();
}

/// Take an edition from lined up to published.
pub fn make_published<S: Store>(workflow: &Workflow<S>, edition: &mut Edition) {
    make_ready(workflow, edition);
    workflow.publish(&*AUTHOR, edition, Params::default()).unwrap();
}

/// Store which can be told to fail all writes.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FailingStore {
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
        } else {
            Ok(())
        }
    }
}

impl Store for FailingStore {
    fn find(&self, id: EditionId) -> Result<Edition, StoreError> {
        self.inner.find(id)
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Edition>, StoreError> {
        self.inner.find_by_slug(slug)
    }

    fn find_last_published(&self, panopticon_id: &str)
    -> Result<Option<Edition>, StoreError> {
        self.inner.find_last_published(panopticon_id)
    }

    fn save_all(&self, editions: &mut [&mut Edition]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.save_all(editions)
    }

    fn delete(&self, id: EditionId) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(id)
    }

    fn all(&self) -> Result<Vec<Edition>, StoreError> {
        self.inner.all()
    }
}
