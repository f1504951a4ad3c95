//! Editorial workflow.
//!
//! Every edition is a single revision of a content item, and goes through the
//! same sequence of stages from the moment it is lined up for work until it
//! is published, and later archived when a newer edition replaces it.
//!
//! ## Anatomy of the workflow
//!
//! The workflow is a directed graph in which nodes are [`State`]s and edges
//! are [`Transition`]s. Each transition is described by a [`Rule`]: the
//! states in which it is allowed, the state it leads to and, for
//! transitions which answer an earlier request, the type of that request.
//!
//! ```text
//! lined_up ──start_work──▶ draft ──request_review──▶ in_review
//!                            ▲                        │     │
//!                            │       request_amendments     approve_review
//!                            │                        ▼     ▼
//!                            └──start_work── amends_needed  ready ──publish──▶ published
//!                                                           │  ▲                  │
//!                                             send_fact_check  skip_fact_check   archive
//!                                                           ▼  │                  ▼
//!                                                        fact_check           archived
//!                                                           │
//!                                                 receive_fact_check
//!                                                           ▼
//!                                               fact_check_received ──approve_fact_check──▶ ready
//! ```
//!
//! Reviews must be done by someone else than whoever asked for them: the
//! actor approving or rejecting a review can't be the one who requested it,
//! and the actor approving a fact check can't be the one who sent it out.
//! Skipping a fact check bypasses its approval and is allowed to anyone.
//!
//! ## Recording
//!
//! All transitions go through a single guarded routine which validates the
//! guard, changes state, and appends an [`Action`][crate::audit::Action] to
//! the edition's log. An edition which failed the guard is left exactly as it
//! was.
//!
//! ## Concurrency
//!
//! [`Workflow`] runs each operation as a load, guard, mutate, and save cycle
//! against a [`Store`]. Stores reject saves of editions which changed since
//! they were loaded, in which case the edition is reloaded and the guard is
//! evaluated again. Two actors racing to apply the same transition will thus
//! never both succeed; the loser is told the transition is no longer valid.

use failure::Fail;
use log::{debug, info, warn};
use std::iter;

use crate::{
    audit::{ActionDetails, Actor, FactCheckRequest},
    diff::diff,
    fact_check::{
        DeploymentIdentity,
        FactCheckAddress,
        FactCheckMail,
        FactCheckMailer,
        MalformedFactCheckAddress,
    },
    models::{Content, EditionKind, Edition, EditionId, NewEdition, NotPublished},
    store::{Store, StoreError},
};

mod transition;

pub use self::transition::{
    ParseTransitionError,
    Rule,
    State,
    Transition,
    TransitionError,
};

/// Number of times an operation is attempted before giving up on
/// a concurrently modified edition.
const MAX_ATTEMPTS: usize = 3;

/// Parameters of a workflow operation.
#[derive(Clone, Debug, Default)]
pub struct Params {
    pub comment: String,
    /// Addresses to which a fact-check request should be sent.
    pub email_addresses: Vec<String>,
    /// Message to send instead of the default fact-check request text.
    pub customised_message: Option<String>,
}

impl Params {
    pub fn comment<S: Into<String>>(comment: S) -> Params {
        Params {
            comment: comment.into(),
            .. Params::default()
        }
    }

    /// Set fact-check recipients from a comma-separated list.
    pub fn email_addresses(mut self, list: &str) -> Params {
        self.email_addresses = parse_email_addresses(list);
        self
    }

    pub fn customised_message<S: Into<String>>(mut self, message: S) -> Params {
        self.customised_message = Some(message.into());
        self
    }
}

/// Split a comma-separated list of email addresses.
pub fn parse_email_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_valid_email(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = address.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) =>
            !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        _ => false,
    }
}

#[derive(Debug, Fail)]
pub enum WorkflowError {
    #[fail(display = "{}", _0)]
    Transition(#[cause] TransitionError),
    #[fail(display = "{}", _0)]
    NotPublished(#[cause] NotPublished),
    #[fail(display = "{}", _0)]
    MalformedAddress(#[cause] MalformedFactCheckAddress),
    /// Edition kept changing while we tried to apply a transition.
    #[fail(display = "Edition {} is being modified concurrently, try again", _0)]
    ConcurrentModification(EditionId),
    #[fail(display = "{}", _0)]
    Store(#[cause] StoreError),
}

impl_from! { for WorkflowError ;
    TransitionError => |e| WorkflowError::Transition(e),
    NotPublished => |e| WorkflowError::NotPublished(e),
    MalformedFactCheckAddress => |e| WorkflowError::MalformedAddress(e),
    StoreError => |e| WorkflowError::Store(e),
}

/// The editorial workflow service.
pub struct Workflow<S> {
    store: S,
    addresses: FactCheckAddress,
    mailer: Option<Box<dyn FactCheckMailer>>,
}

impl<S: Store> Workflow<S> {
    pub fn new<D>(store: S, identity: &D) -> Workflow<S>
    where
        D: DeploymentIdentity + ?Sized,
    {
        Workflow {
            store,
            addresses: FactCheckAddress::new(identity),
            mailer: None,
        }
    }

    /// Use `mailer` to deliver fact-check requests.
    ///
    /// Without a mailer fact-check requests are only recorded.
    pub fn with_mailer<M>(self, mailer: M) -> Workflow<S>
    where
        M: FactCheckMailer + 'static,
    {
        Workflow {
            mailer: Some(Box::new(mailer)),
            ..self
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Codec for fact-check reply addresses of this deployment.
    pub fn addresses(&self) -> &FactCheckAddress {
        &self.addresses
    }

    /// Create and save a new edition.
    ///
    /// Creation is not recorded in the action log; the first recorded action
    /// is `start_work`.
    pub fn create_edition<A>(&self, actor: A, content: Content, new: NewEdition)
    -> Result<Edition, WorkflowError>
    where
        A: Into<Actor>,
    {
        let actor: Actor = actor.into();
        let mut edition = Edition::new(content, new);
        self.store.save(&mut edition)?;

        info!("{} created {} {:?} (edition {})", actor, edition.kind(),
            edition.slug(), display_id(&edition));

        Ok(edition)
    }

    pub fn start_work<A>(&self, actor: A, edition: &mut Edition, params: Params)
    -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(actor.into(), edition, Transition::StartWork, params)
    }

    pub fn request_review<A>(&self, actor: A, edition: &mut Edition, params: Params)
    -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(actor.into(), edition, Transition::RequestReview, params)
    }

    pub fn approve_review<A>(&self, actor: A, edition: &mut Edition, params: Params)
    -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(actor.into(), edition, Transition::ApproveReview, params)
    }

    pub fn request_amendments<A>(
        &self,
        actor: A,
        edition: &mut Edition,
        params: Params,
    ) -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(
            actor.into(), edition, Transition::RequestAmendments, params)
    }

    /// Send an edition to external reviewers for a fact check.
    ///
    /// The request is recorded together with the address to which reviewers
    /// should reply. Mail is handed to the mailer only after the request was
    /// saved, and failure to deliver it doesn't undo the transition.
    pub fn send_fact_check<A>(&self, actor: A, edition: &mut Edition, params: Params)
    -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        let actor: Actor = actor.into();
        let Params { comment, email_addresses, customised_message } = params;

        self.transact(actor, edition, Transition::SendFactCheck, |edition| {
            edition.check(Transition::SendFactCheck, actor)?;

            let reply_to = self.addresses.for_edition(edition)?;

            if email_addresses.is_empty() {
                return Err(TransitionError::NoRecipients.into());
            }

            if let Some(invalid) = email_addresses.iter()
                .find(|address| !is_valid_email(address)) {
                return Err(TransitionError::InvalidEmailAddress(
                    invalid.clone()).into());
            }

            edition.apply(actor, Transition::SendFactCheck, ActionDetails {
                comment: comment.clone(),
                fact_check: Some(FactCheckRequest {
                    email_addresses: email_addresses.clone(),
                    customised_message: customised_message.clone(),
                    reply_to,
                }),
                .. ActionDetails::default()
            })?;

            Ok(Vec::new())
        })?;

        self.dispatch_fact_check(edition);

        Ok(())
    }

    /// Record reply to a fact-check request.
    pub fn receive_fact_check<A>(
        &self,
        actor: A,
        edition: &mut Edition,
        params: Params,
    ) -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(
            actor.into(), edition, Transition::ReceiveFactCheck, params)
    }

    /// Record a fact-check reply which arrived by mail at `address`.
    ///
    /// The edition is looked up only if the address belongs to this
    /// deployment. The reply is recorded as done by [`Actor::System`].
    pub fn receive_fact_check_reply(&self, address: &str, body: &str)
    -> Result<Edition, WorkflowError> {
        let id = self.addresses.edition_id(address)?;
        let mut edition = self.store.find(id)?;
        self.receive_fact_check(Actor::System, &mut edition, Params::comment(body))?;
        Ok(edition)
    }

    /// Return an edition from fact check without waiting for a reply.
    pub fn skip_fact_check<A>(&self, actor: A, edition: &mut Edition, params: Params)
    -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(actor.into(), edition, Transition::SkipFactCheck, params)
    }

    pub fn approve_fact_check<A>(
        &self,
        actor: A,
        edition: &mut Edition,
        params: Params,
    ) -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        self.simple(
            actor.into(), edition, Transition::ApproveFactCheck, params)
    }

    /// Publish an edition.
    ///
    /// If another edition of the same content item is currently published, it
    /// is archived, and the difference between its body and the body of this
    /// edition is recorded. Both editions are saved together.
    pub fn publish<A>(&self, actor: A, edition: &mut Edition, params: Params)
    -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        let actor: Actor = actor.into();

        self.transact(actor, edition, Transition::Publish, |edition| {
            edition.check(Transition::Publish, actor)?;

            let previous = self.store.find_last_published(edition.panopticon_id())?;
            let diff = previous.as_ref().map(|previous| {
                let diff = diff(&previous.whole_body(), &edition.whole_body());
                if diff.is_unchanged() {
                    debug!("Edition {} publishes no changes to the body of {}",
                        display_id(edition), display_id(previous));
                }
                diff.to_string()
            });

            edition.apply(actor, Transition::Publish, ActionDetails {
                comment: params.comment.clone(),
                diff,
                .. ActionDetails::default()
            })?;

            let mut archived = Vec::new();

            if let Some(mut previous) = previous {
                previous.apply(actor, Transition::Archive, ActionDetails::comment(
                    format!("Superseded by version {}", edition.version_number())))?;
                archived.push(previous);
            }

            Ok(archived)
        })
    }

    /// Create and save a new version of a published edition.
    ///
    /// The new edition is of the specified kind, or of the same kind as the
    /// source edition if `kind` is `None`.
    pub fn new_version<A>(&self, actor: A, edition: &Edition, kind: Option<EditionKind>)
    -> Result<Edition, WorkflowError>
    where
        A: Into<Actor>,
    {
        let actor: Actor = actor.into();

        let source = match edition.id() {
            Some(id) => self.store.find(id)?,
            None => edition.clone(),
        };

        let mut clone = source.build_clone(kind)?;
        self.store.save(&mut clone)?;

        info!("{} created version {} of {:?} (edition {})", actor,
            clone.version_number(), clone.slug(), display_id(&clone));

        Ok(clone)
    }

    /// Apply a transition chosen at runtime.
    pub fn perform<A>(
        &self,
        actor: A,
        edition: &mut Edition,
        transition: Transition,
        params: Params,
    ) -> Result<(), WorkflowError>
    where
        A: Into<Actor>,
    {
        let actor: Actor = actor.into();

        match transition {
            Transition::StartWork => self.start_work(actor, edition, params),
            Transition::RequestReview => self.request_review(actor, edition, params),
            Transition::ApproveReview => self.approve_review(actor, edition, params),
            Transition::RequestAmendments =>
                self.request_amendments(actor, edition, params),
            Transition::SendFactCheck => self.send_fact_check(actor, edition, params),
            Transition::ReceiveFactCheck =>
                self.receive_fact_check(actor, edition, params),
            Transition::SkipFactCheck => self.skip_fact_check(actor, edition, params),
            Transition::ApproveFactCheck =>
                self.approve_fact_check(actor, edition, params),
            Transition::Publish => self.publish(actor, edition, params),
            Transition::Archive =>
                Err(TransitionError::NotRequestable(transition).into()),
        }
    }

    /// Apply a transition which needs nothing but a comment.
    fn simple(
        &self,
        actor: Actor,
        edition: &mut Edition,
        transition: Transition,
        params: Params,
    ) -> Result<(), WorkflowError> {
        self.transact(actor, edition, transition, |edition| {
            edition.apply(actor, transition, ActionDetails::comment(
                params.comment.as_str()))?;
            Ok(Vec::new())
        })
    }

    /// Run `f` on a copy of `edition` and save the result, together with any
    /// other editions `f` returns.
    ///
    /// If the edition changed in the store since it was loaded, it's reloaded
    /// and `f` is run again. An edition whose document differs from the stored
    /// one is never retried, as that would lose changes on either side.
    /// `edition` is replaced with the saved copy only if saving succeeded.
    fn transact<F>(
        &self,
        actor: Actor,
        edition: &mut Edition,
        transition: Transition,
        mut f: F,
    ) -> Result<(), WorkflowError>
    where
        F: FnMut(&mut Edition) -> Result<Vec<Edition>, WorkflowError>,
    {
        let mut current = edition.clone();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut working = current.clone();

            let mut others = match f(&mut working) {
                Ok(others) => others,
                Err(err) => {
                    if let WorkflowError::Transition(ref reason) = err {
                        warn!("{} denied {} on edition {}: {}", actor,
                            transition, display_id(&current), reason);
                    }
                    return Err(err);
                }
            };

            let result = {
                let mut batch = iter::once(&mut working)
                    .chain(others.iter_mut())
                    .collect::<Vec<_>>();
                self.store.save_all(&mut batch)
            };

            match result {
                Ok(()) => {
                    info!("{} applied {} to edition {}, now {}", actor,
                        transition, display_id(&working), working.state());
                    *edition = working;
                    return Ok(());
                }
                Err(StoreError::Conflict(id)) => {
                    if attempt >= MAX_ATTEMPTS {
                        warn!("Giving up on {} of edition {} after {} attempts",
                            transition, id, attempt);
                        return Err(WorkflowError::ConcurrentModification(
                            current.id().unwrap_or(id)));
                    }

                    if let Some(id) = current.id() {
                        let stored = self.store.find(id)?;

                        if !stored.same_document(edition) {
                            warn!("Edition {} was edited concurrently, not \
                                retrying {}", id, transition);
                            return Err(WorkflowError::ConcurrentModification(id));
                        }

                        current = stored;
                    }

                    warn!("Edition {} changed while applying {}, retrying",
                        id, transition);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn dispatch_fact_check(&self, edition: &Edition) {
        let mailer = match self.mailer {
            Some(ref mailer) => mailer,
            None => return,
        };

        let request = edition.actions()
            .last_of_type(Transition::SendFactCheck)
            .and_then(|action| action.fact_check());

        let (id, request) = match (edition.id(), request) {
            (Some(id), Some(request)) => (id, request),
            _ => return,
        };

        let mail = FactCheckMail {
            edition: id,
            title: edition.title().to_string(),
            slug: edition.slug().to_string(),
            body: edition.whole_body(),
            email_addresses: request.email_addresses.clone(),
            customised_message: request.customised_message.clone(),
            reply_to: request.reply_to.clone(),
        };

        info!("Sending fact-check request for edition {} to {}",
            id, mail.email_addresses.join(", "));

        mailer.send_fact_check_request(&mail);
    }
}

fn display_id(edition: &Edition) -> String {
    match edition.id() {
        Some(id) => id.to_string(),
        None => "(unsaved)".to_string(),
    }
}
