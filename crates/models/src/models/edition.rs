use chrono::{DateTime, Utc};
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::{
    audit::{Action, ActionDetails, ActionLog, Actor},
    workflow::{State, Transition, TransitionError},
};
use super::{content::{Content, EditionKind}, parts::Parts};

/// Unique identifier of an edition.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EditionId(Uuid);

impl EditionId {
    pub(crate) fn generate() -> EditionId {
        EditionId(Uuid::new_v4())
    }
}

impl From<Uuid> for EditionId {
    fn from(uuid: Uuid) -> Self {
        EditionId(uuid)
    }
}

impl fmt::Display for EditionId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0.to_simple())
    }
}

impl FromStr for EditionId {
    type Err = ParseEditionIdError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(v)
            .map(EditionId)
            .map_err(|_| ParseEditionIdError(v.to_string()))
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Invalid edition ID: {}", _0)]
pub struct ParseEditionIdError(String);

/// Data needed to create a new edition.
#[derive(Clone, Debug)]
pub struct NewEdition {
    pub slug: String,
    pub title: String,
    pub panopticon_id: String,
}

/// A single revision of a content item under editorial control.
///
/// State of an edition changes only through the transitions described in
/// [`crate::workflow`], each of which is recorded in the edition's
/// [`ActionLog`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Edition {
    id: Option<EditionId>,
    #[serde(default)]
    lock_version: u64,
    slug: String,
    title: String,
    panopticon_id: String,
    version_number: u32,
    state: State,
    content: Content,
    #[serde(default)]
    actions: ActionLog,
    created_at: DateTime<Utc>,
}

impl Edition {
    /// Create a new edition.
    ///
    /// The edition is lined up and has no ID until it is first saved.
    pub fn new(content: Content, new: NewEdition) -> Edition {
        let NewEdition { slug, title, panopticon_id } = new;

        Edition {
            id: None,
            lock_version: 0,
            slug,
            title,
            panopticon_id,
            version_number: 1,
            state: State::LinedUp,
            content,
            actions: ActionLog::default(),
            created_at: Utc::now(),
        }
    }

    /// ID of this edition, or `None` if it was never saved.
    pub fn id(&self) -> Option<EditionId> {
        self.id
    }

    /// Number of times this edition was saved.
    pub fn lock_version(&self) -> u64 {
        self.lock_version
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Reference to the content item of which this edition is a revision.
    pub fn panopticon_id(&self) -> &str {
        &self.panopticon_id
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn kind(&self) -> EditionKind {
        self.content.kind()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn parts(&self) -> Option<&Parts> {
        self.content.parts()
    }

    pub fn whole_body(&self) -> String {
        self.content.whole_body()
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Do both editions hold the same document, whatever their state and
    /// history?
    pub(crate) fn same_document(&self, other: &Edition) -> bool {
        self.slug == other.slug
            && self.title == other.title
            && self.panopticon_id == other.panopticon_id
            && self.version_number == other.version_number
            && self.content == other.content
    }

    /// Get mutable access to this edition's content.
    ///
    /// Content of published and archived editions can't be changed.
    pub fn content_mut(&mut self) -> Result<&mut Content, EditError> {
        self.ensure_editable()?;
        Ok(&mut self.content)
    }

    /// Change title of this edition.
    pub fn set_title<T: Into<String>>(&mut self, title: T) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.title = title.into();
        Ok(())
    }

    /// Number of times amendments were requested during review.
    pub fn rejected_count(&self) -> usize {
        self.actions.count_of_type(Transition::RequestAmendments)
    }

    pub fn is_lined_up(&self) -> bool {
        self.state == State::LinedUp
    }

    pub fn is_draft(&self) -> bool {
        self.state == State::Draft
    }

    pub fn is_in_review(&self) -> bool {
        self.state == State::InReview
    }

    pub fn is_amends_needed(&self) -> bool {
        self.state == State::AmendsNeeded
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    pub fn is_fact_check(&self) -> bool {
        self.state == State::FactCheck
    }

    pub fn is_fact_check_received(&self) -> bool {
        self.state == State::FactCheckReceived
    }

    pub fn is_published(&self) -> bool {
        self.state == State::Published
    }

    pub fn is_archived(&self) -> bool {
        self.state == State::Archived
    }

    /// Could a transition be applied in current state, assuming it's done by
    /// the right user?
    pub fn can(&self, transition: Transition) -> bool {
        transition.rule().from.contains(&self.state)
    }

    /// Check whether `actor` could apply `transition` to this edition now.
    pub fn check<A>(&self, transition: Transition, actor: A)
    -> Result<(), TransitionError>
    where
        A: Into<Actor>,
    {
        let actor: Actor = actor.into();
        let rule = transition.rule();

        if !rule.from.contains(&self.state) {
            return Err(TransitionError::InvalidTransition {
                transition,
                state: self.state,
            });
        }

        if rule.distinct_actor {
            let request = rule.answers
                .and_then(|request| self.actions.last_of_type(request));

            if let Some(request) = request {
                if request.requester() == actor {
                    return Err(TransitionError::SelfApprovalDenied {
                        transition,
                        actor,
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply a transition, recording it in the action log.
    ///
    /// This is the only place where state of an edition changes. If the guard
    /// fails the edition is left untouched.
    pub(crate) fn apply(
        &mut self,
        actor: Actor,
        transition: Transition,
        mut details: ActionDetails,
    ) -> Result<&Action, TransitionError> {
        self.check(transition, actor)?;

        let rule = transition.rule();

        if let Some(request) = rule.answers {
            details.recipient = self.actions.last_of_type(request)
                .map(Action::requester);
        }

        self.state = rule.to;
        Ok(self.actions.record(actor, transition, details))
    }

    /// Build a new edition based on this one.
    ///
    /// Only published editions can be cloned. The new edition is lined up,
    /// has no history, and is of the specified kind, or the same kind as this
    /// edition if `kind` is `None`.
    pub fn build_clone(&self, kind: Option<EditionKind>)
    -> Result<Edition, NotPublished> {
        if self.state != State::Published {
            return Err(NotPublished(self.state));
        }

        let kind = kind.unwrap_or_else(|| self.kind());

        Ok(Edition {
            id: None,
            lock_version: 0,
            slug: self.slug.clone(),
            title: self.title.clone(),
            panopticon_id: self.panopticon_id.clone(),
            version_number: self.version_number + 1,
            state: State::LinedUp,
            content: self.content.duplicate_as(kind),
            actions: ActionLog::default(),
            created_at: Utc::now(),
        })
    }

    /// Mark this edition as stored under `id` with given lock version.
    pub(crate) fn set_stored(&mut self, id: EditionId, lock_version: u64) {
        self.id = Some(id);
        self.lock_version = lock_version;
    }

    fn ensure_editable(&self) -> Result<(), EditError> {
        match self.state {
            State::Published | State::Archived =>
                Err(EditError::ReadOnly(self.state)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Eq, Fail, PartialEq)]
pub enum EditError {
    #[fail(display = "Edition is {} and can no longer be changed", _0)]
    ReadOnly(State),
}

#[derive(Debug, Eq, Fail, PartialEq)]
#[fail(display = "Only published editions can have new versions, this one is {}", _0)]
pub struct NotPublished(pub State);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Guide, Part};

    fn answer(body: &str) -> Edition {
        Edition::new(
            Content::Answer(Answer { body: body.into() }),
            NewEdition {
                slug: "childcare".into(),
                title: "Childcare".into(),
                panopticon_id: "123".into(),
            },
        )
    }

    fn advance(edition: &mut Edition, steps: &[(i32, Transition)]) {
        for &(user, transition) in steps {
            edition.apply(Actor::User(user), transition, ActionDetails::default())
                .unwrap();
        }
    }

    #[test]
    fn new_edition_is_lined_up() {
        let edition = answer("text");
        assert!(edition.is_lined_up());
        assert!(!edition.is_published());
        assert!(edition.id().is_none());
        assert!(edition.actions().is_empty());
        assert_eq!(edition.version_number(), 1);
    }

    #[test]
    fn failed_guard_leaves_edition_untouched() {
        let mut edition = answer("text");
        let before = edition.clone();

        let err = edition.apply(
            Actor::User(1), Transition::Publish, ActionDetails::default())
            .unwrap_err();

        assert_eq!(err, TransitionError::InvalidTransition {
            transition: Transition::Publish,
            state: State::LinedUp,
        });
        assert_eq!(edition, before);
    }

    #[test]
    fn responses_record_the_requester_they_answer() {
        let mut edition = answer("text");
        advance(&mut edition, &[
            (1, Transition::StartWork),
            (1, Transition::RequestReview),
            (2, Transition::ApproveReview),
        ]);

        let approval = edition.actions().last().unwrap();
        assert_eq!(approval.requester(), Actor::User(2));
        assert_eq!(approval.recipient(), Some(Actor::User(1)));
        assert!(edition.is_ready());
    }

    #[test]
    fn self_review_is_denied() {
        let mut edition = answer("text");
        advance(&mut edition, &[
            (1, Transition::StartWork),
            (1, Transition::RequestReview),
        ]);

        assert!(edition.can(Transition::ApproveReview));
        assert_eq!(
            edition.check(Transition::ApproveReview, 1),
            Err(TransitionError::SelfApprovalDenied {
                transition: Transition::ApproveReview,
                actor: Actor::User(1),
            }),
        );
        assert_eq!(
            edition.check(Transition::RequestAmendments, 1).unwrap_err(),
            TransitionError::SelfApprovalDenied {
                transition: Transition::RequestAmendments,
                actor: Actor::User(1),
            },
        );
        assert!(edition.check(Transition::ApproveReview, 2).is_ok());
    }

    #[test]
    fn clone_requires_published_edition() {
        let mut edition = answer("text");
        assert_eq!(
            edition.build_clone(None).unwrap_err(),
            NotPublished(State::LinedUp),
        );

        advance(&mut edition, &[
            (1, Transition::StartWork),
            (1, Transition::RequestReview),
            (2, Transition::ApproveReview),
            (1, Transition::Publish),
        ]);

        let clone = edition.build_clone(None).unwrap();
        assert!(clone.is_lined_up());
        assert!(clone.actions().is_empty());
        assert_eq!(clone.version_number(), 2);
        assert_eq!(clone.content(), edition.content());
        assert_eq!(clone.panopticon_id(), edition.panopticon_id());
    }

    #[test]
    fn clone_copies_parts() {
        let mut edition = Edition::new(
            Content::Guide(Guide {
                parts: vec![
                    Part::new("One", "First"),
                    Part::new("Two", "Second"),
                ].into(),
                .. Guide::default()
            }),
            NewEdition {
                slug: "guide".into(),
                title: "Guide".into(),
                panopticon_id: "1".into(),
            },
        );
        advance(&mut edition, &[
            (1, Transition::StartWork),
            (1, Transition::RequestReview),
            (2, Transition::ApproveReview),
            (2, Transition::Publish),
        ]);

        let clone = edition.build_clone(None).unwrap();
        assert_eq!(clone.parts(), edition.parts());
    }

    #[test]
    fn published_content_is_read_only() {
        let mut edition = answer("text");
        assert!(edition.content_mut().is_ok());

        advance(&mut edition, &[
            (1, Transition::StartWork),
            (1, Transition::RequestReview),
            (2, Transition::ApproveReview),
            (1, Transition::Publish),
        ]);

        assert_eq!(
            edition.content_mut().unwrap_err(),
            EditError::ReadOnly(State::Published),
        );
        assert!(edition.set_title("Other").is_err());
    }

    #[test]
    fn edition_id_display_round_trips() {
        let id = EditionId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<EditionId>().unwrap(), id);
        assert!("abde".parse::<EditionId>().is_err());
    }
}
