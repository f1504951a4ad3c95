//! Audit trail of editorial work.
//!
//! Every change of an edition's workflow state is recorded as an [`Action`]
//! in the edition's [`ActionLog`]. Actions are never edited, removed, nor
//! reordered once recorded; the log only ever grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, slice};

use crate::{
    models::{User, UserId},
    workflow::Transition,
};

/// Entity responsible for an action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// System. This actor is used for actions carried automatically by the
    /// system, such as processing replies to fact-check requests, and actions
    /// invoked from the CLI.
    System,
    /// A user.
    User(UserId),
}

impl From<UserId> for Actor {
    fn from(id: UserId) -> Self {
        Actor::User(id)
    }
}

impl<'a> From<&'a User> for Actor {
    fn from(user: &'a User) -> Self {
        Actor::User(user.id())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Actor::System => fmt.write_str("system"),
            Actor::User(id) => write!(fmt, "user {}", id),
        }
    }
}

/// A single entry in an edition's audit trail.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Action {
    #[serde(rename = "requester_id")]
    requester: Actor,
    #[serde(rename = "recipient_id", default, skip_serializing_if = "Option::is_none")]
    recipient: Option<Actor>,
    request_type: Transition,
    #[serde(default)]
    comment: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fact_check: Option<FactCheckRequest>,
}

impl Action {
    /// Actor who performed this action.
    pub fn requester(&self) -> Actor {
        self.requester
    }

    /// Actor whose earlier request this action answers, if any.
    ///
    /// For example the recipient of an `approve_review` action is the user
    /// who requested the review.
    pub fn recipient(&self) -> Option<Actor> {
        self.recipient
    }

    pub fn request_type(&self) -> Transition {
        self.request_type
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Difference between the previously published body and the body
    /// published by this action.
    ///
    /// Only present on `publish` actions of editions which superseded another
    /// published edition.
    pub fn diff(&self) -> Option<&str> {
        self.diff.as_ref().map(String::as_str)
    }

    /// Details of a fact-check request, present only on `send_fact_check`
    /// actions.
    pub fn fact_check(&self) -> Option<&FactCheckRequest> {
        self.fact_check.as_ref()
    }
}

/// Who was asked to check facts in an edition, and how they can reply.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FactCheckRequest {
    #[serde(rename = "recipient_emails")]
    pub email_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customised_message: Option<String>,
    /// Address to which replies should be sent.
    pub reply_to: String,
}

/// Everything about an action which isn't determined by the workflow itself.
#[derive(Clone, Debug, Default)]
pub struct ActionDetails {
    pub comment: String,
    pub recipient: Option<Actor>,
    pub diff: Option<String>,
    pub fact_check: Option<FactCheckRequest>,
}

impl ActionDetails {
    pub fn comment<S: Into<String>>(comment: S) -> ActionDetails {
        ActionDetails {
            comment: comment.into(),
            .. ActionDetails::default()
        }
    }
}

/// Append-only, time-ordered list of actions taken on an edition.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    /// Record a new action.
    ///
    /// The timestamp is assigned here and never precedes the timestamp of
    /// the previously recorded action.
    pub fn record(
        &mut self,
        requester: Actor,
        request_type: Transition,
        details: ActionDetails,
    ) -> &Action {
        let now = Utc::now();
        let created_at = match self.actions.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };

        let ActionDetails { comment, recipient, diff, fact_check } = details;

        self.actions.push(Action {
            requester,
            recipient,
            request_type,
            comment,
            created_at,
            diff,
            fact_check,
        });

        &self.actions[self.actions.len() - 1]
    }

    pub fn iter(&self) -> slice::Iter<Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn last(&self) -> Option<&Action> {
        self.actions.last()
    }

    /// Find the most recent action of a given type.
    pub fn last_of_type(&self, request_type: Transition) -> Option<&Action> {
        self.actions.iter()
            .rev()
            .find(|action| action.request_type == request_type)
    }

    /// Count actions of a given type.
    pub fn count_of_type(&self, request_type: Transition) -> usize {
        self.actions.iter()
            .filter(|action| action.request_type == request_type)
            .count()
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a Action;
    type IntoIter = slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
