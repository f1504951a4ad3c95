use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::audit::Actor;

/// Stage of an edition's lifecycle.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Created, but work hasn't started yet.
    LinedUp,
    Draft,
    /// Waiting for another user to review it.
    InReview,
    /// Reviewer asked for changes.
    AmendsNeeded,
    /// Approved, waiting to be published or fact-checked.
    Ready,
    /// Sent to external reviewers for checking facts.
    FactCheck,
    /// External reviewers replied.
    FactCheckReceived,
    Published,
    /// Superseded by a newer published edition.
    Archived,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::LinedUp => "lined_up",
            State::Draft => "draft",
            State::InReview => "in_review",
            State::AmendsNeeded => "amends_needed",
            State::Ready => "ready",
            State::FactCheck => "fact_check",
            State::FactCheckReceived => "fact_check_received",
            State::Published => "published",
            State::Archived => "archived",
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::LinedUp
    }
}

impl fmt::Display for State {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// A change of an edition's state, and the type of action recording it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    StartWork,
    RequestReview,
    ApproveReview,
    RequestAmendments,
    SendFactCheck,
    ReceiveFactCheck,
    SkipFactCheck,
    ApproveFactCheck,
    Publish,
    /// Applied to a published edition when a newer one is published. This
    /// transition can't be requested directly.
    Archive,
}

/// Guard and effect of a [`Transition`].
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    /// States in which the transition is allowed.
    pub from: &'static [State],
    /// State after the transition.
    pub to: State,
    /// Type of the earlier request this transition answers.
    pub answers: Option<Transition>,
    /// Must the actor be someone other than whoever made the request in
    /// [`Rule::answers`]?
    pub distinct_actor: bool,
}

impl Transition {
    pub const ALL: [Transition; 10] = [
        Transition::StartWork,
        Transition::RequestReview,
        Transition::ApproveReview,
        Transition::RequestAmendments,
        Transition::SendFactCheck,
        Transition::ReceiveFactCheck,
        Transition::SkipFactCheck,
        Transition::ApproveFactCheck,
        Transition::Publish,
        Transition::Archive,
    ];

    pub fn rule(self) -> Rule {
        use self::State::*;

        let (from, to, answers, distinct_actor): (&'static [State], _, _, _) =
            match self {
                Transition::StartWork =>
                    (&[LinedUp, AmendsNeeded], Draft, None, false),
                Transition::RequestReview =>
                    (&[Draft], InReview, None, false),
                Transition::ApproveReview =>
                    (&[InReview], Ready, Some(Transition::RequestReview), true),
                Transition::RequestAmendments =>
                    (&[InReview], AmendsNeeded,
                        Some(Transition::RequestReview), true),
                Transition::SendFactCheck =>
                    (&[Ready], FactCheck, None, false),
                Transition::ReceiveFactCheck =>
                    (&[FactCheck], FactCheckReceived,
                        Some(Transition::SendFactCheck), false),
                Transition::SkipFactCheck =>
                    (&[FactCheck], Ready, Some(Transition::SendFactCheck), false),
                Transition::ApproveFactCheck =>
                    (&[FactCheckReceived], Ready,
                        Some(Transition::SendFactCheck), true),
                Transition::Publish =>
                    (&[Ready], Published, None, false),
                Transition::Archive =>
                    (&[Published], Archived, None, false),
            };

        Rule { from, to, answers, distinct_actor }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::StartWork => "start_work",
            Transition::RequestReview => "request_review",
            Transition::ApproveReview => "approve_review",
            Transition::RequestAmendments => "request_amendments",
            Transition::SendFactCheck => "send_fact_check",
            Transition::ReceiveFactCheck => "receive_fact_check",
            Transition::SkipFactCheck => "skip_fact_check",
            Transition::ApproveFactCheck => "approve_fact_check",
            Transition::Publish => "publish",
            Transition::Archive => "archive",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Transition {
    type Err = ParseTransitionError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        let name = v.replace('-', "_");
        Transition::ALL.iter()
            .cloned()
            .find(|transition| transition.as_str() == name)
            .ok_or_else(|| ParseTransitionError(v.to_string()))
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Unknown transition: {}", _0)]
pub struct ParseTransitionError(String);

/// Reasons why a transition was refused.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum TransitionError {
    /// Edition is not in a state in which this transition is allowed.
    #[fail(display = "Cannot {} an edition which is {}", transition, state)]
    InvalidTransition {
        transition: Transition,
        state: State,
    },
    /// Actor tried to answer their own request.
    #[fail(display = "{} cannot {} their own request", actor, transition)]
    SelfApprovalDenied {
        transition: Transition,
        actor: Actor,
    },
    /// Edition has to be saved before this transition.
    #[fail(display = "Edition has not been saved yet")]
    Unsaved,
    /// Fact check was requested without saying from whom.
    #[fail(display = "At least one email address is required")]
    NoRecipients,
    #[fail(display = "Invalid email address: {}", _0)]
    InvalidEmailAddress(String),
    /// Transition is performed by the system as a side effect of another one.
    #[fail(display = "{} cannot be requested directly", _0)]
    NotRequestable(Transition),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_transition() {
        assert_eq!("approve_review".parse::<Transition>().unwrap(),
            Transition::ApproveReview);
        assert_eq!("skip-fact-check".parse::<Transition>().unwrap(),
            Transition::SkipFactCheck);
        assert!("reject".parse::<Transition>().is_err());
    }

    #[test]
    fn answering_transitions_name_their_request() {
        for &transition in Transition::ALL.iter() {
            let rule = transition.rule();
            if rule.distinct_actor {
                assert!(rule.answers.is_some(), "{} answers nothing", transition);
            }
        }
    }

    #[test]
    fn fact_check_paths() {
        assert_eq!(Transition::SendFactCheck.rule().to, State::FactCheck);
        assert_eq!(Transition::SkipFactCheck.rule().from, &[State::FactCheck]);
        assert_eq!(Transition::SkipFactCheck.rule().to, State::Ready);
        assert!(!Transition::SkipFactCheck.rule().distinct_actor);
        assert_eq!(Transition::ApproveFactCheck.rule().from,
            &[State::FactCheckReceived]);
    }

    #[test]
    fn every_state_but_archived_has_a_way_out() {
        let states = [
            State::LinedUp,
            State::Draft,
            State::InReview,
            State::AmendsNeeded,
            State::Ready,
            State::FactCheck,
            State::FactCheckReceived,
            State::Published,
        ];

        for state in states.iter() {
            assert!(
                Transition::ALL.iter().any(|t| t.rule().from.contains(state)),
                "{} is a dead end", state,
            );
        }

        assert!(!Transition::ALL.iter()
            .any(|t| t.rule().from.contains(&State::Archived)));
    }
}
