use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::parts::Parts;

/// Kind of an edition.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditionKind {
    Answer,
    Guide,
    Programme,
    Place,
    Transaction,
}

impl EditionKind {
    pub const ALL: [EditionKind; 5] = [
        EditionKind::Answer,
        EditionKind::Guide,
        EditionKind::Programme,
        EditionKind::Place,
        EditionKind::Transaction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditionKind::Answer => "answer",
            EditionKind::Guide => "guide",
            EditionKind::Programme => "programme",
            EditionKind::Place => "place",
            EditionKind::Transaction => "transaction",
        }
    }

    /// Do editions of this kind consist of [`Parts`]?
    pub fn has_parts(self) -> bool {
        match self {
            EditionKind::Guide | EditionKind::Programme => true,
            _ => false,
        }
    }
}

impl fmt::Display for EditionKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for EditionKind {
    type Err = ParseKindError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        EditionKind::ALL.iter()
            .cloned()
            .find(|kind| kind.as_str() == v)
            .ok_or_else(|| ParseKindError(v.to_string()))
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Unknown edition kind: {}", _0)]
pub struct ParseKindError(String);

/// Type-specific content of an edition.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Answer(Answer),
    Guide(Guide),
    Programme(Programme),
    Place(Place),
    Transaction(Transaction),
}

/// A short answer to a single question.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Answer {
    #[serde(default)]
    pub body: String,
}

/// A multi-page guide.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Guide {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub alternative_title: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub parts: Parts,
}

/// Description of a benefit or a government programme, split into parts.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Programme {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub alternative_title: String,
    #[serde(default)]
    pub parts: Parts,
}

/// A service provided at physical locations.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Place {
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub more_information: String,
    #[serde(default)]
    pub place_type: String,
    #[serde(default)]
    pub expectation_ids: Vec<String>,
}

/// A service completed on another site.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Transaction {
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub more_information: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub will_continue_on: String,
    #[serde(default)]
    pub expectation_ids: Vec<String>,
}

impl Content {
    /// Create empty content of given kind.
    pub fn empty(kind: EditionKind) -> Content {
        match kind {
            EditionKind::Answer => Content::Answer(Answer::default()),
            EditionKind::Guide => Content::Guide(Guide::default()),
            EditionKind::Programme => Content::Programme(Programme::default()),
            EditionKind::Place => Content::Place(Place::default()),
            EditionKind::Transaction =>
                Content::Transaction(Transaction::default()),
        }
    }

    pub fn kind(&self) -> EditionKind {
        match self {
            Content::Answer(_) => EditionKind::Answer,
            Content::Guide(_) => EditionKind::Guide,
            Content::Programme(_) => EditionKind::Programme,
            Content::Place(_) => EditionKind::Place,
            Content::Transaction(_) => EditionKind::Transaction,
        }
    }

    /// Render the entire body of this content as a single text.
    ///
    /// This is the text compared between successive published editions.
    pub fn whole_body(&self) -> String {
        match self {
            Content::Answer(answer) => answer.body.clone(),
            Content::Guide(guide) => guide.parts.whole_body(),
            Content::Programme(programme) => programme.parts.whole_body(),
            Content::Place(place) => place.introduction.clone(),
            Content::Transaction(transaction) => [
                transaction.link.as_str(),
                transaction.introduction.as_str(),
                transaction.more_information.as_str(),
            ].join("\n\n"),
        }
    }

    /// Get parts of this content, if its kind has them.
    pub fn parts(&self) -> Option<&Parts> {
        match self {
            Content::Guide(guide) => Some(&guide.parts),
            Content::Programme(programme) => Some(&programme.parts),
            _ => None,
        }
    }

    pub fn parts_mut(&mut self) -> Option<&mut Parts> {
        match self {
            Content::Guide(guide) => Some(&mut guide.parts),
            Content::Programme(programme) => Some(&mut programme.parts),
            _ => None,
        }
    }

    /// Copy this content for a new edition, possibly of another kind.
    ///
    /// When the kind doesn't change all fields are copied. Otherwise only
    /// what both kinds have in common is carried over: parts, overviews,
    /// introductions. A new answer is given the entire body of this content.
    pub fn duplicate_as(&self, kind: EditionKind) -> Content {
        let mut content = if kind == self.kind() {
            self.clone()
        } else {
            Content::empty(kind)
        };

        if let (Some(source), Some(target)) = (self.parts(), content.parts_mut()) {
            *target = source.duplicate();
        }

        if kind == self.kind() {
            return content;
        }

        match content {
            Content::Answer(ref mut answer) => answer.body = self.whole_body(),
            Content::Guide(Guide {
                ref mut overview, ref mut alternative_title, ..
            }) | Content::Programme(Programme {
                ref mut overview, ref mut alternative_title, ..
            }) => if let Some((o, a)) = self.overview() {
                *overview = o.to_string();
                *alternative_title = a.to_string();
            },
            Content::Place(Place {
                ref mut introduction,
                ref mut more_information,
                ref mut expectation_ids,
                ..
            }) | Content::Transaction(Transaction {
                ref mut introduction,
                ref mut more_information,
                ref mut expectation_ids,
                ..
            }) => if let Some((i, m, e)) = self.introduction() {
                *introduction = i.to_string();
                *more_information = m.to_string();
                *expectation_ids = e.to_vec();
            },
        }

        content
    }

    fn overview(&self) -> Option<(&str, &str)> {
        match self {
            Content::Guide(Guide { overview, alternative_title, .. })
            | Content::Programme(Programme {
                overview, alternative_title, ..
            }) => Some((overview.as_str(), alternative_title.as_str())),
            _ => None,
        }
    }

    fn introduction(&self) -> Option<(&str, &str, &[String])> {
        match self {
            Content::Place(Place {
                introduction, more_information, expectation_ids, ..
            })
            | Content::Transaction(Transaction {
                introduction, more_information, expectation_ids, ..
            }) => Some((
                introduction.as_str(),
                more_information.as_str(),
                expectation_ids.as_slice(),
            )),
            _ => None,
        }
    }
}
