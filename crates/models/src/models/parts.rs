use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Order assumed for parts which don't have one when sorting.
pub const UNORDERED: u32 = 99999;

/// A titled sub-section of an edition's body.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Part {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub order: Option<u32>,
}

impl Part {
    pub fn new<T, B>(title: T, body: B) -> Part
    where
        T: Into<String>,
        B: Into<String>,
    {
        Part {
            title: title.into(),
            body: body.into(),
            order: None,
        }
    }

    /// Is this part without any content?
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.body.trim().is_empty()
    }
}

/// Ordered collection of [`Part`]s embedded in an edition.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parts {
    parts: Vec<Part>,
}

/// A single change in a bulk update of parts (see [`Parts::apply_updates`]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PartUpdate {
    /// Change an existing part. Fields which are `None` are left unchanged.
    Edit {
        index: usize,
        title: Option<String>,
        body: Option<String>,
        order: Option<u32>,
    },
    /// Remove an existing part.
    Destroy {
        index: usize,
    },
    /// Add a new part. Blank parts are ignored.
    Add(Part),
}

impl Parts {
    pub fn new() -> Parts {
        Parts::default()
    }

    pub fn iter(&self) -> std::slice::Iter<Part> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Sort parts by their order, and renumber them densely starting at 1.
    ///
    /// Parts without an order are placed after all ordered ones, keeping
    /// their relative positions.
    pub fn order_parts(&mut self) {
        self.parts.sort_by_key(|part| part.order.unwrap_or(UNORDERED));

        for (inx, part) in self.parts.iter_mut().enumerate() {
            part.order = Some(inx as u32 + 1);
        }
    }

    /// Render all parts as a single markdown document.
    pub fn whole_body(&self) -> String {
        self.parts.iter()
            .map(|part| format!("# {}\n\n{}", part.title, part.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Copy parts for use in a new edition, leaving out blank ones.
    pub fn duplicate(&self) -> Parts {
        Parts {
            parts: self.parts.iter()
                .filter(|part| !part.is_blank())
                .cloned()
                .collect(),
        }
    }

    /// Apply a batch of changes.
    ///
    /// Indices in `updates` refer to positions before any change in the batch
    /// is applied. Either the whole batch is applied, or none of it is.
    /// Afterwards parts are re-ordered (see [`Parts::order_parts`]).
    pub fn apply_updates<I>(&mut self, updates: I) -> Result<(), UpdatePartsError>
    where
        I: IntoIterator<Item = PartUpdate>,
    {
        let updates = updates.into_iter().collect::<Vec<_>>();

        for update in &updates {
            match *update {
                PartUpdate::Edit { index, .. } | PartUpdate::Destroy { index }
                if index >= self.parts.len() =>
                    return Err(UpdatePartsError::NoSuchPart(index)),
                _ => (),
            }
        }

        let mut parts = self.parts.iter()
            .cloned()
            .map(Some)
            .collect::<Vec<_>>();
        let mut added = Vec::new();

        for update in updates {
            match update {
                PartUpdate::Edit { index, title, body, order } => {
                    if let Some(ref mut part) = parts[index] {
                        if let Some(title) = title {
                            part.title = title;
                        }
                        if let Some(body) = body {
                            part.body = body;
                        }
                        if order.is_some() {
                            part.order = order;
                        }
                    }
                }
                PartUpdate::Destroy { index } => parts[index] = None,
                PartUpdate::Add(part) => if !part.is_blank() {
                    added.push(part);
                },
            }
        }

        self.parts = parts.into_iter().flatten().chain(added).collect();
        self.order_parts();

        Ok(())
    }

    /// Verify that all parts are complete.
    pub fn validate(&self) -> Result<(), PartsErrors> {
        let mut errors = BTreeMap::new();

        for (inx, part) in self.parts.iter().enumerate() {
            if part.title.trim().is_empty() {
                errors.entry(inx)
                    .or_insert_with(Vec::new)
                    .push("title can't be blank");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PartsErrors(errors))
        }
    }
}

impl From<Vec<Part>> for Parts {
    fn from(parts: Vec<Part>) -> Parts {
        Parts { parts }
    }
}

impl<'a> IntoIterator for &'a Parts {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

#[derive(Debug, Eq, Fail, PartialEq)]
pub enum UpdatePartsError {
    #[fail(display = "There is no part at position {}", _0)]
    NoSuchPart(usize),
}

/// Validation errors, keyed by index of the offending part.
#[derive(Debug, Eq, PartialEq)]
pub struct PartsErrors(pub BTreeMap<usize, Vec<&'static str>>);

impl fmt::Display for PartsErrors {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (n, (inx, messages)) in self.0.iter().enumerate() {
            if n > 0 {
                fmt.write_str("; ")?;
            }
            write!(fmt, "part {}: {}", inx + 1, messages.join(", "))?;
        }
        Ok(())
    }
}

impl Fail for PartsErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(title: &str, order: Option<u32>) -> Part {
        Part {
            title: title.into(),
            body: format!("{} body", title),
            order,
        }
    }

    fn titles(parts: &Parts) -> Vec<&str> {
        parts.iter().map(|p| p.title.as_str()).collect()
    }

    fn orders(parts: &Parts) -> Vec<Option<u32>> {
        parts.iter().map(|p| p.order).collect()
    }

    #[test]
    fn order_parts_is_dense_and_idempotent() {
        let mut parts = Parts::from(vec![
            part("c", Some(30)),
            part("none", None),
            part("a", Some(2)),
            part("b", Some(7)),
        ]);

        parts.order_parts();
        assert_eq!(titles(&parts), ["a", "b", "c", "none"]);
        assert_eq!(orders(&parts), [Some(1), Some(2), Some(3), Some(4)]);

        let once = parts.clone();
        parts.order_parts();
        assert_eq!(parts, once);
    }

    #[test]
    fn unordered_parts_keep_relative_position() {
        let mut parts = Parts::from(vec![
            part("x", None),
            part("y", None),
            part("first", Some(1)),
        ]);
        parts.order_parts();
        assert_eq!(titles(&parts), ["first", "x", "y"]);
    }

    #[test]
    fn whole_body_joins_parts() {
        let parts = Parts::from(vec![
            Part::new("Overview", "Some text"),
            Part::new("Details", "More text"),
        ]);
        assert_eq!(
            parts.whole_body(),
            "# Overview\n\nSome text\n\n# Details\n\nMore text",
        );
        assert_eq!(Parts::new().whole_body(), "");
    }

    #[test]
    fn duplicate_skips_blank_parts() {
        let parts = Parts::from(vec![
            part("kept", Some(1)),
            Part { title: " ".into(), body: "".into(), order: Some(2) },
            Part { title: "".into(), body: "body only".into(), order: Some(3) },
        ]);

        let copy = parts.duplicate();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.get(0), parts.get(0));
        assert_eq!(copy.get(1), parts.get(2));
    }

    #[test]
    fn bulk_updates() {
        let mut parts = Parts::from(vec![
            part("a", Some(1)),
            part("b", Some(2)),
            part("c", Some(3)),
        ]);

        parts.apply_updates(vec![
            PartUpdate::Destroy { index: 1 },
            PartUpdate::Edit {
                index: 0,
                title: Some("A".into()),
                body: None,
                order: Some(10),
            },
            PartUpdate::Add(Part::new("", "  ")),
            PartUpdate::Add(Part::new("d", "d body")),
        ]).unwrap();

        assert_eq!(titles(&parts), ["c", "A", "d"]);
        assert_eq!(orders(&parts), [Some(1), Some(2), Some(3)]);
        assert_eq!(parts.get(1).unwrap().body, "a body");
    }

    #[test]
    fn bulk_update_with_bad_index_changes_nothing() {
        let mut parts = Parts::from(vec![part("a", Some(1))]);
        let before = parts.clone();

        assert_eq!(
            parts.apply_updates(vec![
                PartUpdate::Add(Part::new("b", "b")),
                PartUpdate::Destroy { index: 3 },
            ]),
            Err(UpdatePartsError::NoSuchPart(3)),
        );
        assert_eq!(parts, before);
    }

    #[test]
    fn validation_reports_part_index() {
        let parts = Parts::from(vec![
            part("fine", Some(1)),
            Part { title: "".into(), body: "text".into(), order: Some(2) },
        ]);

        let errors = parts.validate().unwrap_err();
        assert_eq!(errors.0.keys().collect::<Vec<_>>(), [&1]);
        assert_eq!(errors.to_string(), "part 2: title can't be blank");
    }
}
