//! Line-level differences between two versions of a text.
//!
//! Differences are rendered inline: unchanged lines are kept as they are,
//! while changed runs of lines are wrapped in braces, `{+"inserted"}`,
//! `{-"deleted"}`, or `{"deleted" >> "inserted"}`. Text inside a changed run
//! is quoted and escaped, so that line breaks are visible as `\n`.

use itertools::Itertools;
use std::fmt;

/// Compute difference between two texts.
pub fn diff(old: &str, new: &str) -> Diff {
    let old = lines(old);
    let new = lines(new);

    let chunks = operations(&old, &new)
        .into_iter()
        .group_by(|op| op.is_same())
        .into_iter()
        .enumerate()
        .map(|(inx, (same, ops))| {
            let separator = if inx > 0 { "\n" } else { "" };

            if same {
                let text = ops.map(Op::text).join("\n");
                return Chunk::Same(format!("{}{}", separator, text));
            }

            let (deleted, inserted): (Vec<_>, Vec<_>) = ops
                .partition(|op| match op {
                    Op::Delete(_) => true,
                    _ => false,
                });

            let deleted = join_run(separator, &deleted);
            let inserted = join_run(separator, &inserted);

            match (deleted, inserted) {
                (Some(deleted), Some(inserted)) =>
                    Chunk::Change { deleted, inserted },
                (Some(deleted), None) => Chunk::Delete(deleted),
                (None, Some(inserted)) => Chunk::Insert(inserted),
                (None, None) => unreachable!("empty group of changes"),
            }
        })
        .collect();

    Diff { chunks }
}

/// Result of comparing two texts, see [`diff()`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diff {
    chunks: Vec<Chunk>,
}

/// A run of lines which were either unchanged or changed.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Chunk {
    Same(String),
    Insert(String),
    Delete(String),
    Change {
        deleted: String,
        inserted: String,
    },
}

impl Diff {
    /// Are both texts identical?
    pub fn is_unchanged(&self) -> bool {
        self.chunks.iter().all(|chunk| match chunk {
            Chunk::Same(_) => true,
            _ => false,
        })
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for chunk in &self.chunks {
            match chunk {
                Chunk::Same(text) => fmt.write_str(text)?,
                Chunk::Insert(text) => write!(fmt, "{{+{:?}}}", text)?,
                Chunk::Delete(text) => write!(fmt, "{{-{:?}}}", text)?,
                Chunk::Change { deleted, inserted } =>
                    write!(fmt, "{{{:?} >> {:?}}}", deleted, inserted)?,
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum Op<'a> {
    Same(&'a str),
    Insert(&'a str),
    Delete(&'a str),
}

impl<'a> Op<'a> {
    fn is_same(&self) -> bool {
        match self {
            Op::Same(_) => true,
            _ => false,
        }
    }

    fn text(self) -> &'a str {
        match self {
            Op::Same(text) | Op::Insert(text) | Op::Delete(text) => text,
        }
    }
}

/// Split text into lines. Unlike [`str::lines`] this keeps a trailing empty
/// line, and yields nothing for an empty text.
fn lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

fn join_run(separator: &str, ops: &[Op]) -> Option<String> {
    if ops.is_empty() {
        None
    } else {
        Some(format!(
            "{}{}", separator, ops.iter().map(|op| op.text()).join("\n")))
    }
}

/// Largest LCS table computed, in cells. Beyond that the changed region is
/// reported as deleted and inserted as a whole.
const MAX_TABLE: usize = 1 << 22;

/// Compute a shortest edit script transforming `old` into `new`, based on
/// the longest common subsequence of lines.
fn operations<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op<'a>> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..].iter().rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    ops.extend(old[..prefix].iter().map(|&line| Op::Same(line)));

    let old_middle = &old[prefix..old.len() - suffix];
    let new_middle = &new[prefix..new.len() - suffix];

    if (old_middle.len() + 1).saturating_mul(new_middle.len() + 1) > MAX_TABLE {
        ops.extend(old_middle.iter().map(|&line| Op::Delete(line)));
        ops.extend(new_middle.iter().map(|&line| Op::Insert(line)));
    } else {
        lcs_operations(old_middle, new_middle, &mut ops);
    }

    ops.extend(old[old.len() - suffix..].iter().map(|&line| Op::Same(line)));
    ops
}

fn lcs_operations<'a>(old: &[&'a str], new: &[&'a str], ops: &mut Vec<Op<'a>>) {
    let width = new.len() + 1;

    // lcs[i * width + j] is the length of the LCS of old[i..] and new[j..].
    let mut lcs = vec![0u32; (old.len() + 1) * width];

    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);

    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            ops.push(Op::Same(old[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(Op::Delete(old[i]));
            i += 1;
        } else {
            ops.push(Op::Insert(new[j]));
            j += 1;
        }
    }

    ops.extend(old[i..].iter().map(|&line| Op::Delete(line)));
    ops.extend(new[j..].iter().map(|&line| Op::Insert(line)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_line() {
        let old = "A woodchuck would chuck all the wood he could chuck if a \
            woodchuck could chuck wood.";
        let new = format!(
            "{}\nAlthough no more than 361 cubic centimetres per day.", old);

        assert_eq!(
            diff(old, &new).to_string(),
            format!("{}{{+\"\\nAlthough no more than 361 cubic centimetres \
                per day.\"}}", old),
        );
    }

    #[test]
    fn identical_texts() {
        let d = diff("one\ntwo", "one\ntwo");
        assert!(d.is_unchanged());
        assert_eq!(d.to_string(), "one\ntwo");
    }

    #[test]
    fn large_texts_with_small_change() {
        let old = (0..20_000).map(|n| n.to_string()).collect::<Vec<_>>();
        let mut new = old.clone();
        new[10_000] = "changed".into();

        assert_eq!(
            diff(&old.join("\n"), &new.join("\n")).to_string(),
            format!("{}{{\"\\n10000\" >> \"\\nchanged\"}}\n{}",
                old[..10_000].join("\n"), old[10_001..].join("\n")),
        );
    }

    #[test]
    fn oversized_change_is_replaced_whole() {
        let old = (0..3_000).map(|n| format!("a{}", n)).collect::<Vec<_>>();
        let new = (0..3_000).map(|n| format!("b{}", n)).collect::<Vec<_>>();

        let d = diff(&old.join("\n"), &new.join("\n"));
        assert_eq!(
            d.to_string(),
            format!("{{{:?} >> {:?}}}", old.join("\n"), new.join("\n")),
        );
    }

    #[test]
    fn deleted_and_replaced_lines() {
        assert_eq!(diff("a\nb\nc", "a\nc").to_string(), "a{-\"\\nb\"}\nc");
        assert_eq!(diff("a\nb", "x\nb").to_string(), "{\"a\" >> \"x\"}\nb");
    }

    #[test]
    fn empty_texts() {
        assert_eq!(diff("", "").to_string(), "");
        assert_eq!(diff("", "new").to_string(), "{+\"new\"}");
        assert_eq!(diff("old", "").to_string(), "{-\"old\"}");
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(
            diff("a", "a\nsay \"hi\"").to_string(),
            "a{+\"\\nsay \\\"hi\\\"\"}",
        );
    }
}
