use imprimatur_models::{Actor, Edition};
use std::fmt;
use termion::style::{Reset, Underline};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Print rows as a table fitted to the terminal.
///
/// The last column is truncated if the table is too wide.
pub fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let mut widths = header.iter()
        .map(|column| UnicodeWidthStr::width(*column))
        .collect::<Vec<_>>();

    for row in rows {
        for (width, column) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(column.as_str()));
        }
    }

    // Sum of all longest widths and spaces separating them.
    let total_width = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);

    let (terminal_width, _) = termion::terminal_size().unwrap_or((80, 20));
    let terminal_width = usize::from(terminal_width);

    if total_width > terminal_width {
        if let Some(last) = widths.last_mut() {
            *last = last.saturating_sub(total_width - terminal_width).max(1);
        }
    }

    for (inx, (column, width)) in header.iter().zip(&widths).enumerate() {
        if inx > 0 {
            print!(" ");
        }
        print!("{}{}{}", Underline, Column(column, *width), Reset);
    }
    println!();

    for row in rows {
        for (inx, (column, width)) in row.iter().zip(&widths).enumerate() {
            if inx > 0 {
                print!(" ");
            }
            print!("{}", Column(column, *width));
        }
        println!();
    }
}

/// A string padded or truncated to a specific display width.
struct Column<'a>(&'a str, usize);

impl<'a> fmt::Display for Column<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let (len, end) = self.0.char_indices()
            .scan(0, |total_len, (inx, chr)| {
                *total_len += UnicodeWidthChar::width(chr).unwrap_or(0);
                if *total_len > self.1 {
                    None
                } else {
                    Some((*total_len, inx + chr.len_utf8()))
                }
            })
            .last()
            .unwrap_or((0, 0));

        let pad = self.1.saturating_sub(len);

        write!(fmt, "{0}{1:2$}", &self.0[..end], "", pad)
    }
}

/// Format an edition's ID for display.
pub fn edition_id(edition: &Edition) -> String {
    edition.id().map_or_else(|| "-".to_string(), |id| id.to_string())
}

pub fn actor(actor: Actor) -> String {
    match actor {
        Actor::System => "system".to_string(),
        Actor::User(id) => format!("#{}", id),
    }
}

/// Shorten multi-line text to its first line.
pub fn first_line(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("");

    if lines.next().is_some() {
        format!("{}…", first)
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_padded_and_truncated() {
        assert_eq!(Column("abc", 5).to_string(), "abc  ");
        assert_eq!(Column("abcdef", 3).to_string(), "abc");
        assert_eq!(Column("żółw", 3).to_string(), "żół");
        assert_eq!(Column("", 2).to_string(), "  ");
    }

    #[test]
    fn first_line_only() {
        assert_eq!(first_line("one\ntwo"), "one…");
        assert_eq!(first_line("one"), "one");
        assert_eq!(first_line(""), "");
    }
}
