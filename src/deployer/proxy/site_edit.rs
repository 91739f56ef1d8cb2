//! Structured editing of an nginx site file.
//!
//! The file is scanned into block events (`name args {` / `}`) with quoting
//! and comments respected, so a subdirectory location can be placed inside the
//! first `server` block without line-oriented pattern matching.

use crate::deployer::managed_block::{find_block, join_lines, wrap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SiteEditError {
    #[error("no server block found")]
    NoServerBlock,

    #[error("unexpected '}}' on line {0}")]
    UnbalancedBrace(usize),

    #[error("block opened on line {0} is never closed")]
    UnclosedBlock(usize),
}

/// Result of placing a location into a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteEdit {
    Inserted(String),
    Replaced(String),
    /// The managed block already holds exactly this location.
    Unchanged,
    /// An unmanaged `location /{name}/` exists; it is left alone.
    AlreadyPresent,
}

impl SiteEdit {
    pub fn into_contents(self) -> Option<String> {
        match self {
            SiteEdit::Inserted(c) | SiteEdit::Replaced(c) => Some(c),
            SiteEdit::Unchanged | SiteEdit::AlreadyPresent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockEvent {
    /// `head` holds the directive name and arguments preceding `{`. `line`
    /// and `offset` point at the first head word, not at the brace.
    Open {
        line: usize,
        offset: usize,
        depth: usize,
        head: Vec<String>,
    },
    Close {
        line: usize,
        offset: usize,
        depth: usize,
    },
}

impl BlockEvent {
    fn line(&self) -> usize {
        match self {
            BlockEvent::Open { line, .. } | BlockEvent::Close { line, .. } => *line,
        }
    }

    fn offset(&self) -> usize {
        match self {
            BlockEvent::Open { offset, .. } | BlockEvent::Close { offset, .. } => *offset,
        }
    }
}

fn flush(word: &mut String, words: &mut Vec<String>) {
    if !word.is_empty() {
        words.push(std::mem::take(word));
    }
}

/// Zero-based line numbers and byte offsets; `depth` is the nesting level
/// outside the block.
fn scan(contents: &str) -> Result<Vec<BlockEvent>, SiteEditError> {
    let mut events = Vec::new();
    let mut open_lines: Vec<usize> = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut head_start = (0, 0);
    let mut line = 0;
    let mut chars = contents.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\n' => {
                flush(&mut word, &mut words);
                line += 1;
            }
            '#' if word.is_empty() => {
                while chars.peek().is_some_and(|(_, n)| *n != '\n') {
                    chars.next();
                }
            }
            '"' | '\'' => {
                if words.is_empty() && word.is_empty() {
                    head_start = (line, offset);
                }
                word.push(c);
                while let Some((_, n)) = chars.next() {
                    word.push(n);
                    match n {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                if escaped == '\n' {
                                    line += 1;
                                }
                                word.push(escaped);
                            }
                        }
                        '\n' => line += 1,
                        _ if n == c => break,
                        _ => {}
                    }
                }
            }
            '{' => {
                flush(&mut word, &mut words);
                let (line, offset) = if words.is_empty() {
                    (line, offset)
                } else {
                    head_start
                };
                events.push(BlockEvent::Open {
                    line,
                    offset,
                    depth: open_lines.len(),
                    head: std::mem::take(&mut words),
                });
                open_lines.push(line);
            }
            '}' => {
                flush(&mut word, &mut words);
                words.clear();
                if open_lines.pop().is_none() {
                    return Err(SiteEditError::UnbalancedBrace(line + 1));
                }
                events.push(BlockEvent::Close {
                    line,
                    offset,
                    depth: open_lines.len(),
                });
            }
            ';' => {
                flush(&mut word, &mut words);
                words.clear();
            }
            c if c.is_whitespace() => flush(&mut word, &mut words),
            c => {
                if words.is_empty() && word.is_empty() {
                    head_start = (line, offset);
                }
                word.push(c);
            }
        }
    }

    match open_lines.last() {
        Some(open) => Err(SiteEditError::UnclosedBlock(open + 1)),
        None => Ok(events),
    }
}

fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Shift `body` so that its least indented line starts at `indent`.
fn reindent(body: &str, indent: &str) -> String {
    let common = body
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l).len())
        .min()
        .unwrap_or(0);
    body.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, &l[common..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Place `location_block` (a complete `location /{name}/ { ... }`) inside the
/// first server block of `contents`, wrapped in a managed block.
///
/// The block goes immediately before the server's catch-all `location /`,
/// or before the server's closing brace when it has none.
pub fn inject_location(
    contents: &str,
    name: &str,
    location_block: &str,
) -> Result<SiteEdit, SiteEditError> {
    let events = scan(contents)?;
    let lines: Vec<&str> = contents.lines().collect();

    let server_index = events
        .iter()
        .position(|e| {
            matches!(e, BlockEvent::Open { depth: 0, head, .. }
                if head.first().map(String::as_str) == Some("server"))
        })
        .ok_or(SiteEditError::NoServerBlock)?;

    if let Some(span) = find_block(&lines, name) {
        let indent = leading_whitespace(lines[span.start]);
        let block = wrap(name, &reindent(location_block, indent), indent);
        if lines[span.start..=span.end].join("\n") == block {
            return Ok(SiteEdit::Unchanged);
        }
        let mut out: Vec<&str> = lines[..span.start].to_vec();
        out.push(&block);
        out.extend_from_slice(&lines[span.end + 1..]);
        return Ok(SiteEdit::Replaced(join_lines(&out)));
    }

    let prefix = format!("/{}/", name);
    let unmanaged = events.iter().any(|e| {
        matches!(e, BlockEvent::Open { head, .. }
            if head.first().map(String::as_str) == Some("location")
                && head.last().map(|p| unquote(p)) == Some(prefix.as_str()))
    });
    if unmanaged {
        return Ok(SiteEdit::AlreadyPresent);
    }

    let server_end = events[server_index + 1..]
        .iter()
        .position(|e| matches!(e, BlockEvent::Close { depth: 0, .. }))
        .map(|offset| server_index + 1 + offset)
        .ok_or(SiteEditError::NoServerBlock)?;

    let catch_all = events[server_index + 1..server_end].iter().find(|e| {
        matches!(e, BlockEvent::Open { depth: 1, head, .. }
            if head.len() == 2 && head[0] == "location" && unquote(&head[1]) == "/")
    });

    let server = &events[server_index];
    let server_indent = leading_whitespace(lines[server.line()]);
    let inner_indent = format!("{}    ", server_indent);
    let (anchor, anchor_indent) = match catch_all {
        Some(event) => (event, inner_indent.clone()),
        None => (&events[server_end], server_indent.to_string()),
    };

    if anchor.line() == server.line() {
        // The anchor shares a line with `server {`, so split the line there.
        let block = wrap(name, &reindent(location_block, &inner_indent), &inner_indent);
        let (before, after) = contents.split_at(anchor.offset());
        return Ok(SiteEdit::Inserted(format!(
            "{}\n{}\n\n{}{}",
            before.trim_end_matches([' ', '\t']),
            block,
            anchor_indent,
            after
        )));
    }

    let insert_at = anchor.line();
    let indent = match catch_all {
        Some(_) => leading_whitespace(lines[insert_at]).to_string(),
        None => inner_indent,
    };

    let block = wrap(name, &reindent(location_block, &indent), &indent);
    let mut out: Vec<&str> = lines[..insert_at].to_vec();
    out.push(&block);
    out.push("");
    out.extend_from_slice(&lines[insert_at..]);
    Ok(SiteEdit::Inserted(join_lines(&out)))
}
