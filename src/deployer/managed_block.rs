//! `# BEGIN` / `# END` delimited regions owned by webdeploy inside files
//! that belong to other packages.

pub const MARKER_OWNER: &str = "webdeploy managed block";

pub fn begin_marker(name: &str) -> String {
    format!("# BEGIN {}: {}", MARKER_OWNER, name)
}

pub fn end_marker(name: &str) -> String {
    format!("# END {}: {}", MARKER_OWNER, name)
}

/// Line span `[start, end]` (inclusive) of a managed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start: usize,
    pub end: usize,
}

/// Locate the managed block `name` in `lines`. An unterminated BEGIN is ignored.
pub fn find_block(lines: &[&str], name: &str) -> Option<BlockSpan> {
    let begin = begin_marker(name);
    let end = end_marker(name);
    let start = lines.iter().position(|l| l.trim() == begin)?;
    let stop = lines[start + 1..]
        .iter()
        .position(|l| l.trim() == end)
        .map(|offset| start + 1 + offset)?;
    Some(BlockSpan { start, end: stop })
}

/// Wrap `body` in markers, prefixing each marker with `indent`.
pub fn wrap(name: &str, body: &str, indent: &str) -> String {
    format!(
        "{indent}{}\n{}\n{indent}{}",
        begin_marker(name),
        body.trim_end_matches('\n'),
        end_marker(name),
        indent = indent
    )
}

/// Outcome of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockChange {
    Inserted(String),
    Replaced(String),
    Unchanged,
}

impl BlockChange {
    pub fn into_contents(self) -> Option<String> {
        match self {
            BlockChange::Inserted(c) | BlockChange::Replaced(c) => Some(c),
            BlockChange::Unchanged => None,
        }
    }
}

/// Insert or replace the managed block `name` at the end of a flat file
/// such as fail2ban's `jail.local`.
pub fn upsert_appended(contents: &str, name: &str, body: &str) -> BlockChange {
    let block = wrap(name, body, "");
    let lines: Vec<&str> = contents.lines().collect();

    if let Some(span) = find_block(&lines, name) {
        let existing = lines[span.start..=span.end].join("\n");
        if existing == block {
            return BlockChange::Unchanged;
        }
        let mut out: Vec<&str> = lines[..span.start].to_vec();
        out.push(&block);
        out.extend_from_slice(&lines[span.end + 1..]);
        return BlockChange::Replaced(join_lines(&out));
    }

    let mut out = contents.trim_end_matches('\n').to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(&block);
    out.push('\n');
    BlockChange::Inserted(out)
}

pub(crate) fn join_lines(lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
