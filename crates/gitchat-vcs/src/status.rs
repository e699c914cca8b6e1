//! Parsing of `git status --porcelain` (v1) output.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Index column (`X`).
    pub index: char,
    /// Worktree column (`Y`).
    pub worktree: char,
    /// Path relative to the repository root; for renames, the new path.
    pub path: String,
}

impl StatusEntry {
    pub fn is_untracked(&self) -> bool {
        self.index == '?' && self.worktree == '?'
    }

    /// Untracked, added, or modified: content that exists locally but is not committed.
    pub fn is_pending(&self) -> bool {
        self.is_untracked()
            || self.index == 'A'
            || self.index == 'M'
            || self.worktree == 'M'
    }
}

pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<StatusEntry> {
    let mut chars = line.chars();
    let index = chars.next()?;
    let worktree = chars.next()?;
    let rest = line.get(3..)?;
    let raw_path = match rest.rsplit_once(" -> ") {
        Some((_, new_path)) if matches!(index, 'R' | 'C') => new_path,
        _ => rest,
    };
    let path = unquote(raw_path.trim_end());
    if path.is_empty() {
        return None;
    }
    Some(StatusEntry {
        index,
        worktree,
        path,
    })
}

/// Undo git's C-style quoting of unusual path names.
fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(d @ b'0'..=b'7') => {
                let mut value = (d - b'0') as u32;
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + (o - b'0') as u32;
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
