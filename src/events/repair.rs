//! Best-effort JSON repair
//!
//! Pure text-in, text-out fixes for the malformed files the provider
//! occasionally delivers. Each call applies at most one fix, chosen from the
//! parse error:
//!
//! 1. missing `,` between two values: insert it at the boundary
//! 2. unexpected end of input: close every open string, object and array
//! 3. anything else: cut back to the last complete array element and close
//!    what is still open (drops the tail of the file)
//!
//! The caller re-parses after every fix and logs each one.

use serde_json::error::Category;

/// Which fix was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairKind {
    InsertSeparator,
    CloseAggregates,
    Truncate,
}

impl RepairKind {
    pub fn label(&self) -> &'static str {
        match self {
            RepairKind::InsertSeparator => "insert-separator",
            RepairKind::CloseAggregates => "close-aggregates",
            RepairKind::Truncate => "truncate",
        }
    }
}

/// A fix and the byte offset it was applied at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repair {
    pub kind: RepairKind,
    pub offset: usize,
}

/// Attempt one fix for `err`, which must come from parsing `content`
pub fn repair(content: &str, err: &serde_json::Error) -> Option<(String, Repair)> {
    let offset = error_offset(content, err.line(), err.column());

    if is_missing_separator(err) {
        if let Some(fixed) = insert_separator(content, offset) {
            return Some(fixed);
        }
    }

    if err.classify() == Category::Eof {
        if let Some(fixed) = close_aggregates(content) {
            return Some(fixed);
        }
    }

    truncate_to_last_element(content, offset)
}

fn is_missing_separator(err: &serde_json::Error) -> bool {
    err.classify() == Category::Syntax && err.to_string().starts_with("expected `,`")
}

/// Byte offset of a 1-based line / column error position
fn error_offset(content: &str, line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        content
            .match_indices('\n')
            .nth(line - 2)
            .map_or(content.len(), |(i, _)| i + 1)
    };
    (line_start + column.saturating_sub(1)).min(content.len())
}

fn insert_separator(content: &str, offset: usize) -> Option<(String, Repair)> {
    let boundary = content.get(..offset)?.trim_end().len();
    let prev = content[..boundary].chars().last()?;
    let ends_value = matches!(prev, '"' | '}' | ']' | 'e' | 'l') || prev.is_ascii_digit();
    if !ends_value {
        return None;
    }

    let mut fixed = String::with_capacity(content.len() + 1);
    fixed.push_str(&content[..boundary]);
    fixed.push(',');
    fixed.push_str(&content[boundary..]);
    Some((
        fixed,
        Repair {
            kind: RepairKind::InsertSeparator,
            offset: boundary,
        },
    ))
}

fn close_aggregates(content: &str) -> Option<(String, Repair)> {
    let scan = scan(content.as_bytes(), content.len());
    if scan.stack.is_empty() && !scan.in_string {
        return None;
    }

    let mut fixed = content.to_string();
    if scan.in_string {
        fixed.push('"');
    }
    let trimmed = fixed.trim_end().trim_end_matches(',').len();
    fixed.truncate(trimmed);
    if fixed.ends_with(':') {
        return None;
    }

    let offset = fixed.len();
    fixed.push_str(&closers(&scan.stack));
    Some((
        fixed,
        Repair {
            kind: RepairKind::CloseAggregates,
            offset,
        },
    ))
}

fn truncate_to_last_element(content: &str, offset: usize) -> Option<(String, Repair)> {
    let scan = scan(content.as_bytes(), offset);
    let (end, stack) = scan.last_element_end?;

    let mut fixed = content[..end].to_string();
    fixed.push_str(&closers(&stack));
    Some((
        fixed,
        Repair {
            kind: RepairKind::Truncate,
            offset: end,
        },
    ))
}

fn closers(stack: &[u8]) -> String {
    stack
        .iter()
        .rev()
        .map(|&open| if open == b'{' { '}' } else { ']' })
        .collect()
}

/// Structural state of a prefix of the input
struct Scan {
    /// Open `{` / `[` markers, innermost last
    stack: Vec<u8>,
    in_string: bool,
    /// End of the last complete element of the event list, with the
    /// markers still open at that point
    last_element_end: Option<(usize, Vec<u8>)>,
}

fn scan(bytes: &[u8], upto: usize) -> Scan {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut last_element_end = None;

    for (i, &b) in bytes[..upto.min(bytes.len())].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(b),
            b'}' | b']' => {
                stack.pop();
                if is_event_list(&stack) {
                    last_element_end = Some((i + 1, stack.clone()));
                }
            }
            _ => {}
        }
    }

    Scan {
        stack,
        in_string,
        last_element_end,
    }
}

/// A bare top-level array, or the array directly under the wrapper object
fn is_event_list(stack: &[u8]) -> bool {
    matches!(stack, [b'['] | [b'{', b'['])
}
