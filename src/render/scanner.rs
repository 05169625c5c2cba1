/// Lexical context of the byte under the cursor while walking SQL text.
#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Returns the tag and the index of the opening quote's closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end] == *tag.as_bytes()
        && bytes.get(end) == Some(&b'$')
}

impl State {
    /// Advance past quoted text and comments.
    ///
    /// Returns the index of the last byte consumed and whether the byte at `idx` was
    /// plain SQL (state `Normal` and not opening a quote or comment).
    pub(super) fn step(&mut self, bytes: &[u8], idx: usize) -> (usize, bool) {
        let b = bytes[idx];
        match self {
            State::Normal => match b {
                b'\'' => *self = State::SingleQuoted,
                b'"' => *self = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => *self = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    *self = State::BlockComment(1);
                    return (idx + 1, false);
                }
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        *self = State::DollarQuoted(tag);
                        return (advance, false);
                    }
                    return (idx, true);
                }
                _ => return (idx, true),
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        return (idx + 1, false); // escaped quote
                    }
                    *self = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        return (idx + 1, false); // escaped quote
                    }
                    *self = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    *self = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    *depth += 1;
                    return (idx + 1, false);
                } else if is_block_comment_end(bytes, idx) {
                    if *depth == 1 {
                        *self = State::Normal;
                    } else {
                        *depth -= 1;
                    }
                    return (idx + 1, false);
                }
            }
            State::DollarQuoted(tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let close = idx + 1 + tag.len();
                    *self = State::Normal;
                    return (close, false);
                }
            }
        }
        (idx, false)
    }
}
