//! Partial JSON Extraction
//!
//! Best-effort extraction of a JSON object embedded in free-form model
//! output, tolerant of truncation while the text is still streaming.
//!
//! Extraction order:
//! 1. the inner text of the first fenced code block, when one is present
//!    (the closing fence may not have arrived yet);
//! 2. otherwise the last balanced `{...}` span found by a string-aware brace
//!    scan — models sometimes emit explanatory prose containing braces
//!    before the real answer, so the last span wins;
//! 3. otherwise the trailing unclosed object, mended by
//!    [`complete_truncated`].
//!
//! Every failure path degrades to an empty object with `is_valid = false`.
//! Callers treat that as "no decision yet", never as an error. The function
//! is pure: repeated calls on a growing prefix of the same final text never
//! lose a field that an earlier call already produced.

use serde_json::Value;

/// Result of a partial parse: whatever fields are already unambiguous, plus
/// whether the candidate was strictly valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialJson {
    pub data: Value,
    pub is_valid: bool,
}

impl PartialJson {
    fn empty() -> Self {
        Self {
            data: Value::Object(serde_json::Map::new()),
            is_valid: false,
        }
    }
}

/// Parse a possibly-incomplete JSON object out of mixed streamed text.
///
/// Never panics and never returns an error.
pub fn parse_partial_json(text: &str) -> PartialJson {
    let Some(candidate) = extract_json_candidate(text) else {
        return PartialJson::empty();
    };

    // Strict parse first: only this path reports is_valid.
    if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
        if value.is_object() || value.is_array() {
            return PartialJson {
                data: value,
                is_valid: true,
            };
        }
    }

    match complete_truncated(&candidate) {
        Some(value) => PartialJson {
            data: value,
            is_valid: false,
        },
        None => PartialJson::empty(),
    }
}

/// Pick the JSON candidate span out of mixed content.
pub fn extract_json_candidate(text: &str) -> Option<String> {
    if let Some(inner) = extract_fenced_block(text) {
        return Some(inner);
    }
    extract_last_object_span(text)
}

/// Inner text of the first fenced code block, tolerating a missing closing
/// fence and an optional `json` language tag.
fn extract_fenced_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let mut rest = text[open + 3..].trim_start();
    // Slice through `get`: the text after the fence may start mid multibyte
    // character, and a byte-indexed slice would panic there.
    if let Some(tag) = rest.get(..4) {
        if tag.eq_ignore_ascii_case("json") {
            rest = &rest[4..];
        }
    }
    let inner = match rest.find("```") {
        Some(close) => &rest[..close],
        None => rest,
    };
    let inner = inner.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Last balanced `{...}` span in the text, or the trailing unclosed object
/// when no span has balanced yet. The scan skips brace characters inside
/// string literals.
fn extract_last_object_span(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    let mut span_start = None;
    let mut last_balanced = None;
    let mut open_start = None;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    span_start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(start) = span_start {
                            last_balanced = Some((start, i + 1));
                        }
                        span_start = None;
                    }
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        open_start = span_start;
    }

    // A still-open trailing object beats earlier balanced prose braces: the
    // real answer is the one still streaming.
    if let Some(start) = open_start {
        return Some(text[start..].to_string());
    }
    last_balanced.map(|(start, end)| text[start..end].to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Expecting a value (root, after `:`, after `[` or array `,`)
    ValueStart,
    /// Inside a string value
    InString,
    /// Inside an object key string
    InKeyString,
    /// After `{` or object `,`: expecting a key or `}`
    KeyStart,
    /// Key string closed, expecting `:`
    AfterKey,
    /// Inside a number / `true` / `false` / `null` token
    InScalar,
    /// Value finished: expecting `,` or a closer
    AfterValue,
}

/// Mend a truncated JSON object/array so it parses: close the open string,
/// drop a partial key, complete a partial literal, strip dangling separators,
/// then close every open container. Returns the parsed value, or None when
/// the text cannot be mended into valid JSON.
fn complete_truncated(candidate: &str) -> Option<Value> {
    let s = candidate.trim();
    if !s.starts_with('{') && !s.starts_with('[') {
        return None;
    }

    let mut stack: Vec<Container> = Vec::new();
    // One truncation point per open object: the index at which a partial
    // trailing key (and its preceding comma) can be cut away.
    let mut key_cuts: Vec<usize> = Vec::new();
    let mut state = State::ValueStart;
    let mut escape = false;
    let mut scalar_start = 0usize;

    for (i, ch) in s.char_indices() {
        match state {
            State::InString | State::InKeyString => {
                if escape {
                    escape = false;
                } else if ch == '\\' {
                    escape = true;
                } else if ch == '"' {
                    state = if state == State::InKeyString {
                        State::AfterKey
                    } else {
                        State::AfterValue
                    };
                }
            }
            State::ValueStart => match ch {
                c if c.is_whitespace() => {}
                '"' => state = State::InString,
                '{' => {
                    stack.push(Container::Object);
                    key_cuts.push(i + 1);
                    state = State::KeyStart;
                }
                '[' => {
                    stack.push(Container::Array);
                }
                ']' if stack.last() == Some(&Container::Array) => {
                    stack.pop();
                    state = State::AfterValue;
                }
                _ => {
                    scalar_start = i;
                    state = State::InScalar;
                }
            },
            State::KeyStart => match ch {
                c if c.is_whitespace() => {}
                '"' => state = State::InKeyString,
                '}' => {
                    stack.pop();
                    key_cuts.pop();
                    state = State::AfterValue;
                }
                _ => return None,
            },
            State::AfterKey => match ch {
                c if c.is_whitespace() => {}
                ':' => state = State::ValueStart,
                _ => return None,
            },
            State::InScalar | State::AfterValue => {
                if state == State::InScalar && !matches!(ch, ',' | '}' | ']') {
                    if ch.is_whitespace() {
                        state = State::AfterValue;
                    }
                    continue;
                }
                match ch {
                    c if c.is_whitespace() => {}
                    ',' => match stack.last() {
                        Some(Container::Object) => {
                            if let Some(cut) = key_cuts.last_mut() {
                                *cut = i;
                            }
                            state = State::KeyStart;
                        }
                        Some(Container::Array) => state = State::ValueStart,
                        None => return None,
                    },
                    '}' => {
                        if stack.pop() != Some(Container::Object) {
                            return None;
                        }
                        key_cuts.pop();
                        state = State::AfterValue;
                    }
                    ']' => {
                        if stack.pop() != Some(Container::Array) {
                            return None;
                        }
                        state = State::AfterValue;
                    }
                    _ => return None,
                }
            }
        }
    }

    let mut mended = s.to_string();
    match state {
        State::InString => {
            if escape {
                mended.pop();
            }
            mended.push('"');
        }
        State::InKeyString | State::AfterKey => {
            // Drop the partial trailing key along with its comma.
            if let Some(cut) = key_cuts.last() {
                mended.truncate(*cut);
            }
        }
        State::KeyStart => {
            if let Some(cut) = key_cuts.last() {
                mended.truncate(*cut);
            }
        }
        State::InScalar => {
            let token: String = s[scalar_start..].trim_end().to_string();
            mended.truncate(scalar_start);
            mended.push_str(&complete_scalar_token(&token)?);
        }
        State::ValueStart => {
            while mended.ends_with(char::is_whitespace) {
                mended.pop();
            }
            if mended.ends_with(',') {
                mended.pop();
            } else if mended.ends_with(':') {
                mended.push_str("null");
            }
        }
        State::AfterValue => {}
    }

    while let Some(container) = stack.pop() {
        mended.push(match container {
            Container::Object => '}',
            Container::Array => ']',
        });
    }

    serde_json::from_str::<Value>(&mended)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// Complete a truncated bare token: literal prefixes become the full
/// literal, numbers lose dangling exponent/sign characters.
fn complete_scalar_token(token: &str) -> Option<String> {
    if token.is_empty() {
        return Some("null".to_string());
    }
    for literal in ["true", "false", "null"] {
        if literal.starts_with(token) {
            return Some(literal.to_string());
        }
    }
    let mut number = token.to_string();
    while number.ends_with(['+', '-', '.', 'e', 'E']) {
        number.pop();
    }
    if number.is_empty() {
        Some("null".to_string())
    } else if number.parse::<f64>().is_ok() {
        Some(number)
    } else {
        None
    }
}
