//! Quote-aware argument tokenizer.
//!
//! Implements the quoted-string grammar used for free-text compiler
//! arguments: whitespace separates tokens, single and double quotes group
//! text, and a backslash escapes only quotes, spaces and itself so that
//! Windows paths such as `C:\pb\bin` pass through untouched.

/// Characters that end a token outside of quotes.
const DELIMITERS: &[char] = &[' ', '\t', '\n', '\r', '\u{c}'];

/// Characters a backslash may escape. Any other escaped character keeps
/// its backslash.
const ESCAPABLE: &[char] = &['\\', '"', '\'', ' '];

/// Error returned when an argument string cannot be tokenized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unterminated {quote} quote at offset {offset} in arguments: {input}")]
pub struct MalformedArgumentError {
    /// The raw argument string.
    pub input: String,
    /// The opening quote character.
    pub quote: char,
    /// Byte offset of the opening quote.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Token,
    Quoted { quote: char, offset: usize },
}

/// Split `raw` into tokens.
///
/// A trailing lone backslash is consumed as an escape with nothing to
/// escape and disappears; [`tokenize_args`] restores it.
///
/// # Errors
///
/// Returns `MalformedArgumentError` if a quote is never closed.
pub fn tokenize(raw: &str) -> Result<Vec<String>, MalformedArgumentError> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut has_token = false;
    let mut escape = false;
    let mut state = State::Start;

    for (offset, c) in raw.char_indices() {
        if escape {
            escape = false;
            if !ESCAPABLE.contains(&c) {
                token.push('\\');
            }
            token.push(c);
            continue;
        }

        match state {
            State::Start => {
                if DELIMITERS.contains(&c) {
                    continue;
                }
                has_token = true;
                if c == '"' || c == '\'' {
                    state = State::Quoted { quote: c, offset };
                } else {
                    // A backslash opening a token is literal (UNC paths).
                    token.push(c);
                    state = State::Token;
                }
            }
            State::Token => {
                if DELIMITERS.contains(&c) {
                    tokens.push(std::mem::take(&mut token));
                    has_token = false;
                    state = State::Start;
                } else if c == '"' || c == '\'' {
                    state = State::Quoted { quote: c, offset };
                } else if c == '\\' {
                    escape = true;
                } else {
                    token.push(c);
                }
            }
            State::Quoted { quote, .. } => {
                if c == quote {
                    state = State::Token;
                } else if c == '\\' {
                    escape = true;
                } else {
                    token.push(c);
                }
            }
        }
    }

    if let State::Quoted { quote, offset } = state {
        return Err(MalformedArgumentError {
            input: raw.to_string(),
            quote,
            offset,
        });
    }

    if has_token {
        tokens.push(token);
    }

    Ok(tokens)
}

/// Tokenize an argument string, preserving quotes and a trailing backslash.
///
/// # Errors
///
/// Returns `MalformedArgumentError` if a quote is never closed.
pub fn tokenize_args(raw: &str) -> Result<Vec<String>, MalformedArgumentError> {
    let mut tokens = tokenize(raw)?;

    if raw.ends_with('\\') {
        if let Some(last) = tokens.last_mut() {
            last.push('\\');
        }
    }

    Ok(tokens)
}
