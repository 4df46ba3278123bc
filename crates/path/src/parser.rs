//! Path tokenizer.
//!
//! A character-class state machine consumes the input one character at a
//! time. Identifier characters and bracketed indices accumulate into a
//! pending key; `.`, `[`, `]`, trailing whitespace and end of input flush the
//! pending key into the output. Any (state, class) pair without a rule is a
//! parse error. No backtracking: O(n) in the input length.

use thiserror::Error;

use crate::key::{is_ident_start, PathKey};

/// Parser states that can appear in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    BeforePath,
    InPath,
    BeforeIdent,
    InIdent,
    BeforeElement,
    AfterZero,
    InIndex,
    InSingleQuote,
    InDoubleQuote,
    AfterElement,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    #[error("empty path")]
    Empty,
    #[error("unexpected character {ch:?} at offset {offset} in state {state:?}")]
    UnexpectedChar {
        ch: char,
        offset: usize,
        state: ParserState,
    },
    #[error("unexpected end of path in state {state:?}")]
    UnexpectedEnd { state: ParserState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Eof,
    OpenBracket,
    CloseBracket,
    Dot,
    SingleQuote,
    DoubleQuote,
    Zero,
    Digit,
    Ident,
    Whitespace,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    /// Append the current character to the pending key.
    Append,
    /// Start an (initially empty) quoted key.
    OpenQuoted,
    /// Flush the pending key, if any.
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    State(ParserState),
    AfterPath,
}

fn classify(c: Option<char>) -> CharClass {
    let Some(c) = c else {
        return CharClass::Eof;
    };
    match c {
        '[' => CharClass::OpenBracket,
        ']' => CharClass::CloseBracket,
        '.' => CharClass::Dot,
        '\'' => CharClass::SingleQuote,
        '"' => CharClass::DoubleQuote,
        '0' => CharClass::Zero,
        '1'..='9' => CharClass::Digit,
        ' ' | '\t' | '\n' | '\r' | '\u{a0}' | '\u{feff}' | '\u{2028}' | '\u{2029}' => {
            CharClass::Whitespace
        }
        c if is_ident_start(c) => CharClass::Ident,
        _ => CharClass::Other,
    }
}

fn transition(state: ParserState, class: CharClass) -> Option<(Next, Action)> {
    use CharClass as C;
    use Next::{AfterPath, State};
    use ParserState as S;

    let rule = match (state, class) {
        (S::BeforePath, C::Whitespace) => (State(S::BeforePath), Action::None),
        (S::BeforePath, C::Ident) => (State(S::InIdent), Action::Append),
        (S::BeforePath, C::OpenBracket) => (State(S::BeforeElement), Action::None),
        (S::BeforePath, C::Eof) => (AfterPath, Action::None),

        (S::InPath, C::Whitespace) => (State(S::InPath), Action::None),
        (S::InPath, C::Dot) => (State(S::BeforeIdent), Action::None),
        (S::InPath, C::OpenBracket) => (State(S::BeforeElement), Action::None),
        (S::InPath, C::Eof) => (AfterPath, Action::None),

        (S::BeforeIdent, C::Whitespace) => (State(S::BeforeIdent), Action::None),
        (S::BeforeIdent, C::Ident) => (State(S::InIdent), Action::Append),

        (S::InIdent, C::Ident | C::Zero | C::Digit) => (State(S::InIdent), Action::Append),
        (S::InIdent, C::Whitespace) => (State(S::InPath), Action::Push),
        (S::InIdent, C::Dot) => (State(S::BeforeIdent), Action::Push),
        (S::InIdent, C::OpenBracket) => (State(S::BeforeElement), Action::Push),
        (S::InIdent, C::Eof) => (AfterPath, Action::Push),

        (S::BeforeElement, C::Whitespace) => (State(S::BeforeElement), Action::None),
        (S::BeforeElement, C::Zero) => (State(S::AfterZero), Action::Append),
        (S::BeforeElement, C::Digit) => (State(S::InIndex), Action::Append),
        (S::BeforeElement, C::SingleQuote) => (State(S::InSingleQuote), Action::OpenQuoted),
        (S::BeforeElement, C::DoubleQuote) => (State(S::InDoubleQuote), Action::OpenQuoted),

        (S::AfterZero, C::Whitespace) => (State(S::AfterElement), Action::Push),
        (S::AfterZero, C::CloseBracket) => (State(S::InPath), Action::Push),

        (S::InIndex, C::Zero | C::Digit) => (State(S::InIndex), Action::Append),
        (S::InIndex, C::Whitespace) => (State(S::AfterElement), Action::None),
        (S::InIndex, C::CloseBracket) => (State(S::InPath), Action::Push),

        (S::InSingleQuote, C::SingleQuote) => (State(S::AfterElement), Action::None),
        (S::InSingleQuote, C::Eof) => return None,
        (S::InSingleQuote, _) => (State(S::InSingleQuote), Action::Append),

        (S::InDoubleQuote, C::DoubleQuote) => (State(S::AfterElement), Action::None),
        (S::InDoubleQuote, C::Eof) => return None,
        (S::InDoubleQuote, _) => (State(S::InDoubleQuote), Action::Append),

        (S::AfterElement, C::Whitespace) => (State(S::AfterElement), Action::None),
        (S::AfterElement, C::CloseBracket) => (State(S::InPath), Action::Push),

        _ => return None,
    };
    Some(rule)
}

/// Parses a property-access expression into its keys.
///
/// Accepted syntax: dotted identifiers (`a.b`), bracketed indices (`a[0]`),
/// bracketed quoted names (`a['x.y']`, `a["q\"uote"]`), with insignificant
/// whitespace around tokens.
///
/// # Example
///
/// ```
/// use json_observe_path::{parse_path, PathKey};
///
/// assert_eq!(
///     parse_path("a.b[2]['c d']").unwrap(),
///     vec![
///         PathKey::Name("a".into()),
///         PathKey::Name("b".into()),
///         PathKey::Index(2),
///         PathKey::Name("c d".into()),
///     ]
/// );
/// assert!(parse_path("a..b").is_err());
/// assert!(parse_path("").is_err());
/// ```
pub fn parse_path(text: &str) -> Result<Vec<PathKey>, PathParseError> {
    if text.is_empty() {
        return Err(PathParseError::Empty);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut keys = Vec::new();
    let mut pending: Option<String> = None;
    let mut state = ParserState::BeforePath;
    let mut offset = 0;

    loop {
        let c = chars.get(offset).copied();

        // `\'` inside single quotes and `\"` inside double quotes are literal quotes.
        if c == Some('\\') {
            let quote = match state {
                ParserState::InSingleQuote => Some('\''),
                ParserState::InDoubleQuote => Some('"'),
                _ => None,
            };
            if let Some(quote) = quote {
                if chars.get(offset + 1) == Some(&quote) {
                    pending.get_or_insert_with(String::new).push(quote);
                    offset += 2;
                    continue;
                }
            }
        }

        let Some((next, action)) = transition(state, classify(c)) else {
            return Err(match c {
                Some(ch) => PathParseError::UnexpectedChar { ch, offset, state },
                None => PathParseError::UnexpectedEnd { state },
            });
        };

        match action {
            Action::None => {}
            Action::Append => {
                if let Some(ch) = c {
                    pending.get_or_insert_with(String::new).push(ch);
                }
            }
            Action::OpenQuoted => {
                pending.get_or_insert_with(String::new);
            }
            Action::Push => {
                if let Some(key) = pending.take() {
                    keys.push(PathKey::name(key));
                }
            }
        }

        match next {
            Next::AfterPath => return Ok(keys),
            Next::State(s) => state = s,
        }
        offset += 1;
    }
}
