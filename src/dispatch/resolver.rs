//! Command resolution: tokenizing, keyword lookup, and argument extraction.
//!
//! The first token names the command and is looked up case-insensitively.
//! Later tokens only become arguments when they carry the `var:` marker;
//! everything else is dropped so plain words can be added to commands later
//! without changing what actions receive.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Literal prefix that marks a token as an argument.
pub const VAR_PREFIX: &str = "var:";

/// Keyword to executable table. Keys are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    bindings: HashMap<String, PathBuf>,
}

impl ActionTable {
    /// Build a table from keyword/path pairs. Keywords are lowercased.
    pub fn new<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, PathBuf)>,
        K: AsRef<str>,
    {
        let bindings = bindings
            .into_iter()
            .map(|(keyword, path)| (keyword.as_ref().to_lowercase(), path))
            .collect();
        Self { bindings }
    }

    /// Look up a command name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.bindings.get(&name.to_lowercase()).map(PathBuf::as_path)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings sorted by keyword.
    pub fn sorted(&self) -> Vec<(&str, &Path)> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_path()))
            .collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries
    }
}

/// Command name plus extracted arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased first token.
    pub name: String,
    /// Marker argument values in message order.
    pub args: Vec<String>,
}

/// A parsed command bound to its executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Parsed command.
    pub command: ParsedCommand,
    /// Executable bound to the command name.
    pub action: PathBuf,
}

/// Why a message did not resolve to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatch {
    /// The text held no tokens.
    Empty,
    /// The text could not be tokenized.
    Malformed(TokenizeError),
    /// No binding exists for the command name.
    UnknownCommand(String),
}

impl std::fmt::Display for NoMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty message"),
            Self::Malformed(e) => write!(f, "{e}"),
            Self::UnknownCommand(name) => write!(f, "no keyword matched {name:?}"),
        }
    }
}

/// Tokenizer failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    /// A quote was opened but never closed.
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
}

/// Split text into shell-like tokens.
///
/// Whitespace separates tokens except inside single or double quotes.
/// Quotes are removed and a quoted empty string is still a token. A
/// backslash escapes the next character outside quotes and `\\`, `"`
/// inside double quotes.
///
/// # Errors
///
/// Returns [`TokenizeError::UnterminatedQuote`] when a quote is left open.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('"'), '\\') => match chars.peek() {
                Some(&next) if next == '"' || next == '\\' => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push(ch),
            },
            (Some(_), _) => current.push(ch),
            (None, '\'' | '"') => {
                quote = Some(ch);
                in_token = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(TokenizeError::UnterminatedQuote(q));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn var_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^var:(.+)$").ok())
        .as_ref()
}

/// Value of a `var:` marker token, or `None` for plain tokens.
pub fn extract_argument(token: &str) -> Option<&str> {
    let captures = var_pattern()?.captures(token)?;
    captures.get(1).map(|m| m.as_str())
}

/// Keep only marker tokens, in order, stripped of their prefix.
pub fn extract_arguments<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens
        .iter()
        .filter_map(|token| extract_argument(token.as_ref()))
        .map(ToOwned::to_owned)
        .collect()
}

/// Resolve message text against the action table.
///
/// # Errors
///
/// Returns the [`NoMatch`] reason when nothing should run. None of these
/// are failures; the caller simply skips the message.
pub fn resolve(text: &str, table: &ActionTable) -> Result<ResolvedCommand, NoMatch> {
    let tokens = tokenize(text.trim()).map_err(NoMatch::Malformed)?;
    let (first, rest) = tokens.split_first().ok_or(NoMatch::Empty)?;

    let name = first.to_lowercase();
    let action = table
        .get(&name)
        .ok_or_else(|| NoMatch::UnknownCommand(name.clone()))?
        .to_path_buf();

    Ok(ResolvedCommand {
        command: ParsedCommand {
            name,
            args: extract_arguments(rest),
        },
        action,
    })
}
