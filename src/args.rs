//! Parsing of the user-supplied option string into escaped argv tokens.
//!
//! The raw string is tokenized with shell-style quote grouping, variables
//! are expanded against the run's environment snapshot (never the
//! controller's ambient environment), and each token is escaped for the
//! selected strategy. Tokens of the form `key=value` have only the value
//! escaped, so property names stay byte-identical.

use crate::environment::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::escape::Escaper;
use log::LevelFilter;

/// Parses, expands, and escapes the user's option string.
pub fn parse_argument_string(
    raw: &str,
    env: &EnvironmentSnapshot,
    escaper: Escaper,
) -> Result<Vec<String>> {
    let tokens = tokenize(raw)?;
    Ok(tokens
        .iter()
        .flat_map(|token| token.split(['\r', '\n']))
        .filter(|piece| !piece.is_empty())
        .map(|piece| expand_variables(piece, env))
        .map(|piece| escape_token(&piece, escaper))
        .collect())
}

/// Flags the launcher itself appends after the user's tokens. These are
/// controller-generated and therefore never escaped.
pub fn injected_flags() -> Vec<String> {
    vec![
        format!("--logging.level.detect={}", scanner_log_level()),
        format!(
            "--detect.phone.home.passthrough.launcher.name={}",
            env!("CARGO_PKG_NAME")
        ),
        format!(
            "--detect.phone.home.passthrough.launcher.version={}",
            env!("CARGO_PKG_VERSION")
        ),
    ]
}

fn scanner_log_level() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "OFF",
        LevelFilter::Error => "ERROR",
        LevelFilter::Warn => "WARN",
        LevelFilter::Info => "INFO",
        LevelFilter::Debug => "DEBUG",
        LevelFilter::Trace => "TRACE",
    }
}

/// Splits on whitespace with single- and double-quote grouping. Quotes are
/// stripped; adjacent quoted segments join into one token.
fn tokenize(raw: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    has_token = true;
                }
                c if c.is_whitespace() => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    has_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(Error::Configuration(format!(
            "Unbalanced quotes in argument string: {raw}"
        )));
    }
    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Expands `$NAME` and `${NAME}` from the snapshot. Unknown variables
/// expand to the empty string.
fn expand_variables(token: &str, env: &EnvironmentSnapshot) -> String {
    let mut expanded = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            expanded.push(c);
            continue;
        }

        let mut name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
        }

        if name.is_empty() {
            expanded.push('$');
        } else {
            expanded.push_str(env.get(&name).unwrap_or_default());
        }
    }

    expanded
}

fn escape_token(token: &str, escaper: Escaper) -> String {
    match token.split_once('=') {
        Some((key, value)) => format!("{key}={}", escaper.apply(value)),
        None => escaper.apply(token),
    }
}
