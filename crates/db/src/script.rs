//! CQL script resources and statement splitting.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::DbError;

/// Where a script's text comes from.
#[derive(Debug, Clone)]
enum ScriptSource {
    Embedded(&'static str),
    File(PathBuf),
}

/// A named CQL script applied by the keyspace populator.
#[derive(Debug, Clone)]
pub struct ScriptResource {
    name: String,
    source: ScriptSource,
}

impl ScriptResource {
    /// Script compiled into the binary.
    pub fn embedded(name: impl Into<String>, body: &'static str) -> Self {
        Self {
            name: name.into(),
            source: ScriptSource::Embedded(body),
        }
    }

    /// Script read from disk when it is applied.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            name: path.display().to_string(),
            source: ScriptSource::File(path.to_path_buf()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> Result<Cow<'static, str>, DbError> {
        match &self.source {
            ScriptSource::Embedded(body) => Ok(Cow::Borrowed(*body)),
            ScriptSource::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| DbError::ScriptRead {
                    script: self.name.clone(),
                    source,
                }),
        }
    }

    /// Statements of this script in file order.
    pub fn statements(&self) -> Result<Vec<String>, DbError> {
        let contents = self.contents()?;
        split_statements(&contents).map_err(|message| DbError::ScriptSyntax {
            script: self.name.clone(),
            message,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    SingleQuoted,
    DoubleQuoted,
    DollarQuoted,
    LineComment,
    BlockComment,
}

/// Split a CQL script into statements on `;`.
///
/// Semicolons inside string literals (including `$$ ... $$` constants),
/// quoted identifiers and comments do not terminate a statement. Comments are stripped, statements are trimmed and
/// empty ones dropped. A final statement without `;` is kept.
pub fn split_statements(script: &str) -> Result<Vec<String>, String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Code;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                ';' => push_statement(&mut statements, &mut current),
                '\'' => {
                    state = State::SingleQuoted;
                    current.push(c);
                }
                '"' => {
                    state = State::DoubleQuoted;
                    current.push(c);
                }
                '$' if chars.peek() == Some(&'$') => {
                    chars.next();
                    state = State::DollarQuoted;
                    current.push_str("$$");
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                _ => current.push(c),
            },
            // '' escapes a quote inside a literal, so toggling out and back in
            // on the doubled quote keeps the literal intact.
            State::SingleQuoted => {
                current.push(c);
                if c == '\'' {
                    state = State::Code;
                }
            }
            State::DoubleQuoted => {
                current.push(c);
                if c == '"' {
                    state = State::Code;
                }
            }
            State::DollarQuoted => {
                current.push(c);
                if c == '$' && chars.peek() == Some(&'$') {
                    chars.next();
                    current.push('$');
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push(c);
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push(' ');
                    state = State::Code;
                }
            }
        }
    }

    match state {
        State::SingleQuoted => return Err("unterminated string literal".to_string()),
        State::DoubleQuoted => return Err("unterminated quoted identifier".to_string()),
        State::DollarQuoted => return Err("unterminated $$ string constant".to_string()),
        State::BlockComment => return Err("unterminated block comment".to_string()),
        State::Code | State::LineComment => {}
    }

    push_statement(&mut statements, &mut current);
    Ok(statements)
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}
