//! Output file name templates.
//!
//! A template such as `{boardTitle}-{}-rev{boardRevision}` expands `{}` to
//! the artifact kind and `{name}` to a variable. `{{` and `}}` produce
//! literal braces.
//!
//! Variables are collected once per run into an immutable [`TemplateVars`]
//! and handed to every expansion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local};
use log::debug;
use thiserror::Error;

use crate::board::BoardData;

/// Template used when none is configured.
pub const DEFAULT_NAME_TEMPLATE: &str = "{}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Name template '{0}' has no placeholder")]
    NoPlaceholder(String),

    #[error("Unknown variable '{name}' in name template '{template}'")]
    UnknownVariable { template: String, name: String },

    #[error("Unbalanced brace in name template '{0}'")]
    UnbalancedBrace(String),

    #[error("Requested text '{text}' expects project variable '{name}' which is missing")]
    MissingProjectVariable { text: String, name: String },
}

pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

/// The value behind one template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// Used verbatim.
    Text(String),
    /// Board text that may reference `${VAR}` project variables.
    ProjectText(String),
    /// `git describe` of the last commit touching the file.
    GitCommit(PathBuf),
    /// Commit date of the last commit touching the file.
    GitDate(PathBuf),
}

impl TemplateValue {
    fn resolve(&self, project_vars: &BTreeMap<String, String>) -> Result<String> {
        match self {
            TemplateValue::Text(text) => Ok(text.clone()),
            TemplateValue::ProjectText(text) => expand_project_vars(text, project_vars),
            TemplateValue::GitCommit(file) => Ok(git_describe(file)),
            TemplateValue::GitDate(file) => Ok(git_date(file)),
        }
    }
}

/// Variables available to name templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, TemplateValue>,
    project_vars: BTreeMap<String, String>,
}

impl TemplateVars {
    /// Variables for `board`, with `now` as the timestamp of this run and
    /// `project_vars` as user-supplied `name -> value` pairs.
    pub fn for_board(
        board: &BoardData,
        project_vars: BTreeMap<String, String>,
        now: DateTime<Local>,
    ) -> Self {
        let mut values = BTreeMap::new();
        let mut text = |name: &str, value: String| {
            values.insert(name.to_string(), TemplateValue::Text(value));
        };
        text("date", now.format("%Y-%m-%d").to_string());
        text("time24", now.format("%H:%M").to_string());
        text("year", now.format("%Y").to_string());
        text("month", now.format("%m").to_string());
        text("day", now.format("%d").to_string());
        text("hour", now.format("%H").to_string());
        text("minute", now.format("%M").to_string());
        text("second", now.format("%S").to_string());

        let title_block = &board.title_block;
        let mut project = |name: String, value: &str| {
            values.insert(name, TemplateValue::ProjectText(value.to_string()));
        };
        project("boardTitle".into(), &title_block.title);
        project("boardDate".into(), &title_block.date);
        project("boardRevision".into(), &title_block.revision);
        project("boardCompany".into(), &title_block.company);
        for i in 0..10 {
            project(format!("boardComment{}", i + 1), title_block.comment(i));
        }

        values.insert(
            "gitCommit".into(),
            TemplateValue::GitCommit(board.file.clone()),
        );
        values.insert("gitDate".into(), TemplateValue::GitDate(board.file.clone()));

        for (name, value) in &project_vars {
            values.insert(format!("user-{name}"), TemplateValue::Text(value.clone()));
        }

        Self {
            values,
            project_vars,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: TemplateValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }

    /// Resolve a single variable.
    pub fn resolve(&self, name: &str) -> Option<Result<String>> {
        self.values
            .get(name)
            .map(|value| value.resolve(&self.project_vars))
    }
}

enum Piece<'a> {
    Literal(char),
    Kind,
    Var(&'a str),
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = template;
    while let Some(c) = rest.chars().next() {
        match c {
            '{' if rest.starts_with("{{") => {
                pieces.push(Piece::Literal('{'));
                rest = &rest[2..];
            }
            '}' if rest.starts_with("}}") => {
                pieces.push(Piece::Literal('}'));
                rest = &rest[2..];
            }
            '{' => {
                let end = rest
                    .find('}')
                    .ok_or_else(|| TemplateError::UnbalancedBrace(template.to_string()))?;
                let name = &rest[1..end];
                if name.contains('{') {
                    return Err(TemplateError::UnbalancedBrace(template.to_string()));
                }
                pieces.push(if name.is_empty() {
                    Piece::Kind
                } else {
                    Piece::Var(name)
                });
                rest = &rest[end + 1..];
            }
            '}' => return Err(TemplateError::UnbalancedBrace(template.to_string())),
            _ => {
                pieces.push(Piece::Literal(c));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    Ok(pieces)
}

/// Expand `template` for an artifact of the given `kind`.
pub fn expand_name_template(template: &str, kind: &str, vars: &TemplateVars) -> Result<String> {
    let pieces = parse(template)?;
    if !pieces
        .iter()
        .any(|p| matches!(p, Piece::Kind | Piece::Var(_)))
    {
        return Err(TemplateError::NoPlaceholder(template.to_string()));
    }

    let mut out = String::with_capacity(template.len() + kind.len());
    for piece in pieces {
        match piece {
            Piece::Literal(c) => out.push(c),
            Piece::Kind => out.push_str(kind),
            Piece::Var(name) => {
                let value = vars
                    .resolve(name)
                    .ok_or_else(|| TemplateError::UnknownVariable {
                        template: template.to_string(),
                        name: name.to_string(),
                    })??;
                out.push_str(&value);
            }
        }
    }
    debug!("Expanded name template '{template}' for {kind} to '{out}'");
    Ok(out)
}

/// Substitute `${NAME}` and `$NAME` references in board text. `$$` is a
/// literal `$`; a `$` not followed by a name is kept as is.
pub fn expand_project_vars(text: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("$$") {
            out.push('$');
            rest = after;
        } else if let Some((name, after)) = tail
            .strip_prefix("${")
            .and_then(|body| body.split_once('}'))
        {
            let value = vars
                .get(name)
                .ok_or_else(|| TemplateError::MissingProjectVariable {
                    text: text.to_string(),
                    name: name.to_string(),
                })?;
            out.push_str(value);
            rest = after;
        } else if let Some(name) = bare_name(&tail[1..]) {
            let value = vars
                .get(name)
                .ok_or_else(|| TemplateError::MissingProjectVariable {
                    text: text.to_string(),
                    name: name.to_string(),
                })?;
            out.push_str(value);
            rest = &tail[1 + name.len()..];
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Leading identifier of `s` (`[A-Za-z_][A-Za-z0-9_]*`).
fn bare_name(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return None;
    }
    let end = s
        .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
        .unwrap_or(s.len());
    Some(&s[..end])
}

fn git_in(file: &Path) -> Command {
    let mut cmd = Command::new("git");
    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        cmd.arg("-C").arg(dir);
    }
    cmd
}

fn file_arg(file: &Path) -> &std::ffi::OsStr {
    file.file_name().unwrap_or(file.as_os_str())
}

fn run_stdout(mut cmd: Command) -> Option<String> {
    let out = cmd.output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn has_changes(file: &Path, cached: bool) -> bool {
    let mut cmd = git_in(file);
    cmd.arg("diff");
    if cached {
        cmd.arg("--cached");
    }
    cmd.arg("--quiet").arg("--").arg(file_arg(file));
    // Exit code 1 means the file differs
    matches!(cmd.status().map(|s| s.code()), Ok(Some(1)))
}

fn git_describe(file: &Path) -> String {
    let mut log = git_in(file);
    log.args(["log", "-1", "--pretty=format:%H", "--"])
        .arg(file_arg(file));
    let Some(commit) = run_stdout(log) else {
        return "unknown".into();
    };

    let mut describe = git_in(file);
    describe.args(["describe", "--always", commit.as_str()]);
    let Some(mut described) = run_stdout(describe) else {
        return "unknown".into();
    };
    if has_changes(file, false) || has_changes(file, true) {
        described.push_str("-d");
    }
    described
}

fn git_date(file: &Path) -> String {
    let mut log = git_in(file);
    log.args(["log", "-1", "--pretty=format:%cs", "--"])
        .arg(file_arg(file));
    run_stdout(log).unwrap_or_else(|| "unknown".into())
}
