//! Role-keyed message store with file-or-literal resolution.
//!
//! A message value shorter than the file-reference threshold is treated as a
//! possible template name and resolved against a fixed list of candidate
//! paths. Role-specific candidates are tried before generic ones:
//!
//! ```text
//! {value}_{role}      {workdir}/{value}_{role}
//! {value}_{role}.md   {workdir}/{value}_{role}.md
//! {value}             {workdir}/{value}
//! {value}.md          {workdir}/{value}.md
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::filesystem::FileSystem;

/// Values shorter than this many characters may name a template file.
pub const DEFAULT_FILE_REF_THRESHOLD: usize = 50;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation.
    System,
    /// Human turn.
    User,
    /// Model turn.
    Assistant,
}

impl Role {
    /// All roles, in the order their template files are auto-loaded.
    pub const ALL: [Role; 3] = [Role::System, Role::User, Role::Assistant];

    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one message per role, kept in first-insertion order.
///
/// Overwriting a role replaces its content but keeps its position, so the
/// compiled prompt order is stable across edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    entries: Vec<(Role, String)>,
}

impl MessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` for `role`, replacing any previous value.
    pub fn insert(&mut self, role: Role, content: String) {
        match self.entries.iter_mut().find(|(r, _)| *r == role) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((role, content)),
        }
    }

    /// Raw content stored for `role`.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<&str> {
        self.entries.iter().find(|(r, _)| *r == role).map(|(_, c)| c.as_str())
    }

    /// Returns `true` if a message is stored for `role`.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Iterates over stored messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.entries.iter().map(|(r, c)| (*r, c.as_str()))
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Turns a setter value into message content.
///
/// Short values are looked up as template files (see module docs); the first
/// existing candidate is read. Anything else, or a short value with no
/// matching file, is returned unchanged.
///
/// # Errors
///
/// Returns an error if a matching candidate exists but cannot be read.
pub fn resolve_content(
    fs: &dyn FileSystem,
    workdir: &Path,
    role: Role,
    value: &str,
    threshold: usize,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    if value.chars().count() >= threshold {
        return Ok(value.to_string());
    }

    match candidate_paths(workdir, role, value).into_iter().find(|path| fs.is_file(path)) {
        Some(path) => {
            debug!(role = %role, path = %path.display(), "loading message from file");
            fs.read_to_string(&path)
        }
        None => Ok(value.to_string()),
    }
}

/// Candidate template paths for `value`, most specific first.
#[must_use]
pub fn candidate_paths(workdir: &Path, role: Role, value: &str) -> Vec<PathBuf> {
    let names = [
        format!("{value}_{role}"),
        format!("{value}_{role}.md"),
        value.to_string(),
        format!("{value}.md"),
    ];
    names
        .into_iter()
        .flat_map(|name| {
            let qualified = workdir.join(&name);
            [PathBuf::from(name), qualified]
        })
        .collect()
}
