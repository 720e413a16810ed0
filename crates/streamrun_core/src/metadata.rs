//! # Run Metadata
//!
//! The record that identifies a logical run. It is built by the session
//! before binding and treated as immutable afterwards. The guarded handle
//! never looks inside it.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Alphabet for generated run ids (base-36, lowercase).
const RUN_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated run ids.
///
/// 36^8 is roughly 2.8e12 ids; 210k generated ids give about a 1% chance
/// of a collision.
pub const GENERATED_RUN_ID_LEN: usize = 8;

/// Identifier of a run. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Creates a run id from a caller-chosen string.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// [`MetadataError::EmptyRunId`] if `id` is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, MetadataError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(MetadataError::EmptyRunId);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    /// Generates a random base-36 run id of [`GENERATED_RUN_ID_LEN`] characters.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..GENERATED_RUN_ID_LEN)
            .map(|_| char::from(RUN_ID_ALPHABET[rng.gen_range(0..RUN_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RunId {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunId> for String {
    fn from(value: RunId) -> Self {
        value.0
    }
}

/// Metadata identifying one run.
///
/// ## Usage
///
/// ```rust
/// use streamrun_core::{RunId, RunMetadata};
///
/// let run = RunMetadata::new(RunId::generate())
///     .with_entity("team")
///     .with_project("sweeps")
///     .with_tag("baseline");
/// assert_eq!(run.project.as_deref(), Some("sweeps"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunMetadata {
    /// Run identifier.
    pub id: RunId,
    /// Owning user or team.
    #[serde(default)]
    pub entity: Option<String>,
    /// Project the run belongs to.
    #[serde(default)]
    pub project: Option<String>,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Group for related runs.
    #[serde(default)]
    pub group: Option<String>,
    /// Kind of job (train, eval, ...).
    #[serde(default)]
    pub job_type: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Start time in Unix milliseconds. Defaults to load time.
    #[serde(default = "unix_millis_now")]
    pub start_time_ms: u64,
    /// First step number the run logs at.
    #[serde(default)]
    pub starting_step: u64,
    /// Whether this run resumes an earlier one.
    #[serde(default)]
    pub resumed: bool,
}

impl RunMetadata {
    /// Creates metadata for `id`, starting now.
    #[must_use]
    pub fn new(id: RunId) -> Self {
        Self {
            id,
            entity: None,
            project: None,
            display_name: None,
            group: None,
            job_type: None,
            tags: Vec::new(),
            start_time_ms: unix_millis_now(),
            starting_step: 0,
            resumed: false,
        }
    }

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Sets the project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the job type.
    #[must_use]
    pub fn with_job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Marks the run as resumed from `starting_step`.
    #[must_use]
    pub fn resumed_at(mut self, starting_step: u64) -> Self {
        self.resumed = true;
        self.starting_step = starting_step;
        self
    }
}

fn unix_millis_now() -> u64 {
    // A clock before the epoch reads as 0.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_rejects_blank() {
        assert_eq!(RunId::new(""), Err(MetadataError::EmptyRunId));
        assert_eq!(RunId::new("   "), Err(MetadataError::EmptyRunId));
    }

    #[test]
    fn test_run_id_trims() {
        let id = RunId::new("  run-1 ").unwrap();
        assert_eq!(id.as_str(), "run-1");
        assert_eq!(id.to_string(), "run-1");
    }

    #[test]
    fn test_generated_ids_are_base36() {
        let id = RunId::generate();
        assert_eq!(id.as_str().len(), GENERATED_RUN_ID_LEN);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_builder_sets_fields() {
        let run = RunMetadata::new(RunId::new("abc").unwrap())
            .with_entity("team")
            .with_project("proj")
            .with_display_name("fancy-run")
            .with_group("g")
            .with_job_type("train")
            .with_tag("a")
            .with_tag("b")
            .resumed_at(42);

        assert_eq!(run.entity.as_deref(), Some("team"));
        assert_eq!(run.project.as_deref(), Some("proj"));
        assert_eq!(run.display_name.as_deref(), Some("fancy-run"));
        assert_eq!(run.group.as_deref(), Some("g"));
        assert_eq!(run.job_type.as_deref(), Some("train"));
        assert_eq!(run.tags, vec!["a".to_owned(), "b".to_owned()]);
        assert!(run.resumed);
        assert_eq!(run.starting_step, 42);
        assert!(run.start_time_ms > 0);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let run: RunMetadata = toml::from_str(
            r#"
            id = "run-7"
            project = "vision"
            tags = ["x"]
            "#,
        )
        .unwrap();
        assert_eq!(run.id.as_str(), "run-7");
        assert_eq!(run.project.as_deref(), Some("vision"));
        assert_eq!(run.tags, vec!["x".to_owned()]);
        assert!(!run.resumed);
    }

    #[test]
    fn test_missing_start_time_defaults_to_now() {
        let before = unix_millis_now();
        let run: RunMetadata = toml::from_str(r#"id = "run-7""#).unwrap();
        let after = unix_millis_now();
        assert!(run.start_time_ms >= before && run.start_time_ms <= after);
    }

    #[test]
    fn test_explicit_start_time_is_kept() {
        let run: RunMetadata = toml::from_str(
            r#"
            id = "run-7"
            start_time_ms = 1234
            "#,
        )
        .unwrap();
        assert_eq!(run.start_time_ms, 1234);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result: Result<RunMetadata, _> = toml::from_str(
            r#"
            id = "run-7"
            projct = "typo"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_empty_id() {
        let result: Result<RunMetadata, _> = toml::from_str(r#"id = """#);
        assert!(result.is_err());
    }
}
