//! Stage identifiers and their declared context dependencies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of pipeline stages, ordered as they first run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Research,
    Analysis,
    Writing,
    Critique,
    Editing,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Research,
        Stage::Analysis,
        Stage::Writing,
        Stage::Critique,
        Stage::Editing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Analysis => "analysis",
            Stage::Writing => "writing",
            Stage::Critique => "critique",
            Stage::Editing => "editing",
        }
    }

    /// Upstream outputs this stage is allowed to read
    pub fn dependencies(self) -> &'static [Stage] {
        match self {
            Stage::Research => &[],
            Stage::Analysis => &[Stage::Research],
            Stage::Writing => &[Stage::Analysis],
            Stage::Critique => &[Stage::Writing],
            Stage::Editing => &[Stage::Writing, Stage::Critique],
        }
    }

    /// Human-readable agent name used in progress output
    pub fn agent_name(self) -> &'static str {
        match self {
            Stage::Research => "Research Agent",
            Stage::Analysis => "Analyst Agent",
            Stage::Writing => "Writer Agent",
            Stage::Critique => "Critic Agent",
            Stage::Editing => "Editor Agent",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown stage: {s}"))
    }
}

/// Output of one stage execution. Superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub raw_text: String,
    pub produced_at: DateTime<Utc>,
}

impl StageResult {
    pub fn new(stage: Stage, raw_text: impl Into<String>) -> Self {
        Self {
            stage,
            raw_text: raw_text.into(),
            produced_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_only_point_upstream() {
        for stage in Stage::ALL {
            for dep in stage.dependencies() {
                assert!(dep < &stage, "{stage} must not depend on {dep}");
            }
        }
    }

    #[test]
    fn test_editing_reads_writing_and_critique() {
        assert_eq!(
            Stage::Editing.dependencies(),
            &[Stage::Writing, Stage::Critique]
        );
        assert!(Stage::Research.dependencies().is_empty());
    }

    #[test]
    fn test_analysis_never_reads_writing() {
        assert!(!Stage::Analysis.dependencies().contains(&Stage::Writing));
    }

    #[test]
    fn test_from_str_round_trips_names() {
        for stage in Stage::ALL {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!(" Critique ".parse::<Stage>().unwrap(), Stage::Critique);
        assert!("publishing".parse::<Stage>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Stage::Editing).unwrap(), "\"editing\"");
    }
}
