//! Circuit definitions as they arrive from config files and the circuit
//! builder.
//!
//! Steps come in two shapes, a bare millisecond count or an object with a
//! note. Both are normalized into [`Step`] here; nothing past this module
//! looks at the raw shape.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::circuit::{CircuitProgram, LoopPolicy, Step};
use crate::error::{ConfigurationError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Millis(i64),
    Detailed {
        ms: i64,
        #[serde(default)]
        note: String,
    },
}

impl StepSpec {
    fn millis(&self) -> i64 {
        match self {
            StepSpec::Millis(ms) | StepSpec::Detailed { ms, .. } => *ms,
        }
    }

    fn normalize(&self, index: usize) -> std::result::Result<Step, ConfigurationError> {
        let millis = self.millis();
        let duration = Duration::try_milliseconds(millis)
            .ok_or(ConfigurationError::NonPositiveStep { index, millis })?;
        Ok(match self {
            StepSpec::Millis(_) => Step::new(duration, String::new()),
            StepSpec::Detailed { note, .. } => Step::new(duration, note.clone()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LoopSpec {
    #[default]
    None,
    Count {
        count: u32,
    },
    Infinite,
}

impl From<LoopSpec> for LoopPolicy {
    fn from(spec: LoopSpec) -> Self {
        match spec {
            LoopSpec::None => LoopPolicy::None,
            LoopSpec::Count { count } => LoopPolicy::Count(count),
            LoopSpec::Infinite => LoopPolicy::Infinite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<StepSpec>,
    #[serde(default, rename = "loop")]
    pub loop_spec: LoopSpec,
}

impl CircuitDefinition {
    pub fn steps(&self) -> std::result::Result<Vec<Step>, ConfigurationError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, spec)| spec.normalize(index))
            .collect()
    }

    pub fn loop_policy(&self) -> LoopPolicy {
        self.loop_spec.into()
    }

    /// Validates and builds a fresh program positioned at its first step.
    pub fn into_program(&self) -> std::result::Result<CircuitProgram, ConfigurationError> {
        let steps = self.steps()?;
        match &self.name {
            Some(name) => CircuitProgram::named(name.clone(), steps, self.loop_policy()),
            None => CircuitProgram::new(steps, self.loop_policy()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(CircuitDefinition),
    Many(Vec<CircuitDefinition>),
}

/// Parses a JSON document holding one definition or an array of them.
pub fn parse_definitions(json: &str) -> Result<Vec<CircuitDefinition>> {
    let parsed: OneOrMany = serde_json::from_str(json)?;
    Ok(match parsed {
        OneOrMany::One(def) => vec![def],
        OneOrMany::Many(defs) => defs,
    })
}
