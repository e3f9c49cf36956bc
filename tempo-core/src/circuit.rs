//! Circuit programs: ordered, loopable step sequences.
//!
//! A [`CircuitProgram`] has no notion of time. The engine decides when a step
//! has run out and calls [`CircuitProgram::advance`]; the program only answers
//! what comes next.

use chrono::Duration;
use tracing::debug;

use crate::error::ConfigurationError;
use crate::format::format_mmss;
use crate::MAX_LOOP_COUNT;

/// One timed segment of a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    duration: Duration,
    note: String,
}

impl Step {
    pub fn new(duration: Duration, note: impl Into<String>) -> Self {
        Self {
            duration,
            note: note.into(),
        }
    }

    /// `i64::MIN` has no `Duration`; it is clamped to the most negative one,
    /// which construction then rejects like any other non-positive step.
    pub fn from_millis(millis: i64) -> Self {
        Self::new(Duration::milliseconds(millis.max(-i64::MAX)), String::new())
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn note(&self) -> &str {
        &self.note
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPolicy {
    #[default]
    None,
    /// Run the whole sequence `n` times, `n >= 2`.
    Count(u32),
    Infinite,
}

impl LoopPolicy {
    fn validate(self) -> Result<Self, ConfigurationError> {
        match self {
            LoopPolicy::Count(n) if n < 2 => Err(ConfigurationError::LoopCountTooSmall(n)),
            LoopPolicy::Count(n) if n > MAX_LOOP_COUNT => {
                Err(ConfigurationError::LoopCountTooLarge(n))
            }
            policy => Ok(policy),
        }
    }
}

/// What the engine should do after the current step ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    NextStep(Step),
    LoopRestart(Step),
    Complete,
}

/// Where a running circuit stands, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitProgress {
    pub step_index: usize,
    pub step_count: usize,
    pub loop_label: Option<String>,
    pub note: Option<String>,
    pub step_duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitProgram {
    name: String,
    steps: Vec<Step>,
    loop_policy: LoopPolicy,
    current_step: usize,
    /// 1-based count of passes that have started.
    iteration: u32,
    /// Passes left including the current one; only consulted for `Count`.
    remaining_iterations: u32,
}

impl CircuitProgram {
    /// Builds a program named after its steps.
    pub fn new(steps: Vec<Step>, loop_policy: LoopPolicy) -> Result<Self, ConfigurationError> {
        Self::build(None, steps, loop_policy)
    }

    pub fn named(
        name: impl Into<String>,
        steps: Vec<Step>,
        loop_policy: LoopPolicy,
    ) -> Result<Self, ConfigurationError> {
        Self::build(Some(name.into()), steps, loop_policy)
    }

    fn build(
        name: Option<String>,
        steps: Vec<Step>,
        loop_policy: LoopPolicy,
    ) -> Result<Self, ConfigurationError> {
        if steps.is_empty() {
            return Err(ConfigurationError::EmptyCircuit);
        }
        if let Some((index, step)) = steps
            .iter()
            .enumerate()
            .find(|(_, step)| step.duration <= Duration::zero())
        {
            return Err(ConfigurationError::NonPositiveStep {
                index,
                millis: step.duration.num_milliseconds(),
            });
        }
        let loop_policy = loop_policy.validate()?;
        let name = match name.map(|n| n.trim().to_string()) {
            Some(n) if !n.is_empty() => n,
            _ => default_name(&steps, loop_policy),
        };
        let mut program = Self {
            name,
            steps,
            loop_policy,
            current_step: 0,
            iteration: 1,
            remaining_iterations: 1,
        };
        program.rewind();
        Ok(program)
    }

    /// Moves past the step that just ran out.
    pub fn advance(&mut self) -> Advance {
        if self.current_step + 1 < self.steps.len() {
            self.current_step += 1;
            debug!(circuit = %self.name, step = self.current_step, "circuit next step");
            return Advance::NextStep(self.current().clone());
        }

        match self.loop_policy {
            LoopPolicy::Infinite => {
                self.restart_pass();
                Advance::LoopRestart(self.current().clone())
            }
            LoopPolicy::Count(_) => {
                self.remaining_iterations = self.remaining_iterations.saturating_sub(1);
                if self.remaining_iterations > 0 {
                    self.restart_pass();
                    Advance::LoopRestart(self.current().clone())
                } else {
                    Advance::Complete
                }
            }
            LoopPolicy::None => Advance::Complete,
        }
    }

    fn restart_pass(&mut self) {
        self.current_step = 0;
        self.iteration += 1;
        debug!(circuit = %self.name, iteration = self.iteration, "circuit loop restart");
    }

    /// Back to the first step of the first pass.
    pub fn rewind(&mut self) {
        self.current_step = 0;
        self.iteration = 1;
        self.remaining_iterations = match self.loop_policy {
            LoopPolicy::Count(n) => n,
            _ => 1,
        };
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn loop_policy(&self) -> LoopPolicy {
        self.loop_policy
    }

    pub fn current(&self) -> &Step {
        &self.steps[self.current_step]
    }

    pub fn current_index(&self) -> usize {
        self.current_step
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// `None` unless the policy is `Count`.
    pub fn remaining_iterations(&self) -> Option<u32> {
        match self.loop_policy {
            LoopPolicy::Count(_) => Some(self.remaining_iterations),
            _ => None,
        }
    }

    pub fn loop_label(&self) -> Option<String> {
        match self.loop_policy {
            LoopPolicy::Infinite => Some(format!("∞ Loop {}", self.iteration)),
            LoopPolicy::Count(n) => Some(format!("Loop {}/{}", self.iteration, n)),
            LoopPolicy::None => None,
        }
    }

    pub fn progress(&self) -> CircuitProgress {
        let step = self.current();
        let note = step.note().trim();
        CircuitProgress {
            step_index: self.current_step,
            step_count: self.steps.len(),
            loop_label: self.loop_label(),
            note: (!note.is_empty()).then(|| note.to_string()),
            step_duration: step.duration(),
        }
    }
}

/// `00:30-00:10 (3x loop)` style name for unnamed circuits.
pub fn default_name(steps: &[Step], loop_policy: LoopPolicy) -> String {
    let base = steps
        .iter()
        .map(|s| format_mmss(s.duration()))
        .collect::<Vec<_>>()
        .join("-");
    match loop_policy {
        LoopPolicy::Infinite => format!("{} (∞ loop)", base),
        LoopPolicy::Count(n) => format!("{} ({}x loop)", base, n),
        LoopPolicy::None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn steps(millis: &[i64]) -> Vec<Step> {
        millis.iter().copied().map(Step::from_millis).collect()
    }

    #[test]
    fn test_next_step_keeps_iteration() {
        let mut program = CircuitProgram::new(steps(&[2000, 3000]), LoopPolicy::None).unwrap();
        assert_eq!(program.advance(), Advance::NextStep(Step::from_millis(3000)));
        assert_eq!(program.current_index(), 1);
        assert_eq!(program.iteration(), 1);
        assert_eq!(program.advance(), Advance::Complete);
    }

    #[test]
    fn test_count_policy_runs_n_passes() {
        let mut program =
            CircuitProgram::new(steps(&[2000, 3000]), LoopPolicy::Count(2)).unwrap();
        assert_eq!(program.remaining_iterations(), Some(2));
        assert!(matches!(program.advance(), Advance::NextStep(_)));
        assert_eq!(program.advance(), Advance::LoopRestart(Step::from_millis(2000)));
        assert_eq!(program.iteration(), 2);
        assert_eq!(program.remaining_iterations(), Some(1));
        assert_eq!(program.loop_label().as_deref(), Some("Loop 2/2"));
        assert!(matches!(program.advance(), Advance::NextStep(_)));
        assert_eq!(program.advance(), Advance::Complete);
        assert_eq!(program.remaining_iterations(), Some(0));
    }

    #[test]
    fn test_infinite_never_completes() {
        let mut program = CircuitProgram::new(steps(&[1000]), LoopPolicy::Infinite).unwrap();
        for pass in 2..50 {
            assert_eq!(program.advance(), Advance::LoopRestart(Step::from_millis(1000)));
            assert_eq!(program.iteration(), pass);
        }
        assert_eq!(program.loop_label().as_deref(), Some("∞ Loop 49"));
        assert_eq!(program.remaining_iterations(), None);
    }

    #[test]
    fn test_rewind_resets_counters() {
        let mut program = CircuitProgram::new(steps(&[1000, 1000]), LoopPolicy::Count(3)).unwrap();
        program.advance();
        program.advance();
        program.advance();
        program.rewind();
        assert_eq!(program.current_index(), 0);
        assert_eq!(program.iteration(), 1);
        assert_eq!(program.remaining_iterations(), Some(3));
    }

    #[test_case(vec![], LoopPolicy::None => ConfigurationError::EmptyCircuit ; "empty")]
    #[test_case(steps(&[1000, 0]), LoopPolicy::None
        => ConfigurationError::NonPositiveStep { index: 1, millis: 0 } ; "zero step")]
    #[test_case(steps(&[-5]), LoopPolicy::None
        => ConfigurationError::NonPositiveStep { index: 0, millis: -5 } ; "negative step")]
    #[test_case(steps(&[i64::MIN]), LoopPolicy::None
        => ConfigurationError::NonPositiveStep { index: 0, millis: -i64::MAX } ; "unrepresentable step")]
    #[test_case(steps(&[1000]), LoopPolicy::Count(1)
        => ConfigurationError::LoopCountTooSmall(1) ; "single pass count")]
    #[test_case(steps(&[1000]), LoopPolicy::Count(100)
        => ConfigurationError::LoopCountTooLarge(100) ; "count over limit")]
    fn test_rejected_programs(steps: Vec<Step>, policy: LoopPolicy) -> ConfigurationError {
        CircuitProgram::new(steps, policy).unwrap_err()
    }

    #[test]
    fn test_default_names() {
        let s = steps(&[30_000, 10_000]);
        assert_eq!(default_name(&s, LoopPolicy::None), "00:30-00:10");
        assert_eq!(default_name(&s, LoopPolicy::Count(3)), "00:30-00:10 (3x loop)");
        assert_eq!(default_name(&s, LoopPolicy::Infinite), "00:30-00:10 (∞ loop)");

        let blank = CircuitProgram::named("  ", s.clone(), LoopPolicy::None).unwrap();
        assert_eq!(blank.name(), "00:30-00:10");
        let named = CircuitProgram::named("Tabata", s, LoopPolicy::None).unwrap();
        assert_eq!(named.name(), "Tabata");
    }

    #[test]
    fn test_progress_carries_note() {
        let program = CircuitProgram::new(
            vec![Step::new(Duration::seconds(20), " burpees "), Step::from_millis(10_000)],
            LoopPolicy::Infinite,
        )
        .unwrap();
        let progress = program.progress();
        assert_eq!(progress.step_index, 0);
        assert_eq!(progress.step_count, 2);
        assert_eq!(progress.note.as_deref(), Some("burpees"));
        assert_eq!(progress.loop_label.as_deref(), Some("∞ Loop 1"));
        assert_eq!(progress.step_duration, Duration::seconds(20));
    }
}
