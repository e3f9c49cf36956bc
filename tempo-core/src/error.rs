use thiserror::Error;

/// Rejections raised while a program is being configured. State is left
/// untouched whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("circuit has no steps")]
    EmptyCircuit,

    #[error("step {index} has non-positive duration ({millis}ms)")]
    NonPositiveStep { index: usize, millis: i64 },

    #[error("countdown duration must be positive, got {millis}ms")]
    NonPositiveDuration { millis: i64 },

    #[error("loop count must be at least 2, got {0}")]
    LoopCountTooSmall(u32),

    #[error("loop count must be at most 99, got {0}")]
    LoopCountTooLarge(u32),

    #[error("invalid alarm time: {0}")]
    InvalidAlarmTime(String),

    #[error("an alarm at {0} with the same repeat already exists")]
    DuplicateAlarm(String),

    #[error("malformed circuit definition: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TempoError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),
}

impl From<serde_json::Error> for TempoError {
    fn from(err: serde_json::Error) -> Self {
        TempoError::Configuration(ConfigurationError::Malformed(err.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, TempoError>;
