use thiserror::Error;

/// Typed failures of the analysis pipeline.
///
/// Segmentation and matching have no error path: any string is valid input.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    #[error("rule table malformed: {0}")]
    RuleTableMalformed(String),

    #[error("classifier model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("training data invalid: {0}")]
    TrainingDataInvalid(String),

    #[error("analysis result malformed: {0}")]
    ResultMalformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RiskResult<T> = Result<T, RiskError>;
