use thiserror::Error;

/// Failures raised while building or running an experiment.
///
/// Every variant is fatal for the run that produced it: phases mutate the
/// group's environment in place and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PalmsError {
    #[error("cannot parse part \"{part}\" of phase \"{phase}\"")]
    PhaseSyntax { part: String, phase: String },

    #[error("malformed stimulus name \"{0}\"")]
    MalformedName(String),

    #[error("unknown adaptive type \"{0}\"")]
    UnknownModel(String),

    #[error("stimulus \"{0}\" is not part of the environment")]
    UnknownStimulus(String),

    #[error("numerical instability in {model} (lambda = {lamda}, sigma = {sigma})")]
    Numerical {
        model: &'static str,
        lamda: f64,
        sigma: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot apply directive \"{0}\"")]
    Directive(String),
}

pub type PalmsResult<T> = Result<T, PalmsError>;
