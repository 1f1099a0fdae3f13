//! Error taxonomy
//!
//! Configuration errors abort construction of the object being built and
//! propagate to whoever orchestrates level loading. Steady-state simulation
//! never produces these; it degrades to logged warnings instead.

use thiserror::Error;

/// Level-load and construction failures
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unsupported shape for actor sizing: {0}")]
    UnsupportedShape(&'static str),

    #[error("no {kind} with label '{label}' found on this layer")]
    MissingElement { kind: String, label: String },

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute { attribute: String, value: String },

    #[error("path data error at byte {position}: {message}")]
    PathSyntax { position: usize, message: String },

    #[error("transform syntax error: {0}")]
    TransformSyntax(String),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised by a render target while drawing
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),

    #[error("render backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
