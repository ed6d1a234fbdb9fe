//! Structured error types for the simulation kernel.
//!
//! All fallible public APIs return `Result<T, DevsError>`. Structural and
//! configuration errors are fatal to the run being assembled; none of them
//! is retried by the kernel.

use crate::architecture::ModelUri;
use crate::event::EventType;

/// Boxed cause carried by [`DevsError::Construction`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The top-level error type of the kernel.
#[derive(Debug, thiserror::Error)]
pub enum DevsError {
    // ── Architecture errors ───────────────────────────────

    /// A descriptor with this URI is already registered.
    #[error("model {0} is already registered")]
    DuplicateModel(ModelUri),

    /// A URI was referenced but no descriptor is registered for it.
    #[error("model {0} is not registered")]
    UnknownModel(ModelUri),

    /// A descriptor is malformed or its routing/bindings are inconsistent.
    #[error("invalid descriptor for {uri}: {reason}")]
    InvalidDescriptor { uri: ModelUri, reason: String },

    /// An operation requiring a complete architecture was attempted early.
    #[error("architecture is incomplete: {0}")]
    IncompleteArchitecture(String),

    /// A root was requested while another root is already set.
    #[error("root model is already set to {existing}")]
    RootAlreadySet { existing: ModelUri },

    /// An atomic root was added to an architecture that already has models.
    #[error("an atomic root requires an empty architecture ({count} models present)")]
    ArchitectureNotEmpty { count: usize },

    /// The simulation time unit may only be declared once.
    #[error("simulation time unit is already set")]
    TimeUnitAlreadySet,

    /// The pairwise event priority declarations contain a cycle.
    #[error("event priorities contain a cycle: {}", display_cycle(.0))]
    PriorityCycle(Vec<EventType>),

    // ── Construction errors ───────────────────────────────

    /// Instantiating the engine of a model failed.
    #[error("failed to construct engine for {uri}")]
    Construction {
        uri: ModelUri,
        #[source]
        source: BoxError,
    },

    // ── Runtime errors ────────────────────────────────────

    /// A protocol call was made in the wrong state or with undeclared data.
    #[error("protocol violation on {uri}: {reason}")]
    ProtocolViolation { uri: ModelUri, reason: String },

    // ── Parameter / config errors ─────────────────────────

    /// A required run parameter is absent.
    #[error("missing run parameter {key}")]
    MissingParameter { key: String },

    /// A run parameter has an unexpected type.
    #[error("run parameter {key} is not a {expected}")]
    ParameterType { key: String, expected: &'static str },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl DevsError {
    pub(crate) fn invalid(uri: &ModelUri, reason: impl Into<String>) -> Self {
        DevsError::InvalidDescriptor {
            uri: uri.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(uri: &ModelUri, reason: impl Into<String>) -> Self {
        DevsError::ProtocolViolation {
            uri: uri.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn construction(uri: &ModelUri, source: impl Into<BoxError>) -> Self {
        DevsError::Construction {
            uri: uri.clone(),
            source: source.into(),
        }
    }
}

fn display_cycle(cycle: &[EventType]) -> String {
    cycle
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Convenience alias for `Result<T, DevsError>`.
pub type DevsResult<T> = Result<T, DevsError>;
