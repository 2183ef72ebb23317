//! Rich diagnostic error types for the reasoner bridge.
//!
//! Kernel failure signals are kept as a structured [`KernelFault`] and wrapped
//! transparently; everything the bridge itself detects (bad handles, wrong
//! operand kinds, unmet preconditions) gets its own variant.

use miette::Diagnostic;
use thiserror::Error;

use crate::entity::EntityKind;
pub use crate::kernel::error::KernelFault;

/// The single error type surfaced by [`Reasoner`](crate::reasoner::Reasoner).
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Kernel(#[from] KernelFault),

    #[error("unknown {kind}: \"{name}\"")]
    #[diagnostic(
        code(dlbridge::unknown_entity),
        help(
            "No {kind} with this name is registered in the knowledge base. \
             Declare it first, or check the spelling."
        )
    )]
    UnknownEntity { kind: EntityKind, name: String },

    #[error("{operation}: expected {expected}, got {actual} \"{name}\"")]
    #[diagnostic(
        code(dlbridge::kind_mismatch),
        help("The handle passed to `{operation}` has the wrong entity kind. Check the argument order.")
    )]
    KindMismatch {
        operation: &'static str,
        expected: &'static str,
        actual: EntityKind,
        name: String,
    },

    #[error("stale entity handle: {handle}")]
    #[diagnostic(
        code(dlbridge::stale_handle),
        help(
            "The handle was produced by another reasoner, or by this reasoner before \
             it was cleared or reloaded. Look the entity up again."
        )
    )]
    StaleHandle { handle: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(dlbridge::invalid_config), help("Check the reasoner configuration. {message}"))]
    InvalidConfig { message: String },

    #[error("cannot read configuration {path}: {source}")]
    #[diagnostic(
        code(dlbridge::config_io),
        help("Check that the configuration file exists and is readable.")
    )]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} needs at least one operand")]
    #[diagnostic(code(dlbridge::empty_operands), help("Pass one or more operands to `{operation}`."))]
    EmptyOperands { operation: &'static str },

    #[error("{operation} requires a classified knowledge base")]
    #[diagnostic(code(dlbridge::not_classified), help("Call `classify()` first."))]
    NotClassified { operation: &'static str },

    #[error("{operation} requires a realised knowledge base")]
    #[diagnostic(code(dlbridge::not_realised), help("Call `classify()` and then `realise()` first."))]
    NotRealised { operation: &'static str },

    #[error("reasoner is unusable: the kernel could not be cleared")]
    #[diagnostic(
        code(dlbridge::poisoned),
        help("Drop this reasoner and create a new one. Its kernel state is undefined.")
    )]
    Poisoned,
}

/// Convenience alias for functions returning bridge results.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
