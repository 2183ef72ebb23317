//! Failure signals raised by a reasoning kernel.

use miette::Diagnostic;
use thiserror::Error;

/// The fixed set of failure categories a kernel can report.
///
/// Every kernel implementation maps its internal failures onto exactly one of
/// these. The bridge surfaces them unchanged inside
/// [`BridgeError::Kernel`](crate::error::BridgeError::Kernel).
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum KernelFault {
    #[error("axiom load failure: {message}")]
    #[diagnostic(
        code(dlbridge::kernel::axiom_load),
        help(
            "The kernel refused an axiom. Check that every argument has the kind \
             the axiom expects (e.g. a class on both sides of a concept inclusion)."
        )
    )]
    AxiomLoad { message: String },

    #[error("cannot register name \"{name}\": already registered as {existing}")]
    #[diagnostic(
        code(dlbridge::kernel::cant_register_name),
        help(
            "Names are unique across entity kinds. Pick a different name, \
             or look the existing entity up with the matching accessor."
        )
    )]
    CantRegisterName { name: String, existing: String },

    #[error("cycle in role inclusion axioms: {roles}")]
    #[diagnostic(
        code(dlbridge::kernel::cycle_in_ria),
        help("Remove one of the object property inclusions that closes the cycle.")
    )]
    CycleInRia { roles: String },

    #[error("knowledge base is inconsistent: {reason}")]
    #[diagnostic(
        code(dlbridge::kernel::inconsistent_kb),
        help(
            "No model satisfies the loaded axioms. Inspect the assertions \
             about the named individual and the disjointness axioms that apply to it."
        )
    )]
    InconsistentKb { reason: String },

    #[error("non-simple role \"{role}\" used where a simple role is required")]
    #[diagnostic(
        code(dlbridge::kernel::non_simple_role),
        help(
            "Transitive roles, and roles with a transitive sub-role, cannot appear \
             in cardinality restrictions."
        )
    )]
    NonSimpleRole { role: String },

    #[error("save/load failure: {message}")]
    #[diagnostic(
        code(dlbridge::kernel::save_load),
        help(
            "The knowledge base snapshot could not be written or read. \
             Check the path, its permissions and that the file is a snapshot \
             written by the same kernel."
        )
    )]
    SaveLoad { message: String },

    #[error("operation timed out after {limit_ms} ms")]
    #[diagnostic(
        code(dlbridge::kernel::timeout),
        help("Raise the operation timeout, or set it to zero to disable it.")
    )]
    Timeout { limit_ms: u64 },
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelFault>;
