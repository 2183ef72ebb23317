// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # dlbridge
//!
//! A safe bridge to a description-logic reasoning kernel.
//!
//! ## Architecture
//!
//! - **Reasoner** (`reasoner`): single-owner facade, entity handles, state checks
//! - **Kernel** (`kernel`): the [`Kernel`](kernel::Kernel) seam plus a structural
//!   kernel that reasons over told subsumptions, disjointness and types
//! - **Entities** (`entity`): entity kinds and generation-tagged handles
//! - **Errors** (`error`): one diagnostic error type, kernel faults mapped 1:1
//! - **Config** (`config`): TOML reasoner options
//!
//! ## Library usage
//!
//! ```no_run
//! use dlbridge::reasoner::Reasoner;
//!
//! let mut reasoner = Reasoner::new();
//! let animal = reasoner.declare_class("Animal").unwrap();
//! let dog = reasoner.declare_class("Dog").unwrap();
//! reasoner.implies_concepts(&dog, &animal).unwrap();
//! reasoner.classify().unwrap();
//! assert!(reasoner.is_subsumed_by(&dog, &animal).unwrap());
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod kernel;
pub mod reasoner;
