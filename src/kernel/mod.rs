//! The reasoning-kernel seam.
//!
//! A [`Kernel`] is the engine a [`Reasoner`](crate::reasoner::Reasoner) wraps:
//! it owns the knowledge base, the named-entity registry and the expression
//! cache, and it runs classification and realisation. The bridge never looks
//! inside a kernel; it only exchanges [`KernelRef`]s, [`Construct`]s,
//! [`Axiom`]s and [`Query`]s with it.
//!
//! [`StructuralKernel`] is the in-process implementation shipped with the
//! crate. It reasons over told information only.

pub mod error;
pub mod hierarchy;
pub mod snapshot;
pub mod structural;

use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PropertyNames;
use crate::entity::{EntityKind, KernelRef};

pub use error::{KernelFault, KernelResult};
pub use snapshot::SnapshotFormat;
pub use structural::StructuralKernel;

/// Lifecycle state of a knowledge base. States are ordered: a later state
/// implies every earlier one has been passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KbState {
    /// Nothing beyond the built-in entities.
    Empty,
    /// Declarations or axioms present, not yet preprocessed.
    Loaded,
    /// Role hierarchy checked; class hierarchy not yet computed.
    Preprocessed,
    /// Class hierarchy computed and the KB found consistent.
    Classified,
    /// Individuals assigned to their most specific classes.
    Realised,
}

impl std::fmt::Display for KbState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Loaded => write!(f, "Loaded"),
            Self::Preprocessed => write!(f, "Preprocessed"),
            Self::Classified => write!(f, "Classified"),
            Self::Realised => write!(f, "Realised"),
        }
    }
}

/// Entities every kernel provides without a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Top,
    Bottom,
    TopObjectProperty,
    BottomObjectProperty,
    TopDataProperty,
    BottomDataProperty,
    DataTop,
}

/// Datatype facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    MinInclusive,
    MaxInclusive,
    MinExclusive,
    MaxExclusive,
}

impl FacetKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::MinInclusive => "min-inclusive",
            Self::MaxInclusive => "max-inclusive",
            Self::MinExclusive => "min-exclusive",
            Self::MaxExclusive => "max-exclusive",
        }
    }
}

/// The kind an operand must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Class,
    Individual,
    ObjectProperty,
    DataProperty,
    DataRange,
    DataType,
    DataValue,
    Facet,
}

impl Expect {
    pub fn accepts(self, kind: EntityKind) -> bool {
        match self {
            Self::Class => kind == EntityKind::Class,
            Self::Individual => kind == EntityKind::Individual,
            Self::ObjectProperty => kind == EntityKind::ObjectProperty,
            Self::DataProperty => kind == EntityKind::DataProperty,
            Self::DataRange => kind.is_data_range(),
            Self::DataType => kind == EntityKind::DataType,
            Self::DataValue => kind == EntityKind::DataValue,
            Self::Facet => kind == EntityKind::DataTypeFacet,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Individual => "individual",
            Self::ObjectProperty => "object_property",
            Self::DataProperty => "data_property",
            Self::DataRange => "data_type or data_type_expression",
            Self::DataType => "data_type",
            Self::DataValue => "data_value",
            Self::Facet => "data_type_facet",
        }
    }
}

/// An anonymous composite entity built from other kernel entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Construct {
    DataValue { literal: String, datatype: KernelRef },
    Facet { facet: FacetKind, value: KernelRef },
    Restricted { datatype: KernelRef, facet: KernelRef },
    DataAnd(Vec<KernelRef>),
    DataOr(Vec<KernelRef>),
    DataNot(KernelRef),
    And(Vec<KernelRef>),
    Or(Vec<KernelRef>),
    Not(KernelRef),
    Some { role: KernelRef, filler: KernelRef },
    All { role: KernelRef, filler: KernelRef },
    DataSome { role: KernelRef, range: KernelRef },
    DataAll { role: KernelRef, range: KernelRef },
    MinCardinality { n: u32, role: KernelRef, filler: KernelRef },
    MaxCardinality { n: u32, role: KernelRef, filler: KernelRef },
}

impl Construct {
    /// Kind of the entity this construct produces.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::DataValue { .. } => EntityKind::DataValue,
            Self::Facet { .. } => EntityKind::DataTypeFacet,
            Self::Restricted { .. } | Self::DataAnd(_) | Self::DataOr(_) | Self::DataNot(_) => {
                EntityKind::DataTypeExpression
            }
            _ => EntityKind::Class,
        }
    }

    /// Name of the reasoner operation that builds this construct.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::DataValue { .. } => "data_value",
            Self::Facet { .. } => "facet",
            Self::Restricted { .. } => "restricted_data_type",
            Self::DataAnd(_) => "data_and",
            Self::DataOr(_) => "data_or",
            Self::DataNot(_) => "data_not",
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Not(_) => "not",
            Self::Some { .. } => "some",
            Self::All { .. } => "all",
            Self::DataSome { .. } => "data_some",
            Self::DataAll { .. } => "data_all",
            Self::MinCardinality { .. } => "min_cardinality",
            Self::MaxCardinality { .. } => "max_cardinality",
        }
    }

    /// Every operand together with the kind it must have.
    pub fn operands(&self) -> Vec<(KernelRef, Expect)> {
        match self {
            Self::DataValue { datatype, .. } => vec![(*datatype, Expect::DataType)],
            Self::Facet { value, .. } => vec![(*value, Expect::DataValue)],
            Self::Restricted { datatype, facet } => {
                vec![(*datatype, Expect::DataRange), (*facet, Expect::Facet)]
            }
            Self::DataAnd(ops) | Self::DataOr(ops) => {
                ops.iter().map(|r| (*r, Expect::DataRange)).collect()
            }
            Self::DataNot(r) => vec![(*r, Expect::DataRange)],
            Self::And(ops) | Self::Or(ops) => ops.iter().map(|r| (*r, Expect::Class)).collect(),
            Self::Not(r) => vec![(*r, Expect::Class)],
            Self::Some { role, filler }
            | Self::All { role, filler }
            | Self::MinCardinality { role, filler, .. }
            | Self::MaxCardinality { role, filler, .. } => {
                vec![(*role, Expect::ObjectProperty), (*filler, Expect::Class)]
            }
            Self::DataSome { role, range } | Self::DataAll { role, range } => {
                vec![(*role, Expect::DataProperty), (*range, Expect::DataRange)]
            }
        }
    }

    /// True for an n-ary combinator with no operands.
    pub fn is_empty_combinator(&self) -> bool {
        match self {
            Self::DataAnd(ops) | Self::DataOr(ops) | Self::And(ops) | Self::Or(ops) => {
                ops.is_empty()
            }
            _ => false,
        }
    }
}

/// A told axiom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axiom {
    ImpliesConcepts { sub: KernelRef, sup: KernelRef },
    EqualConcepts(Vec<KernelRef>),
    DisjointConcepts(Vec<KernelRef>),
    ImpliesObjectProperties { sub: KernelRef, sup: KernelRef },
    TransitiveObjectProperty(KernelRef),
    InstanceOf { individual: KernelRef, class: KernelRef },
}

impl Axiom {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ImpliesConcepts { .. } => "implies_concepts",
            Self::EqualConcepts(_) => "equal_concepts",
            Self::DisjointConcepts(_) => "disjoint_concepts",
            Self::ImpliesObjectProperties { .. } => "implies_object_properties",
            Self::TransitiveObjectProperty(_) => "set_transitive",
            Self::InstanceOf { .. } => "instance_of",
        }
    }

    pub fn operands(&self) -> Vec<(KernelRef, Expect)> {
        match self {
            Self::ImpliesConcepts { sub, sup } => vec![(*sub, Expect::Class), (*sup, Expect::Class)],
            Self::EqualConcepts(ops) | Self::DisjointConcepts(ops) => {
                ops.iter().map(|r| (*r, Expect::Class)).collect()
            }
            Self::ImpliesObjectProperties { sub, sup } => {
                vec![(*sub, Expect::ObjectProperty), (*sup, Expect::ObjectProperty)]
            }
            Self::TransitiveObjectProperty(r) => vec![(*r, Expect::ObjectProperty)],
            Self::InstanceOf { individual, class } => {
                vec![(*individual, Expect::Individual), (*class, Expect::Class)]
            }
        }
    }

    /// Minimum number of operands the axiom needs to be meaningful.
    pub fn min_operands(&self) -> usize {
        match self {
            Self::EqualConcepts(_) | Self::DisjointConcepts(_) => 2,
            _ => 0,
        }
    }
}

/// Hierarchy and realisation questions a kernel can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    SuperClasses { class: KernelRef, direct: bool },
    SubClasses { class: KernelRef, direct: bool },
    EquivalentClasses { class: KernelRef },
    Types { individual: KernelRef, direct: bool },
    Instances { class: KernelRef, direct: bool },
}

/// A description-logic reasoning kernel.
///
/// Implementations are single-threaded: every method runs to completion on
/// the caller's thread, and the operation timeout is checked cooperatively
/// inside [`classify`](Self::classify) and [`realise`](Self::realise).
pub trait Kernel {
    /// Version string of the kernel.
    fn version() -> &'static str
    where
        Self: Sized;

    fn state(&self) -> KbState;

    /// Reset to an empty KB, keeping options. Returns `false` if the kernel
    /// could not be reset.
    fn clear(&mut self) -> bool;

    fn set_verbose(&mut self, verbose: bool);

    /// Stage new top/bottom property names; they apply at the next classification.
    fn set_property_names(&mut self, names: PropertyNames);

    /// Names the next classification will use: the staged ones if any,
    /// otherwise the applied ones.
    fn property_names(&self) -> PropertyNames;

    /// `None` disables the timeout.
    fn set_operation_timeout(&mut self, timeout: Option<Duration>);

    fn classify(&mut self) -> KernelResult<()>;

    fn realise(&mut self) -> KernelResult<()>;

    /// Classify if needed; `Ok(false)` when the KB is inconsistent.
    fn is_consistent(&mut self) -> KernelResult<bool>;

    fn builtin(&self, which: Builtin) -> KernelRef;

    /// Register a name with a kind, or return the entry already registered
    /// under that name with the same kind.
    fn declare(&mut self, kind: EntityKind, name: &str) -> KernelResult<KernelRef>;

    fn lookup(&self, kind: EntityKind, name: &str) -> Option<KernelRef>;

    /// All named entries of a kind.
    fn entities(&self, kind: EntityKind) -> Vec<KernelRef>;

    /// Build (or fetch from the expression cache) a composite entity.
    fn construct(&mut self, construct: Construct) -> KernelResult<KernelRef>;

    fn tell(&mut self, axiom: Axiom) -> KernelResult<KernelRef>;

    /// Kind and display name of an entry.
    fn describe(&self, target: KernelRef) -> Option<(EntityKind, &str)>;

    fn query(&self, query: Query) -> KernelResult<Vec<KernelRef>>;

    fn is_subsumed_by(&self, sub: KernelRef, sup: KernelRef) -> KernelResult<bool>;

    fn save(&self, out: &mut dyn Write, format: SnapshotFormat) -> KernelResult<()>;

    /// Replace the KB with a snapshot. On failure the current KB is kept.
    fn load(&mut self, input: &mut dyn Read, format: SnapshotFormat) -> KernelResult<()>;
}
