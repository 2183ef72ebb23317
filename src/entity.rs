//! Entity handles returned by the reasoner.
//!
//! An [`EntityHandle`] is a non-owning, kind-tagged view of one entry inside
//! the kernel: a class, an individual, a property, a datatype, an axiom and so
//! on. The entry itself belongs to the kernel; the handle only remembers where
//! it lives ([`RawRef`]) and which reasoner generation produced it.

use serde::{Deserialize, Serialize};

/// Index of an entry inside a kernel's entity arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KernelRef(u32);

impl KernelRef {
    /// Create a `KernelRef` from a raw arena index.
    pub const fn new(index: u32) -> Self {
        KernelRef(index)
    }

    /// Get the underlying arena index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for KernelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of construct an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A named class or a class expression.
    Class,
    /// A named individual.
    Individual,
    /// An object property (role between individuals).
    ObjectProperty,
    /// A data property (role from individuals to literals).
    DataProperty,
    /// A named or built-in datatype.
    DataType,
    /// A datatype built from other datatypes or facets.
    DataTypeExpression,
    /// A told axiom.
    Axiom,
    /// A facet restricting a datatype's value space.
    DataTypeFacet,
    /// A typed literal.
    DataValue,
}

/// Display labels, indexed by [`EntityKind::index`].
const KIND_LABELS: [&str; EntityKind::COUNT] = [
    "class",
    "individual",
    "object_property",
    "data_property",
    "data_type",
    "data_type_expression",
    "axiom",
    "data_type_facet",
    "data_value",
];

impl EntityKind {
    /// Number of entity kinds.
    pub const COUNT: usize = 9;

    /// Every kind, in label-table order.
    pub const ALL: [EntityKind; EntityKind::COUNT] = [
        EntityKind::Class,
        EntityKind::Individual,
        EntityKind::ObjectProperty,
        EntityKind::DataProperty,
        EntityKind::DataType,
        EntityKind::DataTypeExpression,
        EntityKind::Axiom,
        EntityKind::DataTypeFacet,
        EntityKind::DataValue,
    ];

    const fn index(self) -> usize {
        match self {
            EntityKind::Class => 0,
            EntityKind::Individual => 1,
            EntityKind::ObjectProperty => 2,
            EntityKind::DataProperty => 3,
            EntityKind::DataType => 4,
            EntityKind::DataTypeExpression => 5,
            EntityKind::Axiom => 6,
            EntityKind::DataTypeFacet => 7,
            EntityKind::DataValue => 8,
        }
    }

    /// The stable snake_case label for this kind.
    pub const fn label(self) -> &'static str {
        KIND_LABELS[self.index()]
    }

    /// Whether an entity of this kind can stand where a data range is expected.
    pub const fn is_data_range(self) -> bool {
        matches!(self, EntityKind::DataType | EntityKind::DataTypeExpression)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a kernel entry as seen from outside the reasoner.
///
/// Pass it back only to the reasoner that produced it, and only until that
/// reasoner is cleared or reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawRef {
    /// Process-unique id of the owning reasoner.
    pub owner: u64,
    /// Reasoner generation at the time the handle was produced.
    pub generation: u32,
    /// Entry inside the kernel.
    pub target: KernelRef,
}

impl std::fmt::Display for RawRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}:g{}:{}", self.owner, self.generation, self.target)
    }
}

/// An immutable, non-owning reference to an entity inside a kernel.
///
/// Handles are deliberately not `Clone`: each lookup or construction yields a
/// fresh view. Two handles for the same entity compare equal by
/// [`name`](Self::name) and [`kind`](Self::kind); equality of [`raw`](Self::raw)
/// is not part of the contract.
#[derive(Debug)]
pub struct EntityHandle {
    raw: RawRef,
    name: String,
    kind: EntityKind,
}

impl EntityHandle {
    pub(crate) fn new(raw: RawRef, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            raw,
            name: name.into(),
            kind,
        }
    }

    /// Human-readable name of the entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind tag of the entity.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Raw identity, for passing back into the reasoner that produced it.
    pub fn raw(&self) -> RawRef {
        self.raw
    }
}

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] <{}>", self.name, self.kind, self.raw)
    }
}
