//! In-process kernel that reasons over told information only.
//!
//! The kernel keeps an arena of entries (named entities, cached anonymous
//! constructs and told axioms), a name registry shared by every entity kind,
//! and the KB state machine. Classification computes the told class
//! hierarchy and checks the role hierarchy and the told types of individuals
//! for clashes; realisation assigns individuals their told types.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use super::error::{KernelFault, KernelResult};
use super::hierarchy::{self, Deadline, KbView, Realisation, Taxonomy};
use super::snapshot::{self, Snapshot, SnapshotEntry, SnapshotFormat};
use super::{Axiom, Builtin, Construct, Kernel, KbState, Query};
use crate::config::PropertyNames;
use crate::entity::{EntityKind, KernelRef};

pub(crate) const TOP: KernelRef = KernelRef::new(0);
pub(crate) const BOTTOM: KernelRef = KernelRef::new(1);
const TOP_OBJECT_PROPERTY: KernelRef = KernelRef::new(2);
const BOTTOM_OBJECT_PROPERTY: KernelRef = KernelRef::new(3);
const TOP_DATA_PROPERTY: KernelRef = KernelRef::new(4);
const BOTTOM_DATA_PROPERTY: KernelRef = KernelRef::new(5);
const DATA_TOP: KernelRef = KernelRef::new(6);

pub const TOP_NAME: &str = "*TOP*";
pub const BOTTOM_NAME: &str = "*BOTTOM*";

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const RDFS_LITERAL: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";

/// Built-in XSD datatypes, by local name.
const XSD_TYPES: [&str; 11] = [
    "string",
    "boolean",
    "decimal",
    "integer",
    "nonNegativeInteger",
    "int",
    "long",
    "float",
    "double",
    "dateTime",
    "anyURI",
];

/// A top/bottom property name that would shadow a built-in class or datatype.
fn builtin_clash(names: &PropertyNames) -> Option<&str> {
    names.as_array().into_iter().find(|name| {
        [TOP_NAME, BOTTOM_NAME, RDFS_LITERAL].contains(name)
            || name
                .strip_prefix(XSD)
                .is_some_and(|local| XSD_TYPES.contains(&local))
    })
}

/// Number of entries every kernel starts with.
pub(crate) const BUILTIN_COUNT: usize = 7 + XSD_TYPES.len();

/// Where an arena entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    Named,
    Construct(Construct),
    Axiom(Axiom),
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub kind: EntityKind,
    pub name: String,
    pub source: Source,
}

/// Expand `xsd:` and `rdfs:` prefixes to full IRIs.
fn expand_datatype_name(name: &str) -> String {
    if let Some(local) = name.strip_prefix("xsd:") {
        format!("{XSD}{local}")
    } else if name == "rdfs:Literal" {
        RDFS_LITERAL.to_string()
    } else {
        name.to_string()
    }
}

/// Shorten XSD and RDFS IRIs for rendering.
fn compact(name: &str) -> String {
    if let Some(local) = name.strip_prefix(XSD) {
        format!("xsd:{local}")
    } else if name == RDFS_LITERAL {
        "rdfs:Literal".to_string()
    } else {
        name.to_string()
    }
}

/// Told-information reasoning kernel.
#[derive(Debug, Clone)]
pub struct StructuralKernel {
    entries: Vec<Entry>,
    names: HashMap<String, KernelRef>,
    cache: HashMap<Construct, KernelRef>,
    axioms: HashMap<Axiom, KernelRef>,
    state: KbState,
    verbose: bool,
    timeout: Option<Duration>,
    property_names: PropertyNames,
    pending_names: Option<PropertyNames>,
    taxonomy: Option<Taxonomy>,
    realisation: Option<Realisation>,
}

impl Default for StructuralKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralKernel {
    pub fn new() -> Self {
        Self::with_property_names(PropertyNames::default())
    }

    fn with_property_names(property_names: PropertyNames) -> Self {
        let mut kernel = Self {
            entries: Vec::with_capacity(BUILTIN_COUNT),
            names: HashMap::new(),
            cache: HashMap::new(),
            axioms: HashMap::new(),
            state: KbState::Empty,
            verbose: false,
            timeout: None,
            property_names: PropertyNames::default(),
            pending_names: None,
            taxonomy: None,
            realisation: None,
        };
        kernel.register(EntityKind::Class, TOP_NAME);
        kernel.register(EntityKind::Class, BOTTOM_NAME);
        kernel.register(EntityKind::ObjectProperty, &property_names.top_object);
        kernel.register(EntityKind::ObjectProperty, &property_names.bottom_object);
        kernel.register(EntityKind::DataProperty, &property_names.top_data);
        kernel.register(EntityKind::DataProperty, &property_names.bottom_data);
        kernel.register(EntityKind::DataType, RDFS_LITERAL);
        for local in XSD_TYPES {
            kernel.register(EntityKind::DataType, &format!("{XSD}{local}"));
        }
        kernel.property_names = property_names;
        kernel
    }

    fn view(&self) -> KbView<'_> {
        KbView::new(&self.entries)
    }

    fn push(&mut self, kind: EntityKind, name: String, source: Source) -> KernelRef {
        let r = KernelRef::new(self.entries.len() as u32);
        self.entries.push(Entry { kind, name, source });
        r
    }

    fn register(&mut self, kind: EntityKind, name: &str) -> KernelRef {
        let r = self.push(kind, name.to_string(), Source::Named);
        self.names.insert(name.to_string(), r);
        r
    }

    fn entry(&self, r: KernelRef) -> KernelResult<&Entry> {
        self.entries
            .get(r.index() as usize)
            .ok_or_else(|| KernelFault::AxiomLoad {
                message: format!("dangling reference {r}"),
            })
    }

    fn render_name(&self, r: KernelRef) -> String {
        self.entries
            .get(r.index() as usize)
            .map(|e| compact(&e.name))
            .unwrap_or_else(|| r.to_string())
    }

    fn render_list(&self, head: &str, ops: &[KernelRef]) -> String {
        let mut out = format!("({head}");
        for op in ops {
            out.push(' ');
            out.push_str(&self.render_name(*op));
        }
        out.push(')');
        out
    }

    fn render_construct(&self, construct: &Construct) -> String {
        match construct {
            Construct::DataValue { literal, datatype } => {
                format!("\"{literal}\"^^{}", self.render_name(*datatype))
            }
            Construct::Facet { facet, value } => self.render_list(facet.label(), &[*value]),
            Construct::Restricted { datatype, facet } => {
                self.render_list("restrict", &[*datatype, *facet])
            }
            Construct::DataAnd(ops) => self.render_list("data-and", ops),
            Construct::DataOr(ops) => self.render_list("data-or", ops),
            Construct::DataNot(op) => self.render_list("data-not", &[*op]),
            Construct::And(ops) => self.render_list("and", ops),
            Construct::Or(ops) => self.render_list("or", ops),
            Construct::Not(op) => self.render_list("not", &[*op]),
            Construct::Some { role, filler } => self.render_list("some", &[*role, *filler]),
            Construct::All { role, filler } => self.render_list("all", &[*role, *filler]),
            Construct::DataSome { role, range } => self.render_list("data-some", &[*role, *range]),
            Construct::DataAll { role, range } => self.render_list("data-all", &[*role, *range]),
            Construct::MinCardinality { n, role, filler } => {
                self.render_list(&format!("min {n}"), &[*role, *filler])
            }
            Construct::MaxCardinality { n, role, filler } => {
                self.render_list(&format!("max {n}"), &[*role, *filler])
            }
        }
    }

    fn render_axiom(&self, axiom: &Axiom) -> String {
        match axiom {
            Axiom::ImpliesConcepts { sub, sup } => self.render_list("implies", &[*sub, *sup]),
            Axiom::EqualConcepts(ops) => self.render_list("equal", ops),
            Axiom::DisjointConcepts(ops) => self.render_list("disjoint", ops),
            Axiom::ImpliesObjectProperties { sub, sup } => {
                self.render_list("implies-role", &[*sub, *sup])
            }
            Axiom::TransitiveObjectProperty(role) => self.render_list("transitive", &[*role]),
            Axiom::InstanceOf { individual, class } => {
                self.render_list("instance-of", &[*individual, *class])
            }
        }
    }

    /// Something changed in the KB: drop computed results.
    fn invalidate(&mut self) {
        self.state = KbState::Loaded;
        self.taxonomy = None;
        self.realisation = None;
    }

    fn log_stage(&self, stage: &str, deadline: &Deadline) {
        let elapsed_us = deadline.elapsed().as_micros() as u64;
        if self.verbose {
            tracing::info!(stage, elapsed_us, entries = self.entries.len(), "kernel stage done");
        } else {
            tracing::debug!(stage, elapsed_us, entries = self.entries.len(), "kernel stage done");
        }
    }

    /// Swap staged top/bottom property names into the registry.
    fn apply_pending_names(&mut self) -> KernelResult<()> {
        let Some(pending) = self.pending_names.take() else {
            return Ok(());
        };
        let slots = [
            (TOP_OBJECT_PROPERTY, &pending.top_object),
            (BOTTOM_OBJECT_PROPERTY, &pending.bottom_object),
            (TOP_DATA_PROPERTY, &pending.top_data),
            (BOTTOM_DATA_PROPERTY, &pending.bottom_data),
        ];
        let builtin_slots = [
            TOP_OBJECT_PROPERTY,
            BOTTOM_OBJECT_PROPERTY,
            TOP_DATA_PROPERTY,
            BOTTOM_DATA_PROPERTY,
        ];
        for (_, name) in &slots {
            if let Some(&existing) = self.names.get(name.as_str()) {
                if !builtin_slots.contains(&existing) {
                    let kind = self.entries[existing.index() as usize].kind;
                    self.pending_names = Some(pending.clone());
                    return Err(KernelFault::CantRegisterName {
                        name: name.to_string(),
                        existing: kind.to_string(),
                    });
                }
            }
        }
        for (slot, _) in &slots {
            let old = self.entries[slot.index() as usize].name.clone();
            self.names.remove(&old);
        }
        for (slot, name) in &slots {
            self.entries[slot.index() as usize].name = name.to_string();
            self.names.insert(name.to_string(), *slot);
        }
        self.property_names = pending;
        Ok(())
    }

    fn check_operands(
        &self,
        operation: &str,
        operands: &[(KernelRef, super::Expect)],
    ) -> KernelResult<()> {
        for (r, expect) in operands {
            let entry = self.entry(*r)?;
            if !expect.accepts(entry.kind) {
                return Err(KernelFault::AxiomLoad {
                    message: format!(
                        "{operation}: expected {}, got {} \"{}\"",
                        expect.label(),
                        entry.kind,
                        entry.name
                    ),
                });
            }
        }
        Ok(())
    }

    fn taxonomy(&self) -> Option<&Taxonomy> {
        if self.state >= KbState::Classified {
            self.taxonomy.as_ref()
        } else {
            None
        }
    }

    /// Build the snapshot of everything after the built-ins.
    fn snapshot(&self) -> Snapshot {
        let entries = self.entries[BUILTIN_COUNT..]
            .iter()
            .map(|e| match &e.source {
                Source::Named => SnapshotEntry::Named {
                    kind: e.kind,
                    name: e.name.clone(),
                },
                Source::Construct(c) => SnapshotEntry::Construct(c.clone()),
                Source::Axiom(a) => SnapshotEntry::Axiom(a.clone()),
            })
            .collect();
        Snapshot::new(self.property_names.clone(), entries)
    }

    /// Rebuild a kernel from a snapshot, replaying every entry in order.
    fn replay(&self, snapshot: Snapshot) -> KernelResult<Self> {
        snapshot.check_version()?;
        snapshot.property_names.validate().map_err(|e| KernelFault::SaveLoad {
            message: e.to_string(),
        })?;
        if let Some(name) = builtin_clash(&snapshot.property_names) {
            return Err(KernelFault::SaveLoad {
                message: format!("property name \"{name}\" is taken by a built-in class or datatype"),
            });
        }

        let mut kernel = Self::with_property_names(snapshot.property_names);
        kernel.verbose = self.verbose;
        kernel.timeout = self.timeout;
        kernel.pending_names = self.pending_names.clone();

        for (offset, entry) in snapshot.entries.into_iter().enumerate() {
            let expected = KernelRef::new((BUILTIN_COUNT + offset) as u32);
            let r = match entry {
                SnapshotEntry::Named { kind, name } => kernel.declare(kind, &name),
                SnapshotEntry::Construct(c) => kernel.construct(c),
                SnapshotEntry::Axiom(a) => kernel.tell(a),
            }
            .map_err(|fault| KernelFault::SaveLoad {
                message: format!("entry {offset}: {fault}"),
            })?;
            if r != expected {
                return Err(KernelFault::SaveLoad {
                    message: format!("entry {offset} duplicates {r}"),
                });
            }
        }
        Ok(kernel)
    }
}

impl Kernel for StructuralKernel {
    fn version() -> &'static str {
        concat!("structural-", env!("CARGO_PKG_VERSION"))
    }

    fn state(&self) -> KbState {
        self.state
    }

    fn clear(&mut self) -> bool {
        let mut fresh = Self::with_property_names(self.property_names.clone());
        fresh.verbose = self.verbose;
        fresh.timeout = self.timeout;
        fresh.pending_names = self.pending_names.take();
        *self = fresh;
        true
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    fn set_property_names(&mut self, names: PropertyNames) {
        self.pending_names = Some(names);
    }

    fn property_names(&self) -> PropertyNames {
        self.pending_names
            .clone()
            .unwrap_or_else(|| self.property_names.clone())
    }

    fn set_operation_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn classify(&mut self) -> KernelResult<()> {
        if self.state >= KbState::Classified && self.pending_names.is_none() {
            return Ok(());
        }
        if let Err(fault) = self.apply_pending_names() {
            if self.state > KbState::Loaded {
                self.invalidate();
                if self.entries.len() == BUILTIN_COUNT {
                    self.state = KbState::Empty;
                }
            }
            return Err(fault);
        }

        let deadline = Deadline::start(self.timeout);
        hierarchy::check_roles(self.view(), &deadline)?;
        self.state = KbState::Preprocessed;
        self.log_stage("preprocess", &deadline);

        let taxonomy = Taxonomy::build(self.view(), &deadline)?;
        Realisation::build(self.view(), &taxonomy, &deadline)?.check_consistency(self.view())?;
        self.taxonomy = Some(taxonomy);
        self.realisation = None;
        self.state = KbState::Classified;
        self.log_stage("classify", &deadline);
        Ok(())
    }

    fn realise(&mut self) -> KernelResult<()> {
        if self.state < KbState::Classified || self.pending_names.is_some() {
            self.classify()?;
        }
        if self.state == KbState::Realised {
            return Ok(());
        }
        let deadline = Deadline::start(self.timeout);
        let Some(taxonomy) = self.taxonomy.as_ref() else {
            return Ok(());
        };
        let realisation = Realisation::build(self.view(), taxonomy, &deadline)?;
        self.realisation = Some(realisation);
        self.state = KbState::Realised;
        self.log_stage("realise", &deadline);
        Ok(())
    }

    fn is_consistent(&mut self) -> KernelResult<bool> {
        match self.classify() {
            Ok(()) => Ok(true),
            Err(KernelFault::InconsistentKb { .. }) => Ok(false),
            Err(fault) => Err(fault),
        }
    }

    fn builtin(&self, which: Builtin) -> KernelRef {
        match which {
            Builtin::Top => TOP,
            Builtin::Bottom => BOTTOM,
            Builtin::TopObjectProperty => TOP_OBJECT_PROPERTY,
            Builtin::BottomObjectProperty => BOTTOM_OBJECT_PROPERTY,
            Builtin::TopDataProperty => TOP_DATA_PROPERTY,
            Builtin::BottomDataProperty => BOTTOM_DATA_PROPERTY,
            Builtin::DataTop => DATA_TOP,
        }
    }

    fn declare(&mut self, kind: EntityKind, name: &str) -> KernelResult<KernelRef> {
        if !matches!(
            kind,
            EntityKind::Class
                | EntityKind::Individual
                | EntityKind::ObjectProperty
                | EntityKind::DataProperty
                | EntityKind::DataType
        ) {
            return Err(KernelFault::AxiomLoad {
                message: format!("cannot declare a named {kind}"),
            });
        }
        if name.trim().is_empty() {
            return Err(KernelFault::AxiomLoad {
                message: format!("{kind} name must not be empty"),
            });
        }
        let name = if kind == EntityKind::DataType {
            expand_datatype_name(name)
        } else {
            name.to_string()
        };
        if let Some(&existing) = self.names.get(&name) {
            let existing_kind = self.entries[existing.index() as usize].kind;
            if existing_kind == kind {
                return Ok(existing);
            }
            return Err(KernelFault::CantRegisterName {
                name,
                existing: existing_kind.to_string(),
            });
        }
        let r = self.register(kind, &name);
        self.invalidate();
        tracing::trace!(%kind, name = %name, target = %r, "declared");
        Ok(r)
    }

    fn lookup(&self, kind: EntityKind, name: &str) -> Option<KernelRef> {
        let name = if kind == EntityKind::DataType {
            expand_datatype_name(name)
        } else {
            name.to_string()
        };
        self.names
            .get(&name)
            .copied()
            .filter(|r| self.entries[r.index() as usize].kind == kind)
    }

    fn entities(&self, kind: EntityKind) -> Vec<KernelRef> {
        self.view().named(kind).collect()
    }

    fn construct(&mut self, construct: Construct) -> KernelResult<KernelRef> {
        if let Some(&cached) = self.cache.get(&construct) {
            return Ok(cached);
        }
        if construct.is_empty_combinator() {
            return Err(KernelFault::AxiomLoad {
                message: format!("{} needs at least one operand", construct.operation()),
            });
        }
        self.check_operands(construct.operation(), &construct.operands())?;
        let name = self.render_construct(&construct);
        let r = self.push(construct.kind(), name, Source::Construct(construct.clone()));
        self.cache.insert(construct, r);
        Ok(r)
    }

    fn tell(&mut self, axiom: Axiom) -> KernelResult<KernelRef> {
        let operands = axiom.operands();
        if operands.len() < axiom.min_operands() {
            return Err(KernelFault::AxiomLoad {
                message: format!(
                    "{} needs at least {} operands",
                    axiom.operation(),
                    axiom.min_operands()
                ),
            });
        }
        self.check_operands(axiom.operation(), &operands)?;
        if let Some(&told) = self.axioms.get(&axiom) {
            return Ok(told);
        }
        let name = self.render_axiom(&axiom);
        let r = self.push(EntityKind::Axiom, name, Source::Axiom(axiom.clone()));
        self.axioms.insert(axiom, r);
        self.invalidate();
        Ok(r)
    }

    fn describe(&self, target: KernelRef) -> Option<(EntityKind, &str)> {
        self.entries
            .get(target.index() as usize)
            .map(|e| (e.kind, e.name.as_str()))
    }

    fn query(&self, query: Query) -> KernelResult<Vec<KernelRef>> {
        let view = self.view();
        let Some(taxonomy) = self.taxonomy() else {
            return Ok(Vec::new());
        };
        let answer = match query {
            Query::SuperClasses { class, direct } => taxonomy.supers(view, class, direct),
            Query::SubClasses { class, direct } => taxonomy.subs(view, class, direct),
            Query::EquivalentClasses { class } => taxonomy.equivalents(view, class),
            Query::Types { individual, direct } => match &self.realisation {
                Some(r) => r.types(view, taxonomy, individual, direct),
                None => Vec::new(),
            },
            Query::Instances { class, direct } => match &self.realisation {
                Some(r) => r.instances(view, taxonomy, class, direct),
                None => Vec::new(),
            },
        };
        Ok(answer)
    }

    fn is_subsumed_by(&self, sub: KernelRef, sup: KernelRef) -> KernelResult<bool> {
        Ok(self
            .taxonomy()
            .is_some_and(|t| t.is_subsumed_by(self.view(), sub, sup)))
    }

    fn save(&self, out: &mut dyn Write, format: SnapshotFormat) -> KernelResult<()> {
        snapshot::write(out, format, &self.snapshot())
    }

    fn load(&mut self, input: &mut dyn Read, format: SnapshotFormat) -> KernelResult<()> {
        let snapshot = snapshot::read(input, format)?;
        let loaded = self.replay(snapshot)?;
        *self = loaded;
        tracing::debug!(entries = self.entries.len(), state = %self.state, "snapshot loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> StructuralKernel {
        StructuralKernel::new()
    }

    fn class(k: &mut StructuralKernel, name: &str) -> KernelRef {
        k.declare(EntityKind::Class, name).unwrap()
    }

    fn names(k: &StructuralKernel, refs: &[KernelRef]) -> Vec<String> {
        let mut out: Vec<String> = refs
            .iter()
            .map(|r| k.describe(*r).unwrap().1.to_string())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn fresh_kernel_is_empty_with_builtins() {
        let k = kernel();
        assert_eq!(k.state(), KbState::Empty);
        assert_eq!(k.describe(TOP), Some((EntityKind::Class, TOP_NAME)));
        assert_eq!(k.describe(BOTTOM), Some((EntityKind::Class, BOTTOM_NAME)));
        assert_eq!(
            k.describe(k.builtin(Builtin::DataTop)).unwrap().1,
            RDFS_LITERAL
        );
        assert_eq!(k.entities(EntityKind::DataType).len(), 1 + XSD_TYPES.len());
    }

    #[test]
    fn declare_is_idempotent_per_kind() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        assert_eq!(class(&mut k, "A"), a);
        assert_eq!(k.state(), KbState::Loaded);

        let err = k.declare(EntityKind::Individual, "A").unwrap_err();
        assert!(matches!(err, KernelFault::CantRegisterName { .. }));
    }

    #[test]
    fn datatype_prefixes_expand() {
        let k = kernel();
        let short = k.lookup(EntityKind::DataType, "xsd:int").unwrap();
        let long = k
            .lookup(EntityKind::DataType, "http://www.w3.org/2001/XMLSchema#int")
            .unwrap();
        assert_eq!(short, long);
        assert!(k.lookup(EntityKind::DataType, "xsd:unicorn").is_none());
    }

    #[test]
    fn constructs_are_cached_and_rendered() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let b = class(&mut k, "B");
        let first = k.construct(Construct::And(vec![a, b])).unwrap();
        let second = k.construct(Construct::And(vec![a, b])).unwrap();
        assert_eq!(first, second);
        assert_eq!(k.describe(first), Some((EntityKind::Class, "(and A B)")));

        let int = k.lookup(EntityKind::DataType, "xsd:int").unwrap();
        let five = k
            .construct(Construct::DataValue {
                literal: "5".into(),
                datatype: int,
            })
            .unwrap();
        assert_eq!(k.describe(five).unwrap().1, "\"5\"^^xsd:int");
    }

    #[test]
    fn construct_checks_operand_kinds() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let err = k
            .construct(Construct::Some {
                role: a,
                filler: a,
            })
            .unwrap_err();
        assert!(matches!(err, KernelFault::AxiomLoad { .. }));
    }

    #[test]
    fn told_hierarchy_is_transitive() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let b = class(&mut k, "B");
        let c = class(&mut k, "C");
        k.tell(Axiom::ImpliesConcepts { sub: a, sup: b }).unwrap();
        k.tell(Axiom::ImpliesConcepts { sub: b, sup: c }).unwrap();
        k.classify().unwrap();

        assert!(k.is_subsumed_by(a, c).unwrap());
        assert!(!k.is_subsumed_by(c, a).unwrap());
        let direct = k
            .query(Query::SuperClasses {
                class: a,
                direct: true,
            })
            .unwrap();
        assert_eq!(names(&k, &direct), vec!["B"]);
        let all = k
            .query(Query::SuperClasses {
                class: a,
                direct: false,
            })
            .unwrap();
        assert_eq!(names(&k, &all), vec![TOP_NAME, "B", "C"]);
    }

    #[test]
    fn conjunction_on_the_right_splits() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let b = class(&mut k, "B");
        let c = class(&mut k, "C");
        let b_and_c = k.construct(Construct::And(vec![b, c])).unwrap();
        k.tell(Axiom::ImpliesConcepts {
            sub: a,
            sup: b_and_c,
        })
        .unwrap();
        k.classify().unwrap();
        assert!(k.is_subsumed_by(a, b).unwrap());
        assert!(k.is_subsumed_by(a, c).unwrap());
        assert!(k.is_subsumed_by(a, b_and_c).unwrap());
    }

    #[test]
    fn equal_concepts_are_equivalent() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let b = class(&mut k, "B");
        k.tell(Axiom::EqualConcepts(vec![a, b])).unwrap();
        k.classify().unwrap();
        let eq = k.query(Query::EquivalentClasses { class: a }).unwrap();
        assert_eq!(eq, vec![b]);
    }

    #[test]
    fn role_cycle_is_rejected() {
        let mut k = kernel();
        let r = k.declare(EntityKind::ObjectProperty, "r").unwrap();
        let s = k.declare(EntityKind::ObjectProperty, "s").unwrap();
        k.tell(Axiom::ImpliesObjectProperties { sub: r, sup: s })
            .unwrap();
        k.tell(Axiom::ImpliesObjectProperties { sub: s, sup: r })
            .unwrap();
        let err = k.classify().unwrap_err();
        assert_eq!(
            err,
            KernelFault::CycleInRia {
                roles: "r, s".into()
            }
        );
        assert!(k.state() < KbState::Classified);
    }

    #[test]
    fn transitive_sub_role_makes_super_role_non_simple() {
        let mut k = kernel();
        let part = k.declare(EntityKind::ObjectProperty, "partOf").unwrap();
        let related = k.declare(EntityKind::ObjectProperty, "relatedTo").unwrap();
        let a = class(&mut k, "A");
        k.tell(Axiom::TransitiveObjectProperty(part)).unwrap();
        k.tell(Axiom::ImpliesObjectProperties {
            sub: part,
            sup: related,
        })
        .unwrap();
        let at_most_one = k
            .construct(Construct::MaxCardinality {
                n: 1,
                role: related,
                filler: TOP,
            })
            .unwrap();
        k.tell(Axiom::ImpliesConcepts {
            sub: a,
            sup: at_most_one,
        })
        .unwrap();
        let err = k.classify().unwrap_err();
        assert_eq!(
            err,
            KernelFault::NonSimpleRole {
                role: "relatedTo".into()
            }
        );
    }

    #[test]
    fn negated_told_type_is_inconsistent() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let b = class(&mut k, "B");
        let x = k.declare(EntityKind::Individual, "x").unwrap();
        let not_b = k.construct(Construct::Not(b)).unwrap();
        k.tell(Axiom::ImpliesConcepts { sub: a, sup: b }).unwrap();
        k.tell(Axiom::InstanceOf {
            individual: x,
            class: a,
        })
        .unwrap();
        k.tell(Axiom::InstanceOf {
            individual: x,
            class: not_b,
        })
        .unwrap();
        assert!(!k.is_consistent().unwrap());
        assert!(matches!(
            k.classify().unwrap_err(),
            KernelFault::InconsistentKb { .. }
        ));
    }

    #[test]
    fn disjoint_ancestors_collapse_into_bottom() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        let b = class(&mut k, "B");
        let c = class(&mut k, "C");
        k.tell(Axiom::DisjointConcepts(vec![a, b])).unwrap();
        k.tell(Axiom::ImpliesConcepts { sub: c, sup: a }).unwrap();
        k.tell(Axiom::ImpliesConcepts { sub: c, sup: b }).unwrap();
        k.classify().unwrap();
        let eq = k.query(Query::EquivalentClasses { class: c }).unwrap();
        assert_eq!(eq, vec![BOTTOM]);
    }

    #[test]
    fn realise_assigns_direct_types() {
        let mut k = kernel();
        let animal = class(&mut k, "Animal");
        let dog = class(&mut k, "Dog");
        let rex = k.declare(EntityKind::Individual, "rex").unwrap();
        k.tell(Axiom::ImpliesConcepts {
            sub: dog,
            sup: animal,
        })
        .unwrap();
        k.tell(Axiom::InstanceOf {
            individual: rex,
            class: dog,
        })
        .unwrap();
        k.realise().unwrap();
        assert_eq!(k.state(), KbState::Realised);

        let direct = k
            .query(Query::Types {
                individual: rex,
                direct: true,
            })
            .unwrap();
        assert_eq!(names(&k, &direct), vec!["Dog"]);
        let animals = k
            .query(Query::Instances {
                class: animal,
                direct: false,
            })
            .unwrap();
        assert_eq!(animals, vec![rex]);
        let direct_animals = k
            .query(Query::Instances {
                class: animal,
                direct: true,
            })
            .unwrap();
        assert!(direct_animals.is_empty());
    }

    #[test]
    fn telling_after_classification_invalidates() {
        let mut k = kernel();
        let a = class(&mut k, "A");
        k.classify().unwrap();
        assert_eq!(k.state(), KbState::Classified);
        k.tell(Axiom::ImpliesConcepts { sub: a, sup: TOP }).unwrap();
        assert_eq!(k.state(), KbState::Loaded);
    }

    #[test]
    fn pending_names_apply_on_classify() {
        let mut k = kernel();
        k.set_property_names(PropertyNames::new("U", "E", "UD", "ED"));
        assert_eq!(k.describe(TOP_OBJECT_PROPERTY).unwrap().1, "*UROLE*");
        k.classify().unwrap();
        assert_eq!(k.describe(TOP_OBJECT_PROPERTY).unwrap().1, "U");
        assert_eq!(k.lookup(EntityKind::ObjectProperty, "U"), Some(TOP_OBJECT_PROPERTY));
        assert!(k.lookup(EntityKind::ObjectProperty, "*UROLE*").is_none());
    }

    #[test]
    fn pending_name_conflict_is_reported() {
        let mut k = kernel();
        class(&mut k, "Taken");
        k.set_property_names(PropertyNames::new("Taken", "E", "UD", "ED"));
        let err = k.classify().unwrap_err();
        assert!(matches!(err, KernelFault::CantRegisterName { .. }));
        // Still staged, so the next attempt reports it again.
        assert!(k.classify().is_err());
    }

    #[test]
    fn property_names_report_staged_then_applied() {
        let mut k = kernel();
        assert_eq!(k.property_names(), PropertyNames::default());
        let names = PropertyNames::new("U", "E", "UD", "ED");
        k.set_property_names(names.clone());
        assert_eq!(k.property_names(), names);
        k.classify().unwrap();
        assert_eq!(k.property_names(), names);
    }

    #[test]
    fn tiny_timeout_expires_on_large_kb() {
        let mut k = kernel();
        let mut previous = class(&mut k, "C0");
        for i in 1..2000 {
            let next = class(&mut k, &format!("C{i}"));
            k.tell(Axiom::ImpliesConcepts {
                sub: next,
                sup: previous,
            })
            .unwrap();
            previous = next;
        }
        k.set_operation_timeout(Some(Duration::from_nanos(1)));
        let err = k.classify().unwrap_err();
        assert!(matches!(err, KernelFault::Timeout { .. }));
        assert!(k.state() < KbState::Classified);
    }

    #[test]
    fn clear_keeps_options() {
        let mut k = kernel();
        k.set_verbose(true);
        class(&mut k, "A");
        assert!(k.clear());
        assert_eq!(k.state(), KbState::Empty);
        assert!(k.verbose);
        assert!(k.lookup(EntityKind::Class, "A").is_none());
    }
}
