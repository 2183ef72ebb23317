//! Reasoner facade: the single owner of a reasoning kernel.
//!
//! A [`Reasoner`] owns exactly one [`Kernel`] for its whole lifetime. It is
//! move-only, so the kernel can never be shared or freed twice, and every
//! mutating call takes `&mut self`, so concurrent use needs an outer lock
//! chosen by the caller.
//!
//! Entities come back as [`EntityHandle`]s tagged with the reasoner id and
//! generation. Handles from another reasoner, or from before a
//! [`clear`](Reasoner::clear) or [`load`](Reasoner::load), are rejected with
//! [`BridgeError::StaleHandle`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::{PropertyNames, ReasonerConfig};
use crate::entity::{EntityHandle, EntityKind, KernelRef, RawRef};
use crate::error::{BridgeError, BridgeResult, KernelFault};
use crate::kernel::{
    Axiom, Builtin, Construct, Expect, FacetKind, KbState, Kernel, Query, SnapshotFormat,
    StructuralKernel,
};

static NEXT_REASONER_ID: AtomicU64 = AtomicU64::new(1);

/// Single-owner bridge to a reasoning kernel.
pub struct Reasoner<K: Kernel = StructuralKernel> {
    id: u64,
    generation: u32,
    kernel: K,
    config: ReasonerConfig,
    poisoned: bool,
}

impl Reasoner<StructuralKernel> {
    /// Create a reasoner over a fresh [`StructuralKernel`] with default options.
    pub fn new() -> Self {
        Self::with_kernel(StructuralKernel::new())
    }

    /// Create a reasoner over a fresh [`StructuralKernel`] and apply `config`.
    pub fn with_config(config: ReasonerConfig) -> BridgeResult<Self> {
        let mut reasoner = Self::new();
        reasoner.configure(config)?;
        Ok(reasoner)
    }
}

impl Default for Reasoner<StructuralKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> Reasoner<K> {
    /// Wrap an existing kernel. The reasoner takes ownership of it.
    pub fn with_kernel(kernel: K) -> Self {
        let id = NEXT_REASONER_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(reasoner = id, version = K::version(), "reasoner created");
        Self {
            id,
            generation: 0,
            kernel,
            config: ReasonerConfig::default(),
            poisoned: false,
        }
    }

    /// Apply every option in `config`.
    pub fn configure(&mut self, config: ReasonerConfig) -> BridgeResult<()> {
        let names = &config.property_names;
        if *names != self.config.property_names {
            self.set_top_bottom_property_names(
                &names.top_object,
                &names.bottom_object,
                &names.top_data,
                &names.bottom_data,
            )?;
        }
        self.set_verbose(config.verbose);
        self.set_operation_timeout(config.operation_timeout());
        Ok(())
    }

    /// Version of the wrapped kernel.
    pub fn version() -> &'static str {
        K::version()
    }

    /// Process-unique id of this reasoner.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current options.
    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Borrow the wrapped kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    // -- KB state ----------------------------------------------------------

    pub fn state(&self) -> KbState {
        self.kernel.state()
    }

    pub fn is_preprocessed(&self) -> bool {
        self.state() >= KbState::Preprocessed
    }

    pub fn is_classified(&self) -> bool {
        self.state() >= KbState::Classified
    }

    pub fn is_realised(&self) -> bool {
        self.state() >= KbState::Realised
    }

    /// Reset the kernel to an empty KB. Every handle issued so far becomes
    /// stale.
    ///
    /// If the kernel cannot be reset the reasoner is poisoned: this and every
    /// later operation return [`BridgeError::Poisoned`].
    pub fn clear(&mut self) -> BridgeResult<()> {
        self.ensure_usable()?;
        self.generation = self.generation.wrapping_add(1);
        if !self.kernel.clear() {
            self.poisoned = true;
            tracing::error!(reasoner = self.id, "kernel could not be cleared");
            return Err(BridgeError::Poisoned);
        }
        tracing::debug!(reasoner = self.id, generation = self.generation, "knowledge base cleared");
        Ok(())
    }

    // -- Setup -------------------------------------------------------------

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
        self.kernel.set_verbose(verbose);
    }

    /// Stage names for the top/bottom object and data properties. They take
    /// effect at the next classification.
    pub fn set_top_bottom_property_names(
        &mut self,
        top_object: &str,
        bottom_object: &str,
        top_data: &str,
        bottom_data: &str,
    ) -> BridgeResult<()> {
        let names = PropertyNames::new(top_object, bottom_object, top_data, bottom_data);
        names.validate()?;
        self.kernel.set_property_names(names.clone());
        self.config.property_names = names;
        Ok(())
    }

    /// Limit classification and realisation time. `Duration::ZERO` disables
    /// the limit.
    pub fn set_operation_timeout(&mut self, timeout: Duration) {
        self.config.operation_timeout_ms =
            u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        let limit = (!timeout.is_zero()).then_some(timeout);
        self.kernel.set_operation_timeout(limit);
    }

    // -- Reasoning ---------------------------------------------------------

    /// Compute the class hierarchy.
    pub fn classify(&mut self) -> BridgeResult<()> {
        self.ensure_usable()?;
        let started = Instant::now();
        self.run("classify", |kernel| kernel.classify())?;
        self.log_done("classify", started);
        Ok(())
    }

    /// Assign individuals to their most specific classes. The KB must be
    /// classified first.
    pub fn realise(&mut self) -> BridgeResult<()> {
        self.ensure_usable()?;
        if !self.is_classified() {
            return Err(BridgeError::NotClassified { operation: "realise" });
        }
        let started = Instant::now();
        self.run("realise", |kernel| kernel.realise())?;
        self.log_done("realise", started);
        Ok(())
    }

    /// Whether the KB is consistent. Classifies if needed; an inconsistent KB
    /// yields `Ok(false)` rather than an error.
    pub fn is_consistent(&mut self) -> BridgeResult<bool> {
        self.ensure_usable()?;
        self.run("is_consistent", |kernel| kernel.is_consistent())
    }

    fn run<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut K) -> Result<T, KernelFault>,
    ) -> BridgeResult<T> {
        f(&mut self.kernel).map_err(|fault| {
            tracing::warn!(reasoner = self.id, operation, %fault, "kernel operation failed");
            BridgeError::from(fault)
        })
    }

    fn log_done(&self, operation: &'static str, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if self.config.verbose {
            tracing::info!(reasoner = self.id, operation, elapsed_ms, state = %self.state(), "done");
        } else {
            tracing::debug!(reasoner = self.id, operation, elapsed_ms, state = %self.state(), "done");
        }
    }

    // -- Handles -----------------------------------------------------------

    fn ensure_usable(&self) -> BridgeResult<()> {
        if self.poisoned {
            Err(BridgeError::Poisoned)
        } else {
            Ok(())
        }
    }

    /// Check that a handle belongs to this reasoner's current generation.
    fn resolve(&self, handle: &EntityHandle) -> BridgeResult<KernelRef> {
        let raw = handle.raw();
        if raw.owner != self.id || raw.generation != self.generation {
            return Err(BridgeError::StaleHandle {
                handle: handle.to_string(),
            });
        }
        Ok(raw.target)
    }

    fn resolve_all(&self, handles: &[&EntityHandle]) -> BridgeResult<Vec<KernelRef>> {
        handles.iter().map(|h| self.resolve(h)).collect()
    }

    fn handle(&self, target: KernelRef) -> BridgeResult<EntityHandle> {
        let (kind, name) = self
            .kernel
            .describe(target)
            .ok_or_else(|| BridgeError::StaleHandle {
                handle: target.to_string(),
            })?;
        let raw = RawRef {
            owner: self.id,
            generation: self.generation,
            target,
        };
        Ok(EntityHandle::new(raw, name, kind))
    }

    fn handles(&self, targets: Vec<KernelRef>) -> BridgeResult<Vec<EntityHandle>> {
        targets.into_iter().map(|t| self.handle(t)).collect()
    }

    fn operand(&self, operation: &'static str, handle: &EntityHandle, expect: Expect) -> BridgeResult<KernelRef> {
        let target = self.resolve(handle)?;
        if !expect.accepts(handle.kind()) {
            return Err(BridgeError::KindMismatch {
                operation,
                expected: expect.label(),
                actual: handle.kind(),
                name: handle.name().to_string(),
            });
        }
        Ok(target)
    }

    // -- Entity lookup -----------------------------------------------------

    fn builtin(&self, which: Builtin) -> BridgeResult<EntityHandle> {
        self.ensure_usable()?;
        self.handle(self.kernel.builtin(which))
    }

    pub fn top(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::Top)
    }

    pub fn bottom(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::Bottom)
    }

    pub fn top_object_property(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::TopObjectProperty)
    }

    pub fn bottom_object_property(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::BottomObjectProperty)
    }

    pub fn top_data_property(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::TopDataProperty)
    }

    pub fn bottom_data_property(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::BottomDataProperty)
    }

    /// The top datatype (`rdfs:Literal`).
    pub fn data_top(&self) -> BridgeResult<EntityHandle> {
        self.builtin(Builtin::DataTop)
    }

    fn lookup(&self, kind: EntityKind, name: &str) -> BridgeResult<EntityHandle> {
        self.ensure_usable()?;
        let target = self
            .kernel
            .lookup(kind, name)
            .ok_or_else(|| BridgeError::UnknownEntity {
                kind,
                name: name.to_string(),
            })?;
        self.handle(target)
    }

    pub fn class(&self, name: &str) -> BridgeResult<EntityHandle> {
        self.lookup(EntityKind::Class, name)
    }

    pub fn individual(&self, name: &str) -> BridgeResult<EntityHandle> {
        self.lookup(EntityKind::Individual, name)
    }

    pub fn object_property(&self, name: &str) -> BridgeResult<EntityHandle> {
        self.lookup(EntityKind::ObjectProperty, name)
    }

    pub fn data_property(&self, name: &str) -> BridgeResult<EntityHandle> {
        self.lookup(EntityKind::DataProperty, name)
    }

    /// A built-in datatype, by full IRI or `xsd:` name (e.g. `xsd:int`).
    pub fn builtin_data_type(&self, name: &str) -> BridgeResult<EntityHandle> {
        self.lookup(EntityKind::DataType, name)
    }

    /// Every named entity of a kind.
    pub fn entities(&self, kind: EntityKind) -> BridgeResult<Vec<EntityHandle>> {
        self.ensure_usable()?;
        self.handles(self.kernel.entities(kind))
    }

    // -- Declarations ------------------------------------------------------

    fn declare(&mut self, kind: EntityKind, name: &str) -> BridgeResult<EntityHandle> {
        self.ensure_usable()?;
        let target = self.run("declare", |kernel| kernel.declare(kind, name))?;
        self.handle(target)
    }

    pub fn declare_class(&mut self, name: &str) -> BridgeResult<EntityHandle> {
        self.declare(EntityKind::Class, name)
    }

    pub fn declare_individual(&mut self, name: &str) -> BridgeResult<EntityHandle> {
        self.declare(EntityKind::Individual, name)
    }

    pub fn declare_object_property(&mut self, name: &str) -> BridgeResult<EntityHandle> {
        self.declare(EntityKind::ObjectProperty, name)
    }

    pub fn declare_data_property(&mut self, name: &str) -> BridgeResult<EntityHandle> {
        self.declare(EntityKind::DataProperty, name)
    }

    // -- Constructors ------------------------------------------------------

    fn build(&mut self, construct: Construct) -> BridgeResult<EntityHandle> {
        self.ensure_usable()?;
        let operation = construct.operation();
        if construct.is_empty_combinator() {
            return Err(BridgeError::EmptyOperands { operation });
        }
        for (target, expect) in construct.operands() {
            let (kind, name) = self
                .kernel
                .describe(target)
                .ok_or_else(|| BridgeError::StaleHandle {
                    handle: target.to_string(),
                })?;
            if !expect.accepts(kind) {
                return Err(BridgeError::KindMismatch {
                    operation,
                    expected: expect.label(),
                    actual: kind,
                    name: name.to_string(),
                });
            }
        }
        let target = self.run(operation, |kernel| kernel.construct(construct))?;
        self.handle(target)
    }

    /// A typed literal.
    pub fn data_value(&mut self, literal: &str, datatype: &EntityHandle) -> BridgeResult<EntityHandle> {
        let datatype = self.resolve(datatype)?;
        self.build(Construct::DataValue {
            literal: literal.to_string(),
            datatype,
        })
    }

    pub fn facet(&mut self, facet: FacetKind, value: &EntityHandle) -> BridgeResult<EntityHandle> {
        let value = self.resolve(value)?;
        self.build(Construct::Facet { facet, value })
    }

    pub fn min_inclusive(&mut self, value: &EntityHandle) -> BridgeResult<EntityHandle> {
        self.facet(FacetKind::MinInclusive, value)
    }

    pub fn max_inclusive(&mut self, value: &EntityHandle) -> BridgeResult<EntityHandle> {
        self.facet(FacetKind::MaxInclusive, value)
    }

    pub fn min_exclusive(&mut self, value: &EntityHandle) -> BridgeResult<EntityHandle> {
        self.facet(FacetKind::MinExclusive, value)
    }

    pub fn max_exclusive(&mut self, value: &EntityHandle) -> BridgeResult<EntityHandle> {
        self.facet(FacetKind::MaxExclusive, value)
    }

    /// Narrow a datatype with a facet.
    pub fn restricted_data_type(
        &mut self,
        datatype: &EntityHandle,
        facet: &EntityHandle,
    ) -> BridgeResult<EntityHandle> {
        let datatype = self.resolve(datatype)?;
        let facet = self.resolve(facet)?;
        self.build(Construct::Restricted { datatype, facet })
    }

    pub fn data_and(&mut self, ranges: &[&EntityHandle]) -> BridgeResult<EntityHandle> {
        let ranges = self.resolve_all(ranges)?;
        self.build(Construct::DataAnd(ranges))
    }

    pub fn data_or(&mut self, ranges: &[&EntityHandle]) -> BridgeResult<EntityHandle> {
        let ranges = self.resolve_all(ranges)?;
        self.build(Construct::DataOr(ranges))
    }

    pub fn data_not(&mut self, range: &EntityHandle) -> BridgeResult<EntityHandle> {
        let range = self.resolve(range)?;
        self.build(Construct::DataNot(range))
    }

    pub fn and(&mut self, classes: &[&EntityHandle]) -> BridgeResult<EntityHandle> {
        let classes = self.resolve_all(classes)?;
        self.build(Construct::And(classes))
    }

    pub fn or(&mut self, classes: &[&EntityHandle]) -> BridgeResult<EntityHandle> {
        let classes = self.resolve_all(classes)?;
        self.build(Construct::Or(classes))
    }

    pub fn not(&mut self, class: &EntityHandle) -> BridgeResult<EntityHandle> {
        let class = self.resolve(class)?;
        self.build(Construct::Not(class))
    }

    /// Existential restriction over an object property.
    pub fn some(&mut self, role: &EntityHandle, filler: &EntityHandle) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        let filler = self.resolve(filler)?;
        self.build(Construct::Some { role, filler })
    }

    /// Universal restriction over an object property.
    pub fn all(&mut self, role: &EntityHandle, filler: &EntityHandle) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        let filler = self.resolve(filler)?;
        self.build(Construct::All { role, filler })
    }

    pub fn data_some(&mut self, role: &EntityHandle, range: &EntityHandle) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        let range = self.resolve(range)?;
        self.build(Construct::DataSome { role, range })
    }

    pub fn data_all(&mut self, role: &EntityHandle, range: &EntityHandle) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        let range = self.resolve(range)?;
        self.build(Construct::DataAll { role, range })
    }

    pub fn min_cardinality(
        &mut self,
        n: u32,
        role: &EntityHandle,
        filler: &EntityHandle,
    ) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        let filler = self.resolve(filler)?;
        self.build(Construct::MinCardinality { n, role, filler })
    }

    pub fn max_cardinality(
        &mut self,
        n: u32,
        role: &EntityHandle,
        filler: &EntityHandle,
    ) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        let filler = self.resolve(filler)?;
        self.build(Construct::MaxCardinality { n, role, filler })
    }

    // -- Axioms ------------------------------------------------------------

    fn tell(&mut self, axiom: Axiom) -> BridgeResult<EntityHandle> {
        self.ensure_usable()?;
        let operation = axiom.operation();
        let target = self.run(operation, |kernel| kernel.tell(axiom))?;
        self.handle(target)
    }

    pub fn implies_concepts(&mut self, sub: &EntityHandle, sup: &EntityHandle) -> BridgeResult<EntityHandle> {
        let sub = self.resolve(sub)?;
        let sup = self.resolve(sup)?;
        self.tell(Axiom::ImpliesConcepts { sub, sup })
    }

    pub fn equal_concepts(&mut self, classes: &[&EntityHandle]) -> BridgeResult<EntityHandle> {
        let classes = self.resolve_all(classes)?;
        self.tell(Axiom::EqualConcepts(classes))
    }

    pub fn disjoint_concepts(&mut self, classes: &[&EntityHandle]) -> BridgeResult<EntityHandle> {
        let classes = self.resolve_all(classes)?;
        self.tell(Axiom::DisjointConcepts(classes))
    }

    pub fn implies_object_properties(
        &mut self,
        sub: &EntityHandle,
        sup: &EntityHandle,
    ) -> BridgeResult<EntityHandle> {
        let sub = self.resolve(sub)?;
        let sup = self.resolve(sup)?;
        self.tell(Axiom::ImpliesObjectProperties { sub, sup })
    }

    pub fn set_transitive(&mut self, role: &EntityHandle) -> BridgeResult<EntityHandle> {
        let role = self.resolve(role)?;
        self.tell(Axiom::TransitiveObjectProperty(role))
    }

    pub fn instance_of(&mut self, individual: &EntityHandle, class: &EntityHandle) -> BridgeResult<EntityHandle> {
        let individual = self.resolve(individual)?;
        let class = self.resolve(class)?;
        self.tell(Axiom::InstanceOf { individual, class })
    }

    // -- Queries -----------------------------------------------------------

    fn ask(&self, query: Query) -> BridgeResult<Vec<EntityHandle>> {
        let targets = self.kernel.query(query)?;
        self.handles(targets)
    }

    fn require_classified(&self, operation: &'static str) -> BridgeResult<()> {
        self.ensure_usable()?;
        if !self.is_classified() {
            return Err(BridgeError::NotClassified { operation });
        }
        Ok(())
    }

    fn require_realised(&self, operation: &'static str) -> BridgeResult<()> {
        self.ensure_usable()?;
        if !self.is_realised() {
            return Err(BridgeError::NotRealised { operation });
        }
        Ok(())
    }

    pub fn super_classes(&self, class: &EntityHandle, direct: bool) -> BridgeResult<Vec<EntityHandle>> {
        self.require_classified("super_classes")?;
        let class = self.operand("super_classes", class, Expect::Class)?;
        self.ask(Query::SuperClasses { class, direct })
    }

    pub fn sub_classes(&self, class: &EntityHandle, direct: bool) -> BridgeResult<Vec<EntityHandle>> {
        self.require_classified("sub_classes")?;
        let class = self.operand("sub_classes", class, Expect::Class)?;
        self.ask(Query::SubClasses { class, direct })
    }

    pub fn equivalent_classes(&self, class: &EntityHandle) -> BridgeResult<Vec<EntityHandle>> {
        self.require_classified("equivalent_classes")?;
        let class = self.operand("equivalent_classes", class, Expect::Class)?;
        self.ask(Query::EquivalentClasses { class })
    }

    pub fn is_subsumed_by(&self, sub: &EntityHandle, sup: &EntityHandle) -> BridgeResult<bool> {
        self.require_classified("is_subsumed_by")?;
        let sub = self.operand("is_subsumed_by", sub, Expect::Class)?;
        let sup = self.operand("is_subsumed_by", sup, Expect::Class)?;
        Ok(self.kernel.is_subsumed_by(sub, sup)?)
    }

    pub fn types(&self, individual: &EntityHandle, direct: bool) -> BridgeResult<Vec<EntityHandle>> {
        self.require_realised("types")?;
        let individual = self.operand("types", individual, Expect::Individual)?;
        self.ask(Query::Types { individual, direct })
    }

    pub fn instances(&self, class: &EntityHandle, direct: bool) -> BridgeResult<Vec<EntityHandle>> {
        self.require_realised("instances")?;
        let class = self.operand("instances", class, Expect::Class)?;
        self.ask(Query::Instances { class, direct })
    }

    // -- Save / load -------------------------------------------------------

    /// Write the KB to `path`: JSON for `.json`, bincode otherwise.
    pub fn save(&self, path: &Path) -> BridgeResult<()> {
        self.ensure_usable()?;
        let file = File::create(path).map_err(|e| save_load(path, e))?;
        let mut out = BufWriter::new(file);
        self.kernel.save(&mut out, SnapshotFormat::for_path(path))?;
        tracing::debug!(reasoner = self.id, path = %path.display(), "knowledge base saved");
        Ok(())
    }

    /// Replace the KB with the snapshot at `path`. Every handle issued so far
    /// becomes stale and [`config`](Self::config) picks up the snapshot's
    /// property names. On failure the current KB is kept.
    pub fn load(&mut self, path: &Path) -> BridgeResult<()> {
        self.ensure_usable()?;
        let file = File::open(path).map_err(|e| save_load(path, e))?;
        let mut input = BufReader::new(file);
        self.run("load", |kernel| kernel.load(&mut input, SnapshotFormat::for_path(path)))?;
        self.generation = self.generation.wrapping_add(1);
        self.config.property_names = self.kernel.property_names();
        tracing::debug!(reasoner = self.id, path = %path.display(), state = %self.state(), "knowledge base loaded");
        Ok(())
    }
}

fn save_load(path: &Path, err: std::io::Error) -> BridgeError {
    KernelFault::SaveLoad {
        message: format!("{}: {err}", path.display()),
    }
    .into()
}

impl<K: Kernel> std::fmt::Debug for Reasoner<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reasoner")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("state", &self.kernel.state())
            .field("config", &self.config)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl<K: Kernel> Drop for Reasoner<K> {
    fn drop(&mut self) {
        tracing::trace!(reasoner = self.id, "reasoner dropped");
    }
}
