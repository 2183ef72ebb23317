//! Told hierarchies: role checks, the class taxonomy and individual types.
//!
//! Everything here works on asserted information only. A class `A` is below
//! `B` when a chain of told inclusions or equivalences leads from `A` to `B`
//! (with disjunctions on the left and conjunctions on the right split into
//! their named operands). Individuals get the upward closure of their told
//! named types.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use super::error::{KernelFault, KernelResult};
use super::structural::{BOTTOM, Entry, Source, TOP};
use super::{Axiom, Construct};
use crate::entity::{EntityKind, KernelRef};

/// Cooperative operation deadline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn check(&self) -> KernelResult<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(KernelFault::Timeout {
                limit_ms: u64::try_from(limit.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX),
            }),
            _ => Ok(()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Read-only view over a kernel's entry arena.
#[derive(Clone, Copy)]
pub(crate) struct KbView<'a> {
    entries: &'a [Entry],
}

impl<'a> KbView<'a> {
    pub fn new(entries: &'a [Entry]) -> Self {
        Self { entries }
    }

    fn entry(&self, r: KernelRef) -> Option<&'a Entry> {
        self.entries.get(r.index() as usize)
    }

    pub fn name(&self, r: KernelRef) -> &'a str {
        self.entry(r).map(|e| e.name.as_str()).unwrap_or("?")
    }

    pub fn construct(&self, r: KernelRef) -> Option<&'a Construct> {
        match self.entry(r).map(|e| &e.source) {
            Some(Source::Construct(c)) => Some(c),
            _ => None,
        }
    }

    fn is_named(&self, r: KernelRef, kind: EntityKind) -> bool {
        self.entry(r)
            .is_some_and(|e| e.kind == kind && matches!(e.source, Source::Named))
    }

    /// Named entries of a kind, in arena order.
    pub fn named(self, kind: EntityKind) -> impl Iterator<Item = KernelRef> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.kind == kind && matches!(e.source, Source::Named))
            .map(|(i, _)| KernelRef::new(i as u32))
    }

    pub fn axioms(self) -> impl Iterator<Item = &'a Axiom> + 'a {
        self.entries.iter().filter_map(|e| match &e.source {
            Source::Axiom(a) => Some(a),
            _ => None,
        })
    }

    /// Named classes a left-hand side stands for: itself, or the operands of a disjunction.
    fn lhs_named(&self, r: KernelRef, out: &mut Vec<KernelRef>) {
        if self.is_named(r, EntityKind::Class) {
            out.push(r);
        } else if let Some(Construct::Or(ops)) = self.construct(r) {
            for &op in ops {
                self.lhs_named(op, out);
            }
        }
    }

    /// Named classes a right-hand side implies: itself, or the operands of a conjunction.
    fn rhs_named(&self, r: KernelRef, out: &mut Vec<KernelRef>) {
        if self.is_named(r, EntityKind::Class) {
            out.push(r);
        } else if let Some(Construct::And(ops)) = self.construct(r) {
            for &op in ops {
                self.rhs_named(op, out);
            }
        }
    }

    /// Named members of every told disjointness axiom.
    fn disjoint_sets(&self) -> Vec<Vec<KernelRef>> {
        self.axioms()
            .filter_map(|a| match a {
                Axiom::DisjointConcepts(ops) => Some(
                    ops.iter()
                        .copied()
                        .filter(|&r| self.is_named(r, EntityKind::Class))
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }

    /// Split a told type into named positive and negated named parts.
    fn told_type(&self, r: KernelRef, positive: &mut Vec<KernelRef>, negative: &mut Vec<KernelRef>) {
        if self.is_named(r, EntityKind::Class) {
            positive.push(r);
            return;
        }
        match self.construct(r) {
            Some(Construct::And(ops)) => {
                for &op in ops {
                    self.told_type(op, positive, negative);
                }
            }
            Some(Construct::Not(inner)) if self.is_named(*inner, EntityKind::Class) => {
                negative.push(*inner)
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Reject cycles in told object property inclusions, and non-simple roles in
/// cardinality restrictions used by told axioms.
pub(crate) fn check_roles(view: KbView<'_>, deadline: &Deadline) -> KernelResult<()> {
    let mut graph = DiGraph::<KernelRef, ()>::new();
    let index: HashMap<KernelRef, NodeIndex> = view
        .named(EntityKind::ObjectProperty)
        .map(|r| (r, graph.add_node(r)))
        .collect();

    let mut transitive = Vec::new();
    for axiom in view.axioms() {
        match axiom {
            Axiom::ImpliesObjectProperties { sub, sup } if sub != sup => {
                if let (Some(&a), Some(&b)) = (index.get(sub), index.get(sup)) {
                    graph.update_edge(a, b, ());
                }
            }
            Axiom::TransitiveObjectProperty(role) => transitive.push(*role),
            _ => {}
        }
    }
    deadline.check()?;

    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            let mut names: Vec<&str> = component.iter().map(|&n| view.name(graph[n])).collect();
            names.sort_unstable();
            return Err(KernelFault::CycleInRia {
                roles: names.join(", "),
            });
        }
    }

    // A role is non-simple when it is transitive or has a transitive sub-role.
    let mut non_simple = HashSet::new();
    for role in transitive {
        if let Some(&start) = index.get(&role) {
            let mut dfs = Dfs::new(&graph, start);
            while let Some(n) = dfs.next(&graph) {
                non_simple.insert(graph[n]);
            }
        }
    }
    if non_simple.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::new();
    let mut stack: Vec<KernelRef> = view
        .axioms()
        .flat_map(|a| a.operands().into_iter().map(|(r, _)| r))
        .collect();
    while let Some(r) = stack.pop() {
        if !seen.insert(r) {
            continue;
        }
        let Some(construct) = view.construct(r) else {
            continue;
        };
        match construct {
            Construct::MinCardinality { role, .. } | Construct::MaxCardinality { role, .. }
                if non_simple.contains(role) =>
            {
                return Err(KernelFault::NonSimpleRole {
                    role: view.name(*role).to_string(),
                });
            }
            _ => stack.extend(construct.operands().into_iter().map(|(r, _)| r)),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Told class hierarchy over named classes.
#[derive(Debug, Clone, Default)]
pub(crate) struct Taxonomy {
    /// Named classes in arena order.
    classes: Vec<KernelRef>,
    /// Reflexive-transitive told ancestors of every named class.
    ancestors: HashMap<KernelRef, HashSet<KernelRef>>,
}

impl Taxonomy {
    pub fn build(view: KbView<'_>, deadline: &Deadline) -> KernelResult<Self> {
        let classes: Vec<KernelRef> = view.named(EntityKind::Class).collect();
        let mut graph = DiGraph::<KernelRef, ()>::new();
        let index: HashMap<KernelRef, NodeIndex> =
            classes.iter().map(|&c| (c, graph.add_node(c))).collect();

        for &c in &classes {
            if c != TOP {
                graph.update_edge(index[&c], index[&TOP], ());
            }
            if c != BOTTOM {
                graph.update_edge(index[&BOTTOM], index[&c], ());
            }
        }

        let mut link = |sub: KernelRef, sup: KernelRef| {
            let (mut lhs, mut rhs) = (Vec::new(), Vec::new());
            view.lhs_named(sub, &mut lhs);
            view.rhs_named(sup, &mut rhs);
            for a in &lhs {
                for b in &rhs {
                    if a != b {
                        graph.update_edge(index[a], index[b], ());
                    }
                }
            }
        };
        for axiom in view.axioms() {
            match axiom {
                Axiom::ImpliesConcepts { sub, sup } => link(*sub, *sup),
                Axiom::EqualConcepts(ops) => {
                    for &a in ops {
                        for &b in ops {
                            link(a, b);
                        }
                    }
                }
                _ => {}
            }
        }

        let mut ancestors = closure(&graph, deadline)?;

        // Classes below two told-disjoint classes collapse into the bottom class.
        let disjoint_sets = view.disjoint_sets();
        let unsatisfiable: Vec<KernelRef> = classes
            .iter()
            .copied()
            .filter(|c| {
                let anc = &ancestors[c];
                !anc.contains(&BOTTOM) && disjoint_clash(anc, &disjoint_sets).is_some()
            })
            .collect();
        if !unsatisfiable.is_empty() {
            for c in unsatisfiable {
                graph.update_edge(index[&c], index[&BOTTOM], ());
            }
            ancestors = closure(&graph, deadline)?;
        }

        Ok(Self { classes, ancestors })
    }

    pub fn ancestors(&self, class: KernelRef) -> Option<&HashSet<KernelRef>> {
        self.ancestors.get(&class)
    }

    /// Told subsumption between class expressions.
    pub fn is_subsumed_by(&self, view: KbView<'_>, sub: KernelRef, sup: KernelRef) -> bool {
        if sub == sup || sup == TOP || sub == BOTTOM {
            return true;
        }
        if let Some(anc) = self.ancestors.get(&sub) {
            if anc.contains(&BOTTOM) {
                return true;
            }
        }
        if let Some(Construct::And(ops)) = view.construct(sup) {
            return ops.iter().all(|&op| self.is_subsumed_by(view, sub, op));
        }
        if let Some(Construct::Or(ops)) = view.construct(sub) {
            return ops.iter().all(|&op| self.is_subsumed_by(view, op, sup));
        }
        if let Some(Construct::And(ops)) = view.construct(sub) {
            if ops.iter().any(|&op| self.is_subsumed_by(view, op, sup)) {
                return true;
            }
        }
        if let Some(Construct::Or(ops)) = view.construct(sup) {
            if ops.iter().any(|&op| self.is_subsumed_by(view, sub, op)) {
                return true;
            }
        }
        self.ancestors
            .get(&sub)
            .is_some_and(|anc| anc.contains(&sup))
    }

    fn strictly_below(&self, view: KbView<'_>, a: KernelRef, b: KernelRef) -> bool {
        self.is_subsumed_by(view, a, b) && !self.is_subsumed_by(view, b, a)
    }

    pub fn supers(&self, view: KbView<'_>, class: KernelRef, direct: bool) -> Vec<KernelRef> {
        let all: Vec<KernelRef> = self
            .classes
            .iter()
            .copied()
            .filter(|&n| self.strictly_below(view, class, n))
            .collect();
        if !direct {
            return all;
        }
        all.iter()
            .copied()
            .filter(|&n| !all.iter().any(|&m| self.strictly_below(view, m, n)))
            .collect()
    }

    pub fn subs(&self, view: KbView<'_>, class: KernelRef, direct: bool) -> Vec<KernelRef> {
        let all: Vec<KernelRef> = self
            .classes
            .iter()
            .copied()
            .filter(|&n| self.strictly_below(view, n, class))
            .collect();
        if !direct {
            return all;
        }
        all.iter()
            .copied()
            .filter(|&n| !all.iter().any(|&m| self.strictly_below(view, n, m)))
            .collect()
    }

    pub fn equivalents(&self, view: KbView<'_>, class: KernelRef) -> Vec<KernelRef> {
        self.classes
            .iter()
            .copied()
            .filter(|&n| {
                n != class
                    && self.is_subsumed_by(view, class, n)
                    && self.is_subsumed_by(view, n, class)
            })
            .collect()
    }
}

fn closure(
    graph: &DiGraph<KernelRef, ()>,
    deadline: &Deadline,
) -> KernelResult<HashMap<KernelRef, HashSet<KernelRef>>> {
    let mut ancestors = HashMap::with_capacity(graph.node_count());
    for start in graph.node_indices() {
        deadline.check()?;
        let mut reached = HashSet::new();
        let mut dfs = Dfs::new(graph, start);
        while let Some(n) = dfs.next(graph) {
            reached.insert(graph[n]);
        }
        ancestors.insert(graph[start], reached);
    }
    Ok(ancestors)
}

fn disjoint_clash(
    types: &HashSet<KernelRef>,
    sets: &[Vec<KernelRef>],
) -> Option<(KernelRef, KernelRef)> {
    for set in sets {
        let mut members = set.iter().filter(|r| types.contains(r));
        if let (Some(&a), Some(&b)) = (members.next(), members.next()) {
            return Some((a, b));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Individuals
// ---------------------------------------------------------------------------

/// Told types of every named individual, closed upward through the taxonomy.
#[derive(Debug, Clone, Default)]
pub(crate) struct Realisation {
    types: HashMap<KernelRef, HashSet<KernelRef>>,
    negated: HashMap<KernelRef, Vec<KernelRef>>,
}

impl Realisation {
    pub fn build(view: KbView<'_>, taxonomy: &Taxonomy, deadline: &Deadline) -> KernelResult<Self> {
        let mut positive: HashMap<KernelRef, Vec<KernelRef>> = HashMap::new();
        let mut negated: HashMap<KernelRef, Vec<KernelRef>> = HashMap::new();
        for axiom in view.axioms() {
            if let Axiom::InstanceOf { individual, class } = axiom {
                view.told_type(
                    *class,
                    positive.entry(*individual).or_default(),
                    negated.entry(*individual).or_default(),
                );
            }
        }

        let mut types = HashMap::new();
        for individual in view.named(EntityKind::Individual) {
            deadline.check()?;
            let mut closed = HashSet::from([TOP]);
            for told in positive.get(&individual).into_iter().flatten() {
                if let Some(anc) = taxonomy.ancestors(*told) {
                    closed.extend(anc.iter().copied());
                }
            }
            types.insert(individual, closed);
        }
        Ok(Self { types, negated })
    }

    /// Fail on the first individual whose told types clash.
    pub fn check_consistency(&self, view: KbView<'_>) -> KernelResult<()> {
        let disjoint_sets = view.disjoint_sets();
        let mut individuals: Vec<&KernelRef> = self.types.keys().collect();
        individuals.sort_unstable();
        for individual in individuals {
            let types = &self.types[individual];
            let name = view.name(*individual);
            if types.contains(&BOTTOM) {
                return Err(KernelFault::InconsistentKb {
                    reason: format!("individual \"{name}\" is an instance of an unsatisfiable class"),
                });
            }
            for negated in self.negated.get(individual).into_iter().flatten() {
                if types.contains(negated) {
                    return Err(KernelFault::InconsistentKb {
                        reason: format!(
                            "individual \"{name}\" is asserted to be both {0} and (not {0})",
                            view.name(*negated)
                        ),
                    });
                }
            }
            if let Some((a, b)) = disjoint_clash(types, &disjoint_sets) {
                return Err(KernelFault::InconsistentKb {
                    reason: format!(
                        "individual \"{name}\" is an instance of disjoint classes {} and {}",
                        view.name(a),
                        view.name(b)
                    ),
                });
            }
        }
        Ok(())
    }

    /// Membership of an individual in a class expression.
    fn is_instance_of(&self, view: KbView<'_>, individual: KernelRef, class: KernelRef) -> bool {
        let Some(types) = self.types.get(&individual) else {
            return false;
        };
        match view.construct(class) {
            Some(Construct::And(ops)) => ops.iter().all(|&op| self.is_instance_of(view, individual, op)),
            Some(Construct::Or(ops)) => ops.iter().any(|&op| self.is_instance_of(view, individual, op)),
            Some(_) => false,
            None => types.contains(&class),
        }
    }

    pub fn types(
        &self,
        view: KbView<'_>,
        taxonomy: &Taxonomy,
        individual: KernelRef,
        direct: bool,
    ) -> Vec<KernelRef> {
        let Some(types) = self.types.get(&individual) else {
            return Vec::new();
        };
        let mut all: Vec<KernelRef> = types.iter().copied().collect();
        all.sort_unstable();
        if !direct {
            return all;
        }
        all.iter()
            .copied()
            .filter(|&t| !all.iter().any(|&u| taxonomy.strictly_below(view, u, t)))
            .collect()
    }

    pub fn instances(
        &self,
        view: KbView<'_>,
        taxonomy: &Taxonomy,
        class: KernelRef,
        direct: bool,
    ) -> Vec<KernelRef> {
        let mut individuals: Vec<KernelRef> = self.types.keys().copied().collect();
        individuals.sort_unstable();
        individuals
            .into_iter()
            .filter(|&i| {
                if direct && view.construct(class).is_none() {
                    self.types(view, taxonomy, i, true).contains(&class)
                } else {
                    self.is_instance_of(view, i, class)
                }
            })
            .collect()
    }
}
