//! The in-memory module graph.
//!
//! Modules live in an arena keyed by stable integer ids; dependency and
//! supplicant lists hold ids rather than owning references, so dependency
//! cycles cannot leak and replacing a module is an id swap in the parents'
//! dependency vectors.
//!
//! Forward (dependency) and backward (supplicant) edges have independent
//! lifecycles: `add_dependency` never touches back-edges, the engine installs
//! them during serial integration.

use std::collections::HashSet;
use std::fmt;

use crate::identifier::Identifier;
use crate::spec::Specification;

/// Stable handle to a module in a [`ModuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the module graph.
///
/// Unidentified modules carry only a specification; the identifier is filled
/// in by the identification engine.
#[derive(Debug, Clone)]
pub struct Module {
    /// True when the module was listed by the user at the root.
    pub explicit: bool,
    pub identifier: Option<Identifier>,
    pub spec: Specification,
    /// Child modules, in discovery order.
    pub dependencies: Vec<ModuleId>,
    /// Parent modules (reverse dependencies), deduplicated by identifier.
    pub supplicants: Vec<ModuleId>,
}

/// Arena of modules reachable from an explicit root set.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    slots: Vec<Option<Module>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, spec: Specification, explicit: bool) -> ModuleId {
        let id = ModuleId(self.slots.len());
        self.slots.push(Some(Module {
            explicit,
            identifier: None,
            spec,
            dependencies: Vec::new(),
            supplicants: Vec::new(),
        }));
        id
    }

    /// Access a module. Panics if the id was removed; use [`Self::get`] for
    /// fallible access.
    pub fn node(&self, id: ModuleId) -> &Module {
        self.slots[id.0].as_ref().expect("stale module id")
    }

    pub fn node_mut(&mut self, id: ModuleId) -> &mut Module {
        self.slots[id.0].as_mut().expect("stale module id")
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.slots.get(id.0).and_then(|s| s.as_ref())
    }

    /// All live module ids, in creation order.
    pub fn ids(&self) -> Vec<ModuleId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| ModuleId(i)))
            .collect()
    }

    /// Ids of explicit root modules.
    pub fn roots(&self) -> Vec<ModuleId> {
        self.ids()
            .into_iter()
            .filter(|&id| self.node(id).explicit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `child` to `parent`'s dependency list. Does not touch
    /// back-edges.
    pub fn add_dependency(&mut self, parent: ModuleId, child: ModuleId) {
        let deps = &mut self.node_mut(parent).dependencies;
        if !deps.contains(&child) {
            deps.push(child);
        }
    }

    /// Register `sup` as a supplicant of `m`. Idempotent under identifier
    /// equality; a module is never its own supplicant.
    pub fn add_supplicant(&mut self, m: ModuleId, sup: ModuleId) {
        if m == sup {
            return;
        }
        let sup_ident = self.node(sup).identifier.clone();
        let existing = &self.node(m).supplicants;
        let duplicate = existing.iter().any(|&s| {
            s == sup
                || match (&self.node(s).identifier, &sup_ident) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
        });
        if !duplicate {
            self.node_mut(m).supplicants.push(sup);
        }
    }

    /// Union `from`'s supplicants into `into` and propagate the explicit
    /// flag.
    pub fn merge_supplicants(&mut self, into: ModuleId, from: ModuleId) {
        let sups = self.node(from).supplicants.clone();
        for sup in sups {
            self.add_supplicant(into, sup);
        }
        if self.node(from).explicit {
            self.node_mut(into).explicit = true;
        }
    }

    /// Overwrite `target`'s identification with `source`'s: identifier and
    /// dependency list.
    pub fn copy_identification_from(&mut self, target: ModuleId, source: ModuleId) {
        let (ident, deps) = {
            let src = self.node(source);
            (src.identifier.clone(), src.dependencies.clone())
        };
        let t = self.node_mut(target);
        t.identifier = ident;
        t.dependencies = deps;
    }

    /// In every dependency list where an element matches `old` (by id, or by
    /// identifier equality), substitute `new` and register the owning module
    /// as a supplicant of `new`.
    ///
    /// With `recursive`, the walk descends from the explicit roots through
    /// dependency edges; a visited set guards against cycles. Without it,
    /// only the top-level pass over all dependency lists runs.
    pub fn replace_module(&mut self, old: ModuleId, new: ModuleId, recursive: bool) {
        let old_ident = self.get(old).and_then(|m| m.identifier.clone());
        if recursive {
            let mut visited = HashSet::new();
            for root in self.roots() {
                self.replace_walk(root, old, &old_ident, new, &mut visited);
            }
        } else {
            for owner in self.ids() {
                self.substitute(owner, old, &old_ident, new);
            }
        }
    }

    fn replace_walk(
        &mut self,
        owner: ModuleId,
        old: ModuleId,
        old_ident: &Option<Identifier>,
        new: ModuleId,
        visited: &mut HashSet<ModuleId>,
    ) {
        if !visited.insert(owner) {
            return;
        }
        self.substitute(owner, old, old_ident, new);
        let deps = self.node(owner).dependencies.clone();
        for dep in deps {
            if self.get(dep).is_some() {
                self.replace_walk(dep, old, old_ident, new, visited);
            }
        }
    }

    /// Rewrite `owner`'s dependency list in place, dropping self-edges and
    /// duplicates introduced by the substitution.
    fn substitute(
        &mut self,
        owner: ModuleId,
        old: ModuleId,
        old_ident: &Option<Identifier>,
        new: ModuleId,
    ) {
        let matches = |graph: &Self, dep: ModuleId| -> bool {
            dep == old
                || match (old_ident, &graph.node(dep).identifier) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
        };

        let mut changed = false;
        let mut rewritten: Vec<ModuleId> = Vec::new();
        for dep in self.node(owner).dependencies.clone() {
            let target = if self.get(dep).is_some() && matches(self, dep) {
                changed = true;
                new
            } else {
                dep
            };
            if target != owner && !rewritten.contains(&target) {
                rewritten.push(target);
            }
        }
        if changed {
            self.node_mut(owner).dependencies = rewritten;
            self.add_supplicant(new, owner);
        }
    }

    /// Remove a module and purge its id from every edge list.
    pub fn remove_module(&mut self, id: ModuleId) {
        if self.slots.get(id.0).map(|s| s.is_none()).unwrap_or(true) {
            return;
        }
        self.slots[id.0] = None;
        for slot in self.slots.iter_mut().flatten() {
            slot.dependencies.retain(|&d| d != id);
            slot.supplicants.retain(|&s| s != id);
        }
    }

    /// Find a live module whose specification equals `spec`.
    pub fn find_by_spec(&self, spec: &Specification) -> Option<ModuleId> {
        self.ids().into_iter().find(|&id| self.node(id).spec == *spec)
    }

    /// Remove every module unreachable from the explicit root set. Returns
    /// the number of modules removed.
    pub fn sweep_orphans(&mut self) -> usize {
        let mut reachable = HashSet::new();
        let mut stack = self.roots();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for &dep in &self.node(id).dependencies {
                if self.get(dep).is_some() && !reachable.contains(&dep) {
                    stack.push(dep);
                }
            }
        }
        let orphans: Vec<ModuleId> = self
            .ids()
            .into_iter()
            .filter(|id| !reachable.contains(id))
            .collect();
        for id in &orphans {
            self.remove_module(*id);
        }
        orphans.len()
    }
}
