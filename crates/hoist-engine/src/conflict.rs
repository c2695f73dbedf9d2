//! Version conflict detection and resolution.
//!
//! Identified modules are partitioned by logical identity; any class with
//! more than one member is a conflict. The configured policy picks the
//! winner, and the graph is rewritten in place so every former dependent of a
//! rejected member points at the chosen one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use hoist_core::graph::{ModuleGraph, ModuleId};
use hoist_core::identifier::{Identifier, VersionMatch};
use hoist_core::notify::Notifier;
use hoist_util::errors::HoistError;

/// How to choose the winner within a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The highest version wins.
    #[default]
    Newest,
    /// The lowest version wins.
    Oldest,
    /// Members the user listed explicitly are preferred; ties break to
    /// newest.
    ExplicitWins,
}

impl FromStr for ConflictPolicy {
    type Err = HoistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "explicit" | "explicit-wins" | "explicit_wins" => Ok(Self::ExplicitWins),
            _ => Err(HoistError::Config {
                message: format!("unknown conflict policy `{s}`"),
            }),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newest => f.write_str("newest"),
            Self::Oldest => f.write_str("oldest"),
            Self::ExplicitWins => f.write_str("explicit-wins"),
        }
    }
}

/// A resolved conflict: the winning identifier and the versions it displaced.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub chosen: Identifier,
    /// Displaced identifiers, descending by version.
    pub rejected: Vec<Identifier>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} over", self.chosen)?;
        for r in &self.rejected {
            write!(f, " {}", r.version)?;
        }
        Ok(())
    }
}

/// Detect and resolve every conflict in the graph.
///
/// Deterministic: classes are processed in logical-key order, members sorted
/// descending by version. After this returns, no two modules in the graph
/// share a logical identity.
pub fn resolve(
    graph: &mut ModuleGraph,
    policy: ConflictPolicy,
    notifier: &dyn Notifier,
) -> Vec<Conflict> {
    // Partition identified modules by logical identity.
    let mut classes: BTreeMap<String, Vec<ModuleId>> = BTreeMap::new();
    for id in graph.ids() {
        if let Some(ident) = &graph.node(id).identifier {
            classes.entry(ident.logical_key()).or_default().push(id);
        }
    }

    let mut conflicts = Vec::new();
    for (_, mut members) in classes {
        if members.len() < 2 {
            continue;
        }

        // Drop members incomparable with the class representative; they
        // never conflict.
        let representative = ident_of(graph, members[0]);
        members.retain(|&m| ident_of(graph, m).compare(&representative) != VersionMatch::Incompatible);
        if members.len() < 2 {
            continue;
        }

        // Descending by version.
        members.sort_by(|&a, &b| {
            ident_of(graph, b)
                .version
                .cmp(&ident_of(graph, a).version)
        });

        let chosen_id = match policy {
            ConflictPolicy::Newest => members[0],
            ConflictPolicy::Oldest => members[members.len() - 1],
            ConflictPolicy::ExplicitWins => members
                .iter()
                .copied()
                .find(|&m| graph.node(m).explicit)
                .unwrap_or(members[0]),
        };
        let chosen = ident_of(graph, chosen_id);

        let rejected_ids: Vec<ModuleId> =
            members.iter().copied().filter(|&m| m != chosen_id).collect();
        let rejected: Vec<Identifier> = rejected_ids.iter().map(|&m| ident_of(graph, m)).collect();

        for &r in &rejected_ids {
            let r_ident = ident_of(graph, r);
            graph.replace_module(r, chosen_id, true);
            graph.merge_supplicants(chosen_id, r);
            for owner in graph.ids() {
                graph.node_mut(owner).spec.rewrite(&r_ident, &chosen);
            }
            graph.remove_module(r);
        }

        notifier.info(&format!(
            "Resolved {}-way conflict to {} in {}",
            members.len(),
            chosen.coordinate(),
            chosen.repository
        ));
        conflicts.push(Conflict { chosen, rejected });
    }

    // Dependencies reachable only through rejected members are gone now.
    if !conflicts.is_empty() {
        graph.sweep_orphans();
    }

    conflicts
}

fn ident_of(graph: &ModuleGraph, id: ModuleId) -> Identifier {
    graph
        .node(id)
        .identifier
        .clone()
        .expect("conflict members are identified")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_core::notify::NullNotifier;
    use hoist_core::spec::Specification;

    fn spec(name: &str, version: &str) -> Specification {
        Specification::exact("test", "org.example", name, version)
    }

    fn identified(
        graph: &mut ModuleGraph,
        name: &str,
        version: &str,
        explicit: bool,
    ) -> ModuleId {
        let id = graph.add_module(spec(name, version), explicit);
        graph.node_mut(id).identifier =
            Some(Identifier::new("r1", "org.example", name, version));
        id
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("newest".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Newest);
        assert_eq!("OLDEST".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Oldest);
        assert_eq!(
            "explicit-wins".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::ExplicitWins
        );
        assert!("nearest".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn no_conflicts_in_disjoint_graph() {
        let mut g = ModuleGraph::new();
        let root = identified(&mut g, "root", "1.0", true);
        let a = identified(&mut g, "a", "1.0", false);
        g.add_dependency(root, a);
        g.add_supplicant(a, root);

        let conflicts = resolve(&mut g, ConflictPolicy::Newest, &NullNotifier);
        assert!(conflicts.is_empty());
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn newest_wins() {
        let mut g = ModuleGraph::new();
        let x = identified(&mut g, "x", "1.0", true);
        let y = identified(&mut g, "y", "1.0", true);
        let old = identified(&mut g, "lib", "1.0", false);
        let new = identified(&mut g, "lib", "2.0", false);
        g.add_dependency(x, old);
        g.add_supplicant(old, x);
        g.add_dependency(y, new);
        g.add_supplicant(new, y);

        let conflicts = resolve(&mut g, ConflictPolicy::Newest, &NullNotifier);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].chosen.coordinate(), "org.example:lib:2.0");
        assert_eq!(conflicts[0].rejected.len(), 1);
        // Both parents now share the winning node.
        assert!(g.node(x).dependencies.contains(&new));
        assert!(g.node(y).dependencies.contains(&new));
        assert!(g.get(old).is_none());
    }

    #[test]
    fn oldest_wins() {
        let mut g = ModuleGraph::new();
        let x = identified(&mut g, "x", "1.0", true);
        let old = identified(&mut g, "lib", "1.0", false);
        let new = identified(&mut g, "lib", "2.0", false);
        g.add_dependency(x, old);
        g.add_supplicant(old, x);
        g.add_dependency(x, new);
        g.add_supplicant(new, x);

        let conflicts = resolve(&mut g, ConflictPolicy::Oldest, &NullNotifier);
        assert_eq!(conflicts[0].chosen.coordinate(), "org.example:lib:1.0");
    }

    #[test]
    fn explicit_wins_prefers_explicit_member() {
        let mut g = ModuleGraph::new();
        // lib:1.0 was pinned by the user; lib:2.0 arrived transitively.
        let root = identified(&mut g, "root", "1.0", true);
        let _pinned = identified(&mut g, "lib", "1.0", true);
        let new = identified(&mut g, "lib", "2.0", false);
        g.add_dependency(root, new);
        g.add_supplicant(new, root);

        let conflicts = resolve(&mut g, ConflictPolicy::ExplicitWins, &NullNotifier);
        assert_eq!(conflicts[0].chosen.coordinate(), "org.example:lib:1.0");
    }

    #[test]
    fn explicit_wins_falls_back_to_newest() {
        let mut g = ModuleGraph::new();
        let root = identified(&mut g, "root", "1.0", true);
        let old = identified(&mut g, "lib", "1.0", false);
        let new = identified(&mut g, "lib", "2.0", false);
        g.add_dependency(root, old);
        g.add_supplicant(old, root);
        g.add_dependency(root, new);
        g.add_supplicant(new, root);

        let conflicts = resolve(&mut g, ConflictPolicy::ExplicitWins, &NullNotifier);
        assert_eq!(conflicts[0].chosen.coordinate(), "org.example:lib:2.0");
    }

    #[test]
    fn rejected_only_dependencies_are_swept() {
        let mut g = ModuleGraph::new();
        let x = identified(&mut g, "x", "1.0", true);
        let old = identified(&mut g, "lib", "1.0", false);
        let new = identified(&mut g, "lib", "2.0", false);
        let old_only = identified(&mut g, "legacy-helper", "1.0", false);
        g.add_dependency(x, old);
        g.add_supplicant(old, x);
        g.add_dependency(x, new);
        g.add_supplicant(new, x);
        g.add_dependency(old, old_only);
        g.add_supplicant(old_only, old);

        resolve(&mut g, ConflictPolicy::Newest, &NullNotifier);

        assert!(g.get(old_only).is_none());
    }

    #[test]
    fn specifications_rewritten_to_winner() {
        let mut g = ModuleGraph::new();
        let x = g.add_module(spec("lib", "1.*"), true);
        g.node_mut(x).identifier = Some(Identifier::new("r1", "org.example", "x", "1.0"));
        let old = identified(&mut g, "lib", "1.0", false);
        let new = identified(&mut g, "lib", "2.0", false);
        g.add_dependency(x, old);
        g.add_supplicant(old, x);
        g.add_dependency(x, new);
        g.add_supplicant(new, x);

        resolve(&mut g, ConflictPolicy::Newest, &NullNotifier);

        let winner = Identifier::new("r1", "org.example", "lib", "2.0");
        assert!(g.node(x).spec.allows(&winner));
    }

    #[test]
    fn conflict_free_invariant_holds() {
        let mut g = ModuleGraph::new();
        let x = identified(&mut g, "x", "1.0", true);
        for v in ["1.0", "2.0", "3.0"] {
            let m = identified(&mut g, "lib", v, false);
            g.add_dependency(x, m);
            g.add_supplicant(m, x);
        }

        let conflicts = resolve(&mut g, ConflictPolicy::Newest, &NullNotifier);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].rejected.len(), 2);

        let idents: Vec<Identifier> = g
            .ids()
            .into_iter()
            .filter_map(|m| g.node(m).identifier.clone())
            .collect();
        for a in &idents {
            for b in &idents {
                if a.same_logical_identity(b) {
                    assert_eq!(a, b);
                }
            }
        }
    }
}
