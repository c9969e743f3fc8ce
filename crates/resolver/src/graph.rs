//! Dependency graph types and operations

use npmirror_types::{ResolvedDependency, Version, VersionManifest, VersionSpec};
use std::collections::BTreeMap;
use std::fmt;

/// Dependency kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepKind {
    /// Must resolve or the whole batch fails
    Required,
    /// Best effort; failures are skipped with a warning
    Optional,
}

/// Dependency edge in the resolution graph
#[derive(Clone, Debug)]
pub struct DepEdge {
    /// Name as written by the dependent
    pub name: String,
    /// Raw specifier as written by the dependent
    pub raw: String,
    pub kind: DepKind,
    /// `name@version` of the dependent; `None` for top-level requests
    pub parent: Option<String>,
}

impl DepEdge {
    pub fn new(name: impl Into<String>, raw: impl Into<String>, kind: DepKind) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
            kind,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Outgoing edges of a resolved manifest
    ///
    /// A name listed under both maps is treated as optional. Edges below an
    /// optional dependent stay optional.
    #[must_use]
    pub fn children_of(manifest: &VersionManifest, parent_kind: DepKind) -> Vec<Self> {
        let parent = format!("{}@{}", manifest.name, manifest.version);
        let required = manifest
            .dependencies
            .iter()
            .filter(|(name, _)| !manifest.optional_dependencies.contains_key(*name))
            .map(|(name, raw)| (name, raw, parent_kind));
        let optional = manifest
            .optional_dependencies
            .iter()
            .map(|(name, raw)| (name, raw, DepKind::Optional));

        required
            .chain(optional)
            .map(|(name, raw, kind)| Self::new(name, raw, kind).with_parent(parent.clone()))
            .collect()
    }
}

impl fmt::Display for DepEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}@{} (required by {parent})", self.name, self.raw),
            None => write!(f, "{}@{}", self.name, self.raw),
        }
    }
}

/// Registry package an edge points at, after unwrapping aliases
#[derive(Clone, Debug)]
pub struct Target {
    pub name: String,
    pub spec: VersionSpec,
}

impl Target {
    /// Unwrap `npm:` aliases down to the real package
    #[must_use]
    pub fn from_spec(name: &str, spec: VersionSpec) -> Self {
        match spec {
            VersionSpec::Alias { name, spec } => Self::from_spec(&name, *spec),
            spec => Self {
                name: name.to_string(),
                spec,
            },
        }
    }
}

/// Result of adding a node to the graph
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// First time `(name, version)` was reached
    Added,
    /// Already present as optional and now reached by a required edge
    Upgraded,
    /// Already present with an equal or stronger kind
    Present,
}

/// Deduplicated set of resolved packages
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<(String, Version), (ResolvedDependency, DepKind)>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node reached through an edge of `kind`
    ///
    /// A node first reached as optional is upgraded once a required edge
    /// reaches it, so its children can be walked again as required.
    pub fn insert(&mut self, node: ResolvedDependency, kind: DepKind) -> Insertion {
        let key = (node.name.clone(), node.version.clone());
        match self.nodes.get_mut(&key) {
            None => {
                self.nodes.insert(key, (node, kind));
                Insertion::Added
            }
            Some((_, stored)) if *stored == DepKind::Optional && kind == DepKind::Required => {
                *stored = DepKind::Required;
                Insertion::Upgraded
            }
            Some(_) => Insertion::Present,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes ordered by `(name, version)`
    #[must_use]
    pub fn into_sorted(self) -> Vec<ResolvedDependency> {
        self.nodes.into_values().map(|(node, _)| node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npmirror_types::Dist;

    #[test]
    fn test_optional_overrides_required() {
        let manifest = VersionManifest {
            name: "chokidar".into(),
            version: "3.6.0".into(),
            dependencies: [
                ("anymatch".to_string(), "~3.1.2".to_string()),
                ("fsevents".to_string(), "~2.3.2".to_string()),
            ]
            .into_iter()
            .collect(),
            optional_dependencies: [("fsevents".to_string(), "~2.3.2".to_string())]
                .into_iter()
                .collect(),
            dist: Dist {
                tarball: "https://registry.npmjs.org/chokidar/-/chokidar-3.6.0.tgz".into(),
                shasum: None,
                integrity: None,
            },
        };

        let edges = DepEdge::children_of(&manifest, DepKind::Required);
        assert_eq!(edges.len(), 2);
        let fsevents = edges.iter().find(|e| e.name == "fsevents").unwrap();
        assert_eq!(fsevents.kind, DepKind::Optional);
        assert_eq!(fsevents.parent.as_deref(), Some("chokidar@3.6.0"));

        let below_optional = DepEdge::children_of(&manifest, DepKind::Optional);
        assert!(below_optional.iter().all(|e| e.kind == DepKind::Optional));
    }

    #[test]
    fn test_alias_target() {
        let spec = VersionSpec::parse("npm:string-width@^4.2.0").unwrap();
        let target = Target::from_spec("string-width-cjs", spec);
        assert_eq!(target.name, "string-width");
        assert!(matches!(target.spec, VersionSpec::Range(_)));
    }

    #[test]
    fn test_graph_dedupes() {
        let mut graph = DependencyGraph::new();
        let node = ResolvedDependency::new("a", Version::new(1, 0, 0), "u");
        assert_eq!(graph.insert(node.clone(), DepKind::Required), Insertion::Added);
        assert_eq!(graph.insert(node, DepKind::Optional), Insertion::Present);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_required_edge_upgrades_optional_node() {
        let mut graph = DependencyGraph::new();
        let node = ResolvedDependency::new("shared", Version::new(1, 0, 0), "u");
        assert_eq!(graph.insert(node.clone(), DepKind::Optional), Insertion::Added);
        assert_eq!(graph.insert(node.clone(), DepKind::Required), Insertion::Upgraded);
        assert_eq!(graph.insert(node, DepKind::Required), Insertion::Present);
        assert_eq!(graph.len(), 1);
    }
}
