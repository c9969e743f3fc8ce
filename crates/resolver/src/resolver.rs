//! Breadth-first dependency closure resolver

use crate::graph::{DepEdge, DepKind, DependencyGraph, Insertion, Target};
use crate::DependencyResolver;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use npmirror_config::resources_semaphore::{acquire_semaphore_permit, create_semaphore};
use npmirror_errors::{Error, ResolveError};
use npmirror_events::progress::fraction;
use npmirror_events::{EventEmitter, EventSender, ProgressReporter};
use npmirror_net::PackumentSource;
use npmirror_types::{
    PackageRequests, Packument, ResolvedDependency, Version, VersionManifest, VersionSpec,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Dependency resolver
///
/// Walks the graph one level at a time. The documents a level needs are
/// loaded concurrently, then its edges are settled in discovery order so the
/// result does not depend on network timing.
#[derive(Clone)]
pub struct Resolver {
    source: Arc<dyn PackumentSource>,
    max_concurrent: usize,
    tx: Option<EventSender>,
}

type Documents = HashMap<String, Result<Arc<Packument>, Error>>;

impl Resolver {
    pub fn new(source: Arc<dyn PackumentSource>, max_concurrent: usize) -> Self {
        Self {
            source,
            max_concurrent: max_concurrent.max(1),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Load every document in `names` not already in `docs`
    async fn load_documents(&self, names: HashSet<String>, docs: &mut Documents) {
        let semaphore = create_semaphore(self.max_concurrent);
        let mut pending = FuturesUnordered::new();

        for name in names {
            if docs.contains_key(&name) {
                continue;
            }
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            pending.push(async move {
                let permit = acquire_semaphore_permit(semaphore, "registry lookups").await;
                let result = match permit {
                    Ok(_permit) => source.packument(&name).await.map(Arc::new),
                    Err(e) => Err(e),
                };
                (name, result)
            });
        }

        while let Some((name, result)) = pending.next().await {
            docs.insert(name, result);
        }
    }

    /// Settle one edge against its loaded document
    fn settle(
        edge: &DepEdge,
        target: &Target,
        docs: &Documents,
    ) -> Result<(ResolvedDependency, VersionManifest), Error> {
        let doc = match docs.get(&target.name) {
            Some(Ok(doc)) => doc,
            Some(Err(e)) => {
                return Err(ResolveError::MetadataUnavailable {
                    name: target.name.clone(),
                    message: e.to_string(),
                }
                .into())
            }
            None => {
                return Err(ResolveError::MetadataUnavailable {
                    name: target.name.clone(),
                    message: "document was not loaded".to_string(),
                }
                .into())
            }
        };

        let version = pick_version(doc, &target.name, &target.spec, &edge.raw)?;
        let manifest = doc
            .manifest(&version)
            .ok_or_else(|| ResolveError::MissingManifest {
                name: target.name.clone(),
                version: version.to_string(),
            })?;

        let node = ResolvedDependency::new(
            target.name.clone(),
            version,
            manifest.dist.tarball.clone(),
        );
        Ok((node, manifest.clone()))
    }

    fn skip_optional(&self, edge: &DepEdge, error: &Error) {
        tracing::warn!(edge = %edge, error = %error, "skipping optional dependency");
        self.emit_warning_with_context(
            format!("skipping optional dependency {edge}"),
            error.to_string(),
        );
    }
}

impl EventEmitter for Resolver {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

#[async_trait]
impl DependencyResolver for Resolver {
    async fn resolve(
        &self,
        requests: &PackageRequests,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ResolvedDependency>, Error> {
        let mut graph = DependencyGraph::new();
        let mut docs: Documents = HashMap::new();
        let mut seen_edges: HashSet<(String, String, DepKind)> = HashSet::new();

        let mut frontier: VecDeque<DepEdge> = requests
            .iter()
            .map(|(name, raw)| DepEdge::new(name, raw, DepKind::Required))
            .collect();
        for edge in &frontier {
            seen_edges.insert((edge.name.clone(), edge.raw.clone(), edge.kind));
        }

        let mut discovered = frontier.len();
        let mut settled = 0usize;

        while !frontier.is_empty() {
            // Parse specifiers and collect the documents this level needs
            let mut level = Vec::with_capacity(frontier.len());
            let mut names = HashSet::new();
            for edge in frontier.drain(..) {
                let parsed = VersionSpec::parse(&edge.raw)
                    .map_err(Error::from)
                    .and_then(|spec| match Target::from_spec(&edge.name, spec) {
                        Target {
                            spec: VersionSpec::Unsupported(raw),
                            ..
                        } => Err(ResolveError::UnsupportedSpec {
                            name: edge.name.clone(),
                            spec: raw,
                        }
                        .into()),
                        target => Ok(target),
                    });
                if let Ok(target) = &parsed {
                    names.insert(target.name.clone());
                }
                level.push((edge, parsed));
            }

            self.load_documents(names, &mut docs).await;

            let mut next = VecDeque::new();
            for (edge, parsed) in level {
                let outcome = parsed.and_then(|target| Self::settle(&edge, &target, &docs));
                settled += 1;

                let (node, manifest) = match outcome {
                    Ok(found) => found,
                    Err(error) if edge.kind == DepKind::Optional => {
                        self.skip_optional(&edge, &error);
                        progress.show(
                            &format!("Resolving: {}", edge.name),
                            fraction(settled, discovered),
                        );
                        continue;
                    }
                    Err(error) => return Err(error),
                };

                progress.show(&format!("Resolving: {node}"), fraction(settled, discovered));

                // Children of an upgraded node are walked again as required
                if graph.insert(node, edge.kind) == Insertion::Present {
                    continue;
                }
                for child in DepEdge::children_of(&manifest, edge.kind) {
                    if seen_edges.insert((child.name.clone(), child.raw.clone(), child.kind)) {
                        discovered += 1;
                        next.push_back(child);
                    }
                }
            }
            frontier = next;
        }

        if discovered == 0 {
            progress.show("Resolving: done", 1.0);
        }
        Ok(graph.into_sorted())
    }
}

/// Choose the version an edge resolves to
///
/// Ranges prefer the `latest` dist-tag when it satisfies them, otherwise the
/// highest satisfying version.
fn pick_version(
    doc: &Packument,
    name: &str,
    spec: &VersionSpec,
    raw: &str,
) -> Result<Version, Error> {
    match spec {
        VersionSpec::Tag(tag) => {
            let tagged = doc.dist_tags.get(tag).ok_or_else(|| ResolveError::UnknownTag {
                name: name.to_string(),
                tag: tag.clone(),
            })?;
            Ok(Version::parse(tagged)?)
        }
        VersionSpec::Range(range) => {
            if let Some(latest) = doc.latest().and_then(|v| Version::parse(v).ok()) {
                if range.matches(&latest) {
                    return Ok(latest);
                }
            }
            let versions: Vec<Version> = doc.semver_versions().collect();
            range
                .max_satisfying(versions.iter())
                .cloned()
                .ok_or_else(|| {
                    ResolveError::NoSatisfyingVersion {
                        name: name.to_string(),
                        spec: raw.to_string(),
                    }
                    .into()
                })
        }
        VersionSpec::Alias { .. } | VersionSpec::Unsupported(_) => {
            Err(ResolveError::UnsupportedSpec {
                name: name.to_string(),
                spec: raw.to_string(),
            }
            .into())
        }
    }
}
