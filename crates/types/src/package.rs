//! Package-related type definitions

use crate::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Requested packages keyed by name, valued by version spec
pub type PackageRequests = BTreeMap<String, String>;

/// A package the mirror follows, with the versions it already holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPackage {
    pub name: String,
    #[serde(default)]
    pub versions: BTreeSet<String>,
}

impl TrackedPackage {
    /// Create a record with no known versions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: BTreeSet::new(),
        }
    }

    /// Create a record that already knows the given versions
    pub fn with_versions<I, S>(name: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether the mirror already holds `version`
    #[must_use]
    pub fn knows(&self, version: &str) -> bool {
        self.versions.contains(version)
    }
}

/// Live registry metadata for a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub latest_version: String,
}

/// The subset of an npm registry document that the mirror reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packument {
    pub name: String,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionManifest>,
}

impl Packument {
    /// Version pointed to by the `latest` dist-tag
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get(crate::LATEST_TAG).map(String::as_str)
    }

    /// Published versions that parse as semver
    pub fn semver_versions(&self) -> impl Iterator<Item = Version> + '_ {
        self.versions
            .keys()
            .filter_map(|raw| Version::parse(raw).ok())
    }

    /// Look up the manifest for an exact version
    #[must_use]
    pub fn manifest(&self, version: &Version) -> Option<&VersionManifest> {
        self.versions.get(&version.to_string())
    }
}

/// A single published version inside a packument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
    pub dist: Dist,
}

/// Download location of a version's tarball
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    pub tarball: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// A concrete node of the dependency closure
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: Version,
    pub tarball: String,
}

impl ResolvedDependency {
    pub fn new(name: impl Into<String>, version: Version, tarball: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            tarball: tarball.into(),
        }
    }

    /// Name without its `@scope/` prefix
    #[must_use]
    pub fn basename(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map_or(self.name.as_str(), |(_, base)| base)
    }

    /// File name the registry uses for this tarball
    #[must_use]
    pub fn tarball_file_name(&self) -> String {
        format!("{}-{}.tgz", self.basename(), self.version)
    }

    /// Path of the tarball relative to a mirror folder: `<name>/-/<file>`
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.name.split('/') {
            path.push(segment);
        }
        path.push("-");
        path.push(self.tarball_file_name());
        path
    }

    /// Key identifying this entry in the package cache
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A tracked package whose registry lookup failed during change detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub name: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str, version: &str) -> ResolvedDependency {
        ResolvedDependency::new(
            name,
            Version::parse(version).unwrap(),
            format!("https://registry.npmjs.org/{name}/-/x.tgz"),
        )
    }

    #[test]
    fn test_scoped_paths() {
        let d = dep("@babel/core", "7.24.0");
        assert_eq!(d.basename(), "core");
        assert_eq!(d.tarball_file_name(), "core-7.24.0.tgz");
        assert_eq!(
            d.relative_path(),
            PathBuf::from("@babel").join("core").join("-").join("core-7.24.0.tgz")
        );
        assert_eq!(d.cache_key(), "@babel/core@7.24.0");
    }

    #[test]
    fn test_unscoped_paths() {
        let d = dep("left-pad", "1.3.0");
        assert_eq!(d.relative_path(), PathBuf::from("left-pad/-/left-pad-1.3.0.tgz"));
        assert_eq!(d.to_string(), "left-pad@1.3.0");
    }

    #[test]
    fn test_ordering_uses_semver() {
        let mut deps = vec![dep("b", "1.0.0"), dep("a", "1.10.0"), dep("a", "1.9.0")];
        deps.sort();
        let order: Vec<String> = deps.iter().map(ToString::to_string).collect();
        assert_eq!(order, ["a@1.9.0", "a@1.10.0", "b@1.0.0"]);
    }

    #[test]
    fn test_tracked_package_knows() {
        let record = TrackedPackage::with_versions("left-pad", ["1.0.0", "1.0.1"]);
        assert!(record.knows("1.0.1"));
        assert!(!record.knows("1.0.2"));
        assert!(TrackedPackage::new("x").versions.is_empty());
    }
}
