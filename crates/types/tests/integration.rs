//! Integration tests for types

#[cfg(test)]
mod tests {
    use npmirror_types::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    const PACKUMENT: &str = r#"{
        "name": "left-pad",
        "dist-tags": { "latest": "1.3.0", "next": "2.0.0-rc.1" },
        "versions": {
            "1.2.0": {
                "name": "left-pad",
                "version": "1.2.0",
                "dist": { "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.2.0.tgz" }
            },
            "1.3.0": {
                "name": "left-pad",
                "version": "1.3.0",
                "dependencies": { "pad-core": "^0.4.1" },
                "optionalDependencies": { "fsevents": "~2.3.0" },
                "dist": {
                    "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
                    "shasum": "5b8a3a7765dfe001261dde915589e782f8c94d1e"
                },
                "scripts": { "test": "node test.js" }
            },
            "2.0.0-rc.1": {
                "name": "left-pad",
                "version": "2.0.0-rc.1",
                "dist": { "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-2.0.0-rc.1.tgz" }
            }
        },
        "time": { "modified": "2019-01-01T00:00:00.000Z" }
    }"#;

    #[test]
    fn test_packument_deserialization() {
        let doc: Packument = serde_json::from_str(PACKUMENT).unwrap();
        assert_eq!(doc.latest(), Some("1.3.0"));

        let manifest = doc.manifest(&Version::new(1, 3, 0)).unwrap();
        assert_eq!(manifest.dependencies["pad-core"], "^0.4.1");
        assert_eq!(manifest.optional_dependencies["fsevents"], "~2.3.0");
        assert!(manifest.dist.shasum.is_some());
        assert!(manifest.dist.integrity.is_none());

        let range = VersionRange::from_str("^1.0.0").unwrap();
        let versions: Vec<Version> = doc.semver_versions().collect();
        assert_eq!(range.max_satisfying(versions.iter()), Some(&Version::new(1, 3, 0)));
    }

    #[test]
    fn test_fetch_outcome_serialization() {
        let outcome = FetchOutcome::Fulfilled {
            path: "left-pad/-/left-pad-1.3.0.tgz".into(),
            source: FetchSource::Cache,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "fulfilled");
        assert_eq!(json["source"], "cache");
    }

    #[test]
    fn test_color_choice_default() {
        assert_eq!(ColorChoice::default(), ColorChoice::Auto);
    }

    proptest! {
        #[test]
        fn caret_stays_within_major(major in 1u64..50, minor in 0u64..50, patch in 0u64..50,
                                    cand_minor in 0u64..100, cand_patch in 0u64..100) {
            let range = VersionRange::from_str(&format!("^{major}.{minor}.{patch}")).unwrap();
            let candidate = Version::new(major, cand_minor, cand_patch);
            let expected = (cand_minor, cand_patch) >= (minor, patch);
            prop_assert_eq!(range.matches(&candidate), expected);
            prop_assert!(!range.matches(&Version::new(major + 1, 0, 0)));
        }

        #[test]
        fn exact_version_matches_only_itself(a in 0u64..20, b in 0u64..20, c in 0u64..20,
                                             d in 0u64..20, e in 0u64..20, f in 0u64..20) {
            let range = VersionRange::from_str(&format!("{a}.{b}.{c}")).unwrap();
            prop_assert_eq!(range.matches(&Version::new(d, e, f)), (a, b, c) == (d, e, f));
        }

        #[test]
        fn max_satisfying_is_a_match(
            versions in proptest::collection::vec((0u64..5, 0u64..5, 0u64..5), 0..20)
        ) {
            let versions: Vec<Version> = versions
                .into_iter()
                .map(|(a, b, c)| Version::new(a, b, c))
                .collect();
            let range = VersionRange::from_str("~2.1 || >=4").unwrap();
            match range.max_satisfying(versions.iter()) {
                Some(best) => {
                    prop_assert!(range.matches(best));
                    prop_assert!(versions.iter().filter(|v| range.matches(v)).all(|v| v <= best));
                }
                None => prop_assert!(versions.iter().all(|v| !range.matches(v))),
            }
        }
    }
}
