//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use npmirror_errors::{Error, NetworkError, RegistryError};
    use npmirror_net::*;
    use npmirror_types::ResolvedDependency;
    use semver::Version;
    use std::time::Duration;
    use tempfile::tempdir;

    const DOC: &str = r#"{
        "name": "left-pad",
        "dist-tags": { "latest": "1.3.0" },
        "versions": {
            "1.3.0": {
                "name": "left-pad",
                "version": "1.3.0",
                "dist": { "tarball": "http://localhost/left-pad/-/left-pad-1.3.0.tgz" }
            }
        }
    }"#;

    fn fast_client() -> NetClient {
        NetClient::new(NetConfig {
            retry_count: 1,
            retry_delay: Duration::from_millis(10),
            ..NetConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_packument_fetch_writes_cache() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/left-pad");
            then.status(200)
                .header("content-type", "application/json")
                .body(DOC);
        });

        let temp = tempdir().unwrap();
        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();

        let doc = client.packument("left-pad").await.unwrap();
        mock.assert();
        assert_eq!(doc.latest(), Some("1.3.0"));
        assert!(temp.path().join("left-pad.json").exists());

        let meta = client.metadata("left-pad").await.unwrap();
        assert_eq!(meta.latest_version, "1.3.0");
    }

    #[tokio::test]
    async fn test_scoped_name_is_encoded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path_contains("@scope");
            then.status(200)
                .body(r#"{"name":"@scope/pkg","dist-tags":{"latest":"0.1.0"},"versions":{}}"#);
        });

        let temp = tempdir().unwrap();
        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();
        let doc = client.packument("@scope/pkg").await.unwrap();
        mock.assert();
        assert_eq!(doc.name, "@scope/pkg");
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body(r#"{"error":"Not found"}"#);
        });

        let temp = tempdir().unwrap();
        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();
        let err = client.packument("missing").await.unwrap_err();
        assert!(matches!(err, Error::Registry(RegistryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429).header("retry-after", "7");
        });

        let temp = tempdir().unwrap();
        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();
        let err = client.packument("busy").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::RateLimited { seconds: 7 })
        ));
    }

    #[tokio::test]
    async fn test_malformed_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(200).body("<html>not json</html>");
        });

        let temp = tempdir().unwrap();
        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();
        let err = client.packument("broken").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_falls_back_to_cache_on_server_error() {
        let server = MockServer::start();
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("left-pad.json"), DOC).unwrap();

        let mock = server.mock(|when, then| {
            when.method(GET).path("/left-pad");
            then.status(503);
        });

        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();
        let doc = client.packument("left-pad").await.unwrap();
        assert_eq!(doc.latest(), Some("1.3.0"));
        // one attempt plus one retry
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn test_tarball_download() {
        let server = MockServer::start();
        let content = b"\x1f\x8b fake tarball";
        let mock = server.mock(|when, then| {
            when.method(GET).path("/left-pad/-/left-pad-1.3.0.tgz");
            then.status(200).body(content);
        });

        let temp = tempdir().unwrap();
        let client = RegistryClient::new(fast_client(), &server.base_url(), temp.path()).unwrap();
        let dep = ResolvedDependency::new(
            "left-pad",
            Version::new(1, 3, 0),
            server.url("/left-pad/-/left-pad-1.3.0.tgz"),
        );
        let dest = temp.path().join("out.tgz");

        let written = client.download(&dep, &dest).await.unwrap();
        mock.assert();
        assert_eq!(written, content.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }
}
