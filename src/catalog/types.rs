use serde::{Deserialize, Serialize};

use crate::package::version_text;

/// The catalog's aggregate record for one package name.
///
/// `latest` and `latest_stable` are URLs of release records, either of
/// which may be absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Metadap {
    pub package_name: String,
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub latest_stable: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub average_rank: Option<f64>,
    #[serde(default)]
    pub rank_count: Option<u64>,
    #[serde(default)]
    pub reports: Option<u64>,
}

impl Metadap {
    /// URL of the release installs default to: stable first, then any.
    pub fn default_release_url(&self) -> Option<&str> {
        self.latest_stable.as_deref().or(self.latest.as_deref())
    }
}

/// One version of a dap as published in the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Release {
    #[serde(deserialize_with = "version_text")]
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub bugreports: Option<String>,
    #[serde(default)]
    pub is_pre: Option<bool>,
    #[serde(default)]
    pub is_latest: Option<bool>,
    #[serde(default)]
    pub is_latest_stable: Option<bool>,
    /// Artifact URL.
    #[serde(default)]
    pub download: Option<String>,
    /// Expected hex SHA-256 of the artifact.
    #[serde(default)]
    pub sha256sum: Option<String>,
}

/// One page of a paginated listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadap_prefers_latest_stable() {
        let mut metadap = Metadap {
            package_name: "foo".into(),
            latest: Some("http://api/daps/foo-2.0a/".into()),
            latest_stable: Some("http://api/daps/foo-1.0/".into()),
            ..Default::default()
        };
        assert_eq!(metadap.default_release_url(), Some("http://api/daps/foo-1.0/"));

        metadap.latest_stable = None;
        assert_eq!(metadap.default_release_url(), Some("http://api/daps/foo-2.0a/"));

        metadap.latest = None;
        assert_eq!(metadap.default_release_url(), None);
    }

    #[test]
    fn test_release_from_service_json() {
        let release: Release = serde_yaml::from_str(
            r#"{"version": "1.0", "summary": "Foo", "description": null, "license": "GPLv2+",
                "is_pre": false, "download": "http://dl/foo-1.0.dap", "sha256sum": "abc",
                "metadap": "http://api/metadaps/foo/"}"#,
        )
        .unwrap();
        assert_eq!(release.version, "1.0");
        assert_eq!(release.description, None);
        assert_eq!(release.homepage, None);
        assert_eq!(release.is_pre, Some(false));
        assert_eq!(release.download.as_deref(), Some("http://dl/foo-1.0.dap"));
    }

    #[test]
    fn test_page_of_users() {
        let page: Page<User> = serde_yaml::from_str(
            "count: 2\nnext: null\nresults:\n- {username: bkabrda, full_name: Slavek}\n- {username: anon, full_name: ''}\n",
        )
        .unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.next, None);
        assert_eq!(page.results[0].full_name.as_deref(), Some("Slavek"));
        assert_eq!(page.results[1].username, "anon");
    }
}
