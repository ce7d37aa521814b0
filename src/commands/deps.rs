use anyhow::Result;

use crate::application::{DependencyRepository, RepositoryViewBuilder};
use crate::package::InstallStateStore;
use crate::runtime::Runtime;

use super::config::{Config, ConfigOverrides};
use super::services::Services;

/// Print the dependency view of the catalog, or of the install root with
/// `installed`.
#[tracing::instrument(skip(runtime, overrides))]
pub async fn deps<R: Runtime + Clone>(
    runtime: R,
    installed: bool,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;
    let builder = RepositoryViewBuilder::new(
        &services.catalog,
        InstallStateStore::new(&runtime, config.install_root.clone()),
    );

    let repository = if installed {
        builder.installed()?
    } else {
        builder.available().await?
    };
    print!("{}", render(&repository));
    Ok(())
}

fn render(repository: &DependencyRepository) -> String {
    repository.iter().map(|p| format!("{}\n", p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_render() {
        let mut repository = DependencyRepository::new();
        repository.add("foo-1.0".parse().unwrap());
        repository.add("bar-2.0; depends (foo)".parse().unwrap());
        assert_eq!(render(&repository), "foo-1.0\nbar-2.0; depends (foo)\n");
    }

    #[tokio::test]
    async fn test_available_from_catalog() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/meta.txt")
            .with_body("foo-1.0\nbar-2.0; depends (foo)\n\n")
            .create();
        let dir = tempdir().unwrap();

        let overrides = ConfigOverrides {
            install_root: Some(dir.path().to_path_buf()),
            api_url: Some(format!("{}/api/", server.url())),
        };
        deps(RealRuntime, false, overrides).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_installed_rejects_bad_version() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        fs::write(dir.path().join("meta/foo.yaml"), "version: 'x.y'\n").unwrap();

        let overrides = ConfigOverrides {
            install_root: Some(dir.path().to_path_buf()),
            api_url: None,
        };
        assert!(deps(RealRuntime, true, overrides).await.is_err());
    }
}
