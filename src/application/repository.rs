//! Repository views handed to the dependency solver.
//!
//! Both views use the descriptor grammar of the catalog's `meta.txt` feed:
//! `name-version[; depends (dep, dep, ...)]`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::catalog::Catalog;
use crate::package::{DapVersion, InstallStateStore};
use crate::runtime::Runtime;

/// One package release with its dependency constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: DapVersion,
    pub dependencies: Vec<String>,
}

impl FromStr for PackageDescriptor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (head, clause) = match s.split_once(';') {
            Some((head, clause)) => (head.trim(), Some(clause.trim())),
            None => (s.trim(), None),
        };

        let (name, version) = head
            .rsplit_once('-')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| anyhow!("Expected name-version in '{}'", s))?;
        let version = DapVersion::parse(version)?;

        let dependencies = match clause {
            None => Vec::new(),
            Some(clause) => clause
                .strip_prefix("depends")
                .map(str::trim)
                .and_then(|rest| rest.strip_prefix('('))
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| anyhow!("Expected 'depends (...)' in '{}'", s))?
                .split(',')
                .map(str::trim)
                .filter(|dep| !dep.is_empty())
                .map(str::to_string)
                .collect(),
        };

        Ok(Self {
            name: name.to_string(),
            version,
            dependencies,
        })
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)?;
        if !self.dependencies.is_empty() {
            write!(f, "; depends ({})", self.dependencies.join(", "))?;
        }
        Ok(())
    }
}

/// A set of package descriptors, at most one per name and version.
#[derive(Debug, Clone, Default)]
pub struct DependencyRepository {
    packages: Vec<PackageDescriptor>,
    seen: HashSet<(String, DapVersion)>,
}

impl DependencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; returns `false` if that release was already present.
    pub fn add(&mut self, package: PackageDescriptor) -> bool {
        let key = (package.name.clone(), package.version.clone());
        if !self.seen.insert(key) {
            debug!("Skipping duplicate {}", package);
            return false;
        }
        self.packages.push(package);
        true
    }

    pub fn contains(&self, name: &str, version: &DapVersion) -> bool {
        self.seen.contains(&(name.to_string(), version.clone()))
    }

    pub fn find<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s PackageDescriptor> + 's {
        self.packages.iter().filter(move |p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Builds the "available" and "installed" views.
pub struct RepositoryViewBuilder<'a, R: Runtime> {
    catalog: &'a dyn Catalog,
    store: InstallStateStore<'a, R>,
}

impl<'a, R: Runtime> RepositoryViewBuilder<'a, R> {
    pub fn new(catalog: &'a dyn Catalog, store: InstallStateStore<'a, R>) -> Self {
        Self { catalog, store }
    }

    /// Every release the catalog advertises in its dependency feed.
    #[tracing::instrument(skip(self))]
    pub async fn available(&self) -> Result<DependencyRepository> {
        let mut repository = DependencyRepository::new();
        for line in self.catalog.dependency_metadata().await? {
            let package: PackageDescriptor = line
                .parse()
                .with_context(|| format!("Invalid dependency metadata line '{}'", line))?;
            repository.add(package);
        }
        Ok(repository)
    }

    /// Every dap in the install root.
    #[tracing::instrument(skip(self))]
    pub fn installed(&self) -> Result<DependencyRepository> {
        let mut repository = DependencyRepository::new();
        for installed in self.store.list()? {
            let version = DapVersion::parse(&installed.version)
                .with_context(|| format!("Installed dap {} has an invalid version", installed.name))?;
            repository.add(PackageDescriptor {
                name: installed.name,
                version,
                dependencies: installed.dependencies,
            });
        }
        Ok(repository)
    }
}
