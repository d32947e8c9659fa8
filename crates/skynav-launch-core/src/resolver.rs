use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Colon-separated list of registry roots searched for package manifests.
pub const PACKAGE_PATH_ENV: &str = "SKYNAV_PACKAGE_PATH";

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("package identifier is empty")]
    EmptyIdentifier,
    #[error("package search path is empty; set {PACKAGE_PATH_ENV}")]
    NoSearchPath,
    #[error("unknown package `{0}`")]
    UnknownPackage(String),
    #[error("failed to read manifest at `{path}`: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest at `{path}`: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest at `{path}` names package `{found}`, expected `{expected}`")]
    NameMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },
    #[error("package `{package}` depends on `{dependency}`, which is not registered")]
    MissingDependency { package: String, dependency: String },
    #[error("dependency cycle through package `{0}`")]
    DependencyCycle(String),
}

/// Plugin entry advertised by a package, loaded by the host, not by us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub library: String,
    #[serde(default)]
    pub entry: Option<String>,
}

/// On-disk description of one registered package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub package: String,
    pub version: String,
    #[serde(default)]
    pub plugin: Option<PluginRef>,
    #[serde(default)]
    pub depends: Vec<String>,
}

/// A package plus the directories of its transitive dependency closure.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub manifest: PackageManifest,
    pub root: PathBuf,
    pub(crate) dependency_roots: Vec<PathBuf>,
}

impl ResolvedPackage {
    /// Directories the host needs on its plugin path, package root first.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.root.as_path())
            .chain(self.dependency_roots.iter().map(PathBuf::as_path))
    }
}

/// Capability used by the bootstrap to make a package loadable before any
/// host is constructed.
pub trait PackageResolver {
    fn resolve(&self, package: &str) -> Result<ResolvedPackage, ResolutionError>;
}

/// Resolver over directory roots, one subdirectory with a `manifest.json`
/// per registered package. The first root containing a package wins.
pub struct ManifestResolver {
    roots: Vec<PathBuf>,
    cache: Mutex<HashMap<String, ResolvedPackage>>,
}

impl ManifestResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build the resolver from `SKYNAV_PACKAGE_PATH`.
    pub fn from_env() -> Self {
        let roots = std::env::var_os(PACKAGE_PATH_ENV)
            .map(|raw| {
                std::env::split_paths(&raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self::new(roots)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn locate(&self, package: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(package))
            .find(|dir| dir.join(MANIFEST_FILE_NAME).is_file())
    }

    fn load_manifest(dir: &Path, expected: &str) -> Result<PackageManifest, ResolutionError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let raw = fs::read_to_string(&path).map_err(|source| ResolutionError::ManifestRead {
            path: path.clone(),
            source,
        })?;
        let manifest: PackageManifest =
            serde_json::from_str(&raw).map_err(|source| ResolutionError::ManifestParse {
                path: path.clone(),
                source,
            })?;
        if manifest.package != expected {
            return Err(ResolutionError::NameMismatch {
                path,
                found: manifest.package,
                expected: expected.to_string(),
            });
        }
        Ok(manifest)
    }

    fn walk_dependencies(
        &self,
        owner: &str,
        manifest: &PackageManifest,
        trail: &mut Vec<String>,
        seen: &mut HashSet<String>,
        out: &mut Vec<PathBuf>,
    ) -> Result<(), ResolutionError> {
        for dependency in &manifest.depends {
            if trail.iter().any(|name| name == dependency) {
                return Err(ResolutionError::DependencyCycle(dependency.clone()));
            }
            if !seen.insert(dependency.clone()) {
                continue;
            }
            let dir = self
                .locate(dependency)
                .ok_or_else(|| ResolutionError::MissingDependency {
                    package: owner.to_string(),
                    dependency: dependency.clone(),
                })?;
            let dep_manifest = Self::load_manifest(&dir, dependency)?;
            out.push(dir);
            trail.push(dependency.clone());
            self.walk_dependencies(dependency, &dep_manifest, trail, seen, out)?;
            trail.pop();
        }
        Ok(())
    }
}

impl PackageResolver for ManifestResolver {
    fn resolve(&self, package: &str) -> Result<ResolvedPackage, ResolutionError> {
        if package.is_empty() {
            return Err(ResolutionError::EmptyIdentifier);
        }
        if self.roots.is_empty() {
            return Err(ResolutionError::NoSearchPath);
        }
        if let Some(hit) = self.cache.lock().get(package) {
            return Ok(hit.clone());
        }

        let root = self
            .locate(package)
            .ok_or_else(|| ResolutionError::UnknownPackage(package.to_string()))?;
        let manifest = Self::load_manifest(&root, package)?;

        let mut trail = vec![package.to_string()];
        let mut seen = HashSet::from([package.to_string()]);
        let mut dependency_roots = Vec::new();
        self.walk_dependencies(package, &manifest, &mut trail, &mut seen, &mut dependency_roots)?;

        debug!(
            "resolved package '{}' at {} ({} dependency roots)",
            package,
            root.display(),
            dependency_roots.len()
        );
        let resolved = ResolvedPackage {
            manifest,
            root,
            dependency_roots,
        };
        self.cache
            .lock()
            .insert(package.to_string(), resolved.clone());
        Ok(resolved)
    }
}
