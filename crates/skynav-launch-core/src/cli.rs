use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::warn;
use thiserror::Error;

use crate::fs_ops::{self, FsError, MutationPhase, REGISTRY_JOURNAL_FILE_NAME};
use crate::resolver::{
    ManifestResolver, PackageManifest, PackageResolver, ResolutionError, MANIFEST_FILE_NAME,
    PACKAGE_PATH_ENV,
};

const MANIFEST_MODE: u32 = 0o644;

/// Representation of the skynav-pkg command line options.
#[derive(Debug, Parser, Clone)]
#[command(author, version, about = "Registry tooling for skynav plugin packages.")]
pub struct PkgCli {
    /// Alternate registry search path; overrides SKYNAV_PACKAGE_PATH.
    #[arg(long)]
    pub package_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List every package visible on the search path.
    List,
    /// Resolve one package and print its dependency closure.
    Resolve(ResolveArgs),
    /// Copy a manifest into the first registry root.
    Register(RegisterArgs),
    /// Remove one or more packages from the registry.
    Remove(PackageArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    pub package: String,
}

#[derive(Debug, Args, Clone)]
pub struct RegisterArgs {
    pub manifest: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PackageArgs {
    #[arg(required = true)]
    pub packages: Vec<String>,
}

/// Result of dispatching a CLI invocation.
pub enum DispatchResult {
    /// Command handled successfully.
    Success,
    /// The command could not be completed.
    Failed(String),
}

#[derive(Debug, Error)]
enum PkgError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("io error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest at `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no registry root configured; set {PACKAGE_PATH_ENV}")]
    NoRoot,
    #[error("package `{0}` is not registered")]
    NotRegistered(String),
}

impl PkgCli {
    pub fn dispatch(self) -> DispatchResult {
        let resolver = match &self.package_path {
            Some(raw) => ManifestResolver::new(
                std::env::split_paths(raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect(),
            ),
            None => ManifestResolver::from_env(),
        };

        let outcome = match self.command {
            Command::List => list(&resolver),
            Command::Resolve(args) => resolve(&resolver, &args.package),
            Command::Register(args) => register(&resolver, &args.manifest),
            Command::Remove(args) => remove(&resolver, &args.packages),
        };

        match outcome {
            Ok(()) => DispatchResult::Success,
            Err(err) => DispatchResult::Failed(err.to_string()),
        }
    }
}

fn list(resolver: &ManifestResolver) -> Result<(), PkgError> {
    for root in resolver.roots() {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(PkgError::Io {
                    path: root.clone(),
                    source,
                })
            }
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(MANIFEST_FILE_NAME).is_file())
            .collect();
        dirs.sort();

        for dir in dirs {
            match read_manifest(&dir) {
                Ok(manifest) => {
                    println!("{} {} ({})", manifest.package, manifest.version, dir.display());
                }
                Err(err) => warn!("skipping unreadable package at {}: {err}", dir.display()),
            }
        }
    }
    Ok(())
}

fn resolve(resolver: &ManifestResolver, package: &str) -> Result<(), PkgError> {
    let resolved = resolver.resolve(package)?;
    println!(
        "{} {}",
        resolved.manifest.package, resolved.manifest.version
    );
    for root in resolved.roots() {
        println!("  {}", root.display());
    }
    Ok(())
}

fn register(resolver: &ManifestResolver, manifest_path: &Path) -> Result<(), PkgError> {
    let _phase = MutationPhase::new("register");
    let manifest = read_manifest_file(manifest_path)?;
    let root = resolver.roots().first().ok_or(PkgError::NoRoot)?;

    let target = root.join(&manifest.package).join(MANIFEST_FILE_NAME);
    fs_ops::write_manifest(&target, &manifest, MANIFEST_MODE)?;
    fs_ops::journal_append(
        &root.join(REGISTRY_JOURNAL_FILE_NAME),
        &format!("register {} {}", manifest.package, manifest.version),
        MANIFEST_MODE,
    )?;
    Ok(())
}

fn remove(resolver: &ManifestResolver, packages: &[String]) -> Result<(), PkgError> {
    let _phase = MutationPhase::new("remove");
    for package in packages {
        let (root, dir) = resolver
            .roots()
            .iter()
            .map(|root| (root, root.join(package)))
            .find(|(_, dir)| dir.join(MANIFEST_FILE_NAME).is_file())
            .ok_or_else(|| PkgError::NotRegistered(package.clone()))?;

        fs::remove_dir_all(&dir).map_err(|source| PkgError::Io {
            path: dir.clone(),
            source,
        })?;
        fs_ops::journal_append(
            &root.join(REGISTRY_JOURNAL_FILE_NAME),
            &format!("remove {package}"),
            MANIFEST_MODE,
        )?;
    }
    Ok(())
}

fn read_manifest(dir: &Path) -> Result<PackageManifest, PkgError> {
    read_manifest_file(&dir.join(MANIFEST_FILE_NAME))
}

fn read_manifest_file(path: &Path) -> Result<PackageManifest, PkgError> {
    let raw = fs::read_to_string(path).map_err(|source| PkgError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| PkgError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
