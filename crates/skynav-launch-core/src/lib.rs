//! Core library for launching skynav GUI plugins under an external plugin
//! host: package resolution, the host-runner contract, and the standalone
//! bootstrap used by the launcher binaries.

pub mod bootstrap;
pub mod cli;
pub mod fs_ops;
pub mod host;
pub mod resolver;

pub use bootstrap::{run_standalone, LaunchError};
pub use host::{ExitStatus, HostError, HostRunner, ProcessHostRunner};
pub use resolver::{ManifestResolver, PackageResolver, ResolutionError, ResolvedPackage};
