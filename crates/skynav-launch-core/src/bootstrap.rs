use log::debug;
use thiserror::Error;

use crate::host::{ExitStatus, HostError, HostRunner};
use crate::resolver::{PackageResolver, ResolutionError, ResolvedPackage};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Run one named plugin standalone under the plugin host and return the
/// host's status untouched.
///
/// Resolution happens first and fails fast: on a resolution error the host
/// factory is never called, so no host exists for an unknown package. The
/// host is then invoked exactly once with the unmodified argument vector and
/// `standalone` set to the package identifier; whatever it returns, status or
/// failure, is forwarded without translation.
pub fn run_standalone<R, H>(
    argv: &[String],
    package: &str,
    resolver: &R,
    make_host: impl FnOnce(ResolvedPackage) -> H,
) -> Result<ExitStatus, LaunchError>
where
    R: PackageResolver + ?Sized,
    H: HostRunner,
{
    let resolved = resolver.resolve(package)?;
    debug!("package '{package}' resolved, starting host");
    let host = make_host(resolved);
    let status = host.main(argv, Some(package))?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PackageManifest;
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct StubResolver {
        known: Vec<&'static str>,
    }

    impl PackageResolver for StubResolver {
        fn resolve(&self, package: &str) -> Result<ResolvedPackage, ResolutionError> {
            if !self.known.contains(&package) {
                return Err(ResolutionError::UnknownPackage(package.to_string()));
            }
            Ok(ResolvedPackage {
                manifest: PackageManifest {
                    package: package.to_string(),
                    version: "0.1.0".to_string(),
                    plugin: None,
                    depends: Vec::new(),
                },
                root: PathBuf::from("/registry").join(package),
                dependency_roots: Vec::new(),
            })
        }
    }

    type CallLog = Rc<RefCell<Vec<(Vec<String>, Option<String>)>>>;

    struct StubHost {
        calls: CallLog,
        result: Result<ExitStatus, ()>,
    }

    impl HostRunner for StubHost {
        fn main(&self, argv: &[String], standalone: Option<&str>) -> Result<ExitStatus, HostError> {
            self.calls
                .borrow_mut()
                .push((argv.to_vec(), standalone.map(str::to_string)));
            self.result
                .map_err(|()| HostError::Wait(io::Error::other("host gone")))
        }
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn forwards_argv_and_standalone_name_verbatim() {
        let resolver = StubResolver {
            known: vec!["skynav_gui"],
        };
        let calls: CallLog = Rc::default();
        let log = calls.clone();

        let status = run_standalone(
            &argv(&["prog", "--perspective", "default"]),
            "skynav_gui",
            &resolver,
            move |_| StubHost {
                calls: log,
                result: Ok(1),
            },
        )
        .unwrap();

        assert_eq!(status, 1);
        let seen = calls.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, argv(&["prog", "--perspective", "default"]));
        assert_eq!(seen[0].1.as_deref(), Some("skynav_gui"));
    }

    #[test]
    fn forwards_any_host_status_unchanged() {
        let resolver = StubResolver {
            known: vec!["skynav_gui"],
        };
        for expected in [0, 1, 7, 255, -1] {
            let status = run_standalone(
                &argv(&["prog"]),
                "skynav_gui",
                &resolver,
                |_| StubHost {
                    calls: Rc::default(),
                    result: Ok(expected),
                },
            )
            .unwrap();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn resolution_failure_constructs_no_host() {
        let resolver = StubResolver { known: vec![] };
        let constructed = Rc::new(Cell::new(0u32));
        let count = constructed.clone();

        let result = run_standalone(&argv(&["prog"]), "nonexistent_pkg", &resolver, move |_| {
            count.set(count.get() + 1);
            StubHost {
                calls: Rc::default(),
                result: Ok(0),
            }
        });

        match result {
            Err(LaunchError::Resolution(ResolutionError::UnknownPackage(name))) => {
                assert_eq!(name, "nonexistent_pkg");
            }
            other => panic!("expected resolution failure, got {other:?}"),
        }
        assert_eq!(constructed.get(), 0);
    }

    #[test]
    fn host_is_invoked_exactly_once_even_on_failure() {
        let resolver = StubResolver {
            known: vec!["skynav_gui"],
        };
        let calls: CallLog = Rc::default();
        let log = calls.clone();

        let result = run_standalone(&argv(&["prog"]), "skynav_gui", &resolver, move |_| StubHost {
            calls: log,
            result: Err(()),
        });

        assert!(matches!(result, Err(LaunchError::Host(HostError::Wait(_)))));
        assert_eq!(calls.borrow().len(), 1);
    }
}
