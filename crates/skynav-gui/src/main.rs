use skynav_launch_core::{run_standalone, LaunchError, ManifestResolver, ProcessHostRunner};

/// The one plugin this launcher runs; never taken from the command line.
const PACKAGE: &str = "skynav_gui";

fn main() {
    env_logger::init();
    let argv: Vec<String> = std::env::args().collect();
    let resolver = ManifestResolver::from_env();

    let status = match run_standalone(&argv, PACKAGE, &resolver, ProcessHostRunner::from_env) {
        Ok(status) => status,
        Err(LaunchError::Resolution(err)) => {
            eprintln!("skynav-gui: {err}");
            2
        }
        Err(LaunchError::Host(err)) => {
            eprintln!("skynav-gui: {err}");
            1
        }
    };

    std::process::exit(status);
}
