use clap::Parser;
use skynav_launch_core::cli::{DispatchResult, PkgCli};

fn main() {
    env_logger::init();
    let cli = PkgCli::parse();

    let status = match cli.dispatch() {
        DispatchResult::Success => 0,
        DispatchResult::Failed(reason) => {
            eprintln!("skynav-pkg: {reason}");
            2
        }
    };

    std::process::exit(status);
}
