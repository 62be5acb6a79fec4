#![allow(clippy::multiple_crate_versions)]

//! hinotes command-line entry point.

fn main() {
    hinotes_lib::init_tracing();

    if let Err(err) = hinotes_lib::cli::run() {
        eprintln!("hinotes: {err}");
        std::process::exit(1);
    }
}
