//! Session orchestrators for the facedb command-line tools.
//!
//! Each tool is a thin binary over one orchestrator module; all state is
//! passed in through explicit argument structs plus the ambient
//! [`config::Config`] read from `FACEDB_*` environment variables.

pub mod config;
pub mod face_collection;
pub mod name_to_portraits;
pub mod output;
pub mod recognize_image;

/// Route log output to stderr with `RUST_LOG` filtering. Called once at
/// the top of every binary; stdout stays clean for tool output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
