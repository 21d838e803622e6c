use clap::Parser;
use facedb_cli::name_to_portraits::{self, NameToPortraitsArgs};
use std::path::PathBuf;

/// Look up portrait image paths for a person name.
///
/// Always succeeds; an unknown name yields an empty JSON array.
#[derive(Parser)]
#[command(name = "name-to-portraits", version)]
struct Cli {
    /// Path to the face database directory.
    data_path: PathBuf,
    /// Name of the person to look up.
    name: String,
    /// Path to the JSON file of portrait paths.
    info_path: PathBuf,
}

fn main() {
    facedb_cli::init_tracing();
    let cli = Cli::parse();

    name_to_portraits::run(&NameToPortraitsArgs {
        data_path: cli.data_path,
        name: cli.name,
        info_path: cli.info_path,
    });
}
