use anyhow::{bail, Context, Result};
use clap::Parser;
use facedb_cli::config::Config;
use facedb_cli::face_collection::{self, FaceCollectionArgs};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Collect face and portrait samples from a capture device.
#[derive(Parser)]
#[command(name = "face-collection", version)]
struct Cli {
    /// Path to the pretrained detector definition for face detection.
    cascade: String,
    /// Path to the face database directory.
    data_path: PathBuf,
    /// Webcam device id to grab frames from (/dev/video<id>).
    device_id: u32,
    /// Person name for this session; prompted for when omitted.
    #[arg(long)]
    name: Option<String>,
}

fn main() -> ExitCode {
    facedb_cli::init_tracing();
    let cli = Cli::parse();

    let name = match cli.name.map(Ok).unwrap_or_else(prompt_name) {
        Ok(name) => name,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let args = FaceCollectionArgs {
        cascade: cli.cascade,
        data_path: cli.data_path,
        device_id: cli.device_id,
        name,
    };

    match face_collection::run(&args, &Config::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Interactive fallback matching the historical behavior: ask on stdin.
fn prompt_name() -> Result<String> {
    eprintln!("Please type the name of the current user (no spaces).");
    eprint!("NAME: ");
    std::io::stderr().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("cannot read the name from stdin")?;
    let name = line.trim().to_string();
    if name.is_empty() {
        bail!("no name given");
    }
    Ok(name)
}
