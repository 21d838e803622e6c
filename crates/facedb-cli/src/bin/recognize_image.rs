use clap::Parser;
use facedb_cli::config::Config;
use facedb_cli::recognize_image::{self, RecognizeImageArgs};
use std::path::PathBuf;
use std::process::ExitCode;

/// Recognize faces in an image against the face database.
#[derive(Parser)]
#[command(name = "recognize-image", version)]
struct Cli {
    /// Path to the pretrained detector definition for face detection.
    cascade: String,
    /// Path to the face database.
    data_path: PathBuf,
    /// Input image to process.
    in_image: PathBuf,
    /// Output file for the recognition information (JSON).
    out_info: PathBuf,
    /// Optional output image with the recognition results drawn in.
    out_image: Option<PathBuf>,
}

fn main() -> ExitCode {
    facedb_cli::init_tracing();
    let cli = Cli::parse();

    let args = RecognizeImageArgs {
        cascade: cli.cascade,
        data_path: cli.data_path,
        input_image: cli.in_image,
        output_info: cli.out_info,
        output_image: cli.out_image,
    };

    match recognize_image::run(&args, &Config::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
