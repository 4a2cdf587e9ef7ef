use std::path::PathBuf;

use clap::Parser;

use crate::types::{AspectRatio, Resolution};

macro_rules! arg_env {
    ($v:literal) => {
        concat!("BACKDROP_", $v)
    };
}

/// Assemble a looping background video from stock footage.
/// Search, download, normalize and stitch clips to an exact duration.
///
/// Unset options fall back to `backdrop.toml` and `BACKDROP_*` environment
/// variables, then to built-in defaults.
#[derive(Parser, Debug)]
pub struct Args {
    /// The search term to find stock footage for
    pub query: Option<String>,

    /// The path to an alternate configuration file
    #[clap(long, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// Pexels API key
    #[clap(long, env = arg_env!("API_KEY"), hide_env_values = true)]
    pub api_key: Option<String>,

    /// Target duration of the final video, in seconds
    #[clap(long, env = arg_env!("DURATION_SECS"))]
    pub duration: Option<f64>,

    /// Output frame size, e.g. 1920x1080
    #[clap(long, env = arg_env!("RESOLUTION"))]
    pub resolution: Option<Resolution>,

    /// Orientation of the candidate clips to keep
    #[clap(long, value_enum, env = arg_env!("ASPECT_RATIO"))]
    pub aspect_ratio: Option<AspectRatio>,

    /// Maximum number of candidate clips to request
    #[clap(long, env = arg_env!("MAX_CLIPS"))]
    pub max_clips: Option<usize>,

    /// Output frame rate
    #[clap(long, env = arg_env!("FPS"))]
    pub fps: Option<u32>,

    /// The path to the output directory
    #[clap(long, env = arg_env!("OUT"))]
    pub out: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
