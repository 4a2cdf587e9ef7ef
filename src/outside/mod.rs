mod command;
mod ffmpeg;
mod pexels;

pub use ffmpeg::{Ffmpeg, TranscodeService};
pub use pexels::{optimal_clip_count, ClipSource, Pexels, SearchRequest, SourceTuning};
