use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    cli::Args,
    outside::SourceTuning,
    pipeline::RenderRequest,
    result::{Error, Result},
    types::{AspectRatio, Resolution},
};

/// Run settings, layered from defaults, an optional TOML file, `BACKDROP_*`
/// environment variables and finally the command line.
///
/// Read-only once the pipeline starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pexels API key. Required.
    pub api_key: String,
    pub search_term: String,
    /// Target duration of the final video, in seconds.
    pub duration_secs: f64,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    /// Upper bound on the number of candidate clips requested per run.
    pub max_clips: usize,
    /// Candidate clips outside this native-duration window are skipped.
    pub min_clip_secs: f64,
    pub max_clip_secs: f64,
    /// Assumed average clip duration for the clip-count estimate.
    /// Defaults to the midpoint of the clip-duration window.
    pub avg_clip_secs: Option<f64>,
    pub fps: u32,
    pub out_dir: PathBuf,
    /// Parent directory for per-run scratch space. Defaults to the system
    /// temporary directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            search_term: "nature".to_string(),
            duration_secs: 300.0,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            aspect_ratio: AspectRatio::Horizontal,
            max_clips: 10,
            min_clip_secs: 5.0,
            max_clip_secs: 30.0,
            avg_clip_secs: None,
            fps: 30,
            out_dir: PathBuf::from("."),
            scratch_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the given file (or `backdrop.toml` next to the
    /// working directory when unset) and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file_source = match config_file {
            Some(path) => config::File::from(path),
            None => config::File::with_name("backdrop").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix("BACKDROP").try_parsing(true))
            .build()
            .map_err(|err| Error::InvalidConfig(err.to_string()))?
            .try_deserialize::<Settings>()
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;

        Ok(settings)
    }

    /// Apply command-line overrides on top of the loaded settings.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(query) = &args.query {
            self.search_term = query.clone();
        }
        if let Some(api_key) = &args.api_key {
            self.api_key = api_key.clone();
        }
        if let Some(duration) = args.duration {
            self.duration_secs = duration;
        }
        if let Some(resolution) = args.resolution {
            self.resolution = resolution;
        }
        if let Some(aspect_ratio) = args.aspect_ratio {
            self.aspect_ratio = aspect_ratio;
        }
        if let Some(max_clips) = args.max_clips {
            self.max_clips = max_clips;
        }
        if let Some(fps) = args.fps {
            self.fps = fps;
        }
        if let Some(out) = &args.out {
            self.out_dir = out.clone();
        }
    }

    /// Reject configurations the pipeline must never see.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "api_key is not set (get one at https://www.pexels.com/api/)".into(),
            ));
        }
        if self.search_term.trim().is_empty() {
            return Err(Error::InvalidConfig("search_term is empty".into()));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "duration_secs must be positive, got {}",
                self.duration_secs
            )));
        }
        if self.min_clip_secs <= 0.0 || self.max_clip_secs < self.min_clip_secs {
            return Err(Error::InvalidConfig(format!(
                "invalid clip duration window {}..{}",
                self.min_clip_secs, self.max_clip_secs
            )));
        }
        if let Some(avg) = self.avg_clip_secs {
            if !avg.is_finite() || avg <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "avg_clip_secs must be positive, got {avg}"
                )));
            }
        }
        if self.max_clips == 0 {
            return Err(Error::InvalidConfig("max_clips must be at least 1".into()));
        }
        if self.fps == 0 {
            return Err(Error::InvalidConfig("fps must be positive".into()));
        }
        Ok(())
    }

    pub fn avg_clip_secs(&self) -> f64 {
        self.avg_clip_secs
            .unwrap_or((self.min_clip_secs + self.max_clip_secs) / 2.0)
    }

    pub fn source_tuning(&self) -> SourceTuning {
        SourceTuning {
            avg_clip_secs: self.avg_clip_secs(),
            min_clip_secs: self.min_clip_secs,
            max_clip_secs: self.max_clip_secs,
            max_clips: self.max_clips,
        }
    }

    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            query: self.search_term.clone(),
            target_secs: self.duration_secs,
            resolution: self.resolution,
            aspect: self.aspect_ratio,
            fps: self.fps,
            out_dir: self.out_dir.clone(),
            scratch_root: self
                .scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }
}
