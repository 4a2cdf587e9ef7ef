use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crossbeam_channel::unbounded;
use time::{format_description, OffsetDateTime};
use tracing::{debug, info};

use crate::{
    actors::{Actor, CandidateClip, DownloadActor, FetchedClip, NormalizeActor, NormalizedClip},
    io,
    outside::{ClipSource, SearchRequest, TranscodeService},
    planner::{self, PlaybackSequence},
    progress::{ProgressSink, Reporter},
    result::{Error, Result},
    types::{AspectRatio, LocalClip, Resolution},
};

/// Fixed pool size for concurrent downloads.
const DOWNLOAD_WORKERS: usize = 4;

// Progress windows of the successive stages
const SEARCH_END: f64 = 0.05;
const DOWNLOAD_END: f64 = 0.50;
const NORMALIZE_END: f64 = 0.75;
const CONCAT_END: f64 = 0.90;

/// Cooperative cancellation flag shared with the worker pools.
///
/// Cancelling stops new per-clip work from being picked up; the run then
/// fails with [`Error::Cancelled`] and takes the normal cleanup path.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one generation run needs to know.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub query: String,
    pub target_secs: f64,
    pub resolution: Resolution,
    pub aspect: AspectRatio,
    pub fps: u32,
    /// Where the final video lands.
    pub out_dir: PathBuf,
    /// Parent of the per-run scratch directory.
    pub scratch_root: PathBuf,
}

impl RenderRequest {
    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidConfig("search query is empty".into()));
        }
        if !self.target_secs.is_finite() || self.target_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "target duration must be positive, got {}",
                self.target_secs
            )));
        }
        if self.fps == 0 {
            return Err(Error::InvalidConfig("fps must be positive".into()));
        }
        Ok(())
    }
}

/// Sequences search, download, normalization, planning, concatenation and
/// trimming for one run at a time.
///
/// Scratch files live in a per-run temporary directory that is removed on
/// every exit path, success, fatal error or cancellation alike.
#[derive(Debug)]
pub struct Pipeline<'a> {
    source: &'a dyn ClipSource,
    transcoder: &'a dyn TranscodeService,
    download_workers: usize,
    normalize_workers: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn ClipSource, transcoder: &'a dyn TranscodeService) -> Self {
        let normalize_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);

        Self {
            source,
            transcoder,
            download_workers: DOWNLOAD_WORKERS,
            normalize_workers,
        }
    }

    pub fn with_workers(mut self, download: usize, normalize: usize) -> Self {
        self.download_workers = download.max(1);
        self.normalize_workers = normalize.max(1);
        self
    }

    /// Run the whole pipeline and return the final video path.
    pub fn generate(
        &self,
        request: &RenderRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        request.validate()?;
        let progress = Reporter::new(sink);

        std::fs::create_dir_all(&request.scratch_root)?;
        let scratch = tempfile::Builder::new()
            .prefix("backdrop-")
            .tempdir_in(&request.scratch_root)?;
        debug!("Scratch directory: {}", scratch.path().display());

        progress.report(0.0, "search");
        let candidates = self.source.fetch_candidates(&SearchRequest {
            query: &request.query,
            target_secs: request.target_secs,
            resolution: request.resolution,
            aspect: request.aspect,
        })?;
        info!("{} candidate clips found", candidates.len());
        progress.report(SEARCH_END, "search");
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let fetched =
            self.download_stage(candidates, scratch.path(), &progress, cancel)?;
        progress.report(DOWNLOAD_END, "download");

        let normalized =
            self.normalize_stage(fetched, request, scratch.path(), &progress, cancel)?;
        progress.report(NORMALIZE_END, "normalize");

        let sequence = planner::plan(&normalized, request.target_secs)?;
        let joined = self.concatenate(&sequence, scratch.path())?;
        progress.report(CONCAT_END, "concatenate");
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let trimmed = self.trim_stage(&joined, request.target_secs, scratch.path())?;

        std::fs::create_dir_all(&request.out_dir)?;
        let output = io::find_unused_path(&request.out_dir, &output_stem(&request.query), "mp4")?;
        io::move_file(&trimmed, &output)?;
        progress.report(1.0, "done");

        info!("Final video written to {}", output.display());
        Ok(output)
        // `scratch` dropped here: every intermediate file is deleted
    }

    fn download_stage(
        &self,
        candidates: Vec<crate::types::ClipDescriptor>,
        scratch: &Path,
        progress: &Reporter,
        cancel: &CancelToken,
    ) -> Result<Vec<FetchedClip>> {
        let total = candidates.len();
        let workers = self.download_workers.min(total).max(1);

        let actors = (0..workers)
            .map(|id| DownloadActor::new(id, self.source, scratch, cancel))
            .collect();
        let inputs = candidates
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| CandidateClip { index, descriptor })
            .collect();

        let mut done = 0usize;
        let mut fetched = run_pool(actors, inputs, |_: &FetchedClip| {
            done += 1;
            let fraction = SEARCH_END + (DOWNLOAD_END - SEARCH_END) * done as f64 / total as f64;
            progress.report(fraction, "download");
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if fetched.is_empty() {
            return Err(Error::EmptyClipSet);
        }

        // Restore the search-result order the pool scrambled
        fetched.sort_by_key(|fetched| fetched.index);
        info!("Downloaded {}/{} clips", fetched.len(), total);
        Ok(fetched)
    }

    fn normalize_stage(
        &self,
        fetched: Vec<FetchedClip>,
        request: &RenderRequest,
        scratch: &Path,
        progress: &Reporter,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<LocalClip>>> {
        let total = fetched.len();
        let workers = self.normalize_workers.min(total).max(1);

        let actors = (0..workers)
            .map(|id| {
                NormalizeActor::new(
                    id,
                    self.transcoder,
                    scratch,
                    request.resolution,
                    request.fps,
                    cancel,
                )
            })
            .collect();

        let mut done = 0usize;
        let mut normalized = run_pool(actors, fetched, |_: &NormalizedClip| {
            done += 1;
            let fraction =
                DOWNLOAD_END + (NORMALIZE_END - DOWNLOAD_END) * done as f64 / total as f64;
            progress.report(fraction, "normalize");
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if normalized.is_empty() {
            return Err(Error::EmptyClipSet);
        }

        normalized.sort_by_key(|normalized| normalized.index);
        info!("Normalized {}/{} clips", normalized.len(), total);
        Ok(normalized
            .into_iter()
            .map(|normalized| Arc::new(normalized.clip))
            .collect())
    }

    fn concatenate(&self, sequence: &PlaybackSequence, scratch: &Path) -> Result<PathBuf> {
        info!(
            "Concatenating {} entries ({:.1}s planned)",
            sequence.len(),
            sequence.total_duration_secs()
        );

        // The tool writes to a partial name, renamed only on success, so a
        // failed run never leaves a file claiming to be the joined stream
        let partial = scratch.join("concat_partial.mp4");
        let joined = scratch.join("concat.mp4");

        self.transcoder
            .concat(&sequence.paths(), &partial)
            .map_err(|err| Error::Concatenation(err.into()))?;
        std::fs::rename(&partial, &joined)
            .map_err(|err| Error::Concatenation(miette::Report::msg(err)))?;

        Ok(joined)
    }

    fn trim_stage(&self, input: &Path, target_secs: f64, scratch: &Path) -> Result<PathBuf> {
        let input_duration = self
            .transcoder
            .probe_duration(input)
            .map_err(|err| Error::Trim(err.into()))?;

        // Planning overshoots, but transcode rounding can still land short
        if input_duration <= target_secs {
            debug!(
                "Joined file already within target ({input_duration:.1}s <= {target_secs:.1}s), \
                skipping trim"
            );
            return Ok(input.to_path_buf());
        }

        info!("Trimming {input_duration:.1}s down to {target_secs:.1}s");
        let output = scratch.join("final.mp4");
        self.transcoder
            .trim(input, &output, target_secs)
            .map_err(|err| Error::Trim(err.into()))?;

        Ok(output)
    }
}

/// Run a pool of identical actors over a batch of inputs and collect every
/// output, calling `on_item` as each one lands.
fn run_pool<In, Out, A>(actors: Vec<A>, inputs: Vec<In>, mut on_item: impl FnMut(&Out)) -> Vec<Out>
where
    A: Actor<In, Out> + Send,
    In: Send,
    Out: Send,
{
    std::thread::scope(|scope| {
        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();

        for mut actor in actors {
            actor.set_receive_channel(in_rx.clone());
            actor.set_send_channel(out_tx.clone());
            scope.spawn(move || actor.run().unwrap());
        }
        drop(in_rx);
        drop(out_tx);

        for input in inputs {
            if in_tx.send(input).is_err() {
                break;
            }
        }
        // Closing the input channel is the end-of-work signal
        drop(in_tx);

        let mut collected = Vec::new();
        for item in out_rx {
            on_item(&item);
            collected.push(item);
        }
        collected
    })
}

fn output_stem(query: &str) -> String {
    let stamp_format = format_description::parse("[year][month][day]_[hour][minute][second]")
        .expect("static format description");
    let stamp = OffsetDateTime::now_utc()
        .format(&stamp_format)
        .expect("formatting a UTC datetime cannot fail");

    format!("background_{}_{stamp}", query.trim().replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_round_trip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn output_stem_is_filename_safe() {
        let stem = output_stem("deep blue ocean");
        assert!(stem.starts_with("background_deep_blue_ocean_"));
        assert!(!stem.contains(' '));
    }

    #[test]
    fn request_validation_rejects_bad_input() {
        let request = RenderRequest {
            query: "  ".into(),
            target_secs: 15.0,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            aspect: AspectRatio::Horizontal,
            fps: 30,
            out_dir: PathBuf::from("."),
            scratch_root: std::env::temp_dir(),
        };
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidConfig(_))
        ));

        let request = RenderRequest {
            query: "ocean".into(),
            target_secs: 0.0,
            ..request
        };
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
