//! End-to-end pipeline tests over fake collaborators.
//!
//! The fakes never touch a network or a transcoder: clip files carry their
//! duration as text, and the fake transcode service only manipulates that
//! metadata (copy on normalize, sum on concat, min on trim).

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Mutex,
};

use backdrop::{
    outside::{ClipSource, SearchRequest, TranscodeService},
    pipeline::{CancelToken, Pipeline, RenderRequest},
    progress::{NullSink, ProgressSink},
    result::{bail, Error, Result},
    types::{AspectRatio, ClipDescriptor, Resolution},
};

#[derive(Debug, Default)]
struct FakeSource {
    clips: Vec<ClipDescriptor>,
    fail_ids: HashSet<u64>,
}

impl FakeSource {
    fn with_durations(durations: &[f64]) -> Self {
        let clips = durations
            .iter()
            .enumerate()
            .map(|(i, &secs)| descriptor(i as u64 + 1, secs))
            .collect();
        Self {
            clips,
            fail_ids: HashSet::new(),
        }
    }

    fn failing(mut self, ids: &[u64]) -> Self {
        self.fail_ids = ids.iter().copied().collect();
        self
    }
}

impl ClipSource for FakeSource {
    fn fetch_candidates(&self, request: &SearchRequest) -> Result<Vec<ClipDescriptor>> {
        if self.clips.is_empty() {
            return Err(Error::NoResults {
                query: request.query.to_string(),
            });
        }
        Ok(self.clips.clone())
    }

    fn download(&self, clip: &ClipDescriptor, dest: &Path) -> Result<u64> {
        if self.fail_ids.contains(&clip.id) {
            return bail(format!("simulated network failure for clip {}", clip.id));
        }
        write_duration(dest, clip.duration_secs)?;
        Ok(clip.duration_secs.to_string().len() as u64)
    }
}

#[derive(Debug, Default)]
struct FakeTranscoder {
    fail_normalize_ids: HashSet<u64>,
}

impl FakeTranscoder {
    fn failing_normalize(ids: &[u64]) -> Self {
        Self {
            fail_normalize_ids: ids.iter().copied().collect(),
        }
    }
}

impl TranscodeService for FakeTranscoder {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        read_duration(path)
    }

    fn normalize(
        &self,
        input: &Path,
        output: &Path,
        _resolution: Resolution,
        _fps: u32,
    ) -> Result<()> {
        if let Some(id) = clip_id(input) {
            if self.fail_normalize_ids.contains(&id) {
                return bail(format!("simulated transcode failure for clip {id}"));
            }
        }
        let secs = read_duration(input)?;
        write_duration(output, secs)
    }

    fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let mut total = 0.0;
        for input in inputs {
            total += read_duration(input)?;
        }
        write_duration(output, total)
    }

    fn trim(&self, input: &Path, output: &Path, target_secs: f64) -> Result<()> {
        let secs = read_duration(input)?;
        write_duration(output, secs.min(target_secs))
    }
}

fn write_duration(path: &Path, secs: f64) -> Result<()> {
    std::fs::write(path, secs.to_string())?;
    Ok(())
}

fn read_duration(path: &Path) -> Result<f64> {
    let text = std::fs::read_to_string(path)?;
    match text.trim().parse() {
        Ok(secs) => Ok(secs),
        Err(_) => bail(format!("'{text}' is not a duration")),
    }
}

/// Recover the catalog id from a downloaded file named `clip_<index>_<id>`.
fn clip_id(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.rsplit('_').next()?.parse().ok()
}

fn descriptor(id: u64, duration_secs: f64) -> ClipDescriptor {
    ClipDescriptor {
        id,
        url: format!("fake://clip/{id}"),
        duration_secs,
        width: 1920,
        height: 1080,
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<(f64, String)>>);

impl ProgressSink for RecordingSink {
    fn on_progress(&self, fraction: f64, stage: &str) {
        self.0.lock().unwrap().push((fraction, stage.to_string()));
    }
}

struct World {
    out_dir: tempfile::TempDir,
    scratch_root: tempfile::TempDir,
}

impl World {
    fn new() -> Self {
        Self {
            out_dir: tempfile::tempdir().unwrap(),
            scratch_root: tempfile::tempdir().unwrap(),
        }
    }

    fn request(&self, target_secs: f64) -> RenderRequest {
        RenderRequest {
            query: "ocean".into(),
            target_secs,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            aspect: AspectRatio::Horizontal,
            fps: 30,
            out_dir: self.out_dir.path().to_path_buf(),
            scratch_root: self.scratch_root.path().to_path_buf(),
        }
    }

    fn scratch_is_clean(&self) -> bool {
        std::fs::read_dir(self.scratch_root.path())
            .unwrap()
            .next()
            .is_none()
    }
}

#[test]
fn end_to_end_trims_to_target() {
    let world = World::new();
    let source = FakeSource::with_durations(&[8.0, 10.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder).with_workers(2, 2);

    let output = pipeline
        .generate(&world.request(15.0), &NullSink, &CancelToken::new())
        .unwrap();

    assert!(output.starts_with(world.out_dir.path()));
    let final_secs = read_duration(&output).unwrap();
    assert!((final_secs - 15.0).abs() <= 1.0, "got {final_secs}s");
    assert!(world.scratch_is_clean());
}

#[test]
fn short_footage_is_cycled_then_trimmed() {
    let world = World::new();
    let source = FakeSource::with_durations(&[3.0, 4.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder).with_workers(2, 2);

    let output = pipeline
        .generate(&world.request(20.0), &NullSink, &CancelToken::new())
        .unwrap();

    let final_secs = read_duration(&output).unwrap();
    assert!((final_secs - 20.0).abs() <= 1.0, "got {final_secs}s");
}

#[test]
fn single_long_clip_is_used_once() {
    let world = World::new();
    let source = FakeSource::with_durations(&[50.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let output = pipeline
        .generate(&world.request(10.0), &NullSink, &CancelToken::new())
        .unwrap();

    let final_secs = read_duration(&output).unwrap();
    assert!((final_secs - 10.0).abs() <= 1.0, "got {final_secs}s");
}

#[test]
fn exact_footage_skips_the_trim() {
    let world = World::new();
    let source = FakeSource::with_durations(&[15.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let output = pipeline
        .generate(&world.request(15.0), &NullSink, &CancelToken::new())
        .unwrap();

    let final_secs = read_duration(&output).unwrap();
    assert!((final_secs - 15.0).abs() <= 1.0, "got {final_secs}s");
}

#[test]
fn no_results_is_fatal_and_leaves_no_scratch() {
    let world = World::new();
    let source = FakeSource::default();
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let err = pipeline
        .generate(&world.request(15.0), &NullSink, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::NoResults { .. }));
    assert!(world.scratch_is_clean());
}

#[test]
fn failed_downloads_are_tolerated_while_any_clip_survives() {
    let world = World::new();
    let source =
        FakeSource::with_durations(&[10.0, 10.0, 10.0, 10.0, 10.0]).failing(&[2, 4]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder).with_workers(3, 2);

    let output = pipeline
        .generate(&world.request(25.0), &NullSink, &CancelToken::new())
        .unwrap();

    // 3 surviving clips cover 30s, trimmed down to the 25s target
    let final_secs = read_duration(&output).unwrap();
    assert!((final_secs - 25.0).abs() <= 1.0, "got {final_secs}s");
}

#[test]
fn failed_normalizations_are_tolerated_while_any_clip_survives() {
    let world = World::new();
    let source = FakeSource::with_durations(&[10.0, 10.0, 10.0, 10.0]);
    let transcoder = FakeTranscoder::failing_normalize(&[2, 3]);
    let pipeline = Pipeline::new(&source, &transcoder).with_workers(2, 2);

    let output = pipeline
        .generate(&world.request(15.0), &NullSink, &CancelToken::new())
        .unwrap();

    // clips 1 and 4 survive with 20s of footage, trimmed to the 15s target
    let final_secs = read_duration(&output).unwrap();
    assert!((final_secs - 15.0).abs() <= 1.0, "got {final_secs}s");
}

#[test]
fn run_fails_when_every_clip_fails_normalization() {
    let world = World::new();
    let source = FakeSource::with_durations(&[10.0, 10.0]);
    let transcoder = FakeTranscoder::failing_normalize(&[1, 2]);
    let pipeline = Pipeline::new(&source, &transcoder);

    let err = pipeline
        .generate(&world.request(15.0), &NullSink, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::EmptyClipSet));
    assert!(world.scratch_is_clean());
}

#[test]
fn run_fails_only_when_every_clip_is_lost() {
    let world = World::new();
    let source = FakeSource::with_durations(&[10.0, 10.0, 10.0]).failing(&[1, 2, 3]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let err = pipeline
        .generate(&world.request(15.0), &NullSink, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::EmptyClipSet));
    assert!(world.scratch_is_clean());
}

#[test]
fn cancellation_takes_the_cleanup_path() {
    let world = World::new();
    let source = FakeSource::with_durations(&[10.0, 10.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = pipeline
        .generate(&world.request(15.0), &NullSink, &cancel)
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(world.scratch_is_clean());
}

#[test]
fn invalid_duration_is_rejected_before_the_run() {
    let world = World::new();
    let source = FakeSource::with_durations(&[10.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let err = pipeline
        .generate(&world.request(0.0), &NullSink, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn progress_is_monotone_and_reaches_completion() {
    let world = World::new();
    let source = FakeSource::with_durations(&[8.0, 10.0, 6.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder).with_workers(3, 3);
    let sink = RecordingSink::default();

    pipeline
        .generate(&world.request(30.0), &sink, &CancelToken::new())
        .unwrap();

    let events = sink.0.lock().unwrap();
    assert!(!events.is_empty());
    for pair in events.windows(2) {
        assert!(
            pair[0].0 <= pair[1].0,
            "progress regressed: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }
    let (last_fraction, last_stage) = events.last().unwrap();
    assert!((last_fraction - 1.0).abs() < 1e-9);
    assert_eq!(last_stage, "done");
}

#[test]
fn repeated_runs_do_not_overwrite_previous_outputs() {
    let world = World::new();
    let source = FakeSource::with_durations(&[20.0]);
    let transcoder = FakeTranscoder::default();
    let pipeline = Pipeline::new(&source, &transcoder);

    let first = pipeline
        .generate(&world.request(10.0), &NullSink, &CancelToken::new())
        .unwrap();
    let second = pipeline
        .generate(&world.request(10.0), &NullSink, &CancelToken::new())
        .unwrap();

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
}
