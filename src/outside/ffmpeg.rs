use std::{
    ffi::OsStr,
    fmt::Debug,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use miette::miette;

use crate::{
    result::{bail, Result},
    types::Resolution,
};

use super::command::{assert_success_command, run_command, Capture, FFMPEG, FFPROBE, FFXXX_DEFAULT_ARGS};

/// Narrow capability interface over the external transcode tool.
///
/// All operations are synchronous, file-in/file-out black boxes that fail
/// with a non-zero exit status. Tests substitute a fake implementation that
/// only manipulates duration metadata.
pub trait TranscodeService: Sync + Debug {
    /// Measure the duration of a media file, in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Re-encode a clip to a common frame size and frame rate so that
    /// concatenation produces a single consistent stream.
    fn normalize(&self, input: &Path, output: &Path, resolution: Resolution, fps: u32)
        -> Result<()>;

    /// Join the inputs into one continuous stream, preserving order exactly,
    /// including repeated entries.
    fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Cut the input down to `[0, target_secs]` without altering its start.
    fn trim(&self, input: &Path, output: &Path, target_secs: f64) -> Result<()>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) and `ffprobe` programs
#[derive(Debug)]
pub struct Ffmpeg;

impl Ffmpeg {
    /// Verify that the `ffmpeg` and `ffprobe` binaries are reachable
    pub fn new() -> Result<Self> {
        assert_success_command(FFMPEG, |cmd| cmd.arg("-version"))
            .map_err(|err| err.wrap_err_with(|| "ffmpeg not found"))?;
        assert_success_command(FFPROBE, |cmd| cmd.arg("-version"))
            .map_err(|err| err.wrap_err_with(|| "ffprobe not found"))?;

        Ok(Self)
    }

    /// Write the concat demuxer list file that describes the input order.
    fn write_concat_list(inputs: &[PathBuf], list_path: &Path) -> Result<()> {
        let mut file = File::create(list_path)?;
        for input in inputs {
            writeln!(file, "file '{}'", input.display())?;
        }
        Ok(())
    }
}

impl TranscodeService for Ffmpeg {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let res = run_command(
            FFPROBE,
            |cmd| {
                cmd.args(["-v", "quiet"])
                    .args(["-print_format", "json"])
                    .arg("-show_format")
                    .arg("--")
                    .arg(path)
            },
            Capture::STDOUT,
        )?;
        if !res.status.success() {
            return bail("ffprobe did run but was not successful");
        }

        let stdout = String::from_utf8_lossy(&res.stdout);
        let json = serde_json::from_str::<serde_json::Value>(&stdout)
            .map_err(|err| miette!("Could not parse ffprobe JSON output: {err}"))?;

        let duration = json
            .get("format")
            .and_then(|format| format.get("duration"))
            .and_then(|duration| duration.as_str())
            .ok_or_else(|| miette!("Key 'format.duration' not found in ffprobe output"))?;

        Ok(duration
            .parse::<f64>()
            .map_err(|_| miette!("ffprobe duration '{duration}' is not a number"))?)
    }

    fn normalize(
        &self,
        input: &Path,
        output: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> Result<()> {
        let Resolution { width, height } = resolution;

        // Scale down to fit, then pad to the exact frame so mixed-size
        // sources all come out identical and concat-compatible
        let filter = format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
            pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
        );

        assert_success_command(FFMPEG, |cmd| {
            cmd.args(FFXXX_DEFAULT_ARGS)
                .arg("-y")
                .args([OsStr::new("-i"), input.as_os_str()])
                .args(["-vf", &filter])
                .args(["-r", &fps.to_string()])
                .args(["-c:v", "libx264"])
                .args(["-preset", "medium"])
                .args(["-crf", "23"])
                .args(["-c:a", "aac"])
                .args(["-b:a", "128k"])
                .arg("--")
                .arg(output)
        })
    }

    fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return bail("No input to concatenate");
        }

        let list_path = output.with_extension("list.txt");
        Self::write_concat_list(inputs, &list_path)?;

        // Streams are already normalized, so the demuxer can copy them as-is
        assert_success_command(FFMPEG, |cmd| {
            cmd.args(FFXXX_DEFAULT_ARGS)
                .arg("-y")
                .args(["-f", "concat"])
                .args(["-safe", "0"])
                .args([OsStr::new("-i"), list_path.as_os_str()])
                .args(["-c", "copy"])
                .arg("--")
                .arg(output)
        })
    }

    fn trim(&self, input: &Path, output: &Path, target_secs: f64) -> Result<()> {
        assert_success_command(FFMPEG, |cmd| {
            cmd.args(FFXXX_DEFAULT_ARGS)
                .arg("-y")
                .args([OsStr::new("-i"), input.as_os_str()])
                .args(["-t", &format!("{target_secs:.3}")])
                .args(["-c", "copy"])
                .arg("--")
                .arg(output)
        })
    }
}
