use std::path::Path;

use crossbeam_channel::{Receiver, Sender};
use miette::miette;
use tracing::{debug, info, warn};

use crate::{
    outside::TranscodeService,
    pipeline::CancelToken,
    result::Result,
    types::{LocalClip, Resolution},
};

use super::{Actor, FetchedClip, NormalizedClip};

/// Re-encodes downloaded clips to the common resolution and frame rate.
///
/// A clip that fails to normalize (corrupt download, unsupported codec) is
/// excluded the same way as a failed download.
#[derive(Debug)]
pub struct NormalizeActor<'a> {
    id: usize,
    transcoder: &'a dyn TranscodeService,
    scratch_dir: &'a Path,
    resolution: Resolution,
    fps: u32,
    cancel: &'a CancelToken,

    receive_channel: Option<Receiver<FetchedClip>>,
    send_channel: Option<Sender<NormalizedClip>>,
}

impl Actor<FetchedClip, NormalizedClip> for NormalizeActor<'_> {
    fn set_receive_channel(&mut self, channel: Receiver<FetchedClip>) {
        self.receive_channel = Some(channel);
    }

    fn set_send_channel(&mut self, channel: Sender<NormalizedClip>) {
        self.send_channel = Some(channel);
    }

    fn run(mut self) -> Result<()> {
        let receive_channel = self
            .receive_channel
            .take()
            .ok_or_else(|| miette!("Receive channel not set"))?;

        let send_channel = self
            .send_channel
            .take()
            .ok_or_else(|| miette!("Send channel not set"))?;

        debug!("{}: Actor started, waiting for a fetched clip", self.id);

        for FetchedClip { index, clip } in receive_channel {
            if self.cancel.is_cancelled() {
                debug!(
                    "{}: Run cancelled, discarding clip {}",
                    self.id, clip.descriptor.id
                );
                continue;
            }

            let output = self.scratch_dir.join(format!("normalized_{index}.mp4"));

            info!(
                "{}: Normalizing clip {} to {} @ {} fps",
                self.id, clip.descriptor.id, self.resolution, self.fps
            );
            match self.normalize(&clip, &output) {
                Ok(duration_secs) => {
                    debug!(
                        "{}: Clip {} normalized ({duration_secs:.1}s)",
                        self.id, clip.descriptor.id
                    );
                    let clip = LocalClip {
                        descriptor: clip.descriptor,
                        path: output,
                        duration_secs,
                        normalized: true,
                    };
                    if send_channel.send(NormalizedClip { index, clip }).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(
                        "{}: Skipping clip {}, normalization failed: {err}",
                        self.id, clip.descriptor.id
                    );
                }
            }
        }

        debug!("{}: All iterations completed. Stopping the actor.", self.id);
        Ok(())
    }
}

impl<'a> NormalizeActor<'a> {
    pub fn new(
        id: usize,
        transcoder: &'a dyn TranscodeService,
        scratch_dir: &'a Path,
        resolution: Resolution,
        fps: u32,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            id,
            transcoder,
            scratch_dir,
            resolution,
            fps,
            cancel,
            receive_channel: None,
            send_channel: None,
        }
    }

    /// Normalize one clip and return the probed duration of the result.
    ///
    /// The probe is authoritative: re-encoding can shift the duration away
    /// from the value the catalog advertised.
    fn normalize(&self, clip: &LocalClip, output: &Path) -> Result<f64> {
        self.transcoder
            .normalize(&clip.path, output, self.resolution, self.fps)
            .map_err(|err| err.wrap_err_with(|| "Could not normalize clip"))?;

        self.transcoder
            .probe_duration(output)
            .map_err(|err| err.wrap_err_with(|| "Could not probe normalized clip"))
    }
}
