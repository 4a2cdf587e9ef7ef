use std::path::Path;

use crossbeam_channel::{Receiver, Sender};
use miette::miette;
use tracing::{debug, info, warn};

use crate::{
    outside::ClipSource,
    pipeline::CancelToken,
    result::Result,
    types::LocalClip,
};

use super::{Actor, CandidateClip, FetchedClip};

/// Fetches candidate clips into the scratch directory.
///
/// A failed download is not fatal to the run: the clip is logged and
/// excluded, and the actor moves on to the next candidate.
#[derive(Debug)]
pub struct DownloadActor<'a> {
    id: usize,
    source: &'a dyn ClipSource,
    scratch_dir: &'a Path,
    cancel: &'a CancelToken,

    receive_channel: Option<Receiver<CandidateClip>>,
    send_channel: Option<Sender<FetchedClip>>,
}

impl Actor<CandidateClip, FetchedClip> for DownloadActor<'_> {
    fn set_receive_channel(&mut self, channel: Receiver<CandidateClip>) {
        self.receive_channel = Some(channel);
    }

    fn set_send_channel(&mut self, channel: Sender<FetchedClip>) {
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

        debug!("{}: Actor started, waiting for a candidate", self.id);

        for CandidateClip { index, descriptor } in receive_channel {
            if self.cancel.is_cancelled() {
                debug!("{}: Run cancelled, discarding clip {}", self.id, descriptor.id);
                continue;
            }

            let dest = self
                .scratch_dir
                .join(format!("clip_{index}_{}.mp4", descriptor.id));

            info!("{}: Downloading clip {}", self.id, descriptor.id);
            match self.source.download(&descriptor, &dest) {
                Ok(bytes) => {
                    debug!(
                        "{}: Clip {} fetched ({bytes} bytes, {:.0}s of footage)",
                        self.id, descriptor.id, descriptor.duration_secs
                    );
                    let clip = LocalClip::fetched(descriptor, dest);
                    if send_channel.send(FetchedClip { index, clip }).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(
                        "{}: Skipping clip {}, download failed: {err}",
                        self.id, descriptor.id
                    );
                }
            }
        }

        debug!("{}: All iterations completed. Stopping the actor.", self.id);
        Ok(())
    }
}

impl<'a> DownloadActor<'a> {
    pub fn new(
        id: usize,
        source: &'a dyn ClipSource,
        scratch_dir: &'a Path,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            id,
            source,
            scratch_dir,
            cancel,
            receive_channel: None,
            send_channel: None,
        }
    }
}
