use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info};

use crate::{
    result::{Error, Result},
    types::LocalClip,
};

/// An ordered playback sequence of normalized clips.
///
/// Entries are shared references: repeating a clip never re-downloads or
/// re-normalizes it. The summed duration is always at least the target the
/// sequence was planned for.
#[derive(Debug)]
pub struct PlaybackSequence {
    entries: Vec<Arc<LocalClip>>,
}

impl PlaybackSequence {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.entries.iter().map(|clip| clip.duration_secs).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LocalClip>> {
        self.entries.iter()
    }

    /// File paths in playback order, repeated entries included.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|clip| clip.path.clone()).collect()
    }
}

/// Decide how the normalized clips cover the target duration.
///
/// If the footage already reaches the target, the clips are used once, in
/// received order. Otherwise the whole sequence is repeated as whole cycles,
/// in the original relative order, until the total reaches the target. The
/// last cycle may overshoot on purpose: exact length is enforced by the
/// trimmer, never here.
pub fn plan(clips: &[Arc<LocalClip>], target_secs: f64) -> Result<PlaybackSequence> {
    if clips.is_empty() {
        return Err(Error::EmptyClipSet);
    }

    let available: f64 = clips.iter().map(|clip| clip.duration_secs).sum();
    if available <= f64::EPSILON {
        // Zero-length footage cannot cover anything
        return Err(Error::EmptyClipSet);
    }

    let cycles = if available >= target_secs {
        1
    } else {
        // Whole cycles, with one spare to absorb transcode rounding
        (target_secs / available) as usize + 2
    };

    let mut entries = Vec::with_capacity(clips.len() * cycles);
    for _ in 0..cycles {
        entries.extend(clips.iter().cloned());
    }

    let sequence = PlaybackSequence { entries };
    debug_assert!(sequence.total_duration_secs() >= target_secs);

    if cycles > 1 {
        info!(
            "Footage covers {available:.1}s of the {target_secs:.1}s target, \
            cycling {} clips {cycles} times ({:.1}s planned)",
            clips.len(),
            sequence.total_duration_secs()
        );
    } else {
        debug!(
            "Footage covers the target without repetition ({available:.1}s >= {target_secs:.1}s)"
        );
    }

    Ok(sequence)
}
