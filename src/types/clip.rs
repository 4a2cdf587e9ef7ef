use std::path::PathBuf;

/// A candidate clip as described by the search API.
///
/// Immutable once produced by the clip source.
#[derive(Debug, Clone)]
pub struct ClipDescriptor {
    pub id: u64,
    pub url: String,
    /// Duration advertised by the catalog, in seconds.
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

/// A clip that has been downloaded into the run's scratch directory.
///
/// Mutated once, when normalization replaces the file and refines the
/// duration with a probed value. Deleted with the scratch directory.
#[derive(Debug)]
pub struct LocalClip {
    pub descriptor: ClipDescriptor,
    pub path: PathBuf,
    /// Best known duration: the catalog value after download, the probed
    /// value after normalization.
    pub duration_secs: f64,
    pub normalized: bool,
}

impl LocalClip {
    pub fn fetched(descriptor: ClipDescriptor, path: PathBuf) -> Self {
        let duration_secs = descriptor.duration_secs;
        Self {
            descriptor,
            path,
            duration_secs,
            normalized: false,
        }
    }
}
