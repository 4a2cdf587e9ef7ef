use crate::types::{ClipDescriptor, LocalClip};

/// A candidate clip queued for download.
///
/// `index` is the position in the search results, kept through the pool
/// stages so the received order can be restored after concurrent work.
#[derive(Debug)]
pub struct CandidateClip {
    pub index: usize,
    pub descriptor: ClipDescriptor,
}

/// A clip whose bytes landed in scratch storage.
#[derive(Debug)]
pub struct FetchedClip {
    pub index: usize,
    pub clip: LocalClip,
}

/// A clip re-encoded to the common format.
#[derive(Debug)]
pub struct NormalizedClip {
    pub index: usize,
    pub clip: LocalClip,
}
