use clap::ValueEnum;
use serde::Deserialize;

/// Orientation requested for the assembled video.
///
/// Candidate clips whose native frame does not match the orientation are
/// filtered out before download, so the normalizer never has to rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    Horizontal,
    Vertical,
    Square,
}

impl AspectRatio {
    /// Check whether a native frame size fits this orientation.
    pub fn matches(self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let ratio = width as f64 / height as f64;

        match self {
            AspectRatio::Horizontal => ratio >= 1.5,
            AspectRatio::Vertical => ratio <= 0.75,
            AspectRatio::Square => (0.8..=1.2).contains(&ratio),
        }
    }
}
