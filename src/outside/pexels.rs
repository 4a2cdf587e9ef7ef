use std::{collections::HashSet, fmt::Debug, fs::File, path::Path, time::Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    result::{Error, Result},
    types::{AspectRatio, ClipDescriptor, Resolution},
};

const SEARCH_URL: &str = "https://api.pexels.com/videos/search";
const PER_PAGE: usize = 80;
const MAX_SEARCH_PAGES: usize = 5;

/// Extra clips requested on top of the estimate, to tolerate clips that
/// later fail to download or normalize.
const REQUEST_MARGIN: usize = 2;
/// Never request fewer clips than this.
const MIN_REQUEST: usize = 5;

/// Parameters of one candidate search.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub target_secs: f64,
    pub resolution: Resolution,
    pub aspect: AspectRatio,
}

/// Interface for finding and fetching stock-footage clips.
pub trait ClipSource: Sync + Debug {
    /// Search the catalog and return enough candidate descriptors to cover
    /// the target duration, best candidates first.
    fn fetch_candidates(&self, request: &SearchRequest) -> Result<Vec<ClipDescriptor>>;

    /// Stream the clip bytes to `dest`. Return the number of bytes written.
    fn download(&self, clip: &ClipDescriptor, dest: &Path) -> Result<u64>;
}

/// Tunables of the clip-count heuristic and candidate filtering.
#[derive(Debug, Clone)]
pub struct SourceTuning {
    /// Assumed average usable duration of a returned clip. Stock catalogs
    /// vary, so this is configuration, not a constant.
    pub avg_clip_secs: f64,
    /// Candidates outside this native-duration window are discarded.
    pub min_clip_secs: f64,
    pub max_clip_secs: f64,
    /// Upper bound on requested candidates, to bound API cost.
    pub max_clips: usize,
}

/// Client for the [Pexels video API](https://www.pexels.com/api/)
#[derive(Debug)]
pub struct Pexels {
    agent: ureq::Agent,
    api_key: String,
    tuning: SourceTuning,
}

/// Estimate how many candidates to request for a target duration.
///
/// `ceil(target / average)` plus a fixed safety margin, clamped to the
/// configured floor and ceiling. Non-decreasing in `target_secs`.
pub fn optimal_clip_count(target_secs: f64, avg_clip_secs: f64, max_clips: usize) -> usize {
    let estimated = (target_secs / avg_clip_secs).ceil() as usize;
    estimated
        .saturating_add(REQUEST_MARGIN)
        .clamp(MIN_REQUEST, max_clips.max(MIN_REQUEST))
}

impl Pexels {
    pub fn new(api_key: String, tuning: SourceTuning) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(120))
            .build();

        Self {
            agent,
            api_key,
            tuning,
        }
    }

    fn search_page(&self, query: &str, page: usize) -> Result<Vec<Video>> {
        let response = self
            .agent
            .get(SEARCH_URL)
            .set("Authorization", &self.api_key)
            .query("query", query)
            .query("per_page", &PER_PAGE.to_string())
            .query("page", &page.to_string())
            .call()
            .map_err(map_http_err)?;

        let parsed: SearchResponse = response
            .into_json()
            .map_err(|err| Error::from(err).wrap_err_with(|| "Could not parse search response"))?;

        Ok(parsed.videos)
    }

    /// The catalog duration window, relaxed for long targets where the
    /// strict window would not yield enough footage.
    fn duration_window(&self, target_secs: f64) -> (f64, f64) {
        if target_secs > 600.0 {
            (
                (self.tuning.min_clip_secs - 5.0).max(5.0),
                (self.tuning.max_clip_secs + 15.0).min(60.0),
            )
        } else {
            (self.tuning.min_clip_secs, self.tuning.max_clip_secs)
        }
    }
}

impl ClipSource for Pexels {
    fn fetch_candidates(&self, request: &SearchRequest) -> Result<Vec<ClipDescriptor>> {
        let needed = optimal_clip_count(
            request.target_secs,
            self.tuning.avg_clip_secs,
            self.tuning.max_clips,
        );
        info!(
            "Requesting {needed} candidates for a {:.0}s target (assuming ~{:.0}s per clip)",
            request.target_secs, self.tuning.avg_clip_secs
        );

        // Collect extra pages so filtering still leaves enough candidates
        let mut collected = Vec::new();
        for page in 1..=MAX_SEARCH_PAGES {
            if collected.len() >= needed * 2 {
                break;
            }
            let batch = self.search_page(request.query, page)?;
            if batch.is_empty() {
                break;
            }
            debug!("Page {page}: {} results", batch.len());
            collected.extend(batch);
        }

        if collected.is_empty() {
            return Err(Error::NoResults {
                query: request.query.to_string(),
            });
        }

        let (min_secs, max_secs) = self.duration_window(request.target_secs);
        let mut seen = HashSet::new();
        let candidates: Vec<ClipDescriptor> = collected
            .into_iter()
            .filter(|video| seen.insert(video.id))
            .filter(|video| video.duration >= min_secs && video.duration <= max_secs)
            .filter(|video| request.aspect.matches(video.width, video.height))
            .filter_map(|video| {
                let file = best_file(&video.video_files, request.resolution)?;
                Some(ClipDescriptor {
                    id: video.id,
                    url: file.link.clone(),
                    duration_secs: video.duration,
                    width: video.width,
                    height: video.height,
                })
            })
            .take(needed)
            .collect();

        if candidates.is_empty() {
            warn!("Search succeeded but no candidate passed the duration/aspect filters");
            return Err(Error::NoResults {
                query: request.query.to_string(),
            });
        }

        debug!("{} candidates kept after filtering", candidates.len());
        Ok(candidates)
    }

    fn download(&self, clip: &ClipDescriptor, dest: &Path) -> Result<u64> {
        let started = Instant::now();

        let response = self.agent.get(&clip.url).call().map_err(map_http_err)?;
        let mut reader = response.into_reader();
        let mut file = File::create(dest)?;
        let bytes = std::io::copy(&mut reader, &mut file)?;

        let elapsed = started.elapsed().as_secs_f64();
        let mib = bytes as f64 / (1024.0 * 1024.0);
        debug!("Clip {}: {mib:.1} MiB in {elapsed:.1}s", clip.id);

        Ok(bytes)
    }
}

/// Pick the rendition whose frame size is closest to the target resolution.
fn best_file(files: &[VideoFile], target: Resolution) -> Option<&VideoFile> {
    files.iter().min_by_key(|file| {
        match (file.width, file.height) {
            (Some(w), Some(h)) => {
                let dw = (w as i64 - target.width as i64).unsigned_abs();
                let dh = (h as i64 - target.height as i64).unsigned_abs();
                dw + dh
            }
            // Files without dimensions are a last resort
            _ => u64::MAX,
        }
    })
}

fn map_http_err(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response.into_string().unwrap_or_default();
            Error::Api { status, message }
        }
        ureq::Error::Transport(transport) => Error::Miette(miette::Report::msg(transport)),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: u64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}
