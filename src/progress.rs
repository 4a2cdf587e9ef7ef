use std::sync::Mutex;

use crossbeam_channel::Sender;
use tracing::info;

/// Observer of pipeline advancement.
///
/// Implementations must not block the pipeline: publish, buffer or drop,
/// but never wait.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, fraction: f64, stage: &str);
}

/// Sink that ignores everything.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _fraction: f64, _stage: &str) {}
}

/// Sink that logs stage advancement, the default for the CLI.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, fraction: f64, stage: &str) {
        info!("[{:>3.0}%] {stage}", fraction * 100.0);
    }
}

/// A progress update, for consumers living on the other side of a channel.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub stage: String,
}

/// Sink publishing events over a crossbeam channel, fire-and-forget.
///
/// A full or disconnected channel drops the event instead of blocking.
pub struct ChannelSink {
    sender: Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, fraction: f64, stage: &str) {
        let _ = self.sender.try_send(ProgressEvent {
            fraction,
            stage: stage.to_string(),
        });
    }
}

/// Clamps reported fractions into `[0, 1]` and keeps them monotonically
/// non-decreasing, whatever order the stages report in.
pub struct Reporter<'a> {
    sink: &'a dyn ProgressSink,
    last: Mutex<f64>,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: Mutex::new(0.0),
        }
    }

    pub fn report(&self, fraction: f64, stage: &str) {
        let fraction = {
            let mut last = self.last.lock().unwrap();
            let clamped = fraction.clamp(0.0, 1.0).max(*last);
            *last = clamped;
            clamped
        };
        self.sink.on_progress(fraction, stage);
    }
}
