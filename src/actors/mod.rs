mod download_actor;
mod message;
mod normalize_actor;

use crossbeam_channel::{Receiver, Sender};
pub use download_actor::DownloadActor;
pub use message::*;
pub use normalize_actor::NormalizeActor;

use crate::result::Result;

/// A worker consuming `From` messages and producing `To` messages.
///
/// The input channel closing is the end-of-work signal; `run` returns once
/// every received message has been handled.
pub trait Actor<From, To> {
    fn set_receive_channel(&mut self, channel: Receiver<From>);

    fn set_send_channel(&mut self, channel: Sender<To>);

    fn run(self) -> Result<()>;
}
