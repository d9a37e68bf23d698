//! Audio transport: playlist playback over a decode/playback primitive.
//!
//! [`Transport`] is the pure state machine; the audio thread owns one and
//! feeds it user commands, load completions and ticker deadlines. The
//! `rodio` adapter in `decode` supplies the primitive.

mod buffer;
mod decode;
mod player;
mod thread;
mod ticker;
mod transport;
mod types;

pub use buffer::{BufferLoader, Generation, LoadRequest, TrackBuffer};
pub use player::{AudioPlayer, PlaylistSender};
pub use transport::{Tick, Transport};
pub use types::*;

#[cfg(test)]
mod tests;
