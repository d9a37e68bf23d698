//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the list cursor and the
//! most recent playback snapshot.

mod model;

pub use model::*;
