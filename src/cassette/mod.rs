//! Cassettes: YAML files of recorded completion interactions.
//!
//! A cassette captured with `AIAPP_RECORD` can be served back with
//! `AIAPP_REPLAY`, which makes prompt runs reproducible offline.

pub mod format;
pub mod recorder;
pub mod replayer;

pub use format::{Cassette, Interaction};
pub use recorder::CassetteRecorder;
pub use replayer::CassetteReplayer;
