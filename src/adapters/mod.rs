//! Adapters implementing the port traits.
//!
//! - `live`: real disk and HTTP.
//! - `recording`: wraps a live client and captures interactions to a cassette.
//! - `replaying`: serves captured interactions back without the network.

pub mod live;
pub mod recording;
pub mod replaying;
