//! Adapters implementing the `Transport` port.

pub mod live;
pub mod normalizing;
pub mod recording;
pub mod replaying;
pub mod scripted;
