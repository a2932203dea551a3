//! Workspace facade crate.
//!
//! Host applications depend on `relay-player` and get the playback engine,
//! the event bus, and the bridge contracts they must implement without wiring
//! each workspace crate individually.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

pub use core_playback::{
    PlayStatus, PlaybackError, PlayerConfig, PlayerHandle, PlayerService, StreamPlayer,
};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{EventBus, EventKind, Listener, PlayerEvent};
