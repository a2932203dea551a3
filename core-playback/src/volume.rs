//! Volume and mute state.
//!
//! Lives on the controller, not the session, so it survives teardown and
//! rebuild.

/// Stored volume and mute flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeState {
    volume: f32,
    muted: bool,
}

impl VolumeState {
    pub fn new(volume: f32) -> Self {
        Self {
            volume,
            muted: false,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain to apply to a transport: zero while muted.
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Store a new volume. Returns the gain to apply to a live transport, or
    /// `None` while muted.
    pub fn set_volume(&mut self, volume: f32) -> Option<f32> {
        self.volume = volume;
        (!self.muted).then_some(volume)
    }

    /// Flip the mute flag and return the gain to apply.
    pub fn toggle_mute(&mut self) -> f32 {
        self.muted = !self.muted;
        self.gain()
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
