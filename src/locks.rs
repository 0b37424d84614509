//! Input-lock & pause gates (module I): named soft locks and a global pause
//! flag that short-circuit button/focus handling for a frame.
//!
//! Grounded in `input_function_data.hpp`'s `activeInputLocks` map and
//! `button_press_update`'s `if (state.activeInputLocks["frame"]) return;`
//! guard.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::settings::InputSettings;

/// Named soft locks plus the global pause/lock flags consulted by the
/// legacy focus resolver and the raw gamepad button dispatcher.
#[derive(Resource, Debug, Default)]
pub struct LockState {
    locks: HashMap<String, bool>,
    pub input_locked: bool,
    pub paused: bool,
    frame_lock_timer: f32,
}

impl LockState {
    /// True if the named lock is currently engaged.
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks.get(name).copied().unwrap_or(false)
    }

    /// Engage a named lock.
    pub fn set_lock(&mut self, name: &str, locked: bool) {
        self.locks.insert(name.to_string(), locked);
    }

    /// Engage the `"frame"` lock for [`InputSettings::overlay_menu_frame_lock_duration`]
    /// seconds, after which [`tick_frame_lock`] clears it automatically.
    pub fn engage_frame_lock(&mut self, duration: f32) {
        self.locks.insert("frame".to_string(), true);
        self.frame_lock_timer = duration;
    }

    /// Whether button-press handling should be skipped this frame, per
    /// §4.9: a `"frame"` lock, or being locked while not paused.
    pub fn should_gate_buttons(&self) -> bool {
        self.is_locked("frame") || (self.input_locked && !self.paused)
    }
}

/// `PreUpdate` system: counts down the one-shot `"frame"` lock timer and
/// clears it once elapsed, mirroring the source's "reset frame lock next
/// frame" deferred callback.
pub fn tick_frame_lock(mut locks: ResMut<LockState>, time: Res<Time>, settings: Res<InputSettings>) {
    let _ = settings;
    if locks.frame_lock_timer > 0.0 {
        locks.frame_lock_timer -= time.delta_secs();
        if locks.frame_lock_timer <= 0.0 {
            locks.set_lock("frame", false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lock_gates_buttons_until_duration_elapses() {
        let mut locks = LockState::default();
        locks.engage_frame_lock(0.1);
        assert!(locks.should_gate_buttons());
    }

    #[test]
    fn should_gate_buttons_releases_once_paused() {
        let mut locks = LockState::default();
        locks.input_locked = true;
        locks.paused = false;
        assert!(locks.should_gate_buttons());
        locks.paused = true;
        assert!(!locks.should_gate_buttons(), "pausing should release the input-locked-while-unpaused gate");
    }
}
