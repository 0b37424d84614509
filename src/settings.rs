//! Tunable constants, carried as `Resource` data instead of hardcoded
//! literals.
//!
//! The source this crate is modeled on (a raylib/entt game engine) keeps
//! these as `constexpr` globals in a single header. Here they are fields on
//! two resources, [`InputSettings`] and [`NavigationSettings`], inserted
//! with these exact defaults by [`crate::InputNavigationPlugin`] unless the
//! host app overrides them before or after adding the plugin. This mirrors
//! how `InputMapping` is exposed as ordinary `Resource` data rather than a
//! compiled-in keybinding table.

use bevy::input::gamepad::GamepadButton;
use bevy::input::keyboard::KeyCode;
use bevy::prelude::Resource;

/// Tunables for the gamepad/mouse/keyboard raw input layer, HID arbitration,
/// cursor event pipeline and general interaction timing.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct InputSettings {
    /// Movement threshold applied to all gamepad axes before they count as
    /// "moved" for HID-mode-switch purposes.
    pub gamepad_axis_movement_threshold: f32,
    /// Left stick deadzone used when it is driving the cursor directly.
    pub left_stick_deadzone: f32,
    /// Right stick deadzone for cursor movement.
    pub right_stick_deadzone: f32,
    /// Left stick magnitude above which it is interpreted as a directional
    /// button (virtual D-pad) rather than raw cursor movement.
    pub left_stick_dpad_activation_threshold: f32,
    /// Left stick magnitude below which the virtual D-pad button releases.
    pub left_stick_dpad_release_threshold: f32,
    /// Trigger axis value above which it counts as a button press.
    pub trigger_activation_threshold: f32,
    /// Trigger axis value below which it counts as a button release.
    pub trigger_release_threshold: f32,
    /// Minimum mouse movement in pixels to count as movement.
    pub mouse_movement_threshold: f32,
    /// Scroll speed multiplier applied to mouse wheel deltas.
    pub scroll_speed: f32,
    /// Maximum time in seconds between a down and up edge for the gesture to
    /// be considered a click rather than a hold.
    pub default_click_timeout: f32,
    /// How long the `"frame"` soft lock used by overlay menus stays engaged.
    pub overlay_menu_frame_lock_duration: f32,
    /// Delay before a held directional button starts auto-repeating.
    pub button_repeat_initial_delay: f32,
    /// Delay between subsequent directional button repeats.
    pub button_repeat_subsequent_delay: f32,
    /// Coyote-time window for button hold detection.
    pub button_hold_coyote_time: f32,
    /// Hold duration before a slider enters continuous adjustment mode.
    pub slider_hold_activation_time: f32,
    /// Duration a key must be held before triggering hold-reset behavior.
    pub key_hold_reset_duration: f32,
    /// Minimum focus vector magnitude for directional navigation scoring.
    pub focus_vector_threshold: f32,
    /// Vibration intensity applied on focus change.
    pub focus_vibration_intensity: f32,
    /// Vibration intensity applied on action confirmation.
    pub action_vibration_intensity: f32,
    /// Discrete slider step applied on a single press.
    pub slider_discrete_step: f32,
    /// Continuous slider adjustment multiplier, scaled by hold duration.
    pub slider_continuous_multiplier: f32,
    /// Default activation threshold for axis-triggered action bindings.
    pub input_binding_default_threshold: f32,
    /// Minimum squared distance the cursor must move between down and up for
    /// a gesture to be treated as a drag rather than a click.
    pub cursor_minimum_movement_distance: f32,
    /// Minimum hover duration before touch input fires `on_hover`.
    pub touch_input_minimum_hover_time: f32,
    /// Multiplier used to compute the centre of a rectangle (`0.5 * size`).
    pub center_position_multiplier: f32,
    /// If set, directional gamepad buttons never stop auto-repeating no
    /// matter how long they're held (disables the repeat cap).
    pub no_holdcap: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        InputSettings {
            gamepad_axis_movement_threshold: 0.2,
            left_stick_deadzone: 0.1,
            right_stick_deadzone: 0.2,
            left_stick_dpad_activation_threshold: 0.5,
            left_stick_dpad_release_threshold: 0.3,
            trigger_activation_threshold: 0.5,
            trigger_release_threshold: 0.3,
            mouse_movement_threshold: 1.0,
            scroll_speed: 10.0,
            default_click_timeout: 0.05,
            overlay_menu_frame_lock_duration: 0.1,
            button_repeat_initial_delay: 0.3,
            button_repeat_subsequent_delay: 0.1,
            button_hold_coyote_time: 0.12,
            slider_hold_activation_time: 0.2,
            key_hold_reset_duration: 0.7,
            focus_vector_threshold: 0.1,
            focus_vibration_intensity: 0.7,
            action_vibration_intensity: 1.0,
            slider_discrete_step: 0.01,
            slider_continuous_multiplier: 0.6,
            input_binding_default_threshold: 0.5,
            cursor_minimum_movement_distance: 500.0,
            touch_input_minimum_hover_time: 0.1,
            center_position_multiplier: 0.5,
            no_holdcap: false,
        }
    }
}

/// Tunables for [`crate::nav::NavManager`]'s per-group auto-repeat timing.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct NavigationSettings {
    /// Delay before the first repeat of a held direction.
    pub initial_delay: f32,
    /// Base interval between repeats once the initial delay has elapsed.
    pub repeat_rate: f32,
    /// Floor the repeat interval is clamped to as it accelerates.
    pub min_repeat_rate: f32,
    /// Multiplier applied to the repeat interval on every additional repeat;
    /// values below 1.0 shorten the interval (speed the repeat up).
    pub acceleration: f32,
    /// Cone-test threshold for spatial resolution: a candidate whose
    /// normalized offset component along the requested axis exceeds this is
    /// accepted even when it isn't the dominant axis.
    pub spatial_cone_threshold: f32,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        NavigationSettings {
            initial_delay: 0.3,
            repeat_rate: 0.1,
            min_repeat_rate: 0.02,
            acceleration: 0.9,
            spatial_cone_threshold: 0.3,
        }
    }
}

/// Keyboard/gamepad buttons that drive [`crate::nav::NavManager::navigate`]
/// and [`crate::nav::NavManager::select_current`]. Exposed as ordinary
/// `Resource` data rather than hardcoded match arms, so a host app can
/// override them without a new binary.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct NavInputBindings {
    pub key_up: KeyCode,
    pub key_down: KeyCode,
    pub key_left: KeyCode,
    pub key_right: KeyCode,
    pub key_up_alt: KeyCode,
    pub key_down_alt: KeyCode,
    pub key_left_alt: KeyCode,
    pub key_right_alt: KeyCode,
    pub key_select: KeyCode,
    pub gamepad_up: GamepadButton,
    pub gamepad_down: GamepadButton,
    pub gamepad_left: GamepadButton,
    pub gamepad_right: GamepadButton,
    pub gamepad_select: GamepadButton,
}

impl Default for NavInputBindings {
    fn default() -> Self {
        NavInputBindings {
            key_up: KeyCode::ArrowUp,
            key_down: KeyCode::ArrowDown,
            key_left: KeyCode::ArrowLeft,
            key_right: KeyCode::ArrowRight,
            key_up_alt: KeyCode::KeyW,
            key_down_alt: KeyCode::KeyS,
            key_left_alt: KeyCode::KeyA,
            key_right_alt: KeyCode::KeyD,
            key_select: KeyCode::Enter,
            gamepad_up: GamepadButton::DPadUp,
            gamepad_down: GamepadButton::DPadDown,
            gamepad_left: GamepadButton::DPadLeft,
            gamepad_right: GamepadButton::DPadRight,
            gamepad_select: GamepadButton::South,
        }
    }
}

impl From<NavigationSettings> for crate::nav::RepeatConfig {
    fn from(s: NavigationSettings) -> Self {
        crate::nav::RepeatConfig {
            initial_delay: s.initial_delay,
            repeat_rate: s.repeat_rate,
            min_repeat_rate: s.min_repeat_rate,
            acceleration: s.acceleration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_input_settings_match_documented_constants() {
        let s = InputSettings::default();
        assert_eq!(s.left_stick_deadzone, 0.1);
        assert_eq!(s.default_click_timeout, 0.05);
        assert_eq!(s.cursor_minimum_movement_distance, 500.0);
        assert!(!s.no_holdcap);
    }

    #[test]
    fn default_nav_input_bindings_cover_arrows_and_wasd() {
        let b = NavInputBindings::default();
        assert_eq!(b.key_up, KeyCode::ArrowUp);
        assert_eq!(b.key_up_alt, KeyCode::KeyW);
        assert_eq!(b.gamepad_select, GamepadButton::South);
    }

    #[test]
    fn navigation_settings_convert_into_repeat_config() {
        let s = NavigationSettings::default();
        let repeat: crate::nav::RepeatConfig = s.into();
        assert_eq!(repeat.initial_delay, s.initial_delay);
        assert_eq!(repeat.repeat_rate, s.repeat_rate);
        assert_eq!(repeat.min_repeat_rate, s.min_repeat_rate);
        assert_eq!(repeat.acceleration, s.acceleration);
    }
}
