//! Device poll / raw event adapter (module A): reads Bevy's raw input
//! resources and produces the per-frame edge stream consumed by the action
//! binding layer, the HID arbiter, and the raw gamepad button repeat logic.
//!
//! Grounded in `input_polling.hpp`'s `IInputProvider` abstraction — kept
//! here as a `SystemParam` rather than a trait object, since Bevy systems
//! already provide the seam tests need (swap in a headless `App` and feed
//! `ButtonInput`/`Axis` resources directly, no mock object required).

use std::collections::HashMap;

use bevy::input::gamepad::{GamepadAxis, GamepadButton};
use bevy::input::mouse::MouseMotion;
use bevy::input::touch::Touches;
use bevy::prelude::*;
use tracing::debug;

use crate::actions::{ActionBindings, InputDevice};
use crate::events::{GamepadButtonPressed, GamepadButtonReleased};
use crate::hid::{deduce_console_from_gamepad, reconfigure_device_info, HidState, InputCategory};
use crate::locks::LockState;
use crate::settings::InputSettings;

/// Per-direction virtual D-pad button synthesized from analog stick
/// deflection, holding hysteresis state so `process_axis_buttons` can
/// distinguish activation from release per §4.11.
#[derive(Resource, Debug, Default)]
pub struct AxisButtonState {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    left_trigger: bool,
    right_trigger: bool,
}

/// `PreUpdate` system: polls keyboard/mouse edges, dispatches them into the
/// action layer, and re-arbitrates HID mode on activity.
pub fn poll_keyboard_and_mouse(
    keys: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    settings: Res<InputSettings>,
    mut actions: ResMut<ActionBindings>,
    mut hid: ResMut<HidState>,
    cursor_vis: EventWriter<crate::events::CursorVisibilityChanged>,
    sprite_pack: EventWriter<crate::events::SpritePackChanged>,
) {
    let mut category = InputCategory::None;

    for key in keys.get_just_pressed() {
        actions.dispatch_raw(InputDevice::Keyboard, *key as i32, true, 0.0);
        category = InputCategory::KeyBoard;
    }
    for key in keys.get_just_released() {
        actions.dispatch_raw(InputDevice::Keyboard, *key as i32, false, 0.0);
    }
    for button in mouse_buttons.get_just_pressed() {
        actions.dispatch_raw(InputDevice::Mouse, mouse_button_code(*button), true, 0.0);
        category = InputCategory::Mouse;
    }
    for button in mouse_buttons.get_just_released() {
        actions.dispatch_raw(InputDevice::Mouse, mouse_button_code(*button), false, 0.0);
    }

    let moved: f32 = mouse_motion.read().map(|m| m.delta.length()).sum();
    if moved > settings.mouse_movement_threshold {
        category = InputCategory::Mouse;
    }

    reconfigure_device_info(&mut hid, category, None, cursor_vis, sprite_pack);
}

/// `PreUpdate` system: polls active touch points, feeding the HID arbiter
/// and the cursor position source (§2 module A, §4.3). Single-touch only —
/// the first active touch drives the cursor, matching the engine's
/// one-logical-cursor model.
pub fn poll_touch_input(
    touches: Res<Touches>,
    mut hid: ResMut<HidState>,
    mut cursor: ResMut<crate::cursor::CursorState>,
    cursor_vis: EventWriter<crate::events::CursorVisibilityChanged>,
    sprite_pack: EventWriter<crate::events::SpritePackChanged>,
) {
    let mut category = InputCategory::None;

    if let Some(touch) = touches.iter().next() {
        category = InputCategory::Touch;
        cursor.touch_position = Some(touch.position());
    } else {
        cursor.touch_position = None;
    }

    reconfigure_device_info(&mut hid, category, None, cursor_vis, sprite_pack);
}

fn mouse_button_code(button: MouseButton) -> i32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(n) => 100 + n as i32,
    }
}

/// `PreUpdate` system: polls raw gamepad button edges, dispatches them into
/// the action layer and republishes them as [`GamepadButtonPressed`]/
/// [`GamepadButtonReleased`] events, gated by [`LockState::should_gate_buttons`].
pub fn poll_gamepad_buttons(
    gamepads: Query<(Entity, &Gamepad, &Name)>,
    mut actions: ResMut<ActionBindings>,
    mut hid: ResMut<HidState>,
    locks: Res<LockState>,
    mut pressed_events: EventWriter<GamepadButtonPressed>,
    mut released_events: EventWriter<GamepadButtonReleased>,
    cursor_vis: EventWriter<crate::events::CursorVisibilityChanged>,
    sprite_pack: EventWriter<crate::events::SpritePackChanged>,
) {
    let mut category = InputCategory::None;
    let mut active_gamepad_name: Option<String> = None;

    for (id, gamepad, name) in gamepads.iter() {
        for button in gamepad.get_just_pressed() {
            category = InputCategory::GamepadButton;
            active_gamepad_name = Some(name.to_string());
            if locks.should_gate_buttons() {
                debug!(?id, "gamepad button press gated by active input lock");
                continue;
            }
            actions.dispatch_raw(InputDevice::GamepadButton, gamepad_button_code(*button), true, 0.0);
            pressed_events.send(GamepadButtonPressed { id, button: *button });
        }
        for button in gamepad.get_just_released() {
            actions.dispatch_raw(InputDevice::GamepadButton, gamepad_button_code(*button), false, 0.0);
            released_events.send(GamepadButtonReleased { id, button: *button });
        }
    }

    reconfigure_device_info(&mut hid, category, active_gamepad_name.as_deref(), cursor_vis, sprite_pack);
}

fn gamepad_button_code(button: GamepadButton) -> i32 {
    button as i32
}

/// Directional buttons eligible for the raw hold-repeat dispatch of §4.10,
/// independent of whichever `NavManager` group ultimately consumes the
/// resulting `navigate()` call.
const REPEATABLE_DIRECTIONS: [GamepadButton; 4] =
    [GamepadButton::DPadUp, GamepadButton::DPadDown, GamepadButton::DPadLeft, GamepadButton::DPadRight];

#[derive(Debug, Clone, Copy, Default)]
struct ButtonRepeatEntry {
    held_secs: f32,
    next_repeat: f32,
}

/// Per-`(gamepad, button)` hold timers for raw D-pad repeat dispatch (§4.10),
/// separate from `NavManager`'s own per-group repeat state (§4.7.D).
#[derive(Resource, Debug, Default)]
pub struct ButtonRepeatState {
    entries: HashMap<(Entity, GamepadButton), ButtonRepeatEntry>,
}

/// `PreUpdate` system: while a raw directional gamepad button is held, keeps
/// re-dispatching its press edge at `button_repeat_initial_delay` then every
/// `button_repeat_subsequent_delay` seconds, per §4.10. `no_holdcap` skips the
/// timing entirely and re-dispatches every frame the button is held, for
/// callers that want raw hold semantics instead of discrete repeat pulses.
pub fn tick_gamepad_button_repeat(
    gamepads: Query<(Entity, &Gamepad)>,
    settings: Res<InputSettings>,
    time: Res<Time>,
    mut repeat: ResMut<ButtonRepeatState>,
    locks: Res<LockState>,
    mut actions: ResMut<ActionBindings>,
) {
    if locks.should_gate_buttons() {
        return;
    }
    let dt = time.delta_secs();

    for (id, gamepad) in gamepads.iter() {
        for &button in &REPEATABLE_DIRECTIONS {
            let key = (id, button);
            if !gamepad.pressed(button) {
                repeat.entries.remove(&key);
                continue;
            }

            let entry = repeat.entries.entry(key).or_default();
            if tick_repeat_entry(entry, &settings, dt) {
                actions.dispatch_raw(InputDevice::GamepadButton, gamepad_button_code(button), true, 0.0);
            }
        }
    }
}

/// Advances a single button's hold timer by `dt` and reports whether a
/// repeat pulse should dispatch this tick (§4.10). Split out from
/// [`tick_gamepad_button_repeat`] so the timing rules are testable without a
/// live `Gamepad` component.
fn tick_repeat_entry(entry: &mut ButtonRepeatEntry, settings: &InputSettings, dt: f32) -> bool {
    entry.held_secs += dt;

    if settings.no_holdcap {
        return true;
    }

    if entry.held_secs < settings.button_repeat_initial_delay {
        return false;
    }
    entry.next_repeat -= dt;
    if entry.next_repeat <= 0.0 {
        entry.next_repeat = settings.button_repeat_subsequent_delay;
        true
    } else {
        false
    }
}

/// `PreUpdate` system: interprets the left stick as either a cursor-drag
/// axis or a virtual D-pad, and the right stick as a direct cursor axis,
/// resolving Open Question 2 per §4.11.
pub fn poll_gamepad_axes(
    gamepads: Query<(Entity, &Gamepad)>,
    settings: Res<InputSettings>,
    mut axis_state: ResMut<AxisButtonState>,
    mut actions: ResMut<ActionBindings>,
    cursor: Res<crate::cursor::CursorState>,
    mut hid: ResMut<HidState>,
    cursor_vis: EventWriter<crate::events::CursorVisibilityChanged>,
    sprite_pack: EventWriter<crate::events::SpritePackChanged>,
) {
    let mut category = InputCategory::None;

    for (_id, gamepad) in gamepads.iter() {
        let lx = gamepad.get(GamepadAxis::LeftStickX).unwrap_or(0.0);
        let ly = gamepad.get(GamepadAxis::LeftStickY).unwrap_or(0.0);
        let rx = gamepad.get(GamepadAxis::RightStickX).unwrap_or(0.0);
        let ry = gamepad.get(GamepadAxis::RightStickY).unwrap_or(0.0);
        let lt = gamepad.get(GamepadAxis::LeftZ).unwrap_or(0.0);
        let rt = gamepad.get(GamepadAxis::RightZ).unwrap_or(0.0);

        let left_mag = Vec2::new(lx, ly).length();
        let dragging = cursor.cursor_dragging_target.is_some();

        if dragging && left_mag > settings.left_stick_deadzone {
            category = InputCategory::GamepadAxisCursor;
        } else {
            process_axis_button(&mut axis_state.left, lx < 0.0, lx.abs(), &settings, InputDevice::GamepadAxis, 10, &mut actions);
            process_axis_button(&mut axis_state.right, lx > 0.0, lx.abs(), &settings, InputDevice::GamepadAxis, 11, &mut actions);
            process_axis_button(&mut axis_state.up, ly > 0.0, ly.abs(), &settings, InputDevice::GamepadAxis, 12, &mut actions);
            process_axis_button(&mut axis_state.down, ly < 0.0, ly.abs(), &settings, InputDevice::GamepadAxis, 13, &mut actions);
            if axis_state.left || axis_state.right || axis_state.up || axis_state.down {
                category = InputCategory::GamepadButton;
            }
        }

        let right_mag = Vec2::new(rx, ry).length();
        if right_mag > settings.right_stick_deadzone {
            category = InputCategory::GamepadAxisCursor;
        }

        process_trigger_button(&mut axis_state.left_trigger, lt, &settings, InputDevice::GamepadAxis, 14, &mut actions);
        process_trigger_button(&mut axis_state.right_trigger, rt, &settings, InputDevice::GamepadAxis, 15, &mut actions);
    }

    reconfigure_device_info(&mut hid, category, None, cursor_vis, sprite_pack);
}

#[allow(clippy::too_many_arguments)]
fn process_axis_button(
    active: &mut bool,
    direction_matches: bool,
    magnitude: f32,
    settings: &InputSettings,
    device: InputDevice,
    code: i32,
    actions: &mut ActionBindings,
) {
    if !*active && direction_matches && magnitude > settings.left_stick_dpad_activation_threshold {
        *active = true;
        actions.dispatch_raw(device, code, true, magnitude);
    } else if *active && magnitude < settings.left_stick_dpad_release_threshold {
        *active = false;
        actions.dispatch_raw(device, code, false, 0.0);
    }
}

fn process_trigger_button(active: &mut bool, value: f32, settings: &InputSettings, device: InputDevice, code: i32, actions: &mut ActionBindings) {
    if !*active && value > settings.trigger_activation_threshold {
        *active = true;
        actions.dispatch_raw(device, code, true, value);
    } else if *active && value < settings.trigger_release_threshold {
        *active = false;
        actions.dispatch_raw(device, code, false, 0.0);
    }
}

/// Infer a console kind purely from a connected gamepad's name, for callers
/// that want it outside the HID arbitration flow (e.g. a settings screen).
pub fn console_kind_for_gamepad(name: &str) -> crate::hid::ConsoleKind {
    deduce_console_from_gamepad(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> ActionBindings {
        ActionBindings::new()
    }

    #[test]
    fn process_axis_button_activates_above_threshold_and_releases_below() {
        let settings = InputSettings::default();
        let mut actions = bindings();
        let mut active = false;

        process_axis_button(&mut active, true, 0.8, &settings, InputDevice::GamepadAxis, 12, &mut actions);
        assert!(active);

        process_axis_button(&mut active, true, 0.8, &settings, InputDevice::GamepadAxis, 12, &mut actions);
        assert!(active, "already-active button should not re-fire on sustained deflection");

        process_axis_button(&mut active, true, 0.1, &settings, InputDevice::GamepadAxis, 12, &mut actions);
        assert!(!active);
    }

    #[test]
    fn process_axis_button_ignores_direction_mismatch() {
        let settings = InputSettings::default();
        let mut actions = bindings();
        let mut active = false;
        process_axis_button(&mut active, false, 0.9, &settings, InputDevice::GamepadAxis, 12, &mut actions);
        assert!(!active);
    }

    #[test]
    fn process_trigger_button_activates_and_releases() {
        let settings = InputSettings::default();
        let mut actions = bindings();
        let mut active = false;

        process_trigger_button(&mut active, 0.9, &settings, InputDevice::GamepadAxis, 14, &mut actions);
        assert!(active);

        process_trigger_button(&mut active, 0.1, &settings, InputDevice::GamepadAxis, 14, &mut actions);
        assert!(!active);
    }

    #[test]
    fn tick_repeat_entry_waits_for_initial_delay_then_repeats_at_subsequent_delay() {
        let settings = InputSettings::default();
        let mut entry = ButtonRepeatEntry::default();

        // held for less than the initial delay: no repeat yet.
        assert!(!tick_repeat_entry(&mut entry, &settings, settings.button_repeat_initial_delay - 0.05));
        // crossing the initial delay fires the first repeat pulse.
        assert!(tick_repeat_entry(&mut entry, &settings, 0.1));
        // immediately after, still within the subsequent delay window.
        assert!(!tick_repeat_entry(&mut entry, &settings, 0.01));
        // advancing past the subsequent delay fires again.
        assert!(tick_repeat_entry(&mut entry, &settings, settings.button_repeat_subsequent_delay));
    }

    #[test]
    fn tick_repeat_entry_no_holdcap_fires_every_tick() {
        let mut settings = InputSettings::default();
        settings.no_holdcap = true;
        let mut entry = ButtonRepeatEntry::default();

        assert!(tick_repeat_entry(&mut entry, &settings, 0.001));
        assert!(tick_repeat_entry(&mut entry, &settings, 0.001));
    }

    #[test]
    fn mouse_button_code_is_stable_per_button() {
        assert_eq!(mouse_button_code(MouseButton::Left), 0);
        assert_eq!(mouse_button_code(MouseButton::Right), 1);
        assert_eq!(mouse_button_code(MouseButton::Middle), 2);
        assert_eq!(mouse_button_code(MouseButton::Other(5)), 105);
    }
}
