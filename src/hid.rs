//! HID mode arbiter (module C): decides whether the pointer or the
//! controller currently drives the engine, and reacts to the transition.
//!
//! Grounded in `input_hid.cpp`: exactly one logical input mode is active at
//! a time, switched only by observed activity on another device category,
//! never by a timeout.

use bevy::prelude::*;

use crate::events::{CursorVisibilityChanged, SpritePackChanged};

/// Which device category most recently produced activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputCategory {
    /// No activity observed yet.
    #[default]
    None,
    /// Keyboard key edge.
    KeyBoard,
    /// Mouse button or motion.
    Mouse,
    /// Touch point.
    Touch,
    /// Gamepad digital button (including axis-as-button interpretation).
    GamepadButton,
    /// Gamepad axis movement not driving the cursor (reserved).
    GamepadAxis,
    /// Gamepad axis movement driving the cursor directly.
    GamepadAxisCursor,
}

/// Inferred console family for the active gamepad, used to pick matching
/// button-prompt glyphs. The engine does not ship any glyphs itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleKind {
    /// Xbox-family controller.
    Xbox,
    /// PlayStation-family controller.
    PlayStation,
    /// Nintendo-family controller.
    Nintendo,
    /// Unrecognized controller name.
    #[default]
    Unknown,
}

/// Metadata about the single active gamepad (the engine supports exactly
/// one at a time, see the crate-level Non-goals).
#[derive(Debug, Clone, Default)]
pub struct GamepadInfo {
    /// Gamepad entity, if one is currently considered "active".
    pub id: Option<Entity>,
    /// Raw gamepad name string as reported by the backend.
    pub name: String,
    /// Inferred console family.
    pub console: ConsoleKind,
    /// Opaque passthrough field, mirrors the source's `object` (unused by
    /// this crate; kept for host applications that stash extra metadata).
    pub object: String,
    /// Opaque passthrough field, mirrors the source's `mapping`.
    pub mapping: String,
}

/// Current HID arbitration state: which device category is in control, and
/// which flags follow from it.
#[derive(Resource, Debug, Clone, Default)]
pub struct HidState {
    /// Last device category observed producing activity.
    pub last_type: InputCategory,
    /// Pointer (mouse/touch) is the active driver.
    pub pointer_enabled: bool,
    /// Directional-pad style input (keyboard or gamepad digital) is active.
    pub dpad_enabled: bool,
    /// Mouse specifically is active.
    pub mouse_enabled: bool,
    /// Touch specifically is active.
    pub touch_enabled: bool,
    /// A gamepad is the active driver (button or axis-cursor mode).
    pub controller_enabled: bool,
    /// A gamepad axis is directly driving the cursor.
    pub axis_cursor_enabled: bool,
    /// Metadata for the currently active gamepad.
    pub gamepad: GamepadInfo,
}

impl HidState {
    fn apply(&mut self, category: InputCategory) {
        self.last_type = category;
        use InputCategory::*;
        match category {
            None => {}
            Mouse => {
                self.pointer_enabled = true;
                self.dpad_enabled = false;
                self.mouse_enabled = true;
                self.touch_enabled = false;
                self.controller_enabled = false;
                self.axis_cursor_enabled = false;
            }
            Touch => {
                self.pointer_enabled = true;
                self.dpad_enabled = false;
                self.mouse_enabled = false;
                self.touch_enabled = true;
                self.controller_enabled = false;
                self.axis_cursor_enabled = false;
            }
            KeyBoard => {
                self.pointer_enabled = false;
                self.dpad_enabled = true;
                self.mouse_enabled = false;
                self.touch_enabled = false;
                self.controller_enabled = false;
                self.axis_cursor_enabled = false;
            }
            GamepadButton | GamepadAxis => {
                self.pointer_enabled = false;
                self.dpad_enabled = true;
                self.mouse_enabled = false;
                self.touch_enabled = false;
                self.controller_enabled = true;
                self.axis_cursor_enabled = false;
            }
            GamepadAxisCursor => {
                self.pointer_enabled = true;
                self.dpad_enabled = false;
                self.mouse_enabled = false;
                self.touch_enabled = false;
                self.controller_enabled = true;
                self.axis_cursor_enabled = true;
            }
        }
    }

    fn was_controller(&self) -> bool {
        self.controller_enabled
    }
}

/// Infer a [`ConsoleKind`] from a raw gamepad name string, by substring
/// match. Grounded in `input_hid.cpp::deduce_console_from_gamepad`.
pub fn deduce_console_from_gamepad(name: &str) -> ConsoleKind {
    const PLAYSTATION: &[&str] = &["PS", "Sony", "DualShock", "DualSense", "Wireless Controller"];
    const NINTENDO: &[&str] = &["Nintendo", "Switch", "Joy-Con", "Pro Controller"];
    const XBOX: &[&str] = &["Xbox", "XInput", "Elite", "360"];

    if PLAYSTATION.iter().any(|s| name.contains(s)) {
        ConsoleKind::PlayStation
    } else if NINTENDO.iter().any(|s| name.contains(s)) {
        ConsoleKind::Nintendo
    } else if XBOX.iter().any(|s| name.contains(s)) {
        ConsoleKind::Xbox
    } else {
        ConsoleKind::Unknown
    }
}

/// Re-arbitrate HID mode given a newly observed activity category, firing
/// the transition events/flags described in SPEC_FULL.md §4.2.
///
/// `None` is a no-op: it means "nothing happened this frame", not "clear
/// the mode".
pub fn reconfigure_device_info(
    hid: &mut HidState,
    category: InputCategory,
    gamepad_name: Option<&str>,
    mut cursor_vis: EventWriter<CursorVisibilityChanged>,
    mut sprite_pack: EventWriter<SpritePackChanged>,
) {
    if matches!(category, InputCategory::None) {
        return;
    }
    let was_controller = hid.was_controller();
    hid.apply(category);

    let now_controller = hid.controller_enabled;
    if now_controller && !was_controller {
        cursor_vis.send(CursorVisibilityChanged(false));
    } else if was_controller && !now_controller {
        cursor_vis.send(CursorVisibilityChanged(true));
        hid.gamepad = GamepadInfo::default();
    }

    if now_controller {
        if let Some(name) = gamepad_name {
            let console = deduce_console_from_gamepad(name);
            if console != hid.gamepad.console || hid.gamepad.name != name {
                hid.gamepad.name = name.to_string();
                hid.gamepad.console = console;
                sprite_pack.send(SpritePackChanged(console));
            }
        }
    }
}

/// `Update` system: on a transition away from controller mode, clears
/// `isBeingFocused` on every focusable entity (§4.2) and drops the cursor's
/// focused target, so the legacy resolver and navigation manager both start
/// from a clean slate under the new mode.
pub fn clear_focus_on_mode_change(
    mut cursor_vis: EventReader<CursorVisibilityChanged>,
    mut cursor: ResMut<crate::cursor::CursorState>,
    mut interactables: Query<&mut crate::gameobject::Interactable>,
) {
    for event in cursor_vis.read() {
        if event.0 {
            for mut interactable in interactables.iter_mut() {
                interactable.is_being_focused = false;
            }
            cursor.cursor_prev_focused_target = cursor.cursor_focused_target.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_inference_matches_substrings() {
        assert_eq!(deduce_console_from_gamepad("Sony DualSense Wireless Controller"), ConsoleKind::PlayStation);
        assert_eq!(deduce_console_from_gamepad("Nintendo Switch Pro Controller"), ConsoleKind::Nintendo);
        assert_eq!(deduce_console_from_gamepad("Xbox 360 Controller"), ConsoleKind::Xbox);
        assert_eq!(deduce_console_from_gamepad("Totally Generic Pad"), ConsoleKind::Unknown);
    }

    #[test]
    fn mode_table_matches_spec() {
        let mut hid = HidState::default();
        hid.apply(InputCategory::Mouse);
        assert!(hid.pointer_enabled && hid.mouse_enabled && !hid.controller_enabled);

        hid.apply(InputCategory::GamepadButton);
        assert!(hid.dpad_enabled && hid.controller_enabled && !hid.pointer_enabled);

        hid.apply(InputCategory::GamepadAxisCursor);
        assert!(hid.pointer_enabled && hid.controller_enabled && hid.axis_cursor_enabled);
    }
}
