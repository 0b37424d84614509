//! Events published by the engine, opaque payloads for the host application
//! to subscribe to.
//!
//! These are plain Bevy [`Event`]s rather than an abstract event-bus
//! collaborator: `EventWriter`/`EventReader` already give synchronous,
//! per-frame, multi-subscriber dispatch, so no separate bus type is needed.

use bevy::prelude::*;

use crate::hid::ConsoleKind;

/// Which mouse button a cursor event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButtonKind {
    /// Primary (left) button.
    Left,
    /// Secondary (right) button.
    Right,
}

/// Fired on a left-button release that completed a click gesture (down and
/// up on the same target, within the movement and time thresholds).
#[derive(Event, Debug, Clone)]
pub struct MouseClicked {
    /// Screen-space position of the release.
    pub position: Vec2,
    /// Which button produced the click.
    pub button: MouseButtonKind,
    /// Entity the click landed on, if any (`None` means the world
    /// container).
    pub target: Option<Entity>,
}

/// Fired alongside [`MouseClicked`] when the clicked target is a UI element.
#[derive(Event, Debug, Clone)]
pub struct UiButtonActivated {
    /// The UI entity that was activated.
    pub entity: Entity,
    /// Which button activated it.
    pub button: MouseButtonKind,
}

/// Fired whenever the designated focus entity changes, by either the legacy
/// resolver or the navigation manager.
#[derive(Event, Debug, Clone)]
pub struct UiElementFocused {
    /// The newly focused entity, or `None` if focus was cleared.
    pub entity: Option<Entity>,
}

/// Raw gamepad button press, republished after action-binding dispatch so
/// host code can react without going through the action layer.
#[derive(Event, Debug, Clone)]
pub struct GamepadButtonPressed {
    /// Gamepad entity the button belongs to.
    pub id: Entity,
    /// The button.
    pub button: GamepadButton,
}

/// Raw gamepad button release; see [`GamepadButtonPressed`].
#[derive(Event, Debug, Clone)]
pub struct GamepadButtonReleased {
    /// Gamepad entity the button belongs to.
    pub id: Entity,
    /// The button.
    pub button: GamepadButton,
}

/// Fired by the HID arbiter on transition to/from controller mode. The
/// engine does not own a cursor sprite asset; this is a hook for the host
/// application's rendering layer.
#[derive(Event, Debug, Clone, Copy)]
pub struct CursorVisibilityChanged(pub bool);

/// Fired by the HID arbiter when the inferred console kind for the active
/// gamepad changes, so UI can swap button-prompt glyphs.
#[derive(Event, Debug, Clone, Copy)]
pub struct SpritePackChanged(pub ConsoleKind);
