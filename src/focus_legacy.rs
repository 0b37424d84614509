//! Legacy focus resolver (module F): default focus-under-cursor logic for
//! entities with UI focus capability. Yields entirely to the navigation
//! manager when [`CursorState::controller_nav_override`] is set — the two
//! resolvers never run their own logic in the same frame for the same
//! entity.
//!
//! Grounded in `input_focus.hpp`'s dual-resolver contract: "if
//! controllerNavOverride is set, this system does nothing but consume the
//! flag."

use bevy::prelude::*;

use crate::cursor::CursorState;
use crate::events::UiElementFocused;
use crate::gameobject::{Bounds2d, Interactable};
use crate::hid::HidState;
use crate::locks::LockState;

/// `Update` system: resolves legacy (non-navigation-manager) focus. Must run
/// after the navigation manager's systems so `controller_nav_override` from
/// this frame is visible here.
pub fn resolve_legacy_focus(
    mut cursor: ResMut<CursorState>,
    hid: Res<HidState>,
    locks: Res<LockState>,
    mut interactables: Query<&mut Interactable>,
    bounds: Query<&Bounds2d>,
    mut focused_events: EventWriter<UiElementFocused>,
) {
    if cursor.controller_nav_override {
        cursor.controller_nav_override = false;
        if let Some(focus) = cursor.cursor_focused_target {
            if let Ok(mut i) = interactables.get_mut(focus) {
                i.is_being_focused = true;
            }
        }
        return;
    }

    // An entity marked `ignores_pause` (§4.9) keeps its focus through the
    // input-locked-while-unpaused gate, even though every other entity is
    // cut off; it is still subject to the no-usable-device and
    // axis-cursor-mode clears below, which are about device availability,
    // not pausing.
    let focused_ignores_pause =
        cursor.cursor_focused_target.and_then(|e| interactables.get(e).ok()).map(|i| i.ignores_pause).unwrap_or(false);

    let should_clear = !hid.pointer_enabled && !hid.controller_enabled
        || (locks.input_locked && !locks.paused && !focused_ignores_pause)
        || hid.axis_cursor_enabled;
    if should_clear {
        if cursor.cursor_focused_target.is_some() {
            if let Some(prev) = cursor.cursor_focused_target.take() {
                if let Ok(mut i) = interactables.get_mut(prev) {
                    i.is_being_focused = false;
                }
            }
            focused_events.send(UiElementFocused { entity: None });
        }
        return;
    }

    if let Some(focus) = cursor.cursor_focused_target {
        let still_valid = bounds.get(focus).is_ok() && interactables.get(focus).map(|i| i.visible).unwrap_or(false);
        if !still_valid {
            if let Ok(mut i) = interactables.get_mut(focus) {
                i.is_being_focused = false;
            }
            cursor.cursor_focused_target = None;
        }
    }

    let candidate = cursor.current_designated_hover_target;
    if candidate != cursor.cursor_focused_target {
        if let Some(prev) = cursor.cursor_focused_target {
            if let Ok(mut i) = interactables.get_mut(prev) {
                i.is_being_focused = false;
            }
        }
        cursor.cursor_prev_focused_target = cursor.cursor_focused_target;
        cursor.cursor_focused_target = candidate;
        if let Some(next) = candidate {
            if let Ok(mut i) = interactables.get_mut(next) {
                i.is_being_focused = true;
            }
        }
        focused_events.send(UiElementFocused { entity: candidate });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headless_app() -> App {
        let mut app = App::new();
        app.add_event::<UiElementFocused>();
        app.init_resource::<CursorState>();
        app.init_resource::<HidState>();
        app.init_resource::<LockState>();
        app.add_systems(Update, resolve_legacy_focus);
        app
    }

    #[test]
    fn controller_nav_override_consumes_flag_and_focuses_target() {
        let mut app = headless_app();
        let entity = app.world_mut().spawn((Bounds2d::new(0.0, 0.0, 10.0, 10.0), Interactable::default())).id();
        {
            let mut hid = app.world_mut().resource_mut::<HidState>();
            hid.controller_enabled = true;
        }
        {
            let mut cursor = app.world_mut().resource_mut::<CursorState>();
            cursor.controller_nav_override = true;
            cursor.cursor_focused_target = Some(entity);
        }
        app.update();

        assert!(!app.world().resource::<CursorState>().controller_nav_override);
        let interactable = app.world().get::<Interactable>(entity).unwrap();
        assert!(interactable.is_being_focused);
    }

    #[test]
    fn hover_target_change_moves_focus_and_emits_event() {
        let mut app = headless_app();
        {
            let mut hid = app.world_mut().resource_mut::<HidState>();
            hid.pointer_enabled = true;
        }
        let entity = app.world_mut().spawn((Bounds2d::new(0.0, 0.0, 10.0, 10.0), Interactable::default())).id();
        {
            let mut cursor = app.world_mut().resource_mut::<CursorState>();
            cursor.current_designated_hover_target = Some(entity);
        }
        app.update();

        let cursor = app.world().resource::<CursorState>();
        assert_eq!(cursor.cursor_focused_target, Some(entity));
        let interactable = app.world().get::<Interactable>(entity).unwrap();
        assert!(interactable.is_being_focused);
    }

    #[test]
    fn locked_input_clears_existing_focus() {
        let mut app = headless_app();
        let entity = app.world_mut().spawn((Bounds2d::new(0.0, 0.0, 10.0, 10.0), Interactable::default())).id();
        {
            let mut hid = app.world_mut().resource_mut::<HidState>();
            hid.pointer_enabled = true;
        }
        {
            let mut cursor = app.world_mut().resource_mut::<CursorState>();
            cursor.cursor_focused_target = Some(entity);
        }
        {
            let mut locks = app.world_mut().resource_mut::<LockState>();
            locks.input_locked = true;
            locks.paused = false;
        }
        app.update();

        assert_eq!(app.world().resource::<CursorState>().cursor_focused_target, None);
    }

    #[test]
    fn ignores_pause_entity_keeps_focus_while_input_locked() {
        let mut app = headless_app();
        let mut interactable = Interactable::default();
        interactable.ignores_pause = true;
        let entity = app.world_mut().spawn((Bounds2d::new(0.0, 0.0, 10.0, 10.0), interactable)).id();
        {
            let mut hid = app.world_mut().resource_mut::<HidState>();
            hid.pointer_enabled = true;
        }
        {
            let mut cursor = app.world_mut().resource_mut::<CursorState>();
            cursor.cursor_focused_target = Some(entity);
        }
        {
            let mut locks = app.world_mut().resource_mut::<LockState>();
            locks.input_locked = true;
            locks.paused = false;
        }
        app.update();

        assert_eq!(app.world().resource::<CursorState>().cursor_focused_target, Some(entity));
    }
}
