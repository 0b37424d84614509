//! Scroll-pane coupling (module H): auto-scrolls the navigated focus into
//! view, applies wheel/directional scroll deltas, and propagates the
//! resulting displacement down to descendant game objects.
//!
//! [`crate::nav::NavManager::scroll_into_view`]/`scroll_group` own the
//! actual offset math (§4.7.F); this module owns the component data and the
//! per-frame wheel-integration system.

use bevy::prelude::*;

use crate::gameobject::Interactable;
use crate::hid::HidState;
use crate::settings::InputSettings;

/// A scrollable viewport. Offset is along the vertical axis only in the
/// current revision, matching §4.7.F.
#[derive(Component, Debug, Clone, Copy)]
pub struct ScrollPane {
    pub offset: f32,
    pub prev_offset: f32,
    pub min_offset: f32,
    pub max_offset: f32,
    pub vertical: bool,
    pub horizontal: bool,
    pub viewport_size: Vec2,
    pub show_until_t: f32,
    pub show_seconds: f32,
}

impl Default for ScrollPane {
    fn default() -> Self {
        ScrollPane {
            offset: 0.0,
            prev_offset: 0.0,
            min_offset: f32::NEG_INFINITY,
            max_offset: 0.0,
            vertical: true,
            horizontal: false,
            viewport_size: Vec2::ZERO,
            show_until_t: 0.0,
            show_seconds: 1.0,
        }
    }
}

/// Points an entity at its ancestor [`ScrollPane`] so [`crate::nav::NavManager`]
/// can find it without walking the Bevy hierarchy every frame.
#[derive(Component, Debug, Clone, Copy)]
pub struct PaneParentRef(pub Entity);

/// `Update` system: while the cursor is over an active scroll pane and the
/// HID mode is pointer-driven, apply mouse wheel deltas to its offset.
pub fn apply_wheel_scroll(
    mut wheel: EventReader<bevy::input::mouse::MouseWheel>,
    hid: Res<HidState>,
    settings: Res<InputSettings>,
    time: Res<Time>,
    cursor: Res<crate::cursor::CursorState>,
    mut panes: Query<&mut ScrollPane>,
    mut interactables: Query<&mut Interactable>,
    children: Query<&Children>,
) {
    if !hid.pointer_enabled {
        wheel.clear();
        return;
    }
    let Some(pane_entity) = cursor.active_scroll_pane else {
        wheel.clear();
        return;
    };
    let mut delta = 0.0;
    for ev in wheel.read() {
        delta += ev.y;
    }
    if delta == 0.0 {
        return;
    }
    let Ok(mut pane) = panes.get_mut(pane_entity) else { return };
    let prev = pane.offset;
    pane.offset = (pane.offset - delta * settings.scroll_speed).clamp(pane.min_offset, pane.max_offset);
    if pane.offset != prev {
        pane.prev_offset = prev;
        pane.show_until_t = time.elapsed_secs() + pane.show_seconds;
        let new_offset = pane.offset;
        stamp_descendants(pane_entity, new_offset, &children, &mut interactables);
    }
}

fn stamp_descendants(
    root: Entity,
    offset: f32,
    children: &Query<&Children>,
    interactables: &mut Query<&mut Interactable>,
) {
    let displacement = Vec2::new(0.0, -offset);
    let mut stack: Vec<Entity> = children.get(root).map(|c| c.iter().collect()).unwrap_or_default();
    while let Some(e) = stack.pop() {
        if let Ok(mut i) = interactables.get_mut(e) {
            i.scroll_pane_displacement = displacement;
        }
        if let Ok(grandchildren) = children.get(e) {
            stack.extend(grandchildren.iter());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_pane_offset_clamps_to_bounds() {
        let mut pane = ScrollPane { min_offset: -50.0, max_offset: 0.0, ..Default::default() };
        pane.offset = (pane.offset - 1000.0).clamp(pane.min_offset, pane.max_offset);
        assert_eq!(pane.offset, -50.0);
    }
}
