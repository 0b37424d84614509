//! Cursor state and collision (module D): the single logical cursor's
//! position, its collision set, the hover target, and the modal context
//! stack used to scope focus across overlays/submenus.
//!
//! Grounded in `input_function_data.hpp`'s `InputState` cursor fields and
//! `input_events.hpp`'s context-stack contract.

use bevy::prelude::*;

use crate::gameobject::{Bounds2d, CursorEntity, Interactable, WorldContainer};
use crate::hid::HidState;
use crate::locks::LockState;
use crate::scroll::ScrollPane;
use crate::settings::InputSettings;

/// One saved modal scope on [`CursorState::cursor_context`]'s stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorContextFrame {
    pub focused: Option<Entity>,
    pub position: Vec2,
    pub focus_interrupt: bool,
}

/// Modal scope stack: opening a submenu pushes a frame, closing it pops.
#[derive(Debug, Clone, Default)]
pub struct CursorContext {
    pub layer: i32,
    pub stack: Vec<CursorContextFrame>,
}

/// What a pending [`SnapTarget`] resolves its position from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapKind {
    Node,
    Transform,
}

/// A one-shot request to move the cursor to an entity (or a fixed point) on
/// the next update, consumed by [`update_cursor_position`].
#[derive(Debug, Clone, Copy)]
pub struct SnapTarget {
    pub node: Option<Entity>,
    pub position: Vec2,
    pub kind: SnapKind,
}

/// The engine's single logical cursor (module D, §3.4).
#[derive(Resource, Debug, Default)]
pub struct CursorState {
    pub cursor_position: Vec2,
    pub cursor_focused_target: Option<Entity>,
    pub cursor_prev_focused_target: Option<Entity>,
    pub cursor_hovering_target: Option<Entity>,
    pub cursor_prev_hovering_target: Option<Entity>,
    pub current_designated_hover_target: Option<Entity>,
    pub prev_designated_hover_target: Option<Entity>,
    pub cursor_down_target: Option<Entity>,
    pub cursor_up_target: Option<Entity>,
    pub cursor_clicked_target: Option<Entity>,
    pub cursor_dragging_target: Option<Entity>,
    pub cursor_prev_dragging_target: Option<Entity>,
    pub cursor_released_on_target: Option<Entity>,
    pub cursor_down_position: Option<Vec2>,
    pub cursor_up_position: Option<Vec2>,
    pub cursor_down_time: f32,
    pub cursor_up_time: f32,
    pub cursor_down_handled: bool,
    pub cursor_up_handled: bool,
    pub cursor_click_handled: bool,
    pub cursor_released_on_handled: bool,
    pub cursor_hovering_handled: bool,
    pub is_cursor_down: bool,
    pub collision_list: Vec<Entity>,
    pub nodes_at_cursor: Vec<Entity>,
    pub active_scroll_pane: Option<Entity>,
    pub cursor_context: CursorContext,
    pub snap_cursor_to: Option<SnapTarget>,
    pub controller_nav_override: bool,
    /// Entity currently holding text-capture focus, if any (§3.2 `TextInput`).
    pub active_text_input: Option<Entity>,
    /// Right-click target queued on the press edge, dispatched on the
    /// following update (§4.6's `R_cursor_queue`).
    pub right_click_queued: Option<Entity>,
    /// Whether the currently queued right-click has already been dispatched.
    pub right_click_handled: bool,
    /// Seconds the current hover target has been continuously hovered while
    /// in touch mode, gating `on_hover` behind [`InputSettings::touch_input_minimum_hover_time`].
    pub touch_hover_elapsed: f32,
    /// Position of the first active touch point, polled by
    /// [`crate::devices::poll_touch_input`]; consumed as a cursor-position
    /// source when `touch_enabled` (§4.3).
    pub touch_position: Option<Vec2>,
}

impl CursorState {
    /// Stage a one-shot snap to `node`'s current centre, consumed at the
    /// top of the next update (§4.4).
    pub fn snap_to_node(&mut self, node: Entity) {
        self.snap_cursor_to = Some(SnapTarget { node: Some(node), position: Vec2::ZERO, kind: SnapKind::Node });
    }

    /// Stage a one-shot snap to a fixed position.
    pub fn snap_to_position(&mut self, position: Vec2) {
        self.snap_cursor_to = Some(SnapTarget { node: None, position, kind: SnapKind::Transform });
    }

    /// Modify the context-layer stack per §4.4's `delta` contract.
    pub fn modify_context_layer(&mut self, delta: i32) {
        match delta {
            1 => {
                let frame = CursorContextFrame {
                    focused: self.cursor_focused_target,
                    position: self.cursor_position,
                    focus_interrupt: false,
                };
                self.cursor_context.stack.push(frame);
                self.cursor_context.layer += 1;
            }
            -1 => {
                if self.cursor_context.layer > 0 {
                    self.cursor_context.stack.pop();
                    self.cursor_context.layer -= 1;
                }
            }
            -1000 => {
                self.cursor_context.stack.truncate(1);
                self.cursor_context.layer = 0;
            }
            -2000 => {
                self.cursor_context.stack.clear();
                self.cursor_context.layer = 0;
            }
            _ => {}
        }
    }
}

/// `Update` system: resolves the cursor position for this frame by priority
/// (§4.3) and writes it back to the dedicated cursor entity's [`Transform`].
pub fn update_cursor_position(
    mut cursor: ResMut<CursorState>,
    hid: Res<HidState>,
    windows: Query<&Window, With<bevy::window::PrimaryWindow>>,
    bounds: Query<&Bounds2d>,
    mut cursor_entity: Query<&mut Transform, With<CursorEntity>>,
) {
    let mut resolved = None;

    if let Some(snap) = cursor.snap_cursor_to.take() {
        resolved = Some(match snap.kind {
            SnapKind::Node => snap.node.and_then(|n| bounds.get(n).ok()).map(Bounds2d::center).unwrap_or(snap.position),
            SnapKind::Transform => snap.position,
        });
    } else if hid.touch_enabled {
        resolved = cursor.touch_position;
    } else if hid.pointer_enabled && !hid.axis_cursor_enabled {
        if let Ok(window) = windows.single() {
            if let Some(pos) = window.cursor_position() {
                resolved = Some(pos);
            }
        }
    } else if hid.controller_enabled {
        if let Some(focus) = cursor.cursor_focused_target {
            if let Ok(b) = bounds.get(focus) {
                resolved = Some(b.center());
            }
        }
    }

    if let Some(pos) = resolved {
        cursor.cursor_position = pos;
        if let Ok(mut t) = cursor_entity.single_mut() {
            t.translation.x = pos.x;
            t.translation.y = pos.y;
        }
    }
}

/// `Update` system: broad-phase collision against [`Bounds2d`] rectangles,
/// then hover-target selection (§4.5). Runs after [`update_cursor_position`].
pub fn update_collision_and_hover(
    mut cursor: ResMut<CursorState>,
    hid: Res<HidState>,
    settings: Res<InputSettings>,
    locks: Res<LockState>,
    world_container: Query<Entity, With<WorldContainer>>,
    cursor_entity: Query<Entity, With<CursorEntity>>,
    mut candidates: Query<(Entity, &Bounds2d, &mut Interactable), (Without<CursorEntity>, Without<WorldContainer>)>,
    scroll_panes: Query<Entity, With<ScrollPane>>,
) {
    let _ = settings;
    cursor.collision_list.clear();
    cursor.nodes_at_cursor.clear();
    cursor.active_scroll_pane = None;

    // (entity, hoverEnabled) for every entity that collided this frame, kept
    // alongside collision_list so hover selection below doesn't need a
    // second query borrow.
    let mut hover_candidates: Vec<(Entity, bool)> = Vec::new();

    for (entity, b, mut interactable) in candidates.iter_mut() {
        if !interactable.collision_enabled || !interactable.visible {
            continue;
        }
        if b.contains(cursor.cursor_position) {
            interactable.is_colliding = true;
            cursor.collision_list.push(entity);
            cursor.nodes_at_cursor.push(entity);
            hover_candidates.push((entity, interactable.hover_enabled));
            if scroll_panes.get(entity).is_ok() {
                cursor.active_scroll_pane = Some(entity);
            }
        } else {
            interactable.is_colliding = false;
            interactable.is_being_hovered = false;
        }
    }

    let world_entity = world_container.single().ok();
    let _ = cursor_entity;

    // §4.5 hover selection: (1) a global lock/overlay short-circuits to the
    // world container; (2) controller mode prefers the focused target if it
    // is still colliding and hover-enabled; (3) otherwise the first
    // colliding, hover-enabled entity wins, excluding the entity currently
    // being dragged unless touch is driving; (4) fall back to the world
    // container.
    let new_hover = if locks.should_gate_buttons() {
        world_entity
    } else {
        let focused_pick = if hid.controller_enabled {
            cursor.cursor_focused_target.filter(|&e| hover_candidates.iter().any(|&(c, h)| c == e && h))
        } else {
            None
        };
        focused_pick
            .or_else(|| {
                hover_candidates
                    .iter()
                    .copied()
                    .find(|&(e, hover_enabled)| hover_enabled && (hid.touch_enabled || Some(e) != cursor.cursor_dragging_target))
                    .map(|(e, _)| e)
            })
            .or(world_entity)
    };

    for &entity in &cursor.collision_list {
        if let Ok((_, _, mut interactable)) = candidates.get_mut(entity) {
            interactable.is_being_hovered = Some(entity) == new_hover;
        }
    }

    if new_hover != cursor.current_designated_hover_target {
        cursor.prev_designated_hover_target = cursor.current_designated_hover_target;
        cursor.current_designated_hover_target = new_hover;
        cursor.cursor_hovering_handled = false;
        cursor.touch_hover_elapsed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_context_layer_push_pop_round_trip() {
        let mut cursor = CursorState::default();
        cursor.modify_context_layer(1);
        cursor.modify_context_layer(1);
        assert_eq!(cursor.cursor_context.layer, 2);
        cursor.modify_context_layer(-1);
        assert_eq!(cursor.cursor_context.layer, 1);
    }

    #[test]
    fn modify_context_layer_reset_to_base_keeps_first_frame() {
        let mut cursor = CursorState::default();
        cursor.modify_context_layer(1);
        cursor.modify_context_layer(1);
        cursor.modify_context_layer(-1000);
        assert_eq!(cursor.cursor_context.layer, 0);
        assert_eq!(cursor.cursor_context.stack.len(), 1);
    }

    #[test]
    fn modify_context_layer_drop_all_clears_stack() {
        let mut cursor = CursorState::default();
        cursor.modify_context_layer(1);
        cursor.modify_context_layer(-2000);
        assert_eq!(cursor.cursor_context.layer, 0);
        assert!(cursor.cursor_context.stack.is_empty());
    }

    #[test]
    fn snap_to_position_is_consumed_as_transform_kind() {
        let mut cursor = CursorState::default();
        cursor.snap_to_position(Vec2::new(5.0, 5.0));
        let snap = cursor.snap_cursor_to.expect("snap should be staged");
        assert_eq!(snap.kind, SnapKind::Transform);
        assert_eq!(snap.position, Vec2::new(5.0, 5.0));
    }
}
