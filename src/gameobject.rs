//! Per-entity interaction state and the callback type shared by the cursor
//! event pipeline, the navigation manager and the legacy focus resolver.
//!
//! Grounded in the `GameObject`/`NodeData` shape from `input_function_data.hpp`
//! and the callback-by-value pattern `controller_nav.cpp` uses for
//! per-group/global focus and select hooks (there bound to Lua closures;
//! here, boxed Rust closures — Lua scripting bindings are out of scope).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bevy::prelude::*;
use tracing::error;

/// A boxed, cloneable callback invoked by the engine on an entity-affecting
/// event (click, hover, drag, focus, select, ...).
///
/// Stored by value (an `Arc` so cheaply cloned out of components/resources
/// without borrowing them across the call), invoked through [`safe_call`] so
/// a panicking callback can never corrupt engine state or abort the process.
pub type Callback = Arc<dyn Fn(Entity, &mut Commands) + Send + Sync>;

/// Invoke `cb` with `entity`/`commands`, catching panics and logging them at
/// `error` instead of propagating. Mirrors the source's
/// "safe-call-catch-log" idiom around Lua callback invocation.
pub fn safe_call(cb: &Callback, entity: Entity, commands: &mut Commands) {
    let result = catch_unwind(AssertUnwindSafe(|| cb(entity, commands)));
    if let Err(payload) = result {
        let msg = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");
        error!(?entity, message = msg, "interaction callback panicked, treating as no-op");
    }
}

/// Axis-aligned rectangle in screen/world space, used for collision
/// detection and as the spatial-navigation midpoint source.
///
/// Kept distinct from Bevy's own `Transform` (an affine 3D transform) since
/// this is screen-space UI geometry, the same separation the source draws
/// between its `Transform` component and render transforms.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds2d {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Bounds2d {
    /// Construct a rectangle from its top-left corner and size.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Bounds2d { x, y, w, h }
    }

    /// Centre point of the rectangle.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Whether `point` falls within this rectangle.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.x + self.w && point.y >= self.y && point.y <= self.y + self.h
    }
}

/// Optional per-entity interaction callbacks. Grouped separately from the
/// flags on [`Interactable`] so entities that only need flags (no scripted
/// behavior) don't pay for the `Option<Callback>` fields... in practice
/// Bevy components are plain structs either way; this split exists because
/// callbacks are frequently absent and keeping them on their own component
/// avoids requiring `Interactable` itself to implement anything beyond
/// `Default`.
#[derive(Component, Default, Clone)]
pub struct InteractionCallbacks {
    /// Invoked on a completed click gesture.
    pub on_click: Option<Callback>,
    /// Invoked on a completed right-click gesture.
    pub on_right_click: Option<Callback>,
    /// Invoked when this entity becomes the designated hover target.
    pub on_hover: Option<Callback>,
    /// Invoked when this entity stops being the designated hover target.
    pub on_stop_hover: Option<Callback>,
    /// Invoked on drag start/continue.
    pub on_drag: Option<Callback>,
    /// Invoked when dragging stops.
    pub on_stop_drag: Option<Callback>,
    /// Invoked on release (drop), separate from click.
    pub on_release: Option<Callback>,
    /// Invoked every frame this entity is considered "active" by the host
    /// application (opaque to the engine; never called by this crate's own
    /// systems, exposed for host-side convenience).
    pub on_update: Option<Callback>,
}

/// Per-entity interaction state, the Rust analogue of the source's
/// `GameObject` struct.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Interactable {
    /// Whether this entity can be clicked.
    pub click_enabled: bool,
    /// Whether this entity can be dragged.
    pub drag_enabled: bool,
    /// Whether this entity can be right-clicked.
    pub right_click_enabled: bool,
    /// Whether this entity can be hovered.
    pub hover_enabled: bool,
    /// Whether this entity participates in collision/hit-testing at all.
    pub collision_enabled: bool,
    /// Whether this entity is visible (invisible entities are skipped by
    /// collision even if `collision_enabled`).
    pub visible: bool,
    /// Set by the collision pass; true while the cursor overlaps this
    /// entity's [`Bounds2d`].
    pub is_colliding: bool,
    /// Set by the hover pass.
    pub is_being_hovered: bool,
    /// Set by the cursor event pipeline while this entity is being dragged.
    pub is_being_dragged: bool,
    /// Set by the focus resolver (legacy or navigation manager).
    pub is_being_focused: bool,
    /// True while this entity sits under a modal overlay and should not
    /// receive input.
    pub is_under_overlay: bool,
    /// If true, this entity keeps receiving input even while the engine is
    /// globally paused (e.g. a pause menu's own buttons).
    pub ignores_pause: bool,
    /// If true, [`crate::cursor_events`]'s release dispatch treats this
    /// entity as a valid drop target for a gesture that started dragging
    /// elsewhere.
    pub trigger_on_release_enabled: bool,
    /// Accumulated scroll displacement stamped by [`crate::scroll`], applied
    /// bottom-up from an ancestor scroll pane.
    pub scroll_pane_displacement: Vec2,
}

impl Default for Interactable {
    fn default() -> Self {
        Interactable {
            click_enabled: true,
            drag_enabled: false,
            right_click_enabled: false,
            hover_enabled: true,
            collision_enabled: true,
            visible: true,
            is_colliding: false,
            is_being_hovered: false,
            is_being_dragged: false,
            is_being_focused: false,
            is_under_overlay: false,
            ignores_pause: false,
            trigger_on_release_enabled: false,
            scroll_pane_displacement: Vec2::ZERO,
        }
    }
}

/// Marker for the single dedicated cursor entity the plugin spawns. Its
/// [`Transform`] is kept in sync with [`crate::cursor::CursorState::cursor_position`].
#[derive(Component, Debug, Clone, Copy)]
pub struct CursorEntity;

/// Marker for the world-container entity: the fallback hover/focus target
/// when nothing else qualifies, and excluded from collision candidacy.
#[derive(Component, Debug, Clone, Copy)]
pub struct WorldContainer;

/// Simple text-input component (§3.2). Operated on by host application
/// systems; the engine only tracks which entity, if any, currently owns
/// text-capture focus (see [`crate::cursor::CursorState::active_text_input`]).
#[derive(Component, Debug, Clone, Default)]
pub struct TextInput {
    /// Current text content.
    pub text: String,
    /// Cursor position within `text`, in chars.
    pub cursor_pos: usize,
    /// Maximum allowed length, in chars.
    pub max_len: usize,
    /// Whether input is forced to uppercase.
    pub all_caps: bool,
    /// Whether this field currently has text-capture focus.
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn bounds_contains_checks_rectangle_membership() {
        let b = Bounds2d::new(10.0, 10.0, 20.0, 20.0);
        assert!(b.contains(Vec2::new(15.0, 15.0)));
        assert!(b.contains(Vec2::new(10.0, 10.0)));
        assert!(b.contains(Vec2::new(30.0, 30.0)));
        assert!(!b.contains(Vec2::new(9.9, 15.0)));
        assert!(!b.contains(Vec2::new(30.1, 15.0)));
    }

    #[test]
    fn bounds_center_is_midpoint() {
        let b = Bounds2d::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(b.center(), Vec2::new(5.0, 10.0));
    }

    #[test]
    fn safe_call_catches_panic_and_does_not_propagate() {
        let cb: Callback = Arc::new(|_entity, _commands| panic!("boom"));
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let mut queue = bevy::ecs::system::CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        safe_call(&cb, entity, &mut commands);
    }

    #[test]
    fn safe_call_invokes_callback_on_success() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let cb: Callback = Arc::new(move |_entity, _commands| {
            flag.store(true, Ordering::SeqCst);
        });
        let world = World::new();
        let mut queue = bevy::ecs::system::CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        let entity = Entity::from_raw(0);
        safe_call(&cb, entity, &mut commands);
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn interactable_default_matches_expected_flags() {
        let i = Interactable::default();
        assert!(i.click_enabled);
        assert!(i.hover_enabled);
        assert!(i.collision_enabled);
        assert!(i.visible);
        assert!(!i.drag_enabled);
        assert!(!i.is_being_focused);
    }
}
