//! Action binding layer (module B): translates raw `(device, code)` input
//! edges into named, context-gated logical actions.
//!
//! Grounded in `input_actions.hpp`/`input_actions.cpp`. Game code binds
//! named actions to device inputs once, then polls action state every frame
//! instead of checking raw keys directly — this gives rebinding, multi
//! device support, and context-based input for free.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bevy::prelude::{KeyCode, Resource};

use crate::error::InputError;

/// Device category an [`ActionBinding`] is sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputDevice {
    /// Keyboard key, `code` is a [`KeyCode`] discriminant cast to `i32`.
    Keyboard,
    /// Mouse button, `code` is a small enum-like index.
    Mouse,
    /// Gamepad digital button.
    GamepadButton,
    /// Gamepad analog axis.
    GamepadAxis,
}

impl fmt::Display for InputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputDevice::Keyboard => "keyboard",
            InputDevice::Mouse => "mouse",
            InputDevice::GamepadButton => "gamepad_button",
            InputDevice::GamepadAxis => "gamepad_axis",
        };
        f.write_str(s)
    }
}

impl FromStr for InputDevice {
    type Err = InputError;

    /// Parses the device names recognised by §6.3: `keyboard`, `mouse`,
    /// `gamepad_button`, `gamepad_axis`. Used by host applications loading
    /// bindings from a config file rather than binding them in code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keyboard" => Ok(InputDevice::Keyboard),
            "mouse" => Ok(InputDevice::Mouse),
            "gamepad_button" => Ok(InputDevice::GamepadButton),
            "gamepad_axis" => Ok(InputDevice::GamepadAxis),
            other => Err(InputError::UnknownBindingName(other.to_string())),
        }
    }
}

/// When, relative to the raw edge, an action fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTrigger {
    /// Fires on the rising edge (first frame of press).
    Pressed,
    /// Fires on the falling edge (frame of release).
    Released,
    /// Latched true for the duration of the press.
    Held,
    /// Reserved: repeat cadence, implementers may reuse the navigation
    /// repeat machinery in [`crate::nav`].
    Repeat,
    /// Analog, fires while the axis value exceeds `+threshold`.
    AxisPos,
    /// Analog, fires while the axis value is below `-threshold`.
    AxisNeg,
}

impl fmt::Display for ActionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionTrigger::Pressed => "Pressed",
            ActionTrigger::Released => "Released",
            ActionTrigger::Held => "Held",
            ActionTrigger::Repeat => "Repeat",
            ActionTrigger::AxisPos => "AxisPos",
            ActionTrigger::AxisNeg => "AxisNeg",
        };
        f.write_str(s)
    }
}

impl FromStr for ActionTrigger {
    type Err = InputError;

    /// Parses the trigger names recognised by §6.3: `Pressed`, `Released`,
    /// `Held`, `Repeat`, `AxisPos`, `AxisNeg`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pressed" => Ok(ActionTrigger::Pressed),
            "Released" => Ok(ActionTrigger::Released),
            "Held" => Ok(ActionTrigger::Held),
            "Repeat" => Ok(ActionTrigger::Repeat),
            "AxisPos" => Ok(ActionTrigger::AxisPos),
            "AxisNeg" => Ok(ActionTrigger::AxisNeg),
            other => Err(InputError::UnknownBindingName(other.to_string())),
        }
    }
}

/// A single device input mapped to an action name.
#[derive(Debug, Clone)]
pub struct ActionBinding {
    /// Source device category.
    pub device: InputDevice,
    /// Key/button/axis code, encoded as an int (device-specific meaning).
    pub code: i32,
    /// When this binding fires relative to the raw edge.
    pub trigger: ActionTrigger,
    /// Activation threshold, only meaningful for axis triggers.
    pub threshold: f32,
    /// Keyboard modifiers that must also be held (keyboard bindings only).
    pub modifiers: Vec<KeyCode>,
    /// Optional chord-group tag, opaque to this crate.
    pub chord_group: String,
    /// Context this binding is active in; `"global"` bindings are always
    /// active regardless of [`ActionBindings::active_context`].
    pub context: String,
}

impl ActionBinding {
    /// Construct a binding with the default axis-trigger threshold and the
    /// `"global"` context.
    pub fn new(device: InputDevice, code: i32, trigger: ActionTrigger) -> Self {
        ActionBinding {
            device,
            code,
            trigger,
            threshold: 0.5,
            modifiers: Vec::new(),
            chord_group: String::new(),
            context: "global".to_string(),
        }
    }

    /// Restrict this binding to a specific context string.
    pub fn in_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = ctx.into();
        self
    }
}

/// Per-frame state of one named action.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionFrameState {
    /// True only on the frame of the rising edge.
    pub pressed: bool,
    /// True only on the frame of the falling edge.
    pub released: bool,
    /// True for the whole duration the action is held.
    pub down: bool,
    /// Seconds the action has been held continuously.
    pub held: f32,
    /// Aggregated analog value for axis-triggered actions.
    pub value: f32,
}

/// Action binding and per-frame state resource (module B / §6.3).
#[derive(Resource, Debug, Default)]
pub struct ActionBindings {
    bindings: HashMap<String, Vec<ActionBinding>>,
    states: HashMap<String, ActionFrameState>,
    index: HashMap<(InputDevice, i32), Vec<(String, usize)>>,
    active_context: String,
    rebind: Option<RebindRequest>,
}

struct RebindRequest {
    #[allow(dead_code)]
    action: String,
    callback: Box<dyn FnOnce(bool, ActionBinding) + Send + Sync>,
}

impl std::fmt::Debug for RebindRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebindRequest").field("action", &self.action).finish()
    }
}

impl ActionBindings {
    /// Active input context; bindings check this against their own
    /// `context` field (`"global"` is always active). Default `"gameplay"`.
    pub fn new() -> Self {
        ActionBindings {
            active_context: "gameplay".to_string(),
            ..Default::default()
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (name, bindings) in self.bindings.iter() {
            for (i, b) in bindings.iter().enumerate() {
                self.index
                    .entry((b.device, b.code))
                    .or_default()
                    .push((name.clone(), i));
            }
        }
    }

    /// Append a binding for `action`, rebuilding the reverse lookup index.
    pub fn bind(&mut self, action: &str, binding: ActionBinding) {
        self.bindings.entry(action.to_string()).or_default().push(binding);
        self.rebuild_index();
    }

    /// Remove all bindings and state for `action`.
    pub fn clear(&mut self, action: &str) {
        self.bindings.remove(action);
        self.states.remove(action);
        self.rebuild_index();
    }

    /// Switch the active context string.
    pub fn set_context(&mut self, ctx: &str) {
        self.active_context = ctx.to_string();
    }

    /// Enter rebind-listen mode: the next raw event is captured as a
    /// binding and handed to `cb` instead of being dispatched normally.
    pub fn start_rebind(
        &mut self,
        action: &str,
        cb: impl FnOnce(bool, ActionBinding) + Send + Sync + 'static,
    ) {
        self.rebind = Some(RebindRequest {
            action: action.to_string(),
            callback: Box::new(cb),
        });
    }

    /// Dispatch one raw device edge/sample. `down` is press/release for
    /// digital inputs; `value` is the analog sample for axis inputs.
    pub fn dispatch_raw(&mut self, device: InputDevice, code: i32, down: bool, value: f32) {
        if let Some(req) = self.rebind.take() {
            let trigger = if down { ActionTrigger::Pressed } else { ActionTrigger::Released };
            let binding = ActionBinding::new(device, code, trigger);
            (req.callback)(true, binding);
            return;
        }

        let Some(matches) = self.index.get(&(device, code)) else { return };
        let matches = matches.clone();
        for (name, idx) in matches {
            let Some(binding) = self.bindings.get(&name).and_then(|v| v.get(idx)) else { continue };
            if binding.context != "global" && binding.context != self.active_context {
                continue;
            }
            let trigger = binding.trigger;
            let threshold = binding.threshold;
            let state = self.states.entry(name.clone()).or_default();
            match trigger {
                ActionTrigger::Pressed => {
                    if down {
                        if !state.down {
                            state.pressed = true;
                        }
                        state.down = true;
                    } else {
                        state.down = false;
                        state.held = 0.0;
                    }
                }
                ActionTrigger::Released => {
                    if !down {
                        state.released = true;
                        state.down = false;
                        state.held = 0.0;
                    }
                }
                ActionTrigger::Held => {
                    if down {
                        state.down = true;
                    }
                }
                ActionTrigger::Repeat => {}
                ActionTrigger::AxisPos => {
                    if value > threshold {
                        state.value = state.value.max(value);
                    }
                }
                ActionTrigger::AxisNeg => {
                    if value < -threshold {
                        state.value = state.value.min(value);
                    }
                }
            }
        }
    }

    /// Increment `held` for every currently-down action. Call once per
    /// frame before game logic polls state.
    pub fn tick_holds(&mut self, dt: f32) {
        for state in self.states.values_mut() {
            if state.down {
                state.held += dt;
            }
        }
    }

    /// Clear one-frame edge flags and reset analog accumulation. `down` is
    /// left latched until an explicit release edge clears it. Call at the
    /// end of every frame.
    pub fn decay(&mut self) {
        for state in self.states.values_mut() {
            state.pressed = false;
            state.released = false;
            state.value = 0.0;
        }
    }

    /// True only on the action's rising edge this frame.
    pub fn pressed(&self, action: &str) -> bool {
        self.states.get(action).is_some_and(|s| s.pressed)
    }

    /// True only on the action's falling edge this frame.
    pub fn released(&self, action: &str) -> bool {
        self.states.get(action).is_some_and(|s| s.released)
    }

    /// True for the whole duration the action is held.
    pub fn down(&self, action: &str) -> bool {
        self.states.get(action).is_some_and(|s| s.down)
    }

    /// Aggregated analog value for the action this frame.
    pub fn value(&self, action: &str) -> f32 {
        self.states.get(action).map(|s| s.value).unwrap_or(0.0)
    }

    /// Seconds the action has been held, if currently down.
    pub fn held_secs(&self, action: &str) -> f32 {
        self.states.get(action).map(|s| s.held).unwrap_or(0.0)
    }
}

/// `PostUpdate` system: ticks action hold durations. Runs before
/// [`decay_actions`].
pub fn tick_action_holds(mut actions: bevy::prelude::ResMut<ActionBindings>, time: bevy::prelude::Res<bevy::prelude::Time>) {
    actions.tick_holds(time.delta_secs());
}

/// `PostUpdate` system: clears one-frame action edge flags. Equivalent to
/// the integration API's `finalize_frame`.
pub fn decay_actions(mut actions: bevy::prelude::ResMut<ActionBindings>) {
    actions.decay();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_device_round_trips_through_display_and_from_str() {
        for device in [InputDevice::Keyboard, InputDevice::Mouse, InputDevice::GamepadButton, InputDevice::GamepadAxis] {
            let parsed: InputDevice = device.to_string().parse().unwrap();
            assert_eq!(parsed, device);
        }
        assert_eq!("bluetooth_glove".parse::<InputDevice>(), Err(InputError::UnknownBindingName("bluetooth_glove".to_string())));
    }

    #[test]
    fn action_trigger_round_trips_through_display_and_from_str() {
        for trigger in [
            ActionTrigger::Pressed,
            ActionTrigger::Released,
            ActionTrigger::Held,
            ActionTrigger::Repeat,
            ActionTrigger::AxisPos,
            ActionTrigger::AxisNeg,
        ] {
            let parsed: ActionTrigger = trigger.to_string().parse().unwrap();
            assert_eq!(parsed, trigger);
        }
    }

    #[test]
    fn bind_dispatch_and_clear_round_trip() {
        let mut actions = ActionBindings::new();
        actions.bind("jump", ActionBinding::new(InputDevice::Keyboard, KeyCode::Space as i32, ActionTrigger::Pressed));

        actions.dispatch_raw(InputDevice::Keyboard, KeyCode::Space as i32, true, 0.0);
        assert!(actions.pressed("jump"));
        assert!(actions.down("jump"));

        actions.decay();
        assert!(!actions.pressed("jump"));
        assert!(actions.down("jump"));

        actions.dispatch_raw(InputDevice::Keyboard, KeyCode::Space as i32, false, 0.0);
        assert!(!actions.down("jump"));

        actions.clear("jump");
        actions.dispatch_raw(InputDevice::Keyboard, KeyCode::Space as i32, true, 0.0);
        assert!(!actions.pressed("jump"));
    }

    #[test]
    fn context_gating() {
        let mut actions = ActionBindings::new();
        actions.set_context("menu");
        actions.bind(
            "fire",
            ActionBinding::new(InputDevice::Mouse, 0, ActionTrigger::Pressed).in_context("gameplay"),
        );
        actions.dispatch_raw(InputDevice::Mouse, 0, true, 0.0);
        assert!(!actions.pressed("fire"), "gameplay-scoped binding must not fire in menu context");

        actions.set_context("gameplay");
        actions.dispatch_raw(InputDevice::Mouse, 0, true, 0.0);
        assert!(actions.pressed("fire"));
    }

    #[test]
    fn axis_triggers_track_extremes() {
        let mut actions = ActionBindings::new();
        actions.bind("aim_right", ActionBinding::new(InputDevice::GamepadAxis, 0, ActionTrigger::AxisPos));
        actions.dispatch_raw(InputDevice::GamepadAxis, 0, true, 0.8);
        actions.dispatch_raw(InputDevice::GamepadAxis, 0, true, 0.3);
        assert_eq!(actions.value("aim_right"), 0.8);
    }

    #[test]
    fn rebind_captures_next_raw_event_instead_of_dispatching() {
        let mut actions = ActionBindings::new();
        actions.bind("jump", ActionBinding::new(InputDevice::Keyboard, KeyCode::Space as i32, ActionTrigger::Pressed));
        let captured = std::sync::Arc::new(std::sync::Mutex::new(None));
        let captured2 = captured.clone();
        actions.start_rebind("jump", move |ok, binding| {
            *captured2.lock().unwrap() = Some((ok, binding));
        });
        actions.dispatch_raw(InputDevice::Keyboard, KeyCode::Enter as i32, true, 0.0);
        assert!(!actions.pressed("jump"), "rebind must consume the event, not dispatch it");
        assert!(captured.lock().unwrap().is_some());
    }
}
