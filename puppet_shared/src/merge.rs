//! Input merge state machine.
//!
//! Reconciles the last-known local (keyboard) and remote (mobile) input
//! into one smoothed direction and one edge-triggered interact pulse per
//! tick. Single-writer by construction: only the tick consumer calls
//! [`InputMergeState::apply`] and [`InputMergeState::tick`], so the hot
//! merge path needs no locking.
//!
//! Per tick, in fixed order:
//! 1. Recompute and smooth the keyboard target (when local input is on).
//! 2. Mobile overrides keyboard: `final = mobile` if `|mobile| > 0.1`,
//!    else the smoothed keyboard value.
//! 3. Smooth the final value the same way (accelerate toward it, or decay
//!    toward zero below the dead-zone).
//! 4. Latch at most one interact pulse, mobile taking precedence; both
//!    pending flags re-arm cleared.
//!
//! The same 0.1 dead-zone decides both "is there mobile input" and "is
//! there keyboard input"; the remote operator always wins over local test
//! input.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::RemoteCommand;
use crate::math::Vec2;

/// Dead-zone threshold, used both for "is there mobile input" and "is
/// there keyboard input".
pub const INPUT_EPSILON: f32 = 0.1;

/// Lerp rates for input transitions, in units of 1/second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    #[serde(default = "default_acceleration")]
    pub acceleration: f32,
    #[serde(default = "default_deceleration")]
    pub deceleration: f32,
}

fn default_acceleration() -> f32 {
    10.0
}

fn default_deceleration() -> f32 {
    15.0
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            acceleration: default_acceleration(),
            deceleration: default_deceleration(),
        }
    }
}

/// Raw directional keys held this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardSample {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl KeyboardSample {
    /// Combines the axes into a target vector. Left wins over right and up
    /// over down when opposing keys are held; diagonals are normalized.
    pub fn target(self) -> Vec2 {
        let mut target = Vec2::ZERO;
        if self.left {
            target.x = -1.0;
        } else if self.right {
            target.x = 1.0;
        }
        if self.up {
            target.y = 1.0;
        } else if self.down {
            target.y = -1.0;
        }
        if target.x != 0.0 && target.y != 0.0 {
            target = target.normalized();
        }
        target
    }
}

/// Last-known local and remote input plus smoothing state.
///
/// Created once at startup; lives for the session. Mobile input persists
/// across ticks until overwritten by a new `Move` — a remote client that
/// disconnects mid-motion keeps the character moving unless the optional
/// idle timeout is configured.
#[derive(Debug)]
pub struct InputMergeState {
    smoothing: Smoothing,
    keyboard_enabled: bool,
    mobile_idle_timeout: Option<f32>,

    keyboard_target: Vec2,
    keyboard_current: Vec2,
    mobile_input: Vec2,
    final_input: Vec2,
    current_input: Vec2,

    mobile_interact_pending: bool,
    keyboard_interact_pending: bool,
    interact_pulse: bool,

    time_since_mobile: f32,
}

impl InputMergeState {
    pub fn new(smoothing: Smoothing, keyboard_enabled: bool, mobile_idle_timeout: Option<f32>) -> Self {
        Self {
            smoothing,
            keyboard_enabled,
            mobile_idle_timeout,
            keyboard_target: Vec2::ZERO,
            keyboard_current: Vec2::ZERO,
            mobile_input: Vec2::ZERO,
            final_input: Vec2::ZERO,
            current_input: Vec2::ZERO,
            mobile_interact_pending: false,
            keyboard_interact_pending: false,
            interact_pulse: false,
            time_since_mobile: 0.0,
        }
    }

    /// Applies one drained command. `Move` is last-write-wins.
    pub fn apply(&mut self, command: RemoteCommand) {
        match command {
            RemoteCommand::Move { x, y } => {
                self.mobile_input = Vec2::new(x, y);
                self.time_since_mobile = 0.0;
            }
            RemoteCommand::Interact => self.mobile_interact_pending = true,
        }
    }

    /// Registers a local interact key edge. Ignored while keyboard input
    /// is disabled.
    pub fn press_keyboard_interact(&mut self) {
        if self.keyboard_enabled {
            self.keyboard_interact_pending = true;
        }
    }

    /// Advances one tick. Called after the drain, before consumers read.
    pub fn tick(&mut self, keys: KeyboardSample, dt: f32) {
        if let Some(timeout) = self.mobile_idle_timeout {
            self.time_since_mobile += dt;
            if self.time_since_mobile > timeout && self.mobile_input != Vec2::ZERO {
                debug!(idle_secs = self.time_since_mobile, "mobile input idle, zeroing");
                self.mobile_input = Vec2::ZERO;
            }
        }

        if self.keyboard_enabled {
            self.keyboard_target = keys.target();
            self.keyboard_current = if self.keyboard_target.len() > INPUT_EPSILON {
                self.keyboard_current
                    .lerp(self.keyboard_target, self.smoothing.acceleration * dt)
            } else {
                self.keyboard_current
                    .lerp(Vec2::ZERO, self.smoothing.deceleration * dt)
            };
        }

        self.final_input = if self.mobile_input.len() > INPUT_EPSILON {
            self.mobile_input
        } else {
            self.keyboard_current
        };

        self.current_input = if self.final_input.len() > INPUT_EPSILON {
            self.current_input
                .lerp(self.final_input, self.smoothing.acceleration * dt)
        } else {
            self.current_input
                .lerp(Vec2::ZERO, self.smoothing.deceleration * dt)
        };

        if self.mobile_interact_pending {
            self.interact_pulse = true;
        } else {
            self.interact_pulse = self.keyboard_interact_pending;
        }
        self.mobile_interact_pending = false;
        self.keyboard_interact_pending = false;
    }

    /// The frame's smoothed direction, length-clamped to 1.
    pub fn current_direction(&self) -> Vec2 {
        self.current_input.clamp_len(1.0)
    }

    /// True at most once per tick; reading consumes the pulse.
    pub fn consume_interact_pulse(&mut self) -> bool {
        std::mem::take(&mut self.interact_pulse)
    }

    pub fn mobile_input(&self) -> Vec2 {
        self.mobile_input
    }

    pub fn final_input(&self) -> Vec2 {
        self.final_input
    }

    pub fn keyboard_current(&self) -> Vec2 {
        self.keyboard_current
    }
}

impl Default for InputMergeState {
    fn default() -> Self {
        Self::new(Smoothing::default(), true, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn held(left: bool, right: bool, up: bool, down: bool) -> KeyboardSample {
        KeyboardSample {
            left,
            right,
            up,
            down,
        }
    }

    #[test]
    fn mobile_overrides_keyboard_above_dead_zone() {
        let mut state = InputMergeState::default();
        // Build up some keyboard motion first.
        for _ in 0..30 {
            state.tick(held(false, true, false, false), DT);
        }
        assert!(state.keyboard_current().len() > INPUT_EPSILON);

        state.apply(RemoteCommand::Move { x: 0.0, y: -0.8 });
        state.tick(held(false, true, false, false), DT);
        assert_eq!(state.final_input(), Vec2::new(0.0, -0.8));
    }

    #[test]
    fn sub_dead_zone_mobile_falls_back_to_keyboard() {
        let mut state = InputMergeState::default();
        for _ in 0..30 {
            state.tick(held(false, true, false, false), DT);
        }
        let keyboard = state.keyboard_current();
        assert!(keyboard.len() > INPUT_EPSILON);

        // |(0.05, 0.02)| <= 0.1, so the joystick is treated as released.
        state.apply(RemoteCommand::Move { x: 0.05, y: 0.02 });
        state.tick(held(false, true, false, false), DT);
        assert_eq!(state.mobile_input(), Vec2::new(0.05, 0.02));
        assert_eq!(state.final_input(), state.keyboard_current());
    }

    #[test]
    fn last_move_wins_within_one_drain() {
        let mut state = InputMergeState::default();
        state.apply(RemoteCommand::Move { x: 1.0, y: 0.0 });
        state.apply(RemoteCommand::Move { x: 0.0, y: 1.0 });
        state.tick(KeyboardSample::default(), DT);
        assert_eq!(state.mobile_input(), Vec2::new(0.0, 1.0));
        assert_eq!(state.final_input(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn mobile_input_persists_across_ticks() {
        let mut state = InputMergeState::default();
        state.apply(RemoteCommand::Move { x: 0.6, y: 0.0 });
        for _ in 0..120 {
            state.tick(KeyboardSample::default(), DT);
        }
        assert_eq!(state.final_input(), Vec2::new(0.6, 0.0));
    }

    #[test]
    fn interact_pulse_fires_once_and_clears_both_flags() {
        let mut state = InputMergeState::default();
        state.apply(RemoteCommand::Interact);
        state.press_keyboard_interact();

        state.tick(KeyboardSample::default(), DT);
        assert!(state.consume_interact_pulse());
        assert!(!state.consume_interact_pulse());

        // Both flags were cleared; nothing re-fires on the next tick.
        state.tick(KeyboardSample::default(), DT);
        assert!(!state.consume_interact_pulse());
    }

    #[test]
    fn unconsumed_pulse_does_not_leak_into_next_tick() {
        let mut state = InputMergeState::default();
        state.apply(RemoteCommand::Interact);
        state.tick(KeyboardSample::default(), DT);
        // Consumer missed this frame's pulse.
        state.tick(KeyboardSample::default(), DT);
        assert!(!state.consume_interact_pulse());
    }

    #[test]
    fn keyboard_interact_fires_without_mobile() {
        let mut state = InputMergeState::default();
        state.press_keyboard_interact();
        state.tick(KeyboardSample::default(), DT);
        assert!(state.consume_interact_pulse());
    }

    #[test]
    fn keyboard_accelerates_then_decays() {
        let mut state = InputMergeState::default();
        for _ in 0..60 {
            state.tick(held(false, true, false, false), DT);
        }
        assert!((state.keyboard_current().x - 1.0).abs() < 0.01);

        for _ in 0..120 {
            state.tick(KeyboardSample::default(), DT);
        }
        assert!(state.keyboard_current().len() < 0.01);
        assert!(state.current_direction().len() < 0.01);
    }

    #[test]
    fn diagonal_keyboard_target_is_normalized() {
        let target = held(false, true, true, false).target();
        assert!((target.len() - 1.0).abs() < 1e-6);
        assert!(target.x > 0.0 && target.y > 0.0);
    }

    #[test]
    fn opposing_keys_prefer_left_and_up() {
        assert_eq!(held(true, true, false, false).target(), Vec2::new(-1.0, 0.0));
        assert_eq!(held(false, false, true, true).target(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn disabled_keyboard_ignores_keys_and_interact() {
        let mut state = InputMergeState::new(Smoothing::default(), false, None);
        state.press_keyboard_interact();
        for _ in 0..30 {
            state.tick(held(false, true, false, false), DT);
        }
        assert_eq!(state.keyboard_current(), Vec2::ZERO);
        assert!(!state.consume_interact_pulse());
    }

    #[test]
    fn idle_timeout_zeroes_stale_mobile_input() {
        let mut state = InputMergeState::new(Smoothing::default(), true, Some(0.5));
        state.apply(RemoteCommand::Move { x: 1.0, y: 0.0 });
        state.tick(KeyboardSample::default(), 0.3);
        assert_eq!(state.mobile_input(), Vec2::new(1.0, 0.0));

        // A fresh move resets the idle clock.
        state.apply(RemoteCommand::Move { x: 0.8, y: 0.0 });
        state.tick(KeyboardSample::default(), 0.3);
        assert_eq!(state.mobile_input(), Vec2::new(0.8, 0.0));

        state.tick(KeyboardSample::default(), 0.3);
        assert_eq!(state.mobile_input(), Vec2::ZERO);
        assert_eq!(state.final_input(), Vec2::ZERO);
    }

    #[test]
    fn direction_is_length_clamped() {
        let mut state = InputMergeState::default();
        state.apply(RemoteCommand::Move { x: 3.0, y: 4.0 });
        for _ in 0..120 {
            state.tick(KeyboardSample::default(), DT);
        }
        // Raw merge state keeps the oversized vector; consumers see it capped.
        assert_eq!(state.final_input(), Vec2::new(3.0, 4.0));
        assert!(state.current_direction().len() <= 1.0 + 1e-6);
    }
}
