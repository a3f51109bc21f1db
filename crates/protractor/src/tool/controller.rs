//! Pointer/keyboard driven state machine for the protractor tool.
//!
//! Handlers only mutate [`ProtractorState`]; writes to the store happen in the
//! explicit checkpoints (`release`, `apply_settings`, `import`, reset), never
//! during a drag.

use super::input::{Button, Key, PointerEvent};
use super::model::{Handle, ProtractorState, persisted_ring_radius};
use super::{
    ARM_COUNT, DEFAULT_ARM_ANGLES, FACTORY_ARM_RADIUS, RESET_ARM_ANGLES, RESET_KEY,
    RESET_RING_RADIUS, SNAP_TOGGLE_KEY, default_arm_color,
};
use crate::config::{ConfigRecord, Mode, Settings, arm_key, color_hex, read_integer};
use crate::geometry::{self, Point};
use crate::overlay::{self, Bounds, DrawCommand};
use crate::store::SettingsStore;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoldToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Default,
    Move,
    Resize,
    Crosshair,
    Grab,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Feedback {
    pub cursor: CursorShape,
    pub tooltip: String,
}

/// Requests for the host. The controller never talks to the toolkit itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartHoldTimer { token: HoldToken, delay: Duration },
    CancelHoldTimer(HoldToken),
    ShowContextMenu(Point),
    OpenSettings,
    Feedback(Feedback),
    Status(String),
    Deactivated,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub should_redraw: bool,
    /// The overlay bounding circle moved or resized; query `Controller::bounds`.
    pub bounds_changed: bool,
    pub effects: Vec<Effect>,
}

impl Response {
    pub fn has_effect(&self, pred: impl Fn(&Effect) -> bool) -> bool {
        self.effects.iter().any(pred)
    }
}

#[derive(Debug, Clone, Copy)]
struct HoldGesture {
    token: HoldToken,
    origin: Point,
}

pub struct Controller<S: SettingsStore> {
    state: ProtractorState,
    store: S,
    last_pointer: Option<Point>,
    hold: Option<HoldGesture>,
    next_token: u64,
    active: bool,
}

impl<S: SettingsStore> Controller<S> {
    pub fn new(store: S) -> Self {
        let settings = Settings::from_record(&store.snapshot());
        log::debug!(
            "Protractor settings loaded (mode {}, ring {}px)",
            settings.mode,
            settings.ring_radius
        );
        Self {
            state: ProtractorState::new(settings),
            store,
            last_pointer: None,
            hold: None,
            next_token: 0,
            active: false,
        }
    }

    pub fn state(&self) -> &ProtractorState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_placed(&self) -> bool {
        self.state.center.is_some()
    }

    pub fn render(&self) -> Vec<DrawCommand> {
        overlay::render(&self.state, self.active)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        overlay::bounds(&self.state)
    }

    fn respond(&mut self, f: impl FnOnce(&mut Self, &mut Response)) -> Response {
        let before = self.bounds();
        let mut response = Response::default();
        f(self, &mut response);
        if self.bounds() != before {
            response.bounds_changed = true;
            response.should_redraw = true;
        }
        response
    }

    // ---------------------------------------------------------------------
    // Lifecycle

    pub fn activate(&mut self) -> Response {
        self.respond(|this, r| {
            this.active = true;
            r.should_redraw = this.is_placed();
        })
    }

    /// Stops every in-flight interaction but keeps the placement.
    pub fn deactivate(&mut self) -> Response {
        self.respond(|this, r| {
            this.cancel_hold(r);
            this.state.active_handle = Handle::None;
            this.state.hover_handle = Handle::None;
            this.state.is_free_mode = false;
            this.last_pointer = None;
            this.active = false;
            r.should_redraw = this.is_placed();
        })
    }

    // ---------------------------------------------------------------------
    // Pointer

    pub fn press(&mut self, event: PointerEvent) -> Response {
        self.respond(|this, r| this.handle_press(event, r))
    }

    fn handle_press(&mut self, event: PointerEvent, r: &mut Response) {
        if self.state.center.is_none() {
            self.place(event.pos);
            r.should_redraw = true;
            return;
        }

        let pos = event.pos;
        let on_center = self.state.on_center(pos);

        if event.button == Button::Secondary {
            if on_center {
                self.begin_drag(Handle::RingResize, pos, r);
                return;
            }
            if self.state.on_ring(pos) {
                r.effects.push(Effect::ShowContextMenu(pos));
                return;
            }
        }

        if on_center && event.button == Button::Primary {
            self.begin_drag(Handle::CenterMove, pos, r);
            self.start_hold(pos, r);
            return;
        }

        if let Some(handle) = self.state.closest_arm_hit(pos) {
            self.begin_drag(handle, pos, r);
        } else if self.state.on_ring(pos) {
            self.begin_drag(Handle::RotateBoth, pos, r);
        }
    }

    fn place(&mut self, pos: Point) {
        self.state.center = Some(pos);

        let persisted = self.store.snapshot();
        if let Some(ring) = persisted_ring_radius(&persisted) {
            self.state.set_ring_radius(ring as f64);
        }
        self.state.ensure_arms(&persisted);
        let (mode, count) = (self.state.settings.mode, self.state.settings.multi_sector_count);
        self.state.apply_mode_preset(mode, count);
        self.state.restore_arms(&persisted, true);

        log::debug!("Protractor placed at ({:.0}, {:.0})", pos.x, pos.y);
    }

    fn begin_drag(&mut self, handle: Handle, pos: Point, r: &mut Response) {
        log::debug!("Drag start: {:?}", handle);
        self.state.active_handle = handle;
        self.last_pointer = Some(pos);
        r.should_redraw = true;
    }

    fn start_hold(&mut self, origin: Point, r: &mut Response) {
        self.next_token += 1;
        let token = HoldToken(self.next_token);
        self.hold = Some(HoldGesture { token, origin });
        r.effects.push(Effect::StartHoldTimer {
            token,
            delay: self.state.settings.hold_delay(),
        });
    }

    fn cancel_hold(&mut self, r: &mut Response) {
        if let Some(hold) = self.hold.take() {
            r.effects.push(Effect::CancelHoldTimer(hold.token));
        }
    }

    pub fn motion(&mut self, event: PointerEvent) -> Response {
        self.respond(|this, r| this.handle_motion(event, r))
    }

    fn handle_motion(&mut self, event: PointerEvent, r: &mut Response) {
        let Some(center) = self.state.center else {
            return;
        };
        let pos = event.pos;

        if self.state.active_handle == Handle::None {
            self.update_hover(pos, r);
            return;
        }

        if let Some(hold) = self.hold {
            if pos.distance(hold.origin) <= self.state.settings.hold_cancel_threshold_px as f64 {
                return;
            }
            self.cancel_hold(r);
        }

        self.state.is_free_mode = event.modifiers.shift;
        let snap_on = self.state.settings.snap_enabled && !self.state.is_free_mode;
        let step = self.state.settings.snap_step_deg as f64;

        match self.state.active_handle {
            Handle::None => return,
            Handle::CenterMove => self.state.center = Some(pos),
            Handle::RingResize => {
                let Some(last) = self.last_pointer else {
                    return;
                };
                let delta = ((last.y - pos.y) / 2.0).trunc();
                if delta == 0.0 {
                    return;
                }
                self.state.set_ring_radius(self.state.ring_radius + delta);
                self.last_pointer = Some(pos);
            }
            Handle::ArmRotate(idx) => {
                let angle = geometry::snap(geometry::bearing(center, pos), step, snap_on);
                if let Some(arm) = self.state.arms.get_mut(idx) {
                    arm.angle_deg = geometry::normalize_deg(angle);
                }
            }
            Handle::RotateBoth => {
                let Some(last) = self.last_pointer else {
                    return;
                };
                let raw = geometry::signed_delta_deg(
                    geometry::bearing(center, pos) - geometry::bearing(center, last),
                );
                let delta = geometry::snap(raw, step, snap_on);
                if delta == 0.0 {
                    return;
                }
                for arm in self.state.arms.iter_mut().filter(|a| a.enabled && a.rotatable) {
                    arm.angle_deg = geometry::normalize_deg(arm.angle_deg + delta);
                }
                self.last_pointer = Some(pos);
            }
            Handle::ArmResize(idx) => self.state.set_arm_radius(idx, center.distance(pos)),
        }
        r.should_redraw = true;
    }

    fn update_hover(&mut self, pos: Point, r: &mut Response) {
        let hover = self.state.hit_test(pos);
        if hover == self.state.hover_handle {
            return;
        }
        self.state.hover_handle = hover;
        r.should_redraw = true;
        r.effects.push(Effect::Feedback(self.feedback(hover)));
    }

    fn feedback(&self, handle: Handle) -> Feedback {
        let arm_id = |idx: usize| {
            self.state
                .arms
                .get(idx)
                .map(|a| a.id.to_string())
                .unwrap_or_default()
        };
        let (cursor, tooltip) = match handle {
            Handle::None => (CursorShape::Default, String::new()),
            Handle::CenterMove => (
                CursorShape::Move,
                "Move Protractor (Hold = Settings)".to_string(),
            ),
            Handle::ArmResize(idx) => (CursorShape::Resize, format!("Resize Arm {}", arm_id(idx))),
            Handle::ArmRotate(idx) => (
                CursorShape::Crosshair,
                format!("Rotate Arm {} (Shift = Free)", arm_id(idx)),
            ),
            Handle::RotateBoth | Handle::RingResize => (
                CursorShape::Grab,
                "Rotate Both Arms / Resize Ring (RMB)".to_string(),
            ),
        };
        Feedback { cursor, tooltip }
    }

    pub fn release(&mut self, _event: PointerEvent) -> Response {
        self.respond(|this, r| {
            this.cancel_hold(r);
            if this.state.active_handle != Handle::None {
                log::debug!("Drag end: {:?}", this.state.active_handle);
            }
            this.state.active_handle = Handle::None;
            this.state.is_free_mode = false;
            this.last_pointer = None;
            r.should_redraw = true;

            if this.is_placed() {
                this.flush_geometry();
            }
        })
    }

    /// Fired by the host's one-shot timer. Tokens from an ended gesture are
    /// ignored.
    pub fn hold_elapsed(&mut self, token: HoldToken) -> Response {
        self.respond(|this, r| {
            match this.hold {
                Some(hold) if hold.token == token => {}
                _ => {
                    log::debug!("Ignoring stale hold timer {:?}", token);
                    return;
                }
            }
            this.hold = None;
            this.state.active_handle = Handle::None;
            this.last_pointer = None;
            r.effects.push(Effect::OpenSettings);
            r.should_redraw = true;
        })
    }

    // ---------------------------------------------------------------------
    // Keyboard

    pub fn key_press(&mut self, key: Key) -> Response {
        self.respond(|this, r| match key {
            Key::Char(c) if c.eq_ignore_ascii_case(&SNAP_TOGGLE_KEY) => {
                let settings = &mut this.state.settings;
                settings.snap_enabled = !settings.snap_enabled;
                let label = if settings.snap_enabled { "ON" } else { "OFF" };
                r.effects.push(Effect::Status(format!(
                    "Protractor Snap {} ({}°)",
                    label, settings.snap_step_deg
                )));
                r.should_redraw = true;
            }
            Key::Char(c) if c.eq_ignore_ascii_case(&RESET_KEY) && this.is_placed() => {
                this.reset_geometry();
                r.should_redraw = true;
            }
            Key::Escape if this.is_placed() => this.clear_placement(r),
            _ => {}
        })
    }

    fn reset_geometry(&mut self) {
        let ring = self
            .store
            .get("ring_radius")
            .as_ref()
            .and_then(read_integer)
            .unwrap_or(RESET_RING_RADIUS);
        self.state.set_ring_radius(ring as f64);

        let radii = [
            self.state.settings.arm_a_radius,
            self.state.settings.arm_b_radius,
        ];
        for (idx, (radius, angle)) in radii.into_iter().zip(RESET_ARM_ANGLES).enumerate() {
            self.state.set_arm_radius(idx, radius as f64);
            if let Some(arm) = self.state.arms.get_mut(idx) {
                arm.angle_deg = angle;
            }
        }
    }

    /// Removes the protractor, as Escape does.
    pub fn clear(&mut self) -> Response {
        self.respond(|this, r| {
            if this.is_placed() {
                this.clear_placement(r);
            }
        })
    }

    fn clear_placement(&mut self, r: &mut Response) {
        log::debug!("Protractor cleared");
        self.state.center = None;
        self.cancel_hold(r);
        self.state.active_handle = Handle::None;
        self.state.hover_handle = Handle::None;
        self.state.is_free_mode = false;
        self.last_pointer = None;
        self.active = false;
        r.effects.push(Effect::Deactivated);
        r.should_redraw = true;
    }

    // ---------------------------------------------------------------------
    // Configuration

    /// Re-computes the enabled arms for `mode` without touching settings.
    pub fn apply_mode_preset(&mut self, mode: Mode, sector_count: u32) -> Response {
        self.respond(|this, r| {
            let persisted = this.store.snapshot();
            this.state.ensure_arms(&persisted);
            this.state.apply_mode_preset(mode, sector_count);
            r.should_redraw = true;
        })
    }

    /// Merges a partial configuration record into the live state and
    /// persists the result.
    pub fn apply_settings(&mut self, partial: &ConfigRecord) -> Response {
        self.respond(|this, r| {
            this.merge_settings(partial);
            this.flush_all();
            r.should_redraw = true;
        })
    }

    fn merge_settings(&mut self, partial: &ConfigRecord) {
        let old_mode = self.state.settings.mode;
        let old_count = self.state.settings.multi_sector_count;

        self.state.settings.merge(partial);
        if let Some(ring) = persisted_ring_radius(partial) {
            self.state.ring_radius = ring as f64;
        }

        let persisted = self.store.snapshot();
        self.state.ensure_arms(&persisted);
        self.state.clamp_geometry();
        self.state.apply_arm_colors(partial);

        let (mode, count) = (self.state.settings.mode, self.state.settings.multi_sector_count);
        if mode != old_mode || (mode == Mode::Multi && count != old_count) {
            log::info!(
                "Protractor mode {} -> {} ({} arms)",
                old_mode,
                mode,
                self.state.settings.active_arm_count()
            );
            self.state.apply_mode_preset(mode, count);
        }

        self.state.restore_arms(partial, false);
    }

    /// Persists and live-applies an imported record.
    pub fn import(&mut self, record: &ConfigRecord) -> Response {
        if let Err(e) = self.store.write(record) {
            log::warn!("Failed to persist imported settings: {}", e);
        }
        log::info!("Imported {} setting(s)", record.len());
        self.apply_settings(record)
    }

    /// Everything persisted, refreshed with the live state. Overridden keys
    /// keep their stored value.
    pub fn export_record(&self) -> ConfigRecord {
        let mut record = self.store.stored();
        for (key, value) in self.full_record().iter() {
            if !self.store.is_overridden(key) {
                record.insert(key.clone(), value.clone());
            }
        }
        record
    }

    /// Replaces the store with factory defaults and applies them live.
    pub fn reset_to_defaults(&mut self) -> Response {
        let defaults = factory_record(&Settings::default());
        if let Err(e) = self.store.replace(defaults.clone()) {
            log::warn!("Failed to reset stored settings: {}", e);
        }
        log::info!("Protractor settings reset to defaults");
        self.apply_settings(&defaults)
    }

    // ---------------------------------------------------------------------
    // Persistence checkpoints

    fn persist(&mut self, record: &ConfigRecord) {
        if let Err(e) = self.store.write(record) {
            log::warn!("Failed to persist protractor settings: {}", e);
        }
    }

    fn flush_geometry(&mut self) {
        let mut record = self.state.geometry_snapshot();
        record.insert(
            "ring_radius".to_string(),
            Value::from(self.state.ring_radius.round() as i64),
        );
        self.persist(&record);
    }

    fn full_record(&self) -> ConfigRecord {
        let mut record = self.state.settings.to_record();
        record.insert(
            "ring_radius".to_string(),
            Value::from(self.state.ring_radius.round() as i64),
        );
        record.extend_from(&self.state.arm_snapshot());
        record
    }

    fn flush_all(&mut self) {
        let record = self.full_record();
        self.persist(&record);
    }
}

/// Default settings plus the default arm snapshot.
pub fn factory_record(settings: &Settings) -> ConfigRecord {
    let mut record = settings.to_record();
    let (min, max) = settings.arm_bounds();
    let radius = geometry::clamp(FACTORY_ARM_RADIUS, min, max).round() as i64;
    for idx in 0..ARM_COUNT {
        record.insert(arm_key(idx, "angle"), Value::from(DEFAULT_ARM_ANGLES[idx]));
        record.insert(arm_key(idx, "radius"), Value::from(radius));
        record.insert(arm_key(idx, "enabled"), Value::from(idx < 2));
        record.insert(
            arm_key(idx, "color"),
            Value::from(color_hex(default_arm_color(idx))),
        );
    }
    record
}
