use super::{ARM_COUNT, DEFAULT_ARM_ANGLES, default_arm_color};
use crate::config::{
    ARM_COLOR_KEYS, Color, ConfigRecord, FieldValue, Mode, Settings, arm_key, color_hex,
    read_float, read_integer,
};
use crate::geometry::{self, Point};
use serde_json::Value;
use strum::{Display as StrumDisplay, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, StrumDisplay)]
pub enum ArmId {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl ArmId {
    pub fn as_index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub id: ArmId,
    /// Bearing in [0, 360), 0 = screen-up, clockwise positive.
    pub angle_deg: f64,
    pub radius_px: f64,
    pub color: Color,
    pub enabled: bool,
    pub rotatable: bool,
    initialized_multi: bool,
}

impl Arm {
    pub fn preset(id: ArmId, radius_px: f64) -> Self {
        let idx = id.as_index();
        Self {
            id,
            angle_deg: DEFAULT_ARM_ANGLES[idx],
            radius_px,
            color: default_arm_color(idx),
            enabled: false,
            rotatable: true,
            initialized_multi: false,
        }
    }

    pub fn index(&self) -> usize {
        self.id.as_index()
    }

    /// Applies the persisted `arm_{i}_*` keys present in `record`.
    fn restore(&mut self, record: &ConfigRecord, arm_bounds: (f64, f64)) {
        let idx = self.index();
        if let Some(enabled) = record.get(&arm_key(idx, "enabled")).and_then(bool::read) {
            self.enabled = enabled;
        }
        if let Some(angle) = record.get(&arm_key(idx, "angle")).and_then(read_float) {
            self.angle_deg = geometry::normalize_deg(angle);
        }
        if let Some(radius) = record.get(&arm_key(idx, "radius")).and_then(read_float) {
            self.radius_px = geometry::clamp(radius, arm_bounds.0, arm_bounds.1);
        }
        if let Some(color) = record.get(&arm_key(idx, "color")).and_then(Color::read) {
            self.color = color;
        }
    }
}

/// Current drag target or hover target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handle {
    #[default]
    None,
    CenterMove,
    RingResize,
    RotateBoth,
    ArmRotate(usize),
    ArmResize(usize),
}

impl Handle {
    pub fn arm_index(&self) -> Option<usize> {
        match self {
            Self::ArmRotate(i) | Self::ArmResize(i) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtractorState {
    /// `None` while nothing is placed.
    pub center: Option<Point>,
    pub ring_radius: f64,
    /// Empty until the first placement, then always `ARM_COUNT` slots.
    pub arms: Vec<Arm>,
    pub settings: Settings,
    pub active_handle: Handle,
    pub hover_handle: Handle,
    pub is_free_mode: bool,
}

impl ProtractorState {
    pub fn new(settings: Settings) -> Self {
        let (min, max) = settings.ring_bounds();
        Self {
            center: None,
            ring_radius: geometry::clamp(settings.ring_radius as f64, min, max),
            arms: Vec::new(),
            settings,
            active_handle: Handle::None,
            hover_handle: Handle::None,
            is_free_mode: false,
        }
    }

    pub fn arm_label(&self, index: usize) -> &str {
        self.settings.labels().get(index).copied().unwrap_or_default()
    }

    pub fn enabled_arms(&self) -> impl Iterator<Item = (usize, &Arm)> {
        self.arms.iter().enumerate().filter(|(_, a)| a.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled_arms().count()
    }

    /// Falls back to the ring radius for a radius that is not usable.
    pub fn arm_radius(&self, arm: &Arm) -> f64 {
        if arm.radius_px.is_finite() && arm.radius_px > 0.0 {
            arm.radius_px
        } else {
            self.ring_radius
        }
    }

    pub fn arm_endpoint(&self, arm: &Arm) -> Option<Point> {
        self.center
            .map(|c| geometry::endpoint(c, arm.angle_deg, self.arm_radius(arm)))
    }

    pub fn set_ring_radius(&mut self, radius: f64) {
        let (min, max) = self.settings.ring_bounds();
        self.ring_radius = geometry::clamp(radius, min, max);
    }

    pub fn set_arm_radius(&mut self, index: usize, radius: f64) {
        let (min, max) = self.settings.arm_bounds();
        if let Some(arm) = self.arms.get_mut(index) {
            arm.radius_px = geometry::clamp(radius, min, max);
        }
    }

    /// Re-applies the current bounds to every radius.
    pub fn clamp_geometry(&mut self) {
        self.set_ring_radius(self.ring_radius);
        for i in 0..self.arms.len() {
            let radius = self.arms[i].radius_px;
            self.set_arm_radius(i, radius);
        }
    }

    /// Creates the arm slots once, from persisted values or presets.
    pub fn ensure_arms(&mut self, persisted: &ConfigRecord) {
        if !self.arms.is_empty() {
            return;
        }
        let bounds = self.settings.arm_bounds();
        let radius = geometry::clamp(self.ring_radius, bounds.0, bounds.1);

        self.arms = ArmId::iter()
            .map(|id| {
                let mut arm = Arm::preset(id, radius);
                arm.restore(persisted, bounds);
                arm
            })
            .collect();
    }

    /// Overlays a persisted arm snapshot. With `reset_missing_radius`, an arm
    /// without a stored radius falls back to the ring radius.
    pub fn restore_arms(&mut self, persisted: &ConfigRecord, reset_missing_radius: bool) {
        let bounds = self.settings.arm_bounds();
        let ring = self.ring_radius;
        for arm in &mut self.arms {
            if reset_missing_radius && !persisted.contains_key(&arm_key(arm.index(), "radius")) {
                arm.radius_px = geometry::clamp(ring, bounds.0, bounds.1);
            }
            arm.restore(persisted, bounds);
        }
    }

    pub fn apply_arm_colors(&mut self, record: &ConfigRecord) {
        for (arm, key) in self.arms.iter_mut().zip(ARM_COLOR_KEYS) {
            if let Some(color) = record.get(key).and_then(Color::read) {
                arm.color = color;
            }
        }
    }

    /// Enables exactly the first `mode.active_arm_count(sector_count)` arms.
    /// Under MULTI, an arm revealed for the first time returns to its preset
    /// angle; later MULTI re-entries leave it where the user put it.
    pub fn apply_mode_preset(&mut self, mode: Mode, sector_count: u32) {
        let limit = mode.active_arm_count(sector_count);
        for (idx, arm) in self.arms.iter_mut().enumerate() {
            let was_enabled = arm.enabled;
            arm.enabled = idx < limit;
            if mode == Mode::Multi && arm.enabled && !arm.initialized_multi {
                if !was_enabled {
                    arm.angle_deg = DEFAULT_ARM_ANGLES[idx];
                }
                arm.initialized_multi = true;
            }
        }
    }

    pub fn on_center(&self, pos: Point) -> bool {
        self.center
            .is_some_and(|c| pos.distance(c) <= self.settings.hit_center_px as f64)
    }

    pub fn on_ring(&self, pos: Point) -> bool {
        self.center.is_some_and(|c| {
            geometry::ring_distance(pos, c, self.ring_radius) <= self.settings.hit_ring_px as f64
        })
    }

    /// Globally closest arm hit. An endpoint hit shadows the line of the same
    /// arm; across arms the literal distance decides.
    pub fn closest_arm_hit(&self, pos: Point) -> Option<Handle> {
        let center = self.center?;
        let hit_endpoint = self.settings.hit_endpoint_px as f64;
        let hit_line = self.settings.hit_arm_line_px as f64;

        let mut best: Option<(f64, Handle)> = None;
        for (idx, arm) in self.arms.iter().enumerate() {
            if !arm.enabled || !arm.rotatable {
                continue;
            }
            let end = geometry::endpoint(center, arm.angle_deg, self.arm_radius(arm));

            let d_end = pos.distance(end);
            let candidate = if d_end <= hit_endpoint {
                Some((d_end, Handle::ArmResize(idx)))
            } else {
                let d_line = geometry::point_to_segment_distance(pos, center, end);
                (d_line <= hit_line).then_some((d_line, Handle::ArmRotate(idx)))
            };

            if let Some((dist, handle)) = candidate
                && best.is_none_or(|(best_dist, _)| dist < best_dist)
            {
                best = Some((dist, handle));
            }
        }
        best.map(|(_, handle)| handle)
    }

    /// Button-independent priority: center, then arms, then ring.
    pub fn hit_test(&self, pos: Point) -> Handle {
        if self.center.is_none() {
            Handle::None
        } else if self.on_center(pos) {
            Handle::CenterMove
        } else if let Some(handle) = self.closest_arm_hit(pos) {
            handle
        } else if self.on_ring(pos) {
            Handle::RotateBoth
        } else {
            Handle::None
        }
    }

    /// Clockwise span from arm 0 to arm 1, only in NORMAL mode with both
    /// arms enabled.
    pub fn measured_span(&self) -> Option<f64> {
        if self.settings.mode != Mode::Normal {
            return None;
        }
        match (self.arms.first(), self.arms.get(1)) {
            (Some(a), Some(b)) if a.enabled && b.enabled => {
                Some(geometry::clockwise_span(a.angle_deg, b.angle_deg))
            }
            _ => None,
        }
    }

    /// Angle and radius of every enabled arm (the release checkpoint).
    pub fn geometry_snapshot(&self) -> ConfigRecord {
        let mut record = ConfigRecord::new();
        for (idx, arm) in self.enabled_arms() {
            record.insert(arm_key(idx, "angle"), Value::from(arm.angle_deg));
            record.insert(
                arm_key(idx, "radius"),
                Value::from(self.arm_radius(arm).round() as i64),
            );
        }
        record
    }

    /// Every attribute of every arm slot.
    pub fn arm_snapshot(&self) -> ConfigRecord {
        let (min, max) = self.settings.arm_bounds();
        let mut record = ConfigRecord::new();
        for (idx, arm) in self.arms.iter().enumerate() {
            let radius = geometry::clamp(self.arm_radius(arm), min, max);
            record.insert(arm_key(idx, "angle"), Value::from(arm.angle_deg));
            record.insert(arm_key(idx, "radius"), Value::from(radius.round() as i64));
            record.insert(arm_key(idx, "enabled"), Value::from(arm.enabled));
            record.insert(arm_key(idx, "color"), Value::from(color_hex(arm.color)));
            if let Some(key) = ARM_COLOR_KEYS.get(idx) {
                record.insert(key.to_string(), Value::from(color_hex(arm.color)));
            }
        }
        record
    }
}

/// Stored ring radius, if any, read leniently.
pub fn persisted_ring_radius(record: &ConfigRecord) -> Option<i64> {
    record.get("ring_radius").and_then(read_integer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn placed_state() -> ProtractorState {
        let mut state = ProtractorState::new(Settings::default());
        state.center = Some(Point::new(300.0, 300.0));
        state.ensure_arms(&ConfigRecord::new());
        state.apply_mode_preset(Mode::Normal, 3);
        state
    }

    fn enabled_indices(state: &ProtractorState) -> Vec<usize> {
        state.enabled_arms().map(|(i, _)| i).collect()
    }

    #[test]
    fn test_mode_preset_counts() {
        let mut state = placed_state();
        assert_eq!(enabled_indices(&state), vec![0, 1]);

        state.apply_mode_preset(Mode::SiteAudit, 6);
        assert_eq!(enabled_indices(&state), vec![0, 1, 2]);

        for n in 3..=6 {
            state.apply_mode_preset(Mode::Multi, n);
            assert_eq!(enabled_indices(&state), (0..n as usize).collect::<Vec<_>>());
        }

        state.apply_mode_preset(Mode::Normal, 6);
        assert_eq!(state.enabled_count(), 2);
    }

    #[test]
    fn test_multi_resets_revealed_arm_once() {
        let mut state = placed_state();
        state.arms[0].angle_deg = 33.0;
        state.arms[3].angle_deg = 10.0;

        state.apply_mode_preset(Mode::Multi, 4);
        assert_eq!(state.arms[0].angle_deg, 33.0);
        assert_eq!(state.arms[3].angle_deg, DEFAULT_ARM_ANGLES[3]);

        state.arms[3].angle_deg = 77.0;
        state.apply_mode_preset(Mode::Normal, 4);
        state.apply_mode_preset(Mode::Multi, 4);
        assert_eq!(state.arms[3].angle_deg, 77.0);
    }

    #[test]
    fn test_ensure_arms_reads_persisted_snapshot() {
        let mut state = ProtractorState::new(Settings::default());
        let persisted: ConfigRecord = serde_json::from_value(json!({
            "arm_1_angle": "45.5",
            "arm_1_radius": 9000,
            "arm_1_enabled": "true",
            "arm_1_color": "#123456",
            "arm_2_angle": "garbage",
        }))
        .unwrap();
        state.ensure_arms(&persisted);

        assert_eq!(state.arms.len(), ARM_COUNT);
        assert_eq!(state.arms[1].angle_deg, 45.5);
        assert_eq!(state.arms[1].radius_px, 600.0);
        assert!(state.arms[1].enabled);
        assert_eq!(color_hex(state.arms[1].color), "#123456");
        assert_eq!(state.arms[2].angle_deg, DEFAULT_ARM_ANGLES[2]);
        assert_eq!(state.arms[2].radius_px, 200.0);
        assert!(!state.arms[0].enabled);
    }

    #[test]
    fn test_center_wins_over_coinciding_endpoint() {
        let mut state = placed_state();
        let center = state.center.unwrap();
        // endpoint one pixel off center is inside both hit radii
        state.arms[0].radius_px = 1.0;
        assert_eq!(state.hit_test(center), Handle::CenterMove);
    }

    #[test]
    fn test_closest_arm_uses_literal_distance() {
        let mut state = placed_state();
        let center = state.center.unwrap();
        state.arms[0].angle_deg = 0.0;
        state.arms[0].radius_px = 100.0;
        state.arms[1].angle_deg = 10.0;
        state.arms[1].radius_px = 200.0;

        // on arm 1's line, well clear of arm 0
        let pos = geometry::endpoint(center, 10.0, 150.0);
        assert_eq!(state.closest_arm_hit(pos), Some(Handle::ArmRotate(1)));

        let end0 = geometry::endpoint(center, 0.0, 100.0).offset(3.0, 0.0);
        assert_eq!(state.closest_arm_hit(end0), Some(Handle::ArmResize(0)));
    }

    #[test]
    fn test_ring_hit() {
        let state = placed_state();
        let center = state.center.unwrap();
        let on_ring = geometry::endpoint(center, 200.0, state.ring_radius + 5.0);
        assert_eq!(state.hit_test(on_ring), Handle::RotateBoth);
        let outside = geometry::endpoint(center, 200.0, state.ring_radius + 40.0);
        assert_eq!(state.hit_test(outside), Handle::None);
    }

    #[test]
    fn test_measured_span() {
        let mut state = placed_state();
        state.arms[0].angle_deg = 0.0;
        state.arms[1].angle_deg = 90.0;
        assert_eq!(state.measured_span(), Some(90.0));

        state.settings.mode = Mode::SiteAudit;
        assert_eq!(state.measured_span(), None);
    }

    #[test]
    fn test_snapshots() {
        let mut state = placed_state();
        state.arms[0].angle_deg = 12.5;
        state.arms[0].radius_px = 150.4;

        let geo = state.geometry_snapshot();
        assert_eq!(geo.get("arm_0_angle"), Some(&json!(12.5)));
        assert_eq!(geo.get("arm_0_radius"), Some(&json!(150)));
        assert!(!geo.contains_key("arm_2_angle"));

        let full = state.arm_snapshot();
        assert_eq!(full.get("arm_2_enabled"), Some(&json!(false)));
        assert_eq!(full.get("arm_0_color"), Some(&json!("#ff0000")));
        assert_eq!(full.get("color_arm_a"), Some(&json!("#ff0000")));
    }
}
