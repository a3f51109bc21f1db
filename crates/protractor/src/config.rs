use derive_more::{AsRef, Deref, DerefMut, From, Into};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumIter, EnumString};

/// Group name every persisted key lives under.
pub const SETTINGS_GROUP: &str = "floating_protractor";

pub const MIN_HOLD_MS: u64 = 500;
pub const MIN_SECTORS: u32 = 3;
pub const MAX_SECTORS: u32 = 6;

pub type Color = Srgb<u8>;

/// Flat key/value mapping exchanged with persistence, import/export and the
/// settings UI.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, Deref, DerefMut, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct ConfigRecord(Map<String, Value>);

impl ConfigRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Overwrites keys present in `other`, keeps the rest.
    pub fn extend_from(&mut self, other: &ConfigRecord) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    SerializeDisplay,
    DeserializeFromStr,
    EnumString,
    EnumIter,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
pub enum Mode {
    #[default]
    #[strum(to_string = "NORMAL")]
    Normal,
    #[strum(to_string = "SITE_AUDIT", serialize = "site-audit", serialize = "audit")]
    SiteAudit,
    #[strum(to_string = "MULTI")]
    Multi,
}

impl Mode {
    /// Number of enabled arms this mode requires.
    pub fn active_arm_count(&self, sector_count: u32) -> usize {
        match self {
            Self::Normal => 2,
            Self::SiteAudit => 3,
            Self::Multi => sector_count.clamp(MIN_SECTORS, MAX_SECTORS) as usize,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    SerializeDisplay,
    DeserializeFromStr,
    EnumString,
    EnumIter,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum CrosshairStyle {
    #[strum(to_string = "none", serialize = "off")]
    None,
    Dot,
    #[default]
    Plus,
}

pub fn color_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

pub fn parse_color(s: &str) -> Option<Color> {
    s.trim().parse::<Color>().ok()
}

/// A settings field that can be read leniently from a record value.
pub trait FieldValue: Sized {
    fn read(value: &Value) -> Option<Self>;
    fn write(&self) -> Value;
}

pub fn read_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }
}

pub fn read_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

impl FieldValue for bool {
    fn read(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn write(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! impl_integer_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn read(value: &Value) -> Option<Self> {
                    read_integer(value).and_then(|i| <$ty>::try_from(i).ok())
                }

                fn write(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

impl_integer_field!(u8, u32, u64);

impl FieldValue for String {
    fn read(value: &Value) -> Option<Self> {
        value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn write(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for Color {
    fn read(value: &Value) -> Option<Self> {
        value.as_str().and_then(parse_color)
    }

    fn write(&self) -> Value {
        Value::String(color_hex(*self))
    }
}

impl FieldValue for Mode {
    fn read(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.trim().parse().ok())
    }

    fn write(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl FieldValue for CrosshairStyle {
    fn read(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.trim().parse().ok())
    }

    fn write(&self) -> Value {
        Value::String(self.to_string())
    }
}

/// Declares the `Settings` struct. Each field name doubles as its record key.
macro_rules! settings {
    ($($field:ident: $ty:ty = $default:expr,)*) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct Settings {
            $(pub $field: $ty,)*
        }

        impl Default for Settings {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        impl Settings {
            pub const KEYS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn merge_fields(&mut self, record: &ConfigRecord) {
                $(
                    if let Some(value) = record.get(stringify!($field)) {
                        match <$ty as FieldValue>::read(value) {
                            Some(v) => self.$field = v,
                            None => log::warn!(
                                "Ignoring invalid value for `{}`: {}",
                                stringify!($field),
                                value
                            ),
                        }
                    }
                )*
            }

            pub fn to_record(&self) -> ConfigRecord {
                let mut record = ConfigRecord::new();
                $(record.insert(stringify!($field).to_string(), self.$field.write());)*
                record
            }
        }
    };
}

settings! {
    mode: Mode = Mode::Normal,
    multi_sector_count: u32 = 3,

    snap_enabled: bool = true,
    snap_step_deg: u32 = 5,
    hold_to_open_settings_ms: u64 = 1500,
    hold_cancel_threshold_px: u32 = 4,

    show_arms: bool = true,
    show_arc: bool = true,
    show_angle_text: bool = true,
    outline_enabled: bool = true,
    shadow_enabled: bool = true,

    show_cardinal: bool = true,
    show_north_triangle: bool = true,
    cardinal_font_size: u32 = 18,
    cardinal_offset_px: u32 = 60,
    north_triangle_size_px: u32 = 8,

    arm_radius_min: u32 = 50,
    arm_radius_max: u32 = 600,
    ring_radius: u32 = 200,
    ring_radius_min: u32 = 40,
    ring_radius_max: u32 = 250,
    arm_line_width: u32 = 5,
    ring_line_width: u32 = 3,
    arm_a_radius: u32 = 90,
    arm_b_radius: u32 = 120,

    hit_center_px: u32 = 14,
    hit_endpoint_px: u32 = 12,
    hit_arm_line_px: u32 = 8,
    hit_ring_px: u32 = 10,

    center_dot_radius_px: u32 = 6,
    arm_endpoint_radius_px: u32 = 4,
    ring_tick_step_deg: u32 = 1,
    ring_major_tick_deg: u32 = 5,
    ring_label_step_deg: u32 = 10,
    angle_font_size: u32 = 10,
    label_font_size: u32 = 10,
    arc_line_width: u32 = 3,
    angle_text_distance_px: u32 = 20,

    color_ring: Color = Srgb::new(0xff, 0xff, 0x00),
    color_arc: Color = Srgb::new(0xff, 0x8c, 0x00),
    color_text: Color = Srgb::new(0xff, 0xff, 0x00),
    color_outline: Color = Srgb::new(0x00, 0x00, 0x00),
    color_shadow: Color = Srgb::new(0x00, 0x00, 0x00),
    ring_glow_alpha: u8 = 255,
    text_shadow_alpha: u8 = 120,

    show_crosshair: bool = true,
    crosshair_style: CrosshairStyle = CrosshairStyle::Plus,
    crosshair_size_px: u32 = 20,
    crosshair_thickness: u32 = 1,
    crosshair_color: Color = Srgb::new(0xff, 0xff, 0x00),

    label_a: String = "A".to_string(),
    label_b: String = "B".to_string(),
    label_c: String = "C".to_string(),
    label_d: String = "D".to_string(),
    label_e: String = "E".to_string(),
    label_f: String = "F".to_string(),
}

impl Settings {
    pub fn from_record(record: &ConfigRecord) -> Self {
        let mut settings = Self::default();
        settings.merge(record);
        settings
    }

    /// Applies every recognized key in `record`; anything unreadable keeps
    /// its current value.
    pub fn merge(&mut self, record: &ConfigRecord) {
        self.merge_fields(record);
        self.normalize();
    }

    fn normalize(&mut self) {
        self.hold_to_open_settings_ms = self.hold_to_open_settings_ms.max(MIN_HOLD_MS);
        self.snap_step_deg = self.snap_step_deg.max(1);
        self.ring_tick_step_deg = self.ring_tick_step_deg.max(1);
        self.ring_major_tick_deg = self.ring_major_tick_deg.max(1);
        self.ring_label_step_deg = self.ring_label_step_deg.max(1);
        self.multi_sector_count = self.multi_sector_count.clamp(MIN_SECTORS, MAX_SECTORS);
        self.ring_radius_max = self.ring_radius_max.max(self.ring_radius_min);
        self.arm_radius_max = self.arm_radius_max.max(self.arm_radius_min);
    }

    pub fn labels(&self) -> [&str; 6] {
        [
            &self.label_a,
            &self.label_b,
            &self.label_c,
            &self.label_d,
            &self.label_e,
            &self.label_f,
        ]
    }

    pub fn ring_bounds(&self) -> (f64, f64) {
        (self.ring_radius_min as f64, self.ring_radius_max as f64)
    }

    pub fn arm_bounds(&self) -> (f64, f64) {
        (self.arm_radius_min as f64, self.arm_radius_max as f64)
    }

    pub fn hold_delay(&self) -> Duration {
        Duration::from_millis(self.hold_to_open_settings_ms)
    }

    pub fn active_arm_count(&self) -> usize {
        self.mode.active_arm_count(self.multi_sector_count)
    }
}

pub fn arm_key(index: usize, attr: &str) -> String {
    format!("arm_{index}_{attr}")
}

pub const ARM_COLOR_KEYS: [&str; 6] = [
    "color_arm_a",
    "color_arm_b",
    "color_arm_c",
    "color_arm_d",
    "color_arm_e",
    "color_arm_f",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ConfigRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_from_empty_record() {
        let s = Settings::from_record(&ConfigRecord::new());
        assert_eq!(s, Settings::default());
        assert_eq!(s.mode, Mode::Normal);
        assert_eq!(s.hold_to_open_settings_ms, 1500);
        assert_eq!(s.labels(), ["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn test_merge_reads_leniently() {
        let s = Settings::from_record(&record(json!({
            "ring_radius": "180",
            "snap_enabled": "false",
            "show_arc": 0,
            "hit_center_px": 20.4,
            "color_ring": "#00ff00",
            "mode": "site_audit",
            "crosshair_style": "DOT",
        })));
        assert_eq!(s.ring_radius, 180);
        assert!(!s.snap_enabled);
        assert!(!s.show_arc);
        assert_eq!(s.hit_center_px, 20);
        assert_eq!(s.color_ring, Srgb::new(0, 255, 0));
        assert_eq!(s.mode, Mode::SiteAudit);
        assert_eq!(s.crosshair_style, CrosshairStyle::Dot);
    }

    #[test]
    fn test_invalid_values_keep_current() {
        let mut s = Settings::default();
        s.ring_radius = 150;
        s.merge(&record(json!({
            "ring_radius": "big",
            "snap_enabled": "perhaps",
            "color_arc": "not a color",
            "ring_glow_alpha": 900,
            "mode": "SIDEWAYS",
            "label_a": "   ",
            "unknown_key": 42,
        })));
        assert_eq!(s.ring_radius, 150);
        assert!(s.snap_enabled);
        assert_eq!(s.color_arc, Settings::default().color_arc);
        assert_eq!(s.ring_glow_alpha, 255);
        assert_eq!(s.mode, Mode::Normal);
        assert_eq!(s.label_a, "A");
    }

    #[test]
    fn test_normalization_floors() {
        let s = Settings::from_record(&record(json!({
            "hold_to_open_settings_ms": 100,
            "snap_step_deg": 0,
            "ring_tick_step_deg": 0,
            "multi_sector_count": 9,
            "ring_radius_min": 300,
            "ring_radius_max": 100,
        })));
        assert_eq!(s.hold_to_open_settings_ms, MIN_HOLD_MS);
        assert_eq!(s.snap_step_deg, 1);
        assert_eq!(s.ring_tick_step_deg, 1);
        assert_eq!(s.multi_sector_count, MAX_SECTORS);
        assert_eq!(s.ring_bounds(), (300.0, 300.0));
    }

    #[test]
    fn test_record_round_trip() {
        let mut s = Settings::default();
        s.mode = Mode::Multi;
        s.multi_sector_count = 5;
        s.label_c = "North wall".to_string();
        s.crosshair_color = Srgb::new(1, 2, 3);
        let back = Settings::from_record(&s.to_record());
        assert_eq!(back, s);
        assert_eq!(s.to_record().len(), Settings::KEYS.len());
    }

    #[test]
    fn test_mode_strings() {
        let cases = vec![
            ("\"NORMAL\"", Mode::Normal),
            ("\"normal\"", Mode::Normal),
            ("\"SITE_AUDIT\"", Mode::SiteAudit),
            ("\"audit\"", Mode::SiteAudit),
            ("\"Multi\"", Mode::Multi),
        ];
        for (json, expected) in cases {
            let mode: Mode = serde_json::from_str(json).unwrap();
            assert_eq!(mode, expected);
        }
        assert_eq!(serde_json::to_string(&Mode::SiteAudit).unwrap(), "\"SITE_AUDIT\"");
        assert_eq!(Mode::Multi.active_arm_count(1), 3);
        assert_eq!(Mode::Multi.active_arm_count(5), 5);
        assert_eq!(Mode::Normal.active_arm_count(6), 2);
    }

    #[test]
    fn test_settings_active_arm_count() {
        assert_eq!(Settings::default().active_arm_count(), 2);
        let record = ConfigRecord::new()
            .with("mode", "MULTI")
            .with("multi_sector_count", 5);
        assert_eq!(Settings::from_record(&record).active_arm_count(), 5);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(color_hex(Srgb::new(255, 140, 0)), "#ff8c00");
        assert_eq!(parse_color("#FF8C00"), Some(Srgb::new(255, 140, 0)));
        assert_eq!(parse_color("#f00"), Some(Srgb::new(255, 0, 0)));
        assert_eq!(parse_color("orange"), None);
    }
}
