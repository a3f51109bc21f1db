use crate::geometry::Point;
use crate::tool::model::ProtractorState;

pub mod command;
pub mod view;

pub use command::{DrawColor, DrawCommand, HAlign, Stroke, TextCommand, VAlign};
pub use view::render;

pub const ACTIVE_ALPHA: u8 = 220;
pub const INACTIVE_ALPHA: u8 = 120;
pub const TEXT_ACTIVE_ALPHA: u8 = 255;
pub const TEXT_INACTIVE_ALPHA: u8 = 160;
pub const ARC_ACTIVE_ALPHA: u8 = 130;
pub const ARC_INACTIVE_ALPHA: u8 = 90;
pub const CARDINAL_ALPHA: u8 = 225;

pub const GLOW_EXTRA_WIDTH: f64 = 4.0;
pub const HOVER_EXTRA_WIDTH: f64 = 2.0;
pub const ARC_RADIUS: f64 = 20.0;
pub const ARC_MIN_SPAN_DEG: f64 = 0.5;
pub const ARM_LABEL_GAP: f64 = 8.0;
pub const MAJOR_TICK_LEN: f64 = 14.0;
pub const MINOR_TICK_LEN: f64 = 8.0;
pub const TICK_LABEL_INSET: f64 = 26.0;
pub const SHADOW_OFFSET: (f64, f64) = (1.5, 1.5);
pub const OUTLINE_OFFSETS: [(f64, f64); 4] = [(-1.0, 0.0), (1.0, 0.0), (0.0, -1.0), (0.0, 1.0)];
pub const NORTH_BLADE_RGB: (u8, u8, u8) = (0xe3, 0x1b, 0x23);

const LABEL_PADDING: f64 = 60.0;
const TICK_PADDING: f64 = 20.0;

/// Circle the host must keep repaintable around the protractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Point,
    pub radius: f64,
}

impl Bounds {
    /// Top-left corner and edge length of the enclosing square.
    pub fn rect(&self) -> (f64, f64, f64) {
        (
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.radius * 2.0,
        )
    }
}

pub fn bounds(state: &ProtractorState) -> Option<Bounds> {
    let center = state.center?;
    let reach = state
        .enabled_arms()
        .map(|(_, arm)| state.arm_radius(arm))
        .fold(state.ring_radius, f64::max);
    let glow = (state.settings.ring_glow_alpha / 2) as f64;
    Some(Bounds {
        center,
        radius: reach + LABEL_PADDING + glow + TICK_PADDING,
    })
}
