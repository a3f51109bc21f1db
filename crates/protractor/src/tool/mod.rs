use crate::config::Color;
use palette::Srgb;

pub mod controller;
pub mod input;
pub mod model;

pub use controller::{Controller, CursorShape, Effect, Feedback, HoldToken, Response};
pub use input::{Button, Key, Modifiers, PointerEvent};
pub use model::{Arm, ArmId, Handle, ProtractorState};

pub const ARM_COUNT: usize = 6;
pub const DEFAULT_ARM_ANGLES: [f64; ARM_COUNT] = [0.0, 120.0, 240.0, 60.0, 180.0, 300.0];
const DEFAULT_ARM_RGB: [(u8, u8, u8); ARM_COUNT] = [
    (0xff, 0x00, 0x00), // red
    (0xff, 0xff, 0x00), // yellow
    (0x00, 0xff, 0x00), // green
    (0xff, 0x00, 0x7f), // magenta
    (0xff, 0xa5, 0x00), // orange
    (0x00, 0x00, 0xff), // blue
];

pub const RESET_RING_RADIUS: i64 = 100;
pub const RESET_ARM_ANGLES: [f64; 2] = [0.0, 90.0];
pub const FACTORY_ARM_RADIUS: f64 = 240.0;

pub const SNAP_TOGGLE_KEY: char = 's';
pub const RESET_KEY: char = 'r';

pub fn default_arm_color(index: usize) -> Color {
    let (r, g, b) = DEFAULT_ARM_RGB[index % ARM_COUNT];
    Srgb::new(r, g, b)
}
