use crate::config::Color;
use crate::geometry::Point;
use palette::Srgba;

pub type DrawColor = Srgba<f64>;

/// `color` with an 8-bit alpha, in the float format painters consume.
pub fn with_alpha(color: Color, alpha: u8) -> DrawColor {
    Srgba::new(color.red, color.green, color.blue, alpha).into_format::<f64, f64>()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: DrawColor,
    pub width: f64,
    pub round_cap: bool,
}

impl Stroke {
    pub fn new(color: DrawColor, width: f64) -> Self {
        Self {
            color,
            width,
            round_cap: false,
        }
    }

    pub fn round(color: DrawColor, width: f64) -> Self {
        Self {
            color,
            width,
            round_cap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    /// `pos.y` is the text baseline.
    Baseline,
    #[default]
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextCommand {
    pub pos: Point,
    pub text: String,
    pub size: f64,
    pub bold: bool,
    pub halign: HAlign,
    pub valign: VAlign,
    pub color: DrawColor,
}

/// One toolkit-neutral drawing primitive, in screen coordinates.
///
/// Angles are bearings (0 = up, clockwise), the same space arms live in.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Circle {
        center: Point,
        radius: f64,
        fill: Option<DrawColor>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Arc {
        center: Point,
        radius: f64,
        start_deg: f64,
        sweep_deg: f64,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Point>,
        fill: Option<DrawColor>,
        stroke: Option<Stroke>,
    },
    Text(TextCommand),
}

impl DrawCommand {
    pub fn as_text(&self) -> Option<&TextCommand> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Srgb;

    #[test]
    fn test_with_alpha() {
        let c = with_alpha(Srgb::new(255, 0, 255), 0);
        assert_eq!(c.into_components(), (1.0, 0.0, 1.0, 0.0));
        assert_eq!(with_alpha(Srgb::new(0, 0, 0), 255).alpha, 1.0);
    }
}
