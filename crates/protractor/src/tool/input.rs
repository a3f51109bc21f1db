use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Suspends angle snapping while held.
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: Point,
    pub button: Button,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(pos: Point, button: Button) -> Self {
        Self {
            pos,
            button,
            modifiers: Modifiers::default(),
        }
    }

    pub fn primary(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y), Button::Primary)
    }

    pub fn secondary(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y), Button::Secondary)
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.modifiers.shift = shift;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
}
