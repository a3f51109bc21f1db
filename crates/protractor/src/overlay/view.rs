use super::command::{DrawColor, DrawCommand, HAlign, Stroke, TextCommand, VAlign, with_alpha};
use super::{
    ACTIVE_ALPHA, ARC_ACTIVE_ALPHA, ARC_INACTIVE_ALPHA, ARC_MIN_SPAN_DEG, ARC_RADIUS,
    ARM_LABEL_GAP, CARDINAL_ALPHA, GLOW_EXTRA_WIDTH, HOVER_EXTRA_WIDTH, INACTIVE_ALPHA,
    MAJOR_TICK_LEN, MINOR_TICK_LEN, NORTH_BLADE_RGB, OUTLINE_OFFSETS, SHADOW_OFFSET,
    TEXT_ACTIVE_ALPHA, TEXT_INACTIVE_ALPHA, TICK_LABEL_INSET,
};
use crate::config::{CrosshairStyle, Settings};
use crate::geometry::{self, Point};
use crate::tool::model::{Arm, Handle, ProtractorState};
use palette::Srgb;

const CARDINALS: [(&str, f64); 4] = [("N", 0.0), ("E", 90.0), ("S", 180.0), ("W", 270.0)];

struct TextStyle {
    size: f64,
    fill: DrawColor,
    outline: DrawColor,
    shadow: DrawColor,
}

struct Frame<'a> {
    state: &'a ProtractorState,
    settings: &'a Settings,
    center: Point,
    base_alpha: u8,
    ring: DrawColor,
    text: TextStyle,
    commands: Vec<DrawCommand>,
}

impl<'a> Frame<'a> {
    fn new(state: &'a ProtractorState, center: Point, active: bool) -> Self {
        let settings = &state.settings;
        let base_alpha = if active { ACTIVE_ALPHA } else { INACTIVE_ALPHA };
        let text_alpha = if active {
            TEXT_ACTIVE_ALPHA
        } else {
            TEXT_INACTIVE_ALPHA
        };
        Self {
            state,
            settings,
            center,
            base_alpha,
            ring: with_alpha(settings.color_ring, base_alpha),
            text: TextStyle {
                size: settings.label_font_size as f64,
                fill: with_alpha(settings.color_text, text_alpha),
                outline: with_alpha(settings.color_outline, u8::MAX),
                shadow: with_alpha(settings.color_shadow, settings.text_shadow_alpha),
            },
            commands: Vec::new(),
        }
    }

    fn ring_width(&self) -> f64 {
        self.settings.ring_line_width as f64
    }

    fn draw(mut self, active: bool) -> Vec<DrawCommand> {
        self.draw_glow();
        if self.settings.show_arms {
            self.draw_arms();
            if self.settings.show_arc {
                self.draw_arc(active);
            }
        }
        self.draw_ring();
        self.draw_ticks();
        if self.settings.show_cardinal {
            self.draw_cardinals();
        }
        if self.settings.show_arms && self.settings.show_angle_text {
            self.draw_readout();
        }
        self.draw_center();
        self.commands
    }

    fn draw_glow(&mut self) {
        let glow = with_alpha(self.settings.color_ring, self.settings.ring_glow_alpha);
        if glow.alpha <= 0.0 {
            return;
        }
        self.commands.push(DrawCommand::Circle {
            center: self.center,
            radius: self.state.ring_radius,
            fill: None,
            stroke: Some(Stroke::round(glow, self.ring_width() + GLOW_EXTRA_WIDTH)),
        });
    }

    fn draw_arms(&mut self) {
        let state = self.state;
        let hovered = state.hover_handle.arm_index();
        for (idx, arm) in state.enabled_arms() {
            self.draw_arm(idx, arm, hovered == Some(idx));
        }
    }

    fn draw_arm(&mut self, idx: usize, arm: &Arm, hovered: bool) {
        let settings = self.settings;
        let radius = self.state.arm_radius(arm);
        let end = geometry::endpoint(self.center, arm.angle_deg, radius);
        let color = with_alpha(arm.color, self.base_alpha);

        let arm_w = settings.arm_line_width as f64;
        let width = if hovered {
            arm_w + HOVER_EXTRA_WIDTH
        } else {
            arm_w
        };
        self.commands.push(DrawCommand::Line {
            from: self.center,
            to: end,
            stroke: Stroke::round(color, width),
        });

        let dot = match settings.arm_endpoint_radius_px {
            0 => (arm_w - 1.0).max(3.0),
            r => r as f64,
        };
        self.commands.push(DrawCommand::Circle {
            center: end,
            radius: dot,
            fill: Some(color),
            stroke: None,
        });

        if !settings.show_angle_text {
            return;
        }
        let label = self.state.arm_label(idx);
        if label.is_empty() {
            return;
        }
        let distance = radius + settings.arm_endpoint_radius_px as f64 + arm_w + ARM_LABEL_GAP;
        let pos = geometry::endpoint(self.center, arm.angle_deg, distance);
        let halign = label_anchor(arm.angle_deg);
        let size = self.text.size;
        let fill = self.text.fill;
        self.push_text(pos, label, size, fill, halign, VAlign::Middle);
    }

    fn draw_arc(&mut self, active: bool) {
        let Some(span) = self.state.measured_span() else {
            return;
        };
        if span <= ARC_MIN_SPAN_DEG {
            return;
        }
        let alpha = if active {
            ARC_ACTIVE_ALPHA
        } else {
            ARC_INACTIVE_ALPHA
        };
        let width = match self.settings.arc_line_width {
            0 => (self.ring_width() - 1.0).max(2.0),
            w => w as f64,
        };
        let start_deg = self.state.arms.first().map_or(0.0, |a| a.angle_deg);
        self.commands.push(DrawCommand::Arc {
            center: self.center,
            radius: ARC_RADIUS,
            start_deg: geometry::normalize_deg(start_deg),
            sweep_deg: span,
            stroke: Stroke::round(with_alpha(self.settings.color_arc, alpha), width),
        });
    }

    fn draw_ring(&mut self) {
        let width = if self.state.hover_handle == Handle::RotateBoth {
            self.ring_width() + HOVER_EXTRA_WIDTH
        } else {
            self.ring_width()
        };
        self.commands.push(DrawCommand::Circle {
            center: self.center,
            radius: self.state.ring_radius,
            fill: None,
            stroke: Some(Stroke::round(self.ring, width)),
        });
    }

    fn draw_ticks(&mut self) {
        let settings = self.settings;
        let radius = self.state.ring_radius;
        let (step, major, label_step) = (
            settings.ring_tick_step_deg.max(1),
            settings.ring_major_tick_deg.max(1),
            settings.ring_label_step_deg.max(1),
        );

        for deg in (0..360).step_by(step as usize) {
            let is_major = deg % major == 0;
            let (len, width) = if is_major {
                (MAJOR_TICK_LEN, self.ring_width())
            } else {
                (MINOR_TICK_LEN, 1.0)
            };
            let bearing = deg as f64;
            self.commands.push(DrawCommand::Line {
                from: geometry::endpoint(self.center, bearing, radius - len),
                to: geometry::endpoint(self.center, bearing, radius),
                stroke: Stroke::round(self.ring, width),
            });

            if deg % label_step == 0 {
                let pos = geometry::endpoint(self.center, bearing, radius - TICK_LABEL_INSET);
                let (size, ring) = (self.text.size, self.ring);
                self.push_text(pos, &deg.to_string(), size, ring, HAlign::Center, VAlign::Middle);
            }
        }
    }

    fn draw_cardinals(&mut self) {
        let settings = self.settings;
        let color = with_alpha(settings.color_ring, CARDINAL_ALPHA);
        let size = settings.cardinal_font_size as f64;
        let radius = self.state.ring_radius - settings.cardinal_offset_px as f64;

        for (text, bearing) in CARDINALS {
            let pos = geometry::endpoint(self.center, bearing, radius);
            self.push_text(pos, text, size, color, HAlign::Center, VAlign::Middle);

            if bearing == 0.0 && settings.show_north_triangle {
                self.draw_north_blade(pos.offset(0.0, 1.0 - size / 2.0));
            }
        }
    }

    /// Mirrored arrow blade whose base notch sits at `base`.
    fn draw_north_blade(&mut self, base: Point) {
        let size = self.settings.north_triangle_size_px as f64 * 2.0;
        let (r, g, b) = NORTH_BLADE_RGB;
        self.commands.push(DrawCommand::Polygon {
            points: vec![
                base.offset(0.0, -size * 0.95),
                base.offset(size * 0.70, size * 0.45),
                base.offset(0.0, size * 0.05),
                base.offset(-size * 0.70, size * 0.45),
            ],
            fill: Some(with_alpha(Srgb::new(r, g, b), u8::MAX)),
            stroke: Some(Stroke::new(with_alpha(Srgb::new(0, 0, 0), u8::MAX), 1.0)),
        });
    }

    fn draw_readout(&mut self) {
        let Some(span) = self.state.measured_span() else {
            return;
        };
        let start = self.state.arms.first().map_or(0.0, |a| a.angle_deg);
        let mid = geometry::normalize_deg(start + span.max(1.0) / 2.0);
        let pos = geometry::endpoint(
            self.center,
            mid,
            self.settings.angle_text_distance_px as f64,
        );
        let size = self.settings.angle_font_size as f64;
        let fill = self.text.fill;
        self.push_text(
            pos,
            &format!("{:.1}°", span),
            size,
            fill,
            HAlign::Left,
            VAlign::Baseline,
        );
    }

    fn draw_center(&mut self) {
        let settings = self.settings;
        self.commands.push(DrawCommand::Circle {
            center: self.center,
            radius: settings.center_dot_radius_px as f64,
            fill: Some(self.ring),
            stroke: None,
        });

        if !settings.show_crosshair {
            return;
        }
        let color = with_alpha(settings.crosshair_color, self.base_alpha);
        let size = settings.crosshair_size_px as f64;
        match settings.crosshair_style {
            CrosshairStyle::None => {}
            CrosshairStyle::Dot => self.commands.push(DrawCommand::Circle {
                center: self.center,
                radius: (settings.crosshair_size_px / 4).max(2) as f64,
                fill: Some(color),
                stroke: None,
            }),
            CrosshairStyle::Plus => {
                let stroke = Stroke::round(color, settings.crosshair_thickness.max(1) as f64);
                let c = self.center;
                self.commands.push(DrawCommand::Line {
                    from: c.offset(-size, 0.0),
                    to: c.offset(size, 0.0),
                    stroke,
                });
                self.commands.push(DrawCommand::Line {
                    from: c.offset(0.0, -size),
                    to: c.offset(0.0, size),
                    stroke,
                });
            }
        }
    }

    /// Shadow, outline and fill layers. Transparent layers are never emitted.
    fn push_text(
        &mut self,
        pos: Point,
        text: &str,
        size: f64,
        fill: DrawColor,
        halign: HAlign,
        valign: VAlign,
    ) {
        let (outline, shadow) = (self.text.outline, self.text.shadow);
        if text.is_empty() || (fill.alpha <= 0.0 && outline.alpha <= 0.0 && shadow.alpha <= 0.0)
        {
            return;
        }

        let mut layer = |pos: Point, color: DrawColor| {
            self.commands.push(DrawCommand::Text(TextCommand {
                pos,
                text: text.to_string(),
                size,
                bold: true,
                halign,
                valign,
                color,
            }));
        };

        if self.settings.shadow_enabled && shadow.alpha > 0.0 {
            layer(pos.offset(SHADOW_OFFSET.0, SHADOW_OFFSET.1), shadow);
        }
        if self.settings.outline_enabled && outline.alpha > 0.0 {
            for (dx, dy) in OUTLINE_OFFSETS {
                layer(pos.offset(dx, dy), outline);
            }
        }
        if fill.alpha > 0.0 {
            layer(pos, fill);
        }
    }
}

/// Labels on the right grow rightwards, on the left leftwards, and stay
/// centered above and below.
pub fn label_anchor(angle_deg: f64) -> HAlign {
    let a = geometry::normalize_deg(angle_deg);
    if (45.0..135.0).contains(&a) {
        HAlign::Left
    } else if (225.0..315.0).contains(&a) {
        HAlign::Right
    } else {
        HAlign::Center
    }
}

/// Draw commands for one frame, back to front. Empty until placed.
pub fn render(state: &ProtractorState, active: bool) -> Vec<DrawCommand> {
    match state.center {
        Some(center) => Frame::new(state, center, active).draw(active),
        None => Vec::new(),
    }
}
