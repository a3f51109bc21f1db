use cairo::{Context, FontSlant, FontWeight, LineCap, LineJoin};
use palette::Srgba;
use protractor::geometry::Point;
use protractor::overlay::{Bounds, DrawCommand, HAlign, Stroke, TextCommand, VAlign};
use std::f64::consts::PI;

const FONT_FAMILY: &str = "Sans";
/// Font sizes in settings are points.
const POINTS_TO_PIXELS: f64 = 96.0 / 72.0;

/// Bearing (0 = up, clockwise) to a cairo angle (0 = +x, clockwise on screen).
fn cairo_angle(bearing_deg: f64) -> f64 {
    (bearing_deg - 90.0).to_radians()
}

fn set_source(cr: &Context, color: Srgba<f64>) {
    let (r, g, b, a) = color.into_components();
    cr.set_source_rgba(r, g, b, a);
}

fn apply_stroke(cr: &Context, stroke: &Stroke) -> Result<(), cairo::Error> {
    set_source(cr, stroke.color);
    cr.set_line_width(stroke.width);
    cr.set_line_cap(if stroke.round_cap {
        LineCap::Round
    } else {
        LineCap::Butt
    });
    cr.set_line_join(LineJoin::Round);
    cr.stroke()
}

fn fill_and_stroke(
    cr: &Context,
    fill: Option<Srgba<f64>>,
    stroke: Option<&Stroke>,
) -> Result<(), cairo::Error> {
    if let Some(fill) = fill {
        set_source(cr, fill);
        if stroke.is_some() {
            cr.fill_preserve()?;
        } else {
            cr.fill()?;
        }
    }
    match stroke {
        Some(stroke) => apply_stroke(cr, stroke),
        None => {
            cr.new_path();
            Ok(())
        }
    }
}

fn trace_polygon(cr: &Context, points: &[Point]) {
    let mut points = points.iter();
    if let Some(first) = points.next() {
        cr.move_to(first.x, first.y);
    }
    for p in points {
        cr.line_to(p.x, p.y);
    }
    cr.close_path();
}

fn draw_text(cr: &Context, text: &TextCommand) -> Result<(), cairo::Error> {
    let weight = if text.bold {
        FontWeight::Bold
    } else {
        FontWeight::Normal
    };
    cr.select_font_face(FONT_FAMILY, FontSlant::Normal, weight);
    cr.set_font_size(text.size * POINTS_TO_PIXELS);

    let ext = cr.text_extents(&text.text)?;
    let x = match text.halign {
        HAlign::Left => text.pos.x,
        HAlign::Center => text.pos.x - ext.width() / 2.0 - ext.x_bearing(),
        HAlign::Right => text.pos.x - ext.width() - ext.x_bearing(),
    };
    let y = match text.valign {
        VAlign::Baseline => text.pos.y,
        VAlign::Middle => text.pos.y - ext.height() / 2.0 - ext.y_bearing(),
    };

    set_source(cr, text.color);
    cr.move_to(x, y);
    cr.show_text(&text.text)
}

fn draw_command(cr: &Context, command: &DrawCommand) -> Result<(), cairo::Error> {
    cr.new_path();
    match command {
        DrawCommand::Circle {
            center,
            radius,
            fill,
            stroke,
        } => {
            cr.arc(center.x, center.y, *radius, 0.0, 2.0 * PI);
            fill_and_stroke(cr, *fill, stroke.as_ref())
        }
        DrawCommand::Line { from, to, stroke } => {
            cr.move_to(from.x, from.y);
            cr.line_to(to.x, to.y);
            apply_stroke(cr, stroke)
        }
        DrawCommand::Arc {
            center,
            radius,
            start_deg,
            sweep_deg,
            stroke,
        } => {
            let start = cairo_angle(*start_deg);
            cr.arc(
                center.x,
                center.y,
                *radius,
                start,
                start + sweep_deg.to_radians(),
            );
            apply_stroke(cr, stroke)
        }
        DrawCommand::Polygon {
            points,
            fill,
            stroke,
        } => {
            trace_polygon(cr, points);
            fill_and_stroke(cr, *fill, stroke.as_ref())
        }
        DrawCommand::Text(text) => draw_text(cr, text),
    }
}

/// Paints one rendered frame, clipped to the overlay bounds.
pub fn paint(
    cr: &Context,
    commands: &[DrawCommand],
    bounds: Option<Bounds>,
) -> Result<(), cairo::Error> {
    let Some(bounds) = bounds else {
        return Ok(());
    };

    cr.save()?;
    let (x, y, size) = bounds.rect();
    cr.rectangle(x, y, size, size);
    cr.clip();
    for command in commands {
        draw_command(cr, command)?;
    }
    cr.restore()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearing_maps_to_cairo_angle() {
        assert!((cairo_angle(0.0) + PI / 2.0).abs() < 1e-12);
        assert!(cairo_angle(90.0).abs() < 1e-12);
        assert!((cairo_angle(180.0) - PI / 2.0).abs() < 1e-12);
    }
}
