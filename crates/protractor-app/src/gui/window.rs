use gtk::prelude::*;
use gtk4 as gtk;
use gtk4_layer_shell::{Edge, KeyboardMode, Layer, LayerShell};

pub fn init_layer_shell(window: &gtk::ApplicationWindow) {
    window.init_layer_shell();
    window.set_layer(Layer::Overlay);
    window.set_namespace(Some("floating-protractor"));
    window.set_exclusive_zone(-1);
    for edge in [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom] {
        window.set_anchor(edge, true);
    }
    window.set_keyboard_mode(KeyboardMode::OnDemand);
}

/// An inactive overlay stays visible but lets every click and key through
/// to the windows below.
pub fn set_interactive(window: &gtk::ApplicationWindow, interactive: bool) {
    window.set_keyboard_mode(if interactive {
        KeyboardMode::OnDemand
    } else {
        KeyboardMode::None
    });

    let Some(surface) = window.surface() else {
        return;
    };
    let region = if interactive {
        cairo::Region::create_rectangle(&cairo::RectangleInt::new(
            0,
            0,
            surface.width(),
            surface.height(),
        ))
    } else {
        cairo::Region::create()
    };
    surface.set_input_region(&region);
}
