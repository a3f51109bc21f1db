use gdk4 as gdk;
use gtk4 as gtk;

pub fn load_css() {
    let provider = gtk::CssProvider::new();
    let css_data = "
.protractor-window, .protractor-drawing-area {
    background: none;
    background-color: transparent;
}

.protractor-status {
    padding: 4px 12px;
    border-radius: 6px;
    background-color: rgba(0, 0, 0, 0.6);
    color: #ffff00;
    font-weight: bold;
}
";
    provider.load_from_data(css_data);

    if let Some(display) = gdk::Display::default() {
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}
