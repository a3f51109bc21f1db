use super::app::{AppModel, AppMsg};
use gtk::prelude::*;
use gtk4 as gtk;
use protractor::config::{ConfigRecord, Mode};
use protractor::geometry::Point;
use relm4::ComponentSender;

const MULTI_ARM_CHOICES: [u32; 3] = [4, 5, 6];

fn entries() -> Vec<(String, AppMsg)> {
    let mut entries = vec![
        ("Settings…".to_string(), AppMsg::OpenSettings),
        (
            "Mode → NORMAL".to_string(),
            AppMsg::Apply(ConfigRecord::new().with("mode", Mode::Normal.to_string())),
        ),
        (
            "Mode → SITE_AUDIT (3 Arms)".to_string(),
            AppMsg::Apply(ConfigRecord::new().with("mode", Mode::SiteAudit.to_string())),
        ),
    ];
    for arms in MULTI_ARM_CHOICES {
        entries.push((
            format!("Mode → MULTI ({} Arms)", arms),
            AppMsg::Apply(
                ConfigRecord::new()
                    .with("mode", Mode::Multi.to_string())
                    .with("multi_sector_count", arms),
            ),
        ));
    }
    entries
}

/// Quick mode switch shown on a right-click on the ring.
pub fn build(parent: &gtk::DrawingArea, sender: &ComponentSender<AppModel>) -> gtk::Popover {
    let list = gtk::Box::new(gtk::Orientation::Vertical, 2);
    for (idx, (label, msg)) in entries().into_iter().enumerate() {
        if idx == 1 {
            list.append(&gtk::Separator::new(gtk::Orientation::Horizontal));
        }
        let button = gtk::Button::with_label(&label);
        button.add_css_class("flat");
        let sender = sender.clone();
        button.connect_clicked(move |_| sender.input(msg.clone()));
        list.append(&button);
    }

    let popover = gtk::Popover::new();
    popover.set_has_arrow(false);
    popover.set_child(Some(&list));
    popover.set_parent(parent);
    popover
}

pub fn show_at(popover: &gtk::Popover, pos: Point) {
    popover.set_pointing_to(Some(&gdk4::Rectangle::new(
        pos.x as i32,
        pos.y as i32,
        1,
        1,
    )));
    popover.popup();
}
