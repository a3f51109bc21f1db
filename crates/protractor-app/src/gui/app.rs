use crate::events::AppEvent;
use crate::gui::{menu, painter, theme, window};
use gdk4 as gdk;
use gtk::prelude::*;
use gtk4 as gtk;
use protractor::config::ConfigRecord;
use protractor::store::{JsonFileStore, SettingsStore};
use protractor::tool::{
    Button, Controller, CursorShape, Effect, Feedback, HoldToken, Key, PointerEvent, Response,
};
use relm4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const STATUS_TIMEOUT: Duration = Duration::from_millis(2000);

pub struct AppModel {
    pub controller: Rc<RefCell<Controller<JsonFileStore>>>,
    pub status: String,
    hold_timer: Option<(HoldToken, glib::SourceId)>,
    status_timer: Option<glib::SourceId>,
    pub root: gtk::ApplicationWindow,
    pub drawing_area: gtk::DrawingArea,
    pub menu: gtk::Popover,
}

#[derive(Debug, Clone)]
pub enum AppMsg {
    Press(PointerEvent),
    Motion(PointerEvent),
    Release(PointerEvent),
    Key(Key),
    HoldElapsed(HoldToken),
    Activate,
    Deactivate,
    Clear,
    OpenSettings,
    Apply(ConfigRecord),
    SettingsReload,
    StatusExpired,
}

impl From<AppEvent> for AppMsg {
    fn from(event: AppEvent) -> Self {
        match event {
            AppEvent::Activate => AppMsg::Activate,
            AppEvent::Deactivate => AppMsg::Deactivate,
            AppEvent::Clear => AppMsg::Clear,
            AppEvent::OpenSettings => AppMsg::OpenSettings,
            AppEvent::Apply(record) => AppMsg::Apply(record),
            AppEvent::SettingsReload => AppMsg::SettingsReload,
        }
    }
}

fn map_button(button: u32) -> Option<Button> {
    match button {
        gdk::BUTTON_PRIMARY => Some(Button::Primary),
        gdk::BUTTON_MIDDLE => Some(Button::Middle),
        gdk::BUTTON_SECONDARY => Some(Button::Secondary),
        _ => None,
    }
}

fn map_key(key: gdk::Key) -> Option<Key> {
    if key == gdk::Key::Escape {
        return Some(Key::Escape);
    }
    key.to_unicode().map(Key::Char)
}

fn shift_held(state: gdk::ModifierType) -> bool {
    state.contains(gdk::ModifierType::SHIFT_MASK)
}

fn pointer_event(gesture: &gtk::GestureDrag, x: f64, y: f64) -> Option<PointerEvent> {
    let button = map_button(gesture.current_button())?;
    let event = PointerEvent::new(protractor::geometry::Point::new(x, y), button);
    Some(event.with_shift(shift_held(gesture.current_event_state())))
}

/// Every drag end must reach the controller, whatever button state gdk
/// reports by then.
fn release_event(button: Option<Button>, x: f64, y: f64) -> PointerEvent {
    PointerEvent::new(
        protractor::geometry::Point::new(x, y),
        button.unwrap_or(Button::Primary),
    )
}

/// Removes a timeout that may already have fired.
fn remove_source(id: glib::SourceId) {
    if glib::MainContext::default().find_source_by_id(&id).is_some() {
        id.remove();
    }
}

fn cursor_name(cursor: CursorShape) -> &'static str {
    match cursor {
        CursorShape::Default => "default",
        CursorShape::Move => "move",
        CursorShape::Resize => "ns-resize",
        CursorShape::Crosshair => "crosshair",
        CursorShape::Grab => "grab",
    }
}

#[relm4::component(pub)]
impl SimpleComponent for AppModel {
    type Init = (
        Controller<JsonFileStore>,
        async_channel::Receiver<AppEvent>,
    );
    type Input = AppMsg;
    type Output = ();

    view! {
        #[root]
        #[name = "window"]
        gtk::ApplicationWindow {
            set_title: Some("Floating Protractor"),
            add_css_class: "protractor-window",
            set_decorated: false,

            add_controller = gtk::EventControllerKey {
                connect_key_pressed[sender] => move |_, key, _, _| {
                    match map_key(key) {
                        Some(key) => {
                            sender.input(AppMsg::Key(key));
                            glib::Propagation::Stop
                        }
                        None => glib::Propagation::Proceed,
                    }
                }
            },

            gtk::Overlay {
                #[name = "drawing_area"]
                gtk::DrawingArea {
                    set_hexpand: true,
                    set_vexpand: true,
                    add_css_class: "protractor-drawing-area",

                    add_controller = gtk::EventControllerMotion {
                        connect_motion[sender] => move |controller, x, y| {
                            let event = PointerEvent::primary(x, y)
                                .with_shift(shift_held(controller.current_event_state()));
                            sender.input(AppMsg::Motion(event));
                        }
                    },

                    add_controller = gtk::GestureDrag {
                        set_button: 0, // Listen to all buttons
                        connect_drag_begin[sender] => move |gesture, x, y| {
                            if let Some(event) = pointer_event(gesture, x, y) {
                                sender.input(AppMsg::Press(event));
                            }
                        },
                        connect_drag_end[sender] => move |gesture, dx, dy| {
                            let (x, y) = gesture.start_point().unwrap_or_default();
                            sender.input(AppMsg::Release(release_event(
                                map_button(gesture.current_button()),
                                x + dx,
                                y + dy,
                            )));
                        }
                    }
                },

                add_overlay = &gtk::Label {
                    set_halign: gtk::Align::Center,
                    set_valign: gtk::Align::End,
                    set_margin_bottom: 24,
                    add_css_class: "protractor-status",
                    #[watch]
                    set_label: &model.status,
                    #[watch]
                    set_visible: !model.status.is_empty(),
                }
            }
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let (controller, rx) = init;

        theme::load_css();
        window::init_layer_shell(&root);

        let model = AppModel {
            controller: Rc::new(RefCell::new(controller)),
            status: String::new(),
            hold_timer: None,
            status_timer: None,
            root: root.clone(),
            drawing_area: gtk::DrawingArea::default(),
            menu: gtk::Popover::default(),
        };

        let widgets = view_output!();

        let mut model = model;
        model.drawing_area = widgets.drawing_area.clone();
        model.menu = menu::build(&model.drawing_area, &sender);

        let controller_draw = model.controller.clone();
        widgets.drawing_area.set_draw_func(move |_, cr, _, _| {
            let controller = controller_draw.borrow();
            if let Err(e) = painter::paint(cr, &controller.render(), controller.bounds()) {
                log::error!("Drawing error: {}", e);
            }
        });

        let sender_clone = sender.clone();
        relm4::spawn(async move {
            while let Ok(event) = rx.recv().await {
                sender_clone.input(AppMsg::from(event));
            }
        });

        root.present();
        sender.input(AppMsg::Activate);

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>) {
        let response = match msg {
            AppMsg::Press(event) => self.controller.borrow_mut().press(event),
            AppMsg::Motion(event) => self.controller.borrow_mut().motion(event),
            AppMsg::Release(event) => self.controller.borrow_mut().release(event),
            AppMsg::Key(key) => self.controller.borrow_mut().key_press(key),
            AppMsg::HoldElapsed(token) => {
                // the source is gone once it fired; never remove it again
                if self.hold_timer.as_ref().is_some_and(|(t, _)| *t == token) {
                    self.hold_timer = None;
                }
                self.controller.borrow_mut().hold_elapsed(token)
            }
            AppMsg::Activate => {
                window::set_interactive(&self.root, true);
                self.controller.borrow_mut().activate()
            }
            AppMsg::Deactivate => self.deactivate(),
            AppMsg::Clear => self.controller.borrow_mut().clear(),
            AppMsg::OpenSettings => {
                self.menu.popdown();
                self.open_settings();
                return;
            }
            AppMsg::Apply(record) => {
                self.menu.popdown();
                self.controller.borrow_mut().apply_settings(&record)
            }
            AppMsg::SettingsReload => match self.reload_settings() {
                Some(response) => response,
                None => return,
            },
            AppMsg::StatusExpired => {
                self.status_timer = None;
                self.status.clear();
                return;
            }
        };
        self.handle(response, &sender);
    }
}

impl AppModel {
    fn handle(&mut self, response: Response, sender: &ComponentSender<Self>) {
        for effect in response.effects {
            match effect {
                Effect::StartHoldTimer { token, delay } => {
                    self.cancel_hold_timer();
                    let sender = sender.clone();
                    let id = glib::timeout_add_local_once(delay, move || {
                        sender.input(AppMsg::HoldElapsed(token));
                    });
                    self.hold_timer = Some((token, id));
                }
                Effect::CancelHoldTimer(token) => {
                    if self.hold_timer.as_ref().is_some_and(|(t, _)| *t == token) {
                        self.cancel_hold_timer();
                    }
                }
                Effect::ShowContextMenu(pos) => menu::show_at(&self.menu, pos),
                Effect::OpenSettings => self.open_settings(),
                Effect::Feedback(feedback) => self.apply_feedback(&feedback),
                Effect::Status(text) => self.show_status(text, sender),
                Effect::Deactivated => {
                    window::set_interactive(&self.root, false);
                }
            }
        }

        if response.bounds_changed {
            match self.controller.borrow().bounds() {
                Some(b) => log::debug!(
                    "Overlay bounds: ({:.0}, {:.0}) r={:.0}",
                    b.center.x,
                    b.center.y,
                    b.radius
                ),
                None => log::debug!("Overlay bounds cleared"),
            }
        }
        if response.should_redraw {
            self.drawing_area.queue_draw();
        }
    }

    fn cancel_hold_timer(&mut self) {
        if let Some((_, id)) = self.hold_timer.take() {
            remove_source(id);
        }
    }

    fn deactivate(&mut self) -> Response {
        self.cancel_hold_timer();
        self.menu.popdown();
        window::set_interactive(&self.root, false);
        self.drawing_area.set_tooltip_text(None);
        self.controller.borrow_mut().deactivate()
    }

    fn apply_feedback(&self, feedback: &Feedback) {
        self.drawing_area
            .set_cursor_from_name(Some(cursor_name(feedback.cursor)));
        let tooltip = (!feedback.tooltip.is_empty()).then_some(feedback.tooltip.as_str());
        self.drawing_area.set_tooltip_text(tooltip);
    }

    fn show_status(&mut self, text: String, sender: &ComponentSender<Self>) {
        log::info!("{}", text);
        if let Some(id) = self.status_timer.take() {
            remove_source(id);
        }
        self.status = text;
        let sender = sender.clone();
        self.status_timer = Some(glib::timeout_add_local_once(STATUS_TIMEOUT, move || {
            sender.input(AppMsg::StatusExpired);
        }));
    }

    /// Makes sure the settings file exists and hands it to the desktop's
    /// editor. Saved edits come back through the watcher.
    fn open_settings(&mut self) {
        let mut controller = self.controller.borrow_mut();
        match controller.store_mut().ensure_file() {
            Ok(path) => {
                if let Err(e) = std::process::Command::new("xdg-open").arg(path).spawn() {
                    log::error!("Failed to open settings file: {}", e);
                }
            }
            Err(e) => log::error!("Failed to create settings file: {}", e),
        }
    }

    fn reload_settings(&mut self) -> Option<Response> {
        let mut controller = self.controller.borrow_mut();
        match controller.store_mut().reload() {
            Ok(true) => {
                let record = controller.store().snapshot();
                log::info!("Settings reloaded");
                Some(controller.apply_settings(&record))
            }
            Ok(false) => None,
            Err(e) => {
                log::error!("Failed to reload settings: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_sent_for_unmapped_button() {
        assert_eq!(map_button(8), None);
        let event = release_event(map_button(8), 10.0, 20.0);
        assert_eq!(event.button, Button::Primary);
        assert_eq!(event.pos, protractor::geometry::Point::new(10.0, 20.0));

        let event = release_event(map_button(gdk::BUTTON_SECONDARY), 0.0, 0.0);
        assert_eq!(event.button, Button::Secondary);
    }

    #[test]
    fn test_release_ends_drag_regardless_of_button() {
        let mut ctl = Controller::new(protractor::store::MemoryStore::new());
        ctl.activate();
        ctl.press(PointerEvent::primary(100.0, 100.0));
        ctl.release(PointerEvent::primary(100.0, 100.0));
        ctl.press(PointerEvent::primary(100.0, 100.0));
        assert_ne!(ctl.state().active_handle, protractor::tool::Handle::None);

        ctl.release(release_event(None, 100.0, 100.0));
        assert_eq!(ctl.state().active_handle, protractor::tool::Handle::None);
    }
}
