pub mod app;
pub mod menu;
pub mod painter;
pub mod theme;
pub mod window;
