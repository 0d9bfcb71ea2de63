//! Terminal user interface for servodoor.
//!
//! A ratatui front end over the session controller: a port list with
//! per-port info, the door switches of the open session, the controller's
//! configuration, and a path prompt for deploying a new config file.
//!
//! # Example
//!
//! ```rust,ignore
//! use servodoor::tui::App;
//!
//! let handle = controller.spawn();
//! App::new(handle, &config).run().await?;
//! ```

mod app;
mod event;
mod theme;
mod ui;

pub use app::{App, FocusArea, Mode, ViewState};
pub use event::{Event, EventHandler};
pub use theme::{Theme, THEME_NAMES};
pub use ui::render;
