//! TUI application state and main loop.
//!
//! The TUI holds no lifecycle state of its own. It draws the latest
//! [`DisplayState`] published by the session controller and turns key
//! presses into [`Command`]s.

use crate::config::Config;
use crate::controller::{Command, ControllerHandle, DisplayState};
use crate::error::AppResult;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;

use super::event::{Event, EventHandler};
use super::theme::{Theme, THEME_NAMES};
use super::ui;

/// Application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Navigation
    #[default]
    Normal,
    /// Typing the path of a configuration file to deploy
    PathInput,
    /// Help overlay
    Help,
}

/// Focus area in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusArea {
    #[default]
    Ports,
    Doors,
}

/// Local view state: selections, mode and the path being typed.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub mode: Mode,
    pub focus: FocusArea,
    pub selected_port: usize,
    pub selected_door: usize,
    pub input: String,
    /// Cursor position in `input`, counted in characters
    pub cursor: usize,
    /// Message from the TUI itself, cleared by the next key press
    pub local_status: Option<String>,
    pub quitting: bool,
}

impl ViewState {
    /// Keep selections inside the lists currently published.
    pub fn clamp(&mut self, display: &DisplayState) {
        self.selected_port = self
            .selected_port
            .min(display.port_names.len().saturating_sub(1));
        self.selected_door = self.selected_door.min(display.num_doors.saturating_sub(1));
    }

    /// Handle one key press, returning the command it asks for.
    pub fn on_key(&mut self, key: KeyEvent, display: &DisplayState) -> Option<Command> {
        self.local_status = None;
        match self.mode {
            Mode::Normal => self.on_normal_key(key, display),
            Mode::PathInput => self.on_path_key(key),
            Mode::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
                    self.mode = Mode::Normal;
                }
                None
            }
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent, display: &DisplayState) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') => {
                self.quitting = true;
                None
            }
            KeyCode::F(1) | KeyCode::Char('?') => {
                self.mode = Mode::Help;
                None
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    FocusArea::Ports => FocusArea::Doors,
                    FocusArea::Doors => FocusArea::Ports,
                };
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(display, -1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(display, 1);
                None
            }
            KeyCode::Enter | KeyCode::Char('o') => {
                let port = match &display.connected_port {
                    Some(port) => port.clone(),
                    None => display
                        .port_names
                        .get(self.selected_port)
                        .cloned()
                        .unwrap_or_default(),
                };
                Some(Command::OpenClose { port })
            }
            KeyCode::Char(' ') if self.focus == FocusArea::Doors => {
                let index = self.selected_door;
                let name = display.door_names.get(index)?.clone();
                let open = !display.door_checks.get(index).copied().unwrap_or(false);
                Some(Command::ToggleDoor { index, name, open })
            }
            KeyCode::Char('l') => {
                if display.load_enabled {
                    self.mode = Mode::PathInput;
                    self.input.clear();
                    self.cursor = 0;
                } else {
                    self.local_status = Some("open a device before loading a config".to_string());
                }
                None
            }
            KeyCode::Char('c') => Some(Command::Cancel),
            KeyCode::Char('r') => Some(Command::Tick),
            KeyCode::Esc if display.error_visible => Some(Command::DismissError),
            _ => None,
        }
    }

    fn on_path_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                None
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let path = self.input.trim().to_string();
                if path.is_empty() {
                    return None;
                }
                Some(Command::LoadConfig { path })
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index();
                    self.input.remove(at);
                }
                None
            }
            KeyCode::Delete => {
                if self.cursor < self.input.chars().count() {
                    let at = self.byte_index();
                    self.input.remove(at);
                }
                None
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.input.chars().count());
                None
            }
            KeyCode::Home => {
                self.cursor = 0;
                None
            }
            KeyCode::End => {
                self.cursor = self.input.chars().count();
                None
            }
            KeyCode::Char(c) => {
                let at = self.byte_index();
                self.input.insert(at, c);
                self.cursor += 1;
                None
            }
            _ => None,
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn move_selection(&mut self, display: &DisplayState, delta: isize) {
        let (selected, len) = match self.focus {
            FocusArea::Ports => (&mut self.selected_port, display.port_names.len()),
            FocusArea::Doors => (&mut self.selected_door, display.num_doors),
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        *selected = selected.saturating_add_signed(delta).min(len - 1);
    }
}

/// Main TUI application.
pub struct App {
    pub view: ViewState,
    pub theme: Theme,
    /// Last state published by the controller
    pub display: DisplayState,
    handle: ControllerHandle,
    tick_rate: std::time::Duration,
}

impl App {
    pub fn new(handle: ControllerHandle, config: &Config) -> Self {
        let theme = Theme::by_name(&config.tui.theme).unwrap_or_else(|| {
            warn!(theme = %config.tui.theme, known = ?THEME_NAMES, "unknown theme, using dark");
            Theme::default()
        });

        Self {
            view: ViewState::default(),
            theme,
            display: handle.display(),
            handle,
            tick_rate: config.tui.refresh_interval(),
        }
    }

    /// Run until the operator quits, then shut the controller down.
    pub async fn run(mut self) -> AppResult<()> {
        let mut terminal = ui::setup_terminal()?;
        let events = EventHandler::new(self.tick_rate);

        let result = self.event_loop(&mut terminal, &events);

        ui::restore_terminal(terminal)?;
        self.handle.shutdown().await?;
        result
    }

    fn event_loop(&mut self, terminal: &mut ui::Tui, events: &EventHandler) -> AppResult<()> {
        while !self.view.quitting {
            self.display = self.handle.display();
            self.view.clamp(&self.display);
            terminal.draw(|frame| ui::render(self, frame))?;

            match tokio::task::block_in_place(|| events.next()) {
                Ok(Event::Key(key)) => {
                    if let Some(command) = self.view.on_key(key, &self.display) {
                        self.dispatch(command);
                    }
                }
                Ok(Event::Tick) | Ok(Event::Resize(_, _)) => {}
                Ok(Event::Error(e)) => {
                    warn!(error = %e, "terminal input error");
                    self.view.local_status = Some(format!("input error: {e}"));
                }
                Err(_) => self.view.quitting = true,
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, command: Command) {
        if let Err(e) = self.handle.try_send(command) {
            warn!(error = %e, "command dropped");
            self.view.local_status = Some(e.to_string());
        }
    }
}
