//! Event handling for the TUI.

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Terminal events.
#[derive(Debug, Clone)]
pub enum Event {
    /// Redraw tick
    Tick,
    /// Keyboard input
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// Reading the terminal failed
    Error(String),
}

/// Event handler that polls for terminal events on its own thread.
pub struct EventHandler {
    receiver: mpsc::Receiver<Event>,
    #[allow(dead_code)]
    handler: thread::JoinHandle<()>,
}

impl EventHandler {
    /// Create a new event handler with the specified tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();

        let handler = thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                if event::poll(timeout).unwrap_or(false) {
                    let forwarded = match event::read() {
                        // Windows reports both press and release.
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            sender.send(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Resize(width, height)) => {
                            sender.send(Event::Resize(width, height))
                        }
                        Ok(_) => Ok(()),
                        Err(e) => sender.send(Event::Error(e.to_string())),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if sender.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { receiver, handler }
    }

    /// Get the next event, blocking until one is available.
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.receiver.recv()
    }
}
