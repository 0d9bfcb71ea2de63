//! Input events consumed by the session controller.

/// Requests from the presentation layer or the poll timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a session on `port`, or close the open one.
    OpenClose { port: String },
    /// A door switch was flipped. `index` is the switch position as displayed.
    ToggleDoor { index: usize, name: String, open: bool },
    /// Deploy a configuration file. May carry a `file://` prefix.
    LoadConfig { path: String },
    /// Re-poll the port directory.
    Tick,
    DismissError,
    /// Stop an in-flight deploy at the next safe point.
    Cancel,
    Shutdown,
}

impl Command {
    /// Commands that would change the session while a deploy owns it.
    pub fn mutates_session(&self) -> bool {
        matches!(
            self,
            Self::OpenClose { .. } | Self::ToggleDoor { .. } | Self::LoadConfig { .. }
        )
    }
}
