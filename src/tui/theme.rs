//! Color palettes, selected by `tui.theme`.

use ratatui::style::Color;

/// Names accepted for `tui.theme`.
pub const THEME_NAMES: &[&str] = &["dark", "light"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub background: Color,
    pub text: Color,
    /// Secondary text: hints, empty lists, key bindings
    pub muted: Color,
    pub border: Color,
    /// Focused pane border and titles
    pub accent: Color,
    /// Selected row and the header/status bars
    pub highlight: Color,
    pub door_open: Color,
    pub door_closed: Color,
    pub connected: Color,
    /// Deploy-in-progress banner
    pub busy: Color,
    pub error: Color,
}

impl Theme {
    pub const fn dark() -> Self {
        Self {
            name: "dark",
            background: Color::Rgb(24, 26, 32),
            text: Color::Rgb(220, 223, 228),
            muted: Color::Rgb(120, 126, 138),
            border: Color::Rgb(70, 76, 88),
            accent: Color::Rgb(97, 175, 239),
            highlight: Color::Rgb(44, 49, 60),
            door_open: Color::Rgb(152, 195, 121),
            door_closed: Color::Rgb(209, 154, 102),
            connected: Color::Rgb(152, 195, 121),
            busy: Color::Rgb(229, 192, 123),
            error: Color::Rgb(224, 108, 117),
        }
    }

    pub const fn light() -> Self {
        Self {
            name: "light",
            background: Color::Rgb(250, 250, 250),
            text: Color::Rgb(56, 58, 66),
            muted: Color::Rgb(160, 161, 167),
            border: Color::Rgb(200, 200, 205),
            accent: Color::Rgb(64, 120, 242),
            highlight: Color::Rgb(229, 229, 230),
            door_open: Color::Rgb(80, 161, 79),
            door_closed: Color::Rgb(193, 132, 1),
            connected: Color::Rgb(80, 161, 79),
            busy: Color::Rgb(152, 104, 1),
            error: Color::Rgb(228, 86, 73),
        }
    }

    /// Palette called `name`, if there is one.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_name_resolves() {
        for name in THEME_NAMES {
            assert_eq!(Theme::by_name(name).map(|t| t.name), Some(*name));
        }
        assert_eq!(Theme::by_name(" Light ").map(|t| t.name), Some("light"));
        assert!(Theme::by_name("solarized").is_none());
    }

    #[test]
    fn test_door_states_are_distinguishable() {
        for name in THEME_NAMES {
            let theme = Theme::by_name(name).unwrap();
            assert_ne!(theme.door_open, theme.door_closed);
            assert_ne!(theme.text, theme.background);
        }
    }
}
