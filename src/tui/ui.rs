//! UI rendering for the TUI.

use super::app::{App, FocusArea, Mode, ViewState};
use super::theme::Theme;
use crate::controller::DisplayState;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Set up the terminal for TUI rendering.
pub fn setup_terminal() -> io::Result<Tui> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(mut terminal: Tui) -> io::Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Render the entire UI.
pub fn render(app: &App, frame: &mut Frame) {
    draw(&app.view, &app.display, &app.theme, frame);
}

fn draw(view: &ViewState, display: &DisplayState, theme: &Theme, frame: &mut Frame) {
    let size = frame.area();

    // Main layout: header, body, path input, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(display, theme, frame, chunks[0]);
    render_body(view, display, theme, frame, chunks[1]);
    render_input(view, display, theme, frame, chunks[2]);
    render_status_bar(view, display, theme, frame, chunks[3]);

    if display.error_visible {
        render_error_overlay(display, theme, frame, size);
    }
    if view.mode == Mode::Help {
        render_help_overlay(theme, frame, size);
    }
}

fn border_style(theme: &Theme, focused: bool) -> Style {
    if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.border)
    }
}

fn render_header(display: &DisplayState, theme: &Theme, frame: &mut Frame, area: Rect) {
    let (session, session_color) = match &display.connected_port {
        Some(port) => (format!("Connected: {port}"), theme.connected),
        None => ("Not connected".to_string(), theme.muted),
    };

    let mut spans = vec![
        Span::styled(
            " servodoor ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(session, Style::default().fg(session_color)),
    ];
    if display.busy {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            "DEPLOYING",
            Style::default()
                .fg(theme.busy)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.highlight));
    frame.render_widget(header, area);
}

fn render_body(
    view: &ViewState,
    display: &DisplayState,
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(30),
            Constraint::Min(24),
            Constraint::Min(30),
        ])
        .split(area);

    let port_column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(8)])
        .split(columns[0]);

    render_port_list(view, display, theme, frame, port_column[0]);
    render_port_info(view, display, theme, frame, port_column[1]);
    render_doors(view, display, theme, frame, columns[1]);
    render_config(display, theme, frame, columns[2]);
}

fn render_port_list(
    view: &ViewState,
    display: &DisplayState,
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
) {
    let items: Vec<ListItem> = display
        .port_names
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let connected = display.connected_port.as_ref() == Some(port);
            let style = if i == view.selected_port {
                Style::default()
                    .fg(theme.text)
                    .bg(theme.highlight)
                    .add_modifier(Modifier::BOLD)
            } else if connected {
                Style::default().fg(theme.connected)
            } else {
                Style::default().fg(theme.text)
            };

            let prefix = if connected {
                "● "
            } else if i == view.selected_port {
                "> "
            } else {
                "  "
            };

            ListItem::new(format!("{prefix}{port}")).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(theme, view.focus == FocusArea::Ports))
            .title(" Ports "),
    );
    frame.render_widget(list, area);
}

fn render_port_info(
    view: &ViewState,
    display: &DisplayState,
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
) {
    let text = if display.is_connected() {
        display.port_info.clone()
    } else {
        display
            .port_details
            .get(view.selected_port)
            .cloned()
            .unwrap_or_default()
    };

    let info = Paragraph::new(text)
        .style(Style::default().fg(theme.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme, false))
                .title(" Port info "),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(info, area);
}

fn render_doors(
    view: &ViewState,
    display: &DisplayState,
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
) {
    let items: Vec<ListItem> = display
        .door_names
        .iter()
        .zip(&display.door_checks)
        .enumerate()
        .map(|(i, (name, open))| {
            let (mark, color) = if *open {
                ("[open] ", theme.door_open)
            } else {
                ("[close]", theme.door_closed)
            };
            let mut style = Style::default().fg(color);
            if view.focus == FocusArea::Doors && i == view.selected_door {
                style = style.bg(theme.highlight).add_modifier(Modifier::BOLD);
            }
            ListItem::new(format!("{mark} {name}")).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(theme, view.focus == FocusArea::Doors))
            .title(format!(" Doors ({}) ", display.num_doors)),
    );
    frame.render_widget(list, area);
}

fn render_config(display: &DisplayState, theme: &Theme, frame: &mut Frame, area: Rect) {
    let config = Paragraph::new(display.config_info.as_str())
        .style(Style::default().fg(theme.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme, false))
                .title(" Config "),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(config, area);
}

fn render_input(
    view: &ViewState,
    display: &DisplayState,
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
) {
    let editing = view.mode == Mode::PathInput;
    let title = if display.load_enabled {
        " Load config "
    } else {
        " Load config (open a device first) "
    };

    let content = if editing {
        Line::from(view.input.as_str())
    } else {
        Line::from(Span::styled(
            "press l to enter a config file path",
            Style::default().fg(theme.muted),
        ))
    };

    let input = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(theme, editing))
            .title(title),
    );
    frame.render_widget(input, area);

    if editing {
        let cursor_x = area.x + 1 + view.cursor as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn render_status_bar(
    view: &ViewState,
    display: &DisplayState,
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
) {
    let status_text = match &view.local_status {
        Some(local) => local.as_str(),
        None if display.status.is_empty() => "Ready",
        None => display.status.as_str(),
    };

    let keybinds = format!(
        "Enter:{}  Space:toggle  l:load  c:cancel  r:refresh  Tab:focus  ?:help  q:quit",
        display.open_close
    );

    let status = Line::from(vec![
        Span::styled(format!(" {status_text} "), Style::default().fg(theme.text)),
        Span::raw(" | "),
        Span::styled(keybinds, Style::default().fg(theme.muted)),
    ]);

    let status_widget = Paragraph::new(status).style(Style::default().bg(theme.highlight));
    frame.render_widget(status_widget, area);
}

fn render_error_overlay(display: &DisplayState, theme: &Theme, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(display.error_message.as_str()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc to dismiss",
            Style::default().fg(theme.muted),
        )),
    ];

    let popup = Paragraph::new(text)
        .style(Style::default().fg(theme.error))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.error))
                .title(" Error ")
                .style(Style::default().bg(theme.background)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(popup, popup_area);
}

fn render_help_overlay(theme: &Theme, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keybindings",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  Up/Down j/k - Move selection"),
        Line::from("  Tab         - Switch between ports and doors"),
        Line::from("  Enter / o   - Open or close the selected port"),
        Line::from("  Space       - Toggle the selected door"),
        Line::from("  l           - Enter a config file to deploy"),
        Line::from("  c           - Cancel a deploy in progress"),
        Line::from("  r           - Refresh the port list"),
        Line::from("  Esc         - Dismiss an error"),
        Line::from("  ? / F1      - Show help"),
        Line::from("  q           - Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or F1 to close",
            Style::default().fg(theme.muted),
        )),
    ];

    let help_widget = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent))
                .title(" Help ")
                .style(Style::default().bg(theme.background)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_widget, popup_area);
}

/// Create a centered rectangle with the given percentage of the parent area.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
