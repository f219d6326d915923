use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
};

use crate::app::App;

const ACCENT: Color = Color::Rgb(138, 180, 248);
const DIM: Color = Color::Rgb(128, 128, 128);
const SURFACE: Color = Color::Rgb(30, 30, 30);
const SURFACE_BRIGHT: Color = Color::Rgb(45, 45, 45);
const SUCCESS: Color = Color::Rgb(129, 199, 132);
const WARNING: Color = Color::Rgb(255, 183, 77);
const TEXT: Color = Color::Rgb(230, 230, 230);
const TEXT_DIM: Color = Color::Rgb(160, 160, 160);

pub fn draw(f: &mut Frame, app: &App) {
    f.render_widget(
        Block::default().style(Style::default().bg(SURFACE)),
        f.area(),
    );

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, app, outer[0]);

    let main_area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(outer[1])[1];

    let content = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(main_area);

    draw_log(f, app, content[0]);
    draw_input(f, app, content[1]);
    draw_status_bar(f, outer[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let (state, state_color) = match app.listen_addr {
        Some(addr) => (format!(" ● {addr} "), SUCCESS),
        None => (format!(" ○ {} ", app.configured_addr), DIM),
    };

    let header = Line::from(vec![
        Span::styled(" linechat ", Style::default().fg(ACCENT).bold()),
        Span::styled("│", Style::default().fg(DIM)),
        Span::raw(" "),
        Span::styled(app.status.clone(), Style::default().fg(TEXT_DIM)),
    ]);

    f.render_widget(
        Paragraph::new(header).style(Style::default().bg(SURFACE_BRIGHT)),
        area,
    );
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            state,
            Style::default().fg(state_color),
        )))
        .alignment(Alignment::Right),
        area,
    );
}

fn line_style(line: &str) -> Style {
    if line.starts_with("[ERROR]") {
        Style::default().fg(WARNING)
    } else if line.starts_with("[BROADCAST]") {
        Style::default().fg(ACCENT)
    } else if line.starts_with("[NEW CONNECTION]") || line.starts_with("[SERVER") {
        Style::default().fg(SUCCESS)
    } else if line.starts_with("[DISCONNECT]") || line.starts_with("[PEER]") {
        Style::default().fg(TEXT_DIM)
    } else {
        Style::default().fg(TEXT)
    }
}

fn draw_log(f: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let end = app.log.len().saturating_sub(app.scroll);
    let start = end.saturating_sub(visible);

    let items: Vec<ListItem> = app.log[start..end]
        .iter()
        .map(|line| ListItem::new(Line::from(Span::styled(line.as_str(), line_style(line)))))
        .collect();

    let title = if app.scroll > 0 {
        format!(" Log (↑{}) ", app.scroll)
    } else {
        " Log ".to_string()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(DIM))
            .title(Span::styled(title, Style::default().fg(TEXT_DIM)))
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(list, area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let input = Paragraph::new(Line::from(vec![
        Span::styled("› ", Style::default().fg(ACCENT)),
        Span::styled(app.input.as_str(), Style::default().fg(TEXT)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .title(Span::styled(" Broadcast ", Style::default().fg(ACCENT))),
    );
    f.render_widget(input, area);

    let cursor_x = area.x + 3 + app.input.chars().count() as u16;
    if cursor_x < area.x + area.width.saturating_sub(1) {
        f.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn draw_status_bar(f: &mut Frame, area: Rect) {
    let help = Line::from(vec![
        Span::styled(" enter", Style::default().fg(ACCENT)),
        Span::styled(" send  ", Style::default().fg(DIM)),
        Span::styled("/start /stop /peers /help", Style::default().fg(ACCENT)),
        Span::styled("  pgup/pgdn", Style::default().fg(ACCENT)),
        Span::styled(" scroll  ", Style::default().fg(DIM)),
        Span::styled("ctrl-c", Style::default().fg(ACCENT)),
        Span::styled(" quit", Style::default().fg(DIM)),
    ]);
    f.render_widget(
        Paragraph::new(help).style(Style::default().bg(SURFACE_BRIGHT)),
        area,
    );
}
