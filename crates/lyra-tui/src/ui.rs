use std::time::Instant;

use lyra_core::clock::{format_date, format_time, format_with, timezone_display_name};
use lyra_core::desktop::{
    context_rows, is_checked, parse_hex_color, ContextRow, QuickApp, ViewMode, CONTEXT_ACTIONS,
    CONTEXT_MENU_HEIGHT, CONTEXT_MENU_WIDTH,
};
use lyra_core::{AppDescriptor, ChatMessage};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Screen};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];
const TYPING_DOTS: [&str; 3] = ["● ○ ○", "○ ● ○", "○ ○ ●"];
const START_MENU_WIDTH: u16 = 34;
const SEARCH_WIDTH: u16 = 40;
const TOOLTIP_MAX_WIDTH: u16 = 40;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after[end + 2..];
            }
            // No closing **, treat as literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Accent color from an app's `#rrggbb`, blue when unparseable
fn accent_color(color: &str) -> Color {
    parse_hex_color(color)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Blue)
}

/// Terminal glyph for a Material icon name, falling back to the app's initial
pub(crate) fn icon_glyph(icon: &str, name: &str) -> String {
    let glyph = match icon {
        "chat" | "forum" | "sms" | "smart_toy" => "≡",
        "folder" | "folder_open" => "▤",
        "language" | "public" | "travel_explore" => "◎",
        "mail" | "email" => "✉",
        "settings" => "⚙",
        "calculate" => "±",
        "music_note" | "headphones" => "♪",
        "photo" | "image" | "photo_library" => "▣",
        "calendar_today" | "event" => "▦",
        "code" | "terminal" => "›",
        "edit" | "edit_note" | "description" => "✎",
        "search" => "⌕",
        "school" | "psychology" => "✦",
        "trending_up" | "show_chart" | "analytics" => "↗",
        "account_balance_wallet" | "wallet" | "payments" => "◈",
        _ => {
            return name
                .chars()
                .next()
                .map(|c| c.to_uppercase().to_string())
                .unwrap_or_else(|| "?".to_string())
        }
    };
    glyph.to_string()
}

/// Shorten `text` to `max` columns, ending in an ellipsis when cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

/// Color `step` of `steps` along a vertical gradient
pub(crate) fn gradient_color(start: (u8, u8, u8), end: (u8, u8, u8), step: u16, steps: u16) -> Color {
    let t = if steps <= 1 {
        0.0
    } else {
        step as f32 / (steps - 1) as f32
    };
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color::Rgb(mix(start.0, end.0), mix(start.1, end.1), mix(start.2, end.2))
}

/// Icon cells for `count` apps laid out row by row; icons that do not fit
/// are left off. Returns the cells and the column count.
pub(crate) fn icon_layout(count: usize, area: Rect, view_mode: ViewMode) -> (Vec<Rect>, usize) {
    let (cell_w, cell_h) = view_mode.cell_size();
    let columns = (area.width / cell_w).max(1) as usize;
    let mut cells = Vec::with_capacity(count);

    for i in 0..count {
        let col = (i % columns) as u16;
        let row = (i / columns) as u16;
        let y = area.y + row * cell_h;
        if y + cell_h > area.y + area.height {
            break;
        }
        let x = area.x + col * cell_w;
        cells.push(Rect::new(x, y, cell_w.min(area.width), cell_h));
    }

    (cells, columns)
}

/// Rect of `width`x`height` centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    app.screen_area = area;

    match app.screen {
        Screen::Loading => render_loading(app, frame, area),
        Screen::Desktop => render_desktop(app, frame, area),
    }
}

fn render_loading(app: &App, frame: &mut Frame, area: Rect) {
    let (start, end) = app.background.current();
    paint_background(frame, area, start, end);

    let spinner = SPINNER[(app.tick_count as usize + app.animation_frame as usize) % SPINNER.len()];
    let text = Text::from(vec![
        Line::from(Span::styled("Lyra OS", Style::default().fg(Color::White).bold())),
        Line::default(),
        Line::from(vec![
            Span::styled(spinner, Style::default().fg(Color::White)),
            Span::raw(" Loading apps..."),
        ]),
    ]);

    let popup = centered(area, 24, 3);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White)),
        popup,
    );
}

fn render_desktop(app: &mut App, frame: &mut Frame, area: Rect) {
    let [status_area, desktop_area, taskbar_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);
    app.desktop_area = desktop_area;

    let (start, end) = app.background.current();
    paint_background(frame, desktop_area, start, end);

    render_icons(app, frame, desktop_area);
    render_status_bar(app, frame, status_area);
    render_taskbar(app, frame, taskbar_area);

    let now = Instant::now();
    if !app.dialog_open {
        render_tooltip(app, frame, area, now);
    }

    // Popups (in order of priority)
    if app.start_menu.open {
        render_start_menu(app, frame, desktop_area);
    } else {
        app.start_menu_area = None;
    }
    if app.search.open {
        render_search(app, frame, desktop_area);
    } else {
        app.search_area = None;
    }
    if app.context_menu.open {
        render_context_menu(app, frame, area);
    }

    if app.dialog_open {
        render_chat_dialog(app, frame, area);
    } else {
        app.dialog_area = None;
    }
}

fn paint_background(frame: &mut Frame, area: Rect, start: &str, end: &str) {
    let start = parse_hex_color(start).unwrap_or((0, 91, 234));
    let end = parse_hex_color(end).unwrap_or(start);

    let buf = frame.buffer_mut();
    for row in 0..area.height {
        let color = gradient_color(start, end, row, area.height);
        buf.set_style(
            Rect::new(area.x, area.y + row, area.width, 1),
            Style::default().bg(color),
        );
    }
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let logo = Line::from(vec![
        Span::styled(" ◆ ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("Lyra OS", Style::default().fg(Color::White).bold()),
        Span::styled(
            format!(" v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let clock = Line::from(vec![
        Span::styled(
            format_time(app.now, app.timezone),
            Style::default().fg(Color::White).bold(),
        ),
        Span::raw("  "),
        Span::styled(format_date(app.now, app.timezone), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(
            timezone_display_name(app.timezone),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
    ])
    .alignment(Alignment::Right);

    let bar_style = Style::default().bg(Color::Black);
    frame.render_widget(Paragraph::new(logo).style(bar_style), area);
    frame.render_widget(Paragraph::new(clock), area);
}

fn render_icons(app: &mut App, frame: &mut Frame, area: Rect) {
    // Leave a margin around the icon grid
    let grid = Rect::new(
        area.x + 1,
        area.y + 1,
        area.width.saturating_sub(2),
        area.height.saturating_sub(1),
    );

    let (cells, columns) = icon_layout(app.sorted_apps.len(), grid, app.view_mode);
    app.icon_columns = columns;
    app.icon_areas = cells;

    if app.sorted_apps.is_empty() {
        let message = Paragraph::new("No apps available")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White).italic());
        frame.render_widget(message, centered(area, 30, 1));
        return;
    }

    let now = Instant::now();
    for (i, (desc, cell)) in app.sorted_apps.iter().zip(app.icon_areas.iter()).enumerate() {
        let state = IconState {
            selected: i == app.selected_icon,
            flashing: app.icon_flash.is_active(&desc.id, now),
            hovered: app.tooltip.hovered() == Some(i),
        };
        render_icon(frame, *cell, desc, app.view_mode, state);
    }
}

#[derive(Clone, Copy)]
struct IconState {
    selected: bool,
    flashing: bool,
    hovered: bool,
}

fn render_icon(frame: &mut Frame, cell: Rect, desc: &AppDescriptor, view_mode: ViewMode, state: IconState) {
    let badge = Span::styled(
        format!(" {} ", icon_glyph(&desc.icon, &desc.name)),
        Style::default().bg(accent_color(&desc.color)).fg(Color::White).bold(),
    );

    let mut name_style = Style::default().fg(Color::White).bold();
    if state.hovered {
        name_style = name_style.add_modifier(Modifier::UNDERLINED);
    }
    let name_width = cell.width.saturating_sub(2) as usize;

    let (lines, alignment) = match view_mode {
        ViewMode::Large => (
            vec![
                Line::default(),
                Line::from(badge),
                Line::default(),
                Line::from(Span::styled(truncate(&desc.name, name_width), name_style)),
            ],
            Alignment::Center,
        ),
        ViewMode::Medium => (
            vec![
                Line::default(),
                Line::from(badge),
                Line::from(Span::styled(truncate(&desc.name, name_width), name_style)),
            ],
            Alignment::Center,
        ),
        ViewMode::Small => (
            vec![
                Line::from(badge),
                Line::from(Span::styled(truncate(&desc.name, name_width), name_style)),
            ],
            Alignment::Center,
        ),
        ViewMode::List => (
            vec![Line::from(vec![
                badge,
                Span::raw(" "),
                Span::styled(truncate(&desc.name, name_width.saturating_sub(4)), name_style),
            ])],
            Alignment::Left,
        ),
    };

    let cell_style = if state.flashing {
        Style::default().bg(Color::White).fg(Color::Black)
    } else if state.selected {
        Style::default().bg(Color::Rgb(30, 30, 46))
    } else {
        Style::default()
    };

    // Keep one column between neighboring cells
    let inner = Rect::new(cell.x, cell.y, cell.width.saturating_sub(1), cell.height);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(alignment)
            .style(cell_style),
        inner,
    );
}

fn render_tooltip(app: &App, frame: &mut Frame, screen: Rect, now: Instant) {
    let Some(index) = app.tooltip.visible(now) else {
        return;
    };
    let (Some(desc), Some(cell)) = (app.sorted_apps.get(index), app.icon_areas.get(index)) else {
        return;
    };

    let text = desc.description_text().unwrap_or(desc.name.as_str());
    let width = (text.chars().count() as u16 + 2)
        .min(TOOLTIP_MAX_WIDTH)
        .min(screen.width);
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let lines = (text.chars().count().div_ceil(inner_width)).max(1) as u16;
    let height = (lines + 2).min(screen.height);

    // Below the icon when there is room, otherwise above it
    let y = if cell.y + cell.height + height <= screen.height {
        cell.y + cell.height
    } else {
        cell.y.saturating_sub(height)
    };
    let x = cell.x.min(screen.width.saturating_sub(width));
    let area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, area);
    let tooltip = Paragraph::new(text.to_string())
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black).fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(tooltip, area);
}

fn render_taskbar(app: &mut App, frame: &mut Frame, area: Rect) {
    let bar_style = Style::default().bg(Color::Rgb(24, 24, 37)).fg(Color::White);
    frame.render_widget(Paragraph::new("").style(bar_style), area);

    let now = Instant::now();
    let mut x = area.x;
    let mut spans: Vec<Span> = Vec::new();

    // Returns the rect a button of `label` takes at the current position
    let mut place = |label: String, style: Style, spans: &mut Vec<Span>| -> Rect {
        let width = label.chars().count() as u16;
        let rect = Rect::new(x, area.y, width.min(area.right().saturating_sub(x)), 1);
        x = x.saturating_add(width + 1);
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
        rect
    };

    let active = Style::default().bg(Color::Blue).fg(Color::White).bold();
    let idle = Style::default().bg(Color::Rgb(49, 50, 68)).fg(Color::White);

    let start_style = if app.start_menu.open { active } else { idle };
    let start_rect = place(" ⊞ Start ".to_string(), start_style, &mut spans);

    let search_style = if app.search.open { active } else { idle };
    let search_rect = place(" ⌕ Search ".to_string(), search_style, &mut spans);

    let mut quick_rects = Vec::with_capacity(3);
    for (n, quick) in QuickApp::all().into_iter().enumerate() {
        let style = if app.quick_flash.is_active(&quick, now) {
            Style::default().bg(Color::White).fg(Color::Black).bold()
        } else if app.active_app().is_some_and(|a| a.id == quick.app_id()) {
            idle.underlined()
        } else {
            idle
        };
        let rect = place(format!(" {} {} ", n + 1, quick.label()), style, &mut spans);
        quick_rects.push((quick, rect));
    }

    app.start_button_area = Some(start_rect);
    app.search_button_area = Some(search_rect);
    app.quick_app_areas = quick_rects;

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bar_style), area);

    let clock = Line::from(vec![
        Span::styled(format_time(app.now, app.timezone), Style::default().bold()),
        Span::raw("  "),
        Span::raw(format_with(app.now, "%b %-d", app.timezone)),
        Span::raw(" "),
    ])
    .alignment(Alignment::Right);
    frame.render_widget(Paragraph::new(clock), area);
}

fn render_start_menu(app: &mut App, frame: &mut Frame, desktop: Rect) {
    let apps = app.recommended_apps();
    let height = (apps.len().max(1) as u16 + 3).min(desktop.height);
    let width = START_MENU_WIDTH.min(desktop.width);
    // Rises from the taskbar at the left edge
    let area = Rect::new(desktop.x, desktop.bottom().saturating_sub(height), width, height);

    let mut lines = vec![Line::from(Span::styled(
        "Recommended Apps",
        Style::default().fg(Color::Gray).bold(),
    ))];
    if apps.is_empty() {
        lines.push(Line::from(Span::styled(
            "No apps available",
            Style::default().fg(Color::DarkGray).italic(),
        )));
    }
    let name_width = width.saturating_sub(8) as usize;
    for (i, desc) in apps.iter().enumerate() {
        let style = if i == app.start_menu.selected {
            Style::default().bg(Color::Blue).fg(Color::White).bold()
        } else {
            Style::default()
        };
        lines.push(
            Line::from(vec![
                Span::styled(
                    format!(" {} ", icon_glyph(&desc.icon, &desc.name)),
                    Style::default().bg(accent_color(&desc.color)).fg(Color::White),
                ),
                Span::raw(" "),
                Span::raw(truncate(&desc.name, name_width)),
            ])
            .style(style),
        );
    }

    frame.render_widget(Clear, area);
    let menu = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(Color::Rgb(30, 30, 46)).fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Start "),
        );
    frame.render_widget(menu, area);
    app.start_menu_area = Some(area);
}

fn render_search(app: &mut App, frame: &mut Frame, desktop: Rect) {
    let rows = app.search.results.len().max(1) as u16;
    let height = (rows + 3).min(desktop.height);
    let width = SEARCH_WIDTH.min(desktop.width);
    let anchor = app.search_button_area.map(|r| r.x).unwrap_or(desktop.x);
    let x = anchor.min(desktop.right().saturating_sub(width));
    let area = Rect::new(x, desktop.bottom().saturating_sub(height), width, height);

    let mut lines = vec![Line::from(vec![
        Span::styled("⌕ ", Style::default().fg(Color::Cyan)),
        Span::raw(app.search.query.clone()),
    ])];

    if app.search.results.is_empty() {
        let hint = if app.search.query.trim().is_empty() {
            "Type to search apps"
        } else {
            "No apps found"
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray).italic(),
        )));
    }
    let name_width = width.saturating_sub(8) as usize;
    for (i, desc) in app.search.results.iter().enumerate() {
        let style = if i == app.search.selected {
            Style::default().bg(Color::Blue).fg(Color::White).bold()
        } else {
            Style::default()
        };
        lines.push(
            Line::from(vec![
                Span::styled(
                    format!(" {} ", icon_glyph(&desc.icon, &desc.name)),
                    Style::default().bg(accent_color(&desc.color)).fg(Color::White),
                ),
                Span::raw(" "),
                Span::raw(truncate(&desc.name, name_width)),
            ])
            .style(style),
        );
    }

    frame.render_widget(Clear, area);
    let popup = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(Color::Rgb(30, 30, 46)).fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Search apps (Esc to close) "),
        );
    frame.render_widget(popup, area);
    app.search_area = Some(area);

    if !app.dialog_open {
        let cursor_x = (app.search.query.chars().count() as u16 + 3).min(width.saturating_sub(2));
        frame.set_cursor_position((area.x + cursor_x, area.y + 1));
    }
}

fn render_context_menu(app: &App, frame: &mut Frame, screen: Rect) {
    let menu = &app.context_menu;
    let area = Rect::new(menu.x, menu.y, CONTEXT_MENU_WIDTH, CONTEXT_MENU_HEIGHT).intersection(screen);
    let inner_width = CONTEXT_MENU_WIDTH.saturating_sub(2) as usize;

    let lines: Vec<Line> = context_rows()
        .into_iter()
        .map(|row| match row {
            ContextRow::Header(title) => Line::from(Span::styled(
                format!(" {}", title),
                Style::default().fg(Color::Gray).bold(),
            )),
            ContextRow::Separator => Line::from(Span::styled(
                "─".repeat(inner_width),
                Style::default().fg(Color::DarkGray),
            )),
            ContextRow::Action(index) => {
                let action = CONTEXT_ACTIONS[index];
                let mark = if is_checked(action, app.view_mode, app.sort_mode) {
                    "✓"
                } else {
                    " "
                };
                let style = if index == menu.selected {
                    Style::default().bg(Color::Blue).fg(Color::White).bold()
                } else {
                    Style::default()
                };
                Line::from(format!("  {} {:<width$}", mark, action.label(), width = inner_width - 4))
                    .style(style)
            }
        })
        .collect();

    frame.render_widget(Clear, area);
    let widget = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(Color::Rgb(30, 30, 46)).fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(widget, area);
}

fn message_lines(msg: &ChatMessage, title: &str, accent: Color, app: &App) -> Vec<Line<'static>> {
    let time = format_time(msg.timestamp, app.timezone);
    let mut lines = Vec::new();

    if msg.is_from_app() {
        lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(accent)),
            Span::styled(title.to_string(), Style::default().fg(accent).bold()),
            Span::styled(format!("  {}", time), Style::default().fg(Color::DarkGray)),
        ]));
        for line in msg.content.lines() {
            lines.push(parse_markdown_line(line));
        }
    } else {
        lines.push(
            Line::from(vec![
                Span::styled(format!("{}  ", time), Style::default().fg(Color::DarkGray)),
                Span::styled("You", Style::default().fg(Color::Cyan).bold()),
            ])
            .alignment(Alignment::Right),
        );
        for line in msg.content.lines() {
            lines.push(
                Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan)))
                    .alignment(Alignment::Right),
            );
        }
    }
    lines.push(Line::default());
    lines
}

fn render_chat_dialog(app: &mut App, frame: &mut Frame, screen: Rect) {
    let Some(session) = app.session.as_ref() else {
        app.dialog_area = None;
        return;
    };
    let desc = session.app().clone();
    let accent = accent_color(&desc.color);

    let width = 80.min(screen.width.saturating_sub(4)).max(20.min(screen.width));
    let height = 30.min(screen.height.saturating_sub(2)).max(8.min(screen.height));
    let area = centered(screen, width, height);
    app.dialog_area = Some(area);

    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .title(Line::from(vec![
            Span::raw(" "),
            Span::styled(
                format!(" {} ", icon_glyph(&desc.icon, &desc.name)),
                Style::default().bg(accent).fg(Color::White).bold(),
            ),
            Span::styled(format!(" {} ", desc.dialog_title()), Style::default().bold()),
        ]))
        .title_bottom(Line::from(" Esc close · PgUp/PgDn scroll ").right_aligned())
        .style(Style::default().bg(Color::Rgb(30, 30, 46)).fg(Color::White));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [status_area, messages_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);

    let status = Line::from(vec![
        Span::styled(" ● ", Style::default().fg(Color::Green)),
        Span::styled("Online", Style::default().fg(Color::Green)),
    ]);
    frame.render_widget(Paragraph::new(status), status_area);

    // Store chat area dimensions for scroll calculations
    app.chat_view_height = messages_area.height;
    app.chat_view_width = messages_area.width;
    if app.chat_follow {
        app.scroll_chat_to_bottom();
    }

    let Some(session) = app.session.as_ref() else {
        return;
    };
    let title = desc.dialog_title().to_string();

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled("── Today ──", Style::default().fg(Color::DarkGray)))
            .alignment(Alignment::Center),
        Line::default(),
    ];
    for msg in session.messages() {
        lines.extend(message_lines(msg, &title, accent, app));
    }
    if session.is_typing() {
        lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(accent)),
            Span::styled(title.clone(), Style::default().fg(accent).bold()),
        ]));
        lines.push(Line::from(Span::styled(
            TYPING_DOTS[app.animation_frame as usize % TYPING_DOTS.len()],
            Style::default().fg(Color::Gray),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, messages_area);

    // Input at the bottom
    let awaiting = app.is_awaiting_reply();
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if awaiting { Color::DarkGray } else { accent }))
        .title(if awaiting {
            " Waiting for reply... "
        } else {
            " Enter to send "
        });

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.chat_input.is_empty() {
        Paragraph::new(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = app
            .chat_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::White))
    };
    frame.render_widget(input.block(input_block), input_area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_named, offline_app};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let unclosed = parse_markdown_line("a **b");
        assert_eq!(unclosed.spans.len(), 1);
        assert_eq!(unclosed.spans[0].content, "a **b");
    }

    #[test]
    fn test_icon_glyph_fallback_to_initial() {
        assert_eq!(icon_glyph("folder", "Files"), "▤");
        assert_eq!(icon_glyph("unknown_icon", "notes"), "N");
        assert_eq!(icon_glyph("unknown_icon", ""), "?");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Messenger", 20), "Messenger");
        assert_eq!(truncate("Messenger", 5), "Mess…");
        assert_eq!(truncate("Messenger", 0), "");
    }

    #[test]
    fn test_gradient_endpoints() {
        let start = (0, 0, 0);
        let end = (200, 100, 50);
        assert_eq!(gradient_color(start, end, 0, 11), Color::Rgb(0, 0, 0));
        assert_eq!(gradient_color(start, end, 10, 11), Color::Rgb(200, 100, 50));
        assert_eq!(gradient_color(start, end, 0, 1), Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_icon_layout_wraps_rows_and_drops_overflow() {
        // Large icons are 16x5: four columns and two rows fit
        let area = Rect::new(1, 2, 64, 10);
        let (cells, columns) = icon_layout(10, area, ViewMode::Large);
        assert_eq!(columns, 4);
        assert_eq!(cells.len(), 8);
        assert_eq!(cells[4], Rect::new(1, 7, 16, 5));

        let (cells, columns) = icon_layout(3, Rect::new(0, 0, 10, 10), ViewMode::List);
        assert_eq!(columns, 1);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[2].y, 2);
    }

    #[tokio::test]
    async fn test_render_desktop_records_hit_areas() {
        let mut app = offline_app();
        let screen = draw(&mut app);

        assert!(screen.contains("Lyra OS"));
        assert!(screen.contains("Start"));
        assert_eq!(app.icon_areas.len(), 3);
        assert_eq!(app.quick_app_areas.len(), 3);
        assert!(app.start_button_area.is_some());
        assert!(app.dialog_area.is_none());
    }

    #[tokio::test]
    async fn test_render_chat_dialog() {
        let mut app = offline_app();
        app.open_app(app_named("files", "Files"));
        let screen = draw(&mut app);

        assert!(app.dialog_area.is_some());
        assert!(screen.contains("Online"));
        assert!(screen.contains("Today"));
        assert!(screen.contains("Welcome to Files!"));
        assert!(app.chat_view_height > 0);
    }

    #[tokio::test]
    async fn test_render_popups() {
        let mut app = offline_app();
        app.toggle_start_menu();
        let screen = draw(&mut app);
        assert!(screen.contains("Recommended Apps"));
        let menu = app.start_menu_area.unwrap();
        assert_eq!(menu.height, 3 + 3);

        app.open_context_menu(10, 10);
        let screen = draw(&mut app);
        assert!(screen.contains("Sort by"));
        assert!(screen.contains("Personalize"));
    }

    #[tokio::test]
    async fn test_render_loading_screen() {
        let mut app = offline_app();
        app.screen = Screen::Loading;
        let screen = draw(&mut app);
        assert!(screen.contains("Loading apps"));
    }
}
