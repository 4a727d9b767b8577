use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use lyra_core::desktop::QuickApp;
use ratatui::layout::Rect;

use crate::app::{App, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(width, height) => app.resize(width, height),
        AppEvent::Tick => app.on_tick(Instant::now(), Utc::now()),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work everywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.screen == Screen::Loading {
        if key.code == KeyCode::Char('q') {
            app.should_quit = true;
        }
        return;
    }

    if app.dialog_open {
        handle_dialog_key(app, key);
    } else if app.context_menu.open {
        handle_context_menu_key(app, key);
    } else if app.search.open {
        handle_search_key(app, key);
    } else if app.start_menu.open {
        handle_start_menu_key(app, key);
    } else {
        handle_desktop_key(app, key);
    }
}

fn handle_desktop_key(app: &mut App, key: KeyEvent) {
    let now = Instant::now();
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Icon navigation
        KeyCode::Char('l') | KeyCode::Right => app.select_next_icon(),
        KeyCode::Char('h') | KeyCode::Left => app.select_prev_icon(),
        KeyCode::Char('j') | KeyCode::Down => app.select_icon_below(),
        KeyCode::Char('k') | KeyCode::Up => app.select_icon_above(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_icon(app.selected_icon, now),

        // Taskbar
        KeyCode::Char('s') => app.toggle_start_menu(),
        KeyCode::Char('/') => app.open_search(),
        KeyCode::Char('1') => app.open_quick_app(QuickApp::Folder, now),
        KeyCode::Char('2') => app.open_quick_app(QuickApp::Language, now),
        KeyCode::Char('3') => app.open_quick_app(QuickApp::Mail, now),

        // Context menu next to the selected icon
        KeyCode::Char('m') => {
            let (x, y) = app
                .icon_areas
                .get(app.selected_icon)
                .map(|r| (r.x + r.width / 2, r.y + r.height / 2))
                .unwrap_or((app.desktop_area.x + 2, app.desktop_area.y + 1));
            app.open_context_menu(x, y);
        }

        // Reopen the last dialog
        KeyCode::Tab => {
            if app.session.is_some() {
                app.dialog_open = true;
            }
        }
        _ => {}
    }
}

fn handle_context_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.context_menu.close(),
        KeyCode::Char('j') | KeyCode::Down => app.context_menu.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.context_menu.select_prev(),
        KeyCode::Enter => {
            let action = app.context_menu.selected_action();
            app.apply_context_action(action, Instant::now());
        }
        _ => {}
    }
}

fn handle_start_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => app.start_menu.close(),
        KeyCode::Char('j') | KeyCode::Down => {
            let len = app.recommended_apps().len();
            app.start_menu.select_next(len);
        }
        KeyCode::Char('k') | KeyCode::Up => app.start_menu.select_prev(),
        KeyCode::Enter => app.launch_from_start_menu(app.start_menu.selected),
        KeyCode::Char('/') => app.open_search(),
        _ => {}
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.search.close(),
        KeyCode::Enter => app.launch_from_search(),
        KeyCode::Down => app.search.select_next(),
        KeyCode::Up => app.search.select_prev(),
        KeyCode::Backspace => app.search_pop(),
        KeyCode::Char(c) => app.search_push(c),
        _ => {}
    }
}

fn handle_dialog_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Enter => app.submit_chat(),
        KeyCode::PageUp => app.chat_scroll_up(app.chat_view_height.max(1)),
        KeyCode::PageDown => app.chat_scroll_down(app.chat_view_height.max(1)),
        KeyCode::Up => app.chat_scroll_up(1),
        KeyCode::Down => app.chat_scroll_down(1),
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn icon_at(app: &App, x: u16, y: u16) -> Option<usize> {
    app.icon_areas.iter().position(|r| point_in_rect(x, y, *r))
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen == Screen::Loading {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;
    let now = Instant::now();

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_left_click(app, x, y, now),
        MouseEventKind::Down(MouseButton::Right) => {
            if !app.dialog_open && point_in_rect(x, y, app.desktop_area) {
                app.open_context_menu(x, y);
            }
        }
        MouseEventKind::Moved => {
            let hovered = if app.dialog_open { None } else { icon_at(app, x, y) };
            app.hover(hovered, now);
        }
        MouseEventKind::ScrollUp => {
            if app.dialog_open {
                app.chat_scroll_up(3);
            } else if app.start_menu.open {
                app.start_menu.select_prev();
            }
        }
        MouseEventKind::ScrollDown => {
            if app.dialog_open {
                app.chat_scroll_down(3);
            } else if app.start_menu.open {
                let len = app.recommended_apps().len();
                app.start_menu.select_next(len);
            }
        }
        _ => {}
    }
}

fn handle_left_click(app: &mut App, x: u16, y: u16, now: Instant) {
    // The dialog is modal: clicking outside dismisses it
    if app.dialog_open {
        if app.dialog_area.is_some_and(|r| !point_in_rect(x, y, r)) {
            app.close_dialog();
        }
        return;
    }

    if app.context_menu.open {
        if app.context_menu.contains(x, y) {
            if let Some(index) = app.context_menu.action_at_row(y) {
                app.context_menu.selected = index;
                let action = app.context_menu.selected_action();
                app.apply_context_action(action, now);
            }
        } else {
            app.context_menu.close();
        }
        return;
    }

    if app.start_menu.open {
        if let Some(area) = app.start_menu_area.filter(|r| point_in_rect(x, y, *r)) {
            // Border and "Recommended Apps" header come first, bottom border last
            let visible_rows = area.height.saturating_sub(3);
            if let Some(row) = y.checked_sub(area.y + 2).filter(|r| *r < visible_rows) {
                app.launch_from_start_menu(row as usize);
            }
            return;
        }
        if !app.start_button_area.is_some_and(|r| point_in_rect(x, y, r)) {
            app.start_menu.close();
        }
    }

    if app.search.open {
        if let Some(area) = app.search_area.filter(|r| point_in_rect(x, y, *r)) {
            // Border and query line come first
            if let Some(row) = y.checked_sub(area.y + 2) {
                if (row as usize) < app.search.results.len() {
                    app.search.selected = row as usize;
                    app.launch_from_search();
                }
            }
            return;
        }
        if !app.search_button_area.is_some_and(|r| point_in_rect(x, y, r)) {
            app.search.blur();
        }
    }

    if app.start_button_area.is_some_and(|r| point_in_rect(x, y, r)) {
        app.toggle_start_menu();
        return;
    }
    if app.search_button_area.is_some_and(|r| point_in_rect(x, y, r)) {
        app.open_search();
        return;
    }
    let quick = app
        .quick_app_areas
        .iter()
        .find(|(_, r)| point_in_rect(x, y, *r))
        .map(|(q, _)| *q);
    if let Some(quick) = quick {
        app.open_quick_app(quick, now);
        return;
    }

    if let Some(index) = icon_at(app, x, y) {
        app.activate_icon(index, now);
    }
}
