//! Widget state behind the desktop: icon layout modes, the right-click menu,
//! hover tooltips, click flashes, wallpaper rotation, start menu and search.
//!
//! Timers take the current [`Instant`] from the caller so a front end can
//! drive them from its own tick and tests can drive them by hand.

use std::time::{Duration, Instant};

use crate::catalog::filter_apps;
use crate::state::AppDescriptor;

pub const TOOLTIP_DELAY: Duration = Duration::from_millis(500);
pub const FLASH_DURATION: Duration = Duration::from_millis(200);
pub const BACKGROUND_PERIOD: Duration = Duration::from_secs(30);

/// Wallpaper gradients as (start, end) colors
pub const BACKGROUNDS: &[(&str, &str)] = &[
    ("#00c6fb", "#005bea"),
    ("#f093fb", "#f5576c"),
    ("#5ee7df", "#b490ca"),
    ("#c3cfe2", "#c3cfe2"),
    ("#f5f7fa", "#c3cfe2"),
    ("#a1c4fd", "#c2e9fb"),
    ("#d4fc79", "#96e6a1"),
    ("#84fab0", "#8fd3f4"),
    ("#fccb90", "#d57eeb"),
    ("#e0c3fc", "#8ec5fc"),
];

/// Parse `#rrggbb` or `#rgb`
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            let mut channels = hex.chars().map(|c| c.to_digit(16).map(|v| (v * 17) as u8));
            Some((channels.next()??, channels.next()??, channels.next()??))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Large,
    Medium,
    Small,
    List,
}

impl ViewMode {
    pub fn all() -> [ViewMode; 4] {
        [ViewMode::Large, ViewMode::Medium, ViewMode::Small, ViewMode::List]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Large => "Large icons",
            ViewMode::Medium => "Medium icons",
            ViewMode::Small => "Small icons",
            ViewMode::List => "List",
        }
    }

    /// Terminal cells taken by one icon (width, height)
    pub fn cell_size(&self) -> (u16, u16) {
        match self {
            ViewMode::Large => (16, 5),
            ViewMode::Medium => (13, 4),
            ViewMode::Small => (11, 3),
            ViewMode::List => (28, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Name,
    Size,
    Type,
    Date,
}

impl SortMode {
    pub fn all() -> [SortMode; 4] {
        [SortMode::Name, SortMode::Size, SortMode::Type, SortMode::Date]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Name => "Name",
            SortMode::Size => "Size",
            SortMode::Type => "Item type",
            SortMode::Date => "Date modified",
        }
    }
}

/// Order apps for the desktop. Apps carry no size, type or date, so only
/// `Name` reorders; the others keep catalog order.
pub fn sort_apps(apps: &[AppDescriptor], mode: SortMode) -> Vec<AppDescriptor> {
    let mut sorted = apps.to_vec();
    if mode == SortMode::Name {
        sorted.sort_by_key(|app| app.name.to_lowercase());
    }
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    View(ViewMode),
    Sort(SortMode),
    Refresh,
    NewFolder,
    Personalize,
}

impl ContextAction {
    pub fn label(&self) -> &'static str {
        match self {
            ContextAction::View(view) => view.label(),
            ContextAction::Sort(sort) => sort.label(),
            ContextAction::Refresh => "Refresh",
            ContextAction::NewFolder => "New folder",
            ContextAction::Personalize => "Personalize",
        }
    }
}

pub const CONTEXT_ACTIONS: [ContextAction; 11] = [
    ContextAction::View(ViewMode::Large),
    ContextAction::View(ViewMode::Medium),
    ContextAction::View(ViewMode::Small),
    ContextAction::View(ViewMode::List),
    ContextAction::Sort(SortMode::Name),
    ContextAction::Sort(SortMode::Size),
    ContextAction::Sort(SortMode::Type),
    ContextAction::Sort(SortMode::Date),
    ContextAction::Refresh,
    ContextAction::NewFolder,
    ContextAction::Personalize,
];

/// One rendered row of the context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRow {
    Header(&'static str),
    Separator,
    Action(usize),
}

/// Rows in display order; `Action` indexes into [`CONTEXT_ACTIONS`]
pub fn context_rows() -> Vec<ContextRow> {
    let mut rows = vec![ContextRow::Header("View")];
    rows.extend((0..4).map(ContextRow::Action));
    rows.push(ContextRow::Header("Sort by"));
    rows.extend((4..8).map(ContextRow::Action));
    rows.push(ContextRow::Separator);
    rows.extend((8..CONTEXT_ACTIONS.len()).map(ContextRow::Action));
    rows
}

pub const CONTEXT_MENU_WIDTH: u16 = 24;
/// Rows plus top and bottom border
pub const CONTEXT_MENU_HEIGHT: u16 = 16;

#[derive(Debug, Clone, Default)]
pub struct ContextMenu {
    pub open: bool,
    pub x: u16,
    pub y: u16,
    pub selected: usize,
}

impl ContextMenu {
    /// Open at the pointer, pulled back so the whole menu fits on screen
    pub fn open_at(&mut self, x: u16, y: u16, screen_width: u16, screen_height: u16) {
        self.x = x.min(screen_width.saturating_sub(CONTEXT_MENU_WIDTH));
        self.y = y.min(screen_height.saturating_sub(CONTEXT_MENU_HEIGHT));
        self.selected = 0;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(CONTEXT_ACTIONS.len() - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_action(&self) -> ContextAction {
        CONTEXT_ACTIONS[self.selected.min(CONTEXT_ACTIONS.len() - 1)]
    }

    /// Action under a screen row, if any
    pub fn action_at_row(&self, row: u16) -> Option<usize> {
        let offset = row.checked_sub(self.y + 1)? as usize;
        match context_rows().get(offset) {
            Some(ContextRow::Action(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x
            && x < self.x + CONTEXT_MENU_WIDTH
            && y >= self.y
            && y < self.y + CONTEXT_MENU_HEIGHT
    }
}

pub fn is_checked(action: ContextAction, view: ViewMode, sort: SortMode) -> bool {
    match action {
        ContextAction::View(v) => v == view,
        ContextAction::Sort(s) => s == sort,
        _ => false,
    }
}

/// Shows a tooltip once the pointer has rested on the same target long enough
#[derive(Debug, Clone, Default)]
pub struct TooltipTimer {
    target: Option<usize>,
    since: Option<Instant>,
}

impl TooltipTimer {
    pub fn enter(&mut self, target: usize, now: Instant) {
        if self.target != Some(target) {
            self.target = Some(target);
            self.since = Some(now);
        }
    }

    pub fn leave(&mut self) {
        self.target = None;
        self.since = None;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.target
    }

    pub fn visible(&self, now: Instant) -> Option<usize> {
        match (self.target, self.since) {
            (Some(target), Some(since)) if now.duration_since(since) >= TOOLTIP_DELAY => {
                Some(target)
            }
            _ => None,
        }
    }
}

/// Brief "pressed" highlight after a click
#[derive(Debug, Clone)]
pub struct Flash<T> {
    active: Option<(T, Instant)>,
}

impl<T> Default for Flash<T> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<T: PartialEq> Flash<T> {
    pub fn trigger(&mut self, target: T, now: Instant) {
        self.active = Some((target, now));
    }

    pub fn is_active(&self, target: &T, now: Instant) -> bool {
        matches!(&self.active, Some((t, at)) if t == target && now.duration_since(*at) < FLASH_DURATION)
    }

    /// Drop the flash once it has run its course
    pub fn expire(&mut self, now: Instant) {
        if let Some((_, at)) = &self.active {
            if now.duration_since(*at) >= FLASH_DURATION {
                self.active = None;
            }
        }
    }
}

/// Rotates the wallpaper every [`BACKGROUND_PERIOD`]
#[derive(Debug, Clone)]
pub struct BackgroundCycle {
    index: usize,
    last_change: Instant,
}

impl BackgroundCycle {
    pub fn new(now: Instant) -> Self {
        Self {
            index: 0,
            last_change: now,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> (&'static str, &'static str) {
        BACKGROUNDS[self.index]
    }

    pub fn advance(&mut self, now: Instant) {
        self.index = (self.index + 1) % BACKGROUNDS.len();
        self.last_change = now;
    }

    /// Advance if the period elapsed; true when the wallpaper changed
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_change) >= BACKGROUND_PERIOD {
            self.advance(now);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartMenu {
    pub open: bool,
    pub selected: usize,
}

impl StartMenu {
    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.selected = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

/// Taskbar search box filtering the recommended apps
#[derive(Debug, Clone, Default)]
pub struct AppSearch {
    pub open: bool,
    pub query: String,
    pub results: Vec<AppDescriptor>,
    pub selected: usize,
}

impl AppSearch {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.results.clear();
        self.selected = 0;
    }

    /// Losing focus closes the box only when nothing was typed
    pub fn blur(&mut self) {
        if self.query.trim().is_empty() {
            self.close();
        }
    }

    pub fn set_query(&mut self, query: &str, apps: &[AppDescriptor]) {
        self.query = query.to_string();
        self.refresh(apps);
    }

    pub fn push(&mut self, c: char, apps: &[AppDescriptor]) {
        self.query.push(c);
        self.refresh(apps);
    }

    pub fn pop(&mut self, apps: &[AppDescriptor]) {
        self.query.pop();
        self.refresh(apps);
    }

    pub fn refresh(&mut self, apps: &[AppDescriptor]) {
        self.results = filter_apps(apps, &self.query);
        self.selected = self.selected.min(self.results.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 1).min(self.results.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_app(&self) -> Option<&AppDescriptor> {
        self.results.get(self.selected)
    }
}

/// Pinned taskbar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickApp {
    Folder,
    Language,
    Mail,
}

impl QuickApp {
    pub fn all() -> [QuickApp; 3] {
        [QuickApp::Folder, QuickApp::Language, QuickApp::Mail]
    }

    /// Catalog id the button opens
    pub fn app_id(&self) -> &'static str {
        match self {
            QuickApp::Folder => "files",
            QuickApp::Language => "browser",
            QuickApp::Mail => "messenger",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickApp::Folder => "Files",
            QuickApp::Language => "Web",
            QuickApp::Mail => "Mail",
        }
    }
}
