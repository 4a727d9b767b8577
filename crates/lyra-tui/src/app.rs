use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use lyra_core::catalog::{find_app, recommend};
use lyra_core::desktop::{
    sort_apps, AppSearch, BackgroundCycle, ContextAction, ContextMenu, Flash, QuickApp, SortMode,
    StartMenu, TooltipTimer, ViewMode,
};
use lyra_core::{AppCatalog, AppDescriptor, ChatClient, ChatSession, Config, TimeZoneSetting};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Desktop,
}

/// Ticks between typing-dot animation frames
const ANIMATION_TICKS: u8 = 3;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub timezone: TimeZoneSetting,
    pub now: DateTime<Utc>,
    pub recommended_limit: usize,

    // Catalog
    pub catalog: AppCatalog,
    pub catalog_task: Option<JoinHandle<Vec<AppDescriptor>>>,
    pub apps: Vec<AppDescriptor>,
    pub sorted_apps: Vec<AppDescriptor>,

    // Desktop widgets
    pub selected_icon: usize,
    pub icon_columns: usize,
    pub view_mode: ViewMode,
    pub sort_mode: SortMode,
    pub context_menu: ContextMenu,
    pub start_menu: StartMenu,
    pub search: AppSearch,
    pub tooltip: TooltipTimer,
    pub icon_flash: Flash<String>,
    pub quick_flash: Flash<QuickApp>,
    pub background: BackgroundCycle,

    // Chat dialog
    pub chat_client: ChatClient,
    pub dialog_open: bool,
    pub session: Option<ChatSession>,
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input, in chars
    pub chat_scroll: u16,
    pub chat_follow: bool,  // keep the newest message in view
    pub chat_view_height: u16,
    pub chat_view_width: u16,
    pub chat_task: Option<JoinHandle<(u64, String)>>,

    // Animation state
    pub tick_count: u8,
    pub animation_frame: u8, // 0-2 for the typing dots

    // Areas for mouse hit-testing (updated during render)
    pub screen_area: Rect,
    pub desktop_area: Rect,
    pub icon_areas: Vec<Rect>,
    pub start_button_area: Option<Rect>,
    pub search_button_area: Option<Rect>,
    pub quick_app_areas: Vec<(QuickApp, Rect)>,
    pub start_menu_area: Option<Rect>,
    pub search_area: Option<Rect>,
    pub dialog_area: Option<Rect>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let timezone = config.timezone()?;
        let catalog = AppCatalog::from_config(config);
        let chat_client = ChatClient::from_config(config);
        info!(
            apps_endpoint = catalog.endpoint(),
            chat_endpoint = chat_client.endpoint(),
            timezone = timezone.identifier(),
            "Configured Lyra OS"
        );

        Ok(Self {
            should_quit: false,
            screen: Screen::Loading,
            timezone,
            now: Utc::now(),
            recommended_limit: config.recommended_limit(),

            catalog,
            catalog_task: None,
            apps: Vec::new(),
            sorted_apps: Vec::new(),

            selected_icon: 0,
            icon_columns: 1,
            view_mode: ViewMode::default(),
            sort_mode: SortMode::default(),
            context_menu: ContextMenu::default(),
            start_menu: StartMenu::default(),
            search: AppSearch::default(),
            tooltip: TooltipTimer::default(),
            icon_flash: Flash::default(),
            quick_flash: Flash::default(),
            background: BackgroundCycle::new(Instant::now()),

            chat_client,
            dialog_open: false,
            session: None,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_follow: true,
            chat_view_height: 0,
            chat_view_width: 0,
            chat_task: None,

            tick_count: 0,
            animation_frame: 0,

            screen_area: Rect::default(),
            desktop_area: Rect::default(),
            icon_areas: Vec::new(),
            start_button_area: None,
            search_button_area: None,
            quick_app_areas: Vec::new(),
            start_menu_area: None,
            search_area: None,
            dialog_area: None,
        })
    }

    /// Fetch the catalog in the background, showing the loading screen
    pub fn start_loading(&mut self) {
        self.screen = Screen::Loading;
        self.spawn_catalog_fetch();
    }

    fn spawn_catalog_fetch(&mut self) {
        if self.catalog_task.is_some() {
            return;
        }
        let catalog = self.catalog.clone();
        self.catalog_task = Some(tokio::spawn(async move { catalog.load().await }));
    }

    /// Collect results of finished background tasks
    pub async fn poll_tasks(&mut self) {
        if self.catalog_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.catalog_task.take() {
                match task.await {
                    Ok(apps) => self.set_apps(apps),
                    Err(e) => {
                        error!(error = %e, "Error initializing apps");
                        self.set_apps(Vec::new());
                    }
                }
            }
        }

        if self.chat_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.chat_task.take() {
                match task.await {
                    Ok((epoch, reply)) => self.apply_reply(epoch, reply),
                    Err(e) => error!(error = %e, "Chat request task failed"),
                }
            }
        }
    }

    pub fn set_apps(&mut self, apps: Vec<AppDescriptor>) {
        info!(count = apps.len(), "App catalog loaded");
        self.apps = apps;
        self.resort();
        self.screen = Screen::Desktop;
        let recommended = self.recommended_apps().to_vec();
        self.search.refresh(&recommended);
    }

    fn resort(&mut self) {
        self.sorted_apps = sort_apps(&self.apps, self.sort_mode);
        self.selected_icon = self
            .selected_icon
            .min(self.sorted_apps.len().saturating_sub(1));
    }

    /// Apps listed in the start menu and searched from the taskbar
    pub fn recommended_apps(&self) -> &[AppDescriptor] {
        recommend(&self.apps, self.recommended_limit)
    }

    pub fn selected_app(&self) -> Option<&AppDescriptor> {
        self.sorted_apps.get(self.selected_icon)
    }

    pub fn active_app(&self) -> Option<&AppDescriptor> {
        self.session.as_ref().map(|s| s.app())
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.chat_task.is_some()
    }

    // App shell

    /// Make `app` active and show its dialog. The conversation restarts only
    /// when a different app is opened.
    pub fn open_app(&mut self, app: AppDescriptor) {
        info!(app_id = %app.id, "Opening app");
        match self.session.as_mut() {
            Some(session) if session.app().id == app.id => {}
            Some(session) => {
                session.switch_app(app);
                // The old request keeps running; its reply will be dropped
                self.chat_task = None;
                self.chat_input.clear();
                self.chat_cursor = 0;
            }
            None => self.session = Some(ChatSession::new(app)),
        }
        self.dialog_open = true;
        self.chat_follow = true;
        self.close_menus();
    }

    pub fn close_dialog(&mut self) {
        self.dialog_open = false;
    }

    pub fn close_menus(&mut self) {
        self.start_menu.close();
        self.search.close();
        self.context_menu.close();
    }

    /// Send the typed message. Ignored while a reply is outstanding.
    pub fn submit_chat(&mut self) {
        if self.is_awaiting_reply() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(pending) = session.begin_send(&self.chat_input) else {
            return;
        };

        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_follow = true;
        self.scroll_chat_to_bottom();

        debug!(app_id = %pending.app.id, turns = pending.history.len(), "Sending chat message");
        let client = self.chat_client.clone();
        self.chat_task = Some(tokio::spawn(async move {
            let reply = client
                .reply_or_fallback(&pending.app, &pending.query, &pending.history)
                .await;
            (pending.epoch, reply)
        }));
    }

    pub fn apply_reply(&mut self, epoch: u64, reply: String) {
        if let Some(session) = self.session.as_mut() {
            if session.complete(epoch, reply) {
                self.chat_follow = true;
                self.scroll_chat_to_bottom();
            }
        }
    }

    // Desktop icons

    pub fn activate_icon(&mut self, index: usize, now: Instant) {
        if let Some(app) = self.sorted_apps.get(index).cloned() {
            self.selected_icon = index;
            self.icon_flash.trigger(app.id.clone(), now);
            self.open_app(app);
        }
    }

    pub fn select_next_icon(&mut self) {
        if !self.sorted_apps.is_empty() {
            self.selected_icon = (self.selected_icon + 1).min(self.sorted_apps.len() - 1);
        }
    }

    pub fn select_prev_icon(&mut self) {
        self.selected_icon = self.selected_icon.saturating_sub(1);
    }

    pub fn select_icon_below(&mut self) {
        let target = self.selected_icon + self.icon_columns.max(1);
        if target < self.sorted_apps.len() {
            self.selected_icon = target;
        }
    }

    pub fn select_icon_above(&mut self) {
        if let Some(target) = self.selected_icon.checked_sub(self.icon_columns.max(1)) {
            self.selected_icon = target;
        }
    }

    pub fn hover(&mut self, icon: Option<usize>, now: Instant) {
        match icon {
            Some(i) => self.tooltip.enter(i, now),
            None => self.tooltip.leave(),
        }
    }

    // Context menu

    pub fn open_context_menu(&mut self, x: u16, y: u16) {
        self.start_menu.close();
        self.search.blur();
        self.context_menu
            .open_at(x, y, self.screen_area.width, self.screen_area.height);
    }

    /// Track a terminal resize, keeping an open context menu on screen
    pub fn resize(&mut self, width: u16, height: u16) {
        self.screen_area = Rect::new(0, 0, width, height);
        if self.context_menu.open {
            let selected = self.context_menu.selected;
            let (x, y) = (self.context_menu.x, self.context_menu.y);
            self.context_menu.open_at(x, y, width, height);
            self.context_menu.selected = selected;
        }
    }

    pub fn apply_context_action(&mut self, action: ContextAction, now: Instant) {
        match action {
            ContextAction::View(view) => self.view_mode = view,
            ContextAction::Sort(sort) => {
                self.sort_mode = sort;
                self.resort();
            }
            ContextAction::Refresh => {
                info!("Refreshing app catalog");
                self.spawn_catalog_fetch();
            }
            ContextAction::NewFolder => debug!("New folder is not supported on this desktop"),
            ContextAction::Personalize => self.background.advance(now),
        }
        self.context_menu.close();
    }

    // Taskbar

    pub fn toggle_start_menu(&mut self) {
        self.start_menu.toggle();
        self.search.close();
        self.context_menu.close();
    }

    pub fn open_search(&mut self) {
        self.search.open();
        self.start_menu.close();
        self.context_menu.close();
    }

    pub fn launch_from_start_menu(&mut self, index: usize) {
        if let Some(app) = self.recommended_apps().get(index).cloned() {
            self.open_app(app);
        }
    }

    pub fn launch_from_search(&mut self) {
        if let Some(app) = self.search.selected_app().cloned() {
            self.open_app(app);
        }
    }

    pub fn search_push(&mut self, c: char) {
        let recommended = self.recommended_apps().to_vec();
        self.search.push(c, &recommended);
    }

    pub fn search_pop(&mut self) {
        let recommended = self.recommended_apps().to_vec();
        self.search.pop(&recommended);
    }

    /// Quick-launch buttons look their app up among the recommended ones
    pub fn open_quick_app(&mut self, quick: QuickApp, now: Instant) {
        self.quick_flash.trigger(quick, now);
        match find_app(self.recommended_apps(), quick.app_id()).cloned() {
            Some(app) => self.open_app(app),
            None => debug!(app_id = quick.app_id(), "Quick app not in catalog"),
        }
    }

    // Timers

    pub fn on_tick(&mut self, now: Instant, wall_clock: DateTime<Utc>) {
        self.now = wall_clock;
        self.background.tick(now);
        self.icon_flash.expire(now);
        self.quick_flash.expire(now);

        self.tick_count = (self.tick_count + 1) % ANIMATION_TICKS;
        if self.tick_count == 0 && self.session.as_ref().is_some_and(|s| s.is_typing()) {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling

    pub fn chat_scroll_up(&mut self, lines: u16) {
        self.chat_follow = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn chat_scroll_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.chat_follow = self.chat_scroll >= max;
    }

    /// Lines the chat view needs at the current width
    pub fn chat_line_count(&self) -> u16 {
        let Some(session) = self.session.as_ref() else {
            return 0;
        };
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_view_width > 0 {
            self.chat_view_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 2; // "Today" divider + blank line
        for msg in session.messages() {
            total_lines += 1; // Sender and time
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += char_count.div_ceil(wrap_width) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }
        if session.is_typing() {
            total_lines += 2;
        }
        total_lines
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_view_height > 0 {
            self.chat_view_height
        } else {
            20
        };
        self.chat_line_count().saturating_sub(visible_height)
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    pub(crate) fn app_named(id: &str, name: &str) -> AppDescriptor {
        AppDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            icon: "apps".to_string(),
            color: "#34a853".to_string(),
            description: Some(format!("{} things", name)),
            chat_title: None,
        }
    }

    /// App pointed at a port where nothing listens
    pub(crate) fn offline_app() -> App {
        let config = Config {
            api_base_url: Some("http://127.0.0.1:1".into()),
            timezone: Some("UTC".into()),
            recommended_limit: None,
        };
        let mut app = App::new(&config).unwrap();
        app.screen_area = Rect::new(0, 0, 120, 40);
        app.set_apps(vec![
            app_named("messenger", "Messenger"),
            app_named("files", "Files"),
            app_named("browser", "Browser"),
        ]);
        app
    }

    async fn wait_for_reply(app: &mut App) {
        for _ in 0..100 {
            app.poll_tasks().await;
            if app.chat_task.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("chat task did not finish");
    }

    #[tokio::test]
    async fn test_clients_use_configured_base_url() {
        let app = offline_app();
        assert_eq!(app.catalog.endpoint(), "http://127.0.0.1:1/api/apps");
        assert_eq!(app.chat_client.endpoint(), "http://127.0.0.1:1/api/chat");
    }

    #[tokio::test]
    async fn test_apps_are_sorted_by_name() {
        let app = offline_app();
        let ids: Vec<&str> = app.sorted_apps.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["browser", "files", "messenger"]);
        assert_eq!(app.screen, Screen::Desktop);
    }

    #[tokio::test]
    async fn test_open_app_seeds_welcome() {
        let mut app = offline_app();
        app.activate_icon(1, Instant::now());

        assert!(app.dialog_open);
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.app().id, "files");
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].content.contains("Files"));
    }

    #[tokio::test]
    async fn test_reopening_same_app_keeps_conversation() {
        let mut app = offline_app();
        let files = app_named("files", "Files");
        app.open_app(files.clone());
        app.session.as_mut().unwrap().begin_send("hi");
        app.close_dialog();

        app.open_app(files);
        assert_eq!(app.session.as_ref().unwrap().messages().len(), 2);
    }

    #[tokio::test]
    async fn test_switching_app_resets_conversation() {
        let mut app = offline_app();
        app.open_app(app_named("files", "Files"));
        app.chat_input = "hello".into();
        app.submit_chat();
        app.chat_input = "draft".into();

        app.open_app(app_named("browser", "Browser"));
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].content.contains("Browser"));

        assert!(app.chat_task.is_none());
        assert!(app.chat_input.is_empty());
    }

    #[tokio::test]
    async fn test_blank_submit_does_nothing() {
        let mut app = offline_app();
        app.open_app(app_named("files", "Files"));
        app.chat_input = "   ".into();
        app.submit_chat();

        assert!(app.chat_task.is_none());
        assert_eq!(app.session.as_ref().unwrap().messages().len(), 1);
        assert_eq!(app.chat_input, "   ");
    }

    #[tokio::test]
    async fn test_offline_submit_appends_fallback() {
        let mut app = offline_app();
        let files = app_named("files", "Files");
        app.open_app(files.clone());
        app.chat_input = "hello".into();
        app.chat_cursor = 5;
        app.submit_chat();

        assert!(app.chat_input.is_empty());
        assert_eq!(app.chat_cursor, 0);
        assert!(app.session.as_ref().unwrap().is_typing());

        wait_for_reply(&mut app).await;
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2].content, lyra_core::fallback_text(&files));
        assert!(!session.is_typing());
    }

    #[tokio::test]
    async fn test_submit_ignored_while_awaiting() {
        let mut app = offline_app();
        app.open_app(app_named("files", "Files"));
        app.chat_input = "one".into();
        app.submit_chat();
        app.chat_input = "two".into();
        app.submit_chat();

        assert_eq!(app.chat_input, "two");
        assert_eq!(app.session.as_ref().unwrap().messages().len(), 2);
        wait_for_reply(&mut app).await;
    }

    #[tokio::test]
    async fn test_quick_app_opens_catalog_entry() {
        let mut app = offline_app();
        let now = Instant::now();
        app.open_quick_app(QuickApp::Mail, now);

        assert!(app.quick_flash.is_active(&QuickApp::Mail, now));
        assert_eq!(app.active_app().map(|a| a.id.as_str()), Some("messenger"));
    }

    #[tokio::test]
    async fn test_quick_app_missing_from_catalog() {
        let mut app = offline_app();
        app.set_apps(vec![app_named("files", "Files")]);
        app.open_quick_app(QuickApp::Language, Instant::now());
        assert!(!app.dialog_open);
    }

    #[tokio::test]
    async fn test_context_sort_and_view() {
        let mut app = offline_app();
        app.open_context_menu(10, 5);
        assert!(app.context_menu.open);

        app.apply_context_action(ContextAction::Sort(SortMode::Date), Instant::now());
        assert!(!app.context_menu.open);
        assert_eq!(app.sorted_apps[0].id, "messenger");

        app.apply_context_action(ContextAction::View(ViewMode::List), Instant::now());
        assert_eq!(app.view_mode, ViewMode::List);
    }

    #[tokio::test]
    async fn test_personalize_advances_background() {
        let mut app = offline_app();
        let before = app.background.index();
        app.apply_context_action(ContextAction::Personalize, Instant::now());
        assert_ne!(app.background.index(), before);
    }

    #[tokio::test]
    async fn test_start_menu_and_search_are_exclusive() {
        let mut app = offline_app();
        app.open_search();
        app.search_push('x');
        app.toggle_start_menu();
        assert!(app.start_menu.open);
        assert!(!app.search.open);

        app.open_search();
        assert!(app.search.open);
        assert!(!app.start_menu.open);
    }

    #[tokio::test]
    async fn test_search_launch() {
        let mut app = offline_app();
        app.open_search();
        for c in "brow".chars() {
            app.search_push(c);
        }
        app.launch_from_search();
        assert_eq!(app.active_app().map(|a| a.id.as_str()), Some("browser"));
        assert!(!app.search.open);
    }

    #[tokio::test]
    async fn test_start_menu_launch_uses_catalog_order() {
        let mut app = offline_app();
        app.toggle_start_menu();
        app.launch_from_start_menu(0);
        assert_eq!(app.active_app().map(|a| a.id.as_str()), Some("messenger"));
        assert!(!app.start_menu.open);
    }

    #[tokio::test]
    async fn test_icon_grid_navigation() {
        let mut app = offline_app();
        app.icon_columns = 2;
        app.select_icon_below();
        assert_eq!(app.selected_icon, 2);
        app.select_icon_below();
        assert_eq!(app.selected_icon, 2);
        app.select_icon_above();
        assert_eq!(app.selected_icon, 0);
        app.select_prev_icon();
        assert_eq!(app.selected_icon, 0);
        app.select_next_icon();
        assert_eq!(app.selected_icon, 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_lands_on_empty_desktop() {
        let mut app = offline_app();
        app.apps.clear();
        app.start_loading();
        assert_eq!(app.screen, Screen::Loading);

        for _ in 0..100 {
            app.poll_tasks().await;
            if app.catalog_task.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(app.screen, Screen::Desktop);
        assert!(app.sorted_apps.is_empty());
    }

    #[tokio::test]
    async fn test_chat_scroll_follow() {
        let mut app = offline_app();
        app.open_app(app_named("files", "Files"));
        app.chat_view_height = 2;
        app.chat_view_width = 40;
        app.scroll_chat_to_bottom();
        let bottom = app.chat_scroll;
        assert!(bottom > 0);

        app.chat_scroll_up(1);
        assert!(!app.chat_follow);
        app.chat_scroll_down(10);
        assert_eq!(app.chat_scroll, bottom);
        assert!(app.chat_follow);
    }
}
