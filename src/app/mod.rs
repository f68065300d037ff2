use std::io::{Stdout, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::{AppConfig, PressMode};
use crate::reminder::{ChannelNotifier, LocalClock, Reminder, ReminderScheduler};
use crate::reorder::{InputKind, Phase, PressTarget};
use crate::store::{ItemId, ItemStore, Namespace};
use crate::sync::{DisplayRow, ListSynchronizer, RowBuffer, SyncError};
use crate::ui::{self, ListFrame};

pub mod state;

pub use state::{AppState, Prompt, PromptKind, RowHit};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    Reload,
    NewItem,
    ToggleDone,
    Delete,
    Remind,
    ClearReminder,
    MoveUp,
    MoveDown,
    CancelPress,
}

pub struct App<S: ItemStore> {
    pub config: Arc<AppConfig>,
    list: ListSynchronizer<S, RowBuffer>,
    state: AppState,
    list_state: ListState,
    clock: LocalClock,
    reminders: ReminderScheduler,
    fired: Receiver<Reminder>,
    should_quit: bool,
    tick_rate: Duration,
}

impl<S: ItemStore> App<S> {
    pub fn new(config: Arc<AppConfig>, store: S, ns: Namespace, clock: LocalClock) -> Result<Self> {
        let mut list = ListSynchronizer::new(store, ns, RowBuffer::default(), config.reorder.long_press());
        list.reload().context("loading items for initial state")?;

        let (notifier, fired) = ChannelNotifier::new(config.reminders.permission);
        let reminders = ReminderScheduler::spawn(notifier)?;
        let rearmed = list
            .upcoming_reminders(clock.now())
            .into_iter()
            .filter(|reminder| reminders.schedule(reminder.clone()))
            .count();
        if rearmed > 0 {
            tracing::info!(rearmed, "stored reminders re-armed");
        }

        let mut state = AppState::default();
        if rearmed > 0 {
            state.set_status_message(Some(format!("{rearmed} reminder(s) pending")));
        }
        let tick_rate = config.tick_rate();
        Ok(Self {
            config,
            list,
            state,
            list_state: ListState::default(),
            clock,
            reminders,
            fired,
            should_quit: false,
            tick_rate,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn rows(&self) -> &[DisplayRow] {
        self.list.view().rows()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn synchronizer(&self) -> &ListSynchronizer<S, RowBuffer> {
        &self.list
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    let rows = self.list.view().rows();
                    let dragging = self.list.session().phase() == Phase::Dragging;
                    if rows.is_empty() || dragging {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.state.selected()));
                    }
                    let frame_rows = drawn_rows(rows, self.list.session().preview_order());
                    let active = self
                        .list
                        .session()
                        .active_item()
                        .or_else(|| self.list.session().pending_press());
                    let list = ListFrame {
                        rows: frame_rows,
                        active,
                        phase: self.list.session().phase(),
                        clock: self.clock,
                    };
                    let area = ui::draw_app(frame, &list, &self.state, &mut self.list_state);
                    self.state.record_layout(area, self.list_state.offset());
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                let event = event::read().context("reading terminal event")?;
                self.handle_event(event, Instant::now());
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event, at: Instant) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse, at),
            Event::FocusLost => {
                if self.list.cancel_press() {
                    tracing::debug!("press abandoned on focus loss");
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.handle_prompt_key(key) {
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Reload)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('a') | KeyCode::Char('n') if plain => Some(Action::NewItem),
            KeyCode::Char(' ') | KeyCode::Char('x') if plain => Some(Action::ToggleDone),
            KeyCode::Char('d') | KeyCode::Delete if plain => Some(Action::Delete),
            KeyCode::Char('r') if plain => Some(Action::Remind),
            KeyCode::Char('R') => Some(Action::ClearReminder),
            KeyCode::Char('K') => Some(Action::MoveUp),
            KeyCode::Char('J') => Some(Action::MoveDown),
            KeyCode::Esc => Some(Action::CancelPress),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        let len = self.rows().len();
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.state.move_selection(1, len),
            Action::SelectPrevious => self.state.move_selection(-1, len),
            Action::Reload => match self.list.reload() {
                Ok(()) => {
                    self.state.clamp_selection(self.rows().len());
                    self.state.set_status_message(Some("Reloaded"));
                }
                Err(err) => {
                    tracing::error!(?err, "failed to reload items");
                    self.state
                        .set_status_message(Some("Reload failed, showing last known list"));
                }
            },
            Action::NewItem => {
                if self.state.prompt().is_none() {
                    self.state.open_prompt(PromptKind::NewItem);
                }
            }
            Action::ToggleDone => {
                if let Some(id) = self.selected_id() {
                    self.toggle_done(&id);
                }
            }
            Action::Delete => self.delete_selected(),
            Action::Remind => {
                if let Some(row) = self.rows().get(self.state.selected()).cloned() {
                    self.state.open_prompt(PromptKind::Reminder {
                        id: row.id,
                        text: row.text,
                    });
                }
            }
            Action::ClearReminder => self.clear_selected_reminder(),
            Action::MoveUp => self.move_selected(-1),
            Action::MoveDown => self.move_selected(1),
            Action::CancelPress => {
                if self.list.cancel_press() {
                    self.state.set_status_message(Some("Reorder cancelled"));
                }
            }
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> bool {
        if self.state.prompt().is_none() {
            return false;
        }
        match key.code {
            KeyCode::Esc => {
                self.state.close_prompt();
                self.state.set_status_message(None::<String>);
            }
            KeyCode::Enter => self.submit_prompt(),
            KeyCode::Backspace => {
                if let Some(prompt) = self.state.prompt_mut() {
                    prompt.backspace();
                }
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                if let Some(prompt) = self.state.prompt_mut() {
                    prompt.push_char(ch);
                }
            }
            _ => {}
        }
        true
    }

    fn submit_prompt(&mut self) {
        let Some(prompt) = self.state.prompt().cloned() else {
            return;
        };
        match prompt.kind {
            PromptKind::NewItem => match self.list.create(&prompt.buffer) {
                Ok(Some(id)) => {
                    self.state.close_prompt();
                    self.select_id(&id);
                    self.state.set_status_message(Some("Item added"));
                }
                Ok(None) => {
                    self.state.close_prompt();
                }
                Err(SyncError::Gesture(err)) => self.report_busy(err),
                Err(err) => {
                    tracing::error!(?err, "failed to create item");
                    self.state.set_status_message(Some("Failed to add item"));
                }
            },
            PromptKind::Reminder { id, .. } => {
                match self.list.set_reminder(&id, &prompt.buffer, self.clock.now()) {
                    Ok(reminder) => {
                        self.state.close_prompt();
                        let label = reminder.time_label();
                        let message = if self.reminders.schedule(reminder) {
                            format!("Reminder set for {label}")
                        } else {
                            format!("Reminder saved for {label}; notifications are off")
                        };
                        self.state.set_status_message(Some(message));
                    }
                    Err(SyncError::Reminder(err)) => {
                        tracing::debug!(%err, "rejected reminder time");
                        self.state
                            .set_status_message(Some("Use a 24-hour time such as 18:30"));
                    }
                    Err(SyncError::Gesture(err)) => self.report_busy(err),
                    Err(err) => {
                        tracing::error!(?err, "failed to store reminder");
                        self.state.close_prompt();
                        self.state.set_status_message(Some("Failed to set reminder"));
                    }
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, at: Instant) {
        let len = self.rows().len();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.state.prompt().is_some() {
                    return;
                }
                let Some(hit) = self.state.hit_test(mouse.column, mouse.row, len) else {
                    return;
                };
                match hit {
                    RowHit::Checkbox(index) => {
                        let Some(id) = self.rows().get(index).map(|row| row.id.clone()) else {
                            return;
                        };
                        let kind = self.input_kind();
                        match self.list.press(id.clone(), PressTarget::Control, kind, at) {
                            Ok(_) => self.toggle_done(&id),
                            Err(err) => self.report_busy(err),
                        }
                    }
                    RowHit::Surface(index) => {
                        self.state.select(index, len);
                        let Some(id) = self.rows().get(index).map(|row| row.id.clone()) else {
                            return;
                        };
                        let kind = self.input_kind();
                        if let Err(err) = self.list.press(id, PressTarget::Surface, kind, at) {
                            self.report_busy(err);
                        }
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.list.session().pending_press().is_some() {
                    // Moving before the hold completes is a scroll, not a drag.
                    self.list.cancel_press();
                    return;
                }
                let drawn: Vec<ItemId> = self
                    .list
                    .session()
                    .preview_order()
                    .unwrap_or_else(|| self.list.visible_order());
                let slots = self.state.slots(&drawn);
                let pointer_y =
                    AppState::pointer_y(mouse.row, &slots, self.list.session().active_item());
                if let Err(err) = self.list.drag_to(pointer_y, &slots) {
                    tracing::warn!(?err, "drag could not start");
                    self.state.set_status_message(Some("Item vanished, reloaded list"));
                    if let Err(err) = self.list.reload() {
                        tracing::error!(?err, "failed to reload after lost drag item");
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.release(at),
            MouseEventKind::ScrollDown => {
                self.list.cancel_press();
                self.state.move_selection(1, len);
            }
            MouseEventKind::ScrollUp => {
                self.list.cancel_press();
                self.state.move_selection(-1, len);
            }
            _ => {}
        }
    }

    fn release(&mut self, at: Instant) {
        let dragged = self.list.session().active_item().cloned();
        match self.list.release(at) {
            Ok(Some(report)) => {
                tracing::debug!(writes = report.total, "drag committed");
                if let Some(id) = dragged {
                    self.select_id(&id);
                }
                self.state.set_status_message(Some("Order saved"));
            }
            Ok(None) => {}
            Err(SyncError::PartialReorder { applied, total, .. }) => {
                self.state.set_status_message(Some(format!(
                    "Reorder interrupted after {applied}/{total} writes; showing saved order"
                )));
            }
            Err(err) => {
                tracing::error!(?err, "failed to commit reorder");
                self.state.set_status_message(Some("Failed to save new order"));
            }
        }
        self.state.clamp_selection(self.rows().len());
    }

    fn on_tick(&mut self, now: Instant) {
        let before = self.list.session().phase();
        if self.list.tick(now) == Phase::Armed && before == Phase::Idle {
            self.state.set_status_message(Some("Drag to move, release to drop"));
        }
        let fired: Vec<Reminder> = self.fired.try_iter().collect();
        for reminder in fired {
            self.state
                .set_status_message(Some(format!("⏰ {} ({})", reminder.text, reminder.time_label())));
            if self.config.reminders.bell {
                ring_bell();
            }
        }
    }

    fn toggle_done(&mut self, id: &ItemId) {
        match self.list.toggle_done(id) {
            Ok(done) => {
                self.state
                    .set_status_message(Some(if done { "Marked done" } else { "Marked not done" }));
            }
            Err(SyncError::Gesture(err)) => self.report_busy(err),
            Err(err) => {
                tracing::error!(?err, "failed to toggle done");
                self.state.set_status_message(Some("Failed to update item"));
            }
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.list.delete(&id) {
            Ok(()) => {
                self.reminders.cancel(&id);
                self.state.clamp_selection(self.rows().len());
                self.state.set_status_message(Some("Item deleted"));
            }
            Err(SyncError::Gesture(err)) => self.report_busy(err),
            Err(err) => {
                tracing::error!(?err, "failed to delete item");
                self.state.set_status_message(Some("Failed to delete item"));
            }
        }
    }

    fn clear_selected_reminder(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.list.clear_reminder(&id) {
            Ok(()) => {
                self.reminders.cancel(&id);
                self.state.set_status_message(Some("Reminder cleared"));
            }
            Err(SyncError::Gesture(err)) => self.report_busy(err),
            Err(err) => {
                tracing::error!(?err, "failed to clear reminder");
                self.state.set_status_message(Some("Failed to clear reminder"));
            }
        }
    }

    fn move_selected(&mut self, delta: isize) {
        let len = self.rows().len();
        let from = self.state.selected();
        let to = from as isize + delta;
        if len == 0 || to < 0 || to as usize >= len {
            return;
        }
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.list.move_item(from + 1, to as usize + 1) {
            Ok(_) => {
                self.select_id(&id);
                self.state.set_status_message(Some("Order saved"));
            }
            Err(SyncError::Gesture(err)) => self.report_busy(err),
            Err(SyncError::PartialReorder { applied, total, .. }) => {
                self.state.set_status_message(Some(format!(
                    "Reorder interrupted after {applied}/{total} writes; showing saved order"
                )));
            }
            Err(err) => {
                tracing::error!(?err, "failed to move item");
                self.state.set_status_message(Some("Failed to move item"));
            }
        }
    }

    fn report_busy(&mut self, err: impl std::fmt::Display) {
        tracing::debug!(%err, "input ignored during gesture");
        self.state
            .set_status_message(Some("Finish the current reorder first"));
    }

    fn input_kind(&self) -> InputKind {
        match self.config.reorder.press_mode {
            PressMode::Immediate => InputKind::Pointer,
            PressMode::LongPress => InputKind::Touch,
        }
    }

    fn selected_id(&self) -> Option<ItemId> {
        self.rows()
            .get(self.state.selected())
            .map(|row| row.id.clone())
    }

    fn select_id(&mut self, id: &ItemId) {
        let len = self.rows().len();
        if let Some(index) = self.rows().iter().position(|row| &row.id == id) {
            self.state.select(index, len);
        }
    }
}

/// Rows in the order to draw them: the drag preview when there is one.
fn drawn_rows(rows: &[DisplayRow], preview: Option<Vec<ItemId>>) -> Vec<&DisplayRow> {
    match preview {
        Some(order) => order
            .iter()
            .filter_map(|id| rows.iter().find(|row| &row.id == id))
            .collect(),
        None => rows.iter().collect(),
    }
}

fn ring_bell() {
    let mut stdout = std::io::stdout();
    if let Err(err) = stdout.write_all(b"\x07").and_then(|()| stdout.flush()) {
        tracing::debug!(%err, "terminal bell failed");
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationPermission;
    use crate::identity::OwnerId;
    use crate::store::{MemoryStore, StoreOp};
    use ratatui::layout::Rect;

    fn app_with(store: &MemoryStore, texts: &[&str], press_mode: PressMode) -> Result<App<MemoryStore>> {
        let mut config = AppConfig::default();
        config.reorder.press_mode = press_mode;
        config.reminders.permission = NotificationPermission::Granted;
        config.reminders.bell = false;
        let ns = Namespace::for_owner(&OwnerId::new("tester"));
        let mut app = App::new(
            Arc::new(config),
            store.clone(),
            ns,
            LocalClock::with_offset(time::UtcOffset::UTC),
        )?;
        for text in texts {
            app.handle_event(key(KeyCode::Char('a')), Instant::now());
            for ch in text.chars() {
                app.handle_event(key(KeyCode::Char(ch)), Instant::now());
            }
            app.handle_event(key(KeyCode::Enter), Instant::now());
        }
        // Pretend the list was drawn at the top of a 40x10 terminal.
        app.state.record_layout(Rect::new(1, 1, 38, 8), 0);
        Ok(app)
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn texts(app: &App<MemoryStore>) -> Vec<String> {
        app.rows().iter().map(|row| row.text.clone()).collect()
    }

    #[test]
    fn typed_items_are_appended_in_order() -> Result<()> {
        let store = MemoryStore::new();
        let app = app_with(&store, &["milk", "eggs"], PressMode::Immediate)?;
        assert_eq!(texts(&app), vec!["milk", "eggs"]);
        assert_eq!(app.state().selected(), 1);
        assert!(app.state().prompt().is_none());
        Ok(())
    }

    #[test]
    fn mouse_drag_reorders_and_persists() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A", "B", "C"], PressMode::Immediate)?;
        let now = Instant::now();
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 3), now);
        assert_eq!(app.synchronizer().session().phase(), Phase::Armed);
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 20, 1), now);
        assert_eq!(app.synchronizer().session().phase(), Phase::Dragging);
        let updates = store.count_calls(StoreOp::Update);
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 20, 1), now);

        assert_eq!(texts(&app), vec!["C", "A", "B"]);
        assert_eq!(store.count_calls(StoreOp::Update) - updates, 3);
        assert_eq!(app.state().selected(), 0);
        assert_eq!(app.synchronizer().session().phase(), Phase::Idle);
        Ok(())
    }

    #[test]
    fn checkbox_click_toggles_without_arming() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A", "B"], PressMode::Immediate)?;
        let column = 1 + state::INDEX_WIDTH;
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), column, 2), Instant::now());
        assert!(app.rows()[1].done);
        assert_eq!(app.synchronizer().session().phase(), Phase::Idle);
        assert!(!app.synchronizer().session().is_busy());
        Ok(())
    }

    #[test]
    fn long_press_mode_treats_early_movement_as_scroll() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A", "B"], PressMode::LongPress)?;
        let calls = store.total_calls();
        let now = Instant::now();
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 1), now);
        assert!(app.synchronizer().session().pending_press().is_some());
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 20, 2), now);
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 20, 2), now);
        assert_eq!(texts(&app), vec!["A", "B"]);
        assert_eq!(store.total_calls(), calls);
        Ok(())
    }

    #[test]
    fn held_press_arms_on_tick() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A", "B"], PressMode::LongPress)?;
        let start = Instant::now();
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 1), start);
        app.on_tick(start + app.config.reorder.long_press());
        assert_eq!(app.synchronizer().session().phase(), Phase::Armed);
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 20, 5), start);
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 20, 5), start);
        assert_eq!(texts(&app), vec!["B", "A"]);
        Ok(())
    }

    #[test]
    fn delete_key_is_ignored_while_dragging() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A", "B", "C"], PressMode::Immediate)?;
        let now = Instant::now();
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 1), now);
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 20, 6), now);
        assert_eq!(app.synchronizer().session().phase(), Phase::Dragging);
        let deletes = store.count_calls(StoreOp::Delete);

        app.handle_event(key(KeyCode::Char('d')), now);
        assert_eq!(store.count_calls(StoreOp::Delete), deletes);
        assert_eq!(app.state().status(), Some("Finish the current reorder first"));

        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 20, 6), now);
        assert_eq!(texts(&app), vec!["B", "C", "A"]);
        let orders: Vec<i64> = app
            .synchronizer()
            .items()
            .iter()
            .map(|item| item.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn keyboard_move_shifts_selected_item() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A", "B", "C"], PressMode::Immediate)?;
        app.handle_event(key(KeyCode::Char('K')), Instant::now());
        assert_eq!(texts(&app), vec!["A", "C", "B"]);
        assert_eq!(app.state().selected(), 1);
        Ok(())
    }

    #[test]
    fn bad_reminder_time_keeps_prompt_open() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["call"], PressMode::Immediate)?;
        app.handle_event(key(KeyCode::Char('r')), Instant::now());
        for ch in "soon".chars() {
            app.handle_event(key(KeyCode::Char(ch)), Instant::now());
        }
        app.handle_event(key(KeyCode::Enter), Instant::now());
        assert!(app.state().prompt().is_some());
        assert_eq!(app.rows()[0].notify_time, None);

        app.handle_event(key(KeyCode::Esc), Instant::now());
        app.handle_event(key(KeyCode::Char('r')), Instant::now());
        for ch in "23:59".chars() {
            app.handle_event(key(KeyCode::Char(ch)), Instant::now());
        }
        app.handle_event(key(KeyCode::Enter), Instant::now());
        assert!(app.state().prompt().is_none());
        assert!(app.rows()[0].notify_time.is_some());
        Ok(())
    }

    #[test]
    fn store_failure_keeps_rows_and_reports() -> Result<()> {
        let store = MemoryStore::new();
        let mut app = app_with(&store, &["A"], PressMode::Immediate)?;
        store.set_offline(true);
        app.handle_event(key(KeyCode::Char(' ')), Instant::now());
        assert_eq!(texts(&app), vec!["A"]);
        assert!(!app.rows()[0].done);
        assert_eq!(app.state().status(), Some("Failed to update item"));
        Ok(())
    }
}
