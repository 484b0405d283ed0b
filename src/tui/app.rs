use crate::config::Config;
use crate::service::enhance::{self, EnhanceError, Enhancement};
use crate::service::filter;
use crate::service::session::SessionGuard;
use crate::service::store::ANIMATION_DELAY;
use crate::service::transfer;
use crate::service::NoteStore;
use crate::storage::note::{display_date, Note, NoteColor, PALETTE};
use crate::storage::slot::StorageSlot;
use anyhow::Result;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

// How long a failed enhancement is shown before the original text is saved.
const FALLBACK_SAVE_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, PartialEq)]
pub enum AppMode {
    Locked,
    List,
    View,
    Edit,
    Search,
    DeleteConfirm,
    Settings,
    ImportPath,
    EmailPrompt,
    Help,
}

#[derive(Clone, Copy, PartialEq)]
pub enum EditField {
    Title,
    Content,
}

pub struct App {
    pub config: Config,
    pub store: NoteStore,
    pub guard: SessionGuard,
    pub mode: AppMode,
    resume_mode: AppMode,
    pub selected_index: usize,
    pub active_color: Option<NoteColor>,
    pub favorites_only: bool,
    pub search_query: String,
    pub input_buffer: String,
    pub editing_note: Option<Note>,
    pub edit_title: String,
    pub edit_content: String,
    pub edit_field: EditField,
    pub viewing_id: Option<i64>,
    pub delete_target: Option<i64>,
    enhance_rx: Option<mpsc::Receiver<Result<Enhancement, EnhanceError>>>,
    deferred_save: Option<(Note, Instant)>,
    pub lock_error: Option<String>,
    pub status_message: Option<String>,
    storage_warned: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).ok();

        let store = NoteStore::open(StorageSlot::new(&config.data_dir), ANIMATION_DELAY);
        let guard = SessionGuard::new(config.passphrase.clone(), config.lock_timeout);

        Ok(App {
            config,
            store,
            guard,
            mode: AppMode::List,
            resume_mode: AppMode::List,
            selected_index: 0,
            active_color: None,
            favorites_only: false,
            search_query: String::new(),
            input_buffer: String::new(),
            editing_note: None,
            edit_title: String::new(),
            edit_content: String::new(),
            edit_field: EditField::Title,
            viewing_id: None,
            delete_target: None,
            enhance_rx: None,
            deferred_save: None,
            lock_error: None,
            status_message: None,
            storage_warned: false,
            should_quit: false,
        })
    }

    fn visible_notes(&self) -> Vec<&Note> {
        filter::visible(
            self.store.notes(),
            self.active_color,
            self.favorites_only,
            &self.search_query,
        )
    }

    fn selected_note_id(&self) -> Option<i64> {
        self.visible_notes().get(self.selected_index).map(|n| n.id)
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_notes().len();
        if len == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    /// Pointer movement and terminal resizes count as activity too.
    pub fn record_activity(&mut self) {
        self.guard.record_activity();
    }

    pub fn handle_key(
        &mut self,
        key: crossterm::event::KeyCode,
        modifiers: crossterm::event::KeyModifiers,
    ) -> Result<()> {
        if self.mode != AppMode::Locked {
            self.guard.record_activity();
        }
        match self.mode {
            AppMode::Locked => self.handle_locked_key(key),
            AppMode::List => self.handle_list_key(key)?,
            AppMode::View => self.handle_view_key(key),
            AppMode::Edit => self.handle_edit_key(key, modifiers),
            AppMode::Search => self.handle_search_key(key),
            AppMode::DeleteConfirm => self.handle_delete_confirm_key(key),
            AppMode::Settings => self.handle_settings_key(key),
            AppMode::ImportPath => self.handle_import_path_key(key),
            AppMode::EmailPrompt => self.handle_email_prompt_key(key),
            AppMode::Help => self.handle_help_key(key),
        }
        Ok(())
    }

    /// Bracketed paste. While editing, pasted text feeds the focused field;
    /// in the settings screen a paste is treated as an exported document to
    /// import.
    pub fn handle_paste(&mut self, text: String) {
        if self.mode != AppMode::Locked {
            self.guard.record_activity();
        }
        match self.mode {
            AppMode::Settings => self.import_document(&text),
            AppMode::ImportPath | AppMode::EmailPrompt => {
                self.input_buffer.push_str(text.trim());
            }
            AppMode::Search => {
                self.input_buffer.push_str(text.trim());
                self.search_query = self.input_buffer.clone();
                self.selected_index = 0;
            }
            AppMode::Locked => {
                self.input_buffer.push_str(text.trim());
            }
            AppMode::Edit => match self.edit_field {
                EditField::Title => self.edit_title.push_str(text.trim_end()),
                EditField::Content => self.edit_content.push_str(&text),
            },
            _ => {}
        }
    }

    fn handle_locked_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            crossterm::event::KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            crossterm::event::KeyCode::Enter => {
                if self.guard.submit_passphrase(&self.input_buffer) {
                    self.input_buffer.clear();
                    self.lock_error = None;
                    self.mode = self.resume_mode;
                } else {
                    // Wrong passphrase: stay locked, clear the field.
                    self.input_buffer.clear();
                    self.lock_error = Some("Incorrect passphrase".to_string());
                }
            }
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: crossterm::event::KeyCode) -> Result<()> {
        match key {
            crossterm::event::KeyCode::Esc => {
                if !self.search_query.is_empty() {
                    // Clear search
                    self.search_query.clear();
                    self.selected_index = 0;
                } else {
                    self.should_quit = true;
                }
            }
            crossterm::event::KeyCode::Char('/') => {
                self.mode = AppMode::Search;
                self.input_buffer = self.search_query.clone();
            }
            crossterm::event::KeyCode::Char('j') | crossterm::event::KeyCode::Down => {
                let max_index = self.visible_notes().len().saturating_sub(1);
                if self.selected_index < max_index {
                    self.selected_index += 1;
                }
            }
            crossterm::event::KeyCode::Char('k') | crossterm::event::KeyCode::Up => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }
            crossterm::event::KeyCode::Char('n') => {
                self.open_editor(None);
            }
            crossterm::event::KeyCode::Char('e') => {
                if let Some(id) = self.selected_note_id() {
                    self.open_editor(Some(id));
                }
            }
            crossterm::event::KeyCode::Char('d') => {
                if let Some(id) = self.selected_note_id() {
                    self.delete_target = Some(id);
                    self.mode = AppMode::DeleteConfirm;
                }
            }
            crossterm::event::KeyCode::Char('s') => {
                if let Some(id) = self.selected_note_id() {
                    self.store.toggle_star(id);
                }
            }
            crossterm::event::KeyCode::Char('f') => {
                self.favorites_only = !self.favorites_only;
                self.selected_index = 0;
            }
            crossterm::event::KeyCode::Char('c') => {
                self.active_color = next_color_filter(self.active_color);
                self.selected_index = 0;
            }
            crossterm::event::KeyCode::Char('o') => {
                self.mode = AppMode::Settings;
                self.status_message = None;
            }
            crossterm::event::KeyCode::Char('?') => {
                self.mode = AppMode::Help;
            }
            crossterm::event::KeyCode::Enter => {
                if let Some(id) = self.selected_note_id() {
                    self.viewing_id = Some(id);
                    self.mode = AppMode::View;
                    self.status_message = None;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_view_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Esc => {
                self.viewing_id = None;
                self.mode = AppMode::List;
                self.status_message = None;
            }
            crossterm::event::KeyCode::Char('e') => {
                if let Some(id) = self.viewing_id {
                    self.open_editor(Some(id));
                }
            }
            crossterm::event::KeyCode::Char('s') => {
                if let Some(id) = self.viewing_id {
                    self.store.toggle_star(id);
                }
            }
            crossterm::event::KeyCode::Char('d') => {
                if let Some(id) = self.viewing_id {
                    self.delete_target = Some(id);
                    self.mode = AppMode::DeleteConfirm;
                }
            }
            _ => {}
        }
    }

    fn handle_edit_key(
        &mut self,
        key: crossterm::event::KeyCode,
        modifiers: crossterm::event::KeyModifiers,
    ) {
        match key {
            crossterm::event::KeyCode::Esc => {
                // Dismissing the editor discards any in-flight enhancement.
                self.close_editor();
            }
            crossterm::event::KeyCode::Tab => {
                self.edit_field = match self.edit_field {
                    EditField::Title => EditField::Content,
                    EditField::Content => EditField::Title,
                };
            }
            crossterm::event::KeyCode::Char('s')
                if modifiers.contains(crossterm::event::KeyModifiers::CONTROL) =>
            {
                self.submit_edit();
            }
            crossterm::event::KeyCode::Char(c) => match self.edit_field {
                EditField::Title => self.edit_title.push(c),
                EditField::Content => self.edit_content.push(c),
            },
            crossterm::event::KeyCode::Backspace => {
                match self.edit_field {
                    EditField::Title => self.edit_title.pop(),
                    EditField::Content => self.edit_content.pop(),
                };
            }
            crossterm::event::KeyCode::Enter => match self.edit_field {
                EditField::Title => self.edit_field = EditField::Content,
                EditField::Content => self.edit_content.push('\n'),
            },
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Esc => {
                self.mode = AppMode::List;
                self.input_buffer.clear();
                self.search_query.clear();
                self.selected_index = 0;
            }
            crossterm::event::KeyCode::Enter => {
                // Keep the query applied and go back to the list.
                self.search_query = self.input_buffer.trim().to_string();
                self.input_buffer.clear();
                self.selected_index = 0;
                self.mode = AppMode::List;
            }
            crossterm::event::KeyCode::Char(c) => {
                self.input_buffer.push(c);
                // Live search as you type
                self.search_query = self.input_buffer.clone();
                self.selected_index = 0;
            }
            crossterm::event::KeyCode::Backspace => {
                self.input_buffer.pop();
                self.search_query = self.input_buffer.clone();
                self.selected_index = 0;
            }
            _ => {}
        }
    }

    fn handle_delete_confirm_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Char('y') | crossterm::event::KeyCode::Enter => {
                if let Some(id) = self.delete_target.take() {
                    self.store.delete(id);
                    self.status_message = Some("✓ Note deleted".to_string());
                }
                self.viewing_id = None;
                self.mode = AppMode::List;
                self.clamp_selection();
            }
            crossterm::event::KeyCode::Esc | crossterm::event::KeyCode::Char('n') => {
                self.delete_target = None;
                self.viewing_id = None;
                self.mode = AppMode::List;
            }
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Esc => {
                self.mode = AppMode::List;
            }
            crossterm::event::KeyCode::Char('e') => {
                match transfer::export_to_file(self.store.notes()) {
                    Ok(path) => {
                        self.status_message = Some(format!("✓ Exported to {}", path.display()));
                    }
                    Err(e) => {
                        self.status_message = Some(format!("✗ Export failed: {}", e));
                    }
                }
            }
            crossterm::event::KeyCode::Char('m') => {
                self.mode = AppMode::EmailPrompt;
                self.input_buffer.clear();
            }
            crossterm::event::KeyCode::Char('i') => {
                self.mode = AppMode::ImportPath;
                self.input_buffer.clear();
            }
            _ => {}
        }
    }

    fn handle_import_path_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Esc => {
                self.input_buffer.clear();
                self.mode = AppMode::Settings;
            }
            crossterm::event::KeyCode::Enter => {
                let path = self.input_buffer.trim().to_string();
                if !path.is_empty() {
                    match transfer::import_file(Path::new(&path)) {
                        Ok(notes) => {
                            let count = notes.len();
                            self.store.merge_import(notes);
                            self.clamp_selection();
                            self.status_message = Some(format!("✓ Imported {} notes", count));
                        }
                        Err(e) => {
                            self.status_message = Some(format!("✗ Import failed: {}", e));
                        }
                    }
                }
                self.input_buffer.clear();
                self.mode = AppMode::Settings;
            }
            crossterm::event::KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            crossterm::event::KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
    }

    fn handle_email_prompt_key(&mut self, key: crossterm::event::KeyCode) {
        match key {
            crossterm::event::KeyCode::Esc => {
                self.input_buffer.clear();
                self.mode = AppMode::Settings;
            }
            crossterm::event::KeyCode::Enter => {
                let recipient = self.input_buffer.trim().to_string();
                if !recipient.is_empty() {
                    match transfer::export_via_email(&recipient, self.store.notes()) {
                        Ok(()) => {
                            self.status_message = Some(format!("✓ Draft opened for {}", recipient));
                        }
                        Err(e) => {
                            self.status_message = Some(format!("✗ Email export failed: {}", e));
                        }
                    }
                }
                self.input_buffer.clear();
                self.mode = AppMode::Settings;
            }
            crossterm::event::KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            crossterm::event::KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: crossterm::event::KeyCode) {
        if matches!(
            key,
            crossterm::event::KeyCode::Esc | crossterm::event::KeyCode::Char('q')
        ) {
            self.mode = AppMode::List;
        }
    }

    fn open_editor(&mut self, id: Option<i64>) {
        let note = match id {
            Some(id) => match self.store.get(id) {
                Some(note) => note.clone(),
                None => return,
            },
            None => self.store.create(),
        };

        self.edit_title = note.title.clone();
        self.edit_content = note.content.clone();
        self.edit_field = if note.title.is_empty() {
            EditField::Title
        } else {
            EditField::Content
        };
        self.editing_note = Some(note);
        self.mode = AppMode::Edit;
        self.status_message = None;
    }

    fn close_editor(&mut self) {
        self.editing_note = None;
        self.enhance_rx = None;
        self.mode = if self.viewing_id.is_some() {
            AppMode::View
        } else {
            AppMode::List
        };
    }

    /// Confirmed save: run the edit through the enhancement gateway. Both
    /// fields blank cancels; a missing credential never calls out and never
    /// persists the note.
    fn submit_edit(&mut self) {
        if self.enhance_rx.is_some() {
            // One outstanding request per edit session.
            return;
        }
        if self.edit_title.trim().is_empty() && self.edit_content.trim().is_empty() {
            self.close_editor();
            return;
        }
        if self.config.api_key.is_empty() {
            self.status_message = Some(format!(
                "✗ {}. Set {} to enhance notes.",
                EnhanceError::MissingCredential,
                crate::config::env_vars::API_KEY
            ));
            return;
        }

        self.enhance_rx = Some(enhance::enhance_in_background(
            self.config.api_key.clone(),
            self.edit_title.clone(),
            self.edit_content.clone(),
        ));
        self.status_message = Some("ℹ Enhancing note...".to_string());
    }

    fn import_document(&mut self, text: &str) {
        match transfer::parse_document(text) {
            Ok(notes) => {
                let count = notes.len();
                self.store.merge_import(notes);
                self.clamp_selection();
                self.status_message = Some(format!("✓ Imported {} notes", count));
            }
            Err(e) => {
                self.status_message = Some(format!("✗ Import failed: {}", e));
            }
        }
    }

    /// Deadline-driven work: the inactivity lock, the store's transient
    /// markers, the in-flight enhancement, and the deferred original-text
    /// save after a failed enhancement.
    pub fn tick(&mut self) {
        if self.guard.poll() {
            self.enter_locked();
        }
        if self.store.tick() {
            self.clamp_selection();
            if let Some(id) = self.viewing_id {
                if self.store.get(id).is_none() {
                    self.viewing_id = None;
                    if self.mode == AppMode::View {
                        self.mode = AppMode::List;
                    }
                }
            }
        }
        self.poll_enhancement();
        self.poll_deferred_save();

        if self.store.is_degraded() && !self.storage_warned {
            self.storage_warned = true;
            self.status_message = Some(format!(
                "✗ Could not write {}; changes may be lost on exit",
                self.store.journal_path().display()
            ));
        }
    }

    fn enter_locked(&mut self) {
        if self.mode != AppMode::Locked {
            self.resume_mode = self.mode;
            self.mode = AppMode::Locked;
            self.input_buffer.clear();
            self.lock_error = None;
        }
    }

    fn poll_enhancement(&mut self) {
        let Some(rx) = &self.enhance_rx else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => {
                Err(EnhanceError::Unavailable("worker stopped".to_string()))
            }
        };
        self.enhance_rx = None;

        match outcome {
            Ok(enhancement) => {
                if let Some(mut note) = self.editing_note.take() {
                    note.title = enhancement.title;
                    note.content = enhancement.content;
                    note.date = display_date();
                    self.store.save(note);
                    self.finish_editing("✓ Note saved");
                }
            }
            Err(err @ EnhanceError::MissingCredential) => {
                self.status_message = Some(format!("✗ {}", err));
            }
            Err(err) => {
                // Recovery: warn, then save the user's own words unchanged.
                self.status_message = Some(format!("✗ {}. Saving original content.", err));
                if let Some(mut note) = self.editing_note.take() {
                    note.title = self.edit_title.clone();
                    note.content = self.edit_content.clone();
                    note.date = display_date();
                    self.deferred_save = Some((note, Instant::now() + FALLBACK_SAVE_DELAY));
                }
            }
        }
    }

    fn poll_deferred_save(&mut self) {
        let due = self
            .deferred_save
            .as_ref()
            .map_or(false, |(_, when)| Instant::now() >= *when);
        if !due {
            return;
        }
        if let Some((note, _)) = self.deferred_save.take() {
            self.store.save(note);
            self.finish_editing("✓ Saved original note");
        }
    }

    fn finish_editing(&mut self, message: &str) {
        self.editing_note = None;
        let after = if self.viewing_id.is_some() {
            AppMode::View
        } else {
            AppMode::List
        };
        if self.mode == AppMode::Edit {
            self.mode = after;
        }
        // A save can land while the journal is locked; don't resume into a
        // stale editor afterwards.
        if self.resume_mode == AppMode::Edit {
            self.resume_mode = after;
        }
        self.status_message = Some(message.to_string());
        self.clamp_selection();
    }

    pub fn render(&self, frame: &mut Frame) {
        match self.mode {
            AppMode::Locked => self.render_locked(frame),
            AppMode::List => self.render_list(frame),
            AppMode::View => self.render_view(frame),
            AppMode::Edit => self.render_edit(frame),
            AppMode::Search => self.render_search(frame),
            AppMode::DeleteConfirm => self.render_delete_confirm(frame),
            AppMode::Settings => self.render_settings(frame),
            AppMode::ImportPath => self.render_import_path(frame),
            AppMode::EmailPrompt => self.render_email_prompt(frame),
            AppMode::Help => self.render_help(frame),
        }
    }

    fn render_locked(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Length(7),
                Constraint::Min(0),
            ])
            .split(frame.area());

        // Nothing from the journal is drawn while locked.
        let mut lines = vec![
            Line::from(Span::styled(
                "🔒 App Locked",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("Passphrase: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    "•".repeat(self.input_buffer.chars().count()),
                    Style::default().fg(Color::Yellow),
                ),
            ]),
        ];
        if let Some(ref error) = self.lock_error {
            lines.push(Line::from(Span::styled(
                error.as_str(),
                Style::default().fg(Color::Red),
            )));
        }

        let gate = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .alignment(Alignment::Center);
        frame.render_widget(gate, chunks[1]);
    }

    fn render_list(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Pocket Journal")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let visible = self.visible_notes();

        let mut list_title = format!("Notes ({})", visible.len());
        if let Some(color) = self.active_color {
            list_title.push_str(&format!(" • {}", color.label()));
        }
        if self.favorites_only {
            list_title.push_str(" • ★");
        }
        if !self.search_query.is_empty() {
            list_title.push_str(&format!(" • 🔍 {}", self.search_query));
        }

        if visible.is_empty() {
            let empty = Paragraph::new("No journal yet. Press n to write your first note.")
                .block(Block::default().borders(Borders::ALL).title(list_title))
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, chunks[1]);
        } else {
            let items: Vec<ListItem> = visible
                .iter()
                .map(|note| {
                    // Cards inside their animation window render dimmed.
                    let transient = self.store.is_pending_delete(note.id)
                        || self.store.animating_insert() == Some(note.id);
                    let base_style = if transient {
                        Style::default().add_modifier(Modifier::DIM)
                    } else {
                        Style::default()
                    };

                    let star = if note.has_star { "★ " } else { "" };
                    let title_text = if note.title.is_empty() {
                        "(untitled)".to_string()
                    } else {
                        note.title.clone()
                    };

                    let preview = note.content.lines().next().unwrap_or("").trim();
                    let preview: String = if preview.chars().count() > 60 {
                        format!("{}...", preview.chars().take(60).collect::<String>())
                    } else {
                        preview.to_string()
                    };

                    ListItem::new(vec![
                        Line::from(Span::styled(
                            format!("{}{}", star, title_text),
                            Style::default()
                                .fg(card_color(note.color))
                                .add_modifier(Modifier::BOLD),
                        )),
                        Line::from(Span::styled(
                            format!("  {}", preview),
                            Style::default().fg(Color::DarkGray),
                        )),
                        Line::from(Span::styled(
                            format!("  📅 {}", note.date),
                            Style::default().fg(Color::DarkGray),
                        )),
                    ])
                    .style(base_style)
                })
                .collect();

            let mut state = ratatui::widgets::ListState::default();
            state.select(Some(self.selected_index));

            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title(list_title))
                .highlight_style(Style::default().fg(Color::Yellow).bg(Color::DarkGray))
                .highlight_symbol("▶ ");
            frame.render_stateful_widget(list, chunks[1], &mut state);
        }

        self.render_status(frame, chunks[2]);

        // Help bar
        let help = Paragraph::new("j/k: navigate | n: new | e: edit | Enter: view | s: star | d: delete | f: favorites | c: color | /: search | o: options | ?: help | Esc: quit")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }

    fn render_view(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Pocket Journal")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        if let Some(note) = self.viewing_id.and_then(|id| self.store.get(id)) {
            let mut lines = vec![Line::from(vec![
                Span::styled("📅 ", Style::default().fg(Color::Cyan)),
                Span::styled(note.date.as_str(), Style::default().fg(Color::White)),
                Span::styled(
                    if note.has_star { "  ★" } else { "" },
                    Style::default().fg(Color::Yellow),
                ),
            ])];
            lines.push(Line::default());
            for line in note.content.lines() {
                lines.push(Line::from(Span::styled(
                    line,
                    Style::default().fg(Color::White),
                )));
            }

            let block_title = if note.title.is_empty() {
                "(untitled)"
            } else {
                note.title.as_str()
            };
            let content = Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(block_title)
                        .border_style(Style::default().fg(card_color(note.color))),
                )
                .wrap(Wrap { trim: true });
            frame.render_widget(content, chunks[1]);
        }

        self.render_status(frame, chunks[2]);

        // Help bar
        let help = Paragraph::new("e: edit | s: star | d: delete | Esc: back")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }

    fn render_edit(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar
        let is_new = self
            .editing_note
            .as_ref()
            .map(|n| self.store.get(n.id).is_none())
            .unwrap_or(true);
        let title = Paragraph::new(if is_new {
            "Docket - New Note"
        } else {
            "Docket - Edit Note"
        })
        .block(Block::default().borders(Borders::ALL).title("docket"))
        .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let focus_style = Style::default().fg(Color::Yellow);
        let blur_style = Style::default().fg(Color::DarkGray);

        let title_input = Paragraph::new(self.edit_title.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Title")
                    .border_style(if self.edit_field == EditField::Title {
                        focus_style
                    } else {
                        blur_style
                    }),
            )
            .style(Style::default().fg(Color::White));
        frame.render_widget(title_input, chunks[1]);

        let char_count = self.edit_content.chars().count();
        let content_title = if self.enhance_rx.is_some() {
            format!("Content ({} chars) - enhancing...", char_count)
        } else {
            format!("Content ({} chars)", char_count)
        };
        let content_input = Paragraph::new(self.edit_content.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(content_title)
                    .border_style(if self.edit_field == EditField::Content {
                        focus_style
                    } else {
                        blur_style
                    }),
            )
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::White));
        frame.render_widget(content_input, chunks[2]);

        self.render_status(frame, chunks[3]);

        // Help bar
        let help = Paragraph::new("Tab: switch field | Ctrl+S: save | Esc: cancel")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }

    fn render_search(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Pocket Journal")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let search_prompt = format!("🔍 {}", self.input_buffer);
        let search = Paragraph::new(search_prompt.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Search (substring or regex, Enter to apply)"),
            )
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(search, chunks[1]);

        let results = self.visible_notes();
        if results.is_empty() {
            let results_text = Paragraph::new("No results found. Try a different search term.")
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Results (0 found)"),
                )
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true });
            frame.render_widget(results_text, chunks[2]);
        } else {
            let items: Vec<ListItem> = results
                .iter()
                .take(20)
                .map(|note| {
                    let preview = note.content.lines().next().unwrap_or("").trim();
                    let preview: String = if preview.chars().count() > 50 {
                        format!("{}...", preview.chars().take(50).collect::<String>())
                    } else {
                        preview.to_string()
                    };
                    ListItem::new(vec![
                        Line::from(Span::styled(
                            if note.title.is_empty() {
                                "(untitled)".to_string()
                            } else {
                                note.title.clone()
                            },
                            Style::default()
                                .fg(card_color(note.color))
                                .add_modifier(Modifier::BOLD),
                        )),
                        Line::from(Span::styled(
                            format!("  {}", preview),
                            Style::default().fg(Color::DarkGray),
                        )),
                    ])
                })
                .collect();

            let list = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Results ({} found)", results.len())),
            );
            frame.render_widget(list, chunks[2]);
        }
    }

    fn render_delete_confirm(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Pocket Journal")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let message = match self.delete_target.and_then(|id| self.store.get(id)) {
            Some(note) if !note.title.is_empty() => {
                format!(
                    "Delete note: {}?\n\nPress Enter/y to confirm, Esc/n to cancel",
                    note.title
                )
            }
            _ => "Delete this note?\n\nPress Enter/y to confirm, Esc/n to cancel".to_string(),
        };
        let confirm = Paragraph::new(message)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm Delete"),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Red));
        frame.render_widget(confirm, chunks[1]);

        // Help bar
        let help = Paragraph::new("Enter/y: confirm | Esc/n: cancel")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }

    fn render_settings(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Settings")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let lines = vec![
            Line::from(vec![
                Span::styled("e", Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("  export all notes to {}", transfer::EXPORT_FILE_NAME),
                    Style::default().fg(Color::White),
                ),
            ]),
            Line::from(vec![
                Span::styled("m", Style::default().fg(Color::Yellow)),
                Span::styled(
                    "  email the exported document",
                    Style::default().fg(Color::White),
                ),
            ]),
            Line::from(vec![
                Span::styled("i", Style::default().fg(Color::Yellow)),
                Span::styled(
                    "  import notes from a file",
                    Style::default().fg(Color::White),
                ),
            ]),
            Line::default(),
            Line::from(Span::styled(
                "Pasting an exported document here imports it directly.",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let body = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Import / Export"),
        );
        frame.render_widget(body, chunks[1]);

        self.render_status(frame, chunks[2]);

        // Help bar
        let help = Paragraph::new("e: export | m: email | i: import | Esc: back")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }

    fn render_import_path(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Import")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let input = Paragraph::new(self.input_buffer.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Path to an exported journal file"),
            )
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(input, chunks[1]);

        let help = Paragraph::new("Enter: import | Esc: back")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }

    fn render_email_prompt(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Email Export")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let input = Paragraph::new(self.input_buffer.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Recipient address"),
            )
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(input, chunks[1]);

        let help = Paragraph::new("Enter: open mail draft | Esc: back")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }

    fn render_help(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(frame.area());

        // Title bar
        let title = Paragraph::new("Docket - Help")
            .block(Block::default().borders(Borders::ALL).title("docket"))
            .style(Style::default().fg(Color::Cyan));
        frame.render_widget(title, chunks[0]);

        let text = "\
Notes
  n          new note
  e          edit the selected note
  Enter      view the selected note
  d          delete (with confirmation)
  s          toggle star

Filters
  f          show starred notes only
  c          cycle the color filter
  /          search titles, content, and dates; regex works too

Import / Export
  o          open the settings screen

Editing
  Tab        switch between title and content
  Ctrl+S     save (runs the AI enhancement when a key is configured)
  Esc        cancel without saving

The journal locks itself after a period of inactivity; enter the
passphrase to continue.";
        let body = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Keys"))
            .wrap(Wrap { trim: false });
        frame.render_widget(body, chunks[1]);

        let help = Paragraph::new("Esc/q: back")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let Some(ref message) = self.status_message else {
            let empty =
                Paragraph::new("").block(Block::default().borders(Borders::ALL).title("Status"));
            frame.render_widget(empty, area);
            return;
        };

        let status_color = if message.starts_with("✓") {
            Color::Green
        } else if message.starts_with("✗") {
            Color::Red
        } else {
            Color::Yellow
        };
        let status = Paragraph::new(message.as_str())
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(status_color));
        frame.render_widget(status, area);
    }
}

fn card_color(color: NoteColor) -> Color {
    match color {
        NoteColor::Purple => Color::Magenta,
        NoteColor::Green => Color::Green,
        NoteColor::Orange => Color::LightRed,
        NoteColor::Blue => Color::Blue,
        NoteColor::Yellow => Color::Yellow,
    }
}

fn next_color_filter(current: Option<NoteColor>) -> Option<NoteColor> {
    match current {
        None => Some(PALETTE[0]),
        Some(color) => {
            let i = PALETTE.iter().position(|c| *c == color).unwrap_or(0);
            if i + 1 < PALETTE.len() {
                Some(PALETTE[i + 1])
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use tempfile::tempdir;

    fn test_app(dir: &Path, lock_timeout: Duration) -> App {
        App::with_config(Config {
            data_dir: dir.to_path_buf(),
            api_key: String::new(),
            passphrase: "secret".to_string(),
            lock_timeout,
        })
        .expect("Failed to create app")
    }

    const NO_LOCK: Duration = Duration::from_secs(3600);

    #[test]
    fn test_save_without_api_key_reports_missing_credential() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        app.open_editor(None);
        app.edit_content = "Hello".to_string();
        app.submit_edit();

        // Nothing persisted, no call out, and the editor stays open with the
        // inline message.
        assert!(app.store.notes().is_empty());
        assert!(app.enhance_rx.is_none());
        assert!(matches!(app.mode, AppMode::Edit));
        let message = app.status_message.as_deref().unwrap_or("");
        assert!(message.contains("missing"), "unexpected message: {}", message);
    }

    #[test]
    fn test_blank_edit_closes_without_creating() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        app.open_editor(None);
        app.submit_edit();

        assert!(app.store.notes().is_empty());
        assert!(matches!(app.mode, AppMode::List));
    }

    #[test]
    fn test_wrong_passphrase_clears_input_and_reports() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        app.mode = AppMode::Locked;
        app.input_buffer = "wrong".to_string();
        app.handle_locked_key(KeyCode::Enter);

        assert!(matches!(app.mode, AppMode::Locked));
        assert!(app.input_buffer.is_empty());
        assert!(app.lock_error.is_some());
    }

    #[test]
    fn test_correct_passphrase_returns_to_previous_mode() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        app.mode = AppMode::Locked;
        app.input_buffer = "secret".to_string();
        app.handle_locked_key(KeyCode::Enter);

        assert!(matches!(app.mode, AppMode::List));
        assert!(app.lock_error.is_none());
    }

    #[test]
    fn test_inactivity_lock_hides_journal() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), Duration::ZERO);

        app.tick();
        assert!(matches!(app.mode, AppMode::Locked));
    }

    #[test]
    fn test_pasted_document_imports_into_store() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        app.mode = AppMode::Settings;
        app.handle_paste(
            r#"[{"id":1,"title":"t","content":"c","color":"blue","date":"1/1/2025"}]"#.to_string(),
        );

        assert_eq!(app.store.notes().len(), 1);
        assert_eq!(app.store.notes()[0].id, 1);
    }

    #[test]
    fn test_invalid_pasted_document_leaves_store_untouched() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        app.mode = AppMode::Settings;
        app.handle_paste("not a journal document".to_string());

        assert!(app.store.notes().is_empty());
        let message = app.status_message.as_deref().unwrap_or("");
        assert!(message.contains("Import failed"), "unexpected message: {}", message);
    }

    #[test]
    fn test_deferred_save_keeps_original_words() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut app = test_app(dir.path(), NO_LOCK);

        let mut note = app.store.create();
        note.title = "kept words".to_string();
        app.deferred_save = Some((note, Instant::now()));
        app.poll_deferred_save();

        assert_eq!(app.store.notes().len(), 1);
        assert_eq!(app.store.notes()[0].title, "kept words");
        let message = app.status_message.as_deref().unwrap_or("");
        assert!(message.contains("Saved original"));
    }
}
