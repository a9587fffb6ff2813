use crate::cache::CacheSource;
use crate::progress::{group_status, normalize_date_text, ProgressStatus};
use crate::query::Query;
use crate::store::{CachedStore, Record};
use crate::submit::{SubmitFlow, SubmitOutcome, SubmitPhase};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::progress_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::{Duration, Instant};
use tracing::debug;

/// Field being edited inline
struct InlineEdit {
  field: String,
  input: TextInput,
}

/// Edits one record: an existing one loaded by identifier, or a blank one.
pub struct RecordEditView {
  store: CachedStore,
  /// None when creating
  id: Option<String>,
  query: Option<Query<Record>>,
  /// Working copy shown and submitted
  draft: Option<Record>,
  /// Local edits exist; background refreshes must not clobber them
  dirty: bool,
  list_state: ListState,
  editing: Option<InlineEdit>,
  submit: SubmitFlow,
  notice: Option<String>,
}

impl RecordEditView {
  /// Editor for the record with identifier `id`
  pub fn open(store: CachedStore, id: String, redirect_delay: Duration) -> Self {
    let store_for_query = store.clone();
    let query_id = id.clone();
    let mut query = Query::new(move || {
      let store = store_for_query.clone();
      let id = query_id.clone();
      async move { store.load_record(&id).await.map_err(|e| e.to_string()) }
    });

    let mut draft = None;
    if let Some(cached) = store.cached_record(&id) {
      draft = Some(cached.data.clone());
      query.prime(cached);
    }
    query.fetch();

    Self {
      store,
      id: Some(id),
      query: Some(query),
      draft,
      dirty: false,
      list_state: ListState::default(),
      editing: None,
      submit: SubmitFlow::new(redirect_delay),
      notice: None,
    }
  }

  /// Editor for a new record with every template field empty
  pub fn create(store: CachedStore, redirect_delay: Duration) -> Self {
    let draft = Record::blank(&store.schema().template());
    Self {
      store,
      id: None,
      query: None,
      draft: Some(draft),
      dirty: false,
      list_state: ListState::default(),
      editing: None,
      submit: SubmitFlow::new(redirect_delay),
      notice: None,
    }
  }

  fn is_new(&self) -> bool {
    self.id.is_none()
  }

  fn field_names(&self) -> Vec<String> {
    self
      .draft
      .as_ref()
      .map(|r| r.field_names().map(str::to_string).collect())
      .unwrap_or_default()
  }

  fn selected_field(&self) -> Option<String> {
    let idx = self.list_state.selected()?;
    self.field_names().into_iter().nth(idx)
  }

  /// A new record has nothing to protect yet, so every field is open
  fn is_editable(&self, field: &str) -> bool {
    self.is_new() || !self.store.schema().is_read_only(field)
  }

  fn begin_edit(&mut self) {
    let Some(field) = self.selected_field() else {
      return;
    };
    if !self.is_editable(&field) {
      self.notice = Some(format!("{} is read-only", field));
      return;
    }
    let value = self
      .draft
      .as_ref()
      .map(|r| r.value(&field).to_string())
      .unwrap_or_default();
    self.notice = None;
    self.editing = Some(InlineEdit {
      input: TextInput::with_value(&value),
      field,
    });
  }

  fn commit_edit(&mut self, field: String, value: String) {
    let value = if self.store.schema().is_date_field(&field) {
      normalize_date_text(&value)
    } else {
      value
    };
    if let Some(draft) = self.draft.as_mut() {
      if draft.value(&field) != value {
        draft.set(field, value);
        self.dirty = true;
      }
    }
  }

  fn start_submit(&mut self) {
    if !self.submit.can_submit() {
      return;
    }
    let Some(record) = self.draft.clone() else {
      return;
    };

    if self.store.schema().identifier(&record).is_empty() {
      self.notice = Some(format!(
        "{} is required",
        self.store.schema().identifier_field
      ));
      return;
    }

    self.notice = None;
    let store = self.store.clone();
    self.submit.start(async move {
      store.submit(&record).await.map_err(|e| e.to_string())
    });
  }

  fn reload(&mut self) {
    if let Some(query) = self.query.as_mut() {
      debug!(dirty = self.dirty, "reloading record, discarding edits");
      self.dirty = false;
      query.refetch();
    }
  }

  fn title(&self) -> String {
    let name = match (&self.id, &self.draft) {
      (None, _) => "New record".to_string(),
      (Some(id), Some(draft)) => {
        let display = self.store.schema().display_name(draft);
        if display.is_empty() {
          format!("OA {}", id)
        } else {
          format!("OA {} · {}", id, display)
        }
      }
      (Some(id), None) => format!("OA {}", id),
    };

    let mut title = format!(" {}", name);
    if let Some(query) = &self.query {
      if query.is_loading() {
        title.push_str(" (loading...)");
      } else if query.is_refreshing() {
        title.push_str(" (refreshing...)");
      } else if query.is_error() {
        title.push_str(" (reload failed)");
      } else if query.source() == Some(CacheSource::Offline) {
        title.push_str(" [cached]");
      }
    }
    if self.dirty {
      title.push_str(" *");
    }
    title.push(' ');
    title
  }

  /// Progress color for a field that belongs to a plan/actual group
  fn field_status(&self, record: &Record, field: &str) -> Option<ProgressStatus> {
    let group = self.store.schema().group_for(field)?;
    Some(group_status(record, group))
  }

  /// Fetch error while local edits are still on screen
  fn reload_error(&self) -> Option<&str> {
    self.draft.as_ref()?;
    self.query.as_ref()?.error()
  }

  /// Banner text and color: submit progress first, then notices, then a
  /// failed reload
  fn banner(&self) -> Option<(String, Color)> {
    if let Some(text) = self.submit.banner() {
      let color = match self.submit.phase() {
        SubmitPhase::Succeeded { .. } => Color::Green,
        SubmitPhase::Failed(_) => Color::Red,
        _ => Color::Yellow,
      };
      return Some((text.to_string(), color));
    }
    if let Some(notice) = &self.notice {
      return Some((notice.clone(), Color::Yellow));
    }
    self
      .reload_error()
      .map(|error| (format!("Reload failed: {}", error), Color::Red))
  }

  fn render_banner(&self, frame: &mut Frame, area: Rect) {
    let Some((text, color)) = self.banner() else {
      return;
    };
    let banner = Paragraph::new(text)
      .style(Style::default().fg(color).bold())
      .wrap(Wrap { trim: true });
    frame.render_widget(banner, area);
  }

  fn render_fields(&mut self, frame: &mut Frame, area: Rect, block: Block) {
    let Some(record) = self.draft.clone() else {
      return;
    };
    let names = self.field_names();
    ensure_valid_selection(&mut self.list_state, names.len());

    let label_width = names
      .iter()
      .map(|n| n.chars().count())
      .max()
      .unwrap_or(0)
      .min(24);

    let items: Vec<ListItem> = names
      .iter()
      .map(|field| {
        let editable = self.is_editable(field);
        let status = self.field_status(&record, field);
        let value_style = match status {
          Some(status) => Style::default().fg(progress_color(status)),
          None if editable => Style::default(),
          None => Style::default().fg(Color::Gray),
        };

        let mut spans = vec![Span::styled(
          format!("{:<width$} ", field, width = label_width),
          Style::default().fg(Color::Cyan),
        )];
        match &self.editing {
          Some(edit) if &edit.field == field => spans.extend(editing_spans(&edit.input)),
          _ => spans.push(Span::styled(record.value(field).to_string(), value_style)),
        }
        if !editable {
          spans.push(Span::styled("  (read-only)", Style::default().fg(Color::DarkGray)));
        }
        if let Some(status) = status {
          if self.store.schema().group_for(field).map(|g| &g.actual) == Some(field) {
            spans.push(Span::styled(
              format!("  [{}]", status.label()),
              Style::default().fg(progress_color(status)),
            ));
          }
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

/// Inline editor text with a block cursor at the input's cursor position
fn editing_spans(input: &TextInput) -> Vec<Span<'static>> {
  let value = input.value();
  let at = value
    .char_indices()
    .nth(input.cursor_position())
    .map(|(i, _)| i)
    .unwrap_or(value.len());
  let (before, rest) = value.split_at(at);
  let mut chars = rest.chars();
  let under = chars.next().map(String::from).unwrap_or_else(|| " ".to_string());

  let field = Style::default().fg(Color::Black).bg(Color::Yellow);
  vec![
    Span::styled(before.to_string(), field),
    Span::styled(under, field.add_modifier(Modifier::REVERSED)),
    Span::styled(chars.as_str().to_string(), field),
  ]
}

impl View for RecordEditView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(edit) = self.editing.as_mut() {
      match edit.input.handle_key(key) {
        InputResult::Submitted(value) => {
          if let Some(edit) = self.editing.take() {
            self.commit_edit(edit.field, value);
          }
        }
        InputResult::Cancelled => self.editing = None,
        InputResult::Consumed | InputResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      KeyCode::Enter | KeyCode::Char('e') => self.begin_edit(),
      KeyCode::Char('s') => self.start_submit(),
      KeyCode::Char('r') => self.reload(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let banner_height = if self.banner().is_some() { 2 } else { 0 };
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(banner_height), Constraint::Min(1)])
      .split(area);

    self.render_banner(frame, chunks[0]);

    let border = match self.query.as_ref().and_then(|q| q.warning()) {
      Some(_) => Color::Yellow,
      None => Color::Blue,
    };
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if self.draft.is_some() {
      self.render_fields(frame, chunks[1], block);
      return;
    }

    let (content, color) = match self.query.as_ref().and_then(|q| q.error()) {
      Some(error) => (format!("Error: {}\n\nPress 'r' to retry.", error), Color::Red),
      None => ("Loading record...".to_string(), Color::DarkGray),
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(color));
    frame.render_widget(paragraph, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.id {
      Some(id) => format!("OA {}", id),
      None => "New".to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(query) = self.query.as_mut() {
      if query.poll() {
        match query.data() {
          Some(record) if !self.dirty => self.draft = Some(record.clone()),
          Some(_) => debug!("keeping local edits over refreshed record"),
          // Error with nothing loaded: show it instead of a stale draft
          None if !self.dirty => self.draft = None,
          None => {}
        }
      }
    }

    match self.submit.poll(Instant::now()) {
      SubmitOutcome::Navigate => ViewAction::Pop,
      SubmitOutcome::Changed | SubmitOutcome::Pending => ViewAction::None,
    }
  }

  fn is_capturing_input(&self) -> bool {
    self.editing.is_some()
  }

  fn warning(&self) -> Option<String> {
    self
      .query
      .as_ref()
      .and_then(|q| q.warning())
      .map(str::to_string)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.editing.is_some() {
      return vec![
        ShortcutInfo::new("enter", "save field").with_priority(10),
        ShortcutInfo::new("esc", "discard").with_priority(20),
      ];
    }
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("s", "submit").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if !self.is_new() {
      shortcuts.push(ShortcutInfo::new("r", "reload").with_priority(40));
    }
    shortcuts
  }
}
