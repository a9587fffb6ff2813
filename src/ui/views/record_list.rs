use crate::cache::CacheSource;
use crate::filter::filter;
use crate::query::{Query, QueryState};
use crate::store::{CachedStore, Record};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::RecordEditView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Duration;

/// Root view: every record in the store, narrowed by a live search
pub struct RecordListView {
  store: CachedStore,
  query: Query<Vec<Record>>,
  list_state: ListState,
  search: SearchInput,
  redirect_delay: Duration,
}

impl RecordListView {
  pub fn new(store: CachedStore, redirect_delay: Duration) -> Self {
    let store_for_query = store.clone();
    let mut query = Query::new(move || {
      let store = store_for_query.clone();
      async move { store.load_collection().await.map_err(|e| e.to_string()) }
    });

    // Show a young cache entry at once; the network still answers
    if let Some(cached) = store.cached_collection() {
      query.prime(cached);
    }
    query.fetch();

    Self {
      store,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      redirect_delay,
    }
  }

  fn records(&self) -> &[Record] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn visible(&self) -> Vec<&Record> {
    filter(
      self.records(),
      &self.store.schema().display_field,
      self.search.query(),
    )
  }

  fn selected_id(&self) -> Option<String> {
    let idx = self.list_state.selected()?;
    let visible = self.visible();
    let record = visible.get(idx)?;
    Some(self.store.schema().identifier(record).to_string())
  }

  fn title(&self, shown: usize) -> String {
    let total = self.records().len();
    let count = if self.search.query().is_empty() {
      format!("{}", total)
    } else {
      format!("{}/{}", shown, total)
    };

    match self.query.state() {
      QueryState::Idle | QueryState::Loading => " Records (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Records (error: {}) ", e),
      QueryState::Success(_) => {
        let mut title = format!(" Records ({})", count);
        if self.query.is_refreshing() {
          title.push_str(" (refreshing...)");
        }
        if self.query.source() == Some(CacheSource::Offline) {
          title.push_str(" [cached]");
        }
        title.push(' ');
        title
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let schema = self.store.schema();
    let rows: Vec<(String, String)> = self
      .visible()
      .into_iter()
      .map(|r| {
        (
          schema.identifier(r).to_string(),
          schema.display_name(r).to_string(),
        )
      })
      .collect();
    let title = self.title(rows.len());

    ensure_valid_selection(&mut self.list_state, rows.len());

    let border = if self.query.warning().is_some() {
      Color::Yellow
    } else {
      Color::Blue
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if rows.is_empty() {
      let (content, color) = if self.query.is_loading() {
        ("Loading records...".to_string(), Color::DarkGray)
      } else if let Some(error) = self.query.error() {
        (format!("Error: {}\n\nPress 'r' to retry.", error), Color::Red)
      } else if !self.search.query().is_empty() {
        (
          format!("No records match '{}'.", self.search.query()),
          Color::DarkGray,
        )
      } else {
        ("No records found.".to_string(), Color::DarkGray)
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, area);
      return;
    }

    let name_width = (area.width as usize).saturating_sub(28).max(10);
    let items: Vec<ListItem> = rows
      .iter()
      .map(|(id, name)| {
        ListItem::new(Line::from(vec![
          Span::styled("OA No: ", Style::default().fg(Color::DarkGray)),
          Span::styled(format!("{:<14}", id), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::raw(truncate(name, name_width)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for RecordListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        // Filter moved under the cursor
        self.list_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        if let Some(id) = self.selected_id() {
          return ViewAction::Push(Box::new(RecordEditView::open(
            self.store.clone(),
            id,
            self.redirect_delay,
          )));
        }
      }
      KeyCode::Esc if !self.search.query().is_empty() => {
        self.search = SearchInput::new();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    let counts = (self.visible().len(), self.records().len());
    self.search.render_overlay(frame, area, counts);
  }

  fn breadcrumb_label(&self) -> String {
    if self.search.query().is_empty() {
      "Records".to_string()
    } else {
      format!("Records [/{}]", self.search.query())
    }
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    ViewAction::None
  }

  fn on_resume(&mut self) {
    // Pick up writes made from the editor
    self.query.refetch();
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn warning(&self) -> Option<String> {
    self.query.warning().map(str::to_string)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("enter", "open").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::cached_client::tests::store_for;
  use crossterm::event::KeyModifiers;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn loaded_view(server: &MockServer) -> RecordListView {
    Mock::given(method("GET"))
      .and(path("/read"))
      .respond_with(ResponseTemplate::new(200).set_body_string(
        r#"[{"CUSTOMER NAME":"Acme","OA NUMBER":"101"},{"CUSTOMER NAME":"Zeta","OA NUMBER":"202"}]"#,
      ))
      .mount(server)
      .await;

    let mut view = RecordListView::new(store_for(&server.uri()), Duration::ZERO);
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      view.tick();
      if view.query.data().is_some() {
        break;
      }
    }
    view
  }

  #[tokio::test]
  async fn test_search_narrows_and_enter_opens_match() {
    let server = MockServer::start().await;
    let mut view = loaded_view(&server).await;
    assert_eq!(view.visible().len(), 2);

    view.handle_key(key(KeyCode::Char('/')));
    assert!(view.is_capturing_input());
    view.handle_key(key(KeyCode::Char('z')));
    view.handle_key(key(KeyCode::Enter));
    assert!(!view.is_capturing_input());

    assert_eq!(view.visible().len(), 1);
    assert_eq!(view.selected_id().as_deref(), Some("202"));
    assert!(matches!(view.handle_key(key(KeyCode::Enter)), ViewAction::Push(_)));
  }

  #[tokio::test]
  async fn test_q_while_searching_types_instead_of_quitting() {
    let server = MockServer::start().await;
    let mut view = loaded_view(&server).await;

    view.handle_key(key(KeyCode::Char('/')));
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::None));
    assert_eq!(view.search.query(), "q");
  }

  #[tokio::test]
  async fn test_error_without_cache_leaves_list_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/read"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let mut view = RecordListView::new(store_for(&server.uri()), Duration::ZERO);
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      view.tick();
      if view.query.is_error() {
        break;
      }
    }

    assert!(view.records().is_empty());
    assert!(view.query.error().unwrap().contains("503"));
    assert!(view.title(0).contains("error"));
    assert!(view.selected_id().is_none());
  }
}
