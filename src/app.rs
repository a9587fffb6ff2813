use crate::commands::CommandKind;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::store::CachedStore;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{RecordEditView, RecordListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  /// Navigation stack - the record list is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` palette, drawn over whichever view is on top
  command_input: CommandInput,

  store: CachedStore,
  title: String,
  redirect_delay: Duration,

  /// One-line message for the footer (unknown command, etc.)
  message: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, store: CachedStore, initial_record: Option<String>) -> Self {
    let title = config
      .title
      .clone()
      .unwrap_or_else(|| store.host().to_string());
    let redirect_delay = config.submit.redirect_delay();

    let mut view_stack: Vec<Box<dyn View>> = vec![Box::new(RecordListView::new(
      store.clone(),
      redirect_delay,
    ))];
    if let Some(id) = initial_record {
      view_stack.push(Box::new(RecordEditView::open(
        store.clone(),
        id,
        redirect_delay,
      )));
    }

    Self {
      view_stack,
      command_input: CommandInput::new(),
      store,
      title,
      redirect_delay,
      message: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    info!("exiting");
    Ok(())
  }

  fn tick(&mut self) {
    let action = match self.view_stack.last_mut() {
      Some(view) => view.tick(),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The palette opens only when no text field owns the keyboard
    let capturing = self
      .view_stack
      .last()
      .map(|v| v.is_capturing_input())
      .unwrap_or(false);
    if !capturing || self.command_input.is_active() {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(kind)) => {
          self.run_command(kind);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          self.message = Some(format!("Unknown command: {}", input));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => {
          self.message = None;
          return;
        }
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn run_command(&mut self, kind: CommandKind) {
    debug!(?kind, "running command");
    self.message = None;
    match kind {
      CommandKind::Records => {
        self.view_stack.truncate(1);
        if let Some(root) = self.view_stack.first_mut() {
          root.on_resume();
        }
      }
      CommandKind::New => {
        self.view_stack.truncate(1);
        self.view_stack.push(Box::new(RecordEditView::create(
          self.store.clone(),
          self.redirect_delay,
        )));
      }
      CommandKind::Quit => self.should_quit = true,
    }
  }

  /// Execute a view's request against the stack
  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.message = None;
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() <= 1 {
          self.should_quit = true;
          return;
        }
        self.view_stack.pop();
        self.message = None;
        if let Some(view) = self.view_stack.last_mut() {
          view.on_resume();
        }
      }
    }
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn warning(&self) -> Option<String> {
    self.view_stack.last().and_then(|v| v.warning())
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
