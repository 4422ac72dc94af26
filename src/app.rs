use crate::api::types::ActivateRequest;
use crate::api::Query;
use crate::cache::Subscription;
use crate::client::Api;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::view::{Access, View, ViewAction};
use crate::ui::views::{ActivateView, DashboardView, LoginView, PasswordResetView};
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

/// First screen, chosen from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartView {
  Dashboard,
  Activate(ActivateRequest),
  ChangePassword { token: String },
}

/// Main application state
pub struct App {
  api: Api,
  api_url: String,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Keeps the signed-in user cached for the whole session
  _user: Subscription,

  /// Tick counter, drives the loader spinner
  ticks: usize,

  should_quit: bool,
}

impl App {
  pub fn new(mut api: Api, api_url: String, start: StartView) -> Self {
    // Validates a persisted token, or signs the session out
    let user = api.subscribe(Query::FetchUserByToken);

    let root: Box<dyn View> = match start {
      StartView::Dashboard => Box::new(DashboardView::new(&mut api)),
      StartView::Activate(link) => Box::new(ActivateView::new(Some(link))),
      StartView::ChangePassword { token } => Box::new(PasswordResetView::change(token)),
    };

    Self {
      api,
      api_url,
      view_stack: vec![root],
      _user: user,
      ticks: 0,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));

    let result = self.main_loop(&mut terminal, &mut events).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop<B: Backend>(
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
    info!("quitting");
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('c') => {
          self.should_quit = true;
          return;
        }
        KeyCode::Char('l') if self.api.session().is_authenticated => {
          info!("logging out");
          self.api.logout();
          return;
        }
        _ => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key, &mut self.api),
      None => ViewAction::None,
    };
    self.apply(action);
    self.guard_route();
  }

  fn tick(&mut self) {
    self.ticks = self.ticks.wrapping_add(1);
    self.api.poll();

    let action = match self.view_stack.last_mut() {
      Some(view) => view.tick(&mut self.api),
      None => ViewAction::None,
    };
    self.apply(action);
    self.guard_route();
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Replace(view) => {
        debug!(view = %view.breadcrumb_label(), "replace");
        self.view_stack.clear();
        self.view_stack.push(view);
      }
    }
  }

  /// Send signed-out users away from private views and signed-in users
  /// away from guest-only ones. Nothing moves while the session is
  /// still being checked.
  fn guard_route(&mut self) {
    let session = self.api.session();
    let (fetching, authenticated) = (session.is_fetching, session.is_authenticated);
    if fetching {
      return;
    }
    let Some(access) = self.view_stack.last().map(|v| v.access()) else {
      return;
    };

    match access {
      Access::Private if !authenticated => {
        info!("not signed in, showing login");
        self.apply(ViewAction::Replace(Box::new(LoginView::new())));
      }
      Access::GuestOnly if authenticated => {
        info!("signed in, showing dashboard");
        let dashboard = DashboardView::new(&mut self.api);
        self.apply(ViewAction::Replace(Box::new(dashboard)));
      }
      _ => {}
    }
  }

  // Accessors for UI rendering

  pub fn api(&self) -> &Api {
    &self.api
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  pub fn ticks(&self) -> usize {
    self.ticks
  }

  /// Current view and the API it renders from
  pub fn current_view_mut(&mut self) -> (Option<&mut Box<dyn View>>, &Api) {
    (self.view_stack.last_mut(), &self.api)
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
