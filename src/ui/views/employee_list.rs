use crate::api::types::{Employee, EmployeeQuery, ListPrefs, Page};
use crate::api::CachedHrClient;
use crate::config::UiConfig;
use crate::debounce::Debounced;
use crate::persist::{Persisted, PersistedState};
use crate::query::{Query, QueryStatus};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::EmployeeDetailView;
use crate::virtual_list::VirtualListState;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::debug;

/// Key under which list filters and sort order are persisted
const PREFS_KEY: &str = "employee_list.prefs";

/// Searchable, filterable employee directory.
///
/// Rows are virtualized: only the visible window plus overscan is turned
/// into list items, however large the page.
pub struct EmployeeListView {
  client: CachedHrClient,
  query: Query<Page<Employee>>,
  prefs: Persisted<ListPrefs>,
  search: SearchInput,
  term: Debounced<String>,
  list: VirtualListState,
  overscan: usize,
  page_size: u32,
  /// Viewport rows at the last render, for paging
  rows: u16,
}

impl EmployeeListView {
  pub fn new(client: CachedHrClient, state: &PersistedState, ui: &UiConfig) -> Self {
    let mut view = Self {
      client,
      query: Query::new(),
      prefs: state.open(PREFS_KEY, ListPrefs::default()),
      search: SearchInput::new(),
      term: Debounced::new(String::new(), ui.debounce()),
      list: VirtualListState::default(),
      overscan: ui.overscan,
      page_size: ui.page_size,
      rows: 0,
    };
    view.fetch();
    view
  }

  /// Listing request for the settled search term and current prefs.
  fn current_request(&self) -> EmployeeQuery {
    EmployeeQuery::new(&self.term.settled(), &self.prefs.get(), self.page_size)
  }

  fn fetch(&mut self) {
    let request = self.current_request();
    debug!("fetching {}", request.cache_key().description());

    let client = self.client.clone();
    self
      .query
      .spawn(move || async move { client.list_employees(request).await });
  }

  fn total(&self) -> usize {
    self.query.with_data(|page| page.map_or(0, |p| p.items.len()))
  }

  fn selected_employee(&self) -> Option<Employee> {
    let idx = self.list.selected()?;
    self
      .query
      .with_data(|page| page.and_then(|p| p.items.get(idx).cloned()))
  }

  /// Refetch from the server, skipping any cached copy.
  fn refresh(&mut self) {
    self.client.invalidate_listing(&self.current_request());
    self.fetch();
  }

  fn title(&self, prefs: &ListPrefs) -> String {
    let filter = prefs.status.map_or("all", |s| s.label());
    // Show what is typed, marked until it settles
    let typed = self.term.source();
    let search = match typed.trim() {
      "" => String::new(),
      term if *typed == self.term.settled() => format!(" \"{}\"", truncate(term, 20)),
      term => format!(" \"{}\"…", truncate(term, 20)),
    };
    let count = if self.query.is_loading() {
      "loading...".to_string()
    } else if self.query.is_error() {
      "error".to_string()
    } else {
      self.query.with_data(|page| match page {
        Some(p) if p.total > p.items.len() as u64 => format!("{} of {}", p.items.len(), p.total),
        Some(p) => p.items.len().to_string(),
        None => String::new(),
      })
    };
    format!(
      " Employees [{} · {}]{} ({}) ",
      filter,
      prefs.sort.label(),
      search,
      count
    )
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let prefs = self.prefs.get();
    let block = Block::default()
      .title(self.title(&prefs))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let total = self.total();
    if total == 0 {
      let content = match self.query.status() {
        QueryStatus::Error => format!(
          "Failed to load employees: {}\nPress 'r' to retry.",
          self.query.error().unwrap_or_default()
        ),
        QueryStatus::Success => "No employees found.".to_string(),
        _ => String::new(),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    // Rows fetched earlier stay on screen under a failed refetch
    let area = if self.query.is_error() {
      let [list_area, error_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
      let message = format!(
        " Failed to load employees: {}. Press 'r' to retry.",
        self.query.error().unwrap_or_default()
      );
      frame.render_widget(
        Paragraph::new(message).style(Style::default().fg(Color::Red)),
        error_area,
      );
      list_area
    } else {
      area
    };

    self.rows = area.height.saturating_sub(2);
    self.list.clamp(total);
    self.list.scroll_to_selected(usize::from(self.rows));
    let window = self.list.window(total, self.rows, self.overscan);

    let items: Vec<ListItem> = self.query.with_data(|page| {
      let employees = page
        .and_then(|p| p.items.get(window.range()))
        .unwrap_or(&[]);
      employees.iter().map(employee_row).collect()
    });

    // ListState positions are relative to the materialized window
    let mut state = ListState::default()
      .with_offset(self.list.offset().saturating_sub(window.start_index))
      .with_selected(
        self
          .list
          .selected()
          .map(|i| i.saturating_sub(window.start_index)),
      );

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut state);
  }
}

fn employee_row(employee: &Employee) -> ListItem<'static> {
  let line = Line::from(vec![
    Span::styled(
      format!("{:<28}", truncate(&employee.name, 28)),
      Style::default().fg(Color::Cyan),
    ),
    Span::raw(" "),
    Span::styled(
      format!("{:<11}", employee.status.label()),
      Style::default().fg(status_color(employee.status)),
    ),
    Span::raw(" "),
    Span::styled(
      format!(
        "{:<18}",
        truncate(employee.department.as_deref().unwrap_or("-"), 18)
      ),
      Style::default().fg(Color::White),
    ),
    Span::raw(" "),
    Span::styled(
      truncate(&employee.email, 40),
      Style::default().fg(Color::DarkGray),
    ),
  ]);
  ListItem::new(line)
}

impl View for EmployeeListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let search component try to handle first
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.term.set(text);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let total = self.total();
    let page = usize::from(self.rows.max(1));
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list.select_next(total),
      KeyCode::Char('k') | KeyCode::Up => self.list.select_previous(total),
      KeyCode::Char('g') | KeyCode::Home => self.list.select_first(total),
      KeyCode::Char('G') | KeyCode::End => self.list.select_last(total),
      KeyCode::PageDown => self.list.page_down(total, page),
      KeyCode::PageUp => self.list.page_up(total, page),
      KeyCode::Char('f') => self.prefs.update(|p| p.cycle_status()),
      KeyCode::Char('o') => self.prefs.update(|p| p.sort = p.sort.cycle()),
      KeyCode::Char('x') => self.prefs.clear(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Enter => {
        if let Some(employee) = self.selected_employee() {
          return ViewAction::Push(Box::new(EmployeeDetailView::new(
            employee,
            self.client.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Employees".to_string()
  }

  fn tick(&mut self) {
    let term_settled = self.term.poll_changed();
    let prefs_changed = self.prefs.poll_changed();
    if term_settled || prefs_changed {
      self.list = VirtualListState::default();
      self.fetch();
    }
    self.query.poll();
    self.client.purge_expired();
  }

  fn resume(&mut self) {
    // A detail view may have changed records; cached listings were evicted
    // then, otherwise this is served from cache.
    self.fetch();
  }

  fn status_line(&self) -> Option<String> {
    Some(self.client.cache_status())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search").with_priority(10),
      ShortcutInfo::new("f", "status").with_priority(20),
      ShortcutInfo::new("o", "sort").with_priority(30),
      ShortcutInfo::new("x", "reset").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("enter", "open").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::EmployeeStatus;
  use crate::api::client::HrClient;
  use crate::cache::CacheLayer;
  use crate::config::Config;
  use crate::persist::MemoryStore;
  use ratatui::backend::TestBackend;
  use std::sync::Arc;
  use std::time::Duration;

  fn view() -> EmployeeListView {
    let config = Config::for_url("http://127.0.0.1:9".to_string());
    let client = CachedHrClient::new(&config).unwrap();
    let state = PersistedState::new(Arc::new(MemoryStore::new()));
    EmployeeListView::new(client, &state, &UiConfig::default())
  }

  fn ada_page() -> Page<Employee> {
    Page {
      items: vec![Employee {
        id: 1,
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        department: Some("Engineering".to_string()),
        title: None,
        status: EmployeeStatus::Active,
        hired_on: None,
      }],
      total: 1,
    }
  }

  /// Let spawned fetches reach the cache.
  async fn settle_tasks() {
    for _ in 0..5 {
      tokio::task::yield_now().await;
    }
  }

  fn screen(view: &mut EmployeeListView) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_rows_and_offers_retry() {
    let mut view = view();
    view.query.execute(|| async { Ok(ada_page()) }).await;
    assert!(!screen(&mut view).contains("Press 'r' to retry."));

    view
      .query
      .execute(|| async { Err("connection reset".to_string()) })
      .await;
    let text = screen(&mut view);
    assert!(text.contains("Ada Lovelace"));
    assert!(text.contains("Failed to load employees: connection reset"));
    assert!(text.contains("Press 'r' to retry."));
    assert!(text.contains("(error)"));
  }

  #[tokio::test]
  async fn test_refresh_bypasses_fresh_cache_entry() {
    let config = Config::for_url("http://127.0.0.1:9".to_string());
    let ui = UiConfig::default();
    let cache = CacheLayer::new();
    let key = EmployeeQuery::new("", &ListPrefs::default(), ui.page_size)
      .cache_key()
      .render();
    cache
      .get_or_produce(&key, || async { Ok(ada_page()) }, Duration::from_secs(600))
      .await
      .unwrap();

    let client = CachedHrClient::with_cache(
      HrClient::new(&config).unwrap(),
      cache.clone(),
      Duration::from_secs(600),
    );
    let state = PersistedState::new(Arc::new(MemoryStore::new()));
    let mut view = EmployeeListView::new(client, &state, &ui);
    settle_tasks().await;
    assert_eq!(cache.stats().hits, 1);

    view.handle_key(KeyEvent::from(KeyCode::Char('r')));
    settle_tasks().await;
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
  }

  #[tokio::test]
  async fn test_title_marks_unsettled_search() {
    let mut view = view();
    view.term.set("ada".to_string());
    assert!(view.title(&ListPrefs::default()).contains("\"ada\"…"));
  }
}
