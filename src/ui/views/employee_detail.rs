use crate::api::types::{Employee, EmployeeStatus};
use crate::api::CachedHrClient;
use crate::query::{Query, QueryStatus};
use crate::ui::renderfns::status_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Detail view for a single employee, with a status change action
pub struct EmployeeDetailView {
  employee: Employee,
  client: CachedHrClient,
  update: Query<Employee>,
  /// Status requested by the latest update
  requested: Option<EmployeeStatus>,
}

impl EmployeeDetailView {
  pub fn new(employee: Employee, client: CachedHrClient) -> Self {
    Self {
      employee,
      client,
      update: Query::new(),
      requested: None,
    }
  }

  /// Move the employee to `status`. A second request while one is in flight
  /// supersedes it.
  fn change_status(&mut self, status: EmployeeStatus) {
    let client = self.client.clone();
    let id = self.employee.id;
    self.requested = Some(status);
    self
      .update
      .spawn(move || async move { client.update_employee_status(id, status).await });
  }

  fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
      Span::styled(format!("{:<12}", label), Style::default().fg(Color::DarkGray)),
      Span::raw(value),
    ])
  }

  fn status_line(&self) -> Line<'static> {
    match (self.update.status(), self.requested) {
      (QueryStatus::Pending, Some(status)) => Line::styled(
        format!("Saving status \"{}\"...", status.label()),
        Style::default().fg(Color::Yellow),
      ),
      (QueryStatus::Error, _) => Line::styled(
        format!(
          "Update failed: {}. Press 's' to retry.",
          self.update.error().unwrap_or_default()
        ),
        Style::default().fg(Color::Red),
      ),
      (QueryStatus::Success, _) => {
        Line::styled("Saved.", Style::default().fg(Color::Green))
      }
      _ => Line::default(),
    }
  }
}

impl View for EmployeeDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('s') => {
        // Retry the failed target rather than skipping past it
        let next = match (self.update.status(), self.requested) {
          (QueryStatus::Error, Some(status)) => status,
          (QueryStatus::Pending, Some(status)) => status.cycle(),
          _ => self.employee.status.cycle(),
        };
        self.change_status(next);
      }
      KeyCode::Char('a') => self.change_status(EmployeeStatus::Active),
      KeyCode::Char('l') => self.change_status(EmployeeStatus::OnLeave),
      KeyCode::Char('t') => self.change_status(EmployeeStatus::Terminated),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let employee = &self.employee;
    let block = Block::default()
      .title(format!(" {} ", employee.name))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let lines = vec![
      Self::field("Id", employee.id.to_string()),
      Self::field("Email", employee.email.clone()),
      Self::field("Title", employee.title.clone().unwrap_or_default()),
      Self::field("Department", employee.department.clone().unwrap_or_default()),
      Self::field(
        "Hired",
        employee
          .hired_on
          .map(|d| d.format("%Y-%m-%d").to_string())
          .unwrap_or_default(),
      ),
      Line::from(vec![
        Span::styled(format!("{:<12}", "Status"), Style::default().fg(Color::DarkGray)),
        Span::styled(
          employee.status.label(),
          Style::default().fg(status_color(employee.status)).bold(),
        ),
      ]),
      Line::default(),
      self.status_line(),
    ];

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.employee.name.clone()
  }

  fn tick(&mut self) {
    if self.update.poll() && self.update.status() == QueryStatus::Success {
      if let Some(updated) = self.update.data() {
        self.employee = updated;
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("s", "next status").with_priority(10),
      ShortcutInfo::new("a", "active").with_priority(20),
      ShortcutInfo::new("l", "on leave").with_priority(30),
      ShortcutInfo::new("t", "terminate").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
