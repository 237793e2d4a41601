use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::controller::{FilterFamily, QuickFilter, ScalarUpdate};
use crate::models::{EmploymentKind, JobPosting, WorkMode};
use crate::query::ListingView;
use crate::session::{FilterSection, Session, ViewMode};
use crate::truncate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Listings,
    Sidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Search,
    SalaryMin,
    SalaryMax,
}

impl Input {
    fn prompt(self) -> &'static str {
        match self {
            Input::Search => "Search",
            Input::SalaryMin => "Minimum (BGN/month)",
            Input::SalaryMax => "Maximum (BGN/month)",
        }
    }
}

/// One selectable line of the filter sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SidebarRow {
    Header(FilterSection),
    Kind(EmploymentKind),
    Mode(WorkMode),
    Location(String),
    Category(String),
    SalaryMin,
    SalaryMax,
    Paid,
    Featured,
    Quick(QuickFilter),
}

struct AppState {
    session: Session,
    view: ListingView,
    selected: usize,
    scroll_offset: u16,
    focus: Focus,
    sidebar_cursor: usize,
    input: Option<(Input, String)>,
    status: Option<String>,
    locations: Vec<String>,
    categories: Vec<String>,
}

impl AppState {
    fn new(mut session: Session) -> Self {
        let view = session.view();
        let locations = session.store().location_keys();
        let categories = session.store().categories();
        Self {
            session,
            view,
            selected: 0,
            scroll_offset: 0,
            focus: Focus::Listings,
            sidebar_cursor: 0,
            input: None,
            status: None,
            locations,
            categories,
        }
    }

    fn current_job(&self) -> Option<&JobPosting> {
        self.view.get(self.selected)
    }

    /// Re-reads the derived view after a state change and keeps the same
    /// posting selected when it is still visible.
    fn refresh(&mut self) {
        let previous = self.current_job().map(|j| j.id.clone());
        self.view = self.session.view();
        tracing::trace!(
            results = self.view.len(),
            recomputations = self.session.recomputations(),
            "refreshed view"
        );
        self.selected = previous
            .and_then(|id| self.view.position_of(&id))
            .unwrap_or(0);
        if self.selected >= self.view.len() {
            self.selected = self.view.len().saturating_sub(1);
        }
    }

    fn next(&mut self) {
        if !self.view.is_empty() && self.selected < self.view.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn sidebar_rows(&self) -> Vec<SidebarRow> {
        let mut rows = Vec::new();
        for section in FilterSection::ALL {
            rows.push(SidebarRow::Header(section));
            if !self.session.sections.is_expanded(section) {
                continue;
            }
            match section {
                FilterSection::JobType => {
                    rows.extend(EmploymentKind::ALL.into_iter().map(SidebarRow::Kind));
                }
                FilterSection::WorkType => {
                    rows.extend(WorkMode::ALL.into_iter().map(SidebarRow::Mode));
                }
                FilterSection::Location => {
                    rows.extend(self.locations.iter().cloned().map(SidebarRow::Location));
                }
                FilterSection::Category => {
                    rows.extend(self.categories.iter().cloned().map(SidebarRow::Category));
                }
                FilterSection::Salary => {
                    rows.push(SidebarRow::SalaryMin);
                    rows.push(SidebarRow::SalaryMax);
                }
                FilterSection::Other => {
                    rows.push(SidebarRow::Paid);
                    rows.push(SidebarRow::Featured);
                    rows.extend(QuickFilter::ALL.into_iter().map(SidebarRow::Quick));
                }
            }
        }
        rows
    }

    fn activate_sidebar_row(&mut self) {
        let rows = self.sidebar_rows();
        let Some(row) = rows.get(self.sidebar_cursor).cloned() else {
            return;
        };
        match row {
            SidebarRow::Header(section) => self.session.sections.toggle(section),
            SidebarRow::SalaryMin => self.start_input(Input::SalaryMin),
            SidebarRow::SalaryMax => self.start_input(Input::SalaryMax),
            row => {
                let ctl = &mut self.session.controller;
                match row {
                    SidebarRow::Kind(kind) => ctl.toggle(FilterFamily::EmploymentKind, kind.label()),
                    SidebarRow::Mode(mode) => ctl.toggle(FilterFamily::WorkMode, mode.label()),
                    SidebarRow::Location(loc) => ctl.toggle(FilterFamily::Location, &loc),
                    SidebarRow::Category(cat) => ctl.toggle(FilterFamily::Category, &cat),
                    SidebarRow::Paid => {
                        let paid = ctl.filters().is_paid == Some(true);
                        ctl.set_scalar(ScalarUpdate::IsPaid((!paid).then_some(true)));
                    }
                    SidebarRow::Featured => {
                        let featured = ctl.filters().featured_only;
                        ctl.set_scalar(ScalarUpdate::FeaturedOnly(!featured));
                    }
                    SidebarRow::Quick(quick) => ctl.apply_quick_filter(quick),
                    _ => {}
                }
            }
        }
        let len = self.sidebar_rows().len();
        if self.sidebar_cursor >= len {
            self.sidebar_cursor = len.saturating_sub(1);
        }
    }

    fn start_input(&mut self, input: Input) {
        let filters = self.session.controller.filters();
        let current = match input {
            Input::Search => filters.query.clone().unwrap_or_default(),
            Input::SalaryMin => filters.salary_min.map(|v| v.to_string()).unwrap_or_default(),
            Input::SalaryMax => filters.salary_max.map(|v| v.to_string()).unwrap_or_default(),
        };
        self.input = Some((input, current));
    }

    /// Commits the input buffer. An empty salary clears the bound; one that
    /// does not fit leaves it unchanged.
    fn finish_input(&mut self) {
        let Some((input, buffer)) = self.input.take() else {
            return;
        };
        if input == Input::Search {
            self.session.controller.set_text_query(&buffer);
            return;
        }

        let text = buffer.trim();
        let value = if text.is_empty() {
            None
        } else {
            match text.parse::<u32>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::debug!(input = text, error = %e, "rejected salary bound");
                    self.status = Some("Salary too large".to_string());
                    return;
                }
            }
        };
        let update = match input {
            Input::SalaryMin => ScalarUpdate::SalaryMin(value),
            _ => ScalarUpdate::SalaryMax(value),
        };
        self.session.controller.set_scalar(update);
    }

    /// Applies one key press. Returns false when the browser should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.input.is_some() {
            match code {
                KeyCode::Enter => self.finish_input(),
                KeyCode::Esc => self.input = None,
                code => {
                    if let Some((input, buffer)) = &mut self.input {
                        match code {
                            KeyCode::Backspace => {
                                buffer.pop();
                            }
                            KeyCode::Char(c) if *input == Input::Search || c.is_ascii_digit() => {
                                buffer.push(c);
                            }
                            _ => {}
                        }
                    }
                }
            }
            self.refresh();
            return true;
        }

        self.status = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Listings => Focus::Sidebar,
                    Focus::Sidebar => Focus::Listings,
                };
            }
            KeyCode::Char('/') => self.start_input(Input::Search),
            KeyCode::Char('o') => {
                let next = self.session.controller.sort_key().next();
                self.session.controller.set_sort_key(next);
            }
            KeyCode::Char('v') => self.session.view_mode = self.session.view_mode.toggled(),
            KeyCode::Char('c') => self.session.controller.clear_all(),
            KeyCode::Char('s') => {
                if let Some(id) = self.current_job().map(|j| j.id.clone()) {
                    let saved = self.session.toggle_save(&id);
                    self.status = Some(if saved { "Saved" } else { "Removed from saved" }.to_string());
                }
            }
            KeyCode::Char('a') => {
                if let Some(id) = self.current_job().map(|j| j.id.clone()) {
                    self.status = Some(self.session.apply(&id));
                }
            }
            KeyCode::Char('S') => {
                if let Some(id) = self.current_job().map(|j| j.id.clone()) {
                    self.status = Some(self.session.share(&id));
                }
            }
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => match self.focus {
                Focus::Listings => self.next(),
                Focus::Sidebar => {
                    if self.sidebar_cursor + 1 < self.sidebar_rows().len() {
                        self.sidebar_cursor += 1;
                    }
                }
            },
            KeyCode::Up | KeyCode::Char('k') => match self.focus {
                Focus::Listings => self.prev(),
                Focus::Sidebar => self.sidebar_cursor = self.sidebar_cursor.saturating_sub(1),
            },
            KeyCode::Enter | KeyCode::Char(' ') if self.focus == Focus::Sidebar => {
                self.activate_sidebar_row();
            }
            _ => {}
        }
        self.refresh();
        true
    }
}

pub fn run_browse(session: Session) -> Result<()> {
    let mut state = AppState::new(session);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()> {
    let mut list_state = ListState::default();
    let mut sidebar_state = ListState::default();

    loop {
        list_state.select((!state.view.is_empty()).then_some(state.selected));
        sidebar_state.select(Some(state.sidebar_cursor));
        terminal.draw(|frame| draw(frame, state, &mut list_state, &mut sidebar_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !state.handle_key(key.code) {
                break;
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState, sidebar_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    frame.render_widget(Paragraph::new(summary_line(state)), rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(24),
            Constraint::Percentage(34),
            Constraint::Percentage(42),
        ])
        .split(rows[1]);

    draw_sidebar(frame, state, columns[0], sidebar_state);
    draw_listings(frame, state, columns[1], list_state);

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, columns[2]);

    frame.render_widget(footer(state), rows[2]);
}

fn summary_line(state: &AppState) -> Line<'static> {
    let filters = state.session.controller.filters();
    let mut text = format!(" {} jobs found", state.view.len());
    if !filters.is_empty() {
        text.push_str(" with current filters");
    }
    text.push_str(&format!("  |  Sort: {}", state.session.controller.sort_key()));
    if !state.session.saved.is_empty() {
        text.push_str(&format!("  |  Saved: {}", state.session.saved.len()));
    }
    if let Some(q) = &filters.query {
        text.push_str(&format!("  |  Search: \"{}\"", q));
    }
    Line::from(Span::styled(text, Style::default().add_modifier(Modifier::BOLD)))
}

fn footer(state: &AppState) -> Paragraph<'static> {
    if let Some((input, buffer)) = &state.input {
        return Paragraph::new(format!(" {}: {}_  (Enter apply, Esc cancel)", input.prompt(), buffer))
            .style(Style::default().fg(Color::Yellow));
    }
    if let Some(status) = &state.status {
        return Paragraph::new(format!(" {}", status)).style(Style::default().fg(Color::Green));
    }
    Paragraph::new(
        " j/k:navigate  Tab:filters  space:toggle  /:search  o:sort  v:view  s:save  a:apply  S:share  c:clear  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray))
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

fn sidebar_label(state: &AppState, row: &SidebarRow) -> Line<'static> {
    let filters = state.session.controller.filters();
    let text = match row {
        SidebarRow::Header(section) => {
            let arrow = if state.session.sections.is_expanded(*section) { "v" } else { ">" };
            return Line::from(Span::styled(
                format!("{} {}", arrow, section.title()),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        SidebarRow::Kind(kind) => {
            format!("  {} {}", checkbox(filters.employment_kinds.contains(kind)), kind)
        }
        SidebarRow::Mode(mode) => format!("  {} {}", checkbox(filters.work_modes.contains(mode)), mode),
        SidebarRow::Location(loc) => format!("  {} {}", checkbox(filters.locations.contains(loc)), loc),
        SidebarRow::Category(cat) => format!("  {} {}", checkbox(filters.categories.contains(cat)), cat),
        SidebarRow::SalaryMin => format!(
            "  Min: {}",
            filters.salary_min.map_or("-".to_string(), |v| v.to_string())
        ),
        SidebarRow::SalaryMax => format!(
            "  Max: {}",
            filters.salary_max.map_or("-".to_string(), |v| v.to_string())
        ),
        SidebarRow::Paid => format!("  {} Paid only", checkbox(filters.is_paid == Some(true))),
        SidebarRow::Featured => format!("  {} Featured only", checkbox(filters.featured_only)),
        SidebarRow::Quick(quick) => format!("  * {}", quick.label()),
    };
    Line::from(text)
}

fn draw_sidebar(frame: &mut Frame, state: &AppState, area: Rect, sidebar_state: &mut ListState) {
    let items: Vec<ListItem> = state
        .sidebar_rows()
        .iter()
        .map(|row| ListItem::new(sidebar_label(state, row)))
        .collect();

    let count = state.session.controller.active_filter_count();
    let title = if count > 0 {
        format!(" Filters ({}) ", count)
    } else {
        " Filters ".to_string()
    };
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if state.focus == Focus::Sidebar {
        block = block.border_style(Style::default().fg(Color::Cyan));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    if state.focus == Focus::Sidebar {
        frame.render_stateful_widget(list, area, sidebar_state);
    } else {
        frame.render_widget(list, area);
    }
}

fn listing_item(state: &AppState, job: &JobPosting) -> ListItem<'static> {
    let saved = if state.session.is_saved(&job.id) { "*" } else { " " };
    let featured = if job.featured { "!" } else { " " };
    let title = truncate(&job.title, 34);
    match state.session.view_mode {
        ViewMode::List => ListItem::new(format!("{}{} {} | {}", saved, featured, title, job.company)),
        ViewMode::Grid => ListItem::new(vec![
            Line::from(Span::styled(
                format!("{}{} {}", saved, featured, title),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("   {} · {} · {}", job.company, job.location_key(), job.work_mode)),
            Line::from(Span::styled(
                format!("   {}", job.salary_display()),
                Style::default().fg(Color::Green),
            )),
        ]),
    }
}

fn draw_listings(frame: &mut Frame, state: &AppState, area: Rect, list_state: &mut ListState) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Jobs ({}) ", state.view.len()));
    if state.focus == Focus::Listings {
        block = block.border_style(Style::default().fg(Color::Cyan));
    }

    if state.view.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No jobs found", Style::default().add_modifier(Modifier::BOLD))),
            Line::from("Try adjusting your filters or search criteria"),
            Line::from(""),
            Line::from(Span::styled(
                "Press c to clear all filters",
                Style::default().fg(Color::Yellow),
            )),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = state.view.iter().map(|job| listing_item(state, job)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, list_state);
}

fn build_detail(state: &AppState) -> Text<'static> {
    let Some(job) = state.current_job() else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    let mut title = vec![Span::styled(
        job.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if job.verified {
        title.push(Span::styled(" (verified)", Style::default().fg(Color::Cyan)));
    }
    if job.featured {
        title.push(Span::styled(" FEATURED", Style::default().fg(Color::Yellow)));
    }
    lines.push(Line::from(title));

    let logo = match &job.company_logo {
        Some(_) => String::new(),
        None => format!("[{}] ", job.company_initial()),
    };
    lines.push(Line::from(format!("{}at {}", logo, job.company)));
    lines.push(Line::from(format!("Location: {}", job.location)));

    let kind_style = match job.employment_kind {
        EmploymentKind::Internship => Style::default().fg(Color::Blue),
        EmploymentKind::EntryLevel => Style::default().fg(Color::Green),
        EmploymentKind::GraduateProgram => Style::default().fg(Color::Magenta),
    };
    lines.push(Line::from(vec![
        Span::styled(job.employment_kind.to_string(), kind_style),
        Span::raw(format!("  ·  {}  ·  {}", job.work_mode, job.category)),
    ]));

    lines.push(Line::from(Span::styled(
        format!("Salary: {}", job.salary_display()),
        Style::default().fg(Color::Green),
    )));

    lines.push(Line::from(format!(
        "Posted {}  ·  {} applicants",
        job.posted_ago(chrono::Utc::now()),
        job.applicant_count
    )));
    if let Some(deadline) = &job.deadline {
        lines.push(Line::from(format!("Deadline: {}", deadline)));
    }
    if state.session.is_saved(&job.id) {
        lines.push(Line::from(Span::styled("Saved", Style::default().fg(Color::Yellow))));
    }

    if !job.tags.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Tags: {}", job.tags_display()),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.push(Line::from(""));
    for line in textwrap::fill(&job.description, 60).lines() {
        lines.push(Line::from(line.to_string()));
    }

    for (heading, items) in [("Requirements", &job.requirements), ("Benefits", &job.benefits)] {
        if items.is_empty() {
            continue;
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for item in items {
            lines.push(Line::from(format!("  - {}", item)));
        }
    }

    if let Some(company) = state.session.store().company_for(job) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("About {}", company.name),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!(
            "  {} · {} employees · {} open positions",
            company.industry, company.size, company.open_positions
        )));
        for line in textwrap::fill(&company.description, 58).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}
