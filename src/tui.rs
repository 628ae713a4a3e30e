use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::CompanyRecord;
use crate::pipeline::Snapshot;

struct AppState<'a> {
    records: &'a [CompanyRecord],
    visible: Vec<usize>, // indices into `records` that pass the filter
    selected: usize,
    scroll_offset: u16,
    filter: String,
    filter_mode: bool,
    status: String,
}

impl<'a> AppState<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        let mut state = Self {
            records: &snapshot.records,
            visible: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            filter_mode: false,
            status: snapshot.freshness.to_string(),
        };
        state.apply_filter();
        state
    }

    fn current(&self) -> Option<&'a CompanyRecord> {
        let records: &'a [CompanyRecord] = self.records;
        self.visible.get(self.selected).and_then(|&i| records.get(i))
    }

    fn apply_filter(&mut self) {
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(&self.filter))
            .map(|(i, _)| i)
            .collect();
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn next(&mut self) {
        if !self.visible.is_empty() && self.selected < self.visible.len() - 1 {
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

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let code = key.code;
        // raw mode swallows SIGINT
        if code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        if self.filter_mode {
            match code {
                KeyCode::Enter => self.filter_mode = false,
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter.clear();
                    self.apply_filter();
                }
                KeyCode::Backspace => {
                    self.filter.pop();
                    self.apply_filter();
                }
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    self.apply_filter();
                }
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(),
            KeyCode::Char('/') => self.filter_mode = true,
            _ => {}
        }
        true
    }
}

pub fn run_browse(snapshot: &Snapshot) -> Result<()> {
    if snapshot.records.is_empty() {
        println!("No startups found ({}).", snapshot.freshness);
        return Ok(());
    }

    let mut state = AppState::new(snapshot);

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

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(if state.visible.is_empty() {
            None
        } else {
            Some(state.selected)
        });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !state.handle_key(key) {
                break;
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    // Left panel: company list
    let items: Vec<ListItem> = state
        .visible
        .iter()
        .map(|&i| {
            let record = &state.records[i];
            let stage = if record.funding_stage.is_empty() {
                "-"
            } else {
                record.funding_stage.as_str()
            };
            ListItem::new(format!("{} | {}", truncate(&record.name, 28), stage))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Startups ({}/{}) ",
            state.visible.len(),
            state.records.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: company detail
    let detail_width = chunks[1].width.saturating_sub(4).max(20) as usize;
    let detail_widget = Paragraph::new(build_detail(state, detail_width))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer: filter prompt or help
    let footer = if state.filter_mode {
        Paragraph::new(format!(" /{}_", state.filter)).style(Style::default().fg(Color::Yellow))
    } else {
        Paragraph::new(format!(
            " j/k:navigate  J/K:scroll  /:filter  q:quit  [{}]",
            state.status
        ))
        .style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(footer, rows[1]);
}

fn build_detail<'a>(state: &AppState<'a>, width: usize) -> Text<'a> {
    let Some(record) = state.current() else {
        return Text::raw("No company matches the filter");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        record.name.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if !record.tagline.is_empty() {
        lines.push(Line::from(Span::styled(
            record.tagline.as_str(),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(Line::from(""));

    let fields = [
        ("Stage", &record.funding_stage),
        ("Industry", &record.industry),
        ("Location", &record.location),
        ("Work type", &record.work_type),
        ("Team size", &record.team_size),
        ("Website", &record.website_url),
        ("Jobs", &record.jobs_url),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<10} ", label), Style::default().fg(Color::DarkGray)),
                Span::raw(value.as_str()),
            ]));
        }
    }

    if let Some(announcement) = &record.funding_announcement {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            announcement.as_str(),
            Style::default().fg(Color::Green),
        )));
    }

    if !record.description.is_empty() {
        lines.push(Line::from(""));
        for line in textwrap::wrap(&record.description, width) {
            lines.push(Line::from(line.into_owned()));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Fetched {}", record.last_fetched.format("%Y-%m-%d %H:%M UTC")),
        Style::default().fg(Color::DarkGray),
    )));

    Text::from(lines)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
