use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use formaliza::editor::BatchEditor;
use formaliza::engine::{AggregateBundle, CrossFilterEngine, FilterState};
use formaliza::export::export_csv;
use formaliza::loader::Collection;
use formaliza::record::{display_value, Record, COL_STATUS};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use serde_json::json;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Records,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::Records,
            Page::Records => Page::Overview,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::Records => "Records",
        }
    }
}

/// Why the UI loop handed control back to the caller. Reload and Flush need
/// the async runtime, so they run outside the drawing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    Reload,
    Flush,
}

pub struct App<'a> {
    engine: &'a CrossFilterEngine,
    pub editor: &'a mut BatchEditor,
    records: Vec<Record>,
    loaded_at: DateTime<Utc>,
    pub filter: FilterState,
    filtered: Vec<Record>,
    aggregates: AggregateBundle,
    pub current_page: Page,
    table_state: TableState,
    ranking_state: TableState,
    show_detail: bool,
    search_mode: bool,
    notice: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(
        engine: &'a CrossFilterEngine,
        editor: &'a mut BatchEditor,
        collection: Collection,
        filter: FilterState,
        notice: Option<String>,
    ) -> Self {
        let (filtered, aggregates) = engine.apply(&collection.records, &filter);

        let mut table_state = TableState::default();
        if !filtered.is_empty() {
            table_state.select(Some(0));
        }
        let mut ranking_state = TableState::default();
        if !aggregates.region_ranking.is_empty() {
            ranking_state.select(Some(0));
        }

        Self {
            engine,
            editor,
            records: collection.records,
            loaded_at: collection.loaded_at,
            filter,
            filtered,
            aggregates,
            current_page: Page::Overview,
            table_state,
            ranking_state,
            show_detail: false,
            search_mode: false,
            notice,
        }
    }

    /// Re-run the cross-filter pass. Called after every filter-state change.
    fn refresh(&mut self) {
        let (filtered, aggregates) = self.engine.apply(&self.records, &self.filter);
        self.filtered = filtered;
        self.aggregates = aggregates;
        clamp_selection(&mut self.table_state, self.filtered.len());
        clamp_selection(&mut self.ranking_state, self.aggregates.region_ranking.len());
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.table_state.selected().and_then(|i| self.filtered.get(i))
    }

    fn cycle_year(&mut self) {
        self.filter.year = cycle_option(&self.filter.year, &self.aggregates.year_options);
        self.refresh();
    }

    fn cycle_status(&mut self) {
        self.filter.status = cycle_option(&self.filter.status, &self.aggregates.status_options);
        self.refresh();
    }

    /// Toggle the region currently highlighted in the ranking list, the TUI
    /// stand-in for clicking a state on the choropleth map.
    fn toggle_ranking_region(&mut self) {
        let Some(entry) = self
            .ranking_state
            .selected()
            .and_then(|i| self.aggregates.region_ranking.get(i))
        else {
            return;
        };
        let region = entry.region.clone();
        self.filter.region = match &self.filter.region {
            Some(current) if *current == region => None,
            _ => Some(region),
        };
        self.refresh();
    }

    fn clear_filters(&mut self) {
        self.filter.clear();
        self.refresh();
    }

    fn push_search(&mut self, c: char) {
        self.filter.search.push(c);
        self.refresh();
    }

    fn pop_search(&mut self) {
        self.filter.search.pop();
        self.refresh();
    }

    /// Stage a status edit on the selected record, cycling through the known
    /// status options. Nothing touches the canonical collection here; the
    /// change lands only after a flush and reload.
    fn stage_status_edit(&mut self) {
        let options = self.aggregates.status_options.clone();
        if options.is_empty() {
            return;
        }
        let Some(record) = self.selected_record() else {
            self.notice = Some("No record selected".to_string());
            return;
        };
        let id = record.id;
        let current = self
            .editor
            .staged(id, COL_STATUS)
            .map(display_value)
            .unwrap_or_else(|| record.status.clone());

        let next = match options.iter().position(|o| *o == current) {
            Some(i) => options[(i + 1) % options.len()].clone(),
            None => options[0].clone(),
        };
        self.editor.stage_edit(id, COL_STATUS, json!(next));
        self.notice = Some(format!(
            "Staged {} -> {} ({} pending)",
            id,
            next,
            self.editor.pending_count()
        ));
    }

    fn discard_edits(&mut self) {
        let n = self.editor.pending_count();
        self.editor.discard();
        self.notice = Some(format!("Discarded {} staged edits", n));
    }

    fn export_filtered(&mut self) {
        let path = PathBuf::from(format!(
            "formaliza_{}.csv",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        self.notice = Some(match export_csv(&self.filtered, &path) {
            Ok(n) => format!("Exported {} records to {}", n, path.display()),
            Err(e) => format!("Export failed: {}", e),
        });
    }

    fn active_list_len(&self) -> usize {
        match self.current_page {
            Page::Overview => self.aggregates.region_ranking.len(),
            Page::Records => self.filtered.len(),
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Overview => &mut self.ranking_state,
            Page::Records => &mut self.table_state,
        }
    }

    fn next(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    fn previous(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    fn page_down(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        state.select(Some(i));
    }

    fn page_up(&mut self) {
        let state = self.active_state();
        let i = state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        state.select(Some(i));
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        let i = state.selected().unwrap_or(0).min(len - 1);
        state.select(Some(i));
    }
}

/// None -> first option -> ... -> last option -> None.
fn cycle_option(current: &Option<String>, options: &[String]) -> Option<String> {
    match current {
        None => options.first().cloned(),
        Some(value) => match options.iter().position(|o| o == value) {
            Some(i) if i + 1 < options.len() => Some(options[i + 1].clone()),
            _ => None,
        },
    }
}

pub fn run_ui(app: &mut App) -> Result<UiExit> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(res?)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<UiExit> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if app.search_mode {
                match key.code {
                    KeyCode::Esc | KeyCode::Enter => app.search_mode = false,
                    KeyCode::Backspace => app.pop_search(),
                    KeyCode::Char(c) => app.push_search(c),
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(UiExit::Quit),
                KeyCode::Char('r') => return Ok(UiExit::Reload),
                KeyCode::Char('w') => {
                    if app.editor.is_empty() {
                        app.notice = Some("Nothing staged".to_string());
                    } else {
                        return Ok(UiExit::Flush);
                    }
                }
                KeyCode::Char('/') => app.search_mode = true,
                KeyCode::Tab | KeyCode::BackTab => {
                    app.current_page = app.current_page.next();
                }
                KeyCode::Char('y') => app.cycle_year(),
                KeyCode::Char('s') => app.cycle_status(),
                KeyCode::Char('c') => app.clear_filters(),
                KeyCode::Char('x') => app.export_filtered(),
                KeyCode::Char('e') if app.current_page == Page::Records => {
                    app.stage_status_edit()
                }
                KeyCode::Char('u') => app.discard_edits(),
                KeyCode::Enter => match app.current_page {
                    Page::Overview => app.toggle_ranking_region(),
                    Page::Records => app.show_detail = !app.show_detail,
                },
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => {
                    if app.active_list_len() > 0 {
                        app.active_state().select(Some(0));
                    }
                }
                KeyCode::End => {
                    let len = app.active_list_len();
                    if len > 0 {
                        app.active_state().select(Some(len - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Overview => render_overview(f, chunks[1], app),
        Page::Records => {
            if app.show_detail {
                let content_chunks = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                    .split(chunks[1]);
                render_records_table(f, content_chunks[0], app);
                render_detail_panel(f, content_chunks[1], app);
            } else {
                render_records_table(f, chunks[1], app);
            }
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Overview, Page::Records];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("{} / {} registros", app.aggregates.count, app.records.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format_brl(app.aggregates.total_value),
        Style::default().fg(Color::Green),
    ));

    if app.editor.pending_count() > 0 {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("{} edits staged", app.editor.pending_count()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    if app.search_mode || !app.filter.search.is_empty() {
        let cursor = if app.search_mode { "_" } else { "" };
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("busca: {}{}", app.filter.search, cursor),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" FORMALIZA BI "),
    );

    f.render_widget(header, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    render_kpis(f, rows[0], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    render_ranking(f, columns[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);

    render_status_distribution(f, right[0], app);
    render_trend(f, right[1], app);
}

fn render_kpis(f: &mut Frame, area: Rect, app: &App) {
    let agg = &app.aggregates;
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ])
        .split(area);

    let kpis: [(&str, String, Color); 5] = [
        ("Volume Repasse", format_brl(agg.total_value), Color::Green),
        ("Propostas", agg.count.to_string(), Color::Cyan),
        ("Ticket Médio", format_brl(agg.average_value), Color::Blue),
        (
            "Índice Entrega",
            format!("{:.1}%", agg.completion_rate),
            Color::Magenta,
        ),
        (
            "Abrangência",
            format!("{} UFs", agg.region_ranking.len()),
            Color::Yellow,
        ),
    ];

    for (i, (title, value, color)) in kpis.iter().enumerate() {
        let card = Paragraph::new(vec![Line::from(Span::styled(
            value.clone(),
            Style::default().fg(*color).add_modifier(Modifier::BOLD),
        ))])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        );
        f.render_widget(card, cells[i]);
    }
}

fn render_ranking(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(["#", "UF", "Registros", ""].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let max = app.aggregates.max_region_count;
    let rows = app
        .aggregates
        .region_ranking
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let active = app.filter.region.as_deref() == Some(entry.region.as_str());
            let bar_len = if max > 0 { entry.count * 20 / max } else { 0 };
            let style = if active {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{:02}", i + 1)),
                Cell::from(entry.region.clone()).style(style),
                Cell::from(entry.count.to_string()),
                Cell::from("█".repeat(bar_len.max(1))).style(Style::default().fg(Color::Blue)),
            ])
            .height(1)
        });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Performance Regional (Enter filtra) "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.ranking_state);
}

fn render_status_distribution(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(["Situação", "Registros"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.aggregates.status_distribution.iter().map(|entry| {
        let active = app.filter.status.as_deref() == Some(entry.status.as_str());
        let style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(truncate(&entry.status, 28)).style(style),
            Cell::from(entry.count.to_string()),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(10)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Status Processual (s alterna) "),
        );

    f.render_widget(table, area);
}

fn render_trend(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(["Ano", "Volume"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.aggregates.yearly_trend.iter().map(|entry| {
        Row::new(vec![
            Cell::from(entry.year.clone()),
            Cell::from(format_brl(entry.total)).style(Style::default().fg(Color::Green)),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Length(8), Constraint::Min(14)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Tendência Anual (y alterna) "),
        );

    f.render_widget(table, area);
}

fn render_records_table(f: &mut Frame, area: Rect, app: &mut App) {
    if app.filtered.is_empty() {
        // Explicit empty state, distinct from the loading screen.
        let empty = Paragraph::new("Nenhum registro encontrado para os filtros")
            .style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )
            .block(Block::default().borders(Borders::ALL).title(" Registros "));
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["Processo", "Entidade", "UF", "Ano", "Repasse", "Situação"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered.iter().map(|record| {
        let staged = app.editor.staged(record.id, COL_STATUS).map(display_value);
        let (status_text, status_style) = match staged {
            Some(value) => (
                format!("{}*", value),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            None => (record.status.clone(), Style::default().fg(Color::Cyan)),
        };

        Row::new(vec![
            Cell::from(truncate(&record.process_number, 22)),
            Cell::from(truncate(&record.entity, 34)),
            Cell::from(record.region.clone()),
            Cell::from(record.year.clone()),
            Cell::from(format_brl(record.transfer_value))
                .style(Style::default().fg(Color::Green)),
            Cell::from(status_text).style(status_style),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(36),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Min(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Registros "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();

    if let Some(record) = app.selected_record() {
        let mut field = |label: &str, value: String| {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<12}", label), Style::default().fg(Color::Yellow)),
                Span::raw(value),
            ]));
        };

        field("Processo", record.process_number.clone());
        field("Entidade", record.entity.clone());
        field("UF", record.region.clone());
        field("Ano", record.year.clone());
        field("Situação", record.status.clone());
        field("Repasse", format_brl(record.transfer_value));
        field("Id", record.id.to_string());

        if !record.extra.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Demais campos",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            let mut extras: Vec<(&String, String)> = record
                .extra
                .iter()
                .map(|(k, v)| (k, display_value(v)))
                .collect();
            extras.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in extras {
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", key), Style::default().fg(Color::DarkGray)),
                    Span::raw(truncate(&value, 40)),
                ]));
            }
        }
    } else {
        lines.push(Line::from("No record selected"));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Detalhe (Enter fecha) "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.table_state.selected().map(|i| i + 1).unwrap_or(0);

    let mut spans = vec![Span::styled(
        format!(" {}/{} ", selected, app.filtered.len()),
        Style::default().fg(Color::Cyan),
    )];

    if app.filter.is_active() {
        spans.push(Span::raw("| "));
        spans.push(Span::styled(
            app.filter.describe(),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::raw(" ("));
        spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(" limpa) "));
    }

    if let Some(notice) = &app.notice {
        spans.push(Span::raw("| "));
        spans.push(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Magenta),
        ));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::raw("| "));
    for (key, action) in [
        ("/", "busca"),
        ("y", "ano"),
        ("s", "status"),
        ("e", "edita"),
        ("w", "salva"),
        ("x", "exporta"),
        ("r", "recarrega"),
        ("q", "sai"),
    ] {
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {} | ", action)));
    }

    spans.push(Span::styled(
        format!("sync {}", app.loaded_at.format("%H:%M:%S")),
        Style::default().fg(Color::DarkGray),
    ));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// R$ value with Brazilian thousand grouping, no decimals.
fn format_brl(value: f64) -> String {
    let whole = value.round().max(0.0) as u64;
    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("R$ {}", grouped)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_option_walks_and_wraps_to_none() {
        let options = vec!["2023".to_string(), "2024".to_string()];
        let a = cycle_option(&None, &options);
        assert_eq!(a.as_deref(), Some("2023"));
        let b = cycle_option(&a, &options);
        assert_eq!(b.as_deref(), Some("2024"));
        assert_eq!(cycle_option(&b, &options), None);
    }

    #[test]
    fn test_format_brl_grouping() {
        assert_eq!(format_brl(0.0), "R$ 0");
        assert_eq!(format_brl(950.4), "R$ 950");
        assert_eq!(format_brl(1500000.0), "R$ 1.500.000");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("CONCLUÍDO", 20), "CONCLUÍDO");
        assert_eq!(truncate("FORMALIZAÇÃO LONGA DEMAIS", 10), "FORMALI...");
    }
}
