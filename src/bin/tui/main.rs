mod app;

use std::io;
use std::time::{Duration, Instant};

use app::{
    format_pct, format_ps, format_usd, share_bar, truncate, AppState, CategoryTvlResponse, ConnectionStatus,
    ProtocolResponse, EMPTY_RESULT_MESSAGE,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(if app.protocols.is_empty() { None } else { Some(0) });

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(30);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = refresh_interval.checked_sub(last_tick.elapsed()).unwrap_or(Duration::ZERO);

        let mut refetch = false;
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => refetch = true,
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.protocols.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        KeyCode::Char('c') => {
                            app.cycle_category();
                            refetch = true;
                        }
                        KeyCode::Char('h') => {
                            app.cycle_chain();
                            refetch = true;
                        }
                        KeyCode::Char('t') => {
                            app.selection.cycle_tvl();
                            refetch = true;
                        }
                        KeyCode::Char('s') => {
                            app.cycle_sort();
                            refetch = true;
                        }
                        KeyCode::Char('o') => {
                            app.selection.toggle_order();
                            refetch = true;
                        }
                        KeyCode::Char('x') => {
                            app.clear_filters();
                            refetch = true;
                        }
                        _ => {}
                    }
                }
            }
        }

        if refetch || last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = Instant::now();
            clamp_selection(table_state, app.protocols.len());
        }
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        state.select(Some(state.selected().map_or(0, |i| i.min(len - 1))));
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let notice_height = if app.summary.notices.is_empty() { 0 } else { 1 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),             // header
            Constraint::Length(notice_height), // notices
            Constraint::Min(0),                // body
            Constraint::Length(1),             // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_notices(f, app, chunks[1]);
    render_body(f, app, table_state, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };
    let source_color = if app.summary.data_source == "live" { Color::Green } else { Color::Yellow };
    let sep = || Span::raw("  │  ");
    let kpi = |s: String| Span::styled(s, Style::default().fg(Color::White));

    let kpis = Line::from(vec![
        Span::styled(" DeFi Venture Scout  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(status_text, Style::default().fg(status_color)),
        sep(),
        Span::styled(format!("{} data", app.summary.data_source), Style::default().fg(source_color)),
        sep(),
        kpi(format!("{}/{} protocols", app.summary.protocols_scanned, app.summary.total_protocols)),
        sep(),
        kpi(format!("median P/S {:.2}x", app.summary.sector_median_ps)),
        sep(),
        kpi(format!("24h rev {}", format_usd(app.summary.total_revenue_24h))),
        sep(),
        Span::styled(
            format!("top pick: {}", app.summary.top_pick.as_deref().unwrap_or("none")),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let sel = &app.selection;
    let mut filter_spans = vec![
        Span::styled(" filters  ", Style::default().fg(Color::DarkGray)),
        kpi(format!("category={}", sel.category.as_deref().unwrap_or("all"))),
        sep(),
        kpi(format!("chain={}", sel.chain.as_deref().unwrap_or("all"))),
        sep(),
        kpi(format!("min tvl={}", format_usd(sel.min_tvl()))),
        sep(),
        kpi(format!("sort={} {}", sel.sort_key, if sel.descending { "desc" } else { "asc" })),
    ];
    if let Some(desc) = app.category_description() {
        filter_spans.push(sep());
        filter_spans.push(Span::styled(truncate(desc, 60), Style::default().fg(Color::DarkGray)));
    }

    let paragraph = Paragraph::new(vec![kpis, Line::from(filter_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(paragraph, area);
}

fn render_notices(f: &mut Frame, app: &AppState, area: Rect) {
    if app.summary.notices.is_empty() {
        return;
    }
    let text = format!(" ⚠ {}", app.summary.notices.join(" | "));
    f.render_widget(Paragraph::new(text).style(Style::default().fg(Color::Yellow)), area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    if app.protocols.is_empty() && app.status == ConnectionStatus::Connected {
        let warning = Paragraph::new(EMPTY_RESULT_MESSAGE)
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: true })
            .block(panel(" PROTOCOLS "));
        f.render_widget(warning, area);
        return;
    }

    let composition_height = app.composition.len().min(8) as u16 + 2;
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(composition_height)])
        .split(halves[1]);

    render_protocol_table(f, app, table_state, halves[0]);
    let selected = table_state.selected().and_then(|i| app.protocols.get(i));
    render_detail(f, selected, right[0]);
    render_composition(f, &app.composition, right[1]);
}

fn render_protocol_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Protocol", "Category", "Score", "TVL", "Ann. Rev", "P/S", "Upside"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .protocols
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let upside_color = if p.upside_potential > 0.0 { Color::Green } else { Color::Red };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&p.name, 22)),
                Cell::from(truncate(p.category.as_deref().unwrap_or("-"), 12)),
                Cell::from(format!("{:.1}", p.venture_score)).style(Style::default().fg(score_color(p.venture_score))),
                Cell::from(format_usd(p.tvl)),
                Cell::from(format_usd(p.annualized_revenue)),
                Cell::from(format_ps(p.ps_ratio)),
                Cell::from(format_pct(p.upside_potential)).style(Style::default().fg(upside_color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(panel(" PROTOCOLS "))
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn render_detail(f: &mut Frame, protocol: Option<&ProtocolResponse>, area: Rect) {
    let Some(p) = protocol else {
        f.render_widget(Paragraph::new(" select a protocol with j/k").block(panel(" DETAIL ")), area);
        return;
    };

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {label:<16}"), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };

    let lines = vec![
        Line::from(Span::styled(
            format!(" {} ({})", p.name, p.symbol),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        field("category", p.category.clone().unwrap_or_else(|| "-".to_string())),
        field("chain", p.primary_chain.clone()),
        Line::raw(""),
        field("TVL", format_usd(p.tvl)),
        field("market cap", format_usd(p.mcap)),
        field("revenue 24h", format_usd(p.total24h)),
        field("revenue 7d", format_usd(p.total7d)),
        field("revenue 30d", format_usd(p.total30d)),
        field("7d daily avg", format_usd(p.daily_avg_7d)),
        field("annualized", format_usd(p.annualized_revenue)),
        field("P/S", format_ps(p.ps_ratio)),
        field("fair value", format_usd(p.fair_value)),
        field("upside", format_pct(p.upside_potential)),
        field("TVL / mcap", format!("{:.2}", p.tvl_mcap_ratio)),
        field("trend", format!("{} ({})", format_pct(p.revenue_trend), p.revenue_trend_status)),
        Line::raw(""),
        field("valuation", format!("{:.1} / 40", p.valuation_score)),
        field("trend score", format!("{:.1} / 30", p.trend_score)),
        field("efficiency", format!("{:.1} / 30", p.efficiency_score)),
        Line::from(vec![
            Span::styled(format!(" {:<16}", "venture score"), Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{:.1}", p.venture_score),
                Style::default().fg(score_color(p.venture_score)).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(lines).block(panel(" DETAIL ")), area);
}

/// TVL by category, largest first.
fn render_composition(f: &mut Frame, slices: &[CategoryTvlResponse], area: Rect) {
    let lines: Vec<Line> = slices
        .iter()
        .take(8)
        .map(|c| {
            Line::from(vec![
                Span::raw(format!(" {:<14}", truncate(&c.category, 14))),
                Span::styled(format!("{:>10} ", format_usd(c.tvl)), Style::default().fg(Color::White)),
                Span::styled(format!("{:>5.1}% ", c.share_pct), Style::default().fg(Color::DarkGray)),
                Span::styled(share_bar(c.share_pct, 12), Style::default().fg(Color::Cyan)),
                Span::styled(format!(" {}", c.protocols), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(panel(" TVL BY CATEGORY ")), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let line = Line::from(vec![
        key(" [q] "),
        Span::raw("quit  "),
        key("[r] "),
        Span::raw("refresh  "),
        key("[↑↓ / j k] "),
        Span::raw("scroll  "),
        key("[c] "),
        Span::raw("category  "),
        key("[h] "),
        Span::raw("chain  "),
        key("[t] "),
        Span::raw("min tvl  "),
        key("[s] "),
        Span::raw("sort  "),
        key("[o] "),
        Span::raw("order  "),
        key("[x] "),
        Span::raw("clear  "),
        Span::styled("auto-refresh: 30s", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(line).style(Style::default().fg(Color::White)), area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn panel(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
}

fn score_color(score: f64) -> Color {
    if score >= 70.0 {
        Color::Green
    } else if score >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}
