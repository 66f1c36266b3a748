use std::error::Error;
use std::sync::mpsc::Receiver;

use chrono::Local;
use crossterm::event::{KeyEvent, KeyEventKind};
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::symbols;
use tui::text::{Span, Spans};
use tui::widgets::{
    Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem, Paragraph,
    Row, Table, Tabs, Wrap,
};
use tui::{Frame, Terminal};

use crate::app::{Action, App, ChartMode, MenuItem, MENU_TITLES};
use crate::error::DashboardError;
use crate::shaper::{AgeDistribution, Pyramid};

const SERIES_COLORS: [Color; 6] = [
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::LightRed,
    Color::LightBlue,
];

pub enum Event<I> {
    Input(I),
    Tick,
}

/// Draws and handles input until the user quits. Any error ends the loop and
/// is handed back so the caller can restore the terminal first.
pub fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &Receiver<Event<KeyEvent>>,
) -> Result<(), Box<dyn Error>> {
    terminal.clear()?;
    loop {
        terminal.draw(|rect| draw(rect, app))?;

        match rx.recv()? {
            Event::Input(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                match app.on_key(code) {
                    Action::Quit => return Ok(()),
                    Action::Export => app.export_current(Local::now().naive_local()),
                    Action::Continue => {}
                }
            }
            Event::Input(_) | Event::Tick => {}
        }
    }
}

pub fn draw<B: Backend>(f: &mut Frame<B>, app: &mut App) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(size);

    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[0]);
    draw_menu(f, app, header_chunks[0]);
    draw_summary(f, app, header_chunks[1]);

    match app.active_menu_item {
        MenuItem::Distribution => draw_distribution_page(f, app, chunks[1]),
        MenuItem::AgeLeaders => draw_leaders_page(f, app, chunks[1]),
        MenuItem::ForeignRatio => draw_foreign_page(f, app, chunks[1]),
    }
    draw_status(f, app, chunks[2]);
}

fn draw_menu<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let menu = MENU_TITLES
        .iter()
        .map(|t| {
            let (first, rest) = t.split_at(1);
            Spans::from(vec![
                Span::styled(
                    first,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                Span::styled(rest, Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let tabs = Tabs::new(menu)
        .select(app.active_menu_item.into())
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(Style::default().fg(Color::Yellow))
        .divider(Span::raw("|"));
    f.render_widget(tabs, area);
}

fn draw_summary<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let snapshot = match app.table.schema.snapshot {
        Some(month) => month.format("%Y-%m").to_string(),
        None => String::from("unknown"),
    };
    let text = vec![Spans::from(vec![
        Span::styled(
            format!("Snapshot: {}", snapshot),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  Regions: {}/{}  Chart: {}",
            app.selected.len(),
            app.regions.len(),
            app.chart_mode
        )),
    ])];
    let summary = Paragraph::new(text)
        .block(Block::default().title("Census").borders(Borders::ALL))
        .style(Style::default().fg(Color::Green))
        .alignment(Alignment::Center);
    f.render_widget(summary, area);
}

fn draw_status<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let line = match &app.status {
        Some(message) => Span::styled(message.as_str(), Style::default().fg(Color::Yellow)),
        None => Span::styled(
            "↑/↓ move  space select  x clear  c chart  tab page  e export  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(Spans::from(line)), area);
}

fn draw_distribution_page<B: Backend>(f: &mut Frame<B>, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)].as_ref())
        .split(area);

    let items: Vec<ListItem> = app
        .regions
        .iter()
        .map(|region| {
            let mark = if app.selected.contains(region) { "[x] " } else { "[ ] " };
            ListItem::new(Spans::from(vec![Span::raw(mark), Span::raw(region.as_str())]))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().title("Regions").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Yellow)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, chunks[0], &mut app.cursor);

    if let Some(pyramid) = app.pyramid() {
        draw_pyramid(f, &pyramid, chunks[1]);
        return;
    }
    match &app.distribution {
        Ok(distribution) => match app.chart_mode {
            ChartMode::Line => draw_line_chart(f, distribution, chunks[1]),
            ChartMode::Bar => draw_grouped_bars(f, distribution, chunks[1]),
        },
        Err(DashboardError::EmptySelection) => draw_message(
            f,
            "Population by age",
            "Select at least one region in the list on the left.",
            Color::Cyan,
            chunks[1],
        ),
        Err(e) => draw_message(f, "Population by age", &e.to_string(), Color::Red, chunks[1]),
    }
}

fn draw_line_chart<B: Backend>(f: &mut Frame<B>, distribution: &AgeDistribution, area: Rect) {
    let series = distribution.all_series();
    let points: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|s| s.points.iter().map(|(age, n)| (*age as f64, *n as f64)).collect())
        .collect();
    let datasets = series
        .iter()
        .zip(&points)
        .enumerate()
        .map(|(i, (s, data))| {
            Dataset::default()
                .name(s.region.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(data)
        })
        .collect();

    let min_age = distribution.rows.iter().map(|r| r.age).min().unwrap_or(0) as f64;
    let max_age = distribution.rows.iter().map(|r| r.age).max().unwrap_or(0) as f64;
    let max_count = distribution.max_count() as f64;
    let chart = Chart::new(datasets)
        .block(Block::default().title("Population by age").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("Age")
                .style(Style::default().fg(Color::Gray))
                .bounds([min_age, max_age])
                .labels(axis_labels(min_age, max_age)),
        )
        .y_axis(
            Axis::default()
                .title("Population")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_count])
                .labels(axis_labels(0.0, max_count)),
        );
    f.render_widget(chart, area);
}

fn axis_labels<'a>(min: f64, max: f64) -> Vec<Span<'a>> {
    vec![
        Span::raw(format!("{:.0}", min)),
        Span::raw(format!("{:.0}", (min + max) / 2.0)),
        Span::raw(format!("{:.0}", max)),
    ]
}

fn draw_grouped_bars<B: Backend>(f: &mut Frame<B>, distribution: &AgeDistribution, area: Rect) {
    let n = distribution.regions.len().max(1) as u32;
    let constraints: Vec<Constraint> = distribution
        .regions
        .iter()
        .map(|_| Constraint::Ratio(1, n))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let labels: Vec<String> = distribution.rows.iter().map(|r| r.age.to_string()).collect();
    let max = distribution.max_count();
    for (i, series) in distribution.all_series().iter().enumerate() {
        let data: Vec<(&str, u64)> = labels
            .iter()
            .zip(&series.points)
            .map(|(label, (_, n))| (label.as_str(), *n))
            .collect();
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        let chart = BarChart::default()
            .block(Block::default().title(series.region.clone()).borders(Borders::ALL))
            .data(&data)
            .bar_width(bar_width(chunks[i], data.len()))
            .bar_gap(1)
            .max(max)
            .bar_style(Style::default().fg(color))
            .value_style(Style::default().fg(Color::Black).bg(color));
        f.render_widget(chart, chunks[i]);
    }
}

fn bar_width(area: Rect, bars: usize) -> u16 {
    let inner = area.width.saturating_sub(2) as usize;
    (inner / bars.max(1)).saturating_sub(1).max(1) as u16
}

fn draw_pyramid<B: Backend>(f: &mut Frame<B>, pyramid: &Pyramid, area: Rect) {
    let half = (area.width.saturating_sub(2) as usize).saturating_sub(7) / 2;
    let max = pyramid.max_magnitude().max(1);
    let scale = |n: u64| (n as f64 / max as f64 * half as f64).round() as usize;

    // oldest at the top
    let lines: Vec<Spans> = pyramid
        .rows
        .iter()
        .rev()
        .map(|row| {
            let left = scale(row.left.unsigned_abs());
            let right = scale(row.right.unsigned_abs());
            Spans::from(vec![
                Span::raw(" ".repeat(half - left)),
                Span::styled("█".repeat(left), Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {:^5} ", row.label)),
                Span::styled("█".repeat(right), Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();
    let overflow = lines.len().saturating_sub(area.height.saturating_sub(2) as usize) as u16;
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!("{} population pyramid", pyramid.region))
                .borders(Borders::ALL),
        )
        .scroll((overflow, 0));
    f.render_widget(paragraph, area);
}

fn draw_leaders_page<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(area);

    if app.leaders.is_empty() {
        draw_message(f, "Highest share by age", "No region has any population.", Color::Red, area);
        return;
    }

    let rows = app.leaders.iter().map(|leader| {
        Row::new(vec![
            Cell::from(leader.label.as_str()),
            Cell::from(leader.region.as_str()),
            Cell::from(format!("{:.2}", leader.share_percent)),
        ])
    });
    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(60),
        Constraint::Length(8),
    ];
    let table = Table::new(rows)
        .header(header_row(&["Age", "Region", "Share %"]))
        .block(Block::default().title("Highest share by age").borders(Borders::ALL))
        .widths(&widths);
    f.render_widget(table, chunks[0]);

    let labels: Vec<String> = app.leaders.iter().map(|l| l.age.to_string()).collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(&app.leaders)
        .map(|(label, leader)| (label.as_str(), basis_points(leader.share_percent)))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title("Top share, 0.01%").borders(Borders::ALL))
        .data(&data)
        .bar_width(bar_width(chunks[1], data.len()))
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    f.render_widget(chart, chunks[1]);
}

fn draw_foreign_page<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let ranking = match &app.foreign {
        Ok(ranking) => ranking,
        Err(e) => {
            draw_message(f, "Foreign residents", &e.to_string(), Color::Red, area);
            return;
        }
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let rows = ranking.iter().enumerate().map(|(i, r)| {
        Row::new(vec![
            Cell::from((i + 1).to_string()),
            Cell::from(r.region.as_str()),
            Cell::from(r.total.to_string()),
            Cell::from(r.foreign.to_string()),
            Cell::from(format!("{:.2}", r.foreign_percent)),
            Cell::from(format!("{:.2}", r.native_percent)),
        ])
    });
    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(30),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
    ];
    let title = format!("Top {} regions by foreign share", app.config.top_n);
    let table = Table::new(rows)
        .header(header_row(&["#", "Region", "Total", "Foreign", "Foreign %", "Native %"]))
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&widths);
    f.render_widget(table, chunks[0]);

    let data: Vec<(&str, u64)> = ranking
        .iter()
        .map(|r| (r.region.as_str(), basis_points(r.foreign_percent)))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title("Foreign share, 0.01%").borders(Borders::ALL))
        .data(&data)
        .bar_width(bar_width(chunks[1], data.len()))
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, chunks[1]);
}

fn basis_points(percent: f64) -> u64 {
    (percent * 100.0).round().max(0.0) as u64
}

fn header_row<'a>(titles: &[&'a str]) -> Row<'a> {
    Row::new(titles.iter().map(|t| Cell::from(*t)).collect::<Vec<_>>())
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

fn draw_message<B: Backend>(f: &mut Frame<B>, title: &str, message: &str, color: Color, area: Rect) {
    let paragraph = Paragraph::new(message.to_string())
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
