use chrono::{DateTime, Utc};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use super::candles::candlestick_canvas;
use super::{validate, ChartFrame, ChartStyle, Notice, NoticeLevel, RenderError, Renderer};
use crate::models::PriceTable;

const KEY_HINTS: &str = " [s] stop/start updates   [q] quit";

/// Owned copy of the last frame, kept so status updates can redraw the
/// chart in place.
struct ChartView {
    table: PriceTable,
    title: String,
    x_label: String,
    y_label: String,
    intraday: bool,
}

impl ChartView {
    fn from_frame(frame: &ChartFrame<'_>) -> Self {
        Self {
            table: frame.table.clone(),
            title: frame.title.clone(),
            x_label: frame.x_label.clone(),
            y_label: frame.y_label.clone(),
            intraday: frame.intraday,
        }
    }

    fn time_label(&self, timestamp: DateTime<Utc>) -> String {
        if self.intraday {
            timestamp.format("%H:%M").to_string()
        } else {
            timestamp.format("%Y-%m-%d").to_string()
        }
    }

    /// Price bounds padded by 2% so the extremes don't sit on the border.
    fn y_bounds(&self) -> [f64; 2] {
        let (low, high) = self.table.price_range().unwrap_or((0.0, 1.0));
        let pad = ((high - low) * 0.02).max(0.01);
        [low - pad, high + pad]
    }
}

/// Draws into a ratatui terminal: chart area, a status line and key hints.
pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,
    style: ChartStyle,
    view: Option<ChartView>,
    status: Option<Notice>,
}

impl<B: Backend> TerminalRenderer<B> {
    pub fn new(terminal: Terminal<B>, style: ChartStyle) -> Self {
        Self {
            terminal,
            style,
            view: None,
            status: None,
        }
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        let style = self.style;
        let view = self.view.as_ref();
        let status = self.status.as_ref();
        self.terminal
            .draw(|frame| draw_screen(frame, style, view, status))?;
        Ok(())
    }
}

impl<B: Backend> Renderer for TerminalRenderer<B> {
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError> {
        validate(frame.table)?;
        self.view = Some(ChartView::from_frame(frame));
        self.draw()
    }

    fn notice(&mut self, notice: Notice) -> Result<(), RenderError> {
        self.status = Some(notice);
        self.draw()
    }
}

fn draw_screen(frame: &mut Frame, style: ChartStyle, view: Option<&ChartView>, status: Option<&Notice>) {
    let [chart_area, status_area, footer_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    match view {
        Some(view) => match style {
            ChartStyle::Line => draw_line_chart(frame, chart_area, view),
            ChartStyle::Candlestick => draw_candles(frame, chart_area, view),
        },
        None => frame.render_widget(
            Paragraph::new("Waiting for data...").block(Block::bordered()),
            chart_area,
        ),
    }

    if let Some(notice) = status {
        let color = match notice.level {
            NoticeLevel::Info => Color::Gray,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        frame.render_widget(
            Paragraph::new(Span::styled(notice.message.as_str(), Style::default().fg(color))),
            status_area,
        );
    }
    frame.render_widget(Paragraph::new(KEY_HINTS.dark_gray()), footer_area);
}

fn draw_line_chart(frame: &mut Frame, area: Rect, view: &ChartView) {
    let rows = view.table.rows();
    let points: Vec<(f64, f64)> = rows
        .iter()
        .map(|c| (c.timestamp.timestamp() as f64, c.close))
        .collect();

    let (first, last) = match (view.table.first(), view.table.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return,
    };
    let x_start = first.timestamp.timestamp() as f64;
    let x_end = (last.timestamp.timestamp() as f64).max(x_start + 1.0);
    let middle = &rows[rows.len() / 2];
    let x_labels = vec![
        view.time_label(first.timestamp),
        view.time_label(middle.timestamp),
        view.time_label(last.timestamp),
    ];

    let [y_low, y_high] = view.y_bounds();
    let y_labels = vec![
        format!("{y_low:.2}"),
        format!("{:.2}", (y_low + y_high) / 2.0),
        format!("{y_high:.2}"),
    ];

    let dataset = Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::bordered().title(view.title.as_str()))
        .x_axis(
            Axis::default()
                .title(view.x_label.as_str())
                .style(Style::default().fg(Color::Gray))
                .bounds([x_start, x_end])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(view.y_label.as_str())
                .style(Style::default().fg(Color::Gray))
                .bounds([y_low, y_high])
                .labels(y_labels),
        );
    frame.render_widget(chart, area);
}

fn draw_candles(frame: &mut Frame, area: Rect, view: &ChartView) {
    let (first, last) = match (view.table.first(), view.table.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return,
    };
    let y_bounds = view.y_bounds();
    let legend = format!(
        " {}: {} - {}   {}: {:.2} - {:.2} ",
        view.x_label,
        view.time_label(first.timestamp),
        view.time_label(last.timestamp),
        view.y_label,
        y_bounds[0],
        y_bounds[1],
    );
    let block = Block::bordered()
        .title(view.title.as_str())
        .title_bottom(legend);
    frame.render_widget(candlestick_canvas(view.table.rows(), y_bounds, block), area);
}
