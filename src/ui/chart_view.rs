//! Chart surface rendering. The pure helpers (zoom window, price extent,
//! candle validity) are kept free of ratatui types so they can be tested
//! without a terminal.

use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Sparkline},
    Frame,
};

use crate::chart::controller::{ChartController, LoadState};
use crate::chart::{ChartType, OhlcPoint, PricePoint, VolumePoint};

const PRICE_PADDING_RATIO: f64 = 0.05;

/// Rightmost slice of the series covered by the zoom level, so zooming
/// in narrows onto the most recent data. At least one point survives.
pub fn visible_window<T>(series: &[T], zoom_level: u16) -> &[T] {
    if series.is_empty() {
        return series;
    }
    let count = (series.len() * zoom_level as usize / 100).clamp(1, series.len());
    &series[series.len() - count..]
}

/// Vertical extent for the price axis with 5% headroom on both sides.
/// Candlestick mode spans wick extremes rather than closes.
pub fn price_extent(
    prices: &[PricePoint],
    ohlc: &[OhlcPoint],
    chart_type: ChartType,
) -> Option<(f64, f64)> {
    let (min, max) = if chart_type == ChartType::Candle {
        let renderable: Vec<&OhlcPoint> = ohlc.iter().filter(|c| is_renderable(c)).collect();
        if renderable.is_empty() {
            return None;
        }
        let min = renderable.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let max = renderable.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    } else {
        if prices.is_empty() {
            return None;
        }
        let min = prices.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let max = prices.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    };

    let padding = (max - min) * PRICE_PADDING_RATIO;
    Some((min - padding, max + padding))
}

/// A candle is drawable when all four legs are finite and the wick has
/// positive extent. Degenerate candles get a placeholder glyph instead.
pub fn is_renderable(candle: &OhlcPoint) -> bool {
    candle.open.is_finite()
        && candle.high.is_finite()
        && candle.low.is_finite()
        && candle.close.is_finite()
        && candle.high > candle.low
}

pub fn render<B: Backend, S>(f: &mut Frame<B>, area: Rect, controller: &ChartController<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(area);

    render_stats_header(f, chunks[0], controller);
    render_price_surface(f, chunks[1], controller);
    render_volume_strip(
        f,
        chunks[2],
        visible_window(&controller.bundle().volumes, controller.zoom_level()),
    );
}

fn render_stats_header<B: Backend, S>(
    f: &mut Frame<B>,
    area: Rect,
    controller: &ChartController<S>,
) {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!(
                "{} ({} / {})",
                controller.coin_id().to_uppercase(),
                controller.time_range().as_str(),
                controller.chart_type().as_str()
            ),
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  zoom {}%", controller.zoom_level())),
        Span::raw(if controller.auto_refresh() { "  auto" } else { "" }),
    ])];

    if let Some(stats) = controller.stats() {
        let change_color = if stats.price_change < 0.0 {
            Color::Red
        } else {
            Color::Green
        };
        lines.push(Line::from(vec![
            Span::raw("Current: "),
            Span::styled(
                format!("${:.2}", stats.current_price),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(" ("),
            Span::styled(
                format!("{:+.2}%", stats.price_change_percent),
                Style::default().fg(change_color),
            ),
            Span::raw(")"),
        ]));
    }

    if let Some(advisory) = controller.advisory() {
        lines.push(Line::from(Span::styled(
            advisory.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    }

    let header = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::NONE));
    f.render_widget(header, area);
}

fn render_price_surface<B: Backend, S>(
    f: &mut Frame<B>,
    area: Rect,
    controller: &ChartController<S>,
) {
    if controller.state() == LoadState::Loading {
        let message = Paragraph::new("Loading chart data...")
            .block(Block::default().borders(Borders::ALL).title("Chart"));
        f.render_widget(message, area);
        return;
    }

    let bundle = controller.bundle();
    let chart_type = controller.chart_type();
    let zoom = controller.zoom_level();

    let extent = price_extent(
        visible_window(&bundle.prices, zoom),
        visible_window(&bundle.ohlc, zoom),
        chart_type,
    );
    let (min_price, max_price) = match extent {
        Some(extent) => extent,
        None => {
            let message = Paragraph::new("No data available for this range")
                .block(Block::default().borders(Borders::ALL).title("Chart"));
            f.render_widget(message, area);
            return;
        }
    };

    let chart_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Price ({})", controller.chart_type().as_str()));
    let inner_area = chart_block.inner(area);
    if inner_area.height < 3 || inner_area.width < 10 {
        return;
    }
    f.render_widget(chart_block, area);

    match chart_type {
        ChartType::Candle => render_candles(
            f,
            inner_area,
            visible_window(&bundle.ohlc, zoom),
            min_price,
            max_price,
        ),
        ChartType::Bar => render_bars(
            f,
            inner_area,
            visible_window(&bundle.prices, zoom),
            min_price,
            max_price,
        ),
        ChartType::Line | ChartType::Area => render_line(
            f,
            inner_area,
            visible_window(&bundle.prices, zoom),
            min_price,
            max_price,
            chart_type == ChartType::Area,
        ),
    }

    let top_label =
        Paragraph::new(format!("{:.2}", max_price)).style(Style::default().fg(Color::Gray));
    let bottom_label =
        Paragraph::new(format!("{:.2}", min_price)).style(Style::default().fg(Color::Gray));
    f.render_widget(
        top_label,
        Rect::new(inner_area.right() - 8, inner_area.y, 8, 1),
    );
    f.render_widget(
        bottom_label,
        Rect::new(inner_area.right() - 8, inner_area.bottom() - 1, 8, 1),
    );
}

fn render_line<B: Backend>(
    f: &mut Frame<B>,
    inner_area: Rect,
    prices: &[PricePoint],
    min_price: f64,
    max_price: f64,
    fill_below: bool,
) {
    if prices.len() < 2 {
        let message = Paragraph::new("Insufficient data for chart");
        f.render_widget(message, inner_area);
        return;
    }
    let price_range = max_price - min_price;
    if price_range <= 0.0 {
        let message = Paragraph::new("No price variation to display");
        f.render_widget(message, inner_area);
        return;
    }

    let height = inner_area.height as f64;
    let width = inner_area.width as f64;
    let step = ((prices.len() as f64 / width).ceil() as usize).max(1);
    let points: Vec<(f64, f64)> = prices
        .iter()
        .enumerate()
        .step_by(step)
        .map(|(i, p)| {
            let x = (i as f64 / step as f64).min(width - 1.0);
            let y = height - 1.0 - ((p.price - min_price) / price_range * (height - 2.0));
            (x, y)
        })
        .collect();

    for window in points.windows(2) {
        if let [(x1, y1), (x2, y2)] = window {
            let start_x = inner_area.x + x1.round() as u16;
            let start_y = inner_area.y + y1.round() as u16;
            let end_x = inner_area.x + x2.round() as u16;
            let end_y = inner_area.y + y2.round() as u16;

            if start_x == end_x && start_y == end_y {
                let dot = Paragraph::new("◉").style(Style::default().fg(Color::LightBlue));
                f.render_widget(dot, Rect::new(start_x, start_y, 1, 1));
            } else {
                let mut x = start_x;
                let mut y = start_y;
                let dx = end_x as i16 - start_x as i16;
                let dy = end_y as i16 - start_y as i16;
                let steps = dx.abs().max(dy.abs());

                for _ in 0..=steps {
                    let dot = Paragraph::new("▪").style(Style::default().fg(Color::LightBlue));
                    f.render_widget(dot, Rect::new(x, y, 1, 1));
                    if fill_below {
                        for fy in (y + 1)..inner_area.bottom() {
                            let shade =
                                Paragraph::new("░").style(Style::default().fg(Color::Blue));
                            f.render_widget(shade, Rect::new(x, fy, 1, 1));
                        }
                    }
                    x = (x as i16 + dx / steps) as u16;
                    y = (y as i16 + dy / steps) as u16;
                }
            }
        }
    }
}

fn render_bars<B: Backend>(
    f: &mut Frame<B>,
    inner_area: Rect,
    prices: &[PricePoint],
    min_price: f64,
    max_price: f64,
) {
    if prices.is_empty() {
        return;
    }
    let price_range = max_price - min_price;
    if price_range <= 0.0 {
        let message = Paragraph::new("No price variation to display");
        f.render_widget(message, inner_area);
        return;
    }

    let width = inner_area.width as usize;
    let step = ((prices.len() as f64 / width as f64).ceil() as usize).max(1);

    for (column, chunk) in prices.chunks(step).enumerate() {
        let x = inner_area.x + column as u16;
        if x >= inner_area.right() {
            break;
        }
        let price = chunk.last().map(|p| p.price).unwrap_or(min_price);
        let top = inner_area.y
            + (inner_area.height as f64
                - 1.0
                - ((price - min_price) / price_range * (inner_area.height as f64 - 2.0)))
                as u16;
        for y in top..inner_area.bottom() {
            let bar = Paragraph::new("█").style(Style::default().fg(Color::LightBlue));
            f.render_widget(bar, Rect::new(x, y, 1, 1));
        }
    }
}

fn render_candles<B: Backend>(
    f: &mut Frame<B>,
    inner_area: Rect,
    candles: &[OhlcPoint],
    min_price: f64,
    max_price: f64,
) {
    if candles.len() < 2 {
        let message = Paragraph::new("Insufficient data for candles");
        f.render_widget(message, inner_area);
        return;
    }
    let price_range = max_price - min_price;
    if price_range <= 0.0 {
        let message = Paragraph::new("No price variation to display");
        f.render_widget(message, inner_area);
        return;
    }

    let candle_width = (inner_area.width as f32 / candles.len() as f32).max(1.0) as u16;
    let candle_spacing = 1;
    let to_y = |price: f64| -> u16 {
        inner_area.y + (inner_area.height - 1)
            - (((price - min_price) / price_range) * (inner_area.height - 1) as f64).round()
                as u16
    };

    for (i, candle) in candles.iter().enumerate() {
        let x = inner_area.x + (i as u16 * (candle_width + candle_spacing));
        if x >= inner_area.right() {
            break;
        }
        // Body and wick columns must stay inside the buffer even when the
        // last candle only partially fits.
        let wick_x = (x + candle_width / 2).min(inner_area.right() - 1);

        if !is_renderable(candle) {
            let placeholder = Paragraph::new("▒").style(Style::default().fg(Color::DarkGray));
            f.render_widget(
                placeholder,
                Rect::new(wick_x, inner_area.y + inner_area.height / 2, 1, 1),
            );
            continue;
        }

        let high_y = to_y(candle.high);
        let low_y = to_y(candle.low);
        let open_y = to_y(candle.open);
        let close_y = to_y(candle.close);

        let is_bullish = candle.close >= candle.open;
        let color = if is_bullish { Color::Green } else { Color::Red };

        for y in high_y..=low_y {
            let wick = Paragraph::new("│").style(Style::default().fg(color));
            f.render_widget(wick, Rect::new(wick_x, y, 1, 1));
        }

        let (top, bottom) = if is_bullish {
            (close_y, open_y)
        } else {
            (open_y, close_y)
        };
        for y in top..=bottom {
            for w in 0..candle_width {
                if x + w >= inner_area.right() {
                    break;
                }
                let body = Paragraph::new("█").style(Style::default().fg(color));
                f.render_widget(body, Rect::new(x + w, y, 1, 1));
            }
        }
    }
}

fn render_volume_strip<B: Backend>(f: &mut Frame<B>, area: Rect, volumes: &[VolumePoint]) {
    let data: Vec<u64> = volumes.iter().map(|v| v.volume.max(0.0) as u64).collect();

    // Sparkline only borrows the samples; it is rendered before `data`
    // drops, so no per-frame allocation outlives this call.
    let sparkline = Sparkline::default()
        .data(&data)
        .style(Style::default().fg(Color::LightBlue))
        .bar_set(ratatui::symbols::bar::NINE_LEVELS)
        .block(Block::default().borders(Borders::ALL).title("Volume"));
    f.render_widget(sparkline, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::range::TimeRange;
    use crate::chart::synthetic;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn price(timestamp: i64, price: f64) -> PricePoint {
        PricePoint { timestamp, price }
    }

    #[test]
    fn visible_window_anchors_to_most_recent() {
        let series: Vec<i32> = (0..100).collect();
        let window = visible_window(&series, 50);
        assert_eq!(window.len(), 50);
        assert_eq!(*window.first().unwrap(), 50);
        assert_eq!(*window.last().unwrap(), 99);
    }

    #[test]
    fn visible_window_full_and_clamped() {
        let series: Vec<i32> = (0..10).collect();
        assert_eq!(visible_window(&series, 100).len(), 10);
        assert_eq!(visible_window(&series, 200).len(), 10);
        // Tiny series never vanish entirely.
        let two = vec![1, 2];
        assert_eq!(visible_window(&two, 50).len(), 1);
        let empty: Vec<i32> = Vec::new();
        assert!(visible_window(&empty, 50).is_empty());
    }

    #[test]
    fn price_extent_pads_five_percent() {
        let prices = vec![price(1, 90.0), price(2, 110.0)];
        let (min, max) = price_extent(&prices, &[], ChartType::Line).unwrap();
        assert!((min - 89.0).abs() < 1e-9);
        assert!((max - 111.0).abs() < 1e-9);
    }

    #[test]
    fn price_extent_uses_wicks_in_candle_mode() {
        let candles = vec![
            OhlcPoint { timestamp: 1, open: 100.0, high: 120.0, low: 80.0, close: 110.0 },
            OhlcPoint { timestamp: 2, open: 110.0, high: 115.0, low: 95.0, close: 100.0 },
        ];
        let (min, max) = price_extent(&[], &candles, ChartType::Candle).unwrap();
        assert!((min - 78.0).abs() < 1e-9);
        assert!((max - 122.0).abs() < 1e-9);
    }

    #[test]
    fn price_extent_empty_is_none() {
        assert!(price_extent(&[], &[], ChartType::Line).is_none());
        assert!(price_extent(&[], &[], ChartType::Candle).is_none());
    }

    #[test]
    fn synthetic_candles_fit_an_80_column_viewport() {
        let mut rng = StdRng::seed_from_u64(7);
        let candles = synthetic::ohlc_series(
            TimeRange::D1.ohlc_fallback(),
            50_000.0,
            1_700_000_000_000,
            &mut rng,
        );
        let (min, max) = price_extent(&[], &candles, ChartType::Candle).unwrap();

        // Candle bodies near the right edge must be clipped to the area,
        // not written past the buffer.
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|f| render_candles(f, f.size(), &candles, min, max))
            .unwrap();

        let drew_candle = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .any(|cell| cell.symbol == "█" || cell.symbol == "│");
        assert!(drew_candle);
    }

    #[test]
    fn volume_strip_draws_borrowed_samples() {
        let volumes: Vec<VolumePoint> = (0..40)
            .map(|i| VolumePoint { timestamp: i, volume: (i * 1_000) as f64 })
            .collect();

        let mut terminal = Terminal::new(TestBackend::new(80, 6)).unwrap();
        terminal
            .draw(|f| render_volume_strip(f, f.size(), &volumes))
            .unwrap();

        let drew_title = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .any(|cell| cell.symbol == "V");
        assert!(drew_title);
    }

    #[test]
    fn degenerate_candles_are_not_renderable() {
        let flat = OhlcPoint { timestamp: 1, open: 100.0, high: 100.0, low: 100.0, close: 100.0 };
        assert!(!is_renderable(&flat));
        let nan = OhlcPoint { timestamp: 1, open: f64::NAN, high: 110.0, low: 90.0, close: 100.0 };
        assert!(!is_renderable(&nan));
        let ok = OhlcPoint { timestamp: 1, open: 100.0, high: 110.0, low: 90.0, close: 105.0 };
        assert!(is_renderable(&ok));
    }
}
