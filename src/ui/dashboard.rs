use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use num_format::{Locale, ToFormattedString};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::error::Error;
use std::io;

use crate::api::coingecko::{CoinGeckoClient, CoinMarket, GlobalMarket};
use crate::chart::controller::ChartController;
use crate::ui::chart_view;
use crate::watchlist::WatchlistStore;

type DynError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    Markets,
    Watchlist,
    Chart,
}

pub struct Dashboard {
    client: CoinGeckoClient,
    controller: ChartController<CoinGeckoClient>,
    watchlist: WatchlistStore,
    markets: Vec<CoinMarket>,
    watchlist_rows: Vec<CoinMarket>,
    global: Option<GlobalMarket>,
    view: DashboardView,
    selected: usize,
    running: bool,
}

impl Dashboard {
    pub fn new(
        client: CoinGeckoClient,
        controller: ChartController<CoinGeckoClient>,
        watchlist: WatchlistStore,
    ) -> Dashboard {
        Dashboard {
            client,
            controller,
            watchlist,
            markets: Vec::new(),
            watchlist_rows: Vec::new(),
            global: None,
            view: DashboardView::Markets,
            selected: 0,
            running: true,
        }
    }

    pub async fn run(&mut self) -> Result<(), DynError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        self.refresh_market_data().await;
        self.controller.load().await;

        while self.running {
            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key_input(key).await;
                }
            }

            self.controller.tick().await;

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Min(5),
                        Constraint::Length(3),
                    ])
                    .split(f.size());

                Self::render_header(f, chunks[0], &self.global);
                match self.view {
                    DashboardView::Markets => Self::render_coin_table(
                        f,
                        chunks[1],
                        "Markets",
                        &self.markets,
                        self.selected,
                        &self.watchlist,
                    ),
                    DashboardView::Watchlist => Self::render_coin_table(
                        f,
                        chunks[1],
                        "Watchlist",
                        &self.watchlist_rows,
                        self.selected,
                        &self.watchlist,
                    ),
                    DashboardView::Chart => chart_view::render(f, chunks[1], &self.controller),
                }
                Self::render_footer(f, chunks[2], self.view);
            })?;
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        Ok(())
    }

    async fn refresh_market_data(&mut self) {
        match self.client.markets(50, 1).await {
            Ok(markets) => self.markets = markets,
            Err(e) => log::error!("market list fetch failed: {}", e),
        }
        match self.client.global().await {
            Ok(global) => self.global = Some(global),
            Err(e) => log::error!("global stats fetch failed: {}", e),
        }
        self.refresh_watchlist_rows().await;
    }

    async fn refresh_watchlist_rows(&mut self) {
        match self.client.watchlist_markets(self.watchlist.ids()).await {
            Ok(rows) => self.watchlist_rows = rows,
            Err(e) => log::error!("watchlist fetch failed: {}", e),
        }
    }

    fn visible_rows(&self) -> &[CoinMarket] {
        match self.view {
            DashboardView::Watchlist => &self.watchlist_rows,
            _ => &self.markets,
        }
    }

    fn selected_coin(&self) -> Option<&CoinMarket> {
        self.visible_rows().get(self.selected)
    }

    async fn handle_key_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('v') => {
                self.view = DashboardView::Markets;
                self.selected = 0;
            }
            KeyCode::Char('w') => {
                self.view = DashboardView::Watchlist;
                self.selected = 0;
                self.refresh_watchlist_rows().await;
            }
            KeyCode::Char('c') => self.view = DashboardView::Chart,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                let max = self.visible_rows().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(max);
            }
            KeyCode::Enter => {
                if let Some(coin) = self.selected_coin() {
                    let (id, price) = (coin.id.clone(), coin.current_price);
                    self.controller.set_coin(id, price).await;
                    self.view = DashboardView::Chart;
                }
            }
            KeyCode::Char('t') => {
                let next = self.controller.time_range().next_ui();
                self.controller.set_time_range(next).await;
            }
            KeyCode::Char('y') => {
                let next = self.controller.chart_type().next();
                self.controller.set_chart_type(next).await;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.controller.zoom_in(),
            KeyCode::Char('-') => self.controller.zoom_out(),
            KeyCode::Char('r') => {
                self.controller.retry().await;
                self.refresh_market_data().await;
            }
            KeyCode::Char('a') => {
                let enabled = !self.controller.auto_refresh();
                self.controller.set_auto_refresh(enabled);
            }
            KeyCode::Char(' ') => {
                if let Some(coin) = self.selected_coin() {
                    let id = coin.id.clone();
                    if let Err(e) = self.watchlist.toggle(&id) {
                        log::error!("watchlist update failed for {}: {}", id, e);
                    }
                    self.refresh_watchlist_rows().await;
                }
            }
            KeyCode::Char('x') => {
                if self.view == DashboardView::Watchlist {
                    if let Err(e) = self.watchlist.clear() {
                        log::error!("watchlist clear failed: {}", e);
                    }
                    self.watchlist_rows.clear();
                    self.selected = 0;
                }
            }
            _ => (),
        }
    }

    fn render_header(
        f: &mut Frame<CrosstermBackend<io::Stdout>>,
        area: Rect,
        global: &Option<GlobalMarket>,
    ) {
        let global_line = match global {
            Some(g) => {
                let cap_change_color = if g.market_cap_change_percentage_24h_usd < 0.0 {
                    Color::Red
                } else {
                    Color::Green
                };
                Line::from(vec![
                    Span::styled(
                        format!(
                            "Coins: {} | Markets: {} | Cap 24h: ",
                            g.active_cryptocurrencies.to_formatted_string(&Locale::en),
                            g.markets.to_formatted_string(&Locale::en),
                        ),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(
                        format!("{:+.2}%", g.market_cap_change_percentage_24h_usd),
                        Style::default().fg(cap_change_color),
                    ),
                    Span::styled(
                        format!(" | {}", Local::now().format("%H:%M:%S")),
                        Style::default().fg(Color::Gray),
                    ),
                ])
            }
            None => Line::from(Span::styled(
                format!("Global stats unavailable | {}", Local::now().format("%H:%M:%S")),
                Style::default().fg(Color::Gray),
            )),
        };

        let header = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                "COINDASH",
                Style::default()
                    .fg(Color::LightCyan)
                    .add_modifier(Modifier::BOLD),
            )),
            global_line,
        ]))
        .block(Block::default().borders(Borders::BOTTOM));

        f.render_widget(header, area);
    }

    fn render_coin_table(
        f: &mut Frame<CrosstermBackend<io::Stdout>>,
        area: Rect,
        title: &str,
        coins: &[CoinMarket],
        selected: usize,
        watchlist: &WatchlistStore,
    ) {
        let block = Block::default().borders(Borders::ALL).title(title.to_string());
        let inner_area = block.inner(area);
        f.render_widget(block, area);

        if inner_area.height < 3 || inner_area.width < 30 {
            return;
        }

        if coins.is_empty() {
            let message = Paragraph::new("No coins to display")
                .style(Style::default().fg(Color::Gray));
            f.render_widget(message, inner_area);
            return;
        }

        let rows = coins.iter().enumerate().map(|(i, coin)| {
            let change = coin.price_change_percentage_24h.unwrap_or(0.0);
            let change_color = if change < 0.0 { Color::Red } else { Color::Green };
            let star = if watchlist.contains(&coin.id) { "★" } else { " " };

            Row::new(vec![
                Cell::from(star),
                Cell::from(coin.symbol.to_uppercase()),
                Cell::from(coin.name.as_str()),
                Cell::from(Self::format_price(coin.current_price)),
                Cell::from(Span::styled(
                    Self::format_change(change),
                    Style::default().fg(change_color),
                )),
                Cell::from(Self::format_volume(coin.total_volume)),
                Cell::from(Self::format_market_cap(coin.market_cap)),
            ])
            .style(if i == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            })
        });

        let table = Table::new(rows)
            .header(
                Row::new(vec!["", "Symbol", "Name", "Price", "24h Change", "Volume", "Market Cap"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .widths(&[
                Constraint::Length(2),
                Constraint::Length(8),
                Constraint::Length(16),
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(20),
            ]);

        f.render_widget(table, inner_area);
    }

    fn render_footer(
        f: &mut Frame<CrosstermBackend<io::Stdout>>,
        area: Rect,
        view: DashboardView,
    ) {
        let controls = match view {
            DashboardView::Markets | DashboardView::Watchlist => vec![
                Span::raw("Controls: "),
                Span::styled("↑/↓", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Navigate  "),
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Chart  "),
                Span::styled("Space", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Star  "),
                Span::styled("v", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Markets  "),
                Span::styled("w", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Watchlist  "),
                Span::styled("x", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Clear  "),
                Span::styled("r", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Refresh  "),
                Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Quit"),
            ],
            DashboardView::Chart => vec![
                Span::raw("Controls: "),
                Span::styled("t", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Range  "),
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Type  "),
                Span::styled("+/-", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Zoom  "),
                Span::styled("a", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Auto-refresh  "),
                Span::styled("r", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Retry  "),
                Span::styled("v", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Markets  "),
                Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" Quit"),
            ],
        };

        let footer = Paragraph::new(Line::from(controls))
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::TOP));

        f.render_widget(footer, area);
    }

    fn format_price(price: f64) -> String {
        if price > 1000.0 {
            format!("${:>10.2}", price)
        } else {
            format!("${:>10.4}", price)
        }
    }

    fn format_change(change: f64) -> String {
        format!("{:>+7.2}%", change)
    }

    fn format_volume(volume: f64) -> String {
        if volume > 1_000_000_000.0 {
            format!("{:>10.2}B", volume / 1_000_000_000.0)
        } else if volume > 1_000_000.0 {
            format!("{:>10.2}M", volume / 1_000_000.0)
        } else if volume > 1_000.0 {
            format!("{:>10.2}K", volume / 1_000.0)
        } else {
            format!("{:>10.2}", volume)
        }
    }

    fn format_market_cap(cap: f64) -> String {
        format!("${}", (cap as i64).to_formatted_string(&Locale::en))
    }
}
