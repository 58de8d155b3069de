use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pokedex::acquisition::lock;
use pokedex::{project_with, DisplayCard, RecordStore, StatBar, StatKind, TagColor, ViewStatus};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Minimum card width in terminal cells
const CARD_WIDTH: u16 = 30;
/// Border + id line + types line + four stat lines
const CARD_HEIGHT: u16 = 8;
/// "SP.ATK  999 " before the bar
const STAT_LABEL_WIDTH: u16 = 12;

pub type RefreshTrigger = Box<dyn Fn()>;

pub struct App {
    store: Arc<Mutex<RecordStore>>,
    artwork_base: String,
    on_refresh: RefreshTrigger,
    pub query: String,
    pub cards: Vec<DisplayCard>,
    pub total: usize,
    pub loading: bool,
    pub selected: usize,
    pub columns: usize,
    pub scroll_row: usize,
    pub show_detail: bool,
    synced: Option<(u64, bool)>,
}

impl App {
    pub fn new(store: Arc<Mutex<RecordStore>>, artwork_base: &str, on_refresh: RefreshTrigger) -> Self {
        let mut app = Self {
            store,
            artwork_base: artwork_base.to_string(),
            on_refresh,
            query: String::new(),
            cards: Vec::new(),
            total: 0,
            loading: false,
            selected: 0,
            columns: 1,
            scroll_row: 0,
            show_detail: false,
            synced: None,
        };
        app.sync();
        app
    }

    /// Pick up new records or a changed loading flag from the store
    pub fn sync(&mut self) {
        let key = {
            let store = lock(&self.store);
            (store.generation(), store.is_loading())
        };
        if self.synced != Some(key) {
            self.synced = Some(key);
            self.reproject();
        }
    }

    fn reproject(&mut self) {
        let store = lock(&self.store);
        self.cards = project_with(store.records(), &self.query, &self.artwork_base);
        self.total = store.records().len();
        self.loading = store.is_loading();
        drop(store);

        if self.selected >= self.cards.len() {
            self.selected = self.cards.len().saturating_sub(1);
        }
    }

    pub fn request_refresh(&mut self) {
        (self.on_refresh)();
        self.sync();
    }

    pub fn status(&self) -> ViewStatus {
        ViewStatus::of(self.loading, &self.cards)
    }

    pub fn selected_card(&self) -> Option<&DisplayCard> {
        self.cards.get(self.selected)
    }

    // ========================================================================
    // SEARCH
    // ========================================================================

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.on_query_changed();
    }

    pub fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.on_query_changed();
        }
    }

    pub fn clear_query(&mut self) {
        if !self.query.is_empty() {
            self.query.clear();
            self.on_query_changed();
        }
    }

    fn on_query_changed(&mut self) {
        self.selected = 0;
        self.scroll_row = 0;
        self.reproject();
    }

    // ========================================================================
    // GRID NAVIGATION
    // ========================================================================

    fn move_by(&mut self, delta: isize) {
        let len = self.cards.len();
        if len == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
    }

    pub fn next(&mut self) {
        self.move_by(1);
    }

    pub fn previous(&mut self) {
        self.move_by(-1);
    }

    pub fn row_down(&mut self) {
        self.move_by(self.columns as isize);
    }

    pub fn row_up(&mut self) {
        self.move_by(-(self.columns as isize));
    }

    pub fn page_down(&mut self, rows: usize) {
        self.move_by((self.columns * rows.max(1)) as isize);
    }

    pub fn page_up(&mut self, rows: usize) {
        self.move_by(-((self.columns * rows.max(1)) as isize));
    }

    pub fn home(&mut self) {
        self.selected = 0;
    }

    pub fn end(&mut self) {
        self.selected = self.cards.len().saturating_sub(1);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    /// Keep the selected card's row inside the visible window
    fn scroll_to_selection(&mut self, visible_rows: usize) {
        let row = self.selected / self.columns.max(1);
        let visible_rows = visible_rows.max(1);
        if row < self.scroll_row {
            self.scroll_row = row;
        } else if row >= self.scroll_row + visible_rows {
            self.scroll_row = row + 1 - visible_rows;
        }
    }

    /// Returns false when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent, visible_rows: usize) -> bool {
        if key.kind == KeyEventKind::Release {
            return true;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return false,
            KeyCode::Char('r') if ctrl => self.request_refresh(),
            KeyCode::F(5) => self.request_refresh(),
            KeyCode::Esc => {
                if self.query.is_empty() {
                    return false;
                }
                self.clear_query();
            }
            KeyCode::Enter => self.toggle_detail(),
            KeyCode::Backspace => self.pop_char(),
            KeyCode::Right => self.next(),
            KeyCode::Left => self.previous(),
            KeyCode::Down => self.row_down(),
            KeyCode::Up => self.row_up(),
            KeyCode::PageDown => self.page_down(visible_rows),
            KeyCode::PageUp => self.page_up(visible_rows),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Char(c) if !ctrl => self.push_char(c),
            _ => {}
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
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

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut visible_rows = 1;
    loop {
        app.sync();
        terminal.draw(|f| visible_rows = ui(f, app))?;

        // Poll so background refreshes show up without a key press
        if !event::poll(Duration::from_millis(150))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if !app.handle_key(key, visible_rows) {
                return Ok(());
            }
        }
    }
}

/// Draws the frame and returns how many card rows fit in the grid
fn ui(f: &mut Frame, app: &mut App) -> usize {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search field
            Constraint::Min(0),    // Card grid
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_search(f, chunks[0], app);

    let visible_rows = if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        let rows = render_grid(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
        rows
    } else {
        render_grid(f, chunks[1], app)
    };

    render_status_bar(f, chunks[2], app);
    visible_rows
}

fn render_search(f: &mut Frame, area: Rect, app: &App) {
    let line = Line::from(vec![
        Span::styled(
            " Pokédex ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ 🔍 "),
        if app.query.is_empty() {
            Span::styled("Search creatures...", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(app.query.clone(), Style::default().fg(Color::White))
        },
        Span::styled("▏", Style::default().fg(Color::Cyan)),
    ]);

    let search = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(search, area);
}

fn render_grid(f: &mut Frame, area: Rect, app: &mut App) -> usize {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" Creatures ({}/{}) ", app.cards.len(), app.total));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (columns, visible_rows) = grid_shape(inner);
    app.columns = columns;

    match app.status() {
        ViewStatus::Loading => {
            render_message(f, inner, "Loading creatures...", Color::Yellow);
            return visible_rows;
        }
        ViewStatus::NoResults => {
            render_message(f, inner, "No creatures found", Color::DarkGray);
            return visible_rows;
        }
        ViewStatus::Ready => {}
    }

    app.scroll_to_selection(visible_rows);
    let card_width = inner.width / columns as u16;

    let first = app.scroll_row * columns;
    let last = (first + visible_rows * columns).min(app.cards.len());
    for (offset, card) in app.cards[first..last].iter().enumerate() {
        let row = (offset / columns) as u16;
        let col = (offset % columns) as u16;
        let cell = Rect {
            x: inner.x + col * card_width,
            y: inner.y + row * CARD_HEIGHT,
            width: card_width,
            height: CARD_HEIGHT,
        }
        .intersection(inner);
        render_card(f, cell, card, first + offset == app.selected);
    }

    visible_rows
}

/// Columns and rows of cards that fit into `area`
fn grid_shape(area: Rect) -> (usize, usize) {
    let columns = (area.width / CARD_WIDTH).max(1) as usize;
    let rows = (area.height / CARD_HEIGHT).max(1) as usize;
    (columns, rows)
}

fn render_message(f: &mut Frame, area: Rect, text: &str, color: Color) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let message = Paragraph::new(Span::styled(
        text.to_string(),
        Style::default().fg(color).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);

    f.render_widget(message, vertical[1]);
}

fn render_card(f: &mut Frame, area: Rect, card: &DisplayCard, selected: bool) {
    let border = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(
            format!(" {} ", capitalize(&card.name)),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    let bar_cols = inner.width.saturating_sub(STAT_LABEL_WIDTH);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("#{:03}", card.id),
            Style::default().fg(Color::DarkGray),
        )),
        type_tags(card),
    ];
    lines.extend(card.stats.iter().map(|bar| stat_line(bar, bar_cols)));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn type_tags(card: &DisplayCard) -> Line<'static> {
    let mut spans = Vec::with_capacity(card.types.len() * 2);
    for (i, tag) in card.types.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            format!(" {} ", tag.name),
            Style::default()
                .fg(Color::White)
                .bg(tag_color(&tag.color))
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn tag_color(color: &TagColor) -> Color {
    let [r, g, b] = color.rgb;
    Color::Rgb(r, g, b)
}

fn stat_line(bar: &StatBar, bar_cols: u16) -> Line<'static> {
    let filled = filled_cells(bar.width, bar_cols);
    Line::from(vec![
        Span::styled(
            format!("{:<7}", bar.kind.label()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(format!("{:>4} ", bar.value), Style::default().fg(Color::White)),
        Span::styled("█".repeat(filled), Style::default().fg(Color::Blue)),
        Span::styled(
            "░".repeat(bar_cols as usize - filled),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

/// Cells to fill for a bar `width_pct` percent wide across `cols` cells
fn filled_cells(width_pct: u8, cols: u16) -> usize {
    let pct = width_pct.min(100) as usize;
    (cols as usize * pct + 50) / 100
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" Showing: {}/{} ", app.cards.len(), app.total),
        Style::default().fg(Color::Cyan),
    )];

    status_spans.push(Span::raw(" | "));
    if app.loading {
        status_spans.push(Span::styled(
            "⟳ Loading...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        status_spans.push(Span::styled("F5", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Refresh"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Type", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Search | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Details | "));
    status_spans.push(Span::styled("←↑↓→", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Clear/Quit"));

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Creature Details ");

    let card = match app.selected_card() {
        Some(c) => c,
        None => {
            f.render_widget(Paragraph::new("No creature selected").block(block), area);
            return;
        }
    };

    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let bar_cols = block.inner(area).width.saturating_sub(STAT_LABEL_WIDTH + 2);

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Name: ", heading),
            Span::raw(capitalize(&card.name)),
        ]),
        Line::from(vec![
            Span::styled("  Number: ", heading),
            Span::raw(format!("#{:03}", card.id)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  Types: ", heading)]),
        {
            let mut tags = type_tags(card);
            tags.spans.insert(0, Span::raw("  "));
            tags
        },
        Line::from(""),
        Line::from("  ─────────────────────────────"),
        Line::from(vec![Span::styled(
            "  BASE STATS",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
    ];

    for kind in StatKind::ALL {
        let mut line = stat_line(card.stat(kind), bar_cols);
        line.spans.insert(0, Span::raw("  "));
        content.push(line);
    }

    content.extend([
        Line::from(""),
        Line::from("  ─────────────────────────────"),
        Line::from(vec![Span::styled("  Artwork: ", heading)]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                card.artwork_url.clone(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ]);

    let detail_panel = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(block);

    f.render_widget(detail_panel, area);
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokedex::{BatchOutcome, NamedRef, OverlapPolicy, Record, RefreshStart, StatSlot, TypeSlot};
    use std::cell::Cell;
    use std::rc::Rc;

    fn record(id: u32, name: &str) -> Record {
        Record {
            id,
            name: name.to_string(),
            types: vec![TypeSlot {
                kind: NamedRef {
                    name: "electric".to_string(),
                },
            }],
            stats: vec![StatSlot { base_stat: 35 }, StatSlot { base_stat: 155 }],
        }
    }

    fn loaded_store(names: &[&str]) -> Arc<Mutex<RecordStore>> {
        let mut store = RecordStore::new(OverlapPolicy::Ignore);
        if let RefreshStart::Started(ticket) = store.begin_refresh() {
            let records = names
                .iter()
                .enumerate()
                .map(|(i, name)| record(i as u32 + 1, name))
                .collect();
            let _ = store.finish(
                ticket,
                Ok(BatchOutcome {
                    records,
                    failures: Vec::new(),
                }),
            );
        }
        Arc::new(Mutex::new(store))
    }

    fn app(names: &[&str]) -> App {
        App::new(loaded_store(names), "http://art", Box::new(|| {}))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_filters_live() {
        let mut app = app(&["pikachu", "raichu", "pichu", "bulbasaur"]);
        assert_eq!(app.cards.len(), 4);

        for c in "chu".chars() {
            assert!(app.handle_key(key(KeyCode::Char(c)), 3));
        }
        assert_eq!(app.query, "chu");
        assert_eq!(app.cards.len(), 3);

        app.handle_key(key(KeyCode::Char('X')), 3);
        assert_eq!(app.status(), ViewStatus::NoResults);

        app.handle_key(key(KeyCode::Backspace), 3);
        assert_eq!(app.cards.len(), 3);
    }

    #[test]
    fn test_escape_clears_then_quits() {
        let mut app = app(&["pikachu"]);
        app.push_char('p');

        assert!(app.handle_key(key(KeyCode::Esc), 3));
        assert!(app.query.is_empty());
        assert!(!app.handle_key(key(KeyCode::Esc), 3));
    }

    #[test]
    fn test_refresh_key_invokes_trigger() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut app = App::new(
            loaded_store(&["pikachu"]),
            "http://art",
            Box::new(move || counter.set(counter.get() + 1)),
        );

        app.handle_key(key(KeyCode::F(5)), 3);
        app.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL), 3);

        assert_eq!(calls.get(), 2);
        assert!(app.query.is_empty());
    }

    #[test]
    fn test_grid_navigation_stays_in_bounds() {
        let mut app = app(&["a", "b", "c", "d", "e"]);
        app.columns = 2;

        app.row_down();
        assert_eq!(app.selected, 2);
        app.row_down();
        app.row_down();
        assert_eq!(app.selected, 4);
        app.next();
        assert_eq!(app.selected, 4);
        app.home();
        app.previous();
        assert_eq!(app.selected, 0);
        app.end();
        assert_eq!(app.selected, 4);
    }

    #[test]
    fn test_scroll_follows_selection() {
        let mut app = app(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        app.columns = 2;
        app.selected = 7;

        app.scroll_to_selection(2);
        assert_eq!(app.scroll_row, 2);

        app.selected = 0;
        app.scroll_to_selection(2);
        assert_eq!(app.scroll_row, 0);
    }

    #[test]
    fn test_sync_picks_up_loading_state() {
        let store = Arc::new(Mutex::new(RecordStore::default()));
        let mut app = App::new(store.clone(), "http://art", Box::new(|| {}));
        assert_eq!(app.status(), ViewStatus::NoResults);

        let _ticket = lock(&store).begin_refresh();
        app.sync();
        assert_eq!(app.status(), ViewStatus::Loading);
    }

    #[test]
    fn test_filled_cells() {
        assert_eq!(filled_cells(100, 20), 20);
        assert_eq!(filled_cells(50, 20), 10);
        assert_eq!(filled_cells(0, 20), 0);
        assert_eq!(filled_cells(100, 0), 0);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("pikachu"), "Pikachu");
        assert_eq!(capitalize(""), "");
    }
}
