use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use spanview_config::Config;
use spanview_engine::model::demo;
use spanview_engine::{Document, NodeId, Span as ByteSpan, io};
use std::{env, io::stdout, path::PathBuf, process};

enum Mode {
    View,
    Rename { declaration: NodeId, input: String },
}

struct App {
    doc: Document,
    /// Cursor as a byte offset into the listing.
    cursor: usize,
    /// Byte offset of the start of each line, recomputed after edits.
    line_starts: Vec<usize>,
    mode: Mode,
    status: String,
}

impl App {
    fn new(doc: Document) -> Self {
        let mut app = Self {
            doc,
            cursor: 0,
            line_starts: Vec::new(),
            mode: Mode::View,
            status: String::new(),
        };
        app.reindex_lines();
        app
    }

    fn reindex_lines(&mut self) {
        let text = self.doc.text();
        self.line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .filter(|&start| start < text.len() || start == 0)
            .collect();
        self.cursor = self.cursor.min(self.doc.len().saturating_sub(1));
    }

    fn line_col(&self) -> (usize, usize) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= self.cursor)
            .saturating_sub(1);
        (line, self.cursor - self.line_starts[line])
    }

    fn line_span(&self, line: usize) -> ByteSpan {
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.doc.len());
        ByteSpan::new(start, end)
    }

    fn move_horizontal(&mut self, delta: isize) {
        let next = self.cursor.saturating_add_signed(delta);
        self.cursor = next.min(self.doc.len().saturating_sub(1));
    }

    fn move_vertical(&mut self, delta: isize) {
        let (line, col) = self.line_col();
        let Some(target) = line.checked_add_signed(delta) else {
            return;
        };
        if target >= self.line_starts.len() {
            return;
        }
        let span = self.line_span(target);
        self.cursor = (span.start + col).min(span.end.saturating_sub(1)).max(span.start);
    }

    /// Declaration the cursor refers to: an identifier's resolved
    /// declaration, or the declaration node itself when the cursor is on one.
    fn declaration_under_cursor(&self) -> Option<NodeId> {
        let node = self.doc.leaf_at(self.cursor)?;
        if let Some(declaration) = self.doc.model().declaration_of_identifier(node) {
            return Some(declaration);
        }
        self.doc.model().is_declaration(node).then_some(node)
    }

    /// Spans to highlight: everything produced by the instruction under the
    /// cursor.
    fn highlight_spans(&self) -> Vec<ByteSpan> {
        let Some(node) = self.doc.leaf_at(self.cursor) else {
            return Vec::new();
        };
        match self.doc.origin(node).instruction {
            Some(instruction) => self.doc.ranges_for_instruction(instruction),
            None => Vec::new(),
        }
    }

    fn status_line(&self) -> String {
        let Some(node) = self.doc.leaf_at(self.cursor) else {
            return format!("offset {} | (untracked)", self.cursor);
        };
        let origin = self.doc.origin(node);
        let mut status = format!("offset {}", self.cursor);
        match origin.instruction {
            Some(instruction) => {
                let instr = self.doc.model().instruction(instruction);
                status.push_str(&format!(" | {:#010x} {}", instr.address, instr.text));
            }
            None => status.push_str(" | no machine origin"),
        }
        if let Some(declaration) = self.declaration_under_cursor() {
            let name = self.doc.model().name_of(declaration).unwrap_or("?");
            let uses = self.doc.uses(declaration).len();
            status.push_str(&format!(" | {name}: {uses} use(s)"));
        }
        status
    }

    /// Jump to what the identifier under the cursor declares or defines:
    /// labels go to their label statement, functions to their definition.
    fn goto_target(&mut self) {
        let Some(declaration) = self.declaration_under_cursor() else {
            self.status = "nothing to navigate to here".to_string();
            return;
        };
        let target = self
            .doc
            .label_statement(declaration)
            .or_else(|| self.doc.function_definition(declaration))
            .or(Some(declaration));
        if let Some(span) = target.and_then(|t| self.doc.range_of(t)) {
            self.cursor = span.start;
            self.status = String::new();
        } else {
            self.status = "target is no longer in the listing".to_string();
        }
    }

    fn begin_rename(&mut self) {
        match self.declaration_under_cursor() {
            Some(declaration) => {
                if self.doc.uses(declaration).is_empty() {
                    self.status = "declaration has no recorded uses".to_string();
                    return;
                }
                self.mode = Mode::Rename {
                    declaration,
                    input: String::new(),
                };
            }
            None => self.status = "place the cursor on an identifier to rename".to_string(),
        }
    }

    fn commit_rename(&mut self) {
        if let Mode::Rename { declaration, input } = &self.mode {
            let declaration = *declaration;
            let new_name = input.clone();
            self.mode = Mode::View;
            if new_name.is_empty() {
                self.status = "rename cancelled".to_string();
                return;
            }
            match self.doc.rename(declaration, &new_name) {
                Ok(patch) => {
                    self.status = format!(
                        "renamed {} occurrence(s), version {}",
                        patch.changed.len(),
                        patch.version
                    );
                    self.reindex_lines();
                }
                Err(e) => self.status = format!("rename failed: {e}"),
            }
        }
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let doc = if args.len() == 2 {
        load_document(&PathBuf::from(&args[1]))
    } else if args.len() == 1 {
        match Config::load() {
            Ok(Some(config)) => load_document(&config.listing_path),
            Ok(None) => {
                // No config: fall back to the built-in demo listing.
                Document::new(demo::demo_program()).map_err(Into::into)
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} [model-file.json]", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [model-file.json]", args[0]);
        process::exit(1);
    };

    let doc = match doc {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: failed to open listing: {e}");
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(doc);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn load_document(path: &PathBuf) -> Result<Document> {
    let model = io::load_model(path)?;
    Ok(Document::new(model)?)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match &mut app.mode {
                Mode::View => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Left | KeyCode::Char('h') => app.move_horizontal(-1),
                    KeyCode::Right | KeyCode::Char('l') => app.move_horizontal(1),
                    KeyCode::Up | KeyCode::Char('k') => app.move_vertical(-1),
                    KeyCode::Down | KeyCode::Char('j') => app.move_vertical(1),
                    KeyCode::Char('g') | KeyCode::Enter => app.goto_target(),
                    KeyCode::Char('r') => app.begin_rename(),
                    _ => {}
                },
                Mode::Rename { input, .. } => match key.code {
                    KeyCode::Esc => {
                        app.mode = Mode::View;
                        app.status = "rename cancelled".to_string();
                    }
                    KeyCode::Enter => app.commit_rename(),
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) if c.is_ascii_alphanumeric() || c == '_' => {
                        input.push(c);
                    }
                    _ => {}
                },
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    let highlights = app.highlight_spans();
    let (cursor_line, _) = app.line_col();

    let mut lines = Vec::with_capacity(app.line_starts.len());
    for line in 0..app.line_starts.len() {
        let span = app.line_span(line);
        lines.push(styled_line(app, span, &highlights, line == cursor_line));
    }

    let listing = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Listing"));
    f.render_widget(listing, chunks[0]);

    let footer = match &app.mode {
        Mode::Rename { input, .. } => format!("rename to: {input}_  (Enter: apply, Esc: cancel)"),
        Mode::View if !app.status.is_empty() => app.status.clone(),
        Mode::View => format!(
            "{} | q: quit | hjkl: move | g: goto | r: rename",
            app.status_line()
        ),
    };
    let help = Paragraph::new(Line::from(footer))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(help, chunks[1]);
}

/// One listing line, cut at highlight boundaries so instruction spans show
/// up styled. The newline itself is never styled.
fn styled_line(app: &App, line: ByteSpan, highlights: &[ByteSpan], on_cursor_line: bool) -> Line<'static> {
    let highlight = Style::default().bg(Color::Yellow).fg(Color::Black);
    let base = if on_cursor_line {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    // Boundaries of all highlight spans crossing this line.
    let mut cuts = vec![line.start, line.end];
    for h in highlights {
        if h.intersects(line) {
            cuts.push(h.start.max(line.start));
            cuts.push(h.end.min(line.end));
        }
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut spans = Vec::new();
    for pair in cuts.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let text = app
            .doc
            .get_text(start..end)
            .trim_end_matches('\n')
            .to_string();
        if text.is_empty() {
            continue;
        }
        let highlighted = highlights.iter().any(|h| h.contains(start));
        spans.push(Span::styled(text, if highlighted { highlight } else { base }));
    }
    if spans.is_empty() {
        spans.push(Span::styled(String::new(), base));
    }
    Line::from(spans)
}
