use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use serde::Serialize;
use sidenote_config::Config;
use sidenote_engine::{
    Cmd, CorrectionMenu, Document, GrammarOverlay, Linter, RuleLinter,
    io::{self, ExportFormat},
    lint::{LintScheduler, translate_diagnostics},
    projection::build_projection,
};
use std::{
    env, fs,
    io::stdout,
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

struct App {
    path: PathBuf,
    doc: Document,
    overlay: GrammarOverlay,
    linter: RuleLinter,
    menu: CorrectionMenu,
    menu_state: ListState,
    config: Config,
    status: String,
    dirty: bool,
}

impl App {
    fn new(path: PathBuf, config: Config) -> Result<Self> {
        let content = if path.exists() {
            fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?
        } else {
            String::new()
        };
        let doc = Document::from_bytes(content.as_bytes())
            .with_context(|| format!("failed to open {}", path.display()))?;

        let mut app = Self {
            path,
            doc,
            overlay: GrammarOverlay::new(LintScheduler::new(config.lint_delay())),
            linter: RuleLinter::new(),
            menu: CorrectionMenu::new(),
            menu_state: ListState::default(),
            config,
            status: "Ctrl+S save | Ctrl+E export | Ctrl+G suggest | Ctrl+Q quit".to_string(),
            dirty: false,
        };

        // Analyze the freshly opened file without waiting for a keystroke
        let opened = Instant::now() - app.config.lint_delay();
        app.overlay.note_edit(opened);
        app.overlay
            .run_cycle(&mut app.doc, &mut app.linter, Instant::now());

        Ok(app)
    }

    fn cursor(&self) -> usize {
        self.doc.selection().start
    }

    fn set_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.doc.len());
        self.doc.set_selection(pos..pos);
    }

    fn edit(&mut self, cmd: Cmd) {
        self.doc.apply(cmd);
        self.overlay.note_edit(Instant::now());
        self.dirty = true;
    }

    fn insert_at_cursor(&mut self, text: &str) {
        self.edit(Cmd::InsertText {
            at: self.cursor(),
            text: text.to_string(),
        });
    }

    fn backspace(&mut self) {
        let cursor = self.cursor();
        if cursor == 0 {
            return;
        }
        let start = prev_char_boundary(&self.doc.text(), cursor);
        self.edit(Cmd::DeleteRange {
            range: start..cursor,
        });
        self.set_cursor(start);
    }

    fn delete_forward(&mut self) {
        let cursor = self.cursor();
        if cursor >= self.doc.len() {
            return;
        }
        let end = next_char_boundary(&self.doc.text(), cursor);
        self.edit(Cmd::DeleteRange { range: cursor..end });
    }

    fn move_left(&mut self) {
        let cursor = self.cursor();
        if cursor > 0 {
            self.set_cursor(prev_char_boundary(&self.doc.text(), cursor));
        }
    }

    fn move_right(&mut self) {
        let cursor = self.cursor();
        if cursor < self.doc.len() {
            self.set_cursor(next_char_boundary(&self.doc.text(), cursor));
        }
    }

    fn move_vertically(&mut self, down: bool) {
        let text = self.doc.text();
        let cursor = self.cursor();
        let line_start = text[..cursor].rfind('\n').map_or(0, |i| i + 1);
        let column = cursor - line_start;

        let target_start = if down {
            match text[cursor..].find('\n') {
                Some(i) => cursor + i + 1,
                None => return,
            }
        } else {
            if line_start == 0 {
                return;
            }
            text[..line_start - 1].rfind('\n').map_or(0, |i| i + 1)
        };

        let target_end = text[target_start..]
            .find('\n')
            .map_or(text.len(), |i| target_start + i);
        let mut pos = (target_start + column).min(target_end);
        while !text.is_char_boundary(pos) {
            pos -= 1;
        }
        self.set_cursor(pos);
    }

    fn save(&mut self) {
        match fs::write(&self.path, self.doc.text()) {
            Ok(()) => {
                self.dirty = false;
                self.status = format!("Saved {}", self.path.display());
            }
            Err(e) => {
                log::warn!("failed to save {}: {e}", self.path.display());
                self.status = format!("Save failed: {e}");
            }
        }
    }

    fn export(&mut self, format: ExportFormat) {
        if let Err(e) = fs::create_dir_all(&self.config.export_path) {
            log::warn!(
                "failed to create export directory {}: {e}",
                self.config.export_path.display()
            );
            self.status = format!("Export failed: {e}");
            return;
        }
        match io::export_document(&self.doc, &self.config.export_path, format) {
            Ok(path) => self.status = format!("Exported to {}", path.display()),
            Err(e) => {
                log::warn!("export failed: {e}");
                self.status = format!("Export failed: {e}");
            }
        }
    }

    fn open_menu(&mut self) {
        if self.menu.open_at(&self.doc, self.cursor()) {
            self.menu_state.select(Some(0));
        } else {
            self.status = "No suggestion at cursor".to_string();
        }
    }

    fn menu_move(&mut self, down: bool) {
        let Some(annotation) = self.menu.visible() else {
            return;
        };
        let count = annotation.diagnostic.replacements.len();
        if count == 0 {
            return;
        }
        let current = self.menu_state.selected().unwrap_or(0);
        let next = if down {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        self.menu_state.select(Some(next));
    }

    fn menu_choose(&mut self) {
        let index = self.menu_state.selected().unwrap_or(0);
        if self.menu.choose(&mut self.doc, index).is_some() {
            self.overlay.note_edit(Instant::now());
            self.dirty = true;
            self.status = "Correction applied".to_string();
        }
    }
}

fn prev_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos - 1;
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos + 1;
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    match args.as_slice() {
        [_, flag, path] if flag == "--check" => check(Path::new(path)),
        [_, path] if path != "--check" => {
            let config = match Config::load() {
                Ok(Some(config)) => config,
                Ok(None) => Config::default(),
                Err(e) => {
                    eprintln!("Error: failed to load config file: {e}");
                    process::exit(1);
                }
            };
            run_editor(PathBuf::from(path), config)
        }
        _ => {
            eprintln!("Usage: {} [--check] <markdown-file>", args[0]);
            process::exit(1);
        }
    }
}

#[derive(Serialize)]
struct CheckFinding {
    start: usize,
    end: usize,
    text: String,
    message: String,
    replacements: Vec<String>,
}

#[derive(Serialize)]
struct CheckReport {
    path: String,
    diagnostics: Vec<CheckFinding>,
}

/// Headless mode: analyze one file and print the findings as JSON.
/// Exits non-zero when there are findings, for use in scripts.
fn check(path: &Path) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let doc = Document::from_bytes(content.as_bytes())
        .with_context(|| format!("failed to open {}", path.display()))?;

    let projection = build_projection(&doc);
    let diagnostics = RuleLinter::new()
        .lint(&projection.text)
        .map_err(|e| anyhow::anyhow!("analysis failed: {e}"))?;

    let report = CheckReport {
        path: path.display().to_string(),
        diagnostics: translate_diagnostics(&projection, diagnostics)
            .into_iter()
            .map(|(range, diagnostic)| CheckFinding {
                start: range.start,
                end: range.end,
                text: doc.text()[range].to_string(),
                message: diagnostic.message,
                replacements: diagnostic.replacements,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.diagnostics.is_empty() {
        process::exit(1);
    }
    Ok(())
}

fn run_editor(path: PathBuf, config: Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(path, config)?;
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: std::error::Error + Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Wake up for the next scheduled analysis run even with no input
        let timeout = app
            .overlay
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(250));

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
        {
            if handle_key(app, key) {
                return Ok(());
            }
        }

        app.overlay
            .run_cycle(&mut app.doc, &mut app.linter, Instant::now());
    }
}

/// Returns true when the app should quit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.menu.is_visible() {
        match key.code {
            KeyCode::Up => app.menu_move(false),
            KeyCode::Down => app.menu_move(true),
            KeyCode::Enter => app.menu_choose(),
            _ => app.menu.dismiss(),
        }
        return false;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('s') => app.save(),
            KeyCode::Char('e') => app.export(ExportFormat::Markdown),
            KeyCode::Char('t') => app.export(ExportFormat::PlainText),
            KeyCode::Char('g') => app.open_menu(),
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char(c) => app.insert_at_cursor(&c.to_string()),
        KeyCode::Enter => app.insert_at_cursor("\n"),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete_forward(),
        KeyCode::Left => app.move_left(),
        KeyCode::Right => app.move_right(),
        KeyCode::Up => app.move_vertically(false),
        KeyCode::Down => app.move_vertically(true),
        KeyCode::Home => {
            let text = app.doc.text();
            let cursor = app.cursor();
            let line_start = text[..cursor].rfind('\n').map_or(0, |i| i + 1);
            app.set_cursor(line_start);
        }
        KeyCode::End => {
            let text = app.doc.text();
            let cursor = app.cursor();
            let line_end = text[cursor..].find('\n').map_or(text.len(), |i| cursor + i);
            app.set_cursor(line_end);
        }
        _ => {}
    }

    false
}

fn ui(f: &mut Frame, app: &mut App) {
    let menu_height = app
        .menu
        .visible()
        .map(|a| a.diagnostic.replacements.len().max(1) as u16 + 2)
        .unwrap_or(0);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(menu_height),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = format!(
        "{}{}",
        app.path.display(),
        if app.dirty { " *" } else { "" }
    );
    let editor = Paragraph::new(styled_lines(&app.doc, app.cursor()))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(editor, chunks[0]);

    if let Some(annotation) = app.menu.visible() {
        let items: Vec<ListItem> = if annotation.diagnostic.replacements.is_empty() {
            vec![ListItem::new("(no replacements)")]
        } else {
            annotation
                .diagnostic
                .replacements
                .iter()
                .map(|r| ListItem::new(r.clone()))
                .collect()
        };
        let menu = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(annotation.diagnostic.message.clone()),
            )
            .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
        f.render_stateful_widget(menu, chunks[1], &mut app.menu_state);
    }

    let status = Paragraph::new(Line::from(Span::raw(app.status.clone())));
    f.render_widget(status, chunks[2]);
}

/// Render the document as styled lines: annotated spans underlined in red,
/// the character under the cursor reversed
fn styled_lines(doc: &Document, cursor: usize) -> Vec<Line<'static>> {
    let text = doc.text();
    let annotated = Style::default()
        .fg(Color::Red)
        .add_modifier(Modifier::UNDERLINED);
    let reversed = Style::default().add_modifier(Modifier::REVERSED);

    let mut lines = Vec::new();
    let mut line_start = 0;

    for raw_line in text.split('\n') {
        let line_end = line_start + raw_line.len();

        // Segment boundaries: annotation edges and the cursor position
        let mut cuts = vec![line_start, line_end];
        for annotation in doc.annotations().iter() {
            for point in [annotation.range.start, annotation.range.end] {
                if point > line_start && point < line_end {
                    cuts.push(point);
                }
            }
        }
        if cursor > line_start && cursor < line_end {
            cuts.push(cursor);
            let after = next_char_boundary(&text, cursor);
            if after < line_end {
                cuts.push(after);
            }
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut spans = Vec::new();
        for pair in cuts.windows(2) {
            let (seg_start, seg_end) = (pair[0], pair[1]);
            let mut style = Style::default();
            if doc.annotations().find_at(seg_start).is_some() {
                style = annotated;
            }
            if seg_start == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(text[seg_start..seg_end].to_string(), style));
        }

        // Cursor sitting at the end of this line
        if cursor == line_end && (line_end < text.len() || cursor == text.len()) {
            spans.push(Span::styled(" ".to_string(), reversed));
        }

        lines.push(Line::from(spans));
        line_start = line_end + 1;
        if line_start > text.len() {
            break;
        }
    }

    lines
}
