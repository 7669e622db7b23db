use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use tdoc::{Document, markdown, parse, writer::Writer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use quillcheck::config::Config;
use quillcheck::document::{AnyDocument, PlainDocument, RangeableDocument};
use quillcheck::drafts::{DraftId, DraftStatus, DraftStore, DraftUpdate, FileDraftStore, NewDraft};
use quillcheck::editor::{BlockLayout, StructuredDocument};
use quillcheck::error::OracleError;
use quillcheck::interaction::{
    Decision, POPOVER_HEIGHT, POPOVER_WIDTH, PointerEvent, PointerOutcome, PopoverButton,
    PopoverLayout, Viewport, APPLY_LABEL, IGNORE_LABEL,
};
use quillcheck::oracle::{CheckDispatcher, HttpOracle, SuggestionOracle};
use quillcheck::render::{RenderOptions, RenderResult, render_marked};
use quillcheck::session::{CheckOutcome, SuggestionSession};
use quillcheck::suggestion::{SuggestionId, TextRange};
use quillcheck::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: usize = 3;

const USAGE: &str = "\
Usage: quill <file>             edit a text, Markdown or FTML file
       quill --draft <id>       edit a stored draft
       quill --new-draft <title> create a draft and print its id
       quill --list-drafts      list stored drafts
       quill --check <file>     check a file once and print the suggestions";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    Plain,
    Ftml,
    Markdown,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            Some("ftml") => DocumentFormat::Ftml,
            _ => DocumentFormat::Plain,
        }
    }
}

#[derive(Clone, Debug)]
enum DocumentSource {
    File { path: PathBuf, format: DocumentFormat },
    Draft { id: DraftId, title: String },
}

impl DocumentSource {
    fn title(&self) -> String {
        match self {
            DocumentSource::File { path, .. } => path.display().to_string(),
            DocumentSource::Draft { title, .. } => title.clone(),
        }
    }
}

fn main() -> Result<()> {
    let config = Config::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["--list-drafts"] => list_drafts(&config),
        ["--new-draft", title] => new_draft(&config, title),
        ["--check", path] => check_once(&config, Path::new(path)),
        ["--draft", id] => {
            let id: DraftId = id.parse().with_context(|| format!("invalid draft id {id}"))?;
            run(&config, Launch::Draft(id))
        }
        [path] if !path.starts_with("--") => run(&config, Launch::File(PathBuf::from(path))),
        _ => {
            eprintln!("{USAGE}");
            Ok(())
        }
    }
}

fn init_tracing(path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillcheck=info,quill=info".into()),
        )
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

fn list_drafts(config: &Config) -> Result<()> {
    let store = FileDraftStore::open(&config.drafts_dir)?;
    for draft in store.list()? {
        println!(
            "{}  {:<14}  {}  {}",
            draft.id,
            draft.status.to_string(),
            draft.updated_at.format("%Y-%m-%d %H:%M"),
            draft.title
        );
    }
    Ok(())
}

fn new_draft(config: &Config, title: &str) -> Result<()> {
    let store = FileDraftStore::open(&config.drafts_dir)?;
    let draft = store.create(NewDraft {
        title: Some(title.to_string()),
        ..NewDraft::default()
    })?;
    println!("{}", draft.id);
    Ok(())
}

fn require_oracle(config: &Config) -> Result<HttpOracle, OracleError> {
    let url = config.check_url.as_ref().ok_or(OracleError::NotConfigured)?;
    HttpOracle::new(url.clone(), config.check_timeout)
}

fn build_oracle(config: &Config) -> Result<Option<HttpOracle>> {
    match require_oracle(config) {
        Ok(oracle) => Ok(Some(oracle)),
        Err(OracleError::NotConfigured) => Ok(None),
        Err(err) => Err(err).context("failed to set up check service client"),
    }
}

/// Runs one check synchronously and prints what was anchored.
fn check_once(config: &Config, path: &Path) -> Result<()> {
    let oracle = require_oracle(config).context("set QUILL_CHECK_URL to run checks")?;
    let (document, _, _) = load_document(path)?;
    let mut session = SuggestionSession::with_config(document, config.locator_config());
    let ticket = session.begin_check();
    let result = oracle.check(&session.text());
    session.complete_check(ticket, result)?;

    for suggestion in session.suggestions() {
        println!(
            "{} {} {} {:?} -> {:?} ({:?}): {}",
            suggestion.id,
            suggestion.kind.label(),
            suggestion.range,
            suggestion.original_text,
            suggestion.replacement_text,
            suggestion.confidence,
            suggestion.explanation
        );
    }
    if let AnyDocument::Structured(document) = session.document() {
        let marked = document.marked_document(session.suggestions());
        let contents = Writer::new()
            .write_to_string(&marked)
            .context("failed to render FTML")?;
        println!("{contents}");
    }
    Ok(())
}

enum Launch {
    File(PathBuf),
    Draft(DraftId),
}

fn run(config: &Config, launch: Launch) -> Result<()> {
    init_tracing(&config.log_file)?;

    let drafts = FileDraftStore::open(&config.drafts_dir)?;
    let (document, source, initial_status) = match launch {
        Launch::File(path) => {
            let (document, format, status) = load_document(&path)?;
            (document, DocumentSource::File { path, format }, status)
        }
        Launch::Draft(id) => {
            let draft = drafts.get(id)?;
            let document = AnyDocument::from(PlainDocument::new(draft.content));
            (document, DocumentSource::Draft { id, title: draft.title }, None)
        }
    };
    let dispatcher = match build_oracle(config) {
        Ok(Some(oracle)) => Some(CheckDispatcher::new(Arc::new(oracle))),
        Ok(None) => None,
        Err(err) => {
            warn!(error = %err, "checks disabled");
            None
        }
    };
    info!(source = %source.title(), checks = dispatcher.is_some(), "starting editor");

    let session = SuggestionSession::with_config(document, config.locator_config());
    let mut app = App::new(session, source, drafts, dispatcher, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn load_document(path: &Path) -> Result<(AnyDocument, DocumentFormat, Option<String>)> {
    let format = DocumentFormat::from_path(path);
    if !path.exists() {
        let document = match format {
            DocumentFormat::Plain => AnyDocument::from(PlainDocument::new("")),
            _ => AnyDocument::from(StructuredDocument::new(Document::new())),
        };
        return Ok((document, format, Some("New document".to_string())));
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = match format {
        DocumentFormat::Plain => return Ok((PlainDocument::new(content).into(), format, None)),
        DocumentFormat::Ftml => parse(std::io::Cursor::new(content))
            .map_err(|err| -> Box<dyn std::error::Error + Send + Sync> { Box::new(err) }),
        DocumentFormat::Markdown => markdown::parse(std::io::Cursor::new(content)),
    };
    match parsed {
        Ok(doc) => Ok((StructuredDocument::new(doc).into(), format, None)),
        Err(err) => {
            let message = format!("Parse error: {err}. Starting with empty document.");
            Ok((
                StructuredDocument::new(Document::new()).into(),
                format,
                Some(message),
            ))
        }
    }
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    match width {
        0 => (1, 0),
        1..60 => (width.saturating_sub(1).max(1), 0),
        60..100 => (width.saturating_sub(4).max(1), 2),
        _ => {
            let padding = (width.saturating_sub(100) / 2 + 4).min(width.saturating_sub(1) / 2);
            (width.saturating_sub(padding * 2).max(1), padding)
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            if app.poll_checks() {
                needs_redraw = true;
            }
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

struct App {
    session: SuggestionSession<AnyDocument>,
    source: DocumentSource,
    drafts: FileDraftStore,
    dispatcher: Option<CheckDispatcher>,
    theme: Theme,
    /// Char offset of the cursor in the flattened text.
    cursor: usize,
    preferred_column: Option<u16>,
    scroll_top: usize,
    cursor_following: bool,
    should_quit: bool,
    dirty: bool,
    status_message: Option<(String, Instant)>,
    last_render: Option<RenderResult>,
    last_viewport: Option<Viewport>,
}

impl App {
    fn new(
        session: SuggestionSession<AnyDocument>,
        source: DocumentSource,
        drafts: FileDraftStore,
        dispatcher: Option<CheckDispatcher>,
        initial_status: Option<String>,
    ) -> Self {
        Self {
            session,
            source,
            drafts,
            dispatcher,
            theme: Theme::default(),
            cursor: 0,
            preferred_column: None,
            scroll_top: 0,
            cursor_following: true,
            should_quit: false,
            dirty: false,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            last_render: None,
            last_viewport: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let text_area = vertical[0];
        let status_area = vertical[1];

        let (wrap_width, left_padding) = editor_wrap_configuration(text_area.width as usize);
        let render = {
            let marked = self.session.marked();
            let blocks: &[BlockLayout] = match self.session.document() {
                AnyDocument::Structured(document) => document.blocks(),
                AnyDocument::Plain(_) => &[],
            };
            let options = RenderOptions {
                width: wrap_width,
                left_padding,
                cursor: Some(self.cursor),
                active: self.session.interaction().active(),
                blocks,
                theme: &self.theme,
            };
            render_marked(&marked, self.session.suggestions(), &options)
        };

        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line).style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        let viewport = Viewport::new(text_area, self.scroll_top);
        let popover = self.session.interaction_mut().layout_popover(
            &render.hit_regions,
            &viewport,
            (POPOVER_WIDTH, POPOVER_HEIGHT),
        );
        if let Some(popover) = popover {
            self.render_popover(frame, &popover);
        }

        self.last_render = Some(render);
        self.last_viewport = Some(viewport);
    }

    fn render_popover(&self, frame: &mut Frame, popover: &PopoverLayout) {
        let Some(suggestion) = self.session.suggestion(popover.suggestion) else {
            return;
        };
        let area = popover.area;
        if area.width < 4 || area.height < 3 {
            return;
        }

        frame.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", suggestion.kind.label()))
            .style(self.theme.popover_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let body = Rect {
            height: inner.height.saturating_sub(1),
            ..inner
        };
        let text = Text::from(vec![
            Line::from(vec![
                Span::styled(suggestion.original_text.clone(), self.theme.original_style()),
                Span::raw(" → "),
                Span::styled(
                    suggestion.replacement_text.clone(),
                    self.theme.replacement_style(),
                ),
            ]),
            Line::from(suggestion.explanation.clone()),
        ]);
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), body);

        let selected = self.session.interaction().selected_button();
        for (label, rect, button) in [
            (APPLY_LABEL, popover.apply, PopoverButton::Apply),
            (IGNORE_LABEL, popover.ignore, PopoverButton::Ignore),
        ] {
            let style = if button == selected {
                self.theme.button_selected_style()
            } else {
                self.theme.popover_style()
            };
            frame.render_widget(Paragraph::new(Span::styled(label, style)), rect);
        }
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();
        let position = self.cursor_position_text();

        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::raw(message.clone()),
            ]);
        }

        let marker = if self.dirty { "*" } else { "" };
        let word_count = self.session.text().split_whitespace().count();
        let mut spans = vec![
            Span::raw(position),
            Span::raw(" "),
            Span::styled(
                format!("{}{}", self.source.title(), marker),
                self.theme.title_style(),
            ),
            Span::raw(format!(
                ", {} words, {} suggestions",
                word_count,
                self.session.suggestions().len()
            )),
        ];
        if self.session.is_checking() {
            spans.push(Span::styled(" checking…", self.theme.pending_style()));
        }

        // Least important first; they are dropped from the front when space runs out.
        let all_shortcuts = ["Tab:Next", "^K:Check", "^S:Save", "^Q:Quit"];
        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let mut shown: Vec<&str> = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let width = if shown.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + 1 + width > terminal_width {
                break;
            }
            shown.insert(0, shortcut);
            shortcuts_width = width;
        }
        if !shown.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(1);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shown.join(" ")));
        }

        Line::from(spans)
    }

    fn cursor_position_text(&self) -> String {
        let text = self.session.text();
        let before: String = text.chars().take(self.cursor).collect();
        let line = before.matches('\n').count() + 1;
        let column = before.chars().rev().take_while(|ch| *ch != '\n').count() + 1;
        format!("{line}:{column}")
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.cursor_following
            && let Some(cursor) = render.cursor
        {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport {
                self.scroll_top = cursor.line + 1 - viewport;
            }
        }
        self.scroll_top = self.scroll_top.min(max_scroll);
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        self.cursor_following = false;
        let total = self
            .last_render
            .as_ref()
            .map(|render| render.total_lines)
            .unwrap_or(0);
        let viewport = self
            .last_viewport
            .map(|viewport| viewport.area.height as usize)
            .unwrap_or(1)
            .max(1);
        let max_scroll = total.saturating_sub(viewport) as isize;
        self.scroll_top = (self.scroll_top as isize + delta).clamp(0, max_scroll.max(0)) as usize;
    }

    fn text_len(&self) -> usize {
        self.session.document().char_len()
    }

    fn move_cursor_to(&mut self, offset: usize) {
        self.cursor = offset.min(self.text_len());
        self.cursor_following = true;
    }

    fn move_vertically(&mut self, lines: isize) {
        let Some(render) = self.last_render.as_ref() else {
            return;
        };
        let Some(position) = render.positions.get(self.cursor).copied() else {
            return;
        };
        let column = *self.preferred_column.get_or_insert(position.column);
        let target = position.line as isize + lines;
        if target < 0 {
            self.move_cursor_to(0);
            return;
        }
        if target as usize >= render.total_lines {
            let end = self.text_len();
            self.move_cursor_to(end);
            return;
        }
        if let Some(offset) = render.offset_at(target as usize, column) {
            self.move_cursor_to(offset);
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.cursor = self.cursor.min(self.text_len());
    }

    fn insert_char(&mut self, ch: char) {
        if ch == '\n' && self.session.document().is_structured() {
            self.set_status("Paragraph breaks are not supported here");
            return;
        }
        if self.session.insert_char(self.cursor, ch).is_some() {
            self.cursor += 1;
            self.mark_dirty();
        }
    }

    fn delete_backward(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let range = TextRange::new(self.cursor - 1, self.cursor);
        if self.session.delete_range(range).is_some() {
            self.cursor -= 1;
            self.mark_dirty();
        }
    }

    fn delete_forward(&mut self) {
        let range = TextRange::new(self.cursor, self.cursor + 1);
        if range.end <= self.text_len() && self.session.delete_range(range).is_some() {
            self.mark_dirty();
        }
    }

    fn start_check(&mut self) {
        let Some(dispatcher) = &self.dispatcher else {
            self.set_status(format!("{} (set QUILL_CHECK_URL)", OracleError::NotConfigured));
            return;
        };
        let ticket = self.session.begin_check();
        dispatcher.dispatch(ticket, self.session.text());
        self.set_status("Checking…");
    }

    /// Applies finished checks. Returns true when something changed.
    fn poll_checks(&mut self) -> bool {
        let mut changed = false;
        while let Some(reply) = self.dispatcher.as_ref().and_then(|d| d.try_recv()) {
            match self.session.complete_check(reply.ticket, reply.result) {
                Ok(CheckOutcome::Applied(ids)) => {
                    self.set_status(format!("{} suggestions", ids.len()));
                    self.mark_feedback_ready();
                    changed = true;
                }
                Ok(CheckOutcome::Stale) => {}
                Err(err) => {
                    self.set_status(format!("Check failed: {err}"));
                    changed = true;
                }
            }
        }
        changed
    }

    fn mark_feedback_ready(&mut self) {
        let DocumentSource::Draft { id, .. } = &self.source else {
            return;
        };
        if let Err(err) = self
            .drafts
            .update(*id, DraftUpdate::status(DraftStatus::FeedbackReady))
        {
            warn!(error = %err, "failed to update draft status");
        }
    }

    fn decide(&mut self, decision: Decision) {
        let id = decision.suggestion();
        let target = self.session.suggestion(id).map(|suggestion| {
            suggestion.range.start + suggestion.replacement_text.chars().count()
        });
        let version = self.session.document().version();
        self.session.decide(decision);
        self.after_decision(decision, id, version, target);
    }

    fn after_decision(
        &mut self,
        decision: Decision,
        id: SuggestionId,
        version: u64,
        target: Option<usize>,
    ) {
        if self.session.document().version() != version {
            if let Some(target) = target {
                self.move_cursor_to(target);
            }
            self.mark_dirty();
            self.set_status("Suggestion applied");
        } else if matches!(decision, Decision::Accept(_)) {
            self.set_status(format!("Suggestion {id} no longer matches the text"));
        }
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize)),
            MouseEventKind::ScrollDown => self.scroll_by_lines(MOUSE_SCROLL_LINES as isize),
            MouseEventKind::Down(MouseButton::Left) => self.handle_mouse_down(event),
            _ => {}
        }
    }

    fn handle_mouse_down(&mut self, event: MouseEvent) {
        let (Some(render), Some(viewport)) = (self.last_render.as_ref(), self.last_viewport) else {
            return;
        };
        let pointer = PointerEvent::new(event.column, event.row);
        let clicked = viewport
            .to_text(pointer)
            .and_then(|(line, column)| render.offset_at(line, column));
        let pending = match self.session.interaction().popover() {
            Some(popover) => self.session.suggestion(popover.suggestion).map(|suggestion| {
                suggestion.range.start + suggestion.replacement_text.chars().count()
            }),
            None => None,
        };
        let version = self.session.document().version();

        let outcome = self
            .session
            .pointer_down(pointer, &render.hit_regions, &viewport);
        match outcome {
            PointerOutcome::Decided(decision) => {
                self.after_decision(decision, decision.suggestion(), version, pending);
            }
            PointerOutcome::Ignored if self.session.interaction().popover().is_some() => {}
            PointerOutcome::Activated(_) | PointerOutcome::Dismissed | PointerOutcome::Ignored => {
                if let Some(offset) = clicked {
                    self.move_cursor_to(offset);
                    self.preferred_column = None;
                }
            }
        }
    }

    fn handle_popover_key(&mut self, code: KeyCode) -> bool {
        let Some(active) = self.session.interaction().active() else {
            return false;
        };
        match code {
            KeyCode::Enter => {
                if let Some(decision) = self.session.interaction().confirm() {
                    self.decide(decision);
                }
            }
            KeyCode::Char('a') => self.decide(Decision::Accept(active)),
            KeyCode::Char('i') | KeyCode::Delete => self.decide(Decision::Reject(active)),
            KeyCode::Left | KeyCode::Right => self.session.interaction_mut().toggle_button(),
            KeyCode::Esc => self.session.dismiss(),
            _ => return false,
        }
        true
    }

    fn select_suggestion(&mut self, forward: bool) {
        let selected = if forward {
            self.session.select_next()
        } else {
            self.session.select_previous()
        };
        match selected.and_then(|id| self.session.suggestion(id)) {
            Some(suggestion) => {
                let start = suggestion.range.start;
                self.move_cursor_to(start);
            }
            None => self.set_status("No suggestions"),
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code, modifiers)?,
            Event::Mouse(mouse) => self.handle_mouse_event(mouse),
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match code {
                KeyCode::Char('q') | KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('s') => self.save()?,
                KeyCode::Char('k') => self.start_check(),
                _ => {}
            }
            return Ok(());
        }

        if self.handle_popover_key(code) {
            return Ok(());
        }

        let vertical = matches!(code, KeyCode::Up | KeyCode::Down);
        match code {
            KeyCode::Tab => self.select_suggestion(true),
            KeyCode::BackTab => self.select_suggestion(false),
            KeyCode::Char(ch) => self.insert_char(ch),
            KeyCode::Enter => self.insert_char('\n'),
            KeyCode::Backspace => self.delete_backward(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => self.move_cursor_to(self.cursor.saturating_sub(1)),
            KeyCode::Right => self.move_cursor_to(self.cursor + 1),
            KeyCode::Home => self.move_cursor_to(0),
            KeyCode::End => {
                let end = self.text_len();
                self.move_cursor_to(end);
            }
            KeyCode::Up => self.move_vertically(-1),
            KeyCode::Down => self.move_vertically(1),
            KeyCode::PageUp | KeyCode::PageDown => {
                let page = self
                    .last_viewport
                    .map(|viewport| viewport.area.height as isize)
                    .unwrap_or(1)
                    .max(1);
                let delta = if code == KeyCode::PageUp { -page } else { page };
                self.move_vertically(delta);
            }
            _ => {}
        }
        if !vertical && !matches!(code, KeyCode::PageUp | KeyCode::PageDown) {
            self.preferred_column = None;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        match (&self.source, self.session.document()) {
            (DocumentSource::Draft { id, .. }, document) => {
                self.drafts
                    .update(*id, DraftUpdate::content(document.text()))
                    .context("failed to save draft")?;
            }
            (DocumentSource::File { path, .. }, AnyDocument::Plain(document)) => {
                fs::write(path, document.as_str())
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            (DocumentSource::File { path, format }, AnyDocument::Structured(document)) => {
                let contents = match format {
                    DocumentFormat::Markdown => {
                        let mut contents = Vec::new();
                        markdown::write(&mut contents, document.document())
                            .context("failed to render Markdown")?;
                        contents
                    }
                    DocumentFormat::Ftml | DocumentFormat::Plain => Writer::new()
                        .write_to_string(document.document())
                        .context("failed to render FTML")?
                        .into_bytes(),
                };
                fs::write(path, contents)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }

        info!(source = %self.source.title(), "saved");
        self.dirty = false;
        self.set_status("Saved");
        Ok(())
    }
}
