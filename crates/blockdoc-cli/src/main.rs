use anyhow::Result;
use blockdoc_config::Config;
use blockdoc_engine::models::{BlockType, ChangeSet, NodeKind};
use blockdoc_engine::{
    Document, Editor, ExecuteOptions, Executed, NodeId, PARAGRAPH, Schema, Selection, io,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    cell::RefCell,
    env, fs,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    rc::Rc,
};

struct App {
    document_path: PathBuf,
    editor: Editor,
    blocks: Vec<NodeId>,
    list_state: ListState,
    /// Block index where the selection started; `None` for a caret
    anchor: Option<usize>,
    last_change: Rc<RefCell<Option<ChangeSet>>>,
    message: String,
    dirty: bool,
}

impl App {
    fn new(document_path: PathBuf, document: Document) -> Result<Self> {
        let blocks = document.blocks();
        let mut editor = Editor::new(document);

        let last_change = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&last_change);
        editor.subscribe(move |changes: &ChangeSet| {
            *sink.borrow_mut() = Some(changes.clone());
        });

        let mut app = Self {
            document_path,
            editor,
            blocks,
            list_state: ListState::default(),
            anchor: None,
            last_change,
            message: String::new(),
            dirty: false,
        };

        // Caret on the first block if there is one
        if !app.blocks.is_empty() {
            app.list_state.select(Some(0));
            app.sync_selection()?;
        }

        Ok(app)
    }

    fn move_caret(&mut self, down: bool, extend: bool) -> Result<()> {
        if self.blocks.is_empty() {
            return Ok(());
        }
        let caret = self.list_state.selected().unwrap_or(0);
        if extend {
            self.anchor.get_or_insert(caret);
        } else {
            self.anchor = None;
        }

        let next = if down {
            (caret + 1).min(self.blocks.len() - 1)
        } else {
            caret.saturating_sub(1)
        };
        self.list_state.select(Some(next));
        self.sync_selection()
    }

    /// Push the caret/anchor pair into the editor's live selection.
    fn sync_selection(&mut self) -> Result<()> {
        let selection = match self.list_state.selected() {
            Some(caret) => {
                let anchor = self.anchor.unwrap_or(caret);
                Selection::range(self.blocks[anchor], self.blocks[caret])
            }
            None => Selection::empty(),
        };
        self.editor.set_selection(selection)?;
        Ok(())
    }

    fn selected_range(&self) -> Option<(usize, usize)> {
        let caret = self.list_state.selected()?;
        let anchor = self.anchor.unwrap_or(caret);
        Some((anchor.min(caret), anchor.max(caret)))
    }

    fn make_paragraph(&mut self) -> Result<()> {
        match self.editor.execute(PARAGRAPH, ExecuteOptions::default())? {
            Executed::Applied => {
                // Nothing to save when every selected block was already a paragraph
                let changed = self
                    .last_change
                    .borrow()
                    .as_ref()
                    .is_some_and(|changes| !changes.is_empty());
                self.dirty |= changed;
                self.message = self.describe_last_change();
            }
            Executed::Skipped => {
                self.message = "Paragraph is not allowed here".to_string();
            }
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<()> {
        self.message = if self.editor.undo()? {
            self.dirty = true;
            format!("Undo: {}", self.describe_last_change())
        } else {
            "Nothing to undo".to_string()
        };
        Ok(())
    }

    fn redo(&mut self) -> Result<()> {
        self.message = if self.editor.redo()? {
            self.dirty = true;
            format!("Redo: {}", self.describe_last_change())
        } else {
            "Nothing to redo".to_string()
        };
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        io::write_document(&self.document_path, self.editor.document())?;
        log::info!("Saved {}", self.document_path.display());
        self.dirty = false;
        self.message = format!("Saved {}", self.document_path.display());
        Ok(())
    }

    fn describe_last_change(&self) -> String {
        match self.last_change.borrow().as_ref() {
            Some(changes) if !changes.is_empty() => format!(
                "{} block(s) changed (version {})",
                changes.operations.len(),
                changes.version
            ),
            _ => "no changes".to_string(),
        }
    }

    fn render_blocks(&self) -> Vec<ListItem<'static>> {
        let doc = self.editor.document();
        let selected = self.selected_range();

        self.blocks
            .iter()
            .enumerate()
            .map(|(index, &id)| {
                let label = doc
                    .block_type(id)
                    .map(block_label)
                    .unwrap_or_else(|| "?".to_string());
                let text = doc
                    .node(id)
                    .and_then(|node| node.text().lines().next())
                    .unwrap_or("");
                let quote = "> ".repeat(quote_depth(doc, id));
                let line = Line::from(vec![
                    Span::styled(format!("{label:<10}"), Style::default().fg(Color::Cyan)),
                    Span::raw(format!("{quote}{text}")),
                ]);

                let in_selection =
                    selected.is_some_and(|(start, end)| (start..=end).contains(&index));
                let style = if in_selection {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(line).style(style)
            })
            .collect()
    }
}

fn block_label(block_type: &BlockType) -> String {
    match block_type {
        BlockType::Paragraph => "¶".to_string(),
        BlockType::Heading(level) => format!("H{}", level.get()),
        BlockType::ListItem => "•".to_string(),
        BlockType::CodeBlock { language } => match language {
            Some(language) => format!("code:{language}"),
            None => "code".to_string(),
        },
    }
}

fn quote_depth(doc: &Document, id: NodeId) -> usize {
    let mut depth = 0;
    let mut current = doc.node(id).and_then(|node| node.parent());
    while let Some(parent) = current.and_then(|parent| doc.node(parent)) {
        if parent.kind() == &NodeKind::BlockQuote {
            depth += 1;
        }
        current = parent.parent();
    }
    depth
}

fn init_logging(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let document_path = match (args.len(), &config.document_path) {
        (2, _) => PathBuf::from(&args[1]),
        (1, Some(path)) => path.clone(),
        (1, None) => {
            eprintln!("Error: No document path provided and none configured");
            eprintln!("Usage: {} <document.md>", args[0]);
            eprintln!(
                "Or set document_path in the config file at {}",
                config_path.display()
            );
            process::exit(1);
        }
        _ => {
            eprintln!("Usage: {} [document.md]", args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.log_file_path()) {
        eprintln!("Warning: logging disabled: {e}");
    }
    log::info!("blockdoc starting up with {}", document_path.display());

    let schema = if config.schema.is_empty() {
        Schema::default()
    } else {
        Schema::from_rules(config.schema.clone())
    };

    let document = match io::read_document(&document_path, schema) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: Could not open '{}': {e}", document_path.display());
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res =
        App::new(document_path, document).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            let extend = key.modifiers.contains(KeyModifiers::SHIFT);
            let result = match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.move_caret(true, extend),
                KeyCode::Up | KeyCode::Char('k') => app.move_caret(false, extend),
                KeyCode::Char('J') => app.move_caret(true, true),
                KeyCode::Char('K') => app.move_caret(false, true),
                KeyCode::Char('p') => app.make_paragraph(),
                KeyCode::Char('u') => app.undo(),
                KeyCode::Char('r') => app.redo(),
                KeyCode::Char('s') => app.save(),
                _ => Ok(()),
            };
            if let Err(e) = result {
                log::warn!("Command failed: {e}");
                app.message = format!("Error: {e}");
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3), Constraint::Length(1)].as_ref())
        .split(f.area());

    let title = format!(
        "{}{}",
        app.document_path.display(),
        if app.dirty { " [modified]" } else { "" }
    );
    let block_list = List::new(app.render_blocks())
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(block_list, chunks[0], &mut app.list_state);

    // Toolbar: the paragraph command's observable state
    let state = app.editor.command_state(PARAGRAPH).unwrap_or_default();
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    let toolbar = Line::from(vec![
        Span::styled(
            " ¶ Paragraph ",
            if state.is_enabled {
                Style::default().fg(Color::Black).bg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            },
        ),
        Span::raw(format!(
            "  value: {}  enabled: {}  {}",
            on_off(state.value),
            on_off(state.is_enabled),
            app.message
        )),
    ]);
    let status = Paragraph::new(vec![toolbar]).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, chunks[1]);

    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k ↓/j: Move | "),
        Span::raw("Shift+↑/↓, K/J: Extend | "),
        Span::raw("p: Paragraph | u: Undo | r: Redo | s: Save"),
    ]);
    f.render_widget(Paragraph::new(vec![help_text]), chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn app_for(path: PathBuf, markdown: &str) -> App {
        let document = io::parse_markdown(markdown, Schema::default()).unwrap();
        App::new(path, document).unwrap()
    }

    #[test]
    fn test_paragraph_on_paragraph_leaves_document_unmodified() {
        let mut app = app_for(PathBuf::from("unused.md"), "Already a paragraph\n");

        app.make_paragraph().unwrap();
        app.make_paragraph().unwrap();

        assert!(!app.dirty);
        assert_eq!(app.message, "no changes");
    }

    #[test]
    fn test_paragraph_on_heading_marks_document_modified() {
        let mut app = app_for(PathBuf::from("unused.md"), "# Title\n");

        app.make_paragraph().unwrap();

        assert!(app.dirty);
        assert_eq!(app.message, "1 block(s) changed (version 1)");

        // A later no-op does not hide the unsaved rename
        app.make_paragraph().unwrap();
        assert!(app.dirty);
    }

    #[test]
    fn test_save_writes_file_and_clears_modified() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.md");
        let mut app = app_for(path.clone(), "# Title\n");

        app.make_paragraph().unwrap();
        app.save().unwrap();

        assert!(!app.dirty);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Title\n");
    }
}
