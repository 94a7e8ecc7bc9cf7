mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::Rng;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::cell::RefCell;
use std::error::Error;
use std::io::{self, stdin};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use versetype::audio::{NullSpeaker, Speaker, SpeechQueue};
use versetype::books;
use versetype::config::{Config, ConfigStore, FileConfigStore};
use versetype::engine::{EngineState, ProgressEngine, TypingMode};
use versetype::event::EngineEvent;
use versetype::library::{ChapterRef, ChapterText, EmbeddedLibrary, FileLibrary, Library};
use versetype::runtime::{CrosstermInputSource, Input, Nav, Runner};
use versetype::session::CompletionSummary;
use versetype::store::{CumulativeStats, ProgressStore};
use versetype::tokenizer::tokenize;

const TICK_RATE_MS: u64 = 100;
const SAVE_DEBOUNCE: Duration = Duration::from_secs(2);
const SPEECH_QUEUE_CAPACITY: usize = 32;
const EXPORT_FILE: &str = "versetype_completions.csv";

/// terminal scripture typing trainer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Progress through Bible chapters by typing the first letter of every word. Your position, completions, streak, and notes persist locally."
)]
pub struct Cli {
    /// text edition to practice (matches a directory under the data dir)
    #[clap(short, long)]
    edition: Option<String>,

    /// book id, e.g. genesis or 1_samuel
    #[clap(short, long)]
    book: Option<String>,

    /// chapter number within the book
    #[clap(short, long)]
    chapter: Option<u32>,

    /// directory of chapter data; the bundled sample edition is used when omitted
    #[clap(short, long)]
    data_dir: Option<PathBuf>,

    /// typing mode
    #[clap(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// match letter case exactly instead of folding to lowercase
    #[clap(long)]
    case_sensitive: bool,

    /// queue completed words for the speech sink
    #[clap(long)]
    audio: bool,

    /// pick a random chapter instead of the configured position
    #[clap(long)]
    random: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ModeArg {
    FirstLetter,
    FullWord,
}

impl From<ModeArg> for TypingMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::FirstLetter => TypingMode::FirstLetter,
            ModeArg::FullWord => TypingMode::FullWord,
        }
    }
}

impl Cli {
    /// Overlays the persisted config with whatever flags were given.
    fn merge_into(&self, mut config: Config) -> Config {
        if let Some(edition) = &self.edition {
            config.edition = edition.clone();
        }
        if let Some(mode) = self.mode {
            config.typing_mode = mode.into();
        }
        if self.case_sensitive {
            config.case_sensitive = true;
        }
        if self.audio {
            config.audio = true;
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Typing,
    Browse,
    Notes { from_browse: bool },
    Summary,
}

#[derive(Debug, Clone, Copy)]
pub struct BrowseState {
    pub book_idx: usize,
    pub chapter: u32,
}

pub struct App {
    pub config: Config,
    pub engine: ProgressEngine,
    pub store: Option<ProgressStore>,
    pub library: Box<dyn Library>,
    pub chapter: Option<ChapterText>,
    pub screen: Screen,
    pub browse: BrowseState,
    pub note_draft: String,
    pub speech: SpeechQueue,
    pub speaker: Box<dyn Speaker>,
    pub status: Option<String>,
    pub last_mismatch: Option<char>,
    pub rate_samples: Vec<f64>,
    pub last_summary: Option<CompletionSummary>,
    pub cumulative: Option<CumulativeStats>,
    pub chapter_completions: Option<i64>,
    engine_events: Rc<RefCell<Vec<EngineEvent>>>,
    last_save: Option<Instant>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, library: Box<dyn Library>) -> Self {
        Self::with_store(config, library, ProgressStore::new().ok())
    }

    fn with_store(
        config: Config,
        library: Box<dyn Library>,
        store: Option<ProgressStore>,
    ) -> Self {
        let mut engine = ProgressEngine::new(config.typing_mode, config.case_sensitive);
        let engine_events: Rc<RefCell<Vec<EngineEvent>>> = Rc::default();
        let sink = Rc::clone(&engine_events);
        engine.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));

        let speech = SpeechQueue::new(config.phrase_batch, SPEECH_QUEUE_CAPACITY);
        Self {
            engine,
            store,
            library,
            chapter: None,
            screen: Screen::Typing,
            browse: BrowseState {
                book_idx: 0,
                chapter: 1,
            },
            note_draft: String::new(),
            speech,
            speaker: Box::new(NullSpeaker),
            status: None,
            last_mismatch: None,
            rate_samples: Vec::new(),
            last_summary: None,
            cumulative: None,
            chapter_completions: None,
            engine_events,
            last_save: None,
            should_quit: false,
            config,
        }
    }

    fn current_reference(&self) -> Option<ChapterRef> {
        self.chapter.as_ref().map(|c| c.reference.clone())
    }

    /// Loads a chapter and starts a session. On failure the engine keeps its
    /// previous state and the error lands in the status line.
    pub fn load_reference(&mut self, reference: ChapterRef, use_resume: bool) {
        match self.library.load_chapter(&reference) {
            Ok(chapter) => {
                let tokens = tokenize(&chapter.verses, self.config.case_sensitive);
                let resume = if use_resume {
                    self.store
                        .as_ref()
                        .and_then(|s| s.load_resume(&reference).ok().flatten())
                } else {
                    None
                };
                if let Some(idx) = books::BOOKS.iter().position(|b| b.id == reference.book) {
                    self.browse = BrowseState {
                        book_idx: idx,
                        chapter: reference.chapter,
                    };
                }
                self.speech.clear();
                self.status = None;
                self.chapter = Some(chapter);
                self.screen = Screen::Typing;
                self.engine.load_session(tokens, resume);
                self.last_save = Some(Instant::now());
                self.process_engine_events();
            }
            Err(err) => {
                self.status = Some(format!("{err} — press tab to browse"));
            }
        }
    }

    fn submit_char(&mut self, c: char) {
        if let Err(err) = self.engine.submit_input(&c.to_string()) {
            // Contract violation at the capture boundary; surface it rather
            // than poisoning the session.
            self.status = Some(err.to_string());
        }
        self.process_engine_events();
    }

    /// Drains the event buffer filled by the engine subscription and drives
    /// the collaborators: speech queue, debounced saves, completion records.
    fn process_engine_events(&mut self) {
        let events: Vec<EngineEvent> = self.engine_events.borrow_mut().drain(..).collect();
        for event in events {
            match event {
                EngineEvent::SessionStarted { .. } => {
                    self.rate_samples.clear();
                    self.last_mismatch = None;
                }
                EngineEvent::Advanced { cursor } => {
                    self.last_mismatch = None;
                    self.rate_samples.push(self.engine.stats().tokens_per_min);
                    if self.config.audio && cursor.intra_token_offset == 0 {
                        if let Some(token) =
                            self.engine.tokens().get(cursor.sequence_index.wrapping_sub(1))
                        {
                            self.speech.push_token(&token.text);
                        }
                    }
                }
                EngineEvent::Mismatch { symbol, .. } => {
                    self.last_mismatch = Some(symbol);
                }
                EngineEvent::Input { .. } => {
                    self.maybe_save_resume();
                }
                EngineEvent::ChapterCompleted(summary) => {
                    if self.config.audio {
                        if let Some(token) = self.engine.tokens().last() {
                            self.speech.push_token(&token.text);
                        }
                        self.speech.flush_pending();
                        let dropped = self.speech.dropped_phrases();
                        if dropped > 0 {
                            self.status =
                                Some(format!("speech fell behind, skipped {dropped} phrases"));
                        }
                    }
                    if let (Some(store), Some(reference)) =
                        (self.store.as_ref(), self.current_reference())
                    {
                        let _ = store.record_completion(&reference, &summary);
                        self.chapter_completions = store.completion_count(&reference).ok();
                    }
                    self.refresh_cumulative();
                    self.last_summary = Some(summary);
                    self.screen = Screen::Summary;
                }
            }
        }
    }

    fn maybe_save_resume(&mut self) {
        if self.engine.state() == EngineState::Completed {
            return;
        }
        let due = match self.last_save {
            Some(at) => at.elapsed() >= SAVE_DEBOUNCE,
            None => true,
        };
        if !due {
            return;
        }
        self.save_resume_now();
    }

    fn save_resume_now(&mut self) {
        if let (Some(store), Some(reference)) = (self.store.as_ref(), self.current_reference()) {
            let _ = store.save_resume(&reference, self.engine.cursor());
            self.last_save = Some(Instant::now());
        }
    }

    fn refresh_cumulative(&mut self) {
        self.cumulative = self
            .store
            .as_ref()
            .and_then(|s| s.cumulative_stats().ok());
    }

    fn on_tick(&mut self) {
        self.speech.drain_into(self.speaker.as_mut(), 1);
    }

    fn open_browse(&mut self) {
        self.engine.pause("browse");
        self.screen = Screen::Browse;
    }

    fn close_browse(&mut self) {
        self.engine.resume("browse");
        self.screen = Screen::Typing;
    }

    fn open_notes(&mut self, from_browse: bool) {
        self.engine.pause("notes");
        self.note_draft = self
            .store
            .as_ref()
            .zip(self.current_reference())
            .and_then(|(store, reference)| store.load_note(&reference).ok().flatten())
            .unwrap_or_default();
        self.screen = Screen::Notes { from_browse };
    }

    fn close_notes(&mut self, save: bool, from_browse: bool) {
        if save {
            if let (Some(store), Some(reference)) =
                (self.store.as_ref(), self.current_reference())
            {
                let _ = store.save_note(&reference, &self.note_draft);
            }
        }
        self.engine.resume("notes");
        self.screen = if from_browse {
            Screen::Browse
        } else {
            Screen::Typing
        };
    }

    fn export_completions(&mut self) {
        let Some(store) = self.store.as_ref() else {
            self.status = Some("no progress database available".to_string());
            return;
        };
        match store.export_completions_csv(EXPORT_FILE) {
            Ok(()) => self.status = Some(format!("exported {EXPORT_FILE}")),
            Err(err) => self.status = Some(format!("export failed: {err}")),
        }
    }

    fn go_next_chapter(&mut self) {
        let Some(reference) = self.current_reference() else {
            return;
        };
        if let Some((book, chapter)) = books::next_chapter(&reference.book, reference.chapter) {
            self.load_reference(
                ChapterRef::new(&reference.edition, book.id, chapter),
                true,
            );
        } else {
            self.status = Some("that was the last chapter".to_string());
        }
    }

    fn go_prev_chapter(&mut self) {
        let Some(reference) = self.current_reference() else {
            return;
        };
        if let Some((book, chapter)) = books::prev_chapter(&reference.book, reference.chapter) {
            self.load_reference(
                ChapterRef::new(&reference.edition, book.id, chapter),
                true,
            );
        } else {
            self.status = Some("already at the first chapter".to_string());
        }
    }

    fn handle_input(&mut self, input: Input) {
        if input == Input::Interrupt {
            self.should_quit = true;
            return;
        }

        match self.screen.clone() {
            Screen::Typing => match input {
                Input::Nav(Nav::Cancel) => {
                    self.save_resume_now();
                    self.should_quit = true;
                }
                Input::Nav(Nav::Browse) => self.open_browse(),
                Input::Nav(Nav::Notes) => self.open_notes(false),
                Input::Nav(Nav::Left) => {
                    // Restart the chapter from the first word.
                    if let Some(reference) = self.current_reference() {
                        if let Some(store) = self.store.as_ref() {
                            let _ = store.clear_resume(&reference);
                        }
                        self.load_reference(reference, false);
                    }
                }
                Input::Nav(Nav::Right) => {
                    self.save_resume_now();
                    self.go_next_chapter();
                }
                Input::Char(c) => self.submit_char(c),
                _ => {}
            },
            Screen::Browse => match input {
                Input::Nav(Nav::Cancel) => self.close_browse(),
                Input::Nav(Nav::Notes) => self.open_notes(true),
                Input::Nav(Nav::Up) => {
                    self.browse.book_idx = self.browse.book_idx.saturating_sub(1);
                    self.browse.chapter = 1;
                }
                Input::Nav(Nav::Down) => {
                    if self.browse.book_idx + 1 < books::BOOKS.len() {
                        self.browse.book_idx += 1;
                        self.browse.chapter = 1;
                    }
                }
                Input::Nav(Nav::Left) => {
                    self.browse.chapter = self.browse.chapter.saturating_sub(1).max(1);
                }
                Input::Nav(Nav::Right) => {
                    let max = books::BOOKS[self.browse.book_idx].chapters;
                    self.browse.chapter = (self.browse.chapter + 1).min(max);
                }
                Input::Nav(Nav::Accept) => {
                    let book = books::BOOKS[self.browse.book_idx];
                    let reference =
                        ChapterRef::new(&self.config.edition, book.id, self.browse.chapter);
                    self.load_reference(reference, true);
                }
                _ => {}
            },
            Screen::Notes { from_browse } => match input {
                Input::Nav(Nav::Accept) => self.close_notes(true, from_browse),
                Input::Nav(Nav::Cancel) => self.close_notes(false, from_browse),
                Input::Nav(Nav::Erase) => {
                    self.note_draft.pop();
                }
                Input::Char(c) => self.note_draft.push(c),
                _ => {}
            },
            Screen::Summary => match input {
                Input::Nav(Nav::Cancel) => self.should_quit = true,
                Input::Char('n') | Input::Nav(Nav::Accept) | Input::Nav(Nav::Right) => {
                    self.go_next_chapter()
                }
                Input::Nav(Nav::Left) => self.go_prev_chapter(),
                Input::Char('r') => {
                    if let Some(reference) = self.current_reference() {
                        self.load_reference(reference, false);
                    }
                }
                Input::Char('e') => self.export_completions(),
                Input::Nav(Nav::Browse) => self.open_browse(),
                _ => {}
            },
        }
    }
}

/// Maps CLI flags onto a starting chapter, validating against the book table.
fn resolve_reference(cli: &Cli, config: &Config) -> Result<ChapterRef, String> {
    if cli.random {
        return Ok(random_reference(&config.edition));
    }
    let book_id = cli.book.as_deref().unwrap_or("genesis");
    let book = books::find_book(book_id)
        .ok_or_else(|| format!("unknown book id {book_id:?} (try e.g. genesis or 1_samuel)"))?;
    let chapter = cli.chapter.unwrap_or(1);
    if chapter == 0 || chapter > book.chapters {
        return Err(format!(
            "{} has chapters 1..{}, not {}",
            book.name, book.chapters, chapter
        ));
    }
    Ok(ChapterRef::new(&config.edition, book.id, chapter))
}

/// Rejects an explicit chapter request the bundled sample cannot serve, so
/// the user gets a usage error instead of an empty screen. Random picks and
/// external data dirs are left alone.
fn check_sample_coverage(cli: &Cli, reference: &ChapterRef) -> Result<(), String> {
    if cli.data_dir.is_some() || cli.random {
        return Ok(());
    }
    if EmbeddedLibrary::has_chapter(reference) {
        Ok(())
    } else {
        Err(format!(
            "{reference} is not in the bundled sample; pass --data-dir to use a full text"
        ))
    }
}

/// Uniform pick over all 1,189 chapters.
fn random_reference(edition: &str) -> ChapterRef {
    let total: u32 = books::BOOKS.iter().map(|b| b.chapters).sum();
    let mut pick = rand::thread_rng().gen_range(0..total);
    for book in books::BOOKS {
        if pick < book.chapters {
            return ChapterRef::new(edition, book.id, pick + 1);
        }
        pick -= book.chapters;
    }
    ChapterRef::new(edition, "genesis", 1)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let config = cli.merge_into(config_store.load());
    let _ = config_store.save(&config);

    let reference = match resolve_reference(&cli, &config) {
        Ok(reference) => reference,
        Err(message) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, message).exit();
        }
    };
    if let Err(message) = check_sample_coverage(&cli, &reference) {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::InvalidValue, message).exit();
    }

    let library: Box<dyn Library> = match &cli.data_dir {
        Some(dir) => Box::new(FileLibrary::new(dir)),
        None => Box::new(EmbeddedLibrary::new()),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, library);
    app.load_reference(reference, true);
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermInputSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            Input::Tick => app.on_tick(),
            Input::Resize => {}
            input => app.handle_input(input),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
