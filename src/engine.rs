use crate::event::{EngineEvent, EventBus, SubscriptionId};
use crate::session::{CompletionSummary, CumulativeDelta, Cursor, SessionStats};
use crate::tokenizer::{fold_case, Token};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::SystemTime;
use thiserror::Error;

/// How keystrokes are matched against tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum TypingMode {
    /// One keypress per word: the first letter.
    #[default]
    FirstLetter,
    /// Every character of every word, punctuation included.
    FullWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Active,
    Paused,
    Completed,
}

/// What a single `submit_input` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Advanced,
    Mismatch,
    Completed,
    /// Dropped without effect (engine idle, paused, or already completed).
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Caller passed something other than a single character. This is a
    /// contract violation at the input-capture boundary, not a user miss.
    #[error("input must be exactly one character, got {0:?}")]
    InvalidInput(String),
}

/// The progress engine: owns the token sequence, cursor, session statistics,
/// and the pause-reason set, and emits [`EngineEvent`]s to subscribers.
///
/// All mutation happens synchronously inside its methods; external readers
/// only get snapshots through the getters.
#[derive(Debug)]
pub struct ProgressEngine {
    tokens: Vec<Token>,
    cursor: Cursor,
    state: EngineState,
    stats: SessionStats,
    mode: TypingMode,
    case_sensitive: bool,
    pause_reasons: HashSet<String>,
    bus: EventBus,
    session_epoch: u64,
}

impl ProgressEngine {
    pub fn new(mode: TypingMode, case_sensitive: bool) -> Self {
        Self {
            tokens: Vec::new(),
            cursor: Cursor::default(),
            state: EngineState::Idle,
            stats: SessionStats::default(),
            mode,
            case_sensitive,
            pause_reasons: HashSet::new(),
            bus: EventBus::new(),
            session_epoch: 0,
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Seeds a new session. Resets statistics, clears pause reasons,
    /// clamps `resume` into the valid range, and goes `Active` — or straight
    /// to `Completed` when the token sequence is empty.
    pub fn load_session(&mut self, tokens: Vec<Token>, resume: Option<Cursor>) {
        self.session_epoch += 1;
        self.tokens = tokens;
        self.pause_reasons.clear();
        self.stats = SessionStats {
            started_at: Some(SystemTime::now()),
            ..SessionStats::default()
        };
        self.cursor = self.clamp_cursor(resume.unwrap_or_default());
        self.state = EngineState::Active;

        self.bus.emit(&EngineEvent::SessionStarted {
            token_count: self.tokens.len(),
            cursor: self.cursor,
        });

        if self.tokens.is_empty() {
            self.complete_session();
        }
    }

    fn clamp_cursor(&self, cursor: Cursor) -> Cursor {
        if self.tokens.is_empty() {
            return Cursor::default();
        }
        let sequence_index = cursor.sequence_index.min(self.tokens.len() - 1);
        let intra_token_offset = match self.mode {
            TypingMode::FirstLetter => 0,
            TypingMode::FullWord => {
                let len = self.tokens[sequence_index].text.chars().count();
                cursor.intra_token_offset.min(len.saturating_sub(1))
            }
        };
        Cursor {
            sequence_index,
            intra_token_offset,
        }
    }

    /// Validates and applies one keystroke. No retry limit: a mismatch is
    /// purely statistical and leaves the cursor where it was.
    pub fn submit_input(&mut self, input: &str) -> Result<Outcome, EngineError> {
        let mut chars = input.chars();
        let symbol = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(EngineError::InvalidInput(input.to_string())),
        };

        if self.state != EngineState::Active {
            return Ok(Outcome::Ignored);
        }

        let token = &self.tokens[self.cursor.sequence_index];
        let (expected, token_len) = match self.mode {
            TypingMode::FirstLetter => (Some(token.expected_symbol), 1),
            TypingMode::FullWord => (
                token.text.chars().nth(self.cursor.intra_token_offset),
                token.text.chars().count(),
            ),
        };
        let Some(expected) = expected else {
            // Offset past the token text cannot happen after clamping.
            return Ok(Outcome::Ignored);
        };

        let typed = if self.case_sensitive || !expected.is_alphabetic() {
            symbol
        } else {
            fold_case(symbol)
        };
        let expected = if self.case_sensitive || !expected.is_alphabetic() {
            expected
        } else {
            fold_case(expected)
        };

        if typed != expected {
            self.stats.incorrect_inputs += 1;
            self.recompute_rate();
            self.bus.emit(&EngineEvent::Mismatch {
                symbol,
                cursor: self.cursor,
            });
            self.bus.emit(&EngineEvent::Input { matched: false });
            return Ok(Outcome::Mismatch);
        }

        self.stats.correct_inputs += 1;
        let token_done = match self.mode {
            TypingMode::FirstLetter => true,
            TypingMode::FullWord => self.cursor.intra_token_offset + 1 >= token_len,
        };
        if token_done {
            self.cursor.sequence_index += 1;
            self.cursor.intra_token_offset = 0;
            self.stats.tokens_completed += 1;
        } else {
            self.cursor.intra_token_offset += 1;
        }
        self.recompute_rate();

        if token_done && self.cursor.sequence_index == self.tokens.len() {
            self.complete_session();
            self.bus.emit(&EngineEvent::Input { matched: true });
            return Ok(Outcome::Completed);
        }

        self.bus.emit(&EngineEvent::Advanced {
            cursor: self.cursor,
        });
        self.bus.emit(&EngineEvent::Input { matched: true });
        Ok(Outcome::Advanced)
    }

    fn complete_session(&mut self) {
        self.state = EngineState::Completed;
        self.stats.finished_at = Some(SystemTime::now());
        self.recompute_rate();

        let summary = CompletionSummary {
            cursor: self.cursor,
            tokens_typed: self.stats.tokens_completed,
            duration_secs: self.stats.elapsed_secs(),
            tokens_per_min: self.stats.tokens_per_min,
            delta: CumulativeDelta {
                tokens: self.stats.tokens_completed,
                streak_increment: 1,
            },
        };
        self.bus.emit(&EngineEvent::ChapterCompleted(summary));
    }

    fn recompute_rate(&mut self) {
        let elapsed = self.stats.elapsed_secs();
        self.stats.tokens_per_min = if elapsed > 0.0 {
            self.stats.tokens_completed as f64 / (elapsed / 60.0)
        } else {
            0.0
        };
    }

    /// Reasons accumulate in a set so two independent callers (say a browse
    /// overlay and a focused notes field) can each hold the engine paused
    /// without releasing each other's hold.
    pub fn pause(&mut self, reason: &str) {
        self.pause_reasons.insert(reason.to_string());
        if self.state == EngineState::Active {
            self.state = EngineState::Paused;
        }
    }

    pub fn resume(&mut self, reason: &str) {
        self.pause_reasons.remove(reason);
        if self.state == EngineState::Paused && self.pause_reasons.is_empty() {
            self.state = EngineState::Active;
        }
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.tokens.is_empty() {
            0.0
        } else {
            self.cursor.sequence_index as f64 / self.tokens.len() as f64
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.cursor.sequence_index)
    }

    pub fn mode(&self) -> TypingMode {
        self.mode
    }

    /// Bumped on every `load_session`; lets an asynchronous loader discard
    /// results that would land after a newer session has started.
    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }
}
