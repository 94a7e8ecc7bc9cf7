use std::time::SystemTime;

/// Position of the token currently awaiting input.
///
/// `sequence_index` ranges over `0..=N`; `N` means the sequence is complete.
/// `intra_token_offset` is only nonzero in full-word mode, where it walks the
/// characters of the current token's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub sequence_index: usize,
    pub intra_token_offset: usize,
}

impl Cursor {
    pub fn at(sequence_index: usize) -> Self {
        Self {
            sequence_index,
            intra_token_offset: 0,
        }
    }
}

/// Ephemeral per-session statistics, owned and mutated by the engine only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionStats {
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
    pub correct_inputs: u32,
    pub incorrect_inputs: u32,
    pub tokens_completed: u32,
    /// Tokens per minute, recomputed on every input.
    pub tokens_per_min: f64,
}

impl SessionStats {
    pub fn elapsed_secs(&self) -> f64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => {
                end.duration_since(start).unwrap_or_default().as_secs_f64()
            }
            (Some(start), None) => start.elapsed().unwrap_or_default().as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Percentage of inputs that matched, rounded like a scoreboard.
    pub fn accuracy(&self) -> f64 {
        let total = self.correct_inputs + self.incorrect_inputs;
        if total == 0 {
            return 0.0;
        }
        ((self.correct_inputs as f64 / total as f64) * 100.0).round()
    }
}

/// Increments the caller folds into cumulative (persisted) statistics
/// when a chapter completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CumulativeDelta {
    pub tokens: u32,
    pub streak_increment: u32,
}

/// Everything a subscriber needs to record a finished chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSummary {
    pub cursor: Cursor,
    pub tokens_typed: u32,
    pub duration_secs: f64,
    pub tokens_per_min: f64,
    pub delta: CumulativeDelta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_stats_are_zeroed() {
        let stats = SessionStats::default();
        assert_eq!(stats.correct_inputs, 0);
        assert_eq!(stats.tokens_completed, 0);
        assert_eq!(stats.tokens_per_min, 0.0);
        assert!(stats.started_at.is_none());
        assert_eq!(stats.elapsed_secs(), 0.0);
    }

    #[test]
    fn test_accuracy() {
        let mut stats = SessionStats::default();
        assert_eq!(stats.accuracy(), 0.0);

        stats.correct_inputs = 3;
        stats.incorrect_inputs = 1;
        assert_eq!(stats.accuracy(), 75.0);
    }

    #[test]
    fn test_elapsed_uses_finished_at_when_set() {
        let start = SystemTime::now() - Duration::from_secs(120);
        let stats = SessionStats {
            started_at: Some(start),
            finished_at: Some(start + Duration::from_secs(60)),
            ..SessionStats::default()
        };
        assert!((stats.elapsed_secs() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_cursor_at() {
        let cursor = Cursor::at(7);
        assert_eq!(cursor.sequence_index, 7);
        assert_eq!(cursor.intra_token_offset, 0);
    }
}
