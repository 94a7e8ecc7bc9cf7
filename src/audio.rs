use itertools::Itertools;
use std::collections::VecDeque;

/// Sink for spoken phrases. Implementations own playback entirely; the
/// queue never waits on them.
pub trait Speaker {
    fn speak(&mut self, phrase: &str);
}

/// Discards everything. Default when audio is off.
#[derive(Debug, Default)]
pub struct NullSpeaker;

impl Speaker for NullSpeaker {
    fn speak(&mut self, _phrase: &str) {}
}

/// Batches completed tokens into phrases and queues them for a [`Speaker`].
///
/// Keystrokes arrive far faster than any sink can vocalize, so the queue is
/// bounded: when it overflows, the oldest pending phrase is dropped. The
/// typing loop is never blocked by audio.
#[derive(Debug)]
pub struct SpeechQueue {
    pending: Vec<String>,
    phrases: VecDeque<String>,
    batch: usize,
    capacity: usize,
    dropped: u64,
}

impl SpeechQueue {
    pub fn new(batch: usize, capacity: usize) -> Self {
        Self {
            pending: Vec::new(),
            phrases: VecDeque::new(),
            batch: batch.max(1),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Feeds one completed token. Queues a phrase once a full batch has
    /// accumulated.
    pub fn push_token(&mut self, text: &str) {
        self.pending.push(text.to_string());
        if self.pending.len() >= self.batch {
            self.flush_pending();
        }
    }

    /// Queues whatever tokens are waiting, batch-full or not. Called at
    /// chapter end so the tail of the text still gets spoken.
    pub fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let phrase = self.pending.drain(..).join(" ");
        if self.phrases.len() >= self.capacity {
            self.phrases.pop_front();
            self.dropped += 1;
        }
        self.phrases.push_back(phrase);
    }

    /// Hands up to `budget` queued phrases to the sink. Call once per tick.
    pub fn drain_into(&mut self, speaker: &mut dyn Speaker, budget: usize) -> usize {
        let mut spoken = 0;
        while spoken < budget {
            let Some(phrase) = self.phrases.pop_front() else {
                break;
            };
            speaker.speak(&phrase);
            spoken += 1;
        }
        spoken
    }

    /// Empties the queue and resets the drop counter. Called when a new
    /// chapter starts.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.phrases.clear();
        self.dropped = 0;
    }

    pub fn queued_phrases(&self) -> usize {
        self.phrases.len()
    }

    pub fn dropped_phrases(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSpeaker {
        phrases: Vec<String>,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&mut self, phrase: &str) {
            self.phrases.push(phrase.to_string());
        }
    }

    #[test]
    fn test_batches_tokens_into_phrases() {
        let mut queue = SpeechQueue::new(3, 16);
        for word in ["In", "the", "beginning"] {
            queue.push_token(word);
        }
        assert_eq!(queue.queued_phrases(), 1);

        let mut speaker = RecordingSpeaker::default();
        queue.drain_into(&mut speaker, 10);
        assert_eq!(speaker.phrases, vec!["In the beginning".to_string()]);
    }

    #[test]
    fn test_partial_batch_held_until_flush() {
        let mut queue = SpeechQueue::new(4, 16);
        queue.push_token("God");
        queue.push_token("created");
        assert_eq!(queue.queued_phrases(), 0);

        queue.flush_pending();
        assert_eq!(queue.queued_phrases(), 1);

        let mut speaker = RecordingSpeaker::default();
        queue.drain_into(&mut speaker, 10);
        assert_eq!(speaker.phrases, vec!["God created".to_string()]);
    }

    #[test]
    fn test_budget_limits_per_drain() {
        let mut queue = SpeechQueue::new(1, 16);
        for word in ["a", "b", "c"] {
            queue.push_token(word);
        }

        let mut speaker = RecordingSpeaker::default();
        assert_eq!(queue.drain_into(&mut speaker, 2), 2);
        assert_eq!(queue.queued_phrases(), 1);
        assert_eq!(queue.drain_into(&mut speaker, 2), 1);
        assert_eq!(speaker.phrases, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut queue = SpeechQueue::new(1, 2);
        for word in ["first", "second", "third"] {
            queue.push_token(word);
        }
        assert_eq!(queue.queued_phrases(), 2);
        assert_eq!(queue.dropped_phrases(), 1);

        let mut speaker = RecordingSpeaker::default();
        queue.drain_into(&mut speaker, 10);
        assert_eq!(speaker.phrases, vec!["second", "third"]);
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut queue = SpeechQueue::new(1, 2);
        queue.push_token("x");
        queue.push_token("y");
        queue.push_token("z");
        assert_eq!(queue.dropped_phrases(), 1);
        queue.clear();

        assert_eq!(queue.queued_phrases(), 0);
        assert_eq!(queue.dropped_phrases(), 0);
        queue.flush_pending();
        assert_eq!(queue.queued_phrases(), 0);
    }

    #[test]
    fn test_null_speaker_is_silent() {
        let mut queue = SpeechQueue::new(1, 4);
        queue.push_token("word");
        let mut speaker = NullSpeaker;
        assert_eq!(queue.drain_into(&mut speaker, 10), 1);
    }
}
