use versetype::engine::{ProgressEngine, TypingMode};
use versetype::event::EngineEvent;
use versetype::library::ChapterRef;
use versetype::session::Cursor;
use versetype::store::ProgressStore;
use versetype::tokenizer::tokenize;

use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("progress.db");
    let reference = ChapterRef::new("kjv", "ruth", 2);

    {
        let store = ProgressStore::open(&db_path).unwrap();
        store
            .save_resume(&reference, Cursor::at(17))
            .unwrap();
        store.save_note(&reference, "gleaning fields").unwrap();
    }

    let store = ProgressStore::open(&db_path).unwrap();
    assert_eq!(store.load_resume(&reference).unwrap(), Some(Cursor::at(17)));
    assert_eq!(
        store.load_note(&reference).unwrap().as_deref(),
        Some("gleaning fields")
    );
}

/// The wiring the app does by hand: engine events drive debounced resume
/// saves and the permanent completion record.
#[test]
fn engine_completion_lands_in_store() {
    let store = Rc::new(ProgressStore::open_in_memory().unwrap());
    let reference = ChapterRef::new("kjv", "psalms", 117);

    let verses = vec![
        "O praise the LORD, all ye nations: praise him, all ye people.".to_string(),
    ];
    let tokens = tokenize(&verses, false);
    let n = tokens.len();

    let mut engine = ProgressEngine::new(TypingMode::FirstLetter, false);
    let pending: Rc<RefCell<Vec<EngineEvent>>> = Rc::default();
    let sink = Rc::clone(&pending);
    engine.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));

    engine.load_session(tokens.clone(), None);
    for token in &tokens {
        engine
            .submit_input(&token.expected_symbol.to_string())
            .unwrap();
    }

    for event in pending.borrow().iter() {
        match event {
            EngineEvent::Advanced { cursor } => {
                store.save_resume(&reference, *cursor).unwrap();
            }
            EngineEvent::ChapterCompleted(summary) => {
                store.record_completion(&reference, summary).unwrap();
            }
            _ => {}
        }
    }

    // Completion wipes the resume point and shows up in cumulative stats.
    assert_eq!(store.load_resume(&reference).unwrap(), None);
    assert_eq!(store.completion_count(&reference).unwrap(), 1);

    let stats = store.cumulative_stats().unwrap();
    assert_eq!(stats.total_tokens, n as i64);
    assert_eq!(stats.completions, 1);
    assert_eq!(stats.day_streak, 1);
}

#[test]
fn csv_export_matches_completions() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("log.csv");
    let store = ProgressStore::open_in_memory().unwrap();

    for chapter in 1..=3 {
        let reference = ChapterRef::new("kjv", "jude", chapter);
        let summary = versetype::session::CompletionSummary {
            cursor: Cursor::at(10),
            tokens_typed: 10,
            duration_secs: 30.0,
            tokens_per_min: 20.0,
            delta: versetype::session::CumulativeDelta {
                tokens: 10,
                streak_increment: 1,
            },
        };
        store.record_completion(&reference, &summary).unwrap();
    }

    store.export_completions_csv(&csv_path).unwrap();
    let contents = std::fs::read_to_string(&csv_path).unwrap();
    // Header plus one row per completion.
    assert_eq!(contents.lines().count(), 4);
}
