// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod audio;
pub mod books;
pub mod config;
pub mod engine;
pub mod event;
pub mod library;
pub mod runtime;
pub mod session;
pub mod store;
pub mod tokenizer;
