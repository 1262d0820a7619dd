//! Terminal front-end pieces.

pub mod term_sink;

pub use term_sink::TermSink;
