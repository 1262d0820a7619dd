//! Progress reporting.
//!
//! The executor and validator never write to standard streams; every
//! user-visible event goes through a [`ProgressSink`] so terminal
//! front-ends, CI wrappers, and tests can each supply their own.

use genesis_types::{CheckStatus, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A potentially slow operation started (e.g. a bulk store read)
    Wait {
        /// What we are waiting on
        msg: String,
    },
    /// The awaited operation finished
    WaitDone,
    /// A run over a plan set is starting
    Init {
        /// The operation being run (`add`, `recreate`, `validate`, ...)
        action: String,
        /// Number of plans in the run
        total: usize,
    },
    /// Work on one plan is starting
    StartItem {
        /// 1-based position in the run
        index: usize,
        /// Number of plans in the run
        total: usize,
        /// The plan path
        path: String,
        /// Short description of what the plan is
        detail: String,
    },
    /// Work on one plan finished
    DoneItem {
        /// The plan path
        path: String,
        /// How it went
        status: CheckStatus,
        /// Outcome notes
        notes: Vec<String>,
    },
    /// An out-of-band message
    Notify {
        /// Severity
        level: CheckStatus,
        /// The message
        msg: String,
    },
    /// The run is stopping before its natural end
    Abort {
        /// Why
        msg: String,
    },
    /// There was nothing to do
    Empty,
    /// The run finished
    Completed {
        /// Closing summary
        summary: String,
    },
}

/// Options for a blocking free-form prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOptions {
    /// Hide the operator's input
    pub secret: bool,
    /// Capture input until an EOF line rather than a single line
    pub multiline: bool,
}

/// Sink for progress events and operator interaction.
///
/// `prompt` blocks for a free-form answer; `inline_prompt` expects a
/// single keypress. Implementations without a controlling terminal return
/// `NoTty` from both.
pub trait ProgressSink: Send + Sync {
    /// Deliver one event. Fire-and-forget.
    fn emit(&self, event: ProgressEvent);

    /// Block for a free-form answer.
    fn prompt(&self, msg: &str, opts: PromptOptions) -> Result<String>;

    /// Block for a single keypress.
    fn inline_prompt(&self, msg: &str) -> Result<char>;
}

/// A sink that buffers everything, for tests and capturing front-ends.
///
/// Prompt answers are scripted ahead of time; an exhausted script answers
/// `yes` / `y`.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProgressEvent>>,
    prompt_answers: Mutex<VecDeque<String>>,
    key_answers: Mutex<VecDeque<char>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next free-form prompt.
    pub fn push_answer(&self, answer: impl Into<String>) {
        self.prompt_answers.lock().unwrap().push_back(answer.into());
    }

    /// Queue an answer for the next single-key prompt.
    pub fn push_key(&self, key: char) {
        self.key_answers.lock().unwrap().push_back(key);
    }

    /// Everything emitted so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The paths of all completed items, in order.
    pub fn completed_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::DoneItem { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn prompt(&self, _msg: &str, _opts: PromptOptions) -> Result<String> {
        Ok(self
            .prompt_answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "yes".to_string()))
    }

    fn inline_prompt(&self, _msg: &str) -> Result<char> {
        Ok(self.key_answers.lock().unwrap().pop_front().unwrap_or('y'))
    }
}
