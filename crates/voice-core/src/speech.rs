//! Speech output seam.
//!
//! The core never owns audio. It hands reply strings to a [`SpeechSink`];
//! the completion callback lets the driver resume the recognizer only after
//! playback, so the machine does not hear itself.

use std::sync::{Arc, Mutex};

pub trait SpeechSink: Send {
    /// Speak a reply. Fire-and-forget.
    fn say(&mut self, text: &str);

    /// Speak a reply and signal when playback has finished. The default
    /// implementation completes immediately, which is right for sinks with
    /// no real playback (console, tests).
    fn say_then(&mut self, text: &str, done: Box<dyn FnOnce() + Send>) {
        self.say(text);
        done();
    }
}

/// Records everything spoken; tests keep a handle to the transcript.
#[derive(Default)]
pub struct MockSpeech {
    log: Arc<Mutex<Vec<String>>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }
}

impl SpeechSink for MockSpeech {
    fn say(&mut self, text: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(text.to_string());
        }
    }
}
