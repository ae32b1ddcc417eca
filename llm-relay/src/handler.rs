//! Receivers for streamed chat output.

use llm_relay_common::Usage;

use crate::error::Error;

/// Receives the progress and outcome of one streamed chat completion.
///
/// Exactly one of `on_finish` or `on_error` is called per stream.
pub trait StreamHandler {
    /// Called with the full text accumulated so far, once per content chunk.
    fn on_update(&mut self, text: &str);

    fn on_finish(&mut self, message: String, usage: Usage);

    fn on_error(&mut self, error: Error);
}

/// Adapts three closures to [`StreamHandler`].
pub struct StreamCallbacks<U, F, E> {
    pub on_update: U,
    pub on_finish: F,
    pub on_error: E,
}

impl<U, F, E> StreamCallbacks<U, F, E>
where
    U: FnMut(&str),
    F: FnMut(String, Usage),
    E: FnMut(Error),
{
    pub fn new(on_update: U, on_finish: F, on_error: E) -> Self {
        Self {
            on_update,
            on_finish,
            on_error,
        }
    }
}

impl<U, F, E> StreamHandler for StreamCallbacks<U, F, E>
where
    U: FnMut(&str),
    F: FnMut(String, Usage),
    E: FnMut(Error),
{
    fn on_update(&mut self, text: &str) {
        (self.on_update)(text)
    }

    fn on_finish(&mut self, message: String, usage: Usage) {
        (self.on_finish)(message, usage)
    }

    fn on_error(&mut self, error: Error) {
        (self.on_error)(error)
    }
}
