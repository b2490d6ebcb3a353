//! Simulated streaming: reveal a reply one character per tick.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Default delay between two reveal frames.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

/// Character cursor over a reply.
///
/// Yields `content[0..i]` for `i` in `0..=len` (counted in chars), then
/// stops. A reply of `n` chars therefore produces `n + 1` frames.
#[derive(Debug, Clone)]
pub struct Typewriter {
    content: String,
    /// Byte offsets of every char boundary, including `content.len()`.
    boundaries: Vec<usize>,
    cursor: usize,
}

impl Typewriter {
    /// Create a cursor positioned before the first frame.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let boundaries = content
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(content.len()))
            .collect();
        Self {
            content,
            boundaries,
            cursor: 0,
        }
    }

    /// The full text being revealed.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of chars in the full text.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Advance the cursor. Returns `None` once the whole text was shown.
    pub fn advance(&mut self) -> Option<&str> {
        let end = *self.boundaries.get(self.cursor)?;
        self.cursor += 1;
        Some(&self.content[..end])
    }
}

/// How a reveal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEnd {
    /// Every frame was shown.
    Completed,
    /// The owner went away before the reveal finished.
    Cancelled,
}

/// A single step of the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// The currently visible prefix.
    Progress(&'a str),
    /// The cursor moved past the end of the text.
    Finished,
}

/// Drive a reveal on a fixed-period timer.
///
/// `on_frame` is called once per tick with the visible prefix and a final time
/// with [`Frame::Finished`]. Cancelling `cancel` stops the loop before the next
/// tick and `on_frame` is not called again.
pub async fn reveal<F>(
    content: impl Into<String>,
    period: Duration,
    cancel: CancellationToken,
    mut on_frame: F,
) -> RevealEnd
where
    F: FnMut(Frame<'_>),
{
    let mut writer = Typewriter::new(content);
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return RevealEnd::Cancelled,
            _ = ticker.tick() => {
                match writer.advance() {
                    Some(prefix) => on_frame(Frame::Progress(prefix)),
                    None => {
                        on_frame(Frame::Finished);
                        return RevealEnd::Completed;
                    }
                }
            }
        }
    }
}
