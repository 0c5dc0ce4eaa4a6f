//! Channel cursor and zapping.
//!
//! `next`/`previous` walk the filtered view circularly and skip streams in the
//! broken set.  If every channel of the view is broken the walk still lands on
//! one, so zapping can never get stuck.

use std::collections::HashSet;

use crate::protocol::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    selected: Option<Channel>,
    broken: HashSet<String>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&Channel> {
        self.selected.as_ref()
    }

    /// Select any channel, from any view.  No validity check.
    pub fn select(&mut self, channel: Channel) {
        self.selected = Some(channel);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn next(&mut self, view: &[Channel]) -> Option<&Channel> {
        self.step(view, Direction::Forward)
    }

    pub fn previous(&mut self, view: &[Channel]) -> Option<&Channel> {
        self.step(view, Direction::Backward)
    }

    fn step(&mut self, view: &[Channel], direction: Direction) -> Option<&Channel> {
        let len = view.len();
        if len == 0 {
            return self.selected.as_ref();
        }

        let current = self
            .selected
            .as_ref()
            .and_then(|sel| view.iter().position(|c| c.same_stream(sel)));

        // Index of the first candidate; an absent selection starts at the
        // head going forward and at the tail going backward.
        let start = match (direction, current) {
            (Direction::Forward, Some(i)) => (i + 1) % len,
            (Direction::Forward, None) => 0,
            (Direction::Backward, Some(i)) => (i + len - 1) % len,
            (Direction::Backward, None) => len - 1,
        };

        let candidate_at = |step: usize| match direction {
            Direction::Forward => (start + step) % len,
            Direction::Backward => (start + len - step) % len,
        };

        let chosen = (0..len)
            .map(candidate_at)
            .find(|&i| !self.broken.contains(&view[i].stream_url))
            .unwrap_or_else(|| candidate_at(len - 1));

        self.selected = Some(view[chosen].clone());
        self.selected.as_ref()
    }

    /// Record a stream as broken.  When it is the current selection, advance
    /// to the next usable channel of `view`.  Returns true if the cursor moved.
    pub fn mark_broken(&mut self, channel: &Channel, view: &[Channel]) -> bool {
        self.broken.insert(channel.stream_url.clone());

        let is_current = self
            .selected
            .as_ref()
            .is_some_and(|sel| sel.same_stream(channel));
        if !is_current {
            return false;
        }

        self.next(view);
        self.selected
            .as_ref()
            .is_some_and(|sel| !sel.same_stream(channel))
    }

    pub fn is_broken(&self, stream_url: &str) -> bool {
        self.broken.contains(stream_url)
    }

    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }

    pub fn clear_broken(&mut self) {
        self.broken.clear();
    }

    /// Channels right after and right before the selection in `view`, for
    /// pre-buffering.  The broken set is not consulted.
    pub fn neighbors(&self, view: &[Channel]) -> (Option<Channel>, Option<Channel>) {
        let len = view.len();
        let Some(idx) = self
            .selected
            .as_ref()
            .and_then(|sel| view.iter().position(|c| c.same_stream(sel)))
        else {
            return (None, None);
        };

        let next = view[(idx + 1) % len].clone();
        let prev = view[(idx + len - 1) % len].clone();
        (Some(next), Some(prev))
    }
}
