//! Trailing debounce for pointer-move queries
//!
//! A single pending slot. Scheduling overwrites whatever was pending, so only
//! the latest pointer position of a burst is ever queried.

use crate::view::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingQuery {
    pub cursor: Vec2,
    /// Time (seconds) at which the query becomes due
    pub due: f64,
}

#[derive(Clone, Debug)]
pub struct Debouncer {
    delay: f64,
    pending: Option<PendingQuery>,
}

impl Debouncer {
    pub fn new(delay: f64) -> Self {
        Self { delay: delay.max(0.0), pending: None }
    }

    /// Replace any pending query with one for `cursor`, due `delay` after `now`
    pub fn schedule(&mut self, cursor: Vec2, now: f64) {
        self.pending = Some(PendingQuery { cursor, due: now + self.delay });
    }

    /// Take the pending query if it is due
    pub fn poll(&mut self, now: f64) -> Option<PendingQuery> {
        match self.pending {
            Some(p) if now >= p.due => self.pending.take(),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&PendingQuery> {
        self.pending.as_ref()
    }
}
