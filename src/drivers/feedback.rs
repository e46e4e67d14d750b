//! Debounced relay-position feedback contact.
//!
//! ## Hardware
//!
//! Auxiliary contact on each latching relay, wired to a GPIO with pull-up.
//! The contact closes to ground when the relay is closed, so the input is
//! active-low by default.
//!
//! ## Filtering
//!
//! The raw level is polled every control tick.  A closed contact is only
//! reported after it has been held for `press_ms`; bounce shorter than
//! `debounce_ms` is ignored on both edges.
//!
//! | Edge   | Condition                                     | Event     |
//! |--------|-----------------------------------------------|-----------|
//! | Close  | active level held >= `press_ms`               | `Closed`  |
//! | Open   | inactive level held >= `debounce_ms` after it | `Opened`  |

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEdge {
    Closed,
    Opened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactState {
    Open,
    DebouncePress { since_ms: u64 },
    Pressed { since_ms: u64 },
    Closed,
    DebounceRelease { since_ms: u64 },
}

pub struct FeedbackInput {
    state: ContactState,
    active_low: bool,
    debounce_ms: u32,
    press_ms: u32,
}

impl FeedbackInput {
    pub fn new(active_low: bool, debounce_ms: u32, press_ms: u32) -> Self {
        Self {
            state: ContactState::Open,
            active_low,
            debounce_ms,
            press_ms,
        }
    }

    /// Debounced relay position.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.state,
            ContactState::Closed | ContactState::DebounceRelease { .. }
        )
    }

    /// Feed the raw pin level.  Returns an edge once per confirmed change.
    pub fn tick(&mut self, now_ms: u64, level_high: bool) -> Option<FeedbackEdge> {
        let active = level_high != self.active_low;

        match self.state {
            ContactState::Open => {
                if active {
                    self.state = ContactState::DebouncePress { since_ms: now_ms };
                }
                None
            }

            ContactState::DebouncePress { since_ms } => {
                if !active {
                    self.state = ContactState::Open;
                } else if now_ms.saturating_sub(since_ms) >= u64::from(self.debounce_ms) {
                    self.state = ContactState::Pressed { since_ms };
                    return self.check_hold(now_ms);
                }
                None
            }

            ContactState::Pressed { .. } => {
                if !active {
                    self.state = ContactState::Open;
                    return None;
                }
                self.check_hold(now_ms)
            }

            ContactState::Closed => {
                if !active {
                    self.state = ContactState::DebounceRelease { since_ms: now_ms };
                }
                None
            }

            ContactState::DebounceRelease { since_ms } => {
                if active {
                    self.state = ContactState::Closed;
                } else if now_ms.saturating_sub(since_ms) >= u64::from(self.debounce_ms) {
                    self.state = ContactState::Open;
                    return Some(FeedbackEdge::Opened);
                }
                None
            }
        }
    }

    fn check_hold(&mut self, now_ms: u64) -> Option<FeedbackEdge> {
        if let ContactState::Pressed { since_ms } = self.state {
            if now_ms.saturating_sub(since_ms) >= u64::from(self.press_ms) {
                self.state = ContactState::Closed;
                return Some(FeedbackEdge::Closed);
            }
        }
        None
    }
}
