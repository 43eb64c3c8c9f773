//! Lifecycle tracking for asynchronous remote calls.
//!
//! Every operation family owns one [`RequestTracker`]. Dispatching a call
//! hands out a [`RequestTicket`] with a monotonically increasing sequence
//! number. Replacing settlements ([`RequestTracker::fulfill`]) carrying a
//! ticket older than the last applied one are dropped, so a slow response can
//! never overwrite a newer one. Additive settlements
//! ([`RequestTracker::complete`]) only drop cancelled tickets. Families whose
//! calls write different targets keep one [`TargetMarks`] per target.

use std::{collections::HashMap, hash::Hash};

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFamily {
    Profile,
    TokenRefresh,
    Blockers,
    BlockerStats,
    BlockerMutation,
    Reports,
    ReportGeneration,
}

impl RequestFamily {
    pub fn name(self) -> &'static str {
        match self {
            RequestFamily::Profile => "profile",
            RequestFamily::TokenRefresh => "token_refresh",
            RequestFamily::Blockers => "blockers",
            RequestFamily::BlockerStats => "blocker_stats",
            RequestFamily::BlockerMutation => "blocker_mutation",
            RequestFamily::Reports => "reports",
            RequestFamily::ReportGeneration => "report_generation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RequestState {
    pub phase: RequestPhase,
    pub error: Option<String>,
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        self.phase == RequestPhase::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    family: RequestFamily,
    seq: u64,
}

impl RequestTicket {
    pub fn family(&self) -> RequestFamily {
        self.family
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone)]
pub struct RequestTracker {
    family: RequestFamily,
    state: RequestState,
    issued: u64,
    applied: u64,
    cancelled: u64,
}

impl RequestTracker {
    pub fn new(family: RequestFamily) -> Self {
        Self {
            family,
            state: RequestState::default(),
            issued: 0,
            applied: 0,
            cancelled: 0,
        }
    }

    pub fn family(&self) -> RequestFamily {
        self.family
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Marks the family pending and clears the previous error.
    pub fn begin(&mut self) -> RequestTicket {
        self.issued += 1;
        self.state = RequestState {
            phase: RequestPhase::Pending,
            error: None,
        };
        RequestTicket {
            family: self.family,
            seq: self.issued,
        }
    }

    /// Returns whether the payload carried by `ticket` should replace the
    /// current one.
    pub fn fulfill(&mut self, ticket: RequestTicket) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.settle_phase(ticket);
        true
    }

    /// Returns whether an additive payload carried by `ticket` should be
    /// applied. Only cancellation drops it; a newer settlement does not.
    pub fn complete(&mut self, ticket: RequestTicket) -> bool {
        if !self.is_open(ticket) {
            self.log_dropped(ticket);
            return false;
        }
        self.applied = self.applied.max(ticket.seq);
        self.settle_phase(ticket);
        true
    }

    /// Returns whether the error was recorded.
    pub fn reject(&mut self, ticket: RequestTicket, message: impl Into<String>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        // a newer request is still in flight and owns the visible state
        if ticket.seq != self.issued {
            return false;
        }
        self.state = RequestState {
            phase: RequestPhase::Rejected,
            error: Some(message.into()),
        };
        true
    }

    /// Invalidates every outstanding ticket and returns to idle.
    pub fn cancel(&mut self) -> bool {
        let outstanding = self.cancelled < self.issued && self.applied < self.issued;
        self.cancelled = self.issued;
        if !outstanding {
            return false;
        }
        self.applied = self.issued;
        self.state.phase = RequestPhase::Idle;
        true
    }

    /// Whether a replacing settlement carrying `ticket` would still be accepted.
    pub fn is_live(&self, ticket: RequestTicket) -> bool {
        self.is_open(ticket) && ticket.seq > self.applied
    }

    /// Whether `ticket` was issued here and has not been cancelled.
    pub fn is_open(&self, ticket: RequestTicket) -> bool {
        ticket.family == self.family && ticket.seq > self.cancelled && ticket.seq <= self.issued
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    fn accept(&mut self, ticket: RequestTicket) -> bool {
        if !self.is_live(ticket) {
            self.log_dropped(ticket);
            return false;
        }
        self.applied = ticket.seq;
        true
    }

    fn settle_phase(&mut self, ticket: RequestTicket) {
        if ticket.seq == self.issued {
            self.state = RequestState {
                phase: RequestPhase::Fulfilled,
                error: None,
            };
        }
    }

    fn log_dropped(&self, ticket: RequestTicket) {
        debug!(
            family = self.family.name(),
            seq = ticket.seq,
            applied = self.applied,
            issued = self.issued,
            "request: dropping stale settlement"
        );
    }
}

/// Newest ticket applied per target within one family.
#[derive(Debug, Clone)]
pub struct TargetMarks<K> {
    applied: HashMap<K, u64>,
}

impl<K> Default for TargetMarks<K> {
    fn default() -> Self {
        Self {
            applied: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> TargetMarks<K> {
    /// Records `ticket` against `target` unless a newer ticket already wrote it.
    pub fn advance(&mut self, target: K, ticket: RequestTicket) -> bool {
        let applied = self.applied.entry(target).or_default();
        if ticket.seq <= *applied {
            return false;
        }
        *applied = ticket.seq;
        true
    }
}

#[cfg(test)]
#[path = "tests/request_tests.rs"]
mod tests;
