use std::fmt;

use shared::domain::{AiReport, UserId};
use tracing::warn;

/// The requesting context a report cache belongs to. Caches for different
/// contexts are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportContext {
    Own,
    Team(String),
    Member(UserId),
}

impl fmt::Display for ReportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportContext::Own => f.write_str("own"),
            ReportContext::Team(team) => write!(f, "team:{team}"),
            ReportContext::Member(member) => write!(f, "member:{member}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted,
    Replaced { index: usize },
    /// A cached report shares the uid but the payload is not flagged as existing.
    Inconsistent { index: usize },
}

/// Merges `incoming` into a newest-first cache without duplicating uids.
pub fn reconcile(cache: &mut Vec<AiReport>, incoming: AiReport) -> ReconcileOutcome {
    let Some(index) = cache.iter().position(|report| report.uid == incoming.uid) else {
        cache.insert(0, incoming);
        return ReconcileOutcome::Inserted;
    };

    if incoming.is_existing {
        cache[index] = incoming;
        return ReconcileOutcome::Replaced { index };
    }

    warn!(
        "reports: uid collision without existing flag uid={} index={index}; cache left unchanged",
        incoming.uid
    );
    ReconcileOutcome::Inconsistent { index }
}

#[cfg(test)]
#[path = "tests/reports_tests.rs"]
mod tests;
