use shared::domain::{Blocker, BlockerStats, Tally};

/// Derives categorized counts from a blocker list in one pass.
///
/// Locally computed stats never carry a weekly trend; only stats fetched
/// from the server aggregate endpoints do.
pub fn aggregate(blockers: &[Blocker]) -> BlockerStats {
    let mut by_category = Tally::zeroed();
    let mut by_severity = Tally::zeroed();
    let mut by_status = Tally::zeroed();

    for blocker in blockers {
        by_category.increment(blocker.category);
        by_severity.increment(blocker.severity);
        by_status.increment(blocker.status);
    }

    BlockerStats {
        total: blockers.len() as u32,
        by_category,
        by_severity,
        by_status,
        weekly_trend: Vec::new(),
    }
}

#[cfg(test)]
#[path = "tests/stats_tests.rs"]
mod tests;
