use super::*;
use crate::{error::ClientError, fixtures};
use shared::domain::Tally;

fn stats(open: u32, high: u32) -> BlockerStats {
    let mut by_status = Tally::zeroed();
    let mut by_severity = Tally::zeroed();
    for _ in 0..open {
        by_status.increment(BlockerStatus::Open);
    }
    for _ in 0..high {
        by_severity.increment(BlockerSeverity::High);
    }
    BlockerStats {
        total: open,
        by_status,
        by_severity,
        ..BlockerStats::default()
    }
}

#[test]
fn failed_member_keeps_previous_record() {
    let previous = TeamOverview::assemble(
        vec![
            (fixtures::member("m1"), Ok(stats(2, 1))),
            (fixtures::member("m2"), Ok(stats(1, 0))),
        ],
        None,
    );

    let refreshed = TeamOverview::assemble(
        vec![
            (fixtures::member("m1"), Err(ClientError::Transport("timeout".into()))),
            (fixtures::member("m2"), Ok(stats(4, 0))),
            (fixtures::member("m3"), Err(ClientError::Transport("timeout".into()))),
        ],
        Some(&previous),
    );

    assert_eq!(refreshed.members.len(), 3);
    assert_eq!(refreshed.members[0].stats, Some(stats(2, 1)));
    assert_eq!(refreshed.members[1].open_blockers(), 4);
    assert_eq!(refreshed.members[2].stats, None);
}

#[test]
fn totals_skip_members_without_stats() {
    let overview = TeamOverview::assemble(
        vec![
            (fixtures::member("m1"), Ok(stats(3, 2))),
            (fixtures::member("m2"), Ok(stats(0, 0))),
            (fixtures::member("m3"), Err(ClientError::Unauthorized)),
        ],
        None,
    );

    assert_eq!(overview.total_open_blockers(), 3);
    assert_eq!(overview.total_high_severity(), 2);
    assert_eq!(overview.members_with_open_blockers(), 1);
}

#[test]
fn urgency_orders_by_high_then_open() {
    let overview = TeamOverview::assemble(
        vec![
            (fixtures::member("calm"), Ok(stats(1, 0))),
            (fixtures::member("busy"), Ok(stats(5, 1))),
            (fixtures::member("hot"), Ok(stats(2, 2))),
            (fixtures::member("swamped"), Ok(stats(6, 1))),
        ],
        None,
    );

    let order: Vec<_> = overview
        .sorted_by_urgency()
        .into_iter()
        .map(|record| record.member.uid.as_str())
        .collect();
    assert_eq!(order, vec!["hot", "swamped", "busy", "calm"]);
}
