//! Caller-owned team overview assembled from per-member stats.

use serde::Serialize;
use shared::domain::{BlockerSeverity, BlockerStats, BlockerStatus, TeamMember, UserId};
use tracing::warn;

use crate::error::ClientResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberOverview {
    pub member: TeamMember,
    /// `None` when the member's stats have never been fetched successfully.
    pub stats: Option<BlockerStats>,
}

impl MemberOverview {
    pub fn open_blockers(&self) -> u32 {
        self.stats
            .as_ref()
            .map_or(0, |stats| stats.by_status.get(BlockerStatus::Open))
    }

    pub fn high_severity(&self) -> u32 {
        self.stats
            .as_ref()
            .map_or(0, |stats| stats.by_severity.get(BlockerSeverity::High))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamOverview {
    pub members: Vec<MemberOverview>,
}

impl TeamOverview {
    /// Pairs each member with its stats result. A failed fetch keeps the
    /// member's record from `previous`, if any, rather than failing the whole view.
    pub fn assemble(
        results: Vec<(TeamMember, ClientResult<BlockerStats>)>,
        previous: Option<&TeamOverview>,
    ) -> Self {
        let members = results
            .into_iter()
            .map(|(member, result)| match result {
                Ok(stats) => MemberOverview {
                    member,
                    stats: Some(stats),
                },
                Err(err) => {
                    warn!("overview: stats fetch failed for member={}: {err}", member.uid);
                    let stats = previous
                        .and_then(|overview| overview.member(&member.uid))
                        .and_then(|record| record.stats.clone());
                    MemberOverview { member, stats }
                }
            })
            .collect();
        Self { members }
    }

    pub fn member(&self, uid: &UserId) -> Option<&MemberOverview> {
        self.members.iter().find(|record| &record.member.uid == uid)
    }

    pub fn total_open_blockers(&self) -> u32 {
        self.members.iter().map(MemberOverview::open_blockers).sum()
    }

    pub fn total_high_severity(&self) -> u32 {
        self.members.iter().map(MemberOverview::high_severity).sum()
    }

    pub fn members_with_open_blockers(&self) -> usize {
        self.members
            .iter()
            .filter(|record| record.open_blockers() > 0)
            .count()
    }

    /// Members ordered by high-severity count, then open count, both descending.
    pub fn sorted_by_urgency(&self) -> Vec<&MemberOverview> {
        let mut sorted: Vec<_> = self.members.iter().collect();
        sorted.sort_by(|a, b| {
            b.high_severity()
                .cmp(&a.high_severity())
                .then_with(|| b.open_blockers().cmp(&a.open_blockers()))
        });
        sorted
    }
}

#[cfg(test)]
#[path = "tests/overview_tests.rs"]
mod tests;
