use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(BlockerId);
id_newtype!(ReportId);

/// Enumerations whose every value must appear as a key in derived counts.
pub trait Enumerated: Copy + Ord + 'static {
    const ALL: &'static [Self];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockerCategory {
    Process,
    Technical,
    Dependency,
    Infrastructure,
    Communication,
    Resource,
    Knowledge,
    Access,
    External,
    Review,
    #[serde(rename = "Customer Escalation")]
    CustomerEscalation,
    Other,
}

impl Enumerated for BlockerCategory {
    const ALL: &'static [Self] = &[
        Self::Process,
        Self::Technical,
        Self::Dependency,
        Self::Infrastructure,
        Self::Communication,
        Self::Resource,
        Self::Knowledge,
        Self::Access,
        Self::External,
        Self::Review,
        Self::CustomerEscalation,
        Self::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockerSeverity {
    Low,
    Medium,
    High,
}

impl Enumerated for BlockerSeverity {
    const ALL: &'static [Self] = &[Self::Low, Self::Medium, Self::High];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockerStatus {
    Open,
    Resolved,
    Ignored,
}

impl Enumerated for BlockerStatus {
    const ALL: &'static [Self] = &[Self::Open, Self::Resolved, Self::Ignored];
}

impl BlockerStatus {
    /// Status only ever moves out of `Open`; settled blockers are final.
    pub fn can_transition_to(self, next: BlockerStatus) -> bool {
        matches!(
            (self, next),
            (BlockerStatus::Open, BlockerStatus::Resolved)
                | (BlockerStatus::Open, BlockerStatus::Ignored)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Designation {
    Engineer,
    #[serde(rename = "Sr. Engineer")]
    SeniorEngineer,
    #[serde(rename = "Tech Lead")]
    TechLead,
    #[serde(rename = "QA")]
    Qa,
    Manager,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default)]
    pub is_manager: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub uid: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<Designation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default)]
    pub is_manager: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MemberStatus>,
}

/// The owning member of a blocker, either as a bare id or populated by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Id(UserId),
    Member(Box<TeamMember>),
}

impl MemberRef {
    pub fn id(&self) -> &UserId {
        match self {
            MemberRef::Id(id) => id,
            MemberRef::Member(member) => &member.uid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub uid: BlockerId,
    pub team_member: MemberRef,
    pub description: String,
    pub category: BlockerCategory,
    pub severity: BlockerSeverity,
    pub status: BlockerStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reported_via: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-key counts over an enumeration; every key is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally<K: Enumerated> {
    counts: BTreeMap<K, u32>,
}

impl<K: Enumerated> Tally<K> {
    pub fn zeroed() -> Self {
        Self {
            counts: K::ALL.iter().map(|key| (*key, 0)).collect(),
        }
    }

    /// Builds a tally from partial counts, filling absent keys with zero.
    pub fn from_counts(partial: BTreeMap<K, u32>) -> Self {
        let mut tally = Self::zeroed();
        tally.counts.extend(partial);
        tally
    }

    pub fn increment(&mut self, key: K) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn get(&self, key: K) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    pub fn sum(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.counts.iter().map(|(key, count)| (*key, *count))
    }
}

impl<K: Enumerated> Default for Tally<K> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<K: Enumerated + Serialize> Serialize for Tally<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.counts.serialize(serializer)
    }
}

impl<'de, K: Enumerated + Deserialize<'de>> Deserialize<'de> for Tally<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let partial = BTreeMap::<K, u32>::deserialize(deserializer)?;
        Ok(Self::from_counts(partial))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCount {
    pub week: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockerStats {
    pub total: u32,
    #[serde(default)]
    pub by_category: Tally<BlockerCategory>,
    #[serde(default)]
    pub by_severity: Tally<BlockerSeverity>,
    #[serde(default)]
    pub by_status: Tally<BlockerStatus>,
    /// Only populated on stats returned by the server aggregate endpoints.
    #[serde(default)]
    pub weekly_trend: Vec<WeeklyCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Individual,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub priority: ActionPriority,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_blocker: Option<BlockerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_to_involve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReport {
    pub uid: ReportId,
    pub report_type: ReportType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_member: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_team: Option<String>,
    pub report_period: ReportPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub insights: Vec<String>,
    pub generated_at: DateTime<Utc>,
    /// Set by the server when a generation call returned an already generated report.
    #[serde(default)]
    pub is_existing: bool,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
