use serde::{Deserialize, Serialize};

use crate::domain::{
    Blocker, BlockerCategory, BlockerSeverity, BlockerStatus, ReportPeriod, User, UserId,
};

/// Filters accepted by every blocker list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<BlockerCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<BlockerSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BlockerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl BlockerQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockerListResponse {
    #[serde(default)]
    pub blockers: Vec<Blocker>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockerRequest {
    pub team_member_uid: UserId,
    pub description: String,
    pub category: BlockerCategory,
    pub severity: BlockerSeverity,
}

/// Partial blocker update; only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlockerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BlockerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<BlockerSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<BlockerCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateBlockerRequest {
    pub fn status(status: BlockerStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateReportQuery {
    pub period: ReportPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub user: User,
}
