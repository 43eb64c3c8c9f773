use super::*;

#[test]
fn category_uses_display_names_on_the_wire() {
    let encoded = serde_json::to_string(&BlockerCategory::CustomerEscalation).expect("encode");
    assert_eq!(encoded, "\"Customer Escalation\"");
    let decoded: BlockerCategory = serde_json::from_str("\"Customer Escalation\"").expect("decode");
    assert_eq!(decoded, BlockerCategory::CustomerEscalation);
    assert_eq!(BlockerCategory::ALL.len(), 12);
}

#[test]
fn server_stats_missing_keys_are_filled_with_zero() {
    let stats: BlockerStats = serde_json::from_value(serde_json::json!({
        "total": 3,
        "byCategory": { "Technical": 2, "Process": 1 },
        "bySeverity": { "High": 3 },
        "byStatus": { "Open": 3 },
        "weeklyTrend": [{ "week": "2024-W01", "count": 3 }]
    }))
    .expect("decode stats");

    assert_eq!(stats.by_category.get(BlockerCategory::Technical), 2);
    assert_eq!(stats.by_category.get(BlockerCategory::Review), 0);
    assert_eq!(stats.by_category.iter().count(), BlockerCategory::ALL.len());
    assert_eq!(stats.by_severity.get(BlockerSeverity::Low), 0);
    assert_eq!(stats.by_status.get(BlockerStatus::Ignored), 0);
    assert_eq!(stats.weekly_trend.len(), 1);
}

#[test]
fn status_transitions_only_leave_open() {
    assert!(BlockerStatus::Open.can_transition_to(BlockerStatus::Resolved));
    assert!(BlockerStatus::Open.can_transition_to(BlockerStatus::Ignored));
    assert!(!BlockerStatus::Resolved.can_transition_to(BlockerStatus::Open));
    assert!(!BlockerStatus::Ignored.can_transition_to(BlockerStatus::Resolved));
    assert!(!BlockerStatus::Open.can_transition_to(BlockerStatus::Open));
}

#[test]
fn member_ref_accepts_id_or_populated_member() {
    let by_id: MemberRef = serde_json::from_str("\"u-1\"").expect("id");
    assert_eq!(by_id.id().as_str(), "u-1");

    let populated: MemberRef = serde_json::from_value(serde_json::json!({
        "uid": "u-2",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "designation": "Tech Lead"
    }))
    .expect("member");
    assert_eq!(populated.id().as_str(), "u-2");
}

#[test]
fn report_defaults_is_existing_to_false() {
    let report: AiReport = serde_json::from_value(serde_json::json!({
        "uid": "r-1",
        "reportType": "team",
        "targetTeam": "Engineering",
        "reportPeriod": "monthly",
        "startDate": "2024-01-01T00:00:00Z",
        "endDate": "2024-01-31T00:00:00Z",
        "summary": "steady",
        "actionItems": [{ "priority": "high", "title": "Unblock CI" }],
        "insights": ["CI is flaky"],
        "generatedAt": "2024-02-01T00:00:00Z"
    }))
    .expect("report");

    assert!(!report.is_existing);
    assert_eq!(report.report_period, ReportPeriod::Monthly);
    assert_eq!(report.action_items[0].description, "");
}
