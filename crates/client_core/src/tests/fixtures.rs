use anyhow::Result;
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use shared::domain::{
    AiReport, Blocker, BlockerCategory, BlockerId, BlockerSeverity, BlockerStatus, MemberRef,
    ReportId, ReportPeriod, ReportType, TeamMember, User, UserId,
};
use tokio::net::TcpListener;

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
}

pub fn user(uid: &str, is_manager: bool) -> User {
    User {
        uid: UserId::new(uid),
        email: format!("{uid}@example.com"),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        profile_pic: None,
        designation: Some("Engineer".into()),
        team: Some("Platform".into()),
        is_manager,
    }
}

pub fn member(uid: &str) -> TeamMember {
    TeamMember {
        uid: UserId::new(uid),
        first_name: uid.to_uppercase(),
        last_name: "Tester".into(),
        email: format!("{uid}@example.com"),
        slack_id: None,
        profile_pic: None,
        designation: None,
        team: Some("Platform".into()),
        is_manager: false,
        joined_date: None,
        status: None,
    }
}

pub fn blocker(uid: &str, status: BlockerStatus, severity: BlockerSeverity) -> Blocker {
    Blocker {
        uid: BlockerId::new(uid),
        team_member: MemberRef::Id(UserId::new("member-1")),
        description: format!("blocked on {uid}"),
        category: BlockerCategory::Technical,
        severity,
        status,
        timestamp: at(4),
        reported_via: "slack".into(),
        manager_notes: None,
        slack_message_id: None,
        attachments: Vec::new(),
        created_at: Some(at(4)),
        updated_at: None,
    }
}

pub fn report(uid: &str, summary: &str, is_existing: bool) -> AiReport {
    AiReport {
        uid: ReportId::new(uid),
        report_type: ReportType::Individual,
        target_member: Some(UserId::new("member-1")),
        target_team: None,
        report_period: ReportPeriod::Weekly,
        start_date: at(4),
        end_date: at(4) + Duration::days(7),
        summary: summary.into(),
        action_items: Vec::new(),
        insights: Vec::new(),
        generated_at: at(11),
        is_existing,
    }
}

/// Serves `app` on an ephemeral port and returns the api base url.
pub async fn spawn_api(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, Router::new().nest("/api", app)).await;
    });
    Ok(format!("http://{addr}/api"))
}
