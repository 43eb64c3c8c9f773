use std::{sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use shared::{
    domain::{
        AiReport, Blocker, BlockerId, BlockerStats, BlockerStatus, ReportId, ReportPeriod, User,
        UserId,
    },
    protocol::{BlockerListResponse, BlockerQuery, CreateBlockerRequest, UpdateBlockerRequest},
};
use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod overview;
pub mod reports;
pub mod request;
pub mod stats;
pub mod store;

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;

pub use api::{HttpTrackerApi, TrackerApi};
pub use config::Settings;
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use error::{ClientError, ClientResult};
pub use overview::{MemberOverview, TeamOverview};
pub use reports::{ReconcileOutcome, ReportContext};
pub use request::{RequestFamily, RequestPhase, RequestState, RequestTicket};
pub use store::{DomainStore, StoreEvent};

const DEFAULT_MEMBER_FANOUT_LIMIT: usize = 8;
/// Blockers sampled per member when building a team overview.
const MEMBER_BLOCKER_SAMPLE: u32 = 100;

/// Remote operations that keep a [`DomainStore`] in step with the backend.
///
/// Every operation marks its request family pending, awaits the API, then
/// settles the family with the payload or a fixed user-facing message. The
/// underlying error is logged and also returned to the caller. A 401 from any
/// call ends the session.
pub struct MomentumClient {
    api: Arc<dyn TrackerApi>,
    store: Arc<DomainStore>,
    member_fanout_limit: usize,
}

impl MomentumClient {
    pub fn new(api: Arc<dyn TrackerApi>, store: Arc<DomainStore>) -> Self {
        Self {
            api,
            store,
            member_fanout_limit: DEFAULT_MEMBER_FANOUT_LIMIT,
        }
    }

    pub fn with_member_fanout_limit(mut self, limit: usize) -> Self {
        self.member_fanout_limit = limit.max(1);
        self
    }

    /// Wires the HTTP backend and a store restored from `credentials`.
    pub async fn from_settings(
        settings: &Settings,
        credentials: Arc<dyn CredentialStore>,
    ) -> ClientResult<Self> {
        let api = HttpTrackerApi::with_timeout(
            &settings.api_base_url,
            Duration::from_secs(settings.request_timeout_secs),
            credentials.clone(),
        )?;
        let store = DomainStore::restore(credentials).await?;
        Ok(Self::new(Arc::new(api), Arc::new(store))
            .with_member_fanout_limit(settings.member_fanout_limit))
    }

    pub fn store(&self) -> &Arc<DomainStore> {
        &self.store
    }

    pub async fn cancel(&self, family: RequestFamily) -> bool {
        self.store.cancel(family).await
    }

    /// Records a failed call against `ticket` and hands the error back.
    async fn fail<T>(
        &self,
        ticket: RequestTicket,
        label: &'static str,
        err: ClientError,
    ) -> ClientResult<T> {
        warn!(family = ticket.family().name(), "{label}: {err}");
        if err.is_unauthorized() {
            self.store.session_expired().await;
        }
        self.store.reject(ticket, label).await;
        Err(err)
    }

    pub async fn sign_in(&self, token: &str) -> ClientResult<User> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ClientError::Validation("token must not be empty".into()));
        }
        self.store.set_token(token).await?;
        let user = self.fetch_profile().await?;
        info!("client: signed in as {}", user.uid);
        Ok(user)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.store.sign_out().await
    }

    pub async fn fetch_profile(&self) -> ClientResult<User> {
        let ticket = self.store.begin(RequestFamily::Profile).await;
        match self.api.fetch_profile().await {
            Ok(user) => {
                self.store.profile_loaded(ticket, user.clone()).await;
                Ok(user)
            }
            Err(err) => self.fail(ticket, "Failed to fetch profile", err).await,
        }
    }

    pub async fn refresh_token(&self) -> ClientResult<User> {
        let ticket = self.store.begin(RequestFamily::TokenRefresh).await;
        match self.api.refresh_token().await {
            Ok(refreshed) => {
                let user = refreshed.user.clone();
                self.store.token_refreshed(ticket, refreshed).await?;
                Ok(user)
            }
            Err(err) => self.fail(ticket, "Failed to refresh token", err).await,
        }
    }

    async fn load_blockers(
        &self,
        label: &'static str,
        result: impl std::future::Future<Output = ClientResult<BlockerListResponse>>,
    ) -> ClientResult<BlockerListResponse> {
        let ticket = self.store.begin(RequestFamily::Blockers).await;
        match result.await {
            Ok(page) => {
                self.store.blockers_loaded(ticket, page.clone()).await;
                Ok(page)
            }
            Err(err) => self.fail(ticket, label, err).await,
        }
    }

    pub async fn fetch_my_blockers(
        &self,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse> {
        self.load_blockers("Failed to fetch blockers", self.api.my_blockers(query))
            .await
    }

    pub async fn fetch_team_blockers(
        &self,
        team: &str,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse> {
        self.load_blockers(
            "Failed to fetch team blockers",
            self.api.team_blockers(team, query),
        )
        .await
    }

    pub async fn fetch_member_blockers(
        &self,
        member: &UserId,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse> {
        self.load_blockers(
            "Failed to fetch member blockers",
            self.api.member_blockers(member, query),
        )
        .await
    }

    async fn load_stats(
        &self,
        label: &'static str,
        result: impl std::future::Future<Output = ClientResult<BlockerStats>>,
    ) -> ClientResult<BlockerStats> {
        let ticket = self.store.begin(RequestFamily::BlockerStats).await;
        match result.await {
            Ok(stats) => {
                self.store.stats_loaded(ticket, stats.clone()).await;
                Ok(stats)
            }
            Err(err) => self.fail(ticket, label, err).await,
        }
    }

    pub async fn fetch_my_stats(&self) -> ClientResult<BlockerStats> {
        self.load_stats("Failed to fetch stats", self.api.my_stats())
            .await
    }

    pub async fn fetch_team_stats(&self, team: &str) -> ClientResult<BlockerStats> {
        self.load_stats("Failed to fetch team stats", self.api.team_stats(team))
            .await
    }

    pub async fn create_blocker(&self, mut request: CreateBlockerRequest) -> ClientResult<Blocker> {
        let ticket = self.store.begin(RequestFamily::BlockerMutation).await;
        request.description = request.description.trim().to_string();
        if request.description.is_empty() {
            let err = ClientError::Validation("blocker description must not be empty".into());
            return self.fail(ticket, "Description is required", err).await;
        }
        match self.api.create_blocker(&request).await {
            Ok(blocker) => {
                info!("client: reported blocker {}", blocker.uid);
                self.store.blocker_created(ticket, blocker.clone()).await;
                Ok(blocker)
            }
            Err(err) => self.fail(ticket, "Failed to create blocker", err).await,
        }
    }

    /// Sends a partial update. A status change is checked against the listed
    /// blocker's current status before anything goes over the wire.
    pub async fn update_blocker(
        &self,
        id: &BlockerId,
        request: UpdateBlockerRequest,
    ) -> ClientResult<Blocker> {
        let ticket = self.store.begin(RequestFamily::BlockerMutation).await;
        if request.is_empty() {
            let err = ClientError::Validation("update carries no changes".into());
            return self.fail(ticket, "Nothing to update", err).await;
        }
        if let (Some(next), Some(current)) = (request.status, self.store.blocker(id).await) {
            if !current.status.can_transition_to(next) {
                let err = ClientError::Validation(format!(
                    "blocker {id} cannot move from {:?} to {next:?}",
                    current.status
                ));
                return self.fail(ticket, "Invalid status change", err).await;
            }
        }
        match self.api.update_blocker(id, &request).await {
            Ok(blocker) => {
                self.store.blocker_updated(ticket, blocker.clone()).await;
                Ok(blocker)
            }
            Err(err) => self.fail(ticket, "Failed to update blocker", err).await,
        }
    }

    pub async fn resolve_blocker(
        &self,
        id: &BlockerId,
        manager_notes: Option<String>,
    ) -> ClientResult<Blocker> {
        self.settle_blocker(id, BlockerStatus::Resolved, manager_notes)
            .await
    }

    pub async fn ignore_blocker(
        &self,
        id: &BlockerId,
        manager_notes: Option<String>,
    ) -> ClientResult<Blocker> {
        self.settle_blocker(id, BlockerStatus::Ignored, manager_notes)
            .await
    }

    async fn settle_blocker(
        &self,
        id: &BlockerId,
        status: BlockerStatus,
        manager_notes: Option<String>,
    ) -> ClientResult<Blocker> {
        let request = UpdateBlockerRequest {
            manager_notes,
            ..UpdateBlockerRequest::status(status)
        };
        self.update_blocker(id, request).await
    }

    async fn load_reports(
        &self,
        context: ReportContext,
        label: &'static str,
        result: impl std::future::Future<Output = ClientResult<Vec<AiReport>>>,
    ) -> ClientResult<Vec<AiReport>> {
        let ticket = self.store.begin(RequestFamily::Reports).await;
        match result.await {
            Ok(reports) => {
                self.store
                    .reports_loaded(ticket, context, reports.clone())
                    .await;
                Ok(reports)
            }
            Err(err) => self.fail(ticket, label, err).await,
        }
    }

    pub async fn fetch_my_reports(&self) -> ClientResult<Vec<AiReport>> {
        self.load_reports(
            ReportContext::Own,
            "Failed to fetch reports",
            self.api.my_reports(),
        )
        .await
    }

    pub async fn fetch_team_reports(&self, team: &str) -> ClientResult<Vec<AiReport>> {
        self.load_reports(
            ReportContext::Team(team.to_string()),
            "Failed to fetch team reports",
            self.api.team_reports(team),
        )
        .await
    }

    pub async fn fetch_member_reports(&self, member: &UserId) -> ClientResult<Vec<AiReport>> {
        self.load_reports(
            ReportContext::Member(member.clone()),
            "Failed to fetch member reports",
            self.api.member_reports(member),
        )
        .await
    }

    pub async fn fetch_report(&self, id: &ReportId) -> ClientResult<AiReport> {
        let ticket = self.store.begin(RequestFamily::Reports).await;
        match self.api.report(id).await {
            Ok(report) => {
                self.store.report_loaded(ticket, report.clone()).await;
                Ok(report)
            }
            Err(err) => self.fail(ticket, "Failed to fetch report", err).await,
        }
    }

    async fn generate(
        &self,
        context: ReportContext,
        label: &'static str,
        result: impl std::future::Future<Output = ClientResult<AiReport>>,
    ) -> ClientResult<AiReport> {
        let ticket = self.store.begin(RequestFamily::ReportGeneration).await;
        match result.await {
            Ok(report) => {
                info!(
                    "client: report {} generated for {context} existing={}",
                    report.uid, report.is_existing
                );
                self.store
                    .report_generated(ticket, context, report.clone())
                    .await;
                Ok(report)
            }
            Err(err) => self.fail(ticket, label, err).await,
        }
    }

    pub async fn generate_my_report(&self, period: ReportPeriod) -> ClientResult<AiReport> {
        self.generate(
            ReportContext::Own,
            "Failed to generate report",
            self.api.generate_my_report(period),
        )
        .await
    }

    pub async fn generate_member_report(
        &self,
        member: &UserId,
        period: ReportPeriod,
    ) -> ClientResult<AiReport> {
        self.generate(
            ReportContext::Member(member.clone()),
            "Failed to generate report",
            self.api.generate_member_report(member, period),
        )
        .await
    }

    pub async fn generate_team_report(
        &self,
        team: &str,
        period: ReportPeriod,
    ) -> ClientResult<AiReport> {
        self.generate(
            ReportContext::Team(team.to_string()),
            "Failed to generate team report",
            self.api.generate_team_report(team, period),
        )
        .await
    }

    /// Aggregates every member's recent blockers with bounded concurrency. The result is
    /// owned by the caller; no store slice is touched apart from session
    /// expiry on a 401.
    pub async fn load_team_overview(
        &self,
        team: &str,
        previous: Option<&TeamOverview>,
    ) -> ClientResult<TeamOverview> {
        let members = match self.api.team_members(team).await {
            Ok(members) => members,
            Err(err) => {
                warn!("overview: failed to list members of team={team}: {err}");
                if err.is_unauthorized() {
                    self.store.session_expired().await;
                }
                return Err(err);
            }
        };

        let results: Vec<_> = stream::iter(members)
            .map(|member| {
                let api = Arc::clone(&self.api);
                async move {
                    let query = BlockerQuery::with_limit(MEMBER_BLOCKER_SAMPLE);
                    let result = api
                        .member_blockers(&member.uid, &query)
                        .await
                        .map(|page| stats::aggregate(&page.blockers));
                    (member, result)
                }
            })
            .buffered(self.member_fanout_limit)
            .collect()
            .await;

        if results
            .iter()
            .any(|(_, result)| matches!(result, Err(err) if err.is_unauthorized()))
        {
            self.store.session_expired().await;
        }

        let overview = TeamOverview::assemble(results, previous);
        info!(
            "overview: team={team} members={} open={}",
            overview.members.len(),
            overview.total_open_blockers()
        );
        Ok(overview)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
