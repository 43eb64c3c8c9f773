use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        AiReport, Blocker, BlockerId, BlockerStats, ReportId, ReportPeriod, TeamMember, User,
        UserId,
    },
    error::ApiError,
    protocol::{
        BlockerListResponse, BlockerQuery, CreateBlockerRequest, GenerateReportQuery,
        RefreshTokenResponse, UpdateBlockerRequest,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    credentials::CredentialStore,
    error::{ClientError, ClientResult},
};

/// The remote backend as seen by the client core.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn fetch_profile(&self) -> ClientResult<User>;
    async fn refresh_token(&self) -> ClientResult<RefreshTokenResponse>;

    async fn my_blockers(&self, query: &BlockerQuery) -> ClientResult<BlockerListResponse>;
    async fn my_stats(&self) -> ClientResult<BlockerStats>;
    async fn team_blockers(
        &self,
        team: &str,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse>;
    async fn team_stats(&self, team: &str) -> ClientResult<BlockerStats>;
    async fn member_blockers(
        &self,
        member: &UserId,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse>;
    async fn create_blocker(&self, request: &CreateBlockerRequest) -> ClientResult<Blocker>;
    async fn update_blocker(
        &self,
        id: &BlockerId,
        request: &UpdateBlockerRequest,
    ) -> ClientResult<Blocker>;

    async fn team_members(&self, team: &str) -> ClientResult<Vec<TeamMember>>;

    async fn generate_my_report(&self, period: ReportPeriod) -> ClientResult<AiReport>;
    async fn generate_member_report(
        &self,
        member: &UserId,
        period: ReportPeriod,
    ) -> ClientResult<AiReport>;
    async fn generate_team_report(&self, team: &str, period: ReportPeriod)
        -> ClientResult<AiReport>;
    async fn my_reports(&self) -> ClientResult<Vec<AiReport>>;
    async fn team_reports(&self, team: &str) -> ClientResult<Vec<AiReport>>;
    async fn member_reports(&self, member: &UserId) -> ClientResult<Vec<AiReport>>;
    async fn report(&self, id: &ReportId) -> ClientResult<AiReport>;
}

pub struct HttpTrackerApi {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTrackerApi {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> ClientResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(http, base_url, credentials)
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        credentials: Arc<dyn CredentialStore>,
    ) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "api url cannot carry paths: {base_url}"
            )));
        }
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Appends percent-encoded path segments to the configured base url.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(segments);
        debug!("api: {method} {url}");
        let mut builder = self.http.request(method, url);
        let token = self
            .credentials
            .load_token()
            .await
            .map_err(ClientError::Credentials)?;
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let builder = self.request(Method::GET, segments).await?;
        self.send(builder).await
    }

    async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &Q,
    ) -> ClientResult<T> {
        let builder = self.request(Method::GET, segments).await?.query(query);
        self.send(builder).await
    }

    async fn post_generate(
        &self,
        segments: &[&str],
        period: ReportPeriod,
    ) -> ClientResult<AiReport> {
        let builder = self
            .request(Method::POST, segments)
            .await?
            .query(&GenerateReportQuery { period });
        self.send(builder).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("api: 401 received; clearing stored credentials");
            if let Err(err) = self.credentials.clear_token().await {
                warn!("api: failed to clear stored token after 401: {err:#}");
            }
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ApiError>(&raw).unwrap_or_else(|_| {
                let message = if raw.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    raw
                };
                ApiError::new(status.as_u16(), message)
            });
            return Err(ClientError::from_api_error(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn fetch_profile(&self) -> ClientResult<User> {
        self.get(&["auth", "me"]).await
    }

    async fn refresh_token(&self) -> ClientResult<RefreshTokenResponse> {
        let builder = self.request(Method::POST, &["auth", "refresh"]).await?;
        self.send(builder).await
    }

    async fn my_blockers(&self, query: &BlockerQuery) -> ClientResult<BlockerListResponse> {
        self.get_with_query(&["blockers", "my"], query).await
    }

    async fn my_stats(&self) -> ClientResult<BlockerStats> {
        self.get(&["blockers", "my", "stats"]).await
    }

    async fn team_blockers(
        &self,
        team: &str,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse> {
        self.get_with_query(&["blockers", "team", team], query)
            .await
    }

    async fn team_stats(&self, team: &str) -> ClientResult<BlockerStats> {
        self.get(&["blockers", "team", team, "stats"]).await
    }

    async fn member_blockers(
        &self,
        member: &UserId,
        query: &BlockerQuery,
    ) -> ClientResult<BlockerListResponse> {
        self.get_with_query(&["blockers", "member", member.as_str()], query)
            .await
    }

    async fn create_blocker(&self, request: &CreateBlockerRequest) -> ClientResult<Blocker> {
        let builder = self.request(Method::POST, &["blockers"]).await?.json(request);
        self.send(builder).await
    }

    async fn update_blocker(
        &self,
        id: &BlockerId,
        request: &UpdateBlockerRequest,
    ) -> ClientResult<Blocker> {
        let builder = self
            .request(Method::PATCH, &["blockers", id.as_str()])
            .await?
            .json(request);
        self.send(builder).await
    }

    async fn team_members(&self, team: &str) -> ClientResult<Vec<TeamMember>> {
        self.get(&["team-members", "team", team]).await
    }

    async fn generate_my_report(&self, period: ReportPeriod) -> ClientResult<AiReport> {
        self.post_generate(&["ai-reports", "generate", "my"], period)
            .await
    }

    async fn generate_member_report(
        &self,
        member: &UserId,
        period: ReportPeriod,
    ) -> ClientResult<AiReport> {
        self.post_generate(&["ai-reports", "generate", "member", member.as_str()], period)
            .await
    }

    async fn generate_team_report(
        &self,
        team: &str,
        period: ReportPeriod,
    ) -> ClientResult<AiReport> {
        self.post_generate(&["ai-reports", "generate", "team", team], period)
            .await
    }

    async fn my_reports(&self) -> ClientResult<Vec<AiReport>> {
        self.get(&["ai-reports", "my"]).await
    }

    async fn team_reports(&self, team: &str) -> ClientResult<Vec<AiReport>> {
        self.get(&["ai-reports", "team", team]).await
    }

    async fn member_reports(&self, member: &UserId) -> ClientResult<Vec<AiReport>> {
        self.get(&["ai-reports", "member", member.as_str()]).await
    }

    async fn report(&self, id: &ReportId) -> ClientResult<AiReport> {
        self.get(&["ai-reports", id.as_str()]).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
