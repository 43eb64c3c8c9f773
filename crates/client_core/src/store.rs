//! Client-side state container with three independent slices.
//!
//! The store is the only shared mutable state in the client. Every mutation
//! goes through a method on [`DomainStore`] and is applied under a single
//! write lock, so readers never observe a half-applied update. Slices never
//! update each other; views spanning slices are recomputed by the caller.

use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{AiReport, Blocker, BlockerId, BlockerStats, User},
    protocol::{BlockerListResponse, RefreshTokenResponse},
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::{
    credentials::CredentialStore,
    error::{ClientError, ClientResult},
    reports::{reconcile, ReconcileOutcome, ReportContext},
    request::{RequestFamily, RequestState, RequestTicket, RequestTracker, TargetMarks},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SessionChanged,
    /// A call was rejected with 401 and the session was dropped.
    SessionExpired,
    BlockersChanged,
    ReportsChanged,
    RequestChanged(RequestFamily),
}

#[derive(Debug, Clone)]
pub struct SessionSlice {
    user: Option<User>,
    token: Option<String>,
    authenticated: bool,
    profile: RequestTracker,
    refresh: RequestTracker,
}

impl SessionSlice {
    fn new(token: Option<String>) -> Self {
        Self {
            authenticated: token.is_some(),
            user: None,
            token,
            profile: RequestTracker::new(RequestFamily::Profile),
            refresh: RequestTracker::new(RequestFamily::TokenRefresh),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_manager(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.is_manager)
    }

    pub fn request(&self) -> &RequestState {
        self.profile.state()
    }

    pub fn refresh_request(&self) -> &RequestState {
        self.refresh.state()
    }

    fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.authenticated = false;
    }
}

#[derive(Debug, Clone)]
pub struct BlockersSlice {
    blockers: Vec<Blocker>,
    total: u32,
    stats: Option<BlockerStats>,
    list: RequestTracker,
    stats_request: RequestTracker,
    mutation: RequestTracker,
}

impl BlockersSlice {
    fn new() -> Self {
        Self {
            blockers: Vec::new(),
            total: 0,
            stats: None,
            list: RequestTracker::new(RequestFamily::Blockers),
            stats_request: RequestTracker::new(RequestFamily::BlockerStats),
            mutation: RequestTracker::new(RequestFamily::BlockerMutation),
        }
    }

    pub fn blockers(&self) -> &[Blocker] {
        &self.blockers
    }

    /// Server-side total for the last list query, which may exceed the page.
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn stats(&self) -> Option<&BlockerStats> {
        self.stats.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.list.state().is_pending()
    }

    pub fn request(&self, family: RequestFamily) -> Option<&RequestState> {
        match family {
            RequestFamily::Blockers => Some(self.list.state()),
            RequestFamily::BlockerStats => Some(self.stats_request.state()),
            RequestFamily::BlockerMutation => Some(self.mutation.state()),
            _ => None,
        }
    }

    /// The most recent error across the slice's request families.
    pub fn error(&self) -> Option<&str> {
        [&self.list, &self.mutation, &self.stats_request]
            .into_iter()
            .find_map(|tracker| tracker.state().error.as_deref())
    }
}

/// What a `Reports` family settlement writes. List fetches for different
/// contexts and single-report fetches never make each other stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReportTarget {
    Cache(ReportContext),
    Current,
}

#[derive(Debug, Clone)]
pub struct ReportsSlice {
    caches: HashMap<ReportContext, Vec<AiReport>>,
    current: Option<AiReport>,
    list: RequestTracker,
    list_marks: TargetMarks<ReportTarget>,
    generation: RequestTracker,
}

impl ReportsSlice {
    fn new() -> Self {
        Self {
            caches: HashMap::new(),
            current: None,
            list: RequestTracker::new(RequestFamily::Reports),
            list_marks: TargetMarks::default(),
            generation: RequestTracker::new(RequestFamily::ReportGeneration),
        }
    }

    /// Newest-first reports cached for `context`.
    pub fn reports(&self, context: &ReportContext) -> &[AiReport] {
        self.caches.get(context).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn current_report(&self) -> Option<&AiReport> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.list.state().is_pending()
    }

    pub fn is_generating(&self) -> bool {
        self.generation.state().is_pending()
    }

    pub fn request(&self, family: RequestFamily) -> Option<&RequestState> {
        match family {
            RequestFamily::Reports => Some(self.list.state()),
            RequestFamily::ReportGeneration => Some(self.generation.state()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        [&self.generation, &self.list]
            .into_iter()
            .find_map(|tracker| tracker.state().error.as_deref())
    }
}

struct StoreState {
    session: SessionSlice,
    blockers: BlockersSlice,
    reports: ReportsSlice,
}

impl StoreState {
    fn tracker(&self, family: RequestFamily) -> &RequestTracker {
        match family {
            RequestFamily::Profile => &self.session.profile,
            RequestFamily::TokenRefresh => &self.session.refresh,
            RequestFamily::Blockers => &self.blockers.list,
            RequestFamily::BlockerStats => &self.blockers.stats_request,
            RequestFamily::BlockerMutation => &self.blockers.mutation,
            RequestFamily::Reports => &self.reports.list,
            RequestFamily::ReportGeneration => &self.reports.generation,
        }
    }

    fn tracker_mut(&mut self, family: RequestFamily) -> &mut RequestTracker {
        match family {
            RequestFamily::Profile => &mut self.session.profile,
            RequestFamily::TokenRefresh => &mut self.session.refresh,
            RequestFamily::Blockers => &mut self.blockers.list,
            RequestFamily::BlockerStats => &mut self.blockers.stats_request,
            RequestFamily::BlockerMutation => &mut self.blockers.mutation,
            RequestFamily::Reports => &mut self.reports.list,
            RequestFamily::ReportGeneration => &mut self.reports.generation,
        }
    }
}

pub struct DomainStore {
    state: RwLock<StoreState>,
    credentials: Arc<dyn CredentialStore>,
    events: broadcast::Sender<StoreEvent>,
}

impl DomainStore {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self::with_token(credentials, None)
    }

    /// Starts authenticated when the credential store already holds a token.
    pub async fn restore(credentials: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let token = credentials
            .load_token()
            .await
            .map_err(ClientError::Credentials)?;
        Ok(Self::with_token(credentials, token))
    }

    fn with_token(credentials: Arc<dyn CredentialStore>, token: Option<String>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: RwLock::new(StoreState {
                session: SessionSlice::new(token),
                blockers: BlockersSlice::new(),
                reports: ReportsSlice::new(),
            }),
            credentials,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }

    pub async fn session(&self) -> SessionSlice {
        self.state.read().await.session.clone()
    }

    pub async fn blockers(&self) -> BlockersSlice {
        self.state.read().await.blockers.clone()
    }

    pub async fn reports(&self) -> ReportsSlice {
        self.state.read().await.reports.clone()
    }

    pub async fn request_state(&self, family: RequestFamily) -> RequestState {
        self.state.read().await.tracker(family).state().clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.authenticated
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.session.user.clone()
    }

    pub async fn blocker(&self, id: &BlockerId) -> Option<Blocker> {
        self.state
            .read()
            .await
            .blockers
            .blockers
            .iter()
            .find(|blocker| &blocker.uid == id)
            .cloned()
    }

    pub async fn reports_for(&self, context: &ReportContext) -> Vec<AiReport> {
        self.state.read().await.reports.reports(context).to_vec()
    }

    pub async fn current_report(&self) -> Option<AiReport> {
        self.state.read().await.reports.current.clone()
    }

    pub async fn begin(&self, family: RequestFamily) -> RequestTicket {
        let ticket = self.state.write().await.tracker_mut(family).begin();
        debug!(family = family.name(), seq = ticket.seq(), "store: request pending");
        self.emit(StoreEvent::RequestChanged(family));
        ticket
    }

    /// Records a failed settlement. A rejected profile fetch also drops authentication.
    pub async fn reject(&self, ticket: RequestTicket, message: impl Into<String>) -> bool {
        let family = ticket.family();
        let recorded = {
            let mut state = self.state.write().await;
            let recorded = state.tracker_mut(family).reject(ticket, message);
            if recorded && family == RequestFamily::Profile {
                state.session.authenticated = false;
            }
            recorded
        };
        if recorded {
            self.emit(StoreEvent::RequestChanged(family));
        }
        recorded
    }

    /// Abandons in-flight requests of `family`; their results will be discarded.
    pub async fn cancel(&self, family: RequestFamily) -> bool {
        let cancelled = self.state.write().await.tracker_mut(family).cancel();
        if cancelled {
            info!(family = family.name(), "store: cancelled in-flight requests");
            self.emit(StoreEvent::RequestChanged(family));
        }
        cancelled
    }

    pub async fn clear_error(&self, family: RequestFamily) {
        self.state.write().await.tracker_mut(family).clear_error();
        self.emit(StoreEvent::RequestChanged(family));
    }

    pub async fn set_token(&self, token: &str) -> ClientResult<()> {
        self.credentials
            .save_token(token)
            .await
            .map_err(ClientError::Credentials)?;
        {
            let mut state = self.state.write().await;
            state.session.token = Some(token.to_string());
            state.session.authenticated = true;
        }
        self.emit(StoreEvent::SessionChanged);
        Ok(())
    }

    pub async fn set_user(&self, user: User) {
        self.state.write().await.session.user = Some(user);
        self.emit(StoreEvent::SessionChanged);
    }

    /// Drops the session and abandons in-flight profile and refresh calls so
    /// neither can sign the user back in.
    pub async fn sign_out(&self) -> ClientResult<()> {
        let cancelled = {
            let mut state = self.state.write().await;
            let cancelled = [RequestFamily::Profile, RequestFamily::TokenRefresh]
                .into_iter()
                .filter(|family| state.tracker_mut(*family).cancel())
                .collect::<Vec<_>>();
            self.credentials
                .clear_token()
                .await
                .map_err(ClientError::Credentials)?;
            state.session.clear();
            cancelled
        };
        info!("store: signed out");
        for family in cancelled {
            self.emit(StoreEvent::RequestChanged(family));
        }
        self.emit(StoreEvent::SessionChanged);
        Ok(())
    }

    /// Mirrors a credential removal performed by the API client after a 401.
    pub async fn session_expired(&self) {
        self.state.write().await.session.clear();
        self.emit(StoreEvent::SessionExpired);
        self.emit(StoreEvent::SessionChanged);
    }

    pub async fn profile_loaded(&self, ticket: RequestTicket, user: User) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let applied = state.session.profile.fulfill(ticket);
            if applied {
                state.session.user = Some(user);
                state.session.authenticated = true;
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::SessionChanged);
        }
        applied
    }

    pub async fn token_refreshed(
        &self,
        ticket: RequestTicket,
        refreshed: RefreshTokenResponse,
    ) -> ClientResult<bool> {
        {
            // held across the save; sign_out clears the credential under the same lock
            let mut state = self.state.write().await;
            if !state.session.refresh.is_live(ticket) {
                return Ok(false);
            }
            self.credentials
                .save_token(&refreshed.access_token)
                .await
                .map_err(ClientError::Credentials)?;
            state.session.refresh.fulfill(ticket);
            state.session.token = Some(refreshed.access_token);
            state.session.user = Some(refreshed.user);
            state.session.authenticated = true;
        }
        self.emit(StoreEvent::SessionChanged);
        Ok(true)
    }

    pub async fn blockers_loaded(&self, ticket: RequestTicket, page: BlockerListResponse) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let applied = state.blockers.list.fulfill(ticket);
            if applied {
                state.blockers.blockers = page.blockers;
                state.blockers.total = page.total;
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::BlockersChanged);
        }
        applied
    }

    pub async fn stats_loaded(&self, ticket: RequestTicket, stats: BlockerStats) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let applied = state.blockers.stats_request.fulfill(ticket);
            if applied {
                state.blockers.stats = Some(stats);
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::BlockersChanged);
        }
        applied
    }

    pub async fn blocker_created(&self, ticket: RequestTicket, blocker: Blocker) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let applied = state.blockers.mutation.complete(ticket);
            if applied {
                state.blockers.blockers.insert(0, blocker);
                state.blockers.total += 1;
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::BlockersChanged);
        }
        applied
    }

    /// Replaces the listed blocker with the server copy; unlisted blockers are ignored.
    pub async fn blocker_updated(&self, ticket: RequestTicket, blocker: Blocker) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let applied = state.blockers.mutation.complete(ticket);
            if applied {
                if let Some(slot) = state
                    .blockers
                    .blockers
                    .iter_mut()
                    .find(|existing| existing.uid == blocker.uid)
                {
                    *slot = blocker;
                }
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::BlockersChanged);
        }
        applied
    }

    pub async fn clear_blockers(&self) {
        {
            let mut state = self.state.write().await;
            state.blockers.blockers.clear();
            state.blockers.total = 0;
        }
        self.emit(StoreEvent::BlockersChanged);
    }

    /// Replaces the cache for `context` unless a newer fetch for the same
    /// context already landed.
    pub async fn reports_loaded(
        &self,
        ticket: RequestTicket,
        context: ReportContext,
        reports: Vec<AiReport>,
    ) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let slice = &mut state.reports;
            let applied = slice.list.complete(ticket)
                && slice
                    .list_marks
                    .advance(ReportTarget::Cache(context.clone()), ticket);
            if applied {
                slice.caches.insert(context, reports);
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::ReportsChanged);
        }
        applied
    }

    /// Reconciles a generation result into the context's cache and makes it current.
    pub async fn report_generated(
        &self,
        ticket: RequestTicket,
        context: ReportContext,
        report: AiReport,
    ) -> Option<ReconcileOutcome> {
        let outcome = {
            let mut state = self.state.write().await;
            if !state.reports.generation.complete(ticket) {
                return None;
            }
            state.reports.current = Some(report.clone());
            let cache = state.reports.caches.entry(context.clone()).or_default();
            reconcile(cache, report)
        };
        debug!("store: reconciled generated report context={context} outcome={outcome:?}");
        self.emit(StoreEvent::ReportsChanged);
        Some(outcome)
    }

    pub async fn report_loaded(&self, ticket: RequestTicket, report: AiReport) -> bool {
        let applied = {
            let mut state = self.state.write().await;
            let slice = &mut state.reports;
            let applied = slice.list.complete(ticket)
                && slice.list_marks.advance(ReportTarget::Current, ticket);
            if applied {
                slice.current = Some(report);
            }
            applied
        };
        if applied {
            self.emit(StoreEvent::ReportsChanged);
        }
        applied
    }

    pub async fn clear_current_report(&self) {
        self.state.write().await.reports.current = None;
        self.emit(StoreEvent::ReportsChanged);
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
