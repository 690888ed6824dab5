//! The authenticated request pipeline.
//!
//! Every call made through [`SessionClient::execute`] carries the stored
//! access token. A 401 on a request that has not been retried yet starts
//! (or joins) a single token refresh; once it settles the request is
//! replayed with the new token. A failed refresh, or a replay that is
//! rejected again, tears the session down.

use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, AuthEndpoint, HttpTransport, RefreshError, Transport};
use crate::auth::{CredentialPair, CredentialStore};
use crate::config::Config;

use super::events::{SessionEvent, SessionEvents, TerminationReason};
use super::gate::{Admission, RefreshGate, RefreshTicket};

/// How the leader got hold of a usable access token
enum Renewal {
    /// The refresh endpoint issued a new one
    Refreshed(String),
    /// Another refresh finished while the failing request was in flight
    AlreadyCurrent(String),
}

struct Inner {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthEndpoint>,
    store: CredentialStore,
    gate: RefreshGate,
    events: SessionEvents,
}

/// Session-aware HTTP client. Construct one per process and share clones;
/// all clones use the same refresh gate.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, auth: Arc<dyn AuthEndpoint>, store: CredentialStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                auth,
                store,
                gate: RefreshGate::new(),
                events: SessionEvents::new(),
            }),
        }
    }

    /// reqwest transport and auth endpoint for the configured API, sharing one connection pool
    pub fn from_config(config: &Config, store: CredentialStore) -> Result<Self, ApiError> {
        let transport = HttpTransport::with_timeout(&config.api_base_url, config.request_timeout())?;
        let auth = transport.auth_endpoint();
        Ok(Self::new(Arc::new(transport), Arc::new(auth), store))
    }

    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    pub(crate) fn auth(&self) -> &dyn AuthEndpoint {
        self.inner.auth.as_ref()
    }

    pub(crate) fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.gate.is_refreshing()
    }

    /// Requests currently waiting for the in-flight refresh
    pub fn queued_requests(&self) -> usize {
        self.inner.gate.queued()
    }

    /// Send a request with the stored credentials.
    ///
    /// Any status other than a recoverable 401 comes back unchanged as `Ok`.
    /// Errors are transport failures, credential store failures and failed
    /// refreshes.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let bearer = self.inner.store.access_token()?;
        let response = self.inner.transport.send(&request, bearer.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.is_retried() {
            return Ok(response);
        }

        request.mark_retried();
        match self.inner.gate.admit() {
            Admission::Leader(ticket) => self.lead_refresh(ticket, request, bearer, response).await,
            Admission::Queued(rx) => {
                let outcome = rx.await.unwrap_or(Err(RefreshError::Cancelled));
                match outcome {
                    Ok(token) => self.replay(&request, &token).await,
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn lead_refresh(
        &self,
        ticket: RefreshTicket<'_>,
        request: ApiRequest,
        used_token: Option<String>,
        unauthorized: ApiResponse,
    ) -> Result<ApiResponse, ApiError> {
        match self.renew(used_token.as_deref()).await {
            Ok(Renewal::Refreshed(token)) => {
                let released = ticket.settle(&Ok(token.clone()));
                info!(released, "Access token refreshed");
                self.inner.events.emit(SessionEvent::Refreshed);
                self.replay(&request, &token).await
            }
            Ok(Renewal::AlreadyCurrent(token)) => {
                debug!("Access token changed while request was in flight, replaying");
                ticket.settle(&Ok(token.clone()));
                self.replay(&request, &token).await
            }
            Err(RefreshError::Superseded) => {
                // Logged out or logged in again meanwhile; the store already
                // reflects that, so leave it and its events alone
                info!("Session changed during refresh, discarding refreshed tokens");
                ticket.settle(&Err(RefreshError::Superseded));
                Err(RefreshError::Superseded.into())
            }
            Err(RefreshError::MissingRefreshToken) => {
                warn!(path = request.path(), "Unauthorized and no refresh token stored, ending session");
                self.clear_credentials();
                ticket.settle(&Err(RefreshError::MissingRefreshToken));
                self.inner
                    .events
                    .emit(SessionEvent::Terminated(TerminationReason::MissingRefreshToken));
                Ok(unauthorized)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.clear_credentials();
                let released = ticket.settle(&Err(e.clone()));
                debug!(released, "Rejected queued requests");
                self.inner
                    .events
                    .emit(SessionEvent::Terminated(TerminationReason::RefreshFailed));
                Err(e.into())
            }
        }
    }

    /// Obtain a fresh access token and persist the new pair
    async fn renew(&self, used_token: Option<&str>) -> Result<Renewal, RefreshError> {
        let store = &self.inner.store;
        let storage_error = |e: crate::auth::StoreError| RefreshError::Storage(e.to_string());

        if let Some(current) = store.access_token().map_err(storage_error)? {
            if used_token != Some(current.as_str()) {
                return Ok(Renewal::AlreadyCurrent(current));
            }
        }

        let refresh_token = store
            .refresh_token()
            .map_err(storage_error)?
            .ok_or(RefreshError::MissingRefreshToken)?;

        debug!("Refreshing access token");
        let response = self
            .inner
            .auth
            .refresh(&refresh_token)
            .await
            .map_err(|e| RefreshError::from_api(&e))?;

        let pair = CredentialPair::new(
            response.access_token,
            response.refresh_token.unwrap_or_else(|| refresh_token.clone()),
        );
        if !store
            .save_if_refresh_token(&refresh_token, &pair)
            .map_err(storage_error)?
        {
            return Err(RefreshError::Superseded);
        }
        Ok(Renewal::Refreshed(pair.access_token))
    }

    /// Re-send a request that already failed once; its outcome is final.
    /// A second 401 means the fresh token is no good either, so the session
    /// ends. The 401 itself is still handed back to the caller.
    async fn replay(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse, ApiError> {
        let response = self.inner.transport.send(request, Some(token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path = request.path(), "Request still unauthorized after refresh, ending session");
            // Only the first rejected replay for this token tears down, and
            // never a session that was replaced since
            match self.inner.store.clear_if_access_token(token) {
                Ok(true) => self
                    .inner
                    .events
                    .emit(SessionEvent::Terminated(TerminationReason::ReplayRejected)),
                Ok(false) => debug!("Session already ended or replaced"),
                Err(e) => warn!(error = %e, "Failed to clear stored credentials"),
            }
        }
        Ok(response)
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::auth::{MemoryStorage, TokenKey, TokenStorage};
    use crate::models::{LoginRequest, LoginResponse, RefreshResponse, RegisterRequest};

    /// Accepts exactly one bearer token; everything else is a 401.
    #[derive(Default)]
    struct FakeTransport {
        valid_token: Mutex<Option<String>>,
        calls: Mutex<Vec<(String, Option<String>)>>,
        /// Runs before each response is produced
        on_send: Mutex<Option<Box<dyn Fn() + Send>>>,
    }

    impl FakeTransport {
        fn accepting(token: &str) -> Arc<Self> {
            let transport = Self::default();
            *transport.valid_token.lock().unwrap() = Some(token.to_string());
            Arc::new(transport)
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.path().to_string(), bearer.map(str::to_string)));
            if let Some(hook) = self.on_send.lock().unwrap().take() {
                hook();
            }

            let valid = self.valid_token.lock().unwrap().clone();
            if valid.is_none() || valid.as_deref() != bearer {
                return Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "jwt expired"));
            }
            if request.path() == "/missing" {
                return Ok(ApiResponse::new(StatusCode::NOT_FOUND, "no such rental"));
            }
            Ok(ApiResponse::new(StatusCode::OK, format!(r#"{{"path":"{}"}}"#, request.path())))
        }
    }

    /// Refresh endpoint that can be held open until the test releases it.
    struct FakeAuth {
        refreshes: AtomicUsize,
        result: Result<RefreshResponse, u16>,
        hold: Option<Arc<Notify>>,
    }

    impl FakeAuth {
        fn issuing(token: &str) -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                result: Ok(RefreshResponse {
                    access_token: token.to_string(),
                    refresh_token: None,
                }),
                hold: None,
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                result: Err(status),
                hold: None,
            }
        }

        fn held(mut self, notify: &Arc<Notify>) -> Arc<Self> {
            self.hold = Some(Arc::clone(notify));
            Arc::new(self)
        }

        fn count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthEndpoint for FakeAuth {
        async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, ApiError> {
            Err(ApiError::InvalidRequest("not used".to_string()))
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<LoginResponse, ApiError> {
            Err(ApiError::InvalidRequest("not used".to_string()))
        }

        async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
            assert_eq!(refresh_token, "R1");
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            match &self.result {
                Ok(resp) => Ok(resp.clone()),
                Err(status) => Err(ApiError::from_status(
                    StatusCode::from_u16(*status).unwrap(),
                    "invalid refresh token",
                )),
            }
        }
    }

    fn logged_in_store() -> CredentialStore {
        let store = CredentialStore::in_memory();
        store.save(&CredentialPair::new("A1", "R1")).unwrap();
        store
    }

    /// Wait until `n` requests are parked behind the refresh, then let it finish
    async fn release_when_queued(session: &SessionClient, n: usize, notify: &Notify) {
        while session.queued_requests() < n {
            tokio::task::yield_now().await;
        }
        notify.notify_one();
    }

    #[tokio::test]
    async fn test_success_passes_through_with_bearer() {
        let transport = FakeTransport::accepting("A1");
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let session = SessionClient::new(transport.clone(), auth.clone(), logged_in_store());

        let response = session.execute(ApiRequest::get("/equipment")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.calls(), vec![("/equipment".to_string(), Some("A1".to_string()))]);
        assert_eq!(auth.count(), 0);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let transport = FakeTransport::accepting("A1");
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let session = SessionClient::new(transport.clone(), auth.clone(), logged_in_store());

        let response = session.execute(ApiRequest::get("/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(auth.count(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_replayed() {
        let transport = FakeTransport::accepting("A2");
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let store = logged_in_store();
        let session = SessionClient::new(transport.clone(), auth.clone(), store.clone());
        let mut events = session.subscribe();

        let response = session.execute(ApiRequest::get("/rentals")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            transport.calls(),
            vec![
                ("/rentals".to_string(), Some("A1".to_string())),
                ("/rentals".to_string(), Some("A2".to_string())),
            ]
        );
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);

        // Later requests carry the new token straight away
        session.execute(ApiRequest::get("/customers")).await.unwrap();
        assert_eq!(transport.calls().last().unwrap().1.as_deref(), Some("A2"));
        assert_eq!(auth.count(), 1);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_replaces_pair() {
        let transport = FakeTransport::accepting("A2");
        let auth = Arc::new(FakeAuth {
            refreshes: AtomicUsize::new(0),
            result: Ok(RefreshResponse {
                access_token: "A2".to_string(),
                refresh_token: Some("R2".to_string()),
            }),
            hold: None,
        });
        let store = logged_in_store();
        let session = SessionClient::new(transport, auth, store.clone());

        session.execute(ApiRequest::get("/rentals")).await.unwrap();
        assert_eq!(store.pair().unwrap(), Some(CredentialPair::new("A2", "R2")));
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let transport = FakeTransport::accepting("A2");
        let notify = Arc::new(Notify::new());
        let auth = FakeAuth::issuing("A2").held(&notify);
        let session = SessionClient::new(transport.clone(), auth.clone(), logged_in_store());

        let (a, b, c, ()) = futures::join!(
            session.execute(ApiRequest::get("/equipment")),
            session.execute(ApiRequest::get("/missing")),
            session.execute(ApiRequest::get("/invoices")),
            release_when_queued(&session, 2, &notify),
        );

        assert_eq!(auth.count(), 1);
        // Each replay gets its own outcome
        assert_eq!(a.unwrap().status(), StatusCode::OK);
        assert_eq!(b.unwrap().status(), StatusCode::NOT_FOUND);
        assert_eq!(c.unwrap().status(), StatusCode::OK);

        let replays: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|(_, bearer)| bearer.as_deref() == Some("A2"))
            .map(|(path, _)| path)
            .collect();
        assert_eq!(replays.len(), 3);
        assert!(!session.is_refreshing());
    }

    #[tokio::test]
    async fn test_queued_requests_replay_in_arrival_order() {
        let transport = FakeTransport::accepting("A2");
        let notify = Arc::new(Notify::new());
        let auth = FakeAuth::issuing("A2").held(&notify);
        let session = SessionClient::new(transport.clone(), auth, logged_in_store());

        let (lead, a, b, c, ()) = futures::join!(
            session.execute(ApiRequest::get("/lead")),
            session.execute(ApiRequest::get("/a")),
            session.execute(ApiRequest::get("/b")),
            session.execute(ApiRequest::get("/c")),
            release_when_queued(&session, 3, &notify),
        );
        for result in [lead, a, b, c] {
            assert_eq!(result.unwrap().status(), StatusCode::OK);
        }

        let replays: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|(_, bearer)| bearer.as_deref() == Some("A2"))
            .map(|(path, _)| path)
            .collect();
        assert_eq!(replays, vec!["/lead", "/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_second_401_ends_session() {
        // The server rejects every token, including the refreshed one
        let transport = Arc::new(FakeTransport::default());
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let store = logged_in_store();
        let session = SessionClient::new(transport.clone(), auth.clone(), store.clone());
        let mut events = session.subscribe();

        let response = session.execute(ApiRequest::get("/reports")).await.unwrap();

        // The caller still sees the 401, but nothing is retried a third time
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(auth.count(), 1);

        assert!(!store.is_logged_in());
        assert_eq!(store.refresh_token().unwrap(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Terminated(TerminationReason::ReplayRejected)
        );
    }

    #[tokio::test]
    async fn test_rejected_replays_end_session_once() {
        let transport = Arc::new(FakeTransport::default());
        let notify = Arc::new(Notify::new());
        let auth = FakeAuth::issuing("A2").held(&notify);
        let store = logged_in_store();
        let session = SessionClient::new(transport.clone(), auth.clone(), store.clone());
        let mut events = session.subscribe();

        let (a, b, ()) = futures::join!(
            session.execute(ApiRequest::get("/equipment")),
            session.execute(ApiRequest::get("/customers")),
            release_when_queued(&session, 1, &notify),
        );

        assert_eq!(a.unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(b.unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(auth.count(), 1);
        assert!(!store.is_logged_in());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Terminated(TerminationReason::ReplayRejected)
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_retried_request_is_never_recovered_again() {
        let transport = Arc::new(FakeTransport::default());
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let session = SessionClient::new(transport.clone(), auth.clone(), logged_in_store());

        let mut request = ApiRequest::get("/reports");
        request.mark_retried();
        let response = session.execute(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(auth.count(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_tears_down_session() {
        let transport = FakeTransport::accepting("A2");
        let notify = Arc::new(Notify::new());
        let auth = FakeAuth::failing(401).held(&notify);
        let store = logged_in_store();
        let session = SessionClient::new(transport.clone(), auth.clone(), store.clone());
        let mut events = session.subscribe();

        let (a, b, c, ()) = futures::join!(
            session.execute(ApiRequest::get("/equipment")),
            session.execute(ApiRequest::get("/customers")),
            session.execute(ApiRequest::get("/invoices")),
            release_when_queued(&session, 2, &notify),
        );

        assert_eq!(auth.count(), 1);
        for result in [a, b, c] {
            assert!(matches!(
                result,
                Err(ApiError::Refresh(RefreshError::Rejected { status: 401 }))
            ));
        }
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
        assert!(!store.is_logged_in());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Terminated(TerminationReason::RefreshFailed)
        );
        // No replays happened
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_short_circuits() {
        let storage = MemoryStorage::new();
        storage.set(TokenKey::Access, "A1").unwrap();
        let store = CredentialStore::new(storage);
        let transport = FakeTransport::accepting("A2");
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let session = SessionClient::new(transport, auth.clone(), store.clone());
        let mut events = session.subscribe();

        let response = session.execute(ApiRequest::get("/equipment")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(auth.count(), 0);
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Terminated(TerminationReason::MissingRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_request_without_session() {
        let transport = FakeTransport::accepting("A1");
        let auth = Arc::new(FakeAuth::issuing("A2"));
        let session = SessionClient::new(transport.clone(), auth.clone(), CredentialStore::in_memory());

        let response = session.execute(ApiRequest::get("/equipment")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(transport.calls(), vec![("/equipment".to_string(), None)]);
        assert_eq!(auth.count(), 0);
    }

    #[tokio::test]
    async fn test_stale_401_replays_without_new_refresh() {
        let transport = FakeTransport::accepting("A2");
        let store = logged_in_store();
        // Simulate a refresh completing elsewhere while the request is in flight
        let hook_store = store.clone();
        let hook: Box<dyn Fn() + Send> = Box::new(move || {
            hook_store.save(&CredentialPair::new("A2", "R1")).unwrap();
        });
        *transport.on_send.lock().unwrap() = Some(hook);
        let auth = Arc::new(FakeAuth::issuing("A3"));
        let session = SessionClient::new(transport.clone(), auth.clone(), store);

        let response = session.execute(ApiRequest::get("/equipment")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(auth.count(), 0);
        assert_eq!(transport.calls()[1].1.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_logout_during_refresh_is_not_undone() {
        let transport = FakeTransport::accepting("A2");
        let notify = Arc::new(Notify::new());
        let auth = FakeAuth::issuing("A2").held(&notify);
        let store = logged_in_store();
        let session = SessionClient::new(transport.clone(), auth.clone(), store.clone());
        let mut events = session.subscribe();

        let logout = async {
            while !session.is_refreshing() {
                tokio::task::yield_now().await;
            }
            store.clear().unwrap();
            notify.notify_one();
        };
        let (result, ()) = futures::join!(session.execute(ApiRequest::get("/equipment")), logout);

        assert!(matches!(result, Err(ApiError::Refresh(RefreshError::Superseded))));
        assert_eq!(auth.count(), 1);
        // The refreshed pair was discarded, not written over the logout
        assert!(!store.is_logged_in());
        assert_eq!(store.access_token().unwrap(), None);
        assert!(events.try_recv().is_err());
        assert!(!session.is_refreshing());
        // No replay with the discarded token
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_refresh_releases_queue() {
        let transport = FakeTransport::accepting("A2");
        // Never notified, so the refresh hangs until its caller gives up
        let notify = Arc::new(Notify::new());
        let auth = FakeAuth::issuing("A2").held(&notify);
        let session = SessionClient::new(transport, auth.clone(), logged_in_store());

        let (lead, queued) = futures::join!(
            tokio::time::timeout(Duration::from_millis(50), session.execute(ApiRequest::get("/a"))),
            session.execute(ApiRequest::get("/b")),
        );

        assert!(lead.is_err());
        assert!(matches!(queued, Err(ApiError::Refresh(RefreshError::Cancelled))));
        assert!(!session.is_refreshing());
        assert_eq!(auth.count(), 1);
    }
}
