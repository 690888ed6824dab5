use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, User};
use crate::session::{SessionClient, SessionEvent, TerminationReason};

use super::CredentialPair;

const ME_PATH: &str = "/auth/me";

/// Login, registration and logout on top of a [`SessionClient`].
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(session: SessionClient) -> Self {
        Self {
            api: ApiClient::new(session),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn session(&self) -> &SessionClient {
        self.api.session()
    }

    /// Authenticate and store the returned credential pair
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.session().auth().login(&request).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;
        self.start_session(response)
    }

    /// Create an account; the backend signs the new user in right away
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let response = self.session().auth().register(request).await?;
        self.start_session(response)
    }

    fn start_session(&self, response: LoginResponse) -> Result<User, ApiError> {
        let pair = CredentialPair::new(response.access_token, response.refresh_token);
        self.session().store().save(&pair)?;
        info!(user_id = %response.user.id, "Login successful");
        self.session().events().emit(SessionEvent::LoggedIn);
        Ok(response.user)
    }

    /// Forget both tokens. There is no server-side logout call.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = self.session().store().clear();
        info!("Logged out");
        self.session()
            .events()
            .emit(SessionEvent::Terminated(TerminationReason::LoggedOut));
        Ok(result?)
    }

    /// The account behind the stored session
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let me: MeResponse = self.api.get(ME_PATH).await?;
        Ok(me.into_user())
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().store().is_logged_in()
    }
}
