use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::response::OptionalEnvelope;
use crate::api::{
    ApiError, ApiRequest, Envelope, MessageResponse, RawResponse, RefreshCoordinator,
    RefreshedCredentials, TokenRefresher, Transport,
};
use crate::session::SessionStore;
use crate::storage::models::Account;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// `YYYY-MM-DD`
    pub birthday: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub token: String,
    pub uidb64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_token: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigninData {
    pub access: String,
    pub account: Account,
}

pub type SigninResponse = Envelope<SigninData>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleSigninRequest {
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievePasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
    #[serde(skip)]
    pub token: String,
    #[serde(skip)]
    pub uidb64: String,
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPayload {
    pub account: Account,
}

pub type UpdateUserResponse = OptionalEnvelope<AccountPayload>;

// ============================================================================
// Service
// ============================================================================

/// Account operations against the REST API.
///
/// Anonymous calls go through `public`; sign-in, sign-out and refresh go
/// through `credentialed`, which carries the refresh cookie; profile updates
/// are authenticated and go through the refresh coordinator.
pub struct AuthService {
    captcha_required: AtomicBool,
    credentialed: Arc<dyn Transport>,
    private: Arc<RefreshCoordinator>,
    public: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(
        public: Arc<dyn Transport>,
        credentialed: Arc<dyn Transport>,
        private: Arc<RefreshCoordinator>,
    ) -> Self {
        let session = Arc::clone(private.session());
        Self {
            captcha_required: AtomicBool::new(false),
            credentialed,
            private,
            public,
            session,
        }
    }

    /// Whether the last failed sign-in asked for a captcha
    pub fn captcha_required(&self) -> bool {
        self.captcha_required.load(Ordering::SeqCst)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse, ApiError> {
        let req = ApiRequest::post("/accounts/signup/").json(request)?;
        let response = self.public.send(&req, None).await?.into_result()?;
        debug!(email = %request.email, "Signup accepted");
        response.json()
    }

    pub async fn activate_account(
        &self,
        request: &ActivationRequest,
    ) -> Result<MessageResponse, ApiError> {
        let path = format!("/accounts/activate/{}/{}/", request.uidb64, request.token);
        let response = self
            .public
            .send(&ApiRequest::get(path), None)
            .await?
            .into_result()?;
        response.json()
    }

    /// Sign in with e-mail and password, establishing the session.
    pub async fn signin(&self, request: &SigninRequest) -> Result<SigninResponse, ApiError> {
        let req = ApiRequest::post("/accounts/signin/").json(request)?;
        self.establish(req).await
    }

    pub async fn google_signin(
        &self,
        request: &GoogleSigninRequest,
    ) -> Result<SigninResponse, ApiError> {
        let req = ApiRequest::post("/accounts/google/signin/").json(request)?;
        self.establish(req).await
    }

    async fn establish(&self, request: ApiRequest) -> Result<SigninResponse, ApiError> {
        let result = self
            .credentialed
            .send(&request, None)
            .await
            .and_then(RawResponse::into_result);

        match result {
            Ok(response) => {
                let signin: SigninResponse = response.json()?;
                self.session
                    .set_auth(signin.data.access.clone(), signin.data.account.clone())
                    .await;
                self.captcha_required.store(false, Ordering::SeqCst);
                info!(account_id = signin.data.account.id, "Signed in");
                Ok(signin)
            }
            Err(e) => {
                if let Some(body) = e.body() {
                    let required = body
                        .get("captchaRequired")
                        .and_then(serde_json::Value::as_bool)
                        .unwrap_or(false);
                    self.captcha_required.store(required, Ordering::SeqCst);
                }
                Err(e)
            }
        }
    }

    /// End the server session and clear local state.
    pub async fn signout(&self) -> Result<MessageResponse, ApiError> {
        let response = self
            .credentialed
            .send(&ApiRequest::post("/accounts/signout/"), None)
            .await?
            .into_result()?;
        self.session.clear_auth().await;
        info!("Signed out");
        response.json()
    }

    pub async fn retrieve_password(
        &self,
        request: &RetrievePasswordRequest,
    ) -> Result<MessageResponse, ApiError> {
        let req = ApiRequest::post("/accounts/password/retrieve/").json(request)?;
        self.public.send(&req, None).await?.into_result()?.json()
    }

    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<MessageResponse, ApiError> {
        let path = format!(
            "/accounts/password/reset/{}/{}/",
            request.uidb64, request.token
        );
        let req = ApiRequest::post(path).json(request)?;
        self.public.send(&req, None).await?.into_result()?.json()
    }

    /// Update the signed-in account. The returned account replaces the
    /// session's copy; the access token is kept.
    pub async fn update_user(
        &self,
        request: &UpdateUserRequest,
    ) -> Result<UpdateUserResponse, ApiError> {
        let req = ApiRequest::patch("/accounts/profile/").json(request)?;
        let response: UpdateUserResponse = self.private.dispatch(req).await?.json()?;

        if let Some(ref payload) = response.data {
            self.session.update_account(payload.account.clone()).await;
        }
        Ok(response)
    }
}

/// Refreshes the access token using the cookie set at sign-in.
pub struct CookieRefresher {
    credentialed: Arc<dyn Transport>,
}

impl CookieRefresher {
    pub fn new(credentialed: Arc<dyn Transport>) -> Self {
        Self { credentialed }
    }
}

#[async_trait]
impl TokenRefresher for CookieRefresher {
    async fn refresh(&self) -> Result<RefreshedCredentials, ApiError> {
        let response = self
            .credentialed
            .send(&ApiRequest::post("/accounts/token/refresh/"), None)
            .await?
            .into_result()?;
        response.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{json_response, make_account, setup_db, FakeBackend, FakeRefresher};
    use reqwest::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup(backend: &Arc<FakeBackend>) -> (AuthService, Arc<SessionStore>, TempDir) {
        let (db, temp) = setup_db();
        let session = Arc::new(SessionStore::open(db).unwrap());
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(backend) as Arc<dyn Transport>,
            FakeRefresher::renewing("fresh"),
            Arc::clone(&session),
            "/signin",
        ));
        let service = AuthService::new(
            Arc::clone(backend) as Arc<dyn Transport>,
            Arc::clone(backend) as Arc<dyn Transport>,
            coordinator,
        );
        (service, session, temp)
    }

    fn signin_body(access: &str) -> serde_json::Value {
        json!({
            "message": "Signed in",
            "status": 200,
            "data": {"access": access, "account": make_account(3)}
        })
    }

    #[tokio::test]
    async fn test_signin_sets_session() {
        let backend = FakeBackend::new("access-1");
        backend.respond(
            "/accounts/signin/",
            json_response(StatusCode::OK, signin_body("access-1")),
        );
        let (service, session, _temp) = setup(&backend);

        let response = service
            .signin(&SigninRequest {
                captcha_token: None,
                email: "reader3@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.data.access, "access-1");
        let current = session.snapshot().await;
        assert!(current.is_authenticated);
        assert_eq!(current.access_token.as_deref(), Some("access-1"));
        assert_eq!(current.account, Some(make_account(3)));

        let sent = &backend.requests_to("/accounts/signin/")[0];
        assert_eq!(
            sent.body,
            Some(json!({"email": "reader3@example.com", "password": "secret1"}))
        );
    }

    #[tokio::test]
    async fn test_signin_failure_records_captcha_requirement() {
        let backend = FakeBackend::new("access-1");
        backend.respond(
            "/accounts/signin/",
            json_response(
                StatusCode::BAD_REQUEST,
                json!({"message": "Too many attempts", "status": 400, "captchaRequired": true}),
            ),
        );
        let (service, session, _temp) = setup(&backend);

        let err = service
            .signin(&SigninRequest {
                captcha_token: None,
                email: "reader3@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(service.captcha_required());
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_signout_clears_session() {
        let backend = FakeBackend::new("access-1");
        backend.respond(
            "/accounts/signout/",
            json_response(StatusCode::OK, json!({"message": "Bye", "status": 200})),
        );
        let (service, session, _temp) = setup(&backend);
        session.set_auth("access-1".to_string(), make_account(3)).await;

        let response = service.signout().await.unwrap();

        assert_eq!(response.message, "Bye");
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_failed_signout_keeps_session() {
        let backend = FakeBackend::new("access-1");
        backend.respond(
            "/accounts/signout/",
            json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({"message": "down", "status": 500})),
        );
        let (service, session, _temp) = setup(&backend);
        session.set_auth("access-1".to_string(), make_account(3)).await;

        assert!(service.signout().await.is_err());
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_reset_password_puts_ids_in_path() {
        let backend = FakeBackend::new("access-1");
        backend.respond(
            "/accounts/password/reset/MQ/abc-123/",
            json_response(StatusCode::OK, json!({"message": "Password reset", "status": 200})),
        );
        let (service, _session, _temp) = setup(&backend);

        service
            .reset_password(&ResetPasswordRequest {
                new_password: "brand-new".to_string(),
                token: "abc-123".to_string(),
                uidb64: "MQ".to_string(),
            })
            .await
            .unwrap();

        let sent = &backend.requests_to("/accounts/password/reset/MQ/abc-123/")[0];
        assert_eq!(sent.body, Some(json!({"newPassword": "brand-new"})));
        assert!(sent.bearer.is_none());
    }

    #[tokio::test]
    async fn test_update_user_replaces_account_and_keeps_token() {
        let backend = FakeBackend::new("access-1");
        let mut renamed = make_account(3);
        renamed.full_name = "New Name".to_string();
        backend.respond(
            "/accounts/profile/",
            json_response(
                StatusCode::OK,
                json!({"message": "Updated", "status": 200, "data": {"account": renamed}}),
            ),
        );
        let (service, session, _temp) = setup(&backend);
        session.set_auth("access-1".to_string(), make_account(3)).await;

        let request = UpdateUserRequest {
            full_name: Some("New Name".to_string()),
            ..Default::default()
        };
        service.update_user(&request).await.unwrap();

        let current = session.snapshot().await;
        assert_eq!(current.access_token.as_deref(), Some("access-1"));
        assert_eq!(current.account.unwrap().full_name, "New Name");

        let sent = &backend.requests_to("/accounts/profile/")[0];
        assert_eq!(sent.method, reqwest::Method::PATCH);
        assert_eq!(sent.bearer.as_deref(), Some("access-1"));
        assert_eq!(sent.body, Some(json!({"fullName": "New Name"})));
    }

    #[tokio::test]
    async fn test_cookie_refresher_decodes_credentials() {
        let backend = FakeBackend::new("access-1");
        backend.respond(
            "/accounts/token/refresh/",
            json_response(
                StatusCode::OK,
                json!({"access": "access-2", "account": make_account(3)}),
            ),
        );
        let refresher = CookieRefresher::new(backend.clone());

        let renewed = refresher.refresh().await.unwrap();
        assert_eq!(renewed.access, "access-2");
        assert_eq!(renewed.account, make_account(3));
    }

    #[test]
    fn test_empty_update_request() {
        assert!(UpdateUserRequest::default().is_empty());
        assert_eq!(
            serde_json::to_value(UpdateUserRequest::default()).unwrap(),
            json!({})
        );
    }
}
