use crate::api::{ApiClient, ApiError, ApiResult};
use crate::models::{LoginResponse, User};
use async_trait::async_trait;

pub(crate) const LOGIN_PATH: &str = "/login";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("invalid username or password")]
    Rejected,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[async_trait(?Send)]
pub trait SessionApi {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse>;
    async fn logout(&self) -> ApiResult<()>;
    async fn current_user(&self) -> ApiResult<User>;
}

#[async_trait(?Send)]
impl SessionApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        ApiClient::login(self, username, password).await
    }

    async fn logout(&self) -> ApiResult<()> {
        ApiClient::logout(self).await
    }

    async fn current_user(&self) -> ApiResult<User> {
        ApiClient::current_user(self).await
    }
}

/// Signed-in identity. Created once at startup and torn down on logout or a 401.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    /// Session persisted by a previous page load, if any.
    pub fn restore() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            use crate::storage::{load_json, load_string, TOKEN_KEY, USER_KEY};
            Self {
                token: load_string(TOKEN_KEY).filter(|t| !t.is_empty()),
                user: load_json(USER_KEY),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn can_edit_documents(&self) -> bool {
        self.user
            .as_ref()
            .map(|u| u.role.can_edit_documents())
            .unwrap_or(false)
    }

    pub fn api_client(&self, base_url: &str) -> ApiClient {
        ApiClient::new(base_url).with_token(self.token.clone())
    }

    fn persist(&self) {
        #[cfg(target_arch = "wasm32")]
        {
            use crate::storage::{remove, save_json, save_string, TOKEN_KEY, USER_KEY};
            match &self.token {
                Some(t) => save_string(TOKEN_KEY, t),
                None => remove(TOKEN_KEY),
            }
            match &self.user {
                Some(u) => save_json(USER_KEY, u),
                None => remove(USER_KEY),
            }
        }
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
        self.persist();
    }

    /// Drop token and user, in memory and in storage.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.persist();
    }
}

pub async fn login<A>(api: &A, username: &str, password: &str) -> Result<Session, SessionError>
where
    A: SessionApi + ?Sized,
{
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(SessionError::MissingCredentials);
    }

    let resp = match api.login(username, password).await {
        Ok(r) => r,
        Err(e) if e.is_unauthorized() => return Err(SessionError::Rejected),
        Err(e) => return Err(e.into()),
    };
    if !resp.success || resp.token.is_empty() {
        return Err(SessionError::Rejected);
    }

    let session = Session {
        token: Some(resp.token),
        user: Some(resp.user),
    };
    session.persist();
    log::info!("signed in");
    Ok(session)
}

/// Server logout is best effort; local teardown always happens.
pub async fn logout<A>(api: &A, session: &mut Session)
where
    A: SessionApi + ?Sized,
{
    if let Err(e) = api.logout().await {
        log::warn!("server logout failed: {e}");
    }
    session.clear();
}

pub async fn refresh_user<A>(api: &A, session: &mut Session) -> Result<(), SessionError>
where
    A: SessionApi + ?Sized,
{
    let user = api.current_user().await?;
    session.set_user(user);
    Ok(())
}

pub(crate) fn is_login_path(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/') == LOGIN_PATH
}

/// Tear the session down after a 401. Returns whether to navigate to the login view.
pub(crate) fn on_unauthorized(session: &mut Session, current_path: &str) -> bool {
    session.clear();
    log::info!("session expired");
    !is_login_path(current_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::cell::Cell;

    struct FakeSessionApi {
        reply: Result<LoginResponse, ApiError>,
        logout_fails: bool,
        calls: Cell<usize>,
    }

    fn user(role: Role) -> User {
        User {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role,
            is_admin: false,
        }
    }

    fn fake(reply: Result<LoginResponse, ApiError>) -> FakeSessionApi {
        FakeSessionApi {
            reply,
            logout_fails: false,
            calls: Cell::new(0),
        }
    }

    #[async_trait(?Send)]
    impl SessionApi for FakeSessionApi {
        async fn login(&self, _u: &str, _p: &str) -> ApiResult<LoginResponse> {
            self.calls.set(self.calls.get() + 1);
            self.reply.clone()
        }

        async fn logout(&self) -> ApiResult<()> {
            self.calls.set(self.calls.get() + 1);
            if self.logout_fails {
                Err(ApiError::network("offline"))
            } else {
                Ok(())
            }
        }

        async fn current_user(&self) -> ApiResult<User> {
            self.calls.set(self.calls.get() + 1);
            Ok(user(Role::Manager))
        }
    }

    fn ok_reply() -> Result<LoginResponse, ApiError> {
        Ok(LoginResponse {
            success: true,
            user: user(Role::Admin),
            token: "abc".to_string(),
        })
    }

    #[tokio::test]
    async fn test_login_builds_session() {
        let api = fake(ok_reply());
        let s = login(&api, " ana ", "pw").await.expect("login succeeds");
        assert!(s.is_authenticated());
        assert!(s.can_edit_documents());
        assert_eq!(s.token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_login_requires_credentials_before_network() {
        let api = fake(ok_reply());
        assert!(matches!(
            login(&api, "  ", "pw").await,
            Err(SessionError::MissingCredentials)
        ));
        assert_eq!(api.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_login_401_is_rejection() {
        let api = fake(Err(ApiError::unauthorized()));
        assert!(matches!(login(&api, "ana", "bad").await, Err(SessionError::Rejected)));
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let mut api = fake(ok_reply());
        api.logout_fails = true;
        let mut s = login(&api, "ana", "pw").await.expect("login succeeds");
        logout(&api, &mut s).await;
        assert_eq!(s, Session::default());
    }

    #[tokio::test]
    async fn test_refresh_user_replaces_user() {
        let api = fake(ok_reply());
        let mut s = login(&api, "ana", "pw").await.expect("login succeeds");
        refresh_user(&api, &mut s).await.expect("refresh");
        assert_eq!(s.user.map(|u| u.role), Some(Role::Manager));
    }

    #[test]
    fn test_viewer_cannot_edit() {
        let s = Session {
            token: Some("t".to_string()),
            user: Some(user(Role::Viewer)),
        };
        assert!(!s.can_edit_documents());
        assert!(!Session::default().can_edit_documents());
    }

    #[test]
    fn test_unauthorized_redirects_except_on_login() {
        let mut s = Session {
            token: Some("t".to_string()),
            user: Some(user(Role::Admin)),
        };
        assert!(on_unauthorized(&mut s, "/reports/3/edit"));
        assert!(!s.is_authenticated());

        let mut s = Session::default();
        assert!(!on_unauthorized(&mut s, "/login"));
        assert!(!on_unauthorized(&mut s, "/login/?next=/reports"));
    }
}
