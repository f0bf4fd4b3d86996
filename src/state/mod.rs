use crate::api::{ApiClient, ApiError};
use crate::config::EnvConfig;
use crate::session::{self, Session};
use leptos::prelude::*;

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub env: StoredValue<EnvConfig>,
    pub session: RwSignal<Session>,
    pub api_client: RwSignal<ApiClient>,
}

impl AppState {
    pub fn new() -> Self {
        let env = EnvConfig::new();
        let session = Session::restore();
        let client = session.api_client(&env.api_url);

        Self {
            env: StoredValue::new(env),
            session: RwSignal::new(session),
            api_client: RwSignal::new(client),
        }
    }

    pub fn api_url(&self) -> String {
        self.env.with_value(|e| e.api_url.clone())
    }

    /// Absolute URL for a server-relative path.
    pub fn absolute_url(&self, path: &str) -> String {
        self.env.with_value(|e| e.absolute_url(path))
    }

    pub fn sign_in(&self, s: Session) {
        self.api_client.set(s.api_client(&self.api_url()));
        self.session.set(s);
    }

    /// Local teardown; callers decide where to navigate.
    pub fn sign_out(&self) {
        self.session.update(Session::clear);
        self.api_client.set(ApiClient::new(self.api_url()));
    }

    /// Message to show for a failed request. A 401 also ends the session and leaves the page.
    pub fn handle_error(&self, err: &ApiError) -> String {
        if err.is_unauthorized() {
            let path = window().location().pathname().unwrap_or_default();
            let mut redirect = false;
            self.session
                .try_update(|s| redirect = session::on_unauthorized(s, &path));
            self.api_client
                .try_set(ApiClient::new(self.api_url()));
            if redirect {
                let _ = window().location().set_href(session::LOGIN_PATH);
            }
        }
        err.to_string()
    }

    pub fn can_edit(&self) -> bool {
        self.session.with(Session::can_edit_documents)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
