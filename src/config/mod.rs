use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:5001";

/// Runtime configuration injected by the hosting page as `window.ENV`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::from_window().unwrap_or_else(Self::fallback)
    }

    pub fn fallback() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn from_window() -> Option<Self> {
        let window = web_sys::window()?;
        let env = window.get("ENV")?;
        if env.is_undefined() || !env.is_object() {
            return None;
        }

        // `API_URL` is the documented key; `api_url` is accepted for older deploy scripts.
        ["API_URL", "api_url"].iter().find_map(|key| {
            js_sys::Reflect::get(&env, &(*key).into())
                .ok()
                .and_then(|v| v.as_string())
                .map(|url| Self {
                    api_url: normalize_base_url(&url),
                })
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn from_window() -> Option<Self> {
        None
    }

    /// Absolute URL for a server-relative path such as an uploaded image.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.api_url, path)
        } else {
            format!("{}/{}", self.api_url, path)
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
