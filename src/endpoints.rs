//! URL derivation for REST and WebSocket endpoints
//!
//! REST and streaming endpoints share one backend host. WebSocket URLs are
//! derived by swapping `http` for `ws` and `https` for `wss`.

use url::Url;

use crate::error::{CockpitError, Result};

/// Endpoint builder rooted at the configured backend base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Create endpoints from a base URL such as `http://localhost:8000`
    ///
    /// # Errors
    ///
    /// Returns [`CockpitError::Config`] if the URL does not parse or is not
    /// `http`/`https`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| CockpitError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(CockpitError::Config(format!(
                "base url must be http or https: {}",
                base_url
            ))
            .into());
        }
        Ok(Self { base })
    }

    /// The backend base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn build(&self, websocket: bool, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if websocket {
            let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
            // http(s) -> ws(s) is always permitted between special schemes.
            let _ = url.set_scheme(scheme);
        }
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.set_query(None);
        url
    }

    /// REST URL for a path made of `segments` under `/api`
    ///
    /// # Examples
    ///
    /// ```
    /// use cockpit::endpoints::Endpoints;
    ///
    /// let endpoints = Endpoints::new("http://localhost:8000").unwrap();
    /// assert_eq!(
    ///     endpoints.api(&["sessions", "s1", "send"]).as_str(),
    ///     "http://localhost:8000/api/sessions/s1/send"
    /// );
    /// ```
    pub fn api(&self, segments: &[&str]) -> Url {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push("api");
        all.extend_from_slice(segments);
        self.build(false, &all)
    }

    /// Absolute URL of a static path such as `/index.html`
    pub fn asset(&self, path: &str) -> Url {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        self.build(false, &segments)
    }

    /// Streaming URL for a session: `ws(s)://<host>/ws/sessions/{id}`
    pub fn session_socket(&self, session_id: &str) -> Url {
        self.build(true, &["ws", "sessions", session_id])
    }

    /// Streaming URL for interactive account authentication
    pub fn auth_socket(&self, account_id: &str) -> Url {
        self.build(true, &["ws", "accounts", account_id, "auth-stream"])
    }
}
