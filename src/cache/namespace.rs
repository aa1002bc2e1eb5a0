//! Versioned cache namespace names
//!
//! Names have the form `<app>-<kind>-<version>`, e.g. `cockpit-api-v1`.

/// The three namespace kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Install-time precache of the shell
    Assets,
    /// Successful API GETs
    Api,
    /// Other static GETs
    Runtime,
}

impl CacheKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Assets => "assets",
            CacheKind::Api => "api",
            CacheKind::Runtime => "runtime",
        }
    }
}

/// Namespace names for one application version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamespaces {
    app: String,
    version: String,
}

impl CacheNamespaces {
    pub fn new(app: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Namespace name for `kind`
    ///
    /// # Examples
    ///
    /// ```
    /// use cockpit::cache::{CacheKind, CacheNamespaces};
    ///
    /// let namespaces = CacheNamespaces::new("cockpit", "v1");
    /// assert_eq!(namespaces.name(CacheKind::Api), "cockpit-api-v1");
    /// ```
    pub fn name(&self, kind: CacheKind) -> String {
        format!("{}-{}-{}", self.app, kind.as_str(), self.version)
    }

    pub fn assets(&self) -> String {
        self.name(CacheKind::Assets)
    }

    pub fn api(&self) -> String {
        self.name(CacheKind::Api)
    }

    pub fn runtime(&self) -> String {
        self.name(CacheKind::Runtime)
    }

    /// Whether `name` belongs to this application
    fn is_owned(&self, name: &str) -> bool {
        name.starts_with(&format!("{}-", self.app))
    }

    /// Whether `name` belongs to this application but not to the current
    /// version; such namespaces are deleted in full on activation
    pub fn is_stale(&self, name: &str) -> bool {
        self.is_owned(name) && !name.contains(&self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        let namespaces = CacheNamespaces::new("app", "v2");
        assert_eq!(namespaces.assets(), "app-assets-v2");
        assert_eq!(namespaces.api(), "app-api-v2");
        assert_eq!(namespaces.runtime(), "app-runtime-v2");
    }

    #[test]
    fn test_stale_detection() {
        let namespaces = CacheNamespaces::new("app", "v1");
        assert!(namespaces.is_stale("app-assets-v0"));
        assert!(!namespaces.is_stale("app-assets-v1"));
        assert!(!namespaces.is_stale("other-assets-v0"));
    }
}
