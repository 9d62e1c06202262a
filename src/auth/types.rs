//! Auth configuration types

use std::fmt;

/// Authentication configuration
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// HTTP Basic authentication
    Basic {
        /// Username (Aircall API ID)
        username: String,
        /// Password (Aircall API token)
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl AuthConfig {
    /// Pick credentials from the tap settings
    ///
    /// A non-empty bearer token wins over the Basic pair.
    pub fn from_credentials(
        api_id: Option<&str>,
        api_token: Option<&str>,
        auth_token: Option<&str>,
    ) -> Self {
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            return Self::Bearer {
                token: token.to_string(),
            };
        }
        match (api_id, api_token) {
            (Some(id), Some(secret)) if !id.is_empty() => Self::Basic {
                username: id.to_string(),
                password: secret.to_string(),
            },
            _ => Self::None,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}
