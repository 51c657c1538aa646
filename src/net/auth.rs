use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

const PLACEHOLDER_USERNAME: &str = "prefsync";
const PLACEHOLDER_PASSWORD: &str = "change-me";

/// Basic Auth credentials exchanged in the connection handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

impl BasicAuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials that servers refuse to run with.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_USERNAME, PLACEHOLDER_PASSWORD)
    }

    pub fn is_placeholder(&self) -> bool {
        (self.username == PLACEHOLDER_USERNAME && self.password == PLACEHOLDER_PASSWORD)
            || self.username.is_empty()
            || self.password.is_empty()
    }

    pub fn authorization_header(&self) -> String {
        let token = format!("{}:{}", self.username, self.password);
        format!("Authorization: Basic {}", BASE64.encode(token))
    }
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self::placeholder()
    }
}
