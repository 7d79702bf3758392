use base64::Engine;

pub const AUTHORIZATION: &str = "authorization";
pub const X_API_KEY: &str = "x-api-key";
pub const X_USERNAME: &str = "x-username";
pub const X_PASSWORD: &str = "x-password";

/// Username and password presented by a client.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a request presented that could authenticate it.
///
/// More than one kind may be present at once; the resolver tries them in a
/// fixed order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Value of `X-API-Key`.
    pub api_key: Option<String>,
    /// Token of an `Authorization: Bearer` header.
    pub bearer: Option<String>,
    /// From `Authorization: Basic`, or from `X-Username`/`X-Password`.
    pub basic: Option<BasicCredentials>,
}

impl Credentials {
    /// Collect credentials through a case-insensitive header lookup.
    ///
    /// Basic credentials take precedence over the `X-Username`/`X-Password`
    /// pair; the pair is only consulted when Basic yields no username.
    pub fn from_lookup<'a, F>(header: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let non_empty = |name: &str| header(name).filter(|v| !v.is_empty());

        let authorization = header(AUTHORIZATION).unwrap_or_default();
        let bearer = authorization
            .strip_prefix("Bearer ")
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let basic = authorization
            .strip_prefix("Basic ")
            .and_then(decode_basic)
            .filter(|b| !b.username.is_empty())
            .or_else(|| {
                non_empty(X_USERNAME).map(|username| BasicCredentials {
                    username: username.to_string(),
                    password: header(X_PASSWORD).unwrap_or_default().to_string(),
                })
            });

        Self {
            api_key: non_empty(X_API_KEY).map(str::to_string),
            bearer,
            basic,
        }
    }

    /// Whether nothing at all was presented.
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer.is_none() && self.basic.is_none()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn with_basic(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic = Some(BasicCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("basic", &self.basic)
            .finish()
    }
}

/// Decode a Basic payload into `user:password`, splitting at the first colon.
fn decode_basic(encoded: &str) -> Option<BasicCredentials> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(raw).ok()?;
    let (username, password) = text.split_once(':').unwrap_or((text.as_str(), ""));
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}
