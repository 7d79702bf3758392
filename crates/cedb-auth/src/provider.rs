use std::sync::Arc;

use cedb_store::{DocumentKind, DocumentStore};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::kdf::verify_password;
use crate::policy::AuthPolicy;

const LEGACY_ADMIN_USERNAME: &str = "admin";
const LEGACY_ADMIN_PASSWORD: &str = "securepassword";

/// Who a granted request acts as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    /// Auth is switched off in the policy.
    Disabled,
    /// Matched via `X-API-Key`.
    ApiKey,
    /// Matched via `Authorization: Bearer`.
    Bearer,
    /// A configured user with a verified password.
    User(String),
}

impl Actor {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Disabled => "disabled",
            Self::ApiKey => "apikey",
            Self::Bearer => "bearer",
            Self::User(name) => name,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// No credentials of any kind.
    Unauthorized,
    /// Credentials were presented but did not check out.
    BadCredentials,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::BadCredentials => "bad_credentials",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of credential resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthDecision {
    Granted(Actor),
    Denied(DenyReason),
}

impl AuthDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// The actor name when granted, the reason code when denied.
    pub fn label(&self) -> &str {
        match self {
            Self::Granted(actor) => actor.as_str(),
            Self::Denied(reason) => reason.as_str(),
        }
    }
}

/// Pluggable credential check used by the write path.
pub trait AuthProvider: Send + Sync {
    fn authorize(&self, credentials: &Credentials) -> AuthDecision;
}

/// Grants every request as [`Actor::Disabled`].
pub struct AllowAllAuth;

impl AuthProvider for AllowAllAuth {
    fn authorize(&self, _credentials: &Credentials) -> AuthDecision {
        AuthDecision::Granted(Actor::Disabled)
    }
}

/// Knobs that are not part of the stored policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthOptions {
    /// Accept `admin` / `securepassword` for an `admin` user that has no
    /// stored hash. Insecure; exists only for old deployments.
    pub legacy_admin_fallback: bool,
}

/// Resolves credentials against the policy in the stored config document.
pub struct ConfigAuthenticator {
    store: Arc<dyn DocumentStore>,
    options: AuthOptions,
}

impl ConfigAuthenticator {
    pub fn new(store: Arc<dyn DocumentStore>, options: AuthOptions) -> Self {
        Self { store, options }
    }

    /// The policy as currently persisted.
    pub fn policy(&self) -> AuthPolicy {
        AuthPolicy::from_config_bytes(&self.store.read(DocumentKind::Config))
    }
}

impl AuthProvider for ConfigAuthenticator {
    fn authorize(&self, credentials: &Credentials) -> AuthDecision {
        resolve(&self.policy(), credentials, &self.options)
    }
}

/// Resolve credentials against a policy. First match wins:
///
/// 1. policy disabled
/// 2. `X-API-Key` in the key list
/// 3. bearer token in the key list
/// 4. username/password against the configured users
/// 5. otherwise `unauthorized`
pub fn resolve(
    policy: &AuthPolicy,
    credentials: &Credentials,
    options: &AuthOptions,
) -> AuthDecision {
    if !policy.enabled {
        return AuthDecision::Granted(Actor::Disabled);
    }
    if credentials.api_key.as_deref().is_some_and(|k| policy.has_api_key(k)) {
        return AuthDecision::Granted(Actor::ApiKey);
    }
    if credentials.bearer.as_deref().is_some_and(|t| policy.has_api_key(t)) {
        return AuthDecision::Granted(Actor::Bearer);
    }

    let Some(basic) = &credentials.basic else {
        return AuthDecision::Denied(DenyReason::Unauthorized);
    };
    let Some(user) = policy.find_user(&basic.username) else {
        debug!(username = %basic.username, "unknown user");
        return AuthDecision::Denied(DenyReason::BadCredentials);
    };

    if !user.password_hash.is_empty() {
        let salt = user.effective_salt(&policy.default_salt);
        let iterations = user.effective_iterations();
        return if verify_password(&basic.password, salt, iterations, &user.password_hash) {
            AuthDecision::Granted(Actor::User(user.username.clone()))
        } else {
            AuthDecision::Denied(DenyReason::BadCredentials)
        };
    }

    if options.legacy_admin_fallback
        && user.username == LEGACY_ADMIN_USERNAME
        && bool::from(basic.password.as_bytes().ct_eq(LEGACY_ADMIN_PASSWORD.as_bytes()))
    {
        warn!("granted write via legacy hardcoded admin password; set a hash for this user");
        return AuthDecision::Granted(Actor::User(user.username.clone()));
    }
    AuthDecision::Denied(DenyReason::BadCredentials)
}
