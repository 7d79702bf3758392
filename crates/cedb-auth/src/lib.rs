//! Credential resolution for CoreEngineDB writes.
//!
//! The auth policy lives inside the config document itself:
//!
//! ```json
//! {
//!   "auth": {
//!     "enabled": true,
//!     "salt": "coreenginedb",
//!     "users": [{ "username": "alice", "hash": "<hex>", "salt": "...", "iterations": 100000 }]
//!   },
//!   "apiKeys": ["k-123"]
//! }
//! ```
//!
//! [`ConfigAuthenticator`] re-reads that document from the store on every
//! call, so a config write takes effect on the very next request.
//! Resolution order is fixed: disabled policy, `X-API-Key`, bearer token,
//! then Basic or `X-Username`/`X-Password` credentials.

pub mod credentials;
pub mod kdf;
pub mod policy;
pub mod provider;

pub use credentials::{BasicCredentials, Credentials};
pub use kdf::{derive_key_hex, hash_password, verify_password};
pub use policy::{AuthPolicy, UserRecord, DEFAULT_ITERATIONS, DEFAULT_SALT};
pub use provider::{
    resolve, Actor, AllowAllAuth, AuthDecision, AuthOptions, AuthProvider, ConfigAuthenticator,
    DenyReason,
};
