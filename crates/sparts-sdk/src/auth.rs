//! Challenge-response authorization against registered users.

use async_trait::async_trait;
use rand::RngCore;
use sparts_crypto::{PublicKey, Signature};
use sparts_ledger::{HistoryReader, StateRecord};
use sparts_types::EntityFamily;

use crate::client::LedgerClient;
use crate::error::SdkResult;

/// Random bytes a caller proves key ownership by signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: String,
}

impl Challenge {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            nonce: hex::encode(bytes),
        }
    }

    /// The bytes that must be signed.
    pub fn message(&self) -> &[u8] {
        self.nonce.as_bytes()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AuthDecision {
    Allowed { user: StateRecord },
    Denied { reason: String },
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn challenge(&self) -> Challenge {
        Challenge::random()
    }

    /// Decide whether the holder of `public_key` may act in one of
    /// `allowed_roles` (any role when empty).
    async fn authorize(
        &self,
        public_key: &PublicKey,
        challenge: &Challenge,
        signature: &Signature,
        allowed_roles: &[&str],
    ) -> SdkResult<AuthDecision>;
}

/// Authorizes against User records on the ledger.
///
/// A caller is allowed when the signature over the challenge verifies, the
/// user is registered with `authorized = "allow"`, and its role is accepted.
pub struct LedgerAuthority<R: HistoryReader = LedgerClient> {
    reader: R,
}

impl<R: HistoryReader> LedgerAuthority<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: HistoryReader> AuthProvider for LedgerAuthority<R> {
    async fn authorize(
        &self,
        public_key: &PublicKey,
        challenge: &Challenge,
        signature: &Signature,
        allowed_roles: &[&str],
    ) -> SdkResult<AuthDecision> {
        if public_key.verify(challenge.message(), signature).is_err() {
            return Ok(AuthDecision::denied("challenge signature does not verify"));
        }
        let address = public_key.to_entity_id()?.address(EntityFamily::User);
        let Some(bytes) = self.reader.current(&address).await? else {
            return Ok(AuthDecision::denied("user is not registered"));
        };
        let user = StateRecord::decode(EntityFamily::User, &bytes)?;
        if user.field("authorized") != Some("allow") {
            return Ok(AuthDecision::denied("user is not authorized"));
        }
        let role = user.field("role").unwrap_or("");
        if !allowed_roles.is_empty() && !allowed_roles.contains(&role) {
            return Ok(AuthDecision::denied(format!("role `{role}` is not permitted")));
        }
        tracing::debug!(user = %public_key, role, "authorized");
        Ok(AuthDecision::Allowed { user })
    }
}
