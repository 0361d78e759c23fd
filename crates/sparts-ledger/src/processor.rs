use sparts_crypto::PublicKey;
use sparts_state::StateStore;
use sparts_types::{EntityFamily, LedgerAddress};

use crate::engine::{TransitionContext, TransitionEngine};
use crate::error::{LedgerResult, Rejected};
use crate::payload::TransactionPayload;
use crate::record::StateRecord;

/// The parts of a verified transaction the processor needs.
///
/// Signature and payload-hash checks happen before this point; the processor
/// trusts `signer` and `payload` to belong together.
#[derive(Clone, Copy, Debug)]
pub struct TransactionRequest<'a> {
    pub family_name: &'a str,
    pub family_version: &'a str,
    pub outputs: &'a [LedgerAddress],
    pub signer: &'a PublicKey,
    pub payload: &'a [u8],
}

/// Replays transactions against address-keyed state.
///
/// One read-modify-write per transaction: read the entity's address, apply
/// the payload's action, write the new record back. The payload's claimed
/// record must match what the engine computes, so a payload built against a
/// stale prior record is rejected instead of rewriting history.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransactionProcessor;

impl TransactionProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Apply one transaction, returning the record it wrote.
    pub fn process<S: StateStore + ?Sized>(
        &self,
        request: &TransactionRequest<'_>,
        state: &S,
    ) -> LedgerResult<StateRecord> {
        let result = self.process_inner(request, state);
        match &result {
            Ok(record) => tracing::debug!(
                family = request.family_name,
                address = %record.address().short(),
                block = %record.cur_block,
                actor = %request.signer,
                "transition accepted"
            ),
            Err(err) => tracing::warn!(
                family = request.family_name,
                kind = %err.kind(),
                actor = %request.signer,
                error = %err,
                "transition rejected"
            ),
        }
        result
    }

    fn process_inner<S: StateStore + ?Sized>(
        &self,
        request: &TransactionRequest<'_>,
        state: &S,
    ) -> LedgerResult<StateRecord> {
        let family = EntityFamily::from_wire_name(request.family_name)
            .map_err(|e| Rejected::InvalidPayload(e.to_string()))?;
        if request.family_version != EntityFamily::VERSION {
            return Err(Rejected::InvalidPayload(format!(
                "unsupported {} family version {}",
                request.family_name, request.family_version
            )));
        }

        let payload = TransactionPayload::decode(family, request.payload)?;
        let address = payload.record.address();
        if !request.outputs.contains(&address) {
            return Err(Rejected::InvalidPayload(format!(
                "header does not declare output {}",
                address.short()
            )));
        }

        let prior = match state.get(&address)? {
            Some(bytes) => Some(StateRecord::decode(family, &bytes).map_err(|e| {
                Rejected::Internal(format!("stored record at {} is unreadable: {e}", address.short()))
            })?),
            None => None,
        };

        let ctx = TransitionContext::new(
            family,
            payload.record.id.clone(),
            payload.record.cur_block,
            payload.record.timestamp,
        );
        let next = TransitionEngine::apply(prior.as_ref(), &payload.action, &ctx, state)?;
        if next != payload.record {
            return Err(Rejected::InvalidPayload(
                "payload record does not match the transition result".into(),
            ));
        }

        state.set(&address, next.encode())?;
        Ok(next)
    }
}
