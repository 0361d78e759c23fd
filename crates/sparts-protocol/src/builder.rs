//! Envelope construction, signing and verification.
//!
//! Signing identities are passed in explicitly as `&Signer`; nothing here
//! keeps key material beyond the call.

use sparts_crypto::{PublicKey, Sha512Digest, Signer};
use sparts_types::{EntityFamily, LedgerAddress};

use crate::codec::EnvelopeCodec;
use crate::envelope::{Batch, BatchHeader, Transaction, TransactionHeader};
use crate::error::{ProtocolError, ProtocolResult};
use crate::nonce::{MonotonicNonce, NonceSource};

/// Builds one signed transaction.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    family: EntityFamily,
    inputs: Vec<LedgerAddress>,
    outputs: Vec<LedgerAddress>,
    dependencies: Vec<String>,
    payload: Vec<u8>,
    batcher: Option<PublicKey>,
    nonce: Option<String>,
}

impl TransactionBuilder {
    pub fn new(family: EntityFamily, payload: Vec<u8>) -> Self {
        Self {
            family,
            inputs: Vec::new(),
            outputs: Vec::new(),
            dependencies: Vec::new(),
            payload,
            batcher: None,
            nonce: None,
        }
    }

    /// Declare `address` as both read and written, the shape of every
    /// entity transition.
    pub fn touching(self, address: LedgerAddress) -> Self {
        self.input(address.clone()).output(address)
    }

    pub fn input(mut self, address: LedgerAddress) -> Self {
        if !self.inputs.contains(&address) {
            self.inputs.push(address);
        }
        self
    }

    pub fn output(mut self, address: LedgerAddress) -> Self {
        if !self.outputs.contains(&address) {
            self.outputs.push(address);
        }
        self
    }

    pub fn dependency(mut self, transaction_id: impl Into<String>) -> Self {
        self.dependencies.push(transaction_id.into());
        self
    }

    /// Key that will sign the enclosing batch; defaults to the transaction signer.
    pub fn batcher(mut self, key: PublicKey) -> Self {
        self.batcher = Some(key);
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sign with `signer`, drawing a nonce from `nonces` unless one was set.
    pub fn sign_with(self, signer: &Signer, nonces: &dyn NonceSource) -> ProtocolResult<Transaction> {
        if self.outputs.is_empty() {
            return Err(ProtocolError::InvalidEnvelope("transaction declares no outputs".into()));
        }
        let header = TransactionHeader {
            family_name: self.family.wire_name().into(),
            family_version: EntityFamily::VERSION.into(),
            inputs: self.inputs,
            outputs: self.outputs,
            dependencies: self.dependencies,
            payload_sha512: Sha512Digest::of(&self.payload).to_hex(),
            signer_public_key: *signer.public_key(),
            batcher_public_key: self.batcher.unwrap_or(*signer.public_key()),
            nonce: self.nonce.unwrap_or_else(|| nonces.next_nonce()),
        };
        let header_bytes = EnvelopeCodec::encode(&header)?;
        let header_signature = signer.sign(&header_bytes);
        tracing::trace!(family = %header.family_name, nonce = %header.nonce, "transaction signed");
        Ok(Transaction {
            header: header_bytes,
            header_signature,
            payload: self.payload,
        })
    }

    /// Sign with the process-wide monotonic nonce source.
    pub fn sign(self, signer: &Signer) -> ProtocolResult<Transaction> {
        self.sign_with(signer, MonotonicNonce::shared())
    }

    /// Sign with a hex private key; an unparsable key fails with a bad-key
    /// error before anything is built.
    pub fn sign_with_private_hex(self, private_key: &str) -> ProtocolResult<Transaction> {
        let signer = Signer::from_private_hex(private_key)?;
        self.sign(&signer)
    }
}

/// Builds one signed batch from signed transactions.
#[derive(Clone, Debug, Default)]
pub struct BatchBuilder {
    transactions: Vec<Transaction>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn transactions(mut self, transactions: impl IntoIterator<Item = Transaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    /// Sign the batch. Every transaction must name `signer` as its batcher.
    pub fn sign(self, signer: &Signer) -> ProtocolResult<Batch> {
        if self.transactions.is_empty() {
            return Err(ProtocolError::EmptyBatch);
        }
        for transaction in &self.transactions {
            let header = transaction.decode_header()?;
            if header.batcher_public_key != *signer.public_key() {
                return Err(ProtocolError::InvalidEnvelope(format!(
                    "transaction {} names a different batcher",
                    short(&transaction.id())
                )));
            }
        }
        let header = BatchHeader {
            signer_public_key: *signer.public_key(),
            transaction_ids: self.transactions.iter().map(Transaction::id).collect(),
        };
        let header_bytes = EnvelopeCodec::encode(&header)?;
        let header_signature = signer.sign(&header_bytes);
        Ok(Batch {
            header: header_bytes,
            header_signature,
            transactions: self.transactions,
        })
    }
}

/// Check a transaction's signature and payload binding; returns its header.
pub fn verify_transaction(transaction: &Transaction) -> ProtocolResult<TransactionHeader> {
    let header = transaction.decode_header()?;
    header
        .signer_public_key
        .verify(&transaction.header, &transaction.header_signature)?;
    let claimed = Sha512Digest::from_hex(&header.payload_sha512)?;
    if !claimed.matches(&transaction.payload) {
        return Err(ProtocolError::PayloadHashMismatch);
    }
    Ok(header)
}

/// Check a batch: its own signature, the transaction id list, and every
/// transaction. Returns the decoded transaction headers in batch order.
pub fn verify_batch(batch: &Batch) -> ProtocolResult<Vec<TransactionHeader>> {
    let header = batch.decode_header()?;
    header
        .signer_public_key
        .verify(&batch.header, &batch.header_signature)?;
    if batch.transactions.is_empty() {
        return Err(ProtocolError::EmptyBatch);
    }
    let ids: Vec<String> = batch.transactions.iter().map(Transaction::id).collect();
    if ids != header.transaction_ids {
        return Err(ProtocolError::InvalidEnvelope(
            "batch header does not list its transactions in order".into(),
        ));
    }
    batch
        .transactions
        .iter()
        .map(|transaction| {
            let tx_header = verify_transaction(transaction)?;
            if tx_header.batcher_public_key != header.signer_public_key {
                return Err(ProtocolError::InvalidEnvelope(format!(
                    "transaction {} names a different batcher",
                    short(&transaction.id())
                )));
            }
            Ok(tx_header)
        })
        .collect()
}

fn short(id: &str) -> &str {
    &id[..id.len().min(16)]
}
