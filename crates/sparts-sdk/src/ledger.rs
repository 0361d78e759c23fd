//! High-level entity API over [`LedgerClient`].
//!
//! Each write reads the current record, runs the transition engine locally to
//! build the exact record the validator will compute, signs it into a batch,
//! submits, and waits for the commit. Local checks (existence, dangling
//! targets, no-op amends) only save a round trip; the validator re-applies
//! every rule against live state.

use sparts_crypto::{PublicKey, Signer};
use sparts_ledger::{
    Action, FamilySchema, HistoryValidator, HistoryWalker, KnownTargets, Patch, Rejected,
    RelationEntry, RelationTarget, StateRecord, TransactionPayload, TransitionContext,
    TransitionEngine, ValidationReport,
};
use sparts_protocol::{BatchBuilder, BatchList, TransactionBuilder};
use sparts_types::{BlockRef, DateRange, EntityFamily, EntityId, LedgerAddress, Timestamp};

use crate::client::LedgerClient;
use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};

pub struct PartsLedger {
    client: LedgerClient,
    signer: Signer,
    walker: HistoryWalker,
}

impl PartsLedger {
    pub fn new(client: LedgerClient, signer: Signer) -> Self {
        let walker = HistoryWalker::new(client.config().max_history_depth);
        Self {
            client,
            signer,
            walker,
        }
    }

    pub fn connect(config: ClientConfig, signer: Signer) -> SdkResult<Self> {
        Ok(Self::new(LedgerClient::new(config)?, signer))
    }

    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    /// Public key transactions are signed with.
    pub fn public_key(&self) -> &PublicKey {
        self.signer.public_key()
    }

    // ---- Reads ----

    /// Current record, or `None` if the entity was never created.
    pub async fn find(&self, family: EntityFamily, id: &EntityId) -> SdkResult<Option<StateRecord>> {
        let Some(bytes) = self.client.read(&id.address(family)).await? else {
            return Ok(None);
        };
        Ok(Some(StateRecord::decode(family, &bytes)?))
    }

    /// Current record; `NotFound` if absent.
    pub async fn retrieve(&self, family: EntityFamily, id: &EntityId) -> SdkResult<StateRecord> {
        self.find(family, id).await?.ok_or_else(|| not_found(family, id))
    }

    /// Every record of `family`, in address order.
    pub async fn list(&self, family: EntityFamily) -> SdkResult<Vec<StateRecord>> {
        let entries = self
            .client
            .list(&LedgerAddress::family_prefix(family))
            .await?;
        entries
            .iter()
            .map(|entry| StateRecord::decode(family, &entry.data).map_err(SdkError::from))
            .collect()
    }

    /// Every version, newest first.
    pub async fn history(&self, family: EntityFamily, id: &EntityId) -> SdkResult<Vec<StateRecord>> {
        Ok(self.walker.full(&self.client, family, id).await?)
    }

    /// Versions dated inside `range`, newest first.
    pub async fn history_in_range(
        &self,
        family: EntityFamily,
        id: &EntityId,
        range: DateRange,
    ) -> SdkResult<Vec<StateRecord>> {
        Ok(self.walker.in_range(&self.client, family, id, range).await?)
    }

    /// Walk the full history and check its chain structure.
    pub async fn validate_history(&self, family: EntityFamily, id: &EntityId) -> SdkResult<ValidationReport> {
        let history = self.history(family, id).await?;
        Ok(HistoryValidator::validate(&history))
    }

    // ---- Writes ----

    pub async fn create<K, V>(
        &self,
        family: EntityFamily,
        id: &EntityId,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> SdkResult<StateRecord>
    where
        K: Into<String>,
        V: Into<String>,
    {
        if self.find(family, id).await?.is_some() {
            return Err(Rejected::AlreadyExists {
                family,
                id: id.to_string(),
            }
            .into());
        }
        let block = self.next_block().await?;
        let payload = self.build(None, family, id, Action::create(fields), &KnownTargets::new(), block)?;
        self.commit_one(payload).await
    }

    /// Register a user identified by `public_key`. New users start with
    /// `authorized = "deny"`.
    pub async fn register_user(
        &self,
        public_key: &PublicKey,
        user_name: &str,
        email_address: &str,
        role: Option<&str>,
    ) -> SdkResult<StateRecord> {
        let mut fields = vec![("user_name", user_name), ("email_address", email_address)];
        if let Some(role) = role {
            fields.push(("role", role));
        }
        self.create(EntityFamily::User, &public_key.to_entity_id()?, fields)
            .await
    }

    /// Replace some fields. Refused locally when nothing would change.
    pub async fn amend<K: Into<String>>(
        &self,
        family: EntityFamily,
        id: &EntityId,
        patches: impl IntoIterator<Item = (K, Patch)>,
    ) -> SdkResult<StateRecord> {
        let prior = self.retrieve(family, id).await?;
        let block = self.next_block().await?;
        let payload = self.build(
            Some(&prior),
            family,
            id,
            Action::amend(patches),
            &KnownTargets::new(),
            block,
        )?;
        if payload.record.same_content(&prior) {
            return Err(SdkError::Unchanged {
                family,
                id: id.to_string(),
            });
        }
        self.commit_one(payload).await
    }

    /// Append `target` to `relation`. A missing target entity fails with
    /// `DanglingReference` before anything is signed.
    pub async fn add_relation(
        &self,
        family: EntityFamily,
        id: &EntityId,
        relation: &str,
        target: RelationEntry,
    ) -> SdkResult<StateRecord> {
        let prior = self.retrieve(family, id).await?;
        let mut targets = KnownTargets::new();
        if let (Some(spec), Some(target_id)) = (FamilySchema::of(family).relation(relation), target.as_ref_id()) {
            if let RelationTarget::Family(target_family) = spec.target {
                let target_address = LedgerAddress::derive(target_family, target_id);
                if self.client.read(&target_address).await?.is_some() {
                    targets.insert(target_family, target_id);
                }
            }
        }
        let block = self.next_block().await?;
        let action = Action::add(relation, target);
        let payload = self.build(Some(&prior), family, id, action, &targets, block)?;
        self.commit_one(payload).await
    }

    pub async fn remove_relation(
        &self,
        family: EntityFamily,
        id: &EntityId,
        relation: &str,
        target: RelationEntry,
    ) -> SdkResult<StateRecord> {
        let prior = self.retrieve(family, id).await?;
        let block = self.next_block().await?;
        let action = Action::remove(relation, target);
        let payload = self.build(Some(&prior), family, id, action, &KnownTargets::new(), block)?;
        self.commit_one(payload).await
    }

    /// Link two entities in both directions with one atomic batch.
    ///
    /// Both families must have a relation list pointing at the other, and the
    /// two sides must be different entities.
    pub async fn relate_bidirectional(
        &self,
        left: (EntityFamily, &EntityId),
        right: (EntityFamily, &EntityId),
    ) -> SdkResult<(StateRecord, StateRecord)> {
        let (left_family, left_id) = left;
        let (right_family, right_id) = right;
        if left_family == right_family && left_id == right_id {
            // Both halves would write one address in one block.
            return Err(Rejected::InvalidPayload(format!(
                "cannot link {left_family} {left_id} to itself"
            ))
            .into());
        }
        let left_relation = relation_between(left_family, right_family)?;
        let right_relation = relation_between(right_family, left_family)?;

        let left_prior = self.retrieve(left_family, left_id).await?;
        let right_prior = self.retrieve(right_family, right_id).await?;
        let targets = KnownTargets::new()
            .with(left_family, left_id.as_str())
            .with(right_family, right_id.as_str());

        let block = self.next_block().await?;
        let forward = self.build(
            Some(&left_prior),
            left_family,
            left_id,
            Action::add(left_relation, RelationEntry::reference(right_id.as_str())),
            &targets,
            block,
        )?;
        let backward = self.build(
            Some(&right_prior),
            right_family,
            right_id,
            Action::add(right_relation, RelationEntry::reference(left_id.as_str())),
            &targets,
            block,
        )?;

        let mut records = self.commit(vec![forward, backward]).await?.into_iter();
        match (records.next(), records.next()) {
            (Some(l), Some(r)) => Ok((l, r)),
            _ => Err(SdkError::Decode("bidirectional batch returned fewer than two records".into())),
        }
    }

    // ---- Internals ----

    async fn next_block(&self) -> SdkResult<BlockRef> {
        Ok(self.client.block_height().await?.next())
    }

    fn build(
        &self,
        prior: Option<&StateRecord>,
        family: EntityFamily,
        id: &EntityId,
        action: Action,
        targets: &KnownTargets,
        block: BlockRef,
    ) -> SdkResult<TransactionPayload> {
        let ctx = TransitionContext::new(family, id.clone(), block, Timestamp::now());
        let record = TransitionEngine::apply(prior, &action, &ctx, targets)?;
        Ok(TransactionPayload::new(action, record)?)
    }

    async fn commit_one(&self, payload: TransactionPayload) -> SdkResult<StateRecord> {
        let mut records = self.commit(vec![payload]).await?;
        records
            .pop()
            .ok_or_else(|| SdkError::Decode("batch returned no record".into()))
    }

    /// Sign `payloads` into one batch, submit it and wait for the commit.
    async fn commit(&self, payloads: Vec<TransactionPayload>) -> SdkResult<Vec<StateRecord>> {
        let transactions = payloads
            .iter()
            .map(|payload| {
                TransactionBuilder::new(payload.family(), payload.encode())
                    .touching(payload.record.address())
                    .sign(&self.signer)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let batch = BatchBuilder::new().transactions(transactions).sign(&self.signer)?;
        let batch_id = batch.id();
        let handle = self.client.submit(&BatchList::single(batch)).await?;
        self.client.wait_for_commit(&handle).await?;

        for payload in &payloads {
            tracing::debug!(
                family = payload.family().wire_name(),
                address = %payload.record.address().short(),
                action = payload.action_name(),
                block = %payload.record.cur_block,
                "transition committed"
            );
        }
        tracing::info!(batch = short(&batch_id), transactions = payloads.len(), "batch committed");
        Ok(payloads.into_iter().map(|p| p.record).collect())
    }
}

fn short(id: &str) -> &str {
    &id[..id.len().min(16)]
}

fn not_found(family: EntityFamily, id: &EntityId) -> SdkError {
    Rejected::NotFound {
        family,
        id: id.to_string(),
    }
    .into()
}

fn relation_between(from: EntityFamily, to: EntityFamily) -> SdkResult<&'static str> {
    FamilySchema::of(from)
        .relation_to(to)
        .map(|spec| spec.name)
        .ok_or_else(|| {
            Rejected::UnsupportedAction {
                family: from,
                action: format!("relate to {to}"),
            }
            .into()
        })
}
