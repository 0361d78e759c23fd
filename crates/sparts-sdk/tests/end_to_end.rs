//! Drives a local devnet through the real HTTP client.

use std::time::Duration;

use sparts_devnet::{DevnetConfig, DevnetServer, RunningDevnet};
use sparts_ledger::{Action, KnownTargets, TransactionPayload, TransitionContext, TransitionEngine};
use sparts_protocol::{BatchBuilder, BatchList, TransactionBuilder};
use sparts_sdk::{
    AuthProvider, BlockRef, ClientConfig, DateRange, EntityFamily, EntityId, ErrorKind,
    LedgerAuthority, PartsLedger, Patch, RelationEntry, SdkError, Signer,
};
use sparts_types::Timestamp;

async fn devnet() -> RunningDevnet {
    DevnetServer::new(DevnetConfig::ephemeral())
        .spawn()
        .await
        .unwrap()
}

fn ledger(devnet: &RunningDevnet, signer: Signer) -> PartsLedger {
    let config = ClientConfig {
        commit_poll_interval: Duration::from_millis(10),
        commit_timeout: Duration::from_secs(5),
        ..ClientConfig::default().with_base_url(devnet.base_url())
    };
    PartsLedger::connect(config, signer).unwrap()
}

fn id(s: &str) -> EntityId {
    EntityId::new(s).unwrap()
}

#[tokio::test]
async fn part_lifecycle_scenario() {
    let devnet = devnet().await;
    let ledger = ledger(&devnet, Signer::generate());
    let p1 = id("p1");

    let created = ledger
        .create(EntityFamily::Part, &p1, [("name", "Widget")])
        .await
        .unwrap();
    assert_eq!(created.prev_block, BlockRef::GENESIS);
    let read = ledger.retrieve(EntityFamily::Part, &p1).await.unwrap();
    assert_eq!(read, created);
    assert_eq!(read.field("name"), Some("Widget"));
    assert!(read.relation("artifact_list").is_empty());

    let amended = ledger
        .amend(EntityFamily::Part, &p1, [("name", Patch::set("Gadget"))])
        .await
        .unwrap();
    assert_eq!(amended.field("name"), Some("Gadget"));
    assert_eq!(amended.prev_block, created.cur_block);

    ledger
        .create(EntityFamily::Artifact, &id("a1"), [("name", "source tarball")])
        .await
        .unwrap();
    let related = ledger
        .add_relation(EntityFamily::Part, &p1, "artifact_list", RelationEntry::reference("a1"))
        .await
        .unwrap();
    assert_eq!(related.relation("artifact_list"), &[RelationEntry::reference("a1")]);

    let err = ledger
        .add_relation(EntityFamily::Part, &p1, "artifact_list", RelationEntry::reference("a1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);

    let err = ledger
        .remove_relation(EntityFamily::Part, &p1, "artifact_list", RelationEntry::reference("a2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotPresent);

    let err = ledger
        .add_relation(EntityFamily::Part, &p1, "artifact_list", RelationEntry::reference("a9"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DanglingReference);

    let err = ledger
        .create(EntityFamily::Part, &p1, [("name", "Again")])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = ledger
        .amend(EntityFamily::Part, &p1, [("name", Patch::Unchanged)])
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::Unchanged { .. }));

    let history = ledger.history(EntityFamily::Part, &p1).await.unwrap();
    let names: Vec<_> = history.iter().map(|r| r.field("name").unwrap_or("")).collect();
    assert_eq!(names, ["Gadget", "Gadget", "Widget"]);
    assert!(history.last().unwrap().is_creation());
    assert!(ledger
        .validate_history(EntityFamily::Part, &p1)
        .await
        .unwrap()
        .is_valid());

    let first = history.last().unwrap().timestamp.date().format("%Y%m%d").to_string();
    let last = history[0].timestamp.date().format("%Y%m%d").to_string();
    let range = DateRange::parse(&first, &last).unwrap();
    let in_range = ledger
        .history_in_range(EntityFamily::Part, &p1, range)
        .await
        .unwrap();
    assert_eq!(in_range.len(), 3);
    let long_ago = DateRange::parse("20000101", "20000131").unwrap();
    assert!(ledger
        .history_in_range(EntityFamily::Part, &p1, long_ago)
        .await
        .unwrap()
        .is_empty());

    assert_eq!(ledger.list(EntityFamily::Part).await.unwrap().len(), 1);
    assert_eq!(ledger.list(EntityFamily::Artifact).await.unwrap().len(), 1);
    assert!(ledger.list(EntityFamily::Supplier).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_entity_reads_as_not_found() {
    let devnet = devnet().await;
    let ledger = ledger(&devnet, Signer::generate());
    assert!(ledger.find(EntityFamily::Category, &id("c0")).await.unwrap().is_none());
    let err = ledger.history(EntityFamily::Category, &id("c0")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn bidirectional_relation_commits_in_one_block() {
    let devnet = devnet().await;
    let ledger = ledger(&devnet, Signer::generate());
    let p1 = id("p1");
    let o1 = id("o1");
    ledger.create(EntityFamily::Part, &p1, [("name", "Widget")]).await.unwrap();
    ledger
        .create(EntityFamily::Organization, &o1, [("name", "Acme")])
        .await
        .unwrap();
    let height = ledger.client().block_height().await.unwrap();

    let (part, org) = ledger
        .relate_bidirectional((EntityFamily::Part, &p1), (EntityFamily::Organization, &o1))
        .await
        .unwrap();
    assert_eq!(part.relation("organization_list"), &[RelationEntry::reference("o1")]);
    assert_eq!(org.relation("pt_list"), &[RelationEntry::reference("p1")]);
    assert_eq!(part.cur_block, height.next());
    assert_eq!(org.cur_block, height.next());
    assert_eq!(ledger.client().block_height().await.unwrap(), height.next());

    let err = ledger
        .relate_bidirectional((EntityFamily::Part, &p1), (EntityFamily::Supplier, &id("s1")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAction);

    ledger
        .create(EntityFamily::Artifact, &id("a1"), [("name", "tarball")])
        .await
        .unwrap();
    let err = ledger
        .relate_bidirectional((EntityFamily::Artifact, &id("a1")), (EntityFamily::Artifact, &id("a1")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    assert_eq!(ledger.client().block_height().await.unwrap(), height.next().next());
}

#[tokio::test]
async fn validator_rejects_what_the_client_did_not_catch() {
    let devnet = devnet().await;
    let signer = Signer::generate();
    let ledger = ledger(&devnet, signer.clone());

    // Stamped for a block far ahead of the chain head.
    let ctx = TransitionContext::new(
        EntityFamily::Category,
        id("c1"),
        BlockRef::new(50),
        Timestamp::now(),
    );
    let action = Action::create([("name", "Tools")]);
    let record = TransitionEngine::apply(None, &action, &ctx, &KnownTargets::new()).unwrap();
    let payload = TransactionPayload::new(action, record).unwrap();
    let transaction = TransactionBuilder::new(EntityFamily::Category, payload.encode())
        .touching(payload.record.address())
        .sign(&signer)
        .unwrap();
    let batch = BatchBuilder::new().transaction(transaction).sign(&signer).unwrap();

    let handle = ledger.client().submit(&BatchList::single(batch)).await.unwrap();
    let err = ledger.client().wait_for_commit(&handle).await.unwrap_err();
    assert!(matches!(err, SdkError::Invalid { kind: ErrorKind::InvalidPayload, .. }));
    assert!(ledger.find(EntityFamily::Category, &id("c1")).await.unwrap().is_none());
}

#[tokio::test]
async fn registered_users_start_unauthorized() {
    let devnet = devnet().await;
    let admin = Signer::generate();
    let ledger = ledger(&devnet, admin.clone());
    let user = Signer::generate();

    let record = ledger
        .register_user(user.public_key(), "ada", "ada@example.com", Some("admin"))
        .await
        .unwrap();
    assert_eq!(record.field("authorized"), Some("deny"));
    let err = ledger
        .amend(EntityFamily::User, &user.public_key().to_entity_id().unwrap(), [("authorized", Patch::set("allow"))])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAction);

    let authority = LedgerAuthority::new(ledger.client().clone());
    let challenge = authority.challenge();
    let signature = user.sign(challenge.message());
    let decision = authority
        .authorize(user.public_key(), &challenge, &signature, &["admin"])
        .await
        .unwrap();
    assert!(!decision.is_allowed());
}
