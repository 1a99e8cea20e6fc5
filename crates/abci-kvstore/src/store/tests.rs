//! Unit tests for the key/value store.

use abci_server::query::proof::verify_proof;
use abci_server::{Consensus, Info, Mempool};
use abci_types::{
    BeginBlockRequest, CheckTxRequest, DeliverTxRequest, EndBlockRequest, Header, InfoRequest,
    InitChainRequest, PublicKey, QueryRequest, SetOptionRequest, ValidatorUpdate,
};
use rstest::{fixture, rstest};

use super::{CODESPACE, KvStore, codes};
use crate::transaction::Transaction;

#[fixture]
fn store() -> KvStore {
    let store = KvStore::new();
    store
        .init_chain(InitChainRequest::default())
        .into_result().expect("genesis");
    store
}

fn run_block(store: &KvStore, height: u64, txs: &[&[u8]]) -> (Vec<ValidatorUpdate>, Vec<u8>) {
    store
        .begin_block(BeginBlockRequest::for_header(Header::at(
            "kv-test",
            height,
            store.last_app_hash(),
        )))
        .into_result().expect("begin block");
    for tx in txs {
        store
            .deliver_tx(DeliverTxRequest { tx: tx.to_vec() })
            .into_result().expect("deliver tx");
    }
    let end = store
        .end_block(EndBlockRequest { height })
        .into_result().expect("end block");
    let commit = store.commit().into_result().expect("commit");
    (end.validator_updates, commit.data)
}

fn query(key: &[u8], height: u64, prove: bool) -> QueryRequest {
    QueryRequest {
        data: key.to_vec(),
        path: String::from("/store"),
        height,
        prove,
    }
}

#[rstest]
fn committed_values_are_queryable_with_inclusion_proofs(store: KvStore) {
    let (_, app_hash) = run_block(&store, 1, &[b"name=satoshi", b"flag"]);
    assert_eq!(app_hash.len(), 32);

    let answer = store
        .query(query(b"name", 1, true))
        .into_result().expect("query should succeed");
    assert_eq!(answer.value, b"satoshi");
    assert_eq!(answer.log, "exists");
    assert_eq!(answer.height, 1);
    let proof = answer.proof.expect("proof requested");
    verify_proof(&proof, &app_hash, b"name", Some(b"satoshi".as_slice())).expect("proof verifies");
}

#[rstest]
fn missing_keys_come_with_absence_proofs(store: KvStore) {
    let (_, app_hash) = run_block(&store, 1, &[b"a=1", b"c=3"]);

    let answer = store
        .query(query(b"b", 1, true))
        .into_result().expect("query should succeed");
    assert!(answer.value.is_empty());
    assert_eq!(answer.log, "does not exist");
    let proof = answer.proof.expect("proof requested");
    verify_proof(&proof, &app_hash, b"b", None).expect("absence proof verifies");
    assert!(verify_proof(&proof, &app_hash, b"b", Some(b"2".as_slice())).is_err());
}

#[rstest]
fn uncommitted_writes_stay_invisible(store: KvStore) {
    run_block(&store, 1, &[b"k=old"]);
    store
        .begin_block(BeginBlockRequest::for_header(Header::at(
            "kv-test",
            2,
            store.last_app_hash(),
        )))
        .into_result().expect("begin block");
    store
        .deliver_tx(DeliverTxRequest {
            tx: b"k=new".to_vec(),
        })
        .into_result().expect("deliver tx");

    let answer = store.query(query(b"k", 1, false)).into_result().expect("query");
    assert_eq!(answer.value, b"old");
    assert!(answer.proof.is_none());
}

#[rstest]
fn historical_heights_keep_their_values(store: KvStore) {
    run_block(&store, 1, &[b"k=one"]);
    run_block(&store, 2, &[b"k=two"]);

    assert_eq!(store.query(query(b"k", 1, false)).into_result().expect("query").value, b"one");
    assert_eq!(store.query(query(b"k", 2, false)).into_result().expect("query").value, b"two");
}

#[rstest]
fn identical_state_yields_identical_digests(store: KvStore) {
    let other = KvStore::new();
    other
        .init_chain(InitChainRequest::default())
        .into_result().expect("genesis");

    let (_, first) = run_block(&store, 1, &[b"a=1", b"b=2"]);
    let (_, second) = run_block(&other, 1, &[b"b=2", b"a=1"]);
    assert_eq!(first, second);
}

#[rstest]
fn retention_prunes_old_snapshots(store: KvStore) {
    store
        .set_option(SetOptionRequest {
            key: String::from("retain_blocks"),
            value: String::from("2"),
        })
        .into_result().expect("option accepted");

    for height in 1..=4 {
        run_block(&store, height, &[b"k=v"]);
    }
    let commit_retain = {
        store
            .begin_block(BeginBlockRequest::for_header(Header::at(
                "kv-test",
                5,
                store.last_app_hash(),
            )))
            .into_result().expect("begin block");
        store
            .end_block(EndBlockRequest { height: 5 })
            .into_result().expect("end block");
        store.commit().into_result().expect("commit").retain_height
    };

    assert_eq!(commit_retain, 4);
    assert_eq!(store.retained_heights(), [4, 5]);
    let error = store
        .query(query(b"k", 2, false))
        .into_result().expect_err("pruned height");
    assert_eq!(error.code, codes::SNAPSHOT_MISSING);
}

#[rstest]
#[case("retain_blocks", "many")]
#[case("colour", "blue")]
fn invalid_options_are_rejected(store: KvStore, #[case] key: &str, #[case] value: &str) {
    let error = store
        .set_option(SetOptionRequest {
            key: key.to_owned(),
            value: value.to_owned(),
        })
        .into_result().expect_err("option should be rejected");
    assert_eq!(error.code, codes::INVALID_OPTION);
    assert_eq!(error.codespace, CODESPACE);
}

#[rstest]
fn validator_transactions_become_end_block_updates(store: KvStore) {
    let update = ValidatorUpdate::new(PublicKey::ed25519(vec![7; 32]), 10);
    let tx = Transaction::validator_tx(&update);
    let (updates, _) = run_block(&store, 1, &[tx.as_slice()]);
    assert_eq!(updates, [update]);

    let key = format!("val:{}", "07".repeat(32));
    let answer = store
        .query(query(key.as_bytes(), 1, false))
        .into_result().expect("query");
    assert_eq!(answer.value, b"10");
}

#[rstest]
#[case(b"")]
#[case(b"=orphan")]
#[case(b"val:xyz!1")]
fn check_tx_rejects_malformed_transactions(store: KvStore, #[case] tx: &[u8]) {
    let error = store
        .check_tx(CheckTxRequest {
            tx: tx.to_vec(),
            ..CheckTxRequest::default()
        })
        .into_result().expect_err("transaction should be rejected");
    assert_eq!(error.code, codes::INVALID_TRANSACTION);
    assert_eq!(error.codespace, CODESPACE);
}

#[rstest]
fn rejected_check_tx_still_reports_gas(store: KvStore) {
    let reply = store.check_tx(CheckTxRequest {
        tx: b"=orphan".to_vec(),
        ..CheckTxRequest::default()
    });
    assert_eq!(reply.value.gas_wanted, 1);
    assert!(!reply.is_ok());
}

#[test]
fn queries_before_the_first_commit_read_the_empty_state() {
    let store = KvStore::new();
    let answer = store
        .query(query(b"k", 0, false))
        .into_result()
        .expect("query before commit");
    assert!(answer.value.is_empty());
    assert_eq!(answer.log, "does not exist");
    assert_eq!(answer.height, 0);
}

#[rstest]
fn unknown_query_paths_are_rejected(store: KvStore) {
    run_block(&store, 1, &[b"k=v"]);
    let mut request = query(b"k", 1, false);
    request.path = String::from("/accounts");
    let error = store.query(request).into_result().expect_err("path should be rejected");
    assert_eq!(error.code, codes::UNKNOWN_PATH);
}

#[rstest]
fn info_reports_the_latest_commit(store: KvStore) {
    let (_, app_hash) = run_block(&store, 1, &[b"a=1", b"b=2"]);
    let info = store.info(InfoRequest::default()).into_result().expect("info");
    assert_eq!(info.last_block_height, 1);
    assert_eq!(info.last_block_app_hash, app_hash);
    assert_eq!(info.data, r#"{"size":2}"#);
}
