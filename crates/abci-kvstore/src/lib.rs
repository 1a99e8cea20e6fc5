//! Reference application for the ABCI server: a Merkle-committed key/value
//! store.
//!
//! Transactions are `key=value` writes (a bare `key` stores itself) or
//! `val:<hex pubkey>!<power>` validator updates. Each commit seals the block
//! and returns the root of a SHA-256 Merkle tree over every entry as the
//! state digest. Queries on `/store` read any retained height and can carry
//! inclusion or absence proofs checked with
//! [`verify_proof`](abci_server::query::proof::verify_proof).
//!
//! The `abci-kvstore` binary wraps [`run`]: it loads the shared server
//! configuration, serves the store and stops on a termination signal.

mod launch;
mod store;
mod transaction;

pub use launch::{LaunchError, run, run_with};
pub use store::{CODESPACE, KvStore, RETAIN_BLOCKS_OPTION, codes};
pub use transaction::{Transaction, TransactionError, VALIDATOR_PREFIX};
