//! Test suites for the ABCI server.

mod bootstrap_behaviour;
mod lib_api;
pub(crate) mod support;
