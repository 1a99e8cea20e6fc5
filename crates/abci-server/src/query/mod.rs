//! Historical height resolution and proof assembly for queries.
//!
//! The dispatcher resolves the requested height against the committed window
//! before the application sees a query, so once a block is committed
//! applications only ever read heights that exist. Before the first commit
//! the requested height is passed through and the application answers from
//! whatever state it holds. The [`proof`] module builds and checks the Merkle
//! proofs an application attaches to its answers.

pub mod proof;

use abci_types::ResponseError;
use thiserror::Error;

use crate::lifecycle::CommittedWindow;

/// A query height that cannot be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The height lies beyond the latest commit.
    #[error("height {requested} is above the latest committed height {latest}")]
    FutureHeight {
        /// Requested height.
        requested: u64,
        /// Latest committed height.
        latest: u64,
    },
    /// The height was pruned by an earlier retain-height hint.
    #[error("height {requested} was pruned; the lowest retained height is {retain_height}")]
    Pruned {
        /// Requested height.
        requested: u64,
        /// Lowest retained height.
        retain_height: u64,
    },
}

impl From<QueryError> for ResponseError {
    fn from(error: QueryError) -> Self {
        Self::height_unavailable(error.to_string())
    }
}

/// Resolves a requested query height.
///
/// Zero means the latest committed height. A `retain_height` of zero keeps
/// every height. With nothing committed the requested height is returned
/// unchanged.
///
/// # Errors
///
/// Returns [`QueryError`] when the height lies beyond the latest commit or
/// below the retained window.
pub const fn resolve_height(
    requested: u64,
    latest: Option<u64>,
    retain_height: u64,
) -> Result<u64, QueryError> {
    let Some(latest) = latest else {
        return Ok(requested);
    };
    if requested == 0 {
        return Ok(latest);
    }
    if requested > latest {
        return Err(QueryError::FutureHeight { requested, latest });
    }
    if requested < retain_height {
        return Err(QueryError::Pruned {
            requested,
            retain_height,
        });
    }
    Ok(requested)
}

impl CommittedWindow {
    /// Resolves `requested` against this window. See [`resolve_height`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the height cannot be served.
    pub const fn resolve(&self, requested: u64) -> Result<u64, QueryError> {
        resolve_height(requested, self.latest, self.retain_height)
    }
}
