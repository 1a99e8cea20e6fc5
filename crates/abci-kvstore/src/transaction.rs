//! Transaction syntax understood by the store.
//!
//! ```text
//! key=value           write `value` under `key`
//! key                 write `key` under itself
//! val:<hex>!<power>   set the voting power of an ed25519 validator
//! ```

use abci_types::{PublicKey, ValidatorUpdate};
use thiserror::Error;

/// Prefix marking a validator update.
pub const VALIDATOR_PREFIX: &[u8] = b"val:";

/// Why a transaction was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The transaction has no bytes.
    #[error("transaction is empty")]
    Empty,
    /// The key before `=` is empty.
    #[error("transaction key is empty")]
    EmptyKey,
    /// A validator update lacks the `!` separator.
    #[error("validator update must look like val:<hex pubkey>!<power>")]
    MalformedValidator,
    /// The validator key is not valid hex, or is empty.
    #[error("validator public key is not valid hex: {0}")]
    InvalidPublicKey(String),
    /// The validator power is not a non-negative integer.
    #[error("validator power '{0}' is not a non-negative integer")]
    InvalidPower(String),
}

/// A parsed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Write a value.
    Set {
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Change a validator's voting power; zero removes it.
    Validator(ValidatorUpdate),
}

impl Transaction {
    /// Parses raw transaction bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the bytes match no known form.
    pub fn parse(tx: &[u8]) -> Result<Self, TransactionError> {
        if tx.is_empty() {
            return Err(TransactionError::Empty);
        }
        if let Some(body) = tx.strip_prefix(VALIDATOR_PREFIX) {
            return parse_validator(body).map(Self::Validator);
        }
        match tx.iter().position(|byte| *byte == b'=') {
            Some(0) => Err(TransactionError::EmptyKey),
            Some(split) => Ok(Self::Set {
                key: tx[..split].to_vec(),
                value: tx[split + 1..].to_vec(),
            }),
            None => Ok(Self::Set {
                key: tx.to_vec(),
                value: tx.to_vec(),
            }),
        }
    }

    /// Encodes a validator update in transaction form.
    #[must_use]
    pub fn validator_tx(update: &ValidatorUpdate) -> Vec<u8> {
        let mut tx = VALIDATOR_PREFIX.to_vec();
        tx.extend_from_slice(hex::encode(&update.public_key.data).as_bytes());
        tx.push(b'!');
        tx.extend_from_slice(update.power.to_string().as_bytes());
        tx
    }
}

fn parse_validator(body: &[u8]) -> Result<ValidatorUpdate, TransactionError> {
    let body = String::from_utf8_lossy(body);
    let (key, power) = body
        .split_once('!')
        .ok_or(TransactionError::MalformedValidator)?;
    if key.is_empty() {
        return Err(TransactionError::InvalidPublicKey(String::from("empty key")));
    }
    let key =
        hex::decode(key).map_err(|error| TransactionError::InvalidPublicKey(error.to_string()))?;
    let power = power
        .parse::<u64>()
        .map_err(|_| TransactionError::InvalidPower(power.to_owned()))?;
    Ok(ValidatorUpdate::new(PublicKey::ed25519(key), power))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"name=satoshi", b"name", b"satoshi")]
    #[case(b"flag", b"flag", b"flag")]
    #[case(b"empty=", b"empty", b"")]
    #[case(b"a=b=c", b"a", b"b=c")]
    fn parses_writes(#[case] tx: &[u8], #[case] key: &[u8], #[case] value: &[u8]) {
        assert_eq!(
            Transaction::parse(tx),
            Ok(Transaction::Set {
                key: key.to_vec(),
                value: value.to_vec(),
            })
        );
    }

    #[test]
    fn parses_validator_updates() {
        let parsed = Transaction::parse(b"val:0a0b!7").expect("valid update");
        assert_eq!(
            parsed,
            Transaction::Validator(ValidatorUpdate::new(PublicKey::ed25519(vec![10, 11]), 7))
        );
    }

    #[test]
    fn validator_transactions_parse_back() {
        let update = ValidatorUpdate::new(PublicKey::ed25519(vec![0xab; 4]), 0);
        let tx = Transaction::validator_tx(&update);
        assert_eq!(tx, b"val:abababab!0".to_vec());
        assert_eq!(Transaction::parse(&tx), Ok(Transaction::Validator(update)));
    }

    #[rstest]
    #[case(b"", TransactionError::Empty)]
    #[case(b"=value", TransactionError::EmptyKey)]
    #[case(b"val:0a0b", TransactionError::MalformedValidator)]
    #[case(b"val:0a0b!lots", TransactionError::InvalidPower(String::from("lots")))]
    fn rejects_malformed_transactions(#[case] tx: &[u8], #[case] expected: TransactionError) {
        assert_eq!(Transaction::parse(tx), Err(expected));
    }

    #[rstest]
    #[case(b"val:!5")]
    #[case(b"val:zz!5")]
    fn rejects_bad_validator_keys(#[case] tx: &[u8]) {
        assert!(matches!(
            Transaction::parse(tx),
            Err(TransactionError::InvalidPublicKey(_))
        ));
    }
}
