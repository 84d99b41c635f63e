//! The handful of Stellar XDR structures this client touches:
//!
//! * `TransactionEnvelope` (v1) carrying `ManageData` operations
//! * `LedgerKey::Account` for `getLedgerEntries`
//! * `LedgerEntryData::Account`, read for its sequence number

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use stellar_xdr::curr as stellar;
use stellar_xdr::curr::{Limits, ReadXdr, WriteXdr};

use crate::errors::{HuntyError, Result};
use crate::strkey;

/// Protocol limit on both the name and value of a data entry.
pub const MANAGE_DATA_MAX_LEN: usize = 64;
/// Protocol limit on operations per transaction.
pub const MAX_OPERATIONS: usize = 100;

fn xdr_error(e: stellar::Error) -> HuntyError {
    HuntyError::Xdr(e.to_string())
}

fn encode<T: WriteXdr>(value: &T) -> Result<String> {
    let raw = value.to_xdr(Limits::none()).map_err(xdr_error)?;
    Ok(BASE64.encode(raw))
}

fn account_id(address: &str) -> Result<stellar::AccountId> {
    let key = strkey::decode_account_id(address)?;
    Ok(stellar::AccountId(stellar::PublicKey::PublicKeyTypeEd25519(
        stellar::Uint256(key),
    )))
}

// ─────────────────────────────────────────────────────────
// Ledger keys / entries
// ─────────────────────────────────────────────────────────

/// Base64 `LedgerKey::Account` for the given `G...` address.
pub fn account_ledger_key(address: &str) -> Result<String> {
    encode(&stellar::LedgerKey::Account(stellar::LedgerKeyAccount {
        account_id: account_id(address)?,
    }))
}

/// Read the sequence number out of a base64 `LedgerEntryData::Account`.
pub fn account_sequence(entry_xdr: &str) -> Result<i64> {
    let raw = BASE64
        .decode(entry_xdr.trim())
        .map_err(|e| HuntyError::Xdr(format!("Invalid base64 ledger entry: {e}")))?;
    match stellar::LedgerEntryData::from_xdr(raw, Limits::none()).map_err(xdr_error)? {
        stellar::LedgerEntryData::Account(account) => Ok(account.seq_num.0),
        other => Err(HuntyError::Xdr(format!(
            "Expected account entry, got {}",
            other.name()
        ))),
    }
}

// ─────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManageDataOp {
    pub name: String,
    pub value: Option<Vec<u8>>,
}

impl ManageDataOp {
    fn to_operation(&self) -> Result<stellar::Operation> {
        if self.name.is_empty() || self.name.len() > MANAGE_DATA_MAX_LEN {
            return Err(HuntyError::Xdr(format!(
                "Data entry name must be 1..={MANAGE_DATA_MAX_LEN} bytes: {}",
                self.name
            )));
        }
        let data_name = stellar::StringM::<64>::try_from(self.name.as_bytes().to_vec())
            .map_err(xdr_error)?;
        let data_value = match &self.value {
            Some(value) => Some(stellar::DataValue(
                stellar::BytesM::<64>::try_from(value.clone()).map_err(|_| {
                    HuntyError::Xdr(format!(
                        "Data entry value is {} bytes, limit is {MANAGE_DATA_MAX_LEN}",
                        value.len()
                    ))
                })?,
            )),
            None => None,
        };

        Ok(stellar::Operation {
            source_account: None,
            body: stellar::OperationBody::ManageData(stellar::ManageDataOp {
                data_name: stellar::String64(data_name),
                data_value,
            }),
        })
    }
}

/// An unsigned v1 transaction built from a source account and its
/// current sequence number.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub source: String,
    pub sequence: i64,
    pub base_fee: u32,
    pub max_time: u64,
    pub operations: Vec<ManageDataOp>,
}

impl TransactionDraft {
    /// Encode as a base64 `TransactionEnvelope` with no signatures.
    pub fn to_envelope_xdr(&self) -> Result<String> {
        if self.operations.is_empty() {
            return Err(HuntyError::Xdr("Transaction has no operations".to_string()));
        }
        if self.operations.len() > MAX_OPERATIONS {
            return Err(HuntyError::Xdr(format!(
                "Transaction has {} operations, limit is {MAX_OPERATIONS}",
                self.operations.len()
            )));
        }

        let source = strkey::decode_account_id(&self.source)?;
        let fee = self
            .base_fee
            .checked_mul(self.operations.len() as u32)
            .ok_or_else(|| HuntyError::Xdr("Fee overflow".to_string()))?;
        let operations = self
            .operations
            .iter()
            .map(ManageDataOp::to_operation)
            .collect::<Result<Vec<_>>>()?;

        let tx = stellar::Transaction {
            source_account: stellar::MuxedAccount::Ed25519(stellar::Uint256(source)),
            fee,
            seq_num: stellar::SequenceNumber(self.sequence + 1),
            cond: stellar::Preconditions::Time(stellar::TimeBounds {
                min_time: stellar::TimePoint(0),
                max_time: stellar::TimePoint(self.max_time),
            }),
            memo: stellar::Memo::None,
            operations: operations.try_into().map_err(xdr_error)?,
            ext: stellar::TransactionExt::V0,
        };

        encode(&stellar::TransactionEnvelope::Tx(
            stellar::TransactionV1Envelope {
                tx,
                signatures: stellar::VecM::default(),
            },
        ))
    }
}

/// Base64 `LedgerEntryData::Account` as returned by `getLedgerEntries`.
#[cfg(test)]
pub(crate) fn account_entry_xdr(key: [u8; 32], sequence: i64) -> String {
    let entry = stellar::LedgerEntryData::Account(stellar::AccountEntry {
        account_id: stellar::AccountId(stellar::PublicKey::PublicKeyTypeEd25519(
            stellar::Uint256(key),
        )),
        balance: 10_000_000,
        seq_num: stellar::SequenceNumber(sequence),
        num_sub_entries: 0,
        inflation_dest: None,
        flags: 0,
        home_domain: stellar::String32(stellar::StringM::default()),
        thresholds: stellar::Thresholds([1, 0, 0, 0]),
        signers: stellar::VecM::default(),
        ext: stellar::AccountEntryExt::V0,
    });
    encode(&entry).unwrap()
}
