//! Host value types copied out of native results

use std::fmt;
use std::str::FromStr;

use bdk_bind_sys::{FfiBalance, FfiLocalUtxo, FfiTransactionDetails};
use serde::{Deserialize, Serialize};

use crate::error::{BindError, BindResult};
use crate::string::copy_str;

/// Bitcoin network a wallet operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    /// Name understood by the native library
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Testnet => "testnet",
            Self::Signet => "signet",
            Self::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(Self::Bitcoin),
            "testnet" => Ok(Self::Testnet),
            "signet" => Ok(Self::Signet),
            "regtest" => Ok(Self::Regtest),
            _ => Err(BindError::native("InvalidNetwork", format!("unknown network: {s}"))),
        }
    }
}

/// Wallet balance in satoshis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Coinbase outputs not yet mature
    pub immature: u64,
    /// Unconfirmed outputs the wallet sent to itself
    pub trusted_pending: u64,
    /// Unconfirmed outputs received from others
    pub untrusted_pending: u64,
    pub confirmed: u64,
}

impl Balance {
    /// Confirmed plus trusted pending
    pub fn trusted_spendable(&self) -> u64 {
        self.confirmed + self.trusted_pending
    }

    /// Sum of every balance category
    pub fn total(&self) -> u64 {
        self.immature + self.trusted_pending + self.untrusted_pending + self.confirmed
    }
}

impl From<FfiBalance> for Balance {
    fn from(raw: FfiBalance) -> Self {
        Self {
            immature: raw.immature,
            trusted_pending: raw.trusted_pending,
            untrusted_pending: raw.untrusted_pending,
            confirmed: raw.confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeychainKind {
    External,
    Internal,
}

impl TryFrom<u16> for KeychainKind {
    type Error = BindError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::External),
            1 => Ok(Self::Internal),
            other => Err(BindError::invalid_input(format!("unknown keychain {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    /// Locking script, hex
    pub script_pubkey: String,
}

/// Unspent output owned by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUtxo {
    pub outpoint: OutPoint,
    pub txout: TxOut,
    pub keychain: KeychainKind,
}

impl LocalUtxo {
    /// # Safety
    /// String fields of `raw` must be null or live NUL terminated strings.
    pub(crate) unsafe fn from_native(raw: &FfiLocalUtxo) -> BindResult<Self> {
        // SAFETY: per caller contract
        let (txid, script_pubkey) = unsafe {
            (
                copy_str(raw.outpoint.txid, "outpoint.txid")?,
                copy_str(raw.txout.script_pubkey, "txout.script_pubkey")?,
            )
        };
        Ok(Self {
            outpoint: OutPoint {
                txid,
                vout: raw.outpoint.vout,
            },
            txout: TxOut {
                value: raw.txout.value,
                script_pubkey,
            },
            keychain: KeychainKind::try_from(raw.keychain)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationTime {
    pub height: u32,
    /// Unix seconds
    pub timestamp: u64,
}

/// A wallet transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub txid: String,
    /// Sum of wallet-owned outputs
    pub received: u64,
    /// Sum of wallet-owned inputs
    pub sent: u64,
    /// Unknown when an input is not in the wallet
    pub fee: Option<u64>,
    /// `None` while unconfirmed
    pub confirmation_time: Option<ConfirmationTime>,
}

impl TransactionDetails {
    /// # Safety
    /// `raw.txid` must be null or a live NUL terminated string.
    pub(crate) unsafe fn from_native(raw: &FfiTransactionDetails) -> BindResult<Self> {
        // SAFETY: per caller contract
        let txid = unsafe { copy_str(raw.txid, "txid") }?;
        Ok(Self {
            txid,
            received: raw.received,
            sent: raw.sent,
            fee: u64::try_from(raw.fee).ok(),
            confirmation_time: raw.is_confirmed.then_some(ConfirmationTime {
                height: raw.confirmation_time.height,
                timestamp: raw.confirmation_time.timestamp,
            }),
        })
    }

    /// Net effect on the wallet balance, in satoshis
    pub fn net(&self) -> i64 {
        self.received as i64 - self.sent as i64
    }

    /// Check if the transaction is in a block
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_time.is_some()
    }
}
