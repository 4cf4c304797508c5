//! Descriptor wallet
//!
//! Wallet state lives on the native side. Every method holds the wallet
//! handle for the duration of its native call, so concurrent calls on one
//! wallet are serialised and a concurrent [`Dispose::dispose`] waits for
//! them.

use std::ptr;

use bdk_bind_sys::OpaqueWallet;
use tracing::{debug, info};

use crate::blockchain::Blockchain;
use crate::database::DatabaseConfig;
use crate::decode::decode;
use crate::error::BindResult;
use crate::handle::OpaqueHandle;
use crate::lifecycle::Dispose;
use crate::psbt::Psbt;
use crate::sequence::unmarshal;
use crate::string::{c_arg, take_string};
use crate::types::{Balance, LocalUtxo, Network, TransactionDetails};

#[derive(Debug)]
pub struct Wallet {
    pub(crate) handle: OpaqueHandle<OpaqueWallet>,
    network: Network,
}

impl Wallet {
    /// Create a wallet from an external descriptor and an optional change
    /// descriptor
    ///
    /// Malformed descriptors fail with a `Descriptor` error. A wallet already
    /// stored in `database` is loaded instead of created; its descriptors and
    /// network must match or the call fails with `InvalidInput`. The database
    /// configuration stays owned by the caller.
    pub fn new(
        descriptor: &str,
        change_descriptor: Option<&str>,
        network: Network,
        database: &DatabaseConfig,
    ) -> BindResult<Self> {
        let descriptor = c_arg(descriptor, "descriptor")?;
        let change_descriptor = change_descriptor
            .map(|change| c_arg(change, "change_descriptor"))
            .transpose()?;
        let network_name = c_arg(network.as_str(), "network")?;

        let handle = database.handle.with(|library, database| {
            // SAFETY: every string outlives the call and the database config
            // is held for its duration
            let raw = unsafe {
                (library.symbols().bdk_wallet_new)(
                    descriptor.as_ptr(),
                    change_descriptor.as_ref().map_or(ptr::null(), |change| change.as_ptr()),
                    network_name.as_ptr(),
                    database,
                )
            };
            decode(library, "bdk_wallet_new", raw, |wallet| {
                OpaqueHandle::wrap(wallet, library.clone())
            })
        })?;
        debug!(%network, "wallet created");
        Ok(Self { handle, network })
    }

    /// Get the network the wallet was created for
    pub fn network(&self) -> Network {
        self.network
    }

    /// External address at `index`, without revealing it
    ///
    /// Indexes above `2^31 - 1` are hardened and fail with `InvalidInput`.
    pub fn peek_address(&self, index: u32) -> BindResult<String> {
        self.handle.with(|library, wallet| {
            // SAFETY: wallet is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_wallet_peek_address)(wallet, index) };
            decode(library, "bdk_wallet_peek_address", raw, |address| {
                // SAFETY: an owned string from this library
                unsafe { take_string(address, library, "address") }
            })
        })
    }

    /// Reveal and return the next unused external address
    ///
    /// The revealed index is persisted before this returns.
    pub fn reveal_next_address(&self) -> BindResult<String> {
        self.handle.with(|library, wallet| {
            // SAFETY: wallet is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_wallet_reveal_next_address)(wallet) };
            decode(library, "bdk_wallet_reveal_next_address", raw, |address| {
                // SAFETY: an owned string from this library
                unsafe { take_string(address, library, "address") }
            })
        })
    }

    /// Get the wallet balance
    pub fn balance(&self) -> BindResult<Balance> {
        self.handle.with(|library, wallet| {
            // SAFETY: wallet is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_wallet_balance)(wallet) };
            decode(library, "bdk_wallet_balance", raw, |balance| Ok(Balance::from(balance)))
        })
    }

    /// List unspent outputs owned by the wallet
    pub fn list_unspent(&self) -> BindResult<Vec<LocalUtxo>> {
        self.handle.with(|library, wallet| {
            // SAFETY: wallet is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_wallet_list_unspent)(wallet) };
            decode(library, "bdk_wallet_list_unspent", raw, |utxos| {
                // SAFETY: an unreleased sequence from this library
                unsafe {
                    unmarshal(library, utxos, |utxo| LocalUtxo::from_native(utxo))
                }
            })
        })
    }

    /// List transactions relevant to the wallet
    pub fn list_transactions(&self) -> BindResult<Vec<TransactionDetails>> {
        self.handle.with(|library, wallet| {
            // SAFETY: wallet is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_wallet_list_transactions)(wallet) };
            decode(library, "bdk_wallet_list_transactions", raw, |transactions| {
                // SAFETY: an unreleased sequence from this library
                unsafe {
                    unmarshal(library, transactions, |tx| TransactionDetails::from_native(tx))
                }
            })
        })
    }

    /// Full scan against `blockchain`, applying the result to the wallet
    ///
    /// Blocks for the duration of the network exchange.
    pub fn sync(&self, blockchain: &Blockchain) -> BindResult<()> {
        self.handle.with(|library, wallet| {
            blockchain.handle.with(|_, blockchain| {
                // SAFETY: both handles are held for the duration of the call
                let raw = unsafe { (library.symbols().bdk_wallet_sync)(wallet, blockchain) };
                decode(library, "bdk_wallet_sync", raw, |_| Ok(()))
            })
        })?;
        info!(network = %self.network, "wallet synced");
        Ok(())
    }

    /// Sign every input the wallet can; returns whether the PSBT is finalized
    pub fn sign(&self, psbt: &Psbt) -> BindResult<bool> {
        self.handle.with(|library, wallet| {
            psbt.handle.with(|_, psbt| {
                // SAFETY: both handles are held for the duration of the call
                let raw = unsafe { (library.symbols().bdk_wallet_sign)(wallet, psbt) };
                decode(library, "bdk_wallet_sign", raw, Ok)
            })
        })
    }
}

impl Dispose for Wallet {
    fn dispose(&self) -> bool {
        self.handle.release()
    }

    fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}
