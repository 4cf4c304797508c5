//! Wallet entry points
//!
//! Every wallet is persisted through its database config. State-changing
//! calls write their staged changes before returning.

use std::ffi::c_char;
use std::str::FromStr;

use bdk_wallet::bitcoin::Network;
use bdk_wallet::chain::ChainPosition;
use bdk_wallet::rusqlite::Connection;
use bdk_wallet::{
    CreateWithPersistError, KeychainKind, LoadError, LoadWithPersistError, PersistedWallet,
    SignOptions, Wallet,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::abi::{
    FfiBalance, FfiConfirmationTime, FfiLocalUtxo, FfiOutPoint, FfiResult, FfiTransactionDetails,
    FfiTxOut, FfiUnit, FfiVec,
};
use crate::alloc::{boxed, c_string, free_c_string, unbox, vec_from_raw, vec_into_raw};
use crate::blockchain::Blockchain;
use crate::database::DatabaseConfig;
use crate::psbt::PsbtState;
use crate::result::{NativeError, NativeResult, arg_ref, arg_str, opt_arg_str, respond};

/// Highest non-hardened derivation index
const MAX_INDEX: u32 = 0x7FFF_FFFF;

/// Lock order: `wallet` before `store`
pub struct WalletState {
    pub wallet: Mutex<PersistedWallet<Connection>>,
    store: Mutex<Connection>,
    pub network: Network,
}

impl WalletState {
    /// Write the wallet's staged changes to its store
    pub fn persist(&self, wallet: &mut PersistedWallet<Connection>) -> NativeResult<()> {
        let mut store = self.store.lock();
        wallet
            .persist(&mut store)
            .map(|_| ())
            .map_err(|e| NativeError::new("Persist", e))
    }
}

fn keychain_code(keychain: KeychainKind) -> u16 {
    match keychain {
        KeychainKind::External => 0,
        KeychainKind::Internal => 1,
    }
}

fn load_error(error: LoadWithPersistError<bdk_wallet::rusqlite::Error>) -> NativeError {
    let code = match &error {
        LoadWithPersistError::InvalidChangeSet(LoadError::Descriptor(_)) => "Descriptor",
        LoadWithPersistError::InvalidChangeSet(LoadError::Mismatch(_)) => "LoadMismatch",
        _ => "Persist",
    };
    NativeError::new(code, error)
}

fn create_error(error: CreateWithPersistError<bdk_wallet::rusqlite::Error>) -> NativeError {
    let code = match &error {
        CreateWithPersistError::Descriptor(_) => "Descriptor",
        _ => "Persist",
    };
    NativeError::new(code, error)
}

unsafe fn create(
    descriptor: *const c_char,
    change_descriptor: *const c_char,
    network: *const c_char,
    database: *mut DatabaseConfig,
) -> NativeResult<WalletState> {
    // SAFETY: arguments are NUL terminated strings or null per caller contract
    let descriptor = unsafe { arg_str(descriptor, "descriptor") }?.to_string();
    let change_descriptor = unsafe { opt_arg_str(change_descriptor, "change_descriptor") }?
        .map(str::to_string);
    let network = unsafe { arg_str(network, "network") }?;
    let database = unsafe { arg_ref(database, "database") }?;

    let network = Network::from_str(network)
        .map_err(|e| NativeError::new("InvalidNetwork", format!("{network}: {e}")))?;

    let mut store = database.open()?;
    let loaded = Wallet::load()
        .descriptor(KeychainKind::External, Some(descriptor.clone()))
        .descriptor(KeychainKind::Internal, change_descriptor.clone())
        .extract_keys()
        .check_network(network)
        .load_wallet(&mut store)
        .map_err(load_error)?;

    let wallet = match loaded {
        Some(wallet) => {
            debug!(%network, ?database, "wallet loaded");
            wallet
        }
        None => {
            let created = match change_descriptor {
                Some(change) => Wallet::create(descriptor, change)
                    .network(network)
                    .create_wallet(&mut store),
                None => Wallet::create_single(descriptor)
                    .network(network)
                    .create_wallet(&mut store),
            }
            .map_err(create_error)?;
            debug!(%network, ?database, "wallet created");
            created
        }
    };

    Ok(WalletState {
        wallet: Mutex::new(wallet),
        store: Mutex::new(store),
        network,
    })
}

/// # Safety
/// String arguments must be null or NUL terminated; `database` must be null
/// or a live pointer from a database config constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_new(
    descriptor: *const c_char,
    change_descriptor: *const c_char,
    network: *const c_char,
    database: *mut DatabaseConfig,
) -> *mut FfiResult<*mut WalletState> {
    // SAFETY: per caller contract
    respond(|| unsafe { create(descriptor, change_descriptor, network, database) }.map(boxed))
}

/// # Safety
/// `wallet` must be null or a live pointer from `bdk_wallet_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_free(wallet: *mut WalletState) {
    // SAFETY: per caller contract
    drop(unsafe { unbox(wallet) });
}

/// # Safety
/// `wallet` must be null or a live pointer from `bdk_wallet_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_peek_address(
    wallet: *mut WalletState,
    index: u32,
) -> *mut FfiResult<*mut c_char> {
    respond(|| {
        // SAFETY: per caller contract
        let state = unsafe { arg_ref(wallet, "wallet") }?;
        if index > MAX_INDEX {
            return Err(NativeError::new(
                "InvalidIndex",
                format!("derivation index {index} is above {MAX_INDEX}"),
            ));
        }
        let info = state.wallet.lock().peek_address(KeychainKind::External, index);
        Ok(c_string(info.address.to_string()))
    })
}

/// # Safety
/// `wallet` must be null or a live pointer from `bdk_wallet_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_reveal_next_address(
    wallet: *mut WalletState,
) -> *mut FfiResult<*mut c_char> {
    respond(|| {
        // SAFETY: per caller contract
        let state = unsafe { arg_ref(wallet, "wallet") }?;
        let mut wallet = state.wallet.lock();
        let info = wallet.reveal_next_address(KeychainKind::External);
        state.persist(&mut wallet)?;
        Ok(c_string(info.address.to_string()))
    })
}

/// # Safety
/// `wallet` must be null or a live pointer from `bdk_wallet_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_balance(wallet: *mut WalletState) -> *mut FfiResult<FfiBalance> {
    // SAFETY: per caller contract
    respond(|| unsafe { arg_ref(wallet, "wallet") }.map(|state| {
        let balance = state.wallet.lock().balance();
        FfiBalance {
            immature: balance.immature.to_sat(),
            trusted_pending: balance.trusted_pending.to_sat(),
            untrusted_pending: balance.untrusted_pending.to_sat(),
            confirmed: balance.confirmed.to_sat(),
        }
    }))
}

/// # Safety
/// `wallet` must be null or a live pointer from `bdk_wallet_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_list_unspent(
    wallet: *mut WalletState,
) -> *mut FfiResult<FfiVec<FfiLocalUtxo>> {
    // SAFETY: per caller contract
    respond(|| unsafe { arg_ref(wallet, "wallet") }.map(|state| {
        let utxos = state
            .wallet
            .lock()
            .list_unspent()
            .map(|utxo| FfiLocalUtxo {
                outpoint: FfiOutPoint {
                    txid: c_string(utxo.outpoint.txid.to_string()),
                    vout: utxo.outpoint.vout,
                },
                txout: FfiTxOut {
                    value: utxo.txout.value.to_sat(),
                    script_pubkey: c_string(utxo.txout.script_pubkey.to_hex_string()),
                },
                keychain: keychain_code(utxo.keychain),
            })
            .collect();
        vec_into_raw(utxos)
    }))
}

/// # Safety
/// `wallet` must be null or a live pointer from `bdk_wallet_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_list_transactions(
    wallet: *mut WalletState,
) -> *mut FfiResult<FfiVec<FfiTransactionDetails>> {
    // SAFETY: per caller contract
    respond(|| unsafe { arg_ref(wallet, "wallet") }.map(|state| {
        let wallet = state.wallet.lock();
        let details = wallet
            .transactions()
            .map(|tx| {
                let (is_confirmed, confirmation_time) = match tx.chain_position {
                    ChainPosition::Confirmed { anchor, .. } => (
                        true,
                        FfiConfirmationTime {
                            height: anchor.block_id.height,
                            timestamp: anchor.confirmation_time,
                        },
                    ),
                    ChainPosition::Unconfirmed { .. } => (false, FfiConfirmationTime::default()),
                };
                let (sent, received) = wallet.sent_and_received(&tx.tx_node.tx);
                let fee = wallet
                    .calculate_fee(&tx.tx_node.tx)
                    .ok()
                    .and_then(|fee| i64::try_from(fee.to_sat()).ok())
                    .unwrap_or(-1);
                FfiTransactionDetails {
                    txid: c_string(tx.tx_node.txid.to_string()),
                    received: received.to_sat(),
                    sent: sent.to_sat(),
                    fee,
                    is_confirmed,
                    confirmation_time,
                }
            })
            .collect();
        vec_into_raw(details)
    }))
}

unsafe fn sync(wallet: *mut WalletState, blockchain: *mut Blockchain) -> NativeResult<FfiUnit> {
    // SAFETY: per caller contract
    let state = unsafe { arg_ref(wallet, "wallet") }?;
    let blockchain = unsafe { arg_ref(blockchain, "blockchain") }?;

    let mut wallet = state.wallet.lock();
    let request = wallet.start_full_scan();
    let update = blockchain
        .client
        .full_scan(request, blockchain.stop_gap, blockchain.batch_size, false)
        .map_err(|e| NativeError::new("Electrum", e))?;
    wallet
        .apply_update(update)
        .map_err(|e| NativeError::new("CannotConnect", e))?;
    state.persist(&mut wallet)?;
    debug!(network = %state.network, "wallet synced");
    Ok(0)
}

/// # Safety
/// Both pointers must be null or live pointers from their constructors.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_sync(
    wallet: *mut WalletState,
    blockchain: *mut Blockchain,
) -> *mut FfiResult<FfiUnit> {
    // SAFETY: per caller contract
    respond(|| unsafe { sync(wallet, blockchain) })
}

unsafe fn sign(wallet: *mut WalletState, psbt: *mut PsbtState) -> NativeResult<bool> {
    // SAFETY: per caller contract
    let state = unsafe { arg_ref(wallet, "wallet") }?;
    let psbt = unsafe { arg_ref(psbt, "psbt") }?;

    let wallet = state.wallet.lock();
    let mut psbt = psbt.psbt.lock();
    wallet
        .sign(&mut psbt, SignOptions::default())
        .map_err(|e| NativeError::new("Signer", e))
}

/// # Safety
/// Both pointers must be null or live pointers from their constructors.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_wallet_sign(
    wallet: *mut WalletState,
    psbt: *mut PsbtState,
) -> *mut FfiResult<bool> {
    // SAFETY: per caller contract
    respond(|| unsafe { sign(wallet, psbt) })
}

/// # Safety
/// `vec` must come from `bdk_wallet_list_unspent` and not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_vec_utxos_free(vec: FfiVec<FfiLocalUtxo>) {
    // SAFETY: per caller contract
    if let Some(utxos) = unsafe { vec_from_raw(vec) } {
        for utxo in utxos {
            // SAFETY: the strings were allocated with the block
            unsafe {
                free_c_string(utxo.outpoint.txid);
                free_c_string(utxo.txout.script_pubkey);
            }
        }
    }
}

/// # Safety
/// `vec` must come from `bdk_wallet_list_transactions` and not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_vec_transactions_free(vec: FfiVec<FfiTransactionDetails>) {
    // SAFETY: per caller contract
    if let Some(details) = unsafe { vec_from_raw(vec) } {
        for detail in details {
            // SAFETY: the string was allocated with the block
            unsafe { free_c_string(detail.txid) };
        }
    }
}
