//! Transaction builder
//!
//! The native wallet builder borrows the wallet mutably, so the handle only
//! collects parameters; `bdk_tx_builder_finish` replays them against a wallet.

use std::ffi::c_char;
use std::str::FromStr;

use bdk_wallet::bitcoin::address::NetworkUnchecked;
use bdk_wallet::bitcoin::{Address, Amount, FeeRate};
use bdk_wallet::error::CreateTxError;
use parking_lot::Mutex;
use tracing::debug;

use crate::abi::{FfiResult, FfiUnit};
use crate::alloc::{boxed, unbox};
use crate::psbt::PsbtState;
use crate::result::{NativeError, NativeResult, arg_ref, arg_str, respond};
use crate::wallet::WalletState;

#[derive(Debug, Default)]
struct Params {
    recipients: Vec<(Address<NetworkUnchecked>, Amount)>,
    fee_rate: Option<FeeRate>,
}

#[derive(Debug, Default)]
pub struct TxBuilderState {
    params: Mutex<Params>,
}

fn create_tx_code(error: &CreateTxError) -> &'static str {
    match error {
        CreateTxError::CoinSelection { .. } => "InsufficientFunds",
        CreateTxError::NoRecipients { .. } => "NoRecipients",
        CreateTxError::NoUtxosSelected { .. } => "NoUtxosSelected",
        CreateTxError::OutputBelowDustLimit { .. } => "OutputBelowDustLimit",
        CreateTxError::FeeTooLow { .. } => "FeeTooLow",
        CreateTxError::FeeRateTooLow { .. } => "FeeRateTooLow",
        CreateTxError::UnknownUtxo { .. } => "UnknownUtxo",
        CreateTxError::Descriptor { .. } => "Descriptor",
        CreateTxError::Psbt { .. } => "Psbt",
        _ => "Generic",
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn bdk_tx_builder_new() -> *mut TxBuilderState {
    boxed(TxBuilderState::default())
}

/// # Safety
/// `builder` must be null or a live pointer from `bdk_tx_builder_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_tx_builder_free(builder: *mut TxBuilderState) {
    // SAFETY: per caller contract
    drop(unsafe { unbox(builder) });
}

unsafe fn add_recipient(
    builder: *mut TxBuilderState,
    address: *const c_char,
    amount_sat: u64,
) -> NativeResult<FfiUnit> {
    // SAFETY: per caller contract
    let builder = unsafe { arg_ref(builder, "builder") }?;
    let address = unsafe { arg_str(address, "address") }?;

    let parsed = Address::from_str(address)
        .map_err(|e| NativeError::new("Address", format!("{address}: {e}")))?;
    builder
        .params
        .lock()
        .recipients
        .push((parsed, Amount::from_sat(amount_sat)));
    Ok(0)
}

/// # Safety
/// `builder` must be null or live; `address` null or NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_tx_builder_add_recipient(
    builder: *mut TxBuilderState,
    address: *const c_char,
    amount_sat: u64,
) -> *mut FfiResult<FfiUnit> {
    // SAFETY: per caller contract
    respond(|| unsafe { add_recipient(builder, address, amount_sat) })
}

/// # Safety
/// `builder` must be null or a live pointer from `bdk_tx_builder_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_tx_builder_fee_rate(
    builder: *mut TxBuilderState,
    sat_per_vb: u64,
) -> *mut FfiResult<FfiUnit> {
    respond(|| {
        // SAFETY: per caller contract
        let builder = unsafe { arg_ref(builder, "builder") }?;
        let rate = FeeRate::from_sat_per_vb(sat_per_vb)
            .ok_or_else(|| NativeError::new("FeeRate", format!("{sat_per_vb} sat/vB overflows")))?;
        builder.params.lock().fee_rate = Some(rate);
        Ok(0)
    })
}

unsafe fn finish(builder: *mut TxBuilderState, wallet: *mut WalletState) -> NativeResult<PsbtState> {
    // SAFETY: per caller contract
    let builder = unsafe { arg_ref(builder, "builder") }?;
    let state = unsafe { arg_ref(wallet, "wallet") }?;

    let params = builder.params.lock();
    let mut wallet = state.wallet.lock();

    let mut tx = wallet.build_tx();
    for (address, amount) in &params.recipients {
        let address = address
            .clone()
            .require_network(state.network)
            .map_err(|e| NativeError::new("AddressNetwork", e))?;
        tx.add_recipient(address.script_pubkey(), *amount);
    }
    if let Some(rate) = params.fee_rate {
        tx.fee_rate(rate);
    }

    let psbt = tx
        .finish()
        .map_err(|e| NativeError::new(create_tx_code(&e), e))?;
    // Change addresses revealed by the build
    state.persist(&mut wallet)?;
    debug!(recipients = params.recipients.len(), "transaction built");
    Ok(PsbtState::new(psbt))
}

/// # Safety
/// Both pointers must be null or live pointers from their constructors.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_tx_builder_finish(
    builder: *mut TxBuilderState,
    wallet: *mut WalletState,
) -> *mut FfiResult<*mut PsbtState> {
    // SAFETY: per caller contract
    respond(|| unsafe { finish(builder, wallet) }.map(boxed))
}
