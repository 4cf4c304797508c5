//! Transaction builder
//!
//! Parameters accumulate on the native side; [`TxBuilder::finish`] builds an
//! unsigned PSBT against a wallet's UTXOs.

use bdk_bind_sys::OpaqueTxBuilder;

use crate::decode::decode;
use crate::error::BindResult;
use crate::handle::OpaqueHandle;
use crate::lifecycle::Dispose;
use crate::psbt::Psbt;
use crate::string::c_arg;
use crate::wallet::Wallet;

#[derive(Debug)]
pub struct TxBuilder {
    handle: OpaqueHandle<OpaqueTxBuilder>,
}

impl TxBuilder {
    /// Create an empty builder
    pub fn new() -> BindResult<Self> {
        let library = bdk_bind_sys::global()?;
        // SAFETY: takes no arguments; ownership of the result moves to the handle
        let raw = unsafe { (library.symbols().bdk_tx_builder_new)() };
        Ok(Self {
            handle: OpaqueHandle::wrap(raw, library)?,
        })
    }

    /// Pay `amount_sat` to `address`
    ///
    /// The address is parsed immediately; its network is checked against the
    /// wallet in [`TxBuilder::finish`].
    pub fn add_recipient(&self, address: &str, amount_sat: u64) -> BindResult<&Self> {
        let address = c_arg(address, "address")?;
        self.handle.with(|library, builder| {
            // SAFETY: builder is live while the handle is held; address
            // outlives the call
            let raw = unsafe {
                (library.symbols().bdk_tx_builder_add_recipient)(builder, address.as_ptr(), amount_sat)
            };
            decode(library, "bdk_tx_builder_add_recipient", raw, |_| Ok(()))
        })?;
        Ok(self)
    }

    /// Target fee rate in sat/vB
    pub fn fee_rate(&self, sat_per_vb: u64) -> BindResult<&Self> {
        self.handle.with(|library, builder| {
            // SAFETY: builder is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_tx_builder_fee_rate)(builder, sat_per_vb) };
            decode(library, "bdk_tx_builder_fee_rate", raw, |_| Ok(()))
        })?;
        Ok(self)
    }

    /// Select coins from `wallet` and build an unsigned PSBT
    pub fn finish(&self, wallet: &Wallet) -> BindResult<Psbt> {
        self.handle.with(|library, builder| {
            wallet.handle.with(|_, wallet| {
                // SAFETY: both handles are held for the duration of the call
                let raw = unsafe { (library.symbols().bdk_tx_builder_finish)(builder, wallet) };
                decode(library, "bdk_tx_builder_finish", raw, |psbt| {
                    Psbt::from_raw(psbt, library.clone())
                })
            })
        })
    }
}

impl Dispose for TxBuilder {
    fn dispose(&self) -> bool {
        self.handle.release()
    }

    fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}
