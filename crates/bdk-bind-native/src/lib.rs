//! C ABI build of the bdk wallet library
//!
//! Built as a `cdylib` this is the shared object `bdk-bind-sys` loads at
//! runtime. Built as an `rlib` it links into test binaries, which bind it
//! through [`exported_symbols`] without touching the dynamic loader.
//!
//! Every allocation handed to the caller is counted; `bdk_live_allocations`
//! returns to its previous value once the caller has released everything.
//! Wallet logic, descriptor parsing and chain access are delegated to
//! `bdk_wallet` and `bdk_electrum`.

#![allow(clippy::missing_safety_doc)]

mod abi;
mod alloc;
mod blockchain;
mod contract;
mod database;
mod psbt;
mod result;
mod tx_builder;
mod wallet;

use std::ffi::c_void;

pub use abi::ABI_VERSION;

macro_rules! exports {
    ($($module:ident::$name:ident),* $(,)?) => {
        /// Name and address of every exported entry point
        pub fn exported_symbols() -> Vec<(&'static str, *const c_void)> {
            vec![$((stringify!($name), $module::$name as *const c_void)),*]
        }
    };
}

exports! {
    contract::bdk_abi_version,
    contract::bdk_struct_layout,
    contract::bdk_live_allocations,
    contract::bdk_string_free,
    contract::bdk_result_free_database,
    contract::bdk_result_free_wallet,
    contract::bdk_result_free_blockchain,
    contract::bdk_result_free_psbt,
    contract::bdk_result_free_string,
    contract::bdk_result_free_unit,
    contract::bdk_result_free_bool,
    contract::bdk_result_free_balance,
    contract::bdk_result_free_utxos,
    contract::bdk_result_free_transactions,
    wallet::bdk_vec_utxos_free,
    wallet::bdk_vec_transactions_free,
    database::bdk_database_config_memory,
    database::bdk_database_config_sqlite,
    database::bdk_database_config_free,
    wallet::bdk_wallet_new,
    wallet::bdk_wallet_free,
    wallet::bdk_wallet_peek_address,
    wallet::bdk_wallet_reveal_next_address,
    wallet::bdk_wallet_balance,
    wallet::bdk_wallet_list_unspent,
    wallet::bdk_wallet_list_transactions,
    wallet::bdk_wallet_sync,
    wallet::bdk_wallet_sign,
    blockchain::bdk_blockchain_new,
    blockchain::bdk_blockchain_free,
    tx_builder::bdk_tx_builder_new,
    tx_builder::bdk_tx_builder_free,
    tx_builder::bdk_tx_builder_add_recipient,
    tx_builder::bdk_tx_builder_fee_rate,
    tx_builder::bdk_tx_builder_finish,
    psbt::bdk_psbt_from_base64,
    psbt::bdk_psbt_free,
    psbt::bdk_psbt_serialize,
    psbt::bdk_psbt_txid,
}

/// Native allocations not yet released
pub fn live_allocations() -> u64 {
    alloc::live()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exports_are_unique_and_non_null() {
        let symbols = exported_symbols();
        let names: HashSet<_> = symbols.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), symbols.len());
        assert!(symbols.iter().all(|(_, address)| !address.is_null()));
        assert!(names.iter().all(|name| name.starts_with("bdk_")));
    }
}
