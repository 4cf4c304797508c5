//! Native entry points and the ownership table
//!
//! Every exported function is declared exactly once in [`native_symbols!`].
//! The macro generates the [`Symbols`] table of function pointers together
//! with the list of names it resolves. Which free function releases which
//! allocation is declared right below in [`OWNERSHIP`] and mirrored in the
//! type system by [`TransitPayload`], [`SequenceElement`] and
//! [`OwnedResource`].

use std::ffi::{c_char, c_void};
use std::fmt;

use crate::error::LinkageError;
use crate::types::*;

/// Looks up the address of an exported symbol
pub trait SymbolResolver {
    /// Return the address of `name`, or `LinkageError::MissingSymbol`
    fn resolve(&self, name: &str) -> Result<*const c_void, LinkageError>;

    /// Human readable origin used in logs
    fn origin(&self) -> String;
}

macro_rules! native_symbols {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// Resolved native entry points.
        ///
        /// Resolved once per process; callers go through
        /// [`global`](crate::global) instead of resolving again.
        pub struct Symbols {
            $(
                $(#[$meta])*
                pub $name: unsafe extern "C" fn($($ty),*) $(-> $ret)?,
            )*
        }

        impl Symbols {
            /// Names of every declared entry point, in declaration order
            pub const NAMES: &'static [&'static str] = &[$(stringify!($name)),*];

            /// Resolve every declared entry point
            ///
            /// Fails on the first missing symbol.
            pub fn resolve(resolver: &dyn SymbolResolver) -> Result<Self, LinkageError> {
                Ok(Self {
                    $(
                        $name: {
                            let address = resolver.resolve(stringify!($name))?;
                            if address.is_null() {
                                return Err(LinkageError::missing_symbol(stringify!($name)));
                            }
                            // SAFETY: the address belongs to an exported function with the
                            // declared signature; the layout check at load time guards the
                            // struct types it mentions
                            unsafe {
                                std::mem::transmute::<
                                    *const c_void,
                                    unsafe extern "C" fn($($ty),*) $(-> $ret)?,
                                >(address)
                            }
                        },
                    )*
                })
            }
        }
    };
}

native_symbols! {
    // Contract
    fn bdk_abi_version() -> u32;
    fn bdk_struct_layout(name: *const c_char, out: *mut FfiStructLayout) -> bool;
    /// Number of native allocations not yet released
    fn bdk_live_allocations() -> u64;

    // Strings
    fn bdk_string_free(string: *mut c_char);

    // Transit results
    fn bdk_result_free_database(result: *mut FfiResult<*mut OpaqueDatabaseConfig>);
    fn bdk_result_free_wallet(result: *mut FfiResult<*mut OpaqueWallet>);
    fn bdk_result_free_blockchain(result: *mut FfiResult<*mut OpaqueBlockchain>);
    fn bdk_result_free_psbt(result: *mut FfiResult<*mut OpaquePsbt>);
    fn bdk_result_free_string(result: *mut FfiResult<*mut c_char>);
    fn bdk_result_free_unit(result: *mut FfiResult<FfiUnit>);
    fn bdk_result_free_bool(result: *mut FfiResult<bool>);
    fn bdk_result_free_balance(result: *mut FfiResult<FfiBalance>);
    fn bdk_result_free_utxos(result: *mut FfiResult<FfiVec<FfiLocalUtxo>>);
    fn bdk_result_free_transactions(result: *mut FfiResult<FfiVec<FfiTransactionDetails>>);

    // Sequences
    fn bdk_vec_utxos_free(vec: FfiVec<FfiLocalUtxo>);
    fn bdk_vec_transactions_free(vec: FfiVec<FfiTransactionDetails>);

    // Database configuration
    fn bdk_database_config_memory() -> *mut OpaqueDatabaseConfig;
    fn bdk_database_config_sqlite(path: *const c_char) -> *mut FfiResult<*mut OpaqueDatabaseConfig>;
    fn bdk_database_config_free(config: *mut OpaqueDatabaseConfig);

    // Wallet
    fn bdk_wallet_new(
        descriptor: *const c_char,
        change_descriptor: *const c_char,
        network: *const c_char,
        database: *mut OpaqueDatabaseConfig,
    ) -> *mut FfiResult<*mut OpaqueWallet>;
    fn bdk_wallet_free(wallet: *mut OpaqueWallet);
    fn bdk_wallet_peek_address(wallet: *mut OpaqueWallet, index: u32) -> *mut FfiResult<*mut c_char>;
    fn bdk_wallet_reveal_next_address(wallet: *mut OpaqueWallet) -> *mut FfiResult<*mut c_char>;
    fn bdk_wallet_balance(wallet: *mut OpaqueWallet) -> *mut FfiResult<FfiBalance>;
    fn bdk_wallet_list_unspent(wallet: *mut OpaqueWallet) -> *mut FfiResult<FfiVec<FfiLocalUtxo>>;
    fn bdk_wallet_list_transactions(
        wallet: *mut OpaqueWallet,
    ) -> *mut FfiResult<FfiVec<FfiTransactionDetails>>;
    fn bdk_wallet_sync(
        wallet: *mut OpaqueWallet,
        blockchain: *mut OpaqueBlockchain,
    ) -> *mut FfiResult<FfiUnit>;
    fn bdk_wallet_sign(wallet: *mut OpaqueWallet, psbt: *mut OpaquePsbt) -> *mut FfiResult<bool>;

    // Blockchain
    fn bdk_blockchain_new(config: *const FfiElectrumConfig) -> *mut FfiResult<*mut OpaqueBlockchain>;
    fn bdk_blockchain_free(blockchain: *mut OpaqueBlockchain);

    // Transaction builder
    fn bdk_tx_builder_new() -> *mut OpaqueTxBuilder;
    fn bdk_tx_builder_free(builder: *mut OpaqueTxBuilder);
    fn bdk_tx_builder_add_recipient(
        builder: *mut OpaqueTxBuilder,
        address: *const c_char,
        amount_sat: u64,
    ) -> *mut FfiResult<FfiUnit>;
    fn bdk_tx_builder_fee_rate(builder: *mut OpaqueTxBuilder, sat_per_vb: u64) -> *mut FfiResult<FfiUnit>;
    fn bdk_tx_builder_finish(
        builder: *mut OpaqueTxBuilder,
        wallet: *mut OpaqueWallet,
    ) -> *mut FfiResult<*mut OpaquePsbt>;

    // PSBT
    fn bdk_psbt_from_base64(base64: *const c_char) -> *mut FfiResult<*mut OpaquePsbt>;
    fn bdk_psbt_free(psbt: *mut OpaquePsbt);
    fn bdk_psbt_serialize(psbt: *mut OpaquePsbt) -> *mut c_char;
    fn bdk_psbt_txid(psbt: *mut OpaquePsbt) -> *mut c_char;
}

impl fmt::Debug for Symbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbols")
            .field("count", &Self::NAMES.len())
            .finish_non_exhaustive()
    }
}

/// Which free functions release the allocations made by one entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub allocator: &'static str,
    /// Releases the `FfiResult` transit struct and its error, never the payload
    pub transit: Option<&'static str>,
    /// Releases the payload handed to the caller
    pub payload: Option<&'static str>,
}

const fn owns(
    allocator: &'static str,
    transit: Option<&'static str>,
    payload: Option<&'static str>,
) -> Ownership {
    Ownership {
        allocator,
        transit,
        payload,
    }
}

/// Allocation → free function table
pub const OWNERSHIP: &[Ownership] = &[
    owns("bdk_database_config_memory", None, Some("bdk_database_config_free")),
    owns(
        "bdk_database_config_sqlite",
        Some("bdk_result_free_database"),
        Some("bdk_database_config_free"),
    ),
    owns("bdk_wallet_new", Some("bdk_result_free_wallet"), Some("bdk_wallet_free")),
    owns("bdk_wallet_peek_address", Some("bdk_result_free_string"), Some("bdk_string_free")),
    owns("bdk_wallet_reveal_next_address", Some("bdk_result_free_string"), Some("bdk_string_free")),
    owns("bdk_wallet_balance", Some("bdk_result_free_balance"), None),
    owns("bdk_wallet_list_unspent", Some("bdk_result_free_utxos"), Some("bdk_vec_utxos_free")),
    owns(
        "bdk_wallet_list_transactions",
        Some("bdk_result_free_transactions"),
        Some("bdk_vec_transactions_free"),
    ),
    owns("bdk_wallet_sync", Some("bdk_result_free_unit"), None),
    owns("bdk_wallet_sign", Some("bdk_result_free_bool"), None),
    owns("bdk_blockchain_new", Some("bdk_result_free_blockchain"), Some("bdk_blockchain_free")),
    owns("bdk_tx_builder_new", None, Some("bdk_tx_builder_free")),
    owns("bdk_tx_builder_add_recipient", Some("bdk_result_free_unit"), None),
    owns("bdk_tx_builder_fee_rate", Some("bdk_result_free_unit"), None),
    owns("bdk_tx_builder_finish", Some("bdk_result_free_psbt"), Some("bdk_psbt_free")),
    owns("bdk_psbt_from_base64", Some("bdk_result_free_psbt"), Some("bdk_psbt_free")),
    owns("bdk_psbt_serialize", None, Some("bdk_string_free")),
    owns("bdk_psbt_txid", None, Some("bdk_string_free")),
];

impl Symbols {
    /// Ownership entry for an allocating entry point
    pub fn ownership(allocator: &str) -> Option<&'static Ownership> {
        OWNERSHIP.iter().find(|entry| entry.allocator == allocator)
    }
}

/// Payload type of an `FfiResult` and the function that frees its transit struct
pub trait TransitPayload: Copy {
    fn transit_free(symbols: &Symbols) -> unsafe extern "C" fn(*mut FfiResult<Self>);
}

macro_rules! transit_payloads {
    ($($payload:ty => $free:ident,)*) => {
        $(
            impl TransitPayload for $payload {
                fn transit_free(symbols: &Symbols) -> unsafe extern "C" fn(*mut FfiResult<Self>) {
                    symbols.$free
                }
            }
        )*
    };
}

transit_payloads! {
    *mut OpaqueDatabaseConfig => bdk_result_free_database,
    *mut OpaqueWallet => bdk_result_free_wallet,
    *mut OpaqueBlockchain => bdk_result_free_blockchain,
    *mut OpaquePsbt => bdk_result_free_psbt,
    *mut c_char => bdk_result_free_string,
    FfiUnit => bdk_result_free_unit,
    bool => bdk_result_free_bool,
    FfiBalance => bdk_result_free_balance,
    FfiVec<FfiLocalUtxo> => bdk_result_free_utxos,
    FfiVec<FfiTransactionDetails> => bdk_result_free_transactions,
}

/// Element type of an `FfiVec` and the function that frees the whole block
pub trait SequenceElement: Copy {
    fn vec_free(symbols: &Symbols) -> unsafe extern "C" fn(FfiVec<Self>);
}

impl SequenceElement for FfiLocalUtxo {
    fn vec_free(symbols: &Symbols) -> unsafe extern "C" fn(FfiVec<Self>) {
        symbols.bdk_vec_utxos_free
    }
}

impl SequenceElement for FfiTransactionDetails {
    fn vec_free(symbols: &Symbols) -> unsafe extern "C" fn(FfiVec<Self>) {
        symbols.bdk_vec_transactions_free
    }
}

/// Opaque native type and the function that frees it
pub trait OwnedResource {
    const KIND: ResourceKind;

    fn free_fn(symbols: &Symbols) -> unsafe extern "C" fn(*mut Self);
}

macro_rules! owned_resources {
    ($($ty:ty => $kind:ident, $free:ident;)*) => {
        $(
            impl OwnedResource for $ty {
                const KIND: ResourceKind = ResourceKind::$kind;

                fn free_fn(symbols: &Symbols) -> unsafe extern "C" fn(*mut Self) {
                    symbols.$free
                }
            }
        )*
    };
}

owned_resources! {
    OpaqueDatabaseConfig => DatabaseConfig, bdk_database_config_free;
    OpaqueWallet => Wallet, bdk_wallet_free;
    OpaqueBlockchain => Blockchain, bdk_blockchain_free;
    OpaqueTxBuilder => TxBuilder, bdk_tx_builder_free;
    OpaquePsbt => Psbt, bdk_psbt_free;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let unique: HashSet<_> = Symbols::NAMES.iter().collect();
        assert_eq!(unique.len(), Symbols::NAMES.len());
    }

    #[test]
    fn test_ownership_refers_to_declared_symbols() {
        for entry in OWNERSHIP {
            assert!(Symbols::NAMES.contains(&entry.allocator), "{}", entry.allocator);
            for free in entry.transit.iter().chain(entry.payload.iter()) {
                assert!(Symbols::NAMES.contains(free), "{free}");
                assert!(free.contains("free"), "{free} is not a free function");
            }
        }
    }

    #[test]
    fn test_every_allocating_call_has_an_entry() {
        let allocating = Symbols::NAMES.iter().filter(|name| {
            !name.contains("free")
                && !matches!(
                    **name,
                    "bdk_abi_version" | "bdk_struct_layout" | "bdk_live_allocations"
                )
        });
        for name in allocating {
            assert!(Symbols::ownership(name).is_some(), "{name} has no ownership entry");
        }
    }

    #[test]
    fn test_missing_symbol_fails_resolution() {
        struct Empty;
        impl SymbolResolver for Empty {
            fn resolve(&self, name: &str) -> Result<*const c_void, LinkageError> {
                Err(LinkageError::missing_symbol(name))
            }
            fn origin(&self) -> String {
                "empty".into()
            }
        }

        let err = Symbols::resolve(&Empty).unwrap_err();
        assert_eq!(err, LinkageError::missing_symbol("bdk_abi_version"));
    }

    #[test]
    fn test_null_address_is_missing() {
        struct Nulls;
        impl SymbolResolver for Nulls {
            fn resolve(&self, _name: &str) -> Result<*const c_void, LinkageError> {
                Ok(std::ptr::null())
            }
            fn origin(&self) -> String {
                "nulls".into()
            }
        }

        assert!(matches!(
            Symbols::resolve(&Nulls),
            Err(LinkageError::MissingSymbol(_))
        ));
    }
}
