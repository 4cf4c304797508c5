//! Safe bindings to the bdk native wallet library
//!
//! Every native object is owned by exactly one facade ([`Wallet`],
//! [`Blockchain`], [`TxBuilder`], [`Psbt`], [`DatabaseConfig`]). Fallible
//! native calls return tagged results that are decoded into
//! [`BindResult`], with native error codes classified by a versioned
//! [`taxonomy`].
//!
//! # Example
//!
//! ```no_run
//! use bdk_bind_core::{DatabaseConfig, Dispose, Network, Wallet};
//!
//! let database = DatabaseConfig::memory()?;
//! let wallet = Wallet::new(
//!     "wpkh([c258d2e4/84h/1h/0h]tpubDDYkZojQFQjht8Tm4jsS3iuEmKjTiEGjG6KnuFNKKJb5A6ZUCUZKdvLdSDWofKi4ToRCwb9poe1XdqfUnP4jaJjCB2Zwv11ZLgSbnZSNecE/0/*)",
//!     None,
//!     Network::Regtest,
//!     &database,
//! )?;
//! println!("{}", wallet.peek_address(0)?);
//! wallet.dispose();
//! database.dispose();
//! # Ok::<(), bdk_bind_core::BindError>(())
//! ```
//!
//! # Threads
//!
//! Facades are `Send + Sync`. Calls on one handle are serialised; calls on
//! different handles run concurrently. Native calls block, so async code
//! should go through `bdk-bind-runtime`.

mod blockchain;
mod config;
mod database;
mod decode;
mod error;
mod handle;
mod lifecycle;
mod psbt;
mod sequence;
mod string;
pub mod taxonomy;
mod tx_builder;
mod types;
mod wallet;

pub use blockchain::Blockchain;
pub use config::ElectrumConfig;
pub use database::DatabaseConfig;
pub use decode::decode_with;
pub use error::{BindError, BindResult, ErrorKind};
pub use handle::{Borrowed, OpaqueHandle};
pub use lifecycle::{Dispose, HandleState, LifecycleSnapshot, LifecycleStats, stats, using};
pub use psbt::Psbt;
pub use sequence::to_sequence;
pub use string::NativeString;
pub use tx_builder::TxBuilder;
pub use types::{
    Balance, ConfirmationTime, KeychainKind, LocalUtxo, Network, OutPoint, TransactionDetails,
    TxOut,
};
pub use wallet::Wallet;

pub use bdk_bind_sys::{LinkageError, ResourceKind};
