//! Raw C ABI bindings to the bdk native wallet library
//!
//! This crate declares the native entry points, the `#[repr(C)]` transit
//! structures, and which free function releases which allocation. It also
//! owns the single cached binding per process. Use the safe wrappers in
//! `bdk-bind-core` for anything beyond raw calls.
//!
//! # Binding
//!
//! ```no_run
//! let library = bdk_bind_sys::global().expect("native library");
//! println!("bound {} (abi {})", library.origin(), library.abi_version());
//! ```
//!
//! Loading checks [`ABI_VERSION`] and every entry of [`STRUCT_LAYOUTS`]
//! against the library before any other call is made.

mod binding;
mod error;
mod layout;
mod library;
mod symbols;
mod types;

pub use binding::{bind, global, install, is_bound, teardown};
pub use error::LinkageError;
pub use layout::{MAX_FIELDS, STRUCT_LAYOUTS, StructLayout, native_layout, verify_layouts};
pub use library::{
    ABI_VERSION, LIBRARY_ENV, LIBRARY_NAME, LibraryConfig, NativeLibrary, StaticResolver,
};
pub use symbols::{
    OWNERSHIP, OwnedResource, Ownership, SequenceElement, SymbolResolver, Symbols, TransitPayload,
};
pub use types::*;
