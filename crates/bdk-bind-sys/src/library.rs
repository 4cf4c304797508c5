//! Loading the native library
//!
//! A [`NativeLibrary`] owns the resolved [`Symbols`] and, when loaded from
//! disk, the `libloading::Library` that keeps the code mapped. It is only
//! constructed after the ABI version and every declared struct layout have
//! been checked.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::PathBuf;

use tracing::debug;

use crate::error::LinkageError;
use crate::layout::verify_layouts;
use crate::symbols::{SymbolResolver, Symbols};

/// ABI revision these bindings were written against
pub const ABI_VERSION: u32 = 2;

/// Environment variable overriding the library path
pub const LIBRARY_ENV: &str = "BDK_BIND_LIBRARY";

/// Base name of the native library, without platform prefix or suffix
pub const LIBRARY_NAME: &str = "bdk_bind_native";

/// How to locate and validate the native library.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Path handed to the platform loader.
    /// Default: `$BDK_BIND_LIBRARY`, else the platform file name of
    /// `bdk_bind_native` resolved through the loader search path.
    pub path: PathBuf,

    /// Compare declared struct layouts with the library's own description.
    /// Default: true
    pub verify_layouts: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let path = std::env::var_os(LIBRARY_ENV)
            .unwrap_or_else(|| libloading::library_filename(LIBRARY_NAME));
        Self {
            path: PathBuf::from(path),
            verify_layouts: true,
        }
    }
}

impl LibraryConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the library path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Enable or disable the layout check
    pub fn verify_layouts(mut self, enabled: bool) -> Self {
        self.verify_layouts = enabled;
        self
    }
}

/// Resolver over symbols already linked into the process
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: HashMap<&'static str, *const c_void>,
}

// SAFETY: the stored values are addresses of immutable code, never dereferenced as data
unsafe impl Send for StaticResolver {}
unsafe impl Sync for StaticResolver {}

impl StaticResolver {
    /// Create a resolver over `(name, address)` pairs
    pub fn new(entries: impl IntoIterator<Item = (&'static str, *const c_void)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Drop one symbol, simulating an older library
    pub fn without(mut self, name: &str) -> Self {
        self.entries.remove(name);
        self
    }

    /// Replace one symbol
    pub fn with(mut self, name: &'static str, address: *const c_void) -> Self {
        self.entries.insert(name, address);
        self
    }

    /// Number of symbols known
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no symbol is known
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Result<*const c_void, LinkageError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| LinkageError::missing_symbol(name))
    }

    fn origin(&self) -> String {
        "<statically linked>".to_string()
    }
}

struct DynamicResolver<'a> {
    library: &'a libloading::Library,
    path: &'a PathBuf,
}

impl SymbolResolver for DynamicResolver<'_> {
    fn resolve(&self, name: &str) -> Result<*const c_void, LinkageError> {
        // SAFETY: the symbol is only read as an address; Symbols::resolve gives it a type
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }
            .map_err(|_| LinkageError::missing_symbol(name))?;
        Ok(*symbol)
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// A bound native library image
pub struct NativeLibrary {
    symbols: Symbols,
    origin: String,
    abi_version: u32,
    // Dropped last so the symbols never outlive the mapping
    _library: Option<libloading::Library>,
}

impl NativeLibrary {
    /// Load the shared object at `config.path`
    pub fn open(config: &LibraryConfig) -> Result<Self, LinkageError> {
        let origin = config.path.display().to_string();
        debug!(path = %origin, "loading native library");

        // SAFETY: loading runs the library's initializers; the library is a
        // plain Rust cdylib without global constructors
        let library = unsafe { libloading::Library::new(&config.path) }
            .map_err(|e| LinkageError::library_load(&origin, e.to_string()))?;

        let resolver = DynamicResolver {
            library: &library,
            path: &config.path,
        };
        let (symbols, abi_version) = Self::bind(&resolver, config)?;

        Ok(Self {
            symbols,
            origin,
            abi_version,
            _library: Some(library),
        })
    }

    /// Bind symbols provided by a resolver, usually a [`StaticResolver`]
    pub fn from_resolver(
        resolver: &dyn SymbolResolver,
        config: &LibraryConfig,
    ) -> Result<Self, LinkageError> {
        let (symbols, abi_version) = Self::bind(resolver, config)?;
        Ok(Self {
            symbols,
            origin: resolver.origin(),
            abi_version,
            _library: None,
        })
    }

    fn bind(
        resolver: &dyn SymbolResolver,
        config: &LibraryConfig,
    ) -> Result<(Symbols, u32), LinkageError> {
        let symbols = Symbols::resolve(resolver)?;

        // SAFETY: takes no arguments and returns a plain integer
        let found = unsafe { (symbols.bdk_abi_version)() };
        if found != ABI_VERSION {
            return Err(LinkageError::AbiVersion {
                expected: ABI_VERSION,
                found,
            });
        }

        if config.verify_layouts {
            verify_layouts(&symbols)?;
        }

        debug!(
            origin = %resolver.origin(),
            symbols = Symbols::NAMES.len(),
            abi = found,
            "native symbols bound"
        );
        Ok((symbols, found))
    }

    /// Get the resolved entry points
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Get the path or origin the library was bound from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Get the ABI revision the library reported
    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }

    /// Native allocations not yet released, as counted by the library
    pub fn live_allocations(&self) -> u64 {
        // SAFETY: takes no arguments and returns a plain integer
        unsafe { (self.symbols.bdk_live_allocations)() }
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("origin", &self.origin)
            .field("abi_version", &self.abi_version)
            .finish_non_exhaustive()
    }
}
