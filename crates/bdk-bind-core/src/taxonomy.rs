//! Native error code → [`ErrorKind`]
//!
//! The table is versioned. New native codes are added here; the decoder
//! never changes. Codes not in the table map to [`ErrorKind::Unknown`].

use crate::error::ErrorKind;

/// Bumped whenever an entry is added or reclassified
pub const TAXONOMY_VERSION: u32 = 2;

static TABLE: &[(&str, ErrorKind)] = &[
    ("Descriptor", ErrorKind::Descriptor),
    ("Miniscript", ErrorKind::Descriptor),
    ("Bip32", ErrorKind::Descriptor),
    ("Key", ErrorKind::Descriptor),
    ("ChecksumMismatch", ErrorKind::Descriptor),
    ("InvalidNetwork", ErrorKind::InvalidInput),
    ("Address", ErrorKind::InvalidInput),
    ("AddressNetwork", ErrorKind::InvalidInput),
    ("FeeRate", ErrorKind::InvalidInput),
    ("Utf8", ErrorKind::InvalidInput),
    ("NullArgument", ErrorKind::InvalidInput),
    ("PsbtParse", ErrorKind::InvalidInput),
    ("NoRecipients", ErrorKind::InvalidInput),
    ("OutputBelowDustLimit", ErrorKind::InvalidInput),
    ("FeeTooLow", ErrorKind::InvalidInput),
    ("FeeRateTooLow", ErrorKind::InvalidInput),
    ("Hex", ErrorKind::InvalidInput),
    ("Encode", ErrorKind::InvalidInput),
    ("InvalidIndex", ErrorKind::InvalidInput),
    ("InvalidPath", ErrorKind::InvalidInput),
    ("LoadMismatch", ErrorKind::InvalidInput),
    ("InsufficientFunds", ErrorKind::ResourceExhausted),
    ("NoUtxosSelected", ErrorKind::ResourceExhausted),
    ("Electrum", ErrorKind::NetworkFailure),
    ("TransactionNotFound", ErrorKind::NotFound),
    ("UnknownUtxo", ErrorKind::NotFound),
    ("CannotConnect", ErrorKind::ChainSync),
    ("Generic", ErrorKind::Generic),
    ("Signer", ErrorKind::Generic),
    ("Psbt", ErrorKind::Generic),
    ("Persist", ErrorKind::Generic),
    ("Panic", ErrorKind::Generic),
];

/// Classify a native error code
pub fn map_error(code: &str) -> ErrorKind {
    TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// Every code the table knows
pub fn known_codes() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|(code, _)| *code)
}
