mod common;

use bdk_bind_core::{
    Balance, BindError, DatabaseConfig, Dispose, ElectrumConfig, ErrorKind, Network, Psbt,
    ResourceKind, TxBuilder, Wallet, using,
};
use common::*;

#[test]
fn test_peek_address_is_deterministic() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();

    assert_eq!(wallet.network(), Network::Regtest);
    for _ in 0..3 {
        assert_eq!(wallet.peek_address(0).unwrap(), REGTEST_ADDRESS_0);
    }
    assert_ne!(wallet.peek_address(1).unwrap(), REGTEST_ADDRESS_0);

    wallet.dispose();
    database.dispose();
}

#[test]
fn test_testnet_address() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = Wallet::new(DESCRIPTOR, None, Network::Testnet, &database).unwrap();
    assert_eq!(wallet.peek_address(0).unwrap(), TESTNET_ADDRESS_0);
    wallet.dispose();
    database.dispose();
}

#[test]
fn test_reveal_next_address_advances() {
    bind();
    using(DatabaseConfig::memory().unwrap(), |database| {
        using(regtest_wallet(database).unwrap(), |wallet| {
            let first = wallet.reveal_next_address().unwrap();
            let second = wallet.reveal_next_address().unwrap();
            assert_eq!(first, REGTEST_ADDRESS_0);
            assert_eq!(second, wallet.peek_address(1).unwrap());
        });
    });
}

#[test]
fn test_peek_address_index_bounds() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();

    assert!(wallet.peek_address(0x7FFF_FFFF).unwrap().starts_with("bcrt1q"));
    for index in [1 << 31, u32::MAX] {
        let err = wallet.peek_address(index).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.code(), Some("InvalidIndex"));
    }
    // Rejection leaves the wallet usable
    assert_eq!(wallet.peek_address(0).unwrap(), REGTEST_ADDRESS_0);

    wallet.dispose();
    database.dispose();
}

#[test]
fn test_sqlite_wallet_survives_reopen() {
    bind();
    let dir = tempfile::tempdir().unwrap();
    let database = DatabaseConfig::sqlite(dir.path().join("wallet.sqlite")).unwrap();

    using(regtest_wallet(&database).unwrap(), |wallet| {
        assert_eq!(wallet.reveal_next_address().unwrap(), REGTEST_ADDRESS_0);
        wallet.reveal_next_address().unwrap();
    });

    let reopened = regtest_wallet(&database).unwrap();
    let third = reopened.reveal_next_address().unwrap();
    assert_eq!(third, reopened.peek_address(2).unwrap());

    reopened.dispose();
    database.dispose();
}

#[test]
fn test_memory_wallets_do_not_share_state() {
    bind();
    let database = DatabaseConfig::memory().unwrap();

    using(regtest_wallet(&database).unwrap(), |wallet| {
        wallet.reveal_next_address().unwrap();
    });
    let fresh = regtest_wallet(&database).unwrap();
    assert_eq!(fresh.reveal_next_address().unwrap(), REGTEST_ADDRESS_0);

    fresh.dispose();
    database.dispose();
}

#[test]
fn test_sqlite_wallet_network_must_match() {
    bind();
    let dir = tempfile::tempdir().unwrap();
    let database = DatabaseConfig::sqlite(dir.path().join("wallet.sqlite")).unwrap();
    regtest_wallet(&database).unwrap().dispose();

    let err = Wallet::new(DESCRIPTOR, Some(CHANGE_DESCRIPTOR), Network::Testnet, &database)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.code(), Some("LoadMismatch"));
    database.dispose();
}

#[test]
fn test_sqlite_config_rejects_empty_path() {
    bind();
    let err = DatabaseConfig::sqlite("").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.code(), Some("InvalidPath"));
}

#[test]
fn test_invalid_descriptor() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let err = Wallet::new("invalid-descriptor", None, Network::Regtest, &database).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Descriptor);
    assert!(err.kind().is_invalid_input());
    assert_eq!(err.code(), Some("Descriptor"));
    database.dispose();
}

#[test]
fn test_descriptor_with_nul_never_reaches_native() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let err = Wallet::new("wpkh(\0)", None, Network::Regtest, &database).unwrap_err();
    assert!(matches!(err, BindError::InvalidInput(_)));
    database.dispose();
}

#[test]
fn test_unsynced_wallet_is_empty() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();

    assert_eq!(wallet.balance().unwrap(), Balance::default());
    assert!(wallet.list_unspent().unwrap().is_empty());
    assert!(wallet.list_transactions().unwrap().is_empty());

    wallet.dispose();
    database.dispose();
}

#[test]
fn test_calls_after_dispose_fail() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();

    assert!(wallet.dispose());
    assert!(!wallet.dispose());
    assert!(!wallet.is_live());

    let err = wallet.peek_address(0).unwrap_err();
    assert!(matches!(err, BindError::UseAfterFree { resource: ResourceKind::Wallet }));
    assert!(err.is_fatal());
    assert!(wallet.balance().is_err());

    database.dispose();
    let err = regtest_wallet(&database).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UseAfterFree);
}

#[test]
fn test_invalid_recipient_address() {
    bind();
    let builder = TxBuilder::new().unwrap();
    let err = builder.add_recipient("INVALID_ADDRESS", 1_000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.code(), Some("Address"));
    builder.dispose();
}

#[test]
fn test_unfunded_wallet_cannot_pay() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();
    let builder = TxBuilder::new().unwrap();

    builder
        .add_recipient(REGTEST_ADDRESS_0, 10_000)
        .and_then(|builder| builder.fee_rate(2))
        .unwrap();
    let err = builder.finish(&wallet).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert_eq!(err.code(), Some("InsufficientFunds"));

    builder.dispose();
    wallet.dispose();
    database.dispose();
}

#[test]
fn test_recipient_on_wrong_network() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();
    let builder = TxBuilder::new().unwrap();

    builder.add_recipient(TESTNET_ADDRESS_0, 10_000).unwrap();
    let err = builder.finish(&wallet).unwrap_err();
    assert_eq!(err.code(), Some("AddressNetwork"));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    builder.dispose();
    wallet.dispose();
    database.dispose();
}

#[test]
fn test_psbt_round_trip() {
    bind();
    let psbt = Psbt::from_base64(PSBT).unwrap();
    assert_eq!(psbt.serialize().unwrap(), PSBT);
    assert_eq!(psbt.txid().unwrap().len(), 64);
    psbt.dispose();
}

#[test]
fn test_invalid_psbt() {
    bind();
    let err = "not a psbt".parse::<Psbt>().unwrap_err();
    assert_eq!(err.code(), Some("PsbtParse"));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_sign_with_disposed_psbt() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();
    let psbt = Psbt::from_base64(PSBT).unwrap();
    psbt.dispose();

    let err = wallet.sign(&psbt).unwrap_err();
    assert!(matches!(err, BindError::UseAfterFree { resource: ResourceKind::Psbt }));

    wallet.dispose();
    database.dispose();
}

#[test]
fn test_unreachable_electrum_server() {
    bind();
    let config = ElectrumConfig::new("tcp://127.0.0.1:1").retry(0).timeout(2);
    let err = bdk_bind_core::Blockchain::connect(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    assert_eq!(err.code(), Some("Electrum"));
}

#[test]
fn test_wallet_is_shared_across_threads() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = std::sync::Arc::new(regtest_wallet(&database).unwrap());

    let readers: Vec<_> = (0..4)
        .map(|index| {
            let wallet = wallet.clone();
            std::thread::spawn(move || wallet.peek_address(index).unwrap())
        })
        .collect();
    let addresses: Vec<_> = readers.into_iter().map(|t| t.join().unwrap()).collect();
    assert_eq!(addresses[0], REGTEST_ADDRESS_0);

    wallet.dispose();
    database.dispose();
}
