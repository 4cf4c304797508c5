//! Native allocation accounting
//!
//! Every test compares the process-wide live-allocation counter, so they run
//! one at a time.

mod common;

use bdk_bind_core::{DatabaseConfig, Dispose, ErrorKind, Network, Psbt, TxBuilder, Wallet, stats, using};
use common::*;
use serial_test::serial;

fn live() -> u64 {
    bdk_bind_native::live_allocations()
}

#[test]
#[serial]
fn test_construct_dispose_cycles_return_to_baseline() {
    bind();
    let baseline = live();
    for _ in 0..25 {
        let database = DatabaseConfig::memory().unwrap();
        let wallet = regtest_wallet(&database).unwrap();
        assert_eq!(wallet.peek_address(0).unwrap(), REGTEST_ADDRESS_0);
        wallet.balance().unwrap();
        wallet.dispose();
        database.dispose();
    }
    assert_eq!(live(), baseline);
}

#[test]
#[serial]
fn test_invalid_descriptor_leaks_nothing() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let baseline = live();
    let before = stats().snapshot();

    let err = Wallet::new("invalid-descriptor", None, Network::Regtest, &database).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Descriptor);
    assert_eq!(live(), baseline);
    assert_eq!(stats().snapshot().handles_wrapped, before.handles_wrapped);

    database.dispose();
}

#[test]
#[serial]
fn test_double_dispose_frees_once() {
    bind();
    let baseline = live();
    let psbt = Psbt::from_base64(PSBT).unwrap();
    assert_eq!(live(), baseline + 1);

    assert!(psbt.dispose());
    assert_eq!(live(), baseline);
    assert!(!psbt.dispose());
    assert_eq!(live(), baseline);
}

#[test]
#[serial]
fn test_empty_sequences_are_released() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();
    let baseline = live();

    for _ in 0..10 {
        assert!(wallet.list_unspent().unwrap().is_empty());
        assert!(wallet.list_transactions().unwrap().is_empty());
    }
    assert_eq!(live(), baseline);

    wallet.dispose();
    database.dispose();
}

#[test]
#[serial]
fn test_failed_calls_release_their_errors() {
    bind();
    let database = DatabaseConfig::memory().unwrap();
    let wallet = regtest_wallet(&database).unwrap();
    let builder = TxBuilder::new().unwrap();
    let baseline = live();

    for _ in 0..10 {
        assert!(builder.add_recipient("INVALID_ADDRESS", 1).is_err());
        assert!("garbage".parse::<Psbt>().is_err());
    }
    builder.add_recipient(REGTEST_ADDRESS_0, 5_000).unwrap();
    assert!(builder.finish(&wallet).is_err());
    assert_eq!(live(), baseline);

    builder.dispose();
    wallet.dispose();
    database.dispose();
}

#[test]
#[serial]
fn test_drop_guard_releases_and_is_counted() {
    bind();
    let baseline = live();
    let before = stats().snapshot();

    {
        let database = DatabaseConfig::memory().unwrap();
        let _wallet = regtest_wallet(&database).unwrap();
    }

    let after = stats().snapshot();
    assert_eq!(live(), baseline);
    assert_eq!(after.released_by_drop - before.released_by_drop, 2);
    assert_eq!(after.released_explicitly, before.released_explicitly);
}

#[test]
#[serial]
fn test_using_releases_on_panic() {
    bind();
    let baseline = live();

    let outcome = std::panic::catch_unwind(|| {
        using(DatabaseConfig::memory().unwrap(), |_| panic!("scope failed"));
    });
    assert!(outcome.is_err());
    assert_eq!(live(), baseline);
}

#[test]
#[serial]
fn test_released_wallet_keeps_database_usable() {
    bind();
    let baseline = live();
    using(DatabaseConfig::memory().unwrap(), |database| {
        for _ in 0..3 {
            using(regtest_wallet(database).unwrap(), |wallet| {
                assert!(wallet.is_live());
            });
        }
        assert!(database.is_live());
    });
    assert_eq!(live(), baseline);
}
