//! Property-based tests for the archive reading engine.
//!
//! These tests use proptest to generate arbitrary inputs and verify that
//! the reader upholds its contract across a wide range of cases: garbage
//! never panics, and valid archives round-trip byte for byte.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arcread_core::ByteSource;
use arcread_core::FilterKind;
use arcread_core::Session;
use proptest::prelude::*;

/// Drives a session to the end, ignoring errors. The point is that no
/// input can make this panic or loop forever.
fn exhaust(data: Vec<u8>) {
    let Ok(mut session) = Session::open(ByteSource::from_bytes(data)) else {
        return;
    };
    loop {
        match session.read_next_entry() {
            Ok(Some(_)) => {
                let _ = session.read_body_to_end();
            }
            Ok(None) | Err(_) => break,
        }
    }
    session.close();
}

fn entry_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    proptest::collection::vec(
        (
            "[a-z][a-z0-9_]{0,11}(/[a-z0-9]{1,8}){0,2}",
            proptest::collection::vec(any::<u8>(), 0..2048),
        ),
        1..8,
    )
    .prop_filter("unique names", |entries| {
        let mut names: Vec<_> = entries.iter().map(|(name, _)| name).collect();
        names.sort();
        names.dedup();
        names.len() == entries.len()
    })
}

fn as_fixture(entries: &[(String, Vec<u8>)]) -> Vec<(&str, &[u8])> {
    entries
        .iter()
        .map(|(name, body)| (name.as_str(), body.as_slice()))
        .collect()
}

fn assert_round_trip(data: Vec<u8>, entries: &[(String, Vec<u8>)]) {
    let mut session = Session::open(ByteSource::from_bytes(data)).unwrap();
    for (name, body) in entries {
        let entry = session.read_next_entry().unwrap().unwrap();
        assert_eq!(entry.name_lossy(), name.as_str());
        assert_eq!(&session.read_body_to_end().unwrap(), body);
    }
    assert!(session.read_next_entry().unwrap().is_none());
}

proptest! {
    /// Arbitrary bytes must never panic the engine, whatever they decode
    /// to.
    #[test]
    fn prop_garbage_input_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        exhaust(data);
    }

    /// Garbage wearing a valid signature must fail cleanly, not panic.
    #[test]
    fn prop_signed_garbage_never_panics(
        sig in prop_oneof![
            Just(&b"PK\x03\x04"[..]),
            Just(&b"070701"[..]),
            Just(&b"\x1f\x8b\x08"[..]),
            Just(&b"BZh9"[..]),
            Just(&b"\x28\xb5\x2f\xfd"[..]),
        ],
        tail in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut data = sig.to_vec();
        data.extend_from_slice(&tail);
        exhaust(data);
    }

    /// tar archives round-trip byte for byte through the session.
    #[test]
    fn prop_tar_round_trip(entries in entry_strategy()) {
        let data = common::tar_archive(&as_fixture(&entries));
        assert_round_trip(data, &entries);
    }

    /// zip archives round-trip byte for byte through the session.
    #[test]
    fn prop_zip_round_trip(entries in entry_strategy()) {
        let data = common::zip_archive(&as_fixture(&entries));
        assert_round_trip(data, &entries);
    }

    /// cpio archives round-trip byte for byte through the session.
    #[test]
    fn prop_cpio_round_trip(entries in entry_strategy()) {
        let data = common::cpio_archive(&as_fixture(&entries));
        assert_round_trip(data, &entries);
    }

    /// Truncating a valid archive anywhere yields an error or a short
    /// listing, never a panic.
    #[test]
    fn prop_truncation_never_panics(
        entries in entry_strategy(),
        cut_permille in 0u64..1000,
    ) {
        let data = common::tar_archive(&as_fixture(&entries));
        let cut = usize::try_from(data.len() as u64 * cut_permille / 1000).unwrap();
        exhaust(data[..cut].to_vec());
    }

    /// A compression filter layer is transparent: the decoded archive
    /// reads identically and the chain is reported.
    #[test]
    fn prop_compressed_round_trip(
        entries in entry_strategy(),
        filter in prop_oneof![
            Just(FilterKind::Gzip),
            Just(FilterKind::Bzip2),
            Just(FilterKind::Xz),
            Just(FilterKind::Zstd),
        ],
    ) {
        let tar = common::tar_archive(&as_fixture(&entries));
        let data = match filter {
            FilterKind::Gzip => common::gzip(&tar),
            FilterKind::Bzip2 => common::bzip2_compress(&tar),
            FilterKind::Xz => common::xz_compress(&tar),
            FilterKind::Zstd => common::zstd_compress(&tar),
        };
        let session = Session::open(ByteSource::from_bytes(data.clone())).unwrap();
        prop_assert_eq!(session.filters(), &[filter]);
        drop(session);
        assert_round_trip(data, &entries);
    }

    /// ZipCrypto decryption recovers the plaintext for any passphrase
    /// and payload.
    #[test]
    fn prop_encrypted_zip_round_trip(
        passphrase in "[ -~]{1,24}",
        body in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let data = common::encrypted_zip(passphrase.as_bytes(), "member", &body);
        let mut session = Session::builder()
            .passphrase(passphrase.as_str())
            .open(ByteSource::from_bytes(data))
            .unwrap();
        session.read_next_entry().unwrap().unwrap();
        prop_assert_eq!(session.read_body_to_end().unwrap(), body);
    }
}
