use proptest::prelude::*;

use bsv_primitives::chainhash::Hash;
use bsv_primitives::ec::private_key::{PrivateKey, TESTNET_WIF_PREFIX};
use bsv_primitives::ec::signature::Signature;
use bsv_primitives::hash::sha256d;
use bsv_primitives::util::{BsvReader, VarInt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn testnet_wif_restores_the_same_key(seed in prop::array::uniform32(any::<u8>())) {
        // Zero and values above the order are not keys.
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let wif = pk.to_wif_prefix(TESTNET_WIF_PREFIX);
            prop_assert_eq!(PrivateKey::from_wif(&wif).unwrap(), pk);
        }
    }

    #[test]
    fn der_signature_survives_reparse_and_verifies(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let digest = sha256d(&msg);
            let der = pk.sign(&digest).unwrap().to_der();
            let sig = Signature::from_der(&der).unwrap();
            prop_assert!(sig.is_low_s());
            prop_assert!(pk.pub_key().verify(&digest, &sig));
        }
    }

    #[test]
    fn other_digest_does_not_verify(
        seed in prop::array::uniform32(any::<u8>()),
        flip in 0usize..32
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let digest = sha256d(&seed);
            let sig = pk.sign(&digest).unwrap();
            let mut tampered = digest;
            tampered[flip] ^= 0x01;
            prop_assert!(!pk.pub_key().verify(&tampered, &sig));
        }
    }

    #[test]
    fn txid_display_parses_back(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash::new(bytes);
        prop_assert_eq!(Hash::from_hex(&hash.to_string()).unwrap(), hash);
    }

    #[test]
    fn varint_reader_consumes_exact_length(value in any::<u64>()) {
        let bytes = VarInt(value).to_bytes();
        let mut reader = BsvReader::new(&bytes);
        prop_assert_eq!(reader.read_varint().unwrap().value(), value);
        prop_assert_eq!(reader.remaining(), 0);
    }
}
