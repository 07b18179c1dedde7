//! Crate-level tests: wire vectors, sighash layout, P2PKH signing against a
//! known signed transaction, interpreter verification and the builders.

use bsv_primitives::chainhash::Hash;
use bsv_primitives::ec::{PrivateKey, PublicKey, Signature};
use bsv_script::interpreter::VerificationFlags;
use bsv_script::{Network, Script};

use crate::builder::{FeePolicy, TransactionBuilder, Utxo};
use crate::input::{TransactionInput, DEFAULT_SEQUENCE_NUMBER};
use crate::output::TransactionOutput;
use crate::sighash;
use crate::template::p2pkh;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::verify::{verify_all, verify_input};
use crate::TransactionError;

const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

const MULTI_INPUT_TX_HEX: &str = "0200000003a9bc457fdc6a54d99300fb137b23714d860c350a9d19ff0f571e694a419ff3a0010000006b48304502210086c83beb2b2663e4709a583d261d75be538aedcafa7766bd983e5c8db2f8b2fc02201a88b178624ab0ad1748b37c875f885930166237c88f5af78ee4e61d337f935f412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff0092bb9a47e27bf64fc98f557c530c04d9ac25e2f2a8b600e92a0b1ae7c89c20010000006b483045022100f06b3db1c0a11af348401f9cebe10ae2659d6e766a9dcd9e3a04690ba10a160f02203f7fbd7dfcfc70863aface1a306fcc91bbadf6bc884c21a55ef0d32bd6b088c8412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff9d0d4554fa692420a0830ca614b6c60f1bf8eaaa21afca4aa8c99fb052d9f398000000006b483045022100d920f2290548e92a6235f8b2513b7f693a64a0d3fa699f81a034f4b4608ff82f0220767d7d98025aff3c7bd5f2a66aab6a824f5990392e6489aae1e1ae3472d8dffb412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff02807c814a000000001976a9143a6bf34ebfcf30e8541bbb33a7882845e5a29cb488ac76b0e60e000000001976a914bd492b67f90cb85918494767ebb23102c4f06b7088ac67000000";

const UNSIGNED_P2PKH_TX: &str = "010000000193a35408b6068499e0d5abd799d3e827d9bfe70c9b75ebe209c91d25072326510000000000ffffffff02404b4c00000000001976a91404ff367be719efa79d76e4416ffb072cd53b208888acde94a905000000001976a91404d03f746652cfcb6cb55119ab473a045137d26588ac00000000";

const SIGNED_P2PKH_TX: &str = "010000000193a35408b6068499e0d5abd799d3e827d9bfe70c9b75ebe209c91d2507232651000000006b483045022100c1d77036dc6cd1f3fa1214b0688391ab7f7a16cd31ea4e5a1f7a415ef167df820220751aced6d24649fa235132f1e6969e163b9400f80043a72879237dab4a1190ad412103b8b40a84123121d260f5c109bc5a46ec819c2e4002e5ba08638783bfb4e01435ffffffff02404b4c00000000001976a91404ff367be719efa79d76e4416ffb072cd53b208888acde94a905000000001976a91404d03f746652cfcb6cb55119ab473a045137d26588ac00000000";

const SPENT_P2PKH_SCRIPT: &str = "76a914c0a3c167a28cabb9fbb495affa0761e6e74ac60d88ac";

const WIF: &str = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";

fn key() -> PrivateKey {
    PrivateKey::from_wif(WIF).unwrap()
}

fn adder_lock() -> Script {
    Script::from_asm("OP_4 OP_7 OP_ADD OP_EQUAL").unwrap()
}

fn p2pkh_utxo(seed: &[u8], satoshis: u64) -> Utxo {
    Utxo {
        tx_id: Hash::digest(seed),
        output_index: 0,
        satoshis,
        script: p2pkh::lock_to_key(&key(), Network::Testnet),
    }
}

fn unsigned_p2pkh_tx() -> Transaction {
    let mut tx = Transaction::from_hex(UNSIGNED_P2PKH_TX).unwrap();
    tx.inputs[0].set_source_output(Some(TransactionOutput::new(
        100_000_000,
        Script::from_hex(SPENT_P2PKH_SCRIPT).unwrap(),
    )));
    tx
}

// -----------------------------------------------------------------------
// Wire format
// -----------------------------------------------------------------------

#[test]
fn test_from_hex_roundtrip() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).expect("should parse source tx hex");
    assert_eq!(tx.version, 1);
    assert_eq!(tx.input_count(), 1);
    assert_eq!(tx.output_count(), 2);
    assert_eq!(tx.lock_time, 0);
    assert_eq!(tx.inputs[0].sequence_number, DEFAULT_SEQUENCE_NUMBER);
    assert_eq!(tx.to_hex(), SOURCE_RAW_TX);
    assert_eq!(tx.size(), SOURCE_RAW_TX.len() / 2);
    assert_eq!(format!("{}", tx), SOURCE_RAW_TX);
}

#[test]
fn test_multi_input_roundtrip() {
    let tx = Transaction::from_hex(MULTI_INPUT_TX_HEX).expect("should parse multi-input tx");
    assert_eq!(tx.version, 2);
    assert_eq!(tx.input_count(), 3);
    assert_eq!(tx.output_count(), 2);
    assert_eq!(tx.lock_time, 103);
    assert_eq!(tx.to_hex(), MULTI_INPUT_TX_HEX);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        Transaction::from_hex(&format!("{}deadbeef", SOURCE_RAW_TX)),
        Err(TransactionError::SerializationError(_))
    ));
    assert!(Transaction::from_hex("not_valid_hex").is_err());
    assert!(Transaction::from_bytes(&[]).is_err());
    // Truncated in the middle of the second output.
    assert!(Transaction::from_hex(&SOURCE_RAW_TX[..SOURCE_RAW_TX.len() - 20]).is_err());
}

#[test]
fn test_empty_transaction() {
    let tx = Transaction::new();
    let bytes = tx.to_bytes();
    // version + two zero counts + lock time
    assert_eq!(bytes.len(), 10);
    assert_eq!(Transaction::from_bytes(&bytes).unwrap(), tx);
}

#[test]
fn test_parsed_fields() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert_eq!(tx.outputs[0].satoshis, 1500);
    assert_eq!(tx.outputs[1].satoshis, 3498);
    assert_eq!(tx.total_output_satoshis(), 4998);
    assert_eq!(
        tx.outputs[1].locking_script.to_hex(),
        "76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac"
    );
    assert_eq!(
        tx.inputs[0].source_txid.to_string(),
        "e2fa2ae1e9a45b72ff180c2a41a06eea293e1a046426bbc363b0ff141cc6c738"
    );
}

#[test]
fn test_tx_id_is_reversed_double_sha() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let digest = bsv_primitives::hash::sha256d(&hex::decode(SOURCE_RAW_TX).unwrap());
    assert_eq!(tx.tx_id().as_bytes(), &digest);

    let mut reversed = digest;
    reversed.reverse();
    assert_eq!(tx.tx_id_hex(), hex::encode(reversed));
}

#[test]
fn test_tx_id_changes_with_unlocking_script() {
    let mut tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let before = tx.tx_id();
    tx.set_unlocking_script(0, Script::from_asm("OP_1").unwrap()).unwrap();
    assert_ne!(tx.tx_id(), before);
    assert!(tx.set_unlocking_script(1, Script::new()).is_err());
}

// -----------------------------------------------------------------------
// Fees
// -----------------------------------------------------------------------

#[test]
fn test_fee_needs_source_outputs() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert!(matches!(tx.fee(), Err(TransactionError::InvalidTransaction(_))));

    let mut tx = tx;
    tx.inputs[0].set_source_output(Some(TransactionOutput::new(5000, Script::new())));
    assert_eq!(tx.total_input_satoshis().unwrap(), 5000);
    assert_eq!(tx.fee().unwrap(), 2);

    tx.inputs[0].set_source_output(Some(TransactionOutput::new(4000, Script::new())));
    assert!(tx.fee().is_err());
}

#[test]
fn test_add_input_from() {
    let mut tx = Transaction::new();
    tx.add_input_from(
        "45be95d2f2c64e99518ffbbce03fb15a7758f20ee5eecf0df07938d977add71d",
        2,
        adder_lock(),
        900,
    )
    .unwrap();
    assert_eq!(tx.inputs[0].source_tx_out_index, 2);
    assert_eq!(tx.inputs[0].source_satoshis(), Some(900));
    assert!(tx.add_input_from("abcd", 0, Script::new(), 0).is_err());
}

// -----------------------------------------------------------------------
// Sighash
// -----------------------------------------------------------------------

#[test]
fn test_forkid_preimage_layout() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let prev = Script::from_hex("76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac").unwrap();

    let preimage = sighash::sighash_preimage(&tx, 0, &prev, 1500, sighash::SIGHASH_ALL_FORKID).unwrap();
    assert_eq!(preimage.len(), 4 + 32 + 32 + 36 + 1 + 25 + 8 + 4 + 32 + 4 + 4);
    assert_eq!(&preimage[..4], &[1, 0, 0, 0]);
    // Outpoint follows the two hashes.
    assert_eq!(&preimage[68..100], tx.inputs[0].source_txid.as_bytes());
    assert_eq!(&preimage[130..138], &1500u64.to_le_bytes());
    assert_eq!(&preimage[preimage.len() - 4..], &[0x41, 0, 0, 0]);

    let digest = sighash::signature_hash(&tx, 0, &prev, 1500, sighash::SIGHASH_ALL_FORKID).unwrap();
    assert_eq!(digest, bsv_primitives::hash::sha256d(&preimage));
}

#[test]
fn test_forkid_preimage_commits_to_amount() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let prev = adder_lock();
    let a = sighash::signature_hash(&tx, 0, &prev, 1000, sighash::SIGHASH_ALL_FORKID).unwrap();
    let b = sighash::signature_hash(&tx, 0, &prev, 1001, sighash::SIGHASH_ALL_FORKID).unwrap();
    assert_ne!(a, b);

    // The legacy algorithm ignores the amount.
    let a = sighash::signature_hash(&tx, 0, &prev, 1000, sighash::SIGHASH_ALL).unwrap();
    let b = sighash::signature_hash(&tx, 0, &prev, 1001, sighash::SIGHASH_ALL).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_anyonecanpay_ignores_other_inputs() {
    let mut tx = Transaction::from_hex(MULTI_INPUT_TX_HEX).unwrap();
    let prev = adder_lock();
    let flag = sighash::SIGHASH_ALL_ANYONECANPAY_FORKID;

    let before = sighash::sighash_preimage(&tx, 0, &prev, 10, flag).unwrap();
    assert_eq!(&before[4..68], &[0u8; 64]);
    tx.inputs[2].sequence_number = 1;
    tx.inputs.truncate(2);
    let after = sighash::sighash_preimage(&tx, 0, &prev, 10, flag).unwrap();
    assert_eq!(before, after);

    let all_before = sighash::sighash_preimage(&tx, 0, &prev, 10, sighash::SIGHASH_ALL_FORKID).unwrap();
    tx.inputs.truncate(1);
    let all_after = sighash::sighash_preimage(&tx, 0, &prev, 10, sighash::SIGHASH_ALL_FORKID).unwrap();
    assert_ne!(all_before, all_after);
}

#[test]
fn test_forkid_single_and_none_outputs() {
    let tx = Transaction::from_hex(MULTI_INPUT_TX_HEX).unwrap();
    let prev = adder_lock();
    let single = sighash::SIGHASH_SINGLE | sighash::SIGHASH_FORKID;
    let none = sighash::SIGHASH_NONE | sighash::SIGHASH_FORKID;

    // Input 2 has no matching output, so hashOutputs is zero.
    let preimage = sighash::sighash_preimage(&tx, 2, &prev, 0, single).unwrap();
    let outputs_at = preimage.len() - 40;
    assert_eq!(&preimage[outputs_at..outputs_at + 32], &[0u8; 32]);

    let preimage = sighash::sighash_preimage(&tx, 0, &prev, 0, none).unwrap();
    assert_eq!(&preimage[36..68], &[0u8; 32]);
    assert_eq!(&preimage[outputs_at..outputs_at + 32], &[0u8; 32]);
}

#[test]
fn test_legacy_single_without_output() {
    let tx = Transaction::from_hex(MULTI_INPUT_TX_HEX).unwrap();
    let prev = adder_lock();

    let digest = sighash::signature_hash(&tx, 2, &prev, 0, sighash::SIGHASH_SINGLE).unwrap();
    let mut expected = [0u8; 32];
    expected[0] = 1;
    assert_eq!(digest, expected);

    assert!(matches!(
        sighash::sighash_preimage(&tx, 2, &prev, 0, sighash::SIGHASH_SINGLE),
        Err(TransactionError::InvalidTransaction(_))
    ));
}

#[test]
fn test_legacy_preimage_strips_code_separators() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let with_sep = Script::from_asm("OP_CODESEPARATOR OP_4 OP_7 OP_ADD OP_EQUAL").unwrap();
    let a = sighash::sighash_preimage(&tx, 0, &with_sep, 0, sighash::SIGHASH_ALL).unwrap();
    let b = sighash::sighash_preimage(&tx, 0, &adder_lock(), 0, sighash::SIGHASH_ALL).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_sighash_out_of_range() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let result = sighash::signature_hash(&tx, 99, &Script::new(), 0, sighash::SIGHASH_ALL_FORKID);
    assert!(matches!(result, Err(TransactionError::InvalidTransaction(_))));
}

// -----------------------------------------------------------------------
// P2PKH signing and verification
// -----------------------------------------------------------------------

#[test]
fn test_p2pkh_sign_exact_match() {
    let mut tx = unsigned_p2pkh_tx();
    let script = p2pkh::unlock(key(), None).sign(&tx, 0).expect("signing should succeed");
    tx.set_unlocking_script(0, script).unwrap();
    assert_eq!(tx.to_hex(), SIGNED_P2PKH_TX);
}

#[test]
fn test_p2pkh_signature_verifies() {
    let mut tx = unsigned_p2pkh_tx();
    let script = p2pkh::unlock(key(), None).sign(&tx, 0).unwrap();
    tx.set_unlocking_script(0, script).unwrap();

    let chunks = tx.inputs[0].unlocking_script.chunks().unwrap();
    let sig_bytes = chunks[0].data.as_ref().unwrap();
    let pubkey_bytes = chunks[1].data.as_ref().unwrap();
    assert_eq!(*sig_bytes.last().unwrap(), sighash::SIGHASH_ALL_FORKID as u8);

    let public_key = PublicKey::from_bytes(pubkey_bytes).unwrap();
    let sig = Signature::from_der(&sig_bytes[..sig_bytes.len() - 1]).unwrap();
    assert!(sig.is_low_s());
    let digest = tx.input_signature_hash(0, sighash::SIGHASH_ALL_FORKID).unwrap();
    assert!(public_key.verify(&digest, &sig));
}

#[test]
fn test_verify_input_p2pkh() {
    let tx = {
        let mut tx = unsigned_p2pkh_tx();
        let script = p2pkh::unlock(key(), None).sign(&tx, 0).unwrap();
        tx.set_unlocking_script(0, script).unwrap();
        tx
    };
    let prev = Script::from_hex(SPENT_P2PKH_SCRIPT).unwrap();
    let flags = VerificationFlags::standard();

    let result = verify_input(&tx, 0, &prev, 100_000_000, &flags);
    assert!(result.success, "{:?}", result.reason);
    assert!(verify_all(&tx, &flags).success);

    // Wrong amount changes the fork-id digest.
    assert!(!verify_input(&tx, 0, &prev, 99_999_999, &flags).success);

    // A flipped byte inside the signature's r value.
    let mut bytes = tx.inputs[0].unlocking_script.to_bytes().to_vec();
    bytes[10] ^= 0x01;
    let mut tampered = tx.clone();
    tampered.set_unlocking_script(0, Script::from(bytes)).unwrap();
    let result = verify_input(&tampered, 0, &prev, 100_000_000, &flags);
    assert!(!result.success);
    assert!(result.reason.is_some());

    assert!(!verify_input(&tx, 5, &prev, 0, &flags).success);
}

#[test]
fn test_forkid_signature_needs_forkid_flag() {
    let utxo = p2pkh_utxo(b"a", 3000);
    let tx = TransactionBuilder::default()
        .build_lock_tx(&[utxo.clone()], &adder_lock(), 1000, &key())
        .unwrap();

    let result = verify_input(&tx, 0, &utxo.script, 3000, &VerificationFlags::standard());
    assert!(result.success, "{:?}", result.reason);
    // Without fork-id hashing the signature is checked against the legacy digest.
    assert!(!verify_input(&tx, 0, &utxo.script, 3000, &VerificationFlags::default()).success);
}

#[test]
fn test_codeseparator_first_opcode() {
    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"separator");
    let pub_key = hex::encode(key().pub_key().to_compressed());
    let lock = Script::from_asm(&format!("OP_CODESEPARATOR {pub_key} OP_CHECKSIG")).unwrap();
    let script_code = Script::from_asm(&format!("{pub_key} OP_CHECKSIG")).unwrap();

    let mut tx = builder.build_unlock_tx(prev_txid, &lock, 5000, &adder_lock(), 4000).unwrap();
    let sig = sighash::sign_input(&tx, 0, &key(), &script_code, 5000, sighash::SIGHASH_ALL_FORKID).unwrap();
    tx.set_unlocking_script(0, Script::from_asm(&hex::encode(&sig)).unwrap()).unwrap();

    let result = verify_input(&tx, 0, &lock, 5000, &VerificationFlags::contract());
    assert!(result.success, "{:?}", result.reason);

    // Signing over the whole locking script commits to the separator too.
    let sig = sighash::sign_input(&tx, 0, &key(), &lock, 5000, sighash::SIGHASH_ALL_FORKID).unwrap();
    tx.set_unlocking_script(0, Script::from_asm(&hex::encode(&sig)).unwrap()).unwrap();
    assert!(!verify_input(&tx, 0, &lock, 5000, &VerificationFlags::contract()).success);
}

#[test]
fn test_verify_all_reports_failing_input() {
    let mut tx = unsigned_p2pkh_tx();
    // Unsigned: the empty unlocking script leaves nothing to check.
    let result = verify_all(&tx, &VerificationFlags::standard());
    assert!(!result.success);
    assert!(result.reason.unwrap().starts_with("input 0"));

    tx.inputs[0].set_source_output(None);
    let result = verify_all(&tx, &VerificationFlags::standard());
    assert!(result.reason.unwrap().contains("missing source output"));
}

#[test]
fn test_sign_requires_source_output() {
    let mut tx = unsigned_p2pkh_tx();
    tx.inputs[0].set_source_output(None);
    let result = p2pkh::unlock(key(), None).sign(&tx, 0);
    assert!(matches!(result, Err(TransactionError::SigningError(_))));
}

// -----------------------------------------------------------------------
// Builders
// -----------------------------------------------------------------------

#[test]
fn test_lock_tx_with_change() {
    let builder = TransactionBuilder::default();
    let utxos = vec![p2pkh_utxo(b"a", 3000), p2pkh_utxo(b"b", 3000)];
    let tx = builder.build_lock_tx(&utxos, &adder_lock(), 1000, &key()).unwrap();

    // One UTXO covers the amount and fee.
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[0].satoshis, 1000);
    assert_eq!(tx.outputs[0].locking_script, adder_lock());
    assert_eq!(tx.outputs[1].satoshis, 1454);
    assert_eq!(tx.outputs[1].locking_script, p2pkh::lock_to_key(&key(), Network::Testnet));
    assert_eq!(tx.fee().unwrap(), 546);

    let result = verify_all(&tx, &VerificationFlags::standard());
    assert!(result.success, "{:?}", result.reason);
}

#[test]
fn test_lock_tx_selects_in_order() {
    let builder = TransactionBuilder::default();
    let utxos = vec![
        p2pkh_utxo(b"a", 3000),
        p2pkh_utxo(b"b", 3000),
        p2pkh_utxo(b"c", 3000),
    ];
    let tx = builder.build_lock_tx(&utxos, &adder_lock(), 2600, &key()).unwrap();
    assert_eq!(tx.inputs.len(), 2);
    assert_eq!(tx.inputs[0].source_txid, utxos[0].tx_id);
    assert_eq!(tx.inputs[1].source_txid, utxos[1].tx_id);
    assert_eq!(tx.outputs[1].satoshis, 6000 - 2600 - 546);
    assert!(verify_all(&tx, &VerificationFlags::standard()).success);
}

#[test]
fn test_lock_tx_dust_change_goes_to_fee() {
    let builder = TransactionBuilder::default();
    let tx = builder
        .build_lock_tx(&[p2pkh_utxo(b"a", 3000)], &adder_lock(), 2000, &key())
        .unwrap();
    assert_eq!(tx.outputs.len(), 1);
    assert_eq!(tx.fee().unwrap(), 1000);

    let tx = builder
        .build_lock_tx(&[p2pkh_utxo(b"a", 3000)], &adder_lock(), 2454, &key())
        .unwrap();
    assert_eq!(tx.outputs.len(), 1);
    assert_eq!(tx.fee().unwrap(), 546);
}

#[test]
fn test_lock_tx_insufficient_funds() {
    let builder = TransactionBuilder::default();
    let utxos = vec![p2pkh_utxo(b"a", 3000), p2pkh_utxo(b"b", 3000)];
    let err = builder.build_lock_tx(&utxos, &adder_lock(), 10_000, &key()).unwrap_err();
    assert!(matches!(
        err,
        TransactionError::InsufficientFunds { required: 10_546, available: 6000 }
    ));
    assert_eq!(err.to_string(), "insufficient funds: need 10546 satoshis, have 6000");

    let err = builder.build_lock_tx(&[], &adder_lock(), 1, &key()).unwrap_err();
    assert!(matches!(err, TransactionError::InsufficientFunds { available: 0, .. }));
}

#[test]
fn test_lock_tx_rejects_duplicate_utxos() {
    let builder = TransactionBuilder::default();
    let utxo = p2pkh_utxo(b"a", 3000);
    let err = builder
        .build_lock_tx(&[utxo.clone(), utxo], &adder_lock(), 1000, &key())
        .unwrap_err();
    assert!(matches!(err, TransactionError::InvalidTransaction(_)));
}

#[test]
fn test_lock_tx_rejects_foreign_utxos() {
    let builder = TransactionBuilder::default();
    let mut foreign = p2pkh_utxo(b"b", 3000);
    foreign.script = adder_lock();
    let err = builder
        .build_lock_tx(&[p2pkh_utxo(b"a", 3000), foreign], &adder_lock(), 1000, &key())
        .unwrap_err();
    assert!(matches!(err, TransactionError::InvalidTransaction(_)));

    // The script must be the change key's P2PKH lock, not just any P2PKH lock.
    let other = PrivateKey::from_bytes(&[7u8; 32]).unwrap();
    let mut foreign = p2pkh_utxo(b"c", 3000);
    foreign.script = p2pkh::lock_to_key(&other, Network::Testnet);
    let err = builder.build_lock_tx(&[foreign], &adder_lock(), 1000, &key()).unwrap_err();
    assert!(matches!(err, TransactionError::InvalidTransaction(_)));
}

#[test]
fn test_lock_tx_fee_rate() {
    let policy = FeePolicy { fee_per_kb: 10_000, min_fee: 100, dust_threshold: 1 };
    let builder = TransactionBuilder::new(policy, Network::Mainnet);
    let tx = builder
        .build_lock_tx(&[p2pkh_utxo(b"a", 100_000)], &adder_lock(), 1000, &key())
        .unwrap();
    // Signature lengths vary by a byte around the estimate.
    let fee = tx.fee().unwrap();
    assert!(fee.abs_diff(tx.size() as u64 * 10) <= 20, "fee {} for size {}", fee, tx.size());
    assert_eq!(tx.outputs[1].locking_script, p2pkh::lock_to_key(&key(), Network::Mainnet));
}

#[test]
fn test_unlock_tx_with_contract_proof() {
    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"contract");
    let mut tx = builder
        .build_unlock_tx(prev_txid, &adder_lock(), 1000, &adder_lock(), 800)
        .unwrap();
    assert_eq!(tx.inputs[0].source_txid, prev_txid);

    tx.set_unlocking_script(0, Script::from_asm("OP_11").unwrap()).unwrap();
    assert!(verify_input(&tx, 0, &adder_lock(), 1000, &VerificationFlags::contract()).success);

    tx.set_unlocking_script(0, Script::from_asm("OP_10").unwrap()).unwrap();
    assert!(!verify_input(&tx, 0, &adder_lock(), 1000, &VerificationFlags::contract()).success);
}

#[test]
fn test_unlock_signature_verifies() {
    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"p2pkh contract");
    let lock = p2pkh::lock_to_key(&key(), Network::Testnet);

    let sig = builder
        .unlock_signature(prev_txid, &key(), &lock, 5000, &adder_lock(), 4000)
        .unwrap();
    let mut tx = builder.build_unlock_tx(prev_txid, &lock, 5000, &adder_lock(), 4000).unwrap();
    let proof = p2pkh::unlocking_script(&sig, &key().pub_key().to_compressed()).unwrap();
    tx.set_unlocking_script(0, proof).unwrap();

    let result = verify_input(&tx, 0, &lock, 5000, &VerificationFlags::standard());
    assert!(result.success, "{:?}", result.reason);
}

#[test]
fn test_unlock_sighash_preimage() {
    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"contract");
    let preimage = builder
        .unlock_sighash_preimage(prev_txid, &adder_lock(), 1000, &adder_lock(), 900)
        .unwrap();
    // Four-byte script code, then the spent amount.
    assert_eq!(preimage[104], 4);
    assert_eq!(&preimage[109..117], &1000u64.to_le_bytes());
    assert_eq!(&preimage[preimage.len() - 4..], &[0x41, 0, 0, 0]);

    assert!(builder
        .unlock_sighash_preimage(prev_txid, &adder_lock(), 1000, &adder_lock(), 1001)
        .is_err());
}

#[test]
fn test_funded_unlock_tx() {
    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"contract");
    let utxos = vec![p2pkh_utxo(b"fund", 3000), p2pkh_utxo(b"unused", 3000)];
    let mut tx = builder
        .build_funded_unlock_tx(&utxos, &key(), prev_txid, &adder_lock(), 1000, &adder_lock(), 1000)
        .unwrap();

    assert_eq!(tx.inputs.len(), 2);
    assert_eq!(tx.inputs[0].source_txid, prev_txid);
    assert!(tx.inputs[0].unlocking_script.is_empty());
    assert_eq!(tx.inputs[1].source_txid, utxos[0].tx_id);
    assert!(!tx.inputs[1].unlocking_script.is_empty());
    assert_eq!(tx.outputs[0].satoshis, 1000);
    assert_eq!(tx.outputs[1].satoshis, 4000 - 1000 - 546);

    // The funding signature survives attaching the contract proof.
    tx.set_unlocking_script(0, Script::from_asm("OP_11").unwrap()).unwrap();
    let result = verify_all(&tx, &VerificationFlags::contract());
    assert!(result.success, "{:?}", result.reason);
}

#[test]
fn test_funded_unlock_change_at_dust_boundary() {
    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"contract");
    let build = |funding| {
        builder
            .build_funded_unlock_tx(
                &[p2pkh_utxo(b"fund", funding)],
                &key(),
                prev_txid,
                &adder_lock(),
                1000,
                &adder_lock(),
                1000,
            )
            .unwrap()
    };

    // Leftover after the minimum fee is exactly the dust threshold.
    let tx = build(1092);
    assert_eq!(tx.outputs.len(), 1);
    assert_eq!(tx.fee().unwrap(), 1092);

    let tx = build(1093);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[1].satoshis, 547);
    assert_eq!(tx.fee().unwrap(), 546);

    let tx = build(1000);
    assert_eq!(tx.outputs.len(), 1);
    assert_eq!(tx.fee().unwrap(), 1000);
}

#[test]
fn test_funded_unlock_needs_a_utxo() {
    let builder = TransactionBuilder::default();
    let err = builder
        .build_funded_unlock_tx(&[], &key(), Hash::default(), &adder_lock(), 1000, &adder_lock(), 1000)
        .unwrap_err();
    assert!(matches!(err, TransactionError::InsufficientFunds { .. }));

    let err = builder
        .build_funded_unlock_tx(
            &[p2pkh_utxo(b"fund", 100)],
            &key(),
            Hash::default(),
            &adder_lock(),
            1000,
            &adder_lock(),
            1000,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TransactionError::InsufficientFunds { required: 1546, available: 1100 }
    ));
}

#[test]
fn test_funded_sighash_preimage() {
    let builder = TransactionBuilder::default();
    let funded = builder
        .funded_sighash_preimage(
            &[p2pkh_utxo(b"fund", 3000)],
            &key(),
            Hash::digest(b"contract"),
            &adder_lock(),
            1000,
            &adder_lock(),
            1000,
        )
        .unwrap();
    assert_eq!(funded.change, 2454);
    assert_eq!(funded.fee, 546);
    // ANYONECANPAY zeroes hashPrevouts and hashSequence.
    assert_eq!(&funded.preimage[4..68], &[0u8; 64]);
    assert_eq!(&funded.preimage[funded.preimage.len() - 4..], &[0xc1, 0, 0, 0]);
}

#[test]
fn test_input_builder_defaults() {
    let input = TransactionInput::new(Hash::digest(b"x"), 1);
    assert_eq!(input.sequence_number, DEFAULT_SEQUENCE_NUMBER);
    assert!(input.unlocking_script.is_empty());
}
