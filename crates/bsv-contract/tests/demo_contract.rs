use bsv_contract::{Artifacts, ContractClass, ContractError, SpendContext};
use bsv_primitives::chainhash::Hash;
use bsv_primitives::ec::PrivateKey;
use bsv_script::interpreter::VerificationFlags;
use bsv_script::{Literal, Network};
use bsv_transaction::template::p2pkh;
use bsv_transaction::{verify_input, TransactionBuilder, Utxo};
use proptest::prelude::*;

const WIF: &str = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn demo_class() -> ContractClass {
    init_tracing();
    let artifacts = Artifacts::parse(
        include_str!("fixtures/demo_asm.json"),
        include_str!("fixtures/demo_ast.json"),
        "demo.scrypt",
        true,
    )
    .unwrap();
    ContractClass::from_compiled(artifacts).unwrap()
}

fn p2pkh_class() -> ContractClass {
    init_tracing();
    let artifacts = Artifacts::parse(
        include_str!("fixtures/p2pkh_asm.json"),
        include_str!("fixtures/p2pkh_ast.json"),
        "p2pkh.scrypt",
        false,
    )
    .unwrap();
    ContractClass::from_compiled(artifacts).unwrap()
}

fn int(n: i64) -> Literal {
    Literal::from(n)
}

#[test]
fn demo_unlocks_with_sum() {
    let demo = demo_class().instantiate(vec![int(4), int(7)]).unwrap();
    assert_eq!(demo.locking_asm(), "OP_4 OP_7 OP_ADD OP_EQUAL");

    let result = demo.verify("unlock", &[int(11)], None).unwrap();
    assert!(result.success, "{:?}", result.reason);

    for wrong in [0, 9, -11] {
        let result = demo.verify("unlock", &[int(wrong)], None).unwrap();
        assert!(!result.success);
        assert!(result.reason.is_some());
    }
}

#[test]
fn demo_interface() {
    let class = demo_class();
    let iface = class.interface();
    assert_eq!(iface.name, "Demo");
    assert_eq!(iface.constructor_params, vec!["x", "y"]);
    assert_eq!(iface.functions.len(), 1);
    assert_eq!(iface.functions[0].name, "unlock");

    let demo = class.instantiate(vec![int(4), int(7)]).unwrap();
    // A single public function takes no selector.
    assert_eq!(demo.unlocking_asm("unlock", &[int(11)]).unwrap().to_string(), "OP_11");
}

#[test]
fn demo_argument_errors() {
    let class = demo_class();
    let err = class.instantiate(vec![int(4), int(7), int(1)]).unwrap_err();
    assert_eq!(err.to_string(), "Expected 2 constructor arguments, but got 3");

    let demo = class.instantiate(vec![int(4), int(7)]).unwrap();
    assert!(matches!(demo.verify("unlock", &[int(1), int(2)], None), Err(ContractError::Arity(_))));
    assert!(matches!(demo.verify("sum", &[int(1), int(2)], None), Err(ContractError::UnknownFunction(_))));
}

#[test]
fn demo_with_large_and_negative_arguments() {
    let demo = demo_class().instantiate(vec![int(1_000_000), int(-17)]).unwrap();
    assert_eq!(demo.locking_asm(), "40420f 91 OP_ADD OP_EQUAL");
    assert!(demo.verify("unlock", &[int(999_983)], None).unwrap().success);
}

#[test]
fn demo_locked_and_spent_on_chain_shape() {
    let key = PrivateKey::from_wif(WIF).unwrap();
    let demo = demo_class().instantiate(vec![int(4), int(7)]).unwrap();
    let lock = demo.locking_script().unwrap();
    let builder = TransactionBuilder::default();

    let utxo = Utxo {
        tx_id: Hash::digest(b"funding"),
        output_index: 1,
        satoshis: 10_000,
        script: p2pkh::lock_to_key(&key, Network::Testnet),
    };
    let lock_tx = builder.build_lock_tx(&[utxo], &lock, 1000, &key).unwrap();
    assert_eq!(lock_tx.outputs[0].locking_script, lock);

    let mut unlock_tx = builder
        .build_unlock_tx(lock_tx.tx_id(), &lock, 1000, &lock, 500)
        .unwrap();
    unlock_tx
        .set_unlocking_script(0, demo.unlocking_script("unlock", &[int(11)]).unwrap())
        .unwrap();
    let result = verify_input(&unlock_tx, 0, &lock, 1000, &VerificationFlags::contract());
    assert!(result.success, "{:?}", result.reason);
}

#[test]
fn p2pkh_contract_checks_signature_in_spend_context() {
    let key = PrivateKey::from_wif(WIF).unwrap();
    let pub_key = key.pub_key();
    let contract = p2pkh_class()
        .instantiate(vec![Literal::from(pub_key.hash160().to_vec())])
        .unwrap();
    let lock = contract.locking_script().unwrap();
    assert!(lock.is_p2pkh());

    let builder = TransactionBuilder::default();
    let prev_txid = Hash::digest(b"locked");
    let sig = builder
        .unlock_signature(prev_txid, &key, &lock, 2000, &lock, 1500)
        .unwrap();
    let tx = builder.build_unlock_tx(prev_txid, &lock, 2000, &lock, 1500).unwrap();
    let args = [Literal::from(sig), Literal::from(pub_key.to_compressed().to_vec())];

    let spend = SpendContext { tx: &tx, input_index: 0, input_amount: 2000 };
    let result = contract.verify("unlock", &args, Some(spend)).unwrap();
    assert!(result.success, "{:?}", result.reason);

    // Signed for a different amount.
    let spend = SpendContext { tx: &tx, input_index: 0, input_amount: 2001 };
    assert!(!contract.verify("unlock", &args, Some(spend)).unwrap().success);

    // No transaction to check the signature against.
    assert!(!contract.verify("unlock", &args, None).unwrap().success);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn demo_accepts_exactly_the_sum(
        x in -1_000_000_000i64..1_000_000_000,
        y in -1_000_000_000i64..1_000_000_000,
        delta in 1i64..1000,
    ) {
        let demo = demo_class().instantiate(vec![int(x), int(y)]).unwrap();
        prop_assert!(demo.verify("unlock", &[int(x + y)], None).unwrap().success);
        prop_assert!(!demo.verify("unlock", &[int(x + y + delta)], None).unwrap().success);
    }
}
