// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROPERTY-BASED TESTS - shp-network
//
// Boundary decoding must never panic and must be exact:
// - arbitrary bytes either decode or are rejected
// - encoded messages decode to themselves
// - beacons deduplicate by address whatever the uid
//
// Run: cargo test --release -p shp-network --test prop_network
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use proptest::prelude::*;
use shp_core::{BalanceInfo, PublicKey, Transaction};
use shp_network::discovery::handle_beacon;
use shp_network::{Beacon, Message, PeerSet, Request};

fn arb_key() -> impl Strategy<Value = PublicKey> {
    any::<[u8; 32]>().prop_map(PublicKey)
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        any::<[u8; 32]>().prop_map(|hash| Message::Request(Request::GetBlock { hash })),
        arb_key().prop_map(Message::AddUser),
        (arb_key(), any::<u64>()).prop_map(|(receiver, amount)| Message::ReqSendMoney { receiver, amount }),
        (arb_key(), arb_key(), 1u64..1000, any::<u64>(), any::<u64>()).prop_map(|(a, b, amount, p, q)| {
            Message::TransactionVerified(Transaction::unsigned(
                amount,
                10,
                BalanceInfo::new(a, 1000, p, vec![[7u8; 32]]),
                BalanceInfo::new(b, 0, q, vec![]),
            ))
        }),
        Just(Message::Response(None)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Message::from_line(&bytes);
    }

    #[test]
    fn prop_line_decodes_to_itself(msg in arb_message()) {
        let line = msg.to_line().unwrap();
        prop_assert_eq!(line.last(), Some(&b'\n'));
        prop_assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        prop_assert_eq!(Message::from_line(&line).unwrap(), msg);
    }

    #[test]
    fn prop_beacons_dedup_by_address(
        ports in prop::collection::vec(1u16..50, 1..40),
        uids in prop::collection::vec("[a-z]{1,6}", 40),
    ) {
        let peers = PeerSet::new();
        let mut distinct = std::collections::BTreeSet::new();
        for (port, uid) in ports.iter().zip(uids.iter()) {
            let bytes = serde_json::to_vec(&Beacon { ip: "10.1.2.3".into(), port: *port, uid: uid.clone() }).unwrap();
            let fresh = handle_beacon(&bytes, "self-uid-with-digits-0", &peers).is_some();
            prop_assert_eq!(fresh, distinct.insert(*port));
        }
        prop_assert_eq!(peers.len(), distinct.len());
    }
}
