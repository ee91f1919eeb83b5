use std::sync::Arc;

use pgen_ledger::{MemorySupply, ResourceLedger};
use pgen_schemas::{ItemKey, RequesterId};
use proptest::prelude::*;

fn unit() -> ItemKey {
    ItemKey::new("appliedenergistics2:item.ItemMultiMaterial", 52)
}

proptest! {
    #[test]
    fn debit_either_takes_everything_from_one_source_or_nothing(
        pool in 0u64..50,
        local in 0u64..50,
        required in 1u64..60,
    ) {
        let who = RequesterId::from_name("prop");
        let net = Arc::new(MemorySupply::new("network"));
        let inv = Arc::new(MemorySupply::new("inventory"));
        net.credit(&who, &unit(), pool);
        inv.credit(&who, &unit(), local);
        let ledger = ResourceLedger::new().with_source(net.clone()).with_source(inv.clone());

        match ledger.debit(&who, &unit(), required) {
            Ok(receipt) => {
                let (paid_net, paid_inv) = (pool - net.balance(&who, &unit()), local - inv.balance(&who, &unit()));
                prop_assert!(
                    (paid_net == required && paid_inv == 0) || (paid_net == 0 && paid_inv == required)
                );
                // network has priority when it can pay
                if pool >= required {
                    prop_assert_eq!(receipt.source.as_deref(), Some("network"));
                }
            }
            Err(e) => {
                prop_assert!(pool < required && local < required);
                prop_assert_eq!(e.shortfall(), required - pool.max(local));
                prop_assert_eq!(net.balance(&who, &unit()), pool);
                prop_assert_eq!(inv.balance(&who, &unit()), local);
            }
        }
    }
}
