use std::collections::{BTreeMap, BTreeSet};

use bail_in_core::hierarchy::{move_bucket, Hierarchy};
use bail_in_core::waterfall::allocation::allocate_loss;
use proptest::prelude::*;
use rust_decimal::Decimal;

const SYSTEM: &str = "Buffer";

/// A hierarchy of 1..8 creditor buckets, optionally headed by the buffer,
/// with capacities, an exemption mask and a loss.
fn waterfall_case() -> impl Strategy<Value = (Hierarchy, BTreeMap<String, Decimal>, BTreeSet<String>, Decimal)>
{
    (
        any::<bool>(),
        prop::collection::vec((0u64..1_000, any::<bool>()), 1..8),
        0u64..5_000,
    )
        .prop_map(|(with_system, buckets, loss)| {
            let mut order: Vec<String> = Vec::new();
            let mut capacities = BTreeMap::new();
            let mut exempt = BTreeSet::new();
            if with_system {
                order.push(SYSTEM.to_string());
                capacities.insert(SYSTEM.to_string(), Decimal::from(loss / 10));
            }
            for (i, (capacity, is_exempt)) in buckets.into_iter().enumerate() {
                let name = format!("C{i}");
                capacities.insert(name.clone(), Decimal::from(capacity));
                if is_exempt {
                    exempt.insert(name.clone());
                }
                order.push(name);
            }
            let system = with_system.then(|| SYSTEM.to_string());
            let hierarchy = Hierarchy::new(order, system).unwrap();
            (hierarchy, capacities, exempt, Decimal::from(loss))
        })
}

proptest! {
    #[test]
    fn conservation((h, caps, exempt, loss) in waterfall_case()) {
        let d = allocate_loss(loss, &caps, &h, &exempt).unwrap();
        prop_assert!(d.total_absorbed() <= loss);

        let available: Decimal = h
            .names()
            .iter()
            .filter(|n| h.is_system(n) || !exempt.contains(*n))
            .map(|n| caps[n])
            .sum();
        prop_assert_eq!(d.total_absorbed(), loss.min(available));
    }

    #[test]
    fn capacity_bound((h, caps, exempt, loss) in waterfall_case()) {
        let d = allocate_loss(loss, &caps, &h, &exempt).unwrap();
        for a in d.iter() {
            prop_assert!(a.absorbed >= Decimal::ZERO);
            prop_assert!(a.absorbed <= caps[&a.name]);
        }
    }

    #[test]
    fn exempt_buckets_absorb_nothing((h, caps, exempt, loss) in waterfall_case()) {
        let d = allocate_loss(loss, &caps, &h, &exempt).unwrap();
        for name in &exempt {
            prop_assert_eq!(d.absorbed(name), Decimal::ZERO);
        }
    }

    #[test]
    fn nothing_absorbed_after_exhaustion((h, caps, exempt, loss) in waterfall_case()) {
        let d = allocate_loss(loss, &caps, &h, &exempt).unwrap();
        let mut running = Decimal::ZERO;
        for a in d.iter() {
            if running == loss {
                prop_assert_eq!(a.absorbed, Decimal::ZERO);
            }
            running += a.absorbed;
        }
    }

    #[test]
    fn system_bucket_never_moves(
        (h, _, _, _) in waterfall_case(),
        pick in any::<prop::sample::Index>(),
        target in 0usize..12,
    ) {
        let name = pick.get(h.names()).clone();
        let moved = move_bucket(&h, &name, target).unwrap();

        if h.is_system(&name) {
            prop_assert_eq!(&moved, &h);
        }
        if let Some(system) = h.system_bucket() {
            prop_assert_eq!(moved.names()[0].as_str(), system);
        }

        let before: BTreeSet<&String> = h.names().iter().collect();
        let after: BTreeSet<&String> = moved.names().iter().collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn move_to_own_position_is_identity(
        (h, _, _, _) in waterfall_case(),
        pick in any::<prop::sample::Index>(),
    ) {
        let name = pick.get(h.names()).clone();
        let idx = h.position(&name).unwrap();
        prop_assert_eq!(move_bucket(&h, &name, idx).unwrap(), h);
    }
}
