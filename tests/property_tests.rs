// Property tests for component bookkeeping

use jurassic_valley::components::{
    CapacityPolicy, HealthComponent, HealthConfig, InventoryConfig, StatsComponent, StatsConfig,
};
use jurassic_valley::config::SimConfig;
use jurassic_valley::{EventBus, GameEvent, InventoryComponent, Mining};
use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum HealthOp {
    Damage(f32),
    Heal(f32),
}

fn health_op() -> impl Strategy<Value = HealthOp> {
    prop_oneof![
        (0.0f32..200.0).prop_map(HealthOp::Damage),
        (0.0f32..200.0).prop_map(HealthOp::Heal),
    ]
}

proptest! {
    #[test]
    fn health_stays_in_bounds(max in 1.0f32..500.0, ops in prop::collection::vec(health_op(), 0..40)) {
        let mut health = HealthComponent::new(None, None, HealthConfig { max_health: max, health: None });
        for op in ops {
            let was_dead = health.is_dead();
            match op {
                HealthOp::Damage(amount) => {
                    let killed = health.take_damage(amount);
                    prop_assert!(!(killed && was_dead));
                }
                HealthOp::Heal(amount) => health.heal(amount),
            }
            prop_assert!(health.health() >= 0.0 && health.health() <= max);
            prop_assert_eq!(health.is_dead(), health.health() <= 0.0 || was_dead);
            if health.is_dead() {
                prop_assert_eq!(health.health(), 0.0);
            }
        }
    }

    #[test]
    fn stamina_never_goes_negative(costs in prop::collection::vec(0.0f32..60.0, 0..30)) {
        let mut stats = StatsComponent::new(None, None, StatsConfig::default());
        for cost in costs {
            let before = stats.stamina();
            let spent = stats.consume_stamina(cost);
            prop_assert_eq!(spent, before >= cost);
            if !spent {
                prop_assert_eq!(stats.stamina(), before);
            }
            prop_assert!(stats.stamina() >= 0.0);
        }
    }

    #[test]
    fn inventory_conserves_quantities(
        moves in prop::collection::vec((0usize..3, 1u32..20, any::<bool>()), 0..50)
    ) {
        const ITEMS: [&str; 3] = ["wood", "stone", "amber"];
        let mut bag = InventoryComponent::new(None, None, InventoryConfig::default());
        let mut expected = [0u32; 3];

        for (index, amount, adding) in moves {
            if adding {
                prop_assert!(bag.add(ITEMS[index], amount));
                expected[index] += amount;
            } else {
                let removed = bag.remove(ITEMS[index], amount);
                prop_assert_eq!(removed, expected[index] >= amount);
                if removed {
                    expected[index] -= amount;
                }
            }
        }

        for (item, quantity) in ITEMS.iter().zip(expected) {
            prop_assert_eq!(bag.count(item), quantity);
        }
        prop_assert_eq!(bag.total_quantity(), expected.iter().map(|&q| q as u64).sum::<u64>());
    }

    #[test]
    fn enforced_capacity_is_never_exceeded(
        capacity in 1u32..50,
        adds in prop::collection::vec(1u32..15, 0..20)
    ) {
        let mut bag = InventoryComponent::new(None, None, InventoryConfig {
            capacity,
            capacity_policy: CapacityPolicy::Enforce,
            ..Default::default()
        });
        for amount in adds {
            bag.add("wood", amount);
            prop_assert!(bag.total_quantity() <= capacity as u64);
        }
    }

    #[test]
    fn drops_respect_configured_ranges(seed in any::<u64>(), power in 1u32..10) {
        let config = SimConfig::default();
        let mut mining = Mining::with_seed(&config, seed);
        mining.spawn_rock(0, 0, "copper_ore");

        let drops = loop {
            if let Some(drops) = mining.hit(0, 0, power) {
                break drops;
            }
        };

        let table = &config.rock("copper_ore").unwrap().drops;
        prop_assert!(mining.get_rock(0, 0).is_none());
        prop_assert!(drops.iter().any(|d| d.item_id == "copper_ore"));
        for drop in drops {
            let entry = table.iter().find(|e| e.item_id == drop.item_id).unwrap();
            prop_assert!(drop.quantity >= entry.min && drop.quantity <= entry.max);
        }
    }

    #[test]
    fn listeners_only_hear_their_own_event(names in prop::collection::vec("[A-Z_]{1,8}", 1..6)) {
        let bus = EventBus::new();
        let counters: Vec<Arc<AtomicUsize>> = names
            .iter()
            .map(|name| {
                let counter = Arc::new(AtomicUsize::new(0));
                let inner = counter.clone();
                bus.on(name, move |_| {
                    inner.fetch_add(1, Ordering::SeqCst);
                });
                counter
            })
            .collect();

        bus.emit(GameEvent::custom(names[0].clone(), json!({})));

        for (name, counter) in names.iter().zip(&counters) {
            let expected = if *name == names[0] { 1 } else { 0 };
            prop_assert_eq!(counter.load(Ordering::SeqCst), expected);
        }
    }
}
