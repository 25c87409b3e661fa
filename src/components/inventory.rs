use super::{Component, ComponentBase, ComponentKind, ParentLink};
use crate::event_bus::{EventBus, GameEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::{Display, EnumString};

/// 容量策略
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// 容量仅作展示，不限制存入
    #[default]
    Unlimited,
    /// 总数量超过容量时拒绝存入
    Enforce,
}

/// 背包组件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryConfig {
    pub capacity: u32,
    pub capacity_policy: CapacityPolicy,
    /// 初始物品
    pub items: BTreeMap<String, u32>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            capacity_policy: CapacityPolicy::Unlimited,
            items: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryComponent {
    #[serde(skip)]
    base: ComponentBase,
    items: BTreeMap<String, u32>,
    pub capacity: u32,
    pub capacity_policy: CapacityPolicy,
}

impl InventoryComponent {
    pub fn new(
        parent: Option<ParentLink>,
        bus: Option<Arc<EventBus>>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            base: ComponentBase::new(parent, bus),
            items: config.items,
            capacity: config.capacity,
            capacity_policy: config.capacity_policy,
        }
    }

    /// 存入物品，返回是否成功
    pub fn add(&mut self, item_id: &str, amount: u32) -> bool {
        if self.capacity_policy == CapacityPolicy::Enforce
            && self.total_quantity().saturating_add(amount as u64) > self.capacity as u64
        {
            return false;
        }

        let quantity = self.items.entry(item_id.to_string()).or_insert(0);
        *quantity = quantity.saturating_add(amount);
        self.emit_update();
        true
    }

    /// 取出物品；数量不足时不做修改。数量归零的条目会保留
    pub fn remove(&mut self, item_id: &str, amount: u32) -> bool {
        match self.items.get_mut(item_id) {
            Some(quantity) if *quantity >= amount => {
                *quantity -= amount;
                self.emit_update();
                true
            }
            _ => false,
        }
    }

    pub fn has(&self, item_id: &str, amount: u32) -> bool {
        self.count(item_id) >= amount
    }

    pub fn count(&self, item_id: &str) -> u32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.values().map(|&q| q as u64).sum()
    }

    pub fn items(&self) -> &BTreeMap<String, u32> {
        &self.items
    }

    fn emit_update(&self) {
        if self.base.is_hero() {
            self.base.emit(GameEvent::InventoryUpdated {
                items: self.items.clone(),
            });
        }
    }
}

impl Default for InventoryComponent {
    fn default() -> Self {
        Self::new(None, None, InventoryConfig::default())
    }
}

impl Component for InventoryComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Inventory
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EntityId;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn remove_more_than_held_fails_without_change() {
        let mut bag = InventoryComponent::default();
        bag.add("wood", 3);

        assert!(!bag.remove("wood", 5));
        assert_eq!(bag.count("wood"), 3);
        assert!(!bag.remove("stone", 1));
        assert!(bag.items().get("stone").is_none());
    }

    #[test]
    fn emptied_entries_stay_at_zero() {
        let mut bag = InventoryComponent::default();
        bag.add("wood", 2);
        assert!(bag.remove("wood", 2));
        assert_eq!(bag.items().get("wood"), Some(&0));
        assert!(bag.has("wood", 0));
        assert!(!bag.has("wood", 1));
    }

    #[test]
    fn unlimited_policy_ignores_capacity() {
        let mut bag = InventoryComponent::new(
            None,
            None,
            InventoryConfig {
                capacity: 2,
                ..Default::default()
            },
        );
        assert!(bag.add("stone", 50));
        assert_eq!(bag.total_quantity(), 50);
    }

    #[test]
    fn enforce_policy_rejects_overflow() {
        let mut bag = InventoryComponent::new(
            None,
            None,
            InventoryConfig {
                capacity: 5,
                capacity_policy: CapacityPolicy::Enforce,
                ..Default::default()
            },
        );
        assert!(bag.add("stone", 4));
        assert!(!bag.add("wood", 2));
        assert_eq!(bag.count("wood"), 0);
        assert!(bag.add("wood", 1));
        assert_eq!(bag.total_quantity(), 5);
    }

    #[test]
    fn hero_inventory_publishes_full_mapping() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            bus.on("INVENTORY_UPDATED", move |e| seen.lock().unwrap().push(e.payload()));
        }
        let mut bag = InventoryComponent::new(
            Some(ParentLink::new(EntityId(1), true)),
            Some(bus),
            InventoryConfig::default(),
        );

        bag.add("wood", 3);
        bag.add("stone", 1);
        bag.remove("wood", 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], serde_json::json!({ "stone": 1, "wood": 2 }));
    }

    #[test]
    fn policy_parses_from_config_json() {
        let config: InventoryConfig =
            serde_json::from_str(r#"{ "capacity": 8, "capacityPolicy": "enforce" }"#).unwrap();
        assert_eq!(config.capacity_policy, CapacityPolicy::Enforce);
        assert_eq!(config.capacity, 8);
    }
}
