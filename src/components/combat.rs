use super::{Component, ComponentBase, ComponentKind, ParentLink, StaminaPool, count_down_secs};
use crate::event_bus::{EventBus, GameEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 战斗组件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatConfig {
    pub damage: f32,
    /// 每秒攻击次数
    pub rate: f32,
    pub range: f32,
    pub stamina_cost: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            damage: 10.0,
            rate: 1.0,
            range: 100.0,
            stamina_cost: 0.0,
        }
    }
}

/// 攻击冷却与体力消耗
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatComponent {
    #[serde(skip)]
    base: ComponentBase,
    pub damage: f32,
    pub rate: f32,
    pub range: f32,
    pub stamina_cost: f32,
    /// 剩余冷却(秒)
    cooldown_timer: f32,
    can_attack: bool,
}

impl CombatComponent {
    pub fn new(parent: Option<ParentLink>, bus: Option<Arc<EventBus>>, config: CombatConfig) -> Self {
        Self {
            base: ComponentBase::new(parent, bus),
            damage: config.damage,
            rate: config.rate,
            range: config.range,
            stamina_cost: config.stamina_cost,
            cooldown_timer: 0.0,
            can_attack: true,
        }
    }

    pub fn can_attack(&self) -> bool {
        self.can_attack
    }

    pub fn cooldown_timer(&self) -> f32 {
        self.cooldown_timer
    }

    /// 发起一次攻击
    ///
    /// 有体力消耗且提供了体力池时，体力不足则失败且不修改任何状态。
    /// 成功后进入 `1 / rate` 秒冷却；`rate <= 0` 时不设冷却。
    pub fn attack(&mut self, stamina: Option<&mut dyn StaminaPool>) -> bool {
        if !self.can_attack {
            return false;
        }

        if self.stamina_cost > 0.0 {
            if let Some(pool) = stamina {
                if pool.stamina() < self.stamina_cost {
                    return false;
                }
                pool.drain(self.stamina_cost);
                self.base.emit_for_hero(GameEvent::HeroStaminaChanged {
                    current: pool.stamina(),
                    max: pool.max_stamina(),
                });
            }
        }

        // 攻速为 0 或负数时没有冷却
        if self.rate > 0.0 {
            self.cooldown_timer = 1.0 / self.rate;
            self.can_attack = false;
        }
        true
    }
}

impl Default for CombatComponent {
    fn default() -> Self {
        Self::new(None, None, CombatConfig::default())
    }
}

impl Component for CombatComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Combat
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn update(&mut self, dt_ms: f32) {
        if count_down_secs(&mut self.cooldown_timer, dt_ms) {
            self.can_attack = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{StatsComponent, StatsConfig};
    use crate::event_bus::EntityId;
    use std::sync::Mutex;

    fn with_cost(cost: f32, rate: f32) -> CombatComponent {
        CombatComponent::new(
            None,
            None,
            CombatConfig {
                rate,
                stamina_cost: cost,
                ..Default::default()
            },
        )
    }

    #[test]
    fn cooldown_blocks_until_elapsed() {
        let mut combat = with_cost(0.0, 2.0);

        assert!(combat.attack(None));
        assert!(!combat.can_attack());
        assert_eq!(combat.cooldown_timer(), 0.5);
        assert!(!combat.attack(None));

        combat.update(400.0);
        assert!(!combat.can_attack());
        combat.update(200.0);
        assert!(combat.can_attack());
        assert_eq!(combat.cooldown_timer(), 0.0);
        assert!(combat.attack(None));
    }

    #[test]
    fn insufficient_stamina_changes_nothing() {
        let mut combat = with_cost(5.0, 1.0);
        let mut stats = StatsComponent::new(
            None,
            None,
            StatsConfig {
                stamina: Some(3.0),
                ..Default::default()
            },
        );

        assert!(!combat.attack(Some(&mut stats)));
        assert_eq!(stats.stamina(), 3.0);
        assert!(combat.can_attack());
    }

    #[test]
    fn hero_attack_drains_and_reports_stamina() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            bus.on("HERO_STAMINA_CHANGE", move |e| seen.lock().unwrap().push(e.clone()));
        }
        let hero = Some(ParentLink::new(EntityId(1), true));
        let mut combat = CombatComponent::new(
            hero,
            Some(bus.clone()),
            CombatConfig {
                stamina_cost: 5.0,
                ..Default::default()
            },
        );
        let mut stats = StatsComponent::new(hero, Some(bus), StatsConfig::default());

        assert!(combat.attack(Some(&mut stats)));
        assert_eq!(stats.stamina(), 95.0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![GameEvent::HeroStaminaChanged {
                current: 95.0,
                max: 100.0
            }]
        );
    }

    #[test]
    fn cost_is_ignored_without_a_pool() {
        let mut combat = with_cost(5.0, 1.0);
        assert!(combat.attack(None));
    }

    #[test]
    fn cooldown_clears_on_the_frame_it_elapses() {
        for (rate, frame_ms, frames) in [(2.0, 100.0, 5), (4.0, 50.0, 5), (1.0, 10.0, 100)] {
            let mut combat = with_cost(0.0, rate);
            assert!(combat.attack(None));
            for _ in 0..frames - 1 {
                combat.update(frame_ms);
                assert!(!combat.can_attack());
            }
            combat.update(frame_ms);
            assert!(combat.can_attack(), "rate {rate} after {frames} x {frame_ms}ms");
            assert_eq!(combat.cooldown_timer(), 0.0);
        }
    }

    #[test]
    fn zero_rate_attacks_without_cooldown() {
        for rate in [0.0, -1.0] {
            let mut combat = with_cost(0.0, rate);
            assert!(combat.attack(None));
            assert!(combat.can_attack());
            assert_eq!(combat.cooldown_timer(), 0.0);
            assert!(combat.attack(None));
        }
    }
}
