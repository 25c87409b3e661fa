use super::{Component, ComponentBase, ComponentKind, ParentLink};
use crate::event_bus::{EventBus, GameEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 生命组件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthConfig {
    pub max_health: f32,
    /// 初始生命，缺省为满值
    pub health: Option<f32>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            health: None,
        }
    }
}

/// 生命值、受伤、死亡与复活
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthComponent {
    #[serde(skip)]
    base: ComponentBase,
    health: f32,
    max_health: f32,
    is_dead: bool,
}

impl HealthComponent {
    pub fn new(parent: Option<ParentLink>, bus: Option<Arc<EventBus>>, config: HealthConfig) -> Self {
        let max_health = config.max_health.max(0.0);
        Self {
            base: ComponentBase::new(parent, bus),
            health: config.health.unwrap_or(max_health).clamp(0.0, max_health),
            max_health,
            is_dead: false,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// 扣除生命；返回本次伤害是否致死。已死亡时不做任何事
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_dead {
            return false;
        }

        self.health = (self.health - amount).clamp(0.0, self.max_health);

        if let Some(link) = self.base.parent() {
            let event = if link.emits_ui_events {
                GameEvent::HeroHealthChanged {
                    current: self.health,
                    max: self.max_health,
                }
            } else {
                GameEvent::EntityDamaged {
                    entity: link.entity,
                    amount,
                    current: self.health,
                    max: self.max_health,
                }
            };
            self.base.emit(event);
        }

        if self.health <= 0.0 {
            self.die();
            if let Some(entity) = self.base.entity() {
                self.base.emit(GameEvent::EntityDied { entity });
            }
            return true;
        }
        false
    }

    /// 治疗；只有英雄会发布事件
    pub fn heal(&mut self, amount: f32) {
        if self.is_dead {
            return;
        }
        self.health = (self.health + amount).clamp(0.0, self.max_health);
        self.emit_hero_health();
    }

    pub fn die(&mut self) {
        self.is_dead = true;
        self.health = 0.0;
    }

    pub fn respawn(&mut self) {
        self.is_dead = false;
        self.health = self.max_health;
        self.emit_hero_health();
    }

    fn emit_hero_health(&self) {
        self.base.emit_for_hero(GameEvent::HeroHealthChanged {
            current: self.health,
            max: self.max_health,
        });
    }
}

impl Default for HealthComponent {
    fn default() -> Self {
        Self::new(None, None, HealthConfig::default())
    }
}

impl Component for HealthComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Health
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }
}
