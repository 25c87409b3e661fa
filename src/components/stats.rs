//! 属性组件：移动速度、体力、暴击、防御以及等级成长

use super::{Component, ComponentBase, ComponentKind, ParentLink};
use crate::event_bus::{EventBus, GameEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 护甲公式分母
pub const ARMOR_DIVISOR: f32 = 100.0;

/// 装备提供的加成
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatBonuses {
    pub damage: f32,
    pub armor: f32,
    /// 百分点
    pub crit_chance: f32,
    pub range: f32,
    pub attack_rate: f32,
}

/// 体力池，攻击时由战斗组件扣除
pub trait StaminaPool {
    fn stamina(&self) -> f32;
    fn max_stamina(&self) -> f32;
    /// 扣除体力，不发布事件；调用方先确认体力充足
    fn drain(&mut self, amount: f32);
}

/// 属性组件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsConfig {
    pub speed: f32,
    pub max_stamina: f32,
    pub stamina: Option<f32>,
    pub crit_chance: f32,
    pub defense: f32,
    pub attack: f32,
    pub crit_multiplier: f32,
    pub base_attack_range: f32,
    pub level: u32,
    pub xp: u32,
    pub xp_to_next_level: u32,
    pub xp_scaling: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            speed: 100.0,
            max_stamina: 100.0,
            stamina: None,
            crit_chance: 0.0,
            defense: 0.0,
            attack: 10.0,
            crit_multiplier: 1.5,
            base_attack_range: 80.0,
            level: 1,
            xp: 0,
            xp_to_next_level: 100,
            xp_scaling: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsComponent {
    #[serde(skip)]
    base: ComponentBase,
    pub speed: f32,
    stamina: f32,
    max_stamina: f32,
    pub crit_chance: f32,
    pub defense: f32,
    pub attack: f32,
    pub crit_multiplier: f32,
    pub base_attack_range: f32,
    level: u32,
    xp: u32,
    xp_to_next_level: u32,
    xp_scaling: f32,
    #[serde(default)]
    bonuses: StatBonuses,
}

impl StatsComponent {
    pub fn new(parent: Option<ParentLink>, bus: Option<Arc<EventBus>>, config: StatsConfig) -> Self {
        let max_stamina = config.max_stamina.max(0.0);
        Self {
            base: ComponentBase::new(parent, bus),
            speed: config.speed,
            stamina: config.stamina.unwrap_or(max_stamina).clamp(0.0, max_stamina),
            max_stamina,
            crit_chance: config.crit_chance,
            defense: config.defense,
            attack: config.attack,
            crit_multiplier: config.crit_multiplier,
            base_attack_range: config.base_attack_range,
            level: config.level.max(1),
            xp: config.xp,
            xp_to_next_level: config.xp_to_next_level.max(1),
            xp_scaling: config.xp_scaling,
            bonuses: StatBonuses::default(),
        }
    }

    pub fn stamina(&self) -> f32 {
        self.stamina
    }

    pub fn max_stamina(&self) -> f32 {
        self.max_stamina
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn bonuses(&self) -> StatBonuses {
        self.bonuses
    }

    /// 替换装备加成（换装时由外部重新汇总）
    pub fn set_bonuses(&mut self, bonuses: StatBonuses) {
        self.bonuses = bonuses;
    }

    /// 体力足够时扣除并返回 true，否则不做任何修改
    pub fn consume_stamina(&mut self, amount: f32) -> bool {
        if self.stamina < amount {
            return false;
        }
        self.stamina = (self.stamina - amount).clamp(0.0, self.max_stamina);
        self.emit_stamina();
        true
    }

    pub fn restore_stamina(&mut self, amount: f32) {
        self.stamina = (self.stamina + amount).clamp(0.0, self.max_stamina);
        self.emit_stamina();
    }

    pub fn get_speed(&self, multiplier: f32) -> f32 {
        self.speed * multiplier
    }

    fn emit_stamina(&self) {
        self.base.emit_for_hero(GameEvent::HeroStaminaChanged {
            current: self.stamina,
            max: self.max_stamina,
        });
    }

    /// 从 `level` 升到下一级所需经验
    pub fn xp_for_level(&self, level: u32) -> u32 {
        let exponent = level.saturating_sub(1) as i32;
        (self.xp_to_next_level as f32 * self.xp_scaling.powi(exponent)).floor() as u32
    }

    /// 从 1 级累计到 `level` 所需的总经验
    pub fn total_xp_for_level(&self, level: u32) -> u32 {
        (1..level).map(|l| self.xp_for_level(l)).sum()
    }

    /// 增加经验，返回提升的等级数
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let mut gained = 0;
        loop {
            let required = self.xp_for_level(self.level);
            if required == 0 || self.xp < required {
                break;
            }
            self.xp -= required;
            self.level += 1;
            gained += 1;
        }
        gained
    }

    /// 当前等级内的经验进度 [0, 1)
    pub fn xp_progress(&self) -> f32 {
        let required = self.xp_for_level(self.level);
        if required == 0 {
            return 0.0;
        }
        self.xp as f32 / required as f32
    }

    pub fn attack_power(&self) -> f32 {
        self.attack + (self.level - 1) as f32 * 2.0 + self.bonuses.damage
    }

    pub fn defense_rating(&self) -> f32 {
        self.defense + (self.level - 1) as f32 + self.bonuses.armor
    }

    /// 暴击率(百分点)
    pub fn crit_chance_percent(&self) -> f32 {
        self.crit_chance * 100.0 + self.bonuses.crit_chance
    }

    pub fn attack_range(&self) -> f32 {
        self.base_attack_range + self.bonuses.range
    }

    /// 护甲减免后的伤害（向下取整）
    pub fn damage_after_armor(&self, incoming: f32) -> f32 {
        let defense = self.defense_rating().max(0.0);
        let reduction = defense / (defense + ARMOR_DIVISOR);
        (incoming * (1.0 - reduction)).floor()
    }
}

impl StaminaPool for StatsComponent {
    fn stamina(&self) -> f32 {
        self.stamina
    }

    fn max_stamina(&self) -> f32 {
        self.max_stamina
    }

    fn drain(&mut self, amount: f32) {
        self.stamina = (self.stamina - amount).clamp(0.0, self.max_stamina);
    }
}

impl Default for StatsComponent {
    fn default() -> Self {
        Self::new(None, None, StatsConfig::default())
    }
}

impl Component for StatsComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Stats
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }
}
