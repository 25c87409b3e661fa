//! AI 状态容器
//!
//! 只保存状态与计时器，决策逻辑在 `systems::ai`。

use super::{Component, ComponentBase, ComponentKind, ParentLink};
use crate::ecs::Position;
use crate::event_bus::{EntityId, EventBus};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};

/// AI 行为状态
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiState {
    Idle,
    #[default]
    Wander,
    Chase,
    Attack,
    Flee,
}

/// 单位方向向量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub x: f32,
    pub y: f32,
}

impl Default for Heading {
    fn default() -> Self {
        Self { x: 1.0, y: 0.0 }
    }
}

/// AI 组件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    pub state: AiState,
    pub wander_interval_min: f32,
    pub wander_interval_max: f32,
    pub aggro_range: f32,
    pub leash_distance: f32,
    pub attack_range: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            state: AiState::Wander,
            wander_interval_min: 2000.0,
            wander_interval_max: 5000.0,
            aggro_range: 200.0,
            leash_distance: 500.0,
            attack_range: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIComponent {
    #[serde(skip)]
    base: ComponentBase,
    state: AiState,
    previous_state: Option<AiState>,
    pub wander_direction: Heading,
    /// 距下次换向的剩余时间(毫秒)
    pub wander_timer: f32,
    pub wander_interval_min: f32,
    pub wander_interval_max: f32,
    pub target: Option<EntityId>,
    pub combat_cooldown: f32,
    pub aggro_range: f32,
    pub leash_distance: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub attack_windup: f32,
    pub is_attacking: bool,
}

impl AIComponent {
    pub fn new(parent: Option<ParentLink>, bus: Option<Arc<EventBus>>, config: AiConfig) -> Self {
        Self {
            base: ComponentBase::new(parent, bus),
            state: config.state,
            previous_state: None,
            wander_direction: Heading::default(),
            wander_timer: 0.0,
            wander_interval_min: config.wander_interval_min,
            wander_interval_max: config.wander_interval_max.max(config.wander_interval_min),
            target: None,
            combat_cooldown: 0.0,
            aggro_range: config.aggro_range,
            leash_distance: config.leash_distance,
            attack_range: config.attack_range,
            attack_cooldown: 0.0,
            attack_windup: 0.0,
            is_attacking: false,
        }
    }

    pub fn state(&self) -> AiState {
        self.state
    }

    pub fn previous_state(&self) -> Option<AiState> {
        self.previous_state
    }

    /// 切换状态并记录前一状态；与当前状态相同时不做任何事
    pub fn set_state(&mut self, new_state: AiState) {
        if self.state == new_state {
            return;
        }
        self.previous_state = Some(self.state);
        self.state = new_state;
    }

    /// 随机选择新的游荡方向与持续时间
    pub fn randomize_wander<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let angle = rng.random_range(0.0..TAU);
        self.wander_direction = Heading {
            x: angle.cos(),
            y: angle.sin(),
        };
        self.wander_timer = if self.wander_interval_max > self.wander_interval_min {
            rng.random_range(self.wander_interval_min..self.wander_interval_max)
        } else {
            self.wander_interval_min
        };
    }

    pub fn can_aggro(&self, position: &Position, target: &Position) -> bool {
        position.distance_to(target) <= self.aggro_range
    }

    pub fn should_leash(&self, position: &Position, spawn: &Position) -> bool {
        position.distance_to(spawn) > self.leash_distance
    }

    pub fn in_attack_range(&self, position: &Position, target: &Position) -> bool {
        position.distance_to(target) <= self.attack_range
    }
}

fn count_down(timer: &mut f32, dt_ms: f32) {
    if *timer > 0.0 {
        *timer = (*timer - dt_ms).max(0.0);
    }
}

impl Default for AIComponent {
    fn default() -> Self {
        Self::new(None, None, AiConfig::default())
    }
}

impl Component for AIComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Ai
    }

    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn update(&mut self, dt_ms: f32) {
        count_down(&mut self.wander_timer, dt_ms);
        count_down(&mut self.combat_cooldown, dt_ms);
        count_down(&mut self.attack_cooldown, dt_ms);
    }
}
