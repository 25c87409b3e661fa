//! 行为组件
//!
//! 每个组件只属于一个实体，通过 `ComponentBase` 持有非拥有的父实体句柄和共享事件总线。
//! 组件之间不直接引用；需要兄弟组件时由 `GameWorld` 显式查询后传入。

pub mod ai;
pub mod combat;
pub mod health;
pub mod inventory;
pub mod stats;

pub use ai::{AIComponent, AiConfig, AiState, Heading};
pub use combat::{CombatComponent, CombatConfig};
pub use health::{HealthComponent, HealthConfig};
pub use inventory::{CapacityPolicy, InventoryComponent, InventoryConfig};
pub use stats::{StaminaPool, StatBonuses, StatsComponent, StatsConfig};

use crate::event_bus::{EntityId, EventBus, GameEvent};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// 组件回指父实体的非拥有链接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentLink {
    pub entity: EntityId,
    /// 父实体是否为英雄（发布 UI 事件）
    pub emits_ui_events: bool,
}

impl ParentLink {
    pub fn new(entity: EntityId, emits_ui_events: bool) -> Self {
        Self {
            entity,
            emits_ui_events,
        }
    }
}

/// 组件类型名
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum ComponentKind {
    #[strum(serialize = "HealthComponent")]
    Health,
    #[strum(serialize = "StatsComponent")]
    Stats,
    #[strum(serialize = "CombatComponent")]
    Combat,
    #[strum(serialize = "InventoryComponent")]
    Inventory,
    #[strum(serialize = "AIComponent")]
    Ai,
}

/// 所有组件共享的状态
#[derive(Clone)]
pub struct ComponentBase {
    parent: Option<ParentLink>,
    active: bool,
    bus: Option<Arc<EventBus>>,
}

impl ComponentBase {
    pub fn new(parent: Option<ParentLink>, bus: Option<Arc<EventBus>>) -> Self {
        Self {
            parent,
            active: true,
            bus,
        }
    }

    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.parent.map(|link| link.entity)
    }

    /// 父实体是否发布 UI 事件
    pub fn is_hero(&self) -> bool {
        self.parent.is_some_and(|link| link.emits_ui_events)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn bus(&self) -> Option<&Arc<EventBus>> {
        self.bus.as_ref()
    }

    /// 挂接到实体；已有总线时保留原总线
    pub fn bind(&mut self, parent: ParentLink, bus: Arc<EventBus>) {
        self.parent = Some(parent);
        if self.bus.is_none() {
            self.bus = Some(bus);
        }
    }

    /// 发布事件；已脱离父实体或没有总线时什么也不做
    pub fn emit(&self, event: GameEvent) {
        if self.parent.is_none() {
            return;
        }
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }

    /// 仅当父实体是英雄时发布
    pub fn emit_for_hero(&self, event: GameEvent) {
        if self.is_hero() {
            self.emit(event);
        }
    }

    fn detach(&mut self) -> Option<ParentLink> {
        self.parent.take()
    }
}

impl Default for ComponentBase {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("parent", &self.parent)
            .field("active", &self.active)
            .field("bus", &self.bus.is_some())
            .finish()
    }
}

/// 剩余时间(秒)不超过该值即视为到期，逐帧累减的浮点残差不会拖出额外一帧
pub const TIMER_EPSILON_SECS: f32 = 1e-4;

/// 以秒计的倒计时按帧推进 `dt_ms` 毫秒；到期时归零并返回 true
pub fn count_down_secs(timer: &mut f32, dt_ms: f32) -> bool {
    if *timer > 0.0 {
        *timer -= dt_ms / 1000.0;
    }
    if *timer <= TIMER_EPSILON_SECS {
        *timer = 0.0;
        return true;
    }
    false
}

/// 组件生命周期约定
pub trait Component: Send + Sync + 'static {
    fn kind(&self) -> ComponentKind;

    fn base(&self) -> &ComponentBase;

    fn base_mut(&mut self) -> &mut ComponentBase;

    /// 挂接后、首次 update 前调用一次
    fn init(&mut self) {}

    /// 每帧调用，`dt_ms` 为毫秒
    fn update(&mut self, _dt_ms: f32) {}

    /// 断开父实体链接；可重复调用
    fn destroy(&mut self) {
        if let Some(link) = self.base_mut().detach() {
            debug!("{} detached from entity {}", self.kind(), link.entity);
        }
    }

    fn is_active(&self) -> bool {
        self.base().is_active()
    }

    fn set_active(&mut self, active: bool) {
        self.base_mut().set_active(active);
    }

    fn parent(&self) -> Option<ParentLink> {
        self.base().parent()
    }
}
