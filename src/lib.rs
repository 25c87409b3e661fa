//! 侏罗纪骑士：山谷 的实体-组件模拟核心
//!
//! 事件总线、行为组件、实体组合层与世界状态系统，渲染、音频与界面只通过事件和
//! 协作方 trait 接入。

pub mod components;
pub mod config;
pub mod ecs;
pub mod effects;
pub mod event_bus;
pub mod game_loop;
pub mod logging;
pub mod persistence;
pub mod systems;

pub use error::{GameError, handle_error};
pub use save;

pub use components::{
    AIComponent, AiState, CapacityPolicy, CombatComponent, Component, ComponentKind,
    HealthComponent, InventoryComponent, ParentLink, StaminaPool, StatsComponent,
};
pub use config::SimConfig;
pub use ecs::{EntityKind, EntityTag, EntityTemplate, GameWorld, Position, SpawnPoint};
pub use effects::{AudioSink, Effects, VfxRegistry, VfxSink, VfxTemplate};
pub use event_bus::{EntityId, EventBus, GameEvent, ListenerId};
pub use game_loop::GameLoop;
pub use systems::{AiSystem, ItemDrop, Mining, ResourceSystem, System, SystemResult};
