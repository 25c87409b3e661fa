//! 世界状态系统
//!
//! 系统在实体更新之后按注册顺序运行，各自维护一部分世界状态。

pub mod ai;
pub mod mining;
pub mod resource;

pub use ai::{AggroLeashPolicy, AiContext, AiPolicy, AiSystem};
pub use mining::{ItemDrop, Mining, Rock};
pub use resource::{ResourceNode, ResourceState, ResourceSystem};

use crate::ecs::GameWorld;

#[derive(Debug, Clone, PartialEq)]
pub enum SystemResult {
    Continue,
    Stop,
    Error(String),
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(&mut self, world: &mut GameWorld, dt_ms: f32) -> SystemResult;
}
