//! 可采集资源节点：采集、枯竭与定时复活
//!
//! 节点从不销毁，枯竭后倒计时结束即恢复满值，并请求复活音效与特效。

use super::{System, SystemResult};
use crate::components::count_down_secs;
use crate::config::ResourceTypeConfig;
use crate::ecs::{EntityTag, GameWorld, Position};
use crate::effects::{Effects, RESOURCE_RESPAWN_FX};
use hecs::Entity;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    #[default]
    Ready,
    Depleted,
}

/// 挂在资源实体上的节点状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub resource_type: String,
    pub state: ResourceState,
    pub health: f32,
    pub max_health: f32,
    /// 剩余复活时间(秒)
    pub respawn_timer: f32,
    pub respawn_time: f32,
    pub active: bool,
}

impl ResourceNode {
    pub fn new(resource_type: &str, config: &ResourceTypeConfig) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            state: ResourceState::Ready,
            health: config.max_health,
            max_health: config.max_health,
            respawn_timer: 0.0,
            respawn_time: config.respawn_time,
            active: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ResourceState::Ready
    }
}

/// 资源节点系统
#[derive(Debug, Clone, Default)]
pub struct ResourceSystem {
    effects: Effects,
}

impl ResourceSystem {
    pub fn new(effects: Effects) -> Self {
        Self { effects }
    }

    /// 推进所有枯竭节点的复活倒计时
    pub fn update(&self, world: &mut GameWorld, dt_ms: f32) {
        let mut due = Vec::new();
        for (entity, (tag, node)) in world.world.query_mut::<(&EntityTag, &mut ResourceNode)>() {
            if !tag.active || !node.active || node.state != ResourceState::Depleted {
                continue;
            }
            if count_down_secs(&mut node.respawn_timer, dt_ms) {
                due.push(entity);
            }
        }

        for entity in due {
            self.respawn(world, entity);
        }
    }

    /// 立即复活节点；实体没有资源节点时返回 false
    pub fn respawn(&self, world: &mut GameWorld, entity: Entity) -> bool {
        let resource_type = {
            let Ok(mut node) = world.world.get::<&mut ResourceNode>(entity) else {
                return false;
            };
            node.state = ResourceState::Ready;
            node.health = node.max_health;
            node.respawn_timer = 0.0;
            node.resource_type.clone()
        };

        let suffix = world.config().resource(&resource_type).sfx_suffix;
        self.effects.play_sfx(&format!("sfx_respawn_{}", suffix));
        if let Some(Position { x, y }) = world.position(entity) {
            self.effects.play_vfx(RESOURCE_RESPAWN_FX, x, y);
        }

        debug!("{} node {:?} respawned", resource_type, entity);
        true
    }

    /// 对节点造成采集伤害；本次采集使节点枯竭（产出战利品）时返回 true
    pub fn harvest(&self, world: &mut GameWorld, entity: Entity, damage: f32) -> bool {
        let suffix = {
            let Ok(node) = world.world.get::<&ResourceNode>(entity) else {
                return false;
            };
            if !node.active || !node.is_ready() {
                return false;
            }
            world.config().resource(&node.resource_type).sfx_suffix
        };

        let Ok(mut node) = world.world.get::<&mut ResourceNode>(entity) else {
            return false;
        };
        self.effects
            .play_sfx(&format!("sfx_mine_{}", node.resource_type));

        node.health -= damage;
        if node.health > 0.0 {
            return false;
        }

        self.effects
            .play_sfx(&format!("sfx_resource_break_{}", suffix));
        node.health = 0.0;
        node.state = ResourceState::Depleted;
        node.respawn_timer = node.respawn_time;
        debug!("{} node {:?} depleted", node.resource_type, entity);
        true
    }
}

impl System for ResourceSystem {
    fn name(&self) -> &str {
        "ResourceSystem"
    }

    fn run(&mut self, world: &mut GameWorld, dt_ms: f32) -> SystemResult {
        self.update(world, dt_ms);
        SystemResult::Continue
    }
}
