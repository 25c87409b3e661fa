//! `GameWorld` / `Mining` 与存档快照之间的转换

use crate::components::{
    AIComponent, CombatComponent, Component, ComponentKind, HealthComponent, InventoryComponent,
    StatsComponent,
};
use crate::ecs::{EntityKind, EntityTag, GameWorld, Position, SpawnPoint};
use crate::event_bus::EntityId;
use crate::systems::mining::Mining;
use crate::systems::resource::ResourceNode;
use error::GameError;
use hecs::Entity;
use log::{info, warn};
use save::{ComponentRecord, EntitySnapshot, RockSnapshot};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::str::FromStr;

/// 资源节点在快照中的类型名
pub const RESOURCE_NODE_KIND: &str = "ResourceNode";

fn record<C: Component + Serialize>(
    world: &GameWorld,
    entity: Entity,
    records: &mut Vec<ComponentRecord>,
) -> Result<(), GameError> {
    if let Some(component) = world.get::<C>(entity) {
        records.push(ComponentRecord {
            kind: component.kind().to_string(),
            active: component.is_active(),
            state: serde_json::to_string(&*component)?,
        });
    }
    Ok(())
}

/// 导出所有实体，按编号排序
pub fn snapshot_entities(world: &GameWorld) -> Result<Vec<EntitySnapshot>, GameError> {
    let entities: Vec<(Entity, EntityTag)> = world
        .world
        .query::<&EntityTag>()
        .iter()
        .map(|(entity, tag)| (entity, tag.clone()))
        .collect();

    let mut snapshots = Vec::with_capacity(entities.len());
    for (entity, tag) in entities {
        let mut components = Vec::new();
        record::<HealthComponent>(world, entity, &mut components)?;
        record::<StatsComponent>(world, entity, &mut components)?;
        record::<CombatComponent>(world, entity, &mut components)?;
        record::<InventoryComponent>(world, entity, &mut components)?;
        record::<AIComponent>(world, entity, &mut components)?;
        if let Ok(node) = world.world.get::<&ResourceNode>(entity) {
            components.push(ComponentRecord {
                kind: RESOURCE_NODE_KIND.to_string(),
                active: node.active,
                state: serde_json::to_string(&*node)?,
            });
        }

        snapshots.push(EntitySnapshot {
            id: EntityId::from(entity).0,
            kind: tag.kind.to_string(),
            name: tag.id,
            emits_ui_events: tag.emits_ui_events,
            active: tag.active,
            position: world.position(entity).map(|p| (p.x, p.y)),
            spawn_point: world
                .world
                .get::<&SpawnPoint>(entity)
                .ok()
                .map(|s| (s.0.x, s.0.y)),
            components,
        });
    }

    snapshots.sort_by_key(|s| s.id);
    Ok(snapshots)
}

/// 导出矿石，按坐标排序
pub fn snapshot_rocks(mining: &Mining) -> Vec<RockSnapshot> {
    let mut rocks: Vec<RockSnapshot> = mining
        .rocks()
        .map(|((x, y), rock)| RockSnapshot {
            x,
            y,
            kind: rock.rock_type.clone(),
            durability: rock.durability,
            max_durability: rock.max_durability,
        })
        .collect();
    rocks.sort_by_key(|r| (r.x, r.y));
    rocks
}

fn restore_component<C: Component + DeserializeOwned>(
    world: &mut GameWorld,
    entity: Entity,
    record: &ComponentRecord,
) -> Result<(), GameError> {
    let mut component: C = serde_json::from_str(&record.state)?;
    component.set_active(record.active);
    world.attach(entity, component)
}

/// 清空世界并按快照重建实体；返回存档编号到新句柄的映射
pub fn restore_entities(
    world: &mut GameWorld,
    snapshots: &[EntitySnapshot],
) -> Result<HashMap<u64, Entity>, GameError> {
    world.clear();
    let mut handles = HashMap::with_capacity(snapshots.len());

    for snapshot in snapshots {
        let kind = EntityKind::from_str(&snapshot.kind)
            .map_err(|_| GameError::DeserializationError(format!("unknown entity kind {}", snapshot.kind)))?;
        let tag = EntityTag {
            id: snapshot.name.clone(),
            kind,
            emits_ui_events: snapshot.emits_ui_events,
            active: snapshot.active,
        };
        let entity = world.world.spawn((tag,));
        if let Some((x, y)) = snapshot.position {
            let _ = world.world.insert_one(entity, Position::new(x, y));
        }
        if let Some((x, y)) = snapshot.spawn_point {
            let _ = world.world.insert_one(entity, SpawnPoint(Position::new(x, y)));
        }

        for record in &snapshot.components {
            if record.kind == RESOURCE_NODE_KIND {
                let node: ResourceNode = serde_json::from_str(&record.state)?;
                let _ = world.world.insert_one(entity, node);
                continue;
            }
            match ComponentKind::from_str(&record.kind) {
                Ok(ComponentKind::Health) => restore_component::<HealthComponent>(world, entity, record)?,
                Ok(ComponentKind::Stats) => restore_component::<StatsComponent>(world, entity, record)?,
                Ok(ComponentKind::Combat) => restore_component::<CombatComponent>(world, entity, record)?,
                Ok(ComponentKind::Inventory) => {
                    restore_component::<InventoryComponent>(world, entity, record)?
                }
                Ok(ComponentKind::Ai) => restore_component::<AIComponent>(world, entity, record)?,
                Err(_) => warn!("skipping unknown component {} on {}", record.kind, snapshot.name),
            }
        }

        handles.insert(snapshot.id, entity);
    }

    // AI 目标仍指向旧句柄，换成新句柄
    for (_, ai) in world.world.query_mut::<&mut AIComponent>() {
        ai.target = ai
            .target
            .and_then(|old| handles.get(&old.0))
            .map(|&entity| EntityId::from(entity));
    }

    info!("restored {} entities", handles.len());
    Ok(handles)
}

/// 清空矿石表并按快照放回
pub fn restore_rocks(mining: &mut Mining, rocks: &[RockSnapshot]) {
    mining.clear();
    for rock in rocks {
        mining.restore_rock(rock.x, rock.y, &rock.kind, rock.durability, rock.max_durability);
    }
}
