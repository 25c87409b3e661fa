//! ECS 组合层
//!
//! `GameWorld` 在 `hecs::World` 之上维护实体标签、位置和行为组件，负责：
//! - 按模板生成实体并挂接组件（绑定父实体与事件总线，调用 `init`）
//! - 每帧按固定顺序更新所有活跃实体的活跃组件
//! - 销毁实体前逐个销毁其组件

use crate::components::{
    AIComponent, AiConfig, AiState, CombatComponent, CombatConfig, Component, HealthComponent,
    HealthConfig, InventoryComponent, InventoryConfig, ParentLink, StaminaPool, StatsComponent,
    StatsConfig,
};
use crate::config::SimConfig;
use crate::event_bus::{EntityId, EventBus};
use crate::systems::resource::ResourceNode;
use error::GameError;
use hecs::{Entity, World};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};

/// 二维世界坐标
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 实体的出生点（AI 脱战后返回的位置）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint(pub Position);

/// 实体类别
#[derive(
    Clone,
    Copy,
    Debug,
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
pub enum EntityKind {
    Hero,
    #[default]
    Creature,
    Enemy,
    Boss,
    Npc,
    Resource,
    Item,
    Equipment,
}

/// 每个实体都带有的标签
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityTag {
    pub id: String,
    pub kind: EntityKind,
    /// 英雄标记：组件据此发布 UI 事件
    pub emits_ui_events: bool,
    pub active: bool,
}

impl EntityTag {
    pub fn link(&self, entity: Entity) -> ParentLink {
        ParentLink::new(EntityId::from(entity), self.emits_ui_events)
    }
}

/// 实体模板：类别基础模板与定义覆盖项深度合并后的结果
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityTemplate {
    pub id: String,
    pub kind: EntityKind,
    pub emits_ui_events: bool,
    pub x: f32,
    pub y: f32,
    pub health: Option<HealthConfig>,
    pub stats: Option<StatsConfig>,
    pub combat: Option<CombatConfig>,
    pub inventory: Option<InventoryConfig>,
    pub ai: Option<AiConfig>,
    /// 资源节点类型
    pub resource: Option<String>,
}

impl EntityTemplate {
    /// 各类别的基础模板
    pub fn base(kind: EntityKind) -> Self {
        let blank = Self {
            id: kind.to_string().to_lowercase(),
            kind,
            ..Default::default()
        };

        match kind {
            EntityKind::Hero => Self {
                emits_ui_events: true,
                health: Some(HealthConfig::default()),
                stats: Some(StatsConfig::default()),
                combat: Some(CombatConfig {
                    stamina_cost: 5.0,
                    ..Default::default()
                }),
                inventory: Some(InventoryConfig::default()),
                ..blank
            },
            EntityKind::Creature => Self {
                health: Some(HealthConfig {
                    max_health: 60.0,
                    health: None,
                }),
                stats: Some(StatsConfig {
                    speed: 80.0,
                    ..Default::default()
                }),
                ai: Some(AiConfig::default()),
                inventory: Some(InventoryConfig::default()),
                ..blank
            },
            EntityKind::Enemy => Self {
                health: Some(HealthConfig {
                    max_health: 80.0,
                    health: None,
                }),
                stats: Some(StatsConfig::default()),
                combat: Some(CombatConfig {
                    damage: 12.0,
                    ..Default::default()
                }),
                ai: Some(AiConfig::default()),
                ..blank
            },
            EntityKind::Boss => Self {
                health: Some(HealthConfig {
                    max_health: 500.0,
                    health: None,
                }),
                stats: Some(StatsConfig {
                    defense: 10.0,
                    ..Default::default()
                }),
                combat: Some(CombatConfig {
                    damage: 30.0,
                    rate: 0.5,
                    range: 150.0,
                    stamina_cost: 0.0,
                }),
                ai: Some(AiConfig {
                    aggro_range: 300.0,
                    leash_distance: 800.0,
                    attack_range: 150.0,
                    ..Default::default()
                }),
                ..blank
            },
            EntityKind::Npc => Self {
                health: Some(HealthConfig::default()),
                ai: Some(AiConfig {
                    state: AiState::Idle,
                    ..Default::default()
                }),
                inventory: Some(InventoryConfig::default()),
                ..blank
            },
            EntityKind::Resource => Self {
                resource: Some("scrap_metal".to_string()),
                ..blank
            },
            EntityKind::Item | EntityKind::Equipment => blank,
        }
    }

    /// 在本模板上深度合并覆盖项；覆盖项中的 `null` 会移除对应组件
    pub fn merged(&self, overrides: &Value) -> Result<Self, GameError> {
        let mut value = serde_json::to_value(self)?;
        merge_json(&mut value, overrides);
        Ok(serde_json::from_value(value)?)
    }

    /// 按类别基础模板合并定义
    pub fn from_definition(kind: EntityKind, overrides: &Value) -> Result<Self, GameError> {
        Self::base(kind).merged(overrides)
    }
}

/// 对象逐键递归合并，其余值直接替换
pub fn merge_json(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_json(existing, value);
                    }
                    _ => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overrides) => *base = overrides.clone(),
    }
}

/// 模拟世界
pub struct GameWorld {
    pub world: World,
    bus: Arc<EventBus>,
    config: Arc<SimConfig>,
}

impl GameWorld {
    pub fn new(config: Arc<SimConfig>) -> Self {
        let bus = Arc::new(config.event_bus.build());
        Self::with_bus(config, bus)
    }

    pub fn with_bus(config: Arc<SimConfig>, bus: Arc<EventBus>) -> Self {
        Self {
            world: World::new(),
            bus,
            config,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &Arc<SimConfig> {
        &self.config
    }

    /// 按模板生成实体并挂接模板中声明的全部组件
    pub fn spawn(&mut self, template: &EntityTemplate) -> Entity {
        let position = Position::new(template.x, template.y);
        let tag = EntityTag {
            id: template.id.clone(),
            kind: template.kind,
            emits_ui_events: template.emits_ui_events,
            active: true,
        };
        let entity = self.world.spawn((tag.clone(), position, SpawnPoint(position)));
        let link = tag.link(entity);
        let bus = Some(Arc::clone(&self.bus));

        if let Some(config) = &template.health {
            self.insert_component(entity, HealthComponent::new(Some(link), bus.clone(), config.clone()));
        }
        if let Some(config) = &template.stats {
            self.insert_component(entity, StatsComponent::new(Some(link), bus.clone(), config.clone()));
        }
        if let Some(config) = &template.combat {
            self.insert_component(entity, CombatComponent::new(Some(link), bus.clone(), config.clone()));
        }
        if let Some(config) = &template.inventory {
            self.insert_component(
                entity,
                InventoryComponent::new(Some(link), bus.clone(), config.clone()),
            );
        }
        if let Some(config) = &template.ai {
            self.insert_component(entity, AIComponent::new(Some(link), bus, config.clone()));
        }
        if let Some(resource_type) = &template.resource {
            let node = ResourceNode::new(resource_type, &self.config.resource(resource_type));
            let _ = self.world.insert_one(entity, node);
        }

        debug!("spawned {} '{}' as {:?}", template.kind, template.id, entity);
        entity
    }

    /// 合并定义后生成实体
    pub fn spawn_from_definition(
        &mut self,
        kind: EntityKind,
        overrides: &Value,
    ) -> Result<Entity, GameError> {
        let template = EntityTemplate::from_definition(kind, overrides)?;
        Ok(self.spawn(&template))
    }

    fn insert_component<C: Component>(&mut self, entity: Entity, mut component: C) {
        component.init();
        // 实体刚生成，插入不会失败
        let _ = self.world.insert_one(entity, component);
    }

    /// 把组件挂到已有实体上，替换同类型的旧组件
    pub fn attach<C: Component>(&mut self, entity: Entity, mut component: C) -> Result<(), GameError> {
        let link = self.tag(entity)?.link(entity);
        component.base_mut().bind(link, Arc::clone(&self.bus));
        self.detach::<C>(entity);
        component.init();
        self.world
            .insert_one(entity, component)
            .map_err(|_| GameError::NoSuchEntity(EntityId::from(entity).0))?;
        debug!("attached {} to {:?}", std::any::type_name::<C>(), entity);
        Ok(())
    }

    /// 卸下组件：销毁后交还给调用方
    pub fn detach<C: Component>(&mut self, entity: Entity) -> Option<C> {
        let mut component = self.world.remove_one::<C>(entity).ok()?;
        component.destroy();
        Some(component)
    }

    pub fn tag(&self, entity: Entity) -> Result<EntityTag, GameError> {
        self.world
            .get::<&EntityTag>(entity)
            .map(|tag| (*tag).clone())
            .map_err(|_| GameError::NoSuchEntity(EntityId::from(entity).0))
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<hecs::Ref<'_, C>> {
        self.world.get::<&C>(entity).ok()
    }

    pub fn get_mut<C: Component>(&self, entity: Entity) -> Option<hecs::RefMut<'_, C>> {
        self.world.get::<&mut C>(entity).ok()
    }

    /// 必需组件查询，缺失时给出具体错误
    pub fn require<C: Component>(&self, entity: Entity) -> Result<hecs::RefMut<'_, C>, GameError> {
        if !self.world.contains(entity) {
            return Err(GameError::NoSuchEntity(EntityId::from(entity).0));
        }
        self.world
            .get::<&mut C>(entity)
            .map_err(|_| GameError::MissingComponent {
                entity: EntityId::from(entity).0,
                component: short_type_name::<C>(),
            })
    }

    pub fn position(&self, entity: Entity) -> Option<Position> {
        self.world.get::<&Position>(entity).ok().map(|p| *p)
    }

    pub fn set_position(&mut self, entity: Entity, position: Position) -> Result<(), GameError> {
        let mut current = self
            .world
            .get::<&mut Position>(entity)
            .map_err(|_| GameError::NoSuchEntity(EntityId::from(entity).0))?;
        *current = position;
        Ok(())
    }

    pub fn set_entity_active(&mut self, entity: Entity, active: bool) -> Result<(), GameError> {
        let mut tag = self
            .world
            .get::<&mut EntityTag>(entity)
            .map_err(|_| GameError::NoSuchEntity(EntityId::from(entity).0))?;
        tag.active = active;
        Ok(())
    }

    /// 按标签 id 查找第一个匹配的实体
    pub fn find_by_id(&self, id: &str) -> Option<Entity> {
        self.world
            .query::<&EntityTag>()
            .iter()
            .find(|(_, tag)| tag.id == id)
            .map(|(entity, _)| entity)
    }

    /// 第一个发布 UI 事件的实体
    pub fn hero(&self) -> Option<Entity> {
        self.world
            .query::<&EntityTag>()
            .iter()
            .find(|(_, tag)| tag.emits_ui_events)
            .map(|(entity, _)| entity)
    }

    pub fn entity_count(&self) -> u32 {
        self.world.len()
    }

    /// 每帧更新：跳过非活跃实体与非活跃组件，
    /// 组件顺序固定为 Health、Stats、Combat、Inventory、AI
    pub fn update(&mut self, dt_ms: f32) {
        for (_entity, (tag, health, stats, combat, inventory, ai)) in self.world.query_mut::<(
            &EntityTag,
            Option<&mut HealthComponent>,
            Option<&mut StatsComponent>,
            Option<&mut CombatComponent>,
            Option<&mut InventoryComponent>,
            Option<&mut AIComponent>,
        )>() {
            if !tag.active {
                continue;
            }
            tick(health, dt_ms);
            tick(stats, dt_ms);
            tick(combat, dt_ms);
            tick(inventory, dt_ms);
            tick(ai, dt_ms);
        }
    }

    /// 让实体发起攻击，属性组件作为体力池参与
    pub fn attack(&mut self, entity: Entity) -> bool {
        let Ok((combat, stats)) = self
            .world
            .query_one_mut::<(&mut CombatComponent, Option<&mut StatsComponent>)>(entity)
        else {
            return false;
        };
        if !combat.is_active() {
            return false;
        }
        combat.attack(stats.map(|s| s as &mut dyn StaminaPool))
    }

    /// 销毁实体：先逐个销毁组件再移除
    pub fn despawn(&mut self, entity: Entity) -> Result<(), GameError> {
        if !self.world.contains(entity) {
            return Err(GameError::NoSuchEntity(EntityId::from(entity).0));
        }
        self.detach::<HealthComponent>(entity);
        self.detach::<StatsComponent>(entity);
        self.detach::<CombatComponent>(entity);
        self.detach::<InventoryComponent>(entity);
        self.detach::<AIComponent>(entity);

        self.world
            .despawn(entity)
            .map_err(|_| GameError::NoSuchEntity(EntityId::from(entity).0))?;
        debug!("despawned {:?}", entity);
        Ok(())
    }

    /// 清空世界（读档前使用），所有组件都会先被销毁
    pub fn clear(&mut self) {
        let entities: Vec<Entity> = self.world.iter().map(|e| e.entity()).collect();
        for entity in entities {
            let _ = self.despawn(entity);
        }
        info!("world cleared");
    }
}

impl Default for GameWorld {
    fn default() -> Self {
        Self::new(Arc::new(SimConfig::default()))
    }
}

fn tick<C: Component>(component: Option<&mut C>, dt_ms: f32) {
    if let Some(component) = component {
        if component.is_active() {
            component.update(dt_ms);
        }
    }
}

fn short_type_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    full.rsplit("::").next().unwrap_or(full)
}
