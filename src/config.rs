//! 静态配置
//!
//! 所有键均为 camelCase，缺省键使用内置默认值。顶层某个表一旦出现在 JSON 中，
//! 就整体替换对应的内置表。

use crate::effects::{VfxTemplate, default_vfx_templates};
use crate::event_bus::EventBus;
use error::GameError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 资源节点类型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTypeConfig {
    /// 复活与破碎音效的后缀，如 `sfx_respawn_metal`
    pub sfx_suffix: String,
    /// 枯竭后的复活时间(秒)
    pub respawn_time: f32,
    pub max_health: f32,
}

impl Default for ResourceTypeConfig {
    fn default() -> Self {
        Self {
            sfx_suffix: "metal".to_string(),
            respawn_time: 30.0,
            max_health: 30.0,
        }
    }
}

fn always() -> f64 {
    1.0
}

fn one() -> u32 {
    1
}

/// 掉落表中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropConfig {
    pub item_id: String,
    /// 出现概率 [0, 1]
    #[serde(default = "always")]
    pub chance: f64,
    #[serde(default = "one")]
    pub min: u32,
    #[serde(default = "one")]
    pub max: u32,
}

impl DropConfig {
    pub fn new(item_id: &str, chance: f64, min: u32, max: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            chance,
            min,
            max,
        }
    }
}

/// 矿石类型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RockTypeConfig {
    pub durability: i32,
    pub drops: Vec<DropConfig>,
}

impl Default for RockTypeConfig {
    fn default() -> Self {
        Self {
            durability: 3,
            drops: Vec::new(),
        }
    }
}

/// 事件总线参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventBusConfig {
    pub history_size: usize,
    pub max_dispatch_depth: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_size: 100,
            max_dispatch_depth: 10,
        }
    }
}

impl EventBusConfig {
    pub fn build(&self) -> EventBus {
        EventBus::with_limits(self.history_size, self.max_dispatch_depth)
    }
}

/// 主循环参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameLoopConfig {
    /// 单帧 dt 上限(毫秒)，避免卡顿后一次性推进过多
    pub max_frame_dt_ms: f32,
    /// 自动保存间隔(秒)，0 表示关闭
    pub autosave_interval_secs: u64,
    pub save_dir: Option<PathBuf>,
    pub save_slots: usize,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            max_frame_dt_ms: 250.0,
            autosave_interval_secs: 0,
            save_dir: None,
            save_slots: 3,
        }
    }
}

/// 模拟核心的全部静态配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimConfig {
    pub resources: BTreeMap<String, ResourceTypeConfig>,
    pub rocks: BTreeMap<String, RockTypeConfig>,
    pub vfx_templates: BTreeMap<String, VfxTemplate>,
    pub event_bus: EventBusConfig,
    pub game_loop: GameLoopConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            resources: default_resources(),
            rocks: default_rocks(),
            vfx_templates: default_vfx_templates(),
            event_bus: EventBusConfig::default(),
            game_loop: GameLoopConfig::default(),
        }
    }
}

fn default_resources() -> BTreeMap<String, ResourceTypeConfig> {
    let mut resources = BTreeMap::new();
    resources.insert("scrap_metal".to_string(), ResourceTypeConfig::default());
    resources.insert(
        "wood".to_string(),
        ResourceTypeConfig {
            sfx_suffix: "wood".to_string(),
            ..Default::default()
        },
    );
    resources.insert(
        "stone".to_string(),
        ResourceTypeConfig {
            sfx_suffix: "stone".to_string(),
            respawn_time: 45.0,
            max_health: 50.0,
        },
    );
    resources
}

fn default_rocks() -> BTreeMap<String, RockTypeConfig> {
    let table = [
        ("stone", 3, vec![DropConfig::new("stone", 1.0, 1, 2)]),
        (
            "copper_ore",
            4,
            vec![
                DropConfig::new("copper_ore", 1.0, 1, 2),
                DropConfig::new("stone", 0.5, 1, 1),
            ],
        ),
        (
            "iron_ore",
            6,
            vec![
                DropConfig::new("iron_ore", 1.0, 1, 2),
                DropConfig::new("stone", 0.5, 1, 1),
            ],
        ),
        (
            "gold_ore",
            8,
            vec![
                DropConfig::new("gold_ore", 1.0, 1, 1),
                DropConfig::new("gemstone", 0.1, 1, 1),
            ],
        ),
    ];

    table
        .into_iter()
        .map(|(name, durability, drops)| (name.to_string(), RockTypeConfig { durability, drops }))
        .collect()
}

impl SimConfig {
    /// 解析 JSON 并校验
    pub fn from_json_str(json: &str) -> Result<Self, GameError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件读取配置
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!(
            "loaded config from {:?}: {} resource types, {} rock types",
            path,
            config.resources.len(),
            config.rocks.len()
        );
        Ok(config)
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<(), GameError> {
        for (name, rock) in &self.rocks {
            if rock.durability <= 0 {
                return Err(GameError::InvalidConfig(format!(
                    "rock '{}' has non-positive durability {}",
                    name, rock.durability
                )));
            }
            for drop in &rock.drops {
                if drop.min > drop.max {
                    return Err(GameError::InvalidConfig(format!(
                        "rock '{}' drop '{}' has min {} > max {}",
                        name, drop.item_id, drop.min, drop.max
                    )));
                }
                if !(0.0..=1.0).contains(&drop.chance) {
                    return Err(GameError::InvalidConfig(format!(
                        "rock '{}' drop '{}' chance {} outside [0, 1]",
                        name, drop.item_id, drop.chance
                    )));
                }
            }
        }

        for (name, resource) in &self.resources {
            if resource.max_health <= 0.0 || resource.respawn_time < 0.0 {
                return Err(GameError::InvalidConfig(format!(
                    "resource '{}' needs positive maxHealth and non-negative respawnTime",
                    name
                )));
            }
        }

        let cap = self.game_loop.max_frame_dt_ms;
        if cap.is_nan() || cap <= 0.0 {
            return Err(GameError::InvalidConfig(
                "gameLoop.maxFrameDtMs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// 资源类型配置；未登记的类型使用默认值
    pub fn resource(&self, resource_type: &str) -> ResourceTypeConfig {
        self.resources
            .get(resource_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn rock(&self, rock_type: &str) -> Option<&RockTypeConfig> {
        self.rocks.get(rock_type)
    }
}
