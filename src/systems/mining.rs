//! 采矿网格：按格子坐标存放可破坏的矿石，破坏时按掉落表掷骰
//!
//! 矿石被破坏后直接移除，不会复活。

use super::{System, SystemResult};
use crate::config::{RockTypeConfig, SimConfig};
use crate::ecs::GameWorld;
use error::GameError;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 未登记矿石类型的耐久
pub const DEFAULT_DURABILITY: i32 = 3;

/// `strike` 使用的默认力度
pub const DEFAULT_POWER: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rock {
    pub rock_type: String,
    pub durability: i32,
    pub max_durability: i32,
}

/// 一次掉落
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item_id: String,
    pub quantity: u32,
}

pub struct Mining {
    rocks: HashMap<(i32, i32), Rock>,
    catalog: BTreeMap<String, RockTypeConfig>,
    rng: Pcg32,
}

impl Mining {
    /// 使用随机种子
    pub fn new(config: &SimConfig) -> Self {
        Self::from_rng(config, Pcg32::from_rng(&mut rand::rng()))
    }

    /// 使用固定种子，掉落结果可复现
    pub fn with_seed(config: &SimConfig, seed: u64) -> Self {
        Self::from_rng(config, Pcg32::seed_from_u64(seed))
    }

    fn from_rng(config: &SimConfig, rng: Pcg32) -> Self {
        Self {
            rocks: HashMap::new(),
            catalog: config.rocks.clone(),
            rng,
        }
    }

    /// 在格子上放置矿石，已有矿石会被替换
    pub fn spawn_rock(&mut self, x: i32, y: i32, rock_type: &str) -> &Rock {
        let durability = self
            .catalog
            .get(rock_type)
            .map_or(DEFAULT_DURABILITY, |config| config.durability);
        self.restore_rock(x, y, rock_type, durability, durability)
    }

    /// 按存档数据放回矿石
    pub fn restore_rock(
        &mut self,
        x: i32,
        y: i32,
        rock_type: &str,
        durability: i32,
        max_durability: i32,
    ) -> &Rock {
        let rock = Rock {
            rock_type: rock_type.to_string(),
            durability,
            max_durability,
        };
        self.rocks.insert((x, y), rock);
        &self.rocks[&(x, y)]
    }

    /// 敲击格子上的矿石
    ///
    /// 没有矿石或矿石未被破坏时返回 `None`；破坏时移除矿石并返回掉落。
    pub fn hit(&mut self, x: i32, y: i32, power: u32) -> Option<Vec<ItemDrop>> {
        let rock = self.rocks.get_mut(&(x, y))?;
        let power = i32::try_from(power).unwrap_or(i32::MAX);
        rock.durability = rock.durability.saturating_sub(power);
        if rock.durability > 0 {
            return None;
        }

        let rock = self.rocks.remove(&(x, y))?;
        let drops = self.roll_drops(&rock);
        debug!(
            "{} at ({}, {}) broke, {} drop(s)",
            rock.rock_type,
            x,
            y,
            drops.len()
        );
        Some(drops)
    }

    pub fn strike(&mut self, x: i32, y: i32) -> Option<Vec<ItemDrop>> {
        self.hit(x, y, DEFAULT_POWER)
    }

    /// 每个掉落项独立判定是否出现，数量在 [min, max] 内均匀取整
    pub fn roll_drops(&mut self, rock: &Rock) -> Vec<ItemDrop> {
        let Some(config) = self.catalog.get(&rock.rock_type) else {
            return Vec::new();
        };

        let mut drops = Vec::new();
        for entry in &config.drops {
            let chance = entry.chance.clamp(0.0, 1.0);
            if chance < 1.0 && !self.rng.random_bool(chance) {
                continue;
            }
            let quantity = self.rng.random_range(entry.min..=entry.max.max(entry.min));
            drops.push(ItemDrop {
                item_id: entry.item_id.clone(),
                quantity,
            });
        }
        drops
    }

    pub fn get_rock(&self, x: i32, y: i32) -> Option<&Rock> {
        self.rocks.get(&(x, y))
    }

    pub fn rock_count(&self) -> usize {
        self.rocks.len()
    }

    pub fn rocks(&self) -> impl Iterator<Item = ((i32, i32), &Rock)> {
        self.rocks.iter().map(|(&cell, rock)| (cell, rock))
    }

    pub fn clear(&mut self) {
        self.rocks.clear();
    }

    /// 随机数状态（存档用）
    pub fn rng_state(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(&self.rng)?)
    }

    pub fn restore_rng_state(&mut self, state: &str) -> Result<(), GameError> {
        self.rng = serde_json::from_str(state)?;
        Ok(())
    }
}

impl Default for Mining {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl System for Mining {
    fn name(&self) -> &str {
        "Mining"
    }

    /// 矿石没有随时间变化的状态
    fn run(&mut self, _world: &mut GameWorld, _dt_ms: f32) -> SystemResult {
        SystemResult::Continue
    }
}
