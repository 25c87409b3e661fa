//! 游戏主循环，按帧推进模拟。
//!
//! 每一帧的顺序固定：
//! - 实体更新：所有活跃实体的活跃组件
//! - 世界系统：AI、资源节点、采矿，然后是外部注册的系统
//! - 自动保存：累计的模拟时间达到间隔时写入存档
//!
//! 循环本身不关心墙钟，宿主每帧传入 dt（毫秒）。

use crate::components::InventoryComponent;
use crate::config::SimConfig;
use crate::ecs::GameWorld;
use crate::effects::{Effects, VfxRegistry};
use crate::persistence;
use crate::systems::{AiSystem, ItemDrop, Mining, ResourceSystem, System, SystemResult};
use error::{GameError, handle_error};
use hecs::Entity;
use log::{info, warn};
use save::{AutoSave, SaveData, SaveSystem};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub struct GameLoop {
    pub world: GameWorld,
    pub mining: Mining,
    pub ai_system: AiSystem,
    pub resource_system: ResourceSystem,
    /// 宿主追加的系统，在内置系统之后运行
    pub systems: Vec<Box<dyn System>>,
    pub autosave: Option<AutoSave>,
    pub is_running: bool,
    seed: u64,
    frame_count: u64,
    elapsed: Duration,
    max_frame_dt_ms: f32,
}

impl fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLoop")
            .field("is_running", &self.is_running)
            .field("seed", &self.seed)
            .field("frame_count", &self.frame_count)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl GameLoop {
    pub fn new(config: Arc<SimConfig>, effects: Effects) -> Result<Self, GameError> {
        Self::with_seed(config, effects, rand::random())
    }

    /// 固定种子：AI 游荡与掉落都可复现
    pub fn with_seed(config: Arc<SimConfig>, effects: Effects, seed: u64) -> Result<Self, GameError> {
        config.validate()?;
        let mut effects = effects;
        if effects.registry().is_empty() {
            *effects.registry_mut() = VfxRegistry::with_templates(config.vfx_templates.clone());
        }

        let autosave = match &config.game_loop.save_dir {
            Some(dir) if config.game_loop.autosave_interval_secs > 0 => {
                let saves = SaveSystem::new(dir, config.game_loop.save_slots.max(1))?;
                Some(AutoSave::new(
                    saves,
                    Duration::from_secs(config.game_loop.autosave_interval_secs),
                ))
            }
            _ => None,
        };

        info!("game loop ready (seed {})", seed);
        Ok(Self {
            mining: Mining::with_seed(&config, seed),
            ai_system: AiSystem::with_seed(effects.clone(), seed.wrapping_add(1)),
            resource_system: ResourceSystem::new(effects),
            systems: Vec::new(),
            autosave,
            is_running: true,
            seed,
            frame_count: 0,
            elapsed: Duration::ZERO,
            max_frame_dt_ms: config.game_loop.max_frame_dt_ms,
            world: GameWorld::new(config),
        })
    }

    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 推进一帧；任一系统返回 `Stop` 时循环停止
    pub fn tick(&mut self, dt_ms: f32) -> SystemResult {
        if !self.is_running {
            return SystemResult::Stop;
        }
        // 负值和 NaN 都按 0 处理
        let dt_ms = dt_ms.max(0.0).min(self.max_frame_dt_ms);

        self.world.update(dt_ms);

        let mut stop = run_system(&mut self.ai_system, &mut self.world, dt_ms);
        stop |= run_system(&mut self.resource_system, &mut self.world, dt_ms);
        stop |= run_system(&mut self.mining, &mut self.world, dt_ms);
        for system in &mut self.systems {
            stop |= run_system(system.as_mut(), &mut self.world, dt_ms);
        }

        self.frame_count += 1;
        let dt = Duration::from_micros((dt_ms * 1000.0).round() as u64);
        self.elapsed += dt;

        if self.autosave.as_mut().is_some_and(|auto| auto.advance(dt)) {
            self.autosave_now();
        }

        if stop {
            self.is_running = false;
            SystemResult::Stop
        } else {
            SystemResult::Continue
        }
    }

    fn autosave_now(&mut self) {
        let data = match self.snapshot("autosave") {
            Ok(data) => data,
            Err(e) => {
                warn!("autosave snapshot failed: {}", handle_error(&e));
                return;
            }
        };
        if let Some(auto) = self.autosave.as_mut() {
            if let Err(e) = auto.force_save(&data) {
                warn!("autosave failed: {}", handle_error(&GameError::from(e)));
            }
        }
    }

    /// 敲击矿石；破坏时掉落直接放入收集者的背包
    pub fn mine(
        &mut self,
        x: i32,
        y: i32,
        power: u32,
        collector: Option<Entity>,
    ) -> Option<Vec<ItemDrop>> {
        let drops = self.mining.hit(x, y, power)?;
        if let Some(mut inventory) =
            collector.and_then(|e| self.world.get_mut::<InventoryComponent>(e))
        {
            for drop in &drops {
                inventory.add(&drop.item_id, drop.quantity);
            }
        }
        Some(drops)
    }

    /// 采集资源节点
    pub fn harvest(&mut self, node: Entity, damage: f32) -> bool {
        self.resource_system.harvest(&mut self.world, node, damage)
    }

    /// 当前模拟状态的存档快照
    pub fn snapshot(&self, label: &str) -> Result<SaveData, GameError> {
        let mut data = SaveData::new(label, self.seed);
        data.metadata.frame_count = self.frame_count;
        data.metadata.play_time = self.elapsed.as_secs_f64();
        data.entities = persistence::snapshot_entities(&self.world)?;
        data.rocks = persistence::snapshot_rocks(&self.mining);
        data.mining_rng = self.mining.rng_state()?;
        data.ai_rng = self.ai_system.rng_state()?;
        Ok(data)
    }

    /// 用存档替换当前模拟状态
    pub fn restore(&mut self, data: &SaveData) -> Result<(), GameError> {
        data.validate()?;
        persistence::restore_entities(&mut self.world, &data.entities)?;
        persistence::restore_rocks(&mut self.mining, &data.rocks);
        if !data.mining_rng.is_empty() {
            self.mining.restore_rng_state(&data.mining_rng)?;
        }
        if !data.ai_rng.is_empty() {
            self.ai_system.restore_rng_state(&data.ai_rng)?;
        }
        self.seed = data.seed;
        self.frame_count = data.metadata.frame_count;
        self.elapsed = Duration::from_secs_f64(data.metadata.play_time.max(0.0));
        self.is_running = true;
        Ok(())
    }

    pub fn save_to_slot(&self, saves: &SaveSystem, slot: usize) -> Result<(), GameError> {
        let data = self.snapshot(&format!("slot {}", slot))?;
        saves.save_game(slot, &data)?;
        Ok(())
    }

    pub fn load_from_slot(&mut self, saves: &SaveSystem, slot: usize) -> Result<(), GameError> {
        let data = saves.load_game(slot)?;
        self.restore(&data)
    }
}

/// 运行单个系统，返回是否请求停止
fn run_system(system: &mut dyn System, world: &mut GameWorld, dt_ms: f32) -> bool {
    match system.run(world, dt_ms) {
        SystemResult::Continue => false,
        SystemResult::Stop => {
            info!("{} requested stop", system.name());
            true
        }
        SystemResult::Error(message) => {
            warn!("{} failed: {}", system.name(), message);
            false
        }
    }
}
