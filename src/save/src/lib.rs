// src/save/src/lib.rs

//! 模拟状态的存档格式与存档槽位管理
//!
//! 这里只保存纯数据快照：实体标签、位置、各组件的 JSON 状态、矿石表和随机数状态。
//! 与 hecs 世界之间的相互转换由上层 crate 完成。

use anyhow::{Context, Result};
use bincode::{Decode, Encode, config};
use error::GameError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// 存档元数据
#[derive(Debug, Clone, Encode, Decode, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub timestamp: SystemTime,
    pub label: String,
    /// 已模拟的帧数
    pub frame_count: u64,
    /// 已模拟的时长(秒)
    pub play_time: f64,
}

/// 单个组件的状态，`state` 为该组件可序列化字段的 JSON
#[derive(Debug, Clone, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub kind: String,
    pub active: bool,
    pub state: String,
}

/// 一个实体的完整快照
#[derive(Debug, Clone, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// 存档内的稳定编号，读档后会映射到新句柄
    pub id: u64,
    pub kind: String,
    pub name: String,
    pub emits_ui_events: bool,
    pub active: bool,
    pub position: Option<(f32, f32)>,
    pub spawn_point: Option<(f32, f32)>,
    pub components: Vec<ComponentRecord>,
}

/// 采矿网格中的一块矿石
#[derive(Debug, Clone, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct RockSnapshot {
    pub x: i32,
    pub y: i32,
    pub kind: String,
    pub durability: i32,
    pub max_durability: i32,
}

/// 存档数据(包含模拟的完整状态)
#[derive(Debug, Clone, Encode, Decode, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub metadata: SaveMetadata,
    pub seed: u64,
    pub entities: Vec<EntitySnapshot>,
    pub rocks: Vec<RockSnapshot>,
    /// 采矿掉落随机数生成器的序列化状态
    pub mining_rng: String,
    /// AI 随机数生成器的序列化状态
    pub ai_rng: String,
}

impl SaveData {
    pub fn new(label: impl Into<String>, seed: u64) -> Self {
        Self {
            version: SAVE_VERSION,
            metadata: SaveMetadata {
                timestamp: SystemTime::now(),
                label: label.into(),
                frame_count: 0,
                play_time: 0.0,
            },
            seed,
            entities: Vec::new(),
            rocks: Vec::new(),
            mining_rng: String::new(),
            ai_rng: String::new(),
        }
    }

    /// Validate save data integrity
    pub fn validate(&self) -> Result<(), GameError> {
        if self.version > SAVE_VERSION {
            return Err(GameError::VersionMismatch(format!(
                "save is v{}, this build reads up to v{}",
                self.version, SAVE_VERSION
            )));
        }

        let mut ids = HashSet::with_capacity(self.entities.len());
        if !self.entities.iter().all(|e| ids.insert(e.id)) {
            return Err(GameError::CorruptedSave);
        }

        let mut cells = HashSet::with_capacity(self.rocks.len());
        if !self.rocks.iter().all(|r| cells.insert((r.x, r.y))) {
            return Err(GameError::CorruptedSave);
        }

        Ok(())
    }
}

/// 存档系统
pub struct SaveSystem {
    save_dir: PathBuf,
    max_slots: usize,
}

impl SaveSystem {
    /// 初始化存档系统
    pub fn new(save_dir: impl AsRef<Path>, max_slots: usize) -> Result<Self, GameError> {
        let save_dir = save_dir.as_ref();

        // 创建存档目录(如果不存在)
        if !save_dir.exists() {
            fs::create_dir_all(save_dir).context("Failed to create save directory")?;
        }

        Ok(Self {
            save_dir: save_dir.to_path_buf(),
            max_slots,
        })
    }

    /// 获取所有存档列表(按时间倒序)
    pub fn list_saves(&self) -> Result<Vec<SaveMetadata>, GameError> {
        let mut saves = Vec::new();

        let entries = fs::read_dir(&self.save_dir).context("Failed to read save directory")?;
        for entry in entries {
            let path = entry.context("Failed to read directory entry")?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "sav") {
                continue;
            }

            let mut file = fs::File::open(&path)
                .with_context(|| format!("Failed to open save file: {:?}", path))?;
            let data: SaveData = bincode::decode_from_std_read(&mut file, config::standard())
                .with_context(|| format!("Failed to deserialize save file: {:?}", path))?;
            saves.push(data.metadata);
        }

        saves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(saves)
    }

    fn slot_path(&self, slot: usize) -> Result<PathBuf> {
        self.save_path(slot)
            .ok_or_else(|| anyhow::Error::new(GameError::InvalidSlot))
    }

    /// 保存模拟状态（先写临时文件再重命名）
    pub fn save_game(&self, slot: usize, data: &SaveData) -> Result<()> {
        let path = self.slot_path(slot)?;

        let temp_path = path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary save file")?;

        bincode::encode_into_std_write(data, &mut file, config::standard())
            .context("Failed to serialize save data")?;
        file.flush().context("Failed to flush save data")?;

        fs::rename(&temp_path, &path).context("Failed to commit save file")?;
        info!(
            "saved slot {} ({} entities, {} rocks)",
            slot,
            data.entities.len(),
            data.rocks.len()
        );
        Ok(())
    }

    /// 加载模拟状态
    ///
    /// 截断或无法解码的存档返回 `GameError::CorruptedSave`。
    pub fn load_game(&self, slot: usize) -> Result<SaveData, GameError> {
        let path = self.slot_path(slot)?;

        let mut file =
            fs::File::open(&path).with_context(|| format!("Save file not found: {:?}", path))?;
        let data: SaveData = bincode::decode_from_std_read(&mut file, config::standard())
            .map_err(|e| {
                warn!("slot {} failed to decode: {}", slot, e);
                GameError::from(e)
            })?;

        data.validate()?;
        debug!("loaded slot {} (v{})", slot, data.version);
        Ok(data)
    }

    /// 删除存档
    pub fn delete_save(&self, slot: usize) -> Result<()> {
        let path = self.slot_path(slot)?;
        if path.exists() {
            fs::remove_file(path).context("Failed to delete save file")?;
        }
        Ok(())
    }

    /// 检查指定槽位是否有存档
    pub fn has_save(&self, slot: usize) -> bool {
        self.save_path(slot).is_some_and(|p| p.exists())
    }

    /// 获取存档文件路径
    pub fn save_path(&self, slot: usize) -> Option<PathBuf> {
        if slot >= self.max_slots {
            return None;
        }
        Some(self.save_dir.join(format!("save_{}.sav", slot)))
    }
}

/// 自动保存功能
///
/// 间隔按模拟时间累计，而不是墙钟时间，因此同样的输入总会在同一帧触发。
pub struct AutoSave {
    pub save_system: SaveSystem,
    pub interval: Duration,
    pub slot: usize,
    since_last: Duration,
    last_save: Option<SystemTime>,
}

impl AutoSave {
    pub fn new(save_system: SaveSystem, interval: Duration) -> Self {
        Self {
            save_system,
            interval,
            slot: 0,
            since_last: Duration::ZERO,
            last_save: None,
        }
    }

    /// 推进模拟时间，返回是否到了保存时机
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.since_last += elapsed;
        !self.interval.is_zero() && self.since_last >= self.interval
    }

    /// 立即保存并重置间隔计时
    pub fn force_save(&mut self, save_data: &SaveData) -> Result<()> {
        self.save_system.save_game(self.slot, save_data)?;
        self.since_last = Duration::ZERO;
        self.last_save = Some(SystemTime::now());
        Ok(())
    }

    /// 获取上次保存时间
    pub fn last_save_time(&self) -> Option<SystemTime> {
        self.last_save
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaveData {
        let mut data = SaveData::new("valley", 4242);
        data.entities.push(EntitySnapshot {
            id: 1,
            kind: "Hero".to_string(),
            name: "hero".to_string(),
            emits_ui_events: true,
            active: true,
            position: Some((10.0, 20.0)),
            spawn_point: None,
            components: vec![ComponentRecord {
                kind: "HealthComponent".to_string(),
                active: true,
                state: r#"{"health":80.0,"maxHealth":100.0}"#.to_string(),
            }],
        });
        data.rocks.push(RockSnapshot {
            x: 2,
            y: -3,
            kind: "iron_ore".to_string(),
            durability: 4,
            max_durability: 6,
        });
        data
    }

    #[test]
    fn save_data_roundtrip_through_bincode() {
        let data = sample();
        let cfg = config::standard();
        let encoded = bincode::encode_to_vec(&data, cfg).expect("serialize save data");
        let (decoded, _) =
            bincode::decode_from_slice::<SaveData, _>(&encoded, cfg).expect("deserialize");

        assert_eq!(decoded.version, SAVE_VERSION);
        assert_eq!(decoded.seed, 4242);
        assert_eq!(decoded.entities, data.entities);
        assert_eq!(decoded.rocks, data.rocks);
    }

    #[test]
    fn slot_files_roundtrip_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveSystem::new(dir.path().join("saves"), 3).unwrap();

        assert!(!saves.has_save(1));
        saves.save_game(1, &sample()).unwrap();
        assert!(saves.has_save(1));
        assert_eq!(saves.list_saves().unwrap().len(), 1);

        let loaded = saves.load_game(1).unwrap();
        assert_eq!(loaded.metadata.label, "valley");

        saves.delete_save(1).unwrap();
        assert!(!saves.has_save(1));
    }

    #[test]
    fn truncated_slot_file_loads_as_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveSystem::new(dir.path(), 2).unwrap();
        saves.save_game(0, &sample()).unwrap();

        let path = saves.save_path(0).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(saves.load_game(0), Err(GameError::CorruptedSave)));
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveSystem::new(dir.path(), 2).unwrap();
        assert!(saves.save_game(2, &sample()).is_err());
        assert!(saves.save_path(2).is_none());
    }

    #[test]
    fn duplicate_entity_ids_fail_validation() {
        let mut data = sample();
        let dup = data.entities[0].clone();
        data.entities.push(dup);
        assert!(matches!(data.validate(), Err(GameError::CorruptedSave)));
    }

    #[test]
    fn newer_versions_are_refused() {
        let mut data = sample();
        data.version = SAVE_VERSION + 1;
        assert!(matches!(data.validate(), Err(GameError::VersionMismatch(_))));
    }

    #[test]
    fn autosave_fires_after_interval_of_simulated_time() {
        let dir = tempfile::tempdir().unwrap();
        let saves = SaveSystem::new(dir.path(), 1).unwrap();
        let mut auto = AutoSave::new(saves, Duration::from_secs(2));

        assert!(!auto.advance(Duration::from_millis(1500)));
        assert!(auto.advance(Duration::from_millis(600)));
        auto.force_save(&sample()).unwrap();
        assert!(auto.last_save_time().is_some());
        assert!(!auto.advance(Duration::from_millis(100)));
        assert!(auto.save_system.has_save(0));
    }
}
