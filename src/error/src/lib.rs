//! 模拟核心的错误处理模块
//!
//! 玩法操作（受伤、攻击、采集等）从不返回错误，失败通过布尔值或 `None` 表达。
//! 这里只覆盖外围的可失败操作：配置解析、模板合并、实体查找以及存档读写。

use bincode::error::DecodeError;
use std::io::ErrorKind;
use thiserror::Error;

/// 模拟核心外围操作可能出现的错误类型
#[derive(Debug, Error)]
pub enum GameError {
    /// 存档系统错误
    #[error("Save system error: {0}")]
    SaveError(#[from] anyhow::Error),

    /// IO操作错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 配置或模板 JSON 解析错误
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// 配置内容无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 反序列化错误
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// 无效的存档槽位
    #[error("Invalid save slot")]
    InvalidSlot,

    /// 存档数据损坏
    #[error("Corrupted save data")]
    CorruptedSave,

    /// 存档版本不兼容
    #[error("Incompatible save version: {0}")]
    VersionMismatch(String),

    /// 实体不存在（句柄已失效或从未生成）
    #[error("No such entity: {0}")]
    NoSuchEntity(u64),

    /// 实体缺少所需组件
    #[error("Entity {entity} has no {component}")]
    MissingComponent {
        entity: u64,
        component: &'static str,
    },
}

/// 存档解码失败：读到文件尾之外或内容无法解释都视为存档损坏，其余 IO 错误原样保留
impl From<DecodeError> for GameError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io { inner, .. } if inner.kind() != ErrorKind::UnexpectedEof => {
                GameError::IoError(inner)
            }
            _ => GameError::CorruptedSave,
        }
    }
}

/// 处理错误并转换为用户友好的消息
pub fn handle_error(error: &GameError) -> String {
    match error {
        GameError::CorruptedSave => "存档数据已损坏，无法加载".to_string(),
        GameError::InvalidSlot => "无效的存档槽位".to_string(),
        GameError::VersionMismatch(v) => format!("存档版本不兼容: {}", v),
        GameError::InvalidConfig(msg) => format!("配置无效: {}", msg),
        GameError::IoError(e) => match e.kind() {
            ErrorKind::NotFound => "文件不存在".to_string(),
            ErrorKind::PermissionDenied => "没有权限访问文件".to_string(),
            _ => format!("IO错误: {}", e),
        },
        _ => error.to_string(),
    }
}
