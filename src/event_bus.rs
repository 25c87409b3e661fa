//! 事件总线系统，用于解耦模块间通信
//!
//! 组件与世界系统之间只通过总线横向通信：
//! - 组件发布领域事件（受伤、死亡、体力、背包变化）
//! - UI、音频、特效等外部子系统按事件名订阅
//! - 同一事件的监听器按注册顺序同步调用
//!
//! 分发时使用监听器列表的快照，因此回调内部调用 `on`/`off`
//! 只影响之后的 `emit`。回调内部再次 `emit` 是允许的，超过最大递归深度的
//! 事件会被缓冲，待最外层分发结束后依次处理。

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 对外约定的事件名（UI / 音频 / 特效需逐字匹配）
pub mod names {
    pub const HERO_HEALTH_CHANGE: &str = "HERO_HEALTH_CHANGE";
    pub const ENTITY_DAMAGED: &str = "ENTITY_DAMAGED";
    pub const ENTITY_DIED: &str = "ENTITY_DIED";
    pub const HERO_STAMINA_CHANGE: &str = "HERO_STAMINA_CHANGE";
    pub const INVENTORY_UPDATED: &str = "INVENTORY_UPDATED";
}

/// 实体句柄的稳定表示，用于事件负载和组件回指
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// 还原为 hecs 句柄
    pub fn to_entity(self) -> Option<hecs::Entity> {
        hecs::Entity::from_bits(self.0)
    }
}

impl From<hecs::Entity> for EntityId {
    fn from(entity: hecs::Entity) -> Self {
        EntityId(entity.to_bits().get())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 游戏事件定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// 英雄生命变化（受伤、治疗、复活）
    HeroHealthChanged { current: f32, max: f32 },
    /// 非英雄实体受到伤害
    EntityDamaged {
        entity: EntityId,
        amount: f32,
        current: f32,
        max: f32,
    },
    /// 实体死亡
    EntityDied { entity: EntityId },
    /// 英雄体力变化
    HeroStaminaChanged { current: f32, max: f32 },
    /// 英雄背包变化，携带完整物品表而非增量
    InventoryUpdated { items: BTreeMap<String, u32> },
    /// 其他子系统的自定义事件
    Custom { name: String, payload: Value },
}

impl GameEvent {
    /// 构造自定义事件
    pub fn custom(name: impl Into<String>, payload: Value) -> Self {
        GameEvent::Custom {
            name: name.into(),
            payload,
        }
    }

    /// 获取事件名（订阅时使用的字符串）
    pub fn event_type(&self) -> &str {
        match self {
            GameEvent::HeroHealthChanged { .. } => names::HERO_HEALTH_CHANGE,
            GameEvent::EntityDamaged { .. } => names::ENTITY_DAMAGED,
            GameEvent::EntityDied { .. } => names::ENTITY_DIED,
            GameEvent::HeroStaminaChanged { .. } => names::HERO_STAMINA_CHANGE,
            GameEvent::InventoryUpdated { .. } => names::INVENTORY_UPDATED,
            GameEvent::Custom { name, .. } => name,
        }
    }

    /// 外部协作方看到的负载形状
    pub fn payload(&self) -> Value {
        match self {
            GameEvent::HeroHealthChanged { current, max }
            | GameEvent::HeroStaminaChanged { current, max } => {
                json!({ "current": current, "max": max })
            }
            GameEvent::EntityDamaged {
                entity,
                amount,
                current,
                max,
            } => json!({
                "entity": entity.0,
                "amount": amount,
                "current": current,
                "max": max,
            }),
            GameEvent::EntityDied { entity } => json!({ "entity": entity.0 }),
            GameEvent::InventoryUpdated { items } => json!(items),
            GameEvent::Custom { payload, .. } => payload.clone(),
        }
    }
}

/// 监听器回调
pub type Listener = Arc<dyn Fn(&GameEvent) + Send + Sync>;

/// 注册凭据，`off` 时用于精确移除这一次注册
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    callback: Listener,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 同步发布-订阅总线
///
/// 内部使用互斥锁，可以 `Arc<EventBus>` 的形式在组件与系统间共享；
/// 调用回调期间不持有任何锁。
pub struct EventBus {
    /// 按事件名分组的监听器（保持注册顺序）
    listeners: Mutex<HashMap<String, Vec<ListenerEntry>>>,
    next_listener_id: AtomicU64,
    /// 事件历史（用于调试和回放）
    history: Mutex<VecDeque<GameEvent>>,
    max_history: usize,
    /// 当前嵌套分发深度
    dispatch_depth: AtomicUsize,
    max_dispatch_depth: usize,
    /// 超出递归深度而延后处理的事件
    deferred: Mutex<VecDeque<GameEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_limits(100, 10)
    }

    /// 创建一个指定历史记录大小的事件总线
    pub fn with_history_size(max_history: usize) -> Self {
        Self::with_limits(max_history, 10)
    }

    pub fn with_limits(max_history: usize, max_dispatch_depth: usize) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
            history: Mutex::new(VecDeque::with_capacity(max_history)),
            max_history,
            dispatch_depth: AtomicUsize::new(0),
            max_dispatch_depth: max_dispatch_depth.max(1),
            deferred: Mutex::new(VecDeque::new()),
        }
    }

    /// 注册监听器；同一回调重复注册会被保留多份
    pub fn on<F>(&self, event_name: &str, callback: F) -> ListenerId
    where
        F: Fn(&GameEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners)
            .entry(event_name.to_string())
            .or_default()
            .push(ListenerEntry {
                id,
                callback: Arc::new(callback),
            });
        id
    }

    /// 移除一次注册；未注册过的凭据是空操作，返回 false
    pub fn off(&self, event_name: &str, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let Some(entries) = listeners.get_mut(event_name) else {
            return false;
        };
        let Some(index) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        entries.remove(index);
        if entries.is_empty() {
            listeners.remove(event_name);
        }
        true
    }

    /// 同步通知所有已注册的监听器；没有监听器时什么也不做
    pub fn emit(&self, event: GameEvent) {
        if self.dispatch_depth.load(Ordering::SeqCst) >= self.max_dispatch_depth {
            warn!(
                "event bus: dispatch depth {} reached, deferring {}",
                self.max_dispatch_depth,
                event.event_type()
            );
            lock(&self.deferred).push_back(event);
            return;
        }

        self.dispatch(&event);

        if self.dispatch_depth.load(Ordering::SeqCst) == 0 {
            self.flush_deferred();
        }
    }

    fn dispatch(&self, event: &GameEvent) {
        self.record(event);

        let snapshot: Vec<Listener> = lock(&self.listeners)
            .get(event.event_type())
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.callback)).collect())
            .unwrap_or_default();
        if snapshot.is_empty() {
            return;
        }

        trace!(
            "event bus: {} -> {} listener(s)",
            event.event_type(),
            snapshot.len()
        );
        self.dispatch_depth.fetch_add(1, Ordering::SeqCst);
        let _depth = scopeguard::guard(&self.dispatch_depth, |depth| {
            depth.fetch_sub(1, Ordering::SeqCst);
        });
        for callback in snapshot {
            callback(event);
        }
    }

    fn flush_deferred(&self) {
        while let Some(event) = self.pop_deferred() {
            self.dispatch(&event);
        }
    }

    fn pop_deferred(&self) -> Option<GameEvent> {
        lock(&self.deferred).pop_front()
    }

    fn record(&self, event: &GameEvent) {
        if self.max_history == 0 {
            return;
        }
        let mut history = lock(&self.history);
        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(event.clone());
    }

    /// 某事件当前的监听器数量
    pub fn listener_count(&self, event_name: &str) -> usize {
        lock(&self.listeners).get(event_name).map_or(0, Vec::len)
    }

    /// 移除某事件的全部监听器
    pub fn clear_listeners(&self, event_name: &str) {
        lock(&self.listeners).remove(event_name);
    }

    /// 获取事件历史（最近的 n 个事件，按发生顺序）
    pub fn history(&self, count: usize) -> Vec<GameEvent> {
        let history = lock(&self.history);
        let start = history.len().saturating_sub(count);
        history.iter().skip(start).cloned().collect()
    }

    /// 清空历史记录
    pub fn clear_history(&self) {
        lock(&self.history).clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = lock(&self.listeners);
        let counts: BTreeMap<&str, usize> = listeners
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("max_history", &self.max_history)
            .field("max_dispatch_depth", &self.max_dispatch_depth)
            .finish()
    }
}
