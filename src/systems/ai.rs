//! AI 决策
//!
//! `AiPolicy` 根据组件状态与周边情况给出下一状态，`AiSystem` 负责收集上下文、
//! 应用决策并维护目标与游荡计时。

use super::{System, SystemResult};
use crate::components::{AIComponent, AiState, Component, HealthComponent};
use crate::ecs::{EntityTag, GameWorld, Position, SpawnPoint};
use crate::effects::Effects;
use crate::event_bus::EntityId;
use hecs::Entity;
use log::debug;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// 进入追击时请求的音效
pub const AGGRO_SFX: &str = "sfx_enemy_aggro";

/// 决策所需的周边信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiContext {
    pub position: Position,
    pub spawn: Position,
    /// 存活的目标位置
    pub target: Option<Position>,
}

/// 纯函数式的状态决策
pub trait AiPolicy: Send {
    fn decide(&self, ai: &AIComponent, context: &AiContext) -> AiState;
}

/// 发现目标即追击，超出牵引距离则脱战回到出生点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggroLeashPolicy {
    /// 距出生点多近算已返回
    pub home_radius: f32,
    /// 攻击状态下目标超出 `attack_range * disengage_factor` 时转为追击
    pub disengage_factor: f32,
}

impl Default for AggroLeashPolicy {
    fn default() -> Self {
        Self {
            home_radius: 20.0,
            disengage_factor: 1.2,
        }
    }
}

impl AiPolicy for AggroLeashPolicy {
    fn decide(&self, ai: &AIComponent, context: &AiContext) -> AiState {
        let position = &context.position;
        let state = ai.state();

        match state {
            AiState::Chase | AiState::Attack => {
                let Some(target) = &context.target else {
                    return AiState::Wander;
                };
                if ai.should_leash(position, &context.spawn) {
                    return AiState::Flee;
                }
                if state == AiState::Chase && ai.in_attack_range(position, target) {
                    return AiState::Attack;
                }
                if state == AiState::Attack
                    && position.distance_to(target) > ai.attack_range * self.disengage_factor
                {
                    return AiState::Chase;
                }
                state
            }
            AiState::Flee => {
                if position.distance_to(&context.spawn) <= self.home_radius {
                    AiState::Wander
                } else {
                    AiState::Flee
                }
            }
            AiState::Idle | AiState::Wander => match &context.target {
                Some(target) if ai.can_aggro(position, target) => AiState::Chase,
                _ => state,
            },
        }
    }
}

/// 驱动所有 AI 组件的系统
pub struct AiSystem {
    policy: Box<dyn AiPolicy>,
    rng: Pcg32,
    effects: Effects,
}

impl AiSystem {
    pub fn new(effects: Effects) -> Self {
        Self::with_rng(effects, Pcg32::from_rng(&mut rand::rng()))
    }

    pub fn with_seed(effects: Effects, seed: u64) -> Self {
        Self::with_rng(effects, Pcg32::seed_from_u64(seed))
    }

    fn with_rng(effects: Effects, rng: Pcg32) -> Self {
        Self {
            policy: Box::new(AggroLeashPolicy::default()),
            rng,
            effects,
        }
    }

    pub fn with_policy(mut self, policy: impl AiPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn rng_state(&self) -> Result<String, error::GameError> {
        Ok(serde_json::to_string(&self.rng)?)
    }

    pub fn restore_rng_state(&mut self, state: &str) -> Result<(), error::GameError> {
        self.rng = serde_json::from_str(state)?;
        Ok(())
    }

    /// 活跃且未死亡的英雄
    fn find_target(world: &GameWorld) -> Option<(Entity, Position)> {
        world
            .world
            .query::<(&EntityTag, &Position, Option<&HealthComponent>)>()
            .iter()
            .find(|(_, (tag, _, health))| {
                tag.emits_ui_events && tag.active && !health.is_some_and(|h| h.is_dead())
            })
            .map(|(entity, (_, position, _))| (entity, *position))
    }

    pub fn update(&mut self, world: &mut GameWorld) {
        let target = Self::find_target(world);
        let mut aggro = 0usize;

        for (entity, (tag, ai, position, spawn)) in world.world.query_mut::<(
            &EntityTag,
            &mut AIComponent,
            &Position,
            Option<&SpawnPoint>,
        )>() {
            if !tag.active || !ai.is_active() {
                continue;
            }

            let target = target.filter(|(hero, _)| *hero != entity);
            let context = AiContext {
                position: *position,
                spawn: spawn.map_or(*position, |s| s.0),
                target: target.map(|(_, p)| p),
            };

            let before = ai.state();
            let next = self.policy.decide(ai, &context);
            ai.set_state(next);

            match next {
                AiState::Chase => ai.target = target.map(|(hero, _)| EntityId::from(hero)),
                AiState::Wander | AiState::Flee | AiState::Idle => ai.target = None,
                AiState::Attack => {}
            }
            ai.is_attacking = next == AiState::Attack;

            if next == AiState::Chase && matches!(before, AiState::Idle | AiState::Wander) {
                aggro += 1;
            }
            if next == AiState::Wander && ai.wander_timer <= 0.0 {
                ai.randomize_wander(&mut self.rng);
            }
            if before != next {
                debug!("{:?} ai {} -> {}", entity, before, next);
            }
        }

        for _ in 0..aggro {
            self.effects.play_sfx(AGGRO_SFX);
        }
    }
}

impl System for AiSystem {
    fn name(&self) -> &str {
        "AiSystem"
    }

    fn run(&mut self, world: &mut GameWorld, _dt_ms: f32) -> SystemResult {
        self.update(world);
        SystemResult::Continue
    }
}
