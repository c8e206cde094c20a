use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::render::{RenderConfig, ResolveStage};
use crate::model::avatar::{Group, Model};
use crate::model::state::LogicState;
use crate::resolve::classify::{classify_level, resolve_voice_layer};

/// Length of one blink window in seconds.
pub const BLINK_DURATION_SECS: f64 = 0.12;
/// Range of the delay before a group's first blink.
pub const FIRST_BLINK_DELAY_SECS: std::ops::Range<f64> = 2.0..6.0;
/// Child-name fragments that mark a closed-eye layer when `logic.blink` is unset.
pub const BLINK_NAME_HINTS: [&str; 4] = ["close", "closed", "shut", "blink"];

const BLINK_FREQ_EPSILON: f64 = 0.001;

/// Per-tick inputs for group resolution.
#[derive(Clone, Copy, Debug)]
pub struct ResolveCtx<'a> {
    /// Seconds on the renderer clock.
    pub now: f64,
    /// Gated audio level.
    pub level: f32,
    /// Configuration snapshot for this tick.
    pub config: &'a RenderConfig,
}

/// Transient timer state for one group. Never persisted, rebuilt on every model load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupTimers {
    /// Time of the next blink, scheduled on first use.
    pub next_blink_at: Option<f64>,
    /// End of the current blink window.
    pub blink_until: f64,
    /// Time of the next random switch, scheduled on first use.
    pub next_random_switch_at: Option<f64>,
    /// Index into the group's children of the current random pick.
    pub current_random_choice: Option<usize>,
}

/// Decides which single child each group shows on a tick.
///
/// Owns the per-group timers and the random source used for blink jitter and random switching.
/// Built for one [`Model`]; build a new resolver whenever the model is reloaded.
#[derive(Debug)]
pub struct GroupStateResolver {
    timers: Vec<GroupTimers>,
    rng: StdRng,
}

impl GroupStateResolver {
    /// Fresh timers for every group of `model`.
    pub fn new(model: &Model, seed: u64) -> Self {
        Self {
            timers: vec![GroupTimers::default(); model.groups.len()],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Timer state of one group.
    pub fn timers(&self, group_index: usize) -> Option<&GroupTimers> {
        self.timers.get(group_index)
    }

    /// Whether the group is inside a blink window at `now`.
    pub fn in_blink_window(&self, group_index: usize, now: f64) -> bool {
        self.timers
            .get(group_index)
            .is_some_and(|t| now < t.blink_until)
    }

    /// Resolve the visible child of one group.
    ///
    /// Override stages run in `ctx.config.precedence` order and the first hit wins; voice
    /// classification always runs last. Groups the resolver has no timers for resolve to nothing.
    pub fn resolve<'m>(
        &mut self,
        model: &'m Model,
        group_index: usize,
        ctx: &ResolveCtx<'_>,
    ) -> Option<&'m str> {
        let group = model.groups.get(group_index)?;
        let timers = self.timers.get_mut(group_index)?;

        for stage in &ctx.config.precedence {
            let hit = match stage {
                ResolveStage::Blink => blink_stage(group, timers, &mut self.rng, ctx),
                ResolveStage::Open => group.logic_for(LogicState::Open),
                ResolveStage::Random => random_stage(group, timers, &mut self.rng, ctx),
            };
            if hit.is_some() {
                return hit;
            }
        }

        let state = classify_level(ctx.level, &ctx.config.thresholds, ctx.config.noise_gate);
        resolve_voice_layer(group, state, &ctx.config.active_states)
    }

    /// Resolve every group, indexed like [`Model::groups`].
    pub fn resolve_all<'m>(&mut self, model: &'m Model, ctx: &ResolveCtx<'_>) -> Vec<Option<&'m str>> {
        (0..model.groups.len())
            .map(|i| self.resolve(model, i, ctx))
            .collect()
    }
}

fn blink_stage<'g>(
    group: &'g Group,
    timers: &mut GroupTimers,
    rng: &mut StdRng,
    ctx: &ResolveCtx<'_>,
) -> Option<&'g str> {
    if !ctx.config.effects.blink || !(group.blink_freq > BLINK_FREQ_EPSILON) {
        return None;
    }

    let now = ctx.now;
    let next = *timers
        .next_blink_at
        .get_or_insert_with(|| now + rng.gen_range(FIRST_BLINK_DELAY_SECS));
    if now > next {
        timers.blink_until = now + BLINK_DURATION_SECS;
        let jitter = if ctx.config.blink_jitter.is_finite() {
            ctx.config.blink_jitter.clamp(0.0, 0.95)
        } else {
            0.0
        };
        let factor = if jitter > 0.0 {
            rng.gen_range(1.0 - jitter..=1.0 + jitter)
        } else {
            1.0
        };
        timers.next_blink_at = Some(now + group.blink_freq * factor);
    }

    if now < timers.blink_until {
        blink_layer(group)
    } else {
        None
    }
}

/// Layer shown during a blink window: `logic.blink`, else the first child named like a closed eye.
pub fn blink_layer(group: &Group) -> Option<&str> {
    group.logic_for(LogicState::Blink).or_else(|| {
        group
            .children
            .iter()
            .find(|c| {
                let lower = c.to_lowercase();
                BLINK_NAME_HINTS.iter().any(|hint| lower.contains(hint))
            })
            .map(String::as_str)
    })
}

fn random_stage<'g>(
    group: &'g Group,
    timers: &mut GroupTimers,
    rng: &mut StdRng,
    ctx: &ResolveCtx<'_>,
) -> Option<&'g str> {
    if !(group.random_effect && ctx.config.effects.random_effect) {
        return None;
    }

    let now = ctx.now;
    if timers.next_random_switch_at.is_none_or(|at| now >= at) {
        let blink = group.logic_for(LogicState::Blink);
        let open = group.logic_for(LogicState::Open);
        let candidates: Vec<usize> = group
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| Some(c.as_str()) != blink && Some(c.as_str()) != open)
            .map(|(i, _)| i)
            .collect();

        timers.current_random_choice = if candidates.is_empty() {
            None
        } else {
            Some(candidates[rng.gen_range(0..candidates.len())])
        };

        let (lo, hi) = if group.random_min <= group.random_max {
            (group.random_min, group.random_max)
        } else {
            (group.random_max, group.random_min)
        };
        let wait = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        timers.next_random_switch_at = Some(now + wait);
    }

    timers
        .current_random_choice
        .and_then(|i| group.children.get(i))
        .map(String::as_str)
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/resolver.rs"]
mod tests;
