/*
 * Copyright 2020 Damian Peckett <damian@pecke.tt>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::demand::DemandSnapshot;
use crate::strategy::cooldown::CooldownAutoScalerStrategy;
use chrono::{DateTime, Utc};
use enum_dispatch::enum_dispatch;

/// Cooldown (scale up fast, scale down slowly) strategy implementation.
pub mod cooldown;

/// Memory carried by the controller from one evaluation to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CooldownState {
    /// Nothing observed yet, eg. straight after process start.
    #[default]
    Unknown,
    /// Demand was present on the last evaluation.
    Correct,
    /// Demand has been zero since `anchor`, or since the last scale down step.
    Cooling { anchor: DateTime<Utc> },
}

impl CooldownState {
    /// Short name of the phase, for logging.
    pub fn phase(&self) -> &'static str {
        match self {
            CooldownState::Unknown => "unknown",
            CooldownState::Correct => "correct",
            CooldownState::Cooling { .. } => "cooling",
        }
    }
}

/// Result of a single strategy evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Desired replica count, always within the configured limits.
    pub target_replicas: u32,
    /// State to supply to the next evaluation.
    pub next_state: CooldownState,
}

impl Decision {
    /// Does applying this decision require a write to the orchestrator?
    pub fn changes(&self, current_replicas: u32) -> bool {
        self.target_replicas != current_replicas
    }
}

/// Autoscaling strategies / control algorithms.
#[enum_dispatch]
#[derive(Clone, Debug)]
pub enum AutoScalerStrategy {
    Cooldown(CooldownAutoScalerStrategy),
}

/// Autoscaling strategy trait.
#[enum_dispatch(AutoScalerStrategy)]
pub trait AutoScalerStrategyTrait {
    /// What is the next desired state? Pure, performs no io.
    fn evaluate(
        &self,
        demand: &DemandSnapshot,
        current_replicas: u32,
        state: &CooldownState,
        now: DateTime<Utc>,
    ) -> Decision;
}
