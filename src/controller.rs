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

use crate::demand::DemandSourceTrait;
use crate::error::*;
use crate::kubernetes::KubernetesObjectTrait;
use crate::strategy::{AutoScalerStrategy, AutoScalerStrategyTrait, CooldownState, Decision};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use slog::{debug, info, warn, Logger};

/// Drives the autoscaling strategy for a single worker pool, threading the
/// cooldown state from one tick to the next.
pub struct Controller<D, K> {
    logger: Logger,
    strategy: AutoScalerStrategy,
    demand_source: D,
    kubernetes_object: K,
    state: CooldownState,
}

impl<D, K> Controller<D, K>
where
    D: DemandSourceTrait,
    K: KubernetesObjectTrait,
{
    pub fn new(
        logger: Logger,
        strategy: AutoScalerStrategy,
        demand_source: D,
        kubernetes_object: K,
    ) -> Self {
        Self {
            logger,
            strategy,
            demand_source,
            kubernetes_object,
            state: CooldownState::Unknown,
        }
    }

    /// The cooldown state that will be supplied to the next evaluation.
    pub fn state(&self) -> CooldownState {
        self.state
    }

    /// Perform a single reconciliation. On error nothing is committed, the
    /// previous cooldown state is kept for the next attempt.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<Decision, Error> {
        let demand = self.demand_source.demand().await?;
        let current_replicas = self.kubernetes_object.replicas().await?;

        info!(self.logger, "Current status";
            "running" => demand.running,
            "scheduled" => demand.scheduled,
            "current_replicas" => current_replicas,
            "phase" => self.state.phase());

        let decision = self
            .strategy
            .evaluate(&demand, current_replicas, &self.state, now);

        if decision.changes(current_replicas) {
            info!(self.logger, "Scaling worker pool";
                "current_replicas" => current_replicas,
                "target_replicas" => decision.target_replicas);
            self.kubernetes_object
                .scale(decision.target_replicas)
                .await?;
        } else {
            debug!(self.logger, "Worker pool does not require scaling";
                "current_replicas" => current_replicas);
        }

        if let CooldownState::Cooling { anchor } = decision.next_state {
            debug!(self.logger, "Cooling down";
                "elapsed_seconds" => now.signed_duration_since(anchor).num_seconds());
        }

        self.state = decision.next_state;
        Ok(decision)
    }

    /// Reconcile once per tick until the tick stream ends, returning the final
    /// cooldown state.
    pub async fn run<S>(mut self, mut ticks: S) -> CooldownState
    where
        S: Stream + Unpin,
    {
        let (namespace, name) = self.kubernetes_object.namespace_and_name();
        debug!(self.logger, "Starting autoscaler task";
            "object_namespace" => &namespace,
            "object_name" => &name);

        while ticks.next().await.is_some() {
            if let Err(err) = self.tick(Utc::now()).await {
                // Keep the previous state, a failed read must never start or reset a cooldown.
                warn!(self.logger, "Skipping autoscaler tick due to error";
                    "error" => format!("{}", err));
            }
        }

        debug!(self.logger, "Stopped autoscaler task";
            "phase" => self.state().phase());
        self.state()
    }
}
