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

use crate::demand::buildkite::BuildkiteDemandSource;
use crate::error::*;
use async_trait::async_trait;
use enum_dispatch::enum_dispatch;

/// Buildkite build queue demand source.
pub mod buildkite;

/// Outstanding work competing for pool capacity at a moment in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DemandSnapshot {
    /// Work items currently in progress.
    pub running: u32,
    /// Work items waiting for an agent.
    pub scheduled: u32,
}

impl DemandSnapshot {
    /// Number of replicas required to serve every outstanding work item.
    pub fn needed(&self) -> u32 {
        self.running.saturating_add(self.scheduled)
    }
}

/// Sources of queue demand.
#[enum_dispatch]
pub enum DemandSource {
    /// Builds from the Buildkite REST api.
    Buildkite(BuildkiteDemandSource),
}

#[async_trait]
#[enum_dispatch(DemandSource)]
pub trait DemandSourceTrait {
    /// Count the running and scheduled work items right now.
    async fn demand(&self) -> Result<DemandSnapshot, Error>;
}
