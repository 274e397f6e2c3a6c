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

use crate::error::*;
use clap::ValueEnum;
use snafu::ensure;
use std::fmt;

/// Prefix to use for all object annotations.
pub const ANNOTATION_BASE: &str = "buildkite-scaler.io";

/// Kubernetes resource type to scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    Deployment,
    #[value(alias = "statefulset")]
    StatefulSet,
}

/// The worker pool being scaled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolIdentity {
    /// Kubernetes resource kind of the pool.
    pub kind: TargetKind,
    /// Namespace the pool lives in.
    pub namespace: String,
    /// Name of the pool object.
    pub name: String,
}

impl fmt::Display for PoolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}/{}", self.kind, self.namespace, self.name)
    }
}

/// Replica limits and scale down pacing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalingConfig {
    min_replicas: u32,
    max_replicas: u32,
    scale_down_step: u32,
    cooldown_seconds: u32,
}

impl ScalingConfig {
    /// Build a validated scaling configuration.
    pub fn new(
        min_replicas: u32,
        max_replicas: u32,
        scale_down_step: u32,
        cooldown_seconds: u32,
    ) -> Result<Self, Error> {
        ensure!(
            min_replicas >= 1,
            InvalidConfigSnafu {
                reason: "min replicas must be at least 1"
            }
        );
        ensure!(
            max_replicas >= min_replicas,
            InvalidConfigSnafu {
                reason: format!(
                    "max replicas ({}) must not be less than min replicas ({})",
                    max_replicas, min_replicas
                )
            }
        );
        ensure!(
            scale_down_step >= 1,
            InvalidConfigSnafu {
                reason: "scale down step must be at least 1"
            }
        );

        Ok(Self {
            min_replicas,
            max_replicas,
            scale_down_step,
            cooldown_seconds,
        })
    }

    /// Minimum allowed number of replicas.
    pub fn min_replicas(&self) -> u32 {
        self.min_replicas
    }

    /// Maximum allowed number of replicas.
    pub fn max_replicas(&self) -> u32 {
        self.max_replicas
    }

    /// Replicas removed each time a cooldown window expires.
    pub fn scale_down_step(&self) -> u32 {
        self.scale_down_step
    }

    /// Seconds of zero demand before each scale down step.
    pub fn cooldown_seconds(&self) -> u32 {
        self.cooldown_seconds
    }

    /// Constrain a replica count to the configured limits.
    pub fn clamp(&self, replicas: u32) -> u32 {
        replicas.clamp(self.min_replicas, self.max_replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ScalingConfig::new(1, 50, 20, 300).unwrap();
        assert_eq!(config.min_replicas(), 1);
        assert_eq!(config.max_replicas(), 50);
        assert_eq!(config.scale_down_step(), 20);
        assert_eq!(config.cooldown_seconds(), 300);

        // A single fixed size pool and a zero length cooldown are both allowed.
        assert!(ScalingConfig::new(3, 3, 1, 0).is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            ScalingConfig::new(0, 50, 20, 300),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            ScalingConfig::new(10, 5, 20, 300),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            ScalingConfig::new(1, 50, 0, 300),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_clamp() {
        let config = ScalingConfig::new(2, 10, 1, 60).unwrap();
        assert_eq!(config.clamp(0), 2);
        assert_eq!(config.clamp(7), 7);
        assert_eq!(config.clamp(11), 10);
    }

    #[test]
    fn test_pool_identity_display() {
        let pool = PoolIdentity {
            kind: TargetKind::Deployment,
            namespace: "buildkite".into(),
            name: "agents".into(),
        };
        assert_eq!(pool.to_string(), "Deployment:buildkite/agents");
    }
}
