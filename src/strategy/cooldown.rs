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

use crate::config::ScalingConfig;
use crate::demand::DemandSnapshot;
use crate::strategy::{AutoScalerStrategyTrait, CooldownState, Decision};
use chrono::{DateTime, Utc};

/// Scales up immediately to meet demand, and once demand has dried up, steps
/// down by a fixed amount at most once per cooldown window.
#[derive(Clone, Debug)]
pub struct CooldownAutoScalerStrategy {
    configuration: ScalingConfig,
}

impl CooldownAutoScalerStrategy {
    pub fn new(configuration: ScalingConfig) -> Self {
        Self { configuration }
    }
}

impl AutoScalerStrategyTrait for CooldownAutoScalerStrategy {
    fn evaluate(
        &self,
        demand: &DemandSnapshot,
        current_replicas: u32,
        state: &CooldownState,
        now: DateTime<Utc>,
    ) -> Decision {
        let needed_replicas = demand.needed();
        let mut target_replicas = current_replicas;

        let next_state = if needed_replicas > 0 {
            // Scale up straight to the demand, there is no cooldown on the way up.
            if current_replicas < self.configuration.max_replicas()
                && needed_replicas > current_replicas
            {
                target_replicas = needed_replicas;
            }
            CooldownState::Correct
        } else {
            match *state {
                CooldownState::Cooling { anchor } => {
                    let elapsed = now.signed_duration_since(anchor).num_seconds();
                    if elapsed > i64::from(self.configuration.cooldown_seconds()) {
                        target_replicas =
                            current_replicas.saturating_sub(self.configuration.scale_down_step());
                        CooldownState::Cooling { anchor: now }
                    } else {
                        CooldownState::Cooling { anchor }
                    }
                }
                // The first idle tick only starts the clock.
                CooldownState::Unknown | CooldownState::Correct => {
                    CooldownState::Cooling { anchor: now }
                }
            }
        };

        Decision {
            target_replicas: self.configuration.clamp(target_replicas),
            next_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn strategy(min: u32, max: u32, step: u32, cooldown: u32) -> CooldownAutoScalerStrategy {
        CooldownAutoScalerStrategy::new(ScalingConfig::new(min, max, step, cooldown).unwrap())
    }

    fn default_strategy() -> CooldownAutoScalerStrategy {
        strategy(1, 50, 20, 300)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap()
    }

    fn demand(running: u32, scheduled: u32) -> DemandSnapshot {
        DemandSnapshot { running, scheduled }
    }

    #[test]
    fn test_sufficient_capacity_holds() {
        let decision =
            default_strategy().evaluate(&demand(3, 2), 10, &CooldownState::Unknown, now());
        assert_eq!(decision.target_replicas, 10);
        assert_eq!(decision.next_state, CooldownState::Correct);
    }

    #[test]
    fn test_scale_up_to_demand() {
        let decision =
            default_strategy().evaluate(&demand(4, 8), 10, &CooldownState::Correct, now());
        assert_eq!(decision.target_replicas, 12);
        assert_eq!(decision.next_state, CooldownState::Correct);
    }

    #[test]
    fn test_scale_up_clamped_at_max() {
        let decision =
            default_strategy().evaluate(&demand(100, 0), 5, &CooldownState::Unknown, now());
        assert_eq!(decision.target_replicas, 50);
        assert_eq!(decision.next_state, CooldownState::Correct);
    }

    #[test]
    fn test_unmet_demand_at_ceiling_holds_at_max() {
        let decision =
            default_strategy().evaluate(&demand(80, 20), 50, &CooldownState::Correct, now());
        assert_eq!(decision.target_replicas, 50);

        // Somebody scaled the pool past the limit by hand, bring it back within range.
        let decision =
            default_strategy().evaluate(&demand(80, 20), 60, &CooldownState::Correct, now());
        assert_eq!(decision.target_replicas, 50);
    }

    #[test]
    fn test_demand_interrupts_cooling() {
        let cooling = CooldownState::Cooling {
            anchor: now() - Duration::seconds(1_000),
        };
        let decision = default_strategy().evaluate(&demand(0, 1), 10, &cooling, now());
        assert_eq!(decision.target_replicas, 10);
        assert_eq!(decision.next_state, CooldownState::Correct);
    }

    #[test]
    fn test_first_idle_tick_starts_cooldown() {
        for state in [CooldownState::Unknown, CooldownState::Correct] {
            let decision = default_strategy().evaluate(&demand(0, 0), 10, &state, now());
            assert_eq!(decision.target_replicas, 10);
            assert_eq!(decision.next_state, CooldownState::Cooling { anchor: now() });
        }
    }

    #[test]
    fn test_within_cooldown_holds() {
        let anchor = now() - Duration::seconds(300);
        let decision = default_strategy().evaluate(
            &demand(0, 0),
            10,
            &CooldownState::Cooling { anchor },
            now(),
        );
        assert_eq!(decision.target_replicas, 10);
        assert_eq!(decision.next_state, CooldownState::Cooling { anchor });
    }

    #[test]
    fn test_partial_seconds_do_not_expire_cooldown() {
        let anchor = now() - Duration::milliseconds(300_900);
        let decision = default_strategy().evaluate(
            &demand(0, 0),
            10,
            &CooldownState::Cooling { anchor },
            now(),
        );
        assert_eq!(decision.target_replicas, 10);
        assert_eq!(decision.next_state, CooldownState::Cooling { anchor });
    }

    #[test]
    fn test_expired_cooldown_steps_down_to_min() {
        let decision = default_strategy().evaluate(
            &demand(0, 0),
            10,
            &CooldownState::Cooling {
                anchor: now() - Duration::seconds(301),
            },
            now(),
        );
        assert_eq!(decision.target_replicas, 1);
        assert_eq!(decision.next_state, CooldownState::Cooling { anchor: now() });
    }

    #[test]
    fn test_expired_cooldown_steps_down_by_step() {
        let decision = strategy(1, 50, 5, 60).evaluate(
            &demand(0, 0),
            30,
            &CooldownState::Cooling {
                anchor: now() - Duration::seconds(61),
            },
            now(),
        );
        assert_eq!(decision.target_replicas, 25);
        assert_eq!(decision.next_state, CooldownState::Cooling { anchor: now() });
    }

    #[test]
    fn test_scale_down_rate_limited() {
        let strategy = strategy(1, 50, 5, 60);
        let mut state = CooldownState::Unknown;
        let mut replicas = 20;
        let start = now();
        let mut changes = Vec::new();

        // Idle for ten minutes, evaluated every 30 seconds.
        for tick in 0..=20 {
            let decision =
                strategy.evaluate(&demand(0, 0), replicas, &state, start + Duration::seconds(tick * 30));
            if decision.changes(replicas) {
                changes.push((tick, decision.target_replicas));
            }
            replicas = decision.target_replicas;
            state = decision.next_state;
        }

        // Clock starts at tick 0, first step once more than 60s has passed (tick 3),
        // then one step every 90s after that until the floor is reached.
        assert_eq!(changes, vec![(3, 15), (6, 10), (9, 5), (12, 1)]);
    }

    #[test]
    fn test_idempotent_for_unchanged_inputs() {
        let strategy = default_strategy();
        let states = [
            CooldownState::Unknown,
            CooldownState::Correct,
            CooldownState::Cooling {
                anchor: now() - Duration::seconds(10),
            },
            CooldownState::Cooling {
                anchor: now() - Duration::seconds(3_600),
            },
        ];
        for state in states {
            for snapshot in [demand(0, 0), demand(3, 4), demand(60, 0)] {
                let first = strategy.evaluate(&snapshot, 10, &state, now());
                let second = strategy.evaluate(&snapshot, first.target_replicas, &first.next_state, now());
                assert!(!second.changes(first.target_replicas));
                assert_eq!(second.next_state, first.next_state);
            }
        }
    }

    #[test]
    fn test_target_always_within_limits() {
        let strategy = strategy(3, 12, 4, 30);
        let states = [
            CooldownState::Unknown,
            CooldownState::Correct,
            CooldownState::Cooling { anchor: now() },
            CooldownState::Cooling {
                anchor: now() - Duration::seconds(31),
            },
        ];
        for state in states {
            for current in 0..20 {
                for needed in [0, 1, 5, 12, 13, 1_000] {
                    let decision = strategy.evaluate(&demand(needed, 0), current, &state, now());
                    assert!(
                        (3..=12).contains(&decision.target_replicas),
                        "target {} out of range for current {} needed {} state {:?}",
                        decision.target_replicas,
                        current,
                        needed,
                        state
                    );
                }
            }
        }
    }

    #[test]
    fn test_running_and_scheduled_count_alike() {
        let strategy = default_strategy();
        let running = strategy.evaluate(&demand(15, 0), 10, &CooldownState::Correct, now());
        let scheduled = strategy.evaluate(&demand(0, 15), 10, &CooldownState::Correct, now());
        assert_eq!(running, scheduled);
        assert_eq!(running.target_replicas, 15);
    }
}
