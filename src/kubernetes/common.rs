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

use crate::config::ANNOTATION_BASE;
use crate::error::*;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use snafu::OptionExt;

/// Merge patch setting the replica count and recording when we did so.
pub(crate) fn build_scale_patch(replicas: u32, now: DateTime<Utc>) -> Value {
    json!({
        "metadata": {
            "annotations": {
                format!("{}/last_modified", ANNOTATION_BASE): now.to_rfc3339()
            }
        },
        "spec": {
            "replicas": replicas
        }
    })
}

/// Convert a spec replica count into an unsigned count.
pub(crate) fn spec_replicas(replicas: Option<i32>) -> Result<u32, Error> {
    let replicas = replicas.context(KubeSpecSnafu)?;
    u32::try_from(replicas)
        .ok()
        .context(ReplicasOutOfRangeSnafu { replicas })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_scale_patch() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
        let patch = build_scale_patch(7, now);

        assert_eq!(patch["spec"]["replicas"], 7);
        assert_eq!(
            patch["metadata"]["annotations"]["buildkite-scaler.io/last_modified"],
            "2020-06-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_spec_replicas() {
        assert_eq!(spec_replicas(Some(3)).unwrap(), 3);
        assert!(matches!(
            spec_replicas(Some(-1)),
            Err(Error::ReplicasOutOfRange { replicas: -1 })
        ));
        assert!(matches!(spec_replicas(None), Err(Error::KubeSpec {})));
    }
}
