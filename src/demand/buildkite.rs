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

use crate::demand::{DemandSnapshot, DemandSourceTrait};
use crate::error::*;
use async_trait::async_trait;
use serde::Deserialize;
use slog::{debug, Logger};
use snafu::ResultExt;
use std::time::Duration;

/// Default location of the Buildkite REST api.
pub const DEFAULT_API_URL: &str = "https://api.buildkite.com";

/// Number of builds requested per page.
const PAGE_SIZE: usize = 100;

/// Upper bound on pages followed in a single demand query.
const MAX_PAGES: usize = 20;

/// The subset of a Buildkite build object we care about.
#[derive(Clone, Debug, Deserialize)]
struct Build {
    state: String,
}

/// Counts running and scheduled builds through the Buildkite REST api.
pub struct BuildkiteDemandSource {
    logger: Logger,
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    organization: Option<String>,
}

impl BuildkiteDemandSource {
    pub fn new(
        logger: Logger,
        api_url: &str,
        api_token: &str,
        organization: Option<&str>,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context(HttpClientSnafu)?;
        Ok(Self {
            logger,
            client,
            api_url: api_url.trim_end_matches('/').into(),
            api_token: api_token.into(),
            organization: organization.map(String::from),
        })
    }

    /// Builds endpoint, scoped to the organization when one is configured.
    fn builds_uri(&self) -> String {
        match &self.organization {
            Some(organization) => format!(
                "{}/v2/organizations/{}/builds",
                self.api_url, organization
            ),
            None => format!("{}/v2/builds", self.api_url),
        }
    }

    /// Retrieve a single page of running and scheduled builds.
    async fn list_builds(&self, page: usize) -> Result<Vec<Build>, Error> {
        let body = self
            .client
            .get(self.builds_uri())
            .bearer_auth(&self.api_token)
            .query(&[("state[]", "running"), ("state[]", "scheduled")])
            .query(&[("per_page", PAGE_SIZE), ("page", page)])
            .send()
            .await
            .context(HttpClientSnafu)?
            .error_for_status()
            .context(HttpClientSnafu)?
            .text()
            .await
            .context(HttpClientSnafu)?;

        serde_json::from_str(&body).context(JsonSerializationSnafu)
    }
}

#[async_trait]
impl DemandSourceTrait for BuildkiteDemandSource {
    async fn demand(&self) -> Result<DemandSnapshot, Error> {
        let mut snapshot = DemandSnapshot::default();
        for page in 1..=MAX_PAGES {
            let builds = self.list_builds(page).await?;
            debug!(self.logger, "Retrieved page of builds";
                "page" => page,
                "count" => builds.len());

            for build in &builds {
                match build.state.as_str() {
                    "running" => snapshot.running += 1,
                    "scheduled" => snapshot.scheduled += 1,
                    state => {
                        return UnexpectedBuildStateSnafu {
                            state: state.to_string(),
                        }
                        .fail()
                    }
                }
            }

            // A short page is the last one.
            if builds.len() < PAGE_SIZE {
                return Ok(snapshot);
            }
        }

        TooManyBuildPagesSnafu { pages: MAX_PAGES }.fail()
    }
}
