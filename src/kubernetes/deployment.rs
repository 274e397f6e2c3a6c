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
use crate::kubernetes::common::{build_scale_patch, spec_replicas};
use crate::kubernetes::KubernetesObjectTrait;
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use snafu::ResultExt;

/// Kubernetes Deployment related functions.
pub struct KubernetesDeploymentObject {
    api: Api<Deployment>,
    namespace: String,
    name: String,
}

impl KubernetesDeploymentObject {
    pub fn new(kube_client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(kube_client, namespace),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl KubernetesObjectTrait for KubernetesDeploymentObject {
    fn namespace_and_name(&self) -> (String, String) {
        (self.namespace.clone(), self.name.clone())
    }

    async fn replicas(&self) -> Result<u32, Error> {
        let deployment = self.api.get(&self.name).await.context(KubeSnafu)?;
        spec_replicas(deployment.spec.and_then(|spec| spec.replicas))
    }

    async fn scale(&self, replicas: u32) -> Result<(), Error> {
        let patch = build_scale_patch(replicas, Utc::now());
        // Patch (update) the Deployment object.
        self.api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .context(KubeSnafu)?;
        Ok(())
    }
}
