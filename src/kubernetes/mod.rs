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

use crate::config::{PoolIdentity, TargetKind};
use crate::error::*;
use crate::kubernetes::deployment::KubernetesDeploymentObject;
use crate::kubernetes::statefulset::KubernetesStatefulSetObject;
use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use kube::Client;

mod common;
pub mod deployment;
pub mod statefulset;

/// Kubernetes objects, eg deployments etc.
#[enum_dispatch]
pub enum KubernetesObject {
    /// An apps/v1 Deployment object.
    Deployment(KubernetesDeploymentObject),
    /// An apps/v1 StatefulSet object.
    StatefulSet(KubernetesStatefulSetObject),
}

impl KubernetesObject {
    /// Address the scalable object backing a worker pool.
    pub fn new(kube_client: Client, pool: &PoolIdentity) -> Self {
        match pool.kind {
            TargetKind::Deployment => KubernetesObject::Deployment(
                KubernetesDeploymentObject::new(kube_client, &pool.namespace, &pool.name),
            ),
            TargetKind::StatefulSet => KubernetesObject::StatefulSet(
                KubernetesStatefulSetObject::new(kube_client, &pool.namespace, &pool.name),
            ),
        }
    }
}

#[async_trait]
#[enum_dispatch(KubernetesObject)]
pub trait KubernetesObjectTrait {
    /// The namespace and name of the object.
    fn namespace_and_name(&self) -> (String, String);
    /// The current number of replicas.
    async fn replicas(&self) -> Result<u32, Error>;
    /// Update the number of replicas associated with this object.
    async fn scale(&self, replicas: u32) -> Result<(), Error>;
}
