//! # Kubernetes Access
//!
//! The reconciler reads and patches resources through the traits in this module so
//! the state machine can be driven against in-memory stores in tests.

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::controller::issuer::{Issuer, IssuerScope};
use crate::crd::{CertificateRequest, ClusterDigicertIssuer, DigicertIssuer};

/// Field manager recorded on every patch issued by the controller
pub const FIELD_MANAGER: &str = "digicert-issuer";

/// Namespace and name of a resource. `namespace` is `None` for cluster-scoped resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        Self {
            namespace: resource.namespace(),
            name: resource.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to serialize patch: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Kube(kube::Error::Api(api_err)) => api_err.code == 404,
            _ => false,
        }
    }
}

/// Read and merge-patch access to CertificateRequests
#[async_trait]
pub trait CertificateRequestClient: Send + Sync {
    /// Fetch the current object. `None` means it was deleted.
    async fn get_request(&self, key: &ObjectKey)
        -> Result<Option<CertificateRequest>, StoreError>;

    /// Merge-patch metadata and spec
    async fn patch_request(&self, key: &ObjectKey, patch: &serde_json::Value)
        -> Result<(), StoreError>;

    /// Merge-patch the status subresource
    async fn patch_request_status(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// Read access to DigiCert issuers. A missing issuer is reported as [`StoreError::NotFound`].
#[async_trait]
pub trait IssuerClient: Send + Sync {
    async fn get_issuer(
        &self,
        scope: IssuerScope,
        key: &ObjectKey,
    ) -> Result<Arc<dyn Issuer>, StoreError>;
}

/// API server backed implementation of both client traits
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClient").finish_non_exhaustive()
    }
}

impl KubeClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced_api<K>(&self, key: &ObjectKey) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), key.namespace.as_deref().unwrap_or_default())
    }
}

async fn get_opt<K>(api: &Api<K>, name: &str) -> Result<Option<K>, StoreError>
where
    K: Resource + Clone + DeserializeOwned + fmt::Debug,
{
    match api.get(name).await {
        Ok(object) => Ok(Some(object)),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(None),
        Err(e) => Err(StoreError::Kube(e)),
    }
}

#[async_trait]
impl CertificateRequestClient for KubeClient {
    async fn get_request(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<CertificateRequest>, StoreError> {
        let api: Api<CertificateRequest> = self.namespaced_api(key);
        get_opt(&api, &key.name).await
    }

    async fn patch_request(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let api: Api<CertificateRequest> = self.namespaced_api(key);
        api.patch(&key.name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn patch_request_status(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let api: Api<CertificateRequest> = self.namespaced_api(key);
        api.patch_status(&key.name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IssuerClient for KubeClient {
    async fn get_issuer(
        &self,
        scope: IssuerScope,
        key: &ObjectKey,
    ) -> Result<Arc<dyn Issuer>, StoreError> {
        let found: Option<Arc<dyn Issuer>> = match scope {
            IssuerScope::Namespaced => {
                let api: Api<DigicertIssuer> = self.namespaced_api(key);
                get_opt(&api, &key.name)
                    .await?
                    .map(|issuer| Arc::new(issuer) as Arc<dyn Issuer>)
            }
            IssuerScope::Cluster => {
                let api: Api<ClusterDigicertIssuer> = Api::all(self.client.clone());
                get_opt(&api, &key.name)
                    .await?
                    .map(|issuer| Arc::new(issuer) as Arc<dyn Issuer>)
            }
        };
        found.ok_or_else(|| StoreError::NotFound {
            kind: scope.kind(),
            key: key.clone(),
        })
    }
}
