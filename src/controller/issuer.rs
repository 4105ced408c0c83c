//! # Issuer Resolution
//!
//! Finds the `DigicertIssuer` or `ClusterDigicertIssuer` a CertificateRequest refers to.
//!
//! A namespaced issuer is looked up in the request's namespace first. When it does not
//! exist there the lookup is retried exactly once in the controller's default namespace,
//! which lets platform teams publish one shared issuer. Cluster issuers are never
//! retried, and neither are lookups that failed for any reason other than NotFound.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::constants::{CLUSTER_ISSUER_KIND, CONDITION_READY, ISSUER_KIND};
use crate::controller::client::{IssuerClient, ObjectKey, StoreError};
use crate::crd::{
    ClusterDigicertIssuer, ConditionStatus, DigicertIssuer, DigicertIssuerStatus, IssuerRef,
};

/// Common view over both issuer kinds
pub trait Issuer: fmt::Debug + Send + Sync {
    fn kind(&self) -> &'static str;
    fn status(&self) -> Option<&DigicertIssuerStatus>;
}

impl Issuer for DigicertIssuer {
    fn kind(&self) -> &'static str {
        ISSUER_KIND
    }

    fn status(&self) -> Option<&DigicertIssuerStatus> {
        self.status.as_ref()
    }
}

impl Issuer for ClusterDigicertIssuer {
    fn kind(&self) -> &'static str {
        CLUSTER_ISSUER_KIND
    }

    fn status(&self) -> Option<&DigicertIssuerStatus> {
        self.status.as_ref()
    }
}

/// Whether `issuerRef.kind` selects the namespaced or the cluster-scoped issuer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerScope {
    Namespaced,
    Cluster,
}

impl IssuerScope {
    /// `ClusterDigicertIssuer` (any case) selects the cluster issuer; every other
    /// value, including an empty kind, selects the namespaced one.
    #[must_use]
    pub fn from_kind(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case(CLUSTER_ISSUER_KIND) {
            Self::Cluster
        } else {
            Self::Namespaced
        }
    }

    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Namespaced => ISSUER_KIND,
            Self::Cluster => CLUSTER_ISSUER_KIND,
        }
    }
}

/// An issuer has no readiness until its own controller reports `Ready=True`.
#[must_use]
pub fn is_issuer_ready(issuer: &dyn Issuer) -> bool {
    issuer.status().is_some_and(|status| {
        status
            .conditions
            .iter()
            .any(|c| c.r#type == CONDITION_READY && c.status == ConditionStatus::True)
    })
}

#[derive(Debug)]
pub struct ResolvedIssuer {
    /// Where the issuer was found. Also the provisioner registry key.
    pub key: ObjectKey,
    pub issuer: Arc<dyn Issuer>,
}

#[derive(Debug, Error)]
#[error("Failed to retrieve {kind} resource {key}: {source}")]
pub struct ResolveError {
    pub kind: &'static str,
    /// The last key that was looked up
    pub key: ObjectKey,
    #[source]
    pub source: StoreError,
}

pub struct IssuerResolver<'a> {
    client: &'a dyn IssuerClient,
    default_namespace: &'a str,
}

impl fmt::Debug for IssuerResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerResolver")
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}

impl<'a> IssuerResolver<'a> {
    pub fn new(client: &'a dyn IssuerClient, default_namespace: &'a str) -> Self {
        Self {
            client,
            default_namespace,
        }
    }

    pub async fn resolve(
        &self,
        issuer_ref: &IssuerRef,
        request_namespace: &str,
    ) -> Result<ResolvedIssuer, ResolveError> {
        let scope = IssuerScope::from_kind(&issuer_ref.kind);
        let key = match scope {
            IssuerScope::Namespaced => ObjectKey::namespaced(request_namespace, &issuer_ref.name),
            IssuerScope::Cluster => ObjectKey::cluster(&issuer_ref.name),
        };

        match self.client.get_issuer(scope, &key).await {
            Ok(issuer) => Ok(ResolvedIssuer { key, issuer }),
            Err(source) if source.is_not_found() && scope == IssuerScope::Namespaced => {
                let fallback = ObjectKey::namespaced(self.default_namespace, &issuer_ref.name);
                debug!(
                    issuer = %key,
                    fallback = %fallback,
                    "Issuer not found in request namespace, trying default namespace"
                );
                self.client
                    .get_issuer(scope, &fallback)
                    .await
                    .map(|issuer| ResolvedIssuer {
                        key: fallback.clone(),
                        issuer,
                    })
                    .map_err(|source| ResolveError {
                        kind: scope.kind(),
                        key: fallback,
                        source,
                    })
            }
            Err(source) => Err(ResolveError {
                kind: scope.kind(),
                key,
                source,
            }),
        }
    }
}
