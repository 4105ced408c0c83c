//! # Provisioners
//!
//! A provisioner is the DigiCert CertCentral client configured from one issuer. The
//! issuer controller builds a provisioner whenever an issuer becomes Ready and stores
//! it in the shared [`Provisioners`] registry under the issuer's key. The request
//! controller only ever loads from the registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::controller::client::ObjectKey;
use crate::crd::CertificateRequest;

/// DigiCert order identifiers. Zero means "not assigned".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub certificate_id: i64,
}

/// Result of placing an order. `cert_pem` is empty while the order awaits approval.
#[derive(Debug, Clone, Default)]
pub struct SignedCertificate {
    pub ca_pem: Vec<u8>,
    pub cert_pem: Vec<u8>,
    pub order: Order,
}

/// Result of polling an existing order. `cert_pem` is empty while it is still pending.
#[derive(Debug, Clone, Default)]
pub struct DownloadedCertificate {
    pub ca_pem: Vec<u8>,
    pub cert_pem: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("DigiCert rejected the request: {0}")]
    Rejected(String),

    #[error("DigiCert API request failed: {0}")]
    Api(String),
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Place a new order for the request's CSR.
    async fn sign(&self, request: &CertificateRequest)
        -> Result<SignedCertificate, ProvisionerError>;

    /// Fetch the certificate of the order recorded on the request's annotations.
    async fn download(
        &self,
        request: &CertificateRequest,
    ) -> Result<DownloadedCertificate, ProvisionerError>;
}

pub trait ProvisionerRegistry: Send + Sync {
    /// Provisioner of the issuer at `issuer`, if one is registered.
    fn load(&self, issuer: &ObjectKey) -> Option<Arc<dyn Provisioner>>;
}

/// In-process provisioner registry shared with the issuer controller
#[derive(Default)]
pub struct Provisioners {
    inner: RwLock<HashMap<ObjectKey, Arc<dyn Provisioner>>>,
}

impl fmt::Debug for Provisioners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Provisioners")
            .field("issuers", &inner.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Provisioners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, issuer: ObjectKey, provisioner: Arc<dyn Provisioner>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(issuer, provisioner);
    }

    pub fn remove(&self, issuer: &ObjectKey) -> Option<Arc<dyn Provisioner>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(issuer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProvisionerRegistry for Provisioners {
    fn load(&self, issuer: &ObjectKey) -> Option<Arc<dyn Provisioner>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(issuer)
            .cloned()
    }
}
