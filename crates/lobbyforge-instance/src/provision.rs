//! The provisioning contract.
//!
//! Spinning up actual server processes is an external collaborator's job.
//! The registry hands it a [`ProvisionRequest`]; availability and
//! termination come back later as registry method calls driven by the
//! integration layer.

use std::future::Future;
use std::sync::Mutex;

use lobbyforge_protocol::{RequestId, ServerKind};

use crate::error::InstanceError;

/// Everything the external provisioner needs to boot one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub request: RequestId,
    pub map_name: String,
    pub kind: ServerKind,
    /// Launch arguments for the server binary.
    pub args: Vec<String>,
}

/// Boots game-server instances on demand.
///
/// `provision` returning `Ok` only means the request was accepted — the
/// instance is available once the integration layer delivers the
/// availability callback for its request id.
pub trait Provisioner: Send + Sync + 'static {
    fn provision(
        &self,
        request: ProvisionRequest,
    ) -> impl Future<Output = Result<(), InstanceError>> + Send;
}

/// A [`Provisioner`] that records requests instead of booting anything.
#[derive(Default)]
pub struct MockProvisioner {
    requests: Mutex<Vec<ProvisionRequest>>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request accepted so far, in order.
    pub fn requests(&self) -> Vec<ProvisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provisioner for MockProvisioner {
    async fn provision(&self, request: ProvisionRequest) -> Result<(), InstanceError> {
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}
