//! Readiness evaluation of the managed StorageCluster

use kube::Resource;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::crd::StorageCluster;
use crate::readiness::{Readiness, ReadinessSink};
use crate::store::{guarded, ObjectKey, ResourceStore};
use crate::Error;

/// Verdict for an observed StorageCluster: ready exactly when its phase is `Ready`
pub fn readiness_of(sc: &StorageCluster) -> Readiness {
    if sc.is_ready() {
        Readiness::Ready
    } else {
        Readiness::not_ready(format!("{} not ready.", StorageCluster::kind(&())))
    }
}

/// Read the StorageCluster at `key` and push the verdict to `sink`.
///
/// A missing child is [`Error::NotFound`]; on any read failure the sink is
/// left untouched.
pub async fn evaluate_readiness(
    store: &dyn ResourceStore,
    sink: &dyn ReadinessSink,
    key: &ObjectKey,
    cancel: &CancellationToken,
) -> Result<Readiness, Error> {
    let current = guarded(cancel, "get StorageCluster", store.get_storage_cluster(key))
        .await
        .and_then(|found| {
            found.ok_or_else(|| Error::not_found(StorageCluster::kind(&()), key))
        });

    let sc = match current {
        Ok(sc) => sc,
        Err(e) => {
            error!(error = %e, storage_cluster = %key, "error getting StorageCluster");
            return Err(e);
        }
    };

    let verdict = readiness_of(&sc);
    match &verdict {
        Readiness::Ready => sink.set_ready(),
        Readiness::NotReady { reason } => sink.unset_ready(reason),
    }
    Ok(verdict)
}
