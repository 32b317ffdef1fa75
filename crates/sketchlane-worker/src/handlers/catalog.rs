//! Catalog operation handlers: boards, cores, libs, ports.

use sketchlane_protocol::ops::CatalogKind;
use sketchlane_protocol::RpcError;
use tracing::warn;

use crate::catalog;
use crate::executor::Invoker;

use super::{Lane, Reply};

/// Handle one of the listing operations.
pub fn handle(kind: CatalogKind, lane: &Lane) -> Result<Reply, RpcError> {
    let config = lane.config();
    let invoker = Invoker::new(config.invoker_config());
    catalog::list(&invoker, kind, config.catalog_timeout())
        .map(Reply::Ok)
        .map_err(|e| {
            warn!(kind = ?kind, error = %e, "listing failed");
            e.into()
        })
}
