//! Client core for the document approval front end: a fragment router with
//! an async guard, a local document cache and the sync layer that reconciles
//! that cache with the backend.

pub mod app;
pub mod cache;
pub mod error;
pub mod remote;
pub mod router;
pub mod session;
pub mod sync;
pub mod view;

pub use app::{AuthGuard, DevUserOutcome, DocEngineClient};
pub use cache::DocumentCache;
pub use error::{ClientError, ClientResult};
pub use remote::{HttpRemoteClient, RemoteClient};
pub use router::{DispatchOutcome, GuardResult, NavigationGuard, RouteParams, Router};
pub use session::Session;
pub use sync::{DetailOutcome, ListOutcome, MutationOutcome, SyncCoordinator};
pub use view::{Screen, View};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
