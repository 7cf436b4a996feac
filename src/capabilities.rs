use serde::Serialize;

use crate::errors::problem::Problem;
use crate::models::{ProviderIdentity, User};

/// Projection of an entity into the fields that may leave the service.
pub trait View {
        type Output: Serialize;

        fn view(&self, full: bool) -> Self::Output;
}

pub trait Authenticate {
        /// `Ok(None)` on a wrong password; `Err` only when the comparison itself fails.
        fn authenticate(&self, password: &str) -> Result<Option<&Self>, Problem>;
}

pub trait ProviderReconciler {
        fn find_or_create_from_provider(&self, identity: ProviderIdentity) -> Result<User, Problem>;
}
