//! Assorted utility functions (missing batteries).
mod degradable;
mod std_ext;

pub(crate) mod fs;
pub(crate) mod retry;
pub(crate) mod tokio;
pub(crate) mod url;

pub(crate) use degradable::Degradable;

pub(crate) mod prelude {
    pub(crate) use super::std_ext::prelude::*;
}

pub(crate) type DynError = dyn std::error::Error + Send + Sync;
