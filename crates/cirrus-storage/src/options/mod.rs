//! Translation of loosely-typed option maps into typed option sets.
//!
//! Callers may describe a bucket, object metadata or a listing with an
//! [`OptionMap`] keyed by kebab-case option names. Each option set is a plain
//! serde struct, so only recognized keys are applied and a recognized key
//! holding a value of the wrong shape is rejected with
//! [`Error::InvalidOption`].
//!
//! Unrecognized keys are ignored. This keeps maps shared across several
//! operations usable with each of them.

mod bucket;
mod list;
mod metadata;

use serde::de::DeserializeOwned;

pub use bucket::BucketOptions;
pub use list::{DEFAULT_PAGE_SIZE, ListOptions};

use crate::{Error, Result};

/// Option name to value mapping supplied by callers.
pub type OptionMap = serde_json::Map<String, serde_json::Value>;

/// Deserializes `options` into the option set `T`.
pub(crate) fn translate<T>(target: &'static str, options: &OptionMap) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|e| {
        Error::InvalidOption {
            target,
            reason: e.to_string(),
        }
    })
}
