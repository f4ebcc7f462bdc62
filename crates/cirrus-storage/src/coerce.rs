//! Conversion of descriptors into plain key/value records.
//!
//! Records are what the command line prints and what callers that do not want
//! to depend on this crate's types consume. Keys follow the kebab-case option
//! vocabulary and absent fields are omitted rather than rendered as `null`.

use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// A plain key/value record.
pub type Record = serde_json::Map<String, Value>;

/// Converts a value into a [`Record`].
pub trait ToRecord {
    /// Returns the record form of `self`.
    fn to_record(&self) -> Result<Record>;
}

impl<T> ToRecord for T
where
    T: Serialize + ?Sized,
{
    fn to_record(&self) -> Result<Record> {
        let mut record = match serde_json::to_value(self)? {
            Value::Object(record) => record,
            other => {
                let mut record = Record::new();
                record.insert("value".to_owned(), other);
                record
            }
        };

        record.retain(|_, value| !value.is_null());
        Ok(record)
    }
}

/// Converts every item of `items` into a record.
pub fn to_records<'a, T, I>(items: I) -> Result<Vec<Record>>
where
    T: ToRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().map(ToRecord::to_record).collect()
}
