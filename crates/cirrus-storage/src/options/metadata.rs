use super::{OptionMap, translate};
use crate::Result;
use crate::types::{BlobDescriptor, BlobMetadata};

impl BlobMetadata {
    /// Translates an option map.
    ///
    /// Keys: `cache-control`, `content-disposition`, `content-encoding`,
    /// `content-language`, `content-type`.
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        translate("blob", options)
    }
}

impl BlobDescriptor {
    /// Returns this descriptor with the metadata options in `options` merged in.
    pub fn with_options(self, options: &OptionMap) -> Result<Self> {
        let overlay = BlobMetadata::from_options(options)?;
        let metadata = self.metadata.clone().merge(&overlay);
        Ok(self.with_metadata(metadata))
    }
}
