//! The image collaborator interface.
//!
//! Blob storage and the resizing backend live outside the core; the renderer
//! only needs URLs and filenames. Unknown keys are a hard failure: an image
//! embed naming a key nobody owns is a caller error, not something to paper
//! over in the output.

use crate::error::Result;

pub trait ImageService {
    /// URL serving the image, optionally bounded to `size` pixels and
    /// square-cropped.
    fn url(&self, key: &str, size: Option<u32>, crop: bool) -> Result<String>;

    /// Original filename of the image, used as alt text.
    fn filename(&self, key: &str) -> Result<String>;
}

/// Collaborator for deployments without an image backend: every lookup fails.
#[derive(Debug, Default)]
pub struct NoImages;

impl ImageService for NoImages {
    fn url(&self, key: &str, _size: Option<u32>, _crop: bool) -> Result<String> {
        Err(crate::error::Error::UnknownImage(key.to_string()))
    }

    fn filename(&self, key: &str) -> Result<String> {
        Err(crate::error::Error::UnknownImage(key.to_string()))
    }
}
