//! Storage collaborator: the tables and flat pixel extensions of a MEDS
//! container.

use std::collections::HashMap;
use std::ops::Range;

use crate::catalog::{Catalog, ImageInfo};
use crate::error::{MedsError, Result};

/// Read access to a MEDS container.
///
/// Tables are read once when a [`Meds`](crate::Meds) accessor is built.
/// Pixel extensions are read on demand by contiguous row range, one pixel
/// per row. All pixel kinds are delivered as `f32`.
pub trait MedsSource {
    /// Opaque metadata record, handed back to callers unchanged.
    type Metadata;

    fn read_catalog(&self) -> Result<Catalog>;

    fn read_image_info(&self) -> Result<Vec<ImageInfo>>;

    fn read_metadata(&self) -> Result<Self::Metadata>;

    /// Read rows `[rows.start, rows.end)` of the named pixel extension.
    fn read_rows(&self, extension: &str, rows: Range<usize>) -> Result<Vec<f32>>;
}

/// A MEDS container held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemorySource<M = ()> {
    catalog: Catalog,
    image_info: Vec<ImageInfo>,
    metadata: M,
    extensions: HashMap<String, Vec<f32>>,
}

impl<M> MemorySource<M> {
    pub fn new(catalog: Catalog, image_info: Vec<ImageInfo>, metadata: M) -> Self {
        Self {
            catalog,
            image_info,
            metadata,
            extensions: HashMap::new(),
        }
    }

    /// Add or replace a named flat pixel extension.
    pub fn with_extension(mut self, name: impl Into<String>, pixels: Vec<f32>) -> Self {
        self.extensions.insert(name.into(), pixels);
        self
    }

    pub fn extension(&self, name: &str) -> Option<&[f32]> {
        self.extensions.get(name).map(Vec::as_slice)
    }
}

impl<M: Clone> MedsSource for MemorySource<M> {
    type Metadata = M;

    fn read_catalog(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }

    fn read_image_info(&self) -> Result<Vec<ImageInfo>> {
        Ok(self.image_info.clone())
    }

    fn read_metadata(&self) -> Result<M> {
        Ok(self.metadata.clone())
    }

    fn read_rows(&self, extension: &str, rows: Range<usize>) -> Result<Vec<f32>> {
        let pixels = self
            .extensions
            .get(extension)
            .ok_or_else(|| MedsError::MissingExtension {
                name: extension.to_string(),
            })?;

        if rows.start > rows.end || rows.end > pixels.len() {
            return Err(MedsError::RowRangeOutOfBounds {
                name: extension.to_string(),
                start: rows.start,
                end: rows.end,
                len: pixels.len(),
            });
        }
        Ok(pixels[rows].to_vec())
    }
}
