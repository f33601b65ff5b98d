//! The [`Meds`] accessor: cutouts, mosaics, composite weights and per-cutout
//! metadata for every object in a MEDS container.

use std::fmt;
use std::ops::Range;

use ndarray::{Array2, ArrayView2};

use crate::catalog::{Catalog, ImageInfo};
use crate::composite::{
    CompositeWeight, MaskGeometry, MaskOutcome, composite_mosaic_in_place, composite_weight,
};
use crate::config::MedsConfig;
use crate::cutout::{CutoutKind, CutoutList, Mosaic, cutout_rows, mosaic_rows, reshape_cutout};
use crate::error::{MedsError, Result};
use crate::geom::jacobian::{Jacobian, Matrix2};
use crate::source::MedsSource;

/// Multi-epoch data structure accessor.
///
/// The catalog, image info table and metadata are read from the source once,
/// here, and never change afterwards. Pixel data is read per request.
///
/// Cutout 0 of every object is the coadd; the rest are single-epoch cutouts.
pub struct Meds<S: MedsSource> {
    source: S,
    config: MedsConfig,
    catalog: Catalog,
    image_info: Vec<ImageInfo>,
    metadata: S::Metadata,
}

impl<S: MedsSource> Meds<S> {
    pub fn open(source: S) -> Result<Self> {
        Self::with_config(source, MedsConfig::default())
    }

    pub fn with_config(source: S, config: MedsConfig) -> Result<Self> {
        let catalog = source.read_catalog()?;
        let image_info = source.read_image_info()?;
        let metadata = source.read_metadata()?;
        tracing::debug!(
            objects = catalog.len(),
            nmax = catalog.nmax(),
            images = image_info.len(),
            "opened MEDS source"
        );
        Ok(Self {
            source,
            config,
            catalog,
            image_info,
            metadata,
        })
    }

    /// Number of objects.
    pub fn size(&self) -> usize {
        self.catalog.len()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn image_info(&self) -> &[ImageInfo] {
        &self.image_info
    }

    pub fn metadata(&self) -> &S::Metadata {
        &self.metadata
    }

    pub fn config(&self) -> &MedsConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn read(&self, kind: CutoutKind, rows: Range<usize>) -> Result<Vec<f32>> {
        let extension = self.config.extensions.name(kind);
        tracing::debug!(extension, start = rows.start, end = rows.end, "reading rows");
        self.source.read_rows(extension, rows)
    }

    /// A single `box_size x box_size` cutout.
    pub fn get_cutout(
        &self,
        object: usize,
        cutout: usize,
        kind: CutoutKind,
    ) -> Result<Array2<f32>> {
        let rows = cutout_rows(&self.catalog, object, cutout)?;
        let box_size = self.catalog.box_size(object)?;
        reshape_cutout(self.read(kind, rows)?, box_size)
    }

    /// Every cutout of `object` stacked vertically, coadd on top.
    pub fn get_mosaic(&self, object: usize, kind: CutoutKind) -> Result<Mosaic> {
        let rows = mosaic_rows(&self.catalog, object)?;
        let box_size = self.catalog.box_size(object)?;
        let ncutout = self.catalog.ncutout(object)?;
        Mosaic::from_flat(self.read(kind, rows)?, ncutout, box_size)
    }

    /// Every cutout of `object` as a list of views into one mosaic buffer.
    pub fn get_cutout_list(&self, object: usize, kind: CutoutKind) -> Result<CutoutList> {
        Ok(self.get_mosaic(object, kind)?.into_cutout_list())
    }

    /// Image info row for the source image of a cutout.
    pub fn get_source_info(&self, object: usize, cutout: usize) -> Result<&ImageInfo> {
        let file_id = self.catalog.file_id(object, cutout)?;
        self.image_info
            .get(file_id)
            .ok_or_else(|| MedsError::FileIdOutOfRange {
                object,
                cutout,
                file_id,
                size: self.image_info.len(),
            })
    }

    pub fn get_source_path(&self, object: usize, cutout: usize) -> Result<&str> {
        Ok(&self.get_source_info(object, cutout)?.image_path)
    }

    pub fn get_sky_path(&self, object: usize, cutout: usize) -> Result<&str> {
        Ok(&self.get_source_info(object, cutout)?.sky_path)
    }

    pub fn get_jacobian(&self, object: usize, cutout: usize) -> Result<Jacobian> {
        self.catalog.jacobian(object, cutout)
    }

    /// `[[dudrow, dudcol], [dvdrow, dvdcol]]`
    pub fn get_jacobian_matrix(&self, object: usize, cutout: usize) -> Result<Matrix2> {
        self.catalog.jacobian_matrix(object, cutout)
    }

    pub fn get_jacobian_list(&self, object: usize) -> Result<Vec<Jacobian>> {
        self.catalog.jacobian_list(object)
    }

    fn mask_geometries(&self, object: usize) -> Result<Vec<MaskGeometry>> {
        (0..self.catalog.ncutout(object)?)
            .map(|cutout| MaskGeometry::from_catalog(&self.catalog, object, cutout))
            .collect()
    }

    /// Mask `weight` (a cutout of `object`) against the coadd seg cutout.
    pub fn composite_weight(
        &self,
        object: usize,
        cutout: usize,
        weight: ArrayView2<'_, f32>,
        reference_seg: ArrayView2<'_, f32>,
    ) -> Result<CompositeWeight> {
        let geometry = MaskGeometry::from_catalog(&self.catalog, object, cutout)?;
        composite_weight(weight, reference_seg, &geometry)
    }

    /// Mask every cutout of a weight mosaic of `object` in place.
    pub fn composite_weight_mosaic(
        &self,
        object: usize,
        weights: &mut Mosaic,
        reference_seg: ArrayView2<'_, f32>,
    ) -> Result<Vec<MaskOutcome>> {
        let geometries = self.mask_geometries(object)?;
        composite_mosaic_in_place(weights, reference_seg, &geometries)
    }

    /// Mask every cutout of a weight list of `object` in place.
    pub fn composite_weight_list(
        &self,
        object: usize,
        weights: &mut CutoutList,
        reference_seg: ArrayView2<'_, f32>,
    ) -> Result<Vec<MaskOutcome>> {
        self.composite_weight_mosaic(object, weights.mosaic_mut(), reference_seg)
    }

    /// Composite weight for one cutout, read from storage.
    pub fn get_cweight_cutout(&self, object: usize, cutout: usize) -> Result<CompositeWeight> {
        let wt = self.get_cutout(object, cutout, CutoutKind::Weight)?;
        let coadd_seg = self.get_cutout(object, 0, CutoutKind::Seg)?;
        self.composite_weight(object, cutout, wt.view(), coadd_seg.view())
    }

    /// Composite weights for every cutout of `object` in one mosaic.
    pub fn get_cweight_mosaic(&self, object: usize) -> Result<Mosaic> {
        let mut wtmosaic = self.get_mosaic(object, CutoutKind::Weight)?;
        let coadd_seg = self.get_cutout(object, 0, CutoutKind::Seg)?;
        self.composite_weight_mosaic(object, &mut wtmosaic, coadd_seg.view())?;
        Ok(wtmosaic)
    }

    /// Composite weights for every cutout of `object`, as list views into
    /// one mosaic.
    pub fn get_cweight_cutout_list(&self, object: usize) -> Result<CutoutList> {
        Ok(self.get_cweight_mosaic(object)?.into_cutout_list())
    }
}

impl<S: MedsSource> fmt::Debug for Meds<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meds")
            .field("objects", &self.catalog.len())
            .field("nmax", &self.catalog.nmax())
            .field("images", &self.image_info.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<S: MedsSource> fmt::Display for Meds<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MEDS: {} objects, up to {} cutouts each, {} source images",
            self.catalog.len(),
            self.catalog.nmax(),
            self.image_info.len()
        )
    }
}
