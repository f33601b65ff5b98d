//! Cutout addressing in flat pixel storage and 2-D views over it.
//!
//! The cutouts of one object sit back to back in each pixel extension, coadd
//! first, each `box_size * box_size` pixels long in row-major order. A
//! [`Mosaic`] stacks them vertically in a single buffer and hands out row
//! bands of that buffer as cutout views. Views never copy, so a write
//! through a cutout view is a write to the mosaic.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis, ErrorKind, ShapeError, s};

use crate::catalog::Catalog;
use crate::error::{MedsError, Result};

/// Which pixel extension a cutout is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutoutKind {
    Image,
    Weight,
    Seg,
}

impl CutoutKind {
    pub const ALL: [CutoutKind; 3] = [CutoutKind::Image, CutoutKind::Weight, CutoutKind::Seg];

    pub fn as_str(&self) -> &'static str {
        match self {
            CutoutKind::Image => "image",
            CutoutKind::Weight => "weight",
            CutoutKind::Seg => "seg",
        }
    }
}

impl fmt::Display for CutoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CutoutKind {
    type Err = MedsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(CutoutKind::Image),
            "weight" => Ok(CutoutKind::Weight),
            "seg" => Ok(CutoutKind::Seg),
            other => Err(MedsError::InvalidCutoutKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Storage rows holding a single cutout.
pub fn cutout_rows(catalog: &Catalog, object: usize, cutout: usize) -> Result<Range<usize>> {
    let start = catalog.start_row(object, cutout)?;
    let box_size = catalog.box_size(object)?;
    let end = box_size
        .checked_mul(box_size)
        .and_then(|npix| start.checked_add(npix))
        .ok_or(MedsError::AddressOverflow { object })?;
    Ok(start..end)
}

/// Storage rows spanning every cutout of an object.
pub fn mosaic_rows(catalog: &Catalog, object: usize) -> Result<Range<usize>> {
    catalog.validate(object, None)?;
    let start = catalog.start_row(object, 0)?;
    let box_size = catalog.box_size(object)?;
    let ncutout = catalog.ncutout(object)?;
    let end = box_size
        .checked_mul(box_size)
        .and_then(|npix| npix.checked_mul(ncutout))
        .and_then(|npix| start.checked_add(npix))
        .ok_or(MedsError::AddressOverflow { object })?;
    Ok(start..end)
}

/// Reshape flat row-major pixels into a `box_size x box_size` cutout.
pub fn reshape_cutout(flat: Vec<f32>, box_size: usize) -> Result<Array2<f32>> {
    Ok(Array2::from_shape_vec((box_size, box_size), flat)?)
}

/// All cutouts of one object stacked vertically in storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct Mosaic {
    pixels: Array2<f32>,
    box_size: usize,
    ncutout: usize,
}

impl Mosaic {
    /// Reshape `ncutout` back-to-back cutouts into a
    /// `(ncutout * box_size) x box_size` mosaic.
    pub fn from_flat(flat: Vec<f32>, ncutout: usize, box_size: usize) -> Result<Self> {
        let nrows = ncutout
            .checked_mul(box_size)
            .ok_or_else(|| ShapeError::from_kind(ErrorKind::Overflow))?;
        let pixels = Array2::from_shape_vec((nrows, box_size), flat)?;
        Ok(Self {
            pixels,
            box_size,
            ncutout,
        })
    }

    pub fn ncutout(&self) -> usize {
        self.ncutout
    }

    pub fn box_size(&self) -> usize {
        self.box_size
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.pixels.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.pixels.view_mut()
    }

    fn band(&self, i: usize) -> Range<usize> {
        i * self.box_size..(i + 1) * self.box_size
    }

    /// View of cutout `i`, or `None` past the last cutout.
    pub fn cutout(&self, i: usize) -> Option<ArrayView2<'_, f32>> {
        if i >= self.ncutout {
            return None;
        }
        Some(self.pixels.slice(s![self.band(i), ..]))
    }

    pub fn cutout_mut(&mut self, i: usize) -> Option<ArrayViewMut2<'_, f32>> {
        if i >= self.ncutout {
            return None;
        }
        let band = self.band(i);
        Some(self.pixels.slice_mut(s![band, ..]))
    }

    pub fn cutouts(&self) -> Vec<ArrayView2<'_, f32>> {
        (0..self.ncutout)
            .map(|i| self.pixels.slice(s![self.band(i), ..]))
            .collect()
    }

    /// Disjoint mutable views of every cutout.
    pub fn cutouts_mut(&mut self) -> Vec<ArrayViewMut2<'_, f32>> {
        let mut views = Vec::with_capacity(self.ncutout);
        let mut rest = self.pixels.view_mut();
        for _ in 0..self.ncutout {
            let (head, tail) = rest.split_at(Axis(0), self.box_size);
            views.push(head);
            rest = tail;
        }
        views
    }

    pub fn into_array(self) -> Array2<f32> {
        self.pixels
    }

    pub fn into_cutout_list(self) -> CutoutList {
        CutoutList { mosaic: self }
    }
}

/// List view over a [`Mosaic`]: element `i` is the mosaic's row band
/// `[i * box_size, (i + 1) * box_size)`, sharing its storage.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoutList {
    mosaic: Mosaic,
}

impl CutoutList {
    pub fn len(&self) -> usize {
        self.mosaic.ncutout
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<ArrayView2<'_, f32>> {
        self.mosaic.cutout(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<ArrayViewMut2<'_, f32>> {
        self.mosaic.cutout_mut(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = ArrayView2<'_, f32>> {
        self.mosaic.cutouts().into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = ArrayViewMut2<'_, f32>> {
        self.mosaic.cutouts_mut().into_iter()
    }

    pub fn mosaic(&self) -> &Mosaic {
        &self.mosaic
    }

    pub fn mosaic_mut(&mut self) -> &mut Mosaic {
        &mut self.mosaic
    }

    pub fn into_mosaic(self) -> Mosaic {
        self.mosaic
    }
}
