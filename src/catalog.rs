//! Object catalog: per-object cutout counts, box sizes, storage offsets
//! and per-cutout geometry.
//!
//! Every per-cutout column is a `(num_objects, nmax)` array. Only the first
//! `ncutout` entries of an object's row are meaningful; the rest is padding.

use ndarray::{Array1, Array2};

use crate::error::{MedsError, Result};
use crate::geom::jacobian::{Jacobian, Matrix2};

/// One row of the source image table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageInfo {
    pub image_path: String,
    pub sky_path: String,
}

/// Per-cutout catalog entry, used to assemble a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CutoutRecord {
    pub file_id: usize,
    pub start_row: usize,
    pub orig_row: f64,
    pub orig_col: f64,
    pub orig_start_row: i64,
    pub orig_start_col: i64,
    pub cutout_row: f64,
    pub cutout_col: f64,
    pub dudrow: f64,
    pub dudcol: f64,
    pub dvdrow: f64,
    pub dvdcol: f64,
}

impl CutoutRecord {
    pub fn jacobian(&self) -> Jacobian {
        Jacobian {
            dudrow: self.dudrow,
            dudcol: self.dudcol,
            dvdrow: self.dvdrow,
            dvdcol: self.dvdcol,
        }
    }
}

/// Catalog entry for one object; cutout 0 is the coadd.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectRecord {
    pub id: i64,
    pub box_size: usize,
    pub cutouts: Vec<CutoutRecord>,
}

/// Column-oriented catalog contents as read from the object table.
#[derive(Debug, Clone)]
pub struct CatalogColumns {
    pub id: Array1<i64>,
    pub ncutout: Array1<usize>,
    pub box_size: Array1<usize>,
    pub file_id: Array2<usize>,
    pub start_row: Array2<usize>,
    pub orig_row: Array2<f64>,
    pub orig_col: Array2<f64>,
    pub orig_start_row: Array2<i64>,
    pub orig_start_col: Array2<i64>,
    pub cutout_row: Array2<f64>,
    pub cutout_col: Array2<f64>,
    pub dudrow: Array2<f64>,
    pub dudcol: Array2<f64>,
    pub dvdrow: Array2<f64>,
    pub dvdcol: Array2<f64>,
}

impl CatalogColumns {
    /// Zero-filled columns for `size` objects with room for `nmax` cutouts each.
    pub fn zeros(size: usize, nmax: usize) -> Self {
        let shape = (size, nmax);
        Self {
            id: Array1::zeros(size),
            ncutout: Array1::zeros(size),
            box_size: Array1::zeros(size),
            file_id: Array2::zeros(shape),
            start_row: Array2::zeros(shape),
            orig_row: Array2::zeros(shape),
            orig_col: Array2::zeros(shape),
            orig_start_row: Array2::zeros(shape),
            orig_start_col: Array2::zeros(shape),
            cutout_row: Array2::zeros(shape),
            cutout_col: Array2::zeros(shape),
            dudrow: Array2::zeros(shape),
            dudcol: Array2::zeros(shape),
            dvdrow: Array2::zeros(shape),
            dvdcol: Array2::zeros(shape),
        }
    }
}

/// Validated, immutable object catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    cols: CatalogColumns,
    nmax: usize,
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(MedsError::CatalogShape {
            column,
            expected,
            actual,
        });
    }
    Ok(())
}

impl Catalog {
    /// Validate column shapes and wrap them.
    ///
    /// Scalar columns need one entry per object. Per-cutout columns need the
    /// shape of `start_row`. No object may claim more cutouts than they hold.
    pub fn new(cols: CatalogColumns) -> Result<Self> {
        let size = cols.id.len();
        check_len("ncutout", size, cols.ncutout.len())?;
        check_len("box_size", size, cols.box_size.len())?;

        let nmax = cols.start_row.ncols();
        let per_cutout = [
            ("file_id", cols.file_id.dim()),
            ("start_row", cols.start_row.dim()),
            ("orig_row", cols.orig_row.dim()),
            ("orig_col", cols.orig_col.dim()),
            ("orig_start_row", cols.orig_start_row.dim()),
            ("orig_start_col", cols.orig_start_col.dim()),
            ("cutout_row", cols.cutout_row.dim()),
            ("cutout_col", cols.cutout_col.dim()),
            ("dudrow", cols.dudrow.dim()),
            ("dudcol", cols.dudcol.dim()),
            ("dvdrow", cols.dvdrow.dim()),
            ("dvdcol", cols.dvdcol.dim()),
        ];
        for (column, (rows, ncols)) in per_cutout {
            check_len(column, size, rows)?;
            check_len(column, nmax, ncols)?;
        }

        for (object, &ncutout) in cols.ncutout.iter().enumerate() {
            if ncutout > nmax {
                return Err(MedsError::TooManyCutouts {
                    object,
                    ncutout,
                    nmax,
                });
            }
        }

        Ok(Self { cols, nmax })
    }

    /// Build a catalog from per-object records, padding every object to
    /// the longest cutout list.
    pub fn from_objects(objects: &[ObjectRecord]) -> Result<Self> {
        let nmax = objects.iter().map(|o| o.cutouts.len()).max().unwrap_or(0);
        let mut cols = CatalogColumns::zeros(objects.len(), nmax);

        for (i, obj) in objects.iter().enumerate() {
            cols.id[i] = obj.id;
            cols.ncutout[i] = obj.cutouts.len();
            cols.box_size[i] = obj.box_size;
            for (j, c) in obj.cutouts.iter().enumerate() {
                cols.file_id[[i, j]] = c.file_id;
                cols.start_row[[i, j]] = c.start_row;
                cols.orig_row[[i, j]] = c.orig_row;
                cols.orig_col[[i, j]] = c.orig_col;
                cols.orig_start_row[[i, j]] = c.orig_start_row;
                cols.orig_start_col[[i, j]] = c.orig_start_col;
                cols.cutout_row[[i, j]] = c.cutout_row;
                cols.cutout_col[[i, j]] = c.cutout_col;
                cols.dudrow[[i, j]] = c.dudrow;
                cols.dudcol[[i, j]] = c.dudcol;
                cols.dvdrow[[i, j]] = c.dvdrow;
                cols.dvdcol[[i, j]] = c.dvdcol;
            }
        }

        Self::new(cols)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.cols.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cutouts any object can hold.
    pub fn nmax(&self) -> usize {
        self.nmax
    }

    pub fn columns(&self) -> &CatalogColumns {
        &self.cols
    }

    fn check_object(&self, object: usize) -> Result<()> {
        if object >= self.len() {
            return Err(MedsError::ObjectOutOfRange {
                index: object,
                size: self.len(),
            });
        }
        Ok(())
    }

    /// Check that `object` exists and has imaging, and that `cutout` (when
    /// given) is one of its cutouts.
    pub fn validate(&self, object: usize, cutout: Option<usize>) -> Result<()> {
        self.check_object(object)?;

        let ncutout = self.cols.ncutout[object];
        if ncutout == 0 {
            return Err(MedsError::EmptyObject { object });
        }

        if let Some(cutout) = cutout {
            if cutout >= ncutout {
                return Err(MedsError::CutoutOutOfRange {
                    object,
                    cutout,
                    ncutout,
                });
            }
        }
        Ok(())
    }

    /// Number of cutouts for `object`; zero means no imaging.
    pub fn ncutout(&self, object: usize) -> Result<usize> {
        self.check_object(object)?;
        Ok(self.cols.ncutout[object])
    }

    /// Side length in pixels of every cutout of `object`.
    pub fn box_size(&self, object: usize) -> Result<usize> {
        self.check_object(object)?;
        Ok(self.cols.box_size[object])
    }

    pub fn id(&self, object: usize) -> Result<i64> {
        self.check_object(object)?;
        Ok(self.cols.id[object])
    }

    /// Offset into the flat pixel extensions where the cutout begins.
    pub fn start_row(&self, object: usize, cutout: usize) -> Result<usize> {
        self.validate(object, Some(cutout))?;
        Ok(self.cols.start_row[[object, cutout]])
    }

    /// Index into the image info table.
    pub fn file_id(&self, object: usize, cutout: usize) -> Result<usize> {
        self.validate(object, Some(cutout))?;
        Ok(self.cols.file_id[[object, cutout]])
    }

    /// Object position `(row, col)` in the original source image.
    pub fn orig_position(&self, object: usize, cutout: usize) -> Result<(f64, f64)> {
        self.validate(object, Some(cutout))?;
        Ok((
            self.cols.orig_row[[object, cutout]],
            self.cols.orig_col[[object, cutout]],
        ))
    }

    /// Corner `(row, col)` of the cutout in the original source image.
    pub fn orig_start(&self, object: usize, cutout: usize) -> Result<(i64, i64)> {
        self.validate(object, Some(cutout))?;
        Ok((
            self.cols.orig_start_row[[object, cutout]],
            self.cols.orig_start_col[[object, cutout]],
        ))
    }

    /// Object centroid `(row, col)` within the cutout.
    pub fn cutout_position(&self, object: usize, cutout: usize) -> Result<(f64, f64)> {
        self.validate(object, Some(cutout))?;
        Ok((
            self.cols.cutout_row[[object, cutout]],
            self.cols.cutout_col[[object, cutout]],
        ))
    }

    pub fn jacobian(&self, object: usize, cutout: usize) -> Result<Jacobian> {
        self.validate(object, Some(cutout))?;
        let idx = [object, cutout];
        Ok(Jacobian {
            dudrow: self.cols.dudrow[idx],
            dudcol: self.cols.dudcol[idx],
            dvdrow: self.cols.dvdrow[idx],
            dvdcol: self.cols.dvdcol[idx],
        })
    }

    /// `[[dudrow, dudcol], [dvdrow, dvdcol]]` for the cutout.
    pub fn jacobian_matrix(&self, object: usize, cutout: usize) -> Result<Matrix2> {
        Ok(self.jacobian(object, cutout)?.matrix())
    }

    /// One Jacobian per valid cutout of `object`, coadd first.
    pub fn jacobian_list(&self, object: usize) -> Result<Vec<Jacobian>> {
        self.validate(object, None)?;
        (0..self.cols.ncutout[object])
            .map(|cutout| self.jacobian(object, cutout))
            .collect()
    }
}
