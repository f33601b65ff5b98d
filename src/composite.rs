//! Composite weight maps: zero weight pixels that do not belong to the
//! object's segmentation region in the coadd.
//!
//! The coadd cutout shares its pixel grid with the coadd seg map, so masking
//! it is a direct comparison. A single-epoch cutout has its own pixel frame.
//! Each of its pixels is carried to the tangent plane with the epoch
//! Jacobian, then back into coadd pixels with the inverse coadd Jacobian, and
//! the seg label found there decides whether the weight survives.

use ndarray::{Array2, ArrayView2, ArrayViewMut2, Zip};

use crate::catalog::Catalog;
use crate::cutout::Mosaic;
use crate::error::{MedsError, Result};
use crate::geom::jacobian::Jacobian;

/// Pixel frame of the cutout being masked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    /// The coadd cutout itself.
    Reference,
    /// A single-epoch cutout related to the coadd through Jacobians.
    Epoch {
        jacobian: Jacobian,
        reference_jacobian: Jacobian,
        /// Object centroid `(row, col)` in the coadd cutout.
        reference_anchor: (f64, f64),
    },
}

/// Geometry needed to mask one cutout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskGeometry {
    /// Object centroid `(row, col)` in this cutout.
    pub anchor: (f64, f64),
    pub frame: Frame,
}

impl MaskGeometry {
    /// Geometry of `cutout` of `object`, cutout 0 being the coadd.
    pub fn from_catalog(catalog: &Catalog, object: usize, cutout: usize) -> Result<Self> {
        let anchor = catalog.cutout_position(object, cutout)?;
        let frame = if cutout == 0 {
            Frame::Reference
        } else {
            Frame::Epoch {
                jacobian: catalog.jacobian(object, cutout)?,
                reference_jacobian: catalog.jacobian(object, 0)?,
                reference_anchor: catalog.cutout_position(object, 0)?,
            }
        };
        Ok(Self { anchor, frame })
    }
}

/// How a weight cutout was masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskOutcome {
    /// Pixels outside the object's seg region were zeroed.
    Masked,
    /// The coadd Jacobian could not be inverted; every pixel was zeroed.
    SingularReference,
}

/// A composited weight cutout and how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeWeight {
    pub weight: Array2<f32>,
    pub outcome: MaskOutcome,
}

/// Clamp a pixel index into `[0, len)`; `len` must be nonzero.
fn clip_index(pos: i64, len: usize) -> usize {
    pos.clamp(0, len as i64 - 1) as usize
}

fn seg_label_at(seg: &ArrayView2<'_, f32>, (row, col): (f64, f64)) -> f32 {
    let (nrow, ncol) = seg.dim();
    seg[[
        clip_index(row.round() as i64, nrow),
        clip_index(col.round() as i64, ncol),
    ]]
}

/// Mask `weight` in place against the coadd seg map.
///
/// Only two things ever happen to a pixel: it is left alone or set to zero.
/// A coadd weight must have the same shape as the seg map. An epoch weight
/// may have any shape, since its pixels are looked up in the seg map only
/// after mapping into the coadd frame.
///
/// Positions are rounded to the nearest pixel with halves rounded away from
/// zero, so a coadd coordinate of `-0.5` lands outside the map and `2.5`
/// lands on pixel 3.
pub fn composite_weight_in_place(
    mut weight: ArrayViewMut2<'_, f32>,
    reference_seg: ArrayView2<'_, f32>,
    geometry: &MaskGeometry,
) -> Result<MaskOutcome> {
    match geometry.frame {
        Frame::Reference => {
            if weight.dim() != reference_seg.dim() {
                return Err(MedsError::CutoutShapeMismatch {
                    weight: weight.dim(),
                    seg: reference_seg.dim(),
                });
            }
            if reference_seg.is_empty() {
                return Ok(MaskOutcome::Masked);
            }

            let seg_id = seg_label_at(&reference_seg, geometry.anchor);
            Zip::from(&mut weight)
                .and(&reference_seg)
                .for_each(|w, &label| {
                    if label != seg_id {
                        *w = 0.0;
                    }
                });
        }
        Frame::Epoch {
            jacobian,
            reference_jacobian,
            reference_anchor,
        } => {
            let cjinv = match reference_jacobian.inverse() {
                Ok(inv) => inv,
                Err(err) => {
                    tracing::warn!("coadd {err}, setting weight to zero");
                    weight.fill(0.0);
                    return Ok(MaskOutcome::SingularReference);
                }
            };

            // nothing in the coadd to land on
            if reference_seg.is_empty() {
                weight.fill(0.0);
                return Ok(MaskOutcome::Masked);
            }

            let seg_id = seg_label_at(&reference_seg, geometry.anchor);
            let (nrow, ncol) = reference_seg.dim();
            let (rowcen, colcen) = geometry.anchor;
            let (coadd_rowcen, coadd_colcen) = reference_anchor;

            for ((r, c), w) in weight.indexed_iter_mut() {
                let (u, v) = jacobian.apply(r as f64 - rowcen, c as f64 - colcen);

                let crow = (coadd_rowcen + u * cjinv[0][0] + v * cjinv[0][1]).round() as i64;
                let ccol = (coadd_colcen + u * cjinv[1][0] + v * cjinv[1][1]).round() as i64;

                let outside =
                    crow < 0 || crow >= nrow as i64 || ccol < 0 || ccol >= ncol as i64;
                let label = reference_seg[[clip_index(crow, nrow), clip_index(ccol, ncol)]];

                if outside || label != seg_id {
                    *w = 0.0;
                }
            }
        }
    }

    Ok(MaskOutcome::Masked)
}

/// Masked copy of `weight`; the input is left untouched.
pub fn composite_weight(
    weight: ArrayView2<'_, f32>,
    reference_seg: ArrayView2<'_, f32>,
    geometry: &MaskGeometry,
) -> Result<CompositeWeight> {
    let mut out = weight.to_owned();
    let outcome = composite_weight_in_place(out.view_mut(), reference_seg, geometry)?;
    Ok(CompositeWeight {
        weight: out,
        outcome,
    })
}

/// Mask every cutout of a weight mosaic in place. `geometries[i]` belongs
/// to cutout `i`.
pub fn composite_mosaic_in_place(
    weights: &mut Mosaic,
    reference_seg: ArrayView2<'_, f32>,
    geometries: &[MaskGeometry],
) -> Result<Vec<MaskOutcome>> {
    if geometries.len() != weights.ncutout() {
        return Err(MedsError::GeometryCount {
            expected: weights.ncutout(),
            actual: geometries.len(),
        });
    }

    weights
        .cutouts_mut()
        .into_iter()
        .zip(geometries)
        .map(|(wt, geometry)| composite_weight_in_place(wt, reference_seg, geometry))
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, s};

    use super::*;

    const OBJ: f32 = 7.0;
    const NEIGHBOR: f32 = 3.0;

    /// Seg map with the object occupying a centred square and a neighbour
    /// filling the rest of the right-hand columns.
    fn make_seg(n: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, n), |(r, c)| {
            let lo = n / 4;
            let hi = n - n / 4;
            if (lo..hi).contains(&r) && (lo..hi).contains(&c) {
                OBJ
            } else if c >= hi {
                NEIGHBOR
            } else {
                0.0
            }
        })
    }

    fn make_weight(n: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, n), |(r, c)| 1.0 + (r * n + c) as f32)
    }

    fn center(n: usize) -> (f64, f64) {
        let c = (n as f64 - 1.0) / 2.0;
        (c, c)
    }

    fn epoch(jacobian: Jacobian, reference_jacobian: Jacobian, n: usize) -> MaskGeometry {
        MaskGeometry {
            anchor: center(n),
            frame: Frame::Epoch {
                jacobian,
                reference_jacobian,
                reference_anchor: center(n),
            },
        }
    }

    #[test]
    fn reference_frame_keeps_only_object_pixels() {
        let n = 16;
        let seg = make_seg(n);
        let wt = make_weight(n);
        let geometry = MaskGeometry {
            anchor: center(n),
            frame: Frame::Reference,
        };

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();
        assert_eq!(cw.outcome, MaskOutcome::Masked);
        assert_eq!(cw.weight.dim(), wt.dim());

        Zip::from(&cw.weight)
            .and(&wt)
            .and(&seg)
            .for_each(|&out, &orig, &label| {
                if label == OBJ {
                    assert_eq!(out, orig);
                } else {
                    assert_eq!(out, 0.0);
                }
            });
    }

    #[test]
    fn identity_epoch_matches_reference() {
        let n = 16;
        let seg = make_seg(n);
        let wt = make_weight(n);

        let reference = MaskGeometry {
            anchor: center(n),
            frame: Frame::Reference,
        };
        let ident = epoch(Jacobian::IDENTITY, Jacobian::IDENTITY, n);

        let a = composite_weight(wt.view(), seg.view(), &reference).unwrap();
        let b = composite_weight(wt.view(), seg.view(), &ident).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn singular_reference_zeroes_everything() {
        let n = 8;
        let seg = make_seg(n);
        let wt = make_weight(n);
        let zero = Jacobian::from_matrix([[0.0; 2]; 2]);

        let cw = composite_weight(wt.view(), seg.view(), &epoch(Jacobian::IDENTITY, zero, n))
            .unwrap();
        assert_eq!(cw.outcome, MaskOutcome::SingularReference);
        assert_eq!(cw.weight.dim(), (n, n));
        assert!(cw.weight.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn epoch_pixels_mapping_outside_coadd_are_zeroed() {
        // Epoch pixels are twice as large as coadd pixels, so the outer ring
        // of the epoch cutout lands beyond the coadd cutout edges.
        let n = 16;
        let seg = Array2::from_elem((n, n), OBJ);
        let wt = Array2::from_elem((n, n), 1.0f32);
        let geometry = epoch(
            Jacobian::from_matrix([[2.0, 0.0], [0.0, 2.0]]),
            Jacobian::IDENTITY,
            n,
        );

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();

        // Row 0 maps to coadd row 7.5 - 15 = -7.5: out of bounds.
        assert!(cw.weight.row(0).iter().all(|&w| w == 0.0));
        assert!(cw.weight.column(n - 1).iter().all(|&w| w == 0.0));
        // Pixel (7, 7) maps to (6.5, 6.5), inside the coadd.
        assert_eq!(cw.weight[[7, 7]], 1.0);
    }

    #[test]
    fn out_of_bounds_in_one_axis_is_enough() {
        // A pure row shift: columns stay in bounds while rows leave.
        let n = 8;
        let seg = Array2::from_elem((n, n), OBJ);
        let wt = Array2::from_elem((n, n), 1.0f32);
        let geometry = MaskGeometry {
            anchor: (0.0, 3.0),
            frame: Frame::Epoch {
                jacobian: Jacobian::IDENTITY,
                reference_jacobian: Jacobian::IDENTITY,
                reference_anchor: (4.0, 3.0),
            },
        };

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();

        // Epoch rows r map to coadd rows r + 4; rows 4..8 fall off the bottom.
        assert!(cw.weight.slice(s![0..4, ..]).iter().all(|&w| w == 1.0));
        assert!(cw.weight.slice(s![4..8, ..]).iter().all(|&w| w == 0.0));
    }

    #[test]
    fn rotated_epoch_uses_coadd_labels() {
        // Epoch frame is the coadd rotated by 90 degrees about the centre.
        let n = 9;
        let mut seg = Array2::from_elem((n, n), 0.0f32);
        seg.slice_mut(s![.., 4..]).fill(OBJ);
        let wt = Array2::from_elem((n, n), 1.0f32);

        let rot = Jacobian::from_matrix([[0.0, -1.0], [1.0, 0.0]]);
        let geometry = epoch(rot, Jacobian::IDENTITY, n);
        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();

        // (r, c) -> coadd (4 - (c - 4), 4 + (r - 4)): coadd col >= 4 iff r >= 4.
        for ((r, _), &w) in cw.weight.indexed_iter() {
            let expected = if r >= 4 { 1.0 } else { 0.0 };
            assert_eq!(w, expected, "row {r}");
        }
    }

    #[test]
    fn only_zeroes_are_written() {
        let n = 12;
        let seg = make_seg(n);
        let wt = make_weight(n);
        let geometry = epoch(
            Jacobian::from_matrix([[0.9, 0.1], [-0.1, 1.1]]),
            Jacobian::from_matrix([[1.0, 0.05], [0.0, 0.95]]),
            n,
        );

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();
        Zip::from(&cw.weight).and(&wt).for_each(|&out, &orig| {
            assert!(out == orig || out == 0.0);
        });
    }

    #[test]
    fn anchor_outside_cutout_is_clipped() {
        let n = 4;
        let seg = Array2::from_shape_fn((n, n), |(r, _)| r as f32);
        let wt = Array2::from_elem((n, n), 1.0f32);
        let geometry = MaskGeometry {
            anchor: (40.0, -3.0),
            frame: Frame::Reference,
        };

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();
        // Anchor clips to the last row, label 3.
        assert_eq!(cw.weight.row(3).sum(), 4.0);
        assert_eq!(cw.weight.sum(), 4.0);
    }

    #[test]
    fn coadd_shape_mismatch_is_an_error() {
        let seg = make_seg(8);
        let wt = make_weight(6);
        let geometry = MaskGeometry {
            anchor: (3.0, 3.0),
            frame: Frame::Reference,
        };
        assert!(matches!(
            composite_weight(wt.view(), seg.view(), &geometry),
            Err(MedsError::CutoutShapeMismatch { .. })
        ));
    }

    #[test]
    fn epoch_weight_may_differ_in_shape() {
        let seg = make_seg(8);
        let wt = Array2::from_elem((4, 6), 1.0f32);
        // Epoch (r, c) lands on coadd (r + 2, c + 1).
        let geometry = MaskGeometry {
            anchor: (1.5, 2.5),
            frame: Frame::Epoch {
                jacobian: Jacobian::IDENTITY,
                reference_jacobian: Jacobian::IDENTITY,
                reference_anchor: (3.5, 3.5),
            },
        };

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();
        assert_eq!(cw.outcome, MaskOutcome::Masked);
        assert_eq!(cw.weight.dim(), (4, 6));
        // Coadd object columns 2..6 are epoch columns 1..5.
        assert!(cw.weight.column(0).iter().all(|&w| w == 0.0));
        assert!(cw.weight.column(5).iter().all(|&w| w == 0.0));
        assert!(cw.weight.slice(s![.., 1..5]).iter().all(|&w| w == 1.0));
    }

    #[test]
    fn epoch_against_empty_seg_is_zeroed() {
        let seg = Array2::<f32>::zeros((0, 0));
        let wt = Array2::from_elem((3, 3), 1.0f32);
        let geometry = epoch(Jacobian::IDENTITY, Jacobian::IDENTITY, 3);

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();
        assert_eq!(cw.outcome, MaskOutcome::Masked);
        assert!(cw.weight.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn halves_round_away_from_zero() {
        let n = 4;
        let seg = Array2::from_elem((n, n), OBJ);
        let wt = Array2::from_elem((n, n), 1.0f32);
        // Epoch row r lands on coadd row r - 0.5.
        let geometry = MaskGeometry {
            anchor: (0.5, 0.0),
            frame: Frame::Epoch {
                jacobian: Jacobian::IDENTITY,
                reference_jacobian: Jacobian::IDENTITY,
                reference_anchor: (0.0, 0.0),
            },
        };

        let cw = composite_weight(wt.view(), seg.view(), &geometry).unwrap();
        // -0.5 rounds to -1 and falls off the top; 2.5 rounds to 3 and stays.
        assert!(cw.weight.row(0).iter().all(|&w| w == 0.0));
        assert!(cw.weight.slice(s![1.., ..]).iter().all(|&w| w == 1.0));
    }

    #[test]
    fn mosaic_is_masked_in_place() {
        let n = 8;
        let seg = make_seg(n);
        let flat: Vec<f32> = vec![1.0; 2 * n * n];
        let mut mosaic = Mosaic::from_flat(flat, 2, n).unwrap();
        let zero = Jacobian::from_matrix([[0.0; 2]; 2]);
        let geometries = [
            MaskGeometry {
                anchor: center(n),
                frame: Frame::Reference,
            },
            epoch(Jacobian::IDENTITY, zero, n),
        ];

        let outcomes = composite_mosaic_in_place(&mut mosaic, seg.view(), &geometries).unwrap();
        assert_eq!(
            outcomes,
            vec![MaskOutcome::Masked, MaskOutcome::SingularReference]
        );

        let coadd = mosaic.cutout(0).unwrap();
        Zip::from(&coadd).and(&seg).for_each(|&w, &label| {
            assert_eq!(w, if label == OBJ { 1.0 } else { 0.0 });
        });
        assert!(mosaic.cutout(1).unwrap().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn mosaic_geometry_count_must_match() {
        let mut mosaic = Mosaic::from_flat(vec![1.0; 32], 2, 4).unwrap();
        let seg = make_seg(4);
        let one = [MaskGeometry {
            anchor: (1.0, 1.0),
            frame: Frame::Reference,
        }];
        assert!(composite_mosaic_in_place(&mut mosaic, seg.view(), &one).is_err());
    }
}
