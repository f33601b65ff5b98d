//! Access to MEDS (Multi-Epoch Data Structures).
//!
//! A MEDS container stores, for every object, a stack of square cutouts
//! drawn from one flat pixel region per kind (image, weight, seg): the coadd
//! cutout first, then one cutout per single-epoch exposure. Each cutout
//! carries an affine Jacobian from its pixel frame to the tangent plane.
//!
//! [`Meds`] resolves `(object, cutout)` pairs to storage rows, reshapes them
//! into cutouts and mosaics, and builds composite weight maps that keep only
//! the pixels belonging to the object's coadd segmentation region.

pub mod catalog;
pub mod composite;
pub mod config;
pub mod cutout;
pub mod error;
pub mod geom;
pub mod meds;
pub mod source;

pub use catalog::{Catalog, CatalogColumns, CutoutRecord, ImageInfo, ObjectRecord};
pub use composite::{CompositeWeight, Frame, MaskGeometry, MaskOutcome};
pub use config::{ExtensionNames, MedsConfig};
pub use cutout::{CutoutKind, CutoutList, Mosaic};
pub use error::{MedsError, Result};
pub use geom::{Jacobian, Matrix2, SingularJacobian};
pub use meds::Meds;
pub use source::{MedsSource, MemorySource};
