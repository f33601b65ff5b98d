use thiserror::Error;

/// Errors raised while resolving or extracting MEDS cutouts.
#[derive(Debug, Error)]
pub enum MedsError {
    #[error("object index {index} should be within [0, {size})")]
    ObjectOutOfRange { index: usize, size: usize },

    #[error("requested cutout index {cutout} for object {object} should be in bounds [0, {ncutout})")]
    CutoutOutOfRange {
        object: usize,
        cutout: usize,
        ncutout: usize,
    },

    #[error("object {object} has no cutouts")]
    EmptyObject { object: usize },

    #[error("bad cutout type '{kind}'")]
    InvalidCutoutKind { kind: String },

    #[error("file id {file_id} for object {object} cutout {cutout} should be within [0, {size})")]
    FileIdOutOfRange {
        object: usize,
        cutout: usize,
        file_id: usize,
        size: usize,
    },

    #[error("catalog column '{column}' has {actual} entries, expected {expected}")]
    CatalogShape {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("object {object} declares {ncutout} cutouts but the catalog holds at most {nmax}")]
    TooManyCutouts {
        object: usize,
        ncutout: usize,
        nmax: usize,
    },

    #[error("storage rows of object {object} do not fit in the address space")]
    AddressOverflow { object: usize },

    #[error("no pixel extension named '{name}'")]
    MissingExtension { name: String },

    #[error("rows [{start}, {end}) are outside extension '{name}' of length {len}")]
    RowRangeOutOfBounds {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("weight cutout has shape {weight:?} but the coadd seg cutout has shape {seg:?}")]
    CutoutShapeMismatch {
        weight: (usize, usize),
        seg: (usize, usize),
    },

    #[error("mosaic holds {expected} cutouts but {actual} geometries were given")]
    GeometryCount { expected: usize, actual: usize },

    #[error("pixel rows do not fit the cutout shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, MedsError>;
