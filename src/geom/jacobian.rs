use thiserror::Error;

/// Determinants smaller than this are treated as singular.
const SINGULAR_DET: f64 = 1e-30;

/// Row-major 2x2 matrix: `m[0] = [m00, m01]`, `m[1] = [m10, m11]`.
pub type Matrix2 = [[f64; 2]; 2];

/// Affine Jacobian mapping pixel offsets `(row, col)` to tangent-plane
/// offsets `(u, v)` for a single cutout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jacobian {
    pub dudrow: f64,
    pub dudcol: f64,
    pub dvdrow: f64,
    pub dvdcol: f64,
}

/// The Jacobian has no inverse.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("jacobian is singular (determinant {determinant:e})")]
pub struct SingularJacobian {
    pub determinant: f64,
}

impl Jacobian {
    pub const IDENTITY: Jacobian = Jacobian {
        dudrow: 1.0,
        dudcol: 0.0,
        dvdrow: 0.0,
        dvdcol: 1.0,
    };

    pub fn from_matrix(m: Matrix2) -> Self {
        Self {
            dudrow: m[0][0],
            dudcol: m[0][1],
            dvdrow: m[1][0],
            dvdcol: m[1][1],
        }
    }

    /// `[[dudrow, dudcol], [dvdrow, dvdcol]]`
    pub fn matrix(&self) -> Matrix2 {
        [[self.dudrow, self.dudcol], [self.dvdrow, self.dvdcol]]
    }

    pub fn determinant(&self) -> f64 {
        self.dudrow * self.dvdcol - self.dudcol * self.dvdrow
    }

    /// Map a pixel offset to tangent-plane coordinates `(u, v)`.
    pub fn apply(&self, drow: f64, dcol: f64) -> (f64, f64) {
        (
            drow * self.dudrow + dcol * self.dudcol,
            drow * self.dvdrow + dcol * self.dvdcol,
        )
    }

    /// Inverse matrix, mapping `(u, v)` back to `(row, col)` offsets.
    pub fn inverse(&self) -> Result<Matrix2, SingularJacobian> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_DET {
            return Err(SingularJacobian { determinant: det });
        }
        let inv_det = 1.0 / det;
        Ok([
            [inv_det * self.dvdcol, -inv_det * self.dudcol],
            [-inv_det * self.dvdrow, inv_det * self.dudrow],
        ])
    }
}
