use crate::config::Averaging;
use crate::index_space::{Axis, IndexSpace};
use crate::patch::Patch;
use crate::stencil::galerkin;




/**
 * Field positions within a direct-stencil patch: the diagonal entry, and
 * the symmetric couplings through a cell's low x-face and low y-face. The
 * coupling through cell (i, j)'s high x-face is the x-face entry at
 * (i + 1, j), so three fields describe the whole five-point stencil.
 */
pub const STENCIL_DIAG: usize = 0;
pub const STENCIL_XFACE: usize = 1;
pub const STENCIL_YFACE: usize = 2;
pub const NUM_STENCIL_FIELDS: usize = 3;




/**
 * The index space of a face-centered coefficient field over a block: one
 * extra index on the high side of the face axis, so both walls are present.
 */
pub fn face_space(block: &IndexSpace, axis: Axis) -> IndexSpace {
    block.extend_upper(1, axis)
}




/**
 * The index space of a direct-stencil patch over a block: one extra index
 * on the high side of both axes, so every face entry of every cell fits in
 * a single patch.
 */
pub fn stencil_space(block: &IndexSpace) -> IndexSpace {
    block.extend_upper(1, Axis::I).extend_upper(1, Axis::J)
}




/**
 * Discretized operator coefficients for one level, in one of two storage
 * forms: a cell-centered scalar field `a` with face-centered directional
 * fields `b` (the tensor form `alpha a phi - beta div(b grad phi)`), or a
 * precomputed per-point stencil. Fine-level coefficients are supplied by
 * the host program; coarse-level coefficients are always derived.
 */
#[derive(Clone, Debug)]
pub enum Coefficients {
    Tensor {
        alpha: f64,
        beta: f64,
        a: Vec<Patch>,
        b: [Vec<Patch>; 2],
    },
    Stencil {
        sten: Vec<Patch>,
    },
}




// ============================================================================
impl Coefficients {


    pub fn num_blocks(&self) -> usize {
        match self {
            Coefficients::Tensor { a, .. } => a.len(),
            Coefficients::Stencil { sten } => sten.len(),
        }
    }


    pub fn is_tensor(&self) -> bool {
        matches!(self, Coefficients::Tensor { .. })
    }


    pub fn is_stencil(&self) -> bool {
        matches!(self, Coefficients::Stencil { .. })
    }


    pub fn as_tensor(&self) -> Option<(f64, f64, &[Patch], &[Vec<Patch>; 2])> {
        match self {
            Coefficients::Tensor { alpha, beta, a, b } => Some((*alpha, *beta, a, b)),
            Coefficients::Stencil { .. } => None,
        }
    }


    pub fn as_stencil(&self) -> Option<&[Patch]> {
        match self {
            Coefficients::Stencil { sten } => Some(sten),
            Coefficients::Tensor { .. } => None,
        }
    }


    /**
     * Derive the coefficients of the next coarser level, respecting the
     * centering of each field: cell-centered fields coarsen by arithmetic
     * averaging of the four contributing fine cells; face-centered fields
     * combine the two fine faces overlying each coarse face, harmonically
     * or arithmetically per the averaging mode; direct stencils coarsen by
     * the Galerkin restrict-apply-prolong product.
     */
    pub fn coarsen(&self, averaging: Averaging) -> Coefficients {
        match self {
            Coefficients::Tensor { alpha, beta, a, b } => Coefficients::Tensor {
                alpha: *alpha,
                beta: *beta,
                a: a.iter().map(coarsen_cell_field).collect(),
                b: [
                    b[0].iter().map(|p| coarsen_face_field(p, Axis::I, averaging)).collect(),
                    b[1].iter().map(|p| coarsen_face_field(p, Axis::J, averaging)).collect(),
                ],
            },
            Coefficients::Stencil { sten } => Coefficients::Stencil {
                sten: sten.iter().map(coarsen_stencil_field).collect(),
            },
        }
    }
}




/**
 * Arithmetic average of the four fine cells under each coarse cell.
 */
fn coarsen_cell_field(fine: &Patch) -> Patch {
    Patch::from_fn_n(fine.space().coarsen_by(2), fine.num_fields(), |(i, j), field| {
        0.25 * (fine.get((2 * i, 2 * j), field)
              + fine.get((2 * i + 1, 2 * j), field)
              + fine.get((2 * i, 2 * j + 1), field)
              + fine.get((2 * i + 1, 2 * j + 1), field))
    })
}




/**
 * Combine the two fine faces overlying each coarse face. The harmonic mean
 * degenerates to zero when either fine face carries a zero coefficient,
 * which is the flux-preserving limit.
 */
fn coarsen_face_field(fine: &Patch, axis: Axis, averaging: Averaging) -> Patch {
    let coarse_space = match axis {
        Axis::I => fine.space().extend_upper(-1, Axis::I).coarsen_by(2).extend_upper(1, Axis::I),
        Axis::J => fine.space().extend_upper(-1, Axis::J).coarsen_by(2).extend_upper(1, Axis::J),
    };
    Patch::from_fn_n(coarse_space, fine.num_fields(), |(i, j), field| {
        let (f0, f1) = match axis {
            Axis::I => (fine.get((2 * i, 2 * j), field), fine.get((2 * i, 2 * j + 1), field)),
            Axis::J => (fine.get((2 * i, 2 * j), field), fine.get((2 * i + 1, 2 * j), field)),
        };
        match averaging {
            Averaging::Arithmetic => 0.5 * (f0 + f1),
            Averaging::Harmonic => {
                if f0 == 0.0 || f1 == 0.0 {
                    0.0
                } else {
                    2.0 * f0 * f1 / (f0 + f1)
                }
            }
        }
    })
}




/**
 * Galerkin product for one block's stencil patch.
 */
fn coarsen_stencil_field(fine: &Patch) -> Patch {
    let fine_cells = fine.space().extend_upper(-1, Axis::I).extend_upper(-1, Axis::J);
    let coarse_cells = fine_cells.coarsen_by(2);
    let space = stencil_space(&coarse_cells);
    let mut coarse = Patch::zeros(NUM_STENCIL_FIELDS, space.clone());

    for index in space.iter() {
        galerkin::stencil_rap(index, &mut coarse, fine, &coarse_cells)
    }
    coarse
}
