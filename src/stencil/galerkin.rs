//! Direct stencil storage for operators with spatially varying coefficients,
//! where recomputing couplings from the coefficient fields on every sweep
//! would be wasteful, and the Galerkin (restrict-apply-prolong) product that
//! coarsens a stored stencil algebraically instead of rediscretizing.
//!
//! A stencil patch covers a block's `stencil_space` (one extra index on the
//! high side of each axis) with three fields per point: the diagonal entry
//! and the symmetric couplings through the point's low x- and y-faces.

use crate::coefficients::{face_space, stencil_space, Coefficients, NUM_STENCIL_FIELDS,
                          STENCIL_DIAG, STENCIL_XFACE, STENCIL_YFACE};
use crate::index_space::{Axis, IndexSpace};
use crate::level::Level;
use crate::linop::BcMode;
use crate::patch::Patch;
use super::{given_flux_faces, Discretization};




/**
 * Store the face couplings of the tensor operator at one point:
 * `-beta b / h^2` through the point's low faces, wherever those faces exist
 * in the given coefficient fields.
 */
pub fn set_stencil_faces(
    index: (i64, i64),
    sten: &mut Patch,
    bx: &Patch,
    by: &Patch,
    beta: f64,
    h: (f64, f64))
{
    if bx.space().contains(index) {
        sten.set(index, STENCIL_XFACE, -beta * bx.get(index, 0) / (h.0 * h.0))
    }
    if by.space().contains(index) {
        sten.set(index, STENCIL_YFACE, -beta * by.get(index, 0) / (h.1 * h.1))
    }
}




/**
 * Store the diagonal entry at one cell, from the face couplings already
 * present in the stencil patch: `alpha a` minus the sum of the four
 * neighbor couplings.
 */
pub fn set_stencil_diag(
    index: (i64, i64),
    sten: &mut Patch,
    a: &Patch,
    alpha: f64)
{
    let (i, j) = index;
    let couplings = sten.get((i, j), STENCIL_XFACE)
                  + sten.get((i + 1, j), STENCIL_XFACE)
                  + sten.get((i, j), STENCIL_YFACE)
                  + sten.get((i, j + 1), STENCIL_YFACE);

    sten.set(index, STENCIL_DIAG, alpha * a.get(index, 0) - couplings)
}




/**
 * Build a block's stencil patch from tensor coefficient fields.
 */
pub fn build_stencil(
    block: &IndexSpace,
    a: &Patch,
    bx: &Patch,
    by: &Patch,
    alpha: f64,
    beta: f64,
    h: (f64, f64)) -> Patch
{
    let mut sten = Patch::zeros(NUM_STENCIL_FIELDS, stencil_space(block));

    for index in stencil_space(block).iter() {
        set_stencil_faces(index, &mut sten, bx, by, beta, h)
    }
    for index in block.iter() {
        set_stencil_diag(index, &mut sten, a, alpha)
    }
    sten
}




/**
 * The Galerkin product at one coarse point: combine the fine stencil with
 * piecewise-constant prolongation and four-point-average restriction. Each
 * coarse face coupling averages the two fine face couplings it overlies;
 * the coarse diagonal folds in the couplings interior to the coarse cell,
 * which appear twice in the quadratic form.
 */
pub fn stencil_rap(
    index: (i64, i64),
    csten: &mut Patch,
    fsten: &Patch,
    coarse_cells: &IndexSpace)
{
    let (i, j) = index;
    let (fi, fj) = (2 * i, 2 * j);

    let cell_row = coarse_cells.start().1 <= j && j < coarse_cells.end().1;
    let cell_col = coarse_cells.start().0 <= i && i < coarse_cells.end().0;

    if cell_row {
        let sx = 0.25 * (fsten.get((fi, fj), STENCIL_XFACE) + fsten.get((fi, fj + 1), STENCIL_XFACE));
        csten.set(index, STENCIL_XFACE, sx)
    }
    if cell_col {
        let sy = 0.25 * (fsten.get((fi, fj), STENCIL_YFACE) + fsten.get((fi + 1, fj), STENCIL_YFACE));
        csten.set(index, STENCIL_YFACE, sy)
    }
    if cell_row && cell_col {
        let s0 = 0.25 * (fsten.get((fi, fj), STENCIL_DIAG)
                       + fsten.get((fi + 1, fj), STENCIL_DIAG)
                       + fsten.get((fi, fj + 1), STENCIL_DIAG)
                       + fsten.get((fi + 1, fj + 1), STENCIL_DIAG)
                       + 2.0 * (fsten.get((fi + 1, fj), STENCIL_XFACE)
                              + fsten.get((fi + 1, fj + 1), STENCIL_XFACE)
                              + fsten.get((fi, fj + 1), STENCIL_YFACE)
                              + fsten.get((fi + 1, fj + 1), STENCIL_YFACE)));
        csten.set(index, STENCIL_DIAG, s0)
    }
}




/**
 * Apply the stored stencil at one cell.
 */
pub fn adotx_sten(
    index: (i64, i64),
    y: &mut Patch,
    ycomp: usize,
    x: &Patch,
    xcomp: usize,
    sten: &Patch)
{
    let (i, j) = index;

    let value = sten.get(index, STENCIL_DIAG) * x.get(index, xcomp)
        + sten.get((i, j), STENCIL_XFACE)     * x.get((i - 1, j), xcomp)
        + sten.get((i + 1, j), STENCIL_XFACE) * x.get((i + 1, j), xcomp)
        + sten.get((i, j), STENCIL_YFACE)     * x.get((i, j - 1), xcomp)
        + sten.get((i, j + 1), STENCIL_YFACE) * x.get((i, j + 1), xcomp);

    y.set(index, ycomp, value)
}




/**
 * One red-black Gauss-Seidel update at one cell of the stored stencil.
 */
pub fn gauss_seidel_sten(
    index: (i64, i64),
    color: i64,
    sol: &mut Patch,
    comp: usize,
    rhs: &Patch,
    rcomp: usize,
    sten: &Patch)
{
    let (i, j) = index;

    if (i + j + color).rem_euclid(2) != 0 {
        return
    }
    let off = sten.get((i, j), STENCIL_XFACE)     * sol.get((i - 1, j), comp)
            + sten.get((i + 1, j), STENCIL_XFACE) * sol.get((i + 1, j), comp)
            + sten.get((i, j), STENCIL_YFACE)     * sol.get((i, j - 1), comp)
            + sten.get((i, j + 1), STENCIL_YFACE) * sol.get((i, j + 1), comp);

    sol.set(index, comp, (rhs.get(index, rcomp) - off) / sten.get(index, STENCIL_DIAG))
}




/**
 * One weighted-Jacobi update at one cell of the stored stencil.
 */
#[allow(clippy::too_many_arguments)]
pub fn jacobi_sten(
    index: (i64, i64),
    out: &mut Patch,
    ocomp: usize,
    sol: &Patch,
    comp: usize,
    rhs: &Patch,
    rcomp: usize,
    sten: &Patch,
    weight: f64)
{
    let mut ax = Patch::zeros(1, IndexSpace::new(index.0..index.0 + 1, index.1..index.1 + 1));
    adotx_sten(index, &mut ax, 0, sol, comp, sten);

    let delta = (rhs.get(index, rcomp) - ax.get(index, 0)) / sten.get(index, STENCIL_DIAG);
    out.set(index, ocomp, sol.get(index, comp) + weight * delta)
}




/**
 * The flux through one x-face of the stored stencil. The face coupling is
 * `-beta b / hx^2`, so the flux `-beta b (x_i - x_{i-1}) / hx` is the
 * coupling times the jump, scaled by the spacing.
 */
pub fn flux_x_sten(
    face: (i64, i64),
    fx: &mut Patch,
    fcomp: usize,
    x: &Patch,
    xcomp: usize,
    sten: &Patch,
    hx: f64)
{
    let (i, j) = face;
    let value = sten.get(face, STENCIL_XFACE) * hx * (x.get((i, j), xcomp) - x.get((i - 1, j), xcomp));
    fx.set(face, fcomp, value)
}




pub fn flux_y_sten(
    face: (i64, i64),
    fy: &mut Patch,
    fcomp: usize,
    x: &Patch,
    xcomp: usize,
    sten: &Patch,
    hy: f64)
{
    let (i, j) = face;
    let value = sten.get(face, STENCIL_YFACE) * hy * (x.get((i, j), xcomp) - x.get((i, j - 1), xcomp));
    fy.set(face, fcomp, value)
}




/**
 * The absolute row sum of the stored stencil at one cell.
 */
pub fn row_abs_sum_sten(index: (i64, i64), sten: &Patch) -> f64 {
    let (i, j) = index;

    sten.get(index, STENCIL_DIAG).abs()
        + sten.get((i, j), STENCIL_XFACE).abs()
        + sten.get((i + 1, j), STENCIL_XFACE).abs()
        + sten.get((i, j), STENCIL_YFACE).abs()
        + sten.get((i, j + 1), STENCIL_YFACE).abs()
}




/**
 * The discretization backed by direct stencil storage. Fine-level stencils
 * are supplied by the host program (`build_stencil` assembles one from
 * tensor fields); coarse levels carry the Galerkin product of the level
 * above.
 */
pub struct GalerkinOp;




// ============================================================================
impl Discretization for GalerkinOp {


    fn compatible(&self, coefficients: &Coefficients) -> bool {
        coefficients.is_stencil()
    }


    fn interior_apply(
        &self,
        level: &Level,
        block: usize,
        out: &mut Patch,
        dst_comp: usize,
        xin: &Patch,
        src_comp: usize,
        num_comp: usize)
    {
        let sten = &level.coefficients().as_stencil().unwrap()[block];

        for index in level.grids().get(block).iter() {
            for comp in 0..num_comp {
                adotx_sten(index, out, dst_comp + comp, xin, src_comp + comp, sten)
            }
        }
    }


    fn relax(&self, level: &Level, block: usize, sol: &mut Patch, rhs: &Patch, color: i64) {
        let sten = &level.coefficients().as_stencil().unwrap()[block];

        for index in level.grids().get(block).iter() {
            for comp in 0..rhs.num_fields() {
                gauss_seidel_sten(index, color, sol, comp, rhs, comp, sten)
            }
        }
    }


    fn jacobi_relax(&self, level: &Level, block: usize, sol: &mut Patch, rhs: &Patch, weight: f64) {
        let sten = &level.coefficients().as_stencil().unwrap()[block];
        let mut next = sol.clone();

        for index in level.grids().get(block).iter() {
            for comp in 0..rhs.num_fields() {
                jacobi_sten(index, &mut next, comp, sol, comp, rhs, comp, sten, weight)
            }
        }
        *sol = next
    }


    fn flux(
        &self,
        level: &Level,
        block: usize,
        fx: &mut Patch,
        fy: &mut Patch,
        xin: &Patch,
        src_comp: usize,
        dst_comp: usize,
        num_comp: usize,
        mode: BcMode)
    {
        let sten = &level.coefficients().as_stencil().unwrap()[block];
        let cells = level.grids().get(block);
        let h = level.spacing();

        for face in face_space(cells, Axis::I).iter() {
            for comp in 0..num_comp {
                flux_x_sten(face, fx, dst_comp + comp, xin, src_comp + comp, sten, h.0)
            }
        }
        for face in face_space(cells, Axis::J).iter() {
            for comp in 0..num_comp {
                flux_y_sten(face, fy, dst_comp + comp, xin, src_comp + comp, sten, h.1)
            }
        }
        given_flux_faces(level, block, fx, fy, dst_comp, num_comp, mode)
    }


    fn row_abs_sum(&self, level: &Level, block: usize, index: (i64, i64)) -> f64 {
        row_abs_sum_sten(index, &level.coefficients().as_stencil().unwrap()[block])
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::coefficients::{face_space, STENCIL_DIAG, STENCIL_XFACE, STENCIL_YFACE};
    use crate::index_space::{range2d, Axis};
    use crate::patch::Patch;
    use super::{adotx_sten, build_stencil, stencil_rap};

    fn laplacian_stencil(n: i64) -> Patch {
        let block = range2d(0..n, 0..n);
        let a = Patch::zeros(1, block.clone());
        let bx = Patch::from_fn(face_space(&block, Axis::I), |_| 1.0);
        let by = Patch::from_fn(face_space(&block, Axis::J), |_| 1.0);
        build_stencil(&block, &a, &bx, &by, 0.0, 1.0, (1.0, 1.0))
    }

    #[test]
    fn stencil_rows_of_a_pure_laplacian_sum_to_zero() {
        let sten = laplacian_stencil(4);

        for (i, j) in range2d(1..3, 1..3).iter() {
            let row = sten.get((i, j), STENCIL_DIAG)
                + sten.get((i, j), STENCIL_XFACE)
                + sten.get((i + 1, j), STENCIL_XFACE)
                + sten.get((i, j), STENCIL_YFACE)
                + sten.get((i, j + 1), STENCIL_YFACE);
            assert!(row.abs() < 1e-14);
        }
    }

    #[test]
    fn galerkin_product_preserves_zero_row_sums() {
        let fine = laplacian_stencil(8);
        let coarse_cells = range2d(0..4, 0..4);
        let space = crate::coefficients::stencil_space(&coarse_cells);
        let mut coarse = Patch::zeros(3, space.clone());

        for index in space.iter() {
            stencil_rap(index, &mut coarse, &fine, &coarse_cells)
        }
        for (i, j) in range2d(1..3, 1..3).iter() {
            let row = coarse.get((i, j), STENCIL_DIAG)
                + coarse.get((i, j), STENCIL_XFACE)
                + coarse.get((i + 1, j), STENCIL_XFACE)
                + coarse.get((i, j), STENCIL_YFACE)
                + coarse.get((i, j + 1), STENCIL_YFACE);
            assert!(row.abs() < 1e-12);
        }
    }

    #[test]
    fn stored_stencil_matches_the_five_point_laplacian() {
        let sten = laplacian_stencil(4);
        let x = Patch::from_fn(range2d(0..4, 0..4).extend_all(1), |(i, j)| (i * i + j * j) as f64);
        let mut y = Patch::zeros(1, range2d(0..4, 0..4));

        adotx_sten((2, 2), &mut y, 0, &x, 0, &sten);
        assert!((y.get((2, 2), 0) - (-4.0)).abs() < 1e-12);
    }
}
