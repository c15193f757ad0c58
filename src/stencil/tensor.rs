//! The tensor-coefficient discretization `alpha a phi - beta div(b grad
//! phi)`, with a cell-centered scalar field `a` and face-centered
//! directional fields `b`. This is the workhorse form: coefficients coarsen
//! by centering-aware averaging and every sweep recomputes couplings from
//! the fields.

use crate::coefficients::{face_space, Coefficients};
use crate::index_space::Axis;
use crate::level::Level;
use crate::linop::BcMode;
use crate::patch::Patch;
use super::{given_flux_faces, kernels, Discretization};




pub struct TensorOp;




// ============================================================================
impl Discretization for TensorOp {


    fn compatible(&self, coefficients: &Coefficients) -> bool {
        coefficients.is_tensor()
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
        let (alpha, beta, a, b) = level.coefficients().as_tensor().unwrap();
        let (a, bx, by) = (&a[block], &b[0][block], &b[1][block]);
        let h = level.spacing();

        for index in level.grids().get(block).iter() {
            for comp in 0..num_comp {
                kernels::adotx(index, out, dst_comp + comp, xin, src_comp + comp, a, bx, by, alpha, beta, h)
            }
        }
    }


    fn relax(&self, level: &Level, block: usize, sol: &mut Patch, rhs: &Patch, color: i64) {
        let (alpha, beta, a, b) = level.coefficients().as_tensor().unwrap();
        let (a, bx, by) = (&a[block], &b[0][block], &b[1][block]);
        let h = level.spacing();

        for index in level.grids().get(block).iter() {
            for comp in 0..rhs.num_fields() {
                kernels::gauss_seidel(index, color, sol, comp, rhs, comp, a, bx, by, alpha, beta, h)
            }
        }
    }


    fn jacobi_relax(&self, level: &Level, block: usize, sol: &mut Patch, rhs: &Patch, weight: f64) {
        let (alpha, beta, a, b) = level.coefficients().as_tensor().unwrap();
        let (a, bx, by) = (&a[block], &b[0][block], &b[1][block]);
        let h = level.spacing();
        let mut next = sol.clone();

        for index in level.grids().get(block).iter() {
            for comp in 0..rhs.num_fields() {
                kernels::jacobi(index, &mut next, comp, sol, comp, rhs, comp, a, bx, by, alpha, beta, h, weight)
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
        let (_alpha, beta, _a, b) = level.coefficients().as_tensor().unwrap();
        let (bx, by) = (&b[0][block], &b[1][block]);
        let cells = level.grids().get(block);
        let h = level.spacing();

        for face in face_space(cells, Axis::I).iter() {
            for comp in 0..num_comp {
                kernels::flux_x(face, fx, dst_comp + comp, xin, src_comp + comp, bx, beta, h.0)
            }
        }
        for face in face_space(cells, Axis::J).iter() {
            for comp in 0..num_comp {
                kernels::flux_y(face, fy, dst_comp + comp, xin, src_comp + comp, by, beta, h.1)
            }
        }
        given_flux_faces(level, block, fx, fy, dst_comp, num_comp, mode)
    }


    fn row_abs_sum(&self, level: &Level, block: usize, index: (i64, i64)) -> f64 {
        let (alpha, beta, a, b) = level.coefficients().as_tensor().unwrap();
        kernels::row_abs_sum(index, &a[block], &b[0][block], &b[1][block], alpha, beta, level.spacing())
    }
}
