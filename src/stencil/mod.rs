//! The pluggable stencil kernel set. A `Discretization` supplies the
//! operator-specific per-point math (interior apply, relaxation sweeps,
//! face fluxes); the operator base in `linop` composes the boundary and
//! coarsening machinery around it.

use crate::boundary::BcKind;
use crate::coefficients::Coefficients;
use crate::index_space::{Axis, Orientation};
use crate::level::Level;
use crate::linop::BcMode;
use crate::mask::CellClass;
use crate::patch::Patch;

pub mod galerkin;
pub mod kernels;
pub mod tensor;

pub use galerkin::GalerkinOp;
pub use tensor::TensorOp;




/**
 * The capability set a concrete discretization plugs into the operator
 * base. Implementations hold no mutable state: everything they need arrives
 * through the level record and the patch arguments, so block-level calls
 * can run concurrently.
 */
pub trait Discretization: Send + Sync {


    /**
     * The ghost depth this discretization needs in its input fields. Fixed
     * per discretization, independent of level.
     */
    fn num_grow(&self) -> i64 {
        1
    }


    /**
     * The number of color classes in one full relaxation sweep.
     */
    fn num_colors(&self) -> i64 {
        2
    }


    /**
     * Whether this discretization can read the given coefficient storage.
     */
    fn compatible(&self, coefficients: &Coefficients) -> bool;


    /**
     * Evaluate the interior stencil over one block's valid cells. Ghost
     * cells of `xin` must already hold consistent values.
     */
    fn interior_apply(
        &self,
        level: &Level,
        block: usize,
        out: &mut Patch,
        dst_comp: usize,
        xin: &Patch,
        src_comp: usize,
        num_comp: usize);


    /**
     * One colored relaxation sweep over one block, in place.
     */
    fn relax(&self, level: &Level, block: usize, sol: &mut Patch, rhs: &Patch, color: i64);


    /**
     * One weighted-Jacobi sweep over one block, in place.
     */
    fn jacobi_relax(&self, level: &Level, block: usize, sol: &mut Patch, rhs: &Patch, weight: f64);


    /**
     * Face-centered fluxes consistent with the interior stencil, over one
     * block's face spaces.
     */
    #[allow(clippy::too_many_arguments)]
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
        mode: BcMode);


    /**
     * The absolute row sum of the operator at one cell, for norm
     * estimates.
     */
    fn row_abs_sum(&self, level: &Level, block: usize, index: (i64, i64)) -> f64;
}




/**
 * Overwrite the flux on physical boundary faces that carry a `GivenFlux`
 * condition with the registered value (zero in homogeneous mode). The
 * registered value is the outward normal flux, so its sign flips on low
 * faces, where the outward normal opposes the axis.
 */
pub fn given_flux_faces(
    level: &Level,
    block: usize,
    fx: &mut Patch,
    fy: &mut Patch,
    dst_comp: usize,
    num_comp: usize,
    mode: BcMode)
{
    for orientation in Orientation::ALL {
        let bc = level.boundary(block, orientation);

        if bc.kind != BcKind::GivenFlux {
            continue
        }
        let mask = level.mask(block, orientation);
        let strip = level.grids().get(block).face_strip(orientation, 1);

        for ghost in strip.iter() {
            if mask.get(ghost) != CellClass::OutsideDomain {
                continue
            }
            let (i, j) = ghost;
            let face = match orientation {
                Orientation::ILo => (i + 1, j),
                Orientation::JLo => (i, j + 1),
                Orientation::IHi | Orientation::JHi => (i, j),
            };
            let sign = if orientation.is_low() { -1.0 } else { 1.0 };

            for comp in 0..num_comp {
                let q = match mode {
                    BcMode::Homogeneous => 0.0,
                    BcMode::Inhomogeneous => bc.values.get(ghost, comp.min(bc.values.num_fields() - 1)),
                };
                match orientation.axis() {
                    Axis::I => fx.set(face, dst_comp + comp, sign * q),
                    Axis::J => fy.set(face, dst_comp + comp, sign * q),
                }
            }
        }
    }
}
