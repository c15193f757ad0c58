//! Per-point kernels for the tensor-coefficient discretization. Each kernel
//! is a free function of one index and explicit array arguments, with no
//! shared mutable state, so the enclosing block loop can run sequentially or
//! as independent parallel invocations without change.

use crate::index_space::Orientation;
use crate::patch::Patch;




/**
 * Apply the operator `alpha a x - beta div(b grad x)` at one cell. Reads the
 * four face neighbors of `index`, which must be interior or filled ghost
 * cells.
 */
#[allow(clippy::too_many_arguments)]
pub fn adotx(
    index: (i64, i64),
    y: &mut Patch,
    ycomp: usize,
    x: &Patch,
    xcomp: usize,
    a: &Patch,
    bx: &Patch,
    by: &Patch,
    alpha: f64,
    beta: f64,
    h: (f64, f64))
{
    let (i, j) = index;
    let cx = beta / (h.0 * h.0);
    let cy = beta / (h.1 * h.1);
    let x00 = x.get(index, xcomp);

    let value = alpha * a.get(index, 0) * x00
        - cx * (bx.get((i + 1, j), 0) * (x.get((i + 1, j), xcomp) - x00)
              - bx.get((i, j), 0)     * (x00 - x.get((i - 1, j), xcomp)))
        - cy * (by.get((i, j + 1), 0) * (x.get((i, j + 1), xcomp) - x00)
              - by.get((i, j), 0)     * (x00 - x.get((i, j - 1), xcomp)));

    y.set(index, ycomp, value)
}




/**
 * The diagonal entry of the operator's row at one cell.
 */
pub fn diagonal(
    index: (i64, i64),
    a: &Patch,
    bx: &Patch,
    by: &Patch,
    alpha: f64,
    beta: f64,
    h: (f64, f64)) -> f64
{
    let (i, j) = index;
    let cx = beta / (h.0 * h.0);
    let cy = beta / (h.1 * h.1);

    alpha * a.get(index, 0)
        + cx * (bx.get((i, j), 0) + bx.get((i + 1, j), 0))
        + cy * (by.get((i, j), 0) + by.get((i, j + 1), 0))
}




/**
 * One red-black Gauss-Seidel update at one cell. Only cells whose parity
 * matches `color` are touched; neighbor reads within the same color class
 * are independent, so a color sweep parallelizes freely.
 */
#[allow(clippy::too_many_arguments)]
pub fn gauss_seidel(
    index: (i64, i64),
    color: i64,
    sol: &mut Patch,
    comp: usize,
    rhs: &Patch,
    rcomp: usize,
    a: &Patch,
    bx: &Patch,
    by: &Patch,
    alpha: f64,
    beta: f64,
    h: (f64, f64))
{
    let (i, j) = index;

    if (i + j + color).rem_euclid(2) != 0 {
        return
    }
    let cx = beta / (h.0 * h.0);
    let cy = beta / (h.1 * h.1);

    let off = cx * (bx.get((i + 1, j), 0) * sol.get((i + 1, j), comp)
                  + bx.get((i, j), 0)     * sol.get((i - 1, j), comp))
            + cy * (by.get((i, j + 1), 0) * sol.get((i, j + 1), comp)
                  + by.get((i, j), 0)     * sol.get((i, j - 1), comp));

    let diag = diagonal(index, a, bx, by, alpha, beta, h);
    sol.set(index, comp, (rhs.get(index, rcomp) + off) / diag)
}




/**
 * One weighted-Jacobi update at one cell, written into a separate output
 * patch so every point of the sweep reads the same input state.
 */
#[allow(clippy::too_many_arguments)]
pub fn jacobi(
    index: (i64, i64),
    out: &mut Patch,
    ocomp: usize,
    sol: &Patch,
    comp: usize,
    rhs: &Patch,
    rcomp: usize,
    a: &Patch,
    bx: &Patch,
    by: &Patch,
    alpha: f64,
    beta: f64,
    h: (f64, f64),
    weight: f64)
{
    let (i, j) = index;
    let cx = beta / (h.0 * h.0);
    let cy = beta / (h.1 * h.1);
    let x00 = sol.get(index, comp);

    let ax = alpha * a.get(index, 0) * x00
        - cx * (bx.get((i + 1, j), 0) * (sol.get((i + 1, j), comp) - x00)
              - bx.get((i, j), 0)     * (x00 - sol.get((i - 1, j), comp)))
        - cy * (by.get((i, j + 1), 0) * (sol.get((i, j + 1), comp) - x00)
              - by.get((i, j), 0)     * (x00 - sol.get((i, j - 1), comp)));

    let diag = diagonal(index, a, bx, by, alpha, beta, h);
    out.set(index, ocomp, x00 + weight * (rhs.get(index, rcomp) - ax) / diag)
}




/**
 * The flux through one x-face: `-beta bx (x_i - x_{i-1}) / hx`.
 */
pub fn flux_x(
    face: (i64, i64),
    fx: &mut Patch,
    fcomp: usize,
    x: &Patch,
    xcomp: usize,
    bx: &Patch,
    beta: f64,
    hx: f64)
{
    let (i, j) = face;
    let value = -beta * bx.get(face, 0) * (x.get((i, j), xcomp) - x.get((i - 1, j), xcomp)) / hx;
    fx.set(face, fcomp, value)
}




/**
 * The flux through one y-face: `-beta by (x_j - x_{j-1}) / hy`.
 */
pub fn flux_y(
    face: (i64, i64),
    fy: &mut Patch,
    fcomp: usize,
    x: &Patch,
    xcomp: usize,
    by: &Patch,
    beta: f64,
    hy: f64)
{
    let (i, j) = face;
    let value = -beta * by.get(face, 0) * (x.get((i, j), xcomp) - x.get((i, j - 1), xcomp)) / hy;
    fy.set(face, fcomp, value)
}




/**
 * Restrict one coarse cell from the four fine cells beneath it, optionally
 * weighted by a fine cell-centered field. A zero weight removes a fine cell
 * from the average, which is how inactive regions are masked out; if every
 * weight is zero the coarse value is zero.
 */
pub fn restrict_average(
    index: (i64, i64),
    crse: &mut Patch,
    ccomp: usize,
    fine: &Patch,
    fcomp: usize,
    weight: Option<&Patch>)
{
    let (i, j) = index;
    let mut num = 0.0;
    let mut den = 0.0;

    for f in &[(2 * i, 2 * j), (2 * i + 1, 2 * j), (2 * i, 2 * j + 1), (2 * i + 1, 2 * j + 1)] {
        let w = weight.map_or(1.0, |w| w.get(*f, 0));
        num += w * fine.get(*f, fcomp);
        den += w;
    }
    crse.set(index, ccomp, if den == 0.0 { 0.0 } else { num / den })
}




/**
 * Add the piecewise-constant interpolant of a coarse correction into one
 * fine cell, optionally weighted by a fine cell-centered field. Weighting
 * redistributes the coarse value among the four siblings in proportion to
 * their weights; a uniform weight reduces to plain injection.
 */
pub fn interp_add(
    index: (i64, i64),
    fine: &mut Patch,
    fcomp: usize,
    crse: &Patch,
    ccomp: usize,
    weight: Option<&Patch>)
{
    let (i, j) = index;
    let coarse = (i.div_euclid(2), j.div_euclid(2));

    let factor = match weight {
        None => 1.0,
        Some(w) => {
            let (ci, cj) = coarse;
            let total: f64 = [(2 * ci, 2 * cj), (2 * ci + 1, 2 * cj), (2 * ci, 2 * cj + 1), (2 * ci + 1, 2 * cj + 1)]
                .iter()
                .map(|f| w.get(*f, 0))
                .sum();
            if total == 0.0 { 0.0 } else { 4.0 * w.get(index, 0) / total }
        }
    };
    fine.add(index, fcomp, crse.get(coarse, ccomp) * factor)
}




/**
 * Coarse-fine flux correction at one coarse cell bordering finer data
 * across the given face: replace the coarse face flux with the average of
 * the two fine face fluxes it overlies, and fold the difference into the
 * coarse residual.
 */
#[allow(clippy::too_many_arguments)]
pub fn reflux(
    index: (i64, i64),
    orientation: Orientation,
    res: &mut Patch,
    rcomp: usize,
    coarse_flux: &Patch,
    cfcomp: usize,
    fine_flux: &Patch,
    ffcomp: usize,
    h: (f64, f64))
{
    let (i, j) = index;

    let (face, fine_faces, spacing) = match orientation {
        Orientation::ILo => ((i, j),     [(2 * i, 2 * j), (2 * i, 2 * j + 1)], h.0),
        Orientation::IHi => ((i + 1, j), [(2 * i + 2, 2 * j), (2 * i + 2, 2 * j + 1)], h.0),
        Orientation::JLo => ((i, j),     [(2 * i, 2 * j), (2 * i + 1, 2 * j)], h.1),
        Orientation::JHi => ((i, j + 1), [(2 * i, 2 * j + 2), (2 * i + 1, 2 * j + 2)], h.1),
    };
    let sign = if orientation.is_low() { 1.0 } else { -1.0 };

    let favg = 0.5 * (fine_flux.get(fine_faces[0], ffcomp) + fine_flux.get(fine_faces[1], ffcomp));
    res.add(index, rcomp, sign * (favg - coarse_flux.get(face, cfcomp)) / spacing)
}




/**
 * The converse correction at one fine cell bordering coarser data across
 * the given face: replace the fine face flux with the (piecewise-constant)
 * coarse flux at the overlying coarse face.
 */
#[allow(clippy::too_many_arguments)]
pub fn reflux_fine(
    index: (i64, i64),
    orientation: Orientation,
    res: &mut Patch,
    rcomp: usize,
    fine_flux: &Patch,
    ffcomp: usize,
    coarse_flux: &Patch,
    cfcomp: usize,
    h: (f64, f64))
{
    let (i, j) = index;

    let (face, spacing) = match orientation {
        Orientation::ILo => ((i, j), h.0),
        Orientation::IHi => ((i + 1, j), h.0),
        Orientation::JLo => ((i, j), h.1),
        Orientation::JHi => ((i, j + 1), h.1),
    };
    let sign = if orientation.is_low() { 1.0 } else { -1.0 };

    let coarse_face = (face.0.div_euclid(2), face.1.div_euclid(2));
    let delta = coarse_flux.get(coarse_face, cfcomp) - fine_flux.get(face, ffcomp);
    res.add(index, rcomp, sign * delta / spacing)
}




/**
 * The absolute row sum of the operator at one cell: the diagonal magnitude
 * plus the magnitudes of the four neighbor couplings.
 */
pub fn row_abs_sum(
    index: (i64, i64),
    a: &Patch,
    bx: &Patch,
    by: &Patch,
    alpha: f64,
    beta: f64,
    h: (f64, f64)) -> f64
{
    let (i, j) = index;
    let cx = (beta / (h.0 * h.0)).abs();
    let cy = (beta / (h.1 * h.1)).abs();

    diagonal(index, a, bx, by, alpha, beta, h).abs()
        + cx * (bx.get((i, j), 0).abs() + bx.get((i + 1, j), 0).abs())
        + cy * (by.get((i, j), 0).abs() + by.get((i, j + 1), 0).abs())
}
