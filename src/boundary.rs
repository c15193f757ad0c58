use serde::{Serialize, Deserialize};
use crate::grid_list::GridList;
use crate::index_space::{Axis, IndexSpace, Orientation};
use crate::patch::Patch;




/**
 * The kind of condition imposed on a physical (or otherwise uncovered)
 * boundary face. `Dirichlet` prescribes the field value at the registered
 * boundary location; `Neumann` prescribes the normal derivative there;
 * `GivenFlux` prescribes the normal flux, which ghost synthesis treats as an
 * inhomogeneous Neumann condition and `compute_flux` reports verbatim.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BcKind {
    Dirichlet,
    Neumann,
    GivenFlux,
}




/**
 * The boundary condition registered for one face of one grid block: the
 * condition kind, the signed distance from the face to the boundary
 * location (in grid-spacing units, positive pointing out of the block), and
 * the registered values over the face's depth-1 ghost strip.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundaryCondition {
    pub kind: BcKind,
    pub location: f64,
    pub values: Patch,
}




// ============================================================================
impl BoundaryCondition {


    /**
     * A condition with a spatially constant registered value.
     */
    pub fn uniform(kind: BcKind, location: f64, strip: IndexSpace, value: f64) -> Self {
        Self {
            kind,
            location,
            values: Patch::from_fn(strip, |_| value),
        }
    }


    /**
     * Derive the condition for the corresponding face of the coarsened
     * block: the kind and location (already in spacing units) carry over,
     * and each coarse face value averages the two fine values it overlies.
     */
    pub fn coarsen(&self, orientation: Orientation) -> Self {
        let fine = &self.values;
        let (fi0, fj0) = fine.space().start();
        let cspace = fine.space().coarsen_by(2);

        let values = Patch::from_fn_n(cspace, fine.num_fields(), |(i, j), field| {
            match orientation.axis() {
                Axis::I => 0.5 * (fine.get((fi0, 2 * j), field) + fine.get((fi0, 2 * j + 1), field)),
                Axis::J => 0.5 * (fine.get((2 * i, fj0), field) + fine.get((2 * i + 1, fj0), field)),
            }
        });
        Self { kind: self.kind, location: self.location, values }
    }
}




/**
 * Per-block, per-face boundary conditions for a whole grid list. The
 * registry is owned by the host program; operators hold a shared handle to
 * it and may be rebound to a different registry at runtime, which
 * invalidates everything they derived from the old one.
 */
#[derive(Clone, Debug)]
pub struct BoundaryRegistry {
    entries: Vec<[BoundaryCondition; 4]>,
}




// ============================================================================
impl BoundaryRegistry {


    pub fn new(entries: Vec<[BoundaryCondition; 4]>) -> Self {
        Self { entries }
    }


    /**
     * Build a registry imposing the same condition with a spatially
     * constant value on every face of every block.
     */
    pub fn uniform(grids: &GridList, kind: BcKind, location: f64, value: f64) -> Self {
        Self::with_faces(grids, |_, _| (kind, location, value))
    }


    /**
     * Build a registry from a closure evaluated per block and face,
     * returning (kind, location, value).
     */
    pub fn with_faces<F>(grids: &GridList, f: F) -> Self
    where
        F: Fn(usize, Orientation) -> (BcKind, f64, f64)
    {
        let entries = (0..grids.len()).map(|block| {
            let face = |orientation: Orientation| {
                let (kind, location, value) = f(block, orientation);
                BoundaryCondition::uniform(kind, location, grids.get(block).face_strip(orientation, 1), value)
            };
            [
                face(Orientation::ILo),
                face(Orientation::IHi),
                face(Orientation::JLo),
                face(Orientation::JHi),
            ]
        }).collect();
        Self { entries }
    }


    pub fn num_blocks(&self) -> usize {
        self.entries.len()
    }


    pub fn entry(&self, block: usize, orientation: Orientation) -> &BoundaryCondition {
        &self.entries[block][orientation.index()]
    }
}




/**
 * Synthesize a Dirichlet ghost value by Lagrange extrapolation. Coordinates
 * are measured inward from the face in grid-spacing units: the boundary
 * value sits at `-location`, the k-th interior cell center at `k + 1/2`,
 * and the ghost cell center at `ghost_x` (the depth-d ghost cell sits at
 * `1/2 - d`). The polynomial passes through the boundary point and
 * `interior.len()` interior points; with one interior point this reduces to
 * the familiar two-point formula `2 vb - v0` for a boundary on the wall.
 */
pub fn dirichlet_ghost(location: f64, ghost_x: f64, boundary_value: f64, interior: &[f64]) -> f64 {
    let x = |n: usize| -> f64 {
        if n == 0 {
            -location
        } else {
            (n - 1) as f64 + 0.5
        }
    };
    let v = |n: usize| -> f64 {
        if n == 0 {
            boundary_value
        } else {
            interior[n - 1]
        }
    };
    let num_points = interior.len() + 1;
    let mut result = 0.0;

    for n in 0..num_points {
        let mut term = v(n);
        for m in 0..num_points {
            if m != n {
                term *= (ghost_x - x(m)) / (x(n) - x(m))
            }
        }
        result += term
    }
    result
}




/**
 * Synthesize a Neumann ghost value: extend the nearest interior value with
 * the prescribed outward normal gradient over the physical distance between
 * the interior and ghost cell centers. A zero gradient reflects the
 * interior value, which enforces the condition to second order.
 */
pub fn neumann_ghost(gradient: f64, interior_value: f64, distance: f64) -> f64 {
    interior_value + gradient * distance
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::grid_list::GridList;
    use crate::index_space::{range2d, Orientation};
    use super::{dirichlet_ghost, neumann_ghost, BcKind, BoundaryRegistry};

    #[test]
    fn order_two_dirichlet_matches_the_closed_form() {
        // boundary on the wall: line through (0, vb) and (1/2, v0) at -1/2
        let vb = 3.0;
        let v0 = 1.0;
        assert!((dirichlet_ghost(0.0, -0.5, vb, &[v0]) - (2.0 * vb - v0)).abs() < 1e-14);

        // boundary at signed distance -d outside the face
        let d = 0.25;
        let expect = vb + (v0 - vb) * (-0.5 - (-d)) / (0.5 - (-d));
        assert!((dirichlet_ghost(d, -0.5, vb, &[v0]) - expect).abs() < 1e-14);
    }

    #[test]
    fn higher_order_dirichlet_is_exact_on_polynomials() {
        // quadratic field sampled at the boundary and two interior centers
        let f = |x: f64| 1.0 + 2.0 * x + 3.0 * x * x;
        let ghost = dirichlet_ghost(0.0, -0.5, f(0.0), &[f(0.5), f(1.5)]);
        assert!((ghost - f(-0.5)).abs() < 1e-12);
    }

    #[test]
    fn order_one_dirichlet_is_the_boundary_value() {
        assert_eq!(dirichlet_ghost(0.0, -0.5, 4.0, &[]), 4.0);
    }

    #[test]
    fn neumann_ghost_is_exact_for_linear_fields() {
        // field v(s) = 2 - 3 s along the outward normal, interior center at
        // s = -h/2, ghost center at s = +h/2, gradient -3 at the wall
        let h = 0.1;
        let interior = 2.0 + 3.0 * h / 2.0;
        let ghost = neumann_ghost(-3.0, interior, h);
        assert!((ghost - (2.0 - 3.0 * h / 2.0)).abs() < 1e-14);
        assert_eq!(neumann_ghost(0.0, interior, h), interior);
    }

    #[test]
    fn coarsened_registers_average_face_values() {
        let grids = GridList::new(vec![range2d(0..4, 0..4)]);
        let registry = BoundaryRegistry::with_faces(&grids, |_, orientation| {
            (BcKind::Dirichlet, 0.0, if orientation.is_low() { 1.0 } else { 2.0 })
        });
        let fine = registry.entry(0, Orientation::ILo);
        let coarse = fine.coarsen(Orientation::ILo);
        assert_eq!(*coarse.values.space(), range2d(-1..0, 0..2));
        assert_eq!(coarse.values.get((-1, 0), 0), 1.0);
        assert_eq!(coarse.kind, BcKind::Dirichlet);
    }
}
