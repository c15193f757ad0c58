use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::index_space::IndexSpace;




/**
 * Describes the physical extent of the computational domain at one level:
 * the domain's index space, its physical bounds, and the periodicity of each
 * axis. The geometry is what decides whether an index outside the domain box
 * wraps around to the far side or falls on a physical boundary.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainGeometry {
    domain: IndexSpace,
    lower: (f64, f64),
    upper: (f64, f64),
    periodic: (bool, bool),
}




// ============================================================================
impl DomainGeometry {


    pub fn new(domain: IndexSpace, lower: (f64, f64), upper: (f64, f64), periodic: (bool, bool)) -> Self {
        assert!(!domain.is_empty(), "domain index space is empty");
        Self { domain, lower, upper, periodic }
    }


    pub fn domain(&self) -> &IndexSpace {
        &self.domain
    }


    pub fn periodic(&self) -> (bool, bool) {
        self.periodic
    }


    /**
     * Return the grid spacing implied by the physical bounds and the domain
     * index space.
     */
    pub fn cell_spacing(&self) -> (f64, f64) {
        let (l, m) = self.domain.dim();
        ((self.upper.0 - self.lower.0) / l as f64,
         (self.upper.1 - self.lower.1) / m as f64)
    }


    /**
     * Return the physical coordinates of a cell center.
     */
    pub fn cell_center(&self, index: (i64, i64)) -> (f64, f64) {
        let (d0, d1) = self.cell_spacing();
        let (i0, j0) = self.domain.start();
        (self.lower.0 + d0 * ((index.0 - i0) as f64 + 0.5),
         self.lower.1 + d1 * ((index.1 - j0) as f64 + 0.5))
    }


    /**
     * Map an index into the domain along periodic axes. Along non-periodic
     * axes the index is returned unchanged, even if it lies outside the
     * domain.
     */
    pub fn wrap(&self, index: (i64, i64)) -> (i64, i64) {
        let (ni, nj) = self.domain.dim();
        let (i0, j0) = self.domain.start();
        let i = if self.periodic.0 {
            i0 + (index.0 - i0).rem_euclid(ni as i64)
        } else {
            index.0
        };
        let j = if self.periodic.1 {
            j0 + (index.1 - j0).rem_euclid(nj as i64)
        } else {
            index.1
        };
        (i, j)
    }


    /**
     * Determine whether an index lies inside the domain, after periodic
     * wrapping.
     */
    pub fn contains(&self, index: (i64, i64)) -> bool {
        self.domain.contains(self.wrap(index))
    }


    /**
     * Derive the geometry of the next coarser level: the domain index space
     * halves per axis while the physical bounds and periodicity carry over.
     */
    pub fn coarsen(&self) -> Result<Self, Error> {
        if !self.domain.coarsens_evenly(2) {
            return Err(Error::DegenerateCoarsening(self.domain.clone()))
        }
        let coarse = self.domain.coarsen_by(2);
        if coarse.is_empty() {
            return Err(Error::DegenerateCoarsening(self.domain.clone()))
        }
        Ok(Self {
            domain: coarse,
            lower: self.lower,
            upper: self.upper,
            periodic: self.periodic,
        })
    }
}
