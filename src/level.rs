use crate::boundary::{BoundaryCondition, BoundaryRegistry};
use crate::coefficients::Coefficients;
use crate::config::Averaging;
use crate::error::Error;
use crate::geometry::DomainGeometry;
use crate::grid_list::GridList;
use crate::index_space::Orientation;
use crate::mask::{build_masks, Mask};




/**
 * Everything one multigrid level owns: the grid spacing, the block list,
 * the domain geometry, the ghost masks, the per-block-face boundary
 * registers, and the operator coefficients. A level is immutable once
 * built; invalidation happens by dropping the record, never by mutating
 * it, so level data may be read concurrently by any number of kernel
 * invocations.
 */
pub struct Level {
    spacing: (f64, f64),
    grids: GridList,
    geometry: DomainGeometry,
    masks: Vec<[Mask; 4]>,
    bndry: Vec<[BoundaryCondition; 4]>,
    coefficients: Coefficients,
}




// ============================================================================
impl Level {


    /**
     * Build the finest level from externally supplied parts. The boundary
     * registers copy the registry's entries; coarser levels derive theirs
     * from these.
     */
    pub fn base(
        grids: GridList,
        geometry: DomainGeometry,
        spacing: (f64, f64),
        registry: &BoundaryRegistry,
        coefficients: Coefficients,
        num_grow: i64) -> Self
    {
        assert!(
            coefficients.num_blocks() == grids.len(),
            "coefficient fields do not match the grid list");

        let masks = build_masks(&grids, &geometry, num_grow);
        let bndry = (0..grids.len()).map(|block| {
            [
                registry.entry(block, Orientation::ILo).clone(),
                registry.entry(block, Orientation::IHi).clone(),
                registry.entry(block, Orientation::JLo).clone(),
                registry.entry(block, Orientation::JHi).clone(),
            ]
        }).collect();

        Self { spacing, grids, geometry, masks, bndry, coefficients }
    }


    /**
     * Build the next coarser level: halve the block list and domain, double
     * the spacing, coarsen the boundary registers and coefficients, and
     * rebuild the masks. Fails when the grids or domain cannot be halved
     * evenly.
     */
    pub fn coarsened_from(fine: &Level, averaging: Averaging, num_grow: i64) -> Result<Self, Error> {
        let grids = fine.grids.coarsen()?;
        let geometry = fine.geometry.coarsen()?;
        let spacing = (fine.spacing.0 * 2.0, fine.spacing.1 * 2.0);
        let masks = build_masks(&grids, &geometry, num_grow);

        let bndry = fine.bndry.iter().map(|faces| {
            [
                faces[Orientation::ILo.index()].coarsen(Orientation::ILo),
                faces[Orientation::IHi.index()].coarsen(Orientation::IHi),
                faces[Orientation::JLo.index()].coarsen(Orientation::JLo),
                faces[Orientation::JHi.index()].coarsen(Orientation::JHi),
            ]
        }).collect();

        let coefficients = fine.coefficients.coarsen(averaging);

        Ok(Self { spacing, grids, geometry, masks, bndry, coefficients })
    }


    pub fn spacing(&self) -> (f64, f64) {
        self.spacing
    }


    pub fn grids(&self) -> &GridList {
        &self.grids
    }


    pub fn geometry(&self) -> &DomainGeometry {
        &self.geometry
    }


    pub fn masks(&self) -> &[[Mask; 4]] {
        &self.masks
    }


    pub fn mask(&self, block: usize, orientation: Orientation) -> &Mask {
        &self.masks[block][orientation.index()]
    }


    pub fn boundary(&self, block: usize, orientation: Orientation) -> &BoundaryCondition {
        &self.bndry[block][orientation.index()]
    }


    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::{BcKind, BoundaryRegistry};
    use crate::coefficients::{face_space, Coefficients};
    use crate::config::Averaging;
    use crate::geometry::DomainGeometry;
    use crate::grid_list::GridList;
    use crate::index_space::{range2d, Axis, Orientation};
    use crate::patch::Patch;
    use super::Level;

    fn base_level() -> Level {
        let grids = GridList::new(vec![range2d(0..8, 0..8)]);
        let geometry = DomainGeometry::new(range2d(0..8, 0..8), (0.0, 0.0), (1.0, 1.0), (false, false));
        let registry = BoundaryRegistry::uniform(&grids, BcKind::Dirichlet, 0.0, 0.0);
        let block = grids.get(0).clone();
        let coefficients = Coefficients::Tensor {
            alpha: 0.0,
            beta: 1.0,
            a: vec![Patch::zeros(1, block.clone())],
            b: [
                vec![Patch::from_fn(face_space(&block, Axis::I), |_| 1.0)],
                vec![Patch::from_fn(face_space(&block, Axis::J), |_| 1.0)],
            ],
        };
        Level::base(grids, geometry, (0.125, 0.125), &registry, coefficients, 1)
    }

    #[test]
    fn coarsening_doubles_the_spacing_and_halves_the_grids() {
        let fine = base_level();
        let coarse = Level::coarsened_from(&fine, Averaging::Arithmetic, 1).unwrap();

        assert_eq!(coarse.spacing(), (0.25, 0.25));
        assert_eq!(*coarse.grids().get(0), range2d(0..4, 0..4));
        assert_eq!(*coarse.geometry().domain(), range2d(0..4, 0..4));
    }

    #[test]
    fn boundary_registers_coarsen_with_the_level() {
        let fine = base_level();
        let coarse = Level::coarsened_from(&fine, Averaging::Arithmetic, 1).unwrap();
        let bc = coarse.boundary(0, Orientation::JHi);

        assert_eq!(bc.kind, BcKind::Dirichlet);
        assert_eq!(*bc.values.space(), range2d(0..4, 4..5));
    }

    #[test]
    fn coarsening_stops_at_a_single_cell() {
        let mut level = base_level();
        for _ in 0..3 {
            level = Level::coarsened_from(&level, Averaging::Arithmetic, 1).unwrap();
        }
        assert!(Level::coarsened_from(&level, Averaging::Arithmetic, 1).is_err());
    }
}
