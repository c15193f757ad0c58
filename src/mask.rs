use serde::{Serialize, Deserialize};
use crate::comm::DistributionMap;
use crate::geometry::DomainGeometry;
use crate::grid_list::GridList;
use crate::index_space::{IndexSpace, Orientation};




/**
 * Classification of one ghost cell adjacent to a grid block face.
 * `Covered` means a neighboring block's interior supplies the value (after
 * periodic wrapping); `OutsideDomain` means the cell lies beyond a physical
 * boundary and its value must be synthesized from a boundary condition;
 * `NotCovered` means the cell is inside the domain but no block interior
 * contains it.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellClass {
    Covered,
    NotCovered,
    OutsideDomain,
}




/**
 * The classification of every ghost cell in one face strip of one block.
 * Masks are pure functions of the grid list and geometry; they are built
 * once per level and read concurrently thereafter.
 */
#[derive(Clone, Debug)]
pub struct Mask {
    space: IndexSpace,
    cells: Vec<CellClass>,
}




// ============================================================================
impl Mask {


    pub fn space(&self) -> &IndexSpace {
        &self.space
    }


    pub fn get(&self, index: (i64, i64)) -> CellClass {
        self.cells[self.space.row_major_offset(index)]
    }


    pub fn iter(&self) -> impl Iterator<Item = ((i64, i64), CellClass)> + '_ {
        self.space.iter().zip(self.cells.iter().copied())
    }
}




/**
 * Classify the ghost strips of every block face at one level. The strips
 * are `num_grow` cells deep and exclude corners, which the five-point
 * stencil family never reads.
 */
pub fn build_masks(grids: &GridList, geometry: &DomainGeometry, num_grow: i64) -> Vec<[Mask; 4]> {
    build(grids, geometry, num_grow, None)
}




/**
 * Like `build_masks`, but a cell only counts as covered when its covering
 * block is owned by this process. Ghost cells covered by remote blocks come
 * out `NotCovered`: they receive a synthesized fallback that the external
 * exchange collaborator later overwrites with valid data.
 */
pub fn build_local_masks(
    grids: &GridList,
    geometry: &DomainGeometry,
    num_grow: i64,
    dmap: &DistributionMap,
) -> Vec<[Mask; 4]> {
    build(grids, geometry, num_grow, Some(dmap))
}




fn build(
    grids: &GridList,
    geometry: &DomainGeometry,
    num_grow: i64,
    dmap: Option<&DistributionMap>,
) -> Vec<[Mask; 4]> {

    let classify = |index: (i64, i64)| -> CellClass {
        let wrapped = geometry.wrap(index);

        if !geometry.domain().contains(wrapped) {
            return CellClass::OutsideDomain
        }
        match grids.block_containing(wrapped) {
            Some(n) if dmap.map_or(true, |d| d.is_local(n)) => CellClass::Covered,
            _ => CellClass::NotCovered,
        }
    };

    (0..grids.len()).map(|block| {
        let strip = |orientation: Orientation| {
            let space = grids.get(block).face_strip(orientation, num_grow);
            let cells = space.iter().map(classify).collect();
            Mask { space, cells }
        };
        [
            strip(Orientation::ILo),
            strip(Orientation::IHi),
            strip(Orientation::JLo),
            strip(Orientation::JHi),
        ]
    }).collect()
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::comm::DistributionMap;
    use crate::geometry::DomainGeometry;
    use crate::grid_list::GridList;
    use crate::index_space::{range2d, Orientation};
    use super::{build_local_masks, build_masks, CellClass};

    fn two_blocks(periodic: (bool, bool)) -> (GridList, DomainGeometry) {
        let grids = GridList::new(vec![range2d(0..4, 0..4), range2d(4..8, 0..4)]);
        let geometry = DomainGeometry::new(range2d(0..8, 0..4), (0.0, 0.0), (2.0, 1.0), periodic);
        (grids, geometry)
    }

    #[test]
    fn sibling_faces_are_covered_and_walls_are_outside() {
        let (grids, geometry) = two_blocks((false, false));
        let masks = build_masks(&grids, &geometry, 1);

        let east = &masks[0][Orientation::IHi.index()];
        assert!(east.iter().all(|(_, c)| c == CellClass::Covered));

        let west = &masks[0][Orientation::ILo.index()];
        assert!(west.iter().all(|(_, c)| c == CellClass::OutsideDomain));
    }

    #[test]
    fn periodic_axes_never_classify_outside() {
        let (grids, geometry) = two_blocks((true, true));
        let masks = build_masks(&grids, &geometry, 1);

        for block in &masks {
            for mask in block {
                assert!(mask.iter().all(|(_, c)| c == CellClass::Covered));
            }
        }
    }

    #[test]
    fn every_ghost_cell_gets_exactly_one_class() {
        let (grids, geometry) = two_blocks((false, true));
        let masks = build_masks(&grids, &geometry, 1);
        let count: usize = masks.iter().flatten().map(|m| m.iter().count()).sum();

        // two blocks, four faces each, strips of 4 cells
        assert_eq!(count, 2 * 4 * 4);
    }

    #[test]
    fn remote_coverage_is_masked_out_locally() {
        let (grids, geometry) = two_blocks((false, false));
        let dmap = DistributionMap::new(vec![0, 1], 0);
        let masks = build_local_masks(&grids, &geometry, 1, &dmap);

        let east = &masks[0][Orientation::IHi.index()];
        assert!(east.iter().all(|(_, c)| c == CellClass::NotCovered));
    }
}
