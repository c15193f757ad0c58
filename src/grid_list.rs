use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::index_space::IndexSpace;




/**
 * An ordered collection of axis-aligned rectangular blocks partitioning the
 * computational domain at one level. The list is built once per level and
 * immutable afterwards; coarser levels derive their list by uniformly
 * coarsening this one.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridList {
    blocks: Vec<IndexSpace>,
}




// ============================================================================
impl GridList {


    pub fn new(blocks: Vec<IndexSpace>) -> Self {
        assert!(!blocks.is_empty(), "grid list has no blocks");
        Self { blocks }
    }


    pub fn len(&self) -> usize {
        self.blocks.len()
    }


    pub fn get(&self, block: usize) -> &IndexSpace {
        &self.blocks[block]
    }


    pub fn iter(&self) -> impl Iterator<Item = &IndexSpace> {
        self.blocks.iter()
    }


    /**
     * Return the first block whose interior contains the given index, if
     * one exists. Block counts at this layer are modest, so a linear probe
     * is used rather than a spatial index.
     */
    pub fn block_containing(&self, index: (i64, i64)) -> Option<usize> {
        self.blocks.iter().position(|b| b.contains(index))
    }


    /**
     * Derive the next coarser grid list by halving every block per axis.
     * Fails if any block does not sit on even index bounds, or would
     * disappear entirely.
     */
    pub fn coarsen(&self) -> Result<Self, Error> {
        let mut blocks = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            if !block.coarsens_evenly(2) {
                return Err(Error::DegenerateCoarsening(block.clone()))
            }
            let coarse = block.coarsen_by(2);
            if coarse.is_empty() {
                return Err(Error::DegenerateCoarsening(block.clone()))
            }
            blocks.push(coarse)
        }
        Ok(Self { blocks })
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::index_space::range2d;
    use super::GridList;

    fn four_quadrants() -> GridList {
        GridList::new(vec![
            range2d(0..4, 0..4),
            range2d(4..8, 0..4),
            range2d(0..4, 4..8),
            range2d(4..8, 4..8),
        ])
    }

    #[test]
    fn point_probe_finds_the_owning_block() {
        let grids = four_quadrants();
        assert_eq!(grids.block_containing((1, 1)), Some(0));
        assert_eq!(grids.block_containing((4, 3)), Some(1));
        assert_eq!(grids.block_containing((3, 7)), Some(2));
        assert_eq!(grids.block_containing((8, 0)), None);
    }

    #[test]
    fn coarsening_halves_every_block() {
        let coarse = four_quadrants().coarsen().unwrap();
        assert_eq!(coarse.len(), 4);
        assert_eq!(*coarse.get(3), range2d(2..4, 2..4));
    }

    #[test]
    fn single_cell_blocks_do_not_coarsen() {
        let grids = GridList::new(vec![range2d(0..2, 0..2)]);
        let once = grids.coarsen().unwrap();
        assert!(once.coarsen().is_err());
    }
}
