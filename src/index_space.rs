use core::ops::Range;
use serde::{Serialize, Deserialize};




/**
 * Identifier for a Cartesian axis
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    I,
    J,
}




/**
 * Identifier for one face of a rectangular index space: low or high side of
 * either axis. Orientations index per-face data such as boundary registers
 * and ghost masks.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    ILo,
    IHi,
    JLo,
    JHi,
}




// ============================================================================
impl Orientation {

    pub const ALL: [Orientation; 4] = [
        Orientation::ILo,
        Orientation::IHi,
        Orientation::JLo,
        Orientation::JHi,
    ];


    pub fn axis(self) -> Axis {
        match self {
            Orientation::ILo | Orientation::IHi => Axis::I,
            Orientation::JLo | Orientation::JHi => Axis::J,
        }
    }


    pub fn is_low(self) -> bool {
        matches!(self, Orientation::ILo | Orientation::JLo)
    }


    /**
     * Return the outward-pointing unit normal of this face.
     */
    pub fn normal(self) -> (i64, i64) {
        match self {
            Orientation::ILo => (-1, 0),
            Orientation::IHi => (1, 0),
            Orientation::JLo => (0, -1),
            Orientation::JHi => (0, 1),
        }
    }


    /**
     * Return the position of this orientation in a per-face array.
     */
    pub fn index(self) -> usize {
        match self {
            Orientation::ILo => 0,
            Orientation::IHi => 1,
            Orientation::JLo => 2,
            Orientation::JHi => 3,
        }
    }
}




/**
 * Represents a rectangular region in a discrete index space
 */
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpace {
    di: Range<i64>,
    dj: Range<i64>,
}




/**
 * Describes a rectangular index space. The index type is signed 64-bit
 * integer.
 */
impl IndexSpace {


    pub fn new(di: Range<i64>, dj: Range<i64>) -> Self {

        assert!(
            di.start <= di.end && dj.start <= dj.end,
            "index space has negative volume");

        Self { di, dj }
    }


    /**
     * Return the number of indexes on each axis.
     */
    pub fn dim(&self) -> (usize, usize) {
        ((self.di.end - self.di.start) as usize,
         (self.dj.end - self.dj.start) as usize)
    }


    /**
     * Return the number of elements in this index space.
     */
    pub fn len(&self) -> usize {
        let (l, m) = self.dim();
        l * m
    }


    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> (i64, i64) {
        (self.di.start, self.dj.start)
    }


    /**
     * Return the maximum index (exclusive).
     */
    pub fn end(&self) -> (i64, i64) {
        (self.di.end, self.dj.end)
    }


    /**
     * Determine whether this index space contains the given index.
     */
    pub fn contains(&self, index: (i64, i64)) -> bool {
        self.di.contains(&index.0) && self.dj.contains(&index.1)
    }


    /**
     * Determine whether another index space is a subset of this one.
     */
    pub fn contains_space(&self, other: &Self) -> bool {
        other.di.start >= self.di.start && other.di.end <= self.di.end &&
        other.dj.start >= self.dj.start && other.dj.end <= self.dj.end
    }


    /**
     * Return the intersection with another index space, if it is not empty.
     */
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let i0 = self.di.start.max(other.di.start);
        let i1 = self.di.end.min(other.di.end);
        let j0 = self.dj.start.max(other.dj.start);
        let j1 = self.dj.end.min(other.dj.end);

        if i0 < i1 && j0 < j1 {
            Some(Self::new(i0..i1, j0..j1))
        } else {
            None
        }
    }


    /**
     * Expand this index space by the given number of elements on each axis.
     */
    pub fn extend_all(&self, delta: i64) -> Self {
        Self::new(
            self.di.start - delta .. self.di.end + delta,
            self.dj.start - delta .. self.dj.end + delta)
    }


    /**
     * Trim this index space by the given number of elements on each axis.
     */
    pub fn trim_all(&self, delta: i64) -> Self {
        self.extend_all(-delta)
    }


    /**
     * Move the lower bound of the given axis outward by `delta` elements.
     */
    pub fn extend_lower(&self, delta: i64, axis: Axis) -> Self {
        match axis {
            Axis::I => Self::new(self.di.start - delta .. self.di.end, self.dj.clone()),
            Axis::J => Self::new(self.di.clone(), self.dj.start - delta .. self.dj.end),
        }
    }


    /**
     * Move the upper bound of the given axis outward by `delta` elements.
     */
    pub fn extend_upper(&self, delta: i64, axis: Axis) -> Self {
        match axis {
            Axis::I => Self::new(self.di.start .. self.di.end + delta, self.dj.clone()),
            Axis::J => Self::new(self.di.clone(), self.dj.start .. self.dj.end + delta),
        }
    }


    /**
     * Refine this index space by the given factor: each index maps to
     * `factor` indexes per axis on the finer space.
     */
    pub fn refine_by(&self, factor: i64) -> Self {
        Self::new(
            self.di.start * factor .. self.di.end * factor,
            self.dj.start * factor .. self.dj.end * factor)
    }


    /**
     * Coarsen this index space by the given factor. The lower bound rounds
     * down and the upper bound rounds up, so the coarse space covers the
     * fine one.
     */
    pub fn coarsen_by(&self, factor: i64) -> Self {
        let down = |n: i64| n.div_euclid(factor);
        let up = |n: i64| -((-n).div_euclid(factor));
        Self::new(
            down(self.di.start) .. up(self.di.end),
            down(self.dj.start) .. up(self.dj.end))
    }


    /**
     * Determine whether coarsening by the given factor maps this space onto
     * whole coarse cells, with nothing hanging over the edges.
     */
    pub fn coarsens_evenly(&self, factor: i64) -> bool {
        self.di.start.rem_euclid(factor) == 0 &&
        self.di.end.rem_euclid(factor) == 0 &&
        self.dj.start.rem_euclid(factor) == 0 &&
        self.dj.end.rem_euclid(factor) == 0
    }


    /**
     * Return the slab of indexes lying immediately outside the given face,
     * `depth` elements deep. The slab spans only the face extent on the
     * transverse axis; corner indexes are not included.
     */
    pub fn face_strip(&self, orientation: Orientation, depth: i64) -> Self {
        match orientation {
            Orientation::ILo => Self::new(self.di.start - depth .. self.di.start, self.dj.clone()),
            Orientation::IHi => Self::new(self.di.end .. self.di.end + depth, self.dj.clone()),
            Orientation::JLo => Self::new(self.di.clone(), self.dj.start - depth .. self.dj.start),
            Orientation::JHi => Self::new(self.di.clone(), self.dj.end .. self.dj.end + depth),
        }
    }


    /**
     * Return the linear offset for the given index, in a row-major memory
     * buffer aligned with the start of this index space.
     */
    pub fn row_major_offset(&self, index: (i64, i64)) -> usize {
        let i = (index.0 - self.di.start) as usize;
        let j = (index.1 - self.dj.start) as usize;
        let m = (self.dj.end - self.dj.start) as usize;
        i * m + j
    }


    /**
     * Return an iterator which traverses the index space in row-major order
     * (C-like; the final index increases fastest).
     */
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.di.clone().map(move |i| self.dj.clone().map(move |j| (i, j))).flatten()
    }
}




// ============================================================================
impl From<(Range<i64>, Range<i64>)> for IndexSpace {
    fn from(range: (Range<i64>, Range<i64>)) -> Self {
        Self { di: range.0, dj: range.1 }
    }
}

impl From<IndexSpace> for (Range<i64>, Range<i64>) {
    fn from(space: IndexSpace) -> Self {
        (space.di, space.dj)
    }
}




/**
 * Less imposing factory function to construct an IndexSpace object.
 */
pub fn range2d(di: Range<i64>, dj: Range<i64>) -> IndexSpace {
    IndexSpace::new(di, dj)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{range2d, Axis, Orientation};

    #[test]
    fn index_space_has_correct_dim_and_len() {
        let space = range2d(-2..6, 4..8);
        assert_eq!(space.dim(), (8, 4));
        assert_eq!(space.len(), 32);
        assert!(space.contains((-2, 4)));
        assert!(!space.contains((6, 4)));
    }

    #[test]
    fn refine_and_coarsen_are_inverses_on_aligned_spaces() {
        let space = range2d(-2..6, 0..4);
        assert!(space.coarsens_evenly(2));
        assert_eq!(space.refine_by(2).coarsen_by(2), space);
        assert_eq!(space.coarsen_by(2), range2d(-1..3, 0..2));
    }

    #[test]
    fn coarsening_covers_unaligned_spaces() {
        let space = range2d(-1..5, 1..4);
        assert!(!space.coarsens_evenly(2));
        let coarse = space.coarsen_by(2);
        assert!(coarse.refine_by(2).contains_space(&space));
        assert_eq!(coarse, range2d(-1..3, 0..2));
    }

    #[test]
    fn intersection_is_empty_for_disjoint_spaces() {
        assert_eq!(range2d(0..4, 0..4).intersect(&range2d(4..8, 0..4)), None);
        assert_eq!(
            range2d(0..4, 0..4).intersect(&range2d(2..8, 2..8)),
            Some(range2d(2..4, 2..4)));
    }

    #[test]
    fn face_strips_lie_outside_the_space() {
        let space = range2d(0..4, 0..4);
        let lo = space.face_strip(Orientation::ILo, 2);
        let hi = space.face_strip(Orientation::JHi, 1);
        assert_eq!(lo, range2d(-2..0, 0..4));
        assert_eq!(hi, range2d(0..4, 4..5));
        assert_eq!(lo.intersect(&space), None);
        assert_eq!(hi.intersect(&space), None);
    }

    #[test]
    fn extend_upper_grows_one_axis() {
        let space = range2d(0..4, 0..4);
        assert_eq!(space.extend_upper(1, Axis::I), range2d(0..5, 0..4));
        assert_eq!(space.extend_lower(1, Axis::J), range2d(0..4, -1..4));
    }
}
