use serde::{Serialize, Deserialize};
use crate::index_space::IndexSpace;




/**
 * A patch maps a rectangular index space to field values. The backing array
 * is row-major over the index space, with a chunk of `num_fields` values per
 * zone. Patches are the unit of data this crate's operators read and write:
 * one patch per grid block, generally extended beyond the block interior by
 * the operator's ghost region.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patch {
    space: IndexSpace,
    num_fields: usize,
    data: Vec<f64>,
}




// ============================================================================
impl Patch {


    /**
     * Generate a zero-filled patch covering the given index space.
     */
    pub fn zeros(num_fields: usize, space: IndexSpace) -> Self {
        let data = vec![0.0; space.len() * num_fields];
        Self { space, num_fields, data }
    }


    /**
     * Generate a single-field patch with values defined from a closure.
     */
    pub fn from_fn<F>(space: IndexSpace, f: F) -> Self
    where
        F: Fn((i64, i64)) -> f64
    {
        let data = space.iter().map(|index| f(index)).collect();
        Self { space, num_fields: 1, data }
    }


    /**
     * Generate a multi-field patch with values defined from a closure over
     * (index, field).
     */
    pub fn from_fn_n<F>(space: IndexSpace, num_fields: usize, f: F) -> Self
    where
        F: Fn((i64, i64), usize) -> f64
    {
        let mut data = Vec::with_capacity(space.len() * num_fields);
        for index in space.iter() {
            for field in 0..num_fields {
                data.push(f(index, field))
            }
        }
        Self { space, num_fields, data }
    }


    pub fn space(&self) -> &IndexSpace {
        &self.space
    }


    pub fn num_fields(&self) -> usize {
        self.num_fields
    }


    /**
     * Return the field value at the given index.
     */
    pub fn get(&self, index: (i64, i64), field: usize) -> f64 {
        self.data[self.offset(index, field)]
    }


    pub fn set(&mut self, index: (i64, i64), field: usize, value: f64) {
        let n = self.offset(index, field);
        self.data[n] = value
    }


    pub fn add(&mut self, index: (i64, i64), field: usize, value: f64) {
        let n = self.offset(index, field);
        self.data[n] += value
    }


    /**
     * Return the chunk of field values at the given index.
     */
    pub fn get_slice(&self, index: (i64, i64)) -> &[f64] {
        let n = self.offset(index, 0);
        &self.data[n..n + self.num_fields]
    }


    pub fn get_slice_mut(&mut self, index: (i64, i64)) -> &mut [f64] {
        let n = self.offset(index, 0);
        let m = self.num_fields;
        &mut self.data[n..n + m]
    }


    pub fn fill(&mut self, value: f64) {
        for x in &mut self.data {
            *x = value
        }
    }


    /**
     * Return the largest absolute value over all zones and fields.
     */
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |a, &x| f64::max(a, x.abs()))
    }


    fn offset(&self, index: (i64, i64), field: usize) -> usize {
        self.validate_index(index, field);
        self.space.row_major_offset(index) * self.num_fields + field
    }


    fn validate_index(&self, index: (i64, i64), field: usize) {
        if !self.space.contains(index) || field >= self.num_fields {
            panic!("index ({} {}) field {} out of range on patch ({}..{} {}..{}) with {} fields",
                index.0,
                index.1,
                field,
                self.space.start().0,
                self.space.end().0,
                self.space.start().1,
                self.space.end().1,
                self.num_fields);
        }
    }
}
