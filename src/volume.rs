use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut2;
use ndarray::s;

pub type Direction = [[f64; 3]; 3];

pub const IDENTITY_DIRECTION: Direction = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// A regularly sampled scalar volume.
///
/// Voxels are stored as `(slice, row, col)`. Spacing is `(x, y, z)`, i.e.
/// (column, row, slice) in physical units. Column `j` of `direction` is the
/// unit vector of index axis `j` (col, row, slice) in patient space.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub data: Array3<f32>,
    pub spacing: (f64, f64, f64),
    pub direction: Direction,
    pub origin: [f64; 3],
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            data: Array3::zeros((0, 0, 0)),
            spacing: (1.0, 1.0, 1.0),
            direction: IDENTITY_DIRECTION,
            origin: [0.0; 3],
        }
    }
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: (f64, f64, f64)) -> Self {
        Self {
            data,
            spacing,
            ..Default::default()
        }
    }

    pub fn with_geometry(mut self, direction: Direction, origin: [f64; 3]) -> Self {
        self.direction = direction;
        self.origin = origin;
        self
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    /// Column `axis` of the direction matrix.
    pub fn axis_direction(&self, axis: usize) -> [f64; 3] {
        [
            self.direction[0][axis],
            self.direction[1][axis],
            self.direction[2][axis],
        ]
    }

    /// Physical position of voxel `(0, 0, index)`.
    pub fn slice_position(&self, index: usize) -> [f64; 3] {
        let slice_dir = self.axis_direction(2);
        let offset = index as f64 * self.spacing.2;
        [
            self.origin[0] + offset * slice_dir[0],
            self.origin[1] + offset * slice_dir[1],
            self.origin[2] + offset * slice_dir[2],
        ]
    }

    pub fn slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.depth()).then(|| self.data.slice(s![index, .., ..]))
    }

    pub fn slice_mut(&mut self, index: usize) -> Option<ArrayViewMut2<'_, f32>> {
        (index < self.depth()).then(|| self.data.slice_mut(s![index, .., ..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_position_follows_slice_direction() {
        let volume = Volume::new(Array3::zeros((4, 2, 3)), (0.5, 0.5, 2.0)).with_geometry(
            [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]],
            [10.0, 20.0, 30.0],
        );
        assert_eq!(volume.slice_position(0), [10.0, 20.0, 30.0]);
        assert_eq!(volume.slice_position(3), [10.0, 14.0, 30.0]);
        assert_eq!(volume.axis_direction(2), [0.0, -1.0, 0.0]);
    }

    #[test]
    fn slice_out_of_range_is_none() {
        let volume = Volume::new(Array3::zeros((2, 2, 2)), (1.0, 1.0, 1.0));
        assert_eq!(volume.dim(), (2, 2, 2));
        assert!(volume.slice(1).is_some());
        assert!(volume.slice(2).is_none());
    }
}
