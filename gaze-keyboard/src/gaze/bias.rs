//! Spatial bias correction from a sparse 3x3 calibration grid.
//!
//! Grid cells sit at normalized screen fractions 0.1, 0.5 and 0.9 on each
//! axis. Between them the bias is bilinearly interpolated; outside them
//! the nearest edge cell applies. The corrected point is the original
//! (unclamped) point plus the interpolated bias.

use tracing::info;

use super::{Point, Viewport};

/// Normalized screen positions of the grid buckets along each axis.
pub const CALIBRATION_FRACTIONS: [f64; 3] = [0.1, 0.5, 0.9];

/// A per-cell correction in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiasVector {
    pub dx: f64,
    pub dy: f64,
}

impl BiasVector {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        Self {
            dx: a.dx + (b.dx - a.dx) * t,
            dy: a.dy + (b.dy - a.dy) * t,
        }
    }
}

/// 3x3 bias vectors, indexed `cells[row][col]` where row follows y and
/// col follows x through `CALIBRATION_FRACTIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationGrid {
    pub cells: [[BiasVector; 3]; 3],
}

impl CalibrationGrid {
    pub fn new(cells: [[BiasVector; 3]; 3]) -> Self {
        Self { cells }
    }

    /// Same bias everywhere.
    pub fn uniform(bias: BiasVector) -> Self {
        Self {
            cells: [[bias; 3]; 3],
        }
    }

    /// Interpolated bias at normalized `(px, py)`.
    pub fn bias_at(&self, px: f64, py: f64) -> BiasVector {
        let (ix0, ix1, tx) = bracket(px);
        let (iy0, iy1, ty) = bracket(py);

        let b00 = self.cells[iy0][ix0];
        let b10 = self.cells[iy0][ix1];
        let b01 = self.cells[iy1][ix0];
        let b11 = self.cells[iy1][ix1];

        let top = BiasVector::lerp(b00, b10, tx);
        let bottom = BiasVector::lerp(b01, b11, tx);
        BiasVector::lerp(top, bottom, ty)
    }

    /// Largest bias magnitude in the grid.
    pub fn max_magnitude(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .map(|b| (b.dx * b.dx + b.dy * b.dy).sqrt())
            .fold(0.0, f64::max)
    }
}

/// Enclosing bucket pair and interpolation weight for a normalized
/// coordinate. Values outside `[0.1, 0.9]` clamp to the edge bucket.
fn bracket(v: f64) -> (usize, usize, f64) {
    let [f0, f1, f2] = CALIBRATION_FRACTIONS;
    let v = v.clamp(f0, f2);
    if v <= f1 {
        (0, 1, (v - f0) / (f1 - f0))
    } else {
        (1, 2, (v - f1) / (f2 - f1))
    }
}

// ── Corrector ───────────────────────────────────────────────

/// Applies the current calibration grid to smoothed gaze points.
#[derive(Debug, Clone, Default)]
pub struct CalibrationBiasCorrector {
    grid: Option<CalibrationGrid>,
}

impl CalibrationBiasCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity when no grid is installed or the viewport is degenerate.
    pub fn correct(&self, point: Point, viewport: &Viewport) -> Point {
        let Some(grid) = &self.grid else {
            return point;
        };
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return point;
        }
        let bias = grid.bias_at(point.x / viewport.width, point.y / viewport.height);
        Point::new(point.x + bias.dx, point.y + bias.dy)
    }

    pub fn set_grid(&mut self, grid: CalibrationGrid) {
        info!(
            "Calibration grid installed (max bias {:.1}px)",
            grid.max_magnitude()
        );
        self.grid = Some(grid);
    }

    /// Back to identity.
    pub fn clear(&mut self) {
        if self.grid.take().is_some() {
            info!("Calibration grid cleared");
        }
    }

    pub fn grid(&self) -> Option<&CalibrationGrid> {
        self.grid.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.grid.is_some()
    }
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 1000.0).unwrap()
    }

    /// Grid whose bias equals (col * 10, row * 100).
    fn ramp_grid() -> CalibrationGrid {
        let mut cells = [[BiasVector::ZERO; 3]; 3];
        for (row, line) in cells.iter_mut().enumerate() {
            for (col, cell) in line.iter_mut().enumerate() {
                *cell = BiasVector::new(col as f64 * 10.0, row as f64 * 100.0);
            }
        }
        CalibrationGrid::new(cells)
    }

    #[test]
    fn test_identity_without_grid() {
        let c = CalibrationBiasCorrector::new();
        let p = Point::new(123.4, 567.8);
        assert_eq!(c.correct(p, &viewport()), p);
        assert!(!c.is_calibrated());
    }

    #[test]
    fn test_uniform_grid_shifts_everywhere() {
        let mut c = CalibrationBiasCorrector::new();
        c.set_grid(CalibrationGrid::uniform(BiasVector::new(5.0, -3.0)));
        for p in [Point::new(0.0, 0.0), Point::new(500.0, 500.0), Point::new(999.0, 10.0)] {
            let q = c.correct(p, &viewport());
            assert!((q.x - (p.x + 5.0)).abs() < 1e-9);
            assert!((q.y - (p.y - 3.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_exact_at_grid_nodes() {
        let grid = ramp_grid();
        for (row, fy) in CALIBRATION_FRACTIONS.iter().enumerate() {
            for (col, fx) in CALIBRATION_FRACTIONS.iter().enumerate() {
                let b = grid.bias_at(*fx, *fy);
                assert!((b.dx - col as f64 * 10.0).abs() < 1e-9);
                assert!((b.dy - row as f64 * 100.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_midway_interpolation() {
        let grid = ramp_grid();
        let b = grid.bias_at(0.3, 0.7);
        assert!((b.dx - 5.0).abs() < 1e-9);
        assert!((b.dy - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_outside_domain_clamps_to_edge() {
        let grid = ramp_grid();
        assert_eq!(grid.bias_at(0.0, 0.0), grid.bias_at(0.1, 0.1));
        assert_eq!(grid.bias_at(1.0, 1.0), grid.bias_at(0.9, 0.9));
    }

    #[test]
    fn test_continuous_across_center() {
        let grid = ramp_grid();
        let at = grid.bias_at(0.5, 0.5);
        for eps in [1e-3, 1e-6, 1e-9] {
            let below = grid.bias_at(0.5 - eps, 0.5 - eps);
            let above = grid.bias_at(0.5 + eps, 0.5 + eps);
            assert!((below.dx - at.dx).abs() < eps * 100.0);
            assert!((above.dx - at.dx).abs() < eps * 100.0);
            assert!((below.dy - at.dy).abs() < eps * 1000.0);
            assert!((above.dy - at.dy).abs() < eps * 1000.0);
        }
    }

    #[test]
    fn test_adds_to_unclamped_point() {
        let mut c = CalibrationBiasCorrector::new();
        c.set_grid(ramp_grid());
        // x beyond the right edge bucket keeps its own position.
        let q = c.correct(Point::new(990.0, 100.0), &viewport());
        assert!((q.x - 1010.0).abs() < 1e-9);
        assert!((q.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_restores_identity() {
        let mut c = CalibrationBiasCorrector::new();
        c.set_grid(CalibrationGrid::uniform(BiasVector::new(1.0, 1.0)));
        c.clear();
        let p = Point::new(10.0, 10.0);
        assert_eq!(c.correct(p, &viewport()), p);
    }
}
