//! Fixed-grid fallback positioning
//!
//! When the render engine exposes no layout tree, View link positions are
//! computed from a linear calibration applied to the row index. The defaults
//! were measured by annotating a rendered note by hand and reading the
//! viewer's stored coordinates back; they are a configuration value, not a
//! geometry law, and should be retuned per deployment page layout.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ViewLinkPosition, ViewerBox};

/// Linear calibration for the View column grid, in viewer-space points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCalibration {
    /// Left edge of the View column.
    pub origin_x: i64,
    /// Top edge of the first data row.
    pub first_row_y: i64,
    /// Vertical distance between consecutive rows.
    pub row_height: i64,
    /// Width of the clickable region.
    pub width: i64,
    /// Height of the clickable region.
    pub height: i64,
}

impl Default for GridCalibration {
    fn default() -> Self {
        Self {
            origin_x: 675,
            first_row_y: 336,
            row_height: 30,
            width: 40,
            height: 15,
        }
    }
}

impl GridCalibration {
    /// Position of the View region for `row_index`, always on page 1.
    pub fn position_for_row(&self, row_index: usize) -> ViewerBox {
        let x1 = self.origin_x;
        let y1 = self.first_row_y + row_index as i64 * self.row_height;
        ViewerBox {
            page_no: 1,
            x1,
            y1,
            x2: x1 + self.width,
            y2: y1 + self.height,
        }
    }

    /// One [`ViewLinkPosition`] per document row, in row order.
    pub fn positions_for_rows(&self, document_ids: &[String]) -> Vec<ViewLinkPosition> {
        debug!(
            rows = document_ids.len(),
            origin_x = self.origin_x,
            first_row_y = self.first_row_y,
            row_height = self.row_height,
            "computing fixed-grid view link positions"
        );

        document_ids
            .iter()
            .enumerate()
            .map(|(row_index, document_id)| {
                ViewLinkPosition::new(row_index, document_id, self.position_for_row(row_index))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_row_matches_calibration_origin() {
        let grid = GridCalibration::default();
        let bx = grid.position_for_row(0);
        assert_eq!(
            bx,
            ViewerBox {
                page_no: 1,
                x1: 675,
                y1: 336,
                x2: 715,
                y2: 351,
            }
        );
    }

    #[test]
    fn test_rows_step_by_row_height() {
        let grid = GridCalibration::default();
        let first = grid.position_for_row(0);
        let third = grid.position_for_row(2);
        assert_eq!(third.y1 - first.y1, 60);
        assert_eq!(third.x1, first.x1);
    }

    #[test]
    fn test_positions_preserve_row_order() {
        let grid = GridCalibration::default();
        let ids = vec!["7".to_string(), "8".to_string(), "9".to_string()];
        let positions = grid.positions_for_rows(&ids);

        assert_eq!(positions.len(), 3);
        assert_eq!(positions[1].row_index, 1);
        assert_eq!(positions[1].document_id, "8");
        assert_eq!(positions[2].y1, 336 + 60);
    }

    #[test]
    fn test_retuned_calibration_applies() {
        let grid = GridCalibration {
            origin_x: 500,
            first_row_y: 100,
            row_height: 24,
            width: 36,
            height: 12,
        };
        let bx = grid.position_for_row(1);
        assert_eq!(bx.x1, 500);
        assert_eq!(bx.y1, 124);
        assert_eq!(bx.y2, 136);
    }
}
