//! Coordinate transformation between render space and viewer space
//!
//! Two coordinate systems are bridged here:
//! - **render space**: produced by the layout engine that renders the note
//!   PDF. Origin top-left, Y down, sub-point "dots", absolute Y across the
//!   whole (un-paginated) document.
//! - **viewer space**: the document viewer's annotation space. Origin
//!   top-left, Y down, point units, Y relative to the current page.
//!
//! When no layout tree is available the [`grid::GridCalibration`] fallback
//! computes positions from a linear row grid instead. That path is
//! calibrated, not derived; treat its constants as configuration.

pub mod grid;
pub mod layout;

pub use grid::GridCalibration;
pub use layout::{find_by_id, LayoutNode};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum hyperlink width in points; a zero-area link region is never emitted.
pub const MIN_LINK_WIDTH_PTS: f64 = 30.0;
/// Minimum hyperlink height in points.
pub const MIN_LINK_HEIGHT_PTS: f64 = 15.0;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Layout element not found: {0}")]
    LayoutElementNotFound(String),
}

/// An axis-aligned box in render space (dots, absolute Y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotBox {
    pub abs_x: f64,
    pub abs_y: f64,
    pub width: f64,
    pub height: f64,
}

/// An axis-aligned box in viewer space (points, page-relative Y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerBox {
    pub page_no: u32,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

/// Where one generated View hyperlink must be drawn, and what it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewLinkPosition {
    pub row_index: usize,
    pub document_id: String,
    pub page_no: u32,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl ViewLinkPosition {
    pub fn new(row_index: usize, document_id: impl Into<String>, at: ViewerBox) -> Self {
        Self {
            row_index,
            document_id: document_id.into(),
            page_no: at.page_no,
            x1: at.x1,
            y1: at.y1,
            x2: at.x2,
            y2: at.y2,
        }
    }
}

/// Convert a render-space box to viewer space.
///
/// Degenerate boxes are clamped before conversion: a zero-width box widens
/// toward its parent layout box when one is available, otherwise both axes
/// fall back to the fixed minimum link size. Pagination assigns the page from
/// the box's top edge; both Y values are shifted by the same page offset.
pub fn to_viewer_space(
    bx: DotBox,
    parent: Option<DotBox>,
    dots_per_point: f64,
    page_height_pts: f64,
) -> ViewerBox {
    let mut abs_x = bx.abs_x;
    let mut width = bx.width;
    let mut height = bx.height;

    if width <= 0.0 {
        match parent {
            Some(p) if p.width > 0.0 => {
                width = p.width;
                abs_x = p.abs_x;
            }
            _ => width = MIN_LINK_WIDTH_PTS * dots_per_point,
        }
    }
    if height <= 0.0 {
        height = MIN_LINK_HEIGHT_PTS * dots_per_point;
    }

    let x1 = abs_x / dots_per_point;
    let y1 = bx.abs_y / dots_per_point;
    let x2 = (abs_x + width) / dots_per_point;
    let y2 = (bx.abs_y + height) / dots_per_point;

    let page_no = (y1 / page_height_pts).floor() as u32 + 1;
    let page_offset = f64::from(page_no - 1) * page_height_pts;

    let mut out = ViewerBox {
        page_no,
        x1: x1 as i64,
        y1: (y1 - page_offset) as i64,
        x2: x2 as i64,
        y2: (y2 - page_offset) as i64,
    };

    // Sub-point boxes can still collapse under the integer cast.
    if out.x2 <= out.x1 {
        out.x2 = out.x1 + MIN_LINK_WIDTH_PTS as i64;
    }
    if out.y2 <= out.y1 {
        out.y2 = out.y1 + MIN_LINK_HEIGHT_PTS as i64;
    }

    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Pages are 1-based and the relative top edge stays inside the page.
        #[test]
        fn page_relative_y_in_range(
            abs_y in 0.0f64..2_000_000.0,
            abs_x in 0.0f64..20_000.0,
            width in 0.0f64..4_000.0,
            height in 0.0f64..4_000.0,
            dpp in 1.0f64..40.0,
        ) {
            let out = to_viewer_space(
                DotBox { abs_x, abs_y, width, height },
                None,
                dpp,
                842.0,
            );
            prop_assert!(out.page_no >= 1);
            prop_assert!(out.y1 >= 0);
            prop_assert!(out.y1 < 842);
        }

        /// No conversion ever emits a zero-area link box.
        #[test]
        fn never_zero_area(
            abs_y in 0.0f64..1_000_000.0,
            width in 0.0f64..100.0,
            height in 0.0f64..100.0,
        ) {
            let out = to_viewer_space(
                DotBox { abs_x: 500.0, abs_y, width, height },
                None,
                20.0,
                842.0,
            );
            prop_assert!(out.x2 > out.x1);
            prop_assert!(out.y2 > out.y1);
        }
    }
}
