//! Generic layout-tree lookup
//!
//! The render engine's element tree is modeled as a minimal recursive node
//! type so the extractor does not depend on any particular engine's object
//! model. Lookup is exact-id depth-first search; there is no retry and no
//! case folding.

use tracing::debug;

use crate::{to_viewer_space, DotBox, GeometryError, ViewLinkPosition};

/// One box in the render engine's layout tree, in render-space dots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutNode {
    pub id: Option<String>,
    pub abs_x: f64,
    pub abs_y: f64,
    pub width: f64,
    pub height: f64,
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn dot_box(&self) -> DotBox {
        DotBox {
            abs_x: self.abs_x,
            abs_y: self.abs_y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Depth-first search for an exact `id` match.
pub fn find_by_id<'a>(node: &'a LayoutNode, id: &str) -> Option<&'a LayoutNode> {
    if node.id.as_deref() == Some(id) {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_by_id(child, id))
}

fn find_with_parent<'a>(
    node: &'a LayoutNode,
    id: &str,
) -> Option<(&'a LayoutNode, Option<&'a LayoutNode>)> {
    if node.id.as_deref() == Some(id) {
        return Some((node, None));
    }
    for child in &node.children {
        if let Some((found, parent)) = find_with_parent(child, id) {
            return Some((found, parent.or(Some(node))));
        }
    }
    None
}

/// Compute one [`ViewLinkPosition`] per document row from the layout tree.
///
/// Row `i` is anchored to the element with id `view-<i>`. A missing element
/// is an error; the caller degrades to the fixed-grid fallback.
pub fn extract_view_positions(
    root: &LayoutNode,
    document_ids: &[String],
    dots_per_point: f64,
    page_height_pts: f64,
) -> Result<Vec<ViewLinkPosition>, GeometryError> {
    let mut positions = Vec::with_capacity(document_ids.len());

    for (row_index, document_id) in document_ids.iter().enumerate() {
        let element_id = format!("view-{}", row_index);
        let (node, parent) = find_with_parent(root, &element_id)
            .ok_or(GeometryError::LayoutElementNotFound(element_id.clone()))?;

        let viewer_box = to_viewer_space(
            node.dot_box(),
            parent.map(LayoutNode::dot_box),
            dots_per_point,
            page_height_pts,
        );
        debug!(
            element = %element_id,
            page = viewer_box.page_no,
            x1 = viewer_box.x1,
            y1 = viewer_box.y1,
            "resolved view link position from layout tree"
        );
        positions.push(ViewLinkPosition::new(row_index, document_id, viewer_box));
    }

    Ok(positions)
}
