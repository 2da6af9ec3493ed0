//! Containment forest over rings
//!
//! Rings are organised so that every ring's parent is the smallest ring that
//! strictly contains it. Even depths are filled contours, odd depths are
//! holes. [`PolygonForest::flatten`] turns the forest into independent
//! [`Shape`]s: each contour with its direct children as holes, while
//! grandchildren (islands inside holes) become shapes of their own.
//!
//! Top-level rings are found through a [`SpatialIndex`]; nested levels scan
//! the children list with a bounding-box prefilter.

use crate::geometry::{BoundingBox, PointLocation, Ring, Shape, Winding};
use crate::spatial_index::{EntryId, SpatialIndex};

/// Index of a node in the forest arena
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    ring: Ring,
    bbox: BoundingBox,
    area: f64,
    children: Vec<NodeId>,
    /// Entry in the top-level index while this node is a root
    index_entry: Option<EntryId>,
}

/// `inner` lies inside `outer`
///
/// Decided by the first vertex of `inner` that is not on `outer`'s boundary.
/// When every vertex is on the boundary the smaller ring is taken to be inside.
fn ring_inside(inner: &Ring, inner_area: f64, outer: &Ring, outer_area: f64) -> bool {
    for p in inner.points() {
        match outer.locate(p) {
            PointLocation::Inside => return true,
            PointLocation::Outside => return false,
            PointLocation::OnBoundary => continue,
        }
    }
    inner_area < outer_area
}

/// Forest of nested rings
#[derive(Debug, Clone)]
pub struct PolygonForest {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    index: SpatialIndex<NodeId>,
}

impl Default for PolygonForest {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonForest {
    /// Create an empty forest
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            index: SpatialIndex::new(1.0),
        }
    }

    /// Build a forest from rings, inserted in order
    pub fn build(rings: Vec<Ring>) -> Self {
        let extent = rings
            .iter()
            .fold(BoundingBox::empty(), |acc, r| acc.union(&r.bounding_box()));
        let mut forest = Self {
            nodes: Vec::with_capacity(rings.len()),
            roots: Vec::new(),
            index: SpatialIndex::for_extent(&extent, rings.len()),
        };
        for ring in rings {
            forest.insert(ring);
        }
        forest
    }

    /// Number of rings in the forest
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no ring has been inserted
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes, in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Ring stored at a node
    pub fn ring(&self, id: NodeId) -> &Ring {
        &self.nodes[id].ring
    }

    /// Nesting depth of the deepest node (roots are depth 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().map(|&r| (r, 0)).collect();
        while let Some((id, d)) = stack.pop() {
            deepest = deepest.max(d);
            stack.extend(self.nodes[id].children.iter().map(|&c| (c, d + 1)));
        }
        deepest
    }

    /// Insert one ring at its place in the containment order
    pub fn insert(&mut self, ring: Ring) -> NodeId {
        let bbox = ring.bounding_box();
        let area = ring.area();
        let id = self.nodes.len();
        self.nodes.push(Node {
            ring,
            bbox,
            area,
            children: Vec::new(),
            index_entry: None,
        });

        let mut parent: Option<NodeId> = None;
        loop {
            let siblings: Vec<NodeId> = match parent {
                None => self
                    .index
                    .query(&bbox)
                    .into_iter()
                    .filter_map(|entry| self.index.get(entry).copied())
                    .collect(),
                Some(p) => self.nodes[p]
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| self.nodes[c].bbox.intersects(&bbox))
                    .collect(),
            };

            // Descend into the first sibling that contains the new ring
            let container = siblings.iter().copied().find(|&s| {
                let sib = &self.nodes[s];
                sib.bbox.contains_box(&bbox)
                    && ring_inside(&self.nodes[id].ring, area, &sib.ring, sib.area)
            });
            if let Some(c) = container {
                parent = Some(c);
                continue;
            }

            // Siblings inside the new ring move under it
            let contained: Vec<NodeId> = siblings
                .into_iter()
                .filter(|&s| {
                    let sib = &self.nodes[s];
                    bbox.contains_box(&sib.bbox)
                        && ring_inside(&sib.ring, sib.area, &self.nodes[id].ring, area)
                })
                .collect();
            self.attach(id, parent, &contained);
            break;
        }
        id
    }

    fn attach(&mut self, id: NodeId, parent: Option<NodeId>, contained: &[NodeId]) {
        match parent {
            None => {
                for &c in contained {
                    if let Some(entry) = self.nodes[c].index_entry.take() {
                        self.index.remove(entry);
                    }
                }
                self.roots.retain(|r| !contained.contains(r));
                self.roots.push(id);
                let entry = self.index.insert(self.nodes[id].bbox, id);
                self.nodes[id].index_entry = Some(entry);
            }
            Some(p) => {
                self.nodes[p].children.retain(|c| !contained.contains(c));
                self.nodes[p].children.push(id);
            }
        }
        self.nodes[id].children.extend_from_slice(contained);
    }

    /// Flatten into independent shapes
    ///
    /// Contours come out counter-clockwise, holes clockwise. Shapes are
    /// ordered by a depth-first walk over the roots in insertion order.
    pub fn flatten(&self) -> Vec<Shape> {
        let mut shapes = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let holes = node
                .children
                .iter()
                .map(|&h| self.nodes[h].ring.clone().with_winding(Winding::Clockwise))
                .collect();
            shapes.push(Shape::new(
                node.ring.clone().with_winding(Winding::CounterClockwise),
                holes,
            ));
            for &hole in node.children.iter().rev() {
                stack.extend(self.nodes[hole].children.iter().rev().copied());
            }
        }
        shapes
    }
}

/// Nest rings and flatten them into shapes in one step
pub fn split_into_shapes(rings: Vec<Ring>) -> Vec<Shape> {
    PolygonForest::build(rings).flatten()
}
