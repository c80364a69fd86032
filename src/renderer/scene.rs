use glam::Mat4;

use crate::gltf::{Document, Node};

/// Walks the nodes of the document's default scene depth-first, roots in scene
/// order and children in declaration order, calling `visit` with each node's
/// index, the node, and its world transform.
///
/// Does nothing if the document has no default scene. Dangling node indices
/// are skipped, and recursion stops at a depth of `nodes.len()`, which only
/// cyclic node graphs can reach.
pub fn traverse<F>(document: &Document, mut visit: F)
where
    F: FnMut(usize, &Node, Mat4),
{
    let Some(scene) = document.scene.and_then(|scene| document.scenes.get(scene)) else {
        return;
    };
    for &root in &scene.node_indices {
        visit_node(document, root, Mat4::IDENTITY, 0, &mut visit);
    }
}

fn visit_node<F>(document: &Document, node_index: usize, parent: Mat4, depth: usize, visit: &mut F)
where
    F: FnMut(usize, &Node, Mat4),
{
    let Some(node) = document.nodes.get(node_index) else {
        tracing::debug!(node_index, "skipping node that doesn't exist");
        return;
    };
    if depth >= document.nodes.len() {
        tracing::warn!(node_index, "node graph has a cycle, not descending further");
        return;
    }
    let world = parent * node.transform;
    visit(node_index, node, world);
    for &child in &node.child_node_indices {
        visit_node(document, child, world, depth + 1, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::Scene;
    use glam::Vec3;

    fn node(transform: Mat4, children: &[usize]) -> Node {
        Node {
            mesh_index: None,
            child_node_indices: children.to_vec(),
            transform,
        }
    }

    fn visited(document: &Document) -> Vec<(usize, Mat4)> {
        let mut visited = Vec::new();
        traverse(document, |index, _, world| visited.push((index, world)));
        visited
    }

    #[test]
    fn visits_depth_first_with_world_transforms() {
        let a = Mat4::from_translation(Vec3::X);
        let b = Mat4::from_scale(Vec3::splat(2.0));
        let c = Mat4::from_translation(Vec3::Y);
        let document = Document {
            scene: Some(0),
            scenes: vec![Scene {
                node_indices: vec![0, 3],
            }],
            nodes: vec![
                node(a, &[1, 2]),
                node(b, &[]),
                node(c, &[]),
                node(Mat4::IDENTITY, &[]),
            ],
            ..Document::default()
        };
        assert_eq!(
            vec![(0, a), (1, a * b), (2, a * c), (3, Mat4::IDENTITY)],
            visited(&document)
        );
    }

    #[test]
    fn no_default_scene_visits_nothing() {
        let document = Document {
            scene: None,
            scenes: vec![Scene {
                node_indices: vec![0],
            }],
            nodes: vec![Node::default()],
            ..Document::default()
        };
        assert!(visited(&document).is_empty());
    }

    #[test]
    fn dangling_indices_are_skipped() {
        let document = Document {
            scene: Some(0),
            scenes: vec![Scene {
                node_indices: vec![5, 0],
            }],
            nodes: vec![node(Mat4::IDENTITY, &[9])],
            ..Document::default()
        };
        assert_eq!(vec![(0, Mat4::IDENTITY)], visited(&document));
    }

    #[test]
    fn cycles_terminate() {
        let document = Document {
            scene: Some(0),
            scenes: vec![Scene {
                node_indices: vec![0],
            }],
            nodes: vec![node(Mat4::IDENTITY, &[1]), node(Mat4::IDENTITY, &[0])],
            ..Document::default()
        };
        let indices: Vec<usize> = visited(&document).into_iter().map(|(i, _)| i).collect();
        assert_eq!(vec![0, 1], indices);
    }
}
