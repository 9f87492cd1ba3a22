//! CPU-side mesh data

use crate::render::vertex::Vertex;

/// An indexed triangle mesh ready for GPU upload
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Deduplicated vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_reflect_contents() {
        let mesh = MeshData {
            vertices: vec![
                Vertex { position: [0.0; 3], color: [1.0; 3], tex_coord: [0.0; 2] };
                3
            ],
            indices: vec![0, 1, 2],
        };
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert!(!mesh.is_empty());
        assert!(MeshData::default().is_empty());
    }
}
