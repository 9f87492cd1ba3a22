//! OBJ model loading
//!
//! Loads a triangulated Wavefront OBJ through `tobj` and rebuilds it as an
//! indexed mesh, collapsing repeated position/texcoord references into a
//! single vertex.

use std::collections::HashMap;
use std::path::Path;

use crate::assets::AssetError;
use crate::render::mesh::MeshData;
use crate::render::vertex::Vertex;

/// Load a textured mesh from an OBJ file
///
/// All models in the file are merged into one mesh. Texture V coordinates are
/// flipped because OBJ uses a bottom-left origin while Vulkan samples from
/// the top left.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, AssetError> {
    let load_options = tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj(path.as_ref(), &load_options)?;

    let mut mesh = MeshData::default();
    let mut seen: HashMap<(u32, u32), u32> = HashMap::new();

    for model in &models {
        append_mesh(
            &mut mesh,
            &mut seen,
            &model.mesh.positions,
            &model.mesh.texcoords,
            &model.mesh.indices,
            &model.mesh.texcoord_indices,
        )?;
    }

    if mesh.is_empty() {
        return Err(AssetError::InvalidData(format!(
            "{} contains no triangles",
            path.as_ref().display()
        )));
    }

    log::debug!(
        "Loaded model: {} vertices, {} indices",
        mesh.vertex_count(),
        mesh.index_count()
    );
    Ok(mesh)
}

/// Append one OBJ mesh to `out`, deduplicating on (position, texcoord) pairs
///
/// `tex_indices` may be empty for untextured meshes; those vertices get a
/// zero texture coordinate. Vertex colors default to white, matching a
/// texture-dominated fragment shader.
fn append_mesh(
    out: &mut MeshData,
    seen: &mut HashMap<(u32, u32), u32>,
    positions: &[f32],
    texcoords: &[f32],
    indices: &[u32],
    tex_indices: &[u32],
) -> Result<(), AssetError> {
    if positions.len() % 3 != 0 {
        return Err(AssetError::InvalidData(
            "position array length is not a multiple of 3".to_string(),
        ));
    }
    if !tex_indices.is_empty() && tex_indices.len() != indices.len() {
        return Err(AssetError::InvalidData(
            "texcoord index count does not match position index count".to_string(),
        ));
    }

    for (i, &pos_index) in indices.iter().enumerate() {
        let tex_index = if tex_indices.is_empty() {
            u32::MAX
        } else {
            tex_indices[i]
        };

        let next_index = match seen.get(&(pos_index, tex_index)) {
            Some(&existing) => existing,
            None => {
                let vertex = build_vertex(positions, texcoords, pos_index, tex_index)?;
                let new_index = u32::try_from(out.vertices.len()).map_err(|_| {
                    AssetError::InvalidData("vertex count exceeds u32 range".to_string())
                })?;
                out.vertices.push(vertex);
                seen.insert((pos_index, tex_index), new_index);
                new_index
            }
        };
        out.indices.push(next_index);
    }

    Ok(())
}

fn build_vertex(
    positions: &[f32],
    texcoords: &[f32],
    pos_index: u32,
    tex_index: u32,
) -> Result<Vertex, AssetError> {
    let p = pos_index as usize * 3;
    let position: [f32; 3] = positions
        .get(p..p + 3)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            AssetError::InvalidData(format!("position index {pos_index} out of range"))
        })?;

    let tex_coord = if tex_index == u32::MAX {
        [0.0, 0.0]
    } else {
        let t = tex_index as usize * 2;
        let raw: [f32; 2] = texcoords
            .get(t..t + 2)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                AssetError::InvalidData(format!("texcoord index {tex_index} out of range"))
            })?;
        [raw[0], 1.0 - raw[1]]
    };

    Ok(Vertex {
        position,
        color: [1.0, 1.0, 1.0],
        tex_coord,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A quad whose two triangles share an edge keeps only four vertices.
    #[test]
    fn shared_corners_are_deduplicated() {
        let positions = [
            0.0, 0.0, 0.0, // 0
            1.0, 0.0, 0.0, // 1
            1.0, 1.0, 0.0, // 2
            0.0, 1.0, 0.0, // 3
        ];
        let texcoords = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let indices = [0, 1, 2, 2, 3, 0];
        let tex_indices = [0, 1, 2, 2, 3, 0];

        let mut mesh = MeshData::default();
        let mut seen = HashMap::new();
        append_mesh(&mut mesh, &mut seen, &positions, &texcoords, &indices, &tex_indices)
            .unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 3, 0]);
    }

    /// The same position with different texcoords stays two distinct vertices.
    #[test]
    fn distinct_texcoords_are_not_merged() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let texcoords = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.5, 0.5];
        let indices = [0, 1, 2, 0, 1, 2];
        let tex_indices = [0, 1, 2, 3, 1, 2];

        let mut mesh = MeshData::default();
        let mut seen = HashMap::new();
        append_mesh(&mut mesh, &mut seen, &positions, &texcoords, &indices, &tex_indices)
            .unwrap();

        // Position 0 is referenced with texcoords 0 and 3.
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
    }

    /// Texture V coordinates are flipped to the top-left origin.
    #[test]
    fn texcoord_v_is_flipped() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let texcoords = [0.0, 0.25, 0.0, 0.25, 0.0, 0.25];
        let indices = [0, 1, 2];
        let tex_indices = [0, 1, 2];

        let mut mesh = MeshData::default();
        let mut seen = HashMap::new();
        append_mesh(&mut mesh, &mut seen, &positions, &texcoords, &indices, &tex_indices)
            .unwrap();

        assert_eq!(mesh.vertices[0].tex_coord, [0.0, 0.75]);
        assert_eq!(mesh.vertices[0].color, [1.0, 1.0, 1.0]);
    }

    /// Meshes without texcoord indices fall back to zero coordinates.
    #[test]
    fn missing_texcoords_default_to_zero() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let indices = [0, 1, 2];

        let mut mesh = MeshData::default();
        let mut seen = HashMap::new();
        append_mesh(&mut mesh, &mut seen, &positions, &[], &indices, &[]).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.vertices.iter().all(|v| v.tex_coord == [0.0, 0.0]));
    }

    /// Out-of-range indices are rejected instead of panicking.
    #[test]
    fn out_of_range_position_index_is_an_error() {
        let positions = [0.0, 0.0, 0.0];
        let indices = [0, 1, 2];

        let mut mesh = MeshData::default();
        let mut seen = HashMap::new();
        let result = append_mesh(&mut mesh, &mut seen, &positions, &[], &indices, &[]);
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    /// Mismatched texcoord index arrays are rejected.
    #[test]
    fn mismatched_texcoord_indices_are_an_error() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let texcoords = [0.0, 0.0];
        let indices = [0, 1, 2];
        let tex_indices = [0];

        let mut mesh = MeshData::default();
        let mut seen = HashMap::new();
        let result =
            append_mesh(&mut mesh, &mut seen, &positions, &texcoords, &indices, &tex_indices);
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    /// A minimal OBJ file on disk loads end to end.
    #[test]
    fn loads_minimal_obj_file() {
        let dir = std::env::temp_dir().join("render_engine_obj_load_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triangle.obj");
        std::fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nf 1/1 2/2 3/3\n",
        )
        .unwrap();

        let mesh = load_obj(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }
}
