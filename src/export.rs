//! STL hand-off
//!
//! Writes a [`Mesh`] as an STL triangle soup, either ASCII or binary, to any
//! [`Write`]. Facet normals are recomputed from the winding.

use crate::error::Result;
use crate::mesh::{Mesh, Vertex};
use crate::mesh_ops::calculate_face_normal;
use nalgebra::Vector3;
use std::io::Write;

/// Solid name used by [`write_stl_ascii`] when none is given
pub const DEFAULT_SOLID_NAME: &str = "relief";

fn facet_normal(v1: &Vertex, v2: &Vertex, v3: &Vertex) -> Vector3<f64> {
    let normal = calculate_face_normal(v1, v2, v3);
    if normal == Vector3::zeros() {
        Vector3::new(0.0, 0.0, 1.0)
    } else {
        normal
    }
}

/// Write the mesh as ASCII STL
pub fn write_stl_ascii<W: Write>(mesh: &Mesh, name: &str, mut writer: W) -> Result<()> {
    let name = if name.trim().is_empty() {
        DEFAULT_SOLID_NAME
    } else {
        name.trim()
    };

    writeln!(writer, "solid {}", name)?;
    for triangle in &mesh.triangles {
        let v1 = &mesh.vertices[triangle.v1];
        let v2 = &mesh.vertices[triangle.v2];
        let v3 = &mesh.vertices[triangle.v3];
        let n = facet_normal(v1, v2, v3);

        writeln!(writer, "  facet normal {:.6e} {:.6e} {:.6e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for v in [v1, v2, v3] {
            writeln!(writer, "      vertex {:.6e} {:.6e} {:.6e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)?;
    writer.flush()?;
    Ok(())
}

/// Write the mesh as binary STL
///
/// 80-byte header, little-endian triangle count, then 50 bytes per facet.
pub fn write_stl_binary<W: Write>(mesh: &Mesh, mut writer: W) -> Result<()> {
    let mut header = [0u8; 80];
    let label = b"relief-mesh binary STL";
    header[..label.len()].copy_from_slice(label);
    writer.write_all(&header)?;
    writer.write_all(&(mesh.triangles.len() as u32).to_le_bytes())?;

    for triangle in &mesh.triangles {
        let v1 = &mesh.vertices[triangle.v1];
        let v2 = &mesh.vertices[triangle.v2];
        let v3 = &mesh.vertices[triangle.v3];
        let n = facet_normal(v1, v2, v3);

        let mut record = Vec::with_capacity(50);
        for value in [n.x, n.y, n.z] {
            record.extend_from_slice(&(value as f32).to_le_bytes());
        }
        for v in [v1, v2, v3] {
            for value in [v.x, v.y, v.z] {
                record.extend_from_slice(&(value as f32).to_le_bytes());
            }
        }
        // Attribute byte count
        record.extend_from_slice(&0u16.to_le_bytes());
        writer.write_all(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Vertex::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vertex::new(0.0, 1.0, 0.0));
        mesh.add_triangle(0, 1, 2);
        mesh
    }

    #[test]
    fn test_ascii_stl() {
        let mut out = Vec::new();
        write_stl_ascii(&triangle_mesh(), "plate", &mut out).expect("Failed to write STL");
        let text = String::from_utf8(out).expect("STL is not UTF-8");

        assert!(text.starts_with("solid plate\n"));
        assert!(text.trim_end().ends_with("endsolid plate"));
        assert_eq!(text.matches("facet normal").count(), 1);
        assert_eq!(text.matches("vertex").count(), 3);
        assert!(text.contains("facet normal 0.000000e0 0.000000e0 1.000000e0"));
    }

    #[test]
    fn test_ascii_stl_default_name() {
        let mut out = Vec::new();
        write_stl_ascii(&Mesh::new(), "  ", &mut out).expect("Failed to write STL");
        assert_eq!(
            String::from_utf8(out).expect("STL is not UTF-8"),
            "solid relief\nendsolid relief\n"
        );
    }

    #[test]
    fn test_binary_stl_layout() {
        let mut out = Vec::new();
        write_stl_binary(&triangle_mesh(), &mut out).expect("Failed to write STL");

        assert_eq!(out.len(), 80 + 4 + 50);
        assert_eq!(u32::from_le_bytes([out[80], out[81], out[82], out[83]]), 1);
        // Normal z, then second vertex x
        let f32_at = |at: usize| f32::from_le_bytes([out[at], out[at + 1], out[at + 2], out[at + 3]]);
        assert_eq!(f32_at(84 + 8), 1.0);
        assert_eq!(f32_at(84 + 24), 1.0);
    }
}
