//! Conversion of loaded Bevy meshes into collision geometry.
//!
//! Scenes carry many meshes; only those named in a [`CollisionMeshFilter`]
//! become colliders. Vertices are baked into world space with the entity's
//! [`GlobalTransform`] so the simulation never sees the scene graph.

use bevy::mesh::{Mesh, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use skyhoop_sim::{ColliderKind, GeometrySource, TriangleMesh};

use crate::error::{Error, Result};

/// Which scene meshes collide, by name.
///
/// Exporters often turn `.` into `_` in object names, so a configured name
/// also matches its dotted form (`Road_001` matches `Road.001`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionMeshFilter {
    /// Names of meshes the drone lands on.
    pub ground: Vec<String>,
    /// Names of meshes that block movement.
    pub obstacles: Vec<String>,
}

impl CollisionMeshFilter {
    /// Classify a mesh by name. Ground wins if a name is listed twice.
    pub fn classify(&self, name: &str) -> Option<ColliderKind> {
        let matches = |target: &String| name == target || name == target.replace('_', ".");
        if self.ground.iter().any(matches) {
            Some(ColliderKind::Ground)
        } else if self.obstacles.iter().any(matches) {
            Some(ColliderKind::Obstacle)
        } else {
            None
        }
    }
}

fn import_error(name: &str, detail: impl Into<String>) -> Error {
    Error::MeshImport {
        name: name.to_string(),
        detail: detail.into(),
    }
}

/// Convert a mesh placed at `transform` into world-space collision geometry.
///
/// The mesh must be a triangle list with `Float32x3` positions. Unindexed
/// meshes are read as consecutive vertex triples.
pub fn geometry_from_mesh(
    mesh: &Mesh,
    transform: &GlobalTransform,
    kind: ColliderKind,
    name: &str,
) -> Result<GeometrySource> {
    if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
        return Err(import_error(
            name,
            format!("unsupported topology {:?}", mesh.primitive_topology()),
        ));
    }

    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return Err(import_error(name, "missing Float32x3 positions"));
    };

    let vertices: Vec<Vec3> = positions
        .iter()
        .map(|&p| transform.transform_point(Vec3::from_array(p)))
        .collect();

    let flat: Vec<usize> = match mesh.indices() {
        Some(indices) => indices.iter().collect(),
        None => (0..vertices.len()).collect(),
    };
    if !flat.len().is_multiple_of(3) {
        return Err(import_error(
            name,
            format!("{} indices do not form whole triangles", flat.len()),
        ));
    }

    let indices = flat
        .chunks_exact(3)
        .map(|tri| {
            let mut out = [0u32; 3];
            for (slot, &i) in out.iter_mut().zip(tri) {
                *slot = u32::try_from(i).map_err(|_| import_error(name, "index overflow"))?;
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mesh = TriangleMesh::new(vertices, indices);
    mesh.validate().map_err(|detail| import_error(name, detail))?;

    Ok(GeometrySource {
        name: name.to_string(),
        kind,
        mesh,
    })
}

/// Import every mesh the filter selects, skipping ones that fail.
pub fn import_scene<'a>(
    meshes: impl IntoIterator<Item = (&'a str, &'a Mesh, &'a GlobalTransform)>,
    filter: &CollisionMeshFilter,
) -> Vec<GeometrySource> {
    let mut sources = Vec::new();
    for (name, mesh, transform) in meshes {
        let Some(kind) = filter.classify(name) else {
            continue;
        };
        match geometry_from_mesh(mesh, transform, kind, name) {
            Ok(source) => sources.push(source),
            Err(e) => tracing::warn!("Skipping collision mesh: {e}"),
        }
    }
    tracing::info!("Imported {} collision meshes", sources.len());
    sources
}
