//! CRS transformation and normalization

use crate::error::{GeocodeError, Result};
use crate::models::geometry::Geometry;
use proj::Proj;

/// Reproject a geometry between EPSG codes.
///
/// A no-op clone when the codes already match, so canonical-CRS sources
/// never pay for a projection setup.
pub fn reproject_geometry(geometry: &Geometry, from_epsg: u32, to_epsg: u32) -> Result<Geometry> {
    if from_epsg == to_epsg {
        return Ok(geometry.clone());
    }

    let from = format!("EPSG:{}", from_epsg);
    let to = format!("EPSG:{}", to_epsg);

    let proj = Proj::new_known_crs(&from, &to, None).map_err(|e| GeocodeError::Projection {
        from: from_epsg,
        to: to_epsg,
        reason: format!("Failed to create projection: {}", e),
    })?;

    geometry.map_coords(|[x, y]| {
        proj.convert((x, y)).map(|(x, y)| [x, y]).map_err(|e| GeocodeError::Projection {
            from: from_epsg,
            to: to_epsg,
            reason: format!("Projection failed: {}", e),
        })
    })
}
