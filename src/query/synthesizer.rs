//! Range query synthesizer
//!
//! Produces, for one ndarray type and a requested dimensional range, the
//! SQL statement that finds every stored tile whose extent overlaps the
//! range. Pure string synthesis against the fixed tile-catalog contract;
//! no I/O. Dimension tags are catalog metadata (they double as join
//! aliases), not caller input.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};
use crate::schema::model::NdarrayType;

/// A requested closed pair of bounds along one dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionRange {
    pub min: f64,
    pub max: f64,
}

impl DimensionRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Synthesizes the tile overlap query for one ndarray type.
///
/// One sub-query join per dimension (in creation order), each restricted
/// to the type, tile version 0, and the dimension tag; dimensions present
/// in `ranges` additionally get the strict open-interval overlap
/// predicate `tile_dimension_min < max and tile_dimension_max > min`, so
/// a tile exactly adjacent to the query boundary is excluded. The result
/// is ordered by every dimension's index column in creation order.
pub fn synthesize_tile_query(
    ndarray_type: &NdarrayType,
    ranges: &HashMap<String, DimensionRange>,
) -> EngineResult<String> {
    validate_ranges(ndarray_type, ranges)?;

    let dimension_tags = ndarray_type.dimension_tags_by_creation_order();
    if dimension_tags.is_empty() {
        return Err(EngineError::internal(format!(
            "ndarray type '{}' has no dimensions",
            ndarray_type.tag
        )));
    }

    let mut sql = String::from("-- Find tiles which fall in range\nselect distinct\n");

    for tag in &dimension_tags {
        sql.push_str(&format!(
            "{tag}.tile_dimension_index as {tag}_index,\n\
             {tag}.tile_dimension_min as {tag}_min,\n\
             {tag}.tile_dimension_max as {tag}_max,\n"
        ));
    }
    sql.push_str("tile.*\nfrom tile\n");

    for tag in &dimension_tags {
        sql.push_str(&format!(
            "join (\n\
             select *\n\
             from dimension\n\
             \x20   join dimension_domain using(dimension_id)\n\
             \x20   join tile_dimension using(dimension_id, domain_id)\n\
             \x20   where ndarray_type_id = {}\n\
             \x20   and tile_version = 0\n\
             \x20   and dimension.dimension_tag = '{}'\n",
            ndarray_type.id, tag
        ));

        if let Some(range) = ranges.get(tag) {
            sql.push_str(&format!(
                "\x20   and (tile_dimension_min < {}\n\
                 \x20       and tile_dimension_max > {})\n",
                range.max, range.min
            ));
        }

        sql.push_str(&format!(
            ") {tag} using(ndarray_type_id, tile_id, tile_version)\n"
        ));
    }

    let order_columns: Vec<String> = dimension_tags
        .iter()
        .map(|tag| format!("{tag}_index"))
        .collect();
    sql.push_str(&format!("order by {};\n", order_columns.join(", ")));

    Ok(sql)
}

/// Rejects unknown dimensions and inverted ranges before any I/O
fn validate_ranges(
    ndarray_type: &NdarrayType,
    ranges: &HashMap<String, DimensionRange>,
) -> EngineResult<()> {
    let mut tags: Vec<&String> = ranges.keys().collect();
    tags.sort();

    for tag in tags {
        if !ndarray_type.dimensions.contains_key(tag) {
            return Err(EngineError::invalid_dimension(
                tag,
                format!("ndarray type '{}'", ndarray_type.tag),
            ));
        }
        let range = &ranges[tag];
        if range.min > range.max {
            return Err(EngineError::empty_range(tag, range.min, range.max));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::Dimension;
    use std::sync::Arc;

    fn scene_type(tags_and_orders: &[(&str, i32)]) -> NdarrayType {
        let dimensions = tags_and_orders
            .iter()
            .map(|(tag, creation_order)| {
                (
                    tag.to_string(),
                    Arc::new(Dimension {
                        tag: tag.to_string(),
                        id: *creation_order as i64 + 100,
                        creation_order: *creation_order,
                        extent: None,
                        elements: None,
                        cache: None,
                        origin: None,
                        index_reference_system: None,
                    }),
                )
            })
            .collect();

        NdarrayType {
            tag: "scene".to_string(),
            id: 10,
            name: "Landsat scene".to_string(),
            measurement_types: HashMap::new(),
            domains: HashMap::new(),
            dimensions,
        }
    }

    #[test]
    fn ranged_dimension_gets_strict_overlap_predicate() {
        let ndarray_type = scene_type(&[("x", 0), ("y", 1)]);
        let mut ranges = HashMap::new();
        ranges.insert("x".to_string(), DimensionRange::new(10.0, 20.0));

        let sql = synthesize_tile_query(&ndarray_type, &ranges).expect("synthesis");

        assert!(sql.contains("tile_dimension_min < 20"));
        assert!(sql.contains("tile_dimension_max > 10"));
        // y is joined but not filtered
        assert!(sql.contains("dimension.dimension_tag = 'y'"));
        assert_eq!(sql.matches("tile_dimension_min <").count(), 1);
    }

    #[test]
    fn selects_and_orders_by_creation_order() {
        let ndarray_type = scene_type(&[("xy", 1), ("t", 0)]);
        let sql = synthesize_tile_query(&ndarray_type, &HashMap::new()).expect("synthesis");

        assert!(sql.contains("t.tile_dimension_index as t_index"));
        assert!(sql.contains("xy.tile_dimension_index as xy_index"));
        assert!(sql.contains("order by t_index, xy_index;"));

        let t_join = sql.find("dimension.dimension_tag = 't'").expect("t join");
        let xy_join = sql.find("dimension.dimension_tag = 'xy'").expect("xy join");
        assert!(t_join < xy_join, "joins must follow creation order");
    }

    #[test]
    fn every_join_is_version_pinned() {
        let ndarray_type = scene_type(&[("t", 0), ("xy", 1)]);
        let sql = synthesize_tile_query(&ndarray_type, &HashMap::new()).expect("synthesis");

        assert_eq!(sql.matches("ndarray_type_id = 10").count(), 2);
        assert_eq!(sql.matches("tile_version = 0").count(), 2);
        assert_eq!(
            sql.matches("using(ndarray_type_id, tile_id, tile_version)")
                .count(),
            2
        );
    }

    #[test]
    fn unknown_dimension_is_rejected() {
        let ndarray_type = scene_type(&[("t", 0)]);
        let mut ranges = HashMap::new();
        ranges.insert("wavelength".to_string(), DimensionRange::new(0.0, 1.0));

        let err = synthesize_tile_query(&ndarray_type, &ranges).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidDimension { ref dimension, .. } if dimension == "wavelength"
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let ndarray_type = scene_type(&[("t", 0)]);
        let mut ranges = HashMap::new();
        ranges.insert("t".to_string(), DimensionRange::new(15.0, 5.0));

        let err = synthesize_tile_query(&ndarray_type, &ranges).unwrap_err();
        assert!(matches!(
            err,
            EngineError::EmptyRange { min, max, .. } if min == 15.0 && max == 5.0
        ));
    }
}
