use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::{error::Result, fields};

/// Position in the atlas packed sprite list -> sprite path id
pub fn build_index_to_path_id(atlas: &Value) -> Result<BTreeMap<usize, i64>> {
    fields::get_array(atlas, &["m_PackedSprites", "Array"])?
        .iter()
        .enumerate()
        .map(|(i, packed)| Ok((i, fields::get_i64(packed, &["m_PathID"])?)))
        .collect()
}

/// Path id -> position. Path ids are expected to be unique within one atlas,
/// if not the later position wins.
pub fn invert(index_to_path_id: &BTreeMap<usize, i64>) -> HashMap<i64, usize> {
    index_to_path_id
        .iter()
        .map(|(&index, &path_id)| (path_id, index))
        .collect()
}

pub fn build_path_id_to_index(atlas: &Value) -> Result<HashMap<i64, usize>> {
    Ok(invert(&build_index_to_path_id(atlas)?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn atlas(path_ids: &[i64]) -> Value {
        let packed = path_ids
            .iter()
            .map(|p| json!({"m_FileID": 0, "m_PathID": p}))
            .collect::<Vec<_>>();
        json!({"m_PackedSprites": {"Array": packed}})
    }

    #[test]
    fn test_index_to_path_id() {
        let map = build_index_to_path_id(&atlas(&[10, 20, 30])).unwrap();

        assert_eq!(map, BTreeMap::from([(0, 10), (1, 20), (2, 30)]));
    }

    #[test]
    fn test_invert() {
        let inverted = invert(&build_index_to_path_id(&atlas(&[10, 20, 30])).unwrap());

        assert_eq!(inverted, HashMap::from([(10, 0), (20, 1), (30, 2)]));
    }

    #[test]
    fn test_invert_duplicates_last_wins() {
        let inverted = build_path_id_to_index(&atlas(&[10, 20, 10])).unwrap();

        assert_eq!(inverted, HashMap::from([(10, 2), (20, 1)]));
    }

    #[test]
    fn test_negative_and_string_ids() {
        let doc = json!({"m_PackedSprites": {"Array": [{"m_PathID": "-4"}, {"m_PathID": -9}]}});

        let map = build_index_to_path_id(&doc).unwrap();

        assert_eq!(map, BTreeMap::from([(0, -4), (1, -9)]));
    }

    #[test]
    fn test_missing_array() {
        assert!(build_index_to_path_id(&json!({"m_PackedSprites": {}})).is_err());
    }
}
