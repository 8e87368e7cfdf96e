//! JSON sidecars next to field-map images.

use std::path::Path;

use serde_json::{Map, Value};

use bids_model::FieldMapImageType;

use crate::error::{FmapError, Result};

pub const IMAGE_TYPE: &str = "ImageType";

pub type Sidecar = Map<String, Value>;

pub fn read_sidecar(path: &Path) -> Result<Sidecar> {
    let contents = std::fs::read_to_string(path).map_err(|e| FmapError::read(path, e))?;
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FmapError::SidecarNotObject {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(FmapError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes the sidecar pretty-printed with two-space indentation, keeping
/// field order.
pub fn write_sidecar(path: &Path, sidecar: &Sidecar) -> Result<()> {
    let contents = serde_json::to_string_pretty(sidecar).map_err(|source| FmapError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, contents).map_err(|e| FmapError::write(path, e))
}

/// String tokens of `ImageType`; a bare string counts as one token.
pub fn image_type_tokens(sidecar: &Sidecar) -> Vec<&str> {
    match sidecar.get(IMAGE_TYPE) {
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(value)) => vec![value.as_str()],
        _ => Vec::new(),
    }
}

pub fn read_image_type(path: &Path) -> Result<FieldMapImageType> {
    let sidecar = read_sidecar(path)?;
    Ok(FieldMapImageType::from_tokens(&image_type_tokens(&sidecar)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sidecar(value: Value) -> Sidecar {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn tokens_from_list_and_string() {
        let listed = sidecar(json!({"ImageType": ["ORIGINAL", "PRIMARY", "P", 3]}));
        assert_eq!(image_type_tokens(&listed), vec!["ORIGINAL", "PRIMARY", "P"]);
        let single = sidecar(json!({"ImageType": "PHASE"}));
        assert_eq!(image_type_tokens(&single), vec!["PHASE"]);
        let missing = sidecar(json!({"EchoTime": 0.004}));
        assert!(image_type_tokens(&missing).is_empty());
    }
}
