//! # Grid resources
//!
//! Payloads of the `/grid/...` endpoints. The server addresses cells as `{r, c}` (row, column).
//! Every JSON read endpoint wraps its list in a `{"data": [...]}` envelope, which is validated
//! here so that nothing of an unexpected shape makes it past the boundary.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::WireError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single grid cell as the server sees it, used for both obstacles and path points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    /// Row index
    pub r: i32,

    /// Column index
    pub c: i32,
}

/// A calibration record: the pixel position of one grid intersection in the field image.
///
/// The `y` pixel coordinate is measured upwards from the bottom edge of the image, so that row
/// indices and `y` grow in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(alias = "r")]
    pub row: i32,

    #[serde(alias = "c")]
    pub col: i32,

    pub x: f64,

    pub y: f64,
}

/// The `{"data": [...]}` wrapper used by all JSON list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Vec<T>,
}

/// Acknowledgement of an obstacle or path replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutAck {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub count: Option<usize>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Inventory of the grid artifacts held by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridManifest {
    pub directory: String,

    pub files: Vec<ManifestEntry>,
}

/// One file in the [`GridManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,

    pub exists: bool,

    pub path_csv: String,

    pub path_json: String,

    pub mime: String,

    #[serde(default)]
    pub size_bytes: Option<u64>,

    #[serde(default)]
    pub mtime: Option<i64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A list of cells which may arrive either bare or inside a [`DataEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellList {
    Bare(Vec<GridCell>),
    Wrapped(DataEnvelope<GridCell>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GridCell {
    pub fn new(r: i32, c: i32) -> Self {
        Self { r, c }
    }
}

impl CellList {
    /// Unwrap into the contained cells.
    pub fn into_cells(self) -> Vec<GridCell> {
        match self {
            CellList::Bare(v) => v,
            CellList::Wrapped(e) => e.data,
        }
    }
}

impl From<Vec<GridCell>> for CellList {
    fn from(cells: Vec<GridCell>) -> Self {
        CellList::Bare(cells)
    }
}

impl std::fmt::Display for GridManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.directory)?;
        for entry in &self.files {
            write!(f, "\n  {}", entry)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.exists, self.size_bytes) {
            (true, Some(size)) => write!(f, "{} ({} bytes, {})", self.name, size, self.mime),
            (true, None) => write!(f, "{} ({})", self.name, self.mime),
            (false, _) => write!(f, "{} (missing)", self.name),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode the list inside a `{"data": [...]}` envelope.
///
/// Anything else, including a bare list or an element of the wrong shape, is rejected.
pub fn decode_data<T: DeserializeOwned>(json_str: &str) -> Result<Vec<T>, WireError> {
    serde_json::from_str::<DataEnvelope<T>>(json_str)
        .map(|e| e.data)
        .map_err(WireError::InvalidJson)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_calibration_aliases() {
        // The documented form uses row/col, the server actually emits r/c
        let documented = r#"{"data": [{"row": 0, "col": 1, "x": 10.5, "y": 20.0}]}"#;
        let emitted = r#"{"data": [{"r": 0, "c": 1, "x": 10.5, "y": 20.0}]}"#;

        let a: Vec<CalibrationRecord> = decode_data(documented).unwrap();
        let b: Vec<CalibrationRecord> = decode_data(emitted).unwrap();

        assert_eq!(a, b);
        assert_eq!(a[0], CalibrationRecord { row: 0, col: 1, x: 10.5, y: 20.0 });
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert!(decode_data::<GridCell>(r#"[{"r": 1, "c": 2}]"#).is_err());
        assert!(decode_data::<GridCell>(r#"{"data": [{"row": 1}]}"#).is_err());
        assert!(decode_data::<GridCell>(r#"{"error": "obstacles.csv not found"}"#).is_err());
        assert!(decode_data::<GridCell>("not json").is_err());

        assert_eq!(
            decode_data::<GridCell>(r#"{"data": []}"#).unwrap(),
            Vec::<GridCell>::new()
        );
    }

    #[test]
    fn test_cell_list_forms() {
        let bare: CellList = serde_json::from_str(r#"[{"r": 3, "c": 7}]"#).unwrap();
        let wrapped: CellList = serde_json::from_str(r#"{"data": [{"r": 3, "c": 7}]}"#).unwrap();

        assert_eq!(bare.into_cells(), vec![GridCell::new(3, 7)]);
        assert_eq!(wrapped.into_cells(), vec![GridCell::new(3, 7)]);
    }

    #[test]
    fn test_put_ack() {
        let ack: PutAck =
            serde_json::from_str(r#"{"status": "Path updated successfully", "count": 2}"#)
                .unwrap();
        assert_eq!(ack.count, Some(2));
        assert_eq!(ack.error, None);
    }

    #[test]
    fn test_manifest_display() {
        let manifest = GridManifest {
            directory: "/srv/circe/grid".into(),
            files: vec![
                ManifestEntry {
                    name: "path".into(),
                    exists: true,
                    path_csv: "path.csv".into(),
                    path_json: "path.json".into(),
                    mime: "text/csv".into(),
                    size_bytes: Some(120),
                    mtime: None,
                },
                ManifestEntry {
                    name: "obstacles".into(),
                    exists: false,
                    path_csv: "obstacles.csv".into(),
                    path_json: "obstacles.json".into(),
                    mime: "text/csv".into(),
                    size_bytes: None,
                    mtime: None,
                },
            ],
        };

        assert_eq!(
            manifest.to_string(),
            "/srv/circe/grid\n  path (120 bytes, text/csv)\n  obstacles (missing)"
        );
    }
}
