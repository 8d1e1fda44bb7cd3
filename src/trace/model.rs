use std::{fs::File, path::Path};

use anyhow::Context as _;

use crate::foundation::error::{ReplayResult, TraceError};

/// One discrete step of a sorting trace.
///
/// On the wire an action is `{ "type": ..., "positions": [...], "values": [...] }`; see
/// [`WireAction`] for the accepted shapes.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "WireAction", into = "WireAction")]
pub enum Action {
    /// Highlight two cells; mutates nothing.
    Compare(usize, usize),
    /// Exchange the values of two cells.
    Swap(usize, usize),
    /// Overwrite one cell (merge-style placement).
    Set { index: usize, value: f64 },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Compare(..) => ActionKind::Compare,
            Self::Swap(..) => ActionKind::Swap,
            Self::Set { .. } => ActionKind::Set,
        }
    }

    /// Indices touched (or highlighted) by this action.
    pub fn positions(&self) -> ActionPositions {
        match *self {
            Self::Compare(i, j) | Self::Swap(i, j) => ActionPositions::Two([i, j]),
            Self::Set { index, .. } => ActionPositions::One([index]),
        }
    }
}

/// Small inline position list, avoids allocating per action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionPositions {
    One([usize; 1]),
    Two([usize; 2]),
}

impl ActionPositions {
    pub fn as_slice(&self) -> &[usize] {
        match self {
            Self::One(p) => p,
            Self::Two(p) => p,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.as_slice().contains(&index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Compare,
    Swap,
    Set,
}

/// Wire shape of an action as produced by the algorithm backend.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WireAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub positions: Vec<usize>,
    /// Absent and `null` are both accepted for actions that carry no value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

impl TryFrom<WireAction> for Action {
    type Error = String;

    fn try_from(w: WireAction) -> Result<Self, Self::Error> {
        match w.kind {
            ActionKind::Compare | ActionKind::Swap => {
                let &[i, j] = w.positions.as_slice() else {
                    return Err(format!(
                        "{:?} action needs exactly 2 positions, got {}",
                        w.kind,
                        w.positions.len()
                    ));
                };
                Ok(if w.kind == ActionKind::Compare {
                    Self::Compare(i, j)
                } else {
                    Self::Swap(i, j)
                })
            }
            ActionKind::Set => {
                let &[index] = w.positions.as_slice() else {
                    return Err(format!(
                        "set action needs exactly 1 position, got {}",
                        w.positions.len()
                    ));
                };
                let values = w.values.as_deref().unwrap_or(&[]);
                let &[value] = values else {
                    return Err(format!(
                        "set action needs exactly 1 value, got {}",
                        values.len()
                    ));
                };
                if !value.is_finite() {
                    return Err("set action value must be finite".to_string());
                }
                Ok(Self::Set { index, value })
            }
        }
    }
}

impl From<Action> for WireAction {
    fn from(a: Action) -> Self {
        match a {
            Action::Compare(i, j) => Self {
                kind: ActionKind::Compare,
                positions: vec![i, j],
                values: None,
            },
            Action::Swap(i, j) => Self {
                kind: ActionKind::Swap,
                positions: vec![i, j],
                values: None,
            },
            Action::Set { index, value } => Self {
                kind: ActionKind::Set,
                positions: vec![index],
                values: Some(vec![value]),
            },
        }
    }
}

/// Ordered, immutable action timeline. Index 0 happens first.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Trace(Vec<Action>);

impl Trace {
    pub fn new(actions: Vec<Action>) -> Self {
        Self(actions)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Action> {
        self.0.get(position)
    }

    pub fn actions(&self) -> &[Action] {
        &self.0
    }
}

impl FromIterator<Action> for Trace {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A trace together with the input array it was recorded against.
///
/// Serializes to the same JSON shape the backend returns, so bundles can be cached on disk and
/// replayed offline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraceBundle {
    #[serde(
        rename = "algorithm_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub algorithm: Option<String>,
    #[serde(rename = "input_array")]
    pub original: Vec<f64>,
    #[serde(rename = "actions")]
    pub trace: Trace,
}

impl TraceBundle {
    /// Decode and validate a bundle with the same rules applied to backend responses.
    pub fn from_json_str(s: &str) -> Result<Self, TraceError> {
        crate::trace::transport::decode_response(200, s)
    }

    pub fn read_json(path: &Path) -> ReplayResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read trace bundle '{}'", path.display()))?;
        Ok(Self::from_json_str(&text)?)
    }

    pub fn write_json(&self, path: &Path) -> ReplayResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let f = File::create(path)
            .with_context(|| format!("create trace bundle '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, self)
            .with_context(|| format!("write trace bundle '{}'", path.display()))?;
        Ok(())
    }
}

/// Requested ordering of the sorted output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Caller-supplied parameters forwarded verbatim to the backend.
///
/// Absent fields are left out of the request body so the backend applies its own defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shapes_map_to_actions() {
        let a: Action =
            serde_json::from_str(r#"{"type":"compare","positions":[0,1],"values":[5,3]}"#)
                .unwrap();
        assert_eq!(a, Action::Compare(0, 1));

        let a: Action = serde_json::from_str(r#"{"type":"swap","positions":[2,4]}"#).unwrap();
        assert_eq!(a, Action::Swap(2, 4));

        let a: Action =
            serde_json::from_str(r#"{"type":"set","positions":[3],"values":[42]}"#).unwrap();
        assert_eq!(
            a,
            Action::Set {
                index: 3,
                value: 42.0
            }
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(serde_json::from_str::<Action>(r#"{"type":"swap","positions":[1]}"#).is_err());
        assert!(serde_json::from_str::<Action>(r#"{"type":"set","positions":[1]}"#).is_err());
        assert!(
            serde_json::from_str::<Action>(r#"{"type":"set","positions":[1,2],"values":[1]}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<Action>(r#"{"type":"pivot","positions":[1]}"#).is_err());
        assert!(serde_json::from_str::<Action>(r#"{"type":"swap","positions":[-1,2]}"#).is_err());
    }

    #[test]
    fn null_values_count_as_absent() {
        let a: Action =
            serde_json::from_str(r#"{"type":"swap","positions":[0,1],"values":null}"#).unwrap();
        assert_eq!(a, Action::Swap(0, 1));
        assert!(
            serde_json::from_str::<Action>(r#"{"type":"set","positions":[0],"values":null}"#)
                .is_err()
        );
    }

    #[test]
    fn set_serializes_with_values() {
        let json = serde_json::to_value(Action::Set {
            index: 1,
            value: 7.0,
        })
        .unwrap();
        assert_eq!(json["type"], "set");
        assert_eq!(json["positions"], serde_json::json!([1]));
        assert_eq!(json["values"], serde_json::json!([7.0]));

        let json = serde_json::to_value(Action::Swap(0, 2)).unwrap();
        assert!(json.get("values").is_none());
    }

    #[test]
    fn request_omits_absent_fields() {
        let body = serde_json::to_string(&TraceRequest::default()).unwrap();
        assert_eq!(body, "{}");

        let body = serde_json::to_string(&TraceRequest {
            array_size: Some(20),
            sort_direction: Some(SortDirection::Desc),
        })
        .unwrap();
        assert_eq!(body, r#"{"array_size":20,"sort_direction":"desc"}"#);
    }

    #[test]
    fn positions_report_highlighted_cells() {
        assert!(Action::Compare(0, 4).positions().contains(4));
        assert!(!Action::Swap(0, 4).positions().contains(2));
        let set = Action::Set {
            index: 9,
            value: 1.0,
        };
        assert_eq!(set.positions().as_slice(), &[9]);
    }
}
