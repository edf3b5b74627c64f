use std::{collections::HashMap, fs};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use timeline_data_path::GlobalDataPath;
use timeline_edits::EditLog;
use timeline_memory::GameMemory;
use timeline_types::Value;

use crate::{
    buttons::{flag_for_label, label_for_flag, BUTTON_FLAGS},
    m64::M64Paths,
    LoadError,
};

const WAFI_VERSION: u32 = 0;

/// Header metadata for a .wafi TAS.
#[derive(Debug, Clone, PartialEq)]
pub struct WafiMetadata {
    /// The TAS title.
    pub title: String,
    /// The TAS authors.
    pub authors: String,
    /// A free-form description.
    pub description: String,
    /// The game version identifier (opaque to this crate).
    pub game_version: String,
}

/// A single entry from the `inputs` array of a .wafi document, in file order.
///
/// The wafi format alternates: zero or more [WafiEntry::VariableEdit] entries for non-input
/// variables scheduled at the current frame, followed by exactly one
/// [WafiEntry::FrameInput] entry that advances the frame counter.
#[derive(Debug, Clone, PartialEq)]
pub enum WafiEntry {
    /// A one-off edit to a variable other than the standard controller inputs.
    VariableEdit {
        /// The edited variable's name.
        variable: String,
        /// An optional object slot qualifier, for per-object variables.
        object_slot: Option<i64>,
        /// The assigned value, left as raw JSON since its type depends on the variable.
        value: Json,
    },
    /// The input state for the current frame, after which the frame counter advances.
    FrameInput {
        /// The joystick x coordinate.
        stick_x: i8,
        /// The joystick y coordinate.
        stick_y: i8,
        /// The raw 16-bit button flags, derived from the entry's button labels.
        buttons: u16,
    },
}

#[derive(Serialize, Deserialize)]
struct WafiInfo {
    title: String,
    authors: String,
    description: String,
}

#[derive(Serialize, Deserialize)]
struct WafiGame {
    name: String,
    version: String,
}

#[derive(Serialize, Deserialize)]
struct WafiDocument {
    info: WafiInfo,
    game: WafiGame,
    frame_range: [u32; 2],
    inputs: Vec<Json>,
    #[serde(rename = "_version")]
    version: u32,
}

/// Load a .wafi TAS from a file.
pub fn load_wafi(filename: &str) -> Result<(WafiMetadata, Vec<WafiEntry>), LoadError> {
    let contents = fs::read_to_string(filename)?;
    let doc: WafiDocument = serde_json::from_str(&contents)
        .map_err(|error| LoadError::invalid(0, error.to_string()))?;
    if doc.version != WAFI_VERSION {
        return Err(LoadError::invalid(0, format!("unsupported wafi version {}", doc.version)));
    }

    let metadata = WafiMetadata {
        title: doc.info.title,
        authors: doc.info.authors,
        description: doc.info.description,
        game_version: doc.game.version,
    };

    let mut entries = Vec::with_capacity(doc.inputs.len());
    for (i, entry) in doc.inputs.into_iter().enumerate() {
        match entry {
            Json::Object(fields) => {
                let variable = fields
                    .get("variable")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| LoadError::invalid(i, "missing 'variable' field"))?
                    .to_string();
                let object_slot = fields.get("object_slot").and_then(|v| v.as_i64());
                let value = fields
                    .get("value")
                    .cloned()
                    .ok_or_else(|| LoadError::invalid(i, "missing 'value' field"))?;
                entries.push(WafiEntry::VariableEdit {
                    variable,
                    object_slot,
                    value,
                });
            }
            Json::Array(items) => {
                if items.len() < 2 {
                    return Err(LoadError::invalid(i, "frame input entry missing stick axes"));
                }
                let stick_x = items[0]
                    .as_i64()
                    .ok_or_else(|| LoadError::invalid(i, "stick_x is not an integer"))? as i8;
                let stick_y = items[1]
                    .as_i64()
                    .ok_or_else(|| LoadError::invalid(i, "stick_y is not an integer"))? as i8;
                let mut buttons = 0u16;
                for label in &items[2..] {
                    let label = label
                        .as_str()
                        .ok_or_else(|| LoadError::invalid(i, "button label is not a string"))?;
                    let flag = flag_for_label(label)
                        .ok_or_else(|| LoadError::invalid(i, format!("unknown button label {:?}", label)))?;
                    buttons |= flag;
                }
                entries.push(WafiEntry::FrameInput {
                    stick_x,
                    stick_y,
                    buttons,
                });
            }
            _ => return Err(LoadError::invalid(i, "input entry is neither an object nor an array")),
        }
    }

    Ok((metadata, entries))
}

/// Save a .wafi TAS to a file.
///
/// Each frame's buttons and sticks are emitted unconditionally, even when unchanged from the
/// previous frame, matching the source format's encoding.
pub fn save_wafi(filename: &str, metadata: &WafiMetadata, entries: &[WafiEntry]) -> Result<(), LoadError> {
    let num_frames = entries
        .iter()
        .filter(|e| matches!(e, WafiEntry::FrameInput { .. }))
        .count() as u32;

    let inputs = entries
        .iter()
        .map(|entry| match entry {
            WafiEntry::VariableEdit {
                variable,
                object_slot,
                value,
            } => {
                let mut map = serde_json::Map::new();
                map.insert("variable".to_string(), Json::String(variable.clone()));
                if let Some(slot) = object_slot {
                    map.insert("object_slot".to_string(), Json::from(*slot));
                }
                map.insert("value".to_string(), value.clone());
                Json::Object(map)
            }
            WafiEntry::FrameInput {
                stick_x,
                stick_y,
                buttons,
            } => {
                let mut items = vec![Json::from(*stick_x as i64), Json::from(*stick_y as i64)];
                for &(label, flag) in BUTTON_FLAGS {
                    if buttons & flag != 0 {
                        items.push(Json::String(label.to_string()));
                    }
                }
                Json::Array(items)
            }
        })
        .collect();

    let doc = WafiDocument {
        info: WafiInfo {
            title: metadata.title.clone(),
            authors: metadata.authors.clone(),
            description: metadata.description.clone(),
        },
        game: WafiGame {
            name: "Super Mario 64".to_string(),
            version: metadata.game_version.clone(),
        },
        frame_range: [0, num_frames],
        inputs,
        version: WAFI_VERSION,
    };

    let contents = serde_json::to_string_pretty(&doc).map_err(|error| LoadError::invalid(0, error.to_string()))?;
    fs::write(filename, contents)?;
    Ok(())
}

fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::None,
        Json::Bool(b) => Value::Int(if *b { 1 } else { 0 }),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i as i128)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(_) | Json::Object(_) => Value::None,
    }
}

/// Replay a sequence of wafi entries into an edit log.
///
/// `variable_paths` resolves a non-input variable's name to its compiled data path;
/// `input_paths` supplies the standard controller fields that every [WafiEntry::FrameInput]
/// writes to.
pub fn replay_wafi<M: GameMemory>(
    entries: &[WafiEntry],
    variable_paths: &HashMap<String, GlobalDataPath>,
    input_paths: &M64Paths,
    log: &mut EditLog<M>,
) -> Result<(), LoadError> {
    let mut frame = 0u32;
    for (i, entry) in entries.iter().enumerate() {
        match entry {
            WafiEntry::VariableEdit { variable, value, .. } => {
                let path = variable_paths
                    .get(variable)
                    .ok_or_else(|| LoadError::invalid(i, format!("unresolved variable {:?}", variable)))?;
                log.write(path, frame, json_to_value(value));
            }
            WafiEntry::FrameInput {
                stick_x,
                stick_y,
                buttons,
            } => {
                log.write(&input_paths.stick_x, frame, Value::Int(*stick_x as i128));
                log.write(&input_paths.stick_y, frame, Value::Int(*stick_y as i128));
                for &(_, flag) in BUTTON_FLAGS {
                    log.write_flag(&input_paths.buttons, frame, flag as u32, buttons & flag != 0);
                }
                frame += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_and_flag_round_trip() {
        for &(label, flag) in BUTTON_FLAGS {
            assert_eq!(flag_for_label(label), Some(flag));
            assert_eq!(label_for_flag(flag), Some(label));
        }
    }

    #[test]
    fn json_scalar_conversions() {
        assert_eq!(json_to_value(&Json::Bool(true)), Value::Int(1));
        assert_eq!(json_to_value(&Json::from(42)), Value::Int(42));
        assert_eq!(json_to_value(&Json::from(1.5)), Value::Float(1.5));
    }
}
