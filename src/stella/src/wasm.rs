//! WebAssembly bindings for the build codec
//!
//! Builds cross the boundary as JSON text so the page can keep using its own
//! object shapes.

use crate::build::BuildData;
use crate::codec;
use wasm_bindgen::prelude::*;

fn parse_build(json: &str) -> Result<BuildData, JsValue> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| JsValue::from_str(&format!("Parse failed: {}", e)))?;
    codec::validate_json(&value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Encode a build (JSON text) into a shareable token
#[wasm_bindgen(js_name = encodeBuild)]
pub fn encode_build(json: &str) -> Result<String, JsValue> {
    let build = parse_build(json)?;
    codec::encode(&build).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Decode a token back into build JSON text
///
/// Every failure reports the same `invalid build data` message.
#[wasm_bindgen(js_name = decodeBuild)]
pub fn decode_build(token: &str) -> Result<String, JsValue> {
    let build = codec::decode(token).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&build)
        .map_err(|e| JsValue::from_str(&format!("Serialize failed: {}", e)))
}

/// Check build JSON text against the size limit and schema
#[wasm_bindgen(js_name = validateBuild)]
pub fn validate_build(json: &str) -> Result<(), JsValue> {
    parse_build(json).map(drop)
}

/// Largest accepted build, in bytes of JSON
#[wasm_bindgen(js_name = maxBuildJsonLength)]
pub fn max_build_json_length() -> usize {
    crate::build::MAX_BUILD_JSON_LEN
}
