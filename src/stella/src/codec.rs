//! Build token encoding
//!
//! Tokens are the build's JSON text, UTF-8 encoded, then base64url without
//! padding, so they can sit in a URL query string unescaped.
//!
//! Format history:
//! 1. Plain base64 (`+`, `/`, `=` padding), still accepted when decoding
//! 2. base64url without padding, the only format produced

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

use crate::build::{BuildData, MAX_BUILD_JSON_LEN};
use crate::schema::{conform, Validate, ValidationError, Violation};

/// Accepts the url-safe alphabet with canonical padding or none at all
const TOKEN_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A token that could not be turned back into a build.
///
/// The message never says why, so nothing about the decoder leaks into the
/// page that displays it. The underlying failure is available through
/// [`std::error::Error::source`] for logs.
#[derive(Debug, thiserror::Error)]
#[error("invalid build data")]
pub struct InvalidBuildData {
    #[source]
    cause: DecodeFailure,
}

impl InvalidBuildData {
    /// The step of the decode chain that failed
    pub fn cause(&self) -> &DecodeFailure {
        &self.cause
    }
}

/// Where in the decode chain a token was rejected
#[derive(Debug, thiserror::Error)]
pub enum DecodeFailure {
    #[error("token is not base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("token is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn check_size(size: usize) -> Result<(), ValidationError> {
    if size > MAX_BUILD_JSON_LEN {
        return Err(ValidationError::TooLarge {
            subject: BuildData::SUBJECT,
            size,
            max: MAX_BUILD_JSON_LEN,
        });
    }
    Ok(())
}

/// Serialize a build and run both gates, returning the JSON text
fn checked_json(build: &BuildData) -> Result<String, ValidationError> {
    let json = serde_json::to_string(build).map_err(|e| ValidationError::Schema {
        subject: BuildData::SUBJECT,
        violations: vec![Violation::new("/", e.to_string())],
    })?;
    check_size(json.len())?;
    build.validate()?;
    Ok(json)
}

/// Check a build's serialized size, then its schema.
pub fn validate(build: &BuildData) -> Result<(), ValidationError> {
    checked_json(build).map(|_| ())
}

/// Check a raw JSON document and convert it into a build
pub fn validate_json(value: &Value) -> Result<BuildData, ValidationError> {
    let size = serde_json::to_string(value).map(|s| s.len()).unwrap_or(0);
    check_size(size)?;
    conform(value)
}

/// Encode a build as a URL-safe token. Invalid builds are never encoded.
pub fn encode(build: &BuildData) -> Result<String, ValidationError> {
    let json = checked_json(build)?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

/// Decode a token produced by [`encode`] (or by the older plain-base64 encoder)
pub fn decode(token: &str) -> Result<BuildData, InvalidBuildData> {
    decode_steps(token).map_err(|cause| {
        tracing::debug!(error = %cause, "rejected build token");
        InvalidBuildData { cause }
    })
}

fn decode_steps(token: &str) -> Result<BuildData, DecodeFailure> {
    let bytes = token_bytes(token)?;
    let text = String::from_utf8(bytes)?;
    let value: Value = serde_json::from_str(&text)?;
    Ok(validate_json(&value)?)
}

/// Base64 payload of a token in either alphabet.
///
/// Padding is optional, but when present it must be the canonical one or two
/// `=`. Surrounding whitespace is not part of a token.
fn token_bytes(token: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let url_safe: String = token
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    TOKEN_DECODER.decode(url_safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::PotentialConfig;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sample() -> BuildData {
        BuildData {
            name: "Sora ✨ crit".into(),
            description: "Shield break, then burst".into(),
            id: "4f1c".into(),
            main_id: Some(103),
            support1_id: Some(112),
            support2_id: Some(141),
            disc_id: Some(211001),
            potential_ids: vec![510301, 510305, 510301],
            potential_configs: Some(vec![(
                510301,
                PotentialConfig {
                    level: Some(6),
                    priority: Some(1),
                    ..Default::default()
                },
            )]),
            notes: Some(vec![(90011, 3)]),
            edit_mode: false,
            ..Default::default()
        }
    }

    /// Standard base64 of this build contains `/`, `+` and `=` padding
    fn awkward() -> BuildData {
        BuildData {
            name: "???>>>".into(),
            id: "ab".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip() {
        let build = sample();
        let token = encode(&build).unwrap();
        assert_eq!(decode(&token).unwrap(), build);
    }

    #[test]
    fn test_round_trip_keeps_extensions() {
        let mut build = sample();
        build
            .extra
            .insert("layout".into(), serde_json::json!({"compact": true}));
        let token = encode(&build).unwrap();
        assert_eq!(decode(&token).unwrap(), build);
    }

    #[test]
    fn test_token_alphabet() {
        let build = awkward();
        let json = serde_json::to_string(&build).unwrap();
        let legacy = STANDARD.encode(&json);
        assert!(legacy.contains('+') && legacy.contains('/') && legacy.ends_with('='));

        let token = encode(&build).unwrap();
        assert!(!token.contains(['+', '/', '=']));
        assert_eq!(
            token,
            "eyJuYW1lIjoiPz8_Pj4-IiwiZGVzY3JpcHRpb24iOiIiLCJpZCI6ImFiIiwicG90ZW50aWFsSWRzIjpbXSwiZWRpdE1vZGUiOmZhbHNlfQ"
        );
    }

    #[test]
    fn test_decode_padded_and_legacy_tokens() {
        let build = awkward();
        let token = encode(&build).unwrap();

        let json = serde_json::to_string(&build).unwrap();
        let padded = URL_SAFE.encode(&json);
        assert!(padded.ends_with('=') && padded.starts_with(&token));
        assert_eq!(decode(&padded).unwrap(), build);

        let legacy = STANDARD.encode(&json);
        assert_eq!(decode(&legacy).unwrap(), build);
    }

    #[test]
    fn test_decode_rejects_loose_padding() {
        let build = awkward();
        let padded = URL_SAFE.encode(serde_json::to_string(&build).unwrap());

        for token in [
            format!("{}=====", padded),
            format!("{}=", padded),
            format!(" {}", padded),
            format!("{}\n", padded),
        ] {
            let err = decode(&token).unwrap_err();
            assert!(matches!(err.cause(), DecodeFailure::Base64(_)), "{:?}", token);
        }
    }

    #[test]
    fn test_round_trip_keeps_float_extensions() {
        let floats = [
            1.0715660391465826e-75,
            -1.81996730402717e-179,
            -1.603964615428183e143,
            0.1,
            f64::MIN_POSITIVE,
            f64::MAX,
        ];
        for f in floats {
            let mut build = sample();
            build.extra.insert("ratio".into(), json!(f));
            if let Some(configs) = build.potential_configs.as_mut() {
                configs[0].1.extra.insert("weight".into(), json!([f, {"f": f}]));
            }
            let token = encode(&build).unwrap();
            assert_eq!(decode(&token).unwrap(), build, "{:e}", f);
        }
    }

    #[test]
    fn test_encode_rejects_oversized() {
        let mut build = sample();
        build.description = "x".repeat(MAX_BUILD_JSON_LEN);
        match encode(&build) {
            Err(ValidationError::TooLarge { size, max, .. }) => {
                assert!(size > max);
                assert_eq!(max, MAX_BUILD_JSON_LEN);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_size_checked_before_schema() {
        let mut build = sample();
        build.description = "x".repeat(MAX_BUILD_JSON_LEN);
        build.extra.insert("editMode".into(), serde_json::json!(1));
        assert!(matches!(
            validate(&build),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_schema_violation() {
        let mut build = sample();
        build.extra.insert("potentialIds".into(), serde_json::json!("1,2"));
        assert!(matches!(
            encode(&build),
            Err(ValidationError::Schema { .. })
        ));
    }

    fn token_of(bytes: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(bytes)
    }

    #[test]
    fn test_decode_rejections() {
        let cases = [
            ("not base64", "@@not*base64@@".to_string()),
            ("not utf-8", token_of(&[0xff, 0xfe, 0xfd])),
            ("not json", token_of(b"{\"name\": ")),
            ("missing fields", token_of(br#"{"name":"x"}"#)),
            (
                "oversized",
                token_of(
                    serde_json::json!({
                        "name": "x".repeat(MAX_BUILD_JSON_LEN),
                        "description": "", "id": "", "potentialIds": [], "editMode": false
                    })
                    .to_string()
                    .as_bytes(),
                ),
            ),
        ];

        for (label, token) in cases {
            let err = decode(&token).expect_err(label);
            assert_eq!(err.to_string(), "invalid build data", "{}", label);
        }
    }

    #[test]
    fn test_decode_keeps_cause() {
        let err = decode(&token_of(&[0xff, 0xfe])).unwrap_err();
        assert!(matches!(err.cause(), DecodeFailure::Utf8(_)));

        let err = decode(&token_of(br#"{"name":"x"}"#)).unwrap_err();
        assert!(matches!(
            err.cause(),
            DecodeFailure::Validation(ValidationError::Schema { .. })
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validate_json_accepts_page_output() {
        let value = serde_json::json!({
            "name": "Team A",
            "description": "",
            "id": "1700000000000",
            "mainId": 103,
            "potentialIds": [510301],
            "levelMap": [[510301, 2]],
            "editMode": true
        });
        let build = validate_json(&value).unwrap();
        assert_eq!(build.potential_level(510301), Some(2));
    }

    fn ext_key() -> impl Strategy<Value = String> {
        // prefixed so no generated key collides with a known property
        "x[A-Za-z0-9_]{0,8}"
    }

    fn ext_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            any::<u64>().prop_map(Value::from),
            any::<f64>()
                .prop_filter("JSON has no NaN or infinity", |f| f.is_finite())
                .prop_map(Value::from),
            "\\PC{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 12, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map(ext_key(), inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn extensions(max: usize) -> impl Strategy<Value = BTreeMap<String, Value>> {
        prop::collection::btree_map(ext_key(), ext_value(), 0..=max)
    }

    fn potential_config() -> impl Strategy<Value = PotentialConfig> {
        (
            prop::option::of(1u32..=10),
            prop::option::of(0u32..=5),
            extensions(1),
        )
            .prop_map(|(level, priority, extra)| PotentialConfig {
                level,
                priority,
                extra,
            })
    }

    fn pairs() -> impl Strategy<Value = Option<Vec<(u32, u32)>>> {
        prop::option::of(prop::collection::vec((any::<u32>(), any::<u32>()), 0..6))
    }

    fn build_data() -> impl Strategy<Value = BuildData> {
        (
            ("\\PC{0,40}", "\\PC{0,80}", "[0-9a-f]{0,16}"),
            prop::collection::vec(prop::option::of(any::<u32>()), 6),
            prop::collection::vec(any::<u32>(), 0..20),
            prop::option::of(prop::collection::vec((any::<u32>(), potential_config()), 0..4)),
            (pairs(), pairs()),
            any::<bool>(),
            extensions(3),
        )
            .prop_map(
                |((name, description, id), slots, potential_ids, potential_configs, (level_map, notes), edit_mode, extra)| {
                    BuildData {
                        name,
                        description,
                        id,
                        main_id: slots[0],
                        support1_id: slots[1],
                        support2_id: slots[2],
                        disc_id: slots[3],
                        disc1_id: slots[4],
                        disc2_id: slots[5],
                        potential_ids,
                        potential_configs,
                        level_map,
                        notes,
                        edit_mode,
                        extra,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_round_trip(build in build_data()) {
            let json = serde_json::to_string(&build).unwrap();
            prop_assume!(json.len() <= MAX_BUILD_JSON_LEN);

            let token = encode(&build).unwrap();
            prop_assert!(token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
            prop_assert_eq!(decode(&token).unwrap(), build.clone());

            // the same payload with canonical padding, and in the legacy alphabet
            prop_assert_eq!(decode(&URL_SAFE.encode(&json)).unwrap(), build.clone());
            prop_assert_eq!(decode(&STANDARD.encode(&json)).unwrap(), build);
        }

        #[test]
        fn prop_oversized_builds_never_encode(build in build_data(), padding in 0usize..64) {
            let mut build = build;
            build.description = "x".repeat(MAX_BUILD_JSON_LEN + padding);
            let rejected = matches!(encode(&build), Err(ValidationError::TooLarge { .. }));
            prop_assert!(rejected);
        }
    }
}
