//! Request body encoding.
//!
//! Mutating calls default to JSON; the two form encodings exist for
//! legacy endpoints that only accept browser form submissions.

use seance_core::error::ApiError;
use seance_core::request::BodyEncoding;
use url::form_urlencoded;
use uuid::Uuid;

/// Serialize a body into the chosen encoding.
///
/// Returns the raw bytes and the matching `content-type` header value.
/// The form encodings require a JSON object; nested values are carried
/// as their compact JSON text.
pub fn encode_body(
    body: &serde_json::Value,
    encoding: BodyEncoding,
) -> Result<(Vec<u8>, String), ApiError> {
    match encoding {
        BodyEncoding::Json => {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Encoding(e.to_string()))?;
            Ok((bytes, "application/json".to_string()))
        }
        BodyEncoding::FormUrlencoded => {
            let fields = form_fields(body)?;
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (name, value) in fields {
                serializer.append_pair(&name, &value);
            }
            Ok((
                serializer.finish().into_bytes(),
                "application/x-www-form-urlencoded".to_string(),
            ))
        }
        BodyEncoding::FormMultipart => {
            let fields = form_fields(body)?;
            let boundary = format!("----seance{}", Uuid::new_v4().simple());
            let mut bytes = Vec::new();
            for (name, value) in fields {
                // A quote or line break in the name would terminate the
                // part header early.
                if name.contains(['"', '\r', '\n']) {
                    return Err(ApiError::Encoding(format!(
                        "multipart field name {name:?} contains characters not representable in a part header"
                    )));
                }
                bytes.extend_from_slice(
                    format!(
                        "--{boundary}\r\ncontent-disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                    )
                    .as_bytes(),
                );
            }
            bytes.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            Ok((
                bytes,
                format!("multipart/form-data; boundary={boundary}"),
            ))
        }
    }
}

/// Flatten a JSON object into form fields.
fn form_fields(body: &serde_json::Value) -> Result<Vec<(String, String)>, ApiError> {
    let map = body
        .as_object()
        .ok_or_else(|| ApiError::Encoding("form encodings require a JSON object body".to_string()))?;
    Ok(map
        .iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_encoding_is_the_serialized_value() {
        let (bytes, content_type) = encode_body(&json!({"a": 1}), BodyEncoding::Json).unwrap();
        assert_eq!(content_type, "application/json");
        assert_eq!(bytes, br#"{"a":1}"#);
    }

    #[test]
    fn urlencoded_escapes_values() {
        let (bytes, content_type) = encode_body(
            &json!({"text": "a b&c", "page": 2}),
            BodyEncoding::FormUrlencoded,
        )
        .unwrap();
        assert_eq!(content_type, "application/x-www-form-urlencoded");
        let encoded = String::from_utf8(bytes).unwrap();
        assert!(encoded.contains("text=a+b%26c"));
        assert!(encoded.contains("page=2"));
    }

    #[test]
    fn multipart_carries_each_field_and_closes_the_boundary() {
        let (bytes, content_type) =
            encode_body(&json!({"title": "hi"}), BodyEncoding::FormMultipart).unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
            .to_string();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(&format!("--{boundary}\r\n")));
        assert!(text.contains("name=\"title\""));
        assert!(text.contains("\r\n\r\nhi\r\n"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn multipart_rejects_field_names_that_break_the_part_header() {
        for name in ["bad\"name", "bad\r\nname"] {
            let body = json!({ name: "v" });
            let err = encode_body(&body, BodyEncoding::FormMultipart).unwrap_err();
            assert!(matches!(err, ApiError::Encoding(_)));
        }
    }

    #[test]
    fn form_encoding_rejects_non_object_bodies() {
        let err = encode_body(&json!([1, 2]), BodyEncoding::FormUrlencoded).unwrap_err();
        assert!(matches!(err, ApiError::Encoding(_)));
    }
}
