use super::CodecError;
use ciborium::value::Value;

pub const FMT_NONE: &str = "none";

/// Build a "none" attestation object: `{"fmt": "none", "attStmt": {}, "authData": h''}`.
pub fn build_none_attestation_object(auth_data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let map = Value::Map(vec![
        (Value::Text("fmt".to_string()), Value::Text(FMT_NONE.to_string())),
        (Value::Text("attStmt".to_string()), Value::Map(vec![])),
        (Value::Text("authData".to_string()), Value::Bytes(auth_data.to_vec())),
    ]);
    let mut buf = Vec::new();
    ciborium::into_writer(&map, &mut buf).map_err(|e| CodecError::Cbor(e.to_string()))?;
    Ok(buf)
}
