use ciborium::value::Value;

use super::attestation::FMT_NONE;
use super::CodecError;
use crate::authenticator::{GetAssertionResult, MakeCredentialResult};
use crate::store::item::KEY_TYPE_PUBLIC_KEY;

pub const CTAP2_OK: u8 = 0x00;

fn int(key: i64) -> Value {
    Value::Integer(key.into())
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn with_status(map: Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![CTAP2_OK];
    ciborium::into_writer(&map, &mut buf).map_err(|e| CodecError::Cbor(e.to_string()))?;
    Ok(buf)
}

/// authenticatorMakeCredential response: `{1: fmt, 2: authData, 3: attStmt}`.
pub fn encode_make_credential_response(result: &MakeCredentialResult) -> Result<Vec<u8>, CodecError> {
    with_status(Value::Map(vec![
        (int(1), text(FMT_NONE)),
        (int(2), Value::Bytes(result.auth_data.clone())),
        (int(3), Value::Map(vec![])),
    ]))
}

/// authenticatorGetAssertion response. Key 4 (user) is only present for
/// discoverable credentials.
pub fn encode_get_assertion_response(result: &GetAssertionResult) -> Result<Vec<u8>, CodecError> {
    let selected = &result.selected_credential;
    let mut entries = vec![
        (
            int(1),
            Value::Map(vec![
                (text("type"), text(KEY_TYPE_PUBLIC_KEY)),
                (text("id"), Value::Bytes(selected.id.clone())),
            ]),
        ),
        (int(2), Value::Bytes(result.authenticator_data.clone())),
        (int(3), Value::Bytes(result.signature.clone())),
    ];
    if selected.discoverable {
        let mut user = vec![(text("id"), Value::Bytes(selected.user_handle.clone()))];
        if let Some(name) = &selected.user_name {
            user.push((text("name"), text(name)));
        }
        entries.push((int(4), Value::Map(user)));
    }
    with_status(Value::Map(entries))
}
