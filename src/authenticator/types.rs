use ciborium::value::Value;

use crate::codec::cose::COSE_ALG_ES256;
use crate::store::{parse_credential_id, CredentialId};

pub const MAX_USER_HANDLE_LEN: usize = 64;

/// Closed failure taxonomy returned to the relying party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticatorError {
    #[error("no supported algorithm")]
    NotSupported,
    #[error("unknown error")]
    Unknown,
    #[error("constraint not satisfiable")]
    Constraint,
    #[error("operation not allowed")]
    NotAllowed,
}

impl AuthenticatorError {
    /// CTAP2 status code.
    pub fn status_byte(&self) -> u8 {
        match self {
            Self::NotSupported => 0x26,
            Self::Constraint => 0x2B,
            Self::NotAllowed => 0x27,
            Self::Unknown => 0x7F,
        }
    }

    /// WebAuthn DOMException name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotSupported => "NotSupportedError",
            Self::Constraint => "ConstraintError",
            Self::NotAllowed => "NotAllowedError",
            Self::Unknown => "UnknownError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpEntity {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// User handle, at most 64 bytes.
    pub id: Vec<u8>,
    pub name: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubKeyCredParam {
    pub cred_type: String,
    pub alg: i64,
}

impl PubKeyCredParam {
    pub fn es256() -> Self {
        Self {
            cred_type: crate::store::item::KEY_TYPE_PUBLIC_KEY.to_string(),
            alg: COSE_ALG_ES256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub cred_type: String,
    pub id: Vec<u8>,
}

impl CredentialDescriptor {
    pub fn public_key(id: Vec<u8>) -> Self {
        Self {
            cred_type: crate::store::item::KEY_TYPE_PUBLIC_KEY.to_string(),
            id,
        }
    }

    /// Canonical credential id, `None` when malformed.
    pub fn credential_id(&self) -> Option<CredentialId> {
        parse_credential_id(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCredentialParams {
    pub client_data_hash: Vec<u8>,
    pub rp: RpEntity,
    pub user: UserEntity,
    pub cred_types_and_pub_key_algs: Vec<PubKeyCredParam>,
    pub exclude_credential_descriptor_list: Vec<CredentialDescriptor>,
    pub require_resident_key: Option<bool>,
    pub require_user_verification: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAssertionParams {
    pub rp_id: String,
    pub client_data_hash: Vec<u8>,
    pub allow_credential_descriptor_list: Vec<CredentialDescriptor>,
    pub require_user_verification: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCredentialResult {
    pub credential_id: Vec<u8>,
    pub attestation_object: Vec<u8>,
    pub auth_data: Vec<u8>,
    pub public_key_algorithm: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedCredential {
    pub id: Vec<u8>,
    pub user_handle: Vec<u8>,
    pub user_name: Option<String>,
    pub discoverable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAssertionResult {
    pub authenticator_data: Vec<u8>,
    pub selected_credential: SelectedCredential,
    /// ASN.1 DER ECDSA signature.
    pub signature: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RequestError {
    #[error("cbor: {0}")]
    Cbor(String),
    #[error("missing parameter {0}")]
    MissingParameter(&'static str),
    #[error("invalid parameter {0}")]
    InvalidParameter(&'static str),
    #[error("option {0} is not a boolean")]
    InvalidOption(&'static str),
}

impl From<RequestError> for AuthenticatorError {
    fn from(e: RequestError) -> Self {
        tracing::debug!(error = %e, "Rejecting malformed request");
        Self::Unknown
    }
}

impl MakeCredentialParams {
    /// Decode an authenticatorMakeCredential request body.
    pub fn from_cbor(data: &[u8]) -> Result<Self, AuthenticatorError> {
        Ok(decode_make_credential(data)?)
    }
}

impl GetAssertionParams {
    /// Decode an authenticatorGetAssertion request body.
    pub fn from_cbor(data: &[u8]) -> Result<Self, AuthenticatorError> {
        Ok(decode_get_assertion(data)?)
    }
}

// CBOR parsing helpers

pub(crate) fn parse_cbor(data: &[u8]) -> Result<Vec<(Value, Value)>, RequestError> {
    let value: Value = ciborium::from_reader(data).map_err(|e| RequestError::Cbor(e.to_string()))?;
    match value {
        Value::Map(map) => Ok(map),
        _ => Err(RequestError::Cbor("expected map".into())),
    }
}

pub(crate) fn cbor_get(map: &[(Value, Value)], key: i64) -> Option<&Value> {
    let target = Value::Integer(key.into());
    map.iter().find(|(k, _)| k == &target).map(|(_, v)| v)
}

pub(crate) fn cbor_get_str<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

pub(crate) fn cbor_bytes(v: &Value) -> Option<&[u8]> {
    match v {
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}

pub(crate) fn cbor_text(v: &Value) -> Option<&str> {
    match v {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

pub(crate) fn cbor_map(v: &Value) -> Option<&[(Value, Value)]> {
    match v {
        Value::Map(m) => Some(m),
        _ => None,
    }
}

pub(crate) fn cbor_array(v: &Value) -> Option<&[Value]> {
    match v {
        Value::Array(a) => Some(a),
        _ => None,
    }
}

fn cbor_int(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => i64::try_from(*i).ok(),
        _ => None,
    }
}

fn required_bytes(
    map: &[(Value, Value)],
    key: i64,
    name: &'static str,
) -> Result<Vec<u8>, RequestError> {
    cbor_get(map, key)
        .and_then(cbor_bytes)
        .map(<[u8]>::to_vec)
        .ok_or(RequestError::MissingParameter(name))
}

fn optional_text(map: &[(Value, Value)], key: &str) -> Option<String> {
    cbor_get_str(map, key).and_then(cbor_text).map(str::to_string)
}

/// A present option must be a CBOR boolean.
fn option_flag(
    options: Option<&[(Value, Value)]>,
    key: &'static str,
) -> Result<Option<bool>, RequestError> {
    match options.and_then(|m| cbor_get_str(m, key)) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(RequestError::InvalidOption(key)),
    }
}

fn descriptor_list(value: Option<&Value>) -> Vec<CredentialDescriptor> {
    value.and_then(cbor_array).map_or(vec![], |arr| {
        arr.iter()
            .filter_map(|item| {
                let m = cbor_map(item)?;
                let id = cbor_get_str(m, "id").and_then(cbor_bytes)?;
                let cred_type = optional_text(m, "type")
                    .unwrap_or_else(|| crate::store::item::KEY_TYPE_PUBLIC_KEY.to_string());
                Some(CredentialDescriptor { cred_type, id: id.to_vec() })
            })
            .collect()
    })
}

fn options_map(
    map: &[(Value, Value)],
    key: i64,
) -> Result<Option<&[(Value, Value)]>, RequestError> {
    match cbor_get(map, key) {
        None => Ok(None),
        Some(v) => cbor_map(v)
            .map(Some)
            .ok_or(RequestError::InvalidParameter("options")),
    }
}

pub(crate) fn decode_make_credential(data: &[u8]) -> Result<MakeCredentialParams, RequestError> {
    let map = parse_cbor(data)?;

    // 1: clientDataHash
    let client_data_hash = required_bytes(&map, 1, "clientDataHash")?;

    // 2: rp
    let rp_map = cbor_get(&map, 2)
        .and_then(cbor_map)
        .ok_or(RequestError::MissingParameter("rp"))?;
    let rp = RpEntity {
        id: cbor_get_str(rp_map, "id")
            .and_then(cbor_text)
            .ok_or(RequestError::MissingParameter("rp.id"))?
            .to_string(),
        name: optional_text(rp_map, "name"),
    };

    // 3: user
    let user_map = cbor_get(&map, 3)
        .and_then(cbor_map)
        .ok_or(RequestError::MissingParameter("user"))?;
    let user_id = cbor_get_str(user_map, "id")
        .and_then(cbor_bytes)
        .ok_or(RequestError::MissingParameter("user.id"))?;
    if user_id.is_empty() || user_id.len() > MAX_USER_HANDLE_LEN {
        return Err(RequestError::InvalidParameter("user.id"));
    }
    let user = UserEntity {
        id: user_id.to_vec(),
        name: optional_text(user_map, "name"),
        display_name: optional_text(user_map, "displayName"),
    };

    // 4: pubKeyCredParams
    let cred_types_and_pub_key_algs = cbor_get(&map, 4)
        .and_then(cbor_array)
        .ok_or(RequestError::MissingParameter("pubKeyCredParams"))?
        .iter()
        .filter_map(|item| {
            let m = cbor_map(item)?;
            let alg = cbor_get_str(m, "alg").and_then(cbor_int)?;
            let cred_type = optional_text(m, "type")
                .unwrap_or_else(|| crate::store::item::KEY_TYPE_PUBLIC_KEY.to_string());
            Some(PubKeyCredParam { cred_type, alg })
        })
        .collect();

    // 5: excludeList
    let exclude_credential_descriptor_list = descriptor_list(cbor_get(&map, 5));

    // 7: options
    let options = options_map(&map, 7)?;
    let require_resident_key = option_flag(options, "rk")?;
    let require_user_verification = option_flag(options, "uv")?;

    Ok(MakeCredentialParams {
        client_data_hash,
        rp,
        user,
        cred_types_and_pub_key_algs,
        exclude_credential_descriptor_list,
        require_resident_key,
        require_user_verification,
    })
}

pub(crate) fn decode_get_assertion(data: &[u8]) -> Result<GetAssertionParams, RequestError> {
    let map = parse_cbor(data)?;

    // 1: rpId
    let rp_id = cbor_get(&map, 1)
        .and_then(cbor_text)
        .ok_or(RequestError::MissingParameter("rpId"))?
        .to_string();

    // 2: clientDataHash
    let client_data_hash = required_bytes(&map, 2, "clientDataHash")?;

    // 3: allowList
    let allow_credential_descriptor_list = descriptor_list(cbor_get(&map, 3));

    // 5: options
    let options = options_map(&map, 5)?;
    let require_user_verification = option_flag(options, "uv")?;

    Ok(GetAssertionParams {
        rp_id,
        client_data_hash,
        allow_credential_descriptor_list,
        require_user_verification,
    })
}
