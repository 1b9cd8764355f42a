use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;

/// A signed access policy restricting which operations a client may perform
/// against the remote API.
///
/// The pair is usually issued by the application backend holding the app
/// secret and handed to clients as-is. Server-side Rust code can mint one
/// locally with [`Policy::sign`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Security {
    pub policy: String,
    pub signature: String,
}

/// Operations a [`Policy`] may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyCall {
    Pick,
    Read,
    Stat,
    Write,
    WriteUrl,
    Store,
    Convert,
    Remove,
    Exif,
}

/// An unsigned access policy.
///
/// `expiry` is mandatory (unix seconds); everything else narrows the grant
/// and may be omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Policy {
    pub expiry: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub call: Vec<PolicyCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "maxSize", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(rename = "minSize", skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl Policy {
    pub fn new(expiry: u64) -> Self {
        Self {
            expiry,
            ..Default::default()
        }
    }

    pub fn allow(mut self, call: PolicyCall) -> Self {
        self.call.push(call);
        self
    }

    pub fn handle<S: Into<String>>(mut self, handle: S) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn url<S: Into<String>>(mut self, pattern: S) -> Self {
        self.url = Some(pattern.into());
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn container<S: Into<String>>(mut self, container: S) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Sign the policy with the application secret.
    ///
    /// The policy JSON is base64url-encoded and signed with HMAC-SHA256;
    /// the signature is lowercase hex.
    pub fn sign(&self, secret: &str) -> Result<Security> {
        let json = serde_json::to_string(self)?;
        let policy = URL_SAFE_NO_PAD.encode(json.as_bytes());
        let mac = hmac_sha256(secret.as_bytes(), policy.as_bytes());
        Ok(Security {
            policy,
            signature: to_hex(&mac),
        })
    }
}

// HMAC-SHA256, RFC 2104 construction.
fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK_SIZE: usize = 64;

    let mut block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let digest = Sha256::digest(key);
        block[..digest.len()].copy_from_slice(&digest);
    } else {
        block[..key.len()].copy_from_slice(key);
    }

    let mut ipad = [0x36u8; BLOCK_SIZE];
    let mut opad = [0x5cu8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        ipad[i] ^= block[i];
        opad[i] ^= block[i];
    }

    let mut inner = Sha256::new();
    inner.update(ipad);
    inner.update(message);
    let inner = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(opad);
    outer.update(inner);
    outer.finalize().into()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_rfc4231_case_2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            to_hex(&mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn policy_encodes_to_its_own_json() {
        let policy = Policy::new(1_700_000_000)
            .allow(PolicyCall::Read)
            .allow(PolicyCall::Remove)
            .handle("h9aT3nXwQ");
        let security = policy.sign("top-secret").unwrap();

        let decoded = URL_SAFE_NO_PAD
            .decode(security.policy.as_bytes())
            .unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            r#"{"expiry":1700000000,"call":["read","remove"],"handle":"h9aT3nXwQ"}"#
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let policy = Policy::new(1_700_000_000).allow(PolicyCall::Pick);
        let a = policy.sign("secret").unwrap();
        let b = policy.sign("secret").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.signature.len(), 64);
        assert!(a
            .signature
            .chars()
            .all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_secrets_differ() {
        let policy = Policy::new(1_700_000_000);
        let a = policy.sign("one").unwrap();
        let b = policy.sign("two").unwrap();
        assert_eq!(a.policy, b.policy);
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_string(&Policy::new(42)).unwrap();
        assert_eq!(json, r#"{"expiry":42}"#);
    }

    #[test]
    fn write_url_call_uses_camel_case() {
        let json =
            serde_json::to_string(&Policy::new(1).allow(PolicyCall::WriteUrl))
                .unwrap();
        assert!(json.contains("writeUrl"));
    }
}
