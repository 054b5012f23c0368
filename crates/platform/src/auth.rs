//! Webhook request authentication.
//!
//! Checks run in a fixed order and the first failure wins: the source address
//! allowlist, then the configured signature scheme.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use hookrelay_core::config::{SignatureScheme, WebhookConfig};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-webhook-sign";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

type HmacSha256 = Hmac<Sha256>;

/// State of the `X-Forwarded-For` header on an inbound request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForwardedFor<'a> {
    #[default]
    Absent,
    Header(&'a str),
    /// Present but not visible ASCII; never falls back to the peer address.
    Unreadable,
}

impl<'a> From<Option<&'a str>> for ForwardedFor<'a> {
    fn from(header: Option<&'a str>) -> Self {
        header.map_or(Self::Absent, Self::Header)
    }
}

/// The parts of an inbound webhook that authentication looks at.
#[derive(Clone, Copy, Debug)]
pub struct WebhookRequest<'a> {
    pub forwarded_for: ForwardedFor<'a>,
    pub peer_address: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub payload: &'a Value,
}

impl WebhookRequest<'_> {
    /// First `X-Forwarded-For` entry, falling back to the peer address.
    pub fn source_address(&self) -> Option<String> {
        let header = match self.forwarded_for {
            ForwardedFor::Absent => None,
            ForwardedFor::Header(header) => Some(header),
            ForwardedFor::Unreadable => return None,
        };
        let forwarded = header
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|entry| !entry.is_empty());

        forwarded.or(self.peer_address).map(str::to_owned)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    SourceAddressUnknown,
    SourceAddressNotAllowed,
    SignatureMissing,
    SignatureMalformed,
    SignatureMismatch,
    ChannelUuidMissing,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceAddressUnknown => "source_address_unknown",
            Self::SourceAddressNotAllowed => "source_address_not_allowed",
            Self::SignatureMissing => "signature_missing",
            Self::SignatureMalformed => "signature_malformed",
            Self::SignatureMismatch => "signature_mismatch",
            Self::ChannelUuidMissing => "channel_uuid_missing",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("forbidden: {0}")]
    Forbidden(RejectReason),
    #[error("bad request: {0}")]
    BadRequest(RejectReason),
}

impl AuthRejection {
    pub fn reason(&self) -> RejectReason {
        match self {
            Self::Forbidden(reason) | Self::BadRequest(reason) => *reason,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::BadRequest(_) => 400,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorized {
    pub source_address: Option<String>,
}

pub trait SignatureVerifier: Send + Sync {
    fn scheme(&self) -> SignatureScheme;
    fn verify(&self, signature: Option<&str>, payload: &Value) -> Result<(), AuthRejection>;
}

/// The header must carry the configured secret itself.
pub struct SharedSecretVerifier {
    secret: SecretString,
}

impl SharedSecretVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl SignatureVerifier for SharedSecretVerifier {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::SharedSecret
    }

    fn verify(&self, signature: Option<&str>, _payload: &Value) -> Result<(), AuthRejection> {
        let signature = signature.ok_or(AuthRejection::Forbidden(RejectReason::SignatureMissing))?;
        let matches: bool =
            signature.as_bytes().ct_eq(self.secret.expose_secret().as_bytes()).into();
        if matches {
            Ok(())
        } else {
            Err(AuthRejection::Forbidden(RejectReason::SignatureMismatch))
        }
    }
}

/// The header must carry base64(HMAC-SHA256(secret, payload.channel.uuid)).
pub struct ChannelHmacVerifier {
    secret: SecretString,
}

impl ChannelHmacVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl SignatureVerifier for ChannelHmacVerifier {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::ChannelHmac
    }

    fn verify(&self, signature: Option<&str>, payload: &Value) -> Result<(), AuthRejection> {
        let signature = signature.ok_or(AuthRejection::Forbidden(RejectReason::SignatureMissing))?;
        let channel_uuid = channel_uuid(payload)
            .ok_or(AuthRejection::BadRequest(RejectReason::ChannelUuidMissing))?;

        let provided = BASE64
            .decode(signature.trim())
            .map_err(|_| AuthRejection::Forbidden(RejectReason::SignatureMalformed))?;

        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthRejection::Forbidden(RejectReason::SignatureMismatch))?;
        mac.update(channel_uuid.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| AuthRejection::Forbidden(RejectReason::SignatureMismatch))
    }
}

pub fn channel_uuid(payload: &Value) -> Option<&str> {
    payload.get("channel")?.get("uuid")?.as_str()
}

/// Signature the `channel_hmac` scheme expects for `channel_uuid`.
pub fn sign_channel_uuid(secret: &str, channel_uuid: &str) -> String {
    match <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(channel_uuid.as_bytes());
            BASE64.encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IpAllowlist {
    allowed: Option<String>,
}

impl IpAllowlist {
    pub fn new(allowed: Option<String>) -> Self {
        Self { allowed }
    }

    pub fn is_enabled(&self) -> bool {
        self.allowed.is_some()
    }

    /// Exact, case-sensitive comparison against the single allowed address.
    pub fn check(&self, source_address: Option<&str>) -> Result<(), AuthRejection> {
        let Some(allowed) = self.allowed.as_deref() else {
            return Ok(());
        };
        let source = source_address
            .ok_or(AuthRejection::Forbidden(RejectReason::SourceAddressUnknown))?;
        if source == allowed {
            Ok(())
        } else {
            Err(AuthRejection::Forbidden(RejectReason::SourceAddressNotAllowed))
        }
    }
}

pub struct Authenticator {
    allowlist: IpAllowlist,
    verifier: Box<dyn SignatureVerifier>,
}

impl Authenticator {
    pub fn new(allowlist: IpAllowlist, verifier: Box<dyn SignatureVerifier>) -> Self {
        Self { allowlist, verifier }
    }

    pub fn from_config(config: &WebhookConfig) -> Self {
        let verifier: Box<dyn SignatureVerifier> = match config.signature_scheme {
            SignatureScheme::SharedSecret => {
                Box::new(SharedSecretVerifier::new(config.secret.clone()))
            }
            SignatureScheme::ChannelHmac => Box::new(ChannelHmacVerifier::new(config.secret.clone())),
        };
        Self::new(IpAllowlist::new(config.allowed_ip.clone()), verifier)
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.verifier.scheme()
    }

    pub fn allowlist_enabled(&self) -> bool {
        self.allowlist.is_enabled()
    }

    pub fn authenticate(&self, request: &WebhookRequest<'_>) -> Result<Authorized, AuthRejection> {
        let source_address = request.source_address();
        self.allowlist.check(source_address.as_deref())?;
        self.verifier.verify(request.signature, request.payload)?;
        Ok(Authorized { source_address })
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use hookrelay_core::config::{SignatureScheme, WebhookConfig};
    use serde_json::{json, Value};

    use super::{
        sign_channel_uuid, AuthRejection, Authenticator, ForwardedFor, RejectReason,
        WebhookRequest,
    };

    const SECRET: &str = "whsec-test";
    const ALLOWED_IP: &str = "203.0.113.10";

    fn authenticator(scheme: SignatureScheme, allowed_ip: Option<&str>) -> Authenticator {
        Authenticator::from_config(&WebhookConfig {
            secret: SECRET.to_owned().into(),
            allowed_ip: allowed_ip.map(str::to_owned),
            signature_scheme: scheme,
        })
    }

    fn channel_payload(uuid: &str) -> Value {
        json!({"channel": {"uuid": uuid}, "content": "hi"})
    }

    fn request<'a>(
        forwarded_for: Option<&'a str>,
        signature: Option<&'a str>,
        payload: &'a Value,
    ) -> WebhookRequest<'a> {
        WebhookRequest {
            forwarded_for: forwarded_for.into(),
            peer_address: Some("127.0.0.1"),
            signature,
            payload,
        }
    }

    #[test]
    fn valid_hmac_signature_is_accepted() {
        let auth = authenticator(SignatureScheme::ChannelHmac, Some(ALLOWED_IP));
        let payload = channel_payload("chan-1");
        let signature = sign_channel_uuid(SECRET, "chan-1");

        let authorized = auth
            .authenticate(&request(Some(ALLOWED_IP), Some(&signature), &payload))
            .expect("authorized");
        assert_eq!(authorized.source_address.as_deref(), Some(ALLOWED_IP));
    }

    #[test]
    fn ip_mismatch_rejects_even_with_valid_signature() {
        let auth = authenticator(SignatureScheme::ChannelHmac, Some(ALLOWED_IP));
        let payload = channel_payload("chan-1");
        let signature = sign_channel_uuid(SECRET, "chan-1");

        for forwarded in ["198.51.100.1", "198.51.100.1, 203.0.113.10", " 203.0.113.11 "] {
            let result = auth.authenticate(&request(Some(forwarded), Some(&signature), &payload));
            assert_eq!(
                result,
                Err(AuthRejection::Forbidden(RejectReason::SourceAddressNotAllowed)),
                "forwarded-for `{forwarded}` must be rejected"
            );
        }
    }

    #[test]
    fn only_first_forwarded_entry_is_considered() {
        let auth = authenticator(SignatureScheme::SharedSecret, Some(ALLOWED_IP));
        let payload = json!({});

        let result =
            auth.authenticate(&request(Some("203.0.113.10, 10.0.0.1"), Some(SECRET), &payload));
        assert!(result.is_ok());
    }

    #[test]
    fn peer_address_is_used_without_forwarded_header() {
        let auth = authenticator(SignatureScheme::SharedSecret, Some("127.0.0.1"));
        let payload = json!({});

        assert!(auth.authenticate(&request(None, Some(SECRET), &payload)).is_ok());
    }

    #[test]
    fn missing_source_address_is_rejected_when_allowlist_is_enabled() {
        let auth = authenticator(SignatureScheme::SharedSecret, Some(ALLOWED_IP));
        let payload = json!({});
        let request = WebhookRequest {
            forwarded_for: ForwardedFor::Absent,
            peer_address: None,
            signature: Some(SECRET),
            payload: &payload,
        };

        assert_eq!(
            auth.authenticate(&request),
            Err(AuthRejection::Forbidden(RejectReason::SourceAddressUnknown))
        );
    }

    #[test]
    fn unreadable_forwarded_for_does_not_fall_back_to_peer_address() {
        let payload = json!({});
        let request = WebhookRequest {
            forwarded_for: ForwardedFor::Unreadable,
            peer_address: Some(ALLOWED_IP),
            signature: Some(SECRET),
            payload: &payload,
        };

        assert_eq!(request.source_address(), None);
        assert_eq!(
            authenticator(SignatureScheme::SharedSecret, Some(ALLOWED_IP)).authenticate(&request),
            Err(AuthRejection::Forbidden(RejectReason::SourceAddressUnknown))
        );
        assert!(authenticator(SignatureScheme::SharedSecret, None).authenticate(&request).is_ok());
    }

    #[test]
    fn disabled_allowlist_skips_address_check() {
        let auth = authenticator(SignatureScheme::SharedSecret, None);
        let payload = json!({});

        assert!(!auth.allowlist_enabled());
        assert!(auth.authenticate(&request(Some("198.51.100.1"), Some(SECRET), &payload)).is_ok());
    }

    #[test]
    fn one_bit_mutation_of_hmac_signature_is_rejected() {
        let auth = authenticator(SignatureScheme::ChannelHmac, None);
        let payload = channel_payload("chan-7");
        let signature = sign_channel_uuid(SECRET, "chan-7");

        let mut bytes = BASE64.decode(&signature).expect("valid base64");
        for index in [0, bytes.len() / 2, bytes.len() - 1] {
            bytes[index] ^= 0x01;
            let mutated = BASE64.encode(&bytes);
            assert_eq!(
                auth.authenticate(&request(None, Some(&mutated), &payload)),
                Err(AuthRejection::Forbidden(RejectReason::SignatureMismatch))
            );
            bytes[index] ^= 0x01;
        }
    }

    #[test]
    fn hmac_signature_for_other_channel_is_rejected() {
        let auth = authenticator(SignatureScheme::ChannelHmac, None);
        let payload = channel_payload("chan-a");
        let signature = sign_channel_uuid(SECRET, "chan-b");

        assert!(auth.authenticate(&request(None, Some(&signature), &payload)).is_err());
    }

    #[test]
    fn hmac_scheme_reports_missing_header_and_missing_uuid_distinctly() {
        let auth = authenticator(SignatureScheme::ChannelHmac, None);

        let payload = channel_payload("chan-1");
        assert_eq!(
            auth.authenticate(&request(None, None, &payload)),
            Err(AuthRejection::Forbidden(RejectReason::SignatureMissing))
        );

        let without_uuid = json!({"channel": {}});
        let signature = sign_channel_uuid(SECRET, "chan-1");
        assert_eq!(
            auth.authenticate(&request(None, Some(&signature), &without_uuid)),
            Err(AuthRejection::BadRequest(RejectReason::ChannelUuidMissing))
        );
    }

    #[test]
    fn undecodable_signature_is_forbidden() {
        let auth = authenticator(SignatureScheme::ChannelHmac, None);
        let payload = channel_payload("chan-1");

        assert_eq!(
            auth.authenticate(&request(None, Some("%%not-base64%%"), &payload)),
            Err(AuthRejection::Forbidden(RejectReason::SignatureMalformed))
        );
    }

    #[test]
    fn shared_secret_scheme_compares_raw_header() {
        let auth = authenticator(SignatureScheme::SharedSecret, None);
        let payload = json!({});

        assert!(auth.authenticate(&request(None, Some(SECRET), &payload)).is_ok());
        assert_eq!(
            auth.authenticate(&request(None, Some("whsec-tesT"), &payload)),
            Err(AuthRejection::Forbidden(RejectReason::SignatureMismatch))
        );
        assert_eq!(
            auth.authenticate(&request(None, None, &payload)),
            Err(AuthRejection::Forbidden(RejectReason::SignatureMissing))
        );
        assert_eq!(auth.scheme(), SignatureScheme::SharedSecret);
    }

    #[test]
    fn signing_is_deterministic_base64() {
        let first = sign_channel_uuid(SECRET, "chan-1");
        assert_eq!(first, sign_channel_uuid(SECRET, "chan-1"));
        assert_eq!(BASE64.decode(&first).expect("base64").len(), 32);
        assert_ne!(first, sign_channel_uuid("other-secret", "chan-1"));
    }
}
