//! OCI API request signing (HTTP Signatures, version 1)
//!
//! Every Core Services call carries an `Authorization: Signature ...` header
//! computed over a fixed set of request headers with the user's RSA API key.
//! Requests with a body sign the body digest too:
//!
//! ```text
//! date: Thu, 05 Jan 2014 21:31:40 GMT
//! (request-target): post /20160918/networkSecurityGroups/{id}/actions/updateSecurityRules
//! host: iaas.us-ashburn-1.oraclecloud.com
//! x-content-sha256: <base64 sha256 of body>
//! content-type: application/json
//! content-length: 316
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};

use crate::config::OciProfile;
use crate::error::OciError;

/// Headers covered by the signature of a request with a body, in signing order
pub const SIGNED_HEADERS: &str = "date (request-target) host x-content-sha256 content-type content-length";

pub const CONTENT_TYPE: &str = "application/json";

/// Header values to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub date: String,
    pub x_content_sha256: String,
    pub authorization: String,
}

/// Signs requests on behalf of one API key
pub struct RequestSigner {
    key_id: String,
    key: SigningKey<Sha256>,
}

impl RequestSigner {
    /// Load the profile's PEM key from disk
    pub fn from_profile(profile: &OciProfile) -> Result<Self, OciError> {
        let pem = std::fs::read_to_string(&profile.key_file).map_err(|e| OciError::Key {
            path: profile.key_file.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_pem(profile.key_id(), &pem).map_err(|message| OciError::Key {
            path: profile.key_file.display().to_string(),
            message,
        })
    }

    /// Build a signer from a PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`) PEM document
    pub fn from_pem(key_id: impl Into<String>, pem: &str) -> Result<Self, String> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| format!("not an unencrypted RSA private key: {}", e))?;

        Ok(Self {
            key_id: key_id.into(),
            key: SigningKey::<Sha256>::new(key),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign a request with a JSON body, using the current time
    pub fn sign(&self, method: &str, url: &Url, body: &[u8]) -> Result<SignedHeaders, OciError> {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        self.sign_at(method, url, body, date)
    }

    /// Sign a request with an explicit `date` header value
    pub fn sign_at(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        date: String,
    ) -> Result<SignedHeaders, OciError> {
        let x_content_sha256 = STANDARD.encode(Sha256::digest(body));
        let signing_string = signing_string(method, url, body.len(), &date, &x_content_sha256)?;

        let signature = self
            .key
            .try_sign(signing_string.as_bytes())
            .map_err(|e| OciError::Signing {
                message: e.to_string(),
            })?;

        let authorization = format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            SIGNED_HEADERS,
            STANDARD.encode(signature.to_bytes())
        );

        Ok(SignedHeaders {
            date,
            x_content_sha256,
            authorization,
        })
    }
}

/// The text the signature is computed over
pub fn signing_string(
    method: &str,
    url: &Url,
    content_length: usize,
    date: &str,
    x_content_sha256: &str,
) -> Result<String, OciError> {
    let host = url.host_str().ok_or_else(|| OciError::Signing {
        message: format!("URL has no host: {}", url),
    })?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    Ok([
        format!("date: {}", date),
        format!("(request-target): {} {}", method.to_lowercase(), target),
        format!("host: {}", host),
        format!("x-content-sha256: {}", x_content_sha256),
        format!("content-type: {}", CONTENT_TYPE),
        format!("content-length: {}", content_length),
    ]
    .join("\n"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use rsa::RsaPublicKey;

    pub(crate) const TEST_KEY_PKCS8: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/oci_api_key.pem"));
    const TEST_KEY_PKCS1: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/oci_api_key_pkcs1.pem"
    ));

    const DATE: &str = "Thu, 05 Jan 2014 21:31:40 GMT";

    fn url() -> Url {
        Url::parse("https://iaas.us-ashburn-1.oraclecloud.com/20160918/networkSecurityGroups/ocid1.nsg/actions/updateSecurityRules").unwrap()
    }

    fn signature_param(authorization: &str) -> &str {
        authorization
            .split("signature=\"")
            .nth(1)
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap()
    }

    #[test]
    fn test_signing_string_layout() {
        let s = signing_string("POST", &url(), 42, DATE, "digest==").unwrap();
        assert_eq!(
            s,
            "date: Thu, 05 Jan 2014 21:31:40 GMT\n\
             (request-target): post /20160918/networkSecurityGroups/ocid1.nsg/actions/updateSecurityRules\n\
             host: iaas.us-ashburn-1.oraclecloud.com\n\
             x-content-sha256: digest==\n\
             content-type: application/json\n\
             content-length: 42"
        );
    }

    #[test]
    fn test_signing_string_keeps_port_and_query() {
        let url = Url::parse("http://127.0.0.1:8080/path?limit=1").unwrap();
        let s = signing_string("POST", &url, 0, DATE, "x").unwrap();
        assert!(s.contains("(request-target): post /path?limit=1\n"));
        assert!(s.contains("host: 127.0.0.1:8080\n"));
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let signer = RequestSigner::from_pem("tenancy/user/fp", TEST_KEY_PKCS8).unwrap();
        let body = br#"{"securityRules":[]}"#;
        let headers = signer.sign_at("POST", &url(), body, DATE.to_string()).unwrap();

        assert_eq!(headers.date, DATE);
        assert_eq!(headers.x_content_sha256, STANDARD.encode(Sha256::digest(body)));
        assert!(headers.authorization.starts_with(
            "Signature version=\"1\",keyId=\"tenancy/user/fp\",algorithm=\"rsa-sha256\",headers=\"date (request-target) host x-content-sha256 content-type content-length\""
        ));

        let private = RsaPrivateKey::from_pkcs8_pem(TEST_KEY_PKCS8).unwrap();
        let verifier = VerifyingKey::<Sha256>::new(RsaPublicKey::from(&private));
        let raw = STANDARD
            .decode(signature_param(&headers.authorization))
            .unwrap();
        let signature = Signature::try_from(raw.as_slice()).unwrap();

        let expected =
            signing_string("POST", &url(), body.len(), DATE, &headers.x_content_sha256).unwrap();
        verifier.verify(expected.as_bytes(), &signature).unwrap();
    }

    #[test]
    fn test_pkcs1_and_pkcs8_keys_sign_identically() {
        let a = RequestSigner::from_pem("id", TEST_KEY_PKCS8).unwrap();
        let b = RequestSigner::from_pem("id", TEST_KEY_PKCS1).unwrap();
        let body = b"{}";

        let sig_a = a.sign_at("POST", &url(), body, DATE.to_string()).unwrap();
        let sig_b = b.sign_at("POST", &url(), body, DATE.to_string()).unwrap();
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn test_rejects_non_key_pem() {
        let err = RequestSigner::from_pem("id", "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n")
            .err()
            .unwrap();
        assert!(err.contains("RSA private key"));
    }
}
