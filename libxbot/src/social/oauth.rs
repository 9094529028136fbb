//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! User-context X API endpoints (likes, retweets, creating posts) require a
//! signed `Authorization` header. JSON request bodies are not part of the
//! signature base string; query parameters are.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::ExposeSecret;
use sha1::Sha1;

use super::SocialResult;
use crate::credentials::XCredentials;
use crate::error::SocialError;

/// RFC 3986 unreserved characters stay as-is; everything else is encoded
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Per-request values that must be unique (nonce) or current (timestamp)
#[derive(Debug, Clone)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl Nonce {
    pub fn generate() -> Self {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Keys used for one signature
pub struct SigningKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

impl<'a> SigningKeys<'a> {
    pub fn from_credentials(credentials: &'a XCredentials) -> Self {
        Self {
            consumer_key: credentials.consumer_key.expose_secret(),
            consumer_secret: credentials.consumer_secret.expose_secret(),
            token: credentials.access_token.expose_secret(),
            token_secret: credentials.access_token_secret.expose_secret(),
        }
    }
}

/// Compute the `oauth_signature` value
///
/// `url` must not contain a query string; pass query and form parameters in
/// `params` instead.
pub fn signature(
    keys: &SigningKeys<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &Nonce,
) -> SocialResult<String> {
    let timestamp = nonce.timestamp.to_string();
    let mut all: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    for (k, v) in oauth_params(keys, nonce, &timestamp) {
        all.push((encode(k), encode(v)));
    }
    all.sort();

    let param_string = all
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        encode(keys.consumer_secret),
        encode(keys.token_secret)
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .map_err(|e| SocialError::Api(format!("Failed to sign request: {}", e)))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the full `Authorization: OAuth ...` header value
pub fn authorization_header(
    keys: &SigningKeys<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &Nonce,
) -> SocialResult<String> {
    let sig = signature(keys, method, url, params, nonce)?;
    let timestamp = nonce.timestamp.to_string();

    let mut fields: Vec<(&str, &str)> = oauth_params(keys, nonce, &timestamp);
    fields.push(("oauth_signature", sig.as_str()));
    fields.sort();

    let rendered = fields
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", rendered))
}

fn oauth_params<'a>(
    keys: &SigningKeys<'a>,
    nonce: &'a Nonce,
    timestamp: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("oauth_consumer_key", keys.consumer_key),
        ("oauth_nonce", nonce.nonce.as_str()),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", keys.token),
        ("oauth_version", "1.0"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from the X developer documentation
    // ("Creating a signature").
    fn documented_keys() -> SigningKeys<'static> {
        SigningKeys {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog",
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        }
    }

    fn documented_nonce() -> Nonce {
        Nonce {
            nonce: "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".to_string(),
            timestamp: 1318622958,
        }
    }

    #[test]
    fn test_signature_matches_documented_example() {
        let sig = signature(
            &documented_keys(),
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &[
                ("include_entities", "true"),
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ],
            &documented_nonce(),
        )
        .unwrap();

        assert_eq!(sig, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("!"), "%21");
    }

    #[test]
    fn test_header_contains_all_oauth_fields() {
        let header = authorization_header(
            &documented_keys(),
            "GET",
            "https://api.twitter.com/2/users/me",
            &[],
            &documented_nonce(),
        )
        .unwrap();

        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\"",
            "oauth_nonce=",
            "oauth_signature=",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1318622958\"",
            "oauth_token=",
            "oauth_version=\"1.0\"",
        ] {
            assert!(header.contains(field), "missing {} in {}", field, header);
        }
    }

    #[test]
    fn test_generated_nonces_differ() {
        let a = Nonce::generate();
        let b = Nonce::generate();
        assert_eq!(a.nonce.len(), 32);
        assert_ne!(a.nonce, b.nonce);
    }
}
