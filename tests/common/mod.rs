//! Common test utilities for waypost

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use waypost::{Config, GatewayRequest, GatewayResponse, Pipeline};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// HMAC secret of the key `k1` served by [`mount_jwks`]
pub const SIGNING_SECRET: &[u8] = b"waypost-test-signing-secret-01234";
/// Path the JWKS document is served at
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err and return the error
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(_) => panic!("Expected Err, got Ok"),
            Err(e) => e,
        }
    };
}

/// Symmetric JWK for `secret`
pub fn jwk(kid: &str, secret: &[u8]) -> Value {
    json!({
        "kty": "oct",
        "kid": kid,
        "alg": "HS256",
        "k": URL_SAFE_NO_PAD.encode(secret),
    })
}

/// Serve a one-key JWKS document, expecting `fetches` downloads
pub async fn mount_jwks(server: &MockServer, fetches: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "keys": [jwk("k1", SIGNING_SECRET)] })),
        )
        .expect(fetches)
        .mount(server)
        .await;
}

/// Token for `sub`, valid for five minutes, signed with key `k1`
pub fn token_for(sub: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 300;
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("k1".to_string());
    encode(
        &header,
        &json!({ "sub": sub, "exp": exp }),
        &EncodingKey::from_secret(SIGNING_SECRET),
    )
    .unwrap()
}

/// Parse, validate and compile a YAML configuration
pub async fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    let config = Config::from_yaml_str(yaml).unwrap();
    Pipeline::new(&config).await.unwrap()
}

pub fn get(path_and_query: &str) -> GatewayRequest {
    GatewayRequest::new(reqwest::Method::GET, path_and_query)
}

pub fn header<'a>(response: &'a GatewayResponse, name: &str) -> Option<&'a str> {
    response.headers.get(name).and_then(|v| v.to_str().ok())
}
