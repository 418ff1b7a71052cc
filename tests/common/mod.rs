#![allow(dead_code)]

use std::sync::Once;

use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::{EncodingKey, Header};

#[derive(serde::Serialize)]
struct Claims<'a> {
    sub: &'a str,
    exp: i64,
}

pub fn mint_token(sub: &str, ttl: SignedDuration) -> String {
    let exp = (Timestamp::now() + ttl).as_second();
    jsonwebtoken::encode(
        &Header::default(),
        &Claims { sub, exp },
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .expect("mint token")
}

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}
