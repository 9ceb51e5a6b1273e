//! Connection strings and request signing for the remote table service.

use super::types::{TableError, TableResult};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_TABLE_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";

#[derive(Clone)]
pub enum Credentials {
    /// Account key, already base64-decoded.
    SharedKey(Vec<u8>),
    /// Shared access signature query string, without the leading `?`.
    Sas(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::SharedKey(_) => f.write_str("SharedKey(<redacted>)"),
            Credentials::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

/// Parsed form of a storage connection string such as
/// `DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=...;EndpointSuffix=core.windows.net`.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    pub account_name: String,
    /// Table service base URL, without a trailing slash.
    pub table_endpoint: String,
    pub credentials: Credentials,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> TableResult<Self> {
        let mut pairs: HashMap<String, String> = HashMap::new();
        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                TableError::InvalidConnectionString(format!("segment without '=': {}", segment))
            })?;
            pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if pairs
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self {
                account_name: DEV_ACCOUNT_NAME.to_string(),
                table_endpoint: DEV_TABLE_ENDPOINT.to_string(),
                credentials: Credentials::SharedKey(decode_key(DEV_ACCOUNT_KEY)?),
            });
        }

        let account_name = pairs
            .get("accountname")
            .filter(|name| !name.is_empty())
            .cloned()
            .ok_or_else(|| TableError::InvalidConnectionString("missing AccountName".into()))?;

        let table_endpoint = match pairs.get("tableendpoint") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let protocol = pairs
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = pairs
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                format!("{}://{}.table.{}", protocol, account_name, suffix)
            }
        };

        let credentials = if let Some(sas) = pairs.get("sharedaccesssignature") {
            Credentials::Sas(sas.trim_start_matches('?').to_string())
        } else if let Some(key) = pairs.get("accountkey") {
            Credentials::SharedKey(decode_key(key)?)
        } else {
            return Err(TableError::InvalidConnectionString(
                "neither AccountKey nor SharedAccessSignature given".into(),
            ));
        };

        Ok(Self {
            account_name,
            table_endpoint,
            credentials,
        })
    }
}

fn decode_key(key: &str) -> TableResult<Vec<u8>> {
    STANDARD.decode(key).map_err(|e| {
        TableError::InvalidConnectionString(format!("AccountKey is not base64: {}", e))
    })
}

/// `Authorization` header value for the SharedKeyLite scheme.
///
/// String-to-sign is the `x-ms-date` value and the canonicalized resource
/// (`/{account}{url path}`) separated by a newline.
pub fn shared_key_lite(
    account: &str,
    key: &[u8],
    date: &str,
    url_path: &str,
) -> TableResult<String> {
    let string_to_sign = format!("{}\n/{}{}", date, account, url_path);
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TableError::InvalidConnectionString(format!("unusable AccountKey: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("SharedKeyLite {}:{}", account, signature))
}

/// RFC 1123 date as required by `x-ms-date`.
pub fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
