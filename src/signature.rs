use hmac::{Hmac, Mac};
use md5::Md5;
use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::portal_b64;
use crate::xencode;

// Fixed SRun protocol literals. The server checks them byte-for-byte.
pub const PORTAL_N: &str = "200";
pub const PORTAL_TYPE: &str = "1";
const ENC_VER: &str = "srun_bx1";
const INFO_PREFIX: &str = "{SRBX1}";
const PASSWORD_PREFIX: &str = "{MD5}";

type HmacMd5 = Hmac<Md5>;

/// Payload of the `info` field before obfuscation. Field order is part of
/// the wire contract; serde preserves declaration order in the compact JSON.
#[derive(Serialize)]
struct LoginInfo<'a> {
    username: &'a str,
    password: &'a str,
    ip: &'a str,
    acid: &'a str,
    enc_ver: &'a str,
}

/// Full query-parameter set for `action=login`, minus the per-request
/// callback and timestamp (those are not part of the signed payload).
#[derive(Debug, Serialize)]
pub struct LoginParams {
    pub action: &'static str,
    pub username: String,
    pub password: String,
    pub ac_id: String,
    pub ip: String,
    pub chksum: String,
    pub info: String,
    pub n: &'static str,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub os: &'static str,
    pub name: &'static str,
    pub double_stack: &'static str,
}

/// HMAC-MD5 is what the portal firmware expects for the password digest.
/// MD5 is broken as a cryptographic hash, but the algorithm is mandated by
/// the server and substituting a stronger digest breaks authentication.
fn hmac_md5_hex(key: &str, message: &str) -> String {
    let mut mac =
        HmacMd5::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Derives the signed login parameters from the credentials and the
/// challenge token. Pure: identical inputs produce byte-identical output.
pub fn build_login_params(
    username: &str,
    password: &str,
    ac_id: &str,
    ip: &str,
    token: &str,
) -> Result<LoginParams, serde_json::Error> {
    let info_json = serde_json::to_string(&LoginInfo {
        username,
        password,
        ip,
        acid: ac_id,
        enc_ver: ENC_VER,
    })?;
    let info = format!(
        "{}{}",
        INFO_PREFIX,
        portal_b64::encode(&xencode::xencode(info_json.as_bytes(), token.as_bytes()))
    );

    let hmd5 = hmac_md5_hex(token, password);

    // The token is interleaved before every field, in this exact order.
    let mut chkstr = String::new();
    for field in [username, &hmd5, ac_id, ip, PORTAL_N, PORTAL_TYPE, &info] {
        chkstr.push_str(token);
        chkstr.push_str(field);
    }
    let chksum = hex::encode(Sha1::digest(chkstr.as_bytes()));

    Ok(LoginParams {
        action: "login",
        username: username.to_string(),
        password: format!("{}{}", PASSWORD_PREFIX, hmd5),
        ac_id: ac_id.to_string(),
        ip: ip.to_string(),
        chksum,
        info,
        n: PORTAL_N,
        type_: PORTAL_TYPE,
        os: "Linux",
        name: "Linux",
        double_stack: "0",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "abcd1234";

    fn golden_params() -> LoginParams {
        build_login_params("alice", "secret", "2", "10.0.0.1", TOKEN).unwrap()
    }

    #[test]
    fn golden_info_blob() {
        // Pinned against the reference implementation.
        assert_eq!(
            golden_params().info,
            "{SRBX1}sIaMWRJf+aT54jfGZ3gFDaTcc4yE1ZNBmksUKA5GcMFbH/stjTZeKopwsnVeLyw6\
             O2uzfRMrkvIeraG+MSspJ5Jj5SQV6qLymkbLJGnr3+ndO3DEhwgO0EJAj22="
        );
    }

    #[test]
    fn golden_checksum() {
        assert_eq!(golden_params().chksum, "cf4089661e9b5045542e961864d8813ec70a9ea6");
    }

    #[test]
    fn password_field_is_prefixed_digest_not_plaintext() {
        let params = golden_params();
        assert_eq!(params.password, "{MD5}a4a05c014fe3863950c74ab37b08a73e");
        assert!(!params.password.contains("secret"));
    }

    #[test]
    fn output_is_deterministic() {
        let a = golden_params();
        let b = golden_params();
        assert_eq!(a.info, b.info);
        assert_eq!(a.chksum, b.chksum);
        assert_eq!(a.password, b.password);
    }

    #[test]
    fn fixed_protocol_constants_are_emitted() {
        let params = golden_params();
        assert_eq!(params.action, "login");
        assert_eq!(params.n, "200");
        assert_eq!(params.type_, "1");
        assert_eq!(params.os, "Linux");
        assert_eq!(params.name, "Linux");
        assert_eq!(params.double_stack, "0");
    }

    #[test]
    fn info_blob_json_is_compact_and_ordered() {
        let json = serde_json::to_string(&LoginInfo {
            username: "alice",
            password: "secret",
            ip: "10.0.0.1",
            acid: "2",
            enc_ver: ENC_VER,
        })
        .unwrap();
        assert_eq!(
            json,
            "{\"username\":\"alice\",\"password\":\"secret\",\
             \"ip\":\"10.0.0.1\",\"acid\":\"2\",\"enc_ver\":\"srun_bx1\"}"
        );
    }

    #[test]
    fn checksum_depends_on_token() {
        let a = build_login_params("alice", "secret", "2", "10.0.0.1", "token-a").unwrap();
        let b = build_login_params("alice", "secret", "2", "10.0.0.1", "token-b").unwrap();
        assert_ne!(a.chksum, b.chksum);
        assert_ne!(a.info, b.info);
    }
}
