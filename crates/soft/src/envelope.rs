//! Signature token format of the software provider.
//!
//! A token binds the signer thumbprint, the hash constant and a keyed MAC over
//! the digest. It is emitted as base64 wrapped at 64 columns with CR-LF, the
//! way hardware-backed providers format CMS output.

use anyhow::{Context, Result, bail};
use base64::Engine;
use sha2::{Digest as _, Sha256};

use crate::certificate::SoftCertificate;

const MAGIC: &[u8; 5] = b"SOFT1";
const WRAP: usize = 64;

/// Decoded signature token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub algorithm: u32,
    pub thumbprint: String,
    pub mac: [u8; 32],
}

pub(crate) fn mac(key: &SoftCertificate, algorithm: u32, digest: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(key.secret());
    h.update(algorithm.to_be_bytes());
    h.update(digest);
    h.finalize().into()
}

/// Sign `digest` and render the wrapped base64 token.
pub(crate) fn seal(key: &SoftCertificate, algorithm: u32, digest: &[u8]) -> Result<String> {
    let thumbprint = key.thumbprint().as_bytes();
    let thumb_len = u8::try_from(thumbprint.len()).context("Thumbprint too long")?;

    let mut raw = Vec::with_capacity(MAGIC.len() + 4 + 1 + thumbprint.len() + 32);
    raw.extend_from_slice(MAGIC);
    raw.extend_from_slice(&algorithm.to_be_bytes());
    raw.push(thumb_len);
    raw.extend_from_slice(thumbprint);
    raw.extend_from_slice(&mac(key, algorithm, digest));

    let b64 = base64::engine::general_purpose::STANDARD.encode(&raw);
    let lines: Vec<&str> = b64
        .as_bytes()
        .chunks(WRAP)
        .map(|line| std::str::from_utf8(line).unwrap_or_default())
        .collect();
    Ok(lines.join("\r\n") + "\r\n")
}

/// Parse a token, tolerating any whitespace in the base64 text.
pub(crate) fn open(signature: &str) -> Result<Token> {
    let cleaned: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    let raw = base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .context("Signature is not valid base64")?;

    let Some(rest) = raw.strip_prefix(MAGIC.as_slice()) else {
        bail!("Unrecognized signature format");
    };
    if rest.len() < 5 {
        bail!("Truncated signature");
    }
    let algorithm = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
    let thumb_len = rest[4] as usize;
    let rest = &rest[5..];
    if rest.len() != thumb_len + 32 {
        bail!("Signature length mismatch");
    }
    let thumbprint = std::str::from_utf8(&rest[..thumb_len])
        .context("Signer thumbprint is not UTF-8")?
        .to_string();
    let mut mac = [0u8; 32];
    mac.copy_from_slice(&rest[thumb_len..]);

    Ok(Token {
        algorithm,
        thumbprint,
        mac,
    })
}

const SIGNATURE_OPEN: &str = "<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">";
const SIGNATURE_CLOSE: &str = "</ds:Signature>";

/// Append an enveloped signature element before the root's closing tag.
pub(crate) fn envelop_xml(
    document: &str,
    signature_method: &str,
    digest_method: &str,
    token: &str,
) -> Result<String> {
    let Some(root_close) = document.rfind("</") else {
        bail!("XML document has no closing root element");
    };
    let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    let element = format!(
        "{SIGNATURE_OPEN}<ds:SignatureMethod Algorithm=\"{signature_method}\"/>\
         <ds:DigestMethod Algorithm=\"{digest_method}\"/>\
         <ds:SignatureValue>{token}</ds:SignatureValue>{SIGNATURE_CLOSE}"
    );
    Ok(format!(
        "{}{}{}",
        &document[..root_close],
        element,
        &document[root_close..]
    ))
}

/// Split an enveloped document into (original document, digest method, token).
pub(crate) fn unwrap_xml(signed: &str) -> Result<(String, String, String)> {
    let start = signed
        .find(SIGNATURE_OPEN)
        .context("Document carries no enveloped signature")?;
    let end = signed[start..]
        .find(SIGNATURE_CLOSE)
        .map(|pos| start + pos + SIGNATURE_CLOSE.len())
        .context("Unterminated signature element")?;
    let element = &signed[start..end];

    let digest_method = attribute_after(element, "<ds:DigestMethod Algorithm=\"")
        .context("Signature element lacks DigestMethod")?;
    let token = between(element, "<ds:SignatureValue>", "</ds:SignatureValue>")
        .context("Signature element lacks SignatureValue")?;

    let original = format!("{}{}", &signed[..start], &signed[end..]);
    Ok((original, digest_method.to_string(), token.to_string()))
}

fn attribute_after<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
    let from = haystack.find(prefix)? + prefix.len();
    let len = haystack[from..].find('"')?;
    Some(&haystack[from..from + len])
}

fn between<'a>(haystack: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let from = haystack.find(open)? + open.len();
    let len = haystack[from..].find(close)?;
    Some(&haystack[from..from + len])
}
