//! OpenPGP clear-signed message handling (RFC 4880 §7).
//!
//! Signed `.dsc` files wrap the control stanza in an armor. Only the
//! message is extracted here; the signature is not verified.

use std::borrow::Cow;

use crate::error::{Error, Result};

const BEGIN_MESSAGE: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const BEGIN_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";
const END_SIGNATURE: &str = "-----END PGP SIGNATURE-----";

/// Whether `text` starts with a clear-signed message header.
pub fn is_clearsigned(text: &str) -> bool {
    text.lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim_end() == BEGIN_MESSAGE)
}

/// Extract the signed message from `text`.
///
/// Text without a clear-signed header is returned unchanged. Armor headers
/// are skipped and dash-escaped lines (`- foo`) are unescaped.
///
/// # Examples
///
/// ```
/// use deb_cachefilter::strip_clearsign;
///
/// let signed = "\
/// -----BEGIN PGP SIGNED MESSAGE-----
/// Hash: SHA512
///
/// Source: hello
/// - -not-a-header
/// -----BEGIN PGP SIGNATURE-----
///
/// iQIzBAEBCgAdFiEE
/// -----END PGP SIGNATURE-----
/// ";
/// let message = strip_clearsign(signed).unwrap();
/// assert_eq!(message, "Source: hello\n-not-a-header\n");
/// ```
pub fn strip_clearsign(text: &str) -> Result<Cow<'_, str>> {
    if !is_clearsigned(text) {
        return Ok(Cow::Borrowed(text));
    }

    let mut lines = text
        .lines()
        .skip_while(|l| l.trim().is_empty())
        .skip(1);

    // armor headers end at the first empty line
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        if !line.contains(':') {
            return Err(Error::InvalidSignedMessage(format!(
                "unexpected armor header: {line}"
            )));
        }
    }

    let mut message = String::new();
    let mut saw_signature = false;
    for line in lines.by_ref() {
        if line.trim_end() == BEGIN_SIGNATURE {
            saw_signature = true;
            break;
        }
        if let Some(unescaped) = line.strip_prefix("- ") {
            message.push_str(unescaped);
        } else if line.starts_with('-') {
            return Err(Error::InvalidSignedMessage(format!(
                "unescaped dash line in message: {line}"
            )));
        } else {
            message.push_str(line);
        }
        message.push('\n');
    }

    if !saw_signature {
        return Err(Error::InvalidSignedMessage(
            "missing signature block".to_string(),
        ));
    }
    if !lines.any(|l| l.trim_end() == END_SIGNATURE) {
        return Err(Error::InvalidSignedMessage(
            "unterminated signature block".to_string(),
        ));
    }

    Ok(Cow::Owned(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED: &str = "\
-----BEGIN PGP SIGNED MESSAGE-----
Hash: SHA256

Format: 3.0 (quilt)
Source: hello
-----BEGIN PGP SIGNATURE-----

iQIzBAEBCAAdFiEE
=abcd
-----END PGP SIGNATURE-----
";

    #[test]
    fn unsigned_text_is_borrowed() {
        let text = "Source: hello\n";
        assert!(matches!(strip_clearsign(text).unwrap(), Cow::Borrowed(_)));
        assert!(!is_clearsigned(text));
    }

    #[test]
    fn strips_armor() {
        assert!(is_clearsigned(SIGNED));
        let message = strip_clearsign(SIGNED).unwrap();
        assert_eq!(message, "Format: 3.0 (quilt)\nSource: hello\n");
    }

    #[test]
    fn leading_blank_lines() {
        let text = format!("\n\n{SIGNED}");
        assert!(is_clearsigned(&text));
        assert!(strip_clearsign(&text).is_ok());
    }

    #[test]
    fn missing_signature() {
        let text = "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\nSource: x\n";
        assert!(matches!(
            strip_clearsign(text),
            Err(Error::InvalidSignedMessage(_))
        ));
    }

    #[test]
    fn unterminated_signature() {
        let text = "-----BEGIN PGP SIGNED MESSAGE-----\n\nSource: x\n-----BEGIN PGP SIGNATURE-----\nabc\n";
        assert!(strip_clearsign(text).is_err());
    }

    #[test]
    fn bad_armor_header() {
        let text = "-----BEGIN PGP SIGNED MESSAGE-----\nnot a header\n\nSource: x\n";
        assert!(strip_clearsign(text).is_err());
    }
}
