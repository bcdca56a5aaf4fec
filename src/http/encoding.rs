//! Content-coding negotiation
//!
//! Parses `Accept-Encoding` (RFC 9110 §12.5.3) into the ordered list of
//! compressed codings the server supports and the client accepts.

/// Content codings known to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Identity,
    Brotli,
    Gzip,
    Deflate,
}

impl Encoding {
    /// Compressed codings in declaration order, which breaks preference ties
    pub const COMPRESSED: [Self; 3] = [Self::Brotli, Self::Gzip, Self::Deflate];

    /// Token used in `Accept-Encoding` and `Content-Encoding`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Brotli => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of parsing an `Accept-Encoding` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptEncoding {
    /// Acceptable compressed codings, most preferred first
    pub preferred: Vec<Encoding>,
    /// Whether the uncompressed representation may be sent
    pub identity_acceptable: bool,
}

/// One parsed `coding;q=x` element
struct Element<'a> {
    coding: &'a str,
    /// Quality in thousandths (0..=1000)
    quality: u16,
    position: usize,
}

/// Parse the `Accept-Encoding` header
///
/// - Missing or empty header: identity only
/// - Codings are ordered by quality, explicit mentions before `*`, then by
///   position in the header, then by declaration order (br, gzip, deflate)
/// - `q=0` excludes a coding; `identity` stays acceptable unless excluded
///   explicitly or through `*;q=0`
///
/// # Examples
/// ```
/// use static_serve::http::encoding::{parse_accept_encoding, Encoding};
///
/// let accept = parse_accept_encoding(Some("gzip;q=0.5, br"));
/// assert_eq!(accept.preferred, vec![Encoding::Brotli, Encoding::Gzip]);
/// assert!(accept.identity_acceptable);
/// ```
pub fn parse_accept_encoding(header: Option<&str>) -> AcceptEncoding {
    let elements: Vec<Element<'_>> = header
        .unwrap_or_default()
        .split(',')
        .enumerate()
        .filter_map(|(position, raw)| parse_element(raw, position))
        .collect();

    let wildcard = find(&elements, "*");

    // (quality, is_explicit, position, coding)
    let mut ranked: Vec<(u16, bool, usize, Encoding)> = Encoding::COMPRESSED
        .iter()
        .filter_map(|&encoding| match find(&elements, encoding.as_str()) {
            Some(e) => Some((e.quality, true, e.position, encoding)),
            None => wildcard.map(|w| (w.quality, false, w.position, encoding)),
        })
        .filter(|(quality, ..)| *quality > 0)
        .collect();

    // Stable sort keeps declaration order for full ties
    ranked.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let identity_acceptable = match find(&elements, Encoding::Identity.as_str()).or(wildcard) {
        Some(e) => e.quality > 0,
        None => true,
    };

    AcceptEncoding {
        preferred: ranked.into_iter().map(|(.., encoding)| encoding).collect(),
        identity_acceptable,
    }
}

fn find<'e, 'a>(elements: &'e [Element<'a>], coding: &str) -> Option<&'e Element<'a>> {
    elements
        .iter()
        .find(|e| e.coding.eq_ignore_ascii_case(coding))
}

/// Parse a single `coding *( OWS ";" OWS parameter )` element
fn parse_element(raw: &str, position: usize) -> Option<Element<'_>> {
    let mut parts = raw.split(';');
    let coding = parts.next()?.trim();
    if coding.is_empty() {
        return None;
    }

    let mut quality = 1000;
    for param in parts {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("q") {
            // Malformed weights drop the element
            quality = parse_qvalue(value.trim())?;
        }
    }

    Some(Element {
        coding,
        quality,
        position,
    })
}

/// Parse a qvalue (`0`, `0.5`, `1.000`, ...) into thousandths
fn parse_qvalue(value: &str) -> Option<u16> {
    let (int, frac) = value.split_once('.').unwrap_or((value, ""));
    if frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match int {
        "0" => {
            let mut millis = 0;
            let mut scale = 100;
            for digit in frac.bytes() {
                millis += u16::from(digit - b'0') * scale;
                scale /= 10;
            }
            Some(millis)
        }
        "1" if frac.bytes().all(|b| b == b'0') => Some(1000),
        _ => None,
    }
}
