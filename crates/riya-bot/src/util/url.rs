use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Joins the base URL with the given path segments. The trailing slash of the
/// base is tolerated, so both `https://host` and `https://host/` work the same.
pub(crate) fn join_segments<T: AsRef<str>>(
    base: &url::Url,
    segments: impl IntoIterator<Item = T>,
) -> url::Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Characters escaped by `encodeURI` of the browsers: everything except the
/// alphanumerics and `; , / ? : @ & = + $ - _ . ! ~ * ' ( ) #`. Non-ASCII
/// characters are always escaped as UTF-8 bytes.
const URI: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encodes the text the same way `encodeURI` does. The structure of
/// the URL is kept intact, and nothing is normalized, so an already escaped
/// `%XX` sequence is escaped once more.
pub(crate) fn encode_uri(input: &str) -> String {
    utf8_percent_encode(input, URI).to_string()
}
