//! Linkvertise dynamic redirect links. There is no API call involved in
//! creating them, the redirect URL is built locally and then shortened via
//! the paste host.

use super::paste::PasteHost;
use crate::prelude::*;
use crate::util::url::{encode_uri, join_segments};
use crate::util::Degradable;
use crate::Result;
use base64::Engine as _;
use rand::Rng;

pub(super) fn redirect_url(base: &url::Url, user_id: &str, link: &str) -> url::Url {
    let nonce: f64 = rand::thread_rng().gen_range(0.0..1000.0);

    let mut url = join_segments(base, [user_id, nonce.to_string().as_str(), "dynamic"]);

    let target = base64::engine::general_purpose::STANDARD.encode(encode_uri(link));
    url.set_query(Some(&format!("r={target}")));

    url
}

/// Returns the short link to the redirect, or the original link if the paste
/// host couldn't shorten it.
pub(super) async fn wrap_link(
    paste: &dyn PasteHost,
    base: &url::Url,
    user_id: &str,
    link: &str,
) -> Degradable<String> {
    let redirect = redirect_url(base, user_id, link);

    match paste.shorten_url(redirect.as_str()).await {
        Ok(short) => Degradable::Ok(paste.page_url(&short)),
        Err(err) => {
            warn!(err = tracing_err(&err), link, "Failed to shorten Linkvertise link");
            Degradable::Degraded(link.to_owned())
        }
    }
}

/// Double mode: the wrapped link is put into a paste, and the paste URL is
/// wrapped once again.
pub(super) async fn lock_via_paste(
    paste: &dyn PasteHost,
    base: &url::Url,
    user_id: &str,
    template: &str,
    link: &str,
) -> Result<String> {
    let wrapped = wrap_link(paste, base, user_id, link).await.into_inner();

    let paste_id = paste
        .create_paste(&super::render_template(template, &wrapped))
        .await?;

    let paste_url = paste.page_url(&paste_id);
    let wrapped = wrap_link(paste, base, user_id, &paste_url).await.into_inner();

    super::protect_paste(paste, &paste_id, &wrapped).await;

    Ok(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn redirect_url_shape() {
        let base = url::Url::parse("https://link-to.net").unwrap();
        let url = redirect_url(&base, "4242", "https://files.example/a b");

        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "4242");
        assert_eq!(segments[2], "dynamic");

        let nonce: f64 = segments[1].parse().unwrap();
        assert!((0.0..1000.0).contains(&nonce));

        let target = url.query().unwrap().strip_prefix("r=").unwrap();
        let target = base64::engine::general_purpose::STANDARD
            .decode(target)
            .unwrap();

        assert_eq!(
            String::from_utf8(target).unwrap(),
            "https://files.example/a%20b"
        );
    }
}
