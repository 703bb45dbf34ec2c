use crate::catalog::ALL_SERVERS;
use crate::Result;
use std::sync::OnceLock;
use tera::{Context, Tera};

const CHANNELS: &[&str] = &[
    "OF-Models",
    "TeraBox",
    "Collection",
    "State-Snap",
    "Amateur",
    "Leaks-Vids",
];

/// Templates are compiled into the binary. The `.html` suffix of their
/// names turns on the autoescaping of the inserted values.
fn templates() -> &'static Tera {
    static TERA: OnceLock<Tera> = OnceLock::new();
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            ("index.html", include_str!("../../templates/index.html")),
            ("success.html", include_str!("../../templates/success.html")),
        ])
        .unwrap_or_else(|err| panic!("BUG: invalid HTML template: {err:?}"));
        tera
    })
}

pub(super) fn index<'a>(servers: impl Iterator<Item = &'a str>) -> Result<String> {
    let servers: Vec<_> = std::iter::once(ALL_SERVERS).chain(servers).collect();

    let mut context = Context::new();
    context.insert("servers", &servers);
    context.insert("channels", CHANNELS);

    Ok(templates().render("index.html", &context)?)
}

pub(super) fn success(server: &str, bulk_text: &str) -> Result<String> {
    let entries = bulk_text.lines().filter(|line| !line.trim().is_empty()).count();

    let mut context = Context::new();
    context.insert("server", server);
    context.insert("entries", &entries);

    Ok(templates().render("success.html", &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn index_escapes_server_ids() {
        let html = index(["alpha", "<b>&co"].into_iter()).unwrap();

        assert!(html.contains(r#"<option value="All">All</option>"#), "{html}");
        assert!(
            html.contains(r#"<option value="&lt;b&gt;&amp;co">&lt;b&gt;&amp;co</option>"#),
            "{html}"
        );
        assert!(!html.contains("<b>"), "{html}");
    }

    #[test]
    fn success_page() {
        let html = success("All", "Clip\n\nhttps://files.example/1\n").unwrap();
        let paragraph = html.lines().find(|line| line.contains("<p>")).unwrap();

        expect![[r#"    <p>2 line(s) of the bulk text are being posted to All in the background. Check the logs for the progress.</p>"#]]
            .assert_eq(paragraph);
    }
}
