//! `sitemap.xml` for the static site

use crate::database::Database;

pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Every public page a snapshot gives rise to
pub fn pages(site_url: &str, database: &Database) -> Vec<String> {
    let base = site_url.trim_end_matches('/');
    let mut pages = vec![
        format!("{}/", base),
        format!("{}/build", base),
        format!("{}/trekker", base),
    ];
    pages.extend(
        database
            .characters
            .iter()
            .map(|c| format!("{}/trekker/{}", base, urlencoding::encode(&c.name))),
    );
    pages.push(format!("{}/disc", base));
    pages.extend(
        database
            .discs
            .iter()
            .map(|d| format!("{}/disc/{}", base, d.id)),
    );
    pages
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render the sitemap; `lastmod` is stamped on every entry
pub fn sitemap(site_url: &str, database: &Database, lastmod: &str) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for page in pages(site_url, database) {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&page)));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", escape_xml(lastmod)));
        xml.push_str("    <changefreq>weekly</changefreq>\n");
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}
