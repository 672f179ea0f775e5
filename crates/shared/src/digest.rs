use chrono::{DateTime, TimeZone};

use crate::models::DigestItem;

pub const NEWSLETTER_TITLE: &str = "AI Newsletter";

pub struct DigestRenderer;

impl DigestRenderer {
    /// Render the digest as one self-contained HTML document. The output
    /// depends only on `items` and `generated_at`.
    pub fn render<Tz>(items: &[DigestItem], generated_at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut html = String::new();

        html.push_str("<!doctype html>\n<html>\n");
        html.push_str(&format!(
            "<head><meta charset=\"utf-8\"><title>{}</title></head>\n",
            NEWSLETTER_TITLE
        ));
        html.push_str(
            "<body style=\"max-width:720px;margin:24px auto;padding:0 16px;font-family:Arial,sans-serif;\">\n",
        );
        html.push_str(&format!(
            "  <h1 style=\"margin-bottom:4px;\">{}</h1>\n",
            NEWSLETTER_TITLE
        ));
        html.push_str(&format!(
            "  <div style=\"color:#666;margin-bottom:20px;\">Generated on {}</div>\n",
            generated_at.format("%B %d, %Y %I:%M %p")
        ));

        if items.is_empty() {
            html.push_str("  <p>No items.</p>\n");
        }

        for item in items {
            let headline = Self::escape_html(&item.headline);
            let url = Self::escape_html(&item.url);
            let summary = Self::escape_html(&item.summary);

            html.push_str(
                "  <div class=\"item\" style=\"margin-bottom:20px;padding-bottom:16px;border-bottom:1px solid #ddd;\">\n",
            );
            html.push_str(&format!(
                "    <h3 style=\"margin:0 0 8px 0;font-family:Arial,sans-serif;\">{}</h3>\n",
                headline
            ));
            html.push_str(&format!(
                "    <div><a href=\"{}\" target=\"_blank\">{}</a></div>\n",
                url, url
            ));
            html.push_str(&format!(
                "    <pre style=\"white-space:pre-wrap;font-family:Inter,Arial,sans-serif;\">{}</pre>\n",
                summary
            ));
            html.push_str("  </div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    pub fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }
}
