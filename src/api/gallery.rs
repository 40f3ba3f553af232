use std::fmt::Write;

use crate::services::image_service::ImageRef;

/// Renders the gallery fragment: `columns` column containers, with image `n`
/// placed in column `n % columns`. A column count of zero is treated as one.
pub fn render_gallery(images: &[ImageRef], columns: usize) -> String {
    let columns = columns.max(1);
    let mut slots: Vec<Vec<&ImageRef>> = vec![Vec::new(); columns];
    for (index, image) in images.iter().enumerate() {
        slots[index % columns].push(image);
    }

    let mut html = String::from("<div class=\"gallery\" id=\"gallery\">\n");
    for (column, slot) in slots.iter().enumerate() {
        let _ = writeln!(html, "  <div class=\"gallery-col\" id=\"galleryCol{}\">", column);
        for image in slot {
            let alt = image.file_name.as_deref().unwrap_or_default();
            let _ = writeln!(
                html,
                "    <img class=\"galleryImage\" src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                escape_html(&image.url),
                escape_html(alt)
            );
        }
        html.push_str("  </div>\n");
    }
    html.push_str("</div>\n");
    html
}

/// Minimal escaping for text placed inside double-quoted attributes
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
