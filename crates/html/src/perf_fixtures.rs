//! Synthetic inputs shared by benches and scale tests.

/// Well-formed block: attributes, a void element, a reference and nesting.
pub const BLOCK_TEMPLATE: &str =
    "<div class=box><span title=\"a &amp; b\">hello</span><img src=x><p>text</p></div>";

/// Block exercising every recovery path: implicit closes, layered closes,
/// unmatched end tags and an unterminated header.
pub const MALFORMED_BLOCK_TEMPLATE: &str =
    "<ul><li>a<li>b & c</ul><p>x<div><span>y</div></em><a href=\"z></a>";

pub fn make_blocks(blocks: usize) -> String {
    repeat(BLOCK_TEMPLATE, blocks)
}

pub fn make_malformed_blocks(blocks: usize) -> String {
    repeat(MALFORMED_BLOCK_TEMPLATE, blocks)
}

/// `depth` nested unclosed `<div>`s followed by text.
pub fn make_deep_nesting(depth: usize) -> String {
    let mut html = repeat("<div>", depth);
    html.push_str("leaf");
    html
}

/// Script body full of near-miss close tags.
pub fn make_raw_text_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri<pt </scripts>");
    }
    body.push_str("</script>");
    body
}

fn repeat(template: &str, count: usize) -> String {
    let mut html = String::with_capacity(template.len().saturating_mul(count));
    for _ in 0..count {
        html.push_str(template);
    }
    html
}
