use fernmark_core::{HandlerSet, Parser, emit_html, emit_html_sanitized, parse};

fn html(source: &str) -> String {
    emit_html(&parse(source).document)
}

#[test]
fn emphasis_and_strong() {
    assert_eq!(html("*em* and **strong**"), "<p><em>em</em> and <strong>strong</strong></p>");
    assert_eq!(html("***both***"), "<p><em><strong>both</strong></em></p>");
}

#[test]
fn emphasis_inside_strong_run() {
    assert_eq!(
        html("*foo**bar**baz*"),
        "<p><em>foo<strong>bar</strong>baz</em></p>"
    );
}

#[test]
fn unbalanced_run_leaves_the_remainder_literal() {
    assert_eq!(html("***foo**"), "<p>*<strong>foo</strong></p>");
}

#[test]
fn unicode_punctuation_counts_for_flanking() {
    // Guillemets are punctuation, so the underscores still flank.
    assert_eq!(html("«_hi_»"), "<p>«<em>hi</em>»</p>");
    assert_eq!(html("§_x_"), "<p>§<em>x</em></p>");
}

#[test]
fn underscore_does_not_open_intraword() {
    assert_eq!(html("snake_case_name"), "<p>snake_case_name</p>");
    assert_eq!(html("star*case*name"), "<p>star<em>case</em>name</p>");
}

#[test]
fn code_spans_escape_their_content() {
    assert_eq!(html("`<a>`"), "<p><code>&lt;a&gt;</code></p>");
    assert_eq!(html("`` a   b ``"), "<p><code>a b</code></p>");
}

#[test]
fn autolinks() {
    assert_eq!(
        html("<https://example.com/x>"),
        "<p><a href=\"https://example.com/x\">https://example.com/x</a></p>"
    );
    assert_eq!(
        html("<me@example.com>"),
        "<p><a href=\"mailto:me@example.com\">me@example.com</a></p>"
    );
}

#[test]
fn inline_links_and_images() {
    assert_eq!(
        html("[text](/url \"title\")"),
        "<p><a href=\"/url\" title=\"title\">text</a></p>"
    );
    assert_eq!(
        html("![alt *em*](/img.png)"),
        "<p><img src=\"/img.png\" alt=\"alt em\" /></p>"
    );
}

#[test]
fn reference_links_resolve_through_the_document_table() {
    assert_eq!(
        html("[foo][bar]\n\n[bar]: /u \"t\""),
        "<p><a href=\"/u\" title=\"t\">foo</a></p>"
    );
    assert_eq!(html("[bar][]\n\n[bar]: /u"), "<p><a href=\"/u\">bar</a></p>");
    assert_eq!(
        html("[bar] after\n\n[bar]: /u"),
        "<p><a href=\"/u\">bar</a> after</p>"
    );
}

#[test]
fn unresolved_reference_stays_literal() {
    assert_eq!(html("[nope]"), "<p>[nope]</p>");
}

#[test]
fn inner_link_wins_over_the_enclosing_one() {
    assert_eq!(
        html("[a [b](/inner)](/outer)"),
        "<p>[a <a href=\"/inner\">b</a>](/outer)</p>"
    );
}

#[test]
fn escaped_bracket_blocks_the_link() {
    assert_eq!(html("\\[x](/u)"), "<p>[x](/u)</p>");
}

#[test]
fn raw_html_spans_pass_through_unsanitized_output() {
    assert_eq!(html("a <b class=\"x\">y</b>"), "<p>a <b class=\"x\">y</b></p>");
}

#[test]
fn breaks() {
    assert_eq!(html("a\nb"), "<p>a\nb</p>");
    assert_eq!(html("a  \nb"), "<p>a<br />\nb</p>");
    assert_eq!(html("a\\\nb"), "<p>a<br />\nb</p>");
}

#[test]
fn entities_decode_then_reescape() {
    assert_eq!(html("fish &amp; chips"), "<p>fish &amp; chips</p>");
    assert_eq!(html("&copy; &#169;"), "<p>\u{a9} \u{a9}</p>");
}

#[test]
fn heading_content_is_inline_parsed() {
    assert_eq!(html("# *em* text"), "<h1><em>em</em> text</h1>");
}

#[test]
fn full_document_rendering() {
    let source = "# Title\n\n- a\n- b\n\n> quote";
    let expected = "<h1>Title</h1>\n\
                    <ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n\
                    <blockquote>\n  <p>quote</p>\n</blockquote>";
    assert_eq!(html(source), expected);
}

#[test]
fn loose_list_items_keep_their_paragraphs() {
    let expected = "<ul>\n  <li>\n    <p>a</p>\n  </li>\n  <li>\n    <p>b</p>\n  </li>\n</ul>";
    assert_eq!(html("- a\n\n- b"), expected);
}

#[test]
fn ordered_list_start_attribute() {
    let out = html("5. a\n6. b");
    assert!(out.contains("<ol start=\"5\">"), "got {}", out);
    assert!(out.contains("<li>a</li>"));
}

#[test]
fn fenced_code_rendering() {
    assert_eq!(
        html("```rust\nlet x = 1;\n```"),
        "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>"
    );
}

#[test]
fn thematic_break_rendering() {
    assert_eq!(html("---"), "<hr />");
}

#[test]
fn admonition_rendering_with_default_title() {
    let expected =
        "<div class=\"admonition tip\">\n  <p class=\"admonition-title\">Tip</p>\n  <p>body</p>\n</div>";
    assert_eq!(html("::: tip\nbody\n:::"), expected);
}

#[test]
fn sanitized_output_strips_disallowed_tags() {
    let result = parse("keep\n\n<script>alert(1)</script>");
    let out = emit_html_sanitized(&result.document);
    assert!(out.contains("<p>keep</p>"), "got {}", out);
    assert!(!out.contains("<script"), "got {}", out);
    assert!(!out.contains("alert"), "got {}", out);
}

#[test]
fn sanitized_output_keeps_admonition_wrappers() {
    let result = parse("::: note\nbody\n:::");
    let out = emit_html_sanitized(&result.document);
    assert!(out.contains("admonition note"), "got {}", out);
    assert!(out.contains("body"), "got {}", out);
}

#[test]
fn handler_set_is_injectable() {
    let mut handlers = HandlerSet::standard();
    handlers.remove(b'*');
    handlers.remove(b'_');
    let parser = Parser::new().with_handlers(handlers);
    let result = parser.parse("*not em* but `code`");
    let out = emit_html(&result.document);
    assert_eq!(out, "<p>*not em* but <code>code</code></p>");
}
