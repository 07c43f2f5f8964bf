use html::perf_fixtures::{make_blocks, make_deep_nesting, make_malformed_blocks};
use html::snapshot::snapshot;
use html::{LexerConfig, NodeKind, SyntaxTree, parse_html, parse_xhtml, tokenize};
use std::env;

const FRAGMENTS: &[&str] = &[
    "<div>", "</div>", "<p>", "</p>", "<li>", "<ul>", "</ul>", "<td>", "<tr>", "<table>",
    "</table>", "<br>", "</br>", "<img src=x>", "<a href=\"", "\">", "</a>", "<span>", "</span>",
    "text", " ", "\n", "&amp;", "&", "&#x41;", "<!-- c -->", "<!--", "<![CDATA[x]]>", "<?pi a=b?>",
    "<!DOCTYPE html>", "</>", "<>", "<", ">", "=", "'", "\"", "/>", "<script>", "</script>",
    "é", "</P>", "<DIV class=a>",
];

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

/// xorshift64*; deterministic across platforms.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn random_document(rng: &mut Rng) -> String {
    let len = rng.below(40);
    let mut out = String::new();
    for _ in 0..len {
        out.push_str(FRAGMENTS[rng.below(FRAGMENTS.len())]);
    }
    out
}

fn check_tree(source: &str, tree: &SyntaxTree) {
    assert_eq!(tree.text(), source, "lossless: {source:?}");
    let root = tree.root();
    assert_eq!(root.kind(), NodeKind::File);
    assert_eq!(root.span().len(), source.len());
    for node in tree.descendants() {
        assert_eq!(
            node.kind() == NodeKind::Error,
            node.error().is_some(),
            "error payloads live on error nodes only: {source:?}"
        );
        if let Some(parent) = node.parent() {
            let (outer, inner) = (parent.span(), node.span());
            assert!(
                outer.start <= inner.start && inner.end <= outer.end,
                "{:?} {inner:?} escapes {:?} {outer:?} in {source:?}",
                node.kind(),
                parent.kind()
            );
        }
    }
    let mut last = 0;
    for diagnostic in tree.diagnostics() {
        assert!(diagnostic.span.start >= last, "diagnostics in document order");
        last = diagnostic.span.start;
    }
}

#[test]
fn random_documents_are_lossless_and_well_nested() {
    let runs = env_u64("TAGSTACK_PROPERTY_RUNS", 500);
    let mut rng = Rng(env_u64("TAGSTACK_PROPERTY_SEED", 0xC0FFEE) | 1);
    for _ in 0..runs {
        let source = random_document(&mut rng);
        let tree = parse_html(&source)
            .unwrap_or_else(|err| panic!("engine failure on {source:?}: {err}"));
        check_tree(&source, &tree);
        assert_eq!(
            tree.tokens(),
            tokenize(&source, &LexerConfig::default()).as_slice(),
            "tree keeps every token of {source:?}"
        );
        let reparsed = parse_html(&tree.text()).expect("reparse");
        assert_eq!(snapshot(&reparsed).render(), snapshot(&tree).render());

        let tree = parse_xhtml(&source)
            .unwrap_or_else(|err| panic!("engine failure on {source:?}: {err}"));
        check_tree(&source, &tree);
    }
}

#[test]
fn parsing_is_deterministic() {
    let source = make_malformed_blocks(16);
    let first = parse_html(&source).expect("parse");
    let second = parse_html(&source).expect("parse");
    assert_eq!(snapshot(&first).render(), snapshot(&second).render());
    assert_eq!(first.diagnostics(), second.diagnostics());
}

#[test]
fn well_formed_blocks_have_no_diagnostics() {
    let source = make_blocks(200);
    let tree = parse_html(&source).expect("parse");
    check_tree(&source, &tree);
    assert!(!tree.has_errors(), "{:?}", tree.diagnostics().first());
    let tags = tree
        .descendants()
        .filter(|n| n.kind() == NodeKind::Tag)
        .count();
    assert_eq!(tags, 200 * 4);
}

#[test]
fn deep_nesting_is_flushed_iteratively() {
    let depth = 5_000;
    let source = make_deep_nesting(depth);
    let tree = parse_html(&source).expect("parse");
    assert_eq!(tree.text(), source);
    assert_eq!(tree.diagnostics().len(), depth);
    // FILE > DOCUMENT > div * depth > TEXT
    assert_eq!(tree.stats().max_depth, depth + 2);
    assert_eq!(snapshot(&tree).as_lines().len(), tree.node_count());
}

#[test]
fn implicit_closes_scale_with_document_length() {
    let count = 50_000;
    let implicit = "<p>x".repeat(count);
    let tree = parse_html(&implicit).expect("parse");
    assert_eq!(tree.text(), implicit);
    assert!(!tree.has_errors(), "{:?}", tree.diagnostics().first());
    let document = tree.root().child_nodes().next().expect("document");
    let paragraphs = document
        .child_nodes()
        .filter(|n| n.tag_name() == Some("p"))
        .count();
    assert_eq!(paragraphs, count);
    // FILE > DOCUMENT > p > TEXT
    assert_eq!(tree.stats().max_depth, 3);

    let explicit = "<p>x</p>".repeat(count);
    let closed = parse_html(&explicit).expect("parse");
    assert_eq!(closed.node_count(), tree.node_count());
}
