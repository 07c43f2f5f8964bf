#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let tree = html::parse_xhtml(source).expect("engine invariants hold on any input");
    assert_eq!(tree.text(), source, "tree must reproduce its input");
    let lexer = html::LexerConfig {
        raw_text_elements: Vec::new(),
        ..html::LexerConfig::default()
    };
    assert_eq!(tree.tokens(), html::tokenize(source, &lexer).as_slice());
});
