//! Integration tests for console output classification.

use pbc_compile::console::{
    classify_line, render_html, Annotation, ConsoleAnnotator, LineKind, StreamEnd,
};
use pbc_compile::process::OutputCharset;
use tokio_util::sync::CancellationToken;

const LOG: &[u8] = b"Compiling foo.pbl...\n\
foo.pbl(12,4): Warning W100: unused variable\n\
bar.pbl(3): warning W7: shadowed <name>\n\
Error E200: syntax error\n\
Done with 1 error\n";

#[test]
fn example_lines_classify() {
    assert_eq!(
        classify_line("foo.pbl(12,4): Warning W100: unused variable\r\n").kind,
        LineKind::Warning
    );
    assert_eq!(classify_line("Error E200: syntax error").kind, LineKind::Error);
    assert_eq!(classify_line("Compiling foo.pbl...").kind, LineKind::Plain);
    assert_eq!(classify_line("Done with 1 error").kind, LineKind::Plain);
}

#[tokio::test]
async fn counts_match_pattern_hits_for_any_chunking() {
    for chunk_size in [1, 2, 7, 64, LOG.len()] {
        let mut raw = Vec::new();
        let mut notes = Vec::new();
        let mut annotator = ConsoleAnnotator::new(&mut raw, &mut notes, OutputCharset::utf8());
        for chunk in LOG.chunks(chunk_size) {
            annotator.write(chunk).await.unwrap();
        }
        let counts = annotator.close().await.unwrap();

        assert_eq!(counts.warnings, 2, "chunk size {chunk_size}");
        assert_eq!(counts.errors, 1, "chunk size {chunk_size}");
        assert_eq!(raw, LOG, "chunk size {chunk_size}");
    }
}

#[tokio::test]
async fn consume_and_render_marks_diagnostic_lines() {
    let mut builder = tokio_test::io::Builder::new();
    for chunk in LOG.chunks(10) {
        builder.read(chunk);
    }
    let stdout = builder.build();

    let mut raw = Vec::new();
    let mut notes = Vec::new();
    let mut annotator = ConsoleAnnotator::new(&mut raw, &mut notes, OutputCharset::utf8());
    let end = annotator.consume(stdout, &CancellationToken::new()).await.unwrap();
    annotator.close().await.unwrap();
    assert_eq!(end, StreamEnd::Eof);

    let notes = Annotation::parse_all(std::str::from_utf8(&notes).unwrap()).unwrap();
    let lines: Vec<u64> = notes.iter().map(|note| note.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);

    let html = render_html(&raw, &notes, &OutputCharset::utf8());
    assert!(html.starts_with("<pre>\n"));
    assert!(html.contains("Compiling foo.pbl...\n"));
    assert!(html.contains(
        "<span class=warning-inline>foo.pbl(12,4): Warning W100: unused variable</span>"
    ));
    assert!(html.contains("<span class=warning-inline>bar.pbl(3): warning W7: shadowed &lt;name&gt;</span>"));
    assert!(html.contains("<span class=error-inline>Error E200: syntax error</span>"));
}
