//! Benchmarks for the split/merge pipeline.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use tempfile::TempDir;

use tobi::store::{read_document, write_document};
use tobi::{
    Document, NoProgress, Node, NodeId, SplitMergeOptions, merge_document, save_document,
    split_document,
};

/// A book with `chapters` marked headings, each followed by a few
/// paragraphs and a nested section.
fn synthetic_book(chapters: usize) -> Document {
    let mut doc = Document::new("dtbook");
    let body = doc.create_element("bodymatter");
    doc.append_child(NodeId::ROOT, body);

    for c in 0..chapters {
        let level = doc.create_element("level1");
        doc.append_child(body, level);
        let h1 = doc.alloc(Node::element("h1").with_text(format!("Chapter {c}")).with_mark());
        doc.append_child(level, h1);
        for p in 0..8 {
            let para = doc.alloc(Node::element("p").with_text(format!("Paragraph {c}.{p}")));
            doc.append_child(level, para);
        }
        let level2 = doc.create_element("level2");
        doc.append_child(level, level2);
        for p in 0..4 {
            let para = doc.alloc(Node::element("p").with_text(format!("Section {c}.{p}")));
            doc.append_child(level2, para);
        }
    }
    doc
}

fn bench_store(c: &mut Criterion) {
    let doc = synthetic_book(200);
    let xml = write_document(&doc, true);

    c.bench_function("write_document", |b| {
        b.iter(|| write_document(black_box(&doc), true))
    });
    c.bench_function("read_document", |b| {
        b.iter(|| read_document(black_box(xml.as_bytes())).unwrap())
    });
}

fn bench_split_merge(c: &mut Criterion) {
    let doc = synthetic_book(20);
    let options = SplitMergeOptions {
        overwrite: true,
        ..SplitMergeOptions::default()
    };

    c.bench_function("split_merge_20_chapters", |b| {
        b.iter(|| {
            let dir = TempDir::new().unwrap();
            let source = dir.path().join("book.xuk");
            save_document(&doc, &source).unwrap();

            let report = split_document(&source, &options, &NoProgress).unwrap();
            merge_document(&report.layout.master_path(), &options, &NoProgress).unwrap()
        })
    });
}

criterion_group!(benches, bench_store, bench_split_merge);
criterion_main!(benches);
