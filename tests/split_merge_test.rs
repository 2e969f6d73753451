//! Split/merge round trips through the file system.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use tempfile::TempDir;
use tobi::split_merge::{SPLIT_MERGE, SPLIT_MERGE_ID, SPLIT_MERGE_SUB_ID, split_with};
use tobi::{
    AudioClip, CancellationToken, Document, Error, Marked, NoProgress, Node, NodeId, Outcome,
    ProgressLog, ProgressReporter, SplitLayout, SplitMergeOptions, SplitRole, XmlStore,
    document_role, merge_document, open_document, save_document, split_document,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Copy the fixture into a fresh directory so splits never touch the
/// checked-in file.
fn fixture_copy(dir: &TempDir) -> PathBuf {
    let source = dir.path().join("moby.xuk");
    fs::copy(format!("{FIXTURES_DIR}/moby.xuk"), &source).expect("Failed to copy fixture");
    source
}

fn has_bookkeeping(doc: &Document) -> bool {
    std::iter::once(NodeId::ROOT)
        .chain(doc.descendants(NodeId::ROOT))
        .any(|n| {
            doc.attribute(n, SPLIT_MERGE).is_some()
                || doc.attribute(n, SPLIT_MERGE_ID).is_some()
                || doc.attribute(n, SPLIT_MERGE_SUB_ID).is_some()
        })
}

/// Reporter that asks to stop once `limit` iterations have started.
struct CancelAfter {
    limit: usize,
    started: Cell<usize>,
}

impl ProgressReporter for CancelAfter {
    fn report_progress(&self, _percent: u8, _label: &str) {
        self.started.set(self.started.get() + 1);
    }

    fn is_cancellation_requested(&self) -> bool {
        self.started.get() >= self.limit
    }
}

/// Reporter that records every update.
#[derive(Default)]
struct Recorder {
    updates: std::cell::RefCell<Vec<(u8, String)>>,
}

impl ProgressReporter for Recorder {
    fn report_progress(&self, percent: u8, label: &str) {
        self.updates.borrow_mut().push((percent, label.to_string()));
    }

    fn is_cancellation_requested(&self) -> bool {
        false
    }
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_split_then_merge_restores_document() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let original = open_document(&source).unwrap();
    let options = SplitMergeOptions::default();

    let report = split_document(&source, &options, &NoProgress).unwrap();
    assert_eq!(report.outcome, Outcome::Completed);
    // doctitle preamble + four chapter marks; the marked span inside
    // "The Spouter-Inn" belongs to its heading.
    assert_eq!(report.total, 5);

    let merged = merge_document(&report.layout.master_path(), &options, &NoProgress).unwrap();
    assert_eq!(merged.outcome, Outcome::Completed);
    assert_eq!(merged.total, 5);

    let merged_path = merged.merged_path.expect("merged path");
    assert_eq!(merged_path, dir.path().join("_MERGE").join("moby.xuk"));

    let merged_doc = open_document(&merged_path).unwrap();
    assert!(!has_bookkeeping(&merged_doc));
    assert_eq!(merged_doc, original, "\n{}\n{}", merged_doc.outline(), original.outline());
}

#[test]
fn test_split_output_layout() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let source_bytes = fs::read(&source).unwrap();

    let report = split_document(&source, &SplitMergeOptions::default(), &NoProgress).unwrap();

    let master_path = dir.path().join("_SPLIT/moby__MASTER/master.xuk");
    assert_eq!(report.layout.master_path(), master_path);
    let master = open_document(&master_path).unwrap();
    assert_eq!(document_role(&master), SplitRole::Master);

    for part in report.layout.parts(report.total) {
        assert_eq!(
            part.path,
            dir.path().join(format!("_SPLIT/moby_{0}/{0}.xuk", part.index))
        );
        let doc = open_document(&part.path).unwrap();
        assert_eq!(document_role(&doc), SplitRole::Sub(part.index));

        let mark = doc
            .first_descendant_with_attribute(NodeId::ROOT, SPLIT_MERGE_ID)
            .expect("part has a mark");
        assert_eq!(doc.attribute(mark, SPLIT_MERGE_ID), Some(part.index.to_string().as_str()));
    }

    assert_eq!(fs::read(&source).unwrap(), source_bytes, "source must be untouched");
}

#[test]
fn test_part_content() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let report = split_document(&source, &SplitMergeOptions::default(), &NoProgress).unwrap();

    let text = |i: usize| {
        let doc = open_document(report.layout.part_path(i)).unwrap();
        doc.collect_text(NodeId::ROOT)
    };

    assert_eq!(text(0), "Moby-Dick; or, The Whale");
    assert!(text(1).starts_with("LoomingsCall me Ishmael."));
    // The whitespace between the first two chapters stays with part 1.
    assert!(text(1).trim_end().ends_with("Having little or no money"));
    assert_eq!(text(2), "The Carpet-BagI stuffed a shirt or two into my old carpet-bag.");
    assert_eq!(text(3), "New BedfordIt was a Saturday night in December.");
    assert_eq!(
        text(4),
        "The Spouter-Inn (continued)Entering that gable-ended Spouter-Inn.The End"
    );
}

#[test]
fn test_master_anchor_ordinals() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let report = split_document(&source, &SplitMergeOptions::default(), &NoProgress).unwrap();

    let master = open_document(report.layout.master_path()).unwrap();
    let ids: Vec<String> = master
        .descendants(NodeId::ROOT)
        .filter_map(|n| master.attribute(n, SPLIT_MERGE_ID))
        .map(str::to_string)
        .collect();
    let expected: Vec<String> = (0..report.total).map(|i| i.to_string()).collect();
    assert_eq!(ids, expected);

    // No marked content is left in the master.
    assert!(!master.descendants(NodeId::ROOT).any(|n| {
        master.node(n).is_some_and(|node| node.marked)
    }));
}

#[test]
fn test_edits_in_parts_survive_merge() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let options = SplitMergeOptions::default();
    let report = split_document(&source, &options, &NoProgress).unwrap();

    // Record audio for the heading of part 2.
    let part_path = report.layout.part_path(2);
    let mut part = open_document(&part_path).unwrap();
    let heading = part
        .first_descendant_with_attribute(NodeId::ROOT, SPLIT_MERGE_ID)
        .unwrap();
    part.node_mut(heading).unwrap().audio =
        Some(AudioClip::new("carpet-bag.wav").with_range(0, 2300));
    save_document(&part, &part_path).unwrap();

    let merged = merge_document(&report.layout.master_path(), &options, &NoProgress).unwrap();
    let doc = open_document(merged.merged_path.unwrap()).unwrap();
    let with_audio = doc.first_descendant_with_audio(NodeId::ROOT).unwrap();
    assert_eq!(doc.text(with_audio), Some("The Carpet-Bag"));
    assert_eq!(doc.attribute(with_audio, "id"), Some("ch2"));
}

#[test]
fn test_progress_reports_every_part() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let recorder = Recorder::default();

    split_document(&source, &SplitMergeOptions::default(), &recorder).unwrap();

    let updates = recorder.updates.borrow();
    assert_eq!(
        *updates,
        vec![
            (20, "1 / 5".to_string()),
            (40, "2 / 5".to_string()),
            (60, "3 / 5".to_string()),
            (80, "4 / 5".to_string()),
            (100, "5 / 5".to_string()),
        ]
    );
}

#[test]
fn test_custom_mark_query() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);

    // Split on level1 sections only, ignoring the stored marks.
    let level1 = |doc: &Document, n: NodeId| doc.qname(n).is_some_and(|q| q.local == "level1");
    let report = split_with(
        &XmlStore::default(),
        &level1,
        &source,
        &SplitMergeOptions::default(),
        &NoProgress,
    )
    .unwrap();
    // doctitle preamble + three level1 sections
    assert_eq!(report.total, 4);

    let original = open_document(&source).unwrap();
    let merged = merge_document(
        &report.layout.master_path(),
        &SplitMergeOptions::default(),
        &NoProgress,
    )
    .unwrap();
    assert_eq!(open_document(merged.merged_path.unwrap()).unwrap(), original);
}

/// `book( "x0"(e1, e5*), "x2"(e6(e9*)), e3, e4 )`: the second mark sits
/// under a text-only node that follows the first mark's branch.
#[test]
fn test_round_trip_with_mark_under_text_only_node() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("book.xuk");

    let mut doc = Document::new("book");
    let x0 = doc.alloc(Node::text("x0"));
    doc.append_child(NodeId::ROOT, x0);
    let e1 = doc.create_element("e1");
    doc.append_child(x0, e1);
    let e5 = doc.alloc(Node::element("e5").with_mark());
    doc.append_child(x0, e5);
    let x2 = doc.alloc(Node::text("x2"));
    doc.append_child(NodeId::ROOT, x2);
    let e6 = doc.create_element("e6");
    doc.append_child(x2, e6);
    let e9 = doc.alloc(Node::element("e9").with_mark());
    doc.append_child(e6, e9);
    for name in ["e3", "e4"] {
        let id = doc.create_element(name);
        doc.append_child(NodeId::ROOT, id);
    }
    save_document(&doc, &source).unwrap();

    let options = SplitMergeOptions::default();
    let report = split_document(&source, &options, &NoProgress).unwrap();
    assert_eq!(report.total, 2);

    let master = open_document(report.layout.master_path()).unwrap();
    let sub_ids: Vec<_> = master
        .descendants(NodeId::ROOT)
        .filter_map(|n| master.attribute(n, SPLIT_MERGE_SUB_ID))
        .collect();
    assert_eq!(sub_ids, vec!["1~0", "1~1"]);

    let merged = merge_document(&report.layout.master_path(), &options, &NoProgress).unwrap();
    let merged_doc = open_document(merged.merged_path.unwrap()).unwrap();
    assert_eq!(merged_doc, doc, "\n{}\n{}", merged_doc.outline(), doc.outline());
}

/// Build a book from `(parent choice, kind, marked)` triples.
///
/// Kinds are a bare element, an element with text, and a text-only node.
/// Any node may have children, so marks end up nested inside marks and
/// inside text-only nodes, and texted elements often precede the first mark.
fn build_book(spec: &[(usize, u8, bool)]) -> Document {
    let mut doc = Document::new("book");
    let mut ids = vec![NodeId::ROOT];
    for (k, &(parent, kind, marked)) in spec.iter().enumerate() {
        let parent = ids[parent % ids.len()];
        let mut node = match kind % 3 {
            0 => Node::element(format!("e{k}")),
            1 => Node::element(format!("e{k}")).with_text(format!("t{k}")),
            _ => Node::text(format!("x{k}")),
        };
        if marked {
            node = node.with_mark();
        }
        let id = doc.alloc(node);
        doc.append_child(parent, id);
        ids.push(id);
    }
    doc
}

fn book_spec() -> impl Strategy<Value = Vec<(usize, u8, bool)>> {
    prop::collection::vec((any::<usize>(), any::<u8>(), prop::bool::weighted(0.3)), 1..24)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_split_merge_round_trip(spec in book_spec()) {
        let doc = build_book(&spec);
        prop_assume!(doc
            .descendants(NodeId::ROOT)
            .any(|n| doc.has_xml(n) && doc.node(n).is_some_and(|node| node.marked)));

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("book.xuk");
        save_document(&doc, &source).unwrap();
        let original = open_document(&source).unwrap();
        let options = SplitMergeOptions::default();

        let report = split_document(&source, &options, &NoProgress).unwrap();
        prop_assert_eq!(report.outcome, Outcome::Completed);
        for i in 0..report.total {
            prop_assert!(report.layout.part_path(i).exists());
        }

        let master = open_document(report.layout.master_path()).unwrap();
        let ids: Vec<String> = master
            .descendants(NodeId::ROOT)
            .filter_map(|n| master.attribute(n, SPLIT_MERGE_ID))
            .map(str::to_string)
            .collect();
        let expected: Vec<String> = (0..report.total).map(|i| i.to_string()).collect();
        prop_assert_eq!(ids, expected);

        let merged = merge_document(&report.layout.master_path(), &options, &NoProgress).unwrap();
        prop_assert_eq!(merged.total, report.total);
        let merged_doc = open_document(merged.merged_path.unwrap()).unwrap();
        prop_assert!(!has_bookkeeping(&merged_doc));
        prop_assert!(
            merged_doc == original,
            "\n{}\n{}",
            merged_doc.outline(),
            original.outline()
        );
    }
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancel_split_after_k_parts() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let source_bytes = fs::read(&source).unwrap();

    let reporter = CancelAfter {
        limit: 2,
        started: Cell::new(0),
    };
    let report = split_document(&source, &SplitMergeOptions::default(), &reporter).unwrap();
    assert_eq!(report.outcome, Outcome::Cancelled { completed: 2 });

    for part in report.layout.parts(report.total) {
        if part.index < 2 {
            let doc = open_document(&part.path).expect("written part is valid");
            assert_eq!(document_role(&doc), SplitRole::Sub(part.index));
        } else {
            assert!(!part.dir.exists(), "part {} should not exist", part.index);
        }
    }
    assert_eq!(fs::read(&source).unwrap(), source_bytes);
}

#[test]
fn test_cancel_split_from_another_thread() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let token = CancellationToken::new();

    let report = std::thread::scope(|scope| {
        let reporter = ProgressLog::new("split", token.clone());
        token.cancel();
        scope
            .spawn(move || split_document(&source, &SplitMergeOptions::default(), &reporter))
            .join()
            .unwrap()
    })
    .unwrap();

    assert_eq!(report.outcome, Outcome::Cancelled { completed: 0 });
    assert!(report.layout.master_path().exists());
    assert!(!report.layout.part_dir(0).exists());
}

#[test]
fn test_cancel_merge_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let options = SplitMergeOptions::default();
    let report = split_document(&source, &options, &NoProgress).unwrap();

    let reporter = CancelAfter {
        limit: 3,
        started: Cell::new(0),
    };
    let merged = merge_document(&report.layout.master_path(), &options, &reporter).unwrap();
    assert_eq!(merged.outcome, Outcome::Cancelled { completed: 3 });
    assert_eq!(merged.merged_path, None);
    assert!(!report.layout.merge_dir().exists());
}

// ============================================================================
// Refusals
// ============================================================================

fn write_doc(dir: &TempDir, name: &str, doc: &Document) -> PathBuf {
    let path = dir.path().join(name);
    save_document(doc, &path).unwrap();
    path
}

#[test]
fn test_split_refuses_audio_in_marked_branch() {
    let dir = TempDir::new().unwrap();
    let mut doc = Document::new("book");
    let h1 = doc.alloc(Node::element("h1").with_text("One").with_mark());
    let p = doc.alloc(
        Node::element("p")
            .with_text("narrated")
            .with_audio(AudioClip::new("p.wav")),
    );
    doc.append_child(NodeId::ROOT, h1);
    doc.append_child(NodeId::ROOT, p);
    let path = write_doc(&dir, "book.xuk", &doc);

    let result = split_document(&path, &SplitMergeOptions::default(), &NoProgress);
    assert!(matches!(result, Err(Error::SplitNotAllowedWithAudio)));
    assert!(!dir.path().join("_SPLIT").exists());
}

#[test]
fn test_split_refuses_mark_under_audio() {
    let dir = TempDir::new().unwrap();
    let mut doc = Document::new("book");
    let level = doc.alloc(Node::element("level1").with_audio(AudioClip::new("l.wav")));
    let h1 = doc.alloc(Node::element("h1").with_text("One").with_mark());
    doc.append_child(NodeId::ROOT, level);
    doc.append_child(level, h1);
    let path = write_doc(&dir, "book.xuk", &doc);

    let result = split_document(&path, &SplitMergeOptions::default(), &NoProgress);
    assert!(matches!(result, Err(Error::SplitNotAllowedWithAudio)));
}

#[test]
fn test_split_refuses_unmarked_document() {
    let dir = TempDir::new().unwrap();
    let mut doc = Document::new("book");
    let p = doc.alloc(Node::element("p").with_text("no marks here"));
    doc.append_child(NodeId::ROOT, p);
    let path = write_doc(&dir, "book.xuk", &doc);

    let result = split_document(&path, &SplitMergeOptions::default(), &NoProgress);
    assert!(matches!(result, Err(Error::NothingToSplit)));
}

#[test]
fn test_split_refuses_master_and_parts() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let report = split_document(&source, &SplitMergeOptions::default(), &NoProgress).unwrap();

    for path in [report.layout.master_path(), report.layout.part_path(1)] {
        let result = split_document(&path, &SplitMergeOptions::default(), &NoProgress);
        assert!(matches!(result, Err(Error::AlreadySplit)), "{}", path.display());
    }
}

#[test]
fn test_split_output_exists() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let mut options = SplitMergeOptions::default();
    split_document(&source, &options, &NoProgress).unwrap();

    let stale = dir.path().join("_SPLIT/stale.txt");
    fs::write(&stale, "left over").unwrap();

    let result = split_document(&source, &options, &NoProgress);
    assert!(matches!(result, Err(Error::OutputExists(p)) if p == dir.path().join("_SPLIT")));

    options.overwrite = true;
    let report = split_document(&source, &options, &NoProgress).unwrap();
    assert_eq!(report.outcome, Outcome::Completed);
    assert!(!stale.exists());
}

#[test]
fn test_merge_output_exists() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let mut options = SplitMergeOptions::default();
    let report = split_document(&source, &options, &NoProgress).unwrap();
    let master = report.layout.master_path();

    merge_document(&master, &options, &NoProgress).unwrap();
    assert!(matches!(
        merge_document(&master, &options, &NoProgress),
        Err(Error::OutputExists(_))
    ));

    options.overwrite = true;
    assert!(merge_document(&master, &options, &NoProgress).is_ok());
}

#[test]
fn test_merge_refuses_plain_document() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let result = merge_document(&source, &SplitMergeOptions::default(), &NoProgress);
    assert!(matches!(result, Err(Error::NotSplitMaster)));
}

#[test]
fn test_merge_detects_reordered_parts() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let options = SplitMergeOptions::default();
    let report = split_document(&source, &options, &NoProgress).unwrap();

    // Swap the files of parts 1 and 2.
    let one = report.layout.part_path(1);
    let two = report.layout.part_path(2);
    let tmp = dir.path().join("swap.xuk");
    fs::rename(&one, &tmp).unwrap();
    fs::rename(&two, &one).unwrap();
    fs::rename(&tmp, &two).unwrap();

    let result = merge_document(&report.layout.master_path(), &options, &NoProgress);
    assert!(matches!(
        result,
        Err(Error::OrdinalMismatch { expected: 1, ref found }) if found == "2"
    ));
    assert!(!report.layout.merged_path().exists());
}

#[test]
fn test_merge_missing_part_is_io_error() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let options = SplitMergeOptions::default();
    let report = split_document(&source, &options, &NoProgress).unwrap();

    fs::remove_dir_all(report.layout.part_dir(3)).unwrap();
    let result = merge_document(&report.layout.master_path(), &options, &NoProgress);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_layout_from_master_path() {
    let options = SplitMergeOptions::default();
    let master = Path::new("/projects/moby/_SPLIT/moby__MASTER/master.xuk");
    let layout = SplitLayout::for_master(master, &options).unwrap();
    assert_eq!(layout.base_name, "moby");
    assert_eq!(
        layout.merged_path(),
        PathBuf::from("/projects/moby/_MERGE/moby.xuk")
    );
    assert_eq!(
        layout.part_path(0),
        PathBuf::from("/projects/moby/_SPLIT/moby_0/0.xuk")
    );
}

#[test]
fn test_split_with_explicit_store_is_compact() {
    let dir = TempDir::new().unwrap();
    let source = fixture_copy(&dir);
    let store = XmlStore { pretty: false };
    let report = split_with(
        &store,
        &Marked,
        &source,
        &SplitMergeOptions::default(),
        &NoProgress,
    )
    .unwrap();

    let master = fs::read_to_string(report.layout.master_path()).unwrap();
    assert!(!master.contains("\n  <TreeNode>"));
}
