mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{TestSink, HASH};
use export_engine::{
    normalize_tree, post_order, rewrite_references, ExportEvent, NodeKind, NormalizeError,
    NullSink,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `raw/Export-<hash>/` with nested hash-suffixed directories and files.
fn nested_fixture(raw: &Path) -> PathBuf {
    let top = raw.join(format!("Export{HASH}"));
    let projects = top.join(format!("Projects{HASH}"));
    let archive = projects.join(format!("Archive{HASH}"));
    write(
        &top.join(format!("Home{HASH}.md")),
        "[projects](Projects%2F/Roadmap.md)\n",
    );
    write(&projects.join(format!("Roadmap{HASH}.md")), "# Roadmap\n");
    write(&archive.join(format!("Old{HASH}.md")), "old\n");
    write(&archive.join(format!("chart{HASH}.png")), "png");
    top
}

fn relative_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = post_order(root)
        .unwrap()
        .into_iter()
        .map(|node| {
            node.path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    names.sort();
    names
}

#[test]
fn post_order_lists_directories_after_their_contents() {
    let temp = TempDir::new().unwrap();
    let top = nested_fixture(temp.path());

    let plan = post_order(&top).unwrap();
    let position = |suffix: &str| {
        plan.iter()
            .position(|node| node.path.ends_with(suffix))
            .unwrap_or_else(|| panic!("{suffix} not planned"))
    };

    let projects = format!("Projects{HASH}");
    let archive = format!("Projects{HASH}/Archive{HASH}");
    assert!(position(&format!("{archive}/Old{HASH}.md")) < position(&archive));
    assert!(position(&format!("{archive}/chart{HASH}.png")) < position(&archive));
    assert!(position(&archive) < position(&projects));
    assert!(position(&format!("{projects}/Roadmap{HASH}.md")) < position(&projects));
    assert_eq!(plan.len(), 6);
    assert_eq!(
        plan.iter()
            .filter(|node| node.kind == NodeKind::Directory)
            .count(),
        2
    );
}

#[test]
fn normalize_renames_root_and_strips_every_suffix() {
    init_logging();
    let temp = TempDir::new().unwrap();
    nested_fixture(temp.path());

    let summary = normalize_tree(temp.path(), &NullSink).unwrap();

    let export = temp.path().join("export");
    assert_eq!(summary.export_root, export);
    assert_eq!(summary.files_renamed, 4);
    assert_eq!(summary.dirs_renamed, 2);
    assert_eq!(summary.references_rewritten, 1);
    assert_eq!(summary.rewrite_failures, 0);
    assert_eq!(
        relative_names(&export),
        vec![
            "Home.md",
            "Projects",
            "Projects/Archive",
            "Projects/Archive/Old.md",
            "Projects/Archive/chart.png",
            "Projects/Roadmap.md",
        ]
    );
    assert_eq!(
        fs::read_to_string(export.join("Home.md")).unwrap(),
        "[projects](Projects/Roadmap.md)\n"
    );
}

#[test]
fn directory_rename_follows_all_descendant_renames() {
    let temp = TempDir::new().unwrap();
    nested_fixture(temp.path());
    let sink = TestSink::new();

    normalize_tree(temp.path(), &sink).unwrap();

    let renames: Vec<(PathBuf, NodeKind)> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            ExportEvent::Renamed { from, kind, .. } => Some((from, kind)),
            _ => None,
        })
        .collect();

    // First rename is the export root itself.
    assert_eq!(renames[0].0, temp.path().join(format!("Export{HASH}")));
    assert_eq!(renames.len(), 7);

    for (index, (from, kind)) in renames.iter().enumerate() {
        if *kind != NodeKind::Directory || index == 0 {
            continue;
        }
        let dir_name = from.file_name().unwrap();
        // Nothing inside this directory may be renamed later.
        for (later, _) in &renames[index + 1..] {
            assert!(
                !later.iter().any(|part| part == dir_name),
                "{later:?} renamed after its ancestor {from:?}"
            );
        }
    }
}

#[test]
fn short_names_and_existing_export_root_are_left_alone() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("export/README.md"), "hi\n");
    write(&temp.path().join("export/img/a.png"), "png");
    let sink = TestSink::new();

    let summary = normalize_tree(temp.path(), &sink).unwrap();

    assert_eq!(summary.files_renamed, 0);
    assert_eq!(summary.dirs_renamed, 0);
    assert!(sink.take().is_empty());
    assert!(temp.path().join("export/img/a.png").is_file());
}

#[test]
fn top_level_pages_and_folders_are_gathered_under_export() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let raw = temp.path();
    write(
        &raw.join(format!("Page{HASH}.md")),
        "[child](Page%20/Child.md)\n",
    );
    write(&raw.join(format!("Page{HASH}/Child{HASH}.md")), "# Child\n");
    write(&raw.join(format!("Other{HASH}/Note{HASH}.md")), "# Note\n");

    let summary = normalize_tree(raw, &NullSink).unwrap();

    let export = raw.join("export");
    assert_eq!(summary.export_root, export);
    assert_eq!(summary.files_renamed, 3);
    assert_eq!(summary.dirs_renamed, 2);
    assert_eq!(summary.references_rewritten, 1);
    assert_eq!(
        relative_names(&export),
        vec!["Other", "Other/Note.md", "Page", "Page.md", "Page/Child.md"]
    );
    assert_eq!(
        fs::read_to_string(export.join("Page.md")).unwrap(),
        "[child](Page/Child.md)\n"
    );
    let top_level: Vec<_> = fs::read_dir(raw)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(top_level, vec![std::ffi::OsString::from("export")]);
}

#[test]
fn single_page_beside_its_folder_keeps_both() {
    let temp = TempDir::new().unwrap();
    let raw = temp.path();
    write(&raw.join(format!("Home{HASH}.md")), "# Home\n");
    write(&raw.join(format!("Home{HASH}/Child{HASH}.md")), "# Child\n");

    normalize_tree(raw, &NullSink).unwrap();

    assert!(raw.join("export/Home.md").is_file());
    assert!(raw.join("export/Home/Child.md").is_file());
}

#[test]
fn top_level_entry_named_export_is_gathered_too() {
    let temp = TempDir::new().unwrap();
    let raw = temp.path();
    write(&raw.join("export/inner.md"), "inner");
    write(&raw.join("stray.txt"), "x");

    let summary = normalize_tree(raw, &NullSink).unwrap();

    assert_eq!(summary.export_root, raw.join("export"));
    assert!(raw.join("export/export/inner.md").is_file());
    assert!(raw.join("export/stray.txt").is_file());
}

#[test]
fn empty_extraction_is_unexpected_layout() {
    let empty = TempDir::new().unwrap();
    assert!(matches!(
        normalize_tree(empty.path(), &NullSink),
        Err(NormalizeError::UnexpectedLayout { entries: 0, .. })
    ));
}

#[test]
fn colliding_sibling_is_reported_not_overwritten() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("export");
    write(&root.join("Notes.md"), "original");
    write(&root.join(format!("Notes{HASH}.md")), "hashed");

    let err = normalize_tree(temp.path(), &NullSink).unwrap_err();

    assert!(matches!(err, NormalizeError::NameCollision { .. }));
    assert_eq!(fs::read_to_string(root.join("Notes.md")).unwrap(), "original");
}

#[test]
fn long_file_name_without_extension_is_malformed() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join(format!("export/Untitled{HASH}")), "x");

    let err = normalize_tree(temp.path(), &NullSink).unwrap_err();
    assert!(matches!(err, NormalizeError::MalformedName { .. }));
}

#[test]
fn unreadable_markdown_is_skipped_and_still_renamed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("export");
    // Invalid UTF-8 content fails the read, not the rename.
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join(format!("Binary{HASH}.md")), [0xff, 0xfe, 0x00]).unwrap();
    write(&root.join(format!("Good{HASH}.md")), "![a](img%2F/a.png)");
    let sink = TestSink::new();

    let summary = normalize_tree(temp.path(), &sink).unwrap();

    assert_eq!(summary.rewrite_failures, 1);
    assert_eq!(summary.references_rewritten, 1);
    assert!(root.join("Binary.md").is_file());
    assert_eq!(
        fs::read_to_string(root.join("Good.md")).unwrap(),
        "![a](img/a.png)"
    );
    assert!(sink
        .take()
        .iter()
        .any(|event| matches!(event, ExportEvent::RewriteFailed { .. })));
}

#[test]
fn rewrite_references_is_idempotent_on_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Page.md");
    fs::write(&path, "![pic](assets%2F/img.png)\n").unwrap();

    assert_eq!(rewrite_references(&path).unwrap(), 1);
    let once = fs::read_to_string(&path).unwrap();
    assert_eq!(once, "![pic](assets/img.png)\n");

    assert_eq!(rewrite_references(&path).unwrap(), 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), once);
}

#[test]
fn rewrite_references_ignores_non_markdown_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.csv");
    fs::write(&path, "![pic](assets%2F/img.png)").unwrap();

    assert_eq!(rewrite_references(&path).unwrap(), 0);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "![pic](assets%2F/img.png)"
    );
}

#[test]
fn rewrite_references_reports_missing_file() {
    let temp = TempDir::new().unwrap();
    assert!(rewrite_references(&temp.path().join("gone.md")).is_err());
}
