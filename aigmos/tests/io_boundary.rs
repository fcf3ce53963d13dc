//! Import and export through the filesystem boundary.

use std::fs;
use std::path::Path;

use aigmos::test_support::TestConsole;

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn import_many_honors_ignore_files_and_exports_back() {
    let tc = TestConsole::new().expect("console");
    let src = tc.path().join("src");
    write(&src, ".ignore", b"build/\n*.log\n");
    write(&src, "a.txt", b"alpha");
    write(&src, "c.log", b"noise");
    write(&src, "bin.dat", &[0xff, 0xfe, 0x00]);
    write(&src, "build/out.txt", b"artifact");
    write(&src, "sub/b.txt", b"beta");
    write(&src, "sub/.ignore", b"!keep.log\n");
    write(&src, "sub/keep.log", b"kept");

    let reply = tc.run(&format!("import.many {} #proj", src.display()));
    assert_eq!(
        reply,
        "OK imported=5 skipped_ignore=2 skipped_binary=1 skipped_other=0"
    );
    assert_eq!(tc.run("ls #proj"), ".ignore\na.txt\nsub");
    assert_eq!(tc.run("ls #proj:sub"), ".ignore\nb.txt\nkeep.log");
    assert_eq!(tc.run("cat #proj:sub:b.txt"), "beta");

    let out = tc.path().join("exported");
    assert_eq!(
        tc.run(&format!("export.many #proj:sub {}", out.display())),
        out.display().to_string()
    );
    assert_eq!(fs::read_to_string(out.join("b.txt")).expect("read"), "beta");
    assert_eq!(fs::read_to_string(out.join("keep.log")).expect("read"), "kept");
}

#[test]
fn export_file_defaults_to_output_dir() {
    let tc = TestConsole::new().expect("console");
    tc.run("add.item $notes:title hello");
    let reply = tc.run("export.file $notes:title");
    let expected = tc.path().join("output").join("notes__title.txt");
    assert_eq!(reply, expected.display().to_string());
    assert_eq!(fs::read_to_string(&expected).expect("read"), "hello");

    tc.run("add.item #docs:readme hi");
    let reply = tc.run("export.many #docs");
    let dir = tc.path().join("output").join("docs");
    assert_eq!(reply, dir.display().to_string());
    assert_eq!(fs::read_to_string(dir.join("readme")).expect("read"), "hi");
}

#[test]
fn import_file_is_strict_utf8() {
    let tc = TestConsole::new().expect("console");
    let good = tc.path().join("good.txt");
    let bad = tc.path().join("bad.bin");
    fs::write(&good, "multi\nline").expect("write");
    fs::write(&bad, [0xc3, 0x28]).expect("write");

    assert_eq!(tc.run(&format!("import.file {} $doc:body", good.display())), "OK");
    assert_eq!(tc.run("cat $doc:body"), "multi\nline");
    assert_eq!(tc.run(&format!("import.file {} #doc:body", good.display())), "OK");
    assert_eq!(tc.run("cat #doc:body"), "multi\nline");

    let reply = tc.run(&format!("import.file {} $doc:bin", bad.display()));
    assert!(reply.starts_with("Error: UTF-8 decode error in file: "), "{reply}");
    assert_eq!(
        tc.run(&format!("import.file {} doc", good.display())),
        "Error: import.file dst must be $sub:key or #path"
    );
    assert_eq!(
        tc.run("import.file /definitely/missing.txt $doc:x"),
        "Error: import.file expects a readable file path"
    );
}

#[test]
fn export_errors() {
    let tc = TestConsole::new().expect("console");
    tc.run("add.item #t:a:b x");
    assert_eq!(tc.run("export.file #t:a"), "Error: export.file expects a leaf; use export.many for trees");
    assert_eq!(tc.run("export.file #t:zz"), "Error: Source #path not found");
    assert_eq!(tc.run("export.many #t:a:b"), "Error: export.many expects a dict root");
    assert_eq!(tc.run("export.many #nope"), "Error: Source #root not found");
    assert_eq!(tc.run("export.many $x"), "Error: export.many src must be #path root");
}
