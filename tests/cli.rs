mod common;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

use common::{write_bundle, write_jar, write_jar_bytes, SAMPLE_MANIFEST};

fn cmd() -> Command {
    Command::cargo_bin("bundle-harvester").unwrap()
}

#[test]
fn writes_import_and_export_rows() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir.path().join("modules/b.jar"), SAMPLE_MANIFEST);
    let out = dir.path().join("report/osgi.csv");

    cmd()
        .arg(dir.path().join("modules"))
        .arg(&out)
        .assert()
        .success()
        .stderr(contains("Written "))
        .stderr(contains("osgi.csv"));

    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(
        text,
        "B\t1.0.0\tp\timport\t1.0.0\t2.0.0\t[]\tfalse\t\n\
         B\t1.0.0\tp\texport\t1.0.0\t1.0.0\t{}\tfalse\t[q]\n"
    );
}

#[test]
fn defaults_to_current_dir_and_osgi_csv() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir.path().join("b.jar"), SAMPLE_MANIFEST);

    cmd().current_dir(dir.path()).assert().success();

    let text = std::fs::read_to_string(dir.path().join("osgi.csv")).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn archives_without_manifest_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_jar(&dir.path().join("plain.jar"), &[("readme.txt", "hello")]);
    std::fs::write(dir.path().join("broken.jar"), "not a zip").unwrap();
    write_bundle(&dir.path().join("z.jar"), SAMPLE_MANIFEST);
    let out = dir.path().join("out.tsv");

    cmd().arg(dir.path()).arg(&out).assert().success();

    let text = std::fs::read_to_string(out).unwrap();
    assert!(text.lines().all(|line| line.starts_with("B\t")));
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn malformed_manifest_fails_by_default() {
    let dir = TempDir::new().unwrap();
    write_bundle(
        &dir.path().join("bad.jar"),
        "Bundle-ManifestVersion: 2\nBundle-SymbolicName: bad\nImport-Package: java.util\n",
    );

    cmd()
        .arg(dir.path())
        .arg(dir.path().join("out.tsv"))
        .assert()
        .failure()
        .stderr(contains("bad.jar"));
}

#[test]
fn skip_malformed_keeps_going() {
    let dir = TempDir::new().unwrap();
    write_bundle(
        &dir.path().join("a.jar"),
        "Bundle-ManifestVersion: 2\nBundle-SymbolicName: bad\nImport-Package: java.util\n",
    );
    write_bundle(&dir.path().join("b.jar"), SAMPLE_MANIFEST);
    let out = dir.path().join("out.tsv");

    cmd()
        .arg(dir.path())
        .arg(&out)
        .arg("--skip-malformed")
        .assert()
        .success();

    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn json_format_writes_one_object_per_row() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir.path().join("b.jar"), SAMPLE_MANIFEST);
    let out = dir.path().join("out.jsonl");

    cmd()
        .args(["--format", "json"])
        .arg(dir.path())
        .arg(&out)
        .assert()
        .success();

    let text = std::fs::read_to_string(out).unwrap();
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["relation"], "import");
    assert_eq!(rows[1]["relation"], "export");
    assert_eq!(rows[1]["note"], "[q]");
}

#[test]
fn missing_modules_dir_fails() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(dir.path().join("does-not-exist"))
        .arg(dir.path().join("out.tsv"))
        .assert()
        .failure();
}

#[test]
fn latin1_header_value_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let manifest: &[u8] = b"Bundle-ManifestVersion: 2\n\
Bundle-SymbolicName: org.vendor\n\
Bundle-Vendor: Soci\xe9t\xe9\n\
Export-Package: org.vendor.api;version=1.0\n";
    write_jar_bytes(
        &dir.path().join("vendor.jar"),
        &[("META-INF/MANIFEST.MF", manifest)],
    );
    let out = dir.path().join("out.tsv");

    cmd().arg(dir.path()).arg(&out).assert().success();

    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(
        text,
        "org.vendor\t0.0.0\torg.vendor.api\texport\t1.0.0\t1.0.0\t{}\tfalse\t[]\n"
    );
}

#[cfg(unix)]
#[test]
fn symlinked_jars_are_reported() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir.path().join("store/b.jar"), SAMPLE_MANIFEST);
    std::fs::create_dir_all(dir.path().join("mods")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("store/b.jar"), dir.path().join("mods/b.jar"))
        .unwrap();
    let out = dir.path().join("out.tsv");

    cmd().arg(dir.path().join("mods")).arg(&out).assert().success();

    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with("B\t1.0.0\tp\timport"));
}
