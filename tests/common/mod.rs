use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Writes a jar at `path` whose manifest holds `manifest` verbatim.
pub fn write_bundle(path: &Path, manifest: &str) {
    write_jar(path, &[("META-INF/MANIFEST.MF", manifest), ("x/Y.class", "")]);
}

pub fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    let entries: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, content)| (*name, content.as_bytes()))
        .collect();
    write_jar_bytes(path, &entries);
}

/// Like [`write_jar`], for entries that are not valid UTF-8.
pub fn write_jar_bytes(path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

pub const SAMPLE_MANIFEST: &str = "Manifest-Version: 1.0\r\n\
Bundle-ManifestVersion: 2\r\n\
Bundle-SymbolicName: B\r\n\
Bundle-Version: 1.0\r\n\
Import-Package: p;version=\"[1.0.0,2.0.0)\"\r\n\
Export-Package: p;version=1.0.0;uses:=q\r\n\
\r\n";
