//! Unit tests for aggregation services.


use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tempfile::TempDir;

/// Temporary `data/` and `output/` layout.
pub(super) struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir(root.path().join("data")).expect("data dir");
        std::fs::create_dir(root.path().join("output")).expect("output dir");
        Self { root }
    }

    pub fn data_path(&self) -> std::path::PathBuf {
        self.root.path().join("data")
    }

    pub fn output_path(&self) -> std::path::PathBuf {
        self.root.path().join("output")
    }

    pub fn data_dir(&self) -> Dir {
        open(&self.data_path())
    }

    pub fn output_dir(&self) -> Dir {
        open(&self.output_path())
    }

    pub fn write_source(&self, file: &str, contents: &str) {
        std::fs::write(self.data_path().join(file), contents).expect("source written");
    }
}

fn open(path: &std::path::Path) -> Dir {
    let utf8 = Utf8Path::from_path(path).expect("temp path is UTF-8");
    Dir::open_ambient_dir(utf8, ambient_authority()).expect("directory opens")
}
