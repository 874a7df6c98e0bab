//! Test fixtures: a throwaway build root with source trees in it.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::core::layout::Layout;
use crate::core::manifest::Manifest;

/// A temporary build root.
pub struct BuildRoot {
    // Held so the directory lives as long as the fixture
    _tmp: TempDir,
    layout: Layout,
}

impl Default for BuildRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildRoot {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let layout = Layout::new(tmp.path());
        BuildRoot { _tmp: tmp, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        self.layout.root()
    }

    /// Create `External/<library>/<version>` with a `CMakeLists.txt`.
    pub fn add_source(&self, library: &str, version: &str) -> &Self {
        self.add_file(
            library,
            version,
            "CMakeLists.txt",
            &format!("project({} VERSION {})\n", library, version),
        )
    }

    /// Write a file inside a library's source tree.
    pub fn add_file(&self, library: &str, version: &str, relative: &str, contents: &str) -> &Self {
        let path = self.layout.source_dir(library, version).join(relative);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create source dir");
        fs::write(&path, contents).expect("write source file");
        self
    }

    /// Write `BuildConfig.yaml` and parse it.
    pub fn manifest(&self, yaml: &str) -> Manifest {
        fs::write(self.layout.manifest_path(), yaml).expect("write manifest");
        Manifest::load(&self.layout.manifest_path()).expect("parse manifest")
    }
}
