#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_valuetypes::{data::Value, importer::Row};
use tempfile::{TempDir, tempdir};

/// Ten rows covering every built-in value type: `id` and `score` are numeric,
/// `group` repeats two values, `label` is free text and `vector` holds JSON
/// arrays.
pub const MIXED_CSV: &str = "\
id,score,group,label,vector
1,2.5,a,alpha,\"[1,2]\"
2,3.5,b,beta,\"[3,4]\"
3,1.25,a,gamma,\"[5,6]\"
4,9,b,delta,\"[7,8]\"
5,,a,epsilon,\"[9,10]\"
6,4.5,b,zeta,\"[11,12]\"
7,7,a,eta,\"[13,14]\"
8,NaN,b,theta,\"[15,16]\"
9,6,a,iota,\"[17,18]\"
10,0.5,b,kappa,\"[19,20,21]\"
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a file that the test expects a command to create.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Single-column rows of text cells.
pub fn text_column(values: &[&str]) -> Vec<Row> {
    values.iter().map(|v| vec![Value::from(*v)]).collect()
}
