//! Directory-backed file browser, the storage-card analogue from the
//! original firmware.

/// Lists and opens files in a flat root directory by a stable 1-based
/// index, the way the original SD-card browser walked a FAT root
/// directory entry by entry.
pub trait StorageBrowser {
    type File;

    /// Print `[<id>] <name> (<bytes>)` for every non-directory entry
    /// under the root, followed by `** EOF **`.
    fn list(&mut self);

    /// Open the `file_id`-th non-directory entry (1-based). `file_id ==
    /// 0` returns the currently open file, if any, unchanged. An
    /// out-of-range id prints `File <id> does not exist.` and returns
    /// `None`.
    fn open(&mut self, file_id: u32) -> Option<&mut Self::File>;
}

#[cfg(feature = "std")]
pub mod fs_browser {
    use super::StorageBrowser;
    use std::fs::{self, File};
    use std::path::PathBuf;

    pub struct FsStorageBrowser {
        root: PathBuf,
        current: Option<File>,
    }

    impl FsStorageBrowser {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            FsStorageBrowser {
                root: root.into(),
                current: None,
            }
        }

        fn entries(&self) -> Vec<(String, u64)> {
            let mut out = Vec::new();
            if let Ok(dir) = fs::read_dir(&self.root) {
                for entry in dir.flatten() {
                    if let Ok(meta) = entry.metadata() {
                        if meta.is_file() {
                            out.push((entry.file_name().to_string_lossy().into_owned(), meta.len()));
                        }
                    }
                }
            }
            out
        }
    }

    impl StorageBrowser for FsStorageBrowser {
        type File = File;

        fn list(&mut self) {
            for (id, (name, size)) in self.entries().into_iter().enumerate() {
                tracing::info!("[{}] {} ({})", id + 1, name, size);
            }
            tracing::info!("** EOF **");
        }

        fn open(&mut self, file_id: u32) -> Option<&mut File> {
            if file_id == 0 {
                return self.current.as_mut();
            }
            let entries = self.entries();
            match entries.get(file_id as usize - 1) {
                Some((name, _)) => {
                    let path = self.root.join(name);
                    match File::open(&path) {
                        Ok(f) => {
                            self.current = Some(f);
                            self.current.as_mut()
                        }
                        Err(_) => {
                            tracing::warn!("File {} does not exist.", file_id);
                            None
                        }
                    }
                }
                None => {
                    tracing::warn!("File {} does not exist.", file_id);
                    None
                }
            }
        }
    }
}
