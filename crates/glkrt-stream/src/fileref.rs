#![forbid(unsafe_code)]

//! File references: a resolved path plus usage flags.
//!
//! Filerefs are independent of streams. Opening a file stream reads the path
//! and text mode from a fileref but does not tie the two lifetimes together.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glkrt_core::{
    Dispatch, FilerefId, GlkError, GlkResult, ObjectRef, Registry, Rock, FileUsage,
};
use tempfile::TempPath;

/// One file reference.
#[derive(Debug)]
pub struct Fileref {
    path: PathBuf,
    usage: FileUsage,
    /// Temporary file removed when this fileref is destroyed.
    temp: Option<TempPath>,
}

impl Fileref {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, usage: FileUsage) -> Self {
        Self {
            path: path.into(),
            usage,
            temp: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn usage(&self) -> FileUsage {
        self.usage
    }

    #[must_use]
    pub const fn is_text_mode(&self) -> bool {
        self.usage.text_mode
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

/// Registry of live filerefs.
#[derive(Debug, Default)]
pub struct FilerefRegistry {
    refs: Registry<FilerefId, Fileref>,
}

fn invalid(op: &'static str, id: FilerefId) -> GlkError {
    GlkError::InvalidFileref { op, id: Some(id) }.report()
}

impl FilerefRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &mut self,
        op: &'static str,
        fileref: Fileref,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<FilerefId> {
        let id = self
            .refs
            .insert(rock, fileref)
            .ok_or_else(|| GlkError::invalid_state(op, "fileref ids exhausted").report())?;
        let disprock = dispatch.register(ObjectRef::Fileref(id));
        if let Some(entry) = self.refs.entry_mut(id) {
            entry.disprock = disprock;
        }
        tracing::debug!(target: "glkrt.stream", fileref = %id, rock, "fileref created");
        Ok(id)
    }

    /// Reference an already-resolved path.
    pub fn create_by_path(
        &mut self,
        path: impl Into<PathBuf>,
        usage: FileUsage,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<FilerefId> {
        self.register("fileref_create", Fileref::new(path, usage), rock, dispatch)
    }

    /// Create a fresh empty temporary file, removed on [`destroy`](Self::destroy).
    pub fn create_temp(
        &mut self,
        usage: FileUsage,
        prefix: &str,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<FilerefId> {
        const OP: &str = "fileref_create_temp";
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile()
            .map_err(|source| GlkError::Io { op: OP, source }.report())?;
        let temp = file.into_temp_path();
        let fileref = Fileref {
            path: temp.to_path_buf(),
            usage,
            temp: Some(temp),
        };
        self.register(OP, fileref, rock, dispatch)
    }

    /// Same path as `other`, with new usage flags.
    pub fn create_from(
        &mut self,
        usage: FileUsage,
        other: FilerefId,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<FilerefId> {
        const OP: &str = "fileref_create_from_fileref";
        let path = self.get(OP, other)?.path.clone();
        self.register(OP, Fileref::new(path, usage), rock, dispatch)
    }

    pub fn destroy(&mut self, id: FilerefId, dispatch: &mut Dispatch) -> GlkResult<()> {
        let entry = self
            .refs
            .remove(id)
            .ok_or_else(|| invalid("fileref_destroy", id))?;
        dispatch.unregister(ObjectRef::Fileref(id), entry.disprock);
        tracing::debug!(
            target: "glkrt.stream",
            fileref = %id,
            temporary = entry.value.is_temporary(),
            "fileref destroyed"
        );
        Ok(())
    }

    pub fn get(&self, op: &'static str, id: FilerefId) -> GlkResult<&Fileref> {
        self.refs.get(id).ok_or_else(|| invalid(op, id))
    }

    pub fn get_rock(&self, id: FilerefId) -> GlkResult<Rock> {
        self.refs
            .rock(id)
            .ok_or_else(|| invalid("fileref_get_rock", id))
    }

    #[must_use]
    pub fn iterate(&self, after: Option<FilerefId>) -> Option<(FilerefId, Rock)> {
        self.refs.iterate(after)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn does_file_exist(&self, id: FilerefId) -> GlkResult<bool> {
        Ok(self.get("fileref_does_file_exist", id)?.path.exists())
    }

    /// Delete the referenced file. A file that is already gone is not an error.
    pub fn delete_file(&self, id: FilerefId) -> GlkResult<()> {
        const OP: &str = "fileref_delete_file";
        let fileref = self.get(OP, id)?;
        match std::fs::remove_file(&fileref.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(GlkError::Io { op: OP, source }.report()),
        }
    }

    /// Register every live fileref with a newly installed hook.
    pub fn register_all(&mut self, dispatch: &mut Dispatch) {
        for id in self.refs.ids().into_iter().rev() {
            let disprock = dispatch.register(ObjectRef::Fileref(id));
            if let Some(entry) = self.refs.entry_mut(id) {
                entry.disprock = disprock;
            }
        }
    }

    /// Destroy every fileref.
    pub fn reset(&mut self, dispatch: &mut Dispatch) {
        for (id, entry) in self.refs.drain() {
            dispatch.unregister(ObjectRef::Fileref(id), entry.disprock);
        }
    }
}
