use std::fmt;
use std::io::Read;
use std::path::{Path as FsPath, PathBuf};

use crate::io;
use crate::parsing;
use crate::tree::{COMMENT_MARKER, INDENT_UNIT, SectionId, SectionTree, VALUE_SEPARATOR};

/// A section tree bound 1:1 to a backing file.
///
/// Lifecycle: [`Document::open`] binds the path (creating the file if
/// absent) and loads it; mutate in memory; [`Document::save`] rewrites
/// the file in full. There is no change detection in between; an
/// external edit to the file is silently discarded by the next save.
///
/// Reload and save report plain success/failure; the underlying cause
/// is swallowed. Callers that need causes can use the [`crate::io`]
/// functions directly.
#[derive(Debug, Clone)]
pub struct Document {
    tree: SectionTree,
    file: PathBuf,
}

impl Document {
    /// Bind a document to `path`, creating the file if absent, and load
    /// its contents. A file that cannot be read leaves the tree empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file = path.into();
        let root_key = root_key_for(&file);
        let mut doc = Self {
            tree: SectionTree::new(&root_key),
            file,
        };
        doc.reload();
        doc
    }

    /// The backing file.
    pub fn file(&self) -> &FsPath {
        &self.file
    }

    /// Repoint the backing file without touching in-memory content.
    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.file = path.into();
    }

    /// Replace in-memory contents with the backing file's, creating the
    /// file first if absent. False when the file cannot be read; empty
    /// input is a success that yields an empty tree.
    pub fn reload(&mut self) -> bool {
        if io::ensure_file(&self.file).is_err() {
            return false;
        }
        let lines = match io::load_lines(&self.file) {
            Ok(lines) => lines,
            Err(_) => return false,
        };
        self.reload_from_lines(&lines);
        true
    }

    /// Replace in-memory contents from an already-read line sequence.
    pub fn reload_from_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tree.clear();
        let root = self.tree.root();
        parsing::parse_lines(&mut self.tree, root, lines);
    }

    /// Serialize and rewrite the backing file in full.
    pub fn save(&self) -> bool {
        self.save_lines(&self.lines(), true)
    }

    /// Write the given lines to the backing file. With `overwrite`
    /// false, a non-empty file is left untouched and reported as
    /// failure.
    pub fn save_lines(&self, lines: &[String], overwrite: bool) -> bool {
        io::store_lines(&self.file, lines, overwrite).is_ok()
    }

    /// Copy a raw byte stream over the backing file, same overwrite
    /// rule as [`Document::save_lines`].
    pub fn save_raw(&self, reader: impl Read, overwrite: bool) -> bool {
        io::store_raw(&self.file, reader, overwrite).is_ok()
    }

    /// The serialized line sequence, the pre-join form of `to_string`.
    ///
    /// Depth-first over the root's children; the root itself
    /// contributes no key line. Each top-level section is followed by
    /// one blank separator line. Unattached trailing comments come
    /// last, at depth 0.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for child in self.tree.children(self.tree.root()) {
            self.emit(child, 0, &mut out);
        }
        for comment in self.tree.comments(self.tree.root()) {
            out.push(format!("{COMMENT_MARKER}{comment}"));
        }
        out
    }

    fn emit(&self, id: SectionId, depth: usize, out: &mut Vec<String>) {
        let indent = INDENT_UNIT.repeat(depth);
        for comment in self.tree.comments(id) {
            out.push(format!("{indent}{COMMENT_MARKER}{comment}"));
        }
        out.push(format!(
            "{indent}{}{VALUE_SEPARATOR} {}",
            self.tree.key(id),
            self.tree.value(id)
        ));
        if depth == 0 {
            out.push(String::new()); // separator between top-level sections
        }
        for child in self.tree.children(id) {
            self.emit(child, depth + 1, out);
        }
    }

    pub fn tree(&self) -> &SectionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SectionTree {
        &mut self.tree
    }

    pub fn root(&self) -> SectionId {
        self.tree.root()
    }

    // Root-relative conveniences over the tree operations.

    pub fn get(&self, path: &[&str]) -> Option<SectionId> {
        self.tree.get(self.tree.root(), path)
    }

    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path).map(|id| self.tree.value(id))
    }

    pub fn section_exists(&self, path: &[&str]) -> bool {
        self.get(path).is_some()
    }

    pub fn get_or_create(&mut self, path: &[&str], default: &str) -> SectionId {
        let root = self.tree.root();
        self.tree.get_or_create(root, path, default)
    }

    pub fn set(&mut self, value: &str, path: &[&str]) {
        let root = self.tree.root();
        self.tree.set(root, value, path);
    }

    pub fn rename(&mut self, new_key: &str, path: &[&str]) {
        let root = self.tree.root();
        self.tree.rename(root, new_key, path);
    }

    pub fn remove(&mut self, path: &[&str]) {
        let root = self.tree.root();
        self.tree.remove(root, path);
    }
}

impl fmt::Display for Document {
    /// How the backing file will look after the next save.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// Root key: the file name up to its first dot, or the whole name when
/// there is none.
fn root_key_for(path: &FsPath) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find('.') {
        Some(at) => name[..at].to_string(),
        None => name,
    }
}
