pub mod comments;
pub mod path;

pub use comments::Comments;
pub use path::Path;

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

/// One nesting level of indentation on read and write.
pub const INDENT_UNIT: &str = "  ";
/// Separates a key from its value on an entry line.
pub const VALUE_SEPARATOR: char = ':';
/// First character of a comment line, after trimming.
pub const COMMENT_MARKER: char = '#';

/// Stable handle to a section in a [`SectionTree`].
///
/// Ids are never reused within a tree. A removed section's id keeps
/// pointing at its (now unreachable) arena slot, so a stale id reads
/// stale data rather than aliasing a new section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(usize);

#[derive(Debug, Clone)]
struct SectionNode {
    key: String,
    value: String,
    parent: Option<SectionId>,
    children: IndexMap<String, SectionId>,
    comments: Comments,
}

impl SectionNode {
    fn new(parent: Option<SectionId>, key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            parent,
            children: IndexMap::new(),
            comments: Comments::new(),
        }
    }
}

/// The section tree: an arena of nodes plus a distinguished root.
///
/// The arena owns every node; parent links are plain [`SectionId`]
/// back-handles, so upward navigation needs no shared ownership.
/// Detaching a node from its parent's child map is all removal takes:
/// the subtree just becomes unreachable.
///
/// Sibling order is insertion order (`IndexMap`), which is what the
/// serializer walks. Re-inserting an existing key keeps its position;
/// only [`SectionTree::rename`] deliberately moves a section to the end.
#[derive(Debug, Clone)]
pub struct SectionTree {
    nodes: Vec<SectionNode>,
    root: SectionId,
}

impl SectionTree {
    /// Create a tree holding only a root section with the given key.
    /// The root's value is always empty.
    pub fn new(root_key: &str) -> Self {
        Self {
            nodes: vec![SectionNode::new(None, root_key, "")],
            root: SectionId(0),
        }
    }

    pub fn root(&self) -> SectionId {
        self.root
    }

    /// Drop everything but the root, which keeps its key and comments
    /// are cleared. Used by reload to replace in-memory contents.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.nodes[0].comments.clear();
    }

    pub fn key(&self, id: SectionId) -> &str {
        &self.node(id).key
    }

    pub fn value(&self, id: SectionId) -> &str {
        &self.node(id).value
    }

    /// Set a section's value. Embedded line break runs are escaped to
    /// the two-character sequence `\n` so the value stays one line.
    /// The root's value is always empty; setting it is a no-op.
    pub fn set_value(&mut self, id: SectionId, value: &str) {
        if id == self.root {
            return;
        }
        self.node_mut(id).value = escape_line_breaks(value);
    }

    pub fn comments(&self, id: SectionId) -> &Comments {
        &self.node(id).comments
    }

    pub fn comments_mut(&mut self, id: SectionId) -> &mut Comments {
        &mut self.node_mut(id).comments
    }

    /// The section directly above this one. `None` only for the root.
    pub fn parent(&self, id: SectionId) -> Option<SectionId> {
        self.node(id).parent
    }

    /// Ancestor-chain length up to the root. Drives both parse-time
    /// indentation matching and serialize-time indentation width.
    pub fn count_parents(&self, id: SectionId) -> usize {
        let mut count = 0;
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            count += 1;
            current = parent;
        }
        count
    }

    /// Child ids of a section, in sibling order.
    pub fn children(&self, id: SectionId) -> impl Iterator<Item = SectionId> + '_ {
        self.node(id).children.values().copied()
    }

    pub fn child_count(&self, id: SectionId) -> usize {
        self.node(id).children.len()
    }

    pub fn child_by_key(&self, id: SectionId, key: &str) -> Option<SectionId> {
        self.node(id).children.get(key).copied()
    }

    /// Add a child section with the given key and value. A child with
    /// an equal key is replaced in place (same sibling position).
    pub fn add_child(&mut self, parent: SectionId, key: &str, value: &str) -> SectionId {
        let child = SectionId(self.nodes.len());
        self.nodes.push(SectionNode::new(Some(parent), key, value));
        self.node_mut(parent).children.insert(key.to_string(), child);
        child
    }

    /// Resolve `path` from `from`, one child map at a time. Absent if
    /// any segment is missing. A zero-length path is `from` itself.
    pub fn get(&self, from: SectionId, path: &[&str]) -> Option<SectionId> {
        let mut current = from;
        for key in Path::new(path) {
            current = self.child_by_key(current, key)?;
        }
        Some(current)
    }

    pub fn section_exists(&self, from: SectionId, path: &[&str]) -> bool {
        self.get(from, path).is_some()
    }

    /// Resolve `path` from `from`, creating missing sections along the
    /// way. Intermediate sections are created with an empty value; only
    /// a missing final segment receives `default`. Idempotent: an
    /// existing section's value is never touched, whatever `default` is.
    pub fn get_or_create(&mut self, from: SectionId, path: &[&str], default: &str) -> SectionId {
        let mut current = from;
        let mut path = Path::new(path);
        while let Some(key) = path.next() {
            current = match self.child_by_key(current, key) {
                Some(child) => child,
                None if path.has_next() => self.add_child(current, key, ""),
                None => self.add_child(current, key, default),
            };
        }
        current
    }

    /// Get-or-create, then overwrite the value unconditionally.
    /// Deliberately asymmetric with [`SectionTree::get_or_create`]:
    /// `set` always wins, even over a pre-existing value.
    pub fn set(&mut self, from: SectionId, value: &str, path: &[&str]) {
        let id = self.get_or_create(from, path, value);
        self.set_value(id, value);
    }

    /// Rename the section at `path`. No-op if the path doesn't resolve
    /// or resolves to the root. The renamed section moves to the end of
    /// its parent's sibling order.
    pub fn rename(&mut self, from: SectionId, new_key: &str, path: &[&str]) {
        let Some(id) = self.get(from, path) else {
            return;
        };
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let old_key = self.node(id).key.clone();
        self.node_mut(parent).children.shift_remove(&old_key);
        self.node_mut(parent).children.insert(new_key.to_string(), id);
        self.node_mut(id).key = new_key.to_string();
    }

    /// Detach the section at `path`, and with it its whole subtree.
    /// No-op if the path doesn't resolve or resolves to the root.
    pub fn remove(&mut self, from: SectionId, path: &[&str]) {
        let Some(id) = self.get(from, path) else {
            return;
        };
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let key = self.node(id).key.clone();
        self.node_mut(parent).children.shift_remove(&key);
    }

    /// Deep-copy `src` (key, value, comments, children) into the
    /// children of `new_parent`, keeping the same key. An equally keyed
    /// child of `new_parent` is silently overwritten.
    pub fn copy_to(&mut self, src: SectionId, new_parent: SectionId) -> SectionId {
        let key = self.node(src).key.clone();
        let value = self.node(src).value.clone();
        let copy = self.add_child(new_parent, &key, &value);
        let comments = self.node(src).comments.clone();
        *self.comments_mut(copy) = comments;
        let children: Vec<SectionId> = self.children(src).collect();
        for child in children {
            self.copy_to(child, copy);
        }
        copy
    }

    fn node(&self, id: SectionId) -> &SectionNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: SectionId) -> &mut SectionNode {
        &mut self.nodes[id.0]
    }
}

/// Collapse `[\r\n]+` runs to the literal two characters `\n`.
/// Nothing else is escaped: a literal separator or comment marker in a
/// value survives as-is and will corrupt structure on the next reload.
fn escape_line_breaks(value: &str) -> String {
    static LINE_BREAKS: OnceLock<Regex> = OnceLock::new();
    let re = LINE_BREAKS.get_or_init(|| Regex::new(r"[\r\n]+").expect("invalid line break regex"));
    re.replace_all(value, r"\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> SectionTree {
        let mut tree = SectionTree::new("root");
        let parent = tree.add_child(tree.root(), "parent", "parentvalue");
        tree.add_child(parent, "child", "childvalue");
        tree
    }

    #[test]
    fn get_resolves_nested_path() {
        let tree = sample();
        let child = tree.get(tree.root(), &["parent", "child"]).unwrap();
        assert_eq!("childvalue", tree.value(child));
    }

    #[test]
    fn get_is_absent_when_any_segment_missing() {
        let tree = sample();
        assert_eq!(None, tree.get(tree.root(), &["parent", "nope"]));
        assert_eq!(None, tree.get(tree.root(), &["nope", "child"]));
    }

    #[test]
    fn zero_length_path_is_self() {
        let tree = sample();
        assert_eq!(Some(tree.root()), tree.get(tree.root(), &[]));
    }

    #[test]
    fn get_or_create_fills_intermediates_with_empty_values() {
        let mut tree = SectionTree::new("root");
        let leaf = tree.get_or_create(tree.root(), &["a", "b", "c"], "leafvalue");
        assert_eq!("leafvalue", tree.value(leaf));
        let a = tree.get(tree.root(), &["a"]).unwrap();
        let b = tree.get(tree.root(), &["a", "b"]).unwrap();
        assert_eq!("", tree.value(a));
        assert_eq!("", tree.value(b));
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut tree = SectionTree::new("root");
        let first = tree.get_or_create(tree.root(), &["a", "b"], "first");
        let second = tree.get_or_create(tree.root(), &["a", "b"], "second");
        assert_eq!(first, second);
        assert_eq!("first", tree.value(first));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let mut tree = SectionTree::new("root");
        tree.set(tree.root(), "v1", &["a", "b"]);
        tree.set(tree.root(), "v2", &["a", "b"]);
        let id = tree.get(tree.root(), &["a", "b"]).unwrap();
        assert_eq!("v2", tree.value(id));
    }

    #[test]
    fn root_value_stays_empty() {
        let mut tree = SectionTree::new("root");
        tree.set_value(tree.root(), "ignored");
        assert_eq!("", tree.value(tree.root()));
        // set with a zero-length path targets the root and is equally inert
        tree.set(tree.root(), "ignored", &[]);
        assert_eq!("", tree.value(tree.root()));
    }

    #[test]
    fn set_value_escapes_line_breaks() {
        let mut tree = sample();
        let id = tree.get(tree.root(), &["parent"]).unwrap();
        tree.set_value(id, "one\ntwo\r\nthree");
        assert_eq!(r"one\ntwo\nthree", tree.value(id));
    }

    #[test]
    fn rename_moves_section_to_end_of_siblings() {
        let mut tree = SectionTree::new("root");
        tree.add_child(tree.root(), "first", "");
        tree.add_child(tree.root(), "second", "");
        tree.add_child(tree.root(), "third", "");
        tree.rename(tree.root(), "renamed", &["first"]);

        let keys: Vec<&str> = tree
            .children(tree.root())
            .map(|id| tree.key(id))
            .collect();
        assert_eq!(vec!["second", "third", "renamed"], keys);
    }

    #[test]
    fn rename_on_unresolved_path_is_a_no_op() {
        let mut tree = sample();
        tree.rename(tree.root(), "renamed", &["missing"]);
        assert!(!tree.section_exists(tree.root(), &["renamed"]));
    }

    #[test]
    fn rename_on_root_is_a_no_op() {
        let mut tree = sample();
        tree.rename(tree.root(), "renamed", &[]);
        assert_eq!("root", tree.key(tree.root()));
    }

    #[test]
    fn remove_detaches_whole_subtree() {
        let mut tree = SectionTree::new("root");
        tree.set(tree.root(), "v", &["a", "b", "c"]);
        tree.remove(tree.root(), &["a", "b"]);
        assert!(!tree.section_exists(tree.root(), &["a", "b"]));
        assert!(!tree.section_exists(tree.root(), &["a", "b", "c"]));
        assert!(tree.section_exists(tree.root(), &["a"]));
    }

    #[test]
    fn remove_on_unresolved_path_is_a_no_op() {
        let mut tree = sample();
        tree.remove(tree.root(), &["missing", "path"]);
        assert!(tree.section_exists(tree.root(), &["parent", "child"]));
    }

    #[test]
    fn copy_to_deep_clones_value_comments_and_children() {
        let mut tree = sample();
        let child = tree.get_or_create(tree.root(), &["parent", "child", "grandchild"], "");
        tree.set_value(child, "grandchildvalue");
        let parent = tree.get(tree.root(), &["parent"]).unwrap();
        tree.comments_mut(parent).append("about parent");

        tree.copy_to(parent, tree.root());

        // original subtree remains
        let original = tree.get(tree.root(), &["parent", "child", "grandchild"]).unwrap();
        assert_eq!("grandchildvalue", tree.value(original));
        // ...but "parent" under root was overwritten by its own copy,
        // so the path resolves through the copy now
        let copied = tree.get(tree.root(), &["parent"]).unwrap();
        assert_ne!(parent, copied);
        assert_eq!(
            vec!["about parent".to_string()],
            tree.comments(copied).lines().to_vec()
        );
        let copied_grandchild = tree.get(copied, &["child", "grandchild"]).unwrap();
        assert_eq!("grandchildvalue", tree.value(copied_grandchild));
    }

    #[test]
    fn count_parents_matches_depth() {
        let mut tree = SectionTree::new("root");
        let leaf = tree.get_or_create(tree.root(), &["a", "b", "c"], "");
        assert_eq!(0, tree.count_parents(tree.root()));
        assert_eq!(3, tree.count_parents(leaf));
    }

    #[test]
    fn clear_keeps_root_key_only() {
        let mut tree = sample();
        tree.comments_mut(tree.root()).append("trailing");
        tree.clear();
        assert_eq!("root", tree.key(tree.root()));
        assert_eq!(0, tree.child_count(tree.root()));
        assert!(tree.comments(tree.root()).is_empty());
    }
}
