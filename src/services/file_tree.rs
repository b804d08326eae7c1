// src/services/file_tree.rs

//! File listing reconstruction.
//!
//! The file block of a topic page is a nest of lists: a list item with the
//! `head` class labels the group that follows it, other list items are files
//! written as `"<name> (<size> <unit>)"`. The markup is flattened into a tag
//! sequence, rebuilt into a typed tree with an explicit stack, then flattened
//! into `/`-separated paths.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};

use crate::models::FileEntry;
use crate::utils::normalize_whitespace;

const LABEL_CLASS: &str = "head";

static LEAF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.*?)\s*\((\d+(?:\.\d+)?)\s*([KMG]B)\)").expect("valid leaf pattern")
});

/// One element of the flattened file block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileToken {
    /// A list opens
    Open,
    /// The current list closes
    Close,
    /// Directory label for the next list at this level
    Label(String),
    /// A file line
    Leaf(String),
}

/// Reconstructed file tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FileNode {
    Directory { name: String, children: Vec<FileNode> },
    Leaf { name: String, size_bytes: u64 },
}

/// Flatten a file block element into tokens, in document order.
pub fn tokenize(root: ElementRef<'_>) -> Vec<FileToken> {
    let mut tokens = Vec::new();
    push_tokens(root, &mut tokens);
    tokens
}

fn push_tokens(parent: ElementRef<'_>, tokens: &mut Vec<FileToken>) {
    for child in parent.children().filter_map(ElementRef::wrap) {
        let element = child.value();
        if element.classes().any(|c| c == LABEL_CLASS) {
            tokens.push(FileToken::Label(normalize_whitespace(&own_text(child))));
            continue;
        }
        match element.name() {
            "ul" | "ol" => {
                tokens.push(FileToken::Open);
                push_tokens(child, tokens);
                tokens.push(FileToken::Close);
            }
            "li" => {
                tokens.push(FileToken::Leaf(normalize_whitespace(&own_text(child))));
                // lists nested inside the item
                push_tokens(child, tokens);
            }
            _ => push_tokens(child, tokens),
        }
    }
}

/// Text of an element, excluding any nested lists.
fn own_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for child in element.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if matches!(e.name(), "ul" | "ol") => {}
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    text.push_str(&own_text(el));
                }
            }
            _ => {}
        }
    }
    text
}

struct Frame {
    name: Option<String>,
    children: Vec<FileNode>,
    pending_label: Option<String>,
}

impl Frame {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            children: Vec::new(),
            pending_label: None,
        }
    }

    /// Attach a closed frame to this one. Unlabeled groups have no
    /// directory of their own, so their children join the parent.
    fn adopt(&mut self, closed: Frame) {
        match closed.name {
            Some(name) => self.children.push(FileNode::Directory {
                name,
                children: closed.children,
            }),
            None => self.children.extend(closed.children),
        }
    }
}

/// Rebuild the tree from a token sequence.
///
/// Unbalanced sequences are tolerated: stray closes are ignored and groups
/// left open at the end are closed implicitly.
pub fn build_tree(tokens: &[FileToken]) -> Vec<FileNode> {
    let mut stack = vec![Frame::new(None)];

    for token in tokens {
        match token {
            FileToken::Open => {
                let name = stack
                    .last_mut()
                    .and_then(|top| top.pending_label.take())
                    .filter(|label| !label.is_empty());
                stack.push(Frame::new(name));
            }
            FileToken::Close => {
                if stack.len() > 1 {
                    if let (Some(closed), Some(parent)) = (stack.pop(), stack.last_mut()) {
                        parent.adopt(closed);
                    }
                }
            }
            FileToken::Label(text) => {
                if let Some(top) = stack.last_mut() {
                    top.pending_label = Some(text.clone());
                }
            }
            FileToken::Leaf(text) => {
                let Some(top) = stack.last_mut() else {
                    continue;
                };
                // a label only names the group directly after it
                top.pending_label = None;
                if let Some(node) = parse_leaf(text) {
                    top.children.push(node);
                }
            }
        }
    }

    while stack.len() > 1 {
        if let (Some(closed), Some(parent)) = (stack.pop(), stack.last_mut()) {
            parent.adopt(closed);
        }
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

/// Parse `"<name> (<size> <unit>)"` into a leaf node.
pub fn parse_leaf(text: &str) -> Option<FileNode> {
    let caps = LEAF_PATTERN.captures(text)?;
    let name = caps[1].trim();
    if name.is_empty() {
        return None;
    }
    let size: f64 = caps[2].parse().ok()?;
    let multiplier: f64 = match &caps[3] {
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(FileNode::Leaf {
        name: name.to_string(),
        size_bytes: (size * multiplier).round() as u64,
    })
}

/// Flatten the tree into file entries. Nested directories come before the
/// files of their parent; repeated paths keep their first occurrence.
pub fn flatten(nodes: &[FileNode]) -> Vec<FileEntry> {
    let mut entries = Vec::new();
    flatten_into(nodes, "", &mut entries);

    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.path.clone()));
    entries
}

fn flatten_into(nodes: &[FileNode], prefix: &str, out: &mut Vec<FileEntry>) {
    for node in nodes {
        if let FileNode::Directory { name, children } = node {
            flatten_into(children, &format!("{prefix}{name}/"), out);
        }
    }
    for node in nodes {
        if let FileNode::Leaf { name, size_bytes } = node {
            out.push(FileEntry {
                path: format!("{prefix}{name}"),
                size_bytes: *size_bytes,
            });
        }
    }
}

/// Extract the file list from a file block element.
pub fn build_file_list(root: ElementRef<'_>) -> Vec<FileEntry> {
    flatten(&build_tree(&tokenize(root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn files_of(html: &str) -> Vec<FileEntry> {
        let document = Html::parse_fragment(html);
        let selector = Selector::parse("#files").unwrap();
        let root = document.select(&selector).next().unwrap();
        build_file_list(root)
    }

    fn entry(path: &str, size_bytes: u64) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            size_bytes,
        }
    }

    #[test]
    fn test_leaf_under_labeled_directory() {
        let files = files_of(
            r#"<div id="files"><ul>
                <li class="head"><i class="flaticon-folder"></i>Season1</li>
                <ul><li><i class="flaticon-file"></i>Episode1 (1.5 GB)</li></ul>
            </ul></div>"#,
        );
        assert_eq!(files, vec![entry("Season1/Episode1", 1_610_612_736)]);
    }

    #[test]
    fn test_flat_list_without_label() {
        let files = files_of(
            r#"<div id="files"><ul>
                <li>movie.mkv (700 MB)</li>
                <li>sample.txt (12 KB)</li>
            </ul></div>"#,
        );
        assert_eq!(
            files,
            vec![entry("movie.mkv", 700 * 1024 * 1024), entry("sample.txt", 12 * 1024)]
        );
    }

    #[test]
    fn test_nested_directories_come_first() {
        let files = files_of(
            r#"<div id="files">
                <div class="head">Show</div>
                <ul>
                    <li>readme.nfo (1 KB)</li>
                    <li class="head">Subs</li>
                    <ul><li>en.srt (40 KB)</li></ul>
                </ul>
            </div>"#,
        );
        assert_eq!(
            files,
            vec![entry("Show/Subs/en.srt", 40 * 1024), entry("Show/readme.nfo", 1024)]
        );
    }

    #[test]
    fn test_unparseable_leaves_are_dropped() {
        let files = files_of(
            r#"<div id="files"><ul>
                <li>no size here</li>
                <li>weird (12 TB)</li>
                <li>ok.mkv (2 GB)</li>
            </ul></div>"#,
        );
        assert_eq!(files, vec![entry("ok.mkv", 2 * 1024 * 1024 * 1024)]);
    }

    #[test]
    fn test_name_with_parentheses_keeps_year() {
        let node = parse_leaf("Some Movie (2020).mkv (1.4 GB)").unwrap();
        assert_eq!(
            node,
            FileNode::Leaf {
                name: "Some Movie (2020).mkv".into(),
                size_bytes: (1.4f64 * 1024.0 * 1024.0 * 1024.0).round() as u64,
            }
        );
    }

    #[test]
    fn test_duplicate_paths_keep_first() {
        let tree = vec![
            FileNode::Leaf { name: "a.mkv".into(), size_bytes: 1 },
            FileNode::Leaf { name: "a.mkv".into(), size_bytes: 2 },
        ];
        assert_eq!(flatten(&tree), vec![entry("a.mkv", 1)]);
    }

    #[test]
    fn test_unbalanced_tokens_are_tolerated() {
        let tokens = vec![
            FileToken::Close,
            FileToken::Label("Dir".into()),
            FileToken::Open,
            FileToken::Leaf("x.bin (1 KB)".into()),
        ];
        assert_eq!(flatten(&build_tree(&tokens)), vec![entry("Dir/x.bin", 1024)]);
    }

    #[test]
    fn test_label_only_applies_at_its_level() {
        let tokens = vec![
            FileToken::Open,
            FileToken::Label("Lost".into()),
            FileToken::Close,
            FileToken::Open,
            FileToken::Leaf("y.bin (1 KB)".into()),
            FileToken::Close,
        ];
        assert_eq!(flatten(&build_tree(&tokens)), vec![entry("y.bin", 1024)]);
    }

    #[test]
    fn test_label_separated_by_leaf_is_dropped() {
        let tokens = vec![
            FileToken::Open,
            FileToken::Label("Dir".into()),
            FileToken::Leaf("a.bin (1 KB)".into()),
            FileToken::Open,
            FileToken::Leaf("b.bin (1 KB)".into()),
            FileToken::Close,
            FileToken::Close,
        ];
        assert_eq!(
            flatten(&build_tree(&tokens)),
            vec![entry("b.bin", 1024), entry("a.bin", 1024)]
        );
    }

    #[test]
    fn test_label_before_label_is_replaced() {
        let files = files_of(
            r#"<div id="files"><ul>
                <li class="head">Stale</li>
                <li class="head">Extras</li>
                <ul><li>clip.mp4 (2 MB)</li></ul>
                <li>readme.txt (1 KB)</li>
            </ul></div>"#,
        );
        assert_eq!(
            files,
            vec![entry("Extras/clip.mp4", 2 * 1024 * 1024), entry("readme.txt", 1024)]
        );
    }
}
