//! Markdown rendering of the final context document.
//!
//! Rendering is a pure function of the decisions, the tree, the budget
//! summary and [`RenderOptions`]: identical inputs give byte-identical
//! output.

pub mod lang;

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::select::{Decision, DecisionMode};
use crate::tree::{EntryKind, EntryStatus, RepositoryTree, TreeNode};

pub use lang::{format_bytes, guess_language};

/// Presentation switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// List ignored and extension-filtered entries in the tree.
    pub show_ignored: bool,
    /// Pre-formatted generation time for the line under the title.
    pub timestamp: Option<String>,
}

/// Budget figures shown in the overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetSummary {
    pub consumed: usize,
    pub limit: usize,
    pub scheme: String,
    /// Counts came from the character estimate.
    pub approximate: bool,
}

/// One part of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Header(String),
    Overview(String),
    Tree(String),
    File { path: String, body: String },
}

impl Section {
    pub fn body(&self) -> &str {
        match self {
            Section::Header(s) | Section::Overview(s) | Section::Tree(s) => s,
            Section::File { body, .. } => body,
        }
    }
}

/// The rendered document, in section order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    sections: Vec<Section>,
}

impl ContextDocument {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Sections joined by blank lines.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(section.body());
        }
        out
    }
}

/// Renders decisions and the tree to Markdown.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn render(
        &self,
        decisions: &[Decision],
        tree: &RepositoryTree,
        budget: &BudgetSummary,
    ) -> ContextDocument {
        let modes: HashMap<&str, DecisionMode> = decisions
            .iter()
            .map(|d| (d.path.as_str(), d.mode))
            .collect();

        let mut sections = vec![
            Section::Header(self.header(tree)),
            Section::Overview(overview(decisions, tree, budget)),
            Section::Tree(self.tree_section(tree, &modes)),
        ];
        sections.extend(
            decisions
                .iter()
                .filter(|d| d.mode != DecisionMode::Skipped)
                .map(|d| Section::File {
                    path: d.path.clone(),
                    body: file_section(d),
                }),
        );
        ContextDocument { sections }
    }

    fn header(&self, tree: &RepositoryTree) -> String {
        let mut out = format!("# Repository context: {}\n", tree.root_name());
        if let Some(ref ts) = self.options.timestamp {
            let _ = writeln!(out, "_Generated {ts}_");
        }
        out
    }

    fn tree_section(&self, tree: &RepositoryTree, modes: &HashMap<&str, DecisionMode>) -> String {
        let mut listing = format!("{}/\n", tree.root_name());
        let roots: Vec<&TreeNode> = tree.roots().filter(|n| self.visible(n)).collect();
        self.draw(tree, &roots, "", modes, &mut listing);

        let fence = fence_for(&listing);
        format!("## File tree\n\n{fence}text\n{listing}{fence}\n")
    }

    fn draw(
        &self,
        tree: &RepositoryTree,
        nodes: &[&TreeNode],
        prefix: &str,
        modes: &HashMap<&str, DecisionMode>,
        out: &mut String,
    ) {
        for (i, node) in nodes.iter().enumerate() {
            let last = i + 1 == nodes.len();
            let branch = if last { "└── " } else { "├── " };
            let _ = write!(out, "{prefix}{branch}{}", node.name);
            match node.kind {
                EntryKind::Directory => {
                    out.push('/');
                    if node.status != EntryStatus::Candidate {
                        let _ = write!(out, " [{}]", node.status);
                    }
                }
                EntryKind::File => {
                    let label = match node.status {
                        EntryStatus::Candidate => modes.get(node.rel.as_str()).map(|m| m.as_str()),
                        other => Some(other.as_str()),
                    };
                    if let Some(label) = label {
                        let _ = write!(out, " [{label}]");
                    }
                }
            }
            out.push('\n');

            let children: Vec<&TreeNode> =
                tree.children(node).filter(|c| self.visible(c)).collect();
            if !children.is_empty() {
                let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
                self.draw(tree, &children, &nested, modes, out);
            }
        }
    }

    fn visible(&self, node: &TreeNode) -> bool {
        self.options.show_ignored || !node.status.is_hidden_by_default()
    }
}

fn overview(decisions: &[Decision], tree: &RepositoryTree, budget: &BudgetSummary) -> String {
    let count = |mode: DecisionMode| decisions.iter().filter(|d| d.mode == mode).count();
    let mut out = String::from("## Overview\n\n");
    let _ = writeln!(out, "- Files included in full: {}", count(DecisionMode::Full));
    let _ = writeln!(out, "- Files truncated: {}", count(DecisionMode::Truncated));
    let _ = writeln!(out, "- Files summarized: {}", count(DecisionMode::Summarized));
    let _ = writeln!(out, "- Files skipped: {}", count(DecisionMode::Skipped));
    let _ = writeln!(
        out,
        "- Files listed only (binary, too large, unreadable): {}",
        tree.count_files(EntryStatus::Binary)
            + tree.count_files(EntryStatus::TooLarge)
            + tree.count_files(EntryStatus::Unreadable)
    );
    let approx = if budget.approximate { ", approximate" } else { "" };
    let _ = writeln!(
        out,
        "- Tokens: {} / {} ({}{approx})",
        budget.consumed, budget.limit, budget.scheme
    );
    out
}

fn file_section(d: &Decision) -> String {
    let mut out = format!("## {}\n\n", d.path);
    let _ = writeln!(
        out,
        "- Mode: {} | Tokens: {} | Size: {}\n",
        d.mode,
        d.tokens,
        format_bytes(d.size)
    );
    match d.mode {
        DecisionMode::Truncated => {
            let _ = writeln!(
                out,
                "> Truncated: kept {} of {} lines.\n",
                d.kept_lines, d.original_lines
            );
        }
        DecisionMode::Summarized => {
            let _ = writeln!(
                out,
                "> Summary generated by a language model; the file content is not included.\n"
            );
        }
        DecisionMode::Full | DecisionMode::Skipped => {}
    }

    let info = if d.mode == DecisionMode::Summarized {
        "text"
    } else {
        d.language
    };
    let fence = fence_for(&d.text);
    let _ = writeln!(out, "{fence}{info}");
    out.push_str(&d.text);
    if !d.text.is_empty() && !d.text.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{fence}");
    out
}

/// A backtick fence longer than any backtick run in `content`.
pub fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
