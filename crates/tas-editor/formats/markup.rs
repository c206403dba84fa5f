//! Structural markup reader and writer
//!
//! The markup is line oriented: every tag sits on its own line, optionally
//! indented, and the lines between `<inputs>` and `</inputs>` are one
//! segment's text, verbatim apart from entity escaping. Export followed by
//! import reproduces the tree exactly and export is byte-for-byte stable.
//!
//! A `<branches>` block holding a single `<branch>` is not a branch point:
//! its nodes are spliced into the enclosing run, joined onto neighbouring
//! segment text the same way dissolving a branch point joins them.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::{FormatExporter, FormatImporter, FormatInfo, FormatOptions, FormatResult, ImportedScript};
use crate::core::document::ScriptDocument;
use crate::core::errors::{EditorError, Result};
use crate::core::tree::{Branch, BranchPoint, Node, Segment};

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r#"^\s*<(/?)([A-Za-z]+)((?:\s+[A-Za-z_]+\s*=\s*"[^"]*")*)\s*>\s*$"#)
            .expect("tag pattern is valid")
    })
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_]+)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid")
    })
}

/// Escape `&`, `<`, `>`, `"` and carriage returns as XML entities
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inverse of [`escape`]; unknown entities are kept as written
#[must_use]
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#13;", "\r")
        .replace("&amp;", "&")
}

/// One parsed tag line
struct Tag<'a> {
    closing: bool,
    name: &'a str,
    attributes: Vec<(&'a str, String)>,
}

impl<'a> Tag<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let captures = tag_regex().captures(line)?;
        let attributes = captures.get(3).map_or_else(Vec::new, |raw| {
            attribute_regex()
                .captures_iter(raw.as_str())
                .filter_map(|attr| {
                    let key = attr.get(1)?.as_str();
                    let value = attr.get(2)?.as_str();
                    Some((key, unescape(value)))
                })
                .collect()
        });
        Some(Self {
            closing: !captures[1].is_empty(),
            name: captures.get(2)?.as_str(),
            attributes,
        })
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    fn warn_unknown(&self, known: &[&str], line: usize, warnings: &mut Vec<String>) {
        for (key, _) in &self.attributes {
            if !known.contains(key) {
                warn!(line, element = self.name, attribute = *key, "unknown attribute ignored");
                warnings.push(format!(
                    "line {line}: unknown attribute '{key}' on <{}>",
                    self.name
                ));
            }
        }
    }
}

/// Open element on the parse stack
enum Frame {
    /// `<tas>` or `<branch>`: a run of nodes
    Nodes {
        element: &'static str,
        name: String,
        nodes: Vec<Node>,
        /// The last node came from a dissolved `<branches>` block and the
        /// next segment joins onto it
        seam: bool,
    },
    /// `<branches>`: alternatives of one branch point
    Branches {
        opened_at: usize,
        active: usize,
        branches: Vec<Branch>,
    },
}

#[derive(Default)]
struct Parser {
    stage: Option<String>,
    rerecords: Option<u32>,
    stack: Vec<Frame>,
    inputs: Option<Vec<String>>,
    root: Option<Branch>,
    warnings: Vec<String>,
}

impl Parser {
    fn feed(&mut self, number: usize, line: &str) -> Result<()> {
        if let Some(inputs) = self.inputs.as_mut() {
            if line.trim() == "</inputs>" {
                let text = inputs.join("\n");
                self.inputs = None;
                return self.push_node(number, Node::Segment(Segment::new(text)));
            }
            inputs.push(unescape(line));
            return Ok(());
        }

        if line.trim().is_empty() {
            return Ok(());
        }
        if self.stack.is_empty() && self.root.is_none() && is_prolog(line) {
            return Ok(());
        }
        let tag = Tag::parse(line)
            .ok_or_else(|| EditorError::format_at(number, "expected a tag line"))?;
        if self.root.is_some() {
            return Err(EditorError::format_at(number, "content after </tas>"));
        }
        if self.stack.is_empty() && !(tag.name == "tas" && !tag.closing) {
            return Err(EditorError::format_at(number, "document must start with <tas>"));
        }
        if tag.closing && !tag.attributes.is_empty() {
            return Err(EditorError::format_at(
                number,
                format!("closing tag </{}> cannot carry attributes", tag.name),
            ));
        }

        match (tag.closing, tag.name) {
            (false, "tas") => self.open_tas(number, &tag),
            (false, "inputs") => {
                self.expect_nodes(number, "inputs")?;
                tag.warn_unknown(&[], number, &mut self.warnings);
                self.inputs = Some(Vec::new());
                Ok(())
            }
            (false, "branches") => self.open_branches(number, &tag),
            (false, "branch") => self.open_branch(number, &tag),
            (true, "branch") => self.close_branch(number),
            (true, "branches") => self.close_branches(number),
            (true, "tas") => self.close_tas(number),
            (true, "inputs") => Err(EditorError::format_at(number, "</inputs> without <inputs>")),
            (_, other) => Err(EditorError::format_at(
                number,
                format!("unknown element <{other}>"),
            )),
        }
    }

    fn open_tas(&mut self, number: usize, tag: &Tag<'_>) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(EditorError::format_at(number, "nested <tas>"));
        }
        tag.warn_unknown(&["stage", "rerecords"], number, &mut self.warnings);
        let stage = tag
            .attribute("stage")
            .ok_or_else(|| EditorError::format_at(number, "<tas> requires a stage attribute"))?;
        self.stage = Some(stage.to_string());
        self.rerecords = tag
            .attribute("rerecords")
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    EditorError::format_at(number, format!("invalid rerecord count '{raw}'"))
                })
            })
            .transpose()?;
        self.stack.push(Frame::Nodes {
            element: "tas",
            name: String::new(),
            nodes: Vec::new(),
            seam: false,
        });
        Ok(())
    }

    fn open_branches(&mut self, number: usize, tag: &Tag<'_>) -> Result<()> {
        self.expect_nodes(number, "branches")?;
        tag.warn_unknown(&["active"], number, &mut self.warnings);
        let active = match tag.attribute("active") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                EditorError::format_at(number, format!("invalid active branch '{raw}'"))
            })?,
            None => 0,
        };
        self.stack.push(Frame::Branches {
            opened_at: number,
            active,
            branches: Vec::new(),
        });
        Ok(())
    }

    fn open_branch(&mut self, number: usize, tag: &Tag<'_>) -> Result<()> {
        if !matches!(self.stack.last(), Some(Frame::Branches { .. })) {
            return Err(EditorError::format_at(number, "<branch> outside <branches>"));
        }
        tag.warn_unknown(&["name"], number, &mut self.warnings);
        self.stack.push(Frame::Nodes {
            element: "branch",
            name: tag.attribute("name").unwrap_or_default().to_string(),
            nodes: Vec::new(),
            seam: false,
        });
        Ok(())
    }

    fn close_branch(&mut self, number: usize) -> Result<()> {
        let Some(Frame::Nodes {
            element: "branch",
            name,
            nodes,
            ..
        }) = self.stack.pop()
        else {
            return Err(EditorError::format_at(number, "</branch> without <branch>"));
        };
        match self.stack.last_mut() {
            Some(Frame::Branches { branches, .. }) => {
                branches.push(Branch::new(name, nodes));
                Ok(())
            }
            _ => Err(EditorError::format_at(number, "</branch> outside <branches>")),
        }
    }

    fn close_branches(&mut self, number: usize) -> Result<()> {
        let Some(Frame::Branches {
            opened_at,
            active,
            branches,
        }) = self.stack.pop()
        else {
            return Err(EditorError::format_at(number, "</branches> without <branches>"));
        };
        let mut point = BranchPoint::new(branches, active)
            .map_err(|err| EditorError::format_at(opened_at, err))?;
        if point.len() > 1 {
            return self.push_node(number, Node::BranchPoint(point));
        }

        debug!(line = opened_at, "single-branch <branches> dissolved");
        self.warnings.push(format!(
            "line {opened_at}: <branches> with a single <branch> dissolved"
        ));
        let incoming = point
            .branches_mut()
            .pop()
            .map(|mut sole| std::mem::take(sole.nodes_mut()))
            .unwrap_or_default();
        let Some(Frame::Nodes { nodes, seam, .. }) = self.stack.last_mut() else {
            return Err(EditorError::format_at(number, "node outside <tas> or <branch>"));
        };
        if incoming.is_empty() {
            return Ok(());
        }
        let mut join = true;
        for node in incoming {
            append_node(nodes, node, join);
            join = false;
        }
        *seam = matches!(nodes.last(), Some(Node::Segment(_)));
        Ok(())
    }

    fn close_tas(&mut self, number: usize) -> Result<()> {
        if self.stack.len() != 1 {
            return Err(EditorError::format_at(number, "</tas> with unclosed elements"));
        }
        let Some(Frame::Nodes { nodes, .. }) = self.stack.pop() else {
            return Err(EditorError::format_at(number, "</tas> without <tas>"));
        };
        self.root = Some(Branch::new(String::new(), nodes));
        Ok(())
    }

    fn expect_nodes(&self, number: usize, element: &str) -> Result<()> {
        match self.stack.last() {
            Some(Frame::Nodes { .. }) => Ok(()),
            _ => Err(EditorError::format_at(
                number,
                format!("<{element}> must sit inside <tas> or <branch>"),
            )),
        }
    }

    fn push_node(&mut self, number: usize, node: Node) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Nodes { nodes, seam, .. }) => {
                append_node(nodes, node, std::mem::take(seam));
                Ok(())
            }
            _ => Err(EditorError::format_at(number, "node outside <tas> or <branch>")),
        }
    }

    fn finish(self) -> Result<(ImportedScript, Vec<String>)> {
        if self.inputs.is_some() {
            return Err(EditorError::format("unterminated <inputs>"));
        }
        let (Some(root), Some(stage)) = (self.root, self.stage) else {
            return Err(EditorError::format("missing </tas>"));
        };
        Ok((
            ImportedScript {
                stage,
                rerecords: self.rerecords,
                root,
            },
            self.warnings,
        ))
    }
}

/// Push `node`, joining it onto a trailing segment when `join` is set and
/// both are segments
fn append_node(nodes: &mut Vec<Node>, node: Node, join: bool) {
    if join {
        if let (Some(Node::Segment(prev)), Node::Segment(next)) = (nodes.last_mut(), &node) {
            let text = prev.text_mut();
            text.push('\n');
            text.push_str(next.text());
            return;
        }
    }
    nodes.push(node);
}

/// An `<?xml ...?>` style declaration line
fn is_prolog(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("<?") && line.ends_with("?>")
}

/// Parse markup text into a script
///
/// Returns the script and any warnings about ignored attributes or
/// dissolved single-branch blocks.
///
/// # Errors
/// Returns [`EditorError::InvalidFormat`] naming the offending line.
pub fn parse_markup(text: &str) -> Result<(ImportedScript, Vec<String>)> {
    let text = super::strip_bom(text);
    let mut parser = Parser::default();
    for (index, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        parser.feed(index + 1, line)?;
    }
    parser.finish()
}

/// Render a script tree as markup
#[must_use]
pub fn write_markup(stage: &str, rerecords: Option<u32>, root: &Branch, indent_tags: bool) -> String {
    let mut writer = Writer {
        out: String::new(),
        indent_tags,
    };
    let mut header = format!("<tas stage=\"{}\"", escape(stage));
    if let Some(count) = rerecords {
        header.push_str(&format!(" rerecords=\"{count}\""));
    }
    header.push('>');
    writer.tag(0, &header);
    writer.nodes(1, root.nodes());
    writer.tag(0, "</tas>");
    writer.out
}

struct Writer {
    out: String,
    indent_tags: bool,
}

impl Writer {
    fn tag(&mut self, depth: usize, tag: &str) {
        if self.indent_tags {
            for _ in 0..depth {
                self.out.push_str("  ");
            }
        }
        self.out.push_str(tag);
        self.out.push('\n');
    }

    fn nodes(&mut self, depth: usize, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Segment(segment) => {
                    self.tag(depth, "<inputs>");
                    for line in segment.lines() {
                        self.out.push_str(&escape(line));
                        self.out.push('\n');
                    }
                    self.tag(depth, "</inputs>");
                }
                Node::BranchPoint(point) => {
                    self.tag(
                        depth,
                        &format!("<branches active=\"{}\">", point.active_index()),
                    );
                    for branch in point.branches() {
                        self.tag(
                            depth + 1,
                            &format!("<branch name=\"{}\">", escape(branch.name())),
                        );
                        self.nodes(depth + 2, branch.nodes());
                        self.tag(depth + 1, "</branch>");
                    }
                    self.tag(depth, "</branches>");
                }
            }
        }
    }
}

/// The native structural markup format
#[derive(Debug)]
pub struct MarkupFormat {
    info: FormatInfo,
}

impl MarkupFormat {
    /// Create the markup format handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: FormatInfo {
                name: "TAS Markup".to_string(),
                extensions: vec!["tas".to_string(), "xml".to_string()],
                description: "Branching TAS script markup".to_string(),
                supports_branches: true,
            },
        }
    }
}

impl Default for MarkupFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatImporter for MarkupFormat {
    fn format_info(&self) -> &FormatInfo {
        &self.info
    }

    fn import_from_string(
        &self,
        content: &str,
        options: &FormatOptions,
    ) -> Result<(ImportedScript, FormatResult)> {
        let content = super::strip_bom(content);
        let transcoded = options.legacy_detection && super::is_legacy(content);
        let (script, warnings) = if transcoded {
            debug!("legacy script detected, transcoding");
            parse_markup(&super::legacy_to_markup(content)?)?
        } else {
            parse_markup(content)?
        };
        debug!(
            stage = %script.stage,
            frames = script.root.total_frames(),
            warnings = warnings.len(),
            "imported script"
        );
        let mut result = FormatResult::success(content.lines().count()).with_warnings(warnings);
        result.transcoded = transcoded;
        Ok((script, result))
    }
}

impl FormatExporter for MarkupFormat {
    fn format_info(&self) -> &FormatInfo {
        &self.info
    }

    fn export_to_string(&self, document: &ScriptDocument, options: &FormatOptions) -> String {
        write_markup(
            document.stage(),
            document.rerecords(),
            document.root(),
            options.indent_tags,
        )
    }
}
