//! Legacy flat script format
//!
//! Older scripts are plain input lines with a `set stage` / `set rerecords`
//! header and `>startbranch`, `>branch`, `>endbranch` marker lines around
//! alternatives. They are only ever imported: [`legacy_to_markup`] rewrites
//! them as markup which the normal markup parser then reads. The first
//! branch of each group is active.

use std::fmt::Write as _;

use tracing::debug;

use super::markup::{escape, parse_markup};
use super::{FormatImporter, FormatInfo, FormatOptions, FormatResult, ImportedScript};
use crate::core::errors::{EditorError, Result};

/// Whether `content` looks like a legacy script rather than markup
#[must_use]
pub fn is_legacy(content: &str) -> bool {
    super::strip_bom(content)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|first| !first.starts_with('<'))
}

#[derive(Default)]
struct Transcoder {
    out: String,
    pending: Vec<String>,
    depth: usize,
}

impl Transcoder {
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.out.push_str("<inputs>\n");
        for line in self.pending.drain(..) {
            self.out.push_str(&escape(&line));
            self.out.push('\n');
        }
        self.out.push_str("</inputs>\n");
    }

    fn marker(&mut self, number: usize, word: &str, name: &str) -> Result<()> {
        let open_branch = format!("<branch name=\"{}\">\n", escape(name));
        match word {
            "startbranch" => {
                self.flush();
                self.out.push_str("<branches active=\"0\">\n");
                self.out.push_str(&open_branch);
                self.depth += 1;
            }
            "branch" => {
                if self.depth == 0 {
                    return Err(EditorError::format_at(number, ">branch outside >startbranch"));
                }
                self.flush();
                self.out.push_str("</branch>\n");
                self.out.push_str(&open_branch);
            }
            "endbranch" => {
                if self.depth == 0 {
                    return Err(EditorError::format_at(number, ">endbranch without >startbranch"));
                }
                self.flush();
                self.out.push_str("</branch>\n</branches>\n");
                self.depth -= 1;
            }
            other => {
                return Err(EditorError::format_at(
                    number,
                    format!("unknown marker '>{other}'"),
                ));
            }
        }
        Ok(())
    }
}

/// Rewrite a legacy script as markup
///
/// # Errors
/// Returns [`EditorError::InvalidFormat`] for unknown or unbalanced markers
/// and unparsable header values.
pub fn legacy_to_markup(content: &str) -> Result<String> {
    let content = super::strip_bom(content);
    let content = content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content);
    let mut lines = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .peekable();

    let mut stage = String::new();
    let mut rerecords = None;
    while let Some(&(number, line)) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
        } else if let Some(value) = trimmed.strip_prefix("set stage ") {
            stage = value.trim().to_string();
            lines.next();
        } else if let Some(value) = trimmed.strip_prefix("set rerecords ") {
            let count = value.trim().parse::<u32>().map_err(|_| {
                EditorError::format_at(number, format!("invalid rerecord count '{}'", value.trim()))
            })?;
            rerecords = Some(count);
            lines.next();
        } else {
            break;
        }
    }

    let mut transcoder = Transcoder::default();
    let _ = write!(transcoder.out, "<tas stage=\"{}\"", escape(&stage));
    if let Some(count) = rerecords {
        let _ = write!(transcoder.out, " rerecords=\"{count}\"");
    }
    transcoder.out.push_str(">\n");

    let mut markers = 0usize;
    for (number, line) in lines {
        if let Some(marker) = line.trim_start().strip_prefix('>') {
            let marker = marker.trim();
            let (word, name) = marker
                .split_once(char::is_whitespace)
                .map_or((marker, ""), |(word, name)| (word, name.trim()));
            transcoder.marker(number, word, name)?;
            markers += 1;
        } else {
            transcoder.pending.push(line.to_string());
        }
    }
    if transcoder.depth > 0 {
        return Err(EditorError::format(format!(
            "{} unterminated >startbranch",
            transcoder.depth
        )));
    }
    transcoder.flush();
    transcoder.out.push_str("</tas>\n");
    debug!(stage = %stage, markers, "transcoded legacy script");
    Ok(transcoder.out)
}

/// Importer for the legacy flat format
#[derive(Debug)]
pub struct LegacyFormat {
    info: FormatInfo,
}

impl LegacyFormat {
    /// Create the legacy format handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: FormatInfo {
                name: "Legacy TAS".to_string(),
                extensions: vec!["txt".to_string()],
                description: "Flat TAS script with branch markers (import only)".to_string(),
                supports_branches: true,
            },
        }
    }
}

impl Default for LegacyFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatImporter for LegacyFormat {
    fn format_info(&self) -> &FormatInfo {
        &self.info
    }

    fn import_from_string(
        &self,
        content: &str,
        _options: &FormatOptions,
    ) -> Result<(ImportedScript, FormatResult)> {
        let (script, warnings) = parse_markup(&legacy_to_markup(content)?)?;
        let mut result = FormatResult::success(content.lines().count()).with_warnings(warnings);
        result.transcoded = true;
        Ok((script, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::Node;
    use pretty_assertions::assert_eq;

    const LEGACY: &str = "set stage downhill
set rerecords 7

  10,R
>startbranch main
  20,RJ
>branch short cut
  5,L
>endbranch
   3,
";

    #[test]
    fn detects_legacy_scripts() {
        assert!(is_legacy(LEGACY));
        assert!(is_legacy("\n  10,R\n"));
        assert!(!is_legacy("\n  <tas stage=\"x\">\n</tas>\n"));
        assert!(!is_legacy(""));
    }

    #[test]
    fn transcodes_header_lines_and_markers() {
        let markup = legacy_to_markup(LEGACY).unwrap();
        assert_eq!(
            markup,
            "<tas stage=\"downhill\" rerecords=\"7\">
<inputs>
  10,R
</inputs>
<branches active=\"0\">
<branch name=\"main\">
<inputs>
  20,RJ
</inputs>
</branch>
<branch name=\"short cut\">
<inputs>
  5,L
</inputs>
</branch>
</branches>
<inputs>
   3,
</inputs>
</tas>
"
        );
    }

    #[test]
    fn imports_through_markup() {
        let (script, result) = LegacyFormat::new()
            .import_from_string(LEGACY, &FormatOptions::default())
            .unwrap();
        assert!(result.transcoded);
        assert_eq!(script.stage, "downhill");
        assert_eq!(script.rerecords, Some(7));
        assert_eq!(script.root.nodes().len(), 3);
        let Node::BranchPoint(point) = &script.root.nodes()[1] else {
            panic!("expected a branch point");
        };
        assert_eq!(point.active_index(), 0);
        assert_eq!(point.branches()[1].name(), "short cut");
        assert_eq!(script.root.total_frames(), 33);
    }

    #[test]
    fn nested_groups_and_headerless_scripts() {
        let markup = legacy_to_markup(
            ">startbranch\n>startbranch a\n 1,G\n>branch b\n 2,U\n>endbranch\n>endbranch\n",
        )
        .unwrap();
        let (script, warnings) = parse_markup(&markup).unwrap();
        assert_eq!(script.stage, "");
        assert_eq!(script.root.active_text(), " 1,G");
        assert_eq!(warnings.len(), 1);
        let [Node::BranchPoint(point)] = script.root.nodes() else {
            panic!("expected the inner group to survive alone");
        };
        assert_eq!(point.len(), 2);
        assert_eq!(point.branches()[1].name(), "b");
    }

    #[test]
    fn single_alternative_groups_dissolve() {
        let markup =
            legacy_to_markup("  10,R\n>startbranch only\n   5,J\n>endbranch\n   3,L\n").unwrap();
        let (script, warnings) = parse_markup(&markup).unwrap();
        assert_eq!(warnings, vec!["line 5: <branches> with a single <branch> dissolved".to_string()]);
        assert_eq!(script.root.nodes().len(), 1);
        assert_eq!(script.root.active_text(), "  10,R\n   5,J\n   3,L");

        let (alone, _) = parse_markup(&legacy_to_markup(">startbranch only\n  5,J\n>endbranch").unwrap())
            .unwrap();
        assert_eq!(alone.root.nodes().len(), 1);
        assert_eq!(alone.root.active_text(), "  5,J");
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let content = "\u{feff}set stage downhill\n  4,R\n";
        assert!(is_legacy(content));
        let (script, _) = parse_markup(&legacy_to_markup(content).unwrap()).unwrap();
        assert_eq!(script.stage, "downhill");
        assert_eq!(script.root.active_text(), "  4,R");
    }

    #[test]
    fn rejects_unbalanced_markers() {
        for (input, expected) in [
            (">branch\n", "line 1: >branch outside"),
            ("  1,G\n>endbranch\n", "line 2: >endbranch without"),
            (">startbranch\n  1,G\n", "unterminated"),
            (">fork\n", "unknown marker '>fork'"),
            ("set rerecords lots\n", "invalid rerecord count 'lots'"),
        ] {
            let err = legacy_to_markup(input).unwrap_err();
            assert!(err.is_format_error());
            assert!(err.to_string().contains(expected), "{input:?} gave {err}");
        }
    }
}
