//! Markdown import and export.
//!
//! Only block structure survives the trip: headings, paragraphs, list items
//! (flattened, one block per item), code blocks and block quotes. Inline
//! markup is reduced to its text, inline code keeps its backticks. Thematic
//! breaks are dropped. Paragraph and list item text is escaped on export so
//! it reads back as the same block.

use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::models::{BlockType, Document, HeadingLevel, ModelError, NodeId, NodeKind, Schema};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document structure: {0}")]
    Model(#[from] ModelError),
}

/// A leaf block being collected from parser events.
struct Leaf {
    block_type: BlockType,
    text: String,
}

/// Build a document from markdown text.
pub fn parse_markdown(markdown: &str, schema: Schema) -> Result<Document, ModelError> {
    let mut doc = Document::new(schema);
    let mut containers = vec![doc.root()];
    let mut leaf: Option<Leaf> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Paragraph) => match leaf.as_mut() {
                // Loose list items wrap their text in paragraphs
                Some(open) => {
                    if !open.text.is_empty() {
                        open.text.push('\n');
                    }
                }
                None => leaf = Some(new_leaf(BlockType::Paragraph)),
            },
            Event::End(TagEnd::Paragraph) => {
                if leaf.as_ref().is_some_and(|l| l.block_type.is_paragraph()) {
                    flush(&mut doc, &containers, &mut leaf)?;
                }
            }
            Event::Start(Tag::Heading { level, .. }) => {
                flush_nested(&mut doc, &containers, &mut leaf)?;
                let level = HeadingLevel::clamped(level as u8);
                leaf = Some(new_leaf(BlockType::Heading(level)));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_nested(&mut doc, &containers, &mut leaf)?;
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                leaf = Some(new_leaf(BlockType::CodeBlock { language }));
            }
            Event::Start(Tag::HtmlBlock) => {
                flush_nested(&mut doc, &containers, &mut leaf)?;
                leaf = Some(new_leaf(BlockType::Paragraph));
            }
            Event::Start(Tag::BlockQuote(_)) => {
                flush_nested(&mut doc, &containers, &mut leaf)?;
                let parent = current(&containers, &doc);
                containers.push(doc.append_container(parent)?);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                flush(&mut doc, &containers, &mut leaf)?;
                if containers.len() > 1 {
                    containers.pop();
                }
            }
            Event::Start(Tag::List(_)) => flush(&mut doc, &containers, &mut leaf)?,
            Event::Start(Tag::Item) => {
                flush(&mut doc, &containers, &mut leaf)?;
                leaf = Some(new_leaf(BlockType::ListItem));
            }
            Event::End(
                TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::HtmlBlock | TagEnd::Item,
            ) => flush(&mut doc, &containers, &mut leaf)?,
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                if let Some(open) = leaf.as_mut() {
                    open.text.push_str(&text);
                }
            }
            Event::Code(code) => {
                if let Some(open) = leaf.as_mut() {
                    open.text.push('`');
                    open.text.push_str(&code);
                    open.text.push('`');
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(open) = leaf.as_mut() {
                    open.text.push('\n');
                }
            }
            _ => {}
        }
    }
    flush(&mut doc, &containers, &mut leaf)?;

    log::debug!("Parsed markdown into {} block(s)", doc.blocks().len());
    Ok(doc)
}

fn new_leaf(block_type: BlockType) -> Leaf {
    Leaf {
        block_type,
        text: String::new(),
    }
}

fn current(containers: &[NodeId], doc: &Document) -> NodeId {
    containers.last().copied().unwrap_or_else(|| doc.root())
}

/// Flush before a block nested in the open leaf. A list item holding
/// nothing but that block gives way to it instead of becoming an empty item.
fn flush_nested(
    doc: &mut Document,
    containers: &[NodeId],
    leaf: &mut Option<Leaf>,
) -> Result<(), ModelError> {
    if leaf
        .as_ref()
        .is_some_and(|open| open.block_type == BlockType::ListItem && open.text.is_empty())
    {
        *leaf = None;
    }
    flush(doc, containers, leaf)
}

fn flush(
    doc: &mut Document,
    containers: &[NodeId],
    leaf: &mut Option<Leaf>,
) -> Result<(), ModelError> {
    if let Some(Leaf { block_type, text }) = leaf.take() {
        let parent = current(containers, doc);
        let text = text.trim_end_matches('\n').to_string();
        doc.append_block(parent, block_type, text)?;
    }
    Ok(())
}

/// Render a document back to markdown.
pub fn to_markdown(doc: &Document) -> String {
    let mut out = render_children(doc, doc.root());
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_children(doc: &Document, container: NodeId) -> String {
    let Some(node) = doc.node(container) else {
        return String::new();
    };

    let mut out = String::new();
    let mut previous_was_item = false;
    for (index, &child) in node.children().iter().enumerate() {
        let Some(child_node) = doc.node(child) else {
            continue;
        };
        let is_item = matches!(child_node.block_type(), Some(BlockType::ListItem));
        if index > 0 {
            // Consecutive list items form one tight list
            out.push_str(if previous_was_item && is_item { "\n" } else { "\n\n" });
        }
        out.push_str(&render_node(doc, child));
        previous_was_item = is_item;
    }
    out
}

fn render_node(doc: &Document, id: NodeId) -> String {
    let Some(node) = doc.node(id) else {
        return String::new();
    };

    match node.kind() {
        NodeKind::Root => render_children(doc, id),
        NodeKind::BlockQuote => render_children(doc, id)
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        NodeKind::Block(BlockType::Paragraph) => escape_lines(node.text()).join("\n"),
        NodeKind::Block(BlockType::Heading(level)) => {
            format!("{} {}", "#".repeat(level.get() as usize), node.text())
        }
        NodeKind::Block(BlockType::ListItem) => {
            format!("- {}", escape_lines(node.text()).join("\n  "))
        }
        NodeKind::Block(BlockType::CodeBlock { language }) => {
            let fence = code_fence(node.text());
            format!(
                "{fence}{}\n{}\n{fence}",
                language.as_deref().unwrap_or(""),
                node.text()
            )
        }
    }
}

/// Escape each line of block text so it reads back as the same text inside
/// one paragraph or list item.
///
/// A blank line becomes a lone backslash (a hard break) so it does not end
/// the block. Leading whitespace is written as character references, and a
/// line starting like a heading, list, quote, fence or setext underline gets
/// its marker backslash-escaped.
fn escape_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(escape_line).collect()
}

fn escape_line(line: &str) -> String {
    if line.is_empty() {
        return "\\".to_string();
    }

    let body = line.trim_start_matches([' ', '\t']);
    let mut out: String = line[..line.len() - body.len()]
        .chars()
        .map(|c| if c == '\t' { "&#9;" } else { "&#32;" })
        .collect();
    let body = body.replace('\\', "\\\\");

    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    match body.chars().next() {
        Some('#' | '-' | '*' | '+' | '=' | '_' | '>') => out.push('\\'),
        Some('`' | '~') if body.starts_with("```") || body.starts_with("~~~") => out.push('\\'),
        Some(_) if (1..=9).contains(&digits) && body[digits..].starts_with(['.', ')']) => {
            out.push_str(&body[..digits]);
            out.push('\\');
            out.push_str(&body[digits..]);
            return out;
        }
        _ => {}
    }
    out.push_str(&body);
    out
}

/// A backtick fence longer than any backtick run inside `text`.
fn code_fence(text: &str) -> String {
    let longest = text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// Read and parse a markdown file.
pub fn read_document(path: &Path, schema: Schema) -> Result<Document, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(parse_markdown(&content, schema)?)
}

/// Render `doc` and write it to `path`, creating parent directories.
pub fn write_document(path: &Path, doc: &Document) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_markdown(doc))?;
    Ok(())
}
