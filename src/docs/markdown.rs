//! Heading-delimited segmentation of markdown documents.
//!
//! Every ATX or setext heading opens a section. The section body is built
//! from the block content up to the next heading:
//! - top-level paragraphs become their text
//! - lists become one `- item` line per item (nested items included)
//! - code blocks are kept fenced
//! - block quotes, tables and raw HTML are ignored
//!
//! Text before the first heading belongs to no section.

use pulldown_cmark::{Event, Options, Parser, Tag};

use super::record::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Heading,
    Paragraph,
    List,
    Item,
    Code,
    Inline,
    Skip,
}

struct OpenSection {
    heading: String,
    level: u8,
    blocks: Vec<String>,
}

impl OpenSection {
    fn finish(self) -> Section {
        Section {
            heading: self.heading,
            level: self.level,
            body: self.blocks.join("\n\n"),
        }
    }
}

/// Splits `text` into sections in document order. No length filtering is
/// applied here.
pub fn segment(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<OpenSection> = None;

    let mut frames: Vec<Frame> = Vec::new();
    let mut heading_buf = String::new();
    let mut heading_level = 0u8;
    let mut paragraph_buf = String::new();
    let mut code_buf = String::new();
    let mut item_stack: Vec<String> = Vec::new();
    let mut list_lines: Vec<String> = Vec::new();

    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);

    for event in parser {
        let skipping = frames.contains(&Frame::Skip);

        match event {
            Event::Start(tag) => {
                let frame = match tag {
                    Tag::Heading { level, .. } => {
                        heading_buf.clear();
                        heading_level = level as u8;
                        Frame::Heading
                    }
                    Tag::Paragraph => Frame::Paragraph,
                    Tag::List(_) => Frame::List,
                    Tag::Item => {
                        if let Some(parent) = item_stack.last_mut() {
                            if !parent.trim().is_empty() {
                                list_lines.push(format!("- {}", parent.trim()));
                                parent.clear();
                            }
                        }
                        item_stack.push(String::new());
                        Frame::Item
                    }
                    Tag::CodeBlock(_) => {
                        code_buf.clear();
                        Frame::Code
                    }
                    Tag::Emphasis | Tag::Strong | Tag::Strikethrough => Frame::Inline,
                    Tag::Link { .. } | Tag::Image { .. } => Frame::Inline,
                    _ => Frame::Skip,
                };
                frames.push(frame);
            }
            Event::End(_) => {
                let Some(frame) = frames.pop() else {
                    continue;
                };
                let still_skipping = frames.contains(&Frame::Skip);

                match frame {
                    Frame::Heading => {
                        if let Some(open) = current.take() {
                            sections.push(open.finish());
                        }
                        current = Some(OpenSection {
                            heading: collapse_whitespace(&heading_buf),
                            level: heading_level,
                            blocks: Vec::new(),
                        });
                        heading_buf.clear();
                    }
                    Frame::Paragraph => {
                        if let Some(item) = item_stack.last_mut() {
                            item.push(' ');
                        } else if !still_skipping {
                            let paragraph = paragraph_buf.trim().to_string();
                            if let (Some(open), false) = (current.as_mut(), paragraph.is_empty()) {
                                open.blocks.push(paragraph);
                            }
                        }
                        paragraph_buf.clear();
                    }
                    Frame::Item => {
                        if let Some(item) = item_stack.pop() {
                            let item = collapse_whitespace(&item);
                            if !item.is_empty() {
                                list_lines.push(format!("- {}", item));
                            }
                        }
                    }
                    Frame::List => {
                        if !frames.contains(&Frame::List) {
                            if let (Some(open), false) = (current.as_mut(), list_lines.is_empty()) {
                                if !still_skipping {
                                    open.blocks.push(list_lines.join("\n"));
                                }
                            }
                            list_lines.clear();
                            item_stack.clear();
                        }
                    }
                    Frame::Code => {
                        let code = code_buf.trim();
                        if let Some(item) = item_stack.last_mut() {
                            item.push(' ');
                            item.push_str(code);
                        } else if !still_skipping && !code.is_empty() {
                            if let Some(open) = current.as_mut() {
                                open.blocks.push(format!("```\n{}\n```", code));
                            }
                        }
                        code_buf.clear();
                    }
                    Frame::Inline | Frame::Skip => {}
                }
            }
            Event::Text(text) | Event::Code(text) => {
                let target = text_target(&frames, skipping, !item_stack.is_empty());
                match target {
                    Some(Frame::Heading) => heading_buf.push_str(&text),
                    Some(Frame::Code) => code_buf.push_str(&text),
                    Some(Frame::Item) => {
                        if let Some(item) = item_stack.last_mut() {
                            item.push_str(&text);
                        }
                    }
                    Some(Frame::Paragraph) => paragraph_buf.push_str(&text),
                    _ => {}
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                match text_target(&frames, skipping, !item_stack.is_empty()) {
                    Some(Frame::Heading) => heading_buf.push(' '),
                    Some(Frame::Item) => {
                        if let Some(item) = item_stack.last_mut() {
                            item.push(' ');
                        }
                    }
                    Some(Frame::Paragraph) => paragraph_buf.push(' '),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if let Some(open) = current.take() {
        sections.push(open.finish());
    }

    sections
}

/// Decides which buffer receives inline text for the current frame stack.
fn text_target(frames: &[Frame], skipping: bool, in_item: bool) -> Option<Frame> {
    if frames.contains(&Frame::Heading) {
        return Some(Frame::Heading);
    }
    if skipping {
        return None;
    }
    if frames.contains(&Frame::Code) && !in_item {
        return Some(Frame::Code);
    }
    if in_item {
        return Some(Frame::Item);
    }
    if frames.contains(&Frame::Paragraph) {
        return Some(Frame::Paragraph);
    }
    None
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
