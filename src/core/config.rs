//! XML configuration reader
//!
//! A configuration document holds one or more `microlog` blocks, at any depth, each with
//! `target` children:
//!
//! ```xml
//! <configuration>
//!   <microlog asyncflushtime="100" async="true">
//!     <target type="file" minlevel="warn" file="logs/$starttime.log" layout="$time $message"/>
//!   </microlog>
//!   <microlog>
//!     <target type="console" minlevel="info"/>
//!   </microlog>
//! </configuration>
//! ```
//!
//! Parsing stops at the structural level: attributes are handed to target factories untouched
//! (apart from XML unescaping) as [`ConfigNode`]s.

use super::error::{LoggerError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::time::Duration;

pub const BLOCK_ELEMENT: &str = "microlog";
pub const TARGET_ELEMENT: &str = "target";

/// Default async flush interval in milliseconds
pub const DEFAULT_ASYNC_FLUSH_MS: u64 = 50;
pub const MIN_ASYNC_FLUSH_MS: u64 = 50;
pub const MAX_ASYNC_FLUSH_MS: u64 = 20_000;

/// One element of the configuration document with its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigNode {
    name: String,
    attributes: HashMap<String, String>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attr_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.attr(key).unwrap_or(default)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    fn from_start(element: &BytesStart<'_>) -> Result<Self> {
        let mut node = ConfigNode::new(String::from_utf8_lossy(element.name().as_ref()));
        for attr in element.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            node.attributes.insert(key, value);
        }
        Ok(node)
    }
}

/// A `microlog` element and its `target` lines, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBlock {
    pub node: ConfigNode,
    pub targets: Vec<ConfigNode>,
}

impl ConfigBlock {
    /// The block's `asyncflushtime`, clamped to 50..=20000 ms. Unparsable values clamp up to
    /// the minimum.
    pub fn async_flush_time(&self) -> Duration {
        let millis = match self.node.attr("asyncflushtime") {
            None => DEFAULT_ASYNC_FLUSH_MS,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .unwrap_or(0)
                .clamp(MIN_ASYNC_FLUSH_MS as i64, MAX_ASYNC_FLUSH_MS as i64)
                as u64,
        };
        Duration::from_millis(millis)
    }

    pub fn is_async(&self) -> bool {
        self.node.attr_or("async", "false").eq_ignore_ascii_case("true")
    }
}

/// Parse a configuration document into its blocks.
///
/// Fails on malformed XML, on unbalanced elements and on a document without a root element.
/// A well-formed document without any `microlog` block yields an empty list.
pub fn parse_document(xml: &str) -> Result<Vec<ConfigBlock>> {
    let mut reader = Reader::from_str(xml);
    let mut blocks: Vec<ConfigBlock> = Vec::new();
    // open elements, with the block index for `microlog` ones
    let mut open: Vec<(String, Option<usize>)> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                saw_root = true;
                let node = ConfigNode::from_start(&element)?;
                let name = node.name.clone();
                let block = accept_node(node, &open, &mut blocks);
                open.push((name, block));
            }
            Event::Empty(element) => {
                saw_root = true;
                let node = ConfigNode::from_start(&element)?;
                accept_node(node, &open, &mut blocks);
            }
            Event::End(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                match open.pop() {
                    Some((expected, _)) if expected == name => {}
                    Some((expected, _)) => {
                        return Err(LoggerError::config(
                            BLOCK_ELEMENT,
                            format!("expected </{}>, found </{}>", expected, name),
                        ));
                    }
                    None => {
                        return Err(LoggerError::config(
                            BLOCK_ELEMENT,
                            format!("unexpected </{}>", name),
                        ));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((name, _)) = open.last() {
        return Err(LoggerError::config(
            BLOCK_ELEMENT,
            format!("unclosed element '{}'", name),
        ));
    }
    if !saw_root {
        return Err(LoggerError::config(BLOCK_ELEMENT, "document has no root element"));
    }

    Ok(blocks)
}

fn accept_node(
    node: ConfigNode,
    open: &[(String, Option<usize>)],
    blocks: &mut Vec<ConfigBlock>,
) -> Option<usize> {
    if node.name == BLOCK_ELEMENT {
        blocks.push(ConfigBlock {
            node,
            targets: Vec::new(),
        });
        return Some(blocks.len() - 1);
    }

    if node.name == TARGET_ELEMENT {
        if let Some((_, Some(block))) = open.last() {
            blocks[*block].targets.push(node);
        }
    }
    None
}
