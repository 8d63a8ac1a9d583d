//! Layout templates
//!
//! A [`Layout`] is compiled once from a template such as `"$time [$level] $logger: $message"`
//! and then renders events to text. Placeholders are `$` followed by lowercase ASCII letters and
//! are looked up in a process-wide part registry:
//!
//! | name         | renders                                       |
//! |--------------|-----------------------------------------------|
//! | `$time`      | current local time, `DD-MM at HHh MMm SSs`    |
//! | `$starttime` | process start time, same form                 |
//! | `$version`   | string set with [`set_version`]               |
//! | `$message`   | event message                                 |
//! | `$logger`    | event logger name                             |
//! | `$level`     | event level, e.g. `Warn`                      |
//! | `$exception` | event exception text, if any                  |
//!
//! An unknown placeholder renders as its bare name, without the `$`. A `$` not followed by a
//! lowercase letter is kept as is. An empty template compiles to the default
//! composite: time, level, logger, message and exception separated by single spaces.

use super::log_event::LogEvent;
use super::timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

const DEFAULT_EXPECTED_LEN: usize = 40;
const MESSAGE_EXPECTED_LEN: usize = 100;
const COMPOSITE_EXPECTED_LEN: usize = 200;

/// A user-defined layout fragment, registered with [`register_part`].
pub trait RenderPart: Send + Sync {
    /// Append this part's contribution. `event` is `None` when a layout is rendered without
    /// an event, as file-path layouts are.
    fn render(&self, event: Option<&LogEvent>, output: &mut String);

    fn expected_len(&self) -> usize {
        DEFAULT_EXPECTED_LEN
    }
}

/// One renderable fragment of a layout.
#[derive(Clone)]
pub enum Part {
    Literal(String),
    Time,
    StartTime,
    Version,
    Message,
    Logger,
    Level,
    Exception,
    /// time + level + logger + message + exception, space-joined
    Default,
    Custom(Arc<dyn RenderPart>),
}

impl Part {
    pub fn expected_len(&self) -> usize {
        match self {
            Part::Literal(text) => text.len(),
            Part::Message => MESSAGE_EXPECTED_LEN,
            Part::Default => COMPOSITE_EXPECTED_LEN,
            Part::Custom(part) => part.expected_len(),
            _ => DEFAULT_EXPECTED_LEN,
        }
    }

    pub fn render(&self, event: Option<&LogEvent>, output: &mut String) {
        match self {
            Part::Literal(text) => output.push_str(text),
            Part::Time => timestamp::format_into(output, &timestamp::now()),
            Part::StartTime => timestamp::format_into(output, &timestamp::process_start_time()),
            Part::Version => output.push_str(&version_cell().read()),
            Part::Message => {
                if let Some(event) = event {
                    output.push_str(&event.message);
                }
            }
            Part::Logger => {
                if let Some(event) = event {
                    output.push_str(&event.logger);
                }
            }
            Part::Level => {
                if let Some(event) = event {
                    output.push_str(event.level.name());
                }
            }
            Part::Exception => {
                if let Some(exception) = event.and_then(|e| e.exception.as_deref()) {
                    output.push_str(exception);
                }
            }
            Part::Default => {
                timestamp::format_into(output, &timestamp::now());
                if let Some(event) = event {
                    output.push(' ');
                    output.push_str(event.level.name());
                    output.push(' ');
                    output.push_str(&event.logger);
                    output.push(' ');
                    output.push_str(&event.message);
                    output.push(' ');
                    if let Some(exception) = &event.exception {
                        output.push_str(exception);
                    }
                }
            }
            Part::Custom(part) => part.render(event, output),
        }
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Part::Time => f.write_str("Time"),
            Part::StartTime => f.write_str("StartTime"),
            Part::Version => f.write_str("Version"),
            Part::Message => f.write_str("Message"),
            Part::Logger => f.write_str("Logger"),
            Part::Level => f.write_str("Level"),
            Part::Exception => f.write_str("Exception"),
            Part::Default => f.write_str("Default"),
            Part::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

type PartFactory = Arc<dyn Fn() -> Part + Send + Sync>;

fn registry() -> &'static RwLock<HashMap<String, PartFactory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, PartFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let builtins: [(&str, Part); 7] = [
            ("time", Part::Time),
            ("starttime", Part::StartTime),
            ("version", Part::Version),
            ("message", Part::Message),
            ("logger", Part::Logger),
            ("level", Part::Level),
            ("exception", Part::Exception),
        ];
        let mut map: HashMap<String, PartFactory> = HashMap::new();
        for (name, part) in builtins {
            map.insert(name.to_string(), Arc::new(move || part.clone()));
        }
        RwLock::new(map)
    })
}

fn version_cell() -> &'static RwLock<String> {
    static VERSION: OnceLock<RwLock<String>> = OnceLock::new();
    VERSION.get_or_init(|| RwLock::new(String::new()))
}

/// Register a named part constructor, replacing any previous one with the same name.
///
/// Only layouts compiled after registration see the new part.
///
/// # Example
///
/// ```
/// use micrologger::core::layout::{register_part, Layout, Part, RenderPart};
/// use micrologger::LogEvent;
/// use std::sync::Arc;
///
/// struct Pid;
///
/// impl RenderPart for Pid {
///     fn render(&self, _event: Option<&LogEvent>, output: &mut String) {
///         output.push_str(&std::process::id().to_string());
///     }
/// }
///
/// register_part("pid", || Part::Custom(Arc::new(Pid)));
/// let layout = Layout::compile("[$pid]");
/// assert_eq!(layout.render(None), format!("[{}]", std::process::id()));
/// ```
pub fn register_part<F>(name: impl Into<String>, factory: F)
where
    F: Fn() -> Part + Send + Sync + 'static,
{
    registry().write().insert(name.into(), Arc::new(factory));
}

/// Set the string `$version` renders.
pub fn set_version(version: impl Into<String>) {
    *version_cell().write() = version.into();
}

/// A compiled, immutable template. Cloning shares the compiled parts.
#[derive(Clone, Debug)]
pub struct Layout {
    parts: Arc<[Part]>,
    estimated_size: usize,
}

impl Layout {
    /// Compile `template`. An empty template yields the default composite layout.
    pub fn compile(template: &str) -> Self {
        if template.is_empty() {
            return Self::from_parts(vec![Part::Default]);
        }

        let registry = registry().read();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(dollar) = rest.find('$') {
            literal.push_str(&rest[..dollar]);
            let after = &rest[dollar + 1..];
            let name_len = after
                .bytes()
                .take_while(|b| b.is_ascii_lowercase())
                .count();

            if name_len == 0 {
                literal.push('$');
                rest = after;
                continue;
            }

            let name = &after[..name_len];
            match registry.get(name) {
                Some(factory) => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(factory());
                }
                None => literal.push_str(name),
            }
            rest = &after[name_len..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Self::from_parts(parts)
    }

    pub fn from_parts(parts: Vec<Part>) -> Self {
        let estimated_size = parts.iter().map(Part::expected_len).sum();
        Self {
            parts: parts.into(),
            estimated_size,
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Sum of the parts' expected lengths; used to pre-size the render buffer.
    pub fn estimated_size(&self) -> usize {
        self.estimated_size
    }

    /// Render left to right into a single string.
    pub fn render(&self, event: Option<&LogEvent>) -> String {
        let mut output = String::with_capacity(self.estimated_size);
        for part in self.parts.iter() {
            part.render(event, &mut output);
        }
        output
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::from_parts(vec![Part::Default])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    fn event() -> LogEvent {
        LogEvent::new("app.db", LogLevel::Warn, "slow query")
    }

    #[test]
    fn test_empty_template_is_default_composite() {
        let layout = Layout::compile("");
        assert!(matches!(layout.parts(), [Part::Default]));
        assert_eq!(layout.estimated_size(), COMPOSITE_EXPECTED_LEN);
    }

    #[test]
    fn test_placeholders_and_literals() {
        let layout = Layout::compile("[$level] $logger: $message");
        let rendered = layout.render(Some(&event()));
        assert_eq!(rendered, "[Warn] app.db: slow query");
        assert_eq!(layout.parts().len(), 6);
    }

    #[test]
    fn test_unknown_placeholder_drops_dollar() {
        let layout = Layout::compile("$nope $message");
        assert_eq!(layout.render(Some(&event())), "nope slow query");
        assert_eq!(Layout::compile("a $bogus b").render(None), "a bogus b");
    }

    #[test]
    fn test_dollar_without_name_is_literal() {
        let layout = Layout::compile("cost: 5$ $Message $");
        assert_eq!(layout.render(Some(&event())), "cost: 5$ $Message $");
    }

    #[test]
    fn test_placeholder_stops_at_non_lowercase() {
        let layout = Layout::compile("$messageX$level");
        assert_eq!(layout.render(Some(&event())), "slow queryXWarn");
    }

    #[test]
    fn test_render_without_event() {
        let layout = Layout::compile("logs/$message$logger$level$exception.log");
        assert_eq!(layout.render(None), "logs/.log");
    }

    #[test]
    fn test_exception_part() {
        let layout = Layout::compile("$message|$exception");
        assert_eq!(layout.render(Some(&event())), "slow query|");

        let failing = event().with_exception("timeout after 30s");
        assert_eq!(layout.render(Some(&failing)), "slow query|timeout after 30s");
    }

    #[test]
    fn test_default_composite_ordering() {
        let rendered = Layout::default().render(Some(&event().with_exception("boom")));
        let (time, rest) = rendered.split_at(20);
        assert!(time.contains(" at "));
        assert_eq!(rest, " Warn app.db slow query boom");
    }

    #[test]
    fn test_default_composite_without_event() {
        let rendered = Layout::default().render(None);
        assert_eq!(rendered.len(), 20);
    }

    #[test]
    fn test_estimated_size_is_only_a_hint() {
        let long = "x".repeat(10_000);
        let layout = Layout::compile("$message");
        let rendered = layout.render(Some(&LogEvent::new("a", LogLevel::Info, long.clone())));
        assert_eq!(rendered, long);
    }

    #[test]
    fn test_custom_part_registration() {
        struct Fixed;
        impl RenderPart for Fixed {
            fn render(&self, _event: Option<&LogEvent>, output: &mut String) {
                output.push_str("node-7");
            }
        }

        register_part("nodeid", || Part::Custom(Arc::new(Fixed)));
        let layout = Layout::compile("$nodeid/$message");
        assert_eq!(layout.render(Some(&event())), "node-7/slow query");
    }
}
