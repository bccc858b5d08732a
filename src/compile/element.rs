//! Structured element specifications.
//!
//! Elements are assembled as factory + ordered properties + raw fragments and
//! only turned into launch-line text when displayed, so quoting lives in one
//! place.

use std::fmt;

/// Queue properties used for every buffering element.
pub const QUEUE_PROPS: [(&str, &str); 3] = [
    ("max-size-buffers", "3"),
    ("max-size-time", "100000000"),
    ("leaky", "downstream"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    factory: String,
    props: Vec<(String, PropValue)>,
    fragments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PropValue {
    Plain(String),
    Quoted(String),
}

impl Element {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            props: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// A bounded, downstream-leaky queue.
    pub fn queue() -> Self {
        QUEUE_PROPS
            .iter()
            .fold(Self::new("queue"), |e, (k, v)| e.prop(*k, *v))
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.props
            .push((key.into(), PropValue::Plain(value.to_string())));
        self
    }

    /// Property whose value is always written inside double quotes.
    pub fn quoted_prop(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.props
            .push((key.into(), PropValue::Quoted(value.to_string())));
        self
    }

    /// Verbatim text appended after the properties; blank fragments are dropped.
    pub fn fragment(mut self, raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() {
            self.fragments.push(raw.to_string());
        }
        self
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| match v {
            PropValue::Plain(s) | PropValue::Quoted(s) => s.as_str(),
        })
    }

    pub fn is_queue(&self) -> bool {
        self.factory == "queue"
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &PropValue) -> fmt::Result {
    match value {
        PropValue::Plain(s)
            if !s.is_empty() && !s.contains(char::is_whitespace) && !s.contains('"') =>
        {
            f.write_str(s)
        }
        PropValue::Plain(s) | PropValue::Quoted(s) => {
            write!(f, "\"{}\"", s.replace('"', "\\\""))
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.factory)?;
        for (key, value) in &self.props {
            write!(f, " {}=", key)?;
            write_value(f, value)?;
        }
        for frag in &self.fragments {
            write!(f, " {}", frag)?;
        }
        Ok(())
    }
}
