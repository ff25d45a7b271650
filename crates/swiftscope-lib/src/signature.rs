//! Demangled Swift method signatures.
//!
//! Parses symbol names of the form
//! `dummy.SimpleClass.__allocating_init(first: Swift.Int, second: Swift.Int) -> dummy.SimpleClass`
//! into a base name, argument labels, argument type names and return type
//! name. The mangling grammar itself is never interpreted.

use std::sync::LazyLock;

use regex::Regex;

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<context>.+)\.)?(?P<name>[^.(\s]+)\((?P<args>.*)\)\s*->\s*(?P<ret>\S.*)$")
        .expect("signature pattern is valid")
});

const ALLOCATING_PREFIX: &str = "__allocating_";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    /// Qualified type the method belongs to, e.g. `dummy.SimpleClass`.
    pub context: Option<String>,
    /// Base name with the allocating prefix removed, e.g. `init`.
    pub base_name: String,
    /// Argument labels; `None` for `_`.
    pub labels: Vec<Option<String>>,
    pub arg_type_names: Vec<String>,
    pub return_type_name: String,
}

impl MethodSignature {
    pub fn parse(symbol: &str) -> Option<Self> {
        let captures = SIGNATURE.captures(symbol.trim())?;
        let name = &captures["name"];
        let base_name = name.strip_prefix(ALLOCATING_PREFIX).unwrap_or(name);

        let mut labels = Vec::new();
        let mut arg_type_names = Vec::new();
        for arg in split_top_level(&captures["args"]) {
            let (label, ty) = arg.split_once(':')?;
            let (label, ty) = (label.trim(), ty.trim());
            if label.is_empty() || ty.is_empty() {
                return None;
            }
            labels.push((label != "_").then(|| label.to_owned()));
            arg_type_names.push(ty.to_owned());
        }

        Some(Self {
            context: captures.name("context").map(|m| m.as_str().to_owned()),
            base_name: base_name.to_owned(),
            labels,
            arg_type_names,
            return_type_name: captures["ret"].trim().to_owned(),
        })
    }

    /// Selector the method is looked up by, e.g. `init(first:second:)`.
    pub fn selector(&self) -> String {
        let mut selector = format!("{}(", self.base_name);
        for label in &self.labels {
            selector.push_str(label.as_deref().unwrap_or("_"));
            selector.push(':');
        }
        selector.push(')');
        selector
    }

    pub fn arity(&self) -> usize {
        self.arg_type_names.len()
    }
}

/// Split on commas outside any `()`, `<>` or `[]` nesting.
fn split_top_level(args: &str) -> Vec<&str> {
    if args.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '(' | '<' | '[' => depth += 1,
            ')' | '>' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}
