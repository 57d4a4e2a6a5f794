//! Operation signature parsing and heuristic call matching
//!
//! Probes report operations as free-form signature strings such as
//! `public static void shop.Cart.add(int, java.lang.String)`. This module
//! splits them into the fully-qualified class name and a structured
//! [`Signature`] so that two differently spelled references to the same
//! operation can be compared.
//!
//! # Constructor normalisation
//!
//! Constructor signatures carry no return type and name the class itself:
//! `public shop.Cart(int)` or `public shop.Cart.<init>(int)`. When parsed with
//! `java_constructor = true`, both forms yield class `shop.Cart` and operation
//! name `Cart`, so a call marker and the constructor's own before-event agree.
//!
//! # Example
//!
//! ```
//! use flowtrace::signature::ClassOperationSignaturePair;
//!
//! let pair = ClassOperationSignaturePair::split("public static void shop.Cart.add(int, String)", false);
//! assert_eq!(pair.fq_class_name, "shop.Cart");
//! assert_eq!(pair.signature.name, "add");
//! assert_eq!(pair.signature.modifiers, vec!["public", "static"]);
//! assert_eq!(pair.signature.return_type.as_deref(), Some("void"));
//! assert_eq!(pair.signature.param_types, vec!["int", "String"]);
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Keywords treated as modifiers rather than return types
const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
    "native",
    "transient",
    "volatile",
    "strictfp",
    "default",
];

/// Structured operation signature (without the owning class)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub modifiers: Vec<String>,
    pub return_type: Option<String>,
    pub param_types: Vec<String>,
}

impl Signature {
    pub fn new(
        name: &str,
        modifiers: &[&str],
        return_type: Option<&str>,
        param_types: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            modifiers: modifiers.iter().map(|s| s.to_string()).collect(),
            return_type: return_type.map(str::to_string),
            param_types: param_types.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{} ", modifier)?;
        }
        if let Some(return_type) = &self.return_type {
            write!(f, "{} ", return_type)?;
        }
        write!(f, "{}({})", self.name, self.param_types.join(", "))
    }
}

/// Fully-qualified class name plus the signature of one of its operations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassOperationSignaturePair {
    pub fq_class_name: String,
    pub signature: Signature,
}

fn signature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<head>[^(]*)(?:\((?P<params>.*)\))?[^()]*$")
            .expect("signature pattern is a valid regex")
    })
}

impl ClassOperationSignaturePair {
    /// Split an operation signature string into class name and signature
    ///
    /// Strings that do not look like signatures at all (unbalanced
    /// parentheses) are treated as a bare operation name.
    pub fn split(operation_signature: &str, java_constructor: bool) -> Self {
        let (head, params) = match signature_pattern().captures(operation_signature) {
            Some(caps) => (
                caps.name("head").map_or("", |m| m.as_str()),
                caps.name("params").map_or("", |m| m.as_str()),
            ),
            None => (operation_signature.trim(), ""),
        };

        let param_types: Vec<String> = params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        let mut tokens: Vec<&str> = head.split_whitespace().collect();
        let qualified_name = tokens.pop().unwrap_or("");

        let return_type = if java_constructor {
            None
        } else {
            match tokens.last() {
                Some(last) if !MODIFIERS.contains(last) => tokens.pop().map(str::to_string),
                _ => None,
            }
        };
        let modifiers = tokens.into_iter().map(str::to_string).collect();

        let (fq_class_name, name) = if java_constructor {
            let class_name = match qualified_name.rsplit_once('.') {
                Some((prefix, "<init>")) | Some((prefix, "new")) => prefix,
                _ => qualified_name,
            };
            let simple = class_name.rsplit('.').next().unwrap_or(class_name);
            (class_name.to_string(), simple.to_string())
        } else {
            match qualified_name.rsplit_once('.') {
                Some((prefix, name)) => (prefix.to_string(), name.to_string()),
                None => (String::new(), qualified_name.to_string()),
            }
        };

        Self {
            fq_class_name,
            signature: Signature {
                name,
                modifiers,
                return_type,
                param_types,
            },
        }
    }

    /// Package part of the class name (empty for the default package)
    pub fn package_name(&self) -> &str {
        self.fq_class_name
            .rsplit_once('.')
            .map_or("", |(package, _)| package)
    }

    /// Class name without its package
    pub fn simple_class_name(&self) -> &str {
        self.fq_class_name
            .rsplit_once('.')
            .map_or(self.fq_class_name.as_str(), |(_, simple)| simple)
    }
}

/// Heuristic call detection
///
/// True if the callee named by a call marker and the operation named by a
/// before-event normalise to the same [`Signature`] and refer to the same
/// class. `java_constructor` enables constructor normalisation for both
/// sides.
///
/// ```
/// use flowtrace::signature::signatures_match;
///
/// // Declared vs. runtime modifiers differ textually but parse identically
/// assert!(signatures_match("public shop.Cart(int)", "shop.Cart", "public shop.Cart.<init>(int)", "shop.Cart", true));
/// assert!(!signatures_match("void a.A.run()", "a.A", "void a.A.run()", "a.B", false));
/// ```
pub fn signatures_match(
    callee_operation: &str,
    callee_class: &str,
    operation: &str,
    class: &str,
    java_constructor: bool,
) -> bool {
    if callee_class != class {
        return false;
    }
    let callee = ClassOperationSignaturePair::split(callee_operation, java_constructor);
    let own = ClassOperationSignaturePair::split(operation, java_constructor);
    callee.signature == own.signature
}
