//! Property access normalization pass.
//!
//! Rewrites computed member access with a string key that is a valid plain
//! identifier into dot access:
//!
//! ```text
//! console["log"](x)   ->   console.log(x)
//! obj["1go"]          ->   obj["1go"]      (not an identifier)
//! ```
//!
//! Only ASCII identifiers are considered. Reserved words are accepted, since
//! they are valid property names after a dot.

use std::sync::LazyLock;

use regex::Regex;
use swc_core::ecma::{
    ast::{Expr, IdentName, Lit, MemberExpr, MemberProp, Script},
    visit::{VisitMut, VisitMutWith},
};

use crate::deobfuscation::{
    changes::{EventKind, EventLog},
    pass::ScriptPass,
    passes::utils::unparen,
    state::IterationState,
};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// Returns `true` if `key` can be written after a dot.
#[must_use]
pub fn is_dot_accessible(key: &str) -> bool {
    IDENTIFIER.is_match(key)
}

/// Converts `obj["name"]` into `obj.name`.
pub struct PropertyAccessNormalizationPass;

impl Default for PropertyAccessNormalizationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyAccessNormalizationPass {
    /// Creates a new property access normalization pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScriptPass for PropertyAccessNormalizationPass {
    fn name(&self) -> &'static str {
        "property_access_normalization"
    }

    fn description(&self) -> &'static str {
        "Rewrite computed string-keyed member access as dot access"
    }

    fn run(&self, script: &mut Script, _state: &IterationState<'_>) -> EventLog {
        let events = EventLog::new();
        script.visit_mut_with(&mut Normalizer {
            events: &events,
            pass: self.name(),
        });
        events
    }
}

struct Normalizer<'a> {
    events: &'a EventLog,
    pass: &'static str,
}

impl VisitMut for Normalizer<'_> {
    fn visit_mut_member_expr(&mut self, member: &mut MemberExpr) {
        member.visit_mut_children_with(self);

        let MemberProp::Computed(computed) = &member.prop else {
            return;
        };
        let Expr::Lit(Lit::Str(key)) = unparen(&computed.expr) else {
            return;
        };
        if !is_dot_accessible(&key.value) {
            return;
        }

        let name = IdentName::new(key.value.clone(), computed.span);
        self.events
            .record(EventKind::PropertyNormalized)
            .message(format!("[{:?}] -> .{}", &*key.value, name.sym))
            .pass(self.pass);
        member.prop = MemberProp::Ident(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deobfuscation::passes::testing::{apply, canonical};

    #[test]
    fn test_identifier_keys() {
        assert!(is_dot_accessible("go"));
        assert!(is_dot_accessible("_private9"));
        assert!(is_dot_accessible("class"));
        assert!(!is_dot_accessible("1go"));
        assert!(!is_dot_accessible("has-dash"));
        assert!(!is_dot_accessible(""));
        assert!(!is_dot_accessible("$jq"));
        assert!(!is_dot_accessible("caf\u{e9}"));
    }

    #[test]
    fn test_normalizes_identifier_keys() {
        let (code, events) = apply(
            &PropertyAccessNormalizationPass::new(),
            r#"obj["go"](); obj["1go"] = a["b"]["c"]; x[("y")];"#,
        );
        assert_eq!(
            code,
            canonical(r#"obj.go(); obj["1go"] = a.b.c; x.y;"#)
        );
        assert_eq!(events.count_kind(EventKind::PropertyNormalized), 4);
    }

    #[test]
    fn test_leaves_non_string_keys() {
        let source = "a[0]; a[b]; a[`t`]; a.c;";
        let (code, events) = apply(&PropertyAccessNormalizationPass::new(), source);
        assert_eq!(code, canonical(source));
        assert!(events.is_empty());
    }
}
