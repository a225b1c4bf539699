//! Transform units: the rewrites applied to a model.
//!
//! Every atomic rewrite works on one top-level class at a time and reports
//! whether it changed anything. Only changed classes are emitted for that
//! transform, except for [`TransformUnit::Identity`], which touches every
//! class.

mod literals;
mod rename;
mod statements;
mod unroll;

use crate::syntax::{Delim, Model, TokenTree, TypeDecl};
use indexmap::IndexSet;
use std::fmt;

/// Output directory prefix for single-rewrite units.
pub const TRANSFORM_PREFIX: &str = "transforms.";

/// Output name of the identity unit.
pub const IDENTITY_NAME: &str = "transforms.Identity";

/// The closed catalog of atomic rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    AddDeadCode,
    WrapTryCatch,
    UnrollWhiles,
    InsertPrintStatements,
    RenameFields,
    RenameLocalVariables,
    RenameParameters,
    ReplaceTrueFalse,
}

impl TransformKind {
    /// All kinds, in catalog order.
    pub const ALL: [TransformKind; 8] = [
        TransformKind::AddDeadCode,
        TransformKind::WrapTryCatch,
        TransformKind::UnrollWhiles,
        TransformKind::InsertPrintStatements,
        TransformKind::RenameFields,
        TransformKind::RenameLocalVariables,
        TransformKind::RenameParameters,
        TransformKind::ReplaceTrueFalse,
    ];

    /// Short name, e.g. `AddDeadCode`.
    pub fn label(self) -> &'static str {
        match self {
            TransformKind::AddDeadCode => "AddDeadCode",
            TransformKind::WrapTryCatch => "WrapTryCatch",
            TransformKind::UnrollWhiles => "UnrollWhiles",
            TransformKind::InsertPrintStatements => "InsertPrintStatements",
            TransformKind::RenameFields => "RenameFields",
            TransformKind::RenameLocalVariables => "RenameLocalVariables",
            TransformKind::RenameParameters => "RenameParameters",
            TransformKind::ReplaceTrueFalse => "ReplaceTrueFalse",
        }
    }

    /// Output name, e.g. `transforms.AddDeadCode`.
    pub fn output_name(self) -> String {
        format!("{TRANSFORM_PREFIX}{}", self.label())
    }

    pub fn description(self) -> &'static str {
        match self {
            TransformKind::AddDeadCode => "insert an unreachable declaration at the start of each method",
            TransformKind::WrapTryCatch => "wrap each method body in a rethrowing try/catch",
            TransformKind::UnrollWhiles => "unroll every while loop by one iteration",
            TransformKind::InsertPrintStatements => "insert a print statement at the start of each method",
            TransformKind::RenameFields => "rename fields declared in the class",
            TransformKind::RenameLocalVariables => "rename local variables",
            TransformKind::RenameParameters => "rename method and constructor parameters",
            TransformKind::ReplaceTrueFalse => "replace boolean literals with string comparisons",
        }
    }

    /// Rewrite one class. Returns whether anything changed.
    pub fn rewrite(self, decl: &mut TypeDecl, pass: u32) -> Result<bool, TransformError> {
        let mut names = Placeholders::new(pass);
        match self {
            TransformKind::AddDeadCode => Ok(statements::add_dead_code(decl, &mut names)),
            TransformKind::WrapTryCatch => Ok(statements::wrap_try_catch(decl, &mut names)),
            TransformKind::UnrollWhiles => unroll::unroll_whiles(decl),
            TransformKind::InsertPrintStatements => {
                Ok(statements::insert_print_statements(decl, &mut names))
            }
            TransformKind::RenameFields => Ok(rename::rename_fields(decl, &mut names)),
            TransformKind::RenameLocalVariables => Ok(rename::rename_locals(decl, &mut names)),
            TransformKind::RenameParameters => Ok(rename::rename_parameters(decl, &mut names)),
            TransformKind::ReplaceTrueFalse => Ok(literals::replace_true_false(decl, &mut names)),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised while applying a transform unit to a model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("{transform} cannot handle {element}: {reason}")]
    Unsupported {
        transform: &'static str,
        element: String,
        reason: String,
    },

    #[error("sequence {sequence} failed at step {step}: {source}")]
    SequenceFailed {
        sequence: String,
        step: usize,
        #[source]
        source: Box<TransformError>,
    },
}

/// Names of the classes a unit changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched(IndexSet<String>);

impl Touched {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    /// Whether the class called `name` should be emitted.
    pub fn applies_to(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn extend(&mut self, other: Touched) {
        self.0.extend(other.0);
    }
}

/// One entry of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformUnit {
    /// Emits every class unchanged.
    Identity,
    /// A single rewrite with its pass id.
    Atomic { kind: TransformKind, pass: u32 },
    /// Several units applied in order under one output name.
    Sequence {
        name: String,
        members: Vec<TransformUnit>,
    },
}

impl TransformUnit {
    pub fn atomic(kind: TransformKind, pass: u32) -> Self {
        TransformUnit::Atomic { kind, pass }
    }

    /// Output directory name; unique within a plan.
    pub fn name(&self) -> String {
        match self {
            TransformUnit::Identity => IDENTITY_NAME.to_string(),
            TransformUnit::Atomic { kind, .. } => kind.output_name(),
            TransformUnit::Sequence { name, .. } => name.clone(),
        }
    }

    /// Apply this unit to every class in `model`.
    ///
    /// On error the model may be partially rewritten and must be discarded.
    pub fn apply(&self, model: &mut Model) -> Result<Touched, TransformError> {
        let mut touched = Touched::new();
        match self {
            TransformUnit::Identity => {
                for decl in model.classes_mut() {
                    touched.insert(decl.name.as_str());
                }
            }
            TransformUnit::Atomic { kind, pass } => {
                for decl in model.classes_mut() {
                    if kind.rewrite(decl, *pass)? {
                        touched.insert(decl.name.as_str());
                    }
                }
            }
            TransformUnit::Sequence { name, members } => {
                for (step, member) in members.iter().enumerate() {
                    let changed = member.apply(model).map_err(|e| TransformError::SequenceFailed {
                        sequence: name.clone(),
                        step,
                        source: Box::new(e),
                    })?;
                    touched.extend(changed);
                }
            }
        }
        Ok(touched)
    }
}

impl fmt::Display for TransformUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformUnit::Identity => f.write_str(IDENTITY_NAME),
            TransformUnit::Atomic { kind, pass } => write!(f, "{} (pass {pass})", kind.output_name()),
            TransformUnit::Sequence { name, members } => {
                write!(f, "{name} [")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Generates `REPLACEME<pass>_<n>` names, unique within one rewrite.
pub(crate) struct Placeholders {
    pass: u32,
    next: usize,
}

impl Placeholders {
    pub(crate) fn new(pass: u32) -> Self {
        Self { pass, next: 0 }
    }

    pub(crate) fn next(&mut self) -> String {
        let name = placeholder(self.pass, self.next);
        self.next += 1;
        name
    }
}

pub fn placeholder(pass: u32, n: usize) -> String {
    format!("REPLACEME{pass}_{n}")
}

/// Number of leading trees forming an explicit `this(..);` or `super(..);`
/// constructor call. Statements must not be inserted before it.
pub(crate) fn explicit_ctor_call(body: &[TokenTree]) -> usize {
    match body {
        [callee, args, semi, ..]
            if (callee.is_ident("this") || callee.is_ident("super"))
                && args.is_group(Delim::Paren)
                && semi.is_punct(";") =>
        {
            3
        }
        _ => 0,
    }
}

/// Visit every method body of a class.
pub(crate) fn method_bodies(decl: &mut TypeDecl) -> impl Iterator<Item = &mut Vec<TokenTree>> {
    decl.methods_mut().filter_map(|m| m.body.as_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{ElementKind, parse_unit};

    fn model(src: &str) -> Model {
        Model::from_units(vec![parse_unit("t.java", src).unwrap()]).unwrap()
    }

    fn class_source(model: &Model, name: &str) -> String {
        model
            .elements_of_kind(ElementKind::Class)
            .find(|c| c.name == name)
            .map(TypeDecl::to_source)
            .unwrap()
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = TransformKind::ALL.iter().map(|k| k.output_name()).collect();
        names.push(TransformUnit::Identity.name());
        let unique: IndexSet<_> = names.iter().collect();
        assert_eq!(unique.len(), 9);
        assert_eq!(TransformKind::AddDeadCode.output_name(), "transforms.AddDeadCode");
    }

    #[test]
    fn test_identity_touches_every_class() {
        let mut m = model("class A {} class B { void f() {} } interface I {}");
        let touched = TransformUnit::Identity.apply(&mut m).unwrap();

        assert!(touched.applies_to("A"));
        assert!(touched.applies_to("B"));
        assert!(!touched.applies_to("I"));
    }

    #[test]
    fn test_atomic_only_touches_changed_classes() {
        let mut m = model("class A { boolean f() { return true; } } class B { int g() { return 1; } }");
        let unit = TransformUnit::atomic(TransformKind::ReplaceTrueFalse, 1);

        let touched = unit.apply(&mut m).unwrap();
        assert!(touched.applies_to("A"));
        assert!(!touched.applies_to("B"));
        assert!(class_source(&m, "A").contains("\"REPLACEME1_0\" == \"REPLACEME1_0\""));
    }

    #[test]
    fn test_sequence_applies_in_order() {
        let mut m = model("class A { void f(int x) { while (x > 0) { x--; } } }");
        let seq = TransformUnit::Sequence {
            name: "depth-2-sample-1".into(),
            members: vec![
                TransformUnit::atomic(TransformKind::RenameParameters, 0),
                TransformUnit::atomic(TransformKind::UnrollWhiles, 1),
            ],
        };

        let touched = seq.apply(&mut m).unwrap();
        assert!(touched.applies_to("A"));

        let out = class_source(&m, "A");
        assert!(out.contains("if (!(REPLACEME0_0 > 0))"), "{out}");
        assert!(!out.contains(" x"), "{out}");
    }

    #[test]
    fn test_sequence_failure_reports_step() {
        let mut m = model("class A { void f(int x) { outer: while (x > 0) { x--; } } }");
        let seq = TransformUnit::Sequence {
            name: "depth-2-sample-1".into(),
            members: vec![
                TransformUnit::atomic(TransformKind::AddDeadCode, 0),
                TransformUnit::atomic(TransformKind::UnrollWhiles, 1),
            ],
        };

        let err = seq.apply(&mut m).unwrap_err();
        match err {
            TransformError::SequenceFailed { sequence, step, source } => {
                assert_eq!(sequence, "depth-2-sample-1");
                assert_eq!(step, 1);
                assert!(matches!(*source, TransformError::Unsupported { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_ctor_call() {
        let unit = parse_unit("t.java", "class A { A() { super(1); x(); } void f() { x(); } }").unwrap();
        let methods: Vec<_> = unit.types[0]
            .members
            .iter()
            .filter_map(|m| match m {
                crate::syntax::Member::Method(m) => m.body.as_deref(),
                _ => None,
            })
            .collect();

        assert_eq!(explicit_ctor_call(methods[0]), 3);
        assert_eq!(explicit_ctor_call(methods[1]), 0);
    }

    #[test]
    fn test_display() {
        let seq = TransformUnit::Sequence {
            name: "depth-1-sample-1".into(),
            members: vec![TransformUnit::atomic(TransformKind::WrapTryCatch, 0)],
        };
        assert_eq!(seq.to_string(), "depth-1-sample-1 [transforms.WrapTryCatch (pass 0)]");
    }
}
