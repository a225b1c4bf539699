//! Engine: builds a syntax model from virtual source units.
//!
//! The batch task only talks to this trait, so a different front end can be
//! plugged in without touching the scheduling code.

use crate::source::SourceUnit;
use crate::syntax::{Model, ParseError, parse_unit};

/// Builds one model from a set of units processed together.
pub trait Engine: Send + Sync {
    /// Parse `units` into a single model.
    ///
    /// Fails if any unit does not parse, or if the units together declare
    /// the same top-level type twice.
    fn build(&self, units: &[&SourceUnit]) -> Result<Model, ParseError>;
}

/// Engine for the Java subset understood by [`crate::syntax`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaEngine;

impl JavaEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for JavaEngine {
    fn build(&self, units: &[&SourceUnit]) -> Result<Model, ParseError> {
        let parsed = units
            .iter()
            .map(|unit| parse_unit(&unit.virtual_name(), unit.text()))
            .collect::<Result<Vec<_>, _>>()?;
        Model::from_units(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Split;
    use crate::syntax::{ElementKind, ParseErrorKind};

    fn unit(id: &str, text: &str) -> SourceUnit {
        SourceUnit::from_record(id, text, Split::Test)
    }

    #[test]
    fn test_build_many_units() {
        let a = unit("a1", "class WRAPPER { void f() {} }");
        let b = unit("b2", "class WRAPPER { int x; }");

        let model = JavaEngine.build(&[&a, &b]).unwrap();
        let names: Vec<_> = model
            .elements_of_kind(ElementKind::Class)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["WRAPPER_a1", "WRAPPER_b2"]);
    }

    #[test]
    fn test_build_reports_failing_unit() {
        let good = unit("good", "class WRAPPER {}");
        let bad = unit("bad", "class WRAPPER { void f( }");

        let err = JavaEngine.build(&[&good, &bad]).unwrap_err();
        assert_eq!(err.unit, "bad.java");
    }

    #[test]
    fn test_build_rejects_colliding_types() {
        let a = unit("a", "class Helper {}");
        let b = unit("b", "class Helper {}");

        let err = JavaEngine.build(&[&a, &b]).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateType("Helper".into()));
    }

    #[test]
    fn test_build_empty() {
        let model = JavaEngine.build(&[]).unwrap();
        assert!(model.units().is_empty());
    }
}
