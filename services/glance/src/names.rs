//! Choosing which variables to compare.
//!
//! Variables are picked either by command-line selectors of the form
//! `pattern[:epsilon[:missing]]` or by the `variables` section of a run
//! configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use glance_common::{AnalysisDefaults, GlanceError, GlanceResult, ResolvedVariable, VariableConfig};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::sources::DataFile;

/// How the variable names of two files relate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NameComparison {
    pub shared: BTreeSet<String>,
    pub unique_to_a: BTreeSet<String>,
    pub unique_to_b: BTreeSet<String>,
}

pub fn check_file_names(a: &dyn DataFile, b: &dyn DataFile) -> NameComparison {
    let a_names: BTreeSet<String> = a.variable_names().into_iter().collect();
    let b_names: BTreeSet<String> = b.variable_names().into_iter().collect();
    NameComparison {
        shared: a_names.intersection(&b_names).cloned().collect(),
        unique_to_a: a_names.difference(&b_names).cloned().collect(),
        unique_to_b: b_names.difference(&a_names).cloned().collect(),
    }
}

/// A variable selector: a regular expression matched at the start of the
/// name, with optional epsilon and missing-value overrides.
///
/// `ba.*:0.001` selects names starting with "ba" with epsilon 0.001;
/// `c.t::-9999` keeps the default epsilon and sets the missing value.
#[derive(Debug, Clone)]
pub struct Selector {
    /// `None` matches every name.
    pattern: Option<Regex>,
    pub epsilon: Option<f64>,
    pub missing_value: Option<f64>,
}

impl Selector {
    /// Matches every name.
    pub fn all() -> Self {
        Self {
            pattern: None,
            epsilon: None,
            missing_value: None,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.as_ref().map_or(true, |p| p.is_match(name))
    }
}

impl FromStr for Selector {
    type Err = GlanceError;

    fn from_str(s: &str) -> GlanceResult<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(GlanceError::InvalidPattern(format!(
                "'{}': expected pattern[:epsilon[:missing]]",
                s
            )));
        }

        let pattern = Regex::new(&format!("^(?:{})", parts[0]))
            .map_err(|e| GlanceError::InvalidPattern(format!("'{}': {}", parts[0], e)))?;

        let number = |field: &str, text: Option<&&str>| -> GlanceResult<Option<f64>> {
            match text {
                None => Ok(None),
                Some(t) if t.is_empty() => Ok(None),
                Some(t) => t.parse::<f64>().map(Some).map_err(|_| {
                    GlanceError::InvalidPattern(format!("'{}': invalid {} '{}'", s, field, t))
                }),
            }
        };

        Ok(Self {
            pattern: Some(pattern),
            epsilon: number("epsilon", parts.get(1))?,
            missing_value: number("missing value", parts.get(2))?,
        })
    }
}

/// Parse selectors, defaulting to every variable when none are given.
pub fn parse_selectors(raw: &[String]) -> GlanceResult<Vec<Selector>> {
    if raw.is_empty() {
        return Ok(vec![Selector::all()]);
    }
    raw.iter().map(|s| s.parse()).collect()
}

/// Settings for every shared variable matched by a selector. The first
/// matching selector supplies the overrides.
///
/// With no missing value from the selector or the defaults, each side falls
/// back to the missing value its own file declares.
pub fn resolve_selected(
    names: &NameComparison,
    selectors: &[Selector],
    defaults: &AnalysisDefaults,
    a: &dyn DataFile,
    b: &dyn DataFile,
) -> GlanceResult<Vec<ResolvedVariable>> {
    let mut resolved = Vec::new();
    for name in &names.shared {
        let Some(selector) = selectors.iter().find(|s| s.matches(name)) else {
            continue;
        };
        let config = VariableConfig {
            epsilon: selector.epsilon,
            missing_value: selector.missing_value,
            ..Default::default()
        };
        let settings = config
            .resolve(name, defaults)?
            .with_file_missing_values(a.missing_value(name), b.missing_value(name));
        resolved.push(settings);
    }

    debug!(selected = resolved.len(), shared = names.shared.len(), "Selected variables");
    Ok(resolved)
}

/// Settings for the variables listed in a run configuration.
///
/// A listed variable is compared when both files have it, or when it exists
/// only in A and its `alternate_name_in_b` exists only in B. Unset missing
/// values come from each side's own file. An empty list compares every
/// shared variable.
pub fn resolve_configured(
    names: &NameComparison,
    variables: &BTreeMap<String, VariableConfig>,
    defaults: &AnalysisDefaults,
    a: &dyn DataFile,
    b: &dyn DataFile,
) -> GlanceResult<Vec<ResolvedVariable>> {
    if variables.is_empty() {
        return resolve_selected(names, &[Selector::all()], defaults, a, b);
    }

    let mut resolved = Vec::new();
    for (name, config) in variables {
        let renamed = config.alternate_name_in_b.as_ref().is_some_and(|alt| {
            names.unique_to_a.contains(name) && names.unique_to_b.contains(alt)
        });
        if !names.shared.contains(name) && !renamed {
            warn!(variable = %name, "Configured variable not available in both files; skipping");
            continue;
        }

        let b_name = config.alternate_name_in_b.as_deref().unwrap_or(name);
        resolved.push(config.resolve_for_files(
            name,
            defaults,
            a.missing_value(name),
            b.missing_value(b_name),
        )?);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use delta::{DataSet, Shape};

    struct FakeFile {
        vars: Vec<(&'static str, Option<f64>)>,
    }

    impl DataFile for FakeFile {
        fn path(&self) -> &Path {
            Path::new("fake")
        }
        fn variable_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.vars.iter().map(|(n, _)| n.to_string()).collect();
            names.sort();
            names
        }
        fn shape(&self, _name: &str) -> GlanceResult<Shape> {
            Ok(Shape::from(vec![1]))
        }
        fn read(&self, _name: &str) -> GlanceResult<DataSet> {
            Ok(DataSet::from_vec(vec![0.0]))
        }
        fn missing_value(&self, name: &str) -> Option<f64> {
            self.vars.iter().find(|(n, _)| *n == name).and_then(|(_, m)| *m)
        }
    }

    fn files() -> (FakeFile, FakeFile) {
        (
            FakeFile {
                vars: vec![("foo", Some(-1.0)), ("bar", None), ("baz", None), ("cat", None), ("tti", None)],
            },
            FakeFile {
                vars: vec![("foo", Some(-2.0)), ("bar", None), ("baz", None), ("cat", None), ("tti_b", Some(-5.0))],
            },
        )
    }

    #[test]
    fn test_check_file_names() {
        let (a, b) = files();
        let names = check_file_names(&a, &b);
        assert_eq!(names.shared.len(), 4);
        assert!(names.unique_to_a.contains("tti"));
        assert!(names.unique_to_b.contains("tti_b"));
    }

    #[test]
    fn test_selector_parsing() {
        let s: Selector = "f..:0.5:-999".parse().unwrap();
        assert_eq!(s.epsilon, Some(0.5));
        assert_eq!(s.missing_value, Some(-999.0));
        assert!(s.matches("foo"));
        assert!(!s.matches("afoo"));

        let s: Selector = "c.t::-9999".parse().unwrap();
        assert_eq!(s.epsilon, None);
        assert_eq!(s.missing_value, Some(-9999.0));

        assert!("a:b:c:d".parse::<Selector>().is_err());
        assert!("x:notanumber".parse::<Selector>().is_err());
        assert!("(unclosed".parse::<Selector>().is_err());
    }

    #[test]
    fn test_resolve_selected() {
        let (a, b) = files();
        let names = check_file_names(&a, &b);
        let selectors = parse_selectors(&[
            "f..:0.5:-999".to_string(),
            "ba.*:0.001".to_string(),
            "c.t::-9999".to_string(),
        ])
        .unwrap();
        let defaults = AnalysisDefaults {
            epsilon: Some(1e-7),
            ..Default::default()
        };

        let resolved = resolve_selected(&names, &selectors, &defaults, &a, &b).unwrap();
        let by_name: BTreeMap<_, _> = resolved
            .iter()
            .map(|r| (r.variable_name.as_str(), r))
            .collect();
        assert_eq!(by_name.len(), 4);
        assert_eq!(by_name["foo"].epsilon.value(), 0.5);
        assert_eq!(by_name["foo"].missing_value, Some(-999.0));
        assert_eq!(by_name["foo"].missing_value_alt_in_b, Some(-999.0));
        assert_eq!(by_name["bar"].epsilon.value(), 0.001);
        assert_eq!(by_name["bar"].missing_value, None);
        assert_eq!(by_name["cat"].epsilon.value(), 1e-7);
        assert_eq!(by_name["cat"].missing_value, Some(-9999.0));
    }

    #[test]
    fn test_selected_missing_falls_back_to_files() {
        let (a, b) = files();
        let names = check_file_names(&a, &b);
        let resolved = resolve_selected(
            &names,
            &parse_selectors(&["foo".to_string()]).unwrap(),
            &AnalysisDefaults::default(),
            &a,
            &b,
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].missing_value, Some(-1.0));
        assert_eq!(resolved[0].missing_value_alt_in_b, Some(-2.0));
    }

    #[test]
    fn test_resolve_configured_with_alternate_name() {
        let (a, b) = files();
        let names = check_file_names(&a, &b);
        let variables = BTreeMap::from([
            (
                "tti".to_string(),
                VariableConfig {
                    alternate_name_in_b: Some("tti_b".to_string()),
                    ..Default::default()
                },
            ),
            ("missing_everywhere".to_string(), VariableConfig::default()),
            ("baz".to_string(), VariableConfig::default()),
        ]);

        let resolved =
            resolve_configured(&names, &variables, &AnalysisDefaults::default(), &a, &b).unwrap();
        assert_eq!(resolved.len(), 2);
        let tti = resolved.iter().find(|r| r.variable_name == "tti").unwrap();
        assert_eq!(tti.b_variable_name, "tti_b");
        assert_eq!(tti.missing_value, None);
        assert_eq!(tti.missing_value_alt_in_b, Some(-5.0));
    }

    #[test]
    fn test_configured_missing_value_does_not_leak_into_b() {
        let (a, b) = files();
        let names = check_file_names(&a, &b);
        let variables = BTreeMap::from([(
            "foo".to_string(),
            VariableConfig {
                missing_value: Some(-999.0),
                ..Default::default()
            },
        )]);

        let resolved =
            resolve_configured(&names, &variables, &AnalysisDefaults::default(), &a, &b).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].missing_value, Some(-999.0));
        assert_eq!(resolved[0].missing_value_alt_in_b, Some(-2.0));
    }

    #[test]
    fn test_empty_configuration_compares_everything_shared() {
        let (a, b) = files();
        let names = check_file_names(&a, &b);
        let resolved = resolve_configured(
            &names,
            &BTreeMap::new(),
            &AnalysisDefaults::default(),
            &a,
            &b,
        )
        .unwrap();
        assert_eq!(resolved.len(), 4);
    }
}
