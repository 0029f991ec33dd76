use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::{ConverterOptions, Preferences};
use crate::converter::cwebp::CwebpConverter;
use crate::converter::ewww::EwwwConverter;
use crate::converter::imagemagick::ImagemagickConverter;
use crate::converter::libwebp::LibwebpConverter;
use crate::converter::Converter;

/// Backends compiled into this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    Cwebp,
    Ewww,
    Imagemagick,
    Libwebp,
}

impl Backend {
    /// Discovery order (lexicographic by name).
    pub const ALL: [Backend; 4] = [
        Backend::Cwebp,
        Backend::Ewww,
        Backend::Imagemagick,
        Backend::Libwebp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cwebp => "cwebp",
            Backend::Ewww => "ewww",
            Backend::Imagemagick => "imagemagick",
            Backend::Libwebp => "libwebp",
        }
    }

    pub fn build(&self, options: &ConverterOptions) -> Box<dyn Converter> {
        match self {
            Backend::Cwebp => Box::new(CwebpConverter::new(options.cwebp.clone())),
            Backend::Ewww => Box::new(EwwwConverter::new(options.ewww.clone())),
            Backend::Imagemagick => {
                Box::new(ImagemagickConverter::new(options.imagemagick.clone()))
            }
            Backend::Libwebp => Box::new(LibwebpConverter::new(options.libwebp.clone())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown converter: {s}"))
    }
}

/// Merge `preferences` into the `discovered` names.
///
/// Preferred names come first, in the caller's order; names that were not
/// discovered are dropped without complaint. Unless
/// `exclude_non_preferred` is set, the remaining discovered names follow in
/// discovery order.
///
/// Names are matched case-insensitively; the result uses the discovered
/// spelling.
pub fn list_ordered_converters<S: AsRef<str>>(
    discovered: &[S],
    preferences: &Preferences,
) -> Vec<String> {
    let discovered: Vec<&str> = discovered.iter().map(AsRef::as_ref).collect();
    let mut ordered: Vec<String> = Vec::with_capacity(discovered.len());

    for preferred in &preferences.order {
        let found = discovered
            .iter()
            .find(|name| name.eq_ignore_ascii_case(preferred));
        if let Some(name) = found {
            if !ordered.iter().any(|n| n.as_str() == *name) {
                ordered.push(name.to_string());
            }
        }
    }

    if preferences.exclude_non_preferred {
        return ordered;
    }

    for name in discovered {
        if !ordered.iter().any(|n| n == name) {
            ordered.push(name.to_string());
        }
    }

    ordered
}

/// A discovered converter and whether it looks usable right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverterDescriptor {
    pub name: String,
    pub available: bool,
}

/// The set of converters a dispatcher may try. Discovery order is
/// registration order.
pub struct Registry {
    converters: Vec<Box<dyn Converter>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Every built-in backend, configured from `options`.
    pub fn builtin(options: &ConverterOptions) -> Self {
        let mut registry = Self::new();
        for backend in Backend::ALL {
            registry.register(backend.build(options));
        }
        registry
    }

    /// Add a converter. A later registration under an existing name is ignored.
    pub fn register(&mut self, converter: Box<dyn Converter>) {
        if self.get(converter.name()).is_some() {
            log::warn!("Converter {} already registered, ignoring", converter.name());
            return;
        }
        self.converters.push(converter);
    }

    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Descriptors in discovery order. Availability is probed on every call.
    pub fn descriptors(&self) -> Vec<ConverterDescriptor> {
        self.converters
            .iter()
            .map(|c| ConverterDescriptor {
                name: c.name().to_string(),
                available: c.available(),
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Converter> {
        self.converters
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .map(|c| c.as_ref())
    }

    /// Converters in the order the dispatcher should try them.
    pub fn ordered(&self, preferences: &Preferences) -> Vec<&dyn Converter> {
        let names = self.names();
        list_ordered_converters(names.as_slice(), preferences)
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionRequest;
    use crate::error::BackendFailure;

    fn prefs(order: &[&str], exclude: bool) -> Preferences {
        Preferences {
            order: order.iter().map(|s| s.to_string()).collect(),
            exclude_non_preferred: exclude,
        }
    }

    fn order(discovered: &[&str], preferred: &[&str], exclude: bool) -> Vec<String> {
        list_ordered_converters(discovered, &prefs(preferred, exclude))
    }

    #[test]
    fn test_preferred_first_then_rest() {
        let discovered = ["a", "b", "c"];
        assert_eq!(order(&discovered, &["b", "a"], false), vec!["b", "a", "c"]);
        assert_eq!(order(&discovered, &["b", "a"], true), vec!["b", "a"]);
    }

    #[test]
    fn test_unknown_preferred_names_are_ignored() {
        let discovered = ["a", "b"];
        assert_eq!(order(&discovered, &["x", "a"], true), vec!["a"]);
        assert_eq!(order(&discovered, &["x", "a"], false), vec!["a", "b"]);
    }

    #[test]
    fn test_no_preferences_keeps_discovery_order() {
        let discovered = ["c", "a", "b"];
        assert_eq!(order(&discovered, &[], false), vec!["c", "a", "b"]);
        assert!(order(&discovered, &[], true).is_empty());
    }

    #[test]
    fn test_duplicate_and_mixed_case_preferences() {
        let discovered = ["a", "b"];
        assert_eq!(order(&discovered, &["B", "b", "a"], false), vec!["b", "a"]);
    }

    #[test]
    fn test_mixed_case_registered_names_can_be_preferred() {
        let mut registry = Registry::new();
        registry.register(Box::new(Named("Slow")));
        registry.register(Box::new(Named("Fast")));

        for preferred in ["Fast", "fast", "FAST"] {
            let converters = registry.ordered(&prefs(&[preferred], true));
            let names: Vec<&str> = converters.iter().map(|c| c.name()).collect();
            assert_eq!(names, vec!["Fast"], "preferring {preferred}");
        }

        let converters = registry.ordered(&prefs(&["fast"], false));
        let names: Vec<&str> = converters.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Fast", "Slow"]);
    }

    #[test]
    fn test_builtin_discovery_order() {
        let registry = Registry::builtin(&ConverterOptions::default());
        assert_eq!(registry.names(), vec!["cwebp", "ewww", "imagemagick", "libwebp"]);

        let converters = registry.ordered(&prefs(&["libwebp", "gd"], false));
        let ordered: Vec<&str> = converters.iter().map(|c| c.name()).collect();
        assert_eq!(ordered, vec!["libwebp", "cwebp", "ewww", "imagemagick"]);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("CWEBP".parse::<Backend>().unwrap(), Backend::Cwebp);
        assert!("gd".parse::<Backend>().is_err());
    }

    struct Named(&'static str);

    impl Converter for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn convert(&self, _request: &ConversionRequest) -> Result<(), BackendFailure> {
            Ok(())
        }
    }

    #[test]
    fn test_register_ignores_duplicate_names() {
        let mut registry = Registry::new();
        registry.register(Box::new(Named("a")));
        registry.register(Box::new(Named("b")));
        registry.register(Box::new(Named("a")));
        registry.register(Box::new(Named("B")));
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(
            registry.descriptors()[1],
            ConverterDescriptor {
                name: "b".into(),
                available: true
            }
        );
    }
}
