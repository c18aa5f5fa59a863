//! Module registry
//!
//! Maps class names to factories and command keywords to live modules.

use super::analysis::AnalysisFactory;
use super::codingstandard::CodingstandardFactory;
use super::coverage::CoverageFactory;
use super::test::TestFactory;
use super::{Module, ModuleContext, ModuleFactory};
use crate::config::ModuleSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registered modules in registration order, keyed by command keyword
pub struct ModuleRegistry {
    context: ModuleContext,
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
    modules: Vec<(String, Box<dyn Module>)>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("modules", &self.keywords().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleRegistry {
    /// Registry with the built-in module factories
    pub fn new(context: ModuleContext) -> Self {
        Self::empty(context)
            .with_factory(Arc::new(CoverageFactory))
            .with_factory(Arc::new(TestFactory))
            .with_factory(Arc::new(CodingstandardFactory))
            .with_factory(Arc::new(AnalysisFactory))
    }

    /// Registry without any factories
    pub fn empty(context: ModuleContext) -> Self {
        Self {
            context,
            factories: HashMap::new(),
            modules: Vec::new(),
        }
    }

    /// Add or replace the factory for its class name
    pub fn with_factory(mut self, factory: Arc<dyn ModuleFactory>) -> Self {
        self.factories.insert(factory.class().to_string(), factory);
        self
    }

    /// Factories sorted by class name
    pub fn factories(&self) -> Vec<Arc<dyn ModuleFactory>> {
        let mut factories: Vec<_> = self.factories.values().cloned().collect();
        factories.sort_by_key(|f| f.class());
        factories
    }

    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    /// Construct, initialize and store one module. Failures are logged and
    /// leave the registry untouched.
    pub fn register(&mut self, name: &str, settings: &ModuleSettings) -> bool {
        let class = match settings.get_non_blank("class") {
            Some(class) => class.to_string(),
            None => class_name_for(name),
        };

        let Some(factory) = self.factories.get(&class).cloned() else {
            warn!("Failed to load module {}. Class {} not found.", name, class);
            return false;
        };

        let mut module = match factory.create(&self.context, settings) {
            Ok(module) => module,
            Err(e) => {
                warn!("Failed to load module {} ({}): {}", name, class, e);
                return false;
            }
        };
        if let Err(e) = module.initialize() {
            warn!("Failed to initialize module {} ({}): {}", name, class, e);
            return false;
        }

        let keyword = settings
            .get_non_blank("command")
            .unwrap_or(name)
            .to_lowercase();
        debug!("Loaded module {} as '{}'", name, keyword);
        self.insert(keyword, module);
        true
    }

    /// Register every entry of the `modules` config table. Returns `None`
    /// when the value is not a table.
    pub fn register_all(&mut self, modules: &toml::Value) -> Option<usize> {
        let Some(table) = modules.as_table() else {
            warn!("Module configuration is not a table; no modules loaded");
            return None;
        };
        for (name, value) in table {
            self.register(name, &ModuleSettings::from_value(value));
        }
        Some(self.modules.len())
    }

    /// Store a module under `keyword`, replacing an existing one in place
    pub fn insert(&mut self, keyword: impl Into<String>, module: Box<dyn Module>) {
        let keyword = keyword.into();
        match self.modules.iter_mut().find(|(k, _)| *k == keyword) {
            Some(slot) => slot.1 = module,
            None => self.modules.push((keyword, module)),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&dyn Module> {
        self.modules
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, module)| module.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Module)> {
        self.modules
            .iter()
            .map(|(keyword, module)| (keyword.as_str(), module.as_ref()))
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|(keyword, _)| keyword.as_str())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// `code-standard` becomes `Codestandard`: non `[A-Za-z_]` characters are
/// dropped and the first letter is upper-cased
fn class_name_for(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '_')
        .collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
