//! Parser registry: names and aliases mapped to catalog implementations.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AiConfig;

use super::catalog::{ParserConstructor, BUILTIN_PARSERS};
use super::manifest::{discover_manifests, ManifestError};
use super::{Parser, ParserError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Parser key '{key}' is already registered to '{existing}'")]
    Collision { key: String, existing: String },

    #[error("Unknown ResponseType '{name}'. Available parsers: {}", .available.join(", "))]
    UnknownParser {
        name: String,
        available: Vec<String>,
    },

    #[error("Config '{config}' has no ResponseType")]
    MissingResponseType { config: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to create parser '{name}': {source}")]
    Construction {
        name: String,
        #[source]
        source: ParserError,
    },
}

/// What happens when a name or alias is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// The newer registration takes the key.
    #[default]
    LastWriteWins,
    /// The existing registration keeps the key.
    FirstWriteWins,
    /// Registration fails with [`RegistryError::Collision`].
    Reject,
}

/// Where a descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
    Builtin,
    Manifest(PathBuf),
}

/// A registered parser: name, aliases, and the implementation behind them.
#[derive(Debug, Clone)]
pub struct ParserDescriptor {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    /// Catalog key of the implementation.
    pub implementation: String,
    pub source: DescriptorSource,
    pub constructor: ParserConstructor,
}

impl ParserDescriptor {
    /// Name followed by every alias.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Drop aliases that repeat the name or an earlier alias.
    fn normalize_aliases(&mut self) {
        let mut seen = vec![self.name.clone()];
        self.aliases.retain(|alias| {
            if seen.contains(alias) {
                false
            } else {
                seen.push(alias.clone());
                true
            }
        });
    }
}

/// Lookup table from parser names and aliases to descriptors.
///
/// Build it once, then share it by reference; lookups never mutate.
#[derive(Debug, Clone, Default)]
pub struct ParserRegistry {
    policy: CollisionPolicy,
    descriptors: BTreeMap<String, ParserDescriptor>,
    /// Name or alias -> descriptor name.
    lookup: HashMap<String, String>,
    load_errors: Vec<String>,
}

impl ParserRegistry {
    /// Create an empty registry.
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Registry holding only the compiled-in parsers.
    pub fn with_builtins(policy: CollisionPolicy) -> Self {
        let mut registry = Self::new(policy);
        registry.register_builtins();
        registry
    }

    /// Registry holding only the parsers declared by manifests in `parsers_dir`.
    pub fn build(parsers_dir: &Path, policy: CollisionPolicy) -> Self {
        let mut registry = Self::new(policy);
        registry.register_dir(parsers_dir);
        registry
    }

    /// Compiled-in parsers first, then manifests from `parsers_dir`.
    pub fn load(parsers_dir: &Path, policy: CollisionPolicy) -> Self {
        let mut registry = Self::with_builtins(policy);
        registry.register_dir(parsers_dir);
        registry
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn register_builtins(&mut self) {
        for entry in BUILTIN_PARSERS {
            let descriptor = ParserDescriptor {
                name: entry.implementation.to_string(),
                description: entry.description.to_string(),
                aliases: entry.aliases.iter().map(|a| a.to_string()).collect(),
                implementation: entry.implementation.to_string(),
                source: DescriptorSource::Builtin,
                constructor: entry.constructor,
            };
            if let Err(err) = self.register(descriptor) {
                warn!("Skipping built-in parser: {err}");
                self.load_errors.push(err.to_string());
            }
        }
    }

    /// Register every manifest in `parsers_dir`. Returns how many registered.
    ///
    /// A manifest that fails to load or collides (under
    /// [`CollisionPolicy::Reject`]) is logged, kept in
    /// [`load_errors`](Self::load_errors), and does not stop the scan.
    pub fn register_dir(&mut self, parsers_dir: &Path) -> usize {
        if !parsers_dir.is_dir() {
            warn!(dir = %parsers_dir.display(), "Parser directory does not exist");
            return 0;
        }

        info!(dir = %parsers_dir.display(), "Scanning parser manifests");

        let mut registered = 0;
        for result in discover_manifests(parsers_dir) {
            let outcome = result
                .map_err(RegistryError::from)
                .and_then(|descriptor| self.register(descriptor));

            match outcome {
                Ok(true) => registered += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!("Skipping parser manifest: {err}");
                    self.load_errors.push(err.to_string());
                }
            }
        }

        info!(registered, total = self.len(), "Parser discovery finished");
        registered
    }

    /// Register a descriptor under its name and aliases, applying the
    /// collision policy. Returns `false` if the descriptor was skipped.
    pub fn register(&mut self, mut descriptor: ParserDescriptor) -> Result<bool, RegistryError> {
        descriptor.normalize_aliases();

        match self.policy {
            CollisionPolicy::Reject => {
                if let Some(key) = descriptor.keys().find(|key| self.lookup.contains_key(*key)) {
                    return Err(RegistryError::Collision {
                        key: key.to_string(),
                        existing: self.lookup[key].clone(),
                    });
                }
            }
            CollisionPolicy::FirstWriteWins => {
                if let Some(existing) = self.lookup.get(&descriptor.name) {
                    warn!(
                        parser = %descriptor.name,
                        existing = %existing,
                        "Parser name already registered, keeping the first registration"
                    );
                    return Ok(false);
                }
                let lookup = &self.lookup;
                descriptor.aliases.retain(|alias| match lookup.get(alias) {
                    Some(existing) => {
                        warn!(alias = %alias, existing = %existing, "Alias already registered, dropping");
                        false
                    }
                    None => true,
                });
            }
            CollisionPolicy::LastWriteWins => {
                let keys: Vec<String> = descriptor.keys().map(str::to_string).collect();
                for key in &keys {
                    self.release_key(key);
                }
            }
        }

        for key in descriptor.keys() {
            self.lookup.insert(key.to_string(), descriptor.name.clone());
        }

        debug!(
            parser = %descriptor.name,
            implementation = %descriptor.implementation,
            aliases = ?descriptor.aliases,
            "Registered parser"
        );
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(true)
    }

    /// Free `key` for a new owner. If it was a descriptor's name the whole
    /// descriptor goes; if it was an alias only the alias goes.
    fn release_key(&mut self, key: &str) {
        let Some(owner) = self.lookup.remove(key) else {
            return;
        };

        if owner == key {
            if let Some(evicted) = self.descriptors.remove(&owner) {
                for alias in &evicted.aliases {
                    if self.lookup.get(alias) == Some(&owner) {
                        self.lookup.remove(alias);
                    }
                }
                warn!(parser = %owner, "Parser replaced by a later registration");
            }
        } else if let Some(previous) = self.descriptors.get_mut(&owner) {
            previous.aliases.retain(|alias| alias != key);
            warn!(alias = %key, previous = %owner, "Alias taken over by a later registration");
        }
    }

    /// Registered parser names (aliases excluded), sorted.
    pub fn list_parsers(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    /// Descriptor for a name or alias.
    pub fn get_parser_info(&self, name: &str) -> Option<&ParserDescriptor> {
        self.lookup
            .get(name)
            .and_then(|owner| self.descriptors.get(owner))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ParserDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Problems hit while loading manifests or built-ins.
    pub fn load_errors(&self) -> &[String] {
        &self.load_errors
    }

    /// Construct the parser registered under `type_name` for `config`.
    ///
    /// Returns `Ok(None)` when no parser has that name or alias, and `Err`
    /// when the parser exists but rejects the config.
    pub fn create_parser(
        &self,
        type_name: &str,
        config: &AiConfig,
    ) -> Result<Option<Box<dyn Parser>>, ParserError> {
        let Some(descriptor) = self.get_parser_info(type_name) else {
            warn!(parser = %type_name, "No parser registered under this name");
            return Ok(None);
        };

        let parser = (descriptor.constructor)(config)?;

        let validation = parser.validate_config();
        if !validation.valid {
            return Err(ParserError::InvalidConfig {
                parser: descriptor.name.clone(),
                errors: validation.errors,
            });
        }

        info!(
            parser = %descriptor.name,
            config = %config.name(),
            "Created parser"
        );
        Ok(Some(parser))
    }

    /// Construct the parser selected by the config's `ResponseType`.
    pub fn create_parser_for(&self, config: &AiConfig) -> Result<Box<dyn Parser>, RegistryError> {
        let response_type =
            config
                .response_type()
                .ok_or_else(|| RegistryError::MissingResponseType {
                    config: config.name().to_string(),
                })?;

        if config.is_multimodal() {
            warn!(
                config = %config.name(),
                "Multimodal configs use the standard parser for '{response_type}'"
            );
        }

        match self.create_parser(response_type, config) {
            Ok(Some(parser)) => Ok(parser),
            Ok(None) => Err(RegistryError::UnknownParser {
                name: response_type.to_string(),
                available: self.list_parsers().into_iter().map(str::to_string).collect(),
            }),
            Err(source) => Err(RegistryError::Construction {
                name: response_type.to_string(),
                source,
            }),
        }
    }
}

/// Built-in parsers plus manifests from `parsers_dir`, last write wins.
pub fn load_parsers(parsers_dir: &Path) -> ParserRegistry {
    ParserRegistry::load(parsers_dir, CollisionPolicy::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DEMO: &str = r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":0.5,"MaxTokens":100}"#;

    fn demo() -> AiConfig {
        AiConfig::from_json("demo", DEMO).unwrap()
    }

    fn echo_descriptor(name: &str, aliases: &[&str]) -> ParserDescriptor {
        ParserDescriptor {
            name: name.to_string(),
            description: String::new(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            implementation: "echo".to_string(),
            source: DescriptorSource::Builtin,
            constructor: crate::parsers::EchoParser::boxed,
        }
    }

    fn write(dir: &Path, file: &str, content: &str) {
        fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn test_registry_new() {
        let registry = ParserRegistry::new(CollisionPolicy::default());
        assert!(registry.is_empty());
        assert!(registry.list_parsers().is_empty());
    }

    #[test]
    fn test_with_builtins() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        assert_eq!(registry.list_parsers(), vec!["echo", "openai"]);
        assert!(registry.contains("mirror"));
        assert!(registry.contains("closeai"));
        assert!(registry.load_errors().is_empty());
    }

    #[test]
    fn test_lookup_by_alias() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        let info = registry.get_parser_info("mirror").unwrap();
        assert_eq!(info.name, "echo");
        assert!(registry.get_parser_info("Echo").is_none());
    }

    #[test]
    fn test_echo_scenario() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "demo.ai.json", DEMO);
        let configs = crate::config::load_ai_configs(temp.path());

        let registry = load_parsers(&temp.path().join("parsers"));
        let config = &configs["demo"];
        let mut parser = registry.create_parser("echo", config).unwrap().unwrap();
        assert_eq!(parser.parse("hi").unwrap(), "hi");
    }

    #[test]
    fn test_created_parser_reports_configured_model() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        for name in ["echo", "mirror"] {
            let parser = registry.create_parser(name, &demo()).unwrap().unwrap();
            assert_eq!(parser.model_info().model, "m1");
        }
    }

    #[test]
    fn test_unknown_type_is_none() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        assert!(matches!(registry.create_parser("nonexistent", &demo()), Ok(None)));
    }

    #[test]
    fn test_construction_error_is_distinct_from_unknown() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        // openai requires an APIKey
        let result = registry.create_parser("openai", &demo());
        assert!(matches!(result, Err(ParserError::Config(_))));
    }

    #[test]
    fn test_parser_rejecting_its_config_is_invalid_config() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        let hot = AiConfig::from_json(
            "hot",
            r#"{"FriendlyName":"Hot","Model":"m1","ResponseType":"openai","Temperature":5.0,"MaxTokens":100,"APIKey":"sk-test"}"#,
        )
        .unwrap();

        match registry.create_parser("openai", &hot) {
            Err(ParserError::InvalidConfig { parser, errors }) => {
                assert_eq!(parser, "openai");
                assert!(errors.iter().any(|e| e.contains("Temperature")));
            }
            other => panic!("expected InvalidConfig, got {:?}", other.map(|p| p.is_some())),
        }

        // Aliases resolve to the same descriptor name
        assert!(matches!(
            registry.create_parser("closeai", &hot),
            Err(ParserError::InvalidConfig { parser, .. }) if parser == "openai"
        ));
    }

    #[test]
    fn test_create_parser_for_wraps_construction_errors() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());

        let keyless = AiConfig::from_json(
            "keyless",
            r#"{"FriendlyName":"K","Model":"m1","ResponseType":"openai","Temperature":0.5,"MaxTokens":100}"#,
        )
        .unwrap();
        match registry.create_parser_for(&keyless) {
            Err(RegistryError::Construction { name, source }) => {
                assert_eq!(name, "openai");
                assert!(matches!(source, ParserError::Config(_)));
            }
            _ => panic!("expected Construction"),
        }

        let hot = AiConfig::from_json(
            "hot",
            r#"{"FriendlyName":"H","Model":"m1","ResponseType":"openai","Temperature":5.0,"MaxTokens":100,"APIKey":"sk-test"}"#,
        )
        .unwrap();
        let err = registry.create_parser_for(&hot).err().unwrap();
        assert!(matches!(
            &err,
            RegistryError::Construction { source: ParserError::InvalidConfig { .. }, .. }
        ));
        assert!(err.to_string().starts_with("Failed to create parser 'openai'"));
    }

    #[test]
    fn test_create_parser_for() {
        let registry = ParserRegistry::with_builtins(CollisionPolicy::default());
        let mut parser = registry.create_parser_for(&demo()).unwrap();
        assert_eq!(parser.parse("ping").unwrap(), "ping");

        let unknown = AiConfig::from_json("x", r#"{"ResponseType":"telepathy"}"#).unwrap();
        match registry.create_parser_for(&unknown) {
            Err(RegistryError::UnknownParser { name, available }) => {
                assert_eq!(name, "telepathy");
                assert_eq!(available, vec!["echo".to_string(), "openai".to_string()]);
            }
            _ => panic!("expected UnknownParser"),
        }

        let missing = AiConfig::from_json("y", "{}").unwrap();
        assert!(matches!(
            registry.create_parser_for(&missing),
            Err(RegistryError::MissingResponseType { .. })
        ));
    }

    #[test]
    fn test_build_from_dir_survives_broken_manifest() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "good.parser.json",
            r#"{"name":"parrot","implementation":"echo","aliases":["polly"]}"#,
        );
        write(temp.path(), "broken.parser.json", "{{{");

        let registry = ParserRegistry::build(temp.path(), CollisionPolicy::default());
        assert_eq!(registry.list_parsers(), vec!["parrot"]);
        assert_eq!(registry.load_errors().len(), 1);

        let mut parser = registry.create_parser("polly", &demo()).unwrap().unwrap();
        assert_eq!(parser.parse("cracker").unwrap(), "cracker");
    }

    #[test]
    fn test_build_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let registry = ParserRegistry::build(&temp.path().join("missing"), CollisionPolicy::default());
        assert!(registry.is_empty());
        assert!(registry.load_errors().is_empty());
    }

    #[test]
    fn test_load_combines_builtins_and_manifests() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "deepseek.parser.json",
            r#"{"name":"deepseek","implementation":"openai"}"#,
        );

        let registry = load_parsers(temp.path());
        assert_eq!(registry.list_parsers(), vec!["deepseek", "echo", "openai"]);
        assert_eq!(
            registry.get_parser_info("deepseek").unwrap().source,
            DescriptorSource::Manifest(temp.path().join("deepseek.parser.json"))
        );
    }

    #[test]
    fn test_last_write_wins_alias() {
        let mut registry = ParserRegistry::new(CollisionPolicy::LastWriteWins);
        registry.register(echo_descriptor("first", &["shared"])).unwrap();
        registry.register(echo_descriptor("second", &["shared"])).unwrap();

        assert_eq!(registry.get_parser_info("shared").unwrap().name, "second");
        assert!(registry.get_parser_info("first").unwrap().aliases.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_last_write_wins_name_evicts_descriptor() {
        let mut registry = ParserRegistry::new(CollisionPolicy::LastWriteWins);
        registry.register(echo_descriptor("first", &["f"])).unwrap();
        registry.register(echo_descriptor("second", &["first"])).unwrap();

        assert_eq!(registry.list_parsers(), vec!["second"]);
        assert_eq!(registry.get_parser_info("first").unwrap().name, "second");
        assert!(!registry.contains("f"));
    }

    #[test]
    fn test_last_write_wins_reregister_same_name() {
        let mut registry = ParserRegistry::new(CollisionPolicy::LastWriteWins);
        registry.register(echo_descriptor("p", &["old"])).unwrap();
        registry.register(echo_descriptor("p", &["new"])).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("old"));
        assert!(registry.contains("new"));
    }

    #[test]
    fn test_first_write_wins() {
        let mut registry = ParserRegistry::new(CollisionPolicy::FirstWriteWins);
        registry.register(echo_descriptor("first", &["shared"])).unwrap();
        registry.register(echo_descriptor("second", &["shared", "own"])).unwrap();
        assert!(!registry.register(echo_descriptor("first", &["ignored"])).unwrap());

        assert_eq!(registry.get_parser_info("shared").unwrap().name, "first");
        assert_eq!(registry.get_parser_info("second").unwrap().aliases, vec!["own"]);
        assert!(!registry.contains("ignored"));
    }

    #[test]
    fn test_reject_collision() {
        let mut registry = ParserRegistry::new(CollisionPolicy::Reject);
        registry.register(echo_descriptor("first", &["shared"])).unwrap();

        let err = registry
            .register(echo_descriptor("second", &["shared"]))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Collision { ref key, ref existing } if key == "shared" && existing == "first"
        ));
        assert!(!registry.contains("second"));
    }

    #[test]
    fn test_reject_policy_records_manifest_collisions() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "dup.parser.json",
            r#"{"name":"echo","implementation":"echo"}"#,
        );

        let registry = ParserRegistry::load(temp.path(), CollisionPolicy::Reject);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.load_errors().len(), 1);
        assert_eq!(
            registry.get_parser_info("echo").unwrap().source,
            DescriptorSource::Builtin
        );
    }

    #[test]
    fn test_duplicate_aliases_are_collapsed() {
        let mut registry = ParserRegistry::new(CollisionPolicy::Reject);
        registry
            .register(echo_descriptor("p", &["p", "a", "a"]))
            .unwrap();
        assert_eq!(registry.get_parser_info("p").unwrap().aliases, vec!["a"]);
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ParserRegistry>();
    }
}
