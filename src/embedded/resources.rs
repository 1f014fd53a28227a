//! Embedded resource sources and static registrations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;

use crate::embedded::RegistrationError;

/// A set of named byte payloads compiled into the process image.
///
/// Resource names follow the dotted convention `Namespace.Folder.file.ext`.
pub trait ResourceSource: Send + Sync + 'static {
    /// All resource names available from this source.
    fn resource_names(&self) -> Vec<String>;

    /// Full content of a resource, or `None` if it does not exist.
    fn read(&self, name: &str) -> Option<Bytes>;
}

/// In-memory resource set, usually populated with `include_bytes!`.
///
/// ```
/// use webapp_host::embedded::EmbeddedResources;
///
/// let resources = EmbeddedResources::new()
///     .with("SampleApp.Scripts.app.js", b"console.log('hi');");
/// assert_eq!(resources.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResources {
    resources: BTreeMap<String, Bytes>,
}

impl EmbeddedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, content: &'static [u8]) -> Self {
        self.insert(name, Bytes::from_static(content));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Bytes>) {
        self.resources.insert(name.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceSource for EmbeddedResources {
    fn resource_names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    fn read(&self, name: &str) -> Option<Bytes> {
        self.resources.get(name).cloned()
    }
}

/// A validated dotted resource namespace, e.g. `SampleApp.Scripts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNamespace(String);

impl ResourceNamespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace followed by the separator, as it prefixes resource names.
    pub fn prefix(&self) -> String {
        format!("{}.", self.0)
    }
}

impl FromStr for ResourceNamespace {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.split('.').all(|segment| {
                !segment.is_empty()
                    && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            });
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(RegistrationError::InvalidNamespace(s.to_string()))
        }
    }
}

impl fmt::Display for ResourceNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks a static folder identifier: a letter followed by letters or digits.
pub fn validate_folder_name(folder: &str) -> Result<(), RegistrationError> {
    let mut chars = folder.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(RegistrationError::InvalidFolderName(folder.to_string()))
    }
}

/// One static registration: a path prefix served from a resource namespace.
#[derive(Clone)]
pub struct StaticFileSpec {
    pub path_prefix: String,
    pub namespace: ResourceNamespace,
    pub source: Arc<dyn ResourceSource>,
}

impl StaticFileSpec {
    pub fn new(
        path_prefix: &str,
        namespace: &str,
        source: Arc<dyn ResourceSource>,
    ) -> Result<Self, RegistrationError> {
        if !path_prefix.starts_with('/') {
            return Err(RegistrationError::InvalidPrefix(path_prefix.to_string()));
        }
        Ok(Self {
            path_prefix: path_prefix.to_string(),
            namespace: namespace.parse()?,
            source,
        })
    }
}

impl fmt::Debug for StaticFileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFileSpec")
            .field("path_prefix", &self.path_prefix)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Ordered static registrations; earlier entries take precedence.
#[derive(Debug, Clone, Default)]
pub struct StaticFileSpecCollection {
    specs: Vec<StaticFileSpec>,
}

impl StaticFileSpecCollection {
    pub fn add(
        &mut self,
        path_prefix: &str,
        namespace: &str,
        source: Arc<dyn ResourceSource>,
    ) -> Result<(), RegistrationError> {
        self.specs.push(StaticFileSpec::new(path_prefix, namespace, source)?);
        Ok(())
    }

    /// Register `/{folder}` against the `{root}.{folder}` namespace.
    pub fn add_folder(
        &mut self,
        folder: &str,
        root_namespace: &str,
        source: Arc<dyn ResourceSource>,
    ) -> Result<(), RegistrationError> {
        validate_folder_name(folder)?;
        self.add(
            &format!("/{}", folder),
            &format!("{}.{}", root_namespace, folder),
            source,
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaticFileSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_validation() {
        assert!("SampleApp.Scripts".parse::<ResourceNamespace>().is_ok());
        assert!("".parse::<ResourceNamespace>().is_err());
        assert!("SampleApp..Scripts".parse::<ResourceNamespace>().is_err());
        assert!("Sample App".parse::<ResourceNamespace>().is_err());
    }

    #[test]
    fn test_folder_name_validation() {
        assert!(validate_folder_name("Scripts").is_ok());
        assert!(validate_folder_name("v2Assets").is_ok());
        assert!(matches!(
            validate_folder_name("2fast"),
            Err(RegistrationError::InvalidFolderName(_))
        ));
        assert!(validate_folder_name("my-folder").is_err());
        assert!(validate_folder_name("").is_err());
    }

    #[test]
    fn test_collection_preserves_order() {
        let source: Arc<dyn ResourceSource> = Arc::new(EmbeddedResources::new());
        let mut specs = StaticFileSpecCollection::default();
        specs.add("/b", "App.B", source.clone()).unwrap();
        specs.add("/a", "App.A", source.clone()).unwrap();
        specs.add_folder("Content", "App", source).unwrap();

        let prefixes: Vec<_> = specs.iter().map(|s| s.path_prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["/b", "/a", "/Content"]);
        assert_eq!(specs.iter().last().unwrap().namespace.as_str(), "App.Content");
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        let source: Arc<dyn ResourceSource> = Arc::new(EmbeddedResources::new());
        assert!(matches!(
            StaticFileSpec::new("Scripts", "App.Scripts", source),
            Err(RegistrationError::InvalidPrefix(_))
        ));
    }
}
