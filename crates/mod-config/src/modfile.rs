//! The `mod` block and the decoded mod

use hcl::Value;
use hcl::eval::{Context, Evaluate};
use mod_fs::{NormalizedPath, SourceFile};
use semver::{Version, VersionReq};

use crate::constraint::{NameConvention, VersionConstraint, parse_version_req};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::name::{QualifiedName, ResourceKind};
use crate::parser::{RawBlock, parse_body};
use crate::resource::{Resource, ResourceMap};

/// Name given to a workspace without a `mod` block.
pub const DEFAULT_MOD_NAME: &str = "local";

/// Contents of a `require` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Require {
    /// Minimum tool version
    pub tool: Option<VersionReq>,
    /// Dependency mods in declaration order
    pub mods: Vec<VersionConstraint>,
}

/// A mod and the resources declared in its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Mod {
    /// Short name, the label of the `mod` block
    pub name: String,
    /// Full name, `host/org/name` for installed mods
    pub full_name: String,
    /// `None` means latest
    pub version: Option<Version>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub require: Require,
    pub resources: ResourceMap,
    /// Directory the mod was loaded from
    pub dir: Option<NormalizedPath>,
}

impl Mod {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            version: None,
            title: None,
            description: None,
            require: Require::default(),
            resources: ResourceMap::new(),
            dir: None,
        }
    }

    /// The implicit mod of a workspace without a `mod` block.
    pub fn default_local() -> Self {
        Self::new(DEFAULT_MOD_NAME)
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_dependency(mut self, constraint: VersionConstraint) -> Self {
        self.require.mods.push(constraint);
        self
    }

    pub fn with_dir(mut self, dir: impl Into<NormalizedPath>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn dependencies(&self) -> &[VersionConstraint] {
        &self.require.mods
    }

    /// `full_name` for unversioned mods, `full_name@version` otherwise.
    pub fn dependency_key(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{version}", self.full_name),
            None => self.full_name.clone(),
        }
    }

    pub fn version_label(&self) -> String {
        self.version
            .as_ref()
            .map_or_else(|| "latest".to_string(), ToString::to_string)
    }

    /// Look up one of this mod's resources.
    pub fn resource(&self, name: &QualifiedName) -> Option<&Resource> {
        if name.mod_name != self.name {
            return None;
        }
        self.resources.get(name.kind, &name.name)
    }

    pub fn qualified(&self, kind: ResourceKind, name: &str) -> QualifiedName {
        QualifiedName::new(self.name.clone(), kind, name)
    }
}

/// Decode a `mod` block into an empty mod shell.
///
/// The block is evaluated without any variables: titles and requirements
/// must be literals.
pub fn decode_mod_block(
    block: &RawBlock,
    naming: &NameConvention,
) -> std::result::Result<Mod, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let subject = block.location();
    let name = block.label().unwrap_or(DEFAULT_MOD_NAME);
    let mut shell = Mod::new(name);
    let ctx = Context::new();

    let string_attr = |body: &hcl::Body, key: &str, diagnostics: &mut Diagnostics| {
        let attribute = body.attributes().find(|a| a.key() == key)?;
        match attribute.expr().evaluate(&ctx) {
            Ok(Value::String(text)) => Some(text),
            Ok(other) => {
                diagnostics.push(
                    Diagnostic::error(format!("'{key}' must be a string, found {other:?}"))
                        .with_subject(&subject),
                );
                None
            }
            Err(errors) => {
                diagnostics.push(
                    Diagnostic::error(format!("'{key}' must be a literal"))
                        .with_detail(errors.to_string())
                        .with_subject(&subject),
                );
                None
            }
        }
    };

    shell.title = string_attr(&block.body, "title", &mut diagnostics);
    shell.description = string_attr(&block.body, "description", &mut diagnostics);

    for require in block.body.blocks().filter(|b| b.identifier() == "require") {
        if let Some(tool) = string_attr(require.body(), "tool", &mut diagnostics) {
            match parse_version_req(&tool) {
                Some(req) => shell.require.tool = Some(req),
                None => diagnostics.push(
                    Diagnostic::error(format!("Invalid tool version requirement '{tool}'"))
                        .with_subject(&subject),
                ),
            }
        }

        for dependency in require.body().blocks().filter(|b| b.identifier() == "mod") {
            let Some(dep_name) = dependency.labels().first().map(|l| l.as_str().to_string())
            else {
                diagnostics.push(
                    Diagnostic::error("Dependency mod block needs a name label")
                        .with_subject(&subject),
                );
                continue;
            };
            let version = string_attr(dependency.body(), "version", &mut diagnostics)
                .unwrap_or_default();
            match VersionConstraint::from_parts(&dep_name, &version, naming) {
                Ok(constraint) => shell
                    .require
                    .mods
                    .push(constraint.with_location(block.location())),
                Err(e) => {
                    diagnostics.push(Diagnostic::error(e.to_string()).with_subject(&subject))
                }
            }
        }
    }

    if diagnostics.has_errors() {
        Err(diagnostics)
    } else {
        Ok(shell)
    }
}

/// Read only the `mod` block of a mod definition file.
///
/// Used to discover the requirements of installed mods without decoding
/// their resources. A file without a `mod` block yields the default mod.
pub fn parse_mod_definition(file: &SourceFile, naming: &NameConvention) -> Result<Mod> {
    let body = parse_body(file)?;
    let Some(block) = body.blocks().find(|b| b.identifier() == "mod") else {
        return Ok(Mod::default_local());
    };
    let raw = RawBlock {
        block_type: block.identifier().to_string(),
        labels: block.labels().iter().map(|l| l.as_str().to_string()).collect(),
        body: block.body().clone(),
        file: file.path.to_string(),
    };
    decode_mod_block(&raw, naming).map_err(|diagnostics| Error::Diagnostics {
        mod_name: raw.label().unwrap_or(DEFAULT_MOD_NAME).to_string(),
        diagnostics,
    })
}
