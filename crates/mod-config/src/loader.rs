//! Load a mod from its configuration files

use std::collections::BTreeMap;

use hcl::Value;
use mod_fs::{ListOptions, NormalizedPath, Settings, SourceFile, list_source_files};
use tracing::info;

use crate::constraint::NameConvention;
use crate::error::Result;
use crate::modfile::{Mod, decode_mod_block};
use crate::parser::parse_sources;
use crate::registry::BlockRegistry;
use crate::run_context::{ParseOptions, RunContext};

impl ParseOptions {
    /// Options from workspace settings: naming convention and variables.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            variables: settings
                .variables
                .iter()
                .map(|(name, value)| (name.clone(), toml_to_hcl(value)))
                .collect(),
            naming: NameConvention::from_settings(settings),
        }
    }
}

fn toml_to_hcl(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::from(text.clone()),
        toml::Value::Integer(number) => Value::from(*number),
        toml::Value::Float(number) => hcl::Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(flag) => Value::Bool(*flag),
        toml::Value::Datetime(datetime) => Value::from(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_hcl).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(key, value)| (key.clone(), toml_to_hcl(value)))
                .collect(),
        ),
    }
}

/// Decode a mod from source files.
///
/// `dependencies` must already be decoded; their resources are visible as
/// `<mod>.<kind>.<name>`.
pub fn load_mod(
    files: &[SourceFile],
    registry: &BlockRegistry,
    options: &ParseOptions,
    dependencies: &[&Mod],
) -> Result<Mod> {
    let parsed = parse_sources(files, registry)?;

    let mut diagnostics = parsed.diagnostics;
    let shell = match &parsed.mod_block {
        Some(block) => match decode_mod_block(block, &options.naming) {
            Ok(shell) => shell,
            Err(mod_diagnostics) => {
                diagnostics.extend(mod_diagnostics);
                Mod::new(block.label().unwrap_or_default())
            }
        },
        None => Mod::default_local(),
    };

    let mut ctx = RunContext::new(registry, shell, parsed.blocks, options);
    ctx.report(diagnostics);
    for dependency in dependencies {
        ctx.add_dependency_mod(dependency);
    }
    ctx.decode();
    let passes = ctx.passes();
    let decoded = ctx.into_mod()?;

    info!(
        mod_name = %decoded.name,
        resources = decoded.resources.len(),
        passes,
        "loaded mod"
    );
    Ok(decoded)
}

/// Decode the mod stored in `dir`, reading every `*.mp` file below it.
pub fn load_mod_dir(
    dir: &NormalizedPath,
    registry: &BlockRegistry,
    options: &ParseOptions,
    dependencies: &[&Mod],
) -> Result<Mod> {
    let files = list_source_files(dir, &ListOptions::default())?;
    let decoded = load_mod(&files, registry, options, dependencies)?;
    Ok(decoded.with_dir(dir.clone()))
}

/// Variable overrides from `name=value` pairs, as given on a command line.
pub fn parse_variable_overrides<'a>(
    pairs: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, Value> {
    pairs
        .into_iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), Value::from(value.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_variables_convert() {
        let mut settings = Settings::default();
        settings
            .variables
            .insert("region".to_string(), toml::Value::String("eu".to_string()));
        settings
            .variables
            .insert("count".to_string(), toml::Value::Integer(3));

        let options = ParseOptions::from_settings(&settings);
        assert_eq!(options.variables["region"], Value::from("eu"));
        assert_eq!(options.variables["count"], Value::from(3));
        assert_eq!(options.naming, NameConvention::default());
    }

    #[test]
    fn test_variable_overrides() {
        let vars = parse_variable_overrides(["region=eu", "broken", "limit = 5"]);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["limit"], Value::from(" 5"));
    }
}
