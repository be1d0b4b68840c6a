//! Execution-time binding of runtime dependencies and query arguments
//!
//! Nothing here runs during decoding. When a dashboard runs, the values
//! chosen for its inputs are bound into the args of its panels, and every
//! query call is described as a prepared statement name plus an ordered
//! argument list for the query executor.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use hcl::Value;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::modfile::Mod;
use crate::name::{QualifiedName, ResourceKind};
use crate::resource::{
    ArgBinding, ArgValue, HclResource, Input, Param, QueryArgs, Resource, RuntimeDependency,
};

static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("Invalid identifier regex"));

/// Input property carrying the chosen value.
const VALUE_PROPERTY: &str = "value";

/// Workspace-wide resource lookup by qualified name.
pub trait ResourceProvider {
    fn resource(&self, name: &QualifiedName) -> Option<&Resource>;
}

impl ResourceProvider for Mod {
    fn resource(&self, name: &QualifiedName) -> Option<&Resource> {
        Mod::resource(self, name)
    }
}

impl RuntimeDependency {
    /// Find the input this dependency reads.
    ///
    /// A `self` scoped path only matches inputs declared inside `scope`;
    /// any other path is looked up through `provider`.
    pub fn resolve<'a>(
        &self,
        scope: &'a Resource,
        provider: &'a dyn ResourceProvider,
    ) -> Result<&'a Input> {
        let fail = |reason: String| Error::RuntimeDependency {
            source_name: self.source.clone(),
            path: self.path.to_string(),
            reason,
        };

        if self.path.kind != ResourceKind::Input {
            return Err(fail(format!("{} values are not runtime values", self.path.kind)));
        }

        if self.path.is_self_scoped() {
            let Some(dashboard) = scope.as_dashboard() else {
                return Err(fail(format!("{} has no nested inputs", scope.name())));
            };
            return dashboard
                .input(&self.path.name)
                .ok_or_else(|| fail(format!("{} declares no such input", scope.name())));
        }

        let target = self.path.resource(&scope.name().mod_name);
        provider
            .resource(&target)
            .and_then(Resource::as_input)
            .ok_or_else(|| fail(format!("no input named {target}")))
    }
}

/// Values chosen for inputs, by input name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputValues {
    values: BTreeMap<QualifiedName, Value>,
}

impl InputValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, input: QualifiedName, value: impl Into<Value>) {
        self.values.insert(input, value.into());
    }

    pub fn get(&self, input: &QualifiedName) -> Option<&Value> {
        self.values.get(input)
    }
}

/// Replace the runtime args of `source` with the chosen input values.
///
/// `scope` is the resource that recorded the dependencies: the dashboard of
/// a panel, or a top-level input.
pub fn bind_runtime_args(
    args: &QueryArgs,
    source: &str,
    scope: &Resource,
    provider: &dyn ResourceProvider,
    values: &InputValues,
) -> Result<QueryArgs> {
    let mut bound = args.clone();

    for dependency in scope
        .runtime_dependencies()
        .iter()
        .filter(|d| d.source == source)
    {
        let input = dependency.resolve(scope, provider)?;
        let fail = |reason: String| Error::RuntimeDependency {
            source_name: dependency.source.clone(),
            path: dependency.path.to_string(),
            reason,
        };

        match dependency.path.property.as_slice() {
            [] => {}
            [property] if property == VALUE_PROPERTY => {}
            other => {
                let property = other.join(".");
                return Err(fail(format!("unsupported input property '{property}'")));
            }
        }
        let value = values
            .get(input.name())
            .ok_or_else(|| fail(format!("no value chosen for {}", input.name())))?
            .clone();

        let slot = match (&mut bound, &dependency.binding) {
            (QueryArgs::Named(named), ArgBinding::ByName(name)) => named.get_mut(name),
            (QueryArgs::Positional(list), ArgBinding::ByPosition(index)) => list.get_mut(*index),
            _ => None,
        };
        let Some(slot) = slot else {
            return Err(fail(format!("{} does not match the args", dependency.binding)));
        };
        *slot = ArgValue::Value(value);
        debug!(source, input = %input.name(), binding = %dependency.binding, "bound runtime arg");
    }

    Ok(bound)
}

/// Prepared statement name of a query or control: `<mod>_<kind>_<name>`.
pub fn prepared_statement_name(name: &QualifiedName) -> String {
    let raw = format!("{}_{}_{}", name.mod_name, name.kind, name.name);
    NON_IDENTIFIER.replace_all(&raw, "_").into_owned()
}

/// Order `args` by `params`, filling gaps from param defaults.
///
/// Without params, positional args pass through unchanged.
pub fn resolve_args(
    resource: &str,
    params: &[Param],
    args: Option<&QueryArgs>,
) -> Result<Vec<Value>> {
    let fail = |reason: String| Error::Arguments {
        resource: resource.to_string(),
        reason,
    };
    let concrete = |arg: &ArgValue| match arg {
        ArgValue::Value(value) => Ok(value.clone()),
        ArgValue::Runtime(path) => Err(fail(format!("runtime arg '{path}' has not been bound"))),
    };
    let from_default = |param: &Param| {
        param
            .default
            .clone()
            .ok_or_else(|| fail(format!("missing value for param '{}'", param.name)))
    };

    match args {
        None => params.iter().map(from_default).collect(),
        Some(QueryArgs::Named(named)) => {
            if let Some(unknown) = named.keys().find(|k| !params.iter().any(|p| &p.name == *k)) {
                return Err(fail(format!("no param named '{unknown}'")));
            }
            params
                .iter()
                .map(|param| match named.get(&param.name) {
                    Some(arg) => concrete(arg),
                    None => from_default(param),
                })
                .collect()
        }
        Some(QueryArgs::Positional(list)) => {
            if params.is_empty() {
                return list.iter().map(concrete).collect();
            }
            if list.len() > params.len() {
                return Err(fail(format!(
                    "{} args given for {} params",
                    list.len(),
                    params.len()
                )));
            }
            params
                .iter()
                .enumerate()
                .map(|(index, param)| match list.get(index) {
                    Some(arg) => concrete(arg),
                    None => from_default(param),
                })
                .collect()
        }
    }
}

/// A query call ready for the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub statement: String,
    pub args: Vec<Value>,
}

/// Prepare the call made by a control.
///
/// A control reading its SQL from a query uses that query's statement and
/// params.
pub fn prepare_control(
    control: &QualifiedName,
    provider: &dyn ResourceProvider,
) -> Result<PreparedCall> {
    let not_found = || Error::Arguments {
        resource: control.to_string(),
        reason: "no such control".to_string(),
    };
    let resource = provider.resource(control).ok_or_else(not_found)?;
    let control_def = resource.as_control().ok_or_else(not_found)?;

    let (statement_owner, params) = match &control_def.query {
        Some(query_name) => {
            let query = provider
                .resource(query_name)
                .and_then(Resource::as_query)
                .ok_or_else(|| Error::Arguments {
                    resource: control.to_string(),
                    reason: format!("query {query_name} not found"),
                })?;
            (query_name, query.params.as_slice())
        }
        None => (control, control_def.params.as_slice()),
    };

    let args = resolve_args(&control.to_string(), params, control_def.args.as_ref())?;
    Ok(PreparedCall {
        statement: prepared_statement_name(statement_owner),
        args,
    })
}

/// Prepare the call made by a dashboard panel, binding input values first.
pub fn prepare_panel(
    dashboard: &QualifiedName,
    panel: &str,
    provider: &dyn ResourceProvider,
    values: &InputValues,
) -> Result<PreparedCall> {
    let fail = |reason: String| Error::Arguments {
        resource: format!("{dashboard}.{panel}"),
        reason,
    };
    let scope = provider
        .resource(dashboard)
        .ok_or_else(|| fail("no such dashboard".to_string()))?;
    let dashboard_def = scope
        .as_dashboard()
        .ok_or_else(|| fail("not a dashboard".to_string()))?;
    let panel_def = dashboard_def
        .panel(panel)
        .ok_or_else(|| fail("no such panel".to_string()))?;
    let Some(query_name) = &panel_def.query else {
        return Err(fail("panel does not use a named query".to_string()));
    };
    let query = provider
        .resource(query_name)
        .and_then(Resource::as_query)
        .ok_or_else(|| fail(format!("query {query_name} not found")))?;

    let source = format!("{dashboard}.{}.{}", panel_def.panel_type, panel_def.name);
    let bound = match &panel_def.args {
        Some(args) => Some(bind_runtime_args(args, &source, scope, provider, values)?),
        None => None,
    };
    let args = resolve_args(&source, &query.params, bound.as_ref())?;
    Ok(PreparedCall {
        statement: prepared_statement_name(query_name),
        args,
    })
}
