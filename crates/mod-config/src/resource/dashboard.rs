use hcl::Value;

use super::{HclResource, QueryArgs, ResourceMeta, RuntimeDependency, optional_string};
use crate::name::{QualifiedName, ResourceKind};

/// A dashboard with its nested inputs and panels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub meta: ResourceMeta,
    pub inputs: Vec<Input>,
    pub panels: Vec<Panel>,
    /// Runtime references of every panel and input, in declaration order
    pub runtime_dependencies: Vec<RuntimeDependency>,
}

impl Dashboard {
    /// Nested input by its short name.
    pub fn input(&self, short_name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.short_name() == short_name)
    }

    pub fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.name == name)
    }
}

impl HclResource for Dashboard {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Dashboard
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        let mut map = self.meta.base_value();
        let inputs: hcl::Map<String, Value> = self
            .inputs
            .iter()
            .map(|i| (i.short_name().to_string(), i.to_value()))
            .collect();
        map.insert("inputs".to_string(), Value::Object(inputs));
        Value::Object(map)
    }

    fn runtime_dependencies(&self) -> &[RuntimeDependency] {
        &self.runtime_dependencies
    }
}

/// An interactive input whose value is chosen when a dashboard runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub meta: ResourceMeta,
    /// Dashboard declaring this input, `None` for top-level inputs
    pub dashboard: Option<String>,
    pub input_type: Option<String>,
    pub sql: Option<String>,
    pub query: Option<QualifiedName>,
    pub args: Option<QueryArgs>,
    pub runtime_dependencies: Vec<RuntimeDependency>,
}

impl Input {
    /// Name without the owning dashboard prefix.
    pub fn short_name(&self) -> &str {
        let name = &self.meta.name.name;
        name.rsplit_once('.').map_or(name.as_str(), |(_, short)| short)
    }
}

impl HclResource for Input {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Input
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        let mut map = self.meta.base_value();
        map.insert("type".to_string(), optional_string(&self.input_type));
        map.insert("sql".to_string(), optional_string(&self.sql));
        // Only known at execution time
        map.insert("value".to_string(), Value::Null);
        Value::Object(map)
    }

    fn runtime_dependencies(&self) -> &[RuntimeDependency] {
        &self.runtime_dependencies
    }
}

/// A `table`, `chart` or `card` inside a dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Label, or `<dashboard>_anonymous_<type>_<index>`
    pub name: String,
    pub panel_type: String,
    pub title: Option<String>,
    pub sql: Option<String>,
    pub query: Option<QualifiedName>,
    pub args: Option<QueryArgs>,
}
