use hcl::Value;

use super::{HclResource, ResourceMeta};
use crate::name::{QualifiedName, ResourceKind};

/// An input variable of a mod.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub meta: ResourceMeta,
    /// Declared type constraint, kept as written
    pub type_name: Option<String>,
    pub default: Option<Value>,
    /// Effective value: the caller's override, else the default
    pub value: Value,
}

impl HclResource for Variable {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Variable
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        self.value.clone()
    }
}

/// One attribute of a `locals` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub meta: ResourceMeta,
    pub value: Value,
}

impl HclResource for Local {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Local
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        self.value.clone()
    }
}
