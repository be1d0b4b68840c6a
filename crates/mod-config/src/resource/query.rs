use std::collections::BTreeMap;

use hcl::Value;

use super::{HclResource, ResourceMeta, TreeItem, optional_string};
use crate::name::{PropertyPath, QualifiedName, ResourceKind};

/// A declared query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub description: Option<String>,
    pub default: Option<Value>,
}

/// One argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Value(Value),
    /// Filled from an input at execution time
    Runtime(PropertyPath),
}

/// Arguments passed to a query, by name or by position.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArgs {
    Named(BTreeMap<String, ArgValue>),
    Positional(Vec<ArgValue>),
}

impl QueryArgs {
    pub fn len(&self) -> usize {
        match self {
            Self::Named(args) => args.len(),
            Self::Positional(args) => args.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn to_value(&self) -> Value {
        let arg_value = |arg: &ArgValue| match arg {
            ArgValue::Value(value) => value.clone(),
            ArgValue::Runtime(_) => Value::Null,
        };
        match self {
            Self::Named(args) => Value::Object(
                args.iter()
                    .map(|(name, arg)| (name.clone(), arg_value(arg)))
                    .collect(),
            ),
            Self::Positional(args) => Value::Array(args.iter().map(arg_value).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub meta: ResourceMeta,
    pub sql: Option<String>,
    pub params: Vec<Param>,
}

impl HclResource for Query {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Query
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        let mut map = self.meta.base_value();
        map.insert("sql".to_string(), optional_string(&self.sql));
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub meta: ResourceMeta,
    pub sql: Option<String>,
    /// Query providing the SQL when `sql` is absent
    pub query: Option<QualifiedName>,
    pub args: Option<QueryArgs>,
    pub params: Vec<Param>,
    pub severity: Option<String>,
}

impl HclResource for Control {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Control
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        let mut map = self.meta.base_value();
        map.insert("sql".to_string(), optional_string(&self.sql));
        map.insert("severity".to_string(), optional_string(&self.severity));
        map.insert(
            "query".to_string(),
            optional_string(&self.query.as_ref().map(ToString::to_string)),
        );
        if let Some(args) = &self.args {
            map.insert("args".to_string(), args.to_value());
        }
        Value::Object(map)
    }
}

impl TreeItem for Control {
    fn title(&self) -> Option<&str> {
        self.meta.title.as_deref()
    }

    fn children(&self) -> &[QualifiedName] {
        &[]
    }
}
