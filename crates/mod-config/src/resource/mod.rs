//! Decoded resources
//!
//! Every resource exposes its [`ResourceKind`] and [`QualifiedName`] through
//! [`HclResource`], and a mod stores all of them in one [`ResourceMap`].

mod benchmark;
mod dashboard;
mod dependency;
mod query;
mod variable;

pub use benchmark::Benchmark;
pub use dashboard::{Dashboard, Input, Panel};
pub use dependency::{ArgBinding, ResourceDependency, RuntimeDependency};
pub use query::{ArgValue, Control, Param, Query, QueryArgs};
pub use variable::{Local, Variable};

use std::collections::BTreeMap;

use hcl::Value;

use crate::name::{Location, QualifiedName, ResourceKind};

/// Common behaviour of decoded resources.
pub trait HclResource {
    fn kind(&self) -> ResourceKind;

    fn name(&self) -> &QualifiedName;

    /// Value exposed to other blocks through the evaluation context.
    fn to_value(&self) -> Value;

    /// References bound at execution time.
    fn runtime_dependencies(&self) -> &[RuntimeDependency] {
        &[]
    }
}

/// Resources that take part in the control tree.
pub trait TreeItem: HclResource {
    fn title(&self) -> Option<&str>;

    /// Children in declaration order.
    fn children(&self) -> &[QualifiedName];
}

/// Fields shared by every resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMeta {
    pub name: QualifiedName,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub location: Location,
}

impl ResourceMeta {
    pub fn new(name: QualifiedName, location: Location) -> Self {
        Self {
            name,
            title: None,
            description: None,
            tags: BTreeMap::new(),
            location,
        }
    }

    /// Base object value: `name`, `resource_name`, `title`, `description`
    /// and `tags`.
    pub(crate) fn base_value(&self) -> hcl::Map<String, Value> {
        let mut map = hcl::Map::new();
        map.insert("name".to_string(), Value::from(self.name.to_string()));
        map.insert(
            "resource_name".to_string(),
            Value::from(self.name.name.clone()),
        );
        map.insert("title".to_string(), optional_string(&self.title));
        map.insert("description".to_string(), optional_string(&self.description));
        let tags: hcl::Map<String, Value> = self
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        map.insert("tags".to_string(), Value::Object(tags));
        map
    }
}

pub(crate) fn optional_string(value: &Option<String>) -> Value {
    value.clone().map(Value::from).unwrap_or(Value::Null)
}

/// Any decoded resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Variable(Variable),
    Local(Local),
    Query(Query),
    Control(Control),
    Benchmark(Benchmark),
    Dashboard(Dashboard),
    Input(Input),
}

impl Resource {
    fn inner(&self) -> &dyn HclResource {
        match self {
            Self::Variable(r) => r,
            Self::Local(r) => r,
            Self::Query(r) => r,
            Self::Control(r) => r,
            Self::Benchmark(r) => r,
            Self::Dashboard(r) => r,
            Self::Input(r) => r,
        }
    }

    /// The tree capability, for controls and benchmarks.
    pub fn as_tree_item(&self) -> Option<&dyn TreeItem> {
        match self {
            Self::Control(r) => Some(r),
            Self::Benchmark(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Self::Query(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&Control> {
        match self {
            Self::Control(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_benchmark(&self) -> Option<&Benchmark> {
        match self {
            Self::Benchmark(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_dashboard(&self) -> Option<&Dashboard> {
        match self {
            Self::Dashboard(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_input(&self) -> Option<&Input> {
        match self {
            Self::Input(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(r) => Some(r),
            _ => None,
        }
    }
}

impl HclResource for Resource {
    fn kind(&self) -> ResourceKind {
        self.inner().kind()
    }

    fn name(&self) -> &QualifiedName {
        self.inner().name()
    }

    fn to_value(&self) -> Value {
        self.inner().to_value()
    }

    fn runtime_dependencies(&self) -> &[RuntimeDependency] {
        match self {
            Self::Dashboard(r) => r.runtime_dependencies(),
            Self::Input(r) => r.runtime_dependencies(),
            _ => &[],
        }
    }
}

/// Resources of one mod, by kind then short name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMap {
    inner: BTreeMap<ResourceKind, BTreeMap<String, Resource>>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource. A resource with the same kind and name is returned
    /// back unchanged and the map is not modified.
    pub fn insert(&mut self, resource: Resource) -> std::result::Result<(), Resource> {
        let by_name = self.inner.entry(resource.kind()).or_default();
        let short = resource.name().name.clone();
        if by_name.contains_key(&short) {
            return Err(resource);
        }
        by_name.insert(short, resource);
        Ok(())
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.inner.get(&kind)?.get(name)
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Resources of one kind, sorted by name.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.inner.get(&kind).into_iter().flat_map(|m| m.values())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.inner.values().flat_map(|m| m.values())
    }

    pub fn len(&self) -> usize {
        self.inner.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
