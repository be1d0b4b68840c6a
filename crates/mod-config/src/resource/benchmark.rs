use hcl::Value;

use super::{HclResource, ResourceMeta, TreeItem};
use crate::name::{QualifiedName, ResourceKind};

/// A named group of controls and other benchmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct Benchmark {
    pub meta: ResourceMeta,
    pub children: Vec<QualifiedName>,
}

impl HclResource for Benchmark {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Benchmark
    }

    fn name(&self) -> &QualifiedName {
        &self.meta.name
    }

    fn to_value(&self) -> Value {
        let mut map = self.meta.base_value();
        let children = self
            .children
            .iter()
            .map(|child| Value::from(child.to_string()))
            .collect();
        map.insert("children".to_string(), Value::Array(children));
        Value::Object(map)
    }
}

impl TreeItem for Benchmark {
    fn title(&self) -> Option<&str> {
        self.meta.title.as_deref()
    }

    fn children(&self) -> &[QualifiedName] {
        &self.children
    }
}
