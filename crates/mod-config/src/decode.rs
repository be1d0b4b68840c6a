//! Decoding one block against the current scope.
//!
//! A decode attempt evaluates every attribute of its block, so a single
//! attempt reports all unresolved references at once.

use std::collections::BTreeMap;

use hcl::expr::{Expression, ObjectKey};
use hcl::{Body, Value};

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::eval::{Evaluated, Evaluator};
use crate::name::{Location, PropertyPath, QualifiedName, ResourceKind};
use crate::parser::RawBlock;
use crate::resource::{
    ArgBinding, ArgValue, Benchmark, Control, Dashboard, Input, Local, Panel, Param, Query,
    QueryArgs, Resource, ResourceMeta, RuntimeDependency, Variable,
};

/// What a unit decodes from.
#[derive(Debug, Clone)]
pub(crate) enum UnitSource {
    Block(RawBlock),
    /// One attribute of a `locals` block
    Local { expr: Expression, location: Location },
}

impl UnitSource {
    pub(crate) fn location(&self) -> Location {
        match self {
            Self::Block(block) => block.location(),
            Self::Local { location, .. } => location.clone(),
        }
    }
}

/// Result of one decode attempt.
#[derive(Debug)]
pub(crate) enum Attempt {
    Decoded(Resource),
    Deferred(Vec<PropertyPath>),
    Failed(Diagnostics),
}

/// Decode one unit.
pub(crate) fn decode_unit(
    name: &QualifiedName,
    source: &UnitSource,
    evaluator: &Evaluator<'_>,
    variables: &BTreeMap<String, Value>,
) -> Attempt {
    let mut decoder = BlockDecoder::new(evaluator, name.to_string());
    let resource = match source {
        UnitSource::Local { expr, location } => decoder.expr_value(expr).map(|value| {
            Resource::Local(Local {
                meta: ResourceMeta::new(name.clone(), location.clone()),
                value,
            })
        }),
        UnitSource::Block(block) => match name.kind {
            ResourceKind::Variable => decode_variable(&mut decoder, name, block, variables),
            ResourceKind::Query => Some(decode_query(&mut decoder, name, block)),
            ResourceKind::Control => Some(decode_control(&mut decoder, name, block)),
            ResourceKind::Benchmark => decode_benchmark(&mut decoder, name, block),
            ResourceKind::Dashboard => Some(decode_dashboard(&mut decoder, name, block)),
            ResourceKind::Input => Some(Resource::Input(decode_input(
                &mut decoder,
                name.clone(),
                &block.body,
                block.location(),
                None,
            ))),
            ResourceKind::Mod | ResourceKind::Local => {
                decoder.error(format!("'{}' is not a resource block", block.block_type));
                None
            }
        },
    };
    decoder.finish(resource)
}

struct BlockDecoder<'a> {
    eval: &'a Evaluator<'a>,
    subject: String,
    deferred: Vec<PropertyPath>,
    diagnostics: Diagnostics,
    runtime: Vec<RuntimeDependency>,
}

impl<'a> BlockDecoder<'a> {
    fn new(eval: &'a Evaluator<'a>, subject: String) -> Self {
        Self {
            eval,
            subject,
            deferred: Vec::new(),
            diagnostics: Diagnostics::new(),
            runtime: Vec::new(),
        }
    }

    fn error(&mut self, summary: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(summary).with_subject(&self.subject));
    }

    fn finish(mut self, resource: Option<Resource>) -> Attempt {
        if self.diagnostics.has_errors() {
            return Attempt::Failed(self.diagnostics);
        }
        if !self.deferred.is_empty() {
            self.deferred.sort();
            self.deferred.dedup();
            return Attempt::Deferred(self.deferred);
        }
        match resource {
            Some(resource) => Attempt::Decoded(resource),
            None => {
                self.error("Block could not be decoded");
                Attempt::Failed(self.diagnostics)
            }
        }
    }

    fn expr_value(&mut self, expr: &Expression) -> Option<Value> {
        match self.eval.evaluate(expr) {
            Evaluated::Value(value) => Some(value),
            Evaluated::Deferred(paths) => {
                self.deferred.extend(paths);
                None
            }
            Evaluated::Failed(diagnostic) => {
                self.diagnostics.push(diagnostic.with_subject(&self.subject));
                None
            }
        }
    }

    fn value(&mut self, body: &Body, key: &str) -> Option<Value> {
        let attribute = body.attributes().find(|a| a.key() == key)?;
        self.expr_value(attribute.expr())
    }

    fn string(&mut self, body: &Body, key: &str) -> Option<String> {
        match self.value(body, key)? {
            Value::String(text) => Some(text),
            Value::Null => None,
            other => {
                self.error(format!("'{key}' must be a string, found {other:?}"));
                None
            }
        }
    }

    fn meta(&mut self, name: QualifiedName, body: &Body, location: Location) -> ResourceMeta {
        let mut meta = ResourceMeta::new(name, location);
        meta.title = self.string(body, "title");
        meta.description = self.string(body, "description");
        match self.value(body, "tags") {
            Some(Value::Object(tags)) => {
                for (key, value) in tags {
                    match value {
                        Value::String(text) => {
                            meta.tags.insert(key, text);
                        }
                        other => {
                            self.error(format!("tag '{key}' must be a string, found {other:?}"))
                        }
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => self.error(format!("'tags' must be an object, found {other:?}")),
        }
        meta
    }

    /// A reference to another resource, decoded from its `name`.
    fn reference(&mut self, body: &Body, key: &str, kind: ResourceKind) -> Option<QualifiedName> {
        let value = self.value(body, key)?;
        let name = value
            .as_object()
            .and_then(|object| object.get("name"))
            .and_then(Value::as_str)
            .and_then(|name| QualifiedName::parse(name, self.eval.registry()));
        match name {
            Some(name) if name.kind == kind => Some(name),
            _ => {
                self.error(format!("'{key}' must reference a {kind}"));
                None
            }
        }
    }

    fn params(&mut self, body: &Body) -> Vec<Param> {
        let mut params = Vec::new();
        for block in body.blocks().filter(|b| b.identifier() == "param") {
            let Some(name) = block.labels().first().map(|l| l.as_str().to_string()) else {
                self.error("'param' blocks need a name label");
                continue;
            };
            if params.iter().any(|p: &Param| p.name == name) {
                self.error(format!("Duplicate param '{name}'"));
                continue;
            }
            let description = self.string(block.body(), "description");
            let default = self.value(block.body(), "default");
            params.push(Param {
                name,
                description,
                default,
            });
        }
        params
    }

    /// Decode `args`, recording runtime references when `allow_runtime`.
    fn args(&mut self, body: &Body, source: &str, allow_runtime: bool) -> Option<QueryArgs> {
        let attribute = body.attributes().find(|a| a.key() == "args")?;
        match attribute.expr() {
            Expression::Object(object) => {
                let mut named = BTreeMap::new();
                for (key, expr) in object.iter() {
                    let Some(key) = self.object_key(key) else {
                        continue;
                    };
                    let binding = ArgBinding::ByName(key.clone());
                    if let Some(arg) = self.arg(expr, source, binding, allow_runtime) {
                        named.insert(key, arg);
                    }
                }
                Some(QueryArgs::Named(named))
            }
            Expression::Array(items) => {
                let mut positional = Vec::with_capacity(items.len());
                for (index, expr) in items.iter().enumerate() {
                    let binding = ArgBinding::ByPosition(index);
                    if let Some(arg) = self.arg(expr, source, binding, allow_runtime) {
                        positional.push(arg);
                    }
                }
                Some(QueryArgs::Positional(positional))
            }
            other => match self.expr_value(other)? {
                Value::Object(map) => Some(QueryArgs::Named(
                    map.into_iter().map(|(k, v)| (k, ArgValue::Value(v))).collect(),
                )),
                Value::Array(list) => Some(QueryArgs::Positional(
                    list.into_iter().map(ArgValue::Value).collect(),
                )),
                other => {
                    self.error(format!("'args' must be an object or a list, found {other:?}"));
                    None
                }
            },
        }
    }

    fn arg(
        &mut self,
        expr: &Expression,
        source: &str,
        binding: ArgBinding,
        allow_runtime: bool,
    ) -> Option<ArgValue> {
        if let Some(path) = self.eval.runtime_path(expr) {
            if !allow_runtime {
                self.error(format!("Runtime reference '{path}' is not allowed here"));
                return None;
            }
            self.runtime.push(RuntimeDependency {
                source: source.to_string(),
                path: path.clone(),
                binding,
            });
            return Some(ArgValue::Runtime(path));
        }
        self.expr_value(expr).map(ArgValue::Value)
    }

    fn object_key(&mut self, key: &ObjectKey) -> Option<String> {
        match key {
            ObjectKey::Identifier(ident) => Some(ident.as_str().to_string()),
            ObjectKey::Expression(expr) => match self.expr_value(expr)? {
                Value::String(text) => Some(text),
                other => {
                    self.error(format!("argument names must be strings, found {other:?}"));
                    None
                }
            },
            _ => {
                self.error("unsupported argument name");
                None
            }
        }
    }
}

fn decode_variable(
    decoder: &mut BlockDecoder<'_>,
    name: &QualifiedName,
    block: &RawBlock,
    overrides: &BTreeMap<String, Value>,
) -> Option<Resource> {
    let meta = decoder.meta(name.clone(), &block.body, block.location());
    // Type constraints are keywords, not values
    let type_name = block
        .body
        .attributes()
        .find(|a| a.key() == "type")
        .and_then(|a| match a.expr() {
            Expression::Variable(var) => Some(var.as_str().to_string()),
            _ => None,
        });
    let default = decoder.value(&block.body, "default");
    let value = match overrides.get(&name.name).or(default.as_ref()) {
        Some(value) => value.clone(),
        None if decoder.deferred.is_empty() => {
            decoder.error(format!("No value for required variable '{}'", name.name));
            return None;
        }
        None => return None,
    };
    Some(Resource::Variable(Variable {
        meta,
        type_name,
        default,
        value,
    }))
}

fn decode_query(
    decoder: &mut BlockDecoder<'_>,
    name: &QualifiedName,
    block: &RawBlock,
) -> Resource {
    let meta = decoder.meta(name.clone(), &block.body, block.location());
    let sql = decoder.string(&block.body, "sql");
    let params = decoder.params(&block.body);
    Resource::Query(Query { meta, sql, params })
}

fn decode_control(
    decoder: &mut BlockDecoder<'_>,
    name: &QualifiedName,
    block: &RawBlock,
) -> Resource {
    let meta = decoder.meta(name.clone(), &block.body, block.location());
    let sql = decoder.string(&block.body, "sql");
    let query = decoder.reference(&block.body, "query", ResourceKind::Query);
    if sql.is_some() && query.is_some() {
        decoder.error("'sql' and 'query' are mutually exclusive");
    }
    let args = decoder.args(&block.body, &name.to_string(), false);
    let params = decoder.params(&block.body);
    let severity = decoder.string(&block.body, "severity");
    Resource::Control(Control {
        meta,
        sql,
        query,
        args,
        params,
        severity,
    })
}

fn decode_benchmark(
    decoder: &mut BlockDecoder<'_>,
    name: &QualifiedName,
    block: &RawBlock,
) -> Option<Resource> {
    let meta = decoder.meta(name.clone(), &block.body, block.location());
    let mut children = Vec::new();

    if let Some(attribute) = block.body.attributes().find(|a| a.key() == "children") {
        let current_mod = decoder.eval.current_mod().to_string();
        let self_reference = decoder
            .eval
            .references(attribute.expr())
            .iter()
            .any(|path| path.resource(&current_mod) == *name);
        if self_reference {
            decoder.error(format!("Benchmark '{}' cannot be its own child", name.name));
            return None;
        }

        match decoder.expr_value(attribute.expr()) {
            Some(Value::Array(items)) => {
                for item in items {
                    let child = item
                        .as_object()
                        .and_then(|object| object.get("name"))
                        .and_then(Value::as_str)
                        .and_then(|text| QualifiedName::parse(text, decoder.eval.registry()));
                    match child {
                        Some(child) if child.kind.is_tree_item() => {
                            if children.contains(&child) {
                                decoder.error(format!("Duplicate child '{child}'"));
                            } else {
                                children.push(child);
                            }
                        }
                        _ => decoder.error("children must be controls or benchmarks"),
                    }
                }
            }
            Some(other) => decoder.error(format!("'children' must be a list, found {other:?}")),
            None => {}
        }
    }

    Some(Resource::Benchmark(Benchmark { meta, children }))
}

fn decode_dashboard(
    decoder: &mut BlockDecoder<'_>,
    name: &QualifiedName,
    block: &RawBlock,
) -> Resource {
    let meta = decoder.meta(name.clone(), &block.body, block.location());
    let mut inputs: Vec<Input> = Vec::new();
    let mut panels: Vec<Panel> = Vec::new();

    for (index, nested) in block.body.blocks().enumerate() {
        let identifier = nested.identifier();
        let label = nested.labels().first().map(|l| l.as_str().to_string());

        if identifier == ResourceKind::Input.as_str() {
            let Some(label) = label else {
                decoder.error("dashboard inputs need a name label");
                continue;
            };
            if inputs.iter().any(|i| i.short_name() == label) {
                decoder.error(format!("Duplicate input '{label}'"));
                continue;
            }
            let input_name = QualifiedName::new(
                name.mod_name.clone(),
                ResourceKind::Input,
                format!("{}.{label}", name.name),
            );
            let location = Location::new(block.file.clone(), format!("input \"{label}\""));
            let input =
                decode_input(decoder, input_name, nested.body(), location, Some(&name.name));
            inputs.push(input);
        } else if decoder.eval.registry().is_panel(identifier) {
            let panel_name =
                label.unwrap_or_else(|| format!("{}_anonymous_{identifier}_{index}", name.name));
            if panels.iter().any(|p| p.name == panel_name) {
                decoder.error(format!("Duplicate panel '{panel_name}'"));
                continue;
            }
            let source = format!("{name}.{identifier}.{panel_name}");
            let body = nested.body();
            panels.push(Panel {
                title: decoder.string(body, "title"),
                sql: decoder.string(body, "sql"),
                query: decoder.reference(body, "query", ResourceKind::Query),
                args: decoder.args(body, &source, true),
                name: panel_name,
                panel_type: identifier.to_string(),
            });
        } else {
            decoder.error(format!("Unsupported block type '{identifier}' in dashboard"));
        }
    }

    // Self-scoped references must name an input of this dashboard
    let undeclared: Vec<String> = decoder
        .runtime
        .iter()
        .filter(|dep| dep.path.is_self_scoped())
        .filter(|dep| !inputs.iter().any(|i| i.short_name() == dep.path.name))
        .map(|dep| dep.path.to_string())
        .collect();
    for path in undeclared {
        decoder.error(format!("'{path}' does not name an input of this dashboard"));
    }

    Resource::Dashboard(Dashboard {
        meta,
        inputs,
        panels,
        runtime_dependencies: decoder.runtime.clone(),
    })
}

fn decode_input(
    decoder: &mut BlockDecoder<'_>,
    name: QualifiedName,
    body: &Body,
    location: Location,
    dashboard: Option<&str>,
) -> Input {
    let source = name.to_string();
    let meta = decoder.meta(name, body, location);
    let input_type = decoder.string(body, "type");
    let sql = decoder.string(body, "sql");
    let query = decoder.reference(body, "query", ResourceKind::Query);
    let args = decoder.args(body, &source, true);

    if dashboard.is_none() {
        let scoped: Vec<String> = decoder
            .runtime
            .iter()
            .filter(|dep| dep.source == source && dep.path.is_self_scoped())
            .map(|dep| dep.path.to_string())
            .collect();
        for path in scoped {
            decoder.error(format!("'{path}' can only be used inside a dashboard"));
        }
    }

    let runtime_dependencies = decoder
        .runtime
        .iter()
        .filter(|dep| dep.source == source)
        .cloned()
        .collect();

    Input {
        meta,
        dashboard: dashboard.map(str::to_string),
        input_type,
        sql,
        query,
        args,
        runtime_dependencies,
    }
}
