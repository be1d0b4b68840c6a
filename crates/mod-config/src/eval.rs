//! Expression evaluation against the names resolved so far.

use std::collections::BTreeMap;

use hcl::Value;
use hcl::eval::{Context, ErrorKind, Evaluate};
use hcl::expr::{Expression, ObjectKey, Operation, TraversalOperator};
use hcl::template::{Element, Template};

use crate::diagnostic::Diagnostic;
use crate::name::{PropertyPath, QualifiedName};
use crate::registry::BlockRegistry;

/// Values visible to expressions.
///
/// Resources of the mod being decoded are reachable as `<kind>.<name>`
/// (`var.<name>`, `local.<name>`, `query.<name>`, ...), and every known mod,
/// the current one included, as `<mod>.<kind>.<name>`.
#[derive(Debug, Clone)]
pub(crate) struct EvalScope {
    current_mod: String,
    roots: BTreeMap<String, BTreeMap<String, Value>>,
    mods: BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>,
}

impl EvalScope {
    pub(crate) fn new(current_mod: &str, registry: &BlockRegistry) -> Self {
        let roots = registry
            .reference_prefixes()
            .map(|prefix| (prefix.to_string(), BTreeMap::new()))
            .collect();
        let mut mods = BTreeMap::new();
        mods.insert(current_mod.to_string(), BTreeMap::new());
        Self {
            current_mod: current_mod.to_string(),
            roots,
            mods,
        }
    }

    pub(crate) fn current_mod(&self) -> &str {
        &self.current_mod
    }

    pub(crate) fn add_mod(&mut self, mod_name: &str) {
        self.mods.entry(mod_name.to_string()).or_default();
    }

    pub(crate) fn insert(&mut self, name: &QualifiedName, value: Value) {
        let kind = name.kind.as_str().to_string();
        if name.mod_name == self.current_mod {
            self.roots
                .entry(kind.clone())
                .or_default()
                .insert(name.name.clone(), value.clone());
        }
        self.mods
            .entry(name.mod_name.clone())
            .or_default()
            .entry(kind)
            .or_default()
            .insert(name.name.clone(), value);
    }

    pub(crate) fn contains(&self, name: &QualifiedName) -> bool {
        self.mods
            .get(&name.mod_name)
            .and_then(|kinds| kinds.get(name.kind.as_str()))
            .is_some_and(|names| names.contains_key(&name.name))
    }

    /// Whether the resource a path points at is already known.
    pub(crate) fn resolves(&self, path: &PropertyPath) -> bool {
        !path.is_self_scoped() && self.contains(&path.resource(&self.current_mod))
    }

    pub(crate) fn mod_names(&self) -> Vec<String> {
        self.mods.keys().cloned().collect()
    }

    pub(crate) fn context(&self) -> Context<'static> {
        let mut ctx = Context::new();
        for (mod_name, kinds) in &self.mods {
            if self.roots.contains_key(mod_name) {
                continue;
            }
            let value = Value::Object(
                kinds
                    .iter()
                    .map(|(kind, names)| (kind.clone(), object(names)))
                    .collect(),
            );
            ctx.declare_var(mod_name.as_str(), value);
        }
        for (prefix, names) in &self.roots {
            ctx.declare_var(prefix.as_str(), object(names));
        }
        ctx
    }
}

fn object(entries: &BTreeMap<String, Value>) -> Value {
    Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// Outcome of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Evaluated {
    Value(Value),
    /// Only unknown names; the paths that are not resolved yet
    Deferred(Vec<PropertyPath>),
    Failed(Diagnostic),
}

/// Evaluates expressions for one decode attempt.
pub(crate) struct Evaluator<'a> {
    registry: &'a BlockRegistry,
    scope: &'a EvalScope,
    context: Context<'static>,
    mod_names: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(registry: &'a BlockRegistry, scope: &'a EvalScope) -> Self {
        Self {
            registry,
            scope,
            context: scope.context(),
            mod_names: scope.mod_names(),
        }
    }

    pub(crate) fn registry(&self) -> &BlockRegistry {
        self.registry
    }

    pub(crate) fn current_mod(&self) -> &str {
        self.scope.current_mod()
    }

    /// Resource references made anywhere in `expr`.
    pub(crate) fn references(&self, expr: &Expression) -> Vec<PropertyPath> {
        let mut segments = Vec::new();
        collect_traversals(expr, &mut segments);
        let mut paths: Vec<PropertyPath> = segments
            .iter()
            .filter_map(|s| PropertyPath::from_segments(s, self.registry, &self.mod_names))
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// `expr` itself, when it is a plain reference to a runtime kind.
    pub(crate) fn runtime_path(&self, expr: &Expression) -> Option<PropertyPath> {
        let segments = plain_traversal(expr)?;
        let path = PropertyPath::from_segments(&segments, self.registry, &self.mod_names)?;
        self.registry.is_runtime(path.kind).then_some(path)
    }

    pub(crate) fn evaluate(&self, expr: &Expression) -> Evaluated {
        let references = self.references(expr);
        if let Some(path) = references.iter().find(|p| self.registry.is_runtime(p.kind)) {
            return Evaluated::Failed(
                Diagnostic::error(format!("Runtime reference '{path}' used outside of args"))
                    .with_detail("input values are only known when a dashboard runs"),
            );
        }
        if let Some(path) = references.iter().find(|p| p.is_self_scoped()) {
            return Evaluated::Failed(Diagnostic::error(format!(
                "'self' reference '{path}' can only name an input"
            )));
        }

        match expr.evaluate(&self.context) {
            Ok(value) => Evaluated::Value(value),
            Err(error) => {
                let unknown_only =
                    matches!(error.kind(), ErrorKind::UndefinedVar(_) | ErrorKind::NoSuchKey(_));
                let missing: Vec<PropertyPath> = references
                    .into_iter()
                    .filter(|p| !self.scope.resolves(p))
                    .collect();
                if unknown_only && !missing.is_empty() {
                    Evaluated::Deferred(missing)
                } else {
                    Evaluated::Failed(
                        Diagnostic::error("Invalid expression").with_detail(error.to_string()),
                    )
                }
            }
        }
    }
}

/// Segments of `expr` when it is `a.b.c` with attribute access only.
fn plain_traversal(expr: &Expression) -> Option<Vec<String>> {
    match expr {
        Expression::Variable(var) => Some(vec![var.as_str().to_string()]),
        Expression::Traversal(traversal) => {
            let Expression::Variable(var) = &traversal.expr else {
                return None;
            };
            let mut segments = vec![var.as_str().to_string()];
            for operator in &traversal.operators {
                match operator {
                    TraversalOperator::GetAttr(ident) => segments.push(ident.as_str().to_string()),
                    _ => return None,
                }
            }
            Some(segments)
        }
        _ => None,
    }
}

/// Collect the leading attribute chain of every traversal in `expr`.
fn collect_traversals(expr: &Expression, out: &mut Vec<Vec<String>>) {
    match expr {
        Expression::Variable(var) => out.push(vec![var.as_str().to_string()]),
        Expression::Traversal(traversal) => {
            match &traversal.expr {
                Expression::Variable(var) => {
                    let mut segments = vec![var.as_str().to_string()];
                    for operator in &traversal.operators {
                        match operator {
                            TraversalOperator::GetAttr(ident) => {
                                segments.push(ident.as_str().to_string())
                            }
                            _ => break,
                        }
                    }
                    out.push(segments);
                }
                other => collect_traversals(other, out),
            }
            for operator in &traversal.operators {
                if let TraversalOperator::Index(index) = operator {
                    collect_traversals(index, out);
                }
            }
        }
        Expression::Array(items) => {
            for item in items {
                collect_traversals(item, out);
            }
        }
        Expression::Object(object) => {
            for (key, value) in object.iter() {
                if let ObjectKey::Expression(key) = key {
                    collect_traversals(key, out);
                }
                collect_traversals(value, out);
            }
        }
        Expression::TemplateExpr(template) => {
            if let Ok(template) = Template::from_expr(template) {
                for element in template.elements() {
                    if let Element::Interpolation(interpolation) = element {
                        collect_traversals(&interpolation.expr, out);
                    }
                }
            }
        }
        Expression::FuncCall(call) => {
            for arg in &call.args {
                collect_traversals(arg, out);
            }
        }
        Expression::Parenthesis(inner) => collect_traversals(inner, out),
        Expression::Conditional(cond) => {
            collect_traversals(&cond.cond_expr, out);
            collect_traversals(&cond.true_expr, out);
            collect_traversals(&cond.false_expr, out);
        }
        Expression::Operation(operation) => match operation.as_ref() {
            Operation::Unary(unary) => collect_traversals(&unary.expr, out),
            Operation::Binary(binary) => {
                collect_traversals(&binary.lhs_expr, out);
                collect_traversals(&binary.rhs_expr, out);
            }
        },
        Expression::ForExpr(for_expr) => {
            collect_traversals(&for_expr.collection_expr, out);
            if let Some(key_expr) = &for_expr.key_expr {
                collect_traversals(key_expr, out);
            }
            collect_traversals(&for_expr.value_expr, out);
            if let Some(cond_expr) = &for_expr.cond_expr {
                collect_traversals(cond_expr, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::ResourceKind;

    fn expr(text: &str) -> Expression {
        let body = hcl::parse(&format!("x = {text}\n")).unwrap();
        body.attributes().next().unwrap().expr().clone()
    }

    fn scope() -> EvalScope {
        let registry = BlockRegistry::with_builtins();
        let mut scope = EvalScope::new("m", &registry);
        scope.insert(
            &QualifiedName::new("m", ResourceKind::Local, "region"),
            Value::from("eu"),
        );
        scope
    }

    #[test]
    fn test_resolved_reference_evaluates() {
        let registry = BlockRegistry::with_builtins();
        let scope = scope();
        let evaluator = Evaluator::new(&registry, &scope);

        assert_eq!(
            evaluator.evaluate(&expr("\"${local.region}-1\"")),
            Evaluated::Value(Value::from("eu-1"))
        );
        assert_eq!(
            evaluator.evaluate(&expr("m.local.region")),
            Evaluated::Value(Value::from("eu"))
        );
    }

    #[test]
    fn test_unknown_name_defers_with_path() {
        let registry = BlockRegistry::with_builtins();
        let scope = scope();
        let evaluator = Evaluator::new(&registry, &scope);

        let Evaluated::Deferred(paths) = evaluator.evaluate(&expr("\"${local.later}-x\"")) else {
            panic!("expected deferral");
        };
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].to_string(), "local.later");
    }

    #[test]
    fn test_runtime_reference_outside_args_fails() {
        let registry = BlockRegistry::with_builtins();
        let scope = scope();
        let evaluator = Evaluator::new(&registry, &scope);

        assert!(matches!(
            evaluator.evaluate(&expr("self.input.region.value")),
            Evaluated::Failed(_)
        ));
        assert!(evaluator.runtime_path(&expr("self.input.region.value")).is_some());
        assert!(evaluator.runtime_path(&expr("local.region")).is_none());
    }

    #[test]
    fn test_references_cover_nested_expressions() {
        let registry = BlockRegistry::with_builtins();
        let scope = scope();
        let evaluator = Evaluator::new(&registry, &scope);

        let refs = evaluator.references(&expr(
            "var.on ? [query.a.sql, { k = local.b }] : [for x in local.c : x]",
        ));
        let refs: Vec<String> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["var.on", "local.b", "local.c", "query.a.sql"]);
    }
}
