//! Run context and the fixpoint decode loop
//!
//! Blocks may reference each other in any order. The run context decodes
//! every block in declaration order, pass after pass, against the names
//! resolved so far. A block that only fails on unknown names is deferred
//! and retried on the next pass, and each deferral records graph edges from
//! the block to the names it waits for. The loop stops after a pass that
//! resolves nothing new; whatever is still deferred is then reported, with
//! cycles named through a topological sort of the graph.

use std::collections::{BTreeMap, BTreeSet};

use hcl::Value;
use tracing::{debug, trace, warn};

use crate::constraint::NameConvention;
use crate::decode::{Attempt, UnitSource, decode_unit};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::eval::{EvalScope, Evaluator};
use crate::graph::{DependencyGraph, ROOT_NODE};
use crate::modfile::Mod;
use crate::name::{Location, QualifiedName, ResourceKind};
use crate::parser::RawBlock;
use crate::registry::BlockRegistry;
use crate::resource::{HclResource, ResourceDependency, ResourceMap, RuntimeDependency};

/// Decode state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Not attempted yet
    Pending,
    /// Waiting for unresolved compile-time references
    Deferred,
    /// Decoded, with references bound at execution time
    RuntimeDeferred,
    Resolved,
    /// Failed with a diagnostic other than an unknown name
    Failed,
}

impl BlockState {
    fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Deferred)
    }
}

/// Caller supplied inputs to a decode.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Variable values overriding declared defaults
    pub variables: BTreeMap<String, Value>,
    pub naming: NameConvention,
}

#[derive(Debug)]
struct Unit {
    name: QualifiedName,
    source: UnitSource,
    state: BlockState,
}

/// Decode state for one mod.
pub struct RunContext<'r> {
    registry: &'r BlockRegistry,
    shell: Mod,
    variables: BTreeMap<String, Value>,
    units: Vec<Unit>,
    scope: EvalScope,
    graph: DependencyGraph,
    unresolved: BTreeMap<QualifiedName, ResourceDependency>,
    resources: ResourceMap,
    diagnostics: Diagnostics,
    passes: usize,
    finished: bool,
}

impl<'r> RunContext<'r> {
    /// Prepare to decode `blocks` into the resources of `shell`.
    ///
    /// Every attribute of a `locals` block becomes its own unit.
    pub fn new(
        registry: &'r BlockRegistry,
        shell: Mod,
        blocks: Vec<RawBlock>,
        options: &ParseOptions,
    ) -> Self {
        let scope = EvalScope::new(&shell.name, registry);
        let mut ctx = Self {
            registry,
            variables: options.variables.clone(),
            units: Vec::new(),
            scope,
            graph: DependencyGraph::new(),
            unresolved: BTreeMap::new(),
            resources: ResourceMap::new(),
            diagnostics: Diagnostics::new(),
            passes: 0,
            finished: false,
            shell,
        };

        for block in blocks {
            let Some(kind) = registry.block_kind(&block.block_type) else {
                ctx.diagnostics.push(
                    Diagnostic::error(format!("Unsupported block type '{}'", block.block_type))
                        .with_subject(block.location()),
                );
                continue;
            };

            if kind == ResourceKind::Local {
                for attribute in block.body.attributes() {
                    let name = ctx.shell.qualified(ResourceKind::Local, attribute.key());
                    let location =
                        Location::new(block.file.clone(), format!("locals.{}", attribute.key()));
                    let source = UnitSource::Local {
                        expr: attribute.expr().clone(),
                        location,
                    };
                    ctx.add_unit(name, source);
                }
                continue;
            }

            let Some(label) = block.label() else {
                ctx.diagnostics.push(
                    Diagnostic::error(format!("'{}' block needs a name label", block.block_type))
                        .with_subject(block.location()),
                );
                continue;
            };
            let name = ctx.shell.qualified(kind, label);
            ctx.add_unit(name, UnitSource::Block(block));
        }
        ctx
    }

    fn add_unit(&mut self, name: QualifiedName, source: UnitSource) {
        if self.units.iter().any(|u| u.name == name) {
            self.diagnostics.push(
                Diagnostic::error(format!("Duplicate {} '{}'", name.kind, name.name))
                    .with_subject(source.location()),
            );
            return;
        }
        self.graph.add_node(&name.to_string());
        self.units.push(Unit {
            name,
            source,
            state: BlockState::Pending,
        });
    }

    /// Add diagnostics found before decoding, such as parse problems.
    pub fn report(&mut self, diagnostics: Diagnostics) {
        self.diagnostics.extend(diagnostics);
    }

    /// Make a decoded dependency mod visible as `<mod>.<kind>.<name>`.
    pub fn add_dependency_mod(&mut self, dependency: &Mod) {
        self.scope.add_mod(&dependency.name);
        for resource in dependency.resources.iter() {
            self.scope.insert(resource.name(), resource.to_value());
        }
        debug!(
            mod_name = %self.shell.name,
            dependency = %dependency.name,
            resources = dependency.resources.len(),
            "added dependency mod to scope"
        );
    }

    /// Run decode passes until a pass makes no progress.
    pub fn decode(&mut self) {
        if self.finished {
            return;
        }

        while self.units.iter().any(|u| u.state.is_open()) {
            self.passes += 1;
            let mut progress = false;

            for index in 0..self.units.len() {
                if !self.units[index].state.is_open() {
                    continue;
                }
                let attempt = {
                    let evaluator = Evaluator::new(self.registry, &self.scope);
                    let unit = &self.units[index];
                    decode_unit(&unit.name, &unit.source, &evaluator, &self.variables)
                };
                progress |= self.apply(index, attempt);
            }

            let open = self.units.iter().filter(|u| u.state.is_open()).count();
            debug!(
                mod_name = %self.shell.name,
                pass = self.passes,
                open,
                progress,
                "decode pass complete"
            );
            if !progress {
                break;
            }
        }

        self.report_unresolved();
        self.finished = true;
    }

    /// Record the outcome of one attempt. Returns whether it was progress.
    fn apply(&mut self, index: usize, attempt: Attempt) -> bool {
        let name = self.units[index].name.clone();
        let node = name.to_string();

        match attempt {
            Attempt::Decoded(resource) => {
                let state = if resource.runtime_dependencies().is_empty() {
                    BlockState::Resolved
                } else {
                    BlockState::RuntimeDeferred
                };
                self.units[index].state = state;
                self.graph.clear_dependencies(&node);
                self.unresolved.remove(&name);
                self.scope.insert(&name, resource.to_value());
                if let Err(duplicate) = self.resources.insert(resource) {
                    self.diagnostics.push(
                        Diagnostic::error(format!("Duplicate resource '{}'", duplicate.name()))
                            .with_subject(&name),
                    );
                }
                trace!(resource = %name, ?state, "decoded");
                true
            }
            Attempt::Deferred(paths) => {
                self.units[index].state = BlockState::Deferred;
                let dependency = ResourceDependency {
                    from: name.clone(),
                    paths,
                };
                self.graph.clear_dependencies(&node);
                for target in dependency.targets() {
                    self.graph.add_edge(&node, &target.to_string());
                }
                trace!(resource = %name, waiting_for = dependency.paths.len(), "deferred");
                self.unresolved.insert(name, dependency);
                false
            }
            Attempt::Failed(diagnostics) => {
                self.units[index].state = BlockState::Failed;
                self.graph.clear_dependencies(&node);
                self.unresolved.remove(&name);
                debug!(resource = %name, errors = diagnostics.len(), "decode failed");
                self.diagnostics.extend(diagnostics);
                true
            }
        }
    }

    fn report_unresolved(&mut self) {
        if self.unresolved.is_empty() {
            return;
        }

        let mut graph = self.graph.clone();
        for name in self.unresolved.keys() {
            graph.add_edge(ROOT_NODE, &name.to_string());
        }
        if let Err(cycle) = graph.topological_order() {
            warn!(mod_name = %self.shell.name, cycle = ?cycle, "reference cycle");
            self.diagnostics.push(
                Diagnostic::error("Dependencies cannot be resolved")
                    .with_detail(format!("cycle between {}", cycle.join(", ")))
                    .with_subject(&self.shell.name),
            );
        }

        for dependency in self.unresolved.values() {
            let missing: BTreeSet<String> =
                dependency.paths.iter().map(ToString::to_string).collect();
            let missing: Vec<String> = missing.into_iter().collect();
            self.diagnostics.push(
                Diagnostic::error(format!("Unresolved reference(s): {}", missing.join(", ")))
                    .with_subject(&dependency.from),
            );
        }
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn state(&self, name: &QualifiedName) -> Option<BlockState> {
        self.units.iter().find(|u| &u.name == name).map(|u| u.state)
    }

    /// Blocks still waiting for references, with what they wait for.
    pub fn unresolved(&self) -> impl Iterator<Item = &ResourceDependency> {
        self.unresolved.values()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    /// Runtime references recorded on decoded resources.
    pub fn runtime_dependencies(&self) -> Vec<&RuntimeDependency> {
        self.resources
            .iter()
            .flat_map(|r| r.runtime_dependencies())
            .collect()
    }

    /// Finish decoding and hand over the mod.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Diagnostics`] with every error diagnostic when any
    /// block failed or stayed unresolved.
    pub fn into_mod(mut self) -> Result<Mod> {
        self.decode();
        if self.diagnostics.has_errors() {
            return Err(Error::Diagnostics {
                mod_name: self.shell.name,
                diagnostics: self.diagnostics,
            });
        }
        for diagnostic in self.diagnostics.iter() {
            warn!(mod_name = %self.shell.name, "{diagnostic}");
        }
        let mut decoded = self.shell;
        decoded.resources = self.resources;
        debug!(
            mod_name = %decoded.name,
            resources = decoded.resources.len(),
            passes = self.passes,
            "mod decoded"
        );
        Ok(decoded)
    }
}
