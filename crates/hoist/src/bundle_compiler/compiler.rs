//! Bundle compiler driver
//!
//! [`BundleCompiler`] walks the module graph depth-first from an entry and
//! compiles a module only after all of its dependencies. Compiling one module
//! happens in two steps: [`ModuleCompilation`] decides every edit against the
//! symbol table of a fresh parse and mints the variables involved, then the
//! resulting [`RewritePlan`] is applied to the tree and the tree is printed.

use anyhow::{Context, Result};
use log::{debug, info, trace};
use oxc_allocator::Allocator;
use oxc_ast::AstBuilder;
use oxc_codegen::Codegen;
use oxc_semantic::{Scoping, SymbolId};
use oxc_span::Span;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    config::Config,
    error::HoistError,
    module::Module,
    module_graph::ModuleGraph,
    module_registry::{ModuleRegistry, Resolve},
    parser::ParsedProgram,
    transformation_context::{NameMinter, TransformationContext, TransformationStats},
    types::ModuleId,
};

/// Compile everything reachable from `entry`, leaves first
///
/// `emit` receives the printed text of every module exactly once, in
/// dependency order.
pub fn compile<R: Resolve>(
    entry: &ModuleId,
    graph: &ModuleGraph,
    registry: &ModuleRegistry<R>,
    config: &Config,
    mut emit: impl FnMut(String),
) -> Result<TransformationStats> {
    let mut compiler = BundleCompiler::new(registry, graph, config);
    compiler.compile_entry(entry, &mut emit)?;
    Ok(compiler.stats())
}

/// Compiles the modules of one graph into a single scope
///
/// Several entries may be compiled by the same compiler; modules shared
/// between entries are emitted only once and minted names stay unique across
/// the whole run.
#[derive(Debug)]
pub struct BundleCompiler<'a, R> {
    registry: &'a ModuleRegistry<R>,
    graph: &'a ModuleGraph,
    context: TransformationContext,
    visited: FxHashSet<ModuleId>,
    /// Modules whose dependencies are being compiled right now
    stack: Vec<ModuleId>,
}

impl<'a, R: Resolve> BundleCompiler<'a, R> {
    pub fn new(registry: &'a ModuleRegistry<R>, graph: &'a ModuleGraph, config: &Config) -> Self {
        let minter = NameMinter::new(config.variable_prefix.clone(), config.counter_start);
        Self {
            registry,
            graph,
            context: TransformationContext::new(minter, config.namespace_name.clone()),
            visited: FxHashSet::default(),
            stack: Vec::new(),
        }
    }

    /// Compile `entry` and every module it depends on that was not compiled yet
    pub fn compile_entry(&mut self, entry: &ModuleId, emit: &mut impl FnMut(String)) -> Result<()> {
        if !self.graph.contains(entry) {
            return Err(HoistError::invariant(entry, "entry module is not part of the graph").into());
        }
        if self.visited.insert(entry.clone()) {
            self.visit(entry, emit)?;
        }
        let stats = self.stats();
        info!(
            "Compiled {} modules: {} imports rewritten, {} exports hoisted, {} namespaces, {} names deconflicted",
            stats.modules_compiled,
            stats.imports_rewritten,
            stats.exports_hoisted,
            stats.namespaces_synthesized,
            stats.names_deconflicted
        );
        Ok(())
    }

    fn visit(&mut self, id: &ModuleId, emit: &mut impl FnMut(String)) -> Result<()> {
        self.stack.push(id.clone());
        for dependency in self.graph.dependencies(id) {
            if self.stack.contains(&dependency) {
                self.check_back_edge(id, &dependency)?;
                continue;
            }
            if self.visited.insert(dependency.clone()) {
                self.visit(&dependency, emit)?;
            }
        }
        self.stack.pop();

        let text = self.compile_module(id)?;
        emit(text);
        Ok(())
    }

    /// A cycle may only be closed by imports that carry no bindings
    fn check_back_edge(&self, importer: &ModuleId, target: &ModuleId) -> Result<()> {
        match self.graph.edge(importer, target) {
            Some(edge) if edge.carries_bindings() => Err(HoistError::CircularImport {
                importer: importer.clone(),
                target: target.clone(),
                names: edge.imported_names.clone(),
            }
            .into()),
            _ => {
                trace!("Ignoring side-effect import cycle {importer} -> {target}");
                Ok(())
            }
        }
    }

    fn compile_module(&mut self, id: &ModuleId) -> Result<String> {
        debug!("Compiling module {id}");
        let registry = self.registry;
        let module = registry.module(id)?;
        let allocator = Allocator::default();
        let ParsedProgram {
            mut program,
            scoping,
        } = module.parse_in(&allocator)?;

        ModuleCompilation::new(module, &scoping, self.graph, &mut self.context)
            .run()
            .and_then(|plan| plan.apply(AstBuilder::new(&allocator), &mut program, &scoping, id))
            .with_context(|| format!("Failed to compile {id}"))?;
        self.context.module_compiled();
        Ok(Codegen::new().build(&program).code)
    }

    pub fn stats(&self) -> TransformationStats {
        self.context.stats()
    }

    pub const fn context(&self) -> &TransformationContext {
        &self.context
    }
}

/// What an imported name stands for once its producer has been compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum BindingTarget {
    /// A hoisted variable
    Variable { name: String, mutable: bool },
    /// A property of a CommonJS default export: `object.property`
    Member { object: String, property: String },
    /// A CommonJS name that is never assigned statically
    Undefined,
}

/// Replacement of a top-level `require()` call
#[derive(Debug, Clone)]
pub(super) enum Replacement {
    /// `require("x")` read as a whole
    Value(BindingTarget),
    /// `{ a: <a>, b: <b> }` for `const { a, b } = require("x")`
    Object(Vec<(String, BindingTarget)>),
}

/// Variable written by one CommonJS export assignment
#[derive(Debug, Clone)]
pub(super) struct CommonJsTarget {
    pub(super) variable: String,
    /// Minted by this assignment, so it still has to be declared
    pub(super) fresh: bool,
}

#[derive(Debug, Clone)]
pub(super) struct CommonJsAssignment {
    /// `module.exports = { a, b }` writes one variable per property
    pub(super) split: bool,
    pub(super) targets: Vec<CommonJsTarget>,
}

#[derive(Debug, Clone)]
pub(super) struct Namespace {
    pub(super) variable: String,
    pub(super) properties: Vec<(String, BindingTarget)>,
}

/// Every edit one module needs, keyed by symbol or by node span
#[derive(Debug, Default)]
pub(super) struct RewritePlan {
    pub(super) renames: FxHashMap<SymbolId, String>,
    /// Import bindings whose reads are replaced by an expression
    pub(super) replaced: FxHashMap<SymbolId, BindingTarget>,
    pub(super) calls: FxHashMap<Span, Replacement>,
    pub(super) assignments: FxHashMap<Span, CommonJsAssignment>,
    /// Variables declared in place of an `export { ... }` statement
    pub(super) inserted: FxHashMap<Span, Vec<(String, BindingTarget)>>,
    /// Variable of an anonymous `export default`
    pub(super) default_variable: Option<String>,
    pub(super) namespace: Option<Namespace>,
}

/// Planning state of the module being compiled
#[derive(Debug)]
pub(super) struct ModuleCompilation<'m> {
    pub(super) module: &'m Module,
    pub(super) scoping: &'m Scoping,
    pub(super) graph: &'m ModuleGraph,
    pub(super) context: &'m mut TransformationContext,
    /// What each import binding resolved to
    pub(super) import_aliases: FxHashMap<SymbolId, BindingTarget>,
    pub(super) plan: RewritePlan,
}

impl<'m> ModuleCompilation<'m> {
    pub(super) fn new(
        module: &'m Module,
        scoping: &'m Scoping,
        graph: &'m ModuleGraph,
        context: &'m mut TransformationContext,
    ) -> Self {
        Self {
            module,
            scoping,
            graph,
            context,
            import_aliases: FxHashMap::default(),
            plan: RewritePlan::default(),
        }
    }

    /// Plan the phases in minting order
    pub(super) fn run(mut self) -> Result<RewritePlan> {
        self.rewrite_imports()?;
        self.rewrite_exports()?;
        self.synthesize_namespace()?;
        self.deconflict();
        Ok(self.plan)
    }

    /// Canonical id behind a specifier used by this module
    pub(super) fn target_of(&self, specifier: &str) -> Result<ModuleId> {
        self.graph
            .node(self.module.id())
            .and_then(|node| node.specifiers.get(specifier))
            .cloned()
            .ok_or_else(|| {
                HoistError::invariant(
                    self.module.id(),
                    format!("specifier {specifier} is missing from the graph"),
                )
                .into()
            })
    }

    /// Resolve `name` of `target` through proxies to what now holds its value
    pub(super) fn resolve_binding(&self, target: &ModuleId, name: &str) -> Result<BindingTarget> {
        let origin = self.graph.resolve_export(target, name);
        if origin.name == "*" {
            return self.namespace_binding(&origin.module);
        }
        if let Some(bound) = self.context.bindings.get_bound(&origin.module, &origin.name) {
            return Ok(BindingTarget::Variable {
                name: bound.name.clone(),
                mutable: bound.mutable,
            });
        }

        let Some(node) = self.graph.node(&origin.module) else {
            return Err(HoistError::invariant(
                self.module.id(),
                format!("module {} is missing from the graph", origin.module),
            )
            .into());
        };
        if node.has_commonjs_export {
            if origin.name == "default" {
                return self.namespace_binding(&origin.module);
            }
            if node.has_commonjs_default_export
                && let Some(object) = self.context.bindings.get(&origin.module, "default")
            {
                return Ok(BindingTarget::Member {
                    object: object.to_owned(),
                    property: origin.name,
                });
            }
            return Ok(BindingTarget::Undefined);
        }

        Err(HoistError::invariant(
            self.module.id(),
            format!(
                "no variable was minted for {} of {}",
                origin.name, origin.module
            ),
        )
        .into())
    }

    /// Every module consumed as a whole declares its namespace when compiled
    fn namespace_binding(&self, module: &ModuleId) -> Result<BindingTarget> {
        match self.context.namespace_variable(module) {
            Some(variable) => Ok(BindingTarget::Variable {
                name: variable.to_owned(),
                mutable: false,
            }),
            None => Err(HoistError::invariant(
                self.module.id(),
                format!("module {module} has no namespace variable"),
            )
            .into()),
        }
    }
}
