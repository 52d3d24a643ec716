//! Application of a [`RewritePlan`] to a parsed module
//!
//! Renames go through the symbol table: a binding or reference is renamed
//! when its resolved symbol is, so shadowing declarations in inner scopes are
//! never touched.

use anyhow::Result;
use oxc_ast::{
    AstBuilder,
    ast::{
        AssignmentTarget, AssignmentTargetMaybeDefault, AssignmentTargetProperty,
        BindingIdentifier, BindingPatternKind, BindingProperty, Expression, IdentifierReference,
        ObjectProperty, Program, PropertyKey,
    },
};
use oxc_ast_visit::{VisitMut, walk_mut};
use oxc_semantic::Scoping;
use oxc_span::SPAN;

use super::{
    cleanup::commonjs_values,
    compiler::{BindingTarget, Replacement, RewritePlan},
};
use crate::{
    ast_builder,
    error::HoistError,
    types::ModuleId,
    visitors::utils::{reference_symbol, static_key_name},
};

/// A fresh expression that evaluates to `target`
pub(super) fn binding_expression<'a>(ast: AstBuilder<'a>, target: &BindingTarget) -> Expression<'a> {
    match target {
        BindingTarget::Variable { name, .. } => ast_builder::identifier(ast, name),
        BindingTarget::Member { object, property } => ast_builder::member(ast, object, property),
        BindingTarget::Undefined => ast_builder::void_zero(ast),
    }
}

struct Rewriter<'a, 'p> {
    ast: AstBuilder<'a>,
    scoping: &'p Scoping,
    plan: &'p mut RewritePlan,
    /// Variables first assigned below the top level, declared up front
    hoisted: Vec<String>,
}

impl<'a> Rewriter<'a, '_> {
    fn renamed(&self, ident: &IdentifierReference<'a>) -> Option<&str> {
        let symbol = reference_symbol(self.scoping, ident)?;
        self.plan.renames.get(&symbol).map(String::as_str)
    }

    fn replacement(&mut self, expression: &mut Expression<'a>) -> Option<Expression<'a>> {
        let ast = self.ast;
        match expression {
            Expression::Identifier(ident) => {
                let symbol = reference_symbol(self.scoping, ident)?;
                let target = self.plan.replaced.get(&symbol)?;
                Some(binding_expression(ast, target))
            }
            Expression::CallExpression(call) => match self.plan.calls.remove(&call.span)? {
                Replacement::Value(target) => Some(binding_expression(ast, &target)),
                Replacement::Object(properties) => Some(ast_builder::object(
                    ast,
                    properties.iter().map(|(key, target)| {
                        ast_builder::init_property(ast, key, binding_expression(ast, target))
                    }),
                )),
            },
            Expression::AssignmentExpression(assignment) => {
                let edit = self.plan.assignments.remove(&assignment.span)?;
                let values = commonjs_values(ast, assignment, edit.split);
                let mut writes = Vec::with_capacity(values.len());
                for (target, value) in edit.targets.into_iter().zip(values) {
                    writes.push(ast_builder::assign(ast, &target.variable, value));
                    if target.fresh {
                        self.hoisted.push(target.variable);
                    }
                }
                Some(ast_builder::sequence(ast, writes))
            }
            _ => None,
        }
    }
}

impl<'a> VisitMut<'a> for Rewriter<'a, '_> {
    fn visit_expression(&mut self, it: &mut Expression<'a>) {
        if let Some(replacement) = self.replacement(it) {
            *it = replacement;
        }
        walk_mut::walk_expression(self, it);
    }

    fn visit_binding_identifier(&mut self, it: &mut BindingIdentifier<'a>) {
        if let Some(name) = it.symbol_id.get().and_then(|symbol| self.plan.renames.get(&symbol)) {
            it.name = self.ast.atom(name);
        }
    }

    fn visit_identifier_reference(&mut self, it: &mut IdentifierReference<'a>) {
        if let Some(name) = self.renamed(it) {
            it.name = self.ast.atom(name);
        }
    }

    fn visit_object_property(&mut self, it: &mut ObjectProperty<'a>) {
        walk_mut::walk_object_property(self, it);
        if it.shorthand {
            let same = matches!(
                (&it.key, &it.value),
                (PropertyKey::StaticIdentifier(key), Expression::Identifier(value))
                    if key.name.as_str() == value.name.as_str()
            );
            it.shorthand = same;
        }
    }

    fn visit_binding_property(&mut self, it: &mut BindingProperty<'a>) {
        walk_mut::walk_binding_property(self, it);
        if it.shorthand {
            let value = match &it.value.kind {
                BindingPatternKind::BindingIdentifier(ident) => Some(ident.name.as_str()),
                BindingPatternKind::AssignmentPattern(pattern) => pattern
                    .left
                    .get_binding_identifier()
                    .map(|ident| ident.name.as_str()),
                _ => None,
            };
            it.shorthand = value.is_some() && static_key_name(&it.key, it.computed) == value;
        }
    }

    /// `({ a } = o)` with `a` renamed becomes `({ a: renamed } = o)`
    fn visit_assignment_target_property(&mut self, it: &mut AssignmentTargetProperty<'a>) {
        if let AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(property) = it
            && let Some(name) = self.renamed(&property.binding)
        {
            let ast = self.ast;
            let key = ast.property_key_static_identifier(SPAN, property.binding.name);
            let target = AssignmentTarget::from(
                ast.simple_assignment_target_assignment_target_identifier(SPAN, ast.atom(name)),
            );
            let binding = match property.init.take() {
                Some(init) => {
                    ast.assignment_target_maybe_default_assignment_target_with_default(SPAN, target, init)
                }
                None => AssignmentTargetMaybeDefault::from(target),
            };
            *it = ast.assignment_target_property_assignment_target_property_property(
                SPAN, key, binding, false,
            );
        }
        walk_mut::walk_assignment_target_property(self, it);
    }
}

impl RewritePlan {
    /// Rewrite `program` in place
    pub(super) fn apply<'a>(
        mut self,
        ast: AstBuilder<'a>,
        program: &mut Program<'a>,
        scoping: &Scoping,
        module: &ModuleId,
    ) -> Result<()> {
        self.strip_module_syntax(ast, program, module)?;

        let mut rewriter = Rewriter {
            ast,
            scoping,
            plan: &mut self,
            hoisted: Vec::new(),
        };
        rewriter.visit_program(program);
        let hoisted = rewriter.hoisted;
        if !hoisted.is_empty() {
            let declaration = ast_builder::var_declarations(ast, hoisted.into_iter().map(|name| (name, None)));
            program.body.insert(0, declaration);
        }

        if let Some(namespace) = self.namespace.take() {
            let mut properties = Vec::with_capacity(namespace.properties.len() * 2);
            for (name, target) in &namespace.properties {
                properties.push(ast_builder::getter(ast, name, binding_expression(ast, target)));
                if let BindingTarget::Variable {
                    name: variable,
                    mutable: true,
                } = target
                {
                    properties.push(ast_builder::setter(ast, name, variable));
                }
            }
            let object = ast_builder::object(ast, properties);
            program
                .body
                .push(ast_builder::var_declarations(ast, [(namespace.variable, Some(object))]));
        }

        if !self.calls.is_empty() || !self.assignments.is_empty() {
            return Err(HoistError::invariant(
                module,
                "a planned require() or CommonJS export was not found in the tree",
            )
            .into());
        }
        Ok(())
    }
}
