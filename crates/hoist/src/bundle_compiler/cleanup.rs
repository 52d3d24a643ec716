//! Removal of module syntax
//!
//! Import and re-export statements disappear, export wrappers are unwrapped,
//! and a top-level CommonJS export assignment that only mints new names
//! becomes a `var` declaration.

use anyhow::Result;
use log::trace;
use oxc_allocator::TakeIn;
use oxc_ast::{
    AstBuilder,
    ast::{
        AssignmentExpression, ClassType, Declaration, ExportDefaultDeclarationKind, Expression,
        FunctionType, ObjectPropertyKind, Program, Statement, VariableDeclarationKind,
    },
};

use super::{compiler::RewritePlan, rewrite::binding_expression};
use crate::{ast_builder, error::HoistError, types::ModuleId};

/// Exported `let` and `const` become `var`
fn declare_as_var(mut declaration: Declaration<'_>) -> Declaration<'_> {
    if let Declaration::VariableDeclaration(variables) = &mut declaration {
        variables.kind = VariableDeclarationKind::Var;
        for declarator in variables.declarations.iter_mut() {
            declarator.kind = VariableDeclarationKind::Var;
        }
    }
    declaration
}

/// Values a CommonJS export assignment stores, one per target
pub(super) fn commonjs_values<'a>(
    ast: AstBuilder<'a>,
    assignment: &mut AssignmentExpression<'a>,
    split: bool,
) -> Vec<Expression<'a>> {
    match assignment.right.take_in(ast) {
        Expression::ObjectExpression(mut object) if split => object
            .properties
            .iter_mut()
            .filter_map(|property| match property {
                ObjectPropertyKind::ObjectProperty(property) => Some(property.value.take_in(ast)),
                ObjectPropertyKind::SpreadProperty(_) => None,
            })
            .collect(),
        value => vec![value],
    }
}

impl RewritePlan {
    pub(super) fn strip_module_syntax<'a>(
        &mut self,
        ast: AstBuilder<'a>,
        program: &mut Program<'a>,
        module: &ModuleId,
    ) -> Result<()> {
        let body = program.body.take_in(ast);
        let mut statements = ast.vec_with_capacity(body.len());
        let mut edits = 0usize;
        for statement in body {
            match statement {
                Statement::ImportDeclaration(_) | Statement::ExportAllDeclaration(_) => edits += 1,
                Statement::ExportNamedDeclaration(mut export) => {
                    edits += 1;
                    if let Some(declaration) = export.declaration.take() {
                        statements.push(Statement::from(declare_as_var(declaration)));
                    } else if let Some(variables) = self.inserted.remove(&export.span) {
                        statements.push(ast_builder::var_declarations(
                            ast,
                            variables
                                .iter()
                                .map(|(name, target)| (name.clone(), Some(binding_expression(ast, target)))),
                        ));
                    }
                }
                Statement::ExportDefaultDeclaration(mut export) => {
                    edits += 1;
                    let declaration = export.declaration.take_in(ast);
                    statements.push(self.default_statement(ast, declaration, module)?);
                }
                Statement::ExpressionStatement(mut statement) => {
                    match self.commonjs_declaration(ast, &mut statement.expression) {
                        Some(declaration) => {
                            edits += 1;
                            statements.push(declaration);
                        }
                        None => statements.push(Statement::ExpressionStatement(statement)),
                    }
                }
                statement => statements.push(statement),
            }
        }
        program.body = statements;
        trace!("Cleanup edited {edits} module syntax statements in {module}");
        Ok(())
    }

    fn default_statement<'a>(
        &self,
        ast: AstBuilder<'a>,
        declaration: ExportDefaultDeclarationKind<'a>,
        module: &ModuleId,
    ) -> Result<Statement<'a>> {
        let value = match declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) if function.id.is_some() => {
                return Ok(Statement::FunctionDeclaration(function));
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) if class.id.is_some() => {
                return Ok(Statement::ClassDeclaration(class));
            }
            ExportDefaultDeclarationKind::FunctionDeclaration(mut function) => {
                function.r#type = FunctionType::FunctionExpression;
                Expression::FunctionExpression(function)
            }
            ExportDefaultDeclarationKind::ClassDeclaration(mut class) => {
                class.r#type = ClassType::ClassExpression;
                Expression::ClassExpression(class)
            }
            other => Expression::try_from(other).map_err(|()| {
                HoistError::unsupported(module, "export default of a type declaration")
            })?,
        };
        let variable = self
            .default_variable
            .clone()
            .ok_or_else(|| HoistError::invariant(module, "export default without a variable"))?;
        Ok(ast_builder::var_declarations(ast, [(variable, Some(value))]))
    }

    /// `var v = e;` for a statement-level assignment whose names are all new
    fn commonjs_declaration<'a>(
        &mut self,
        ast: AstBuilder<'a>,
        expression: &mut Expression<'a>,
    ) -> Option<Statement<'a>> {
        let Expression::AssignmentExpression(assignment) = expression else {
            return None;
        };
        if !self
            .assignments
            .get(&assignment.span)?
            .targets
            .iter()
            .all(|target| target.fresh)
        {
            return None;
        }
        let edit = self.assignments.remove(&assignment.span)?;
        let values = commonjs_values(ast, assignment, edit.split);
        let declarators = edit
            .targets
            .into_iter()
            .map(|target| target.variable)
            .zip(values.into_iter().map(Some));
        Some(ast_builder::var_declarations(ast, declarators))
    }
}
