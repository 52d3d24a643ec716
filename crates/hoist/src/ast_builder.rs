//! AST builder module for creating synthetic AST nodes
//!
//! Thin helpers over [`AstBuilder`] for the handful of shapes the compiler
//! emits that don't originate from source files. Synthetic identifiers carry
//! no reference or symbol ids, so later renames never touch them.

use oxc_ast::{
    AstBuilder, NONE,
    ast::{
        AssignmentOperator, AssignmentTarget, Expression, FormalParameterKind, FunctionType,
        ObjectPropertyKind, PropertyKind, Statement, VariableDeclarationKind,
    },
};
use oxc_span::SPAN;

/// Create an identifier: `name`
pub fn identifier<'a>(ast: AstBuilder<'a>, name: &str) -> Expression<'a> {
    ast.expression_identifier(SPAN, ast.atom(name))
}

/// Create `void 0`, the canonical `undefined`
pub fn void_zero<'a>(ast: AstBuilder<'a>) -> Expression<'a> {
    ast.void_0(SPAN)
}

/// Create a static member access: `object.property`
pub fn member<'a>(ast: AstBuilder<'a>, object: &str, property: &str) -> Expression<'a> {
    let property = ast.identifier_name(SPAN, ast.atom(property));
    Expression::from(ast.member_expression_static(SPAN, identifier(ast, object), property, false))
}

/// Create a plain assignment: `name = value`
pub fn assign<'a>(ast: AstBuilder<'a>, name: &str, value: Expression<'a>) -> Expression<'a> {
    let target = ast.simple_assignment_target_assignment_target_identifier(SPAN, ast.atom(name));
    ast.expression_assignment(
        SPAN,
        AssignmentOperator::Assign,
        AssignmentTarget::from(target),
        value,
    )
}

/// Create `var a = x, b;`
pub fn var_declarations<'a>(
    ast: AstBuilder<'a>,
    declarators: impl IntoIterator<Item = (String, Option<Expression<'a>>)>,
) -> Statement<'a> {
    let kind = VariableDeclarationKind::Var;
    let declarations = ast.vec_from_iter(declarators.into_iter().map(|(name, init)| {
        let id = ast.binding_pattern(
            ast.binding_pattern_kind_binding_identifier(SPAN, ast.atom(&name)),
            NONE,
            false,
        );
        ast.variable_declarator(SPAN, kind, id, init, false)
    }));
    Statement::from(ast.declaration_variable(SPAN, kind, declarations, false))
}

/// Create `(a, b, c)`, or the single expression itself
pub fn sequence<'a>(ast: AstBuilder<'a>, mut expressions: Vec<Expression<'a>>) -> Expression<'a> {
    if expressions.len() == 1
        && let Some(expression) = expressions.pop()
    {
        return expression;
    }
    ast.expression_sequence(SPAN, ast.vec_from_iter(expressions))
}

fn property<'a>(
    ast: AstBuilder<'a>,
    kind: PropertyKind,
    key: &str,
    value: Expression<'a>,
) -> ObjectPropertyKind<'a> {
    let key = ast.property_key_static_identifier(SPAN, ast.atom(key));
    ast.object_property_kind_object_property(SPAN, kind, key, value, false, false, false)
}

/// Create `key: value` with an identifier key
pub fn init_property<'a>(ast: AstBuilder<'a>, key: &str, value: Expression<'a>) -> ObjectPropertyKind<'a> {
    property(ast, PropertyKind::Init, key, value)
}

/// Anonymous function expression with one optional parameter
fn accessor<'a>(
    ast: AstBuilder<'a>,
    parameter: Option<&str>,
    body: Statement<'a>,
) -> Expression<'a> {
    let items = ast.vec_from_iter(parameter.map(|name| {
        let pattern = ast.binding_pattern(
            ast.binding_pattern_kind_binding_identifier(SPAN, ast.atom(name)),
            NONE,
            false,
        );
        ast.formal_parameter(SPAN, ast.vec(), pattern, None, false, false)
    }));
    let params = ast.alloc(ast.formal_parameters(
        SPAN,
        FormalParameterKind::FormalParameter,
        items,
        NONE,
    ));
    let body = ast.alloc(ast.function_body(SPAN, ast.vec(), ast.vec1(body)));
    ast.expression_function(
        SPAN,
        FunctionType::FunctionExpression,
        None,
        false,
        false,
        false,
        NONE,
        NONE,
        params,
        NONE,
        Some(body),
    )
}

/// Create `get key() { return <argument>; }`
pub fn getter<'a>(ast: AstBuilder<'a>, key: &str, argument: Expression<'a>) -> ObjectPropertyKind<'a> {
    let body = ast.statement_return(SPAN, Some(argument));
    property(ast, PropertyKind::Get, key, accessor(ast, None, body))
}

/// Create `set key(value) { variable = value; }`
pub fn setter<'a>(ast: AstBuilder<'a>, key: &str, variable: &str) -> ObjectPropertyKind<'a> {
    let body = ast.statement_expression(SPAN, assign(ast, variable, identifier(ast, "value")));
    property(ast, PropertyKind::Set, key, accessor(ast, Some("value"), body))
}

/// Create an object literal from already built properties
pub fn object<'a>(
    ast: AstBuilder<'a>,
    properties: impl IntoIterator<Item = ObjectPropertyKind<'a>>,
) -> Expression<'a> {
    ast.expression_object(SPAN, ast.vec_from_iter(properties))
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use pretty_assertions::assert_eq;

    use super::*;

    fn print(allocator: &Allocator, statements: Vec<Statement<'_>>) -> String {
        let ast = AstBuilder::new(allocator);
        let program = ast.program(
            SPAN,
            oxc_span::SourceType::mjs(),
            "",
            ast.vec(),
            None,
            ast.vec(),
            ast.vec_from_iter(statements),
        );
        Codegen::new().build(&program).code
    }

    #[test]
    fn test_namespace_object_shape() {
        let allocator = Allocator::default();
        let ast = AstBuilder::new(&allocator);
        let object = object(
            ast,
            [
                getter(ast, "x", identifier(ast, "_x")),
                setter(ast, "x", "_x"),
                getter(ast, "y", member(ast, "api", "y")),
            ],
        );
        let output = print(&allocator, vec![var_declarations(ast, [("ns".to_owned(), Some(object))])]);
        assert!(output.contains("get x()"), "{output}");
        assert!(output.contains("set x(value)"), "{output}");
        assert!(output.contains("_x = value"), "{output}");
        assert!(output.contains("return api.y"), "{output}");
    }

    #[test]
    fn test_sequence_of_one_is_the_expression() {
        let allocator = Allocator::default();
        let ast = AstBuilder::new(&allocator);
        let single = sequence(ast, vec![assign(ast, "a", void_zero(ast))]);
        assert!(matches!(single, Expression::AssignmentExpression(_)));

        let pair = sequence(
            ast,
            vec![assign(ast, "a", identifier(ast, "b")), assign(ast, "c", identifier(ast, "d"))],
        );
        let output = print(&allocator, vec![ast.statement_expression(SPAN, pair)]);
        assert_eq!(output, "a = b, c = d;\n");
    }
}
