//! The syntax tree shapes the binder consumes.
//!
//! The parser producing these nodes is an external collaborator. Only the
//! constructs the scope graph builder reacts to are modeled; everything the
//! builder does not care about arrives as an opaque [`Expression`] leaf.

use quill_common::{SourceLocation, TypeRevision};

/// One parsed Quill document: imports plus a single root object.
#[derive(Clone, Debug)]
pub struct Document {
    pub imports: Vec<Import>,
    pub root: ObjectDefinition,
}

#[derive(Clone, Debug)]
pub struct Import {
    pub uri: String,
    pub version: TypeRevision,
    /// `import Foo 1.0 as Bar` binds the module under a namespace prefix.
    pub qualifier: Option<String>,
    pub location: SourceLocation,
}

/// An object literal: `Rectangle { ... }`.
#[derive(Clone, Debug)]
pub struct ObjectDefinition {
    /// Qualified type name, e.g. `Controls.Button`.
    pub type_name: String,
    pub members: Vec<Member>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum Member {
    /// `property int width: 10` or `property alias label: inner.text`
    Property(PropertyMember),
    /// `signal clicked(point pos)`
    Signal(SignalMember),
    /// `enum Direction { Up, Down }`
    Enum(EnumMember),
    /// `function area(w: int): int { ... }`
    Function(FunctionDeclaration),
    /// `id: root`, `anchors.left: ...`, `Keys.onPressed: ...`, `width: 10`
    Binding(Binding),
    /// A child object assigned to the default property.
    Child(ObjectDefinition),
}

#[derive(Clone, Debug)]
pub struct PropertyMember {
    pub name: String,
    /// Declared type name; the reserved name `alias` makes this an alias
    /// declaration whose target is the binding expression.
    pub type_name: String,
    pub is_list: bool,
    pub is_readonly: bool,
    pub binding: Option<BindingValue>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct SignalMember {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct EnumMember {
    pub name: String,
    pub members: Vec<(String, i32)>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Defaults to the dynamic `var` type when not annotated.
    pub return_type_name: Option<String>,
    pub body: Vec<Statement>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
    pub location: SourceLocation,
}

/// A property binding. The path has one segment for a plain binding
/// (`width: 10`), several for grouped or attached bindings
/// (`anchors.left: ...`, `Keys.onPressed: ...`).
#[derive(Clone, Debug)]
pub struct Binding {
    pub path: Vec<String>,
    pub value: BindingValue,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum BindingValue {
    Script(Statement),
    Object(ObjectDefinition),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableScope {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub scope: VariableScope,
    pub name: String,
    pub initializer: Option<Expression>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Block(Vec<Statement>, SourceLocation),
    Variable(Vec<VariableDeclaration>),
    Expression(Expression),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    For {
        body: Box<Statement>,
        location: SourceLocation,
    },
    ForEach {
        declaration: VariableDeclaration,
        iterable: Expression,
        body: Box<Statement>,
        location: SourceLocation,
    },
    Case {
        discriminant: Expression,
        body: Vec<Statement>,
        location: SourceLocation,
    },
    Catch {
        parameter: Parameter,
        body: Box<Statement>,
        location: SourceLocation,
    },
    With {
        object: Expression,
        body: Box<Statement>,
        location: SourceLocation,
    },
    Return(Option<Expression>),
    Empty,
}

#[derive(Clone, Debug)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Number(f64),
    String(String),
}

#[derive(Clone, Debug)]
pub enum Expression {
    Identifier(String, SourceLocation),
    Literal(Literal, SourceLocation),
    /// `base.member`
    Member {
        base: Box<Expression>,
        name: String,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        location: SourceLocation,
    },
    Binary {
        op: String,
        left: Box<Expression>,
        right: Box<Expression>,
        location: SourceLocation,
    },
    Unary {
        op: String,
        operand: Box<Expression>,
        location: SourceLocation,
    },
    Array(Vec<Expression>, SourceLocation),
    /// A (possibly anonymous) function expression; opens a function scope.
    Function(FunctionDeclaration),
}

impl Expression {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expression::Identifier(_, loc)
            | Expression::Literal(_, loc)
            | Expression::Member { location: loc, .. }
            | Expression::Call { location: loc, .. }
            | Expression::Binary { location: loc, .. }
            | Expression::Unary { location: loc, .. }
            | Expression::Array(_, loc) => *loc,
            Expression::Function(decl) => decl.location,
        }
    }

    /// Is this expression a function definition? Script bindings whose
    /// value is a function do not get an extra synthetic binding scope.
    pub fn is_function_definition(&self) -> bool {
        matches!(self, Expression::Function(_))
    }
}

impl Statement {
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Statement::Expression(expr) => Some(expr),
            _ => None,
        }
    }
}
