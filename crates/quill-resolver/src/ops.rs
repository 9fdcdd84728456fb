//! The closed operator set of the embedded scripting language, as far as
//! the type resolver cares about it.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    In,
    InstanceOf,
    BitAnd,
    BitOr,
    BitXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    As,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Complement,
    Plus,
    Minus,
}
