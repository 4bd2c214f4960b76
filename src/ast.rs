use crate::token::SourcePos;

/// Binary operator kinds, shared between `ast::Expr::Binary` and the
/// emitter's opcode table (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

impl BinaryOp {
    #[must_use]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::AddAssign
                | Self::SubAssign
                | Self::MulAssign
                | Self::DivAssign
                | Self::ModAssign
                | Self::AndAssign
                | Self::OrAssign
                | Self::XorAssign
                | Self::ShlAssign
                | Self::ShrAssign
        )
    }
}

/// Unary operator kinds. `Deref`/`AddrOf` parse but do not lower
/// (`spec.md` §4.4, §9 "Unsupported C99 features").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// A primitive type specifier (`spec.md` §3 "Type nodes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Signed,
    Unsigned,
}

/// A type node. Owned by value; no sharing between declarators.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode<'file> {
    Primitive(Primitive),
    PointerTo {
        base: Box<TypeNode<'file>>,
        depth: u32,
    },
    ArrayOf {
        element: Box<TypeNode<'file>>,
        size: Option<Box<Expr<'file>>>,
        dimensions: Vec<Option<Box<Expr<'file>>>>,
    },
    Function {
        returns: Box<TypeNode<'file>>,
        params: Vec<TypeNode<'file>>,
        variadic: bool,
    },
}

/// One node of the expression tree. Every node owns its children and
/// carries the position at which it started.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'file> {
    IntConst {
        value: i64,
        pos: SourcePos<'file>,
    },
    FloatConst {
        value: f64,
        pos: SourcePos<'file>,
    },
    StringLit {
        value: Vec<u8>,
        pos: SourcePos<'file>,
    },
    Identifier {
        name: String,
        pos: SourcePos<'file>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr<'file>>,
        pos: SourcePos<'file>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr<'file>>,
        right: Box<Expr<'file>>,
        pos: SourcePos<'file>,
    },
    Call {
        callee: Box<Expr<'file>>,
        args: Vec<Expr<'file>>,
        is_libc: bool,
        libc_call_id: u16,
        pos: SourcePos<'file>,
    },
    Subscript {
        array: Box<Expr<'file>>,
        index: Box<Expr<'file>>,
        pos: SourcePos<'file>,
    },
    Member {
        object: Box<Expr<'file>>,
        member: String,
        pos: SourcePos<'file>,
    },
    ArrowMember {
        pointer: Box<Expr<'file>>,
        member: String,
        pos: SourcePos<'file>,
    },
    CompoundLiteral {
        elements: Vec<Expr<'file>>,
        pos: SourcePos<'file>,
    },
}

impl<'file> Expr<'file> {
    #[must_use]
    pub fn pos(&self) -> SourcePos<'file> {
        match self {
            Self::IntConst { pos, .. }
            | Self::FloatConst { pos, .. }
            | Self::StringLit { pos, .. }
            | Self::Identifier { pos, .. }
            | Self::Unary { pos, .. }
            | Self::Binary { pos, .. }
            | Self::Call { pos, .. }
            | Self::Subscript { pos, .. }
            | Self::Member { pos, .. }
            | Self::ArrowMember { pos, .. }
            | Self::CompoundLiteral { pos, .. } => *pos,
        }
    }
}

/// One statement. Optional sub-parts use `Option`, never a dummy node
/// (`spec.md` §4.3 invariant).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'file> {
    Compound {
        statements: Vec<Stmt<'file>>,
        pos: SourcePos<'file>,
    },
    If {
        condition: Expr<'file>,
        then_branch: Box<Stmt<'file>>,
        else_branch: Option<Box<Stmt<'file>>>,
        pos: SourcePos<'file>,
    },
    While {
        condition: Expr<'file>,
        body: Box<Stmt<'file>>,
        pos: SourcePos<'file>,
    },
    For {
        init: Option<Box<ForInit<'file>>>,
        condition: Option<Expr<'file>>,
        increment: Option<Expr<'file>>,
        body: Box<Stmt<'file>>,
        pos: SourcePos<'file>,
    },
    Return {
        value: Option<Expr<'file>>,
        pos: SourcePos<'file>,
    },
    Break {
        pos: SourcePos<'file>,
    },
    Continue {
        pos: SourcePos<'file>,
    },
    ExprStmt {
        expr: Expr<'file>,
        pos: SourcePos<'file>,
    },
    /// A local variable declaration parsed inline in a statement position,
    /// e.g. `int x = 7;` inside a function body.
    VarDecl(VarDecl<'file>),
}

/// Either a declaration or a bare expression in a `for` loop's init clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit<'file> {
    Decl(VarDecl<'file>),
    Expr(Expr<'file>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl<'file> {
    pub name: String,
    pub type_node: TypeNode<'file>,
    pub initializer: Option<Expr<'file>>,
    pub pos: SourcePos<'file>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param<'file> {
    pub name: Option<String>,
    pub type_node: TypeNode<'file>,
    pub pos: SourcePos<'file>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'file> {
    pub name: String,
    pub return_type: TypeNode<'file>,
    pub params: Vec<Param<'file>>,
    pub body: Option<Stmt<'file>>,
    pub pos: SourcePos<'file>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Union,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordMember<'file> {
    pub name: String,
    pub type_node: TypeNode<'file>,
    pub pos: SourcePos<'file>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl<'file> {
    pub kind: RecordKind,
    pub tag: Option<String>,
    pub members: Vec<RecordMember<'file>>,
    pub pos: SourcePos<'file>,
}

/// `module` / `import` / `export` pseudo-declarations (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Module,
    Import,
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl<'file> {
    pub kind: ModuleKind,
    pub name: String,
    pub path: Option<String>,
    pub pos: SourcePos<'file>,
}

/// One top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl<'file> {
    Function(FunctionDecl<'file>),
    Variable(VarDecl<'file>),
    Record(RecordDecl<'file>),
    Module(ModuleDecl<'file>),
}

impl<'file> Decl<'file> {
    #[must_use]
    pub fn pos(&self) -> SourcePos<'file> {
        match self {
            Self::Function(f) => f.pos,
            Self::Variable(v) => v.pos,
            Self::Record(r) => r.pos,
            Self::Module(m) => m.pos,
        }
    }
}

/// One compilation input: a translation unit's ordered top-level
/// declarations (`spec.md` §3, GLOSSARY).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program<'file> {
    pub declarations: Vec<Decl<'file>>,
}

impl<'file> Program<'file> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
