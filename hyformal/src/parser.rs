//! Parser for the pretty-printed formula language using chumsky.
//!
//! Role
//! - Turn human-readable formulas into [`Expr`] trees over declared variables.
//! - Mirrors the precedence used by the pretty-printer so that printing then parsing
//!   yields the same tree.
//!
//! Three stages:
//! 1) Tokenisation from input string to a `Token` stream.
//! 2) Parsing tokens into an owned, unresolved AST.
//! 3) Resolution of identifiers against a [`Scope`] of declared variables.
//!
//! Accepted syntax, loosest binding first:
//! - Conditionals: `if P then X else Y`.
//! - Logic: `P <=> Q` (left-assoc), `P => Q` (right-assoc), `P \/ Q`, `P /\ Q`, `!P`.
//! - Comparisons (non-associative): `=`, `!=`, `<`, `<=`, `>`, `>=`.
//! - Arithmetic: `+ -`, then `* / %`, then unary `-`.
//! - Postfix prime: `x'` is the next-state value of `x`.
//! - Atoms: `true`, `false`, integers, variables `x`, versioned constants `x@3`, and
//!   parenthesised formulas.
//!
//! Line comments start with `;`.
use std::collections::BTreeMap;

use chumsky::{input::ValueInput, prelude::*};

use crate::{
    dtype::DataType,
    error::{FormalError, FormalResult},
    expr::Expr,
    variable::VarDecl,
};

type Span = SimpleSpan;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Token {
    // Delimiters
    LParen,
    RParen,

    // Logic
    Not,
    And,     // /\
    Or,      // \/
    Implies, // =>
    Iff,     // <=>

    // Comparisons
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // State references
    Prime,
    At,

    // Keywords
    If,
    Then,
    Else,
    True,
    False,

    Int(i64),
    Ident(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Not => write!(f, "!"),
            Token::And => write!(f, "/\\"),
            Token::Or => write!(f, "\\/"),
            Token::Implies => write!(f, "=>"),
            Token::Iff => write!(f, "<=>"),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Leq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Geq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Prime => write!(f, "'"),
            Token::At => write!(f, "@"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Ident(name) => write!(f, "{name}"),
        }
    }
}

// ---------------- Lexer ----------------

fn lexer<'a>() -> impl Parser<'a, &'a str, Vec<Token>, extra::Err<Rich<'a, char>>> {
    // Multi-char operators first to avoid prefix capture
    let operator = choice((
        just("<=>").to(Token::Iff),
        just("=>").to(Token::Implies),
        just("<=").to(Token::Leq),
        just(">=").to(Token::Geq),
        just("!=").to(Token::Neq),
        just("/\\").to(Token::And),
        just("\\/").to(Token::Or),
    ));

    let punct = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('!').to(Token::Not),
        just('=').to(Token::Eq),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('\'').to(Token::Prime),
        just('@').to(Token::At),
    ));

    let number = text::int(10)
        .try_map(|s: &str, span| {
            s.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| Rich::custom(span, format!("integer literal `{s}` out of range")))
        })
        .labelled("integer");

    let word = text::ascii::ident()
        .map(|s: &str| match s {
            "if" => Token::If,
            "then" => Token::Then,
            "else" => Token::Else,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(s.to_string()),
        })
        .labelled("identifier");

    let token = choice((operator, number, word, punct));

    let comment = just(';')
        .then(any().and_is(just('\n').not()).repeated())
        .padded()
        .ignored();

    token
        .padded_by(comment.repeated())
        .padded()
        .repeated()
        .collect()
        .then_ignore(end())
}

// ---------------- Unresolved AST ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Implies,
    Iff,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    Sub,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NaryOp {
    And,
    Or,
    Add,
    Mul,
}

#[derive(Debug, Clone)]
enum Ast {
    True,
    False,
    Int(i64),
    Ident(String),
    Versioned(String, u32),
    Prime(Box<Ast>),
    Not(Box<Ast>),
    Neg(Box<Ast>),
    Binary(BinOp, Box<Ast>, Box<Ast>),
    Nary(NaryOp, Vec<Ast>),
    Ite(Box<Ast>, Box<Ast>, Box<Ast>),
    /// Parenthesised sub-formula; only kept so `-(3)` is not read as the literal `-3`.
    Group(Box<Ast>),
}

impl Ast {
    fn binary(op: BinOp, l: Ast, r: Ast) -> Ast {
        Ast::Binary(op, Box::new(l), Box::new(r))
    }

    fn nary(op: NaryOp, mut operands: Vec<Ast>) -> Ast {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Ast::Nary(op, operands)
        }
    }
}

/// Build a left-associative chain where runs of `run_op` are collected into a single n-ary
/// node and every other operator closes the current run: `a + b - c` is `(a + b) - c`.
fn chain(first: Ast, rest: Vec<(Result<NaryOp, BinOp>, Ast)>) -> Ast {
    let mut run = vec![first];
    let mut run_op = None;
    for (op, rhs) in rest {
        match op {
            Ok(nary) => {
                run_op = Some(nary);
                run.push(rhs);
            }
            Err(bin) => {
                let lhs = close_run(run, run_op.take());
                run = vec![Ast::binary(bin, lhs, rhs)];
            }
        }
    }
    close_run(run, run_op)
}

fn close_run(run: Vec<Ast>, op: Option<NaryOp>) -> Ast {
    match op {
        Some(op) => Ast::nary(op, run),
        None => Ast::nary(NaryOp::And, run),
    }
}

// ---------------- chumsky parser over tokens ----------------

fn ast_parser<'tokens, I>()
-> impl Parser<'tokens, I, Ast, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let literal = select! {
            Token::True => Ast::True,
            Token::False => Ast::False,
            Token::Int(v) => Ast::Int(v),
        };
        let ident = select! { Token::Ident(name) => name }.labelled("identifier");
        let index = select! { Token::Int(v) => v }.labelled("version index");

        // `x` or `x@3`
        let reference = ident
            .then(just(Token::At).ignore_then(index).or_not())
            .try_map(|(name, index), span| match index {
                None => Ok(Ast::Ident(name)),
                Some(i) => u32::try_from(i)
                    .map(|i| Ast::Versioned(name, i))
                    .map_err(|_| Rich::custom(span, format!("version index {i} out of range"))),
            })
            .labelled("variable");

        let paren_expr = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|e| Ast::Group(Box::new(e)))
            .labelled("parentheses");

        let atom = literal.or(reference).or(paren_expr).labelled("atom");

        // Postfix primes, left-assoc
        let postfix = atom.foldl(just(Token::Prime).repeated(), |e, _| {
            Ast::Prime(Box::new(e))
        });

        // Unary minus; a minus directly in front of a literal is part of the literal
        let unary = recursive(|unary| {
            just(Token::Minus)
                .ignore_then(unary)
                .map(|e| match e {
                    Ast::Int(v) if v >= 0 => Ast::Int(-v),
                    other => Ast::Neg(Box::new(other)),
                })
                .or(postfix)
        });

        let product_op = choice((
            just(Token::Star).to(Ok(NaryOp::Mul)),
            just(Token::Slash).to(Err(BinOp::Div)),
            just(Token::Percent).to(Err(BinOp::Mod)),
        ));
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| chain(first, rest))
            .labelled("product");

        let sum_op = choice((
            just(Token::Plus).to(Ok(NaryOp::Add)),
            just(Token::Minus).to(Err(BinOp::Sub)),
        ));
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| chain(first, rest))
            .labelled("sum");

        let cmp_op = choice((
            just(Token::Eq).to(BinOp::Eq),
            just(Token::Neq).to(BinOp::Neq),
            just(Token::Leq).to(BinOp::Leq),
            just(Token::Lt).to(BinOp::Lt),
            just(Token::Geq).to(BinOp::Geq),
            just(Token::Gt).to(BinOp::Gt),
        ));
        let comparison = sum
            .clone()
            .then(cmp_op.then(sum).or_not())
            .map(|(l, rhs)| match rhs {
                Some((op, r)) => Ast::binary(op, l, r),
                None => l,
            })
            .labelled("comparison");

        let negation = recursive(|negation| {
            just(Token::Not)
                .ignore_then(negation)
                .map(|e| Ast::Not(Box::new(e)))
                .or(comparison)
        });

        let conjunction = negation
            .separated_by(just(Token::And))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|es| Ast::nary(NaryOp::And, es))
            .labelled("conjunction");

        let disjunction = conjunction
            .separated_by(just(Token::Or))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|es| Ast::nary(NaryOp::Or, es))
            .labelled("disjunction");

        // Implies is right-assoc
        let implies = recursive(|imp| {
            disjunction
                .clone()
                .then(just(Token::Implies).ignore_then(imp).or_not())
                .map(|(a, b)| match b {
                    Some(b) => Ast::binary(BinOp::Implies, a, b),
                    None => a,
                })
                .labelled("implication")
        });

        let iff = implies
            .clone()
            .foldl(just(Token::Iff).ignore_then(implies).repeated(), |a, b| {
                Ast::binary(BinOp::Iff, a, b)
            })
            .labelled("equivalence");

        let ite = just(Token::If)
            .ignore_then(expr.clone())
            .then_ignore(just(Token::Then))
            .then(expr.clone())
            .then_ignore(just(Token::Else))
            .then(expr)
            .map(|((c, t), e)| Ast::Ite(Box::new(c), Box::new(t), Box::new(e)))
            .labelled("if-expression");

        ite.or(iff)
    })
}

// ---------------- Resolution ----------------

/// Named variables visible to the parser.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: BTreeMap<String, VarDecl>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fresh variable and make it visible under `name`.
    pub fn declare(&mut self, name: impl Into<String>, dtype: DataType) -> VarDecl {
        let var = VarDecl::new(name, dtype);
        self.insert(var.clone());
        var
    }

    /// Make an existing declaration visible under its own name, shadowing any previous one.
    pub fn insert(&mut self, var: VarDecl) -> Option<VarDecl> {
        self.vars.insert(var.name().to_string(), var)
    }

    pub fn get(&self, name: &str) -> Option<&VarDecl> {
        self.vars.get(name)
    }

    pub fn vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.values()
    }
}

impl FromIterator<VarDecl> for Scope {
    fn from_iter<T: IntoIterator<Item = VarDecl>>(iter: T) -> Self {
        let mut scope = Scope::new();
        for v in iter {
            scope.insert(v);
        }
        scope
    }
}

fn resolve(ast: Ast, scope: &Scope) -> FormalResult<Expr> {
    let lookup = |name: String| -> FormalResult<VarDecl> {
        scope
            .get(&name)
            .cloned()
            .ok_or(FormalError::UnknownIdentifier(name))
    };
    let bx = |a: Box<Ast>| -> FormalResult<Box<Expr>> { resolve(*a, scope).map(Box::new) };

    Ok(match ast {
        Ast::True => Expr::True,
        Ast::False => Expr::False,
        Ast::Int(v) => Expr::Int(v),
        Ast::Ident(name) => Expr::Var(lookup(name)?),
        Ast::Versioned(name, index) => Expr::Const(lookup(name)?.at(index)),
        Ast::Prime(e) => Expr::Prime(bx(e)?),
        Ast::Not(e) => Expr::Not(bx(e)?),
        Ast::Neg(e) => Expr::Neg(bx(e)?),
        Ast::Group(e) => resolve(*e, scope)?,
        Ast::Ite(c, t, e) => Expr::Ite {
            condition: bx(c)?,
            then_branch: bx(t)?,
            else_branch: bx(e)?,
        },
        Ast::Nary(op, es) => {
            let es = es
                .into_iter()
                .map(|e| resolve(e, scope))
                .collect::<FormalResult<Vec<_>>>()?;
            match op {
                NaryOp::And => Expr::And(es),
                NaryOp::Or => Expr::Or(es),
                NaryOp::Add => Expr::Add(es),
                NaryOp::Mul => Expr::Mul(es),
            }
        }
        Ast::Binary(op, l, r) => {
            let (l, r) = (bx(l)?, bx(r)?);
            match op {
                BinOp::Implies => Expr::Implies(l, r),
                BinOp::Iff => Expr::Iff(l, r),
                BinOp::Eq => Expr::Eq(l, r),
                BinOp::Neq => Expr::Neq(l, r),
                BinOp::Lt => Expr::Lt(l, r),
                BinOp::Leq => Expr::Leq(l, r),
                BinOp::Gt => Expr::Gt(l, r),
                BinOp::Geq => Expr::Geq(l, r),
                BinOp::Sub => Expr::Sub(l, r),
                BinOp::Div => Expr::Div(l, r),
                BinOp::Mod => Expr::Mod(l, r),
            }
        }
    })
}

// ---------------- Public API ----------------

/// Parse a pretty-printed formula, resolving identifiers against `scope`.
///
/// The tree is built exactly as written: no simplification takes place.
///
/// Example
/// ```
/// use hyformal::prelude::*;
///
/// let mut scope = Scope::new();
/// let x = scope.declare("x", DataType::bounded(0, 7));
/// let e = parse("x' = x + 1", &scope).unwrap();
/// assert_eq!(e, Expr::Eq(Box::new(x.primed()), Box::new(Expr::Add(vec![x.to_expr(), int(1)]))));
/// ```
pub fn parse(src: &str, scope: &Scope) -> FormalResult<Expr> {
    let (tokens, lex_errs) = lexer().parse(src).into_output_errors();
    let mut errors: Vec<String> = lex_errs
        .into_iter()
        .map(|e| format!("lexing error: {e}"))
        .collect();

    let tokens = match tokens {
        Some(toks) if errors.is_empty() => toks,
        _ => return Err(FormalError::Parse(errors)),
    };

    let (ast, parse_errs) = ast_parser()
        .then_ignore(end())
        .parse(tokens.as_slice())
        .into_output_errors();
    errors.extend(parse_errs.into_iter().map(|e| format!("parse error: {e}")));

    match ast {
        Some(ast) if errors.is_empty() => resolve(ast, scope),
        _ => Err(FormalError::Parse(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::func::*;

    #[test]
    fn precedence_follows_printer() {
        let mut scope = Scope::new();
        let x = scope.declare("x", DataType::Int);
        let y = scope.declare("y", DataType::Int);

        let e = parse("x + 1 * y < 3 /\\ !(y = 0) \\/ x >= 2", &scope).unwrap();
        let expected = Expr::Or(vec![
            Expr::And(vec![
                Expr::Lt(
                    Box::new(Expr::Add(vec![
                        x.to_expr(),
                        Expr::Mul(vec![int(1), y.to_expr()]),
                    ])),
                    Box::new(int(3)),
                ),
                Expr::Not(Box::new(Expr::Eq(Box::new(y.to_expr()), Box::new(int(0))))),
            ]),
            Expr::Geq(Box::new(x.to_expr()), Box::new(int(2))),
        ]);
        assert_eq!(e, expected);
    }

    #[test]
    fn subtraction_closes_sums() {
        let mut scope = Scope::new();
        let x = scope.declare("x", DataType::Int);
        let e = parse("x + 1 - 2 + 3", &scope).unwrap();
        let expected = Expr::Add(vec![
            Expr::Sub(
                Box::new(Expr::Add(vec![x.to_expr(), int(1)])),
                Box::new(int(2)),
            ),
            int(3),
        ]);
        assert_eq!(e, expected);
    }

    #[test]
    fn negative_literals_and_negation() {
        let mut scope = Scope::new();
        let x = scope.declare("x", DataType::Int);
        assert_eq!(parse("-3", &scope).unwrap(), int(-3));
        assert_eq!(
            parse("-(-3)", &scope).unwrap(),
            Expr::Neg(Box::new(int(-3)))
        );
        assert_eq!(parse("-x'", &scope).unwrap(), Expr::Neg(Box::new(x.primed())));
    }

    #[test]
    fn versions_and_comments() {
        let mut scope = Scope::new();
        let x = scope.declare("x", DataType::Int);
        let e = parse("x@2 <= x@10 ; trailing comment", &scope).unwrap();
        assert_eq!(e, Expr::Leq(Box::new(x.at(2).to_expr()), Box::new(x.at(10).to_expr())));
    }

    #[test]
    fn errors_are_reported() {
        let mut scope = Scope::new();
        scope.declare("x", DataType::Int);
        assert_eq!(
            parse("x = z", &scope),
            Err(FormalError::UnknownIdentifier("z".into()))
        );
        assert!(matches!(parse("x = ", &scope), Err(FormalError::Parse(_))));
        assert!(matches!(parse("x # 1", &scope), Err(FormalError::Parse(_))));
        assert!(matches!(parse("if = 1", &scope), Err(FormalError::Parse(_))));
    }
}
