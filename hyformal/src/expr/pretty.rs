//! RcDoc-based pretty-printer with termcolor annotations for [`Expr`].
//!
//! Role
//! - Convert an [`Expr`] into an annotated document suitable for width-aware rendering.
//! - Provide colored output for terminals (TTY-aware) and plain strings for logs/tests.
//!
//! The printed syntax is the one accepted by [`crate::parser::parse`]; the two round-trip.
//! Binding strength, loosest first: `if`, `<=>`, `=>`, `\/`, `/\`, `!`, comparisons,
//! `+ -`, `* / %`, unary `-`, postfix `'`, atoms.
use std::io::{self, Write};

use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::expr::{Expr, ExprType};

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Keyword,  // if, then, else, true, false
    Operator, // + * /\ \/ => <=> = ...
    Ident,    // variables
    Version,  // @index of versioned constants
    Literal,  // integers
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    _ => Color::Magenta,
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Version => {
                s.set_dimmed(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
        }
        s
    }
}

type Doc = RcDoc<'static, Style>;

fn styled(style: Style, s: impl std::fmt::Display) -> Doc {
    RcDoc::as_string(s).annotate(style)
}

#[inline]
fn lparen(depth: u8) -> Doc {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> Doc {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn kw(s: &'static str) -> Doc {
    styled(Style::Keyword, s)
}

fn op(s: &'static str) -> Doc {
    styled(Style::Operator, s)
}

pub(crate) fn precedence(e: ExprType) -> u8 {
    use ExprType::*;

    match e {
        Ite => 1,
        Iff => 2,
        Implies => 3,
        Or => 4,
        And => 5,
        Not => 6,
        Eq | Neq | Lt | Leq | Gt | Geq => 7,
        Add | Sub => 8,
        Mul | Div | Mod => 9,
        Neg => 10,
        Prime => 11,
        True | False | Int | Var | Const => 255,
    }
}

#[inline]
fn requires_parens(current: &Expr, parent: ExprType) -> bool {
    let current_type = current.type_();
    // Prefix and postfix chains read unambiguously: `!!p`, `--x`, `x''`.
    if current_type == parent && matches!(parent, ExprType::Not | ExprType::Neg | ExprType::Prime)
    {
        return false;
    }
    // `-3` is read back as a literal, so a negated literal keeps its parentheses.
    if let Expr::Int(v) = current {
        return parent == ExprType::Neg || (*v < 0 && parent == ExprType::Prime);
    }
    // `!` accepts a comparison, but `!(x = y)` reads better than `!x = y`.
    if parent == ExprType::Not {
        return precedence(current_type) < precedence(ExprType::Prime);
    }
    precedence(current_type) <= precedence(parent)
}

fn child_doc(e: &Expr, parent: ExprType, depth: u8) -> Doc {
    if requires_parens(e, parent) {
        lparen(depth)
            .append(to_doc_with_depth(e, depth + 1))
            .append(rparen(depth))
            .group()
    } else {
        to_doc_with_depth(e, depth)
    }
}

fn infix(l: &Expr, symbol: &'static str, r: &Expr, parent: ExprType, depth: u8) -> Doc {
    child_doc(l, parent, depth)
        .append(RcDoc::space())
        .append(op(symbol))
        .append(RcDoc::line())
        .append(child_doc(r, parent, depth))
        .group()
}

fn nary(es: &[Expr], symbol: &'static str, parent: ExprType, depth: u8) -> Doc {
    RcDoc::intersperse(
        es.iter().map(|e| child_doc(e, parent, depth)),
        RcDoc::space().append(op(symbol)).append(RcDoc::line()),
    )
    .nest(2)
    .group()
}

/// Depth-aware conversion that colors parentheses by nesting level.
fn to_doc_with_depth(e: &Expr, depth: u8) -> Doc {
    let ty = e.type_();
    match e {
        Expr::True => kw("true"),
        Expr::False => kw("false"),
        Expr::Int(v) => styled(Style::Literal, v),
        Expr::Var(v) => styled(Style::Ident, v.name().to_owned()),
        Expr::Const(c) => styled(Style::Ident, c.var.name().to_owned())
            .append(styled(Style::Version, format!("@{}", c.index))),
        Expr::Prime(inner) => child_doc(inner, ty, depth).append(op("'")),

        Expr::Not(inner) => op("!").append(child_doc(inner, ty, depth)),
        Expr::Neg(inner) => op("-").append(child_doc(inner, ty, depth)),

        Expr::And(es) => nary(es, "/\\", ty, depth),
        Expr::Or(es) => nary(es, "\\/", ty, depth),
        Expr::Add(es) => nary(es, "+", ty, depth),
        Expr::Mul(es) => nary(es, "*", ty, depth),

        Expr::Implies(l, r) => infix(l, "=>", r, ty, depth),
        Expr::Iff(l, r) => infix(l, "<=>", r, ty, depth),
        Expr::Eq(l, r) => infix(l, "=", r, ty, depth),
        Expr::Neq(l, r) => infix(l, "!=", r, ty, depth),
        Expr::Lt(l, r) => infix(l, "<", r, ty, depth),
        Expr::Leq(l, r) => infix(l, "<=", r, ty, depth),
        Expr::Gt(l, r) => infix(l, ">", r, ty, depth),
        Expr::Geq(l, r) => infix(l, ">=", r, ty, depth),
        Expr::Sub(l, r) => infix(l, "-", r, ty, depth),
        Expr::Div(l, r) => infix(l, "/", r, ty, depth),
        Expr::Mod(l, r) => infix(l, "%", r, ty, depth),

        Expr::Ite {
            condition,
            then_branch,
            else_branch,
        } => kw("if")
            .append(RcDoc::space())
            .append(child_doc(condition, ty, depth))
            .append(RcDoc::line())
            .append(kw("then"))
            .append(RcDoc::space())
            .append(child_doc(then_branch, ty, depth))
            .append(RcDoc::line())
            .append(kw("else"))
            .append(RcDoc::space())
            .append(child_doc(else_branch, ty, depth))
            .nest(2)
            .group(),
    }
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

fn render_to<W: WriteColor + Write>(doc: &Doc, width: usize, out: &mut W) -> io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(width, &mut cw)
}

fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Pretty-printing conveniences for [`Expr`].
pub trait PrettyExpr {
    /// Build an RcDoc representation of this expression with style annotations.
    fn pretty_doc(&self) -> RcDoc<'static, Style>;

    /// Render this expression with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()>;

    /// Print this expression to stdout with colors (TTY-aware), at the terminal width.
    fn pretty_print(&self) -> io::Result<()>;

    /// Format this expression into a plain string (no colors) at the given width.
    fn pretty_string(&self, width: usize) -> String;
}

impl PrettyExpr for Expr {
    #[inline]
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self, 0)
    }

    #[inline]
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        render_to(&self.pretty_doc(), width, out)
    }

    fn pretty_print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.pretty_render_to(terminal_width(), &mut stdout)?;
        writeln!(stdout)
    }

    fn pretty_string(&self, width: usize) -> String {
        let mut buf = String::new();
        let _ = self.pretty_doc().render_fmt(width, &mut buf);
        buf
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = FmtWrite::new(f);
        self.pretty_doc().render_raw(80, &mut w)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        dtype::DataType,
        expr::{Expr, func::*},
        variable::VarDecl,
    };

    use super::PrettyExpr;

    #[test]
    fn parenthesizes_by_precedence() {
        let x = VarDecl::new("x", DataType::Int);
        let y = VarDecl::new("y", DataType::Int);

        let e = mul([add([x.to_expr(), int(1)]), y.to_expr()]);
        assert_eq!(e.to_string(), "(x + 1) * y");

        let e = and([
            or([lt(x.to_expr(), int(0)), gt(y.to_expr(), int(3))]),
            not(eq(x.at(2).to_expr(), y.to_expr())),
        ]);
        assert_eq!(e.to_string(), "(x < 0 \\/ y > 3) /\\ !(x@2 = y)");

        let e = sub(sub(x.to_expr(), y.to_expr()), int(2));
        assert_eq!(e.to_string(), "(x - y) - 2");
    }

    #[test]
    fn primes_and_conditionals() {
        let x = VarDecl::new("x", DataType::Int);
        let e = eq(
            x.primed(),
            ite(lt(x.to_expr(), int(3)), add([x.to_expr(), int(1)]), int(0)),
        );
        assert_eq!(e.to_string(), "x' = (if x < 3 then x + 1 else 0)");

        let e = prime(add([x.to_expr(), int(1)]));
        assert_eq!(e.to_string(), "(x + 1)'");
        assert_eq!(
            Expr::Not(Box::new(not(lt(x.to_expr(), int(0))))).to_string(),
            "!!(x < 0)"
        );
    }

    #[test]
    fn narrow_width_breaks_lines() {
        let vars: Vec<_> = (0..8)
            .map(|i| VarDecl::new(format!("long_name_{i}"), DataType::Bool).to_expr())
            .collect();
        let e = and(vars);
        let narrow = e.pretty_string(20);
        assert!(narrow.lines().count() > 1);
        assert_eq!(e.pretty_string(200).lines().count(), 1);
    }
}
