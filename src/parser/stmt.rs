use crate::{
    ast::{
        ast::{ExprId, StmtId},
        expressions::{ExprKind, Operator},
        statements::{Alias, Arg, StmtKind},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{TokenKind, TokenValue},
    Span,
};

use super::{
    expr::{parse_expr, parse_expr_list, set_store_context},
    lookups::BindingPower,
    parser::Parser,
};

/// Parses one logical line or one compound statement. A line may hold
/// several `;`-separated simple statements.
pub fn parse_stmt(parser: &mut Parser) -> Result<Vec<StmtId>, Error> {
    if let Some(handler) = parser.stmt_handler(parser.current_token_kind()) {
        return Ok(vec![handler(parser)?]);
    }

    parse_simple_stmts(parser)
}

pub fn parse_simple_stmts(parser: &mut Parser) -> Result<Vec<StmtId>, Error> {
    let mut stmts = vec![parse_simple_stmt(parser)?];
    while parser.eat(TokenKind::Semicolon)? {
        if parser.current_token_kind() == TokenKind::Newline {
            break;
        }
        stmts.push(parse_simple_stmt(parser)?);
    }
    parser.expect(TokenKind::Newline)?;

    Ok(stmts)
}

fn parse_simple_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    match parser.simple_stmt_handler(parser.current_token_kind()) {
        Some(handler) => handler(parser),
        None => parse_expression_stmt(parser),
    }
}

/// `: NEWLINE INDENT stmt+ DEDENT`, or simple statements on the same line.
pub fn parse_block(parser: &mut Parser) -> Result<Box<[StmtId]>, Error> {
    parser.expect(TokenKind::Colon)?;

    if !parser.eat(TokenKind::Newline)? {
        return Ok(parse_simple_stmts(parser)?.into_boxed_slice());
    }

    parser.expect(TokenKind::Indent)?;
    let mut body = Vec::new();
    while !matches!(
        parser.current_token_kind(),
        TokenKind::Dedent | TokenKind::EndOfFile
    ) {
        body.extend(parse_stmt(parser)?);
    }
    parser.expect(TokenKind::Dedent)?;

    Ok(body.into_boxed_slice())
}

fn expect_name(parser: &mut Parser) -> Result<(String, Span), Error> {
    let token = parser.expect(TokenKind::Name)?;
    match token.value {
        TokenValue::Str(name) => Ok((name, token.span)),
        _ => Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: token.kind.to_string(),
            },
            token.span,
        )),
    }
}

fn parse_dotted_name(parser: &mut Parser) -> Result<String, Error> {
    let (mut name, _) = expect_name(parser)?;
    while parser.eat(TokenKind::Dot)? {
        name.push('.');
        name.push_str(&expect_name(parser)?.0);
    }
    Ok(name)
}

fn parse_alias(parser: &mut Parser, dotted: bool) -> Result<Alias, Error> {
    let name = if dotted {
        parse_dotted_name(parser)?
    } else {
        expect_name(parser)?.0
    };
    let asname = if parser.eat(TokenKind::As)? {
        Some(expect_name(parser)?.0)
    } else {
        None
    };
    Ok(Alias { name, asname })
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    // Also entered on `elif`, which becomes a nested `If` in `orelse`.
    let first = parser.advance()?.span.first;
    let test = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;

    let orelse: Box<[StmtId]> = match parser.current_token_kind() {
        TokenKind::Elif => Box::new([parse_if_stmt(parser)?]),
        TokenKind::Else => {
            parser.advance()?;
            parse_block(parser)?
        }
        _ => Box::new([]),
    };

    let span = parser.span_from(first);
    Ok(parser
        .arena()
        .alloc_stmt(StmtKind::If { test, body, orelse }, span))
}

fn parse_loop_else(parser: &mut Parser) -> Result<Box<[StmtId]>, Error> {
    if parser.eat(TokenKind::Else)? {
        return parse_block(parser);
    }
    Ok(Box::new([]))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;
    let test = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;
    let orelse = parse_loop_else(parser)?;

    let span = parser.span_from(first);
    Ok(parser
        .arena()
        .alloc_stmt(StmtKind::While { test, body, orelse }, span))
}

pub fn parse_for_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;

    // Targets stop short of comparisons so `in` is left for us.
    let target = parse_expr_list(parser, BindingPower::Comparison)?;
    set_store_context(parser.arena(), target)?;
    parser.expect(TokenKind::In)?;
    let iter = parse_expr_list(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;
    let orelse = parse_loop_else(parser)?;

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_stmt(
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        },
        span,
    ))
}

pub fn parse_fn_decl_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;
    let (name, _) = expect_name(parser)?;

    parser.expect(TokenKind::OpenParen)?;
    let mut args = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseParen {
        let (arg, arg_span) = expect_name(parser)?;
        let annotation = if parser.eat(TokenKind::Colon)? {
            Some(parse_expr(parser, BindingPower::Default)?)
        } else {
            None
        };
        args.push(Arg {
            name: arg,
            annotation,
            span: parser.span_from(arg_span.first),
        });

        if !parser.eat(TokenKind::Comma)? {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let returns = if parser.eat(TokenKind::Arrow)? {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    let body = parse_block(parser)?;

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_stmt(
        StmtKind::FunctionDef {
            name,
            args: args.into_boxed_slice(),
            returns,
            body,
        },
        span,
    ))
}

/// `pass`, `break` and `continue`.
pub fn parse_keyword_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let token = parser.advance()?;
    let kind = match token.kind {
        TokenKind::Pass => StmtKind::Pass,
        TokenKind::Break => StmtKind::Break,
        _ => StmtKind::Continue,
    };

    Ok(parser.arena().alloc_stmt(kind, token.span))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;
    let value = if parser.at_expr_start() {
        Some(parse_expr_list(parser, BindingPower::Default)?)
    } else {
        None
    };

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_stmt(StmtKind::Return(value), span))
}

pub fn parse_raise_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;
    let value = if parser.at_expr_start() {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_stmt(StmtKind::Raise(value), span))
}

pub fn parse_import_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;

    let mut names = vec![parse_alias(parser, true)?];
    while parser.eat(TokenKind::Comma)? {
        names.push(parse_alias(parser, true)?);
    }

    let span = parser.span_from(first);
    Ok(parser
        .arena()
        .alloc_stmt(StmtKind::Import(names.into_boxed_slice()), span))
}

pub fn parse_import_from_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.advance()?.span.first;
    let module = parse_dotted_name(parser)?;
    parser.expect(TokenKind::Import)?;

    let parenthesized = parser.eat(TokenKind::OpenParen)?;
    let mut names = vec![parse_alias(parser, false)?];
    while parser.eat(TokenKind::Comma)? {
        if parenthesized && parser.current_token_kind() == TokenKind::CloseParen {
            break;
        }
        names.push(parse_alias(parser, false)?);
    }
    if parenthesized {
        parser.expect(TokenKind::CloseParen)?;
    }

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_stmt(
        StmtKind::ImportFrom {
            module,
            names: names.into_boxed_slice(),
        },
        span,
    ))
}

fn augmented_operator(kind: TokenKind) -> Option<Operator> {
    let op = match kind {
        TokenKind::PlusEquals => Operator::Add,
        TokenKind::MinusEquals => Operator::Sub,
        TokenKind::StarEquals => Operator::Mult,
        TokenKind::SlashEquals => Operator::Div,
        TokenKind::DoubleSlashEquals => Operator::FloorDiv,
        TokenKind::PercentEquals => Operator::Mod,
        TokenKind::DoubleStarEquals => Operator::Pow,
        TokenKind::AmpersandEquals => Operator::BitAnd,
        TokenKind::PipeEquals => Operator::BitOr,
        TokenKind::CaretEquals => Operator::BitXor,
        TokenKind::LeftShiftEquals => Operator::LShift,
        TokenKind::RightShiftEquals => Operator::RShift,
        _ => return None,
    };
    Some(op)
}

/// Expression statements and the three assignment forms, which all start
/// with an expression.
fn parse_expression_stmt(parser: &mut Parser) -> Result<StmtId, Error> {
    let first = parser.current_token().span.first;
    let expr = parse_expr_list(parser, BindingPower::Default)?;
    let current = parser.current_token_kind();

    let kind = if current == TokenKind::Assignment {
        let mut targets = vec![expr];
        let value = loop {
            parser.advance()?;
            let next = parse_expr_list(parser, BindingPower::Default)?;
            if parser.current_token_kind() != TokenKind::Assignment {
                break next;
            }
            targets.push(next);
        };
        for target in &targets {
            set_store_context(parser.arena(), *target)?;
        }
        StmtKind::Assign {
            targets: targets.into_boxed_slice(),
            value,
        }
    } else if current == TokenKind::Colon {
        ensure_single_target(parser, expr)?;
        parser.advance()?;
        let annotation = parse_expr(parser, BindingPower::Default)?;
        let value = if parser.eat(TokenKind::Assignment)? {
            Some(parse_expr_list(parser, BindingPower::Default)?)
        } else {
            None
        };
        StmtKind::AnnotatedAssign {
            target: expr,
            annotation,
            value,
        }
    } else if let Some(op) = augmented_operator(current) {
        ensure_single_target(parser, expr)?;
        parser.advance()?;
        let value = parse_expr_list(parser, BindingPower::Default)?;
        StmtKind::AugmentedAssign {
            target: expr,
            op,
            value,
        }
    } else {
        StmtKind::Expr(expr)
    };

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_stmt(kind, span))
}

/// Annotated and augmented assignments take exactly one name, attribute or
/// subscript.
fn ensure_single_target(parser: &mut Parser, target: ExprId) -> Result<(), Error> {
    let expr = parser.arena_ref().expr(target);
    if matches!(expr.kind, ExprKind::Tuple { .. } | ExprKind::List { .. }) {
        return Err(Error::new(ErrorImpl::InvalidAssignmentTarget, expr.span));
    }
    set_store_context(parser.arena(), target)
}
