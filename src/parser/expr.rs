use num_traits::ToPrimitive;

use crate::{
    ast::{
        ast::{AstArena, ExprId},
        expressions::{
            BoolOperator, CompareOperator, ExprContext, ExprKind, Keyword, Operator,
            UnaryOperator,
        },
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind, TokenValue},
    Span,
};

use super::{lookups::BindingPower, parser::Parser};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<ExprId, Error> {
    // First parse NUD
    let Some(nud) = parser.nud_handler(parser.current_token_kind()) else {
        return Err(parser.unexpected());
    };
    let mut left = nud(parser)?;

    // While the current token binds tighter than the caller, keep extending lhs
    while parser.current_binding_power() > bp {
        let current_bp = parser.current_binding_power();
        let Some(led) = parser.led_handler(parser.current_token_kind()) else {
            return Err(parser.unexpected());
        };
        left = led(parser, left, current_bp)?;
    }

    Ok(left)
}

/// `a, b, c` as a tuple; a lone expression is returned unchanged. A trailing
/// comma is allowed.
pub fn parse_expr_list(parser: &mut Parser, bp: BindingPower) -> Result<ExprId, Error> {
    let head = parse_expr(parser, bp)?;
    if parser.current_token_kind() != TokenKind::Comma {
        return Ok(head);
    }

    let first = span_of(parser, head).first;
    let mut elements = vec![head];
    while parser.eat(TokenKind::Comma)? {
        if !parser.at_expr_start() {
            break;
        }
        elements.push(parse_expr(parser, bp)?);
    }

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_expr(
        ExprKind::Tuple {
            elements: elements.into_boxed_slice(),
            ctx: ExprContext::Load,
        },
        span,
    ))
}

fn span_of(parser: &Parser, id: ExprId) -> Span {
    parser.arena_ref().expr(id).span
}

fn unexpected_token(token: &Token) -> Error {
    Error::new(
        ErrorImpl::UnexpectedToken {
            token: token.kind.to_string(),
        },
        token.span,
    )
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<ExprId, Error> {
    let token = parser.advance()?;
    let first = token.span.first;

    let kind = match (token.kind, token.value) {
        (TokenKind::Name, TokenValue::Str(id)) => ExprKind::Name {
            id,
            ctx: ExprContext::Load,
        },
        (TokenKind::Integer, TokenValue::Integer(value)) => match value.to_i64() {
            Some(value) => ExprKind::IntegerLiteral(value),
            None => {
                return Err(Error::new(
                    ErrorImpl::IntegerTooLarge {
                        literal: value.to_string(),
                    },
                    token.span,
                ))
            }
        },
        (TokenKind::Real, TokenValue::Real(value)) => ExprKind::FloatLiteral(value),
        (TokenKind::Imaginary, TokenValue::Imaginary(value)) => ExprKind::ComplexLiteral(value),
        (TokenKind::String, TokenValue::Str(mut value)) => {
            // Adjacent literals concatenate: "a" "b"
            while parser.current_token_kind() == TokenKind::String {
                if let TokenValue::Str(next) = parser.advance()?.value {
                    value.push_str(&next);
                }
            }
            ExprKind::StringLiteral(value)
        }
        (TokenKind::True, _) => ExprKind::BoolLiteral(true),
        (TokenKind::False, _) => ExprKind::BoolLiteral(false),
        (TokenKind::None, _) => ExprKind::NoneLiteral,
        (kind, _) => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: kind.to_string(),
                },
                token.span,
            ))
        }
    };

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_expr(kind, span))
}

pub fn parse_binary_expr(
    parser: &mut Parser,
    left: ExprId,
    bp: BindingPower,
) -> Result<ExprId, Error> {
    let operator_token = parser.advance()?;
    let op = match operator_token.kind {
        TokenKind::Plus => Operator::Add,
        TokenKind::Dash => Operator::Sub,
        TokenKind::Star => Operator::Mult,
        TokenKind::At => Operator::MatMult,
        TokenKind::Slash => Operator::Div,
        TokenKind::DoubleSlash => Operator::FloorDiv,
        TokenKind::Percent => Operator::Mod,
        TokenKind::LeftShift => Operator::LShift,
        TokenKind::RightShift => Operator::RShift,
        TokenKind::Pipe => Operator::BitOr,
        TokenKind::Caret => Operator::BitXor,
        TokenKind::Ampersand => Operator::BitAnd,
        _ => return Err(unexpected_token(&operator_token)),
    };

    let right = parse_expr(parser, bp)?;

    let span = span_of(parser, left).merge(span_of(parser, right));
    Ok(parser
        .arena()
        .alloc_expr(ExprKind::BinaryOp { left, op, right }, span))
}

/// `**` is right-associative and its right operand may carry a unary sign.
pub fn parse_power_expr(
    parser: &mut Parser,
    left: ExprId,
    _bp: BindingPower,
) -> Result<ExprId, Error> {
    parser.advance()?;
    let right = parse_expr(parser, BindingPower::Unary)?;

    let span = span_of(parser, left).merge(span_of(parser, right));
    Ok(parser.arena().alloc_expr(
        ExprKind::BinaryOp {
            left,
            op: Operator::Pow,
            right,
        },
        span,
    ))
}

pub fn parse_bool_op_expr(
    parser: &mut Parser,
    left: ExprId,
    bp: BindingPower,
) -> Result<ExprId, Error> {
    let operator = parser.current_token_kind();
    let op = if operator == TokenKind::And {
        BoolOperator::And
    } else {
        BoolOperator::Or
    };

    let mut values = vec![left];
    while parser.current_token_kind() == operator {
        parser.advance()?;
        values.push(parse_expr(parser, bp)?);
    }

    let span = parser.span_from(span_of(parser, left).first);
    Ok(parser.arena().alloc_expr(
        ExprKind::BoolOp {
            op,
            values: values.into_boxed_slice(),
        },
        span,
    ))
}

fn parse_compare_operator(parser: &mut Parser) -> Result<CompareOperator, Error> {
    let token = parser.advance()?;
    let op = match token.kind {
        TokenKind::Equals => CompareOperator::Eq,
        TokenKind::NotEquals => CompareOperator::NotEq,
        TokenKind::Less => CompareOperator::Lt,
        TokenKind::LessEquals => CompareOperator::LtE,
        TokenKind::Greater => CompareOperator::Gt,
        TokenKind::GreaterEquals => CompareOperator::GtE,
        TokenKind::In => CompareOperator::In,
        TokenKind::Is => {
            if parser.eat(TokenKind::Not)? {
                CompareOperator::IsNot
            } else {
                CompareOperator::Is
            }
        }
        TokenKind::Not => {
            parser.expect(TokenKind::In)?;
            CompareOperator::NotIn
        }
        _ => return Err(unexpected_token(&token)),
    };
    Ok(op)
}

/// Collects a whole comparison chain, `a < b <= c`, into one node.
pub fn parse_compare_expr(
    parser: &mut Parser,
    left: ExprId,
    _bp: BindingPower,
) -> Result<ExprId, Error> {
    let mut ops = Vec::new();
    let mut comparators = Vec::new();

    while parser.current_binding_power() == BindingPower::Comparison {
        ops.push(parse_compare_operator(parser)?);
        comparators.push(parse_expr(parser, BindingPower::Comparison)?);
    }

    let span = parser.span_from(span_of(parser, left).first);
    Ok(parser.arena().alloc_expr(
        ExprKind::Compare {
            left,
            ops: ops.into_boxed_slice(),
            comparators: comparators.into_boxed_slice(),
        },
        span,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<ExprId, Error> {
    let operator_token = parser.advance()?;
    let op = match operator_token.kind {
        TokenKind::Dash => UnaryOperator::USub,
        TokenKind::Plus => UnaryOperator::UAdd,
        TokenKind::Tilde => UnaryOperator::Invert,
        _ => return Err(unexpected_token(&operator_token)),
    };
    let operand = parse_expr(parser, BindingPower::Unary)?;

    let span = parser.span_from(operator_token.span.first);
    Ok(parser
        .arena()
        .alloc_expr(ExprKind::UnaryOp { op, operand }, span))
}

pub fn parse_not_expr(parser: &mut Parser) -> Result<ExprId, Error> {
    let first = parser.advance()?.span.first;
    let operand = parse_expr(parser, BindingPower::Not)?;

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_expr(
        ExprKind::UnaryOp {
            op: UnaryOperator::Not,
            operand,
        },
        span,
    ))
}

pub fn parse_call_expr(
    parser: &mut Parser,
    func: ExprId,
    _bp: BindingPower,
) -> Result<ExprId, Error> {
    parser.advance()?;

    let mut args = Vec::new();
    let mut keywords = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseParen {
        let value = parse_expr(parser, BindingPower::Default)?;

        if parser.current_token_kind() == TokenKind::Assignment {
            let ExprKind::Name { id, .. } = &parser.arena_ref().expr(value).kind else {
                return Err(parser.unexpected());
            };
            let arg = id.clone();
            let first = span_of(parser, value).first;
            parser.advance()?;
            let value = parse_expr(parser, BindingPower::Default)?;
            keywords.push(Keyword {
                arg,
                value,
                span: parser.span_from(first),
            });
        } else {
            if !keywords.is_empty() {
                return Err(Error::new(
                    ErrorImpl::PositionalAfterKeyword,
                    span_of(parser, value),
                ));
            }
            args.push(value);
        }

        if !parser.eat(TokenKind::Comma)? {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let span = parser.span_from(span_of(parser, func).first);
    Ok(parser.arena().alloc_expr(
        ExprKind::Call {
            func,
            args: args.into_boxed_slice(),
            keywords: keywords.into_boxed_slice(),
        },
        span,
    ))
}

fn parse_subscript_item(parser: &mut Parser) -> Result<ExprId, Error> {
    let first = parser.current_token().span.first;

    let lower = if parser.current_token_kind() == TokenKind::Colon {
        None
    } else {
        let index = parse_expr(parser, BindingPower::Default)?;
        if parser.current_token_kind() != TokenKind::Colon {
            return Ok(index);
        }
        Some(index)
    };

    parser.expect(TokenKind::Colon)?;
    let upper = if parser.at_expr_start() {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    let step = if parser.eat(TokenKind::Colon)? && parser.at_expr_start() {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    let span = parser.span_from(first);
    Ok(parser
        .arena()
        .alloc_expr(ExprKind::Slice { lower, upper, step }, span))
}

pub fn parse_subscript_expr(
    parser: &mut Parser,
    value: ExprId,
    _bp: BindingPower,
) -> Result<ExprId, Error> {
    parser.advance()?;

    let head = parse_subscript_item(parser)?;
    let slice = if parser.current_token_kind() == TokenKind::Comma {
        let first = span_of(parser, head).first;
        let mut items = vec![head];
        while parser.eat(TokenKind::Comma)? {
            if parser.current_token_kind() == TokenKind::CloseBracket {
                break;
            }
            items.push(parse_subscript_item(parser)?);
        }
        let span = parser.span_from(first);
        parser.arena().alloc_expr(
            ExprKind::Tuple {
                elements: items.into_boxed_slice(),
                ctx: ExprContext::Load,
            },
            span,
        )
    } else {
        head
    };
    parser.expect(TokenKind::CloseBracket)?;

    let span = parser.span_from(span_of(parser, value).first);
    Ok(parser.arena().alloc_expr(
        ExprKind::Subscript {
            value,
            slice,
            ctx: ExprContext::Load,
        },
        span,
    ))
}

pub fn parse_member_expr(
    parser: &mut Parser,
    value: ExprId,
    _bp: BindingPower,
) -> Result<ExprId, Error> {
    parser.advance()?;
    let attr = match parser.expect(TokenKind::Name)?.value {
        TokenValue::Str(name) => name,
        _ => String::new(),
    };

    let span = parser.span_from(span_of(parser, value).first);
    Ok(parser.arena().alloc_expr(
        ExprKind::Attribute {
            value,
            attr,
            ctx: ExprContext::Load,
        },
        span,
    ))
}

/// Comma-separated expressions up to (and including) `close`.
fn parse_display_elements(parser: &mut Parser, close: TokenKind) -> Result<Vec<ExprId>, Error> {
    let mut elements = Vec::new();
    while parser.current_token_kind() != close {
        elements.push(parse_expr(parser, BindingPower::Default)?);
        if !parser.eat(TokenKind::Comma)? {
            break;
        }
    }
    parser.expect(close)?;
    Ok(elements)
}

/// `()`, `(expr)` or a parenthesised tuple.
pub fn parse_grouping_expr(parser: &mut Parser) -> Result<ExprId, Error> {
    let first = parser.advance()?.span.first;

    if parser.current_token_kind() != TokenKind::CloseParen {
        let inner = parse_expr(parser, BindingPower::Default)?;
        if parser.current_token_kind() != TokenKind::Comma {
            parser.expect(TokenKind::CloseParen)?;
            return Ok(inner);
        }
        parser.advance()?;
        let mut elements = vec![inner];
        elements.extend(parse_display_elements(parser, TokenKind::CloseParen)?);
        return Ok(alloc_tuple(parser, elements, first));
    }

    parser.advance()?;
    Ok(alloc_tuple(parser, Vec::new(), first))
}

fn alloc_tuple(parser: &mut Parser, elements: Vec<ExprId>, first: u32) -> ExprId {
    let span = parser.span_from(first);
    parser.arena().alloc_expr(
        ExprKind::Tuple {
            elements: elements.into_boxed_slice(),
            ctx: ExprContext::Load,
        },
        span,
    )
}

pub fn parse_list_expr(parser: &mut Parser) -> Result<ExprId, Error> {
    let first = parser.advance()?.span.first;
    let elements = parse_display_elements(parser, TokenKind::CloseBracket)?;

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_expr(
        ExprKind::List {
            elements: elements.into_boxed_slice(),
            ctx: ExprContext::Load,
        },
        span,
    ))
}

/// `{}` is an empty dict; `{k: v, ...}` a dict; `{a, ...}` a set.
pub fn parse_dict_or_set_expr(parser: &mut Parser) -> Result<ExprId, Error> {
    let first = parser.advance()?.span.first;

    if parser.current_token_kind() == TokenKind::CloseCurly {
        parser.advance()?;
        let span = parser.span_from(first);
        return Ok(parser.arena().alloc_expr(
            ExprKind::Dict {
                keys: Box::new([]),
                values: Box::new([]),
            },
            span,
        ));
    }

    let head = parse_expr(parser, BindingPower::Default)?;
    if !parser.eat(TokenKind::Colon)? {
        let mut elements = vec![head];
        if parser.eat(TokenKind::Comma)? {
            elements.extend(parse_display_elements(parser, TokenKind::CloseCurly)?);
        } else {
            parser.expect(TokenKind::CloseCurly)?;
        }
        let span = parser.span_from(first);
        return Ok(parser.arena().alloc_expr(
            ExprKind::Set {
                elements: elements.into_boxed_slice(),
            },
            span,
        ));
    }

    let mut keys = vec![head];
    let mut values = vec![parse_expr(parser, BindingPower::Default)?];
    while parser.eat(TokenKind::Comma)? {
        if parser.current_token_kind() == TokenKind::CloseCurly {
            break;
        }
        keys.push(parse_expr(parser, BindingPower::Default)?);
        parser.expect(TokenKind::Colon)?;
        values.push(parse_expr(parser, BindingPower::Default)?);
    }
    parser.expect(TokenKind::CloseCurly)?;

    let span = parser.span_from(first);
    Ok(parser.arena().alloc_expr(
        ExprKind::Dict {
            keys: keys.into_boxed_slice(),
            values: values.into_boxed_slice(),
        },
        span,
    ))
}

/// Marks an assignment target (and any nested tuple/list elements) as a
/// store. Anything that is not a name, attribute, subscript, tuple or list
/// cannot be assigned to.
pub fn set_store_context(arena: &mut AstArena, id: ExprId) -> Result<(), Error> {
    let span = arena.expr(id).span;
    let children = match &mut arena.expr_mut(id).kind {
        ExprKind::Name { ctx, .. }
        | ExprKind::Attribute { ctx, .. }
        | ExprKind::Subscript { ctx, .. } => {
            *ctx = ExprContext::Store;
            return Ok(());
        }
        ExprKind::Tuple { elements, ctx } | ExprKind::List { elements, ctx } => {
            *ctx = ExprContext::Store;
            elements.to_vec()
        }
        _ => return Err(Error::new(ErrorImpl::InvalidAssignmentTarget, span)),
    };

    for child in children {
        set_store_context(arena, child)?;
    }
    Ok(())
}
