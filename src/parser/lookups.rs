use std::collections::HashMap;

use crate::{
    ast::ast::{ExprId, StmtId},
    errors::errors::Error,
    lexer::tokens::TokenKind,
};

use super::{expr::*, parser::Parser, stmt::*};

/// Operator precedence, loosest first.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
pub enum BindingPower {
    Default,
    Or,
    And,
    Not,
    Comparison,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Additive,
    Multiplicative,
    Unary,
    Power,
    Call,
    Primary,
}

pub type StmtHandler = fn(&mut Parser<'_, '_>) -> Result<StmtId, Error>;
pub type NUDHandler = fn(&mut Parser<'_, '_>) -> Result<ExprId, Error>;
pub type LEDHandler = fn(&mut Parser<'_, '_>, ExprId, BindingPower) -> Result<ExprId, Error>;

pub fn create_token_lookups(parser: &mut Parser) {
    // Logical
    parser.led(TokenKind::Or, BindingPower::Or, parse_bool_op_expr);
    parser.led(TokenKind::And, BindingPower::And, parse_bool_op_expr);

    // Comparison (`not` here is the start of `not in`)
    parser.led(TokenKind::Less, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::LessEquals, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::Greater, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::GreaterEquals, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::Equals, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::NotEquals, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::In, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::Is, BindingPower::Comparison, parse_compare_expr);
    parser.led(TokenKind::Not, BindingPower::Comparison, parse_compare_expr);

    // Bitwise
    parser.led(TokenKind::Pipe, BindingPower::BitOr, parse_binary_expr);
    parser.led(TokenKind::Caret, BindingPower::BitXor, parse_binary_expr);
    parser.led(TokenKind::Ampersand, BindingPower::BitAnd, parse_binary_expr);
    parser.led(TokenKind::LeftShift, BindingPower::Shift, parse_binary_expr);
    parser.led(TokenKind::RightShift, BindingPower::Shift, parse_binary_expr);

    // Additive and multiplicative
    parser.led(TokenKind::Plus, BindingPower::Additive, parse_binary_expr);
    parser.led(TokenKind::Dash, BindingPower::Additive, parse_binary_expr);
    parser.led(TokenKind::Star, BindingPower::Multiplicative, parse_binary_expr);
    parser.led(TokenKind::Slash, BindingPower::Multiplicative, parse_binary_expr);
    parser.led(TokenKind::DoubleSlash, BindingPower::Multiplicative, parse_binary_expr);
    parser.led(TokenKind::Percent, BindingPower::Multiplicative, parse_binary_expr);
    parser.led(TokenKind::At, BindingPower::Multiplicative, parse_binary_expr);

    parser.led(TokenKind::DoubleStar, BindingPower::Power, parse_power_expr);

    // Call, subscript and member access
    parser.led(TokenKind::OpenParen, BindingPower::Call, parse_call_expr);
    parser.led(TokenKind::OpenBracket, BindingPower::Call, parse_subscript_expr);
    parser.led(TokenKind::Dot, BindingPower::Call, parse_member_expr);

    // Literals and symbols
    parser.nud(TokenKind::Name, parse_primary_expr);
    parser.nud(TokenKind::Integer, parse_primary_expr);
    parser.nud(TokenKind::Real, parse_primary_expr);
    parser.nud(TokenKind::Imaginary, parse_primary_expr);
    parser.nud(TokenKind::String, parse_primary_expr);
    parser.nud(TokenKind::True, parse_primary_expr);
    parser.nud(TokenKind::False, parse_primary_expr);
    parser.nud(TokenKind::None, parse_primary_expr);

    // Prefix
    parser.nud(TokenKind::Dash, parse_prefix_expr);
    parser.nud(TokenKind::Plus, parse_prefix_expr);
    parser.nud(TokenKind::Tilde, parse_prefix_expr);
    parser.nud(TokenKind::Not, parse_not_expr);

    // Displays
    parser.nud(TokenKind::OpenParen, parse_grouping_expr);
    parser.nud(TokenKind::OpenBracket, parse_list_expr);
    parser.nud(TokenKind::OpenCurly, parse_dict_or_set_expr);

    // Compound statements
    parser.stmt(TokenKind::If, parse_if_stmt);
    parser.stmt(TokenKind::While, parse_while_stmt);
    parser.stmt(TokenKind::For, parse_for_stmt);
    parser.stmt(TokenKind::Def, parse_fn_decl_stmt);

    // Simple statements
    parser.simple_stmt(TokenKind::Pass, parse_keyword_stmt);
    parser.simple_stmt(TokenKind::Break, parse_keyword_stmt);
    parser.simple_stmt(TokenKind::Continue, parse_keyword_stmt);
    parser.simple_stmt(TokenKind::Return, parse_return_stmt);
    parser.simple_stmt(TokenKind::Raise, parse_raise_stmt);
    parser.simple_stmt(TokenKind::Import, parse_import_stmt);
    parser.simple_stmt(TokenKind::From, parse_import_from_stmt);
}

// Lookup tables inside parser struct, so it's easier
pub type StmtLookup = HashMap<TokenKind, StmtHandler>;
pub type NUDLookup = HashMap<TokenKind, NUDHandler>;
pub type LEDLookup = HashMap<TokenKind, LEDHandler>;
pub type BPLookup = HashMap<TokenKind, BindingPower>;
