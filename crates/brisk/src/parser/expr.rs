//! Expression parsing, lowest precedence first

use super::{PResult, Parser};
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::lexer::{Lexeme, Literal};

impl Parser {
    pub(super) fn expression(&mut self) -> PResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut left = self.and_expr()?;
        while self.matches(Lexeme::Or) {
            let right = self.and_expr()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut left = self.not_expr()?;
        while self.matches(Lexeme::And) {
            let right = self.not_expr()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> PResult<Expr> {
        if self.matches(Lexeme::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.relational()
    }

    fn relational(&mut self) -> PResult<Expr> {
        let mut left = self.shift()?;
        loop {
            let op = match self.peek().kind {
                Lexeme::Equal => BinaryOp::Equal,
                Lexeme::LessGreater => BinaryOp::NotEqual,
                Lexeme::Less => BinaryOp::Less,
                Lexeme::LessEqual => BinaryOp::LessEqual,
                Lexeme::Greater => BinaryOp::Greater,
                Lexeme::GreaterEqual => BinaryOp::GreaterEqual,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.shift()?;
            left = binary(left, op, right);
        }
    }

    fn shift(&mut self) -> PResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek().kind {
                Lexeme::LeftShift => BinaryOp::LeftShift,
                Lexeme::RightShift => BinaryOp::RightShift,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.additive()?;
            left = binary(left, op, right);
        }
    }

    fn additive(&mut self) -> PResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                Lexeme::Plus => BinaryOp::Add,
                Lexeme::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.exponent()?;
        loop {
            let op = match self.peek().kind {
                Lexeme::Star => BinaryOp::Multiply,
                Lexeme::Slash => BinaryOp::Divide,
                Lexeme::Backslash => BinaryOp::IntegerDivide,
                Lexeme::Mod => BinaryOp::Modulo,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.exponent()?;
            left = binary(left, op, right);
        }
    }

    fn exponent(&mut self) -> PResult<Expr> {
        let mut left = self.prefix()?;
        while self.matches(Lexeme::Caret) {
            let right = self.prefix()?;
            left = binary(left, BinaryOp::Power, right);
        }
        Ok(left)
    }

    fn prefix(&mut self) -> PResult<Expr> {
        let op = match self.peek().kind {
            Lexeme::Minus => UnaryOp::Negate,
            Lexeme::Plus => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.prefix()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Primary expression followed by any number of calls, member accesses
    /// and index operations.
    pub(super) fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(Lexeme::LeftParen) {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.matches(Lexeme::Dot) {
                let name = self.name_like("Expected property name after '.'")?;
                expr = Expr::DottedGet {
                    object: Box::new(expr),
                    name,
                };
            } else if self.matches(Lexeme::LeftSquare) {
                self.skip_newlines();
                let index = self.expression()?;
                self.skip_newlines();
                self.consume(Lexeme::RightSquare, "Expected ']' after index")?;
                expr = Expr::IndexedGet {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_newlines();
        if self.matches(Lexeme::RightParen) {
            return Ok(args);
        }
        loop {
            self.skip_newlines();
            args.push(self.expression()?);
            self.skip_newlines();
            if !self.matches(Lexeme::Comma) {
                break;
            }
        }
        self.consume(Lexeme::RightParen, "Expected ')' after arguments")?;
        Ok(args)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            Lexeme::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Lexeme::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Lexeme::Invalid => {
                self.advance();
                Ok(Expr::Literal(Literal::Invalid))
            }
            Lexeme::StringLiteral
            | Lexeme::IntegerLiteral
            | Lexeme::LongIntegerLiteral
            | Lexeme::FloatLiteral
            | Lexeme::DoubleLiteral => {
                self.advance();
                match token.literal {
                    Some(literal) => Ok(Expr::Literal(literal)),
                    None => Err(self.error_here("Malformed literal")),
                }
            }
            Lexeme::Identifier => {
                self.advance();
                Ok(Expr::Variable(token.text))
            }
            Lexeme::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(Lexeme::RightParen, "Expected ')' after expression")?;
                Ok(Expr::Grouping(Box::new(inner)))
            }
            Lexeme::LeftSquare => {
                self.advance();
                self.array_literal()
            }
            Lexeme::LeftBrace => {
                self.advance();
                self.assoc_array_literal()
            }
            Lexeme::Function | Lexeme::Sub => {
                let decl = self.function_body(None)?;
                Ok(Expr::Function(Box::new(decl)))
            }
            _ => Err(self.error_here("Expected expression")),
        }
    }

    fn skip_list_separators(&mut self) {
        while self.check_any(&[Lexeme::Newline, Lexeme::Comma, Lexeme::Colon]) {
            self.advance();
        }
    }

    fn array_literal(&mut self) -> PResult<Expr> {
        let mut elements = Vec::new();
        loop {
            self.skip_list_separators();
            if self.matches(Lexeme::RightSquare) {
                return Ok(Expr::ArrayLiteral(elements));
            }
            elements.push(self.expression()?);
            if !self.check_any(&[Lexeme::Comma, Lexeme::Newline, Lexeme::RightSquare]) {
                return Err(self.error_here("Expected ',' or ']' in array literal"));
            }
        }
    }

    fn assoc_array_literal(&mut self) -> PResult<Expr> {
        let mut members = Vec::new();
        loop {
            self.skip_list_separators();
            if self.matches(Lexeme::RightBrace) {
                return Ok(Expr::AssocArrayLiteral(members));
            }
            let key = if self.check(Lexeme::StringLiteral) {
                match self.advance().literal {
                    Some(Literal::String(s)) => s,
                    _ => return Err(self.error_here("Malformed key")),
                }
            } else {
                self.name_like("Expected key in associative array literal")?
            };
            self.consume(Lexeme::Colon, "Expected ':' after associative array key")?;
            self.skip_newlines();
            let value = self.expression()?;
            members.push((key, value));
            if !self.check_any(&[Lexeme::Comma, Lexeme::Newline, Lexeme::RightBrace]) {
                return Err(self.error_here("Expected ',' or '}' in associative array literal"));
            }
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, Expr, StmtKind, UnaryOp};
    use crate::lexer::Literal;
    use crate::parser::parse_source;
    use std::collections::HashMap;

    fn expr(source: &str) -> Expr {
        let result = parse_source("t", &format!("x = {source}"), &HashMap::new());
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        match result.program.statements.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Assign { value, .. }) => value,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn int(n: i32) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::Int32(n)))
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                left: int(1),
                op: BinaryOp::Add,
                right: Box::new(Expr::Binary {
                    left: int(2),
                    op: BinaryOp::Multiply,
                    right: int(3)
                })
            }
        );
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_power() {
        assert_eq!(
            expr("-2 ^ 2"),
            Expr::Binary {
                left: Box::new(Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: int(2)
                }),
                op: BinaryOp::Power,
                right: int(2)
            }
        );
    }

    #[test]
    fn test_not_is_lower_than_relational() {
        match expr("not a = b") {
            Expr::Unary { op: UnaryOp::Not, operand } => {
                assert!(matches!(*operand, Expr::Binary { op: BinaryOp::Equal, .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        match expr("a or b and c") {
            Expr::Binary { op: BinaryOp::Or, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_postfix_chain() {
        match expr("a.b[1](2)") {
            Expr::Call { callee, args } => {
                assert_eq!(args.len(), 1);
                assert!(matches!(*callee, Expr::IndexedGet { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_multiline_literals() {
        match expr("{\n  name: \"x\",\n  \"with space\": 2\n  end: 3\n}") {
            Expr::AssocArrayLiteral(members) => {
                let keys: Vec<_> = members.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["name", "with space", "end"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match expr("[1,\n2\n3]") {
            Expr::ArrayLiteral(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_shift_between_additive_and_relational() {
        match expr("1 << 2 + 1 < 9") {
            Expr::Binary { op: BinaryOp::Less, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::LeftShift, .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
