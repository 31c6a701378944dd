//! Statement parsing

use super::{PResult, Parser};
use crate::ast::{BinaryOp, Expr, FunctionDecl, IfBranch, ParamDecl, PrintItem, Stmt, StmtKind};
use crate::error::{RuntimeErrorDetail, SyntaxError};
use crate::lexer::{Lexeme, Literal};
use crate::value::ValueKind;

impl Parser {
    pub(super) fn statement(&mut self) -> PResult<Stmt> {
        let location = self.location();
        let kind = match self.peek().kind {
            Lexeme::Function | Lexeme::Sub if self.peek_next().kind == Lexeme::Identifier => {
                if self.function_depth > 0 {
                    return Err(SyntaxError::new(
                        RuntimeErrorDetail::BadSyntax,
                        "Named functions may only be declared at file level",
                        location,
                    ));
                }
                let name = self.peek_next().text.clone();
                StmtKind::Function(self.function_body(Some(name))?)
            }
            Lexeme::If => self.if_statement()?,
            Lexeme::For => self.for_statement()?,
            Lexeme::ForEach => self.for_each_statement()?,
            Lexeme::While => self.while_statement()?,
            Lexeme::Try => self.try_statement()?,
            Lexeme::Print => self.print_statement()?,
            Lexeme::Return => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.expression()?))
                }
            }
            Lexeme::Throw => {
                self.advance();
                StmtKind::Throw(self.expression()?)
            }
            Lexeme::ExitFor => self.simple(StmtKind::ExitFor),
            Lexeme::ExitWhile => self.simple(StmtKind::ExitWhile),
            Lexeme::ContinueFor => self.simple(StmtKind::ContinueFor),
            Lexeme::ContinueWhile => self.simple(StmtKind::ContinueWhile),
            Lexeme::End => self.simple(StmtKind::End),
            Lexeme::Stop => self.simple(StmtKind::Stop),
            _ => self.assignment_or_call()?,
        };
        Ok(Stmt::new(kind, location))
    }

    fn simple(&mut self, kind: StmtKind) -> StmtKind {
        self.advance();
        kind
    }

    /// End of a statement, including the `else` that ends the `then`
    /// part of a single-line `if`.
    fn at_statement_end(&self) -> bool {
        self.peek().kind.is_terminator() || self.check_any(&[Lexeme::Else, Lexeme::ElseIf])
    }

    /// Statements until one of `terminators`. Errors inside the block are
    /// recorded and skipped; only running out of input fails the block.
    fn block(&mut self, terminators: &[Lexeme]) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.check_any(terminators) {
                return Ok(statements);
            }
            if self.at_end() {
                return Err(SyntaxError::new(
                    RuntimeErrorDetail::UnterminatedBlock,
                    format!("Expected {:?} before end of file", terminators),
                    self.location(),
                ));
            }
            match self.statement().and_then(|stmt| {
                self.expect_statement_end()?;
                Ok(stmt)
            }) {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Functions
    // ═══════════════════════════════════════════════════════════════════

    /// `function [name](params) [as type] ... end function`, also `sub`.
    /// The cursor is on the `function`/`sub` keyword.
    pub(super) fn function_body(&mut self, name: Option<String>) -> PResult<FunctionDecl> {
        let location = self.location();
        let is_sub = self.advance().kind == Lexeme::Sub;
        if name.is_some() {
            self.advance();
        }

        self.consume(Lexeme::LeftParen, "Expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(Lexeme::RightParen) {
            loop {
                params.push(self.parameter()?);
                if !self.matches(Lexeme::Comma) {
                    break;
                }
            }
        }
        self.consume(Lexeme::RightParen, "Expected ')' after parameters")?;

        let returns = if self.check_word("as") {
            self.advance();
            self.type_name()?
        } else if is_sub {
            ValueKind::Void
        } else {
            ValueKind::Dynamic
        };

        let terminator = if is_sub { Lexeme::EndSub } else { Lexeme::EndFunction };
        self.function_depth += 1;
        let body = self.block(&[terminator]);
        self.function_depth -= 1;
        let body = body?;
        self.consume(terminator, "Expected end of function")?;

        Ok(FunctionDecl {
            name,
            params,
            returns,
            is_sub,
            body,
            location,
        })
    }

    fn parameter(&mut self) -> PResult<ParamDecl> {
        let name = self.consume(Lexeme::Identifier, "Expected parameter name")?.text;
        let default = if self.matches(Lexeme::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        let kind = if self.check_word("as") {
            self.advance();
            self.type_name()?
        } else {
            ValueKind::Dynamic
        };
        Ok(ParamDecl { name, kind, default })
    }

    fn type_name(&mut self) -> PResult<ValueKind> {
        let token = self.peek().clone();
        match ValueKind::from_type_name(&token.text) {
            Some(kind) => {
                self.advance();
                Ok(kind)
            }
            None => Err(self.error_here("Expected a type name")),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Conditionals
    // ═══════════════════════════════════════════════════════════════════

    fn if_statement(&mut self) -> PResult<StmtKind> {
        self.advance();
        let condition = self.expression()?;
        if self.check_word("then") {
            self.advance();
        }

        if !self.check(Lexeme::Newline) {
            return self.single_line_if(condition);
        }

        let mut branches = vec![IfBranch {
            condition,
            body: self.block(&[Lexeme::ElseIf, Lexeme::Else, Lexeme::EndIf])?,
        }];
        let mut else_branch = None;
        loop {
            if self.matches(Lexeme::ElseIf) {
                let condition = self.expression()?;
                if self.check_word("then") {
                    self.advance();
                }
                let body = self.block(&[Lexeme::ElseIf, Lexeme::Else, Lexeme::EndIf])?;
                branches.push(IfBranch { condition, body });
            } else if self.matches(Lexeme::Else) {
                else_branch = Some(self.block(&[Lexeme::EndIf])?);
            } else {
                self.consume(Lexeme::EndIf, "Expected 'end if'")?;
                break;
            }
        }
        Ok(StmtKind::If { branches, else_branch })
    }

    fn single_line_if(&mut self, condition: crate::ast::Expr) -> PResult<StmtKind> {
        let body = self.single_line_body()?;
        let mut branches = vec![IfBranch { condition, body }];
        let mut else_branch = None;

        while self.matches(Lexeme::ElseIf) {
            let condition = self.expression()?;
            if self.check_word("then") {
                self.advance();
            }
            let body = self.single_line_body()?;
            branches.push(IfBranch { condition, body });
        }
        if self.matches(Lexeme::Else) {
            else_branch = Some(self.single_line_body()?);
        }
        Ok(StmtKind::If { branches, else_branch })
    }

    /// Colon-separated statements up to `else` or the end of the line.
    fn single_line_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            while self.matches(Lexeme::Colon) {}
            if self.check_any(&[Lexeme::Newline, Lexeme::Eof, Lexeme::Else, Lexeme::ElseIf]) {
                return Ok(body);
            }
            body.push(self.statement()?);
            if !self.check_any(&[Lexeme::Colon, Lexeme::Newline, Lexeme::Eof, Lexeme::Else, Lexeme::ElseIf]) {
                return Err(self.error_here("Expected end of statement"));
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Loops
    // ═══════════════════════════════════════════════════════════════════

    fn loop_end(&mut self) -> PResult<()> {
        if self.matches(Lexeme::EndFor) {
            return Ok(());
        }
        self.consume(Lexeme::Next, "Expected 'end for' or 'next'")?;
        // `next i` may repeat the counter name
        if self.check(Lexeme::Identifier) {
            self.advance();
        }
        Ok(())
    }

    fn for_statement(&mut self) -> PResult<StmtKind> {
        self.advance();
        let counter = self.consume(Lexeme::Identifier, "Expected loop counter")?.text;
        self.consume(Lexeme::Equal, "Expected '=' after loop counter")?;
        let start = self.expression()?;
        self.consume(Lexeme::To, "Expected 'to' in for loop")?;
        let end = self.expression()?;
        let step = if self.matches(Lexeme::Step) {
            Some(self.expression()?)
        } else {
            None
        };
        let body = self.block(&[Lexeme::EndFor, Lexeme::Next])?;
        self.loop_end()?;
        Ok(StmtKind::For {
            counter,
            start,
            end,
            step,
            body,
        })
    }

    fn for_each_statement(&mut self) -> PResult<StmtKind> {
        self.advance();
        let item = self.consume(Lexeme::Identifier, "Expected loop variable")?.text;
        if !self.check_word("in") {
            return Err(self.error_here("Expected 'in' in for each loop"));
        }
        self.advance();
        let collection = self.expression()?;
        let body = self.block(&[Lexeme::EndFor, Lexeme::Next])?;
        self.loop_end()?;
        Ok(StmtKind::ForEach { item, collection, body })
    }

    fn while_statement(&mut self) -> PResult<StmtKind> {
        self.advance();
        let condition = self.expression()?;
        let body = self.block(&[Lexeme::EndWhile])?;
        self.consume(Lexeme::EndWhile, "Expected 'end while'")?;
        Ok(StmtKind::While { condition, body })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Other Statements
    // ═══════════════════════════════════════════════════════════════════

    fn try_statement(&mut self) -> PResult<StmtKind> {
        self.advance();
        let body = self.block(&[Lexeme::Catch])?;
        self.consume(Lexeme::Catch, "Expected 'catch'")?;
        let catch_var = if self.check(Lexeme::Identifier) {
            Some(self.advance().text)
        } else {
            None
        };
        let catch_body = self.block(&[Lexeme::EndTry])?;
        self.consume(Lexeme::EndTry, "Expected 'end try'")?;
        Ok(StmtKind::Try {
            body,
            catch_var,
            catch_body,
        })
    }

    fn print_statement(&mut self) -> PResult<StmtKind> {
        self.advance();
        let mut items = Vec::new();
        while !self.at_statement_end() {
            if self.matches(Lexeme::Semicolon) {
                items.push(PrintItem::Semicolon);
            } else if self.matches(Lexeme::Comma) {
                items.push(PrintItem::Comma);
            } else {
                items.push(PrintItem::Expr(self.expression()?));
            }
        }
        Ok(StmtKind::Print(items))
    }

    fn assignment_or_call(&mut self) -> PResult<StmtKind> {
        let target = self.postfix()?;

        let op = match self.peek().kind {
            Lexeme::Equal => None,
            Lexeme::PlusEqual => Some(BinaryOp::Add),
            Lexeme::MinusEqual => Some(BinaryOp::Subtract),
            Lexeme::StarEqual => Some(BinaryOp::Multiply),
            Lexeme::SlashEqual => Some(BinaryOp::Divide),
            Lexeme::BackslashEqual => Some(BinaryOp::IntegerDivide),
            Lexeme::LeftShiftEqual => Some(BinaryOp::LeftShift),
            Lexeme::RightShiftEqual => Some(BinaryOp::RightShift),
            Lexeme::PlusPlus | Lexeme::MinusMinus => {
                let op = if self.advance().kind == Lexeme::PlusPlus {
                    BinaryOp::Add
                } else {
                    BinaryOp::Subtract
                };
                return self.assignment(target, Some(op), Expr::Literal(Literal::Int32(1)));
            }
            _ => {
                return match target {
                    Expr::Call { .. } => Ok(StmtKind::Expression(target)),
                    _ => Err(self.error_here("Expected assignment or function call")),
                };
            }
        };
        self.advance();
        let value = self.expression()?;
        self.assignment(target, op, value)
    }

    fn assignment(&mut self, target: Expr, op: Option<BinaryOp>, value: Expr) -> PResult<StmtKind> {
        match target {
            Expr::Variable(name) => Ok(StmtKind::Assign { name, op, value }),
            Expr::DottedGet { object, name } => Ok(StmtKind::DottedSet {
                object: *object,
                name,
                op,
                value,
            }),
            Expr::IndexedGet { object, index } => Ok(StmtKind::IndexedSet {
                object: *object,
                index: *index,
                op,
                value,
            }),
            _ => Err(SyntaxError::new(
                RuntimeErrorDetail::BadLHS,
                RuntimeErrorDetail::BadLHS.message(),
                self.previous().location.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, Expr, PrintItem, StmtKind};
    use crate::error::RuntimeErrorDetail;
    use crate::parser::parse_source;
    use crate::value::ValueKind;
    use std::collections::HashMap;

    fn parse(source: &str) -> Vec<StmtKind> {
        let result = parse_source("t", source, &HashMap::new());
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.program.statements.into_iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_function_declaration_with_defaults_and_types() {
        let stmts = parse("function add(a as integer, b = 2 as integer) as integer\n  return a + b\nend function");
        match &stmts[0] {
            StmtKind::Function(decl) => {
                assert_eq!(decl.name.as_deref(), Some("add"));
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.params[0].kind, ValueKind::Int32);
                assert!(decl.params[1].default.is_some());
                assert_eq!(decl.returns, ValueKind::Int32);
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sub_defaults_to_void() {
        match &parse("sub main()\nend sub")[0] {
            StmtKind::Function(decl) => {
                assert!(decl.is_sub);
                assert_eq!(decl.returns, ValueKind::Void);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_block_if_with_else_if_chain() {
        let stmts = parse("if a then\n x = 1\nelse if b\n x = 2\nelse\n x = 3\nend if");
        match &stmts[0] {
            StmtKind::If { branches, else_branch } => {
                assert_eq!(branches.len(), 2);
                assert!(else_branch.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_single_line_if() {
        let stmts = parse("if a then x = 1 : y = 2 else x = 3\nz = 4");
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            StmtKind::If { branches, else_branch } => {
                assert_eq!(branches[0].body.len(), 2);
                assert_eq!(else_branch.as_ref().map(|b| b.len()), Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_for_loop_with_step_and_next() {
        let stmts = parse("for i = 10 to 1 step -1\n print i\nnext i");
        assert!(matches!(&stmts[0], StmtKind::For { step: Some(_), .. }));
    }

    #[test]
    fn test_for_each() {
        let stmts = parse("for each item in list\n print item\nend for");
        assert!(matches!(&stmts[0], StmtKind::ForEach { item, .. } if item == "item"));
    }

    #[test]
    fn test_increment_desugars_to_compound_assignment() {
        match &parse("count++")[0] {
            StmtKind::Assign { name, op, .. } => {
                assert_eq!(name, "count");
                assert_eq!(*op, Some(BinaryOp::Add));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_member_and_index_assignment() {
        let stmts = parse("m.total += 1\nitems[0] = \"a\"");
        assert!(matches!(&stmts[0], StmtKind::DottedSet { op: Some(BinaryOp::Add), .. }));
        assert!(matches!(&stmts[1], StmtKind::IndexedSet { op: None, .. }));
    }

    #[test]
    fn test_print_separators() {
        match &parse("print \"a\"; 1, 2;")[0] {
            StmtKind::Print(items) => {
                assert_eq!(items.len(), 6);
                assert_eq!(items[1], PrintItem::Semicolon);
                assert_eq!(items[3], PrintItem::Comma);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_try_catch() {
        let stmts = parse("try\n throw \"x\"\ncatch e\n print e.message\nend try");
        assert!(matches!(&stmts[0], StmtKind::Try { catch_var: Some(v), .. } if v == "e"));
    }

    #[test]
    fn test_anonymous_function_expression() {
        match &parse("f = function(x)\n return x * 2\nend function")[0] {
            StmtKind::Assign { value: Expr::Function(decl), .. } => assert!(decl.name.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bare_expression_statement_is_rejected() {
        let result = parse_source("t", "1 + 2", &HashMap::new());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_unterminated_function() {
        let result = parse_source("t", "function f()\n x = 1\n", &HashMap::new());
        assert_eq!(result.errors[0].detail, RuntimeErrorDetail::UnterminatedBlock);
    }

    #[test]
    fn test_bad_lhs() {
        let result = parse_source("t", "f() = 1", &HashMap::new());
        assert_eq!(result.errors[0].detail, RuntimeErrorDetail::BadLHS);
    }
}
