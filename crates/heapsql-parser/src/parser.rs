use heapsql_core::error::ParseError;
use heapsql_core::value::ColumnType;

use crate::ast::{
    Assignment, ColFlag, ColRef, ColumnDef, Equality, JoinClause, Literal, SelectList, Statement,
};
use crate::lexer::{Token, TokenKind};

/// Recursive-descent parser with one token of lookahead. The grammar
/// is small and non-recursive, so hand-written descent over a flat
/// token stream is simpler than building a generic, table-driven
/// grammar engine for it.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn describe(kind: &TokenKind) -> String {
        match kind {
            TokenKind::Ident(s) => format!("identifier '{s}'"),
            TokenKind::IntLiteral(s) => format!("integer '{s}'"),
            TokenKind::StringLiteral(s) => format!("string '{s}'"),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }

    fn error(&self, message: impl Into<String>, expected: Vec<&'static str>) -> ParseError {
        let tok = self.peek();
        ParseError::new(message, tok.span, Self::describe(&tok.kind), expected)
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> PResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {expected}"), vec![expected]))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("expected identifier", vec!["identifier"])),
        }
    }

    fn expect_int(&mut self) -> PResult<i64> {
        match self.peek().kind.clone() {
            TokenKind::IntLiteral(s) => {
                self.advance();
                s.parse::<i64>()
                    .map_err(|_| self.error("integer literal out of range", vec!["integer"]))
            }
            _ => Err(self.error("expected integer literal", vec!["integer"])),
        }
    }

    /// Parses `script := (statement ';')* statement? EOF`.
    pub fn parse_script(&mut self) -> PResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
            if self.peek().kind == TokenKind::Semicolon {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::Eof, "end of input or ';'")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        match self.peek().kind.clone() {
            TokenKind::Create => self.parse_create(),
            TokenKind::Insert => self.parse_insert(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Update => self.parse_update(),
            TokenKind::Delete => self.parse_delete(),
            _ => Err(self.error(
                "expected a statement",
                vec!["CREATE", "INSERT", "SELECT", "UPDATE", "DELETE"],
            )),
        }
    }

    fn parse_create(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Create, "CREATE")?;
        match self.peek().kind.clone() {
            TokenKind::Table => self.parse_create_table(),
            TokenKind::Index => self.parse_create_index(),
            _ => Err(self.error("expected TABLE or INDEX", vec!["TABLE", "INDEX"])),
        }
    }

    fn parse_create_table(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Table, "TABLE")?;
        let table = self.expect_ident()?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut columns = vec![self.parse_col_def()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            columns.push(self.parse_col_def()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::CreateTable { table, columns })
    }

    fn parse_col_def(&mut self) -> PResult<ColumnDef> {
        let name = self.expect_ident()?;
        let ty = self.parse_type()?;
        let mut flags = Vec::new();
        loop {
            match self.peek().kind.clone() {
                TokenKind::Not => {
                    self.advance();
                    self.expect(TokenKind::Null, "NULL")?;
                    flags.push(ColFlag::NotNull);
                }
                TokenKind::Unique => {
                    self.advance();
                    flags.push(ColFlag::Unique);
                }
                TokenKind::Primary => {
                    self.advance();
                    self.expect(TokenKind::Key, "KEY")?;
                    flags.push(ColFlag::PrimaryKey);
                }
                _ => break,
            }
        }
        Ok(ColumnDef { name, ty, flags })
    }

    fn parse_type(&mut self) -> PResult<ColumnType> {
        match self.peek().kind.clone() {
            TokenKind::Integer => {
                self.advance();
                Ok(ColumnType::Integer)
            }
            TokenKind::Text => {
                self.advance();
                Ok(ColumnType::Text)
            }
            TokenKind::Date => {
                self.advance();
                Ok(ColumnType::Date)
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(ColumnType::Boolean)
            }
            TokenKind::Varchar => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let len = self.expect_int()?;
                self.expect(TokenKind::RParen, "')'")?;
                if len < 0 {
                    return Err(self.error("VARCHAR length must be non-negative", vec!["non-negative integer"]));
                }
                Ok(ColumnType::Varchar(len as u32))
            }
            _ => Err(self.error(
                "expected a column type",
                vec!["INTEGER", "TEXT", "DATE", "BOOLEAN", "VARCHAR"],
            )),
        }
    }

    fn parse_create_index(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Index, "INDEX")?;
        let index = self.expect_ident()?;
        self.expect(TokenKind::On, "ON")?;
        let table = self.expect_ident()?;
        self.expect(TokenKind::LParen, "'('")?;
        let column = self.expect_ident()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::CreateIndex {
            index,
            table,
            column,
        })
    }

    fn parse_insert(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Insert, "INSERT")?;
        self.expect(TokenKind::Into, "INTO")?;
        let table = self.expect_ident()?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut columns = vec![self.expect_ident()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            columns.push(self.expect_ident()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Values, "VALUES")?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut values = vec![self.parse_literal()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            values.push(self.parse_literal()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        if columns.len() != values.len() {
            return Err(self.error(
                "column list and value list must have the same length",
                vec![],
            ));
        }
        Ok(Statement::Insert {
            table,
            columns,
            values,
        })
    }

    fn parse_literal(&mut self) -> PResult<Literal> {
        match self.peek().kind.clone() {
            TokenKind::IntLiteral(s) => {
                self.advance();
                s.parse::<i64>()
                    .map(Literal::Int)
                    .map_err(|_| self.error("integer literal out of range", vec!["integer"]))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Ok(Literal::Str(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Literal::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Literal::Null)
            }
            _ => Err(self.error(
                "expected a literal",
                vec!["integer", "string", "TRUE", "FALSE", "NULL"],
            )),
        }
    }

    fn parse_col_ref(&mut self) -> PResult<ColRef> {
        let first = self.expect_ident()?;
        if self.peek().kind == TokenKind::Dot {
            self.advance();
            let column = self.expect_ident()?;
            Ok(ColRef::qualified(first, column))
        } else {
            Ok(ColRef::unqualified(first))
        }
    }

    fn parse_select(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Select, "SELECT")?;
        let select_list = if self.peek().kind == TokenKind::Star {
            self.advance();
            SelectList::Star
        } else {
            let mut cols = vec![self.parse_col_ref()?];
            while self.peek().kind == TokenKind::Comma {
                self.advance();
                cols.push(self.parse_col_ref()?);
            }
            SelectList::Columns(cols)
        };
        self.expect(TokenKind::From, "FROM")?;
        let from = self.expect_ident()?;

        let mut joins = Vec::new();
        while self.peek().kind == TokenKind::Join {
            self.advance();
            let table = self.expect_ident()?;
            self.expect(TokenKind::On, "ON")?;
            let left = self.parse_col_ref()?;
            self.expect(TokenKind::Eq, "'='")?;
            let right = self.parse_col_ref()?;
            joins.push(JoinClause {
                table,
                left,
                right,
            });
        }

        let where_clause = self.parse_optional_where()?;
        Ok(Statement::Select {
            select_list,
            from,
            joins,
            where_clause,
        })
    }

    fn parse_optional_where(&mut self) -> PResult<Vec<Equality>> {
        if self.peek().kind != TokenKind::Where {
            return Ok(Vec::new());
        }
        self.advance();
        let mut eqs = vec![self.parse_eq()?];
        while self.peek().kind == TokenKind::And {
            self.advance();
            eqs.push(self.parse_eq()?);
        }
        Ok(eqs)
    }

    fn parse_eq(&mut self) -> PResult<Equality> {
        let col = self.parse_col_ref()?;
        self.expect(TokenKind::Eq, "'='")?;
        let value = self.parse_literal()?;
        Ok(Equality { col, value })
    }

    fn parse_update(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Update, "UPDATE")?;
        let table = self.expect_ident()?;
        self.expect(TokenKind::Set, "SET")?;
        let mut assignments = vec![self.parse_assignment()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            assignments.push(self.parse_assignment()?);
        }
        let where_clause = self.parse_optional_where()?;
        Ok(Statement::Update {
            table,
            assignments,
            where_clause,
        })
    }

    fn parse_assignment(&mut self) -> PResult<Assignment> {
        let column = self.expect_ident()?;
        self.expect(TokenKind::Eq, "'='")?;
        let value = self.parse_literal()?;
        Ok(Assignment { column, value })
    }

    fn parse_delete(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Delete, "DELETE")?;
        self.expect(TokenKind::From, "FROM")?;
        let table = self.expect_ident()?;
        let where_clause = self.parse_optional_where()?;
        Ok(Statement::Delete {
            table,
            where_clause,
        })
    }
}

/// Lexes and parses `source` into a list of statements.
pub fn parse(source: &str) -> Result<Vec<Statement>, heapsql_core::error::EngineError> {
    let tokens = crate::lexer::lex(source)?;
    let mut parser = Parser::new(tokens);
    let statements = parser.parse_script()?;
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapsql_core::value::ColumnType;

    #[test]
    fn parses_create_table_with_flags() {
        let stmts = parse("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::CreateTable { table, columns } => {
                assert_eq!(table, "t");
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[0].ty, ColumnType::Integer);
                assert!(columns[0].has(&ColFlag::PrimaryKey));
                assert!(columns[1].has(&ColFlag::NotNull));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_select_with_join_and_where() {
        let stmts =
            parse("SELECT t.name, o.amt FROM t JOIN o ON t.id=o.tid WHERE o.amt=20").unwrap();
        match &stmts[0] {
            Statement::Select {
                joins,
                where_clause,
                ..
            } => {
                assert_eq!(joins.len(), 1);
                assert_eq!(where_clause.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_multiple_statements_separated_by_semicolon() {
        let stmts = parse("CREATE TABLE t (id INTEGER); SELECT * FROM t;").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn reports_expected_tokens_on_parse_error() {
        let err = parse("CREATE TABLE").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("parse error"));
    }
}
