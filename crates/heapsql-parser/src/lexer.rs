use heapsql_core::error::{LexError, Span};

/// Token kinds produced by the lexer. Keywords are canonicalized to a
/// fixed set of variants rather than carried as strings, so the parser
/// matches on a closed enum instead of comparing raw identifier text.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Create,
    Table,
    Index,
    On,
    Insert,
    Into,
    Values,
    Select,
    From,
    Join,
    Where,
    Update,
    Set,
    Delete,
    And,
    Not,
    Null,
    Unique,
    Primary,
    Key,
    Integer,
    Varchar,
    Text,
    Date,
    Boolean,
    True,
    False,

    Ident(String),
    IntLiteral(String),
    StringLiteral(String),

    Comma,
    Semicolon,
    LParen,
    RParen,
    Star,
    Dot,
    Eq,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word.to_ascii_uppercase().as_str() {
        "CREATE" => TokenKind::Create,
        "TABLE" => TokenKind::Table,
        "INDEX" => TokenKind::Index,
        "ON" => TokenKind::On,
        "INSERT" => TokenKind::Insert,
        "INTO" => TokenKind::Into,
        "VALUES" => TokenKind::Values,
        "SELECT" => TokenKind::Select,
        "FROM" => TokenKind::From,
        "JOIN" => TokenKind::Join,
        "WHERE" => TokenKind::Where,
        "UPDATE" => TokenKind::Update,
        "SET" => TokenKind::Set,
        "DELETE" => TokenKind::Delete,
        "AND" => TokenKind::And,
        "NOT" => TokenKind::Not,
        "NULL" => TokenKind::Null,
        "UNIQUE" => TokenKind::Unique,
        "PRIMARY" => TokenKind::Primary,
        "KEY" => TokenKind::Key,
        "INTEGER" => TokenKind::Integer,
        "VARCHAR" => TokenKind::Varchar,
        "TEXT" => TokenKind::Text,
        "DATE" => TokenKind::Date,
        "BOOLEAN" => TokenKind::Boolean,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        _ => return None,
    })
}

/// Lexes `source` into a token stream terminated by `Eof`. Whitespace
/// and `--` line comments are skipped.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut col = 1usize;

    let advance = |i: &mut usize, line: &mut usize, col: &mut usize, chars: &[char]| {
        if chars[*i] == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
        *i += 1;
    };

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            advance(&mut i, &mut line, &mut col, &chars);
            continue;
        }

        if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                advance(&mut i, &mut line, &mut col, &chars);
            }
            continue;
        }

        let start_span = Span::new(line, col);

        match c {
            ',' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::Comma, start_span));
            }
            ';' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::Semicolon, start_span));
            }
            '(' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::LParen, start_span));
            }
            ')' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::RParen, start_span));
            }
            '*' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::Star, start_span));
            }
            '.' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::Dot, start_span));
            }
            '=' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token::new(TokenKind::Eq, start_span));
            }
            '\'' => {
                advance(&mut i, &mut line, &mut col, &chars); // opening quote
                let mut value = String::new();
                loop {
                    if i >= chars.len() {
                        return Err(LexError::new("unterminated string literal", start_span));
                    }
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            value.push('\'');
                            advance(&mut i, &mut line, &mut col, &chars);
                            advance(&mut i, &mut line, &mut col, &chars);
                            continue;
                        }
                        advance(&mut i, &mut line, &mut col, &chars); // closing quote
                        break;
                    }
                    value.push(chars[i]);
                    advance(&mut i, &mut line, &mut col, &chars);
                }
                tokens.push(Token::new(TokenKind::StringLiteral(value), start_span));
            }
            _ if c.is_ascii_digit() => {
                let mut value = String::new();
                while i < chars.len() && chars[i].is_ascii_digit() {
                    value.push(chars[i]);
                    advance(&mut i, &mut line, &mut col, &chars);
                }
                tokens.push(Token::new(TokenKind::IntLiteral(value), start_span));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    word.push(chars[i]);
                    advance(&mut i, &mut line, &mut col, &chars);
                }
                match keyword(&word) {
                    Some(kind) => tokens.push(Token::new(kind, start_span)),
                    None => tokens.push(Token::new(TokenKind::Ident(word), start_span)),
                }
            }
            other => {
                return Err(LexError::new(
                    format!("unexpected character '{other}'"),
                    start_span,
                ));
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, Span::new(line, col)));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_case_insensitively() {
        assert_eq!(
            kinds("select * from t"),
            vec![
                TokenKind::Select,
                TokenKind::Star,
                TokenKind::From,
                TokenKind::Ident("t".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn preserves_identifier_case() {
        assert_eq!(
            kinds("SELECT Foo"),
            vec![TokenKind::Select, TokenKind::Ident("Foo".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn string_literal_escapes_doubled_quote() {
        assert_eq!(
            kinds("'it''s'"),
            vec![TokenKind::StringLiteral("it's".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn skips_line_comments() {
        assert_eq!(
            kinds("SELECT 1 -- trailing comment\n"),
            vec![
                TokenKind::Select,
                TokenKind::IntLiteral("1".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        assert!(lex("'abc").is_err());
    }

    #[test]
    fn unknown_character_is_a_lex_error() {
        assert!(lex("SELECT # 1").is_err());
    }
}
