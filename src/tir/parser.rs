//! TIR text parser implementation.

use super::*;
use crate::core::ParseError;
use hashbrown::HashSet;

pub fn parse_program(text: &str) -> Result<Program, ParseError> {
    let parser = Parser::new(text);
    parser.parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    program: Program,
    funcs: HashSet<&'a str>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            program: Program::default(),
            funcs: HashSet::new(),
        }
    }

    fn parse(mut self) -> Result<Program, ParseError> {
        self.skip_whitespace();

        while !self.is_eof() {
            if let Err(e) = self.parse_function() {
                log::debug!("TIR parse failed: {}", e);
                return Err(e);
            }
            self.skip_whitespace();
        }

        Ok(self.program)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let consumed = &self.text[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(nl) => consumed[nl + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };
        ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Skip comment line
                while let Some(ch) = self.current_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), ParseError> {
        if !self.try_read(ch) {
            return Err(self.error(format!(
                "Expected '{}' but found {:?}",
                ch,
                self.current_char()
            )));
        }
        Ok(())
    }

    fn is_atom_char(ch: char) -> bool {
        !ch.is_whitespace() && !matches!(ch, '(' | ')' | '{' | '}' | '"' | ';')
    }

    /// Reads a bare word: a keyword, label, variable or number.
    fn read_atom(&mut self) -> Result<&'a str, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if Self::is_atom_char(ch) {
                self.advance();
            } else {
                break;
            }
        }

        if start == self.pos {
            return match self.current_char() {
                Some(ch) => Err(self.error(format!("Expected identifier but found '{}'", ch))),
                None => Err(self.error("Expected identifier but found EOF")),
            };
        }
        Ok(&self.text[start..self.pos])
    }

    fn read_identifier(&mut self) -> Result<&'a str, ParseError> {
        let ident = self.read_atom()?;
        let first = ident.chars().next().unwrap_or('0');
        if first.is_ascii_digit() || first == '-' {
            return Err(self.error(format!("Expected identifier but found '{}'", ident)));
        }
        Ok(ident)
    }

    fn read_number(&mut self) -> Result<i64, ParseError> {
        let atom = self.read_atom()?;
        let (sign, digits) = match atom.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", atom),
        };
        let (radix, magnitude) = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex) => (16, hex),
            None => (10, digits),
        };
        if magnitude.starts_with('-') {
            return Err(self.error(format!("Failed to parse number '{}'", atom)));
        }

        // Parse with the sign attached so i64::MIN is representable.
        i64::from_str_radix(&format!("{}{}", sign, magnitude), radix)
            .map_err(|e| self.error(format!("Failed to parse number '{}': {}", atom, e)))
    }

    fn read_string(&mut self) -> Result<String, ParseError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.current_char() {
                None => return Err(self.error("Unterminated string literal")),
                Some('"') => {
                    self.advance();
                    return Ok(out);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => out.push('\n'),
                        Some(ch @ ('"' | '\\')) => out.push(ch),
                        other => {
                            return Err(self.error(format!("Unknown escape {:?}", other)));
                        }
                    }
                    self.advance();
                }
                Some(ch) => {
                    out.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn peek_close(&mut self) -> bool {
        self.skip_whitespace();
        self.current_char() == Some(')')
    }

    fn parse_function(&mut self) -> Result<(), ParseError> {
        let keyword = self.read_identifier()?;
        if keyword != "func" {
            return Err(self.error(format!("Expected 'func' but found '{}'", keyword)));
        }

        let name = self.read_identifier()?;
        if !self.funcs.insert(name) {
            return Err(self.error(format!("Duplicate function definition: '{}'", name)));
        }

        self.expect('{')?;
        let mut body = Vec::new();
        while !self.try_read('}') {
            if self.is_eof() {
                return Err(self.error(format!("Unterminated body of function '{}'", name)));
            }
            body.push(self.parse_stmt()?);
        }

        log::trace!("parsed func {} with {} statements", name, body.len());
        self.program.functions.push(Function {
            name: name.to_string(),
            body,
        });
        Ok(())
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.expect('(')?;
        let keyword = self.read_identifier()?;

        let stmt = match keyword {
            "label" => Stmt::Label(self.read_identifier()?.to_string()),
            "jump" => Stmt::Jump(self.read_identifier()?.to_string()),
            "cjump" => {
                let cond = self.parse_expr()?;
                let true_label = self.read_identifier()?.to_string();
                let false_label = if self.peek_close() {
                    None
                } else {
                    Some(self.read_identifier()?.to_string())
                };
                Stmt::CJump(CJump {
                    cond,
                    true_label,
                    false_label,
                })
            }
            "return" => {
                if self.peek_close() {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.parse_expr()?))
                }
            }
            "comment" => {
                self.skip_whitespace();
                Stmt::Comment(self.read_string()?)
            }
            "move" => {
                let dst = self.parse_expr()?;
                let src = self.parse_expr()?;
                Stmt::Ordinary(Effect::Move { dst, src })
            }
            "exp" => Stmt::Ordinary(Effect::Exp(self.parse_expr()?)),
            other => return Err(self.error(format!("Unknown statement '{}'", other))),
        };

        self.expect(')')?;
        Ok(stmt)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect('(')?;
        let keyword = self.read_identifier()?;

        let expr = match keyword {
            "const" => Expr::Const(self.read_number()?),
            "temp" => Expr::Temp(self.read_identifier()?.to_string()),
            "name" => Expr::Name(self.read_identifier()?.to_string()),
            "mem" => Expr::Mem(Box::new(self.parse_expr()?)),
            "call" => {
                let target = Box::new(self.parse_expr()?);
                let mut args = Vec::new();
                while !self.peek_close() {
                    args.push(self.parse_expr()?);
                }
                Expr::Call { target, args }
            }
            other => match BinOpKind::from_keyword(other) {
                Some(op) => {
                    let lhs = self.parse_expr()?;
                    let rhs = self.parse_expr()?;
                    Expr::binop(op, lhs, rhs)
                }
                None => return Err(self.error(format!("Unknown expression '{}'", other))),
            },
        };

        self.expect(')')?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_if_else() {
        let text = r#"
; branch on a comparison
func pick {
    (cjump (lt (temp x) (const 10)) Ltrue Lfalse)
    (label Ltrue)
    (move (temp y) (const 1))
    (jump Lend)
    (label Lfalse)
    (move (temp y) (const -2))
    (label Lend)
    (return (temp y))
}
"#;
        let program = parse_program(text).unwrap();
        assert_eq!(program.functions.len(), 1);
        let func = &program.functions[0];
        assert_eq!(func.name, "pick");
        assert_eq!(func.body.len(), 8);
        assert_eq!(
            func.body[0],
            Stmt::cjump(
                Expr::binop(BinOpKind::Lt, Expr::temp("x"), Expr::Const(10)),
                "Ltrue",
                "Lfalse"
            )
        );
        assert_eq!(func.body[5], Stmt::mov(Expr::temp("y"), Expr::Const(-2)));
        assert_eq!(func.body[7], Stmt::Return(Some(Expr::temp("y"))));
    }

    #[test]
    fn test_parse_optional_operands() {
        let text = r#"func f {
    (cjump (temp c) Lnext)
    (comment "skip \"this\"")
    (exp (call (name g) (temp a) (const 0x10)))
    (label Lnext)
    (return)
}"#;
        let program = parse_program(text).unwrap();
        let body = &program.functions[0].body;
        assert!(matches!(&body[0], Stmt::CJump(CJump { false_label: None, .. })));
        assert_eq!(body[1], Stmt::comment("skip \"this\""));
        assert_eq!(
            body[2],
            Stmt::exp(Expr::Call {
                target: Box::new(Expr::Name("g".to_string())),
                args: vec![Expr::temp("a"), Expr::Const(16)],
            })
        );
        assert_eq!(body[4], Stmt::Return(None));
    }

    #[test]
    fn test_printed_program_parses_back() {
        let text = "func f {\n  (move (temp a) (mem (add (temp p) (const 8))))\n  (return (temp a))\n}\n";
        let program = parse_program(text).unwrap();
        assert_eq!(program.to_string(), text);
    }

    #[test]
    fn test_error_reports_position() {
        let err = parse_program("func f {\n  (frobnicate)\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn test_integer_bounds() {
        let program = parse_program(
            "func f { (exp (const -9223372036854775808)) (exp (const 9223372036854775807)) (exp (const -0x10)) }",
        )
        .unwrap();
        let body = &program.functions[0].body;
        assert_eq!(body[0], Stmt::exp(Expr::Const(i64::MIN)));
        assert_eq!(body[1], Stmt::exp(Expr::Const(i64::MAX)));
        assert_eq!(body[2], Stmt::exp(Expr::Const(-16)));

        assert!(parse_program("func f { (exp (const 9223372036854775808)) }").is_err());
        assert!(parse_program("func f { (exp (const --1)) }").is_err());
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let err = parse_program("func f { (return) }\nfunc f { (return) }").unwrap_err();
        assert!(err.message.contains("Duplicate function"));
    }

    #[test]
    fn test_empty_body() {
        let program = parse_program("func empty { }").unwrap();
        assert!(program.functions[0].body.is_empty());
    }
}
